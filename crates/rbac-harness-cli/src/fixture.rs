// crates/rbac-harness-cli/src/fixture.rs
// ============================================================================
// Module: CLI Fixtures
// Description: Bounded loading of JSON or TOML template and binding fixtures.
// Purpose: Turn fixture files into model inputs for the offline commands.
// Dependencies: role-aggregation, serde, serde_json, toml, thiserror
// ============================================================================

//! ## Overview
//! A fixture describes templates, downstream clusters, projects with their
//! namespaces, and bindings. The format follows the file extension: `.json`
//! or `.toml`. Reads are size-limited and fail closed.
//!
//! Security posture: fixture files are untrusted input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use role_aggregation::Binding;
use role_aggregation::ClusterId;
use role_aggregation::ModelResult;
use role_aggregation::NamespaceName;
use role_aggregation::Principal;
use role_aggregation::ProjectDirectory;
use role_aggregation::ProjectId;
use role_aggregation::RoleTemplate;
use role_aggregation::RuleSet;
use role_aggregation::TemplateArena;
use role_aggregation::validate_arena;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum fixture size in bytes.
pub const MAX_FIXTURE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fixture loading failure.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The file could not be read.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Fixture path.
        path: String,
        /// I/O error text.
        error: String,
    },
    /// The file exceeds [`MAX_FIXTURE_BYTES`].
    #[error("{path} exceeds size limit ({size} > {limit} bytes)")]
    TooLarge {
        /// Fixture path.
        path: String,
        /// Observed size.
        size: u64,
        /// Size limit.
        limit: usize,
    },
    /// The extension names no supported format.
    #[error("unsupported fixture extension for {path}")]
    UnknownFormat {
        /// Fixture path.
        path: String,
    },
    /// The content does not parse.
    #[error("failed to parse {path}: {error}")]
    Parse {
        /// Fixture path.
        path: String,
        /// Parser error text.
        error: String,
    },
}

// ============================================================================
// SECTION: Format
// ============================================================================

/// Fixture serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    /// JSON document.
    Json,
    /// TOML document.
    Toml,
}

impl FixtureFormat {
    /// Selects the format from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::UnknownFormat`] for other extensions.
    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(FixtureError::UnknownFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

// ============================================================================
// SECTION: Fixture Types
// ============================================================================

/// Templates, projects, and bindings for offline model commands.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    /// Downstream clusters.
    #[serde(default)]
    pub downstream: Vec<ClusterId>,
    /// Role templates.
    #[serde(default)]
    pub templates: Vec<RoleTemplate>,
    /// Projects and their namespaces.
    #[serde(default)]
    pub projects: Vec<ProjectFixture>,
    /// Bindings.
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// One project and its namespaces.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFixture {
    /// Owning downstream cluster.
    pub cluster: ClusterId,
    /// Project id.
    pub project: ProjectId,
    /// Namespaces inside the project.
    #[serde(default)]
    pub namespaces: Vec<NamespaceName>,
}

impl Fixture {
    /// Builds a validated template arena.
    ///
    /// # Errors
    ///
    /// Returns the first [`role_aggregation::ModelError`] found: a duplicate
    /// id, a dangling reference, a cycle, or a malformed grant.
    pub fn arena(&self) -> ModelResult<TemplateArena> {
        for template in &self.templates {
            template.own_rules().validate()?;
        }
        let arena = TemplateArena::from_templates(self.templates.iter().cloned())?;
        validate_arena(&arena)?;
        Ok(arena)
    }

    /// Builds the project namespace directory.
    #[must_use]
    pub fn directory(&self) -> ProjectDirectory {
        let mut directory = ProjectDirectory::new();
        for project in &self.projects {
            directory.add_project(project.cluster.clone(), project.project.clone());
            for namespace in &project.namespaces {
                directory.add_namespace(
                    project.cluster.clone(),
                    project.project.clone(),
                    namespace.clone(),
                );
            }
        }
        directory
    }

    /// Returns every principal that holds a binding.
    #[must_use]
    pub fn principals(&self) -> BTreeSet<Principal> {
        self.bindings.iter().map(|binding| binding.principal.clone()).collect()
    }
}

/// A bare rule set document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetFixture {
    /// Grants in the set.
    #[serde(default)]
    pub rules: RuleSet,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads and parses a fixture file.
///
/// # Errors
///
/// Returns [`FixtureError`] when the file is unreadable, too large, has an
/// unknown extension, or does not parse.
pub fn load_fixture<T: DeserializeOwned>(path: &Path) -> Result<T, FixtureError> {
    let format = FixtureFormat::from_path(path)?;
    let bytes = read_with_limit(path, MAX_FIXTURE_BYTES)?;
    let parse_error = |error: String| FixtureError::Parse {
        path: path.display().to_string(),
        error,
    };
    match format {
        FixtureFormat::Json => {
            serde_json::from_slice(&bytes).map_err(|err| parse_error(err.to_string()))
        }
        FixtureFormat::Toml => {
            let text = std::str::from_utf8(&bytes).map_err(|err| parse_error(err.to_string()))?;
            toml::from_str(text).map_err(|err| parse_error(err.to_string()))
        }
    }
}

/// Reads at most `limit` bytes, failing when the file is larger.
fn read_with_limit(path: &Path, limit: usize) -> Result<Vec<u8>, FixtureError> {
    let io_error = |err: std::io::Error| FixtureError::Io {
        path: path.display().to_string(),
        error: err.to_string(),
    };
    let too_large = |size: u64| FixtureError::TooLarge {
        path: path.display().to_string(),
        size,
        limit,
    };
    let file = File::open(path).map_err(io_error)?;
    let size = file.metadata().map_err(io_error)?.len();
    let max = u64::try_from(limit).unwrap_or(u64::MAX);
    if size > max {
        return Err(too_large(size));
    }
    let mut bytes = Vec::new();
    file.take(max.saturating_add(1)).read_to_end(&mut bytes).map_err(io_error)?;
    if bytes.len() > limit {
        return Err(too_large(u64::try_from(bytes.len()).unwrap_or(u64::MAX)));
    }
    Ok(bytes)
}
