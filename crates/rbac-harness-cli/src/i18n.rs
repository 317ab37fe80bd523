// crates/rbac-harness-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Keyed message templates with named placeholders.
// Purpose: Keep every user-facing string in one table.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Messages are looked up by dotted key and rendered by the [`t!`](crate::t)
//! macro. Placeholders are `{name}`; a placeholder with no matching argument
//! is left as written, and an unknown key renders as the key itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Display;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// One named value for a message placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageArg {
    /// Placeholder name, without braces.
    pub key: &'static str,
    /// Rendered value.
    pub value: String,
}

impl MessageArg {
    /// Renders `value` for placeholder `key`.
    pub fn new(key: &'static str, value: impl Display) -> Self {
        Self {
            key,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Message templates by key.
const CATALOG: &[(&str, &str)] = &[
    ("main.version", "rbac-harness {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.serialize_failed", "Failed to serialize output: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("fixture.read_failed", "Failed to read fixture {path}: {error}"),
    ("fixture.parse_failed", "Failed to parse fixture {path}: {error}"),
    ("fixture.too_large", "Fixture {path} exceeds size limit ({size} > {limit} bytes)"),
    ("fixture.unknown_format", "Unsupported fixture extension for {path}; use .json or .toml"),
    ("model.failed", "Model error: {error}"),
    ("model.unknown_template", "Template {id} is not defined in the fixture"),
    ("diff.match", "Rule sets match ({count} grants)."),
    ("diff.mismatch", "Rule sets differ:\n{details}"),
    ("verify.ok", "Scenario {scenario} passed; {count} resources torn down."),
    ("verify.failed", "{error}"),
    ("verify.teardown_failed", "  teardown left behind {resource}"),
    ("audit.open_failed", "Failed to open audit sink: {error}"),
];

/// Returns the template for `key`.
fn template(key: &str) -> Option<&'static str> {
    CATALOG.iter().find(|(name, _)| *name == key).map(|(_, text)| *text)
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders the message for `key` with `args`.
#[must_use]
pub fn translate(key: &str, args: &[MessageArg]) -> String {
    template(key).map_or_else(|| key.to_string(), |text| render(text, args))
}

/// Substitutes `{name}` placeholders in one left-to-right pass.
///
/// Substituted values are never rescanned.
fn render(text: &str, args: &[MessageArg]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((before, after)) = rest.split_once('{') {
        out.push_str(before);
        let Some((name, tail)) = after.split_once('}') else {
            out.push('{');
            rest = after;
            break;
        };
        match args.iter().find(|arg| arg.key == name) {
            Some(arg) => out.push_str(&arg.value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = tail;
    }
    out.push_str(rest);
    out
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Renders a catalog message: `t!("config.load_failed", error = err)`.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {
        $crate::i18n::translate(
            $key,
            &[$($crate::i18n::MessageArg::new(stringify!($name), &$value)),*],
        )
    };
}
