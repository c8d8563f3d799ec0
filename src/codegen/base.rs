//! Shared pieces of the generator contract: typed config deserialization,
//! name resolution, and the error-report emission helper.
//!
//! Each variant owns a `#[derive(Deserialize)]` config struct built once
//! from its resolved schema fragment. Only recognized keys take effect;
//! unknown keys are ignored. Every config declares its own `description` and
//! `s2cDefault` fields (the latter is a verbatim target-language default
//! expression and takes precedence over the schema's own `default`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::emit::CodeWriter;
use crate::error::CompileError;

/// Deserialize a variant config from a resolved schema fragment, reporting
/// the JSON path of whatever did not fit.
pub fn config_from_schema<T: DeserializeOwned>(
    fragment: &Value,
    name: &str,
) -> Result<T, CompileError> {
    serde_path_to_error::deserialize(fragment.clone()).map_err(|err| {
        let path = err.path().to_string();
        CompileError::ConfigShape {
            name: name.to_string(),
            path,
            message: err.into_inner().to_string(),
        }
    })
}

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

pub fn ensure_identifier(name: &str) -> Result<(), CompileError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(CompileError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// Name precedence below an explicit target-type override: the fragment's
/// `$id` (leading `#` stripped), else the parent-derived fallback. The result
/// keys the type cache, so it must be a usable C identifier.
pub fn resolved_name(fragment: &Value, fallback: &str) -> Result<String, CompileError> {
    let name = match fragment.get("$id").and_then(Value::as_str) {
        Some(id) => id.strip_prefix('#').unwrap_or(id).to_string(),
        None => fallback.to_string(),
    };
    ensure_identifier(&name)?;
    Ok(name)
}

/// `LOG_ERROR(...)` plus the fail-fast `return true;`. The macro reference
/// has no trailing semicolon; the user-supplied macro body brings its own.
pub fn emit_logged_error(w: &mut CodeWriter, message: &str, args: &[&str]) {
    if args.is_empty() {
        w.line(format!(
            "LOG_ERROR(CURRENT_TOKEN(parse_state).start, \"{message}\")"
        ));
    } else {
        w.line(format!(
            "LOG_ERROR(CURRENT_TOKEN(parse_state).start, \"{message}\", {})",
            args.join(", ")
        ));
    }
    w.line("return true;");
}

/// Emit the verbatim `s2cDefault` override. Strings splice as-is (they are
/// target-language expressions); other scalars print their JSON spelling.
pub fn emit_override_default(w: &mut CodeWriter, target: &str, value: &Value) {
    let expression = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    w.line(format!("{target} = {expression};"));
}

/// Escape a string for inclusion inside a C string literal.
pub fn c_string_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// A C double literal that round-trips: `1` becomes `1.0`.
pub fn c_double_literal(value: f64) -> String {
    format!("{value:?}")
}
