//! Integer-family generators.
//!
//! Three schema shapes funnel into one generator struct, differing only in
//! which source forms the emitted parser accepts and which radix it hands
//! the builtin:
//!
//! - `Integer`: a plain JSON number, radix 10.
//! - `NumericString`: a textual integer constrained to one of a fixed
//!   allow-list of patterns, each mapping to a radix (decimal, hex with or
//!   without prefix, or 0-prefix-sensitive auto-radix).
//! - `IntegerOrString`: the two-branch `anyOf` of exactly integer + string,
//!   collapsed into a numeric-string generator that accepts both forms.
//!
//! The target type is unsigned iff the declared minimum is >= 0; a minimum
//! of exactly 0 is then redundant and dropped.

use std::rc::Rc;

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::codegen::base::{
    config_from_schema, emit_logged_error, emit_override_default, resolved_name,
};
use crate::ctype::{CShape, CType, IntWidth, parse_stdint_name};
use crate::emit::CodeWriter;
use crate::error::CompileError;

/// Pattern → radix. Radix 0 is the 0-prefix-sensitive auto form (`0x` hex,
/// leading `0` octal, decimal otherwise), matching strtoll semantics.
const UNSIGNED_PATTERNS: &[(&str, u32)] = &[
    ("[0-9]+", 10),
    ("[0-9a-fA-F]+", 16),
    ("(0x|0X)?[0-9a-fA-F]+", 16),
    ("(0[0-7]+|[0-9]+|0[xX][0-9a-fA-F]+)", 0),
];

static SIGNED_PATTERNS: Lazy<Vec<(String, u32)>> = Lazy::new(|| {
    UNSIGNED_PATTERNS
        .iter()
        .map(|(pattern, radix)| (format!("[+-]?{pattern}"), *radix))
        .collect()
});

fn unsigned_radix_for(pattern: &str) -> Option<u32> {
    UNSIGNED_PATTERNS
        .iter()
        .find(|(candidate, _)| *candidate == pattern)
        .map(|(_, radix)| *radix)
}

fn signed_radix_for(pattern: &str) -> Option<u32> {
    SIGNED_PATTERNS
        .iter()
        .find(|(candidate, _)| candidate == pattern)
        .map(|(_, radix)| *radix)
}

fn is_allowed_pattern(pattern: &str) -> bool {
    unsigned_radix_for(pattern).is_some() || signed_radix_for(pattern).is_some()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IntegerDefault {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegerConfig {
    description: Option<String>,
    s2c_default: Option<Value>,
    s2c_type: Option<String>,
    minimum: Option<i64>,
    maximum: Option<i64>,
    exclusive_minimum: Option<i64>,
    exclusive_maximum: Option<i64>,
    default: Option<IntegerDefault>,
    pattern: Option<String>,
}

#[derive(Debug)]
pub struct IntegerGenerator {
    name: String,
    c_type: Rc<CType>,
    unsigned: bool,
    minimum: Option<i64>,
    maximum: Option<i64>,
    exclusive_minimum: Option<i64>,
    exclusive_maximum: Option<i64>,
    default: Option<i64>,
    override_default: Option<Value>,
    number_allowed: bool,
    string_allowed: bool,
    radix: u32,
}

impl IntegerGenerator {
    pub fn matches_integer(fragment: &Value) -> bool {
        fragment.get("type").and_then(Value::as_str) == Some("integer")
    }

    pub fn matches_numeric_string(fragment: &Value) -> bool {
        if fragment.get("type").and_then(Value::as_str) != Some("string") {
            return false;
        }
        if fragment.get("s2cParseFunction").is_some() {
            return false;
        }
        fragment
            .get("pattern")
            .and_then(Value::as_str)
            .is_some_and(is_allowed_pattern)
    }

    pub fn matches_integer_or_string(fragment: &Value) -> bool {
        let Some(branches) = fragment.get("anyOf").and_then(Value::as_array) else {
            return false;
        };
        if branches.len() != 2 {
            return false;
        }
        let kinds: Vec<_> = branches
            .iter()
            .map(|branch| branch.get("type").and_then(Value::as_str))
            .collect();
        matches!(
            kinds.as_slice(),
            [Some("integer"), Some("string")] | [Some("string"), Some("integer")]
        )
    }

    pub fn build_integer(fragment: &Value, fallback_name: &str) -> Result<Self, CompileError> {
        let name = resolved_name(fragment, fallback_name)?;
        let config: IntegerConfig = config_from_schema(fragment, &name)?;
        Self::from_config(name, config, true, false)
    }

    pub fn build_numeric_string(
        fragment: &Value,
        fallback_name: &str,
    ) -> Result<Self, CompileError> {
        let name = resolved_name(fragment, fallback_name)?;
        let config: IntegerConfig = config_from_schema(fragment, &name)?;
        Self::from_config(name, config, false, true)
    }

    /// Collapse the two `anyOf` branches into one fragment (later branch
    /// wins per key) and build a numeric-string generator that also accepts
    /// plain numbers.
    pub fn build_integer_or_string(
        fragment: &Value,
        fallback_name: &str,
    ) -> Result<Self, CompileError> {
        let mut combined = Map::new();
        if let Some(map) = fragment.as_object() {
            for (key, value) in map {
                if key != "anyOf" {
                    combined.insert(key.clone(), value.clone());
                }
            }
        }
        if let Some(branches) = fragment.get("anyOf").and_then(Value::as_array) {
            for branch in branches {
                if let Some(map) = branch.as_object() {
                    for (key, value) in map {
                        combined.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        combined.insert("type".to_string(), Value::from("string"));
        let combined = Value::Object(combined);

        let name = resolved_name(&combined, fallback_name)?;
        let config: IntegerConfig = config_from_schema(&combined, &name)?;
        Self::from_config(name, config, true, true)
    }

    fn from_config(
        name: String,
        mut config: IntegerConfig,
        number_allowed: bool,
        string_allowed: bool,
    ) -> Result<Self, CompileError> {
        // An unprefixed (unsigned) pattern implies a non-negative range.
        if string_allowed
            && config.minimum.is_none()
            && config
                .pattern
                .as_deref()
                .is_some_and(|p| unsigned_radix_for(p).is_some())
        {
            config.minimum = Some(0);
        }

        let (unsigned, width) = match config.s2c_type.as_deref() {
            Some(type_name) => {
                parse_stdint_name(type_name).ok_or_else(|| CompileError::UnsupportedIntegerType {
                    name: type_name.to_string(),
                })?
            }
            None => (config.minimum.is_some_and(|m| m >= 0), IntWidth::W64),
        };
        if unsigned && config.minimum == Some(0) {
            config.minimum = None;
        }

        let radix = if string_allowed {
            let radix_for: fn(&str) -> Option<u32> = if unsigned {
                unsigned_radix_for
            } else {
                signed_radix_for
            };
            match config.pattern.as_deref().and_then(radix_for) {
                Some(radix) => radix,
                None => {
                    let valid: Vec<String> = if unsigned {
                        UNSIGNED_PATTERNS
                            .iter()
                            .map(|(p, _)| format!("\"{p}\""))
                            .collect()
                    } else {
                        SIGNED_PATTERNS
                            .iter()
                            .map(|(p, _)| format!("\"{p}\""))
                            .collect()
                    };
                    return Err(CompileError::UnsupportedPattern {
                        pattern: config.pattern.unwrap_or_else(|| "(none)".to_string()),
                        valid: valid.join(", "),
                    });
                }
            }
        } else {
            10
        };

        let type_name = match config.s2c_type {
            Some(type_name) => type_name,
            None if unsigned => "uint64_t".to_string(),
            None => "int64_t".to_string(),
        };
        let c_type = Rc::new(CType::new(
            type_name,
            config.description,
            CShape::Integer { unsigned, width },
        ));

        let default = match config.default {
            None => None,
            Some(IntegerDefault::Number(n)) => Some(n),
            Some(IntegerDefault::Text(text)) => {
                if !string_allowed {
                    return Err(CompileError::BadDefault {
                        name,
                        detail: format!("integer default must be a number, got \"{text}\""),
                    });
                }
                Some(parse_int_with_radix(&text, radix).ok_or_else(|| {
                    CompileError::BadDefault {
                        name: name.clone(),
                        detail: format!("\"{text}\" is not an integer in the declared pattern's radix"),
                    }
                })?)
            }
        };

        let generator = Self {
            name,
            c_type,
            unsigned,
            minimum: config.minimum,
            maximum: config.maximum,
            exclusive_minimum: config.exclusive_minimum,
            exclusive_maximum: config.exclusive_maximum,
            default,
            override_default: config.s2c_default,
            number_allowed,
            string_allowed,
            radix,
        };
        generator.check_default_bounds()?;
        Ok(generator)
    }

    fn check_default_bounds(&self) -> Result<(), CompileError> {
        let Some(default) = self.default else {
            return Ok(());
        };
        if self.unsigned && default < 0 {
            return Err(CompileError::BadDefault {
                name: self.name.clone(),
                detail: format!("{default} is negative but the type is unsigned"),
            });
        }
        let checks: [(Option<i64>, &str, fn(i64, i64) -> bool); 4] = [
            (self.minimum, ">=", |d, b| d >= b),
            (self.maximum, "<=", |d, b| d <= b),
            (self.exclusive_minimum, ">", |d, b| d > b),
            (self.exclusive_maximum, "<", |d, b| d < b),
        ];
        for (bound, operator, holds) in checks {
            if let Some(bound) = bound {
                if !holds(default, bound) {
                    return Err(CompileError::BadDefault {
                        name: self.name.clone(),
                        detail: format!("{default} must be {operator} {bound}"),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn c_type(&self) -> &Rc<CType> {
        &self.c_type
    }

    fn parser_fn(&self) -> &'static str {
        if self.unsigned {
            "builtin_parse_unsigned"
        } else {
            "builtin_parse_signed"
        }
    }

    fn parsed_type(&self) -> &'static str {
        if self.unsigned { "uint64_t" } else { "int64_t" }
    }

    fn printf_macro(&self) -> &'static str {
        if self.unsigned { "PRIu64" } else { "PRIi64" }
    }

    fn default_suffix(&self) -> &'static str {
        if self.unsigned { "ULL" } else { "LL" }
    }

    fn emit_range_check(&self, bound: Option<i64>, operator: &str, w: &mut CodeWriter) {
        let Some(bound) = bound else { return };
        w.block(&format!("if (!(int_parse_tmp {operator} {bound}))"), |w| {
            // The value was consumed before it could be checked; roll back so
            // the report points at it.
            w.line("parse_state->current_token -= 1;");
            emit_logged_error(
                w,
                &format!(
                    "Integer %\" {} \" in '%s' out of range. It must be {operator} {bound}.",
                    self.printf_macro()
                ),
                &["int_parse_tmp", "parse_state->current_key"],
            );
        });
    }

    pub fn emit_parser_call(&self, target: &str, w: &mut CodeWriter) {
        w.line(format!("{} int_parse_tmp;", self.parsed_type()));
        w.block(
            &format!(
                "if ({}(parse_state, {}, {}, {}, &int_parse_tmp))",
                self.parser_fn(),
                self.number_allowed,
                self.string_allowed,
                self.radix
            ),
            |w| {
                w.line("return true;");
            },
        );
        self.emit_range_check(self.minimum, ">=", w);
        self.emit_range_check(self.maximum, "<=", w);
        self.emit_range_check(self.exclusive_minimum, ">", w);
        self.emit_range_check(self.exclusive_maximum, "<", w);
        w.line(format!("*{target} = int_parse_tmp;"));
    }

    pub fn has_default(&self) -> bool {
        self.override_default.is_some() || self.default.is_some()
    }

    pub fn emit_set_default(&self, target: &str, w: &mut CodeWriter) {
        if let Some(value) = &self.override_default {
            emit_override_default(w, target, value);
            return;
        }
        if let Some(default) = self.default {
            w.line(format!("{target} = {default}{};", self.default_suffix()));
        }
    }

    pub fn max_token_count(&self) -> u64 {
        1
    }
}

/// Compile-time counterpart of the emitted strtoll call: radix 0 resolves
/// through the literal's own prefix.
fn parse_int_with_radix(text: &str, radix: u32) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (digits, radix) = if radix == 0 {
        if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            (hex, 16)
        } else if digits.len() > 1 && digits.starts_with('0') {
            (&digits[1..], 8)
        } else {
            (digits, 10)
        }
    } else if radix == 16 {
        let hex = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        (hex, 16)
    } else {
        (digits, radix)
    };
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
