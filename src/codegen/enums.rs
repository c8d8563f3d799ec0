//! Enum generator: a closed label set over string sources.
//!
//! The emitted parser matches the raw source strings linearly in declaration
//! order, first match wins. Labels are derived from the sources: camelCase
//! and digit boundaries split to `_`, uppercased, prefixed with the type
//! name, and anything that is not a C identifier character becomes `_`.
//! `convertLabelsToSnakeCase: false` skips only the case conversion; the
//! prefix and the sanitizing always apply.

use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::codegen::base::{
    c_string_escape, config_from_schema, emit_logged_error, emit_override_default, resolved_name,
};
use crate::ctype::{CShape, CType, TypeCache};
use crate::emit::CodeWriter;
use crate::error::CompileError;

static SANITIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^A-Za-z0-9_]").expect("sanitize regex"));

fn default_convert() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnumConfig {
    description: Option<String>,
    s2c_default: Option<Value>,
    #[serde(rename = "enum")]
    labels: Vec<String>,
    default: Option<String>,
    #[serde(default = "default_convert")]
    convert_labels_to_snake_case: bool,
}

#[derive(Debug)]
pub struct EnumGenerator {
    name: String,
    c_type: Rc<CType>,
    sources: Vec<String>,
    convert: bool,
    default: Option<String>,
    override_default: Option<Value>,
}

/// Split camelCase and letter/digit boundaries with `_`, then uppercase.
fn snake_upper(label: &str) -> String {
    let mut out = String::with_capacity(label.len() + 4);
    let mut previous: Option<char> = None;
    for c in label.chars() {
        if let Some(p) = previous {
            let boundary = (p.is_ascii_lowercase() && c.is_ascii_uppercase())
                || (p.is_ascii_digit() && c.is_ascii_alphabetic())
                || (p.is_ascii_alphabetic() && c.is_ascii_digit());
            if boundary {
                out.push('_');
            }
        }
        out.push(c);
        previous = Some(c);
    }
    out.to_uppercase()
}

impl EnumGenerator {
    pub fn matches(fragment: &Value) -> bool {
        fragment.get("type").and_then(Value::as_str) == Some("string")
            && fragment.get("enum").is_some()
    }

    pub fn build(
        fragment: &Value,
        fallback_name: &str,
        cache: &mut TypeCache,
    ) -> Result<Self, CompileError> {
        let name = resolved_name(fragment, fallback_name)?;
        let config: EnumConfig = config_from_schema(fragment, &name)?;
        if config.labels.is_empty() {
            return Err(CompileError::EmptyEnum { name });
        }
        if let Some(default) = &config.default {
            if !config.labels.contains(default) {
                return Err(CompileError::EnumDefaultNotALabel {
                    name,
                    default: default.clone(),
                });
            }
        }

        let convert = config.convert_labels_to_snake_case;
        let converted: Vec<String> = config
            .labels
            .iter()
            .map(|source| convert_label(&name, source, convert))
            .collect();
        let c_type = cache.intern(CType::new(
            format!("{name}_t"),
            config.description,
            CShape::Enum { labels: converted },
        ))?;

        Ok(Self {
            name,
            c_type,
            sources: config.labels,
            convert,
            default: config.default,
            override_default: config.s2c_default,
        })
    }

    pub fn c_type(&self) -> &Rc<CType> {
        &self.c_type
    }

    fn converted_label(&self, source: &str) -> String {
        convert_label(&self.name, source, self.convert)
    }

    pub fn emit_parser_call(&self, target: &str, w: &mut CodeWriter) {
        w.block(
            &format!("if (parse_{}(parse_state, {target}))", self.name),
            |w| {
                w.line("return true;");
            },
        );
    }

    pub fn emit_parser_bodies(&self, w: &mut CodeWriter) {
        w.block(
            &format!(
                "static bool parse_{}(parse_state_t *parse_state, {} *out)",
                self.name, self.c_type
            ),
            |w| {
                w.block("if (check_type(parse_state, JSMN_STRING))", |w| {
                    w.line("return true;");
                });
                let mut chain = w.chain();
                for source in &self.sources {
                    let label = self.converted_label(source);
                    chain.case(
                        &format!(
                            "if (current_string_is(parse_state, \"{}\"))",
                            c_string_escape(source)
                        ),
                        |w| {
                            w.line(format!("*out = {label};"));
                        },
                    );
                }
                chain.tail(|w| {
                    emit_logged_error(
                        w,
                        "Unknown enum value in '%s': %.*s",
                        &[
                            "parse_state->current_key",
                            "CURRENT_STRING_FOR_ERROR(parse_state)",
                        ],
                    );
                });
                w.line("parse_state->current_token += 1;");
                w.line("return false;");
            },
        );
        w.blank();
    }

    pub fn has_default(&self) -> bool {
        self.override_default.is_some() || self.default.is_some()
    }

    pub fn emit_set_default(&self, target: &str, w: &mut CodeWriter) {
        if let Some(value) = &self.override_default {
            emit_override_default(w, target, value);
            return;
        }
        if let Some(default) = &self.default {
            w.line(format!("{target} = {};", self.converted_label(default)));
        }
    }

    pub fn max_token_count(&self) -> u64 {
        1
    }
}

fn convert_label(type_name: &str, source: &str, convert: bool) -> String {
    let body = if convert {
        snake_upper(source)
    } else {
        source.to_string()
    };
    let prefixed = format!("{}_{}", type_name.to_uppercase(), body);
    SANITIZE_RE.replace_all(&prefixed, "_").into_owned()
}
