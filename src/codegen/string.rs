//! String generator: a fixed-capacity NUL-terminated buffer.
//!
//! `maxLength` is mandatory — it sizes the buffer, and fixed memory is the
//! whole point. An external parse hook (`s2cParseFunction` + `s2cType`) can
//! take over interpretation of the raw text; defaults are routed through the
//! hook too, so a hook never sees values it did not vet.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use crate::codegen::base::{
    c_string_escape, config_from_schema, emit_logged_error, emit_override_default, resolved_name,
};
use crate::ctype::{CShape, CType, TypeCache};
use crate::emit::CodeWriter;
use crate::error::CompileError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StringConfig {
    description: Option<String>,
    s2c_default: Option<Value>,
    s2c_type: Option<String>,
    s2c_parse_function: Option<String>,
    #[serde(default)]
    min_length: u64,
    max_length: Option<u64>,
    default: Option<String>,
}

#[derive(Debug)]
pub struct StringGenerator {
    name: String,
    c_type: Rc<CType>,
    min_length: u64,
    max_length: u64,
    default: Option<String>,
    override_default: Option<Value>,
    parse_function: Option<String>,
}

impl StringGenerator {
    pub fn matches(fragment: &Value) -> bool {
        fragment.get("type").and_then(Value::as_str) == Some("string")
    }

    pub fn build(
        fragment: &Value,
        fallback_name: &str,
        cache: &mut TypeCache,
    ) -> Result<Self, CompileError> {
        let name = resolved_name(fragment, fallback_name)?;
        let config: StringConfig = config_from_schema(fragment, &name)?;

        let Some(max_length) = config.max_length else {
            return Err(CompileError::MissingBound {
                type_kind: "string",
                bound: "maxLength",
                name,
            });
        };

        if let Some(default) = &config.default {
            if default.len() as u64 > max_length {
                return Err(CompileError::BadDefault {
                    name,
                    detail: format!("\"{default}\" is longer than maxLength {max_length}"),
                });
            }
            if (default.len() as u64) < config.min_length {
                return Err(CompileError::BadDefault {
                    name,
                    detail: format!(
                        "\"{default}\" is shorter than minLength {}",
                        config.min_length
                    ),
                });
            }
        }

        let c_type = match &config.s2c_type {
            Some(type_name) => {
                if config.s2c_parse_function.is_none() {
                    return Err(CompileError::ParseFunctionRequired { name });
                }
                Rc::new(CType::new(
                    type_name.clone(),
                    config.description,
                    CShape::External,
                ))
            }
            None => cache.intern(CType::new(
                format!("{name}_t"),
                config.description,
                CShape::CharArray {
                    capacity: max_length + 1,
                },
            ))?,
        };

        Ok(Self {
            name,
            c_type,
            min_length: config.min_length,
            max_length,
            default: config.default,
            override_default: config.s2c_default,
            parse_function: config.s2c_parse_function,
        })
    }

    pub fn c_type(&self) -> &Rc<CType> {
        &self.c_type
    }

    fn emit_custom_parser_call(
        &self,
        parse_function: &str,
        source: &str,
        source_length: &str,
        target: &str,
        w: &mut CodeWriter,
    ) {
        w.line("const char *error = NULL;");
        w.block(
            &format!("if ({parse_function}({source}, {source_length}, {target}, &error))"),
            |w| {
                emit_logged_error(
                    w,
                    &format!("Error parsing {}, value=\\\"%.*s\\\": %s", self.name),
                    &[
                        source_length,
                        source,
                        &format!("error ? error : \"error calling {parse_function}\""),
                    ],
                );
            },
        );
        w.line("parse_state->current_token += 1;");
    }

    pub fn emit_parser_call(&self, target: &str, w: &mut CodeWriter) {
        match &self.parse_function {
            Some(parse_function) => self.emit_custom_parser_call(
                parse_function,
                "CURRENT_STRING(parse_state)",
                "CURRENT_STRING_LENGTH(parse_state)",
                target,
                w,
            ),
            None => {
                w.block(
                    &format!(
                        "if (builtin_parse_string(parse_state, {target}[0], {}, {}))",
                        self.min_length, self.max_length
                    ),
                    |w| {
                        w.line("return true;");
                    },
                );
            }
        }
    }

    pub fn has_default(&self) -> bool {
        self.override_default.is_some() || self.default.is_some()
    }

    pub fn emit_set_default(&self, target: &str, w: &mut CodeWriter) {
        if let Some(value) = &self.override_default {
            emit_override_default(w, target, value);
            return;
        }
        let Some(default) = &self.default else { return };
        match &self.parse_function {
            Some(parse_function) => {
                let literal = format!("\"{}\"", c_string_escape(default));
                self.emit_custom_parser_call(
                    parse_function,
                    &literal,
                    &default.len().to_string(),
                    &format!("&{target}"),
                    w,
                );
            }
            None => {
                w.line(format!(
                    "memcpy({target}, \"{}\", {});",
                    c_string_escape(default),
                    default.len() + 1
                ));
            }
        }
    }

    pub fn max_token_count(&self) -> u64 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn max_length_is_mandatory() {
        let mut cache = TypeCache::default();
        let err =
            StringGenerator::build(&json!({"type": "string"}), "name", &mut cache).unwrap_err();
        assert!(matches!(
            err,
            CompileError::MissingBound {
                bound: "maxLength",
                ..
            }
        ));
    }

    #[test]
    fn buffer_has_room_for_the_terminator() {
        let mut cache = TypeCache::default();
        let generator = StringGenerator::build(
            &json!({"type": "string", "maxLength": 8, "minLength": 4}),
            "name",
            &mut cache,
        )
        .unwrap();
        assert!(matches!(
            generator.c_type().shape,
            CShape::CharArray { capacity: 9 }
        ));
        let mut w = CodeWriter::new();
        generator.emit_parser_call("&out->name", &mut w);
        assert!(
            w.into_string()
                .contains("builtin_parse_string(parse_state, &out->name[0], 4, 8)")
        );
    }

    #[test]
    fn default_length_is_checked_both_ways() {
        let mut cache = TypeCache::default();
        let too_long = StringGenerator::build(
            &json!({"type": "string", "maxLength": 4, "default": "toolong"}),
            "name",
            &mut cache,
        )
        .unwrap_err();
        assert!(matches!(too_long, CompileError::BadDefault { .. }));

        let too_short = StringGenerator::build(
            &json!({"type": "string", "maxLength": 8, "minLength": 3, "default": "ok"}),
            "name",
            &mut cache,
        )
        .unwrap_err();
        assert!(matches!(too_short, CompileError::BadDefault { .. }));
    }

    #[test]
    fn default_is_memcpy_with_terminator() {
        let mut cache = TypeCache::default();
        let generator = StringGenerator::build(
            &json!({"type": "string", "maxLength": 4, "default": "ok"}),
            "name",
            &mut cache,
        )
        .unwrap();
        let mut w = CodeWriter::new();
        generator.emit_set_default("out->name", &mut w);
        assert_eq!(w.into_string(), "memcpy(out->name, \"ok\", 3);\n");
    }

    #[test]
    fn custom_hook_requires_its_type_and_takes_over_parsing() {
        let mut cache = TypeCache::default();
        let err = StringGenerator::build(
            &json!({"type": "string", "maxLength": 20, "s2cType": "ip_addr_t"}),
            "ip",
            &mut cache,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::ParseFunctionRequired { .. }));

        let generator = StringGenerator::build(
            &json!({
                "type": "string",
                "maxLength": 20,
                "s2cType": "ip_addr_t",
                "s2cParseFunction": "parse_ip_addr"
            }),
            "ip",
            &mut cache,
        )
        .unwrap();
        assert!(matches!(generator.c_type().shape, CShape::External));
        let mut w = CodeWriter::new();
        generator.emit_parser_call("&out->ip", &mut w);
        let text = w.into_string();
        assert!(text.contains(
            "if (parse_ip_addr(CURRENT_STRING(parse_state), CURRENT_STRING_LENGTH(parse_state), &out->ip, &error))"
        ));
        assert!(text.contains("error ? error : \"error calling parse_ip_addr\""));
    }
}
