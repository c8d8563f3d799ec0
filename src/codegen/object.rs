//! Object generator: a fixed struct of named fields.
//!
//! The emitted parser runs one pass over the key/value member slots. Every
//! field carries a seen flag (duplicates are an error), the current-key
//! context label is swapped in around the nested parse so nested error
//! messages name the right field, and unknown keys are either skipped or
//! fatal — a compile-time choice, not a per-instance one. After the member
//! loop, required checks and default injection run with the cursor moved
//! back to the object-start token so reports point at the object itself.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use crate::codegen::base::{
    config_from_schema, emit_logged_error, emit_override_default, ensure_identifier, resolved_name,
};
use crate::codegen::{BuildContext, Generator, build_generator};
use crate::ctype::{CShape, CType, StructField};
use crate::emit::CodeWriter;
use crate::error::CompileError;

fn default_additional_properties() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectConfig {
    description: Option<String>,
    s2c_default: Option<Value>,
    #[serde(default)]
    required: Vec<String>,
    #[serde(default = "default_additional_properties")]
    additional_properties: bool,
}

#[derive(Debug)]
pub struct ObjectGenerator {
    name: String,
    c_type: Rc<CType>,
    fields: Vec<(String, Generator)>,
    required: Vec<String>,
    override_default: Option<Value>,
    /// Compile-time generation setting: skip unknown members instead of
    /// failing on them.
    skip_unknown: bool,
}

impl ObjectGenerator {
    pub fn matches(fragment: &Value) -> bool {
        fragment.get("type").and_then(Value::as_str) == Some("object")
    }

    pub fn build(
        fragment: &Value,
        fallback_name: &str,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Self, CompileError> {
        let name = resolved_name(fragment, fallback_name)?;
        let config: ObjectConfig = config_from_schema(fragment, &name)?;

        let Some(properties) = fragment.get("properties").and_then(Value::as_object) else {
            return Err(CompileError::MissingBound {
                type_kind: "object",
                bound: "properties",
                name,
            });
        };

        if config.additional_properties && ctx.settings.allow_additional_properties.is_none() {
            return Err(CompileError::AdditionalPropertiesNotAllowed { name });
        }

        let mut fields = Vec::with_capacity(properties.len());
        for (field_name, field_fragment) in properties {
            ensure_identifier(field_name)?;
            let generator =
                build_generator(field_fragment, &format!("{name}_{field_name}"), ctx)?;
            fields.push((field_name.clone(), generator));
        }

        for (field_name, generator) in &fields {
            if !generator.has_default() && !config.required.iter().any(|r| r == field_name) {
                return Err(CompileError::FieldNeitherRequiredNorDefaulted {
                    type_name: name,
                    field: field_name.clone(),
                });
            }
        }

        let c_type = ctx.cache.intern(CType::new(
            format!("{name}_t"),
            config.description,
            CShape::Struct {
                fields: fields
                    .iter()
                    .map(|(field_name, generator)| StructField {
                        name: field_name.clone(),
                        ty: Rc::clone(generator.c_type()),
                    })
                    .collect(),
            },
        ))?;

        Ok(Self {
            name,
            c_type,
            fields,
            required: config.required,
            override_default: config.s2c_default,
            skip_unknown: ctx.settings.allow_additional_properties.is_some(),
        })
    }

    pub fn c_type(&self) -> &Rc<CType> {
        &self.c_type
    }

    pub fn emit_parser_call(&self, target: &str, w: &mut CodeWriter) {
        w.block(
            &format!("if (parse_{}(parse_state, {target}))", self.name),
            |w| {
                w.line("return true;");
            },
        );
    }

    /// A key token must own exactly one child: zero means a dangling key,
    /// more than one means a missing separator glued two values together.
    fn emit_key_children_checks(w: &mut CodeWriter) {
        w.block("if (CURRENT_TOKEN(parse_state).size > 1)", |w| {
            emit_logged_error(
                w,
                "Missing separator between values in '%s', after key: %.*s",
                &[
                    "parse_state->current_key",
                    "CURRENT_STRING_FOR_ERROR(parse_state)",
                ],
            );
        });
        w.block("if (CURRENT_TOKEN(parse_state).size < 1)", |w| {
            emit_logged_error(
                w,
                "Missing value in '%s', after key: %.*s",
                &[
                    "parse_state->current_key",
                    "CURRENT_STRING_FOR_ERROR(parse_state)",
                ],
            );
        });
    }

    fn emit_member_loop_body(&self, w: &mut CodeWriter) {
        Self::emit_key_children_checks(w);
        let mut chain = w.chain();
        for (field_name, generator) in &self.fields {
            chain.case(
                &format!("if (current_string_is(parse_state, \"{field_name}\"))"),
                |w| {
                    w.block(&format!("if (seen_{field_name})"), |w| {
                        emit_logged_error(
                            w,
                            &format!("Duplicate field definition in '%s': {field_name}"),
                            &["parse_state->current_key"],
                        );
                    });
                    w.line(format!("seen_{field_name} = true;"));
                    w.line("parse_state->current_token += 1;");
                    w.line("const char* saved_key = parse_state->current_key;");
                    w.line(format!("parse_state->current_key = \"{field_name}\";"));
                    generator.emit_parser_call(&format!("&out->{field_name}"), w);
                    w.line("parse_state->current_key = saved_key;");
                },
            );
        }
        chain.tail(|w| {
            if self.skip_unknown {
                w.line("parse_state->current_token += 1;");
                w.block("if (builtin_skip(parse_state))", |w| {
                    w.line("return true;");
                });
            } else {
                emit_logged_error(
                    w,
                    "Unknown field in '%s': %.*s",
                    &[
                        "parse_state->current_key",
                        "CURRENT_STRING_FOR_ERROR(parse_state)",
                    ],
                );
            }
        });
    }

    pub fn emit_parser_bodies(&self, w: &mut CodeWriter) {
        for (_, generator) in &self.fields {
            generator.emit_parser_bodies(w);
        }

        w.block(
            &format!(
                "static bool parse_{}(parse_state_t *parse_state, {} *out)",
                self.name, self.c_type
            ),
            |w| {
                w.block("if (check_type(parse_state, JSMN_OBJECT))", |w| {
                    w.line("return true;");
                });
                for (field_name, _) in &self.fields {
                    w.line(format!("bool seen_{field_name} = false;"));
                }
                w.line("const int object_start_token = parse_state->current_token;");
                w.line(
                    "const uint64_t n = parse_state->tokens[parse_state->current_token].size;",
                );
                w.line("parse_state->current_token += 1;");
                w.block("for (uint64_t i = 0; i < n; ++i)", |w| {
                    self.emit_member_loop_body(w);
                });

                // Required checks and default setting both read CURRENT_TOKEN,
                // which may sit past the member list here; report at the
                // object start instead.
                w.line("const int saved_current_token = parse_state->current_token;");
                w.line("parse_state->current_token = object_start_token;");
                for (field_name, generator) in &self.fields {
                    if generator.has_default() {
                        continue;
                    }
                    w.block(&format!("if (!seen_{field_name})"), |w| {
                        emit_logged_error(
                            w,
                            &format!("Missing required field in '%s': {field_name}"),
                            &["parse_state->current_key"],
                        );
                    });
                }
                for (field_name, generator) in &self.fields {
                    if !generator.has_default() {
                        continue;
                    }
                    w.block(&format!("if (!seen_{field_name})"), |w| {
                        generator.emit_set_default(&format!("out->{field_name}"), w);
                    });
                }
                w.line("parse_state->current_token = saved_current_token;");
                w.line("return false;");
            },
        );
        w.blank();
    }

    pub fn has_default(&self) -> bool {
        if self.override_default.is_some() {
            return true;
        }
        self.required.is_empty()
            && self
                .fields
                .iter()
                .all(|(_, generator)| generator.has_default())
    }

    pub fn emit_set_default(&self, target: &str, w: &mut CodeWriter) {
        if let Some(value) = &self.override_default {
            emit_override_default(w, target, value);
            return;
        }
        for (field_name, generator) in &self.fields {
            generator.emit_set_default(&format!("{target}.{field_name}"), w);
        }
    }

    /// One token per key plus whatever each value needs, plus the object's
    /// own token.
    pub fn max_token_count(&self) -> u64 {
        self.fields
            .iter()
            .map(|(_, generator)| 1 + generator.max_token_count())
            .sum::<u64>()
            + 1
    }

    #[cfg(test)]
    pub(crate) fn required_for_tests(&self) -> &[String] {
        &self.required
    }
}
