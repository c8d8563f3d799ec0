//! Array generator: a fixed-capacity item buffer plus an element count.
//!
//! `maxItems` is mandatory — it sizes the buffer. Element count is validated
//! against both bounds before any element parses, so a too-long input never
//! writes past the buffer.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use crate::codegen::base::{
    config_from_schema, emit_logged_error, emit_override_default, resolved_name,
};
use crate::codegen::{BuildContext, Generator, build_generator};
use crate::ctype::{CShape, CType};
use crate::emit::CodeWriter;
use crate::error::CompileError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArrayConfig {
    description: Option<String>,
    s2c_default: Option<Value>,
    #[serde(default)]
    min_items: u64,
    max_items: Option<u64>,
}

#[derive(Debug)]
pub struct ArrayGenerator {
    name: String,
    c_type: Rc<CType>,
    min_items: u64,
    max_items: u64,
    item: Box<Generator>,
    override_default: Option<Value>,
}

impl ArrayGenerator {
    pub fn matches(fragment: &Value) -> bool {
        fragment.get("type").and_then(Value::as_str) == Some("array")
    }

    pub fn build(
        fragment: &Value,
        fallback_name: &str,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Self, CompileError> {
        let name = resolved_name(fragment, fallback_name)?;
        let config: ArrayConfig = config_from_schema(fragment, &name)?;
        let Some(max_items) = config.max_items else {
            return Err(CompileError::MissingBound {
                type_kind: "array",
                bound: "maxItems",
                name,
            });
        };
        let Some(item_fragment) = fragment.get("items") else {
            return Err(CompileError::MissingBound {
                type_kind: "array",
                bound: "items",
                name,
            });
        };

        let item = build_generator(item_fragment, &format!("{name}_item"), ctx)?;
        let c_type = ctx.cache.intern(CType::new(
            format!("{name}_t"),
            config.description,
            CShape::FixedArray {
                item: Rc::clone(item.c_type()),
                max_items,
            },
        ))?;

        Ok(Self {
            name,
            c_type,
            min_items: config.min_items,
            max_items,
            item: Box::new(item),
            override_default: config.s2c_default,
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

    fn emit_range_checks(&self, w: &mut CodeWriter) {
        w.block(&format!("if (n > {})", self.max_items), |w| {
            emit_logged_error(
                w,
                &format!(
                    "Array '%s' too large. Length: %i. Maximum length: {}.",
                    self.max_items
                ),
                &["parse_state->current_key", "n"],
            );
        });
        if self.min_items > 0 {
            w.block(&format!("if (n < {})", self.min_items), |w| {
                emit_logged_error(
                    w,
                    &format!(
                        "Array '%s' too small. Length: %i. Minimum length: {}.",
                        self.min_items
                    ),
                    &["parse_state->current_key", "n"],
                );
            });
        }
    }

    pub fn emit_parser_bodies(&self, w: &mut CodeWriter) {
        self.item.emit_parser_bodies(w);

        w.block(
            &format!(
                "static bool parse_{}(parse_state_t *parse_state, {} *out)",
                self.name, self.c_type
            ),
            |w| {
                w.block("if (check_type(parse_state, JSMN_ARRAY))", |w| {
                    w.line("return true;");
                });
                w.line("const int n = parse_state->tokens[parse_state->current_token].size;");
                self.emit_range_checks(w);
                w.line("out->n = n;");
                w.line("parse_state->current_token += 1;");
                w.block("for (int i = 0; i < n; ++i)", |w| {
                    self.item.emit_parser_call("&out->items[i]", w);
                });
                w.line("return false;");
            },
        );
        w.blank();
    }

    pub fn has_default(&self) -> bool {
        self.override_default.is_some() || self.min_items == 0
    }

    pub fn emit_set_default(&self, target: &str, w: &mut CodeWriter) {
        if let Some(value) = &self.override_default {
            emit_override_default(w, target, value);
            return;
        }
        w.line(format!("{target}.n = 0;"));
    }

    pub fn max_token_count(&self) -> u64 {
        self.max_items * self.item.max_token_count() + 1
    }
}
