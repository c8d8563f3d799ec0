//! Floating point generator: a `double` with up to four range comparisons.
//!
//! On a range failure the consumed token is rolled back before reporting, so
//! the error message can point at the raw value again.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use crate::codegen::base::{
    c_double_literal, config_from_schema, emit_logged_error, emit_override_default, resolved_name,
};
use crate::ctype::{CShape, CType};
use crate::emit::CodeWriter;
use crate::error::CompileError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloatConfig {
    description: Option<String>,
    s2c_default: Option<Value>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    exclusive_minimum: Option<f64>,
    exclusive_maximum: Option<f64>,
    default: Option<f64>,
}

#[derive(Debug)]
pub struct FloatGenerator {
    name: String,
    c_type: Rc<CType>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    exclusive_minimum: Option<f64>,
    exclusive_maximum: Option<f64>,
    default: Option<f64>,
    override_default: Option<Value>,
}

impl FloatGenerator {
    pub fn matches(fragment: &Value) -> bool {
        fragment.get("type").and_then(Value::as_str) == Some("number")
    }

    pub fn build(fragment: &Value, fallback_name: &str) -> Result<Self, CompileError> {
        let name = resolved_name(fragment, fallback_name)?;
        let config: FloatConfig = config_from_schema(fragment, &name)?;
        let generator = Self {
            c_type: Rc::new(CType::new("double", config.description, CShape::Double)),
            minimum: config.minimum,
            maximum: config.maximum,
            exclusive_minimum: config.exclusive_minimum,
            exclusive_maximum: config.exclusive_maximum,
            default: config.default,
            override_default: config.s2c_default,
            name,
        };
        generator.check_default_bounds()?;
        Ok(generator)
    }

    fn check_default_bounds(&self) -> Result<(), CompileError> {
        let Some(default) = self.default else {
            return Ok(());
        };
        let checks: [(Option<f64>, &str, fn(f64, f64) -> bool); 4] = [
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

    fn emit_range_check(bound: Option<f64>, target: &str, operator: &str, w: &mut CodeWriter) {
        let Some(bound) = bound else { return };
        let bound = c_double_literal(bound);
        w.block(&format!("if (!((*{target}) {operator} {bound}))"), |w| {
            // The value was consumed before it could be checked; roll back so
            // the report points at it.
            w.line("parse_state->current_token -= 1;");
            emit_logged_error(
                w,
                &format!(
                    "Floating point value %.15g in '%s' out of range. It must be {operator} {bound}."
                ),
                &[&format!("(*{target})"), "parse_state->current_key"],
            );
        });
    }

    pub fn emit_parser_call(&self, target: &str, w: &mut CodeWriter) {
        w.block(
            &format!("if (builtin_parse_double(parse_state, {target}))"),
            |w| {
                w.line("return true;");
            },
        );
        Self::emit_range_check(self.minimum, target, ">=", w);
        Self::emit_range_check(self.maximum, target, "<=", w);
        Self::emit_range_check(self.exclusive_minimum, target, ">", w);
        Self::emit_range_check(self.exclusive_maximum, target, "<", w);
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
            w.line(format!("{target} = {};", c_double_literal(default)));
        }
    }

    pub fn max_token_count(&self) -> u64 {
        1
    }
}
