//! Boolean generator: a 1-bit flag with a type check and nothing else.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use crate::codegen::base::{config_from_schema, emit_override_default, resolved_name};
use crate::ctype::{CShape, CType};
use crate::emit::CodeWriter;
use crate::error::CompileError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoolConfig {
    description: Option<String>,
    s2c_default: Option<Value>,
    default: Option<bool>,
}

#[derive(Debug)]
pub struct BoolGenerator {
    c_type: Rc<CType>,
    default: Option<bool>,
    override_default: Option<Value>,
}

impl BoolGenerator {
    pub fn matches(fragment: &Value) -> bool {
        fragment.get("type").and_then(Value::as_str) == Some("boolean")
    }

    pub fn build(fragment: &Value, fallback_name: &str) -> Result<Self, CompileError> {
        let name = resolved_name(fragment, fallback_name)?;
        let config: BoolConfig = config_from_schema(fragment, &name)?;
        let c_type = Rc::new(CType::new("bool", config.description, CShape::Bool));
        Ok(Self {
            c_type,
            default: config.default,
            override_default: config.s2c_default,
        })
    }

    pub fn c_type(&self) -> &Rc<CType> {
        &self.c_type
    }

    pub fn emit_parser_call(&self, target: &str, w: &mut CodeWriter) {
        w.block(&format!("if (builtin_parse_bool(parse_state, {target}))"), |w| {
            w.line("return true;");
        });
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
            w.line(format!("{target} = {default};"));
        }
    }

    pub fn max_token_count(&self) -> u64 {
        1
    }
}
