//! Generator tree: one variant per schema shape, built by ordered dispatch.
//!
//! The dispatch order is a design decision, not an accident of declaration
//! order: an enum is `type: string` plus an `enum` list, so Enum must be
//! tried before String; a numeric string is `type: string` plus a pattern,
//! so it goes before String too; the integer-or-string combinator must win
//! over plain Integer; and all scalar forms are tried before the container
//! forms so recursive fragments cannot be misclassified. First match wins;
//! no match is fatal.

pub mod base;

pub mod array;
pub mod boolean;
pub mod enums;
pub mod float;
pub mod integer;
pub mod object;
pub mod root;
pub mod string;

use std::rc::Rc;

use serde_json::Value;

use crate::ctype::{CType, TypeCache};
use crate::emit::CodeWriter;
use crate::error::CompileError;
use crate::settings::Settings;

pub use array::ArrayGenerator;
pub use boolean::BoolGenerator;
pub use enums::EnumGenerator;
pub use float::FloatGenerator;
pub use integer::IntegerGenerator;
pub use object::ObjectGenerator;
pub use string::StringGenerator;

/// State threaded through one factory-driven tree build. The cache is the
/// only shared mutable state of a compilation run besides the sink.
pub struct BuildContext<'s> {
    pub settings: &'s Settings,
    pub cache: TypeCache,
}

impl<'s> BuildContext<'s> {
    pub fn new(settings: &'s Settings) -> Self {
        Self {
            settings,
            cache: TypeCache::default(),
        }
    }
}

#[derive(Debug)]
pub enum Generator {
    Enum(EnumGenerator),
    NumericString(IntegerGenerator),
    IntegerOrString(IntegerGenerator),
    String(StringGenerator),
    Integer(IntegerGenerator),
    Float(FloatGenerator),
    Bool(BoolGenerator),
    Object(ObjectGenerator),
    Array(ArrayGenerator),
}

/// Ordered dispatch from a schema fragment to the generator responsible for
/// it. `fallback_name` is the parent-derived name used when the fragment has
/// no `$id` of its own.
pub fn build_generator(
    fragment: &Value,
    fallback_name: &str,
    ctx: &mut BuildContext<'_>,
) -> Result<Generator, CompileError> {
    if EnumGenerator::matches(fragment) {
        return Ok(Generator::Enum(EnumGenerator::build(
            fragment,
            fallback_name,
            &mut ctx.cache,
        )?));
    }
    if IntegerGenerator::matches_numeric_string(fragment) {
        return Ok(Generator::NumericString(
            IntegerGenerator::build_numeric_string(fragment, fallback_name)?,
        ));
    }
    if IntegerGenerator::matches_integer_or_string(fragment) {
        return Ok(Generator::IntegerOrString(
            IntegerGenerator::build_integer_or_string(fragment, fallback_name)?,
        ));
    }
    if StringGenerator::matches(fragment) {
        return Ok(Generator::String(StringGenerator::build(
            fragment,
            fallback_name,
            &mut ctx.cache,
        )?));
    }
    if IntegerGenerator::matches_integer(fragment) {
        return Ok(Generator::Integer(IntegerGenerator::build_integer(
            fragment,
            fallback_name,
        )?));
    }
    if FloatGenerator::matches(fragment) {
        return Ok(Generator::Float(FloatGenerator::build(
            fragment,
            fallback_name,
        )?));
    }
    if BoolGenerator::matches(fragment) {
        return Ok(Generator::Bool(BoolGenerator::build(
            fragment,
            fallback_name,
        )?));
    }
    if ObjectGenerator::matches(fragment) {
        return Ok(Generator::Object(ObjectGenerator::build(
            fragment,
            fallback_name,
            ctx,
        )?));
    }
    if ArrayGenerator::matches(fragment) {
        return Ok(Generator::Array(ArrayGenerator::build(
            fragment,
            fallback_name,
            ctx,
        )?));
    }
    Err(CompileError::NoGenerator {
        fragment: fragment.to_string(),
    })
}

impl Generator {
    pub fn c_type(&self) -> &Rc<CType> {
        match self {
            Generator::Enum(g) => g.c_type(),
            Generator::NumericString(g) | Generator::IntegerOrString(g) | Generator::Integer(g) => {
                g.c_type()
            }
            Generator::String(g) => g.c_type(),
            Generator::Float(g) => g.c_type(),
            Generator::Bool(g) => g.c_type(),
            Generator::Object(g) => g.c_type(),
            Generator::Array(g) => g.c_type(),
        }
    }

    /// Emit this generator's type declaration, dependencies first.
    /// Idempotent per interned descriptor.
    pub fn emit_type_declaration(&self, w: &mut CodeWriter) {
        self.c_type().emit_declaration(w);
    }

    /// Emit code that parses one instance into `target`, or reports and
    /// fails. Fail-fast: the first violation aborts the whole parse.
    pub fn emit_parser_call(&self, target: &str, w: &mut CodeWriter) {
        match self {
            Generator::Enum(g) => g.emit_parser_call(target, w),
            Generator::NumericString(g) | Generator::IntegerOrString(g) | Generator::Integer(g) => {
                g.emit_parser_call(target, w)
            }
            Generator::String(g) => g.emit_parser_call(target, w),
            Generator::Float(g) => g.emit_parser_call(target, w),
            Generator::Bool(g) => g.emit_parser_call(target, w),
            Generator::Object(g) => g.emit_parser_call(target, w),
            Generator::Array(g) => g.emit_parser_call(target, w),
        }
    }

    /// Emit the parse function bodies this generator needs, children first.
    /// Scalar variants parse inline and contribute nothing here.
    pub fn emit_parser_bodies(&self, w: &mut CodeWriter) {
        match self {
            Generator::Enum(g) => g.emit_parser_bodies(w),
            Generator::Object(g) => g.emit_parser_bodies(w),
            Generator::Array(g) => g.emit_parser_bodies(w),
            Generator::NumericString(_)
            | Generator::IntegerOrString(_)
            | Generator::Integer(_)
            | Generator::String(_)
            | Generator::Float(_)
            | Generator::Bool(_) => {}
        }
    }

    pub fn has_default(&self) -> bool {
        match self {
            Generator::Enum(g) => g.has_default(),
            Generator::NumericString(g) | Generator::IntegerOrString(g) | Generator::Integer(g) => {
                g.has_default()
            }
            Generator::String(g) => g.has_default(),
            Generator::Float(g) => g.has_default(),
            Generator::Bool(g) => g.has_default(),
            Generator::Object(g) => g.has_default(),
            Generator::Array(g) => g.has_default(),
        }
    }

    pub fn emit_set_default(&self, target: &str, w: &mut CodeWriter) {
        match self {
            Generator::Enum(g) => g.emit_set_default(target, w),
            Generator::NumericString(g) | Generator::IntegerOrString(g) | Generator::Integer(g) => {
                g.emit_set_default(target, w)
            }
            Generator::String(g) => g.emit_set_default(target, w),
            Generator::Float(g) => g.emit_set_default(target, w),
            Generator::Bool(g) => g.emit_set_default(target, w),
            Generator::Object(g) => g.emit_set_default(target, w),
            Generator::Array(g) => g.emit_set_default(target, w),
        }
    }

    /// Static upper bound on tokens one instance can consume. Exact for a
    /// maximally packed instance; the external tokenizer's buffer is sized
    /// from it.
    pub fn max_token_count(&self) -> u64 {
        match self {
            Generator::Enum(g) => g.max_token_count(),
            Generator::NumericString(g) | Generator::IntegerOrString(g) | Generator::Integer(g) => {
                g.max_token_count()
            }
            Generator::String(g) => g.max_token_count(),
            Generator::Float(g) => g.max_token_count(),
            Generator::Bool(g) => g.max_token_count(),
            Generator::Object(g) => g.max_token_count(),
            Generator::Array(g) => g.max_token_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(fragment: Value, settings: &Settings) -> Result<Generator, CompileError> {
        let mut ctx = BuildContext::new(settings);
        build_generator(&fragment, "root", &mut ctx)
    }

    fn build_default(fragment: Value) -> Result<Generator, CompileError> {
        build(fragment, &Settings::default())
    }

    #[test]
    fn enum_wins_over_plain_string() {
        let generator = build_default(json!({
            "type": "string",
            "enum": ["a", "b"],
            "maxLength": 8
        }))
        .unwrap();
        assert!(matches!(generator, Generator::Enum(_)));
    }

    #[test]
    fn numeric_string_wins_over_plain_string() {
        let generator = build_default(json!({
            "type": "string",
            "pattern": "[0-9]+",
            "maxLength": 8
        }))
        .unwrap();
        assert!(matches!(generator, Generator::NumericString(_)));
    }

    #[test]
    fn a_custom_parse_hook_demotes_a_numeric_pattern_to_plain_string() {
        let generator = build_default(json!({
            "type": "string",
            "pattern": "[0-9]+",
            "maxLength": 8,
            "s2cType": "digits_t",
            "s2cParseFunction": "parse_digits"
        }))
        .unwrap();
        assert!(matches!(generator, Generator::String(_)));
    }

    #[test]
    fn any_of_combinator_wins_over_its_branches() {
        let generator = build_default(json!({
            "anyOf": [
                {"type": "integer"},
                {"type": "string", "pattern": "[0-9]+"}
            ]
        }))
        .unwrap();
        assert!(matches!(generator, Generator::IntegerOrString(_)));
    }

    #[test]
    fn unknown_shapes_are_fatal() {
        let err = build_default(json!({"type": "null"})).unwrap_err();
        assert!(matches!(err, CompileError::NoGenerator { .. }));
        let err = build_default(json!({"oneOf": [{"type": "integer"}]})).unwrap_err();
        assert!(matches!(err, CompileError::NoGenerator { .. }));
    }

    #[test]
    fn names_derive_from_parent_and_field() {
        let generator = build_default(json!({
            "type": "object",
            "properties": {
                "pos": {
                    "type": "array",
                    "items": {"type": "integer"},
                    "maxItems": 2
                }
            },
            "required": ["pos"],
            "additionalProperties": false
        }))
        .unwrap();
        let mut w = CodeWriter::new();
        generator.emit_type_declaration(&mut w);
        let text = w.into_string();
        assert!(text.contains("typedef struct root_pos_s {"));
        assert!(text.contains("} root_pos_t;"));
        assert!(text.contains("root_pos_t pos;"));
    }

    #[test]
    fn shared_ref_types_collapse_to_one_declaration() {
        // Two resolved copies of the same `$id`-bearing subtree intern to the
        // same descriptor and declare once.
        let generator = build_default(json!({
            "type": "object",
            "properties": {
                "home": {"$id": "#point", "type": "string", "maxLength": 15},
                "work": {"$id": "#point", "type": "string", "maxLength": 15}
            },
            "required": ["home", "work"],
            "additionalProperties": false
        }))
        .unwrap();
        let mut w = CodeWriter::new();
        generator.emit_type_declaration(&mut w);
        let text = w.into_string();
        assert_eq!(text.matches("typedef char point_t[16];").count(), 1);
        assert!(text.contains("point_t home;"));
        assert!(text.contains("point_t work;"));
    }

    #[test]
    fn same_name_with_different_shapes_is_a_naming_conflict() {
        let err = build_default(json!({
            "type": "object",
            "properties": {
                "a": {"$id": "#point", "type": "string", "maxLength": 15},
                "b": {"$id": "#point", "type": "string", "maxLength": 31}
            },
            "required": ["a", "b"],
            "additionalProperties": false
        }))
        .unwrap_err();
        assert!(matches!(err, CompileError::TypeNameConflict { .. }));
    }

    #[test]
    fn token_budget_composes_through_nesting() {
        let generator = build_default(json!({
            "type": "object",
            "properties": {
                "things": {
                    "type": "array",
                    "maxItems": 3,
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string", "maxLength": 8},
                            "coordinate": {"type": "integer"}
                        },
                        "required": ["name", "coordinate"],
                        "additionalProperties": false
                    }
                },
                "is_good": {"type": "boolean"}
            },
            "required": ["things", "is_good"],
            "additionalProperties": false
        }))
        .unwrap();
        // Inner object: (1+1) + (1+1) + 1 = 5; array: 3*5 + 1 = 16;
        // outer: (1+16) + (1+1) + 1 = 20.
        assert_eq!(generator.max_token_count(), 20);
    }
}
