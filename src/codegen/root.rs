//! Whole-translation-unit assembly.
//!
//! Builds the generator tree for the resolved document and renders the two
//! output texts: a header with the type declarations, the token-count bound
//! and the parse prototype, and a source file with the parser bodies and the
//! `json_parse_<root>` driver. The driver's token buffer is sized by the
//! static budget plus whatever reserve the settings grant tolerated
//! additional properties.

use serde_json::Value;

use crate::codegen::base::ensure_identifier;
use crate::codegen::{BuildContext, Generator, build_generator};
use crate::ctype::CShape;
use crate::emit::CodeWriter;
use crate::error::CompileError;
use crate::settings::Settings;

const DEFAULT_BUILTINS_INCLUDE: &str = "s2c_builtins.h";

/// Caller-supplied text blobs spliced verbatim into the outputs.
#[derive(Debug, Clone, Default)]
pub struct Splices {
    pub h_prefix: Option<String>,
    pub h_postfix: Option<String>,
    pub c_prefix: Option<String>,
    pub c_postfix: Option<String>,
}

pub struct RootGenerator<'s> {
    name: String,
    root: Generator,
    settings: &'s Settings,
}

impl<'s> RootGenerator<'s> {
    pub fn new(schema: &Value, settings: &'s Settings) -> Result<Self, CompileError> {
        let Some(id) = schema.get("$id").and_then(Value::as_str) else {
            return Err(CompileError::MissingId);
        };
        let name = id.strip_prefix('#').unwrap_or(id).to_string();
        ensure_identifier(&name)?;

        let mut ctx = BuildContext::new(settings);
        let root = build_generator(schema, &name, &mut ctx)?;
        Ok(Self {
            name,
            root,
            settings,
        })
    }

    /// The bound the external tokenizer's buffer is sized to: exact static
    /// budget plus the tolerated-additional-properties reserve.
    pub fn max_token_count(&self) -> u64 {
        self.root.max_token_count() + self.settings.allow_additional_properties.unwrap_or(0)
    }

    /// Scalar and external roots have no interned declaration of their own;
    /// the header aliases them to the root type name.
    fn needs_root_typedef(&self) -> bool {
        matches!(
            self.root.c_type().shape,
            CShape::Bool | CShape::Double | CShape::Integer { .. } | CShape::External
        )
    }

    fn root_type_name(&self) -> String {
        if self.needs_root_typedef() {
            format!("{}_t", self.name)
        } else {
            self.root.c_type().name.clone()
        }
    }

    fn token_count_macro(&self) -> String {
        format!("{}_MAX_TOKEN_NUM", self.name.to_uppercase())
    }

    pub fn generate_header(&self, h_file_name: &str, splices: &Splices) -> String {
        let guard = header_guard(h_file_name);
        let mut w = CodeWriter::new();
        w.line(format!("#ifndef {guard}"));
        w.line(format!("#define {guard}"));
        w.blank();
        w.line("#include <stdint.h>");
        w.line("#include <stdbool.h>");
        w.blank();
        if let Some(blob) = &splices.h_prefix {
            w.raw(blob);
            w.blank();
        }
        self.root.emit_type_declaration(&mut w);
        if self.needs_root_typedef() {
            w.line(format!(
                "typedef {} {};",
                self.root.c_type().name,
                self.root_type_name()
            ));
            w.blank();
        }
        w.line(format!(
            "#define {} ({})",
            self.token_count_macro(),
            self.max_token_count()
        ));
        w.blank();
        w.line(format!(
            "bool json_parse_{}(const char *json_string, {} *out);",
            self.name,
            self.root_type_name()
        ));
        if let Some(blob) = &splices.h_postfix {
            w.blank();
            w.raw(blob);
        }
        w.blank();
        w.line(format!("#endif /* {guard} */"));
        w.into_string()
    }

    pub fn generate_source(&self, h_file_name: &str, splices: &Splices) -> String {
        let builtins = self
            .settings
            .include_external_builtins_file
            .as_deref()
            .unwrap_or(DEFAULT_BUILTINS_INCLUDE);
        let mut w = CodeWriter::new();
        w.line(format!("#include \"{h_file_name}\""));
        w.line(format!("#include \"{builtins}\""));
        w.blank();
        if let Some(blob) = &splices.c_prefix {
            w.raw(blob);
            w.blank();
        }
        self.root.emit_parser_bodies(&mut w);
        w.block(
            &format!(
                "bool json_parse_{}(const char *json_string, {} *out)",
                self.name,
                self.root_type_name()
            ),
            |w| {
                let macro_name = self.token_count_macro();
                w.line("parse_state_t parse_state_var;");
                w.line("parse_state_t *parse_state = &parse_state_var;");
                w.line(format!("jsmntok_t token_buffer[{macro_name}];"));
                w.block(
                    &format!(
                        "if (builtin_parse_json_string(parse_state, token_buffer, {macro_name}, json_string))"
                    ),
                    |w| {
                        w.line("return true;");
                    },
                );
                self.root.emit_parser_call("out", w);
                w.line("return false;");
            },
        );
        if let Some(blob) = &splices.c_postfix {
            w.blank();
            w.raw(blob);
        }
        w.into_string()
    }
}

fn header_guard(h_file_name: &str) -> String {
    h_file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip_schema() -> Value {
        json!({
            "type": "object",
            "$id": "#r",
            "properties": {
                "a": {"type": "integer", "minimum": 0},
                "b": {"type": "string", "maxLength": 4, "default": "ok"}
            },
            "required": ["a"],
            "additionalProperties": false
        })
    }

    #[test]
    fn round_trip_schema_compiles_into_both_texts() {
        let settings = Settings::default();
        let root = RootGenerator::new(&round_trip_schema(), &settings).unwrap();

        let header = root.generate_header("r.parser.h", &Splices::default());
        assert!(header.starts_with("#ifndef R_PARSER_H\n#define R_PARSER_H\n"));
        assert!(header.contains("typedef char r_b_t[5];"));
        assert!(header.contains("typedef struct r_s {"));
        assert!(header.contains("uint64_t a;"));
        assert!(header.contains("r_b_t b;"));
        // (1 key + 1) + (1 key + 1) + 1
        assert!(header.contains("#define R_MAX_TOKEN_NUM (5)"));
        assert!(header.contains("bool json_parse_r(const char *json_string, r_t *out);"));
        assert!(header.trim_end().ends_with("#endif /* R_PARSER_H */"));

        let source = root.generate_source("r.parser.h", &Splices::default());
        assert!(source.starts_with("#include \"r.parser.h\"\n#include \"s2c_builtins.h\"\n"));
        assert!(source.contains("static bool parse_r(parse_state_t *parse_state, r_t *out)"));
        // Instances missing the required field are rejected; b falls back to
        // its default; length violations go through the builtin bounds.
        assert!(source.contains("Missing required field in '%s': a"));
        assert!(source.contains("memcpy(out->b, \"ok\", 3);"));
        assert!(source.contains("builtin_parse_string(parse_state, &out->b[0], 0, 4)"));
        assert!(source.contains("jsmntok_t token_buffer[R_MAX_TOKEN_NUM];"));
        assert!(source.contains("if (parse_r(parse_state, out)) {"));
    }

    #[test]
    fn enum_root_gets_its_own_entry_point() {
        let settings = Settings::default();
        let schema = json!({
            "type": "string",
            "$id": "#e",
            "enum": ["Foo", "BarBaz"]
        });
        let root = RootGenerator::new(&schema, &settings).unwrap();
        let header = root.generate_header("e.parser.h", &Splices::default());
        assert!(header.contains("typedef enum e_e {"));
        assert!(header.contains("E_FOO,"));
        assert!(header.contains("E_BAR_BAZ"));
        assert!(header.contains("bool json_parse_e(const char *json_string, e_t *out);"));

        let source = root.generate_source("e.parser.h", &Splices::default());
        assert!(source.contains("*out = E_FOO;"));
        assert!(source.contains("} else if (current_string_is(parse_state, \"BarBaz\"))"));
        assert!(source.contains("Unknown enum value in '%s': %.*s"));
    }

    #[test]
    fn scalar_root_gets_a_typedef() {
        let settings = Settings::default();
        let schema = json!({"type": "integer", "$id": "#count", "minimum": 0});
        let root = RootGenerator::new(&schema, &settings).unwrap();
        let header = root.generate_header("count.h", &Splices::default());
        assert!(header.contains("typedef uint64_t count_t;"));
        assert!(header.contains("#define COUNT_MAX_TOKEN_NUM (1)"));
        let source = root.generate_source("count.h", &Splices::default());
        assert!(source.contains("*out = int_parse_tmp;"));
    }

    #[test]
    fn additional_property_reserve_widens_the_token_define() {
        let settings = Settings {
            allow_additional_properties: Some(100),
            ..Settings::default()
        };
        let schema = json!({
            "type": "array",
            "$id": "#flags",
            "items": {"type": "boolean"},
            "minItems": 1,
            "maxItems": 3
        });
        let root = RootGenerator::new(&schema, &settings).unwrap();
        assert_eq!(root.max_token_count(), 104);
        let header = root.generate_header("flags.h", &Splices::default());
        assert!(header.contains("#define FLAGS_MAX_TOKEN_NUM (104)"));
    }

    #[test]
    fn splices_land_in_their_corners() {
        let settings = Settings::default();
        let root = RootGenerator::new(&round_trip_schema(), &settings).unwrap();
        let splices = Splices {
            h_prefix: Some("/* H PREFIX */".to_string()),
            h_postfix: Some("/* H POSTFIX */".to_string()),
            c_prefix: Some("/* C PREFIX */".to_string()),
            c_postfix: Some("/* C POSTFIX */".to_string()),
        };
        let header = root.generate_header("r.parser.h", &splices);
        let h_prefix_at = header.find("/* H PREFIX */").unwrap();
        let decl_at = header.find("typedef struct r_s {").unwrap();
        let h_postfix_at = header.find("/* H POSTFIX */").unwrap();
        let endif_at = header.find("#endif").unwrap();
        assert!(h_prefix_at < decl_at && decl_at < h_postfix_at && h_postfix_at < endif_at);

        let source = root.generate_source("r.parser.h", &splices);
        let c_prefix_at = source.find("/* C PREFIX */").unwrap();
        let body_at = source.find("static bool parse_r").unwrap();
        let c_postfix_at = source.find("/* C POSTFIX */").unwrap();
        assert!(c_prefix_at < body_at && body_at < c_postfix_at);
    }

    #[test]
    fn external_builtins_setting_replaces_the_include() {
        let settings = Settings {
            allow_additional_properties: None,
            include_external_builtins_file: Some("vendor/builtins.h".to_string()),
            ..Settings::default()
        };
        let root = RootGenerator::new(&round_trip_schema(), &settings).unwrap();
        let source = root.generate_source("r.parser.h", &Splices::default());
        assert!(source.contains("#include \"vendor/builtins.h\""));
        assert!(!source.contains("s2c_builtins.h"));
    }
}
