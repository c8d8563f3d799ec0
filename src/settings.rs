//! Generation settings.
//!
//! A small fixed set of named options resolved from the command line, with
//! schema-embedded overrides (the top-level `s2cSettings` object, keys in
//! snake or camel case) taking precedence.

use std::path::PathBuf;

use clap::Args;
use serde_json::Value;

use crate::error::CompileError;

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// File spliced right after the includes in the generated header
    #[arg(long, value_name = "file")]
    pub h_prefix_file: Option<PathBuf>,

    /// File spliced right before the final #endif in the generated header
    #[arg(long, value_name = "file")]
    pub h_postfix_file: Option<PathBuf>,

    /// File spliced right after the includes in the generated .c file
    #[arg(long, value_name = "file")]
    pub c_prefix_file: Option<PathBuf>,

    /// File spliced at the end of the generated .c file
    #[arg(long, value_name = "file")]
    pub c_postfix_file: Option<PathBuf>,

    /// Tolerate additionalProperties on objects, and reserve this many extra
    /// tokens for them when sizing the token buffer
    #[arg(long, value_name = "tokens")]
    pub allow_additional_properties: Option<u64>,

    /// Include this path instead of the default builtins header
    #[arg(long, value_name = "file")]
    pub include_external_builtins_file: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub h_prefix_file: Option<PathBuf>,
    pub h_postfix_file: Option<PathBuf>,
    pub c_prefix_file: Option<PathBuf>,
    pub c_postfix_file: Option<PathBuf>,
    /// `Some(reserve)` is the opt-in for tolerated additional properties.
    pub allow_additional_properties: Option<u64>,
    pub include_external_builtins_file: Option<String>,
}

fn snake_to_camel_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut upper_next = false;
    for c in text.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Look a field up in the override map under either key spelling.
fn override_for<'v>(overrides: Option<&'v Value>, snake: &str) -> Option<&'v Value> {
    let map = overrides?.as_object()?;
    map.get(snake)
        .or_else(|| map.get(snake_to_camel_case(snake).as_str()))
}

fn path_setting(
    overrides: Option<&Value>,
    snake: &'static str,
    from_args: &Option<PathBuf>,
) -> Result<Option<PathBuf>, CompileError> {
    match override_for(overrides, snake) {
        Some(Value::String(path)) => Ok(Some(PathBuf::from(path))),
        Some(other) => Err(CompileError::BadSetting {
            field: snake.to_string(),
            detail: format!("expected a file path string, got {other}"),
        }),
        None => Ok(from_args.clone()),
    }
}

impl Settings {
    pub fn resolve(
        args: &SettingsArgs,
        overrides: Option<&Value>,
    ) -> Result<Self, CompileError> {
        if let Some(overrides) = overrides {
            if !overrides.is_object() {
                return Err(CompileError::BadSetting {
                    field: "s2cSettings".to_string(),
                    detail: format!("expected an object, got {overrides}"),
                });
            }
        }

        let allow_additional_properties =
            match override_for(overrides, "allow_additional_properties") {
                Some(value) => Some(value.as_u64().ok_or_else(|| CompileError::BadSetting {
                    field: "allow_additional_properties".to_string(),
                    detail: format!("expected a token count, got {value}"),
                })?),
                None => args.allow_additional_properties,
            };

        let include_external_builtins_file =
            match override_for(overrides, "include_external_builtins_file") {
                Some(Value::String(path)) => Some(path.clone()),
                Some(other) => {
                    return Err(CompileError::BadSetting {
                        field: "include_external_builtins_file".to_string(),
                        detail: format!("expected an include path string, got {other}"),
                    });
                }
                None => args.include_external_builtins_file.clone(),
            };

        Ok(Settings {
            h_prefix_file: path_setting(overrides, "h_prefix_file", &args.h_prefix_file)?,
            h_postfix_file: path_setting(overrides, "h_postfix_file", &args.h_postfix_file)?,
            c_prefix_file: path_setting(overrides, "c_prefix_file", &args.c_prefix_file)?,
            c_postfix_file: path_setting(overrides, "c_postfix_file", &args.c_postfix_file)?,
            allow_additional_properties,
            include_external_builtins_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn args_fill_in_when_no_overrides() {
        let args = SettingsArgs {
            allow_additional_properties: Some(12),
            c_prefix_file: Some(PathBuf::from("pre.inc")),
            ..SettingsArgs::default()
        };
        let settings = Settings::resolve(&args, None).unwrap();
        assert_eq!(settings.allow_additional_properties, Some(12));
        assert_eq!(settings.c_prefix_file, Some(PathBuf::from("pre.inc")));
    }

    #[test]
    fn schema_overrides_take_precedence_in_either_case_style() {
        let args = SettingsArgs {
            allow_additional_properties: Some(12),
            h_prefix_file: Some(PathBuf::from("from_args.inc")),
            ..SettingsArgs::default()
        };
        let overrides = json!({
            "allowAdditionalProperties": 99,
            "h_prefix_file": "from_schema.inc"
        });
        let settings = Settings::resolve(&args, Some(&overrides)).unwrap();
        assert_eq!(settings.allow_additional_properties, Some(99));
        assert_eq!(settings.h_prefix_file, Some(PathBuf::from("from_schema.inc")));
    }

    #[test]
    fn mistyped_override_is_rejected() {
        let overrides = json!({"allow_additional_properties": "lots"});
        let err = Settings::resolve(&SettingsArgs::default(), Some(&overrides)).unwrap_err();
        assert!(matches!(err, CompileError::BadSetting { .. }));
    }
}
