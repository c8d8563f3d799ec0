//! Minimal CLI: one schema in, a parser `.c`/`.h` pair out.
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use crate::codegen::root::{RootGenerator, Splices};
use crate::resolver;
use crate::settings::{Settings, SettingsArgs};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a JSON schema (draft 7 subset) into a fixed-memory C parser
///
/// Settings can also be given in the schema itself, under the "s2cSettings"
/// key, in either snake or camel case; those take precedence over the
/// command line.
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// JSON schema file to compile; must carry a top-level $id
    schema_file: PathBuf,

    /// output path of the generated parser .c file
    c_file: PathBuf,

    /// output path of the generated parser .h file
    h_file: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let source = std::fs::read_to_string(&self.schema_file).with_context(|| {
            format!("failed to read schema file {}", self.schema_file.display())
        })?;
        let schema = serde_json::from_str::<serde_json::Value>(&source).with_context(|| {
            format!(
                "failed to parse JSON schema file {}",
                self.schema_file.display()
            )
        })?;

        let schema = resolver::resolve_document(schema)?;
        let settings = Settings::resolve(&self.settings, schema.get("s2cSettings"))?;
        let splices = load_splices(&settings)?;
        let root = RootGenerator::new(&schema, &settings)?;

        let h_file_name = file_name_for_include(&self.h_file);
        write_output(&self.h_file, &root.generate_header(&h_file_name, &splices))?;
        write_output(&self.c_file, &root.generate_source(&h_file_name, &splices))?;
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// The generated .c includes its header by file name, not by path.
fn file_name_for_include(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

fn read_splice(path: Option<&PathBuf>) -> anyhow::Result<Option<String>> {
    match path {
        None => Ok(None),
        Some(path) => {
            let blob = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read splice file {}", path.display()))?;
            Ok(Some(blob))
        }
    }
}

fn load_splices(settings: &Settings) -> anyhow::Result<Splices> {
    Ok(Splices {
        h_prefix: read_splice(settings.h_prefix_file.as_ref())?,
        h_postfix: read_splice(settings.h_postfix_file.as_ref())?,
        c_prefix: read_splice(settings.c_prefix_file.as_ref())?,
        c_postfix: read_splice(settings.c_postfix_file.as_ref())?,
    })
}

fn write_output(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory {}", parent.display())
            })?;
        }
    }
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write output file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CommandLineInterface::command().debug_assert();
    }

    #[test]
    fn positional_and_settings_arguments_parse() {
        let cli = CommandLineInterface::try_parse_from([
            "schema2c",
            "schema.json",
            "parser.c",
            "parser.h",
            "--allow-additional-properties",
            "32",
            "--c-prefix-file",
            "pre.inc",
        ])
        .unwrap();
        assert_eq!(cli.schema_file, PathBuf::from("schema.json"));
        assert_eq!(cli.c_file, PathBuf::from("parser.c"));
        assert_eq!(cli.h_file, PathBuf::from("parser.h"));
        assert_eq!(cli.settings.allow_additional_properties, Some(32));
        assert_eq!(cli.settings.c_prefix_file, Some(PathBuf::from("pre.inc")));
    }
}
