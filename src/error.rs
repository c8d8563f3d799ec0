//! Compile-time (configuration) errors.
//!
//! Every schema problem is fatal: the compiler either produces both output
//! files or nothing. Runtime validation errors are a different animal — they
//! are *emitted as C code*, never raised here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("all schemas must have an id (a top-level field named '$id')")]
    MissingId,

    #[error("only in-file references are supported: '{reference}'")]
    ExternalReference { reference: String },

    #[error("only path-style references are supported (id-based references are not): '{reference}'")]
    IdReference { reference: String },

    #[error("reference nodes should not contain other fields: '{reference}'")]
    ReferenceWithSiblings { reference: String },

    #[error("reference target does not exist: '{reference}'")]
    DanglingReference { reference: String },

    #[error("cyclic reference chain: {chain}")]
    CyclicReference { chain: String },

    #[error("allOf expects a list of schemas, got: {found}")]
    AllOfNotAList { found: String },

    #[error("field types are different in allOf declaration: '{left}' vs. '{right}'")]
    MergeTypeMismatch { left: String, right: String },

    #[error("could not merge fields for allOf declaration: '{left}' and '{right}'")]
    MergeConflict { left: String, right: String },

    #[error("could not find any generator to parse schema: {fragment}")]
    NoGenerator { fragment: String },

    #[error("invalid schema fragment for '{name}' at {path}: {message}")]
    ConfigShape {
        name: String,
        path: String,
        message: String,
    },

    #[error("{type_kind} types must have {bound} ('{name}')")]
    MissingBound {
        type_kind: &'static str,
        bound: &'static str,
        name: String,
    },

    #[error("invalid default value for '{name}': {detail}")]
    BadDefault { name: String, detail: String },

    #[error("two different types with the same name '{name}': {first} vs. {second}")]
    TypeNameConflict {
        name: String,
        first: String,
        second: String,
    },

    #[error("all fields must either be required or have a default value ('{type_name}.{field}')")]
    FieldNeitherRequiredNorDefaulted { type_name: String, field: String },

    #[error(
        "either pass --allow-additional-properties, or set additionalProperties \
         to false on all object types ('{name}')"
    )]
    AdditionalPropertiesNotAllowed { name: String },

    #[error("'{name}' is not a valid C identifier")]
    InvalidIdentifier { name: String },

    #[error("pattern \"{pattern}\" is not a valid pattern for this value range; valid patterns are: {valid}")]
    UnsupportedPattern { pattern: String, valid: String },

    #[error("unsupported integer type override: '{name}'")]
    UnsupportedIntegerType { name: String },

    #[error("s2cParseFunction must be set if s2cType is set ('{name}')")]
    ParseFunctionRequired { name: String },

    #[error("enum types must have a non-empty 'enum' list ('{name}')")]
    EmptyEnum { name: String },

    #[error("enum default '{default}' is not one of the declared labels ('{name}')")]
    EnumDefaultNotALabel { name: String, default: String },

    #[error("bad setting '{field}': {detail}")]
    BadSetting { field: String, detail: String },
}
