//! Emitted C type descriptors and the per-run type cache.
//!
//! A `CType` is the target-language shape of one schema fragment. Structural
//! equality deliberately ignores the description (it is documentation only)
//! and the emission flag. Named shapes are interned through [`TypeCache`]:
//! the first registration under a name wins, and a second registration under
//! the same name must be structurally equal, otherwise two unrelated schema
//! branches collided on a derived name and the run must die rather than emit
//! a silently wrong declaration.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::emit::CodeWriter;
use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

/// Parse a stdint type name (`int8_t` .. `uint64_t`) into signedness + width.
pub fn parse_stdint_name(name: &str) -> Option<(bool, IntWidth)> {
    let (unsigned, rest) = match name.strip_prefix('u') {
        Some(rest) => (true, rest),
        None => (false, name),
    };
    let width = match rest {
        "int8_t" => IntWidth::W8,
        "int16_t" => IntWidth::W16,
        "int32_t" => IntWidth::W32,
        "int64_t" => IntWidth::W64,
        _ => return None,
    };
    Some((unsigned, width))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: Rc<CType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CShape {
    /// `bool`
    Bool,
    /// `double`
    Double,
    /// One of the eight stdint types.
    Integer { unsigned: bool, width: IntWidth },
    /// `typedef char name[capacity];` — capacity already includes the NUL.
    CharArray { capacity: u64 },
    /// `typedef struct name_s { ... } name;` with ordered fields.
    Struct { fields: Vec<StructField> },
    /// `typedef struct name_s { uint64_t n; item items[max_items]; } name;`
    FixedArray { item: Rc<CType>, max_items: u64 },
    /// `typedef enum name_e { ... } name;` with ordered labels.
    Enum { labels: Vec<String> },
    /// Caller-supplied type (custom parse hook); no declaration emitted.
    External,
}

#[derive(Debug, Clone)]
pub struct CType {
    /// The spelling used at field sites. For scalar primitives this is the C
    /// spelling itself (`bool`, `int64_t`, ...); for named shapes it is the
    /// typedef name (`<name>_t`).
    pub name: String,
    pub description: Option<String>,
    pub shape: CShape,
    emitted: Cell<bool>,
}

impl PartialEq for CType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.shape == other.shape
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl CType {
    pub fn new(name: impl Into<String>, description: Option<String>, shape: CShape) -> Self {
        Self {
            name: name.into(),
            description,
            shape,
            emitted: Cell::new(false),
        }
    }

    /// Typedef tag base: the name with its `_t` suffix stripped.
    fn tag_base(&self) -> &str {
        self.name.strip_suffix("_t").unwrap_or(&self.name)
    }

    /// `<type> <field>;` with the type's description as a trailing doc.
    pub fn emit_field_declaration(&self, field_name: &str, w: &mut CodeWriter) {
        w.doc_line(
            &format!("{} {};", self.name, field_name),
            self.description.as_deref(),
        );
    }

    /// Emit this type's declaration, children first. Idempotent per
    /// descriptor: interned types shared across use sites declare once.
    pub fn emit_declaration(&self, w: &mut CodeWriter) {
        if self.emitted.replace(true) {
            return;
        }
        match &self.shape {
            CShape::Bool | CShape::Double | CShape::Integer { .. } | CShape::External => {}
            CShape::CharArray { capacity } => {
                w.doc_line(
                    &format!("typedef char {}[{}];", self.name, capacity),
                    self.description.as_deref(),
                );
                w.blank();
            }
            CShape::Struct { fields } => {
                for field in fields {
                    field.ty.emit_declaration(w);
                }
                w.line(format!("typedef struct {}_s {{", self.tag_base()));
                w.indented(|w| {
                    for field in fields {
                        field.ty.emit_field_declaration(&field.name, w);
                    }
                });
                w.line(format!("}} {};", self.name));
                w.blank();
            }
            CShape::FixedArray { item, max_items } => {
                item.emit_declaration(w);
                w.line(format!("typedef struct {}_s {{", self.tag_base()));
                w.indented(|w| {
                    w.doc_line("uint64_t n;", Some("The number of elements in the array"));
                    item.emit_field_declaration(&format!("items[{max_items}]"), w);
                });
                w.line(format!("}} {};", self.name));
                w.blank();
            }
            CShape::Enum { labels } => {
                w.line(format!("typedef enum {}_e {{", self.tag_base()));
                w.indented(|w| {
                    for (i, label) in labels.iter().enumerate() {
                        if i + 1 < labels.len() {
                            w.line(format!("{label},"));
                        } else {
                            w.line(label);
                        }
                    }
                });
                w.line(format!("}} {};", self.name));
                w.blank();
            }
        }
    }
}

/// Name → first-registered descriptor, scoped to one compilation run.
#[derive(Debug, Default)]
pub struct TypeCache {
    types: IndexMap<String, Rc<CType>>,
}

impl TypeCache {
    /// First registration wins; a structurally different re-registration
    /// under the same name is fatal.
    pub fn intern(&mut self, ty: CType) -> Result<Rc<CType>, CompileError> {
        if let Some(existing) = self.types.get(&ty.name) {
            if **existing != ty {
                return Err(CompileError::TypeNameConflict {
                    name: ty.name.clone(),
                    first: format!("{:?}", existing.shape),
                    second: format!("{:?}", ty.shape),
                });
            }
            return Ok(Rc::clone(existing));
        }
        let ty = Rc::new(ty);
        self.types.insert(ty.name.clone(), Rc::clone(&ty));
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_array(name: &str, capacity: u64) -> CType {
        CType::new(name, None, CShape::CharArray { capacity })
    }

    #[test]
    fn interning_is_idempotent() {
        let mut cache = TypeCache::default();
        let a = cache.intern(char_array("name_t", 9)).unwrap();
        let b = cache.intern(char_array("name_t", 9)).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn same_name_different_shape_is_fatal() {
        let mut cache = TypeCache::default();
        cache.intern(char_array("name_t", 9)).unwrap();
        let err = cache.intern(char_array("name_t", 12)).unwrap_err();
        assert!(matches!(err, CompileError::TypeNameConflict { .. }));
    }

    #[test]
    fn description_does_not_affect_equality() {
        let mut cache = TypeCache::default();
        let first = cache.intern(char_array("name_t", 9)).unwrap();
        let mut redescribed = char_array("name_t", 9);
        redescribed.description = Some("something else".into());
        let second = cache.intern(redescribed).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        // The canonical descriptor keeps the first registration's description.
        assert!(second.description.is_none());
    }

    #[test]
    fn declaration_is_emitted_once_per_descriptor() {
        let mut cache = TypeCache::default();
        let ty = cache.intern(char_array("name_t", 9)).unwrap();
        let mut w = CodeWriter::new();
        ty.emit_declaration(&mut w);
        ty.emit_declaration(&mut w);
        let text = w.into_string();
        assert_eq!(text.matches("typedef char name_t[9];").count(), 1);
    }

    #[test]
    fn struct_declares_children_first() {
        let mut cache = TypeCache::default();
        let inner = cache.intern(char_array("outer_name_t", 5)).unwrap();
        let outer = cache
            .intern(CType::new(
                "outer_t",
                None,
                CShape::Struct {
                    fields: vec![StructField {
                        name: "name".into(),
                        ty: inner,
                    }],
                },
            ))
            .unwrap();
        let mut w = CodeWriter::new();
        outer.emit_declaration(&mut w);
        let text = w.into_string();
        let inner_at = text.find("typedef char outer_name_t[5];").unwrap();
        let outer_at = text.find("typedef struct outer_s {").unwrap();
        assert!(inner_at < outer_at);
        assert!(text.contains("outer_name_t name;"));
    }
}
