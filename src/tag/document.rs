//! In-memory tag document tree and path-addressed field access

use serde::{Deserialize, Serialize};
use std::fmt;

use super::path::{FieldPath, PathSegment};
use super::types::{FieldKind, SchemaGeneration};
use crate::error::{Error, Result};
use crate::utils::normalize_tag_path;

/// Reference to another tag: a relative path plus its group extension
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagReference {
    pub path: String,
    pub group: String,
}

impl TagReference {
    pub fn new(path: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            group: group.into(),
        }
    }

    /// Case and separator insensitive identity used for lookups
    pub fn key(&self) -> String {
        format!("{}.{}", normalize_tag_path(&self.path), self.group.to_ascii_lowercase())
    }
}

impl fmt::Display for TagReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.path, self.group)
    }
}

/// Animated function value; only the first colour and the scalar are modelled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagFunction {
    pub color: [f32; 3],
    pub value: f32,
}

impl Default for TagFunction {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            value: 0.0,
        }
    }
}

/// A block: an element template plus the live elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagBlock {
    pub template: TagStruct,
    pub elements: Vec<TagStruct>,
}

impl TagBlock {
    pub fn new(template: TagStruct) -> Self {
        Self {
            template,
            elements: Vec::new(),
        }
    }

    /// Append a default element and return its index
    pub fn add_element(&mut self) -> usize {
        self.elements.push(self.template.clone());
        self.elements.len() - 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Block(TagBlock),
    Struct(TagStruct),
    Reference(Option<TagReference>),
    Enum(i32),
    Flags(u32),
    Real(f32),
    Integer(i64),
    Reals(Vec<f32>),
    StringId(String),
    BlockIndex(i32),
    Function(TagFunction),
}

impl FieldValue {
    /// Default value for a field of the given kind
    pub fn default_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Block => FieldValue::Block(TagBlock::new(TagStruct::default())),
            FieldKind::Struct => FieldValue::Struct(TagStruct::default()),
            FieldKind::Reference => FieldValue::Reference(None),
            FieldKind::CharEnum | FieldKind::ShortEnum | FieldKind::LongEnum => {
                FieldValue::Enum(0)
            }
            FieldKind::Flags | FieldKind::ByteFlags => FieldValue::Flags(0),
            FieldKind::Real => FieldValue::Real(0.0),
            FieldKind::ShortInteger | FieldKind::LongInteger => FieldValue::Integer(0),
            FieldKind::StringId => FieldValue::StringId(String::new()),
            FieldKind::ShortBlockIndex => FieldValue::BlockIndex(-1),
            FieldKind::Custom => FieldValue::Function(TagFunction::default()),
            array => FieldValue::Reals(vec![0.0; array.arity().unwrap_or(0)]),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Block(_) => "block",
            FieldValue::Struct(_) => "struct",
            FieldValue::Reference(_) => "reference",
            FieldValue::Enum(_) => "enum",
            FieldValue::Flags(_) => "flags",
            FieldValue::Real(_) => "real",
            FieldValue::Integer(_) => "integer",
            FieldValue::Reals(_) => "real array",
            FieldValue::StringId(_) => "string id",
            FieldValue::BlockIndex(_) => "block index",
            FieldValue::Function(_) => "function",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagField {
    pub kind: FieldKind,
    pub name: String,
    pub value: FieldValue,
}

/// An ordered set of named, typed fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagStruct {
    pub fields: Vec<TagField>,
}

impl TagStruct {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf field holding the kind's default value
    pub fn with(self, kind: FieldKind, name: &str) -> Self {
        self.with_value(kind, name, FieldValue::default_for(kind))
    }

    pub fn with_value(mut self, kind: FieldKind, name: &str, value: FieldValue) -> Self {
        self.fields.push(TagField {
            kind,
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn with_struct(self, name: &str, inner: TagStruct) -> Self {
        self.with_value(FieldKind::Struct, name, FieldValue::Struct(inner))
    }

    pub fn with_block(self, name: &str, element: TagStruct) -> Self {
        self.with_value(FieldKind::Block, name, FieldValue::Block(TagBlock::new(element)))
    }

    fn find(&self, segment: &PathSegment) -> Option<&TagField> {
        self.fields
            .iter()
            .find(|f| f.kind == segment.kind && f.name == segment.name)
    }

    fn find_mut(&mut self, segment: &PathSegment) -> Option<&mut TagField> {
        self.fields
            .iter_mut()
            .find(|f| f.kind == segment.kind && f.name == segment.name)
    }
}

/// A tag document loaded from a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDocument {
    pub reference: TagReference,
    pub generation: SchemaGeneration,
    pub root: TagStruct,
}

fn not_found(path: &str, segment: &PathSegment) -> Error {
    Error::FieldNotFound {
        path: path.to_string(),
        segment: format!("{}:{}", segment.kind, segment.name),
    }
}

fn mismatch(path: &str, expected: &'static str, found: &FieldValue) -> Error {
    Error::FieldTypeMismatch {
        path: path.to_string(),
        expected,
        found: found.type_name(),
    }
}

impl TagDocument {
    pub fn new(reference: TagReference, generation: SchemaGeneration, root: TagStruct) -> Self {
        Self {
            reference,
            generation,
            root,
        }
    }

    /// Resolve a path expression to a field
    pub fn field(&self, path: &str) -> Result<&TagField> {
        let parsed = FieldPath::parse(path)?;
        let segments = parsed.segments();
        let mut current = &self.root;

        for (i, segment) in segments.iter().enumerate() {
            let field = current
                .find(segment)
                .ok_or_else(|| not_found(path, segment))?;
            if i + 1 == segments.len() {
                return Ok(field);
            }
            current = match &field.value {
                FieldValue::Struct(inner) => inner,
                FieldValue::Block(block) => {
                    let index = segment.index.unwrap_or(0);
                    block
                        .elements
                        .get(index)
                        .ok_or_else(|| Error::IndexOutOfRange {
                            path: path.to_string(),
                            index,
                            len: block.elements.len(),
                        })?
                }
                other => return Err(mismatch(path, "struct or block", other)),
            };
        }

        Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "empty path".into(),
        })
    }

    /// Resolve a path expression to a mutable field
    pub fn field_mut(&mut self, path: &str) -> Result<&mut TagField> {
        let parsed = FieldPath::parse(path)?;
        let segments = parsed.segments();
        let mut current = &mut self.root;

        for (i, segment) in segments.iter().enumerate() {
            let field = current
                .find_mut(segment)
                .ok_or_else(|| not_found(path, segment))?;
            if i + 1 == segments.len() {
                return Ok(field);
            }
            current = match &mut field.value {
                FieldValue::Struct(inner) => inner,
                FieldValue::Block(block) => {
                    let index = segment.index.unwrap_or(0);
                    let len = block.elements.len();
                    block
                        .elements
                        .get_mut(index)
                        .ok_or_else(|| Error::IndexOutOfRange {
                            path: path.to_string(),
                            index,
                            len,
                        })?
                }
                other => return Err(mismatch(path, "struct or block", other)),
            };
        }

        Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "empty path".into(),
        })
    }

    /// True when the path resolves in this document
    pub fn has_field(&self, path: &str) -> bool {
        self.field(path).is_ok()
    }

    pub fn block(&self, path: &str) -> Result<&TagBlock> {
        match &self.field(path)?.value {
            FieldValue::Block(block) => Ok(block),
            other => Err(mismatch(path, "block", other)),
        }
    }

    pub fn block_mut(&mut self, path: &str) -> Result<&mut TagBlock> {
        match &mut self.field_mut(path)?.value {
            FieldValue::Block(block) => Ok(block),
            other => Err(mismatch(path, "block", other)),
        }
    }

    pub fn block_count(&self, path: &str) -> Result<usize> {
        Ok(self.block(path)?.elements.len())
    }

    /// Append a default element to a block, returning its index
    pub fn add_element(&mut self, path: &str) -> Result<usize> {
        Ok(self.block_mut(path)?.add_element())
    }

    pub fn remove_all_elements(&mut self, path: &str) -> Result<()> {
        self.block_mut(path)?.elements.clear();
        Ok(())
    }

    pub fn reference(&self, path: &str) -> Result<Option<&TagReference>> {
        match &self.field(path)?.value {
            FieldValue::Reference(r) => Ok(r.as_ref()),
            other => Err(mismatch(path, "reference", other)),
        }
    }

    pub fn set_reference(&mut self, path: &str, reference: Option<TagReference>) -> Result<()> {
        match &mut self.field_mut(path)?.value {
            FieldValue::Reference(r) => {
                *r = reference;
                Ok(())
            }
            other => Err(mismatch(path, "reference", other)),
        }
    }

    pub fn enum_value(&self, path: &str) -> Result<i32> {
        match self.field(path)?.value {
            FieldValue::Enum(v) => Ok(v),
            ref other => Err(mismatch(path, "enum", other)),
        }
    }

    pub fn set_enum(&mut self, path: &str, value: i32) -> Result<()> {
        match &mut self.field_mut(path)?.value {
            FieldValue::Enum(v) => {
                *v = value;
                Ok(())
            }
            other => Err(mismatch(path, "enum", other)),
        }
    }

    pub fn flags(&self, path: &str) -> Result<u32> {
        match self.field(path)?.value {
            FieldValue::Flags(v) => Ok(v),
            ref other => Err(mismatch(path, "flags", other)),
        }
    }

    pub fn set_flags(&mut self, path: &str, value: u32) -> Result<()> {
        match &mut self.field_mut(path)?.value {
            FieldValue::Flags(v) => {
                *v = value;
                Ok(())
            }
            other => Err(mismatch(path, "flags", other)),
        }
    }

    pub fn real(&self, path: &str) -> Result<f32> {
        match self.field(path)?.value {
            FieldValue::Real(v) => Ok(v),
            ref other => Err(mismatch(path, "real", other)),
        }
    }

    pub fn set_real(&mut self, path: &str, value: f32) -> Result<()> {
        match &mut self.field_mut(path)?.value {
            FieldValue::Real(v) => {
                *v = value;
                Ok(())
            }
            other => Err(mismatch(path, "real", other)),
        }
    }

    pub fn integer(&self, path: &str) -> Result<i64> {
        match self.field(path)?.value {
            FieldValue::Integer(v) => Ok(v),
            ref other => Err(mismatch(path, "integer", other)),
        }
    }

    pub fn set_integer(&mut self, path: &str, value: i64) -> Result<()> {
        match &mut self.field_mut(path)?.value {
            FieldValue::Integer(v) => {
                *v = value;
                Ok(())
            }
            other => Err(mismatch(path, "integer", other)),
        }
    }

    pub fn reals(&self, path: &str) -> Result<&[f32]> {
        match &self.field(path)?.value {
            FieldValue::Reals(v) => Ok(v),
            other => Err(mismatch(path, "real array", other)),
        }
    }

    /// Read an array-valued field into a fixed-size array
    pub fn reals_n<const N: usize>(&self, path: &str) -> Result<[f32; N]> {
        let values = self.reals(path)?;
        <[f32; N]>::try_from(values).map_err(|_| Error::ArityMismatch {
            path: path.to_string(),
            expected: N,
            got: values.len(),
        })
    }

    /// Write an array-valued field; the slice length must match the kind's arity
    pub fn set_reals(&mut self, path: &str, values: &[f32]) -> Result<()> {
        let field = self.field_mut(path)?;
        let expected = field.kind.arity();
        match &mut field.value {
            FieldValue::Reals(v) => {
                let expected = expected.unwrap_or(v.len());
                if values.len() != expected {
                    return Err(Error::ArityMismatch {
                        path: path.to_string(),
                        expected,
                        got: values.len(),
                    });
                }
                v.clear();
                v.extend_from_slice(values);
                Ok(())
            }
            other => Err(mismatch(path, "real array", other)),
        }
    }

    pub fn string_id(&self, path: &str) -> Result<&str> {
        match &self.field(path)?.value {
            FieldValue::StringId(s) => Ok(s),
            other => Err(mismatch(path, "string id", other)),
        }
    }

    pub fn set_string_id(&mut self, path: &str, value: &str) -> Result<()> {
        match &mut self.field_mut(path)?.value {
            FieldValue::StringId(s) => {
                *s = value.to_string();
                Ok(())
            }
            other => Err(mismatch(path, "string id", other)),
        }
    }

    pub fn block_index(&self, path: &str) -> Result<i32> {
        match self.field(path)?.value {
            FieldValue::BlockIndex(v) => Ok(v),
            ref other => Err(mismatch(path, "block index", other)),
        }
    }

    pub fn set_block_index(&mut self, path: &str, value: i32) -> Result<()> {
        match &mut self.field_mut(path)?.value {
            FieldValue::BlockIndex(v) => {
                *v = value;
                Ok(())
            }
            other => Err(mismatch(path, "block index", other)),
        }
    }

    pub fn function(&self, path: &str) -> Result<&TagFunction> {
        match &self.field(path)?.value {
            FieldValue::Function(f) => Ok(f),
            other => Err(mismatch(path, "function", other)),
        }
    }

    pub fn set_function(&mut self, path: &str, function: TagFunction) -> Result<()> {
        match &mut self.field_mut(path)?.value {
            FieldValue::Function(f) => {
                *f = function;
                Ok(())
            }
            other => Err(mismatch(path, "function", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TagDocument {
        let placement = TagStruct::new()
            .with(FieldKind::ShortBlockIndex, "type")
            .with_struct(
                "object data",
                TagStruct::new()
                    .with(FieldKind::RealPoint3d, "position")
                    .with(FieldKind::Real, "scale"),
            )
            .with_block(
                "sector points",
                TagStruct::new().with(FieldKind::RealPoint3d, "position"),
            );
        let root = TagStruct::new()
            .with_block("scenery", placement)
            .with(FieldKind::StringId, "name");
        TagDocument::new(
            TagReference::new("levels\\test\\test", "scenario"),
            SchemaGeneration::Legacy,
            root,
        )
    }

    #[test]
    fn test_add_and_write_element() {
        let mut doc = sample();
        assert_eq!(doc.block_count("Block:scenery").unwrap(), 0);
        assert_eq!(doc.add_element("Block:scenery").unwrap(), 0);
        assert_eq!(doc.add_element("Block:scenery").unwrap(), 1);

        doc.set_reals("Block:scenery[1]/Struct:object data/RealPoint3d:position", &[1.0, 2.0, 3.0])
            .unwrap();
        doc.set_block_index("Block:scenery[1]/ShortBlockIndex:type", 4).unwrap();

        assert_eq!(
            doc.reals("Block:scenery[1]/Struct:object data/RealPoint3d:position").unwrap(),
            &[1.0, 2.0, 3.0]
        );
        assert_eq!(
            doc.reals("Block:scenery[0]/Struct:object data/RealPoint3d:position").unwrap(),
            &[0.0, 0.0, 0.0]
        );
        assert_eq!(doc.block_index("Block:scenery[1]/ShortBlockIndex:type").unwrap(), 4);
        assert_eq!(doc.block_index("Block:scenery[0]/ShortBlockIndex:type").unwrap(), -1);
    }

    #[test]
    fn test_missing_field() {
        let mut doc = sample();
        doc.add_element("Block:scenery").unwrap();
        let err = doc
            .enum_value("Block:scenery[0]/Struct:multiplayer data/CharEnum:owner team")
            .unwrap_err();
        assert!(err.is_schema_miss());
        match err {
            Error::FieldNotFound { segment, .. } => assert_eq!(segment, "Struct:multiplayer data"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_kind_must_match() {
        let doc = sample();
        // name exists, but as a StringID
        assert!(doc.string_id("StringID:name").is_ok());
        assert!(doc.string_id("LongInteger:name").unwrap_err().is_schema_miss());
    }

    #[test]
    fn test_index_out_of_range() {
        let mut doc = sample();
        doc.add_element("Block:scenery").unwrap();
        let err = doc.real("Block:scenery[3]/Struct:object data/Real:scale").unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 3, len: 1, .. }));
    }

    #[test]
    fn test_arity_mismatch() {
        let mut doc = sample();
        doc.add_element("Block:scenery").unwrap();
        let err = doc
            .set_reals("Block:scenery[0]/Struct:object data/RealPoint3d:position", &[1.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { expected: 3, got: 2, .. }));
    }

    #[test]
    fn test_type_mismatch() {
        let doc = sample();
        let err = doc.real("Block:scenery").unwrap_err();
        assert!(matches!(err, Error::FieldTypeMismatch { expected: "real", found: "block", .. }));
    }

    #[test]
    fn test_remove_all_elements() {
        let mut doc = sample();
        doc.add_element("Block:scenery").unwrap();
        doc.add_element("Block:scenery[0]/Block:sector points").unwrap();
        assert_eq!(doc.block_count("Block:scenery[0]/Block:sector points").unwrap(), 1);
        doc.remove_all_elements("Block:scenery").unwrap();
        assert_eq!(doc.block_count("Block:scenery").unwrap(), 0);
        // template is untouched by element edits
        doc.add_element("Block:scenery").unwrap();
        assert_eq!(doc.block_count("Block:scenery[0]/Block:sector points").unwrap(), 0);
    }

    #[test]
    fn test_reference_key() {
        let a = TagReference::new("Objects/Scenery/Tree/tree", "scenery");
        let b = TagReference::new("objects\\scenery\\tree\\tree", "scenery");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.to_string(), "Objects/Scenery/Tree/tree.scenery");
    }
}
