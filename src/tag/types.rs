//! Field kinds, field classes and schema generations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Concrete field kind as it appears in a path segment (`Kind:name`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Block,
    Struct,
    Reference,
    CharEnum,
    ShortEnum,
    LongEnum,
    Flags,
    ByteFlags,
    Real,
    ShortInteger,
    LongInteger,
    RealPoint2d,
    RealPoint3d,
    RealVector3d,
    RealEulerAngles2d,
    RealEulerAngles3d,
    RealQuaternion,
    RealBounds,
    AngleBounds,
    RealArgbColor,
    #[serde(rename = "StringID")]
    StringId,
    ShortBlockIndex,
    Custom,
}

/// Closed set of field behaviours a kind maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Block,
    Struct,
    Reference,
    Enum,
    Flags,
    ElementSingle,
    ElementInteger,
    ElementArraySingle,
    StringId,
    BlockIndex,
    CustomFunction,
}

impl FieldKind {
    pub const ALL: [FieldKind; 23] = [
        FieldKind::Block,
        FieldKind::Struct,
        FieldKind::Reference,
        FieldKind::CharEnum,
        FieldKind::ShortEnum,
        FieldKind::LongEnum,
        FieldKind::Flags,
        FieldKind::ByteFlags,
        FieldKind::Real,
        FieldKind::ShortInteger,
        FieldKind::LongInteger,
        FieldKind::RealPoint2d,
        FieldKind::RealPoint3d,
        FieldKind::RealVector3d,
        FieldKind::RealEulerAngles2d,
        FieldKind::RealEulerAngles3d,
        FieldKind::RealQuaternion,
        FieldKind::RealBounds,
        FieldKind::AngleBounds,
        FieldKind::RealArgbColor,
        FieldKind::StringId,
        FieldKind::ShortBlockIndex,
        FieldKind::Custom,
    ];

    /// Name used in path expressions
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Block => "Block",
            FieldKind::Struct => "Struct",
            FieldKind::Reference => "Reference",
            FieldKind::CharEnum => "CharEnum",
            FieldKind::ShortEnum => "ShortEnum",
            FieldKind::LongEnum => "LongEnum",
            FieldKind::Flags => "Flags",
            FieldKind::ByteFlags => "ByteFlags",
            FieldKind::Real => "Real",
            FieldKind::ShortInteger => "ShortInteger",
            FieldKind::LongInteger => "LongInteger",
            FieldKind::RealPoint2d => "RealPoint2d",
            FieldKind::RealPoint3d => "RealPoint3d",
            FieldKind::RealVector3d => "RealVector3d",
            FieldKind::RealEulerAngles2d => "RealEulerAngles2d",
            FieldKind::RealEulerAngles3d => "RealEulerAngles3d",
            FieldKind::RealQuaternion => "RealQuaternion",
            FieldKind::RealBounds => "RealBounds",
            FieldKind::AngleBounds => "AngleBounds",
            FieldKind::RealArgbColor => "RealArgbColor",
            FieldKind::StringId => "StringID",
            FieldKind::ShortBlockIndex => "ShortBlockIndex",
            FieldKind::Custom => "Custom",
        }
    }

    pub fn class(self) -> FieldClass {
        match self {
            FieldKind::Block => FieldClass::Block,
            FieldKind::Struct => FieldClass::Struct,
            FieldKind::Reference => FieldClass::Reference,
            FieldKind::CharEnum | FieldKind::ShortEnum | FieldKind::LongEnum => FieldClass::Enum,
            FieldKind::Flags | FieldKind::ByteFlags => FieldClass::Flags,
            FieldKind::Real => FieldClass::ElementSingle,
            FieldKind::ShortInteger | FieldKind::LongInteger => FieldClass::ElementInteger,
            FieldKind::RealPoint2d
            | FieldKind::RealPoint3d
            | FieldKind::RealVector3d
            | FieldKind::RealEulerAngles2d
            | FieldKind::RealEulerAngles3d
            | FieldKind::RealQuaternion
            | FieldKind::RealBounds
            | FieldKind::AngleBounds
            | FieldKind::RealArgbColor => FieldClass::ElementArraySingle,
            FieldKind::StringId => FieldClass::StringId,
            FieldKind::ShortBlockIndex => FieldClass::BlockIndex,
            FieldKind::Custom => FieldClass::CustomFunction,
        }
    }

    /// Number of floats held by an array-valued kind
    pub fn arity(self) -> Option<usize> {
        match self {
            FieldKind::RealPoint2d
            | FieldKind::RealEulerAngles2d
            | FieldKind::RealBounds
            | FieldKind::AngleBounds => Some(2),
            FieldKind::RealPoint3d | FieldKind::RealVector3d | FieldKind::RealEulerAngles3d => {
                Some(3)
            }
            FieldKind::RealQuaternion | FieldKind::RealArgbColor => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown field kind '{}'", s))
    }
}

impl FieldClass {
    pub fn name(self) -> &'static str {
        match self {
            FieldClass::Block => "block",
            FieldClass::Struct => "struct",
            FieldClass::Reference => "reference",
            FieldClass::Enum => "enum",
            FieldClass::Flags => "flags",
            FieldClass::ElementSingle => "real",
            FieldClass::ElementInteger => "integer",
            FieldClass::ElementArraySingle => "real array",
            FieldClass::StringId => "string id",
            FieldClass::BlockIndex => "block index",
            FieldClass::CustomFunction => "function",
        }
    }
}

/// Which schema a tag document was authored against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaGeneration {
    /// Older layout with split resources and shader-based decals
    Legacy,
    /// Newer layout with object ids and material-based decals
    Modern,
}

impl fmt::Display for SchemaGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaGeneration::Legacy => f.write_str("legacy"),
            SchemaGeneration::Modern => f.write_str("modern"),
        }
    }
}

impl FromStr for SchemaGeneration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "reach" => Ok(SchemaGeneration::Legacy),
            "modern" | "h2a" => Ok(SchemaGeneration::Modern),
            other => Err(format!("unknown schema generation '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_name_round_trip() {
        for kind in FieldKind::ALL {
            assert_eq!(kind.name().parse::<FieldKind>(), Ok(kind));
        }
        assert!("Bogus".parse::<FieldKind>().is_err());
    }

    #[test]
    fn test_kind_classes() {
        assert_eq!(FieldKind::CharEnum.class(), FieldClass::Enum);
        assert_eq!(FieldKind::ByteFlags.class(), FieldClass::Flags);
        assert_eq!(FieldKind::RealQuaternion.class(), FieldClass::ElementArraySingle);
        assert_eq!(FieldKind::StringId.name(), "StringID");
    }

    #[test]
    fn test_arity() {
        assert_eq!(FieldKind::RealPoint3d.arity(), Some(3));
        assert_eq!(FieldKind::RealQuaternion.arity(), Some(4));
        assert_eq!(FieldKind::AngleBounds.arity(), Some(2));
        assert_eq!(FieldKind::Real.arity(), None);
    }

    #[test]
    fn test_generation_parse() {
        assert_eq!("Reach".parse::<SchemaGeneration>(), Ok(SchemaGeneration::Legacy));
        assert_eq!("modern".parse::<SchemaGeneration>(), Ok(SchemaGeneration::Modern));
        assert!("h3".parse::<SchemaGeneration>().is_err());
    }
}
