//! Path expressions addressing fields inside a tag document
//!
//! A path is a `/`-separated list of segments of the form `Kind:name` or
//! `Kind:name[index]`. Names may contain spaces and punctuation
//! (`Struct:actual shader?`, `Real:don't play distance`). Only block
//! segments that are followed by another segment carry an index.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use super::types::FieldKind;
use crate::error::{Error, Result};

/// One parsed path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub kind: FieldKind,
    pub name: String,
    pub index: Option<usize>,
}

/// A parsed field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

fn segment_regex() -> std::result::Result<&'static Regex, String> {
    static SEGMENT: OnceLock<std::result::Result<Regex, String>> = OnceLock::new();
    SEGMENT
        .get_or_init(|| {
            Regex::new(r"^([A-Za-z][A-Za-z0-9]*):([^\[\]/:]+?)(?:\[(\d+)\])?$")
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| e.clone())
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidPath {
            path: path.to_string(),
            reason,
        };

        if path.is_empty() {
            return Err(invalid("empty path".into()));
        }

        let raw: Vec<&str> = path.split('/').collect();
        let mut segments = Vec::with_capacity(raw.len());

        for (i, part) in raw.iter().enumerate() {
            let is_last = i + 1 == raw.len();
            if part.is_empty() {
                return Err(invalid(format!("empty segment at position {}", i)));
            }

            let caps = segment_regex()
                .map_err(&invalid)?
                .captures(part)
                .ok_or_else(|| invalid(format!("malformed segment '{}'", part)))?;

            let kind: FieldKind = caps[1].parse().map_err(&invalid)?;
            let name = caps[2].to_string();
            let index = match caps.get(3) {
                Some(m) => Some(
                    m.as_str()
                        .parse::<usize>()
                        .map_err(|e| invalid(format!("bad index in '{}': {}", part, e)))?,
                ),
                None => None,
            };

            if is_last {
                if index.is_some() {
                    return Err(invalid(format!("final segment '{}' cannot be indexed", part)));
                }
            } else {
                match (kind, index) {
                    (FieldKind::Struct, None) | (FieldKind::Block, Some(_)) => {}
                    (FieldKind::Block, None) => {
                        return Err(invalid(format!("block segment '{}' needs an index", part)))
                    }
                    _ => {
                        return Err(invalid(format!(
                            "segment '{}' cannot contain further fields",
                            part
                        )))
                    }
                }
            }

            segments.push(PathSegment { kind, name, index });
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The addressed field's kind
    pub fn leaf_kind(&self) -> FieldKind {
        // parse() never yields an empty path
        self.segments
            .last()
            .map(|s| s.kind)
            .unwrap_or(FieldKind::Struct)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)?;
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FieldPath::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let path = FieldPath::parse("Block:scenery[2]/Struct:object data/RealPoint3d:position")
            .unwrap();
        let segs = path.segments();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].kind, FieldKind::Block);
        assert_eq!(segs[0].index, Some(2));
        assert_eq!(segs[1].name, "object data");
        assert_eq!(path.leaf_kind(), FieldKind::RealPoint3d);
    }

    #[test]
    fn test_parse_punctuated_names() {
        let path = FieldPath::parse(
            "Block:decals[0]/Struct:actual shader?/Block:options[4]/ShortInteger:short",
        )
        .unwrap();
        assert_eq!(path.segments()[1].name, "actual shader?");

        let path =
            FieldPath::parse("Struct:override distance parameters/Real:don't play distance")
                .unwrap();
        assert_eq!(path.segments()[1].name, "don't play distance");
    }

    #[test]
    fn test_display_round_trip() {
        let text = "Block:trigger volumes[1]/Block:sector points[0]/RealEulerAngles2d:normal";
        assert_eq!(FieldPath::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "Block:scenery[0]//Real:scale",
            "scenery",
            "Block:scenery/Real:scale",
            "Real:scale[0]",
            "Real:scale/Real:other",
            "Block:scenery[x]/Real:scale",
            "Nope:scenery",
        ] {
            assert!(
                matches!(FieldPath::parse(bad), Err(Error::InvalidPath { .. })),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_block_without_index_is_leaf() {
        let path = FieldPath::parse("Block:scenery").unwrap();
        assert_eq!(path.segments()[0].index, None);
    }
}
