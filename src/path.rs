//! Attribute paths: positions inside a document reached by successive containment.
//!
//! Paths render the way index field names are usually written: `a`, `b[0]`,
//! `c.x`, `b[1].y`. The document root is the empty path and renders as `$`.
//! Keys that would be ambiguous in that notation (empty, or containing `.`,
//! `[`, `]` or `"`) render in bracketed JSON-string form, e.g. `a["x.y"]`.

use crate::error::PathParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

static SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:\[(\d+)\]|\[("(?:[^"\\]|\\.)*")\]|(\.)?([^.\[\]"]+))"#).unwrap()
});

const ROOT: &str = "$";

/// One hop of containment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Member of a mapping
    Key(String),
    /// Element of a sequence
    Index(usize),
}

impl Segment {
    fn key_needs_quoting(key: &str, first: bool) -> bool {
        key.is_empty()
            || (first && key == ROOT)
            || key.contains(|c| matches!(c, '.' | '[' | ']' | '"'))
    }
}

/// Ordered sequence of segments from the document root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributePath {
    segments: Vec<Segment>,
}

impl AttributePath {
    /// The empty path, addressing the whole document
    pub fn root() -> Self {
        AttributePath::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        AttributePath { segments }
    }

    /// Path of the member `key` of the mapping at this path
    pub fn child_key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        AttributePath { segments }
    }

    /// Path of element `index` of the sequence at this path
    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        AttributePath { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of containment hops from the root
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if any hop on the way down is a sequence element
    pub fn is_within_sequence(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Index(_)))
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(ROOT);
        }

        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Index(index) => write!(f, "[{}]", index)?,
                Segment::Key(key) if Segment::key_needs_quoting(key, position == 0) => {
                    let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                    write!(f, "[{}]", quoted)?;
                }
                Segment::Key(key) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for AttributePath {
    type Err = PathParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input == ROOT {
            return Ok(AttributePath::root());
        }

        let error = |offset: usize| PathParseError {
            input: input.to_string(),
            offset,
        };

        if input.is_empty() {
            return Err(error(0));
        }

        let mut segments = Vec::new();
        let mut offset = 0;

        while offset < input.len() {
            let rest = &input[offset..];
            let captures = SEGMENT_REGEX.captures(rest).ok_or_else(|| error(offset))?;

            if let Some(index) = captures.get(1) {
                let index = index.as_str().parse().map_err(|_| error(offset))?;
                segments.push(Segment::Index(index));
            } else if let Some(quoted) = captures.get(2) {
                let key: String =
                    serde_json::from_str(quoted.as_str()).map_err(|_| error(offset))?;
                segments.push(Segment::Key(key));
            } else if let Some(key) = captures.get(4) {
                // Bare keys need a leading dot everywhere except at the start
                let dotted = captures.get(3).is_some();
                if dotted == segments.is_empty() {
                    return Err(error(offset));
                }
                segments.push(Segment::Key(key.as_str().to_string()));
            }

            offset += captures.get(0).map_or(0, |m| m.end());
        }

        Ok(AttributePath { segments })
    }
}

impl Serialize for AttributePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AttributePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rendered = String::deserialize(deserializer)?;
        rendered.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_paths() {
        let root = AttributePath::root();
        assert_eq!(root.to_string(), "$");

        let path = root.child_key("b").child_index(1).child_key("y");
        assert_eq!(path.to_string(), "b[1].y");
        assert_eq!(path.depth(), 3);
        assert!(path.is_within_sequence());

        let nested = root.child_key("c").child_key("x");
        assert_eq!(nested.to_string(), "c.x");
        assert!(!nested.is_within_sequence());
    }

    #[test]
    fn test_render_awkward_keys() {
        let path = AttributePath::root().child_key("a").child_key("x.y");
        assert_eq!(path.to_string(), r#"a["x.y"]"#);

        let dollar = AttributePath::root().child_key("$");
        assert_eq!(dollar.to_string(), r#"["$"]"#);

        let empty = AttributePath::root().child_key("");
        assert_eq!(empty.to_string(), r#"[""]"#);
    }

    #[test]
    fn test_parse_paths() {
        let path: AttributePath = "immediate_ancestors[0].metadata.size".parse().unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("immediate_ancestors".to_string()),
                Segment::Index(0),
                Segment::Key("metadata".to_string()),
                Segment::Key("size".to_string()),
            ]
        );

        let root: AttributePath = "$".parse().unwrap();
        assert!(root.is_root());

        let quoted: AttributePath = r#"a["x.y"][2]"#.parse().unwrap();
        assert_eq!(quoted, AttributePath::root().child_key("a").child_key("x.y").child_index(2));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("".parse::<AttributePath>().is_err());
        assert!(".a".parse::<AttributePath>().is_err());
        assert!("a..b".parse::<AttributePath>().is_err());
        assert!("a[x]".parse::<AttributePath>().is_err());
        assert!("ab".parse::<AttributePath>().is_ok());

        let err = "a[1]b".parse::<AttributePath>().unwrap_err();
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn test_serde_as_string() {
        let path = AttributePath::root().child_key("b").child_index(0);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#""b[0]""#);

        let back: AttributePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
