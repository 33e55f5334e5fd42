use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;

/// Identifier of a document within a corpus run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        DocumentId(id.into())
    }

    /// Read an id from `field` of a JSON object.
    ///
    /// Strings are taken verbatim and integers rendered in decimal; any other
    /// value (or a missing field) yields `None`.
    pub fn from_field(value: &Value, field: &str) -> Option<Self> {
        match value.get(field)? {
            Value::String(s) => Some(DocumentId::new(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(DocumentId::new(n.to_string())),
            _ => None,
        }
    }

    /// Synthetic id for documents that carry none of their own
    pub fn generated(counter: &mut u64) -> Self {
        *counter += 1;
        DocumentId(format!("_gen_{}", counter))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal value of a document
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    /// Byte length of the compact JSON form of this scalar
    pub fn serialized_len(&self) -> usize {
        match self {
            Scalar::Null => 4,
            Scalar::Bool(true) => 4,
            Scalar::Bool(false) => 5,
            Scalar::Number(n) => n.to_string().len(),
            Scalar::String(s) => json_string_len(s),
        }
    }
}

/// A retrieved record, modelled as an arbitrary nested value
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Scalar(Scalar),
    Sequence(Vec<Document>),
    /// Keyed members in insertion order
    Mapping(Vec<(String, Document)>),
    /// A value outside the document model, kept only so it can be reported
    Opaque { type_name: String },
}

impl Document {
    pub fn opaque(type_name: impl Into<String>) -> Self {
        Document::Opaque {
            type_name: type_name.into(),
        }
    }

    /// Look up a direct member of a mapping
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Document::Mapping(members) => members
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Document::Scalar(Scalar::Null),
            Value::Bool(b) => Document::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Document::Scalar(Scalar::Number(n)),
            Value::String(s) => Document::Scalar(Scalar::String(s)),
            Value::Array(items) => Document::Sequence(items.into_iter().map(Document::from).collect()),
            Value::Object(members) => Document::Mapping(
                members
                    .into_iter()
                    .map(|(key, value)| (key, Document::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Number(n) => n.serialize(serializer),
            Scalar::String(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Document::Scalar(scalar) => scalar.serialize(serializer),
            Document::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Document::Mapping(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (key, value) in members {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Document::Opaque { type_name } => Err(S::Error::custom(format!(
                "cannot serialize value of type `{}`",
                type_name
            ))),
        }
    }
}

/// A document paired with its resolved identifier
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub id: DocumentId,
    pub body: Document,
}

impl SourceDocument {
    pub fn new(id: DocumentId, body: impl Into<Document>) -> Self {
        SourceDocument {
            id,
            body: body.into(),
        }
    }
}

/// Length of `s` once quoted and escaped the way serde_json writes strings
pub(crate) fn json_string_len(s: &str) -> usize {
    2 + s
        .bytes()
        .map(|b| match b {
            b'"' | b'\\' | b'\n' | b'\r' | b'\t' | 0x08 | 0x0c => 2,
            0x00..=0x1f => 6,
            _ => 1,
        })
        .sum::<usize>()
}
