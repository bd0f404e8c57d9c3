//! Raw catalog export shape.
//!
//! The export is a single JSON object keyed by the game id (decimal string)
//! whose values are loosely typed attribute bags. Only the attributes the
//! warehouse consumes are modelled; everything else in the dump (tags,
//! screenshots, long descriptions, ...) is ignored during deserialization.

use indexmap::IndexMap;
use serde::Deserialize;
use std::{fmt, fs, path::Path};
use thiserror::Error;

/// A single attribute value as it appears in the export.
///
/// The dump is not consistent about types (`"17"` vs `17`, `"true"` vs
/// `true`), so every field is captured as-is and coerced later.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Arrays and objects; never coercible to a scalar field.
    Other(serde_json::Value),
}

impl RawScalar {
    /// Passthrough rendering for optional text fields.
    pub fn into_text(self) -> String {
        match self {
            RawScalar::Text(s) => s,
            RawScalar::Bool(b) => b.to_string(),
            RawScalar::Int(i) => i.to_string(),
            RawScalar::Float(f) => f.to_string(),
            RawScalar::Other(v) => v.to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawScalar::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for RawScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawScalar::Text(s) => write!(f, "{s:?}"),
            RawScalar::Bool(b) => write!(f, "{b}"),
            RawScalar::Int(i) => write!(f, "{i}"),
            RawScalar::Float(v) => write!(f, "{v}"),
            RawScalar::Other(v) => write!(f, "{v}"),
        }
    }
}

/// One game's attribute bag. Absent and `null` attributes both land as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceRecord {
    pub name: Option<RawScalar>,
    pub release_date: Option<RawScalar>,
    pub required_age: Option<RawScalar>,
    pub price: Option<RawScalar>,
    pub website: Option<RawScalar>,
    pub windows: Option<RawScalar>,
    pub mac: Option<RawScalar>,
    pub linux: Option<RawScalar>,
    pub metacritic_score: Option<RawScalar>,
    pub metacritic_url: Option<RawScalar>,
    pub achievements: Option<RawScalar>,
    pub recommendations: Option<RawScalar>,
    pub short_description: Option<RawScalar>,
    pub user_score: Option<RawScalar>,
    pub positive: Option<RawScalar>,
    pub negative: Option<RawScalar>,
    pub estimated_owners: Option<RawScalar>,
    pub average_playtime_forever: Option<RawScalar>,
    pub peak_ccu: Option<RawScalar>,
}

/// Source key -> attribute bag, in document order.
pub type SourceCollection = IndexMap<String, SourceRecord>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read source file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed source document")]
    Parse(#[from] serde_json::Error),
}

/// Parse a whole export document. Any structural problem (top level is not
/// an object, a game entry is not an object, invalid JSON) fails the document.
pub fn parse_source_document(raw: &str) -> Result<SourceCollection, SourceError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn read_source_file(path: &Path) -> Result<SourceCollection, SourceError> {
    let raw = fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_source_document(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_document_order_of_keys() {
        let doc = r#"{"30": {"name": "C"}, "10": {"name": "A"}, "20": {"name": "B"}}"#;
        let parsed = parse_source_document(doc).expect("parse");
        let keys: Vec<&str> = parsed.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["30", "10", "20"]);
    }

    #[test]
    fn null_and_absent_fields_are_none() {
        let doc = r#"{"1": {"name": null, "tags": {"Indie": 3}}}"#;
        let parsed = parse_source_document(doc).expect("parse");
        let rec = &parsed["1"];
        assert_eq!(rec.name, None);
        assert_eq!(rec.price, None);
    }

    #[test]
    fn captures_loose_scalar_types() {
        let doc = r#"{"1": {"required_age": "17", "price": 9.99, "windows": "true", "mac": 1, "linux": [1]}}"#;
        let parsed = parse_source_document(doc).expect("parse");
        let rec = &parsed["1"];
        assert_eq!(rec.required_age, Some(RawScalar::Text("17".into())));
        assert_eq!(rec.price, Some(RawScalar::Float(9.99)));
        assert_eq!(rec.windows, Some(RawScalar::Text("true".into())));
        assert_eq!(rec.mac, Some(RawScalar::Int(1)));
        assert!(matches!(rec.linux, Some(RawScalar::Other(_))));
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(matches!(
            parse_source_document(r#"[{"name": "A"}]"#),
            Err(SourceError::Parse(_))
        ));
        assert!(matches!(
            parse_source_document(r#"{"1": "not a record"}"#),
            Err(SourceError::Parse(_))
        ));
        assert!(matches!(
            parse_source_document(r#"{"1": {"name": "A"}"#),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn parse_error_names_its_cause_once() {
        let err = parse_source_document("{").expect_err("truncated");
        assert_eq!(err.to_string(), "malformed source document");
        let chain = format!("{:#}", anyhow::Error::new(err));
        assert!(chain.starts_with("malformed source document: "));
        assert_eq!(chain.matches("EOF while parsing").count(), 1);
    }
}
