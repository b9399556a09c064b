use crate::ast::FrontMatter;
use crate::error::{Error, Result};
use crate::format::MetadataFormat;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Deserializes `input` into a JSON object; an empty document yields an empty object.
pub fn deserialize(format: MetadataFormat, input: &str) -> Result<Value> {
    if input.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = match format {
        MetadataFormat::Json => serde_json::from_str::<Value>(input)
            .map_err(|e| Error::Deserialization(format!("Failed JSON deserialization: {}", e)))?,
        MetadataFormat::Yaml => serde_yaml::from_str::<Value>(input)
            .map_err(|e| Error::Deserialization(format!("Failed YAML deserialization: {}", e)))?,
        MetadataFormat::Toml => toml::from_str::<Value>(input)
            .map_err(|e| Error::Deserialization(format!("Failed TOML deserialization: {}", e)))?,
    };
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        other => Err(Error::Deserialization(format!(
            "Metadata must be a mapping, found: {}",
            other
        ))),
    }
}

pub fn from_front_matter(front_matter: &FrontMatter) -> Result<Value> {
    match front_matter {
        FrontMatter::Yaml(text) => deserialize(MetadataFormat::Yaml, text),
        FrontMatter::Toml(text) => deserialize(MetadataFormat::Toml, text),
    }
}

pub fn read_file(path: &Path) -> Result<Value> {
    let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    let format = MetadataFormat::from_ext(ext)?;
    let input = std::fs::read_to_string(path).map_err(|e| {
        Error::IO(format!(
            "Failed to read metadata file '{}': {}",
            path.display(),
            e
        ))
    })?;
    deserialize(format, &input)
}

/// Shallow merge: keys of `overrides` replace those of `base`.
pub fn merge(base: Value, overrides: Value) -> Value {
    match (base, overrides) {
        (Value::Object(mut base), Value::Object(overrides)) => {
            base.extend(overrides);
            Value::Object(base)
        }
        (base, Value::Object(overrides)) if overrides.is_empty() => base,
        (_, overrides) => overrides,
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
struct Fields {
    title: Option<Value>,
    subtitle: Option<Value>,
    author: Option<OneOrMany>,
    date: Option<Value>,
}

/// TOML dates arrive as a single-entry object wrapping the date string.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Object(map) if map.len() == 1 => {
            map.into_iter().next().and_then(|(_, v)| scalar_text(v))
        }
        other => Some(other.to_string()),
    }
}

/// Well-known document fields used to build standalone headers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub date: Option<String>,
    pub raw: Value,
}

impl Metadata {
    pub fn from_value(raw: Value) -> Result<Self> {
        let fields: Fields = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Deserialization(format!("Invalid metadata field: {}", e)))?;
        let authors = match fields.author {
            Some(OneOrMany::One(author)) => vec![author],
            Some(OneOrMany::Many(authors)) => authors,
            None => Vec::new(),
        };
        Ok(Metadata {
            title: fields.title.and_then(scalar_text),
            subtitle: fields.subtitle.and_then(scalar_text),
            authors,
            date: fields.date.and_then(scalar_text),
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_all_formats_into_objects() {
        let yaml = deserialize(MetadataFormat::Yaml, "title: Hi\nauthor: [a, b]\n").unwrap();
        assert_eq!(yaml, json!({"title": "Hi", "author": ["a", "b"]}));
        let toml = deserialize(MetadataFormat::Toml, "title = \"Hi\"\n").unwrap();
        assert_eq!(toml, json!({"title": "Hi"}));
        let json = deserialize(MetadataFormat::Json, "{\"date\": \"2024\"}").unwrap();
        assert_eq!(json, json!({"date": "2024"}));
        assert_eq!(deserialize(MetadataFormat::Yaml, "\n").unwrap(), json!({}));
    }

    #[test]
    fn rejects_malformed_and_non_mapping_metadata() {
        let err = deserialize(MetadataFormat::Json, "{").unwrap_err();
        assert!(err.to_string().starts_with("Failed JSON deserialization"));
        assert!(matches!(
            deserialize(MetadataFormat::Yaml, "- a\n- b\n"),
            Err(Error::Deserialization(_))
        ));
    }

    #[test]
    fn document_metadata_wins_over_file_metadata() {
        let merged = merge(
            json!({"title": "File", "date": "2020"}),
            json!({"title": "Doc"}),
        );
        assert_eq!(merged, json!({"title": "Doc", "date": "2020"}));
    }

    #[test]
    fn author_may_be_a_string_or_a_list() {
        let one = Metadata::from_value(json!({"author": "Ada"})).unwrap();
        assert_eq!(one.authors, vec!["Ada".to_string()]);
        let many = Metadata::from_value(json!({"author": ["Ada", "Grace"], "title": "T"})).unwrap();
        assert_eq!(many.authors.len(), 2);
        assert_eq!(many.title.as_deref(), Some("T"));
        assert!(Metadata::from_value(json!({"author": 3})).is_err());
    }

    #[test]
    fn scalar_titles_are_rendered_as_text() {
        let meta = Metadata::from_value(json!({"title": 1984, "subtitle": true})).unwrap();
        assert_eq!(meta.title.as_deref(), Some("1984"));
        assert_eq!(meta.subtitle.as_deref(), Some("true"));
        assert_eq!(Metadata::from_value(json!({"title": null})).unwrap().title, None);
    }
}
