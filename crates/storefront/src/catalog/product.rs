//! Normalized product records.

use heritage_core::ProductId;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{CULTURE_FIELD, OCCASIONS_FIELD};
use crate::store::Document;

/// A product as the storefront sees it: the store id plus every stored field.
///
/// Serializes flat, as `{ "id": ..., ...fields }`. Fields beyond `culture` and
/// `occasions` belong to the store's schema and are passed through untyped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// Store-assigned id.
    pub id: ProductId,
    /// Stored fields, excluding any stored `id`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Product {
    /// Normalize a stored document.
    ///
    /// A stored `id` field is dropped; the document key is authoritative.
    #[must_use]
    pub fn from_document(document: Document) -> Self {
        let mut fields = document.fields;
        fields.remove("id");
        Self {
            id: ProductId::new(document.id),
            fields,
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Culture tag, if the product has one.
    #[must_use]
    pub fn culture(&self) -> Option<&str> {
        self.str_field(CULTURE_FIELD)
    }

    /// Occasion tags. Non-string entries are skipped.
    #[must_use]
    pub fn occasions(&self) -> Vec<&str> {
        self.fields
            .get(OCCASIONS_FIELD)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Display name: `name`, then `title`, then the id.
    #[must_use]
    pub fn name(&self) -> &str {
        self.str_field("name")
            .or_else(|| self.str_field("title"))
            .unwrap_or_else(|| self.id.as_str())
    }

    /// Long description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.str_field("description")
    }

    /// Price formatted for display. Numbers get two decimals.
    #[must_use]
    pub fn price(&self) -> Option<String> {
        match self.fields.get("price")? {
            Value::Number(n) => n.as_f64().map(|amount| format!("{amount:.2}")),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// Image URL from `imageUrl` or `image`.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.str_field("imageUrl").or_else(|| self.str_field("image"))
    }
}
