//! Address data and the mappings that connect it to a form.
//!
//! # Design
//! `AddressRecord` keeps the service's JSON object verbatim: no renaming, no
//! normalization. The link between the five logical address fields and the
//! service's key names lives in `ResponseSchema`, which is configuration, so a
//! provider that renames `city` only needs a config change. `FieldBinding`
//! stores only the caller's overrides; every field falls back to the identity
//! mapping (`cidade` → `"cidade"`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The logical address attributes a form can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressField {
    Cep,
    Rua,
    Bairro,
    Cidade,
    Estado,
}

impl AddressField {
    pub const ALL: [AddressField; 5] = [
        AddressField::Cep,
        AddressField::Rua,
        AddressField::Bairro,
        AddressField::Cidade,
        AddressField::Estado,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AddressField::Cep => "cep",
            AddressField::Rua => "rua",
            AddressField::Bairro => "bairro",
            AddressField::Cidade => "cidade",
            AddressField::Estado => "estado",
        }
    }
}

/// Decoded response body, exactly as the service sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressRecord(Map<String, Value>);

impl AddressRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for hosts that assemble records by hand.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Scalar value under `key` rendered as text. `null`, arrays and objects
    /// count as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Value for a logical field: the logical key itself first, then the
    /// remote key named by `schema`.
    pub fn field(&self, field: AddressField, schema: &ResponseSchema) -> Option<String> {
        self.text(field.as_str())
            .or_else(|| self.text(schema.remote_key(field)))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for AddressRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Remote JSON key for each logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseSchema {
    pub cep: String,
    pub rua: String,
    pub bairro: String,
    pub cidade: String,
    pub estado: String,
}

impl Default for ResponseSchema {
    /// BrasilAPI v1 key names.
    fn default() -> Self {
        Self {
            cep: "cep".to_string(),
            rua: "street".to_string(),
            bairro: "neighborhood".to_string(),
            cidade: "city".to_string(),
            estado: "state".to_string(),
        }
    }
}

impl ResponseSchema {
    pub fn remote_key(&self, field: AddressField) -> &str {
        match field {
            AddressField::Cep => &self.cep,
            AddressField::Rua => &self.rua,
            AddressField::Bairro => &self.bairro,
            AddressField::Cidade => &self.cidade,
            AddressField::Estado => &self.estado,
        }
    }
}

/// Per-call overrides of the logical field → form element id mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldBinding(BTreeMap<AddressField, String>);

impl FieldBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `field` to the element `target_id` instead of its default.
    pub fn bind(mut self, field: AddressField, target_id: impl Into<String>) -> Self {
        self.0.insert(field, target_id.into());
        self
    }

    /// The caller's override for `field`, if any.
    pub fn get(&self, field: AddressField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Target element id for `field` after merging overrides over defaults.
    pub fn target(&self, field: AddressField) -> &str {
        self.get(field).unwrap_or_else(|| field.as_str())
    }

    /// Every logical field with its resolved target, in `AddressField::ALL`
    /// order.
    pub fn resolved(&self) -> impl Iterator<Item = (AddressField, &str)> + '_ {
        AddressField::ALL
            .into_iter()
            .map(move |field| (field, self.target(field)))
    }
}

impl<S: Into<String>> FromIterator<(AddressField, S)> for FieldBinding {
    fn from_iter<I: IntoIterator<Item = (AddressField, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(f, s)| (f, s.into())).collect())
    }
}
