//! Editable per-image metadata produced by analysis.
//!
//! The set is the source of truth for publish. It is replaced wholesale when
//! analysis completes and otherwise only changes one field at a time.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Title/category/description/keywords for one uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub filename: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: String,
}

impl MetadataRecord {
    pub fn field(&self, field: MetadataField) -> &str {
        match field {
            MetadataField::Title => &self.title,
            MetadataField::Category => &self.category,
            MetadataField::Description => &self.description,
            MetadataField::Keywords => &self.keywords,
        }
    }

    fn field_mut(&mut self, field: MetadataField) -> &mut String {
        match field {
            MetadataField::Title => &mut self.title,
            MetadataField::Category => &mut self.category,
            MetadataField::Description => &mut self.description,
            MetadataField::Keywords => &mut self.keywords,
        }
    }
}

/// User-editable text fields of a [`MetadataRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Title,
    Category,
    Description,
    Keywords,
}

impl MetadataField {
    pub const ALL: [MetadataField; 4] = [
        MetadataField::Title,
        MetadataField::Category,
        MetadataField::Description,
        MetadataField::Keywords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Title => "title",
            MetadataField::Category => "category",
            MetadataField::Description => "description",
            MetadataField::Keywords => "keywords",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metadata field {0:?} (expected one of: title, category, description, keywords)")]
pub struct UnknownField(pub String);

impl FromStr for MetadataField {
    type Err = UnknownField;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        MetadataField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| UnknownField(raw.to_string()))
    }
}

/// Ordered metadata records, in analysis response order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataSet(Vec<MetadataRecord>);

impl MetadataSet {
    pub fn from_records(records: Vec<MetadataRecord>) -> Self {
        Self(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MetadataRecord> {
        self.0.get(index)
    }

    pub fn records(&self) -> &[MetadataRecord] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.0.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    /// Replace one field of the record at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of bounds; callers own the bounds check.
    pub(crate) fn set_field(&mut self, index: usize, field: MetadataField, value: String) {
        let len = self.0.len();
        let Some(record) = self.0.get_mut(index) else {
            panic!("metadata index {index} out of bounds for {len} records");
        };
        *record.field_mut(field) = value;
    }
}
