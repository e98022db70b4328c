use super::definition::SchemaBuilder;
use crate::error::Result;
use crate::serializer::Format;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level store definition parsed from a schema file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDefinition {
    /// Path of the SQLite database, relative to the working directory
    #[serde(default)]
    pub database: Option<String>,
    /// Wrap the payload and index writes of each save in one transaction
    #[serde(default)]
    pub atomic_saves: bool,
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaDefinition>,
}

/// Definition of a single schema, possibly nested under another one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub format: Format,
    /// Fields in serialization order
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
    #[serde(default)]
    pub have_one: BTreeMap<String, SchemaDefinition>,
}

/// A field is either a bare name or a name with constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Name(String),
    Definition(FieldDefinition),
}

/// Definition of a single field and its constraints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<String>>,
}

impl FieldEntry {
    pub fn name(&self) -> &str {
        match self {
            FieldEntry::Name(name) => name,
            FieldEntry::Definition(def) => &def.name,
        }
    }
}

impl SchemaDefinition {
    /// Declare this definition's fields and nested schemas on a builder.
    pub fn apply(&self, builder: &mut SchemaBuilder) -> Result<()> {
        builder.format(self.format);

        for entry in &self.fields {
            let field = builder.field(entry.name());
            let FieldEntry::Definition(def) = entry else {
                continue;
            };
            if def.required {
                field.cant_be_blank();
            }
            if let Some(min) = def.min_length {
                field.min_length(min);
            }
            if let Some(max) = def.max_length {
                field.max_length(max);
            }
            if let Some(pattern) = &def.pattern {
                field.matches(pattern)?;
            }
            if let Some(values) = &def.enum_values {
                field.one_of(values.iter().cloned());
            }
        }

        for (name, child) in &self.have_one {
            let mut result = Ok(());
            builder.have_one(name.as_str(), |nested| result = child.apply(nested));
            result?;
        }
        Ok(())
    }
}
