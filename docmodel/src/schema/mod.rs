pub mod definition;
pub mod parser;
pub mod types;

pub use definition::{Association, Schema, SchemaBuilder};
pub use parser::{parse_definition, parse_definition_str};
pub use types::{FieldDefinition, FieldEntry, SchemaDefinition, StoreDefinition};
