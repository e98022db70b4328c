pub mod document;
pub mod error;
pub mod id;
pub mod path;
pub mod schema;
pub mod serializer;
pub mod store;
pub mod system_db;
pub mod validation;

pub use document::Document;
pub use error::{DocModelError, Result};
pub use schema::{Association, Schema, SchemaBuilder, SchemaDefinition, StoreDefinition};
pub use serializer::Format;
pub use store::{Store, StoreOptions};
pub use validation::{Field, FieldError};
