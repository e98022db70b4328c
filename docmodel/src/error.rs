use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocModelError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Unknown field '{field}' for schema '{schema}'")]
    UnknownField { schema: String, field: String },

    #[error("Unknown association '{name}' for schema '{schema}'")]
    UnknownAssociation { schema: String, name: String },

    #[error("Invalid document id: '{0}'")]
    InvalidId(String),

    #[error("Document not found: {schema}/{id}")]
    NotFound { schema: String, id: String },

    #[error("Failed to decode {format} payload: {message}")]
    Decode { format: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, DocModelError>;
