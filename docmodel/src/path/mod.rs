// Storage keys ("uids") for documents. A uid looks like the path portion of
// a URL: `/restaurants/tdfjtscvm3v1.yaml`, and for a have-one child
// `/restaurants/tdfjtscvm3v1/address.yaml`.

use crate::error::{DocModelError, Result};

/// Render the path of a document given the schema lineage (outermost schema
/// first) and the document id. Only the outermost schema carries the id;
/// nested have-one schemas share it and add their own name as a segment.
pub fn document_path<S: AsRef<str>>(lineage: &[S], id: &str) -> String {
    let mut segments = lineage.iter();
    let mut path = match segments.next() {
        Some(root) => format!("/{}/{id}", root.as_ref()),
        None => format!("/{id}"),
    };
    for name in segments {
        path.push('/');
        path.push_str(name.as_ref());
    }
    path
}

/// `path` plus the format extension.
pub fn document_uid<S: AsRef<str>>(lineage: &[S], id: &str, extension: &str) -> String {
    format!("{}.{extension}", document_path(lineage, id))
}

/// Schema, field and association names double as SQL identifiers and path
/// segments, so they are restricted to `[A-Za-z_][A-Za-z0-9_]*`.
pub fn check_name(kind: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DocModelError::Schema(format!(
            "Invalid {kind} name '{name}': expected letters, digits and underscores"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_path() {
        assert_eq!(document_path(&["restaurants"], "tdfjtscvm3v1"), "/restaurants/tdfjtscvm3v1");
        assert_eq!(
            document_uid(&["restaurants"], "tdfjtscvm3v1", "yaml"),
            "/restaurants/tdfjtscvm3v1.yaml"
        );
    }

    #[test]
    fn test_nested_paths_share_the_id() {
        assert_eq!(
            document_uid(&["restaurants", "address"], "tdfjtscvm3v1", "yaml"),
            "/restaurants/tdfjtscvm3v1/address.yaml"
        );
        assert_eq!(
            document_uid(&["restaurants", "address", "geo"], "tdfjtscvm3v1", "json"),
            "/restaurants/tdfjtscvm3v1/address/geo.json"
        );
    }

    #[test]
    fn test_uid_is_deterministic() {
        let a = document_uid(&["people"], "b2c3d4f5g6h7", "yaml");
        let b = document_uid(&["people".to_string()], "b2c3d4f5g6h7", "yaml");
        assert_eq!(a, b);
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("schema", "restaurants").is_ok());
        assert!(check_name("field", "_private_2").is_ok());
        assert!(check_name("field", "2fast").is_err());
        assert!(check_name("field", "has space").is_err());
        assert!(check_name("schema", "a/b").is_err());
        assert!(check_name("schema", "").is_err());
    }
}
