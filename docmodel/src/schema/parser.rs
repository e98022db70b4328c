use crate::error::Result;
use super::types::StoreDefinition;
use std::path::Path;

/// Parse a schema definition file into a StoreDefinition
pub fn parse_definition(path: &Path) -> Result<StoreDefinition> {
    let content = std::fs::read_to_string(path)?;
    parse_definition_str(&content)
}

/// Parse a schema definition YAML string into a StoreDefinition
pub fn parse_definition_str(content: &str) -> Result<StoreDefinition> {
    let definition: StoreDefinition = serde_yaml::from_str(content)?;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldEntry, SchemaBuilder};
    use crate::serializer::Format;
    use crate::system_db::SystemDb;
    use std::rc::Rc;

    const DEFINITION: &str = r#"
database: restaurants.db
atomic_saves: true
schemas:
  restaurants:
    fields:
      - name: name
        required: true
        max_length: 80
      - name: slug
        pattern: "^[a-z0-9-]+$"
      - phone
      - name: status
        enum: [open, closed]
    have_one:
      address:
        format: json
        fields:
          - street
          - name: postcode
            min_length: 4
  people:
    fields:
      - name: name
        required: true
"#;

    #[test]
    fn test_parse_definition() {
        let definition = parse_definition_str(DEFINITION).unwrap();
        assert_eq!(definition.database.as_deref(), Some("restaurants.db"));
        assert!(definition.atomic_saves);
        assert_eq!(definition.schemas.len(), 2);

        let restaurants = &definition.schemas["restaurants"];
        assert_eq!(restaurants.format, Format::Yaml);
        let names: Vec<&str> = restaurants.fields.iter().map(FieldEntry::name).collect();
        assert_eq!(names, vec!["name", "slug", "phone", "status"]);
        assert!(matches!(restaurants.fields[2], FieldEntry::Name(_)));

        let address = &restaurants.have_one["address"];
        assert_eq!(address.format, Format::Json);
        assert_eq!(address.fields.len(), 2);
    }

    #[test]
    fn test_empty_definition() {
        let definition = parse_definition_str("{}").unwrap();
        assert!(definition.database.is_none());
        assert!(!definition.atomic_saves);
        assert!(definition.schemas.is_empty());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = parse_definition_str("schemas:\n  people:\n    format: xml\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_definition_constraints() {
        let definition = parse_definition_str(DEFINITION).unwrap();
        let mut builder = SchemaBuilder::new("restaurants");
        definition.schemas["restaurants"].apply(&mut builder).unwrap();

        let db = Rc::new(SystemDb::open_in_memory().unwrap());
        let schema = builder.build(db, false).unwrap();

        assert_eq!(
            schema.field("name").unwrap().constraint_names(),
            vec!["cant_be_blank", "max_length"]
        );
        assert_eq!(schema.field("slug").unwrap().constraint_names(), vec!["matches"]);
        assert!(schema.field("phone").unwrap().constraint_names().is_empty());
        assert_eq!(schema.field("status").unwrap().constraint_names(), vec!["one_of"]);

        let address = schema.association("address").unwrap();
        assert_eq!(address.format(), Format::Json);
        assert_eq!(address.field("postcode").unwrap().constraint_names(), vec!["min_length"]);
    }

    #[test]
    fn test_apply_rejects_bad_pattern() {
        let definition = parse_definition_str(
            "schemas:\n  people:\n    fields:\n      - name: code\n        pattern: \"(\"\n",
        )
        .unwrap();
        let mut builder = SchemaBuilder::new("people");
        assert!(definition.schemas["people"].apply(&mut builder).is_err());
    }
}
