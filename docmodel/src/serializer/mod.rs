// Payload encodings, selected by a schema's format tag.

use crate::error::{DocModelError, Result};
use crate::validation::is_blank;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::str::FromStr;

/// Serialization format of a schema's payloads. The tag doubles as the uid
/// extension (`/restaurants/<id>.yaml`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Line-oriented `name: value` text, one field per line. Plain strings
    /// are written as-is, so the output is deterministic and diffable.
    #[default]
    Yaml,
    /// A single JSON object in field declaration order.
    Json,
}

impl Format {
    pub fn tag(&self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "yaml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            other => Err(DocModelError::Schema(format!("Unknown format tag '{other}'"))),
        }
    }

    /// Encode `fields` in the given order. Blank values are omitted.
    pub fn encode(&self, fields: &[(&str, &Value)]) -> Result<String> {
        let present = fields.iter().filter(|(_, value)| !is_blank(value));
        match self {
            Format::Yaml => {
                let mut lines = Vec::new();
                for (name, value) in present {
                    lines.push(format!("{name}: {}", line_value(value)?));
                }
                Ok(lines.join("\n"))
            }
            Format::Json => {
                let mut object = serde_json::Map::new();
                for (name, value) in present {
                    object.insert(name.to_string(), serde_json::to_value(value)?);
                }
                Ok(serde_json::to_string(&object)?)
            }
        }
    }

    /// Decode a payload back into `(name, value)` pairs in payload order.
    pub fn decode(&self, text: &str) -> Result<Vec<(String, Value)>> {
        match self {
            Format::Yaml => {
                let mut fields = Vec::new();
                for (number, line) in text.lines().enumerate() {
                    if line.is_empty() {
                        continue;
                    }
                    let (name, rest) = line.split_once(':').ok_or_else(|| {
                        self.decode_error(format!("line {} has no ':' separator", number + 1))
                    })?;
                    let raw = rest.strip_prefix(' ').unwrap_or(rest);
                    fields.push((name.trim().to_string(), self.parse_line_value(raw)?));
                }
                Ok(fields)
            }
            Format::Json => {
                let object: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(text).map_err(|e| self.decode_error(e.to_string()))?;
                let mut fields = Vec::with_capacity(object.len());
                for (name, value) in object {
                    fields.push((name, serde_yaml::to_value(value)?));
                }
                Ok(fields)
            }
        }
    }

    fn parse_line_value(&self, raw: &str) -> Result<Value> {
        if starts_structured(raw) {
            let json: serde_json::Value =
                serde_json::from_str(raw).map_err(|e| self.decode_error(e.to_string()))?;
            return Ok(serde_yaml::to_value(json)?);
        }
        Ok(bare_scalar(raw).unwrap_or_else(|| Value::String(raw.to_string())))
    }

    fn decode_error(&self, message: String) -> DocModelError {
        DocModelError::Decode {
            format: self.tag().to_string(),
            message,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Format {
    type Err = DocModelError;

    fn from_str(s: &str) -> Result<Self> {
        Format::from_tag(s)
    }
}

fn starts_structured(text: &str) -> bool {
    text.starts_with('"') || text.starts_with('[') || text.starts_with('{')
}

/// A bare token that reads as a JSON number or boolean, typed accordingly.
/// `0299999999` is not a JSON number (leading zero) and stays text.
fn bare_scalar(raw: &str) -> Option<Value> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => {
            serde_yaml::to_value(json).ok()
        }
        _ => None,
    }
}

/// Strings that would not read back as themselves are written as JSON literals.
fn needs_quoting(s: &str) -> bool {
    s.contains(|c: char| c == '\n' || c == '\r') || starts_structured(s) || bare_scalar(s).is_some()
}

/// Text written after `name: ` for one value.
fn line_value(value: &Value) -> Result<String> {
    Ok(match value {
        Value::String(s) if needs_quoting(s) => serde_json::to_string(s)?,
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => serde_json::to_string(value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn string(s: &str) -> Value {
        Value::String(s.into())
    }

    #[test]
    fn test_line_encoding_in_given_order() {
        let name = string("Ambalas");
        let slug = string("ambalas");
        let phone = string("0299999999");
        let text = Format::Yaml
            .encode(&[("name", &name), ("slug", &slug), ("phone", &phone)])
            .unwrap();
        assert_eq!(text, "name: Ambalas\nslug: ambalas\nphone: 0299999999");
    }

    #[test]
    fn test_blank_fields_omitted() {
        let name = string("Ambalas");
        let empty = string("");
        let text = Format::Yaml
            .encode(&[("name", &name), ("slug", &Value::Null), ("phone", &empty)])
            .unwrap();
        assert_eq!(text, "name: Ambalas");

        let nothing = Format::Yaml.encode(&[("slug", &Value::Null)]).unwrap();
        assert_eq!(nothing, "");
        assert!(Format::Yaml.decode(&nothing).unwrap().is_empty());
    }

    #[test]
    fn test_line_decoding() {
        let fields = Format::Yaml
            .decode("name: Ambalas\nslug: ambalas\nphone: 0299999999")
            .unwrap();
        assert_eq!(
            fields,
            vec![
                ("name".to_string(), string("Ambalas")),
                ("slug".to_string(), string("ambalas")),
                ("phone".to_string(), string("0299999999")),
            ]
        );
    }

    #[test]
    fn test_line_values_keep_colons_and_spaces() {
        let url = string("http://example.com: x");
        let padded = string("  padded ");
        let text = Format::Yaml
            .encode(&[("url", &url), ("padded", &padded)])
            .unwrap();
        let fields = Format::Yaml.decode(&text).unwrap();
        assert_eq!(fields[0].1, url);
        assert_eq!(fields[1].1, padded);
    }

    #[test]
    fn test_multiline_and_bracketed_strings_are_quoted() {
        let notes = string("first line\nsecond line");
        let bracketed = string("[not a list]");
        let text = Format::Yaml
            .encode(&[("notes", &notes), ("tag", &bracketed)])
            .unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(text, "notes: \"first line\\nsecond line\"\ntag: \"[not a list]\"");

        let fields = Format::Yaml.decode(&text).unwrap();
        assert_eq!(fields[0].1, notes);
        assert_eq!(fields[1].1, bracketed);
    }

    #[test]
    fn test_line_containers_and_scalars() {
        let tags = Value::Sequence(vec![string("thai"), string("cheap")]);
        let seats = Value::Number(40i64.into());
        let open = Value::Bool(true);
        let text = Format::Yaml
            .encode(&[("tags", &tags), ("seats", &seats), ("open", &open)])
            .unwrap();
        assert_eq!(text, "tags: [\"thai\",\"cheap\"]\nseats: 40\nopen: true");

        let fields = Format::Yaml.decode(&text).unwrap();
        assert_eq!(
            fields,
            vec![
                ("tags".to_string(), tags),
                ("seats".to_string(), seats),
                ("open".to_string(), open),
            ]
        );
    }

    #[test]
    fn test_line_signed_and_fractional_numbers() {
        let delta = Value::Number((-3i64).into());
        let rating = Value::Number(4.5f64.into());
        let text = Format::Yaml
            .encode(&[("delta", &delta), ("rating", &rating)])
            .unwrap();
        assert_eq!(text, "delta: -3\nrating: 4.5");

        let fields = Format::Yaml.decode(&text).unwrap();
        assert_eq!(fields[0].1, delta);
        assert_eq!(fields[1].1, rating);
    }

    #[test]
    fn test_scalar_looking_strings_stay_strings() {
        let seats = string("40");
        let open = string("false");
        let exponent = string("1e5");
        let text = Format::Yaml
            .encode(&[("seats", &seats), ("open", &open), ("code", &exponent)])
            .unwrap();
        assert_eq!(text, "seats: \"40\"\nopen: \"false\"\ncode: \"1e5\"");

        let fields = Format::Yaml.decode(&text).unwrap();
        assert_eq!(fields[0].1, seats);
        assert_eq!(fields[1].1, open);
        assert_eq!(fields[2].1, exponent);
    }

    #[test]
    fn test_non_json_tokens_stay_text() {
        let fields = Format::Yaml
            .decode("phone: 0299999999\nopen: yes\nnote: null")
            .unwrap();
        assert_eq!(fields[0].1, string("0299999999"));
        assert_eq!(fields[1].1, string("yes"));
        assert_eq!(fields[2].1, string("null"));
    }

    #[test]
    fn test_line_decoding_rejects_garbage() {
        let err = Format::Yaml.decode("name: ok\nno separator here").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_json_keeps_order_and_types() {
        let name = string("Ambalas");
        let seats = Value::Number(40i64.into());
        let text = Format::Json
            .encode(&[("name", &name), ("slug", &Value::Null), ("seats", &seats)])
            .unwrap();
        assert_eq!(text, r#"{"name":"Ambalas","seats":40}"#);

        let fields = Format::Json.decode(&text).unwrap();
        assert_eq!(
            fields,
            vec![("name".to_string(), name), ("seats".to_string(), seats)]
        );
    }

    #[test]
    fn test_json_decoding_requires_object() {
        assert!(matches!(
            Format::Json.decode("[1, 2]"),
            Err(DocModelError::Decode { .. })
        ));
    }

    #[test]
    fn test_tags() {
        assert_eq!(Format::default(), Format::Yaml);
        assert_eq!(Format::from_tag("yaml").unwrap(), Format::Yaml);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!(Format::Json.to_string(), "json");
        assert!(Format::from_tag("xml").is_err());
    }
}
