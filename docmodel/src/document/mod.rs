// Documents: one instance of a schema, an id plus a lazily loaded
// name -> value map.

use crate::error::{DocModelError, Result};
use crate::schema::Schema;
use crate::validation::FieldError;
use serde_yaml::Value;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// A mutable instance of a [`Schema`].
///
/// Field values live in memory until `save`. A document obtained from
/// `Schema::find` starts empty and reads its stored payload the first time a
/// missing field is read; values set before that read are never overwritten.
pub struct Document {
    id: String,
    schema: Rc<Schema>,
    pub(crate) fields: HashMap<String, Value>,
    pub(crate) loaded: bool,
    pub(crate) errors: Vec<FieldError>,
    /// Have-one children, keyed by association name.
    children: BTreeMap<String, Document>,
}

impl Document {
    pub(crate) fn new(schema: Rc<Schema>, id: String) -> Self {
        Document {
            id,
            schema,
            fields: HashMap::new(),
            loaded: false,
            errors: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &Rc<Schema> {
        &self.schema
    }

    pub fn uid(&self) -> String {
        self.schema.uid(&self.id)
    }

    pub fn path(&self) -> String {
        self.schema.path(&self.id)
    }

    /// True once a load from storage has been attempted.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn holds(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    // ── Attributes ───────────────────────────────────────────────────

    /// The value currently held in memory, without touching storage.
    pub fn peek(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Read a field. If it is unset and the document has not been loaded
    /// yet, the stored payload is loaded first.
    pub fn get(&mut self, name: &str) -> Result<Option<&Value>> {
        self.check_field(name)?;
        if !self.holds(name) && !self.loaded {
            self.load()?;
        }
        Ok(self.fields.get(name))
    }

    /// `get` for string-valued fields.
    pub fn get_str(&mut self, name: &str) -> Result<Option<&str>> {
        Ok(self.get(name)?.and_then(Value::as_str))
    }

    /// Set one field. Setting `Value::Null` clears it.
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.check_field(name)?;
        let value = value.into();
        if value.is_null() {
            self.fields.remove(name);
        } else {
            self.fields.insert(name.to_string(), value);
        }
        Ok(self)
    }

    /// Set several fields in order.
    ///
    /// ```ignore
    /// doc.set([("name", "Myles"), ("city", "Sydney")])?.save()?;
    /// ```
    pub fn set<I, K, V>(&mut self, attrs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in attrs {
            self.set_attr(name.as_ref(), value)?;
        }
        Ok(self)
    }

    fn check_field(&self, name: &str) -> Result<()> {
        if self.schema.field(name).is_some() {
            Ok(())
        } else {
            Err(DocModelError::UnknownField {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
            })
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Validate the document; failures are then available from `errors`.
    pub fn valid(&mut self) -> Result<bool> {
        let schema = Rc::clone(&self.schema);
        schema.validate(self)
    }

    /// Failures recorded by the last `valid` call.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// True if the document exists in the store.
    pub fn exists(&self) -> Result<bool> {
        self.schema.exists(self)
    }

    /// True if the document does not exist in the store.
    pub fn is_new(&self) -> Result<bool> {
        Ok(!self.exists()?)
    }

    /// Save to the store. Does not validate first; call `valid` for that.
    pub fn save(&mut self) -> Result<&mut Self> {
        let schema = Rc::clone(&self.schema);
        schema.save(self)?;
        Ok(self)
    }

    pub fn dump(&mut self) -> Result<String> {
        let schema = Rc::clone(&self.schema);
        schema.dump(self)
    }

    pub fn load(&mut self) -> Result<()> {
        let schema = Rc::clone(&self.schema);
        schema.load(self)
    }

    // ── Have-one children ────────────────────────────────────────────

    pub fn have_one(&self, name: &str) -> Option<&Document> {
        self.children.get(name)
    }

    pub fn have_one_mut(&mut self, name: &str) -> Option<&mut Document> {
        self.children.get_mut(name)
    }

    /// Replace the `name` child with a new document sharing this document's
    /// id, with `attrs` set on it.
    pub fn set_have_one<I, K, V>(&mut self, name: &str, attrs: I) -> Result<&mut Document>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut child = Document::new(self.child_schema(name)?, self.id.clone());
        child.set(attrs)?;
        Ok(match self.children.entry(name.to_string()) {
            Entry::Occupied(mut slot) => {
                slot.insert(child);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(child),
        })
    }

    /// The `name` child, attaching the stored one if none is held yet.
    /// Returns `None` when neither memory nor storage has it.
    pub fn fetch_have_one(&mut self, name: &str) -> Result<Option<&mut Document>> {
        if !self.children.contains_key(name) {
            let child = Document::new(self.child_schema(name)?, self.id.clone());
            if !child.exists()? {
                return Ok(None);
            }
            self.children.insert(name.to_string(), child);
        }
        Ok(self.children.get_mut(name))
    }

    fn child_schema(&self, name: &str) -> Result<Rc<Schema>> {
        self.schema
            .association(name)
            .cloned()
            .ok_or_else(|| DocModelError::UnknownAssociation {
                schema: self.schema.name().to_string(),
                name: name.to_string(),
            })
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("schema", &self.schema.name())
            .field("id", &self.id)
            .field("fields", &self.fields)
            .field("loaded", &self.loaded)
            .field("children", &self.children)
            .finish()
    }
}
