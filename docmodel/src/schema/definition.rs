use crate::document::Document;
use crate::error::{DocModelError, Result};
use crate::id::{check_id, generate_id};
use crate::path::{check_name, document_path, document_uid};
use crate::serializer::Format;
use crate::system_db::{SystemDb, DOCUMENTS_TABLE};
use crate::validation::{Field, FieldError};
use serde_yaml::Value;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

/// How a nested schema relates to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    /// Each parent document owns at most one child document, which shares
    /// the parent's id.
    HaveOne,
}

/// Collects fields and nested schemas before a [`Schema`] is built.
///
/// ```ignore
/// store.define_schema("restaurants", |s| {
///     s.field("name").cant_be_blank();
///     s.field("slug");
///     s.have_one("address", |a| {
///         a.field("street");
///     });
/// })?;
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    format: Format,
    fields: Vec<Field>,
    children: Vec<SchemaBuilder>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        SchemaBuilder {
            name: name.into(),
            format: Format::default(),
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&mut self, format: Format) -> &mut Self {
        self.format = format;
        self
    }

    /// Append a field and return it so constraints can be chained onto it.
    /// Declaration order is the serialization order.
    pub fn field(&mut self, name: impl Into<String>) -> &mut Field {
        let index = self.fields.len();
        self.fields.push(Field::new(name));
        &mut self.fields[index]
    }

    /// Declare a nested schema that documents of this schema have one of.
    pub fn have_one<F>(&mut self, name: impl Into<String>, define: F) -> &mut Self
    where
        F: FnOnce(&mut SchemaBuilder),
    {
        let mut child = SchemaBuilder::new(name);
        define(&mut child);
        self.children.push(child);
        self
    }

    fn check(&self, top_level: bool) -> Result<()> {
        check_name("schema", &self.name)?;
        if top_level && self.name == DOCUMENTS_TABLE {
            return Err(DocModelError::Schema(format!(
                "'{DOCUMENTS_TABLE}' is reserved and cannot name a schema"
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            check_name("field", field.name())?;
            if !seen.insert(field.name()) {
                return Err(DocModelError::Schema(format!(
                    "Field '{}' is declared twice in schema '{}'",
                    field.name(),
                    self.name
                )));
            }
        }
        for child in &self.children {
            if !seen.insert(child.name.as_str()) {
                return Err(DocModelError::Schema(format!(
                    "Association '{}' clashes with another member of schema '{}'",
                    child.name, self.name
                )));
            }
            child.check(false)?;
        }
        Ok(())
    }

    /// Check names and build the schema tree. Index tables are created by the store.
    pub(crate) fn build(self, db: Rc<SystemDb>, atomic_saves: bool) -> Result<Rc<Schema>> {
        self.check(true)?;
        Ok(self.into_schema(&db, atomic_saves, &[], None))
    }

    fn into_schema(
        self,
        db: &Rc<SystemDb>,
        atomic_saves: bool,
        parent_lineage: &[String],
        parent: Option<Weak<Schema>>,
    ) -> Rc<Schema> {
        let SchemaBuilder {
            name,
            format,
            fields,
            children,
        } = self;
        let mut lineage = parent_lineage.to_vec();
        lineage.push(name.clone());

        Rc::new_cyclic(|me| {
            let associations = children
                .into_iter()
                .map(|child| {
                    let schema = child.into_schema(db, atomic_saves, &lineage, Some(me.clone()));
                    (schema, Association::HaveOne)
                })
                .collect();
            Schema {
                index_table: lineage.join("_"),
                name,
                format,
                fields,
                associations,
                parent,
                lineage,
                db: Rc::clone(db),
                atomic_saves,
            }
        })
    }
}

/// A declared record type: ordered fields, a payload format, have-one
/// children and a handle to the backing database.
pub struct Schema {
    name: String,
    format: Format,
    fields: Vec<Field>,
    associations: Vec<(Rc<Schema>, Association)>,
    /// Non-owning; the parent's association list owns the relationship.
    parent: Option<Weak<Schema>>,
    /// Schema names from the outermost ancestor down to this schema.
    lineage: Vec<String>,
    index_table: String,
    db: Rc<SystemDb>,
    atomic_saves: bool,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn associations(&self) -> impl Iterator<Item = (&Rc<Schema>, Association)> {
        self.associations.iter().map(|(schema, kind)| (schema, *kind))
    }

    pub fn association(&self, name: &str) -> Option<&Rc<Schema>> {
        self.associations
            .iter()
            .find(|(schema, _)| schema.name == name)
            .map(|(schema, _)| schema)
    }

    /// The owning schema, if this is a have-one child and the parent is still alive.
    pub fn parent(&self) -> Option<Rc<Schema>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// How the parent refers to this schema.
    pub fn parent_association(&self) -> Option<Association> {
        self.parent()?
            .associations
            .iter()
            .find(|(child, _)| std::ptr::eq(Rc::as_ptr(child), self))
            .map(|(_, kind)| *kind)
    }

    /// Name of this schema's index table.
    pub fn index_table(&self) -> &str {
        &self.index_table
    }

    /// Index tables of this schema and every nested schema, outermost first.
    pub fn index_tables(&self) -> Vec<String> {
        let mut tables = vec![self.index_table.clone()];
        for (child, _) in &self.associations {
            tables.extend(child.index_tables());
        }
        tables
    }

    /// `/restaurants/<id>` for a top-level schema, the parent's path plus
    /// `/<name>` for a have-one child.
    pub fn path(&self, id: &str) -> String {
        document_path(&self.lineage, id)
    }

    pub fn uid(&self, id: &str) -> String {
        document_uid(&self.lineage, id, self.format.tag())
    }

    // ── Documents ────────────────────────────────────────────────────

    /// A new, empty document with a random id.
    pub fn new_document(self: &Rc<Self>) -> Document {
        Document::new(Rc::clone(self), generate_id())
    }

    /// A new, empty document with the given id.
    pub fn with_id(self: &Rc<Self>, id: &str) -> Result<Document> {
        check_id(id)?;
        Ok(Document::new(Rc::clone(self), id.to_string()))
    }

    /// Build a new document and set the given attributes. Does not touch storage.
    pub fn build<I, K, V>(self: &Rc<Self>, attrs: I) -> Result<Document>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut document = self.new_document();
        document.set(attrs)?;
        Ok(document)
    }

    pub fn build_with_id<I, K, V>(self: &Rc<Self>, id: &str, attrs: I) -> Result<Document>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut document = self.with_id(id)?;
        document.set(attrs)?;
        Ok(document)
    }

    /// Look `id` up in the index table. A hit returns an unloaded shell whose
    /// fields are read from storage on first access.
    pub fn find(self: &Rc<Self>, id: &str) -> Result<Option<Document>> {
        let found = self.db.find_indexed_uid(&self.index_table, id)?;
        Ok(found.map(|_| Document::new(Rc::clone(self), id.to_string())))
    }

    // ── Operations on documents ──────────────────────────────────────

    /// Run every field's constraints, store the failures on the document and
    /// report whether there were none.
    pub fn validate(&self, document: &mut Document) -> Result<bool> {
        self.check_owner(document)?;
        self.load_if_incomplete(document)?;

        let null = Value::Null;
        let errors: Vec<FieldError> = self
            .fields
            .iter()
            .filter_map(|field| {
                let failed = field.errors_for(document.peek(field.name()).unwrap_or(&null));
                (!failed.is_empty()).then(|| FieldError {
                    field: field.name().to_string(),
                    constraints: failed,
                })
            })
            .collect();

        let valid = errors.is_empty();
        document.errors = errors;
        Ok(valid)
    }

    /// Read the stored payload into the document. Fields the document already
    /// holds are kept; only empty slots are filled. Runs at most once per
    /// document.
    pub fn load(&self, document: &mut Document) -> Result<()> {
        self.check_owner(document)?;
        if document.loaded {
            return Ok(());
        }

        let uid = self.uid(document.id());
        if let Some(data) = self.db.get_payload(&uid)? {
            for (name, value) in self.format.decode(&data)? {
                if self.field(&name).is_none() {
                    log::warn!("Skipping undeclared field '{name}' stored in {uid}");
                    continue;
                }
                if value.is_null() || document.holds(&name) {
                    continue;
                }
                document.fields.insert(name, value);
            }
            log::debug!("Loaded {uid}");
        }

        document.loaded = true;
        Ok(())
    }

    /// Encode the document's non-blank fields in declaration order.
    pub fn dump(&self, document: &mut Document) -> Result<String> {
        self.check_owner(document)?;
        self.load_if_incomplete(document)?;

        let null = Value::Null;
        let pairs: Vec<(&str, &Value)> = self
            .fields
            .iter()
            .map(|field| (field.name(), document.peek(field.name()).unwrap_or(&null)))
            .collect();
        self.format.encode(&pairs)
    }

    /// Whether the document's payload row is present. Queried every call.
    pub fn exists(&self, document: &Document) -> Result<bool> {
        self.check_owner(document)?;
        self.db.payload_exists(&document.uid())
    }

    /// Create or update the document's payload row and index row.
    ///
    /// The two writes are separate statements. Unless the store was opened
    /// with `atomic_saves`, a failure after the payload write leaves a payload
    /// without an index row: `exists` is true but `find` misses it.
    pub fn save(&self, document: &mut Document) -> Result<()> {
        let data = self.dump(document)?;
        let existed = self.exists(document)?;
        let uid = document.uid();
        let id = document.id().to_string();

        if !self.atomic_saves {
            return self.write(&uid, &id, &data, existed);
        }

        self.db.begin_transaction()?;
        // A failed COMMIT leaves the transaction open, so it is rolled back too.
        match self
            .write(&uid, &id, &data, existed)
            .and_then(|()| self.db.commit_transaction())
        {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Err(rollback) = self.db.rollback_transaction() {
                    log::error!("Rollback after failed save of {uid} failed: {rollback}");
                }
                Err(e)
            }
        }
    }

    fn write(&self, uid: &str, id: &str, data: &str, existed: bool) -> Result<()> {
        if existed {
            self.update(uid, id, data)
        } else {
            self.create(uid, id, data)
        }
    }

    fn create(&self, uid: &str, id: &str, data: &str) -> Result<()> {
        self.db.insert_payload(uid, data)?;
        if let Err(e) = self.db.insert_index_row(&self.index_table, uid, id) {
            if !self.atomic_saves {
                log::error!(
                    "Payload for {uid} was written but its row in index '{}' was not: {e}",
                    self.index_table
                );
            }
            return Err(e);
        }
        log::debug!("Created {uid}");
        Ok(())
    }

    fn update(&self, uid: &str, id: &str, data: &str) -> Result<()> {
        self.db.update_payload(uid, data)?;
        if self.db.update_index_row(&self.index_table, uid, id)? == 0 {
            log::warn!(
                "{uid} has no row in index '{}'; find('{id}') will not locate it",
                self.index_table
            );
        }
        log::debug!("Updated {uid}");
        Ok(())
    }

    fn load_if_incomplete(&self, document: &mut Document) -> Result<()> {
        if self.fields.iter().any(|f| !document.holds(f.name())) {
            self.load(document)?;
        }
        Ok(())
    }

    fn check_owner(&self, document: &Document) -> Result<()> {
        if std::ptr::eq(Rc::as_ptr(document.schema()), self) {
            Ok(())
        } else {
            Err(DocModelError::Schema(format!(
                "Document of schema '{}' passed to schema '{}'",
                document.schema().name,
                self.name
            )))
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("fields", &self.fields)
            .field(
                "associations",
                &self
                    .associations
                    .iter()
                    .map(|(schema, _)| schema.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("lineage", &self.lineage)
            .finish()
    }
}
