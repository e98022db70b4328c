use crate::error::{DocModelError, Result};
use crate::schema::{Schema, SchemaBuilder, SchemaDefinition, StoreDefinition};
use crate::system_db::{SystemDb, DOCUMENTS_TABLE};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

/// Behaviour switches fixed when a store is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Run the payload write and the index write of each save inside one
    /// transaction. Off by default: the two writes are independent.
    pub atomic_saves: bool,
}

impl From<&StoreDefinition> for StoreOptions {
    fn from(definition: &StoreDefinition) -> Self {
        StoreOptions {
            atomic_saves: definition.atomic_saves,
        }
    }
}

/// The main entry point.
/// Owns the backing database with its shared `documents` table and a
/// registry of the schemas defined on it.
pub struct Store {
    db: Rc<SystemDb>,
    options: StoreOptions,
    schemas: HashMap<String, Rc<Schema>>,
    index_tables: HashSet<String>,
}

impl Store {
    /// Open or create a store backed by the SQLite file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let db = SystemDb::open(path.as_ref())?;
        log::debug!("Opened store at {}", path.as_ref().display());
        Ok(Self::with_db(db, options))
    }

    /// Open a store backed by an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(StoreOptions::default())
    }

    pub fn open_in_memory_with(options: StoreOptions) -> Result<Self> {
        Ok(Self::with_db(SystemDb::open_in_memory()?, options))
    }

    /// Open the database at `path` with the definition's options and define
    /// every schema it declares.
    pub fn from_definition(definition: &StoreDefinition, path: impl AsRef<Path>) -> Result<Self> {
        let mut store = Self::open_with(path, StoreOptions::from(definition))?;
        store.define_all(definition)?;
        Ok(store)
    }

    fn with_db(db: SystemDb, options: StoreOptions) -> Self {
        Store {
            db: Rc::new(db),
            options,
            schemas: HashMap::new(),
            index_tables: HashSet::new(),
        }
    }

    /// Define a schema, create its index tables (and those of its have-one
    /// children) and register it under `name`.
    pub fn define_schema<F>(&mut self, name: &str, define: F) -> Result<Rc<Schema>>
    where
        F: FnOnce(&mut SchemaBuilder),
    {
        let mut builder = SchemaBuilder::new(name);
        define(&mut builder);
        self.register(builder)
    }

    /// Define a schema from a parsed definition.
    pub fn define_schema_from(
        &mut self,
        name: &str,
        definition: &SchemaDefinition,
    ) -> Result<Rc<Schema>> {
        let mut builder = SchemaBuilder::new(name);
        definition.apply(&mut builder)?;
        self.register(builder)
    }

    /// Define every schema of a store definition, in name order.
    pub fn define_all(&mut self, definition: &StoreDefinition) -> Result<Vec<Rc<Schema>>> {
        definition
            .schemas
            .iter()
            .map(|(name, schema)| self.define_schema_from(name, schema))
            .collect()
    }

    fn register(&mut self, builder: SchemaBuilder) -> Result<Rc<Schema>> {
        let name = builder.name().to_string();
        if self.schemas.contains_key(&name) {
            return Err(DocModelError::Schema(format!(
                "Schema '{name}' is already defined"
            )));
        }

        let schema = builder.build(Rc::clone(&self.db), self.options.atomic_saves)?;

        let tables = schema.index_tables();
        let mut fresh = HashSet::new();
        for table in &tables {
            if table == DOCUMENTS_TABLE
                || self.index_tables.contains(table)
                || !fresh.insert(table.as_str())
            {
                return Err(DocModelError::Schema(format!(
                    "Index table '{table}' of schema '{name}' clashes with an existing table"
                )));
            }
        }

        for table in &tables {
            self.db.create_index_table(table)?;
        }
        self.index_tables.extend(tables);
        self.schemas.insert(name.clone(), Rc::clone(&schema));
        log::debug!("Defined schema '{name}'");
        Ok(schema)
    }

    /// Look a schema up by name.
    pub fn schema(&self, name: &str) -> Option<Rc<Schema>> {
        self.schemas.get(name).cloned()
    }

    /// Registered schema names, sorted.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// The backing database.
    pub fn db(&self) -> &SystemDb {
        &self.db
    }

    /// Row counts: the shared documents table plus every index table.
    pub fn status(&self) -> Result<serde_json::Value> {
        let mut schemas = serde_json::Map::new();
        for name in self.schema_names() {
            let mut tables = serde_json::Map::new();
            if let Some(schema) = self.schemas.get(name) {
                for table in schema.index_tables() {
                    let count = self.db.row_count(&table)?;
                    tables.insert(table, serde_json::json!(count));
                }
            }
            schemas.insert(name.to_string(), serde_json::Value::Object(tables));
        }

        Ok(serde_json::json!({
            "documents": self.db.row_count(DOCUMENTS_TABLE)?,
            "atomic_saves": self.options.atomic_saves,
            "schemas": schemas,
        }))
    }
}
