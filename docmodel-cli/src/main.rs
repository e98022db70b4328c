use clap::{Parser, Subcommand, ValueEnum};
use docmodel::schema::parse_definition;
use docmodel::{DocModelError, Document, Schema, Store};
use std::path::Path;
use std::process;
use std::rc::Rc;

const DEFAULT_DATABASE: &str = "docmodel.db";

/// docmodel CLI: inspect and edit documents of a store from the command line
#[derive(Parser)]
#[command(name = "docmodel", version, about)]
struct Cli {
    /// Schema definition file
    #[arg(long, default_value = "schema.yaml")]
    schema: String,

    /// SQLite database (default: the definition's `database`, else docmodel.db)
    #[arg(long)]
    db: Option<String>,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List the defined schemas with their fields and nested schemas
    Schemas,

    /// Show row counts of the documents table and every index table
    Status,

    /// Print the path and uid a document would have
    Uid {
        /// Schema name; nested schemas as parent.child (e.g. restaurants.address)
        schema: String,
        /// Document ID
        id: String,
    },

    /// Get a single document by ID
    Get {
        /// Schema name; nested schemas as parent.child
        schema: String,
        /// Document ID
        id: String,
    },

    /// Create or update a document. Refuses to save if validation fails.
    Put {
        /// Schema name; nested schemas as parent.child
        schema: String,
        /// Document ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Field values (e.g. --field name=Ambalas)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Validate field values, or a stored document, without saving
    Validate {
        /// Schema name; nested schemas as parent.child
        schema: String,
        /// Validate the stored document with this ID
        #[arg(long)]
        id: Option<String>,
        /// Field values to check (e.g. --field name=Ambalas)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| {
        format!("Invalid key=value pair: no '=' found in '{s}'")
    })?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let definition = parse_definition(Path::new(&cli.schema))?;
    let database = cli
        .db
        .clone()
        .or_else(|| definition.database.clone())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
    let store = Store::from_definition(&definition, &database)?;

    match cli.command {
        Command::Schemas => {
            let mut schemas = serde_json::Map::new();
            for name in store.schema_names() {
                let schema = resolve_schema(&store, name)?;
                schemas.insert(name.to_string(), describe(&schema));
            }
            print_output(&serde_json::Value::Object(schemas), &cli.format)?;
        }

        Command::Status => {
            let mut status = store.status()?;
            status["database"] = serde_json::json!(database);
            print_output(&status, &cli.format)?;
        }

        Command::Uid { schema, id } => {
            let schema = resolve_schema(&store, &schema)?;
            let doc = schema.with_id(&id)?;
            print_output(
                &serde_json::json!({ "path": doc.path(), "uid": doc.uid() }),
                &cli.format,
            )?;
        }

        Command::Get { schema, id } => {
            let schema = resolve_schema(&store, &schema)?;
            let mut doc = schema.find(&id)?.ok_or_else(|| DocModelError::NotFound {
                schema: schema.name().to_string(),
                id: id.clone(),
            })?;
            print_output(&document_to_json(&mut doc)?, &cli.format)?;
        }

        Command::Put { schema, id, fields } => {
            let schema = resolve_schema(&store, &schema)?;
            let mut doc = match id {
                Some(id) => match schema.find(&id)? {
                    Some(found) => found,
                    None => schema.with_id(&id)?,
                },
                None => schema.new_document(),
            };
            apply_fields(&mut doc, &fields)?;

            if !doc.valid()? {
                print_output(&validation_report(&doc)?, &cli.format)?;
                return Err(format!("{} is invalid; nothing saved", doc.uid()).into());
            }

            let created = doc.is_new()?;
            doc.save()?;
            print_output(
                &serde_json::json!({ "ok": true, "created": created, "id": doc.id(), "uid": doc.uid() }),
                &cli.format,
            )?;
        }

        Command::Validate { schema, id, fields } => {
            let schema = resolve_schema(&store, &schema)?;
            let mut doc = match id {
                Some(id) => schema.find(&id)?.ok_or_else(|| DocModelError::NotFound {
                    schema: schema.name().to_string(),
                    id: id.clone(),
                })?,
                None => schema.new_document(),
            };
            apply_fields(&mut doc, &fields)?;
            doc.valid()?;
            print_output(&validation_report(&doc)?, &cli.format)?;
        }
    }

    Ok(())
}

/// Resolve `parent.child` names through have-one associations.
fn resolve_schema(store: &Store, name: &str) -> Result<Rc<Schema>, DocModelError> {
    let mut parts = name.split('.');
    let top = parts.next().unwrap_or_default();
    let mut schema = store
        .schema(top)
        .ok_or_else(|| DocModelError::UnknownSchema(top.to_string()))?;
    for part in parts {
        let child = schema
            .association(part)
            .cloned()
            .ok_or_else(|| DocModelError::UnknownAssociation {
                schema: schema.name().to_string(),
                name: part.to_string(),
            })?;
        schema = child;
    }
    Ok(schema)
}

fn describe(schema: &Schema) -> serde_json::Value {
    let fields: Vec<_> = schema
        .fields()
        .iter()
        .map(|f| serde_json::json!({ "name": f.name(), "constraints": f.constraint_names() }))
        .collect();
    let mut have_one = serde_json::Map::new();
    for (child, _) in schema.associations() {
        have_one.insert(child.name().to_string(), describe(child));
    }
    serde_json::json!({
        "format": schema.format().tag(),
        "index_table": schema.index_table(),
        "fields": fields,
        "have_one": have_one,
    })
}

fn apply_fields(
    doc: &mut Document,
    fields: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    for (key, val) in fields {
        // Try to parse as JSON value (for numbers, booleans, arrays, objects)
        let json_val = serde_json::from_str(val).unwrap_or(serde_json::Value::String(val.clone()));
        doc.set_attr(key, serde_yaml::to_value(json_val)?)?;
    }
    Ok(())
}

fn document_to_json(doc: &mut Document) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let names: Vec<String> = doc.schema().fields().iter().map(|f| f.name().to_string()).collect();
    let mut data = serde_json::Map::new();
    for name in names {
        if let Some(value) = doc.get(&name)? {
            data.insert(name, serde_json::to_value(value)?);
        }
    }
    Ok(serde_json::json!({ "id": doc.id(), "uid": doc.uid(), "data": data }))
}

fn validation_report(doc: &Document) -> Result<serde_json::Value, serde_json::Error> {
    Ok(serde_json::json!({
        "uid": doc.uid(),
        "valid": doc.errors().is_empty(),
        "errors": serde_json::to_value(doc.errors())?,
    }))
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}
