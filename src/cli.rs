use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::binder::CONNECTION_ID;
use crate::config::Config;
use crate::functions::{FunctionDescriptor, GlobalValues, SlotSource};
use crate::openapi::ApiDocument;
use crate::registry::FunctionRegistry;
use crate::values::Val;

#[derive(Parser)]
#[command(name = "rhythm-connectors")]
#[command(about = "Inspect the functions an API description binds to", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the functions a document binds to
    Functions {
        /// Swagger 2.0 or OpenAPI 3 document (JSON or YAML)
        document: PathBuf,

        /// Namespace to bind into (default: the document's file stem)
        #[arg(short = 'n', long = "namespace")]
        namespace: Option<String>,

        /// Bind as a platform connector with this connection id
        #[arg(long = "connection-id")]
        connection_id: Option<String>,
    },

    /// Show how one operation is called
    Operation {
        /// Swagger 2.0 or OpenAPI 3 document (JSON or YAML)
        document: PathBuf,

        /// Operation name (operationId, or the synthesized name)
        name: String,

        #[arg(short = 'n', long = "namespace")]
        namespace: Option<String>,
    },
}

/// Load the configuration, honouring `--config`
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut builder = Config::builder();
    if let Some(path) = &cli.config {
        builder = builder.config_path(path.clone());
    }
    builder.build()
}

/// Run the CLI with already parsed arguments
pub fn run_cli_with_args(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    run_cli_with_config(cli, &config)
}

/// Run the CLI with parsed arguments and a loaded configuration
pub fn run_cli_with_config(cli: Cli, config: &Config) -> Result<()> {
    match cli.command {
        Commands::Functions {
            document,
            namespace,
            connection_id,
        } => {
            let doc = load_document(&document)?;
            let namespace = namespace.unwrap_or_else(|| default_namespace(&document));
            let functions = bind(config, &namespace, &doc, connection_id)?;

            if functions.is_empty() {
                println!("No operations found");
                return Ok(());
            }

            println!("Found {} function(s):\n", functions.len());
            for function in &functions {
                let marker = if function.deprecated() { " (deprecated)" } else { "" };
                println!("  {}{}", function, marker);
            }
        }

        Commands::Operation {
            document,
            name,
            namespace,
        } => {
            let doc = load_document(&document)?;
            let namespace = namespace.unwrap_or_else(|| default_namespace(&document));
            let functions = bind(config, &namespace, &doc, None)?;

            let Some(function) = functions.iter().find(|f| f.name() == name) else {
                eprintln!("Operation {} not found", name);
                std::process::exit(1);
            };
            print_operation(function);
        }
    }

    Ok(())
}

fn load_document(path: &Path) -> Result<ApiDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    ApiDocument::parse(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn default_namespace(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Connector".to_string())
}

fn bind(
    config: &Config,
    namespace: &str,
    doc: &ApiDocument,
    connection_id: Option<String>,
) -> Result<Vec<std::sync::Arc<FunctionDescriptor>>> {
    let globals = connection_id.map(|id| {
        let mut globals = GlobalValues::new();
        globals.insert(CONNECTION_ID.to_string(), Val::from(id));
        globals
    });

    let mut registry = FunctionRegistry::new();
    let functions = registry.add_action_connector(config.function_settings(namespace), Some(doc), globals)?;
    Ok(functions)
}

fn print_operation(function: &FunctionDescriptor) {
    let op = function.operation();
    println!("Function: {}", function.qualified_name());
    if let Some(description) = function.description() {
        println!("Description: {}", description);
    }
    println!("Request: {} {}{}", op.method, op.base_path, op.path);
    println!("Returns: {}", function.return_type());

    println!("\nInputs:");
    for slot in &op.slots {
        let source = match &slot.source {
            SlotSource::Argument(index) => format!("argument #{}", index + 1),
            SlotSource::Global(value) => format!("global = {}", display_value(value)),
            SlotSource::Default(value) => format!("internal = {}", display_value(value)),
        };
        println!("  {:<20} {:<12} {}", slot.name, format!("{:?}", slot.placement), source);
    }
}

fn display_value(value: &Val) -> String {
    value.to_text().unwrap_or_else(|| value.to_json().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SQL_SWAGGER;

    #[test]
    fn test_parse_functions_command() {
        let cli = Cli::parse_from(["rhythm-connectors", "functions", "sql.json", "--connection-id", "c1"]);
        match cli.command {
            Commands::Functions {
                document,
                namespace,
                connection_id,
            } => {
                assert_eq!(default_namespace(&document), "sql");
                assert_eq!(namespace, None);
                assert_eq!(connection_id.as_deref(), Some("c1"));
            }
            _ => panic!("expected the functions command"),
        }
    }

    #[test]
    fn test_config_flag_is_honoured() {
        let dir = std::env::temp_dir().join(format!("rhythm-connectors-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cli.toml");
        std::fs::write(&path, "log_level = \"trace\"\nmax_rows = 3\n").unwrap();

        let cli = Cli::parse_from([
            "rhythm-connectors",
            "--config",
            path.to_str().unwrap(),
            "functions",
            "sql.json",
        ]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.max_rows, 3);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_bind_with_connection_id() {
        let doc = ApiDocument::parse(SQL_SWAGGER).unwrap();
        let config = Config::default();

        let functions = bind(&config, "Sql", &doc, Some("c1".into())).unwrap();

        assert_eq!(functions.len(), 5);
        assert!(functions.iter().all(|f| f.params().iter().all(|p| p.name != CONNECTION_ID)));
    }
}
