//! `hbase-access` CLI
//!
//! Usage:
//!   `hbase-access scan --table iot --type data --stream 42 --columns temp,humidity`
//!   `hbase-access scan --table iot --type data --stream 42 --columns temp --scanner-id <ID>`
//!   `hbase-access compile --type event --constraint '{"column":"level","op":">","$":"3"}'`
//!
//! Results are printed to stdout as JSON. Failures print a structured error
//! report to stderr and exit with status 1.

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hbase_access::{
    AccessClient, AccessConfig, ConstraintExpression, DataType, Error, FilterCompiler,
    LoadRangeRequest, PutRequest, Result, ScanCursor,
};

#[derive(Parser)]
#[command(name = "hbase-access")]
#[command(author, version, about = "Query and write stream records in an HBase-style store")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to ./hbase-access.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// CLI record type option
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TypeArg {
    Data,
    Event,
}

impl From<TypeArg> for DataType {
    fn from(t: TypeArg) -> Self {
        match t {
            TypeArg::Data => DataType::Data,
            TypeArg::Event => DataType::Event,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load one page of a stream's rows
    Scan {
        /// Base table name
        #[arg(short, long)]
        table: String,

        /// Record type
        #[arg(long = "type", value_enum)]
        data_type: TypeArg,

        /// Stream id
        #[arg(short, long)]
        stream: String,

        /// Comma-separated output columns
        #[arg(long)]
        columns: String,

        /// Comma-separated columns fetched only for filtering
        #[arg(long, default_value = "")]
        query_only: String,

        /// Oldest timestamp (ms), inclusive
        #[arg(long)]
        from: Option<u64>,

        /// Newest timestamp (ms), inclusive
        #[arg(long)]
        to: Option<u64>,

        /// Constraint expression as JSON
        #[arg(long)]
        constraint: Option<String>,

        /// Rows per page (max 200; leading integer is used, none means 200)
        #[arg(short, long)]
        limit: Option<String>,

        /// Continue the scan behind this scanner id
        #[arg(long)]
        scanner_id: Option<String>,
    },

    /// Delete a scanner that will not be continued
    Close {
        /// Base table name
        #[arg(short, long)]
        table: String,

        /// Record type
        #[arg(long = "type", value_enum)]
        data_type: TypeArg,

        /// Scanner id to delete
        #[arg(long)]
        scanner_id: String,
    },

    /// Read columns of one row, a `prefix*` pattern, or every row
    Get {
        /// Base table name
        #[arg(short, long)]
        table: String,

        /// Record type
        #[arg(long = "type", value_enum)]
        data_type: TypeArg,

        /// Row key or `prefix*` pattern (all rows when omitted)
        #[arg(short, long)]
        row_key: Option<String>,

        /// Comma-separated columns
        #[arg(long)]
        columns: String,
    },

    /// Write columns of one row
    Put {
        /// Base table name
        #[arg(short, long)]
        table: String,

        /// Record type
        #[arg(long = "type", value_enum)]
        data_type: TypeArg,

        /// Row key
        #[arg(short, long)]
        row_key: String,

        /// `column=value` pairs
        #[arg(long = "value", value_parser = parse_assignment, required = true)]
        values: Vec<(String, String)>,

        /// Cell timestamp in ms (now when omitted)
        #[arg(long)]
        timestamp: Option<u64>,
    },

    /// Create the table for a record type
    CreateTable {
        /// Base table name
        #[arg(short, long)]
        table: String,

        /// Record type
        #[arg(long = "type", value_enum)]
        data_type: TypeArg,
    },

    /// Compile a constraint expression and print the backend filter
    Compile {
        /// Record type
        #[arg(long = "type", value_enum)]
        data_type: TypeArg,

        /// Constraint expression as JSON
        #[arg(long)]
        constraint: String,
    },

    /// Print the effective configuration
    Config {
        /// Validate the configuration as well
        #[arg(long)]
        validate: bool,
    },
}

/// What a command prints on success.
#[derive(Debug)]
enum Output {
    Json(Value),
    Text(String),
}

fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected column=value, got '{s}'")),
    }
}

fn load_config(path: Option<&Path>) -> Result<AccessConfig> {
    match path {
        Some(path) => AccessConfig::load_from_path(path),
        None => AccessConfig::load(),
    }
}

fn init_logging(level: &str, verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()?;
    Ok(())
}

async fn run(command: Commands, config: AccessConfig) -> Result<Output> {
    match command {
        Commands::Config { validate } => {
            if validate {
                config.validate()?;
            }
            Ok(Output::Text(config.to_toml()?))
        }
        Commands::Compile {
            data_type,
            constraint,
        } => {
            let expr = ConstraintExpression::parse_str(&constraint)?;
            let filter = FilterCompiler::new(data_type.into()).compile(&expr);
            Ok(Output::Json(serde_json::to_value(filter)?))
        }
        command => {
            let client = AccessClient::connect(config)?;
            run_with_client(&client, command).await
        }
    }
}

async fn run_with_client(client: &AccessClient, command: Commands) -> Result<Output> {
    match command {
        Commands::Scan {
            table,
            data_type,
            stream,
            columns,
            query_only,
            from,
            to,
            constraint,
            limit,
            scanner_id,
        } => {
            let mut request = LoadRangeRequest::new(table, data_type.into(), stream, columns)
                .with_query_only_columns(query_only)
                .with_range(from, to)
                .with_cursor(ScanCursor::from(scanner_id));
            if let Some(constraint) = constraint {
                request = request.with_constraint(ConstraintExpression::parse_str(&constraint)?);
            }
            request.limit = limit.as_deref().and_then(hbase_access::scan::parse_limit);

            let result = client.load_range(&request).await?;
            debug!("Scan returned {} row(s)", result.count);
            Ok(Output::Json(serde_json::to_value(result)?))
        }
        Commands::Close {
            table,
            data_type,
            scanner_id,
        } => {
            client
                .abandon_scan(&table, data_type.into(), &ScanCursor::resume(scanner_id.as_str()))
                .await?;
            Ok(Output::Json(json!({ "closed": scanner_id })))
        }
        Commands::Get {
            table,
            data_type,
            row_key,
            columns,
        } => {
            let result = client
                .get_row(&table, data_type.into(), row_key.as_deref(), &columns)
                .await?;
            Ok(Output::Json(serde_json::to_value(result)?))
        }
        Commands::Put {
            table,
            data_type,
            row_key,
            values,
            timestamp,
        } => {
            let stored = values.len();
            let request = PutRequest {
                data_type: data_type.into(),
                row_key,
                values,
                timestamp,
            };
            client.put_value(&table, &request).await?;
            Ok(Output::Json(json!({ "rowKey": request.row_key, "stored": stored })))
        }
        Commands::CreateTable { table, data_type } => {
            let data_type = DataType::from(data_type);
            client.create_table(&table, data_type).await?;
            Ok(Output::Json(json!({ "created": data_type.table_name(&table) })))
        }
        Commands::Config { .. } | Commands::Compile { .. } => Err(Error::Validation(
            "command does not need a backend connection".to_string(),
        )),
    }
}

fn fail(err: &Error) -> ! {
    error!("{err}");
    match serde_json::to_string_pretty(&err.report()) {
        Ok(report) => eprintln!("{report}"),
        Err(_) => eprintln!("{err}"),
    }
    std::process::exit(1)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    init_logging(&config.logging.level, cli.verbose)?;

    match run(cli.command, config).await {
        Ok(Output::Json(value)) => println!("{}", serde_json::to_string_pretty(&value)?),
        Ok(Output::Text(text)) => print!("{text}"),
        Err(e) => fail(&e),
    }
    Ok(())
}
