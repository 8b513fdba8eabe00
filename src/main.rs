//! nestguard
//!
//! Authorizes and masks one JSON record from the command line.

use anyhow::Context;
use clap::Parser;
use nestguard::{
    authorizer::{AuthorizeRequest, NestedAuthorizer},
    config::{AppConfig, LogFormat, load_config},
    filter::ExpressionFilter,
    policy::{AccessType, ConfigAuthority},
};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// nestguard - Field-level access control and masking for JSON records
#[derive(Parser, Debug)]
#[command(name = "nestguard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "NESTGUARD_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "NESTGUARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Request file (TOML) holding schema, user, groups, access_type and json
    #[arg(long, conflicts_with_all = ["schema", "user", "groups", "input"])]
    request: Option<PathBuf>,

    /// Schema the record belongs to
    #[arg(short, long, required_unless_present = "request")]
    schema: Option<String>,

    /// User requesting the record
    #[arg(short, long, required_unless_present = "request")]
    user: Option<String>,

    /// Group the user belongs to (repeatable)
    #[arg(short, long = "group")]
    groups: Vec<String>,

    /// Access type (read, update)
    #[arg(short, long, default_value = "read", value_parser = parse_access_type)]
    access: AccessType,

    /// Record to authorize; `-` reads stdin
    #[arg(short, long, default_value = "-")]
    input: String,
}

fn parse_access_type(s: &str) -> Result<AccessType, String> {
    AccessType::try_parse(s).ok_or_else(|| {
        let known: Vec<&str> = AccessType::all().iter().map(AccessType::as_str).collect();
        format!("unknown access type '{}', expected one of: {}", s, known.join(", "))
    })
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(pretty)
        .with(json)
        .with(filter)
        .init();
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read record from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read record from {}", input))
}

fn build_request(args: &Args) -> anyhow::Result<AuthorizeRequest> {
    if let Some(path) = &args.request {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display()))?;
        return toml::from_str(&text)
            .with_context(|| format!("Invalid request file {}", path.display()));
    }

    // clap enforces both when no request file is given
    let (Some(schema), Some(user)) = (&args.schema, &args.user) else {
        anyhow::bail!("--schema and --user are required without --request");
    };

    Ok(AuthorizeRequest {
        schema: schema.clone(),
        user: user.clone(),
        groups: args.groups.iter().cloned().collect(),
        access_type: args.access,
        json: read_input(&args.input)?,
    })
}

fn create_authorizer(config: &AppConfig) -> anyhow::Result<NestedAuthorizer> {
    let authority = ConfigAuthority::new(&config.policy)
        .inspect_err(|e| error!(error = %e, "Failed to build policy authority"))?;

    Ok(NestedAuthorizer::new(
        Arc::new(authority),
        Arc::new(ExpressionFilter::new()),
        &config.authorizer,
    ))
}

/// Returns whether the record was granted
fn run(args: Args) -> anyhow::Result<bool> {
    // Load configuration before logging so the file can choose the format
    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, config.logging.format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        access_policies = config.policy.access.len(),
        mask_policies = config.policy.masks.len(),
        row_filters = config.policy.row_filters.len(),
        "Starting nestguard"
    );

    let authorizer = create_authorizer(&config)?;
    let request = build_request(&args)
        .inspect_err(|e| error!(error = %e, "Failed to read request"))?;

    let result = authorizer.authorize_request(&request);
    println!("{}", result.to_json()?);

    Ok(result.granted)
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
