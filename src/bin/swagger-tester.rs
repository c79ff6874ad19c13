//! Swagger Tester CLI
//!
//! Command-line interface for listing and exercising the operations of a
//! Swagger/OpenAPI-described API.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use swagger_tester::{
    ApiClient, Credential, Driver, DriverOptions, EndpointCollection, Fixtures, SchemaDocument,
    SecurityContext, ValidationLevel,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swagger-tester")]
#[command(about = "Exercise a live API against its Swagger/OpenAPI description")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request per operation and check the responses
    Run {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Base URL to send requests to (default: from the document)
        #[arg(long)]
        base_url: Option<String>,

        /// Extra header for every request, as NAME:VALUE (repeatable)
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Bearer token for every request
        #[arg(long)]
        bearer: Option<String>,

        /// Basic credentials for every request, as USER:PASSWORD
        #[arg(long)]
        basic: Option<String>,

        /// Secret for a declared security scheme, as SCHEME=VALUE (repeatable)
        #[arg(long = "auth", value_name = "SCHEME=VALUE")]
        auth: Vec<String>,

        /// JSON file of parameter values keyed by "METHOD /path"
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Also validate JSON bodies against declared response schemas
        #[arg(long)]
        strict: bool,

        /// Also send optional parameters
        #[arg(long)]
        include_optional: bool,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Output the report as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// List the operations and parameters derived from a schema
    List {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            schema,
            base_url,
            headers,
            bearer,
            basic,
            auth,
            fixtures,
            strict,
            include_optional,
            timeout,
            json,
        } => run_tests(RunArgs {
            schema,
            base_url,
            headers,
            bearer,
            basic,
            auth,
            fixtures,
            strict,
            include_optional,
            timeout,
            json_output: json,
        }),

        Commands::List { schema, json } => run_list(&schema, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct RunArgs {
    schema: String,
    base_url: Option<String>,
    headers: Vec<String>,
    bearer: Option<String>,
    basic: Option<String>,
    auth: Vec<String>,
    fixtures: Option<PathBuf>,
    strict: bool,
    include_optional: bool,
    timeout: u64,
    json_output: bool,
}

fn run_tests(args: RunArgs) -> Result<(), u8> {
    let json_output = args.json_output;

    let document = SchemaDocument::load(&args.schema).map_err(|e| {
        report_error(json_output, &format!("loading schema: {}", e));
        e.exit_code() as u8
    })?;

    let security = build_security(&document, &args).map_err(|msg| {
        report_error(json_output, &msg);
        2u8
    })?;

    let mut options = DriverOptions::new()
        .include_optional(args.include_optional)
        .level(if args.strict {
            ValidationLevel::Body
        } else {
            ValidationLevel::Status
        });
    if let Some(path) = &args.fixtures {
        let fixtures = Fixtures::load(path).map_err(|e| {
            report_error(json_output, &format!("loading fixtures: {}", e));
            e.exit_code() as u8
        })?;
        options = options.fixtures(fixtures);
    }

    let mut builder = ApiClient::builder(document)
        .security(security)
        .timeout(Duration::from_secs(args.timeout));
    if let Some(base_url) = args.base_url {
        builder = builder.base_url(base_url);
    }
    let client = builder.build().map_err(|e| {
        report_error(json_output, &e.to_string());
        2u8
    })?;

    let endpoints = EndpointCollection::from_client(&client);
    let report = Driver::new(options).run(&endpoints, &client);

    if json_output {
        let output = serde_json::to_string(&report).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
    } else {
        println!("Testing {} ...\n", client.base_url());
        println!("{}", report);
    }

    if report.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}

fn build_security(document: &SchemaDocument, args: &RunArgs) -> Result<SecurityContext, String> {
    let mut security = SecurityContext::anonymous();

    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("invalid header \"{}\": expected NAME:VALUE", header))?;
        security = security.with(Credential::Header {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        });
    }
    if let Some(token) = &args.bearer {
        security = security.with(Credential::Bearer(token.clone()));
    }
    if let Some(basic) = &args.basic {
        security = security.with(Credential::basic(basic));
    }
    for auth in &args.auth {
        let (scheme, secret) = auth
            .split_once('=')
            .ok_or_else(|| format!("invalid auth \"{}\": expected SCHEME=VALUE", auth))?;
        let credential =
            Credential::for_scheme(document, scheme, secret).map_err(|e| e.to_string())?;
        security = security.with(credential);
    }

    Ok(security)
}

fn run_list(schema_source: &str, json_output: bool) -> Result<(), u8> {
    let document = SchemaDocument::load(schema_source).map_err(|e| {
        report_error(json_output, &format!("loading schema: {}", e));
        e.exit_code() as u8
    })?;
    let endpoints = EndpointCollection::build(&document);

    if json_output {
        let output = serde_json::to_string_pretty(&endpoints).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
        return Ok(());
    }

    for (path, operations) in endpoints.endpoints() {
        if operations.is_empty() {
            println!("{} (no operations)", path);
            continue;
        }
        for operation in operations.values() {
            println!("{}", operation);
            for param in operation.parameters().values() {
                let required = if param.required() { ", required" } else { "" };
                println!("    {} ({}{})", param, param.location().as_str(), required);
            }
            for diag in operation.diagnostics() {
                println!("    \x1b[33m{}\x1b[0m", diag);
            }
        }
    }
    println!(
        "\n{} paths, {} operations",
        endpoints.endpoints().len(),
        endpoints.operation_count()
    );
    Ok(())
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "ok": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
