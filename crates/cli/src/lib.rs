//! # fct
//!
//! Command-line front end of the flowcell designation planner. Every
//! subcommand is a thin shortcut for one JSON command request; the
//! `command` subcommand accepts the request itself.
//!
//! ```text
//! fct --lab lab.json --session plan.json resolve "LCSET-7 0150"
//! fct --lab lab.json --session plan.json build "LCSET-7"
//! fct --session plan.json edit --all --template '{"status":"QUEUED","number_lanes":2}'
//! fct --session plan.json allocate
//! ```
//!
//! stdout carries exactly one JSON response; logs go to stderr.

use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use command::CommandContext;
use fct_model::LabEventType;
use fct_protocol::{serialize_json, CommandAction, CommandRequest, CommandResponse};
use serde_json::{json, Map, Value};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

pub mod command;
pub mod config;
pub mod session;

pub use config::{FctConfig, LoadedConfig};
pub use session::Session;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "fct")]
#[command(about = "Plan flowcell designations and allocate lanes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML config file (overrides FCT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Lab snapshot JSON with batches and vessels
    #[arg(long, global = true)]
    lab: Option<PathBuf>,

    /// Session file holding the working set, store and tickets
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    /// Pretty-print JSON response
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a JSON Command API request
    Command(CommandArgs),

    /// Link tubes and batches named in free text to LCSETs
    Resolve(LinkArgs),

    /// Build designations for linked tubes and add them to the working set
    Build(BuildArgs),

    /// Apply a multi-edit template to rows of the working set
    Edit(EditArgs),

    /// Pack queued designations into flowcells and create FCT tickets
    Allocate(AllocateArgs),

    /// Reload persisted designations against the current lineage
    Pending(PendingArgs),

    /// List supported actions
    Capabilities(CapabilitiesArgs),
}

#[derive(Args)]
struct CommandArgs {
    /// Inline JSON request (mutually exclusive with --file)
    #[arg(long, conflicts_with = "file")]
    json: Option<String>,

    /// Path to file containing a JSON request
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct LinkArgs {
    /// Tube barcodes and batch names, separated by anything but letters, digits and hyphens
    #[arg(required = true)]
    input: Vec<String>,

    /// Loading tubes of this kind are collected for batch tokens
    #[arg(long, default_value = "denature_transfer")]
    event_kind: LabEventType,

    /// Pick an LCSET for an ambiguous tube: BARCODE=LCSET
    #[arg(long = "choose", value_parser = parse_choice)]
    choices: Vec<(String, String)>,
}

impl LinkArgs {
    fn payload(&self) -> Map<String, Value> {
        let choices: Map<String, Value> = self
            .choices
            .iter()
            .map(|(barcode, lcset)| (barcode.clone(), Value::String(lcset.clone())))
            .collect();
        let mut payload = Map::new();
        payload.insert("input".to_string(), Value::String(self.input.join(" ")));
        payload.insert("event_kind".to_string(), json!(self.event_kind));
        payload.insert("choices".to_string(), Value::Object(choices));
        payload
    }
}

#[derive(Args)]
struct BuildArgs {
    #[command(flatten)]
    link: LinkArgs,

    /// End of the event window (RFC 3339); defaults to the current time
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EditScope {
    Designation,
    FctManagement,
}

impl EditScope {
    const fn as_str(self) -> &'static str {
        match self {
            EditScope::Designation => "designation",
            EditScope::FctManagement => "fct_management",
        }
    }
}

#[derive(Args)]
struct EditArgs {
    /// Template JSON, e.g. '{"status":"QUEUED","number_lanes":2}'
    #[arg(long)]
    template: String,

    /// Barcodes of the rows to edit
    #[arg(long = "barcode")]
    barcodes: Vec<String>,

    /// Edit every row of the working set
    #[arg(long, conflicts_with = "barcodes")]
    all: bool,

    #[arg(long, value_enum, default_value = "designation")]
    context: EditScope,
}

#[derive(Args)]
struct AllocateArgs {
    /// Commit only full flowcells
    #[arg(long)]
    full_only: bool,
}

#[derive(Args)]
struct PendingArgs {
    /// Statuses to reload (default QUEUED)
    #[arg(long = "status")]
    statuses: Vec<String>,
}

#[derive(Args)]
struct CapabilitiesArgs {
    /// Include the request and response JSON schemas
    #[arg(long)]
    schemas: bool,
}

fn parse_choice(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((barcode, lcset)) if !barcode.is_empty() && !lcset.is_empty() => {
            Ok((barcode.trim().to_string(), lcset.trim().to_string()))
        }
        _ => Err(format!("expected BARCODE=LCSET, got {raw}")),
    }
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = FctConfig::load(cli.config.as_deref())?;
    let ctx = CommandContext::new(config, cli.lab.clone(), cli.session.clone());

    let request = match &cli.command {
        Commands::Command(args) => {
            let raw = read_request(args)?;
            serde_json::from_str(&raw).context("Invalid JSON passed to --json/--file")?
        }
        Commands::Resolve(args) => {
            CommandRequest::new(CommandAction::Resolve, Value::Object(args.payload()))
        }
        Commands::Build(args) => {
            let mut payload = args.link.payload();
            if let Some(now) = args.now {
                payload.insert("now".to_string(), json!(now));
            }
            CommandRequest::new(CommandAction::Build, Value::Object(payload))
        }
        Commands::Edit(args) => {
            let template: Value = serde_json::from_str(&args.template)
                .context("Invalid JSON passed to --template")?;
            CommandRequest::new(
                CommandAction::Edit,
                json!({
                    "template": template,
                    "barcodes": args.barcodes,
                    "all": args.all,
                    "context": args.context.as_str(),
                }),
            )
        }
        Commands::Allocate(args) => {
            let payload = if args.full_only {
                json!({ "partial_flowcells": false })
            } else {
                json!({})
            };
            CommandRequest::new(CommandAction::Allocate, payload)
        }
        Commands::Pending(args) => {
            let payload = if args.statuses.is_empty() {
                json!({})
            } else {
                let statuses: Vec<String> =
                    args.statuses.iter().map(|s| s.to_ascii_uppercase()).collect();
                json!({ "statuses": statuses })
            };
            CommandRequest::new(CommandAction::Pending, payload)
        }
        Commands::Capabilities(args) => CommandRequest::new(
            CommandAction::Capabilities,
            json!({ "schemas": args.schemas }),
        ),
    };

    let response = command::execute(request, ctx);
    emit(&response, cli.pretty)?;
    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn emit(response: &CommandResponse, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serialize_json(response)?
    };
    print_stdout(&output)
}

fn read_request(args: &CommandArgs) -> Result<String> {
    if let Some(raw) = &args.json {
        return Ok(raw.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON from {}", path.display()));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read JSON from stdin")?;

    if buffer.trim().is_empty() {
        anyhow::bail!("Command request is empty. Provide --json, --file, or pipe JSON via stdin.");
    }

    Ok(buffer)
}
