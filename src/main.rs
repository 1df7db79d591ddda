//! PDF security rewrite tool
//! Author: kartik4091
//! Created: 2025-06-06
//!
//! Command-line front end over the rewrite engine: inspect a document's
//! security profile, rewrite documents (one or many), author protected
//! documents from text and process Base64 upload requests.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use pdx_rewrite::security::SecurityFlags;
use pdx_rewrite::transport::{self, ApplySecurityRequest, CreateSecuredRequest, UploadRewriteRequest};
use pdx_rewrite::utils::{init_logging, LOG_LEVELS};
use pdx_rewrite::{
    Credentials, Destination, DocumentSource, Error, LopdfCodec, Result, RewriteEngine, RewriteOutcome, RewriteSpec,
    RewriterConfig, SecuritySettings,
};

type Engine = RewriteEngine<LopdfCodec>;

/// Permission names accepted by `--allow`
const PERMISSIONS: [&str; 8] = [
    "print",
    "print-high-quality",
    "modify",
    "copy",
    "annotate",
    "fill-in",
    "screen-readers",
    "assemble",
];

const ENCRYPTION_LABELS: [&str; 4] = ["RC4_40", "RC4_128", "AES_128", "AES_256"];

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let log_level = matches.get_one::<String>("log-level").map(String::as_str).unwrap_or("info");
    if let Err(e) = init_logging(log_level) {
        eprintln!("{}", e);
    }

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {}", e);
            process::exit(2);
        }
    };
    debug!(?config, "Configuration loaded");
    let engine = Arc::new(RewriteEngine::with_config(config));

    let result = match matches.subcommand() {
        Some(("info", sub)) => run_info(&engine, sub),
        Some(("rewrite", sub)) => run_rewrite(&engine, sub),
        Some(("create", sub)) => run_create(&engine, sub),
        Some(("apply", sub)) => run_apply(&engine, sub),
        Some(("upload", sub)) => run_upload(&engine, sub),
        Some(("batch", sub)) => run_batch(Arc::clone(&engine), sub).await,
        _ => Err(Error::Config("No command given".into())),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("❌ {}", e);
            process::exit(2);
        }
    }
}

fn build_cli() -> Command {
    Command::new("pdx-rewrite")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rewrite PDF documents under new metadata and controlled permissions")
        .subcommand_required(true)
        .arg_required_else_help(true)
        // Global options
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .global(true)
            .help("Configuration file (JSON/YAML)"))
        .arg(Arg::new("set")
            .long("set")
            .value_name("KEY=VALUE")
            .action(ArgAction::Append)
            .global(true)
            .help("Override a configuration value"))
        .arg(Arg::new("log-level")
            .short('v')
            .long("log-level")
            .value_parser(LOG_LEVELS)
            .default_value("info")
            .global(true)
            .help("Logging verbosity"))
        .subcommand(Command::new("info")
            .about("Print the security profile of a document")
            .arg(input_arg())
            .arg(Arg::new("password")
                .short('p')
                .long("password")
                .value_name("PASSWORD")
                .help("Password opening the document")))
        .subcommand(Command::new("rewrite")
            .about("Rewrite a document, replacing its producer metadata")
            .arg(input_arg())
            .arg(output_arg().required(true))
            .args(rewrite_args()))
        .subcommand(Command::new("create")
            .about("Create a protected document from text")
            .arg(output_arg().required(true))
            .arg(Arg::new("title")
                .long("title")
                .value_name("TEXT")
                .help("Document title"))
            .arg(Arg::new("content")
                .long("content")
                .value_name("TEXT")
                .conflicts_with("content-file")
                .help("Body text"))
            .arg(Arg::new("content-file")
                .long("content-file")
                .value_name("FILE")
                .help("Read the body text from a file"))
            .args(security_args()))
        .subcommand(Command::new("apply")
            .about("Protect an existing document, keeping it otherwise unchanged")
            .arg(input_arg())
            .arg(output_arg().required(true))
            .arg(Arg::new("password")
                .short('p')
                .long("password")
                .value_name("PASSWORD")
                .help("Password opening the source document"))
            .args(security_args()))
        .subcommand(Command::new("upload")
            .about("Process a JSON upload request with a Base64 document")
            .arg(Arg::new("request")
                .value_name("REQUEST")
                .required(true)
                .help("JSON request file"))
            .arg(Arg::new("kind")
                .short('k')
                .long("kind")
                .value_parser(["rewrite", "apply", "create"])
                .default_value("rewrite")
                .help("Request type")))
        .subcommand(Command::new("batch")
            .about("Rewrite several documents concurrently")
            .arg(Arg::new("inputs")
                .value_name("FILES")
                .num_args(1..)
                .required(true)
                .help("Input PDF files"))
            .arg(Arg::new("output-dir")
                .short('d')
                .long("output-dir")
                .value_name("DIR")
                .required(true)
                .help("Directory receiving the rewritten files"))
            .args(rewrite_args()))
}

fn input_arg() -> Arg {
    Arg::new("input")
        .value_name("FILE")
        .required(true)
        .help("Input PDF file")
}

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .help("Output PDF file")
}

fn rewrite_args() -> Vec<Arg> {
    vec![
        Arg::new("owner-password")
            .long("owner-password")
            .value_name("PASSWORD")
            .help("Owner password of the source"),
        Arg::new("user-password")
            .long("user-password")
            .value_name("PASSWORD")
            .help("User password of the source"),
        Arg::new("new-owner-password")
            .long("new-owner-password")
            .value_name("PASSWORD")
            .help("Owner password for the output (defaults to the source's)"),
        Arg::new("new-user-password")
            .long("new-user-password")
            .value_name("PASSWORD")
            .help("User password for the output (defaults to the source's)"),
        Arg::new("no-preserve")
            .long("no-preserve")
            .action(ArgAction::SetTrue)
            .help("Do not carry the source's encryption forward"),
        Arg::new("remove-security")
            .long("remove-security")
            .action(ArgAction::SetTrue)
            .help("Write an unencrypted document; wins over preservation"),
    ]
}

fn security_args() -> Vec<Arg> {
    vec![
        Arg::new("owner-password")
            .long("owner-password")
            .value_name("PASSWORD")
            .help("Owner password (required)"),
        Arg::new("user-password")
            .long("user-password")
            .value_name("PASSWORD")
            .help("User password"),
        Arg::new("encryption")
            .short('e')
            .long("encryption")
            .value_name("TYPE")
            .value_parser(ENCRYPTION_LABELS)
            .ignore_case(true)
            .default_value("RC4_128")
            .help("Encryption type"),
        Arg::new("allow")
            .short('a')
            .long("allow")
            .value_name("PERMISSION")
            .value_parser(PERMISSIONS)
            .value_delimiter(',')
            .action(ArgAction::Append)
            .help("Granted permission; everything else is denied"),
    ]
}

fn load_config(matches: &ArgMatches) -> Result<RewriterConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => RewriterConfig::from_file(path)?,
        None => RewriterConfig::default(),
    };
    if let Some(overrides) = matches.get_many::<String>("set") {
        for entry in overrides {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("Expected KEY=VALUE, got {}", entry)))?;
            config.set(key.trim(), value.trim())?;
        }
    }
    Ok(config)
}

fn optional<'a>(matches: &'a ArgMatches, name: &str) -> Option<&'a str> {
    matches.get_one::<String>(name).map(String::as_str)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(outcome: &RewriteOutcome) -> Result<bool> {
    if outcome.success {
        info!("✅ {}", outcome.message);
    } else {
        error!("❌ {}", outcome.message);
    }
    print_json(outcome)?;
    Ok(outcome.success)
}

fn rewrite_spec(matches: &ArgMatches, input: &Path, output: PathBuf) -> RewriteSpec {
    RewriteSpec::new(DocumentSource::path(input))
        .with_credentials(Credentials::new(
            optional(matches, "owner-password"),
            optional(matches, "user-password"),
        ))
        .with_new_credentials(Credentials::new(
            optional(matches, "new-owner-password"),
            optional(matches, "new-user-password"),
        ))
        .preserve_security(!matches.get_flag("no-preserve"))
        .remove_security(matches.get_flag("remove-security"))
        .to(Destination::File(output))
}

fn security_flags(matches: &ArgMatches) -> SecurityFlags {
    let granted: Vec<&str> = matches
        .get_many::<String>("allow")
        .map(|values| values.map(String::as_str).collect())
        .unwrap_or_default();
    let flag = |name: &str| Some(if granted.contains(&name) { "Y" } else { "N" }.to_string());

    SecurityFlags {
        allow_printing: flag("print"),
        allow_high_quality_printing: flag("print-high-quality"),
        allow_assembly: flag("assemble"),
        allow_copy: flag("copy"),
        allow_screen_readers: flag("screen-readers"),
        allow_modify_contents: flag("modify"),
        allow_modify_annotations: flag("annotate"),
        allow_fill_in: flag("fill-in"),
    }
}

fn security_settings(matches: &ArgMatches) -> SecuritySettings {
    SecuritySettings::from_flags(
        &security_flags(matches),
        Credentials::new(optional(matches, "owner-password"), optional(matches, "user-password")),
        optional(matches, "encryption"),
    )
}

fn run_info(engine: &Engine, matches: &ArgMatches) -> Result<bool> {
    let input = matches.get_one::<String>("input").map(PathBuf::from).unwrap_or_default();
    let profile = engine.extract_security_profile(&DocumentSource::Path(input), optional(matches, "password"))?;
    print_json(&profile)?;
    Ok(true)
}

fn run_rewrite(engine: &Engine, matches: &ArgMatches) -> Result<bool> {
    let input = matches.get_one::<String>("input").map(PathBuf::from).unwrap_or_default();
    let output = matches.get_one::<String>("output").map(PathBuf::from).unwrap_or_default();
    info!("🚀 Rewriting {} → {}", input.display(), output.display());

    let outcome = engine.rewrite_existing(&rewrite_spec(matches, &input, output));
    report(&outcome)
}

fn run_create(engine: &Engine, matches: &ArgMatches) -> Result<bool> {
    let output = matches.get_one::<String>("output").map(PathBuf::from).unwrap_or_default();
    let content = match optional(matches, "content-file") {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => optional(matches, "content").map(str::to_string),
    };

    let outcome = engine.create_secured(
        optional(matches, "title"),
        content.as_deref(),
        &security_settings(matches),
        &Destination::File(output),
    );
    report(&outcome)
}

fn run_apply(engine: &Engine, matches: &ArgMatches) -> Result<bool> {
    let input = matches.get_one::<String>("input").map(PathBuf::from).unwrap_or_default();
    let output = matches.get_one::<String>("output").map(PathBuf::from).unwrap_or_default();

    let outcome = engine.apply_security(
        &DocumentSource::Path(input),
        optional(matches, "password"),
        &security_settings(matches),
        &Destination::File(output),
    );
    report(&outcome)
}

fn run_upload(engine: &Engine, matches: &ArgMatches) -> Result<bool> {
    let path = matches.get_one::<String>("request").map(PathBuf::from).unwrap_or_default();
    let body = std::fs::read_to_string(&path)?;

    let outcome = match optional(matches, "kind") {
        Some("apply") => {
            let request: ApplySecurityRequest = serde_json::from_str(&body)?;
            transport::apply_security_base64(engine, &request)
        }
        Some("create") => {
            let request: CreateSecuredRequest = serde_json::from_str(&body)?;
            transport::create_secured_base64(engine, &request)
        }
        _ => {
            let request: UploadRewriteRequest = serde_json::from_str(&body)?;
            transport::upload_and_rewrite(engine, &request)
        }
    };
    print_json(&outcome)?;
    Ok(outcome.success)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchEntry {
    input: PathBuf,
    #[serde(flatten)]
    outcome: RewriteOutcome,
}

async fn run_batch(engine: Arc<Engine>, matches: &ArgMatches) -> Result<bool> {
    let output_dir = matches.get_one::<String>("output-dir").map(PathBuf::from).unwrap_or_default();
    std::fs::create_dir_all(&output_dir)?;

    let inputs: Vec<PathBuf> = matches
        .get_many::<String>("inputs")
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default();
    let semaphore = Arc::new(Semaphore::new(engine.config().max_parallel_jobs));
    info!("🚀 Rewriting {} documents with {} workers", inputs.len(), engine.config().max_parallel_jobs);

    let jobs = inputs.into_iter().map(|input| {
        let file_name = input.file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("output.pdf"));
        let spec = rewrite_spec(matches, &input, output_dir.join(file_name));
        let engine = Arc::clone(&engine);
        let semaphore = Arc::clone(&semaphore);

        async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!("Job queue closed: {}", e);
                    return None;
                }
            };
            match tokio::task::spawn_blocking(move || engine.rewrite_existing(&spec)).await {
                Ok(outcome) => Some(BatchEntry { input, outcome }),
                Err(e) => {
                    error!(input = %input.display(), "Rewrite task failed: {}", e);
                    None
                }
            }
        }
    });

    let results = join_all(jobs).await;
    let total = results.len();
    let entries: Vec<BatchEntry> = results.into_iter().flatten().collect();
    let succeeded = entries.iter().filter(|entry| entry.outcome.success).count();

    print_json(&entries)?;
    info!("📊 {}/{} documents rewritten", succeeded, total);
    Ok(succeeded == total)
}
