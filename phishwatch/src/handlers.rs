use crate::server;
use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use phishwatch_core::{AnalysisError, analyze};
use phishwatch_model::{GeminiClient, ModelError};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::warn;
use url::Url;

/// Model client settings shared by `serve` and `analyze`
pub struct ModelOptions {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: Url,
    pub timeout_secs: u64,
}

impl ModelOptions {
    pub fn from_args(args: &ArgMatches) -> Result<Self, String> {
        let model = args
            .get_one::<String>("model")
            .cloned()
            .ok_or("--model is required")?;
        let api_base = args
            .get_one::<Url>("api-base")
            .cloned()
            .ok_or("--api-base is required")?;
        let timeout_secs = *args
            .get_one::<u64>("timeout")
            .ok_or("--timeout is required")?;

        Ok(Self {
            api_key: args.get_one::<String>("api-key").cloned(),
            model,
            api_base,
            timeout_secs,
        })
    }
}

/// Build the Gemini client. A missing API key is only reported when the
/// first request is made.
pub fn build_model_client(options: &ModelOptions) -> Result<GeminiClient, ModelError> {
    let client = GeminiClient::with_timeout(options.api_key.clone(), options.timeout_secs)?
        .with_model(options.model.clone())
        .with_api_base(options.api_base.clone());

    if !client.has_api_key() {
        warn!("GEMINI_API_KEY is not set; analysis requests will fail until it is provided");
    }
    Ok(client)
}

/// Read an analysis request from a JSON file
pub fn load_request_file(path: &Path) -> Result<Value, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read request file {}: {}", path.display(), e))?;

    serde_json::from_str(&content)
        .map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))
}

/// Install the global tracing subscriber (`RUST_LOG`, default `info`)
pub fn init_tracing(log_to_stderr: bool) {
    let builder = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    );
    let _ = if log_to_stderr {
        builder.with_writer(std::io::stderr).try_init()
    } else {
        builder.try_init()
    };
}

pub async fn handle_serve(args: &ArgMatches) {
    init_tracing(false);

    let options = match ModelOptions::from_args(args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };
    let listen = args
        .get_one::<String>("listen")
        .cloned()
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());
    let body_limit = args
        .get_one::<usize>("body-limit")
        .copied()
        .unwrap_or(server::DEFAULT_BODY_LIMIT);

    if let Err(e) = run_server(&options, &listen, body_limit).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_server(options: &ModelOptions, listen: &str, body_limit: usize) -> anyhow::Result<()> {
    let client = build_model_client(options).context("failed to build model client")?;
    println!(
        "{} Model: {} ({})",
        "→".blue(),
        options.model.bright_white(),
        options.api_base
    );

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;
    println!("{} Listening on {}", "✓".green().bold(), listen.bright_white());

    let app = server::router(Arc::new(client), body_limit);
    server::serve(listener, app).await?;
    Ok(())
}

pub async fn handle_analyze(args: &ArgMatches) {
    init_tracing(true);

    let Some(path) = args.get_one::<std::path::PathBuf>("file") else {
        eprintln!("{} --file is required", "✗".red().bold());
        std::process::exit(2);
    };

    let raw = match load_request_file(path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(2);
        }
    };

    let client = match ModelOptions::from_args(args)
        .and_then(|options| build_model_client(&options).map_err(|e| e.to_string()))
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    match analyze(&client, &raw).await {
        Ok(verdict) => match serde_json::to_string_pretty(&verdict) {
            Ok(body) => println!("{}", body),
            Err(e) => {
                eprintln!("{} Failed to encode verdict: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(exit_code(&e));
        }
    }
}

/// 2 for a rejected request, 1 for an upstream failure
pub fn exit_code(err: &AnalysisError) -> i32 {
    if err.is_client_error() { 2 } else { 1 }
}
