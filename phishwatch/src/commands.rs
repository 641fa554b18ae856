use crate::CLAP_STYLING;
use clap::{arg, command};
use phishwatch_model::client::{DEFAULT_API_BASE, DEFAULT_MODEL};
use url::Url;

fn model_args() -> [clap::Arg; 4] {
    [
        arg!(--"api-key" <KEY>)
            .required(false)
            .help("Gemini API key")
            .env("GEMINI_API_KEY")
            .hide_env_values(true),
        arg!(-m --"model" <NAME>)
            .required(false)
            .help("Gemini model used for analysis")
            .env("GEMINI_MODEL")
            .default_value(DEFAULT_MODEL),
        arg!(--"api-base" <URL>)
            .required(false)
            .help("Base URL of the Gemini REST API")
            .env("GEMINI_API_BASE")
            .value_parser(clap::value_parser!(Url))
            .default_value(DEFAULT_API_BASE),
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("Upper bound on a single model call, in seconds")
            .value_parser(clap::value_parser!(u64).range(1..))
            .default_value("60"),
    ]
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("phishwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("phishwatch")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("serve")
                .about("Run the HTTP relay that answers POST /analyze")
                .arg(
                    arg!(-l --"listen" <ADDR>)
                        .required(false)
                        .help("Address to bind the HTTP server to")
                        .env("PHISHWATCH_LISTEN")
                        .default_value("0.0.0.0:8080"),
                )
                .arg(
                    arg!(--"body-limit" <BYTES>)
                        .required(false)
                        .help("Maximum accepted request body size in bytes")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("16777216"),
                )
                .args(model_args()),
        )
        .subcommand(
            command!("analyze")
                .about(
                    "Analyze a single page snapshot read from a JSON file and print the verdict",
                )
                .arg(
                    arg!(-f --"file" <PATH>)
                        .required(true)
                        .help("Path to a JSON analysis request (url, hostname, dom_signature, forms, image_b64)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .args(model_args()),
        )
}
