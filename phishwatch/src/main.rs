use commands::command_argument_builder;
use phishwatch::handlers::{handle_analyze, handle_serve};
use phishwatch_core::print_banner;

mod commands;

#[tokio::main]
async fn main() {
    // .env must be loaded before clap reads env-backed arguments
    let _ = dotenvy::dotenv();

    let mut cmd = command_argument_builder();
    let chosen_command = cmd.clone().get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // analyze writes JSON to stdout, so it never gets the banner
    if !quiet && !matches!(chosen_command.subcommand(), Some(("analyze", _))) {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("serve", primary_command)) => handle_serve(primary_command).await,
        Some(("analyze", primary_command)) => handle_analyze(primary_command).await,
        None => {
            let _ = cmd.print_help();
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
