//! `xui` command line entry point

use anyhow::Context;
use clap::Parser;
use xui_cli::{logging, replay, session, Cli, Command, SessionAction, XuiConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("resolving working directory")?;
    let mut config = XuiConfig::resolve(cli.config.as_deref(), &cwd).context("loading configuration")?;
    if cli.verbose {
        config = config.with_log_level("debug");
    }
    logging::init(&config.log)?;

    match cli.command {
        Command::Replay { file } => {
            let report = replay::replay_file(&file, config.live.policy()).await?;
            for error in &report.errors {
                eprintln!("error: {error}");
            }
            println!("{}", serde_json::to_string_pretty(&report.documents)?);
            if report.aborted() {
                std::process::exit(1);
            }
        }
        Command::Session { action } => {
            let store = session::open_store(&config).await;
            let value = match action {
                SessionAction::Get { key } => session::get(&store, &key)?,
                SessionAction::Set { key, value } => session::set(&store, &key, &value).await?,
                SessionAction::Show => session::show(&store),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}
