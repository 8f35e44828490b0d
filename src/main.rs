use clap::Parser;
use scout::agent::Effort;
use scout::core::config::{self, CliOverrides};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

#[derive(Parser)]
#[command(name = "scout", about = "Terminal client for a LangGraph research agent")]
struct Args {
    /// LangGraph server URL (default http://127.0.0.1:2024)
    #[arg(short, long)]
    server_url: Option<String>,

    /// Assistant (graph) id to run
    #[arg(short, long)]
    assistant: Option<String>,

    /// Initial research effort
    #[arg(short, long, value_enum)]
    effort: Option<Effort>,

    /// Initial model
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to scout.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("scout.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        log::warn!("Ignoring config file: {}", e);
        config::ScoutConfig::default()
    });
    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            server_url: args.server_url,
            assistant_id: args.assistant,
            effort: args.effort,
            model: args.model,
        },
    );

    log::info!(
        "Scout starting up: server={}, assistant={}",
        resolved.server_url,
        resolved.assistant_id
    );

    scout::tui::run(resolved)
}
