//! Notebox Telegram Bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx GEMINI_API_KEY=yyy cargo run -p notebox-telegram
//! ```

use std::path::PathBuf;

use clap::Parser;
use notebox_core::config::{self, NoteboxConfig};
use notebox_telegram::NoteboxBot;
use tracing_subscriber::EnvFilter;

/// Notebox Telegram Bot - merge message bursts into Markdown notes
#[derive(Parser, Debug)]
#[command(name = "notebox-telegram")]
#[command(about = "Telegram bot that merges message bursts into formatted Markdown notes")]
struct Args {
    /// Directory where notes are written (overrides NOTEBOX_INBOX_DIR)
    #[arg(short, long)]
    inbox_dir: Option<PathBuf>,

    /// Quiet period in milliseconds before buffered messages are flushed
    #[arg(short, long)]
    quiet_period_ms: Option<String>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load environment variables from the state directory first
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let filter = match args.verbose {
        0 => "notebox_telegram=info,notebox_core=info,teloxide=warn",
        1 => "notebox_telegram=debug,notebox_core=debug,teloxide=info",
        2 => "notebox_telegram=trace,notebox_core=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = NoteboxConfig::from_env()?;
    if let Some(dir) = args.inbox_dir {
        config = config.with_inbox_dir(dir);
    }
    if let Some(raw) = args.quiet_period_ms {
        config = config.with_quiet_period(config::parse_quiet_period(&raw)?);
    }

    if !config.has_formatter() {
        tracing::warn!("GEMINI_API_KEY not set - notes will fail until it is configured");
    }

    let bot = NoteboxBot::new(config)?;

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\n[notebox] Notebox Telegram Bot");
            println!("   Bot: @{}", username);
            println!("   Inbox: {}", bot.state().config().inbox_dir.display());
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("\n   Press Ctrl+C to stop\n");

    bot.start_polling().await?;

    Ok(())
}
