mod cmd_context;
mod cmd_deck;
mod cmd_generate;
mod cmd_parse;
mod cmd_settings;
mod cmd_transcript;
mod render;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "provoke", version, about = "Timestamped provocations for YouTube videos")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a caption track and print its lines
    Transcript {
        /// Caption track URL (YouTube timedtext endpoint)
        url: String,
        /// Render as prompt text capped at this many characters
        #[arg(long)]
        max_chars: Option<usize>,
    },
    /// Parse a saved model response into JSON (no repair)
    Parse {
        /// File holding the raw model text
        file: PathBuf,
    },
    /// Normalize a saved model response and show what is revealed at a position
    Deck {
        /// File holding the raw model text
        file: PathBuf,
        /// Playback position: clock (1:30) or milliseconds
        #[arg(long, default_value = "0")]
        at: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a deck from a video's captions (quick pass, then deep pass)
    Generate {
        /// Video id or watch URL
        #[arg(long)]
        video_id: String,
        /// Caption track URL
        #[arg(long)]
        caption_url: String,
        /// Optional viewer goal
        #[arg(long, default_value = "")]
        goal: String,
        /// Skip the deep pass
        #[arg(long)]
        quick_only: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect stored per-video context
    Context {
        #[command(subcommand)]
        cmd: ContextCmd,
    },
    /// Print effective settings (API key masked)
    Settings {
        /// Dev settings file used when nothing is stored
        #[arg(long)]
        dev_settings: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ContextCmd {
    /// Show one video's record
    Show { video_id: String },
    /// List stored records, newest first
    List,
    /// Keep only the most recently updated records
    Prune {
        #[arg(long, default_value_t = provoke_context::DEFAULT_MAX_RECORDS)]
        keep: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PROVOKE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Transcript { url, max_chars } => cmd_transcript::execute(&url, max_chars),
        Command::Parse { file } => cmd_parse::execute(&file),
        Command::Deck { file, at, json } => cmd_deck::execute(&file, &at, json),
        Command::Generate {
            video_id,
            caption_url,
            goal,
            quick_only,
            json,
        } => cmd_generate::execute(&cmd_generate::GenerateArgs {
            video_id,
            caption_url,
            goal,
            quick_only,
            json,
        }),
        Command::Context { cmd } => match cmd {
            ContextCmd::Show { video_id } => cmd_context::show(&video_id),
            ContextCmd::List => cmd_context::list(),
            ContextCmd::Prune { keep } => cmd_context::prune(keep),
        },
        Command::Settings { dev_settings } => cmd_settings::execute(dev_settings.as_deref()),
    }
}
