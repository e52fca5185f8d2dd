//! # Virtual TA CLI (`vta`)
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vta serve` | Start the HTTP server |
//! | `vta ask "<question>"` | Answer one question and print the JSON response |
//! | `vta prompt "<question>"` | Print the prompt that would be sent to the model |
//! | `vta collect course` | Render the Markdown course tree into the course corpus |
//! | `vta collect forum` | Fetch forum threads into the forum corpus |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use virtual_ta::{collect_course, collect_forum, completion, config, models, relay, server};

/// Virtual TA — answers course questions from course notes and forum threads.
#[derive(Parser)]
#[command(name = "vta", version)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Serves `POST /api/` plus `GET /` and `GET /health`. Requires the
    /// completion token (default `AIPROXY_TOKEN`) in the environment or `.env`.
    Serve {
        /// Address to bind, overriding `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Answer a single question and print the JSON response.
    Ask {
        /// The student question.
        question: String,

        /// Optional base64-encoded image attachment.
        #[arg(long)]
        image: Option<String>,
    },

    /// Print the assembled prompt without calling the model.
    Prompt {
        /// The student question.
        question: String,
    },

    /// Populate a context corpus.
    Collect {
        #[command(subcommand)]
        source: CollectSource,
    },
}

#[derive(Subcommand)]
enum CollectSource {
    /// Render `[collectors.course].root` Markdown files into `context.course_path`.
    Course,
    /// Fetch forum search results into `context.forum_path`.
    Forum,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            server::run_server(&cfg, bind).await?;
        }
        Commands::Ask { question, image } => {
            let provider = completion::create_provider(&cfg.completion)?;
            let request = models::QaRequest { question, image };
            let response = relay::answer_question(&cfg, provider.as_ref(), &request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Prompt { question } => {
            let prompt = relay::prepare_prompt(&cfg, &question).await?;
            println!("{}", prompt);
        }
        Commands::Collect { source } => match source {
            CollectSource::Course => {
                let stats = collect_course::run_collect_course(&cfg)?;
                println!(
                    "collected {} course files ({} bytes) into {}",
                    stats.items,
                    stats.bytes,
                    cfg.context.course_path.display()
                );
            }
            CollectSource::Forum => {
                let stats = collect_forum::run_collect_forum(&cfg).await?;
                println!(
                    "collected {} forum threads ({} bytes) into {}",
                    stats.items,
                    stats.bytes,
                    cfg.context.forum_path.display()
                );
            }
        },
    }

    Ok(())
}
