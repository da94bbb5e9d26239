use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use combiner::config::{Config, TransportKind};
use combiner::session::{Session, Submission};
use combiner::surface::{Surface, TerminalSurface};

/// Send one prompt to several language models and combine their answers.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file (defaults to ./combiner.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transport: streaming (/chat), combined (/generate) or direct
    #[arg(short, long)]
    transport: Option<TransportKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a single prompt
    Ask {
        /// Model id to query; repeat for several models
        #[arg(short, long = "model")]
        models: Vec<String>,

        /// Prompt text
        prompt: String,
    },
    /// List the models available for selection
    Models,
    /// Interactive loop
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config =
        Config::load(args.config.as_deref(), args.transport).context("loading configuration")?;
    tracing::debug!(?config, "configuration");

    let session = Session::from_config(&config).context("building HTTP client")?;
    let surface = TerminalSurface;

    match args.command {
        Command::Ask { models, prompt } => {
            if !session.submit(&surface, &prompt, &models).await.is_completed() {
                std::process::exit(1);
            }
        }
        Command::Models => {
            for model in session.available_models().await? {
                println!("{model}");
            }
        }
        Command::Repl => repl(&session, &surface).await?,
    }

    Ok(())
}

async fn repl(session: &Session, surface: &TerminalSurface) -> anyhow::Result<()> {
    // Populate the selection once, like a page load.
    let available = match session.available_models().await {
        Ok(models) => models,
        Err(e) => {
            tracing::warn!("could not load model list: {e}");
            surface.alert(&format!("could not load model list: {}", e.user_message()));
            Vec::new()
        }
    };
    print_models(&available);
    println!("select models with `:models a,b`, list with `:list`, leave with `exit`");

    let mut selected: Vec<String> = available.iter().take(1).cloned().collect();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match ReplCommand::parse(&line) {
            ReplCommand::Exit => break,
            ReplCommand::List => print_models(&available),
            ReplCommand::Select(models) => {
                selected = models;
                println!("selected: {}", selected.join(", "));
            }
            ReplCommand::Prompt => {
                if let Submission::Rejected(e) = session.submit(surface, &line, &selected).await {
                    tracing::debug!("submission rejected: {e}");
                }
            }
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Exit,
    List,
    Select(Vec<String>),
    /// Anything else is submitted as a prompt.
    Prompt,
}

impl ReplCommand {
    fn parse(line: &str) -> Self {
        let input = line.trim();
        let (word, rest) = input
            .split_once(char::is_whitespace)
            .unwrap_or((input, ""));
        match word {
            "exit" | "quit" if rest.is_empty() => Self::Exit,
            ":list" if rest.is_empty() => Self::List,
            ":models" => Self::Select(
                rest.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect(),
            ),
            _ => Self::Prompt,
        }
    }
}

fn print_models(models: &[String]) {
    if models.is_empty() {
        println!("no models available");
        return;
    }
    for model in models {
        println!("  {model}");
    }
}
