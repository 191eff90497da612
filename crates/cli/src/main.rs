mod app;

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use civcalc_core::config::{self, AppConfig};
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Civilization card purchase calculator", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the directory holding rule data files
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Override the directory holding saved situations
    #[arg(long)]
    saves_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available rule files
    Rules {
        /// Case-insensitive filter
        query: Option<String>,
    },
    /// List saved situations
    Players,
    /// Start a new situation for a player
    New {
        player: String,
        /// Rules id (defaults to `default_rules` from the configuration)
        #[arg(long)]
        rules: Option<String>,
        /// Points target
        #[arg(long)]
        target: Option<u32>,
        /// Override the card limit of the rules
        #[arg(long)]
        card_limit: Option<u32>,
        /// Credits only benefit one card at a time
        #[arg(long)]
        exclusive_credits: bool,
    },
    /// Show the state of every card
    Show {
        player: String,
        /// Hide cards that cannot be bought this turn
        #[arg(long)]
        filter: bool,
    },
    /// Plan cards and show the result without buying them
    Plan { player: String, cards: Vec<String> },
    /// Plan and buy cards
    Buy { player: String, cards: Vec<String> },
    /// Give up an owned card
    Discard { player: String, card: String },
    /// Enter funds
    Funds {
        player: String,
        /// Treasury tokens
        #[arg(long, allow_hyphen_values = true)]
        treasury: Option<String>,
        /// Commodity count as `id=count`
        #[arg(long = "set")]
        counts: Vec<String>,
        /// Count the best mining yield
        #[arg(long)]
        mining_bonus: Option<bool>,
    },
    /// Delete a player's situation
    Remove { player: String },
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => {
            config::ensure_default_config()?;
            AppConfig::load()?
        }
    };
    if let Some(dir) = cli.rules_dir {
        config.rules_dir = dir;
    }
    if let Some(dir) = cli.saves_dir {
        config.saves_dir = dir;
    }

    let app = app::App::new(config);
    let output = match cli.command {
        Command::Rules { query } => app.list_rules(query.as_deref().unwrap_or(""))?,
        Command::Players => app.list_players()?,
        Command::New {
            player,
            rules,
            target,
            card_limit,
            exclusive_credits,
        } => app.new_situation(&player, rules, target, card_limit, exclusive_credits)?,
        Command::Show { player, filter } => app.show(&player, filter)?,
        Command::Plan { player, cards } => app.plan(&player, &cards, false)?,
        Command::Buy { player, cards } => app.plan(&player, &cards, true)?,
        Command::Discard { player, card } => app.discard(&player, &card)?,
        Command::Funds {
            player,
            treasury,
            counts,
            mining_bonus,
        } => app.funds(&player, treasury.as_deref(), &counts, mining_bonus)?,
        Command::Remove { player } => app.remove(&player)?,
    };
    print!("{output}");
    Ok(())
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("civcalc.log");

    let env_filter = EnvFilter::from_default_env();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_ansi(false)
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
