//! Recollect CLI
//!
//! Command-line front end for the SM-2 review scheduler: add cards, work
//! through the due queue, answer, preview, and reset decks.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use recollect_core::{
    AnswerInput, CardId, CardRecord, Config, DeckId, DueItem, OwnerId, Quality, QueueRequest,
    Rating, ReviewScheduler, ReviewState, SchedulerError, SqliteStore, StoreError,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Recollect - SM-2 flashcard review scheduler
#[derive(Parser)]
#[command(name = "recollect")]
#[command(author = "Recollect Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Recollect review scheduler")]
#[command(long_about = "Recollect schedules flashcard reviews with the SM-2 algorithm.\n\nCards you answer well come back after growing intervals; cards you miss come back tomorrow.")]
struct Cli {
    /// Data directory (defaults to RECOLLECT_DATA_DIR, then the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs on stderr as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a card (or replace one with the same id)
    AddCard {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        deck: String,
        /// Question side
        front: String,
        /// Answer side
        back: String,
        /// Card id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Also create its review state, due now
        #[arg(long)]
        seed: bool,
    },

    /// Create due-now review states for cards that have none
    Seed {
        #[arg(long)]
        owner: String,
        /// Only this deck
        #[arg(long)]
        deck: Option<String>,
    },

    /// List due cards
    Queue {
        #[arg(long)]
        owner: String,
        /// Only this deck
        #[arg(long)]
        deck: Option<String>,
        /// Page size, clamped to 1-50
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },

    /// Record an answer
    Answer {
        #[arg(long)]
        owner: String,
        card: String,
        /// 0-5, or again/hard/good/easy
        #[arg(value_parser = parse_quality)]
        quality: Quality,
    },

    /// Show what each answer button would schedule
    Preview {
        #[arg(long)]
        owner: String,
        card: String,
    },

    /// Make every card in a deck due now with default ease
    ResetDeck {
        #[arg(long)]
        owner: String,
        deck: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let store = Arc::new(SqliteStore::new(config.db_path())?);
    debug!(path = %store.path().display(), "Opened review store");
    let app = App {
        scheduler: ReviewScheduler::from_config(store, &config),
        json: cli.json,
    };
    let now = Utc::now();

    match cli.command {
        Commands::AddCard {
            owner,
            deck,
            front,
            back,
            id,
            seed,
        } => run_add_card(&app, owner, deck, front, back, id, seed, now).await,
        Commands::Seed { owner, deck } => run_seed(&app, owner, deck, now).await,
        Commands::Queue { owner, deck, limit } => run_queue(&app, owner, deck, limit, now).await,
        Commands::Answer {
            owner,
            card,
            quality,
        } => run_answer(&app, owner, card, quality, now).await,
        Commands::Preview { owner, card } => run_preview(&app, owner, card, now).await,
        Commands::ResetDeck { owner, deck } => run_reset_deck(&app, owner, deck, now).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Integer grade (clamped to 0-5) or a button label
fn parse_quality(raw: &str) -> Result<Quality, String> {
    match raw.trim().parse::<i64>() {
        Ok(n) => Ok(Quality::new(n)),
        Err(_) => raw.parse::<Rating>().map(Rating::quality),
    }
}

struct App {
    scheduler: ReviewScheduler<SqliteStore>,
    json: bool,
}

impl App {
    fn emit<T: Serialize>(&self, value: &T, pretty: impl FnOnce(&T)) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            pretty(value);
        }
        Ok(())
    }
}

/// Run add-card command
#[allow(clippy::too_many_arguments)]
async fn run_add_card(
    app: &App,
    owner: String,
    deck: String,
    front: String,
    back: String,
    id: Option<String>,
    seed: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let owner = OwnerId::new(owner);
    let deck = DeckId::new(deck);
    let card_id = id.map(CardId::new).unwrap_or_else(CardId::generate);

    let card = CardRecord::new(card_id, owner.clone(), deck.clone(), front, back);
    app.scheduler.store().upsert_card(&card)?;
    if seed {
        app.scheduler.seed(&owner, Some(&deck), now).await?;
    }

    app.emit(&card, |card| {
        println!("{} {}", "Added card".green().bold(), card.id);
        println!("  {}: {}", "Deck".white().bold(), card.deck_id);
        println!("  {}: {}", "Front".white().bold(), card.front);
    })
}

/// Run seed command
async fn run_seed(
    app: &App,
    owner: String,
    deck: Option<String>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let owner = OwnerId::new(owner);
    let deck = deck.map(DeckId::new);
    let created = app.scheduler.seed(&owner, deck.as_ref(), now).await?;

    app.emit(&serde_json::json!({ "created": created }), |_| {
        if created == 0 {
            println!("{}", "Every card already has a review state.".dimmed());
        } else {
            println!("{} {} review states", "Seeded".green().bold(), created);
        }
    })
}

/// Run queue command
async fn run_queue(
    app: &App,
    owner: String,
    deck: Option<String>,
    limit: Option<i64>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let owner = OwnerId::new(owner);
    let request = QueueRequest {
        deck_id: deck.map(DeckId::new),
        limit,
    };
    let items = app.scheduler.due_queue(&owner, &request, now).await?;

    app.emit(&items, |items| print_queue(items, now))
}

fn print_queue(items: &[DueItem], now: DateTime<Utc>) {
    println!("{}", "=== Due for Review ===".cyan().bold());
    println!();

    if items.is_empty() {
        println!("{}", "Nothing due. Come back later.".dimmed());
        return;
    }

    for item in items {
        let overdue = (now - item.due).num_days();
        let when = if overdue > 0 {
            format!("{}d overdue", overdue).red()
        } else {
            "due".yellow()
        };
        println!(
            "  {:<38} {:<12} {:>10}  {}",
            item.card_id.as_str().white().bold(),
            item.deck_id.as_str(),
            when,
            item.front
        );
    }
    println!();
    println!("{}: {}", "Cards".white().bold(), items.len());
}

/// Run answer command
async fn run_answer(
    app: &App,
    owner: String,
    card: String,
    quality: Quality,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let owner = OwnerId::new(owner);
    let input = AnswerInput::new(CardId::new(card), quality);

    // Looked up before the write so a failure here never hides a recorded answer
    let record = match app.scheduler.card(&owner, &input.card_id).await {
        Ok(record) => record,
        Err(SchedulerError::NotFound { card, .. }) => {
            anyhow::bail!("unknown card {} for owner {}", card, owner)
        }
        Err(e) => return Err(e.into()),
    };

    let state = match app.scheduler.answer(&owner, &input, now).await {
        Ok(state) => state,
        Err(SchedulerError::Store(StoreError::Conflict { card, .. })) => {
            anyhow::bail!("card {} was answered concurrently; reload and try again", card)
        }
        Err(SchedulerError::NotFound { card, .. }) => {
            anyhow::bail!("card {} has no review state; run `recollect seed` first", card)
        }
        Err(e) => return Err(e.into()),
    };

    app.emit(&state, |state| {
        println!("{}", "=== Answer ===".cyan().bold());
        println!("{}", record.back);
        println!();
        print_state(state);
    })
}

fn print_state(state: &ReviewState) {
    println!("{}: {}", "Repetitions".white().bold(), state.reps);
    println!("{}: {} days", "Interval".white().bold(), state.interval);
    println!("{}: {:.2}", "Ease".white().bold(), state.ease);
    println!("{}: {}", "Lapses".white().bold(), state.lapses);
    println!(
        "{}: {}",
        "Next Review".white().bold(),
        state.due.format("%Y-%m-%d %H:%M:%S")
    );
}

/// Run preview command
async fn run_preview(
    app: &App,
    owner: String,
    card: String,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let owner = OwnerId::new(owner);
    let preview = app.scheduler.preview(&owner, &CardId::new(card), now).await?;

    app.emit(&preview, |preview| {
        println!("{}", "=== If You Answer ===".cyan().bold());
        println!();
        for rating in Rating::ALL {
            let next = preview.for_rating(rating);
            let label = format!("{:<6} ({})", rating.as_str(), rating.quality());
            let colored_label = match rating {
                Rating::Again => label.red(),
                Rating::Hard => label.yellow(),
                Rating::Good => label.green(),
                Rating::Easy => label.cyan(),
            };
            println!(
                "  {}  {:>4}d  ease {:.2}  next {}",
                colored_label,
                next.interval,
                next.ease,
                next.due.format("%Y-%m-%d")
            );
        }
    })
}

/// Run reset-deck command
async fn run_reset_deck(
    app: &App,
    owner: String,
    deck: String,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let owner = OwnerId::new(owner);
    let deck = DeckId::new(deck);
    let counts = app.scheduler.reset_deck(&owner, &deck, now).await?;

    app.emit(&counts, |counts| {
        println!("{} {}", "Reset deck".green().bold(), deck);
        println!("  {}: {}", "Matched".white().bold(), counts.matched);
        println!("  {}: {}", "Modified".white().bold(), counts.modified);
    })
}
