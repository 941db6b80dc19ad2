use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mapmark_markers::{Marker, MarkerId};
use mapmark_recommend::{Candidate, SimilarMarker};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

pub mod app;
pub mod config;

use app::{AskOutcome, MapApp, MarkerDraft};
use config::{AppConfig, Strategy};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string_pretty(value)?)
}

#[derive(Parser)]
#[command(name = "mapmark")]
#[command(about = "Annotate map locations and get place recommendations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./mapmark.toml, then the user config dir)
    #[arg(long, global = true, env = "MAPMARK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding markers.json / vectors.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Recommendation strategy
    #[arg(long, global = true, value_enum)]
    strategy: Option<StrategyFlag>,

    /// Keep markers in memory only for this process
    #[arg(long, global = true)]
    no_persist: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StrategyFlag {
    Keyword,
    Similarity,
}

impl From<StrategyFlag> for Strategy {
    fn from(flag: StrategyFlag) -> Self {
        match flag {
            StrategyFlag::Keyword => Self::Keyword,
            StrategyFlag::Similarity => Self::Similarity,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Place a marker
    Add(AddArgs),

    /// Remove a marker by id
    Remove(RemoveArgs),

    /// List markers in insertion order
    List(ListArgs),

    /// Markers similar to an existing one (similarity strategy)
    Similar(SimilarArgs),

    /// Ask for a recommendation
    Ask(AskArgs),

    /// Interactive recommendation chat on stdin
    Chat,

    /// Re-embed all markers into the vector index (similarity strategy)
    Reindex,
}

#[derive(Args)]
struct AddArgs {
    /// Latitude
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude
    #[arg(long, allow_negative_numbers = true)]
    lng: f64,

    /// Marker name (default: "<prefix> <position>")
    #[arg(long, default_value = "")]
    name: String,

    /// Markdown description
    #[arg(long, short = 'd', default_value = "")]
    description: String,

    /// Image files to inline into the description
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RemoveArgs {
    /// Marker id
    id: String,
}

#[derive(Args)]
struct ListArgs {
    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SimilarArgs {
    /// Marker id
    id: String,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct AskArgs {
    /// Free-text query
    query: String,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    if let Some(strategy) = cli.strategy {
        config.features.strategy = strategy.into();
    }
    if cli.no_persist {
        config.features.persistence = false;
    }
    log::debug!("Effective config: {config:?}");

    let mut app = MapApp::init(&config).await?;

    match cli.command {
        Commands::Add(args) => run_add(&mut app, args).await?,
        Commands::Remove(args) => run_remove(&mut app, args).await?,
        Commands::List(args) => run_list(&app, &args)?,
        Commands::Similar(args) => run_similar(&app, args).await?,
        Commands::Ask(args) => run_ask(&mut app, args).await?,
        Commands::Chat => run_chat(&mut app).await?,
        Commands::Reindex => {
            let report = app.reindex().await?;
            print_stdout(&format!(
                "Reindexed {} markers, pruned {} stale vectors",
                report.indexed, report.pruned
            ))?;
        }
    }
    Ok(())
}

async fn run_add(app: &mut MapApp, args: AddArgs) -> Result<()> {
    let marker = app
        .add_marker(MarkerDraft {
            lat: args.lat,
            lng: args.lng,
            name: args.name,
            description: args.description,
            images: args.images,
        })
        .await
        .context("Error adding marker")?;

    if args.json {
        print_json(&marker)
    } else {
        print_stdout(&format!("Added {}", marker_line(&marker)))
    }
}

async fn run_remove(app: &mut MapApp, args: RemoveArgs) -> Result<()> {
    let id = MarkerId::new(args.id);
    let removed = app
        .remove_marker(&id)
        .await
        .with_context(|| format!("Error removing marker {id}"))?;
    match removed {
        Some(marker) => print_stdout(&format!("Removed {}", marker_line(&marker))),
        None => print_stdout(&format!("No marker with id {id}")),
    }
}

fn run_list(app: &MapApp, args: &ListArgs) -> Result<()> {
    if args.json {
        return print_json(&app.markers());
    }
    if app.markers().is_empty() {
        return print_stdout("No locations marked yet. Use `mapmark add` to place one.");
    }
    let lines: Vec<String> = app.markers().iter().map(marker_line).collect();
    print_stdout(&lines.join("\n"))
}

async fn run_similar(app: &MapApp, args: SimilarArgs) -> Result<()> {
    let similar = app.similar(&MarkerId::new(args.id)).await?;
    if args.json {
        let rows: Vec<SimilarRow<'_>> = similar.iter().map(SimilarRow::from).collect();
        return print_json(&rows);
    }
    if similar.is_empty() {
        return print_stdout("No similar locations found.");
    }
    let lines: Vec<String> = similar
        .iter()
        .map(|s| format!("{:.3}\t{}\t{}", s.score, s.candidate.name, s.candidate.description))
        .collect();
    print_stdout(&lines.join("\n"))
}

async fn run_ask(app: &mut MapApp, args: AskArgs) -> Result<()> {
    let outcome = app.ask(&args.query).await?;
    if args.json {
        return print_json(&outcome);
    }
    print_outcome(&outcome)
}

async fn run_chat(app: &mut MapApp) -> Result<()> {
    let mut session = app.chat_session();
    if let Some(greeting) = session.messages().first() {
        print_stdout(&format!("AI: {}", greeting.content))?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/list" => {
                run_list(app, &ListArgs { json: false })?;
                continue;
            }
            _ => {}
        }
        match app.chat_turn(&mut session, &line).await {
            Ok(Some(outcome)) => print_outcome(&outcome)?,
            Ok(None) => {}
            Err(err) => log::error!("Error generating recommendation: {err:#}"),
        }
    }

    log::debug!("Chat ended after {} messages", session.messages().len());
    Ok(())
}

fn print_outcome(outcome: &AskOutcome) -> Result<()> {
    print_stdout(&format!("AI: {}", outcome.recommendation.message))?;
    for candidate in outcome.recommendation.candidates.iter().skip(1) {
        print_stdout(&format!("  also: {} ({:.4}, {:.4})", candidate.name, candidate.lat, candidate.lng))?;
    }
    if let Some(marker) = &outcome.added {
        print_stdout(&format!("Added {}", marker_line(marker)))?;
    }
    Ok(())
}

fn marker_line(marker: &Marker) -> String {
    format!(
        "[{}] {} (Lat: {:.4}, Lng: {:.4})",
        marker.id, marker.name, marker.lat, marker.lng
    )
}

#[derive(Serialize)]
struct SimilarRow<'a> {
    id: &'a str,
    score: f32,
    #[serde(flatten)]
    candidate: &'a Candidate,
}

impl<'a> From<&'a SimilarMarker> for SimilarRow<'a> {
    fn from(similar: &'a SimilarMarker) -> Self {
        Self {
            id: &similar.id,
            score: similar.score,
            candidate: &similar.candidate,
        }
    }
}
