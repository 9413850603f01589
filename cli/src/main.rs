mod store;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use picmatch_canvas::config::{ConfigError, MatchConfig};
use picmatch_canvas::geom::Size;
use picmatch_canvas::persist::PersistedTest;
use picmatch_canvas::placement::{DropOutcome, PlacementMap, PlacementRuntime};
use picmatch_canvas::render::{self, RecordingRenderer};
use picmatch_canvas::session::{IntegritySignals, SessionTiming, StoreError, SubmitError, Submitter, TestStore};
use picmatch_canvas::transform::ImageLoad;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use crate::store::DirStore;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON in {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("cannot encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("store failed: {0}")]
    Store(#[from] StoreError),
    #[error("submit failed: {0}")]
    Submit(#[from] SubmitError),
}

#[derive(Parser, Debug)]
#[command(name = "picmatch", about = "Inspect, score and submit picture-matching tests")]
struct Cli {
    /// Viewport the student layout is computed for.
    #[arg(long, env = "PICMATCH_VIEWPORT", default_value = "800x600", value_parser = parse_size)]
    viewport: Size,

    /// Natural size of the test image. Without it the image counts as
    /// undecoded and the layout falls back to the recorded or region extent.
    #[arg(long, env = "PICMATCH_IMAGE_SIZE", value_parser = parse_size)]
    image_size: Option<Size>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug)]
struct CliContext {
    viewport: Size,
    image_size: Option<Size>,
    config: MatchConfig,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the student layout: transform, regions, labels, connectors.
    Inspect { test: PathBuf },
    /// Score an answer sheet (`{"<region>": <label>}`) against a test.
    Score { test: PathBuf, answers: PathBuf },
    /// Print the draw calls for the student canvas.
    Render {
        test: PathBuf,
        #[arg(long)]
        answers: Option<PathBuf>,
    },
    /// Store a test and print its id.
    Publish(PublishArgs),
    /// Submit an answer sheet to the store.
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
struct PublishArgs {
    test: PathBuf,

    #[arg(long, env = "PICMATCH_STORE_DIR", default_value = "picmatch-store")]
    store_dir: PathBuf,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    test: PathBuf,
    answers: PathBuf,

    #[arg(long)]
    test_id: String,

    /// RFC 3339 start time of the attempt.
    #[arg(long, value_parser = parse_timestamp)]
    started_at: OffsetDateTime,

    #[arg(long, default_value_t = 0)]
    visibility_changes: u32,

    #[arg(long, default_value_t = false)]
    caught_cheating: bool,

    #[arg(long, env = "PICMATCH_STORE_DIR", default_value = "picmatch-store")]
    store_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let ctx = CliContext { viewport: cli.viewport, image_size: cli.image_size, config: MatchConfig::from_env()? };

    match cli.command {
        Command::Inspect { test } => run_inspect(&ctx, &test).await,
        Command::Score { test, answers } => run_score(&ctx, &test, &answers).await,
        Command::Render { test, answers } => run_render(&ctx, &test, answers.as_deref()).await,
        Command::Publish(args) => run_publish(args).await,
        Command::Submit(args) => run_submit(&ctx, args).await,
    }
}

async fn run_inspect(ctx: &CliContext, test: &Path) -> Result<(), CliError> {
    let rt = load_runtime(ctx, test).await?;
    let regions: Vec<Value> = rt
        .region_rects()
        .into_iter()
        .map(|(id, rect)| json!({ "id": id, "rect": rect }))
        .collect();
    print_json(&json!({
        "transform": rt.transform(),
        "regions": regions,
        "labels": rt.label_views(),
        "connectors": rt.connector_segments(),
    }))
}

async fn run_score(ctx: &CliContext, test: &Path, answers: &Path) -> Result<(), CliError> {
    let mut rt = load_runtime(ctx, test).await?;
    apply_answers(&mut rt, &read_json(answers).await?);
    print_json(&serde_json::to_value(rt.score())?)
}

async fn run_render(ctx: &CliContext, test: &Path, answers: Option<&Path>) -> Result<(), CliError> {
    let mut rt = load_runtime(ctx, test).await?;
    if let Some(answers) = answers {
        apply_answers(&mut rt, &read_json(answers).await?);
    }
    let mut recorder = RecordingRenderer::new();
    let Ok(()) = render::draw_placement(&mut recorder, &rt, ctx.viewport);
    print_json(&serde_json::to_value(&recorder.ops)?)
}

async fn run_publish(args: PublishArgs) -> Result<(), CliError> {
    let test: PersistedTest = read_json(&args.test).await?;
    let receipt = DirStore::new(args.store_dir).persist_test(&test).await?;
    print_json(&serde_json::to_value(receipt)?)
}

async fn run_submit(ctx: &CliContext, args: SubmitArgs) -> Result<(), CliError> {
    let mut rt = load_runtime(ctx, &args.test).await?;
    apply_answers(&mut rt, &read_json(&args.answers).await?);

    let timing = SessionTiming { started_at: args.started_at, submitted_at: OffsetDateTime::now_utc() };
    let signals =
        IntegritySignals { caught_cheating: args.caught_cheating, visibility_change_times: args.visibility_changes };
    let payload = rt.submission_payload(args.test_id, timing, signals)?;

    let store = DirStore::new(args.store_dir);
    let receipt = Submitter::new().submit(&store, &payload).await?;
    print_json(&json!({ "receipt": receipt, "report": rt.score() }))
}

// =============================================================
// Helpers
// =============================================================

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read { path: path.to_owned(), source })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Parse { path: path.to_owned(), source })
}

async fn load_runtime(ctx: &CliContext, test: &Path) -> Result<PlacementRuntime, CliError> {
    let test: PersistedTest = read_json(test).await?;
    let mut rt = PlacementRuntime::new(&test, ctx.config.clone());
    rt.set_container(ctx.viewport);
    if let Some(size) = ctx.image_size {
        rt.set_image(ImageLoad::Ready(size));
    }
    Ok(rt)
}

fn apply_answers(rt: &mut PlacementRuntime, answers: &PlacementMap) {
    for (region, label) in answers {
        match rt.place(*label, *region) {
            DropOutcome::Placed { evicted: Some(evicted), .. } => {
                warn!(%region, %label, %evicted, "answer sheet places two labels in one region");
            }
            DropOutcome::Rejected { .. } => warn!(%region, %label, "answer rejected: region already occupied"),
            DropOutcome::Placed { .. } | DropOutcome::Unplaced => {}
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn parse_size(raw: &str) -> Result<Size, String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{raw}`"))?;
    let width: f64 = w.trim().parse().map_err(|e| format!("invalid width `{w}`: {e}"))?;
    let height: f64 = h.trim().parse().map_err(|e| format!("invalid height `{h}`: {e}"))?;
    let size = Size::new(width, height);
    if size.is_positive() { Ok(size) } else { Err(format!("size must be positive, got `{raw}`")) }
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| format!("invalid RFC 3339 timestamp `{raw}`: {e}"))
}
