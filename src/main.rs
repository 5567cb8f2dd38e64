use anyhow::{bail, Context, Result};
use breathline::config::EngineConfig;
use breathline::kernel::event::{Event, InputEvent};
use breathline::kernel::mutation::EditCommand;
use breathline::kernel::reactor::{Editor, EditorConfig};
use breathline::kernel::scheduler::Notice;
use breathline::kernel::selection::ClickMode;
use breathline::kernel::session::{SessionBootstrap, TimelineSession};
use breathline::kernel::time::TimePoint;
use breathline::server::{FileTimelineArchive, FixedSegmentation, LocalTimeline};
use breathline::services::api::{HttpTimelineApi, TimelineApi};
use breathline::services::driver::EditorDriver;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const SOURCE: &str = "console";

struct Args {
    bootstrap: PathBuf,
    local_archive: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut bootstrap = None;
    let mut local_archive = None;
    let mut config = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--local" => local_archive = Some(PathBuf::from(args.next().context("--local needs a directory")?)),
            "--config" => config = Some(PathBuf::from(args.next().context("--config needs a path")?)),
            _ if bootstrap.is_none() => bootstrap = Some(PathBuf::from(&arg)),
            other => bail!("unexpected argument {other:?}"),
        }
    }

    Ok(Args {
        bootstrap: bootstrap.context("usage: breathline <bootstrap.json> [--local <archive_dir>] [--config <file>]")?,
        local_archive,
        config,
    })
}

enum Line {
    Input(InputEvent),
    Show,
    Help,
}

fn parse_line(line: &str) -> Result<Line, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let rest: Vec<&str> = words.collect();

    let id = |rest: &[&str]| -> Result<u64, String> {
        rest.first()
            .and_then(|w| w.parse().ok())
            .ok_or_else(|| format!("{verb} needs a segment id"))
    };

    let input = match verb {
        "click" => InputEvent::click(SOURCE, id(&rest[..])?, ClickMode::Toggle),
        "range" => InputEvent::click(SOURCE, id(&rest[..])?, ClickMode::Range),
        "clear" => InputEvent::clear(SOURCE),
        "delete" => InputEvent::command(SOURCE, EditCommand::Delete),
        "merge" => InputEvent::command(SOURCE, EditCommand::Merge),
        "split" => {
            let t: f64 = rest
                .first()
                .and_then(|w| w.parse().ok())
                .filter(|t: &f64| t.is_finite())
                .ok_or("split needs a time")?;
            InputEvent::command(SOURCE, EditCommand::Split { split_time: TimePoint::from_units(t) })
        }
        "undo" => InputEvent::command(SOURCE, EditCommand::Undo),
        "recalc" => {
            let confirmed = rest.contains(&"--yes");
            let apnea_threshold = match rest.iter().find(|w| **w != "--yes") {
                Some(w) => Some(w.parse::<f64>().map_err(|_| format!("bad threshold {w:?}"))?),
                None => None,
            };
            InputEvent::command(SOURCE, EditCommand::Recalculate { apnea_threshold, confirmed })
        }
        "show" => return Ok(Line::Show),
        "help" => return Ok(Line::Help),
        other => return Err(format!("unknown command {other:?}, try 'help'")),
    };
    Ok(Line::Input(input))
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::SelectionChanged { selected, validity } => println!(
            "[SELECT] {} selected (delete: {}, merge: {}, split: {})",
            selected, validity.deletable, validity.mergeable, validity.splittable
        ),
        Notice::Applied { op, segments } => println!("[OK] {} applied, {} segments", op, segments),
        Notice::Rejected { op, message, .. } => println!("[FAILED] {}: {}", op, message),
        Notice::PreconditionFailed { op, error } => println!("[REFUSED] {}: {}", op, error),
        Notice::Busy { op } => println!("[BUSY] {} ignored, a request is still pending", op),
        Notice::UndoUnavailable => println!("[REFUSED] nothing to undo"),
        Notice::ConfirmationRequired { op } => {
            println!("[CONFIRM] {} discards all edits and undo history; repeat with --yes", op)
        }
        Notice::UndoAvailability(available) => println!("[UNDO] available: {}", available),
    }
}

fn print_timeline(editor: &Editor) {
    let session = &editor.state.session;
    let selection = editor.state.selection();
    println!("db_id {} | duration {}", session.db_id, session.duration);
    for seg in session.store.iter() {
        let marker = if selection.contains(seg.id) { "*" } else { " " };
        println!("{} #{:<4} {:>10} .. {:<10} {}", marker, seg.id, seg.start, seg.end, seg.phase);
    }
    for cycle in &session.cycles {
        println!("  {} @ {}", cycle.label, cycle.start);
    }
}

async fn repl<A: TimelineApi>(mut driver: EditorDriver<A>) -> Result<()> {
    let db_id = driver.editor.state.session.db_id;
    let probe = driver.api().undo_available(db_id).await;
    for notice in driver.drive(vec![Event::UndoProbed(probe)]).await {
        print_notice(&notice);
    }
    print_timeline(&driver.editor);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        match parse_line(line) {
            Ok(Line::Input(input)) => {
                tracing::debug!("Console input: '{}'", line);
                for notice in driver.handle(input).await {
                    print_notice(&notice);
                }
            }
            Ok(Line::Show) => print_timeline(&driver.editor),
            Ok(Line::Help) => println!(
                "click <id> | range <id> | clear | delete | merge | split <time> | undo | recalc [threshold] --yes | show | quit"
            ),
            Err(msg) => println!("[?] {}", msg),
        }
    }

    let stats = driver.editor.telemetry.snapshot();
    tracing::info!("Session closed: {:?}", stats);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env()?,
    };

    let raw = std::fs::read_to_string(&args.bootstrap)
        .with_context(|| format!("reading {}", args.bootstrap.display()))?;
    let bootstrap: SessionBootstrap = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.bootstrap.display()))?;

    let editor_config = EditorConfig { contiguity: config.contiguity };
    let timeout = Duration::from_millis(config.request_timeout_ms);

    match args.local_archive {
        Some(dir) => {
            let archive = FileTimelineArchive::new(&dir)
                .with_context(|| format!("opening archive {}", dir.display()))?;
            let mirror = LocalTimeline::new(config.contiguity).with_archive(archive);
            let opened = mirror
                .open_session(bootstrap.duration, FixedSegmentation::new(bootstrap.events))
                .context("opening local session")?;
            tracing::info!("Local mirror session {} archived under {}", opened.db_id, dir.display());

            let editor = Editor::new(TimelineSession::from_bootstrap(opened), editor_config);
            repl(EditorDriver::new(editor, mirror, timeout)).await
        }
        None => {
            tracing::info!("Editing db_id {} against {}", bootstrap.db_id, config.base_url);
            let editor = Editor::new(TimelineSession::from_bootstrap(bootstrap), editor_config);
            repl(EditorDriver::new(editor, HttpTimelineApi::new(config), timeout)).await
        }
    }
}
