mod script;

use anyhow::{Context, Result};
use arrange::{
    ArrangeEngine, ArrangeHost, ChannelConfirmer, Document, EngineConfig, FixedConfirmer,
    GridLayout, OverlapPreference, ReplaceConfirmer, ReplacePrompt, GROUP_ORDER,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use timeline::timescale::{
    clamp_seek, format_clock, timeline_length_seconds, total_duration_seconds, units_to_seconds,
    zoom_percent, zoom_step,
};
use timeline::{Timeline, ZoomDirection};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::script::Step;

#[derive(Parser)]
#[command(name = "arrange-cli")]
#[command(about = "Timeline arrangement CLI - replay pointer scripts against a clip timeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a pointer script and print the committed mutations
    Replay {
        /// Timeline JSON file
        #[arg(short, long)]
        timeline: PathBuf,

        /// Pointer script JSON file
        #[arg(short, long)]
        script: PathBuf,

        /// Engine configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overlap preference (ask, always_replace, never_replace)
        #[arg(long, default_value = "ask")]
        preference: OverlapPreference,

        /// How replace prompts are answered
        #[arg(long, value_enum, default_value = "prompt")]
        answer: Answer,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarise the lanes and clips of a timeline
    Inspect {
        /// Timeline JSON file
        timeline: PathBuf,
    },

    /// Show the zoom level reached by a series of steps
    Zoom {
        /// Starting pixels per second
        #[arg(long, default_value_t = timeline::BASE_PX_PER_SECOND)]
        pps: f64,

        /// Steps to apply in order
        #[arg(value_enum)]
        steps: Vec<ZoomArg>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Answer {
    Yes,
    No,
    Dismiss,
    /// Ask on stdin
    Prompt,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ZoomArg {
    In,
    Out,
}

impl From<ZoomArg> for ZoomDirection {
    fn from(arg: ZoomArg) -> Self {
        match arg {
            ZoomArg::In => ZoomDirection::In,
            ZoomArg::Out => ZoomDirection::Out,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the report on stdout stays machine readable
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            timeline,
            script,
            config,
            preference,
            answer,
            output,
        } => replay_command(timeline, script, config, preference, answer, output).await,
        Commands::Inspect { timeline } => inspect_command(timeline),
        Commands::Zoom { pps, steps } => zoom_command(pps, steps),
    }
}

fn load_timeline(path: &Path) -> Result<Timeline> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading timeline {}", path.display()))?;
    let mut raw: Timeline = serde_json::from_str(&text)
        .with_context(|| format!("parsing timeline {}", path.display()))?;
    raw.lanes.normalize();

    // Re-insert every clip so lane and span checks run
    let mut timeline = Timeline {
        clips: Vec::with_capacity(raw.clips.len()),
        lanes: raw.lanes,
    };
    for clip in raw.clips {
        let id = clip.id;
        timeline
            .insert_clip(clip)
            .with_context(|| format!("clip {} in {}", id, path.display()))?;
    }
    Ok(timeline)
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    EngineConfig::from_json(&text).with_context(|| format!("config {}", path.display()))
}

async fn replay_command(
    timeline_path: PathBuf,
    script_path: PathBuf,
    config_path: Option<PathBuf>,
    preference: OverlapPreference,
    answer: Answer,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let timeline = load_timeline(&timeline_path)?;
    let script_text = std::fs::read_to_string(&script_path)
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let script = script::parse_script(&script_text)?;

    info!(
        "Replaying {} steps against {} clips ({} preference)",
        script.steps.len(),
        timeline.clips.len(),
        preference
    );

    let mut doc = Document::new(timeline).with_preference(preference);
    doc.set_total_duration(script.total_duration);
    if script.current_time > 0.0 {
        doc.seek(script.current_time);
    }
    let band_height = config.new_lane_zone_height;
    let mut engine = ArrangeEngine::new(config).with_viewport(script.viewport.unwrap_or_default());
    let metrics = script.layout.unwrap_or_default();

    let fixed = |answer| Box::new(FixedConfirmer(answer)) as Box<dyn ReplaceConfirmer>;
    let (confirmer, prompter) = match answer {
        Answer::Yes => (fixed(Some(true)), None),
        Answer::No => (fixed(Some(false)), None),
        Answer::Dismiss => (fixed(None), None),
        Answer::Prompt => {
            let (confirmer, prompts) = ChannelConfirmer::new();
            let confirmer: Box<dyn ReplaceConfirmer> = Box::new(confirmer);
            (confirmer, Some(tokio::spawn(answer_prompts(prompts))))
        }
    };

    let mut outcomes = Vec::new();
    for (index, step) in script.steps.into_iter().enumerate() {
        let layout = GridLayout::with_metrics(doc.timeline(), engine.viewport(), metrics);
        match step {
            Step::Down { at, target } => {
                let point = at
                    .resolve(&layout, band_height)
                    .with_context(|| format!("step {}", index))?;
                if let Err(e) = engine.pointer_down(&doc, point, target) {
                    warn!("Step {}: pointer down ignored: {}", index, e);
                }
            }
            Step::Move { at } => {
                let point = at
                    .resolve(&layout, band_height)
                    .with_context(|| format!("step {}", index))?;
                let feedback = engine.pointer_move(&mut doc, &layout, point);
                debug!(step = index, ?feedback, "pointer move");
            }
            Step::Up { at } => {
                let point = at
                    .resolve(&layout, band_height)
                    .with_context(|| format!("step {}", index))?;
                match engine
                    .pointer_up(&mut doc, &layout, point, confirmer.as_ref())
                    .await
                {
                    Ok(outcome) => {
                        info!("Step {}: {}", index, serde_json::to_string(&outcome)?);
                        outcomes.push(outcome);
                    }
                    Err(e) => warn!("Step {}: release failed: {}", index, e),
                }
            }
            Step::Cancel => {
                engine.cancel();
            }
            Step::Zoom { direction } => {
                let pps = engine.zoom(direction);
                info!("Step {}: zoom {:.0} px/s", index, pps);
            }
            Step::Scroll { left } => engine.set_scroll_left(left),
            Step::Seek { time } => {
                let total = total_duration_seconds(doc.total_duration(), &doc.timeline().clips);
                doc.seek(clamp_seek(time, total));
            }
            Step::Delete => outcomes.push(engine.delete_selection(&mut doc)?),
            Step::Undo => {
                if let Err(e) = doc.undo() {
                    warn!("Step {}: undo failed: {}", index, e);
                }
            }
            Step::Redo => {
                if let Err(e) = doc.redo() {
                    warn!("Step {}: redo failed: {}", index, e);
                }
            }
        }
    }

    if engine.is_dragging() {
        warn!("Script ended mid-drag; discarding the open session");
        engine.cancel();
    }

    // Closing the prompt channel lets the answering task finish
    drop(confirmer);
    if let Some(task) = prompter {
        task.await.context("prompt task failed")?;
    }

    let report = serde_json::json!({
        "outcomes": outcomes,
        "current_time": doc.current_time(),
        "timeline": doc.timeline(),
    });
    let text = serde_json::to_string_pretty(&report)?;
    if let Some(output_path) = output {
        std::fs::write(&output_path, text)?;
        info!("Report written to: {:?}", output_path);
    } else {
        println!("{}", text);
    }

    Ok(())
}

/// Answers replace prompts from stdin; end of input dismisses them.
async fn answer_prompts(mut prompts: mpsc::UnboundedReceiver<ReplacePrompt>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(prompt) = prompts.recv().await {
        let request = &prompt.request;
        eprintln!(
            "Replace clip {} with {} ({:.0}% overlap, {} lane {})? [y/N]",
            request.target,
            request.dragged,
            request.overlap_ratio * 100.0,
            request.kind,
            request.lane
        );
        match lines.next_line().await {
            Ok(Some(line)) => {
                let yes = matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes");
                if prompt.respond.send(yes).is_err() {
                    warn!("Replace prompt was no longer awaited");
                }
            }
            Ok(None) => debug!("stdin closed; dismissing replace prompt"),
            Err(e) => warn!("Failed to read answer: {}", e),
        }
    }
}

fn inspect_command(path: PathBuf) -> Result<()> {
    let timeline = load_timeline(&path)?;
    let total = total_duration_seconds(None, &timeline.clips);

    println!(
        "{} clips, content {} (ruler {})",
        timeline.clips.len(),
        format_clock(total),
        format_clock(timeline_length_seconds(total))
    );

    for kind in GROUP_ORDER {
        println!(
            "{}: {}/{} lanes",
            kind,
            timeline.lane_count(kind),
            timeline.lanes.max_lanes_per_kind
        );
        for lane in 0..timeline.lane_count(kind) {
            let mut clips: Vec<_> = timeline.lane_clips(kind, lane).collect();
            clips.sort_by(|a, b| a.position.total_cmp(&b.position));
            println!("  lane {} ({} clips)", lane, clips.len());
            for clip in &clips {
                println!(
                    "    {}  {} - {}",
                    clip.id,
                    format_clock(units_to_seconds(clip.position)),
                    format_clock(units_to_seconds(clip.end()))
                );
            }
            for pair in clips.windows(2) {
                if pair[1].position < pair[0].end() {
                    warn!("{} lane {}: {} overlaps {}", kind, lane, pair[0].id, pair[1].id);
                }
            }
        }
    }

    Ok(())
}

fn zoom_command(pps: f64, steps: Vec<ZoomArg>) -> Result<()> {
    if !pps.is_finite() || pps <= 0.0 {
        anyhow::bail!("pixels per second must be positive, got {}", pps);
    }
    let mut current = pps;
    println!("start  {:>4.0} px/s  {:>3.0}%", current, zoom_percent(current));
    for step in steps {
        current = zoom_step(current, step.into());
        let label = format!("{:?}", step).to_lowercase();
        println!("{:<5}  {:>4.0} px/s  {:>3.0}%", label, current, zoom_percent(current));
    }
    Ok(())
}
