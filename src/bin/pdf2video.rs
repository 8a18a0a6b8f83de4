//! CLI binary for edgequake-pdf2video.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `ClientConfig` + `GenerationConfig`, drives one `Session` and prints the
//! outcome.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2video::config::{API_URL_ENV, DEFAULT_API_URL};
use edgequake_pdf2video::{
    ChannelState, ClientConfig, DeliveryOutcome, DirectorySaver, GenerationConfig, PromptSaver,
    Quality, SaveStrategy, Session, SessionObserver, SharedObserver, KNOWN_TRANSITIONS,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner while the job is queued, switching to a
/// percentage bar once the progress channel starts reporting.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Connecting to service…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}%  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(progress_style);
        self.bar.set_prefix("Generating");
        self.bar.set_position(0);
        self.bar.reset_elapsed();
    }
}

impl SessionObserver for CliObserver {
    fn on_channel_state(&self, state: ChannelState) {
        match state {
            ChannelState::Connected => self.bar.set_message("live progress connected"),
            ChannelState::Closed => self.bar.set_message(dim("no live progress")),
            _ => {}
        }
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_submission_start(&self, file_name: &str, estimated_pages: usize) {
        self.activate_bar();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Submitting {file_name} (~{estimated_pages} slides)…"
            ))
        ));
    }

    fn on_submission_success(&self, video_url: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} Video ready: {}", green("✔"), bold(video_url));
    }

    fn on_submission_error(&self, message: &str) {
        self.bar.abandon();
        eprintln!("{} {}", red("✘"), red(message));
    }

    fn on_saved(&self, path: &Path) {
        eprintln!("{} Saved to {}", green("✔"), bold(&path.display().to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Five seconds per slide, no transitions, save into the current directory
  pdf2video deck.pdf

  # Crossfade + zoom, 3 s per slide, low quality
  pdf2video --transition crossfade --transition zoom_in -d 3 --quality low deck.pdf

  # Every transition effect, save into ./videos without prompting
  pdf2video --all-transitions --no-prompt -o videos deck.pdf

  # PDF from a URL, remote service
  pdf2video --api-url https://slides.example.com https://example.com/talk.pdf

  # Show the page / running-time estimate only
  pdf2video --estimate-only deck.pdf

TRANSITIONS:
  none (default), crossfade, fadeinout, zoom_in, zoom_out, slide_left, slide_right
  Repeat --transition (or pass a comma list) to combine effects.

ENVIRONMENT VARIABLES:
  PDF2VIDEO_API_URL       Service base URL (default http://localhost:8000)
  RUST_LOG                Override log filtering (e.g. edgequake_pdf2video=debug)
"#;

/// Turn a PDF into a slideshow video through a remote conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2video",
    version,
    about = "Turn a PDF into a slideshow video through a remote conversion service",
    long_about = "Submit a PDF (local file or URL) to a PDF-to-video service, follow its \
progress live over a WebSocket and save the finished MP4 locally.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Seconds each slide stays on screen (suggested 1–60).
    #[arg(short, long, env = "PDF2VIDEO_DURATION", default_value_t = 5.0)]
    duration: f64,

    /// Transition effect; repeat or comma-separate to combine.
    #[arg(
        short,
        long = "transition",
        env = "PDF2VIDEO_TRANSITIONS",
        value_delimiter = ',',
        default_value = "none"
    )]
    transitions: Vec<String>,

    /// Select every known transition effect.
    #[arg(long, conflicts_with = "transitions")]
    all_transitions: bool,

    /// Transition overlap in seconds (suggested 0.1–5).
    #[arg(long, env = "PDF2VIDEO_TRANSITION_DURATION", default_value_t = 1.0)]
    transition_duration: f64,

    /// Output quality.
    #[arg(long, env = "PDF2VIDEO_QUALITY", value_enum, default_value = "high")]
    quality: QualityArg,

    /// Service base URL.
    #[arg(long, env = API_URL_ENV, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Directory the video is saved into.
    #[arg(short, long, env = "PDF2VIDEO_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Never ask where to save; write straight into --output-dir.
    #[arg(long, env = "PDF2VIDEO_NO_PROMPT")]
    no_prompt: bool,

    /// Print the page and running-time estimate only, no submission.
    #[arg(long)]
    estimate_only: bool,

    /// Print a JSON summary on stdout.
    #[arg(long, env = "PDF2VIDEO_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2VIDEO_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2VIDEO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2VIDEO_QUIET")]
    quiet: bool,

    /// Job request timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_REQUEST_TIMEOUT", default_value_t = 900)]
    request_timeout: u64,

    /// PDF / video download timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_DOWNLOAD_TIMEOUT", default_value_t = 300)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum QualityArg {
    Low,
    High,
}

impl From<QualityArg> for Quality {
    fn from(v: QualityArg) -> Self {
        match v {
            QualityArg::Low => Quality::Low,
            QualityArg::High => Quality::High,
        }
    }
}

#[derive(serde::Serialize)]
struct Summary<'a> {
    client_id: &'a str,
    file: Option<&'a str>,
    estimated_pages: usize,
    estimated_duration: Option<String>,
    transitions: String,
    quality: Quality,
    video_url: Option<&'a str>,
    progress_channel: ChannelState,
    delivery: Option<&'a DeliveryOutcome>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.estimate_only;
    let filter = if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    let filter = if cli.verbose { "debug" } else { filter };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let client_config = ClientConfig::builder()
        .base_url(&cli.api_url)
        .request_timeout_secs(cli.request_timeout)
        .download_timeout_secs(cli.download_timeout)
        .build()
        .context("Invalid configuration")?;
    let generation = build_generation(&cli)?;

    // ── Estimate-only mode ───────────────────────────────────────────────
    if cli.estimate_only {
        let mut session = Session::new(client_config)
            .context("Failed to create session")?
            .with_generation(generation);
        session
            .select_input(&cli.input)
            .await
            .context("Failed to load PDF")?;

        if cli.json {
            print_summary(&session, None)?;
        } else {
            let accepted = session.file().map(|a| a.file.name.as_str()).unwrap_or("-");
            println!("File:          {}", accepted);
            println!("Pages (est.):  {}", session.page_estimate());
            println!(
                "Per slide:     {}",
                edgequake_pdf2video::format_duration(session.generation.duration)
            );
            if let Some(total) = session.estimated_duration() {
                println!("Running time:  ~{}", total);
            }
            println!("Transitions:   {}", session.generation.transitions);
        }
        return Ok(());
    }

    // ── Run session ──────────────────────────────────────────────────────
    let observer: SharedObserver = if show_progress {
        CliObserver::new() as SharedObserver
    } else {
        Arc::new(edgequake_pdf2video::NoopObserver)
    };

    let mut session = Session::start(client_config, observer)
        .context("Failed to start session")?
        .with_generation(generation);

    session
        .select_input(&cli.input)
        .await
        .context("Failed to load PDF")?;

    if !cli.quiet && !cli.json {
        if let Some(total) = session.estimated_duration() {
            eprintln!(
                "{} ~{} slides × {}  →  {}",
                cyan("◆"),
                session.page_estimate(),
                edgequake_pdf2video::format_duration(session.generation.duration),
                bold(&format!("~{total}"))
            );
        }
        if session.generation.transitions.has_effect() {
            eprintln!(
                "   {} {}  ({}s overlap)",
                dim("transitions:"),
                session.generation.transitions,
                session.generation.transition_duration
            );
        }
    }

    let video_url = session.submit().await.context("Video generation failed")?;
    if video_url.is_none() {
        anyhow::bail!("No PDF selected");
    }

    // Saving happens only after the job has returned, so the prompt does not
    // fight with the progress bar for the terminal.
    let prompt = (!cli.no_prompt && !cli.quiet && !cli.json && io::stdin().is_terminal())
        .then(|| PromptSaver::stdio(&cli.output_dir));
    let fallback = DirectorySaver::new(&cli.output_dir);

    let outcome = session
        .download(
            prompt.as_ref().map(|p| p as &dyn SaveStrategy),
            &fallback,
        )
        .await
        .context("Failed to save video")?;

    match (&outcome, cli.json, cli.quiet) {
        (_, true, _) => print_summary(&session, outcome.as_ref())?,
        (Some(DeliveryOutcome::Cancelled), false, false) => {
            eprintln!("{} Save cancelled", dim("–"));
            if let Some(url) = session.result_url() {
                eprintln!("   video is still available at {}", url);
            }
        }
        (Some(DeliveryOutcome::Saved { path, .. }), false, false) if !show_progress => {
            eprintln!("Saved to {}", path.display());
        }
        _ => {}
    }

    session.close();
    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_generation(cli: &Cli) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .duration(cli.duration)
        .transition_duration(cli.transition_duration)
        .quality(cli.quality.clone().into());

    if cli.all_transitions {
        builder = builder.all_transitions();
    } else {
        for id in &cli.transitions {
            let id = id.trim();
            if id != "none" && !KNOWN_TRANSITIONS.contains(&id) {
                tracing::warn!("Unknown transition '{}'; sending it anyway", id);
            }
        }
        builder = builder.transitions(&cli.transitions);
    }

    builder.build().context("Invalid generation parameters")
}

fn print_summary(session: &Session, delivery: Option<&DeliveryOutcome>) -> Result<()> {
    let summary = Summary {
        client_id: session.client_id().as_str(),
        file: session.file().map(|a| a.file.name.as_str()),
        estimated_pages: session.page_estimate(),
        estimated_duration: session.estimated_duration(),
        transitions: session.generation.transitions.to_wire(),
        quality: session.generation.quality,
        video_url: session.result_url(),
        progress_channel: session.channel_state(),
        delivery,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
    );
    Ok(())
}
