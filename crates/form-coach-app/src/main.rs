#![warn(missing_docs)]
//! # form-coach-app binary
//!
//! Command-line shell for the form-coach pipeline: record or upload an
//! exercise clip, submit it for posture analysis, review the results, and
//! export the report.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use form_coach_app::{
    AnalysisResultStore, ApiConfig, AppError, CoachSession, ResultsOrigin, app_version,
};
use form_coach_capture::{CameraBackend, ReplayCameraBackend, SyntheticCameraBackend, TickOutcome};
use form_coach_submit::{HttpAnalysisTransport, ReportDownloader, SubmissionClient};
use form_coach_ui::{NO_ANALYSIS_TEXT, ResultsView, StillFrame};

/// Whole-request timeout for analysis submissions and report downloads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Parser)]
#[command(
    name = "form-coach",
    version = app_version(),
    about = "Capture or upload an exercise clip and review per-frame posture feedback"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a clip from the camera backend and submit it for analysis
    Record(RecordArgs),
    /// Submit an existing video file for analysis
    Upload(UploadArgs),
    /// Show the analysis for this session, or the configured fallback
    Results,
    /// Download the analysis report
    Report(ReportArgs),
}

#[derive(Args)]
struct RecordArgs {
    /// Clip file replayed through the capture pipeline instead of a webcam
    #[arg(long)]
    source: Option<PathBuf>,
    /// Auto-stop after this many seconds of recording
    #[arg(long, default_value_t = 30)]
    seconds: u64,
}

#[derive(Args)]
struct UploadArgs {
    /// Video file to submit
    file: PathBuf,
}

#[derive(Args)]
struct ReportArgs {
    /// Directory the report is saved into
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

/// Events fed into the recording loop by the ticker and stdin watcher.
enum ShellEvent {
    Tick,
    StopRequested,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(error) = run(cli.command) {
        log::error!("{error}");
        eprintln!("form-coach: {error}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), AppError> {
    match command {
        Command::Record(args) => run_record(args),
        Command::Upload(args) => run_upload(args),
        Command::Results => run_results(),
        Command::Report(args) => run_report(args),
    }
}

fn build_session(backend: Arc<dyn CameraBackend>) -> Result<CoachSession, AppError> {
    let config = ApiConfig::from_env()?;
    let transport = Arc::new(HttpAnalysisTransport::new(REQUEST_TIMEOUT)?);
    let submission = SubmissionClient::new(config.analyze_endpoint(), transport.clone());
    let report = ReportDownloader::new(config.report_endpoint(), transport);
    let store = AnalysisResultStore::from_env();
    log::info!("analysis service: {}", config.base());
    Ok(CoachSession::new(backend, submission, report, store))
}

fn run_record(args: RecordArgs) -> Result<(), AppError> {
    let backend: Arc<dyn CameraBackend> = match &args.source {
        Some(path) => Arc::new(ReplayCameraBackend::new(path)),
        None => Arc::new(SyntheticCameraBackend::granting()),
    };

    let mut session = build_session(backend)?;
    session.begin_capture();
    session.start_recording()?;
    println!(
        "recording: press Enter to stop (auto-stop after {}s)",
        args.seconds
    );

    let (event_tx, event_rx) = mpsc::channel::<ShellEvent>();
    let ticker_cancelled = Arc::new(AtomicBool::new(false));

    let ticker_flag = Arc::clone(&ticker_cancelled);
    let ticker_tx = event_tx.clone();
    thread::spawn(move || {
        while !ticker_flag.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_secs(1));
            if ticker_tx.send(ShellEvent::Tick).is_err() {
                break;
            }
        }
    });

    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = event_tx.send(ShellEvent::StopRequested);
    });

    while let Ok(event) = event_rx.recv() {
        match event {
            ShellEvent::Tick => match session.tick() {
                Ok(TickOutcome::Advanced { elapsed_seconds }) => {
                    println!("  recording {}", session.capture().elapsed_label());
                    if elapsed_seconds >= args.seconds {
                        break;
                    }
                }
                Ok(TickOutcome::Ignored) => {}
                Err(error) => {
                    ticker_cancelled.store(true, Ordering::SeqCst);
                    return Err(error);
                }
            },
            ShellEvent::StopRequested => break,
        }
    }

    // Cancel the ticker in the same step that freezes the timer; the session
    // additionally ignores any tick that lands after the stop.
    ticker_cancelled.store(true, Ordering::SeqCst);
    let clip = session.stop_recording()?;
    if clip.is_none() {
        println!("no clip was recorded");
        return Ok(());
    }
    println!("recorded {}", session.capture().elapsed_label());

    let view = session.submit()?;
    print_results(&view, ResultsOrigin::Live);
    Ok(())
}

fn run_upload(args: UploadArgs) -> Result<(), AppError> {
    let mut session = build_session(Arc::new(SyntheticCameraBackend::granting()))?;
    session.begin_capture();
    session.choose_upload(args.file);

    let view = session.submit()?;
    print_results(&view, ResultsOrigin::Live);
    Ok(())
}

fn run_results() -> Result<(), AppError> {
    let session = build_session(Arc::new(SyntheticCameraBackend::granting()))?;
    match session.load_results() {
        Some((view, origin)) => print_results(&view, origin),
        None => println!("{NO_ANALYSIS_TEXT}"),
    }
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let mut session = build_session(Arc::new(SyntheticCameraBackend::granting()))?;
    let path = session.download_report(&args.out_dir)?;
    println!("report saved to {}", path.display());
    Ok(())
}

fn print_results(view: &ResultsView, origin: ResultsOrigin) {
    if origin == ResultsOrigin::Fallback {
        println!("showing bundled example analysis (no submission this session)");
    }

    if view.frames.is_empty() {
        println!("analysis complete: no moments reported");
        return;
    }

    println!(
        "analysis complete: {} issue(s) across {} moment(s)",
        view.total_issues,
        view.frames.len()
    );

    for frame in &view.frames {
        let label = frame.timestamp_label.as_deref().unwrap_or("--:--");
        let still = match &frame.still {
            StillFrame::Image(bytes) => format!("{} byte still", bytes.len()),
            StillFrame::Unavailable => "still unavailable".to_string(),
        };
        match frame.issue_badge {
            Some(count) => println!("frame {} [{label}] {still} - {count} issue(s)", frame.position),
            None => println!("frame {} [{label}] {still} - clean", frame.position),
        }
        for error in &frame.errors {
            println!("    issue: {error}");
        }
        for suggestion in &frame.suggestions {
            println!("    suggestion: {suggestion}");
        }
    }
}
