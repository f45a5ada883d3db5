use crate::config::{load_settings, Settings};
use crate::engine::HttpBackend;
use crate::logging::{self, LogTarget};
use crate::model::{ExecutionRequest, Language, RunState};
use crate::orchestrator::{process_outcome, SubmissionController};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "vizrun",
    version,
    about = "Send Python or R visualization code to an execution service and show the result"
)]
pub struct Cli {
    /// Execution endpoint that accepts {"language", "code"} as JSON
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Language of the submitted code
    #[arg(long, value_enum)]
    pub language: Option<Language>,

    /// Inline code to submit (or to prefill the editor)
    #[arg(long, conflicts_with = "file")]
    pub code: Option<String>,

    /// Read code from a file
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Submit once, print a JSON summary and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Submit once, print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Write the artifact to this path (--json/--text only)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Directory for artifacts saved from the TUI
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Path to a config file (default: <config dir>/vizrun/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !self.json && !self.text
    }
}

/// Settings with CLI flags applied on top of file and environment.
pub fn resolve_settings(args: &Cli) -> Result<Settings> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint.as_ref() {
        settings.endpoint = endpoint.clone();
    }
    if let Some(language) = args.language {
        settings.language = language;
    }
    if let Some(dir) = args.save_dir.as_ref() {
        settings.save_dir = dir.clone();
    }
    Ok(settings)
}

/// Code given on the command line. Stdin is only consulted when `allow_stdin` is set,
/// since the TUI needs the terminal for input.
pub fn read_code(args: &Cli, allow_stdin: bool) -> Result<Option<String>> {
    if let Some(path) = args.file.as_ref() {
        let code = std::fs::read_to_string(path)
            .with_context(|| format!("read code from {}", path.display()))?;
        return Ok(Some(code));
    }
    if let Some(code) = args.code.as_ref() {
        return Ok(Some(code.clone()));
    }
    if allow_stdin && !std::io::stdin().is_terminal() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read code from stdin")?;
        return Ok(Some(buf));
    }
    Ok(None)
}

/// Run the selected mode. Returns whether the session ended without a failed submission.
pub async fn run(args: Cli) -> Result<bool> {
    if args.output.is_some() && args.is_interactive() {
        return Err(anyhow::anyhow!(
            "--output only applies to --json or --text runs"
        ));
    }

    let settings = resolve_settings(&args)?;

    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            logging::init(
                LogTarget::File(logging::default_log_file()),
                &settings.log_level,
            )?;
            crate::tui::run(args, settings).await?;
            return Ok(true);
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            logging::init(LogTarget::Stderr, &settings.log_level)?;
            return run_once(args, settings, false).await;
        }
    }

    logging::init(LogTarget::Stderr, &settings.log_level)?;
    let json = args.json;
    run_once(args, settings, json).await
}

/// Submit once and report the settled state.
async fn run_once(args: Cli, settings: Settings, json: bool) -> Result<bool> {
    let code = read_code(&args, true)?.unwrap_or_default();
    let request = ExecutionRequest::new(settings.language, code);
    let backend = HttpBackend::new(settings.endpoint.clone(), &settings.user_agent)?;
    let controller = SubmissionController::new(backend);
    let (out_tx, out_handle) = spawn_output_writer();

    if !json {
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Submitting {} code to {}",
            settings.language.label(),
            settings.endpoint
        )));
    }

    let started = Instant::now();
    let state = controller.submit(request).await;
    let elapsed = started.elapsed();

    let processed = process_outcome(args.output.as_deref(), &state);
    for msg in &processed.messages {
        let _ = out_tx.send(OutputLine::Stderr(msg.clone()));
    }

    if json {
        let out = crate::text_summary::build_json_summary(
            settings.language,
            &state,
            elapsed,
            processed.written_path.as_deref(),
        )?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_text_summary(
            settings.language,
            &state,
            elapsed,
            processed.written_path.as_deref(),
        );
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;

    Ok(matches!(state, RunState::Succeeded(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scripted_flags() {
        let args = Cli::try_parse_from([
            "vizrun",
            "--json",
            "--language",
            "r",
            "--code",
            "plot(1)",
            "--output",
            "out.html",
        ])
        .expect("parse");
        assert!(!args.is_interactive());
        assert_eq!(args.language, Some(Language::R));
        assert_eq!(args.code.as_deref(), Some("plot(1)"));
    }

    #[test]
    fn code_and_file_conflict() {
        let res = Cli::try_parse_from(["vizrun", "--code", "x", "--file", "a.py"]);
        assert!(res.is_err());
    }

    #[test]
    fn json_and_text_conflict() {
        assert!(Cli::try_parse_from(["vizrun", "--json", "--text"]).is_err());
    }

    #[test]
    fn unknown_language_is_rejected() {
        assert!(Cli::try_parse_from(["vizrun", "--language", "julia"]).is_err());
    }

    #[test]
    fn cli_flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = dir.path().join("config.toml");
        std::fs::write(&cfg, "endpoint = \"http://file/run\"\nlanguage = \"r\"\n").expect("write");

        let args = Cli::try_parse_from([
            "vizrun",
            "--config",
            cfg.to_str().expect("utf-8 path"),
            "--endpoint",
            "http://cli/run",
        ])
        .expect("parse");
        let settings = resolve_settings(&args).expect("settings");
        assert_eq!(settings.endpoint, "http://cli/run");
        assert_eq!(settings.language, Language::R);
    }

    #[test]
    fn file_takes_code_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plot.py");
        std::fs::write(&path, "import matplotlib\n").expect("write");
        let args = Cli::try_parse_from(["vizrun", "--file", path.to_str().expect("utf-8 path")])
            .expect("parse");
        assert_eq!(
            read_code(&args, false).expect("read").as_deref(),
            Some("import matplotlib\n")
        );
    }

    #[test]
    fn no_code_without_stdin() {
        let args = Cli::try_parse_from(["vizrun"]).expect("parse");
        assert_eq!(read_code(&args, false).expect("read"), None);
    }

    #[tokio::test]
    async fn output_requires_scripted_mode() {
        let args = Cli::try_parse_from(["vizrun", "--output", "x.png"]).expect("parse");
        assert!(run(args).await.is_err());
    }
}
