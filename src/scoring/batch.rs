//! Batch-scoring subprocess bridge.
//!
//! Scores by shelling out to a command-line batch scorer:
//!
//! ```text
//! workdir/
//! ├── input.csv          ◀── expanded rows written here
//! ├── out.csv            ◀── scorer writes predictions here (--out)
//! ├── scorer.stdout.log
//! └── scorer.stderr.log  ◀── tail quoted in errors
//! ```
//!
//! Invocation (empty credentials are omitted):
//!
//! ```text
//! <command> [extra-args...] -y --host H --user U --api_token T --datarobot_key K
//!           --keep_cols A,B --out workdir/out.csv PROJECT MODEL workdir/input.csv
//! ```
//!
//! The child runs with `workdir` as its current directory so any log files
//! it drops land in the same scoped directory and vanish with it. The
//! request deadline is enforced by polling; on expiry the child is killed.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ScorerConfig;
use crate::dataset::{self, parse_records};
use crate::error::{PdError, PdResult};
use crate::types::{Prediction, TargetKind, Value};

use super::{ScoringPort, ScoringRequest};

const INPUT_FILE: &str = "input.csv";
const OUTPUT_FILE: &str = "out.csv";
const STDOUT_LOG: &str = "scorer.stdout.log";
const STDERR_LOG: &str = "scorer.stderr.log";
const STDERR_TAIL_LINES: usize = 20;

/// [`ScoringPort`] backed by an external batch-scoring command.
#[derive(Debug, Clone)]
pub struct BatchScorer {
    config: ScorerConfig,
    poll_interval: Duration,
}

impl BatchScorer {
    /// Validates that the connection fields the command needs are present.
    pub fn new(config: ScorerConfig) -> PdResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            poll_interval: Duration::from_millis(50),
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Full argument list for one run.
    pub fn command_args(&self, keep_columns: &[String], input: &Path, output: &Path) -> Vec<String> {
        let c = &self.config;
        let mut args = c.extra_args.clone();
        args.push("-y".into());
        args.extend(["--host".into(), c.host.clone()]);
        for (flag, value) in [
            ("--user", &c.user),
            ("--api_token", &c.api_token),
            ("--datarobot_key", &c.api_key),
        ] {
            if !value.is_empty() {
                args.extend([flag.to_string(), value.clone()]);
            }
        }
        if !keep_columns.is_empty() {
            args.extend(["--keep_cols".into(), keep_columns.join(",")]);
        }
        args.extend(["--out".into(), output.display().to_string()]);
        args.extend([
            c.project_id.clone(),
            c.model_id.clone(),
            input.display().to_string(),
        ]);
        args
    }

    /// Command line as it would be printed, with secrets masked.
    fn redacted(&self, args: &[String]) -> String {
        let secrets = [&self.config.api_token, &self.config.api_key];
        let shown: Vec<&str> = args
            .iter()
            .map(|a| {
                if secrets.iter().any(|s| !s.is_empty() && *s == a) {
                    "***"
                } else {
                    a.as_str()
                }
            })
            .collect();
        format!("{} {}", self.config.command, shown.join(" "))
    }

    fn run(&self, request: &ScoringRequest) -> PdResult<PathBuf> {
        let workdir = &request.workdir;
        let input = workdir.join(INPUT_FILE);
        let output = workdir.join(OUTPUT_FILE);

        dataset::write_delimited_path(&request.rows, &input, ',')
            .map_err(|e| PdError::scoring(format!("failed to stage scoring input: {:#}", e)))?;

        let stdout = File::create(workdir.join(STDOUT_LOG))
            .map_err(|e| PdError::scoring(format!("failed to create scorer log: {}", e)))?;
        let stderr = File::create(workdir.join(STDERR_LOG))
            .map_err(|e| PdError::scoring(format!("failed to create scorer log: {}", e)))?;

        let args = self.command_args(&request.keep_columns, &input, &output);
        tracing::debug!(command = %self.redacted(&args), rows = request.rows.len(), "executing batch scorer");

        let start = Instant::now();
        let mut child = Command::new(&self.config.command)
            .args(&args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| {
                PdError::scoring(format!("failed to execute '{}': {}", self.config.command, e))
            })?;

        let status: ExitStatus = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(PdError::scoring(format!("failed to wait for scorer: {}", e)));
                }
            }

            let remaining = request.remaining();
            if remaining == Some(Duration::ZERO) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PdError::Timeout(start.elapsed()));
            }
            thread::sleep(remaining.map_or(self.poll_interval, |r| r.min(self.poll_interval)));
        };

        tracing::debug!(elapsed = ?start.elapsed(), %status, "batch scorer finished");

        if !status.success() {
            return Err(PdError::scoring(format!(
                "'{}' exited with {}: {}",
                self.config.command,
                status,
                stderr_tail(&workdir.join(STDERR_LOG))
            )));
        }

        Ok(output)
    }

    /// Pull the column matching `kind` out of the scorer's output file.
    pub fn read_predictions(&self, path: &Path, kind: TargetKind) -> PdResult<Vec<Prediction>> {
        let bytes = fs::read(path).map_err(|e| {
            PdError::scoring(format!("scorer produced no output at {}: {}", path.display(), e))
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let mut records = parse_records(&text, ',')
            .map_err(|e| PdError::scoring(format!("unreadable scorer output: {:#}", e)))?
            .into_iter();

        let header = records
            .next()
            .ok_or_else(|| PdError::scoring("scorer output is empty"))?;
        let wanted = match kind {
            TargetKind::Binary => &self.config.positive_column,
            TargetKind::Regression => &self.config.prediction_column,
        };
        let column = header
            .iter()
            .position(|h| h.trim() == wanted)
            .ok_or_else(|| {
                PdError::scoring(format!(
                    "scorer output has no '{}' column (columns: {})",
                    wanted,
                    header.join(", ")
                ))
            })?;

        records
            .enumerate()
            .map(|(idx, record)| {
                let cell = record.get(column).ok_or_else(|| {
                    PdError::scoring(format!("scorer output row {} is truncated", idx + 1))
                })?;
                let raw = match Value::parse_cell(cell) {
                    Value::Number(n) => n,
                    Value::Missing => f64::NAN,
                    Value::Text(text) => {
                        return Err(PdError::scoring(format!(
                            "scorer output row {} has non-numeric prediction '{}'",
                            idx + 1,
                            text
                        )));
                    }
                };
                Ok(Prediction::for_kind(kind, raw))
            })
            .collect()
    }
}

impl ScoringPort for BatchScorer {
    fn score(&self, request: &ScoringRequest) -> PdResult<Vec<Prediction>> {
        let output = self.run(request)?;
        self.read_predictions(&output, request.target.kind)
    }

    fn describe(&self) -> String {
        format!("batch scorer '{}'", self.config.command)
    }
}

fn stderr_tail(path: &Path) -> String {
    let Ok(content) = fs::read_to_string(path) else {
        return "(no stderr captured)".to_string();
    };
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.trim().is_empty() {
        "(stderr empty)".to_string()
    } else {
        tail
    }
}
