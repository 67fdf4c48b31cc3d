//! Orchestration of a single memcheck run.
//!
//! `ValidatingTarget -> LocatingTool -> Instrumenting -> Parsing ->
//! Classifying -> Reporting`. A failure before `Instrumenting` is a setup
//! error; nothing is retried.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::classify::Classifier;
use super::config::TriageConfig;
use crate::error::{MemtriageError, Result};
use crate::report::{self, BackTrace};

/// Exit status for a clean run.
pub const EXIT_PASS: i32 = 0;
/// Exit status for reportable leaks and every fatal condition.
pub const EXIT_FAILURE: i32 = -1;

/// Printed after each reported backtrace.
pub const DIVIDER: &str = "---------------------------------------------------";

/// Search path used when `PATH` is unset or empty.
pub const DEFAULT_SEARCH_PATH: &str = "/bin:/usr/bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ValidatingTarget,
    LocatingTool,
    Instrumenting,
    Parsing,
    Classifying,
    Reporting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ValidatingTarget => "validating-target",
            Phase::LocatingTool => "locating-tool",
            Phase::Instrumenting => "instrumenting",
            Phase::Parsing => "parsing",
            Phase::Classifying => "classifying",
            Phase::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Reportable backtraces in report order; never empty.
    Fail(Vec<BackTrace>),
}

impl Verdict {
    fn from_reportable(traces: Vec<BackTrace>) -> Self {
        if traces.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail(traces)
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => EXIT_PASS,
            Verdict::Fail(_) => EXIT_FAILURE,
        }
    }

    /// Operator-facing report text with frame names as reported.
    pub fn render(&self) -> String {
        self.render_with(false)
    }

    /// Operator-facing report text; mangled frame names are demangled when
    /// `demangle` is set.
    pub fn render_with(&self, demangle: bool) -> String {
        match self {
            Verdict::Pass => "PASS\n".to_string(),
            Verdict::Fail(traces) => {
                let mut out = String::new();
                for bt in traces {
                    out.push_str(&bt.render(demangle));
                    out.push_str(DIVIDER);
                    out.push('\n');
                }
                out
            }
        }
    }
}

/// True for an existing regular file with an execute bit set.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    meta.is_file() && has_execute_bit(&meta)
}

#[cfg(unix)]
fn has_execute_bit(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_bit(_meta: &std::fs::Metadata) -> bool {
    true
}

/// Locate an executable by name on a `PATH`-style search path.
///
/// Names containing a path separator are checked directly.
pub fn find_in_path(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if name.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(name);
        return is_executable(&p).then_some(p);
    }
    let search_path = match search_path {
        Some(p) if !p.is_empty() => p,
        _ => OsStr::new(DEFAULT_SEARCH_PATH),
    };
    std::env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Runs memcheck against one executable and decides pass/fail.
#[derive(Debug, Clone)]
pub struct Runner {
    config: TriageConfig,
    classifier: Classifier,
    search_path: Option<OsString>,
}

impl Runner {
    pub fn new(config: TriageConfig) -> Result<Self> {
        let classifier = Classifier::new(&config.markers)?;
        Ok(Self {
            config,
            classifier,
            search_path: None,
        })
    }

    /// Look the tool up here instead of in `PATH`.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn validate_target(&self, executable: &Path) -> Result<()> {
        debug!(phase = %Phase::ValidatingTarget, target_exe = %executable.display());
        if is_executable(executable) {
            Ok(())
        } else {
            Err(MemtriageError::ExecutableNotFound {
                path: executable.to_path_buf(),
            })
        }
    }

    pub fn locate_tool(&self) -> Result<PathBuf> {
        debug!(phase = %Phase::LocatingTool, tool = %self.config.memcheck.tool);
        let env_path = std::env::var_os("PATH");
        let search_path = self.search_path.as_deref().or(env_path.as_deref());
        find_in_path(&self.config.memcheck.tool, search_path).ok_or_else(|| {
            MemtriageError::ToolNotFound {
                tool: self.config.memcheck.tool.clone(),
            }
        })
    }

    /// Run the tool and return the raw XML it wrote to the side channel.
    ///
    /// The temporary artifact is removed when this returns, on every path.
    pub fn instrument(&self, tool: &Path, executable: &Path) -> Result<String> {
        debug!(phase = %Phase::Instrumenting, tool = %tool.display());
        let artifact = tempfile::Builder::new()
            .prefix("memcheck")
            .suffix(".xml")
            .tempfile()?;

        let mut cmd = Command::new(tool);
        cmd.args(self.config.memcheck.args()).arg(executable);
        bind_side_channel(&mut cmd, &artifact, self.config.memcheck.xml_fd);

        let status = cmd
            .status()
            .map_err(|e| MemtriageError::Instrumentation(format!("{}: {}", tool.display(), e)))?;
        if !status.success() {
            warn!(%status, "Instrumented run exited unsuccessfully");
        }

        let bytes = std::fs::read(artifact.path())?;
        debug!(bytes = bytes.len(), artifact = %artifact.path().display(), "Captured report");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Render a verdict the way this runner's marker configuration asks.
    pub fn render(&self, verdict: &Verdict) -> String {
        verdict.render_with(self.config.markers.demangle)
    }

    /// Noise filter, parse and classify a captured report.
    pub fn triage_report(&self, raw: &str) -> Result<Verdict> {
        debug!(phase = %Phase::Parsing);
        let cleaned = report::strip_noise(raw, &self.config.noise);
        let traces = report::parse_report(&cleaned)?;

        debug!(phase = %Phase::Classifying, records = traces.len());
        let retained = self.classifier.filter_reportable(traces);

        debug!(phase = %Phase::Reporting, reportable = retained.len());
        Ok(Verdict::from_reportable(retained))
    }

    /// Full pipeline for one executable. Progress lines go to `out`.
    pub fn run_single_test<W: Write>(&self, executable: &Path, out: &mut W) -> Result<Verdict> {
        let span = crate::span_trace!("run_single_test", target_exe = %executable.display());
        let _guard = span.enter();

        self.validate_target(executable)?;
        let tool = self.locate_tool()?;

        writeln!(
            out,
            ">> running {} memcheck on {}",
            self.config.memcheck.tool,
            executable.display()
        )?;
        out.flush()?;

        let raw = self.instrument(&tool, executable)?;
        let verdict = self.triage_report(&raw)?;
        info!(pass = verdict.is_pass(), "Triage finished");
        Ok(verdict)
    }
}

#[cfg(unix)]
fn bind_side_channel(cmd: &mut Command, artifact: &NamedTempFile, target_fd: i32) {
    use std::os::fd::AsRawFd;
    use std::os::unix::process::CommandExt;

    let src = artifact.as_file().as_raw_fd();
    // SAFETY: only async-signal-safe calls (dup2, fcntl) run between fork and exec.
    unsafe {
        cmd.pre_exec(move || dup_without_cloexec(src, target_fd));
    }
}

#[cfg(not(unix))]
fn bind_side_channel(_cmd: &mut Command, _artifact: &NamedTempFile, _target_fd: i32) {
    warn!("File descriptor side channels are only supported on unix");
}

#[cfg(unix)]
fn dup_without_cloexec(src: libc::c_int, dst: libc::c_int) -> std::io::Result<()> {
    if src == dst {
        // dup2 is a no-op here; clear FD_CLOEXEC so the fd survives exec
        unsafe {
            let flags = libc::fcntl(src, libc::F_GETFD);
            if flags < 0 || libc::fcntl(src, libc::F_SETFD, flags & !libc::FD_CLOEXEC) < 0 {
                return Err(std::io::Error::last_os_error());
            }
        }
        return Ok(());
    }
    if unsafe { libc::dup2(src, dst) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
