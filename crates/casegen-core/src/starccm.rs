//! Process-backed builder for STAR-CCM+ batch runs.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::builder::{BuildOutput, BuildRequest, CaseBuilder};
use crate::config::BuilderSettings;
use crate::error::BuildError;

pub const DEFAULT_PROGRAM: &str = "starccm+";
/// Power-session licence flag.
pub const DEFAULT_EXTRA_ARGS: [&str; 1] = ["-power"];
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Bytes of the build log attached to a failed outcome.
const LOG_TAIL_BYTES: u64 = 2048;

/// Runs `<program> -np <hint> <extra args...> -batch <macro> <sim>` inside the
/// case directory, appending its console output to the case log.
#[derive(Debug, Clone)]
pub struct StarCcmBuilder {
    program: String,
    extra_args: Vec<String>,
    poll_interval: Duration,
}

impl Default for StarCcmBuilder {
    fn default() -> Self {
        Self::from_settings(&BuilderSettings::default())
    }
}

impl StarCcmBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_settings(settings: &BuilderSettings) -> Self {
        Self::new(settings.program.clone()).with_extra_args(settings.extra_args.clone())
    }

    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for one case. Inputs are named relative to the case
    /// directory, which is the child's working directory.
    pub fn arguments(&self, request: &BuildRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-np".into(), request.parallelism_hint.to_string().into()];
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push("-batch".into());
        args.push(file_name(&request.inputs.macro_file));
        args.push(file_name(&request.inputs.sim_file));
        args
    }

    fn wait(&self, child: &mut Child, request: &BuildRequest<'_>) -> Result<ExitStatus, BuildError> {
        let started = Instant::now();
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|source| BuildError::io(request.case_dir, source))?
            {
                return Ok(status);
            }
            if request.cancel.is_cancelled() {
                stop(child);
                return Err(BuildError::Cancelled);
            }
            if let Some(timeout) = request.timeout {
                if started.elapsed() >= timeout {
                    stop(child);
                    return Err(BuildError::TimedOut { timeout });
                }
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl CaseBuilder for StarCcmBuilder {
    fn name(&self) -> &str {
        &self.program
    }

    fn build(&self, request: &BuildRequest<'_>) -> Result<BuildOutput, BuildError> {
        if request.cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(request.log_path)
            .map_err(|source| BuildError::io(request.log_path, source))?;
        let stderr = log
            .try_clone()
            .map_err(|source| BuildError::io(request.log_path, source))?;

        let args = self.arguments(request);
        debug!(program = %self.program, ?args, cwd = %request.case_dir.display(), "launching builder");
        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(request.case_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|source| BuildError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let status = self.wait(&mut child, request)?;
        if !status.success() {
            return Err(BuildError::Failed {
                status: status.to_string(),
                diagnostic: log_tail(request.log_path),
            });
        }

        remove_backup(&request.inputs.sim_file);
        Ok(BuildOutput {
            exit_code: status.code(),
            log_path: Some(request.log_path.to_path_buf()),
        })
    }
}

fn file_name(path: &Path) -> OsString {
    path.file_name()
        .map_or_else(|| path.as_os_str().to_os_string(), ToOwned::to_owned)
}

fn stop(child: &mut Child) {
    if let Err(error) = child.kill() {
        warn!(%error, "failed to kill builder process");
    }
    let _ = child.wait();
}

/// The builder leaves `<case>.sim~` next to the saved simulation.
fn remove_backup(sim_file: &Path) {
    let mut backup = sim_file.as_os_str().to_os_string();
    backup.push("~");
    match std::fs::remove_file(&backup) {
        Ok(()) => debug!(path = ?backup, "removed simulation backup"),
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => warn!(path = ?backup, %error, "failed to remove simulation backup"),
    }
}

fn log_tail(path: &Path) -> Option<String> {
    let mut file = std::fs::File::open(path).ok()?;
    let len = file.metadata().ok()?.len();
    file.seek(SeekFrom::Start(len.saturating_sub(LOG_TAIL_BYTES)))
        .ok()?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).ok()?;
    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}
