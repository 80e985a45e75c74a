use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{PackError, PackResult};
use crate::model::ChipProfile;
use crate::services::composer::{CancelToken, MergeBackend, MergeCommand};
use crate::services::validator::ValidatedLayout;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Merge backend that shells out to a `merge-bin` capable flash tool.
///
/// Success is decided by exit status alone. Stdout is discarded and stderr is
/// captured for the error report.
pub struct ExternalMerger {
    pub tool: PathBuf,
    pub tool_args: Vec<String>,
    pub timeout: Duration,
    pub cancel: CancelToken,
}

impl ExternalMerger {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            tool_args: Vec::new(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_tool_args(mut self, args: Vec<String>) -> Self {
        self.tool_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl MergeBackend for ExternalMerger {
    fn merge(&self, layout: &ValidatedLayout, chip: &ChipProfile, output: &Path) -> PackResult<()> {
        let command = MergeCommand::build(&self.tool, &self.tool_args, chip, output, layout);
        debug!("Command line: {command}");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PackError::MissingMergeTool(command.program.clone())
                } else {
                    PackError::io(&command.program, e)
                }
            })?;

        // Drain stderr on a separate thread so a chatty tool cannot block on a full pipe.
        let stderr = child.stderr.take();
        let reader = thread::spawn(move || {
            let mut captured = Vec::new();
            if let Some(mut stderr) = stderr {
                if let Err(err) = stderr.read_to_end(&mut captured) {
                    debug!("read merge tool stderr: {err}");
                }
            }
            String::from_utf8_lossy(&captured).into_owned()
        });

        // A timeout too large to represent means no deadline.
        let deadline = Instant::now().checked_add(self.timeout);
        let status = loop {
            if let Some(status) = child.try_wait().map_err(|e| PackError::io(&command.program, e))? {
                break status;
            }
            if self.cancel.is_cancelled() {
                terminate(&mut child);
                return Err(PackError::Cancelled);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                terminate(&mut child);
                return Err(PackError::ComposeTimeout { timeout_secs: self.timeout.as_secs() });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let diagnostic = self.collect_diagnostic(reader, deadline)?.trim().to_string();
        if !status.success() {
            warn!("{} failed with {status}", command.program.display());
            return Err(PackError::ComposeExecution { exit_code: status.code(), diagnostic });
        }
        if !diagnostic.is_empty() {
            info!("{}: {diagnostic}", command.program.display());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "external"
    }
}

impl ExternalMerger {
    /// Wait for the stderr reader under the same deadline and cancel token as the tool.
    ///
    /// A process the tool left running in the background can hold stderr open
    /// after the tool itself exited; past the deadline the diagnostic is dropped.
    fn collect_diagnostic(
        &self,
        reader: JoinHandle<String>,
        deadline: Option<Instant>,
    ) -> PackResult<String> {
        while !reader.is_finished() {
            if self.cancel.is_cancelled() {
                return Err(PackError::Cancelled);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!("Merge tool stderr still open after exit; diagnostic dropped");
                return Ok(String::new());
            }
            thread::sleep(POLL_INTERVAL);
        }
        Ok(reader.join().unwrap_or_default())
    }
}

fn terminate(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!("kill merge tool: {err}");
    }
    let _ = child.wait();
}
