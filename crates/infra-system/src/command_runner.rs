// Subprocess runner with a wall-clock timeout
use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use batchprint_core::port::BackendError;

use crate::constants::GRACEFUL_KILL_TIMEOUT_MS;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("cannot start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("IO error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<CommandError> for BackendError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Timeout { secs, .. } => BackendError::Timeout(secs),
            CommandError::Spawn { .. } => BackendError::Failed(err.to_string()),
            CommandError::Io { .. } => BackendError::Io(err.to_string()),
        }
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Best human-readable explanation of a failed run
    pub fn failure_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.status.code() {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by a signal".to_string(),
        }
    }
}

/// Runs external programs, killing them when they overrun `timeout`
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program` with `args` to completion
    ///
    /// # Errors
    /// Spawn failure, timeout, or an IO error while waiting. A non-zero exit
    /// status is NOT an error; check `CommandOutput::success`.
    pub async fn run<I, S>(&self, program: &OsStr, args: I) -> Result<CommandOutput, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let name = program.to_string_lossy().into_owned();
        let args: Vec<S> = args.into_iter().collect();
        debug!(
            program = %name,
            args = ?args.iter().map(|a| a.as_ref().to_string_lossy().into_owned()).collect::<Vec<_>>(),
            "Running command"
        );

        let deadline = Instant::now() + self.timeout;
        let mut command = Command::new(program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so helpers the program forks can be stopped too
        #[cfg(unix)]
        {
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| CommandError::Spawn {
            program: name.clone(),
            source,
        })?;
        let pid = child.id();

        // Drain pipes concurrently so a chatty child cannot block on a full pipe
        let mut stdout = tokio::spawn(read_all(child.stdout.take()));
        let mut stderr = tokio::spawn(read_all(child.stderr.take()));

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(source)) => {
                stdout.abort();
                stderr.abort();
                return Err(CommandError::Io {
                    program: name,
                    source,
                });
            }
            Err(_) => {
                warn!(program = %name, timeout_ms = self.timeout.as_millis() as u64, "Command timed out");
                terminate(&mut child, &name).await;
                stdout.abort();
                stderr.abort();
                return Err(self.timed_out(name));
            }
        };

        // A background helper may still hold the pipes open after the
        // program itself exited; the deadline covers that as well
        let drained = timeout_at(deadline, async {
            let out = (&mut stdout).await.unwrap_or_default();
            let err = (&mut stderr).await.unwrap_or_default();
            (out, err)
        })
        .await;
        let (out, err) = match drained {
            Ok(pipes) => pipes,
            Err(_) => {
                warn!(program = %name, "Command output still open at the deadline");
                kill_group(pid, &name);
                stdout.abort();
                stderr.abort();
                return Err(self.timed_out(name));
            }
        };

        let output = CommandOutput {
            status,
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
        };
        info!(program = %name, exit_code = ?status.code(), "Command finished");
        Ok(output)
    }

    fn timed_out(&self, program: String) -> CommandError {
        CommandError::Timeout {
            program,
            secs: whole_secs(self.timeout),
        }
    }
}

/// Seconds for messages, rounded up so short limits never read as 0s
fn whole_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        // Partial output is still useful for error text
        let _ = reader.read_to_end(&mut buf).await;
    }
    buf
}

/// SIGTERM first, then SIGKILL if the child ignores it
async fn terminate(child: &mut Child, name: &str) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            info!(program = %name, pid = pid, "Sending SIGTERM");
            if killpg(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                let grace = Duration::from_millis(GRACEFUL_KILL_TIMEOUT_MS);
                if timeout(grace, child.wait()).await.is_ok() {
                    info!(program = %name, pid = pid, "Process exited after SIGTERM");
                    kill_group(Some(pid), name);
                    return;
                }
                warn!(program = %name, pid = pid, "Process ignored SIGTERM, sending SIGKILL");
            }
        }
    }

    let pid = child.id();
    if let Err(e) = child.kill().await {
        warn!(program = %name, error = %e, "Failed to kill process");
    }
    kill_group(pid, name);
}

/// SIGKILL whatever is left of the program's process group
fn kill_group(pid: Option<u32>, name: &str) {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = pid {
            match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => warn!(program = %name, pid = pid, error = %e, "Failed to kill process group"),
            }
        }
    }
    #[cfg(not(unix))]
    let _ = (pid, name);
}
