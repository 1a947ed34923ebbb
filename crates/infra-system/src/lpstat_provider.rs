// Default printer lookup via `lpstat -d`
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use batchprint_core::port::PrinterProvider;

use crate::constants::{DEFAULT_LPSTAT_PROGRAM, QUERY_TIMEOUT_SECS};

const DESTINATION_PREFIX: &str = "system default destination:";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct LpstatPrinterProvider {
    program: PathBuf,
    timeout: Duration,
}

impl Default for LpstatPrinterProvider {
    fn default() -> Self {
        Self::new(DEFAULT_LPSTAT_PROGRAM)
    }
}

impl LpstatPrinterProvider {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(QUERY_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// stdout of `lpstat -d`, or `None` on any failure including a hang
    fn query(&self) -> Option<String> {
        let mut child = Command::new(&self.program)
            .arg("-d")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| warn!(error = %e, "Could not run lpstat"))
            .ok()?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!(timeout_ms = self.timeout.as_millis() as u64, "lpstat did not answer in time");
                    stop(&mut child);
                    return None;
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    warn!(error = %e, "Could not wait for lpstat");
                    stop(&mut child);
                    return None;
                }
            }
        };

        if !status.success() {
            warn!(exit_code = ?status.code(), "lpstat reported no default printer");
            return None;
        }

        let mut stdout = String::new();
        child.stdout.take()?.read_to_string(&mut stdout).ok()?;
        Some(stdout)
    }
}

fn stop(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl PrinterProvider for LpstatPrinterProvider {
    fn default_printer_name(&self) -> String {
        let name = self
            .query()
            .map(|stdout| parse_default_destination(&stdout))
            .unwrap_or_default();
        debug!(printer = %name, "Default printer resolved");
        name
    }
}

/// Printer name from `lpstat -d` output; empty when there is none
pub fn parse_default_destination(stdout: &str) -> String {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix(DESTINATION_PREFIX))
        .map(|name| name.trim().to_string())
        .unwrap_or_default()
}
