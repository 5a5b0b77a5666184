//! The external catalog authority.
//!
//! The authority is an emulator-side introspection tool. It reports its own
//! version, streams the full machine listing, describes one machine, and
//! verifies whether a machine's content set is present on this system.

use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use marquee_shared::Machine;
use tracing::{debug, warn};

use super::listing::parse_machine;
use crate::error::SyncError;

/// Counts reported by a full listing stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub machines: usize,
    pub malformed: usize,
}

/// Capability interface over the catalog authority.
pub trait Authority {
    /// Version string; namespaces the machine cache.
    fn version(&self) -> Result<String, SyncError>;

    /// Streams every machine into `sink`, in listing order.
    ///
    /// Malformed entries are skipped and counted. An error returned by
    /// `sink` aborts the stream and is propagated.
    fn stream_all(
        &self,
        sink: &mut dyn FnMut(Machine) -> Result<(), SyncError>,
    ) -> Result<StreamStats, SyncError>;

    /// Definition of a single machine, or `NotFound`.
    fn describe(&self, basename: &str) -> Result<Machine, SyncError>;

    /// Whether the machine's content set is present and valid.
    fn verify(&self, basename: &str) -> Result<bool, SyncError>;
}

/// Authority backed by an external executable.
#[derive(Debug, Clone)]
pub struct ProcessAuthority {
    program: PathBuf,
    base_args: Vec<OsString>,
}

impl ProcessAuthority {
    /// Locate `executable` (a bare name searched in `PATH`, or a path).
    pub fn locate(executable: &str) -> Result<Self, SyncError> {
        let program = which::which(executable).map_err(|e| {
            SyncError::ToolUnavailable(format!("'{}' not found: {}", executable, e))
        })?;
        Ok(Self::with_program(program))
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    /// Arguments placed before every command (for wrapper scripts).
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args);
        cmd
    }

    fn unavailable(&self, what: &str, detail: impl std::fmt::Display) -> SyncError {
        SyncError::ToolUnavailable(format!(
            "{} {} failed: {}",
            self.program.display(),
            what,
            detail
        ))
    }
}

impl Authority for ProcessAuthority {
    fn version(&self) -> Result<String, SyncError> {
        let output = self
            .command()
            .arg("-version")
            .stderr(Stdio::null())
            .output()
            .map_err(|e| self.unavailable("-version", e))?;
        if !output.status.success() {
            return Err(self.unavailable("-version", output.status));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| self.unavailable("-version", "empty version string"))
    }

    fn stream_all(
        &self,
        sink: &mut dyn FnMut(Machine) -> Result<(), SyncError>,
    ) -> Result<StreamStats, SyncError> {
        let mut child = self
            .command()
            .arg("-listjson")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.unavailable("-listjson", e))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(self.unavailable("-listjson", "no stdout pipe"));
        };

        let mut stats = StreamStats::default();
        for (line_no, line) in BufReader::new(stdout).lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.unavailable("-listjson", e));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_machine(&line) {
                Ok(machine) => {
                    if let Err(e) = sink(machine) {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(e);
                    }
                    stats.machines += 1;
                }
                Err(e) => {
                    let err = SyncError::CatalogParse {
                        origin: format!("listing line {}", line_no + 1),
                        message: e.to_string(),
                    };
                    warn!("Skipping catalog entry: {}", err);
                    stats.malformed += 1;
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| self.unavailable("-listjson", e))?;
        if !status.success() {
            return Err(self.unavailable("-listjson", status));
        }
        debug!(
            machines = stats.machines,
            malformed = stats.malformed,
            "Catalog listing streamed"
        );
        Ok(stats)
    }

    fn describe(&self, basename: &str) -> Result<Machine, SyncError> {
        let output = self
            .command()
            .args(["-listjson", basename])
            .stderr(Stdio::null())
            .output()
            .map_err(|e| self.unavailable("-listjson <machine>", e))?;
        if !output.status.success() {
            return Err(SyncError::not_found("machine", basename));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some(line) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return Err(SyncError::not_found("machine", basename));
        };
        let machine = parse_machine(line).map_err(|e| SyncError::CatalogParse {
            origin: format!("definition of '{}'", basename),
            message: e.to_string(),
        })?;
        if machine.basename != basename {
            return Err(SyncError::not_found("machine", basename));
        }
        Ok(machine)
    }

    fn verify(&self, basename: &str) -> Result<bool, SyncError> {
        let status = self
            .command()
            .args(["-verifyroms", basename])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| self.unavailable("-verifyroms", e))?;
        Ok(status.success())
    }
}
