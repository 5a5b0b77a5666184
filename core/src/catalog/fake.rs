//! In-memory authority for tests.

use std::cell::Cell;
use std::rc::Rc;

use hashbrown::HashSet;
use marquee_shared::Machine;

use super::authority::{Authority, StreamStats};
use crate::error::SyncError;

#[derive(Debug, Default)]
pub struct CallCounts {
    streams: Cell<usize>,
    describes: Cell<usize>,
    verifies: Cell<usize>,
}

impl CallCounts {
    pub fn streams(&self) -> usize {
        self.streams.get()
    }

    pub fn describes(&self) -> usize {
        self.describes.get()
    }

    pub fn verifies(&self) -> usize {
        self.verifies.get()
    }
}

pub struct FakeAuthority {
    version: Option<String>,
    machines: Vec<Machine>,
    verified: Option<HashSet<String>>,
    fail_after: Option<usize>,
    calls: Rc<CallCounts>,
}

impl FakeAuthority {
    pub fn new(version: &str, machines: Vec<Machine>) -> Self {
        Self {
            version: Some(version.to_string()),
            machines,
            verified: None,
            fail_after: None,
            calls: Rc::new(CallCounts::default()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            version: None,
            ..Self::new("", Vec::new())
        }
    }

    /// Only these machines verify; everything verifies by default.
    pub fn with_verified(mut self, basenames: &[&str]) -> Self {
        self.verified = Some(basenames.iter().map(|b| b.to_string()).collect());
        self
    }

    /// Streams `n` machines, then fails as if the process died.
    pub fn failing_stream_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn calls(&self) -> Rc<CallCounts> {
        Rc::clone(&self.calls)
    }
}

impl Authority for FakeAuthority {
    fn version(&self) -> Result<String, SyncError> {
        self.version
            .clone()
            .ok_or_else(|| SyncError::ToolUnavailable("fake authority disabled".to_string()))
    }

    fn stream_all(
        &self,
        sink: &mut dyn FnMut(Machine) -> Result<(), SyncError>,
    ) -> Result<StreamStats, SyncError> {
        self.calls.streams.set(self.calls.streams.get() + 1);
        let mut stats = StreamStats::default();
        for machine in &self.machines {
            if self.fail_after == Some(stats.machines) {
                return Err(SyncError::ToolUnavailable("fake stream died".to_string()));
            }
            sink(machine.clone())?;
            stats.machines += 1;
        }
        Ok(stats)
    }

    fn describe(&self, basename: &str) -> Result<Machine, SyncError> {
        self.calls.describes.set(self.calls.describes.get() + 1);
        self.machines
            .iter()
            .find(|m| m.basename == basename)
            .cloned()
            .ok_or_else(|| SyncError::not_found("machine", basename))
    }

    fn verify(&self, basename: &str) -> Result<bool, SyncError> {
        self.calls.verifies.set(self.calls.verifies.get() + 1);
        Ok(self
            .verified
            .as_ref()
            .is_none_or(|set| set.contains(basename)))
    }
}
