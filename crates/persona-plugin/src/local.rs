//! In-process host adapters.

use sysinfo::System;
use tracing::debug;

use persona_core::{HostAdapterSet, Result};

/// Host adapters backed by the local filesystem and OS counters.
///
/// No path validation is done: plugins get whatever the process can reach.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAdapterSet;

impl LocalAdapterSet {
    pub fn new() -> Self {
        Self
    }

    fn memory() -> System {
        let mut sys = System::new();
        sys.refresh_memory();
        sys
    }
}

impl HostAdapterSet for LocalAdapterSet {
    fn name(&self) -> &'static str {
        "local"
    }

    fn read_file(&self, path: &str) -> Result<String> {
        debug!(path, "read_file");
        Ok(std::fs::read_to_string(path)?)
    }

    fn write_file(&self, path: &str, content: &str) -> Result<()> {
        debug!(path, bytes = content.len(), "write_file");
        std::fs::write(path, content)?;
        Ok(())
    }

    fn get_cpu_load(&self) -> Result<[f64; 3]> {
        let load = System::load_average();
        Ok([load.one, load.five, load.fifteen])
    }

    fn get_free_memory(&self) -> Result<u64> {
        // Available (free + reclaimable) memory, what `free` reports as available.
        Ok(Self::memory().available_memory())
    }

    fn get_total_memory(&self) -> Result<u64> {
        Ok(Self::memory().total_memory())
    }
}
