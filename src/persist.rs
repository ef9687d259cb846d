//! Durable region records and the persistence seam.
//!
//! The registry flushes the full record set through a [`RegionSink`] after
//! every mutation, so in-memory and durable state never diverge by more
//! than one operation. Hosts with their own storage implement the trait;
//! [`JsonFileStore`] covers the common file-backed case.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{BoundingBox, Point};
use crate::region::Region;

/// On-disk shape of a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub name: String,
    pub corner_a: Point,
    pub corner_b: Point,
    pub domain: String,
    pub permission: String,
    pub message: String,
}

impl From<&Region> for RegionRecord {
    fn from(region: &Region) -> Self {
        Self {
            name: region.name.clone(),
            corner_a: region.bounds.corner_a,
            corner_b: region.bounds.corner_b,
            domain: region.domain.clone(),
            permission: region.permission.clone(),
            message: region.entry_message.clone(),
        }
    }
}

impl RegionRecord {
    pub fn into_region(self) -> Region {
        Region::new(
            self.name,
            BoundingBox::new(self.corner_a, self.corner_b),
            self.domain,
            self.permission,
            self.message,
        )
    }
}

/// Receives the full region set after every registry mutation.
pub trait RegionSink: Send + Sync {
    fn persist(&self, records: &[RegionRecord]) -> Result<()>;
}

/// Default sink for hosts that wire persistence elsewhere.
#[derive(Debug, Default)]
pub struct NullRegionSink;

impl RegionSink for NullRegionSink {
    fn persist(&self, _records: &[RegionRecord]) -> Result<()> {
        Ok(())
    }
}

/// Captures every flush, for assertions in tests.
#[derive(Default)]
pub struct MemoryRegionSink {
    flushes: Mutex<Vec<Vec<RegionRecord>>>,
}

impl MemoryRegionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.lock().expect("sink mutex poisoned").len()
    }

    pub fn last_flush(&self) -> Option<Vec<RegionRecord>> {
        self.flushes
            .lock()
            .expect("sink mutex poisoned")
            .last()
            .cloned()
    }
}

impl RegionSink for MemoryRegionSink {
    fn persist(&self, records: &[RegionRecord]) -> Result<()> {
        self.flushes
            .lock()
            .expect("sink mutex poisoned")
            .push(records.to_vec());
        Ok(())
    }
}

/// File-backed store writing the record set as pretty JSON.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the record set back; a missing file is an empty set, not an
    /// error, so first startup needs no special casing.
    pub fn load(&self) -> Result<Vec<RegionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)?;
        let records = serde_json::from_reader(file)?;
        Ok(records)
    }
}

impl RegionSink for JsonFileStore {
    fn persist(&self, records: &[RegionRecord]) -> Result<()> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, records)?;
        Ok(())
    }
}
