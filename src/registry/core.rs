use std::sync::Arc;

use blake3::Hash;
use indexmap::IndexMap;
use serde_json::json;

use crate::error::{Result, WardenError};
use crate::geometry::Point;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::persist::{NullRegionSink, RegionRecord, RegionSink};
use crate::region::{Region, entry_permission, normalize_name};

/// Which of the two captured corners a bounds update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    A,
    B,
}

/// Host collaborator answering whether a domain (world/map) is loaded.
/// Regions referencing an unloaded domain are skipped, never errors.
pub trait DomainDirectory: Send + Sync {
    fn is_domain_loaded(&self, domain: &str) -> bool;
}

/// Listing row for the host's `list` surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSummary {
    pub name: String,
    pub domain: String,
    pub permission: String,
}

/// Insertion-ordered store of named regions.
///
/// Every mutation flushes the full record set to the persistence sink so
/// in-memory and durable state never diverge by more than one operation.
/// The serialized set is content-hashed first; an unchanged set skips the
/// sink call.
pub struct AreaRegistry {
    entries: IndexMap<String, Region>,
    sink: Arc<dyn RegionSink>,
    flushed_hash: Option<Hash>,
}

impl Default for AreaRegistry {
    fn default() -> Self {
        Self::new(Arc::new(NullRegionSink))
    }
}

impl AreaRegistry {
    pub fn new(sink: Arc<dyn RegionSink>) -> Self {
        Self {
            entries: IndexMap::new(),
            sink,
            flushed_hash: None,
        }
    }

    /// Seed the registry from durable records. Records whose domain is not
    /// currently loaded, and duplicates after name normalization, are
    /// skipped with a warning. Returns the number of regions loaded.
    pub fn load(
        &mut self,
        records: Vec<RegionRecord>,
        domains: &dyn DomainDirectory,
        logger: Option<&Logger>,
    ) -> usize {
        let mut loaded = 0;
        for record in records {
            let region = record.into_region();
            if !domains.is_domain_loaded(&region.domain) {
                warn_skip(logger, &region.name, "domain_not_loaded", &region.domain);
                continue;
            }
            if self.entries.contains_key(&region.name) {
                warn_skip(logger, &region.name, "duplicate_name", &region.domain);
                continue;
            }
            self.entries.insert(region.name.clone(), region);
            loaded += 1;
        }
        // Loaded state is the durable state; remember its hash so the next
        // no-op mutation does not rewrite it.
        self.flushed_hash = self.content_hash().ok();
        loaded
    }

    pub fn create(&mut self, region: Region) -> Result<()> {
        if self.entries.contains_key(&region.name) {
            return Err(WardenError::AlreadyExists(region.name));
        }
        self.entries.insert(region.name.clone(), region);
        self.flush()
    }

    /// Move a region under a new name, keeping its listing position.
    ///
    /// The permission key is always regenerated as
    /// `<namespace>.entry.<new_name>`; a custom permission string assigned
    /// to the region does not survive a rename.
    pub fn rename(&mut self, old: &str, new: &str, namespace: &str) -> Result<()> {
        let old_key = normalize_name(old);
        let new_key = normalize_name(new);
        if new_key == old_key {
            return Ok(());
        }
        let index = self
            .entries
            .get_index_of(&old_key)
            .ok_or_else(|| WardenError::NotFound(old_key.clone()))?;
        if self.entries.contains_key(&new_key) {
            return Err(WardenError::AlreadyExists(new_key));
        }
        let (_, mut region) = self
            .entries
            .shift_remove_index(index)
            .expect("index fetched above");
        region.name = new_key.clone();
        region.permission = entry_permission(namespace, &new_key);
        self.entries.shift_insert(index, new_key, region);
        self.flush()
    }

    pub fn set_corner(&mut self, name: &str, corner: Corner, point: Point) -> Result<()> {
        let region = self.get_mut(name)?;
        match corner {
            Corner::A => region.bounds.corner_a = point,
            Corner::B => region.bounds.corner_b = point,
        }
        self.flush()
    }

    pub fn set_message(&mut self, name: &str, text: impl Into<String>) -> Result<()> {
        self.get_mut(name)?.entry_message = text.into();
        self.flush()
    }

    pub fn remove(&mut self, name: &str) -> Result<Region> {
        let key = normalize_name(name);
        let region = self
            .entries
            .shift_remove(&key)
            .ok_or(WardenError::NotFound(key))?;
        self.flush()?;
        Ok(region)
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.entries.get(&normalize_name(name))
    }

    /// Regions in insertion order. Evaluation and listing both follow this
    /// order, so denial precedence is stable.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summaries(&self) -> Vec<RegionSummary> {
        self.entries
            .values()
            .map(|r| RegionSummary {
                name: r.name.clone(),
                domain: r.domain.clone(),
                permission: r.permission.clone(),
            })
            .collect()
    }

    pub fn records(&self) -> Vec<RegionRecord> {
        self.entries.values().map(RegionRecord::from).collect()
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Region> {
        let key = normalize_name(name);
        self.entries
            .get_mut(&key)
            .ok_or(WardenError::NotFound(key))
    }

    fn content_hash(&self) -> Result<Hash> {
        let bytes = serde_json::to_vec(&self.records())?;
        Ok(blake3::hash(&bytes))
    }

    fn flush(&mut self) -> Result<()> {
        let records = self.records();
        let hash = blake3::hash(&serde_json::to_vec(&records)?);
        if self.flushed_hash.map(|h| h == hash).unwrap_or(false) {
            return Ok(());
        }
        self.sink.persist(&records)?;
        self.flushed_hash = Some(hash);
        Ok(())
    }
}

fn warn_skip(logger: Option<&Logger>, region: &str, reason: &str, domain: &str) {
    if let Some(logger) = logger {
        let event = event_with_fields(
            LogLevel::Warn,
            "warden::registry",
            "region_skipped",
            [
                json_kv("region", json!(region)),
                json_kv("reason", json!(reason)),
                json_kv("domain", json!(domain)),
            ],
        );
        let _ = logger.log_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Point};
    use crate::logging::MemorySink;
    use crate::persist::MemoryRegionSink;

    struct Loaded(&'static [&'static str]);

    impl DomainDirectory for Loaded {
        fn is_domain_loaded(&self, domain: &str) -> bool {
            self.0.contains(&domain)
        }
    }

    fn region(name: &str) -> Region {
        Region::new(
            name,
            BoundingBox::new(Point::new(0.0, 0.0, 0.0), Point::new(10.0, 5.0, 10.0)),
            "world",
            entry_permission("warden", name),
            "Welcome to {name}!",
        )
    }

    fn registry_with(sink: Arc<MemoryRegionSink>) -> AreaRegistry {
        AreaRegistry::new(sink)
    }

    #[test]
    fn create_rejects_duplicate_names() {
        let mut registry = AreaRegistry::default();
        registry.create(region("shop")).unwrap();
        let err = registry.create(region("Shop")).unwrap_err();
        assert!(matches!(err, WardenError::AlreadyExists(name) if name == "shop"));
    }

    #[test]
    fn listing_follows_insertion_order() {
        let mut registry = AreaRegistry::default();
        for name in ["zeta", "alpha", "mid"] {
            registry.create(region(name)).unwrap();
        }
        let names: Vec<_> = registry.iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn rename_keeps_position_and_regenerates_permission() {
        let mut registry = AreaRegistry::default();
        for name in ["first", "shop", "last"] {
            registry.create(region(name)).unwrap();
        }
        registry.rename("shop", "Market", "warden").unwrap();
        let names: Vec<_> = registry.iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, ["first", "market", "last"]);
        assert_eq!(
            registry.get("market").unwrap().permission,
            "warden.entry.market"
        );
        assert!(registry.get("shop").is_none());
    }

    #[test]
    fn rename_collision_leaves_both_regions_untouched() {
        let mut registry = AreaRegistry::default();
        registry.create(region("a")).unwrap();
        registry.create(region("b")).unwrap();
        let err = registry.rename("a", "b", "warden").unwrap_err();
        assert!(matches!(err, WardenError::AlreadyExists(_)));
        assert!(registry.get("a").is_some());
        assert!(registry.get("b").is_some());
    }

    #[test]
    fn set_corner_updates_one_corner_only() {
        let mut registry = AreaRegistry::default();
        registry.create(region("shop")).unwrap();
        registry
            .set_corner("shop", Corner::B, Point::new(12.0, 6.0, 12.0))
            .unwrap();
        let bounds = registry.get("shop").unwrap().bounds;
        assert_eq!(bounds.corner_a, Point::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.corner_b, Point::new(12.0, 6.0, 12.0));
    }

    #[test]
    fn mutations_flush_to_sink_once_each() {
        let sink = Arc::new(MemoryRegionSink::new());
        let mut registry = registry_with(sink.clone());
        registry.create(region("shop")).unwrap();
        registry.set_message("shop", "hi").unwrap();
        assert_eq!(sink.flush_count(), 2);
        assert_eq!(sink.last_flush().unwrap()[0].message, "hi");
    }

    #[test]
    fn unchanged_content_skips_the_sink() {
        let sink = Arc::new(MemoryRegionSink::new());
        let mut registry = registry_with(sink.clone());
        registry.create(region("shop")).unwrap();
        registry.set_message("shop", "Welcome to {name}!").unwrap();
        assert_eq!(sink.flush_count(), 1);
    }

    #[test]
    fn load_skips_unloaded_domains_with_warning() {
        let log_sink = MemorySink::new();
        let logger = Logger::new(log_sink.clone());
        let mut registry = AreaRegistry::default();
        let mut nether = RegionRecord::from(&region("vault"));
        nether.domain = "nether".to_string();
        let records = vec![RegionRecord::from(&region("shop")), nether];
        let loaded = registry.load(records, &Loaded(&["world"]), Some(&logger));
        assert_eq!(loaded, 1);
        assert!(registry.get("shop").is_some());
        assert!(registry.get("vault").is_none());
        let events = log_sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "region_skipped");
    }

    #[test]
    fn load_keeps_first_of_duplicate_names() {
        let mut registry = AreaRegistry::default();
        let mut second = RegionRecord::from(&region("shop"));
        second.message = "other".to_string();
        let records = vec![RegionRecord::from(&region("shop")), second];
        let loaded = registry.load(records, &Loaded(&["world"]), None);
        assert_eq!(loaded, 1);
        assert_eq!(registry.get("shop").unwrap().entry_message, "Welcome to {name}!");
    }

    #[test]
    fn remove_returns_the_region() {
        let mut registry = AreaRegistry::default();
        registry.create(region("shop")).unwrap();
        let removed = registry.remove("shop").unwrap();
        assert_eq!(removed.name, "shop");
        assert!(matches!(
            registry.remove("shop").unwrap_err(),
            WardenError::NotFound(_)
        ));
    }
}
