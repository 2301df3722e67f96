//! Filter cache: `filter_id → LutFilter`, built at most once per id.
//!
//! Each id owns a slot. The map lock is only held to find or create a slot;
//! cube construction happens under the slot's own build lock, so callers
//! racing on one unseen id build it once while other ids build in parallel.
//! A slot stays in the map while it is unbuilt, including after a failed
//! build, so every caller for that id queues on the same build lock.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::lut::{LutError, LutFilter};
use crate::raster::RasterImage;

#[derive(Debug, Default)]
struct Slot {
    filter: OnceLock<Arc<LutFilter>>,
    building: Mutex<()>,
    last_used: AtomicU64,
}

impl Slot {
    fn is_built(&self) -> bool {
        self.filter.get().is_some()
    }
}

/// Process-wide cache of constructed LUT filters.
#[derive(Debug)]
pub struct FilterCache {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
    capacity: Option<NonZeroUsize>,
    strict_ids: bool,
    builds: AtomicU64,
    clock: AtomicU64,
}

impl Default for FilterCache {
    fn default() -> Self {
        Self::new(None, true)
    }
}

impl FilterCache {
    /// `capacity = None` never evicts. With `strict_ids`, reusing an id for a
    /// different source or dimension is an error instead of a silent hit.
    pub fn new(capacity: Option<NonZeroUsize>, strict_ids: bool) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            capacity,
            strict_ids,
            builds: AtomicU64::new(0),
            clock: AtomicU64::new(0),
        }
    }

    /// Return the filter bound to `filter_id`, building it on first use.
    ///
    /// `load` produces the LUT raster and only runs on a miss. A failed load
    /// or build binds nothing, so a later call can retry.
    pub fn get_or_build<E, F>(
        &self,
        filter_id: &str,
        source: &str,
        dimension: u32,
        load: F,
    ) -> Result<Arc<LutFilter>, E>
    where
        F: FnOnce() -> Result<RasterImage, E>,
        E: From<LutError>,
    {
        let slot = self.slot(filter_id);
        if let Some(filter) = slot.filter.get() {
            return self.hit(filter, source, dimension).map_err(E::from);
        }

        let _building = slot.building.lock();
        // Another caller may have finished while we waited.
        if let Some(filter) = slot.filter.get() {
            return self.hit(filter, source, dimension).map_err(E::from);
        }

        // On failure the slot stays bound and empty; the next lock holder retries.
        let raster = load()?;
        let filter = Arc::new(LutFilter::build(filter_id, source, &raster, dimension)?);

        self.builds.fetch_add(1, Ordering::Relaxed);
        let _ = slot.filter.set(Arc::clone(&filter));
        tracing::debug!(filter_id, source, dimension, "built LUT filter");

        self.evict_over_capacity(filter_id);
        Ok(filter)
    }

    /// Cached filter for `filter_id`, if built.
    pub fn get(&self, filter_id: &str) -> Option<Arc<LutFilter>> {
        let slot = self.slots.lock().get(filter_id).cloned()?;
        let filter = slot.filter.get()?;
        slot.last_used.store(self.tick(), Ordering::Relaxed);
        Some(Arc::clone(filter))
    }

    pub fn contains(&self, filter_id: &str) -> bool {
        self.slots
            .lock()
            .get(filter_id)
            .is_some_and(|slot| slot.is_built())
    }

    /// Number of built filters.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.is_built())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop one built filter. Returns whether anything was removed.
    ///
    /// An id whose build is still in flight is left alone.
    pub fn invalidate(&self, filter_id: &str) -> bool {
        let mut slots = self.slots.lock();
        if !slots.get(filter_id).is_some_and(|slot| slot.is_built()) {
            return false;
        }
        slots.remove(filter_id);
        true
    }

    /// Drop every built filter.
    pub fn clear(&self) {
        self.slots.lock().retain(|_, slot| !slot.is_built());
    }

    /// Total cube constructions performed by this cache.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn slot(&self, filter_id: &str) -> Arc<Slot> {
        let tick = self.tick();
        let mut slots = self.slots.lock();
        let slot = Arc::clone(slots.entry(filter_id.to_string()).or_default());
        slot.last_used.store(tick, Ordering::Relaxed);
        slot
    }

    fn hit(
        &self,
        filter: &Arc<LutFilter>,
        source: &str,
        dimension: u32,
    ) -> Result<Arc<LutFilter>, LutError> {
        if !filter.matches(source, dimension) {
            if self.strict_ids {
                return Err(LutError::FilterIdConflict {
                    filter_id: filter.id().to_string(),
                    cached_source: filter.source().to_string(),
                    cached_dimension: filter.dimension(),
                    requested_source: source.to_string(),
                    requested_dimension: dimension,
                });
            }
            tracing::debug!(
                filter_id = filter.id(),
                cached_source = filter.source(),
                requested_source = source,
                "filter id reused with a different source; keeping cached filter"
            );
        }
        tracing::debug!(filter_id = filter.id(), "filter cache hit");
        Ok(Arc::clone(filter))
    }

    fn evict_over_capacity(&self, keep: &str) {
        let Some(capacity) = self.capacity else {
            return;
        };
        let mut slots = self.slots.lock();
        // Unbuilt slots may have a build in flight and are never evicted.
        while slots.values().filter(|slot| slot.is_built()).count() > capacity.get() {
            let victim = slots
                .iter()
                .filter(|(id, slot)| id.as_str() != keep && slot.is_built())
                .min_by_key(|(_, slot)| slot.last_used.load(Ordering::Relaxed))
                .map(|(id, _)| id.clone());
            let Some(victim) = victim else {
                break;
            };
            slots.remove(&victim);
            tracing::debug!(filter_id = %victim, "evicted LUT filter");
        }
    }
}
