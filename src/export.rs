//! Encoded snapshots of the surface, published through revocable handles.
//!
//! Each export cycle spawns one encode per [`Slot`]. A finished encode revokes
//! the slot's previous handle, installs the new one and emits
//! [`AnnotatorEvent::AnnotationsChanged`] with the current pair. The two slots
//! complete in any order, so one cycle yields two notifications. Notifications
//! are delivered in the order handles were installed, so the last one a host
//! sees always matches [`ExportManager::handles`].

use futures::task::{Spawn, SpawnExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::Result;
use crate::event::{AnnotatorEvent, EventBus};
use crate::paint::Surface;

const HANDLE_PREFIX: &str = "blob:trace-annotator/";

/// Turns one slot's surface into the bytes behind its handle
pub(crate) type Encoder = Arc<dyn Fn(Slot, &Surface) -> Result<Vec<u8>> + Send + Sync>;

fn png_encoder() -> Encoder {
    Arc::new(|_slot: Slot, surface: &Surface| surface.encode_png())
}

/// Opaque reference to one encoded export image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    fn generate() -> Self {
        Self(format!("{HANDLE_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two export outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Background plus visible traces
    Composed,
    /// Visible traces over a transparent background
    AnnotationOnly,
}

#[derive(Debug, Default)]
struct SlotTable {
    composed: Option<ResourceHandle>,
    annotation_only: Option<ResourceHandle>,
    resources: HashMap<ResourceHandle, Arc<[u8]>>,
    closed: bool,
}

impl SlotTable {
    fn slot(&self, slot: Slot) -> &Option<ResourceHandle> {
        match slot {
            Slot::Composed => &self.composed,
            Slot::AnnotationOnly => &self.annotation_only,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<ResourceHandle> {
        match slot {
            Slot::Composed => &mut self.composed,
            Slot::AnnotationOnly => &mut self.annotation_only,
        }
    }

    /// Revoke the slot's current handle, then install a fresh one for `bytes`
    fn replace(&mut self, slot: Slot, bytes: Vec<u8>) -> ResourceHandle {
        if let Some(previous) = self.slot_mut(slot).take() {
            self.resources.remove(&previous);
            log::debug!("Revoked {previous} ({slot:?})");
        }
        let handle = ResourceHandle::generate();
        self.resources.insert(handle.clone(), bytes.into());
        *self.slot_mut(slot) = Some(handle.clone());
        handle
    }

    fn snapshot(&self) -> AnnotatorEvent {
        AnnotatorEvent::AnnotationsChanged {
            composed: self.composed.clone(),
            annotation_only: self.annotation_only.clone(),
        }
    }

    fn revoke_all(&mut self) {
        self.composed = None;
        self.annotation_only = None;
        self.resources.clear();
    }
}

/// Owns the per-instance export slots and schedules encodes on a host executor
pub struct ExportManager {
    table: Arc<Mutex<SlotTable>>,
    // Held across install and emit so delivery order follows install order
    publishing: Arc<Mutex<()>>,
    events: Arc<EventBus>,
    spawner: Box<dyn Spawn>,
    encoder: Encoder,
}

impl std::fmt::Debug for ExportManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.lock();
        f.debug_struct("ExportManager")
            .field("composed", &table.composed)
            .field("annotation_only", &table.annotation_only)
            .field("live", &table.resources.len())
            .finish()
    }
}

impl ExportManager {
    pub fn new(spawner: Box<dyn Spawn>, events: Arc<EventBus>) -> Self {
        Self {
            table: Arc::new(Mutex::new(SlotTable::default())),
            publishing: Arc::new(Mutex::new(())),
            events,
            spawner,
            encoder: png_encoder(),
        }
    }

    #[cfg(test)]
    fn set_encoder(&mut self, encoder: Encoder) {
        self.encoder = encoder;
    }

    /// Start one export cycle from the given snapshots.
    ///
    /// Returns once both encodes are scheduled; they finish independently.
    pub fn export(&self, composed: Surface, annotation_only: Surface) -> Result<()> {
        self.spawn_encode(Slot::Composed, composed)?;
        self.spawn_encode(Slot::AnnotationOnly, annotation_only)?;
        Ok(())
    }

    fn spawn_encode(&self, slot: Slot, surface: Surface) -> Result<()> {
        let table = Arc::clone(&self.table);
        let publishing = Arc::clone(&self.publishing);
        let events = Arc::clone(&self.events);
        let encoder = Arc::clone(&self.encoder);
        self.spawner.spawn(async move {
            let bytes = match encoder(slot, &surface) {
                Ok(bytes) => bytes,
                Err(err) => {
                    log::debug!("Skipping {slot:?} export: {err}");
                    return;
                }
            };
            publish(&table, &publishing, &events, slot, bytes);
        })?;
        Ok(())
    }

    /// Current pair of handles (composed, annotation-only)
    pub fn handles(&self) -> (Option<ResourceHandle>, Option<ResourceHandle>) {
        let table = self.table.lock();
        (table.composed.clone(), table.annotation_only.clone())
    }

    pub fn handle(&self, slot: Slot) -> Option<ResourceHandle> {
        self.table.lock().slot(slot).clone()
    }

    /// Encoded bytes behind a live handle; `None` once revoked
    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Arc<[u8]>> {
        self.table.lock().resources.get(handle).cloned()
    }

    pub fn live_handle_count(&self) -> usize {
        self.table.lock().resources.len()
    }

    /// Revoke every handle; encodes finishing afterwards are dropped
    pub fn close(&self) {
        let mut table = self.table.lock();
        table.closed = true;
        table.revoke_all();
        log::info!("Export slots closed");
    }
}

impl Drop for ExportManager {
    fn drop(&mut self) {
        self.close();
    }
}

fn publish(table: &Mutex<SlotTable>, publishing: &Mutex<()>, events: &EventBus, slot: Slot, bytes: Vec<u8>) {
    // The table lock is dropped before emitting so handlers can resolve handles
    let _order = publishing.lock();
    let event = {
        let mut table = table.lock();
        if table.closed {
            log::debug!("Discarding {slot:?} export after teardown");
            return;
        }
        let handle = table.replace(slot, bytes);
        log::debug!("Published {handle} ({slot:?})");
        table.snapshot()
    };
    events.emit(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::LocalPool;

    fn manager(pool: &LocalPool) -> (ExportManager, Arc<Mutex<Vec<AnnotatorEvent>>>) {
        let events = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.subscribe(Box::new(move |event: &AnnotatorEvent| sink.lock().push(event.clone())));
        (ExportManager::new(Box::new(pool.spawner()), events), seen)
    }

    fn surfaces() -> (Surface, Surface) {
        (Surface::new(8, 8).unwrap(), Surface::new(8, 8).unwrap())
    }

    #[test]
    fn test_cycle_emits_once_per_slot() {
        let mut pool = LocalPool::new();
        let (exports, seen) = manager(&pool);

        let (composed, overlay) = surfaces();
        exports.export(composed, overlay).unwrap();
        assert!(seen.lock().is_empty());
        pool.run_until_stalled();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        let (composed, annotation_only) = exports.handles();
        assert_eq!(
            seen[1],
            AnnotatorEvent::AnnotationsChanged { composed, annotation_only }
        );
    }

    #[test]
    fn test_one_live_handle_per_slot() {
        let mut pool = LocalPool::new();
        let (exports, seen) = manager(&pool);

        for _ in 0..4 {
            let (composed, overlay) = surfaces();
            exports.export(composed, overlay).unwrap();
            pool.run_until_stalled();
        }

        assert_eq!(exports.live_handle_count(), 2);
        let current = exports.handles();
        let issued: Vec<ResourceHandle> = seen
            .lock()
            .iter()
            .filter_map(|event| match event {
                AnnotatorEvent::AnnotationsChanged { composed, .. } => composed.clone(),
                _ => None,
            })
            .collect();
        for handle in issued.iter().filter(|h| Some(*h) != current.0.as_ref()) {
            assert!(exports.resolve(handle).is_none(), "{handle} should be revoked");
        }
        assert!(exports.resolve(current.0.as_ref().unwrap()).is_some());
    }

    #[test]
    fn test_close_discards_late_encodes() {
        let mut pool = LocalPool::new();
        let (exports, seen) = manager(&pool);

        let (composed, overlay) = surfaces();
        exports.export(composed, overlay).unwrap();
        exports.close();
        pool.run_until_stalled();

        assert!(seen.lock().is_empty());
        assert_eq!(exports.live_handle_count(), 0);
        assert_eq!(exports.handles(), (None, None));
    }

    #[test]
    fn test_failed_encode_keeps_previous_handle() {
        let mut pool = LocalPool::new();
        let (mut exports, seen) = manager(&pool);

        let (composed, overlay) = surfaces();
        exports.export(composed, overlay).unwrap();
        pool.run_until_stalled();
        let (first_composed, first_overlay) = exports.handles();

        exports.set_encoder(Arc::new(|slot: Slot, surface: &Surface| match slot {
            Slot::Composed => Err(crate::AnnotatorError::Encode("no encoder".to_owned())),
            Slot::AnnotationOnly => surface.encode_png(),
        }));
        let (composed, overlay) = surfaces();
        exports.export(composed, overlay).unwrap();
        pool.run_until_stalled();

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        let (composed, annotation_only) = exports.handles();
        assert_eq!(composed, first_composed);
        assert_ne!(annotation_only, first_overlay);
        assert!(exports.resolve(composed.as_ref().unwrap()).is_some());
        assert_eq!(
            seen[2],
            AnnotatorEvent::AnnotationsChanged { composed, annotation_only }
        );
        assert_eq!(exports.live_handle_count(), 2);
    }

    #[test]
    fn test_handles_are_blob_references() {
        let handle = ResourceHandle::generate();
        assert!(handle.as_str().starts_with(HANDLE_PREFIX));
        assert_ne!(handle, ResourceHandle::generate());
    }
}
