use egui::{Color32, Pos2};
use futures::task::Spawn;
use image::RgbaImage;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::compositor::Background;
use crate::config::AnnotatorConfig;
use crate::event::{AnnotatorEvent, EventBus, EventHandler};
use crate::export::{ExportManager, ResourceHandle};
use crate::history::{IndexOutcome, IndexRequest, NO_TRACE, TraceStore};
use crate::input::{InputRouter, PointerEvent, StrokeAction};
use crate::paint::{self, Surface};
use crate::persistence::HistorySnapshot;
use crate::trace::{Trace, parse_color};
use crate::{AnnotatorError, Result};

/// One mounted annotation component.
///
/// Owns the surface, the trace history and the export slots. Pointer input
/// goes through [`Annotator::handle_pointer`]; host writes to the history
/// pointer go through [`Annotator::request_index`]. Dropping the annotator
/// revokes every exported handle.
#[derive(Debug)]
pub struct Annotator {
    surface: Surface,
    background: Option<Background>,
    background_source: Option<String>,
    store: TraceStore,
    router: InputRouter,
    color: Color32,
    thickness: NonZeroU32,
    disabled: bool,
    events: Arc<EventBus>,
    exports: ExportManager,
}

fn open_background(source: &str) -> Option<Background> {
    match Background::open(source) {
        Ok(background) => Some(background),
        Err(err) => {
            log::warn!("Drawing without background, {source} failed to load: {err}");
            None
        }
    }
}

impl Annotator {
    /// Acquire the surface, load the background and run the first export cycle.
    ///
    /// Encodes are spawned on `spawner`. Surface size is taken from the config
    /// once and never re-measured.
    pub fn mount(config: &AnnotatorConfig, spawner: Box<dyn Spawn>) -> Result<Self> {
        let surface = Surface::new(config.width, config.height)?;
        let color = parse_color(&config.color)?;
        let thickness = NonZeroU32::new(config.thickness).ok_or(AnnotatorError::InvalidThickness)?;
        let events = Arc::new(EventBus::new());
        let exports = ExportManager::new(spawner, Arc::clone(&events));

        let mut annotator = Self {
            surface,
            background: config.background_source.as_deref().and_then(open_background),
            background_source: config.background_source.clone(),
            store: TraceStore::new(),
            router: InputRouter::default(),
            color,
            thickness,
            disabled: config.disabled,
            events,
            exports,
        };
        log::info!(
            "Mounted {}x{} annotation surface",
            annotator.surface.width(),
            annotator.surface.height()
        );
        annotator.refresh();
        Ok(annotator)
    }

    pub fn subscribe(&self, handler: impl EventHandler + 'static) {
        self.events.subscribe(Box::new(handler));
    }

    // Host inputs

    pub fn set_color(&mut self, color: &str) -> Result<()> {
        self.color = parse_color(color)?;
        Ok(())
    }

    pub fn set_color32(&mut self, color: Color32) {
        self.color = color;
    }

    pub fn set_thickness(&mut self, thickness: u32) -> Result<()> {
        self.thickness = NonZeroU32::new(thickness).ok_or(AnnotatorError::InvalidThickness)?;
        Ok(())
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Device coordinates of the surface's top-left corner
    pub fn set_surface_origin(&mut self, origin: Pos2) {
        self.router.set_origin(origin);
    }

    /// Switch to the image at `source`; discards the history.
    ///
    /// A missing or unreadable image leaves a blank background.
    pub fn set_background_source(&mut self, source: Option<&str>) {
        if self.background_source.as_deref() == source {
            return;
        }
        self.background_source = source.map(str::to_owned);
        self.background = source.and_then(open_background);
        self.reset_history();
    }

    pub fn set_background_image(&mut self, image: Option<&RgbaImage>) {
        self.background_source = None;
        self.background = image.and_then(|image| match Background::from_rgba(image) {
            Ok(background) => Some(background),
            Err(err) => {
                log::warn!("Drawing without background: {err}");
                None
            }
        });
        self.reset_history();
    }

    /// Decode an encoded image held in memory and use it as background
    pub fn set_background_bytes(&mut self, bytes: &[u8]) {
        self.background_source = None;
        self.background = match Background::from_bytes(bytes) {
            Ok(background) => Some(background),
            Err(err) => {
                log::warn!("Drawing without background: {err}");
                None
            }
        };
        self.reset_history();
    }

    // Input

    /// Feed one pointer or touch sample through the stroke state machine
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match self.router.route(event, self.disabled) {
            Some(StrokeAction::Begin(point)) => {
                let index = self.store.begin_trace(self.color, self.thickness, point);
                paint::paint_dot(&mut self.surface, point, self.color, self.thickness);
                self.events.emit(AnnotatorEvent::IndexChanged(index));
            }
            Some(StrokeAction::Extend { from, to }) => {
                if let Err(err) = self.store.append_segment(from, to) {
                    log::warn!("Dropping stroke: {err}");
                    self.router.reset();
                    return;
                }
                if let Some(trace) = self.store.active_trace() {
                    paint::join_segment(&mut self.surface, from, to, trace.color(), trace.thickness());
                }
            }
            Some(StrokeAction::Finish) => self.refresh(),
            None => {}
        }
    }

    // History pointer

    /// Host write to the history pointer (undo/redo request or reset sentinel).
    ///
    /// In-range moves are not echoed back as [`AnnotatorEvent::IndexChanged`];
    /// out-of-range values are forwarded as [`AnnotatorEvent::IndexRequested`].
    pub fn request_index(&mut self, requested: isize) -> IndexOutcome {
        let outcome = self.store.set_index(requested);
        match outcome {
            IndexOutcome::Unchanged => {}
            IndexOutcome::Replay(_) => {
                self.router.reset();
                self.refresh();
            }
            IndexOutcome::Reset => {
                self.router.reset();
                self.refresh();
                self.events.emit(AnnotatorEvent::IndexChanged(NO_TRACE));
            }
            IndexOutcome::OutOfRange(index) => {
                log::debug!("Index {index} is outside the history, forwarding to host");
                self.events.emit(AnnotatorEvent::IndexRequested(index));
            }
        }
        outcome
    }

    /// Step back one trace. Returns false when nothing is visible.
    pub fn undo(&mut self) -> bool {
        self.store.can_undo() && self.navigate(self.store.index() - 1)
    }

    /// Step forward one trace. Returns false at the end of the history.
    pub fn redo(&mut self) -> bool {
        self.store.can_redo() && self.navigate(self.store.index() + 1)
    }

    fn navigate(&mut self, target: isize) -> bool {
        match self.store.apply(IndexRequest::Position(target)) {
            IndexOutcome::Replay(index) => {
                self.router.reset();
                self.refresh();
                self.events.emit(AnnotatorEvent::IndexChanged(index));
                true
            }
            _ => false,
        }
    }

    fn reset_history(&mut self) {
        let previous = self.store.index();
        self.store.clear();
        self.router.reset();
        self.refresh();
        if previous != NO_TRACE {
            self.events.emit(AnnotatorEvent::IndexChanged(NO_TRACE));
        }
    }

    /// Replace the history with a stored one, e.g. in answer to an index request
    pub fn restore_history(&mut self, snapshot: HistorySnapshot) -> Result<()> {
        self.store = snapshot.into_store()?;
        self.router.reset();
        self.refresh();
        self.events.emit(AnnotatorEvent::IndexChanged(self.store.index()));
        Ok(())
    }

    pub fn history_snapshot(&self) -> HistorySnapshot {
        HistorySnapshot::new(&self.store)
    }

    // Rendering and export

    /// Full replay followed by an export cycle
    fn refresh(&mut self) {
        paint::replay(
            &mut self.surface,
            self.store.traces(),
            self.store.index(),
            self.background.as_ref(),
        );

        let mut overlay = match Surface::new(self.surface.width(), self.surface.height()) {
            Ok(overlay) => overlay,
            Err(err) => {
                log::warn!("Skipping export cycle: {err}");
                return;
            }
        };
        paint::replay(&mut overlay, self.store.traces(), self.store.index(), None);

        if let Err(err) = self.exports.export(self.surface.clone(), overlay) {
            log::warn!("Skipping export cycle: {err}");
        }
    }

    // Accessors

    pub fn index(&self) -> isize {
        self.store.index()
    }

    pub fn traces(&self) -> &[Trace] {
        self.store.traces()
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn thickness(&self) -> NonZeroU32 {
        self.thickness
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_drawing(&self) -> bool {
        self.router.is_drawing()
    }

    /// Current (composed, annotation-only) handles
    pub fn export_handles(&self) -> (Option<ResourceHandle>, Option<ResourceHandle>) {
        self.exports.handles()
    }

    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Arc<[u8]>> {
        self.exports.resolve(handle)
    }

    pub fn live_handle_count(&self) -> usize {
        self.exports.live_handle_count()
    }
}
