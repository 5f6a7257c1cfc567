#![warn(clippy::all, rust_2018_idioms)]

pub mod annotator;
pub mod app;
pub mod compositor;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod history;
pub mod input;
pub mod paint;
pub mod persistence;
pub mod trace;

pub use annotator::Annotator;
pub use app::AnnotatorApp;
pub use config::AnnotatorConfig;
pub use error::{AnnotatorError, Result};
pub use event::{AnnotatorEvent, EventHandler};
pub use export::{ResourceHandle, Slot};
pub use history::{IndexOutcome, IndexRequest, NO_TRACE, RESET_SENTINEL, TraceStore};
pub use input::{InputHandler, PointerEvent, PointerPhase, PointerSource};
pub use paint::Surface;
pub use persistence::HistorySnapshot;
pub use trace::{Segment, Trace};
