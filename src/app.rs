use eframe::egui::{self, Color32, Slider};
use futures::executor::ThreadPool;
use std::sync::mpsc;

use crate::annotator::Annotator;
use crate::config::AnnotatorConfig;
use crate::event::AnnotatorEvent;
use crate::export::ResourceHandle;
use crate::history::RESET_SENTINEL;
use crate::input::{InputHandler, PointerPhase};

/// Desktop host for a single annotator.
///
/// Plays the part of the embedding page: it measures the surface once,
/// forwards pointer input, binds the history index both ways and shows the
/// latest exported handles.
pub struct AnnotatorApp {
    config: AnnotatorConfig,
    annotator: Option<Annotator>,
    mount_error: Option<String>,
    input: InputHandler,
    texture: Option<egui::TextureHandle>,
    surface_dirty: bool,
    pool: ThreadPool,
    sender: mpsc::Sender<AnnotatorEvent>,
    receiver: mpsc::Receiver<AnnotatorEvent>,

    // Host-side mirror of the bound properties
    color: Color32,
    thickness: u32,
    disabled: bool,
    requested_index: isize,
    background_path: String,
    handles: (Option<ResourceHandle>, Option<ResourceHandle>),
}

/// Value the index field should show after `event`.
///
/// Rejected requests fall back to the annotator's actual pointer.
fn bound_index(event: &AnnotatorEvent, current: Option<isize>) -> Option<isize> {
    match event {
        AnnotatorEvent::IndexChanged(index) => Some(*index),
        AnnotatorEvent::IndexRequested(index) => {
            log::info!("No stored history for index {index}");
            current
        }
        AnnotatorEvent::AnnotationsChanged { .. } => None,
    }
}

impl AnnotatorApp {
    /// Called once before the first frame.
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AnnotatorConfig) -> crate::Result<Self> {
        let pool = ThreadPool::new()?;
        let (sender, receiver) = mpsc::channel();
        let color = crate::trace::parse_color(&config.color)?;

        Ok(Self {
            color,
            thickness: config.thickness,
            disabled: config.disabled,
            requested_index: crate::NO_TRACE,
            background_path: config.background_source.clone().unwrap_or_default(),
            config,
            annotator: None,
            mount_error: None,
            input: InputHandler::new(),
            texture: None,
            surface_dirty: true,
            pool,
            sender,
            receiver,
            handles: (None, None),
        })
    }

    /// Mount against the panel's content box. Only ever done once.
    fn mount(&mut self, ctx: &egui::Context, available: egui::Vec2) {
        let config = self
            .config
            .clone()
            .with_size(available.x.max(1.0) as u32, available.y.max(1.0) as u32);

        match Annotator::mount(&config, Box::new(self.pool.clone())) {
            Ok(annotator) => {
                let sender = self.sender.clone();
                let repaint = ctx.clone();
                annotator.subscribe(move |event: &AnnotatorEvent| {
                    // The receiver only goes away with the app
                    let _ = sender.send(event.clone());
                    repaint.request_repaint();
                });
                self.handles = annotator.export_handles();
                self.annotator = Some(annotator);
            }
            Err(err) => {
                log::error!("Annotator is unavailable: {err}");
                self.mount_error = Some(err.to_string());
            }
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                AnnotatorEvent::AnnotationsChanged { composed, annotation_only } => {
                    self.handles = (composed, annotation_only);
                }
                AnnotatorEvent::IndexChanged(_) | AnnotatorEvent::IndexRequested(_) => {
                    if let Some(index) = bound_index(&event, self.annotator.as_ref().map(Annotator::index)) {
                        self.requested_index = index;
                    }
                }
            }
        }
    }

    fn tools_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Annotate");
        ui.separator();

        ui.horizontal(|ui| {
            ui.label("Color:");
            egui::color_picker::color_edit_button_srgba(ui, &mut self.color, egui::color_picker::Alpha::Opaque);
        });
        ui.horizontal(|ui| {
            ui.label("Thickness:");
            ui.add(Slider::new(&mut self.thickness, 1..=50));
        });
        ui.checkbox(&mut self.disabled, "Disabled");

        ui.separator();

        let Some(annotator) = self.annotator.as_mut() else {
            return;
        };
        annotator.set_color32(self.color);
        if let Err(err) = annotator.set_thickness(self.thickness) {
            log::warn!("{err}");
        }
        annotator.set_disabled(self.disabled);

        ui.horizontal(|ui| {
            if ui.add_enabled(annotator.can_undo(), egui::Button::new("Undo")).clicked() {
                self.surface_dirty |= annotator.undo();
            }
            if ui.add_enabled(annotator.can_redo(), egui::Button::new("Redo")).clicked() {
                self.surface_dirty |= annotator.redo();
            }
            if ui.button("Reset").clicked() {
                annotator.request_index(RESET_SENTINEL);
                self.surface_dirty = true;
            }
        });

        ui.horizontal(|ui| {
            ui.label("Index:");
            let response = ui.add(egui::DragValue::new(&mut self.requested_index).range(-2..=1000));
            if response.changed() {
                annotator.request_index(self.requested_index);
                self.surface_dirty = true;
            }
        });
        ui.label(format!("Traces: {} (showing up to {})", annotator.traces().len(), annotator.index()));

        ui.separator();
        ui.label("Background:");
        ui.text_edit_singleline(&mut self.background_path);
        if ui.button("Load").clicked() {
            let path = self.background_path.trim();
            annotator.set_background_source((!path.is_empty()).then_some(path));
            self.surface_dirty = true;
        }

        ui.separator();
        let describe = |handle: &Option<ResourceHandle>| {
            handle
                .as_ref()
                .map_or_else(|| "none".to_owned(), ResourceHandle::to_string)
        };
        ui.label(format!("Composed: {}", describe(&self.handles.0)));
        ui.label(format!("Annotations: {}", describe(&self.handles.1)));
    }

    fn upload_surface(&mut self, ctx: &egui::Context) -> Option<egui::TextureId> {
        let annotator = self.annotator.as_ref()?;
        if self.surface_dirty || self.texture.is_none() {
            let surface = annotator.surface();
            let image = egui::ColorImage::from_rgba_premultiplied(
                [surface.width() as usize, surface.height() as usize],
                surface.data(),
            );
            if let Some(texture) = &mut self.texture {
                texture.set(image, egui::TextureOptions::LINEAR);
            } else {
                self.texture = Some(ctx.load_texture("annotation_surface", image, egui::TextureOptions::LINEAR));
            }
            self.surface_dirty = false;
        }
        self.texture.as_ref().map(|texture| texture.id())
    }
}

impl eframe::App for AnnotatorApp {
    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        egui::SidePanel::left("tools_panel").show(ctx, |ui| self.tools_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.annotator.is_none() && self.mount_error.is_none() {
                self.mount(ctx, ui.available_size());
            }
            if let Some(err) = &self.mount_error {
                ui.colored_label(Color32::RED, err);
                return;
            }
            let Some(annotator) = self.annotator.as_mut() else {
                return;
            };

            let size = egui::vec2(annotator.surface().width() as f32, annotator.surface().height() as f32);
            let (response, painter) = ui.allocate_painter(size, egui::Sense::drag());
            let rect = response.rect;
            annotator.set_surface_origin(rect.min);

            let events = ctx.input(|input| self.input.process_events(&input.events));
            for event in events {
                // Strokes only start on the surface itself
                if event.phase == PointerPhase::Down && !rect.contains(event.position) {
                    continue;
                }
                annotator.handle_pointer(event);
                self.surface_dirty = true;
            }

            if let Some(texture) = self.upload_surface(ctx) {
                painter.image(
                    texture,
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
        });
    }
}
