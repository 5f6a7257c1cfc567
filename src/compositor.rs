//! Letterboxed background placement.

use image::RgbaImage;
use tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::paint::Surface;
use crate::{AnnotatorError, Result};

/// Where a background lands on the surface, in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A decoded background image, kept premultiplied so every replay can redraw it
#[derive(Clone)]
pub struct Background {
    pixmap: Pixmap,
}

impl std::fmt::Debug for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Background")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl Background {
    pub fn from_rgba(image: &RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        let mut pixmap = Pixmap::new(width, height).ok_or(AnnotatorError::SurfaceUnavailable { width, height })?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Self { pixmap })
    }

    /// Decode an encoded image (PNG, JPEG, ...) held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        log::debug!("Decoded background: {}x{}", decoded.width(), decoded.height());
        Self::from_rgba(&decoded.to_rgba8())
    }

    /// Load an image from the filesystem
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let decoded = image::open(path.as_ref())?;
        log::info!(
            "Loaded background {} ({}x{})",
            path.as_ref().display(),
            decoded.width(),
            decoded.height()
        );
        Self::from_rgba(&decoded.to_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }
}

/// Largest centered rectangle with the image's aspect ratio that fits the surface
pub fn fit_background(surface_width: f32, surface_height: f32, image_width: f32, image_height: f32) -> Placement {
    let ratio = image_width / image_height;

    if image_width > image_height {
        let mut width = surface_width;
        let mut height = surface_width / ratio;
        if height > surface_height {
            height = surface_height;
            width = height * ratio;
            Placement {
                x: (surface_width - width) / 2.0,
                y: 0.0,
                width,
                height,
            }
        } else {
            Placement {
                x: 0.0,
                y: (surface_height - height) / 2.0,
                width,
                height,
            }
        }
    } else {
        let mut height = surface_height;
        let mut width = surface_height * ratio;
        if width > surface_width {
            width = surface_width;
            height = width / ratio;
            Placement {
                x: 0.0,
                y: (surface_height - height) / 2.0,
                width,
                height,
            }
        } else {
            Placement {
                x: (surface_width - width) / 2.0,
                y: 0.0,
                width,
                height,
            }
        }
    }
}

/// Scale and draw the background into its fitted placement
pub fn draw_background(surface: &mut Surface, background: &Background) -> Placement {
    let placement = fit_background(
        surface.width() as f32,
        surface.height() as f32,
        background.width() as f32,
        background.height() as f32,
    );
    let transform = Transform::from_row(
        placement.width / background.width() as f32,
        0.0,
        0.0,
        placement.height / background.height() as f32,
        placement.x,
        placement.y,
    );
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    surface
        .pixmap_mut()
        .draw_pixmap(0, 0, background.pixmap.as_ref(), &paint, transform, None);
    placement
}
