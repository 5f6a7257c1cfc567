//! Rasterization of trace primitives onto a [`Surface`].
//!
//! Nothing in here knows about history; callers hand in the traces to draw.

use egui::{Color32, Pos2};
use std::num::NonZeroU32;
use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use crate::compositor::{self, Background};
use crate::trace::Trace;
use crate::{AnnotatorError, Result};

/// Owned RGBA raster the annotations are drawn on
#[derive(Clone)]
pub struct Surface {
    pixmap: Pixmap,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl Surface {
    /// Allocate a transparent surface
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or(AnnotatorError::SurfaceUnavailable { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Reset every pixel to transparent
    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    /// Premultiplied RGBA bytes, row-major
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Unpremultiplied RGBA value of a single pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixmap.pixel(x, y).map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
    }

    /// Encode the current content as PNG
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap.encode_png().map_err(|e| AnnotatorError::Encode(e.to_string()))
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }
}

fn solid_paint(color: Color32, anti_alias: bool) -> Paint<'static> {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = anti_alias;
    paint
}

/// Fill a `thickness`-sided square whose top-left corner is `point`.
///
/// Dots are squares anchored at the point, unlike segments which are stroked
/// with round caps around their centre line. Existing exports depend on it.
pub fn paint_dot(surface: &mut Surface, point: Pos2, color: Color32, thickness: NonZeroU32) {
    let side = thickness.get() as f32;
    let Some(rect) = Rect::from_xywh(point.x, point.y, side, side) else {
        log::debug!("Skipping degenerate dot at {point:?}");
        return;
    };
    surface
        .pixmap_mut()
        .fill_rect(rect, &solid_paint(color, false), Transform::identity(), None);
}

/// Stroke a straight line between two points
pub fn join_segment(surface: &mut Surface, from: Pos2, to: Pos2, color: Color32, thickness: NonZeroU32) {
    let mut builder = PathBuilder::new();
    builder.move_to(from.x, from.y);
    builder.line_to(to.x, to.y);
    let Some(path) = builder.finish() else {
        return;
    };

    let stroke = Stroke {
        width: thickness.get() as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    surface
        .pixmap_mut()
        .stroke_path(&path, &solid_paint(color, true), &stroke, Transform::identity(), None);
}

/// Paint one complete trace: its start dot, then every segment in order
pub fn paint_trace(surface: &mut Surface, trace: &Trace) {
    paint_dot(surface, trace.start(), trace.color(), trace.thickness());
    for segment in trace.segments() {
        join_segment(surface, segment.from, segment.to, trace.color(), trace.thickness());
    }
}

/// Clear the surface and redraw background plus `traces[0..=upto]`.
///
/// Always starts from a cleared surface, so repeated calls with the same
/// inputs produce the same pixels.
pub fn replay(surface: &mut Surface, traces: &[Trace], upto: isize, background: Option<&Background>) {
    surface.clear();

    if let Some(background) = background {
        compositor::draw_background(surface, background);
    }

    let visible = usize::try_from(upto + 1).unwrap_or(0).min(traces.len());
    for trace in &traces[..visible] {
        paint_trace(surface, trace);
    }
    log::debug!("Replayed {visible} of {} trace(s)", traces.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thickness(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).unwrap()
    }

    fn sample_traces() -> Vec<Trace> {
        let mut first = Trace::new(Color32::BLACK, thickness(2), Pos2::new(10.0, 10.0));
        first.push_segment(crate::trace::Segment::new(Pos2::new(10.0, 10.0), Pos2::new(40.0, 30.0)));
        let mut second = Trace::new(Color32::RED, thickness(5), Pos2::new(50.0, 5.0));
        second.push_segment(crate::trace::Segment::new(Pos2::new(50.0, 5.0), Pos2::new(20.0, 60.0)));
        second.push_segment(crate::trace::Segment::new(Pos2::new(20.0, 60.0), Pos2::new(70.0, 70.0)));
        vec![first, second]
    }

    #[test]
    fn test_zero_sized_surface_is_unavailable() {
        assert!(matches!(
            Surface::new(0, 10),
            Err(AnnotatorError::SurfaceUnavailable { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_dot_is_square_anchored_at_point() {
        let mut surface = Surface::new(32, 32).unwrap();
        paint_dot(&mut surface, Pos2::new(10.0, 10.0), Color32::BLACK, thickness(4));

        for y in 10..14 {
            for x in 10..14 {
                assert_eq!(surface.pixel(x, y), Some([0, 0, 0, 255]), "({x},{y}) should be filled");
            }
        }
        // Corners are filled, which a round dot would miss
        assert_eq!(surface.pixel(10, 13).map(|p| p[3]), Some(255));
        for (x, y) in [(9, 10), (14, 10), (10, 9), (10, 14), (14, 14), (8, 8)] {
            assert_eq!(surface.pixel(x, y).map(|p| p[3]), Some(0), "({x},{y}) should be empty");
        }
    }

    #[test]
    fn test_join_segment_paints_along_line() {
        let mut surface = Surface::new(64, 64).unwrap();
        join_segment(&mut surface, Pos2::new(5.0, 32.0), Pos2::new(60.0, 32.0), Color32::RED, thickness(4));

        assert_eq!(surface.pixel(30, 32), Some([255, 0, 0, 255]));
        assert_eq!(surface.pixel(30, 10).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_replay_is_idempotent() {
        let traces = sample_traces();
        let mut surface = Surface::new(80, 80).unwrap();

        replay(&mut surface, &traces, 1, None);
        let first = surface.data().to_vec();
        replay(&mut surface, &traces, 1, None);
        assert_eq!(first, surface.data());
    }

    #[test]
    fn test_replay_respects_upto() {
        let traces = sample_traces();
        let mut only_first = Surface::new(80, 80).unwrap();
        replay(&mut only_first, &traces, 0, None);

        let mut direct = Surface::new(80, 80).unwrap();
        paint_trace(&mut direct, &traces[0]);
        assert_eq!(only_first.data(), direct.data());

        replay(&mut only_first, &traces, -1, None);
        assert!(only_first.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_undo_redo_round_trip_matches_direct_replay() {
        let traces = sample_traces();
        let mut direct = Surface::new(80, 80).unwrap();
        let mut cycled = Surface::new(80, 80).unwrap();

        for k in -1..traces.len() as isize {
            replay(&mut direct, &traces, k, None);
            replay(&mut cycled, &traces, k, None);
            replay(&mut cycled, &traces, k - 1, None);
            replay(&mut cycled, &traces, k, None);
            assert_eq!(direct.data(), cycled.data(), "mismatch at k = {k}");
        }
    }

    #[test]
    fn test_encode_png_has_signature() {
        let surface = Surface::new(4, 4).unwrap();
        let bytes = surface.encode_png().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
