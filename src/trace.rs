use egui::{Color32, Pos2};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// One straight piece of a trace, recorded between two consecutive pointer samples
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: Pos2,
    pub to: Pos2,
}

impl Segment {
    pub fn new(from: Pos2, to: Pos2) -> Self {
        Self { from, to }
    }
}

/// A single freehand stroke, from pointer-down to pointer-up.
///
/// Segments are append-only while the trace is active and frozen afterwards;
/// replaying them in order reproduces the original raster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    color: Color32,
    thickness: NonZeroU32,
    start: Pos2,
    segments: Vec<Segment>,
}

impl Trace {
    // Create a trace that has only its starting point
    pub fn new(color: Color32, thickness: NonZeroU32, start: Pos2) -> Self {
        Self {
            color,
            thickness,
            start,
            segments: Vec::new(),
        }
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn thickness(&self) -> NonZeroU32 {
        self.thickness
    }

    pub fn start(&self) -> Pos2 {
        self.start
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub(crate) fn push_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }
}

/// Parse a host color string (`#rrggbb` or `#rrggbbaa`)
pub fn parse_color(text: &str) -> crate::Result<Color32> {
    Color32::from_hex(text.trim()).map_err(|_| crate::AnnotatorError::InvalidColor(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_starts_without_segments() {
        let trace = Trace::new(Color32::BLACK, NonZeroU32::new(2).unwrap(), Pos2::new(10.0, 10.0));
        assert_eq!(trace.start(), Pos2::new(10.0, 10.0));
        assert!(trace.segments().is_empty());
    }

    #[test]
    fn test_segments_keep_insertion_order() {
        let mut trace = Trace::new(Color32::RED, NonZeroU32::new(3).unwrap(), Pos2::ZERO);
        trace.push_segment(Segment::new(Pos2::ZERO, Pos2::new(1.0, 1.0)));
        trace.push_segment(Segment::new(Pos2::new(1.0, 1.0), Pos2::new(2.0, 5.0)));

        let ends: Vec<Pos2> = trace.segments().iter().map(|s| s.to).collect();
        assert_eq!(ends, vec![Pos2::new(1.0, 1.0), Pos2::new(2.0, 5.0)]);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#000000").unwrap(), Color32::BLACK);
        assert_eq!(parse_color("#ff0000").unwrap(), Color32::from_rgb(255, 0, 0));
        assert!(parse_color("red").is_err());
    }
}
