//! Projection of analysis results into screen-space overlay primitives.
//!
//! The renderer supplies a [`CoordinateMapper`] that knows its own viewport;
//! this module never sees chart widgets. Anything the mapper cannot place
//! (off-screen, outside the loaded range) is dropped rather than clamped.
//! Overlays are plain values, so redrawing means projecting again and
//! replacing the previous list.

use crate::detectors::{
    ConsolidationZone, HarmonicMatch, LevelKind, StructureEvent, StructureKind, SupportResistance,
    AB_CD,
};

/// Screen position in pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct ScreenPos {
    pub x: f32,
    pub y: f32,
}

impl ScreenPos {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Price/time to pixel conversion provided by the rendering layer.
pub trait CoordinateMapper {
    /// Vertical pixel for a price, `None` when it cannot be placed
    fn price_to_coordinate(&self, price: f64) -> Option<f32>;

    /// Horizontal pixel for a bar time, `None` when it cannot be placed
    fn time_to_coordinate(&self, time: i64) -> Option<f32>;

    fn point(&self, time: i64, price: f64) -> Option<ScreenPos> {
        Some(ScreenPos::new(
            self.time_to_coordinate(time)?,
            self.price_to_coordinate(price)?,
        ))
    }
}

/// Semantic colour; the renderer picks the palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Bullish,
    Bearish,
    Neutral,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
    Circle,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Overlay {
    HorizontalLine {
        y: f32,
        x_from: f32,
        x_to: f32,
        label: String,
        tone: Tone,
    },
    Marker {
        at: ScreenPos,
        shape: MarkerShape,
        label: String,
        tone: Tone,
    },
    Polyline {
        points: Vec<ScreenPos>,
        tone: Tone,
    },
    Rect {
        top_left: ScreenPos,
        bottom_right: ScreenPos,
        tone: Tone,
    },
}

fn structure_tone(kind: StructureKind) -> Tone {
    match kind {
        StructureKind::Bos => Tone::Bullish,
        StructureKind::Choch => Tone::Bearish,
    }
}

/// One horizontal line per level, spanning the examined window.
pub fn project_levels<M: CoordinateMapper + ?Sized>(
    levels: &SupportResistance,
    mapper: &M,
) -> Vec<Overlay> {
    let (Some(x_from), Some(x_to)) = (
        mapper.time_to_coordinate(levels.from),
        mapper.time_to_coordinate(levels.to),
    ) else {
        return Vec::new();
    };

    levels
        .levels()
        .filter_map(|level| {
            let y = mapper.price_to_coordinate(level.price)?;
            let (prefix, tone) = match level.kind {
                LevelKind::Support => ("S", Tone::Bullish),
                LevelKind::Resistance => ("R", Tone::Bearish),
            };
            Some(Overlay::HorizontalLine {
                y,
                x_from,
                x_to,
                label: format!("{prefix} {:.2} x{}", level.price, level.test_count),
                tone,
            })
        })
        .collect()
}

/// Markers for single events; a segment plus a start marker for zones.
pub fn project_structure<M: CoordinateMapper + ?Sized>(
    events: &[StructureEvent],
    mapper: &M,
) -> Vec<Overlay> {
    let mut out = Vec::new();

    for event in events {
        let tone = structure_tone(event.kind);
        match event.zone {
            None => {
                let Some(at) = mapper.point(event.time, event.price) else {
                    continue;
                };
                let shape = match event.kind {
                    StructureKind::Bos => MarkerShape::ArrowUp,
                    StructureKind::Choch => MarkerShape::ArrowDown,
                };
                out.push(Overlay::Marker {
                    at,
                    shape,
                    label: event.label(),
                    tone,
                });
            }
            Some(zone) => {
                let (Some(from), Some(to)) = (
                    mapper.point(zone.from, event.price),
                    mapper.point(zone.to, event.price),
                ) else {
                    continue;
                };
                out.push(Overlay::Polyline {
                    points: vec![from, to],
                    tone,
                });
                out.push(Overlay::Marker {
                    at: from,
                    shape: MarkerShape::Circle,
                    label: event.label(),
                    tone,
                });
            }
        }
    }

    out
}

/// A polyline through the placeable anchors and a label at D.
pub fn project_harmonic<M: CoordinateMapper + ?Sized>(
    pattern: &HarmonicMatch,
    mapper: &M,
) -> Vec<Overlay> {
    let points: Vec<ScreenPos> = pattern
        .anchors
        .iter()
        .filter_map(|a| mapper.point(a.time, a.price))
        .collect();

    let mut out = Vec::new();
    if points.len() >= 2 {
        out.push(Overlay::Polyline {
            points,
            tone: Tone::Pattern,
        });
    }
    let d = pattern.d();
    if let Some(at) = mapper.point(d.time, d.price) {
        out.push(Overlay::Marker {
            at,
            shape: MarkerShape::Circle,
            label: AB_CD.to_string(),
            tone: Tone::Pattern,
        });
    }
    out
}

pub fn project_consolidation<M: CoordinateMapper + ?Sized>(
    zone: &ConsolidationZone,
    mapper: &M,
) -> Option<Overlay> {
    Some(Overlay::Rect {
        top_left: mapper.point(zone.from, zone.upper)?,
        bottom_right: mapper.point(zone.to, zone.lower)?,
        tone: Tone::Neutral,
    })
}
