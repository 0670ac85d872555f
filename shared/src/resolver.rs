use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::layout::{angle_in_range, CavityRegion, CavityShape, DiagramLayout, RegionKind};
use crate::Point;

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq)]
pub struct Polar {
    pub distance: f64,
    pub angle: f64,
}

/// What a click landed on. Bands the click missed stay `None`; the raw
/// polar coordinates are always present.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct RegionMatch {
    pub cavity: Option<String>,
    pub ring: Option<String>,
    pub sector: Option<u32>,
    pub angle: f64,
    pub distance: f64,
}

impl RegionMatch {
    fn miss(polar: Polar) -> Self {
        Self {
            cavity: None,
            ring: None,
            sector: None,
            angle: polar.angle,
            distance: polar.distance,
        }
    }

    pub fn is_miss(&self) -> bool {
        self.cavity.is_none() && self.ring.is_none() && self.sector.is_none()
    }

    pub fn has(&self, kind: RegionKind) -> bool {
        match kind {
            RegionKind::Cavity => self.cavity.is_some(),
            RegionKind::Ring => self.ring.is_some(),
            RegionKind::Sector => self.sector.is_some(),
        }
    }

    /// The most specific region hit, following `priority`.
    pub fn primary(&self, priority: &[RegionKind]) -> Option<RegionKind> {
        priority.iter().copied().find(|kind| self.has(*kind))
    }

    /// Whole degrees in `0..360`.
    pub fn rounded_angle(&self) -> u32 {
        (self.angle.round() as u32) % 360
    }

    pub fn rounded_distance(&self) -> u32 {
        self.distance.round() as u32
    }
}

enum Hit {
    Cavity { label: String, exclusive: bool },
    Ring(String),
    Sector(u32),
}

// Sub-nanodegree noise from atan2 would otherwise push axis-aligned clicks
// off their band boundary.
fn snap(value: f64) -> f64 {
    (value * 1e9).round() / 1e9
}

pub fn polar(center: Point, point: Point) -> Polar {
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    let distance = snap(dx.hypot(dy));
    if distance == 0.0 {
        return Polar {
            distance: 0.0,
            angle: 0.0,
        };
    }
    let mut angle = snap(dy.atan2(dx).to_degrees() + 90.0);
    if angle < 0.0 {
        angle += 360.0;
    }
    if angle >= 360.0 {
        angle -= 360.0;
    }
    Polar { distance, angle }
}

/// Classify a point in diagram space. Returns `None` only for non-finite
/// input; a click on nothing is a [`RegionMatch`] with every band unset.
pub fn resolve(point: Point, layout: &DiagramLayout) -> Option<RegionMatch> {
    if !point.is_finite() {
        return None;
    }
    let polar = polar(layout.center, point);
    let mut found = RegionMatch::miss(polar);
    if polar.distance == 0.0 {
        return Some(found);
    }
    for kind in &layout.priority {
        match classify(*kind, point, polar, layout) {
            Some(Hit::Cavity { label, exclusive }) => {
                found.cavity = Some(label);
                if exclusive {
                    break;
                }
            }
            Some(Hit::Ring(label)) => found.ring = Some(label),
            Some(Hit::Sector(clock)) => found.sector = Some(clock),
            None => {}
        }
    }
    Some(found)
}

fn classify(kind: RegionKind, point: Point, polar: Polar, layout: &DiagramLayout) -> Option<Hit> {
    match kind {
        RegionKind::Cavity => layout
            .cavities
            .iter()
            .find(|cavity| cavity_contains(cavity, point, polar))
            .map(|cavity| Hit::Cavity {
                label: cavity.label.clone(),
                exclusive: cavity.exclusive,
            }),
        RegionKind::Ring => layout
            .rings
            .iter()
            .find(|ring| ring.contains(polar.distance))
            .map(|ring| Hit::Ring(ring.label.clone())),
        RegionKind::Sector => {
            if polar.distance >= layout.outer_radius() {
                return None;
            }
            layout
                .sectors
                .iter()
                .find(|sector| sector.contains(polar.angle))
                .map(|sector| Hit::Sector(sector.clock))
        }
    }
}

fn cavity_contains(cavity: &CavityRegion, point: Point, polar: Polar) -> bool {
    match &cavity.shape {
        CavityShape::Polygon { points } => point_in_polygon(point, points),
        CavityShape::Annular {
            inner,
            outer,
            start,
            end,
        } => {
            polar.distance >= *inner
                && polar.distance < *outer
                && angle_in_range(polar.angle, *start, *end)
        }
    }
}

pub(crate) fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        let intersect = ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y + f64::EPSILON) + pi.x);
        if intersect {
            inside = !inside;
        }
        j = i;
    }
    inside
}
