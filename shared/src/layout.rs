//! Static geometry and vocabularies of the casting diagram.
//!
//! Angles are degrees measured clockwise from 12 o'clock in canvas space
//! (y grows downwards). Every band is half-open: `[inner, outer)` for rings,
//! `[start, end)` for sectors, wrapping through 360 when `start > end`.

use std::collections::HashSet;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Point;

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Cavity,
    Ring,
    Sector,
}

/// One step of the picking flow.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Cavity,
    Ring,
    Clock,
    Defect,
    Location,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Cavity,
        Step::Ring,
        Step::Clock,
        Step::Defect,
        Step::Location,
    ];

    /// The diagram region that can satisfy this step, if any.
    pub fn region(self) -> Option<RegionKind> {
        match self {
            Step::Cavity => Some(RegionKind::Cavity),
            Step::Ring => Some(RegionKind::Ring),
            Step::Clock => Some(RegionKind::Sector),
            Step::Defect | Step::Location => None,
        }
    }

    pub fn for_region(kind: RegionKind) -> Step {
        match kind {
            RegionKind::Cavity => Step::Cavity,
            RegionKind::Ring => Step::Ring,
            RegionKind::Sector => Step::Clock,
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Step::Cavity => "Enter or click the casting cavity",
            Step::Ring => "Click the ring",
            Step::Clock => "Click the clock position",
            Step::Defect => "Select the defect type",
            Step::Location => "Select Inboard or Outboard",
        }
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct RingBand {
    pub label: String,
    pub inner: f64,
    pub outer: f64,
    pub fill: String,
    /// Draw sector boundaries across this band.
    #[serde(default)]
    pub divided: bool,
}

impl RingBand {
    pub fn new(label: &str, inner: f64, outer: f64, fill: &str) -> Self {
        Self {
            label: label.to_string(),
            inner,
            outer,
            fill: fill.to_string(),
            divided: false,
        }
    }

    pub fn divided(mut self) -> Self {
        self.divided = true;
        self
    }

    pub fn contains(&self, distance: f64) -> bool {
        distance >= self.inner && distance < self.outer
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct SectorBand {
    pub clock: u32,
    pub start: f64,
    pub end: f64,
}

impl SectorBand {
    /// `count` equal sectors starting at `offset` degrees, numbered from 1.
    pub fn equal_divisions(count: u32, offset: f64) -> Vec<SectorBand> {
        let width = 360.0 / count as f64;
        (0..count)
            .map(|index| SectorBand {
                clock: index + 1,
                start: normalize_degrees(offset + index as f64 * width),
                end: normalize_degrees(offset + (index + 1) as f64 * width),
            })
            .collect()
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle_in_range(angle, self.start, self.end)
    }

    pub fn span(&self) -> f64 {
        let span = self.end - self.start;
        if span <= 0.0 {
            span + 360.0
        } else {
            span
        }
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CavityShape {
    Polygon {
        points: Vec<Point>,
    },
    Annular {
        inner: f64,
        outer: f64,
        start: f64,
        end: f64,
    },
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct CavityRegion {
    pub label: String,
    pub shape: CavityShape,
    /// A hit on this region hides the lower-priority bands underneath it.
    #[serde(default)]
    pub exclusive: bool,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct DiagramLayout {
    pub width: f64,
    pub height: f64,
    pub center: Point,
    pub background: String,
    pub rings: Vec<RingBand>,
    pub sectors: Vec<SectorBand>,
    #[serde(default)]
    pub cavities: Vec<CavityRegion>,
    pub clock_label_radius: f64,
    pub defect_types: Vec<String>,
    pub options: Vec<String>,
    pub steps: Vec<Step>,
    pub priority: Vec<RegionKind>,
    /// Lets one click settle every consecutive geometric step it hits.
    #[serde(default)]
    pub single_click_geometry: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("layout has no ring bands")]
    NoRings,
    #[error("layout has no sectors")]
    NoSectors,
    #[error("ring {0:?} must have 0 <= inner < outer")]
    InvalidRing(String),
    #[error("ring {0:?} overlaps the ring inside it")]
    OverlappingRings(String),
    #[error("sector {0} has an invalid angular range")]
    InvalidSector(u32),
    #[error("sectors {0} and {1} overlap")]
    OverlappingSectors(u32, u32),
    #[error("cavity {0:?} has an invalid shape")]
    InvalidCavity(String),
    #[error("duplicate label {0:?}")]
    DuplicateLabel(String),
    #[error("vocabulary {0} is empty")]
    EmptyVocabulary(&'static str),
    #[error("step {0:?} must appear exactly once")]
    StepOrder(Step),
    #[error("region {0:?} must appear exactly once in the priority order")]
    Priority(RegionKind),
    #[error("diagram center must be finite")]
    InvalidCenter,
    #[error("failed to parse layout: {0}")]
    Parse(String),
}

const DEFECT_TYPES: [&str; 18] = [
    "Drop in Mold",
    "Stains",
    "Marking NOK",
    "Burns",
    "Crush",
    "Other",
    "Lack of Materials",
    "Mismatch",
    "Pilot Crush",
    "Drum Thickness",
    "Cracks",
    "Short Pours",
    "Stickers",
    "Damage",
    "Core Set",
    "Inclusion (sand)",
    "Heavy Dry Core",
    "Pinholes",
];

impl Default for DiagramLayout {
    fn default() -> Self {
        Self::standard()
    }
}

impl DiagramLayout {
    /// The disc casting diagram: a 500px canvas, six rings and twelve clock
    /// sectors with sector 1 spanning 12 o'clock to 1 o'clock.
    pub fn standard() -> Self {
        Self {
            width: 500.0,
            height: 500.0,
            center: Point::new(250.0, 250.0),
            background: "#e8e8e8".into(),
            rings: vec![
                RingBand::new("Center", 0.0, 25.0, "#FFFFFF"),
                RingBand::new("CenterRing", 25.0, 35.0, "#00CED1"),
                RingBand::new("Inner", 35.0, 140.0, "#808080").divided(),
                RingBand::new("Middle", 140.0, 170.0, "#9370DB"),
                RingBand::new("Outer", 170.0, 230.0, "#87CEEB").divided(),
                RingBand::new("Border", 230.0, 240.0, "#000000"),
            ],
            sectors: SectorBand::equal_divisions(12, 0.0),
            cavities: Vec::new(),
            clock_label_radius: 200.0,
            defect_types: DEFECT_TYPES.iter().map(|value| value.to_string()).collect(),
            options: vec!["Inboard".into(), "Outboard".into()],
            steps: vec![
                Step::Clock,
                Step::Ring,
                Step::Location,
                Step::Defect,
                Step::Cavity,
            ],
            priority: vec![RegionKind::Cavity, RegionKind::Ring, RegionKind::Sector],
            single_click_geometry: false,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, LayoutError> {
        let layout: DiagramLayout =
            serde_json::from_str(text).map_err(|err| LayoutError::Parse(err.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Outer radius of the outermost ring; nothing beyond it is classified.
    pub fn outer_radius(&self) -> f64 {
        self.rings.last().map(|ring| ring.outer).unwrap_or(0.0)
    }

    pub fn has_step(&self, step: Step) -> bool {
        self.steps.contains(&step)
    }

    pub fn cavity(&self, label: &str) -> Option<&CavityRegion> {
        self.cavities.iter().find(|cavity| cavity.label == label)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if !self.center.is_finite() {
            return Err(LayoutError::InvalidCenter);
        }
        self.validate_rings()?;
        self.validate_sectors()?;
        self.validate_cavities()?;
        if self.defect_types.is_empty() {
            return Err(LayoutError::EmptyVocabulary("defect_types"));
        }
        if self.options.is_empty() {
            return Err(LayoutError::EmptyVocabulary("options"));
        }
        for step in Step::ALL {
            if self.steps.iter().filter(|item| **item == step).count() != 1 {
                return Err(LayoutError::StepOrder(step));
            }
        }
        for kind in [RegionKind::Cavity, RegionKind::Ring, RegionKind::Sector] {
            if self.priority.iter().filter(|item| **item == kind).count() != 1 {
                return Err(LayoutError::Priority(kind));
            }
        }
        Ok(())
    }

    fn validate_rings(&self) -> Result<(), LayoutError> {
        if self.rings.is_empty() {
            return Err(LayoutError::NoRings);
        }
        let mut labels = HashSet::new();
        let mut previous_outer = 0.0;
        for ring in &self.rings {
            if !(ring.inner >= 0.0 && ring.inner < ring.outer && ring.outer.is_finite()) {
                return Err(LayoutError::InvalidRing(ring.label.clone()));
            }
            if ring.inner < previous_outer {
                return Err(LayoutError::OverlappingRings(ring.label.clone()));
            }
            if !labels.insert(ring.label.as_str()) {
                return Err(LayoutError::DuplicateLabel(ring.label.clone()));
            }
            previous_outer = ring.outer;
        }
        Ok(())
    }

    fn validate_sectors(&self) -> Result<(), LayoutError> {
        if self.sectors.is_empty() {
            return Err(LayoutError::NoSectors);
        }
        let mut clocks = HashSet::new();
        let mut total = 0.0;
        for sector in &self.sectors {
            let in_range = |value: f64| (0.0..=360.0).contains(&value);
            if !(in_range(sector.start) && in_range(sector.end))
                || normalize_degrees(sector.start) == normalize_degrees(sector.end)
            {
                return Err(LayoutError::InvalidSector(sector.clock));
            }
            if !clocks.insert(sector.clock) {
                return Err(LayoutError::DuplicateLabel(sector.clock.to_string()));
            }
            total += sector.span();
        }
        for (index, first) in self.sectors.iter().enumerate() {
            for second in &self.sectors[index + 1..] {
                if second.contains(normalize_degrees(first.start))
                    || first.contains(normalize_degrees(second.start))
                {
                    return Err(LayoutError::OverlappingSectors(first.clock, second.clock));
                }
            }
        }
        if total > 360.0 + 1e-6 {
            let last = &self.sectors[self.sectors.len() - 1];
            return Err(LayoutError::OverlappingSectors(self.sectors[0].clock, last.clock));
        }
        Ok(())
    }

    fn validate_cavities(&self) -> Result<(), LayoutError> {
        let mut labels = HashSet::new();
        for cavity in &self.cavities {
            let valid = match &cavity.shape {
                CavityShape::Polygon { points } => {
                    points.len() >= 3 && points.iter().all(|point| point.is_finite())
                }
                CavityShape::Annular {
                    inner,
                    outer,
                    start,
                    end,
                } => {
                    *inner >= 0.0
                        && inner < outer
                        && normalize_degrees(*start) != normalize_degrees(*end)
                }
            };
            if !valid || cavity.label.trim().is_empty() {
                return Err(LayoutError::InvalidCavity(cavity.label.clone()));
            }
            if !labels.insert(cavity.label.as_str()) {
                return Err(LayoutError::DuplicateLabel(cavity.label.clone()));
            }
        }
        Ok(())
    }
}

pub(crate) fn normalize_degrees(value: f64) -> f64 {
    let wrapped = value.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

pub(crate) fn angle_in_range(angle: f64, start: f64, end: f64) -> bool {
    let start = normalize_degrees(start);
    let end = normalize_degrees(end);
    if start < end {
        angle >= start && angle < end
    } else {
        angle >= start || angle < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_is_valid() {
        let layout = DiagramLayout::standard();
        assert_eq!(layout.validate(), Ok(()));
        assert_eq!(layout.outer_radius(), 240.0);
        assert_eq!(layout.sectors.len(), 12);
        assert_eq!(layout.defect_types.len(), 18);
    }

    #[test]
    fn equal_divisions_wrap_past_north() {
        let sectors = SectorBand::equal_divisions(4, 45.0);
        assert_eq!(sectors[3].start, 315.0);
        assert_eq!(sectors[3].end, 45.0);
        assert!(sectors[3].contains(0.0));
        assert!(sectors[3].contains(315.0));
        assert!(!sectors[3].contains(45.0));
        assert_eq!(sectors[3].span(), 90.0);
    }

    #[test]
    fn twelve_sectors_put_sector_one_after_noon() {
        let sectors = SectorBand::equal_divisions(12, 0.0);
        assert_eq!(sectors[0].clock, 1);
        assert_eq!((sectors[0].start, sectors[0].end), (0.0, 30.0));
        assert_eq!(sectors[11].end, 0.0);
        assert!(sectors[11].contains(359.9));
    }

    #[test]
    fn overlapping_rings_are_rejected() {
        let mut layout = DiagramLayout::standard();
        layout.rings[2].inner = 30.0;
        assert_eq!(
            layout.validate(),
            Err(LayoutError::OverlappingRings("Inner".into()))
        );
    }

    #[test]
    fn overlapping_sectors_are_rejected() {
        let mut layout = DiagramLayout::standard();
        layout.sectors[1].start = 15.0;
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::OverlappingSectors(_, _))
        ));
    }

    #[test]
    fn every_step_must_appear_once() {
        let mut layout = DiagramLayout::standard();
        layout.steps.pop();
        assert_eq!(layout.validate(), Err(LayoutError::StepOrder(Step::Cavity)));

        let mut layout = DiagramLayout::standard();
        layout.steps.push(Step::Ring);
        assert_eq!(layout.validate(), Err(LayoutError::StepOrder(Step::Ring)));
    }

    #[test]
    fn degenerate_cavity_is_rejected() {
        let mut layout = DiagramLayout::standard();
        layout.cavities.push(CavityRegion {
            label: "1".into(),
            shape: CavityShape::Polygon {
                points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
            },
            exclusive: false,
        });
        assert_eq!(layout.validate(), Err(LayoutError::InvalidCavity("1".into())));
    }

    #[test]
    fn layout_json_round_trips_through_validation() {
        let mut layout = DiagramLayout::standard();
        layout.cavities.push(CavityRegion {
            label: "2".into(),
            shape: CavityShape::Annular {
                inner: 35.0,
                outer: 140.0,
                start: 0.0,
                end: 90.0,
            },
            exclusive: true,
        });
        let text = serde_json::to_string(&layout).unwrap();
        assert!(text.contains("\"type\":\"annular\""));
        assert_eq!(DiagramLayout::from_json(&text), Ok(layout));
    }

    #[test]
    fn invalid_json_reports_parse_error() {
        assert!(matches!(
            DiagramLayout::from_json("{\"width\": 1}"),
            Err(LayoutError::Parse(_))
        ));
    }
}
