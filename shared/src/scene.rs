//! Backend-agnostic draw list for the diagram. Angles use the layout
//! convention (degrees clockwise from 12 o'clock).

use crate::layout::{CavityShape, DiagramLayout};
use crate::picker::{PendingSelection, StepMark};
use crate::Point;

const HIGHLIGHT_FILL: &str = "rgba(255, 215, 0, 0.35)";
const HIGHLIGHT_STROKE: &str = "rgba(255, 215, 0, 0.9)";
const MARKER_FILL: &str = "rgba(255, 0, 0, 0.7)";
const MARKER_RADIUS: f64 = 5.0;
const LABEL_FONT: &str = "bold 20px Arial";

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear {
        width: f64,
        height: f64,
        fill: String,
    },
    /// Ring between `inner` and `outer`; a zero inner radius is a disc.
    Annulus {
        center: Point,
        inner: f64,
        outer: f64,
        fill: String,
    },
    Wedge {
        center: Point,
        inner: f64,
        outer: f64,
        start: f64,
        end: f64,
        fill: String,
        stroke: Option<String>,
    },
    Polygon {
        points: Vec<Point>,
        fill: String,
        stroke: Option<String>,
    },
    Line {
        from: Point,
        to: Point,
        color: String,
        width: f64,
    },
    Text {
        at: Point,
        text: String,
        font: String,
        color: String,
    },
    Marker {
        at: Point,
        radius: f64,
        fill: String,
        stroke: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub commands: Vec<DrawCommand>,
}

pub(crate) fn point_at(center: Point, distance: f64, angle: f64) -> Point {
    let radians = (angle - 90.0).to_radians();
    Point::new(
        center.x + distance * radians.cos(),
        center.y + distance * radians.sin(),
    )
}

pub fn build_scene(layout: &DiagramLayout, pending: &PendingSelection, marks: &[StepMark]) -> Scene {
    let mut commands = vec![DrawCommand::Clear {
        width: layout.width,
        height: layout.height,
        fill: layout.background.clone(),
    }];
    let center = layout.center;

    for ring in layout.rings.iter().rev() {
        commands.push(DrawCommand::Annulus {
            center,
            inner: ring.inner,
            outer: ring.outer,
            fill: ring.fill.clone(),
        });
    }
    for ring in layout.rings.iter().filter(|ring| ring.divided) {
        for sector in &layout.sectors {
            commands.push(DrawCommand::Line {
                from: point_at(center, ring.inner, sector.start),
                to: point_at(center, ring.outer, sector.start),
                color: "#000000".into(),
                width: 1.5,
            });
        }
    }

    if let Some(label) = &pending.ring {
        if let Some(ring) = layout.rings.iter().find(|ring| &ring.label == label) {
            commands.push(DrawCommand::Annulus {
                center,
                inner: ring.inner,
                outer: ring.outer,
                fill: HIGHLIGHT_FILL.into(),
            });
        }
    }
    if let Some(clock) = pending.sector {
        if let Some(sector) = layout.sectors.iter().find(|sector| sector.clock == clock) {
            commands.push(DrawCommand::Wedge {
                center,
                inner: 0.0,
                outer: layout.outer_radius(),
                start: sector.start,
                end: sector.end,
                fill: HIGHLIGHT_FILL.into(),
                stroke: Some(HIGHLIGHT_STROKE.into()),
            });
        }
    }
    for cavity in &layout.cavities {
        let selected = pending.cavity.as_deref() == Some(cavity.label.as_str());
        let fill = if selected {
            HIGHLIGHT_FILL.to_string()
        } else {
            "rgba(255, 255, 255, 0.12)".to_string()
        };
        let stroke = Some(if selected {
            HIGHLIGHT_STROKE.to_string()
        } else {
            "rgba(0, 0, 0, 0.6)".to_string()
        });
        commands.push(match &cavity.shape {
            CavityShape::Polygon { points } => DrawCommand::Polygon {
                points: points.clone(),
                fill,
                stroke,
            },
            CavityShape::Annular {
                inner,
                outer,
                start,
                end,
            } => DrawCommand::Wedge {
                center,
                inner: *inner,
                outer: *outer,
                start: *start,
                end: *end,
                fill,
                stroke,
            },
        });
    }

    for sector in &layout.sectors {
        commands.push(DrawCommand::Text {
            at: point_at(center, layout.clock_label_radius, sector.end),
            text: sector.clock.to_string(),
            font: LABEL_FONT.into(),
            color: "#000000".into(),
        });
    }
    for mark in marks {
        commands.push(DrawCommand::Marker {
            at: mark.point,
            radius: MARKER_RADIUS,
            fill: MARKER_FILL.into(),
            stroke: "#FFFFFF".into(),
        });
    }

    Scene { commands }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Step;

    fn count(scene: &Scene, predicate: impl Fn(&DrawCommand) -> bool) -> usize {
        scene.commands.iter().filter(|command| predicate(command)).count()
    }

    #[test]
    fn idle_scene_draws_rings_spokes_and_labels() {
        let layout = DiagramLayout::standard();
        let scene = build_scene(&layout, &PendingSelection::default(), &[]);
        assert!(matches!(scene.commands[0], DrawCommand::Clear { .. }));
        assert_eq!(
            count(&scene, |command| matches!(command, DrawCommand::Annulus { .. })),
            6
        );
        // Two divided rings, twelve boundaries each.
        assert_eq!(
            count(&scene, |command| matches!(command, DrawCommand::Line { .. })),
            24
        );
        assert_eq!(
            count(&scene, |command| matches!(command, DrawCommand::Text { .. })),
            12
        );
        assert_eq!(
            count(&scene, |command| matches!(command, DrawCommand::Marker { .. })),
            0
        );
    }

    #[test]
    fn rings_are_painted_outside_in() {
        let layout = DiagramLayout::standard();
        let scene = build_scene(&layout, &PendingSelection::default(), &[]);
        let outers: Vec<f64> = scene
            .commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Annulus { outer, .. } => Some(*outer),
                _ => None,
            })
            .collect();
        assert_eq!(outers, vec![240.0, 230.0, 170.0, 140.0, 35.0, 25.0]);
    }

    #[test]
    fn twelve_label_sits_at_noon() {
        let layout = DiagramLayout::standard();
        let scene = build_scene(&layout, &PendingSelection::default(), &[]);
        let twelve = scene
            .commands
            .iter()
            .find_map(|command| match command {
                DrawCommand::Text { at, text, .. } if text == "12" => Some(*at),
                _ => None,
            })
            .unwrap();
        assert!((twelve.x - 250.0).abs() < 1e-9);
        assert!((twelve.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn pending_selection_is_highlighted() {
        let layout = DiagramLayout::standard();
        let pending = PendingSelection {
            ring: Some("Outer".into()),
            sector: Some(3),
            ..PendingSelection::default()
        };
        let marks = [StepMark {
            step: Step::Clock,
            point: Point::new(400.0, 200.0),
            angle: 72,
            distance: 158,
        }];
        let scene = build_scene(&layout, &pending, &marks);
        let wedge = scene.commands.iter().find_map(|command| match command {
            DrawCommand::Wedge { start, end, .. } => Some((*start, *end)),
            _ => None,
        });
        assert_eq!(wedge, Some((60.0, 90.0)));
        assert_eq!(
            count(&scene, |command| matches!(command, DrawCommand::Annulus { .. })),
            7
        );
        assert!(matches!(
            scene.commands.last(),
            Some(DrawCommand::Marker { .. })
        ));
    }
}
