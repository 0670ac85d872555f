//! The multi-step picking flow behind one diagram widget.
//!
//! Each step owns exactly one field of [`PendingSelection`]. Clicks go
//! through [`resolve`]; a click that does not satisfy the current step but
//! hits a region of an already-completed step overwrites that field in place
//! (highest layout priority first) without advancing. Fields of later steps
//! are never filled ahead of time.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::layout::{DiagramLayout, Step};
use crate::resolver::{resolve, RegionMatch};
use crate::{ClickResult, Point};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PendingSelection {
    pub cavity: Option<String>,
    pub ring: Option<String>,
    pub sector: Option<u32>,
    pub angle: Option<u32>,
    pub distance: Option<u32>,
    pub option: Option<String>,
    pub defect: Option<String>,
}

impl PendingSelection {
    pub fn is_empty(&self) -> bool {
        *self == PendingSelection::default()
    }

    pub fn is_set(&self, step: Step) -> bool {
        match step {
            Step::Cavity => self.cavity.is_some(),
            Step::Ring => self.ring.is_some(),
            Step::Clock => self.sector.is_some(),
            Step::Defect => self.defect.is_some(),
            Step::Location => self.option.is_some(),
        }
    }

    fn clear_step(&mut self, step: Step) {
        match step {
            Step::Cavity => self.cavity = None,
            Step::Ring => self.ring = None,
            Step::Clock => self.sector = None,
            Step::Defect => self.defect = None,
            Step::Location => self.option = None,
        }
    }

    fn snapshot(&self, timestamp: String) -> Option<ClickResult> {
        Some(ClickResult {
            defect: self.defect.clone()?,
            segment: self.sector?,
            distance: self.distance?,
            timestamp,
            cavity: self.cavity.clone()?,
            ring: self.ring.clone()?,
            angle: self.angle?,
            option: self.option.clone()?,
        })
    }
}

/// Where a geometric step was satisfied; drives the click markers and the
/// raw angle/distance of the result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepMark {
    pub step: Step,
    pub point: Point,
    pub angle: u32,
    pub distance: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Picking(Step),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PickerInput {
    Click(Point),
    Defect(String),
    Location(String),
    Cavity(String),
    Back,
    Reset,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    Ignored,
    Advanced { filled: Step, next: Step },
    Corrected(Step),
    SteppedBack(Step),
    Reset,
    Completed(ClickResult),
}

pub struct Picker {
    layout: Arc<DiagramLayout>,
    pending: PendingSelection,
    marks: Vec<StepMark>,
    cursor: usize,
}

impl Picker {
    pub fn new(layout: Arc<DiagramLayout>) -> Self {
        Self {
            layout,
            pending: PendingSelection::default(),
            marks: Vec::new(),
            cursor: 0,
        }
    }

    pub fn layout(&self) -> &DiagramLayout {
        &self.layout
    }

    pub fn pending(&self) -> &PendingSelection {
        &self.pending
    }

    pub fn marks(&self) -> &[StepMark] {
        &self.marks
    }

    pub fn phase(&self) -> Phase {
        if self.cursor == 0 && self.pending.is_empty() {
            Phase::Idle
        } else {
            Phase::Picking(self.current_step())
        }
    }

    pub fn current_step(&self) -> Step {
        self.layout.steps[self.cursor]
    }

    pub fn apply(&mut self, input: PickerInput) -> Transition {
        self.apply_at(input, Utc::now())
    }

    pub fn apply_at(&mut self, input: PickerInput, now: DateTime<Utc>) -> Transition {
        match input {
            PickerInput::Click(point) => self.accept_click(point, now),
            PickerInput::Defect(value) => self.accept_choice(Step::Defect, value, now),
            PickerInput::Location(value) => self.accept_choice(Step::Location, value, now),
            PickerInput::Cavity(value) => self.accept_choice(Step::Cavity, value, now),
            PickerInput::Back => self.step_back(),
            PickerInput::Reset => {
                self.reset();
                Transition::Reset
            }
        }
    }

    pub fn reset(&mut self) {
        self.pending = PendingSelection::default();
        self.marks.clear();
        self.cursor = 0;
    }

    fn completed_steps(&self) -> &[Step] {
        &self.layout.steps[..self.cursor]
    }

    fn accept_click(&mut self, point: Point, now: DateTime<Utc>) -> Transition {
        let Some(hit) = resolve(point, &self.layout) else {
            return Transition::Ignored;
        };
        let step = self.current_step();
        if step.region().is_some_and(|kind| hit.has(kind)) {
            self.fill_from_click(step, &hit, point);
            let mut transition = self.advance(step, now);
            while self.layout.single_click_geometry {
                let next = match &transition {
                    Transition::Advanced { next, .. } => *next,
                    _ => break,
                };
                if !next.region().is_some_and(|kind| hit.has(kind)) {
                    break;
                }
                self.fill_from_click(next, &hit, point);
                transition = self.advance(next, now);
            }
            return transition;
        }
        let layout = self.layout.clone();
        for kind in &layout.priority {
            let earlier = Step::for_region(*kind);
            if hit.has(*kind) && self.completed_steps().contains(&earlier) {
                self.fill_from_click(earlier, &hit, point);
                return Transition::Corrected(earlier);
            }
        }
        Transition::Ignored
    }

    fn fill_from_click(&mut self, step: Step, hit: &RegionMatch, point: Point) {
        match step {
            Step::Cavity => self.pending.cavity = hit.cavity.clone(),
            Step::Ring => self.pending.ring = hit.ring.clone(),
            Step::Clock => self.pending.sector = hit.sector,
            Step::Defect | Step::Location => return,
        }
        self.marks.retain(|mark| mark.step != step);
        self.marks.push(StepMark {
            step,
            point,
            angle: hit.rounded_angle(),
            distance: hit.rounded_distance(),
        });
        self.sync_raw();
    }

    fn accept_choice(&mut self, step: Step, value: String, now: DateTime<Utc>) -> Transition {
        let value = value.trim().to_string();
        let valid = match step {
            Step::Defect => self.layout.defect_types.contains(&value),
            Step::Location => self.layout.options.contains(&value),
            _ => !value.is_empty(),
        };
        if !valid {
            return Transition::Ignored;
        }
        let current = self.current_step();
        let earlier = self.completed_steps().contains(&step);
        if step != current && !earlier {
            return Transition::Ignored;
        }
        match step {
            Step::Defect => self.pending.defect = Some(value),
            Step::Location => self.pending.option = Some(value),
            _ => {
                self.pending.cavity = Some(value);
                self.marks.retain(|mark| mark.step != Step::Cavity);
                self.sync_raw();
            }
        }
        if step == current {
            self.advance(step, now)
        } else {
            Transition::Corrected(step)
        }
    }

    fn step_back(&mut self) -> Transition {
        if self.cursor == 0 {
            if self.pending.is_empty() {
                return Transition::Ignored;
            }
            self.reset();
            return Transition::Reset;
        }
        self.cursor -= 1;
        let step = self.current_step();
        self.pending.clear_step(step);
        self.marks.retain(|mark| mark.step != step);
        self.sync_raw();
        if self.cursor == 0 && self.pending.is_empty() {
            return Transition::Reset;
        }
        Transition::SteppedBack(step)
    }

    fn advance(&mut self, filled: Step, now: DateTime<Utc>) -> Transition {
        self.cursor += 1;
        if self.cursor < self.layout.steps.len() {
            return Transition::Advanced {
                filled,
                next: self.current_step(),
            };
        }
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        match self.pending.snapshot(timestamp) {
            Some(result) => {
                self.reset();
                Transition::Completed(result)
            }
            None => {
                // Only reachable with a layout that skipped validation.
                self.cursor -= 1;
                Transition::Ignored
            }
        }
    }

    /// The angle follows the clock click and the distance follows the ring
    /// click, so both agree with the fields they sit next to. A layout
    /// without one of those steps falls back to the latest mark.
    fn sync_raw(&mut self) {
        let latest = self.marks.last();
        let mark_for = |step: Step| {
            self.marks
                .iter()
                .find(|mark| mark.step == step)
                .or(latest)
        };
        self.pending.angle = mark_for(Step::Clock).map(|mark| mark.angle);
        self.pending.distance = mark_for(Step::Ring).map(|mark| mark.distance);
    }
}
