//! Keyed diagram widgets for a host page.
//!
//! The host redraws whenever it likes; a completed result is handed out by
//! [`DiagramBridge::render_diagram`] exactly once and listeners registered with
//! [`DiagramBridge::subscribe`] fire once per completed cycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::layout::{DiagramLayout, LayoutError};
use crate::picker::{Phase, Picker, PickerInput, Transition};
use crate::scene::{build_scene, Scene};
use crate::{ClickResult, Point};

type Listener = Box<dyn FnMut(&str, &ClickResult)>;

/// Pointer position as reported by the browser, plus the element's box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    pub client_x: f64,
    pub client_y: f64,
    pub rect_left: f64,
    pub rect_top: f64,
    pub rect_width: f64,
    pub rect_height: f64,
}

/// Maps a pointer sample into canvas pixels, undoing any CSS scaling.
pub fn to_canvas_point(
    sample: PointerSample,
    canvas_width: f64,
    canvas_height: f64,
) -> Option<Point> {
    if sample.rect_width <= 0.0 || sample.rect_height <= 0.0 {
        return None;
    }
    let point = Point::new(
        (sample.client_x - sample.rect_left) * canvas_width / sample.rect_width,
        (sample.client_y - sample.rect_top) * canvas_height / sample.rect_height,
    );
    point.is_finite().then_some(point)
}

pub struct DiagramWidget {
    picker: Picker,
    latest: Option<ClickResult>,
    revision: u64,
    delivered: u64,
    clicks: u64,
}

impl DiagramWidget {
    fn new(layout: Arc<DiagramLayout>) -> Self {
        Self {
            picker: Picker::new(layout),
            latest: None,
            revision: 0,
            delivered: 0,
            clicks: 0,
        }
    }

    pub fn picker(&self) -> &Picker {
        &self.picker
    }

    pub fn phase(&self) -> Phase {
        self.picker.phase()
    }

    pub fn latest(&self) -> Option<&ClickResult> {
        self.latest.as_ref()
    }

    /// Completed cycles since the widget was created.
    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    pub fn scene(&self) -> Scene {
        build_scene(
            self.picker.layout(),
            self.picker.pending(),
            self.picker.marks(),
        )
    }
}

pub struct DiagramBridge {
    layout: Arc<DiagramLayout>,
    widgets: HashMap<String, DiagramWidget>,
    listeners: Vec<Listener>,
}

impl DiagramBridge {
    pub fn new(layout: Arc<DiagramLayout>) -> Self {
        Self {
            layout,
            widgets: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn layout(&self) -> &DiagramLayout {
        &self.layout
    }

    /// Replaces the layout. Every widget starts over; listeners stay.
    /// An invalid layout is refused and the current one kept.
    pub fn set_layout(&mut self, layout: Arc<DiagramLayout>) -> Result<(), LayoutError> {
        layout.validate()?;
        self.layout = layout;
        self.widgets.clear();
        Ok(())
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&str, &ClickResult) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// The widget for `key`, created on first use.
    pub fn widget(&mut self, key: &str) -> &mut DiagramWidget {
        let layout = self.layout.clone();
        self.widgets
            .entry(key.to_string())
            .or_insert_with(|| DiagramWidget::new(layout))
    }

    pub fn pointer(&mut self, key: &str, point: Point) -> Transition {
        self.dispatch(key, PickerInput::Click(point))
    }

    pub fn dispatch(&mut self, key: &str, input: PickerInput) -> Transition {
        self.dispatch_at(key, input, Utc::now())
    }

    pub fn dispatch_at(&mut self, key: &str, input: PickerInput, now: DateTime<Utc>) -> Transition {
        let widget = self.widget(key);
        let transition = widget.picker.apply_at(input, now);
        if let Transition::Completed(result) = &transition {
            widget.latest = Some(result.clone());
            widget.revision += 1;
            widget.clicks += 1;
            for listener in &mut self.listeners {
                listener(key, result);
            }
        }
        transition
    }

    /// The newest completed result, the first time it is asked for.
    pub fn render_diagram(&mut self, key: &str) -> Option<ClickResult> {
        let widget = self.widget(key);
        if widget.delivered == widget.revision {
            return None;
        }
        widget.delivered = widget.revision;
        widget.latest.clone()
    }

    pub fn latest(&self, key: &str) -> Option<&ClickResult> {
        self.widgets.get(key).and_then(DiagramWidget::latest)
    }

    pub fn scene(&mut self, key: &str) -> Scene {
        self.widget(key).scene()
    }

    pub fn reset(&mut self, key: &str) -> Transition {
        self.dispatch(key, PickerInput::Reset)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::TimeZone;

    use super::*;
    use crate::layout::Step;
    use crate::scene::DrawCommand;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 9, 15, 0).unwrap()
    }

    fn at(distance: f64, angle: f64) -> Point {
        let radians = (angle - 90.0).to_radians();
        Point::new(250.0 + distance * radians.cos(), 250.0 + distance * radians.sin())
    }

    /// Clock → ring → location → defect → cavity on the standard layout.
    fn complete(bridge: &mut DiagramBridge, key: &str) -> Transition {
        bridge.dispatch_at(key, PickerInput::Click(at(200.0, 75.0)), now());
        bridge.dispatch_at(key, PickerInput::Click(at(200.0, 75.0)), now());
        bridge.dispatch_at(key, PickerInput::Location("Inboard".into()), now());
        bridge.dispatch_at(key, PickerInput::Defect("Pinholes".into()), now());
        bridge.dispatch_at(key, PickerInput::Cavity("4".into()), now())
    }

    fn bridge() -> DiagramBridge {
        DiagramBridge::new(Arc::new(DiagramLayout::standard()))
    }

    #[test]
    fn completed_cycle_is_rendered_once() {
        let mut bridge = bridge();
        assert_eq!(bridge.render_diagram("main"), None);
        let transition = complete(&mut bridge, "main");
        let Transition::Completed(result) = transition else {
            panic!("expected completion, got {transition:?}");
        };
        assert_eq!(result.segment, 3);
        assert_eq!(result.ring, "Outer");
        assert_eq!(result.cavity, "4");
        assert_eq!(result.timestamp, "2026-10-14T09:15:00.000Z");
        assert_eq!(bridge.render_diagram("main"), Some(result.clone()));
        assert_eq!(bridge.render_diagram("main"), None);
        assert_eq!(bridge.latest("main"), Some(&result));
    }

    #[test]
    fn listeners_fire_once_per_cycle() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bridge = bridge();
        let sink = seen.clone();
        bridge.subscribe(move |key, result| sink.borrow_mut().push((key.to_string(), result.angle)));
        complete(&mut bridge, "main");
        bridge.render_diagram("main");
        bridge.render_diagram("main");
        assert_eq!(seen.borrow().as_slice(), &[("main".to_string(), 75)]);
        complete(&mut bridge, "main");
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(bridge.widget("main").clicks(), 2);
    }

    #[test]
    fn widgets_are_independent_per_key() {
        let mut bridge = bridge();
        bridge.pointer("left", at(200.0, 75.0));
        assert!(matches!(bridge.widget("left").phase(), Phase::Picking(_)));
        assert_eq!(bridge.widget("right").phase(), Phase::Idle);
        complete(&mut bridge, "right");
        assert!(bridge.latest("left").is_none());
        assert!(bridge.latest("right").is_some());
        assert_eq!(bridge.render_diagram("left"), None);
    }

    #[test]
    fn reset_discards_progress_without_emitting() {
        let fired = Rc::new(RefCell::new(0));
        let mut bridge = bridge();
        let counter = fired.clone();
        bridge.subscribe(move |_, _| *counter.borrow_mut() += 1);
        bridge.pointer("main", at(200.0, 75.0));
        assert_eq!(bridge.reset("main"), Transition::Reset);
        assert_eq!(bridge.widget("main").phase(), Phase::Idle);
        assert_eq!(*fired.borrow(), 0);
        assert_eq!(bridge.render_diagram("main"), None);
    }

    #[test]
    fn new_layout_restarts_widgets_and_keeps_listeners() {
        let fired = Rc::new(RefCell::new(0));
        let mut bridge = bridge();
        let counter = fired.clone();
        bridge.subscribe(move |_, _| *counter.borrow_mut() += 1);
        bridge.pointer("main", at(200.0, 75.0));
        let mut layout = DiagramLayout::standard();
        layout.background = "#ffffff".into();
        assert_eq!(bridge.set_layout(Arc::new(layout)), Ok(()));
        assert_eq!(bridge.widget("main").phase(), Phase::Idle);
        assert_eq!(bridge.layout().background, "#ffffff");
        complete(&mut bridge, "main");
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn scene_shows_markers_for_pending_clicks() {
        let mut bridge = bridge();
        bridge.pointer("main", at(200.0, 75.0));
        let markers = bridge
            .scene("main")
            .commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Marker { .. }))
            .count();
        assert_eq!(markers, 1);
    }

    #[test]
    fn pointer_samples_are_scaled_into_canvas_space() {
        let sample = PointerSample {
            client_x: 160.0,
            client_y: 60.0,
            rect_left: 10.0,
            rect_top: 10.0,
            rect_width: 250.0,
            rect_height: 250.0,
        };
        assert_eq!(to_canvas_point(sample, 500.0, 500.0), Some(Point::new(300.0, 100.0)));
        let collapsed = PointerSample {
            rect_width: 0.0,
            ..sample
        };
        assert_eq!(to_canvas_point(collapsed, 500.0, 500.0), None);
    }

    #[test]
    fn invalid_layout_is_refused_and_widgets_survive() {
        let mut bridge = bridge();
        bridge.pointer("main", at(200.0, 75.0));
        let mut layout = DiagramLayout::standard();
        layout.steps.clear();
        layout.background = "#123456".into();
        assert_eq!(
            bridge.set_layout(Arc::new(layout)),
            Err(LayoutError::StepOrder(Step::Cavity))
        );
        assert_ne!(bridge.layout().background, "#123456");
        assert_eq!(bridge.widget("main").phase(), Phase::Picking(Step::Ring));
    }
}
