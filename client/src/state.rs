use std::sync::Arc;

use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use defectlog_shared::{DiagramBridge, DiagramLayout, LayoutError, Phase, Step};

use crate::render::draw_scene;

pub const DIAGRAM_KEY: &str = "circle_diagram";

pub struct State {
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
    pub bridge: DiagramBridge,
    pub total: u64,
}

impl State {
    pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        let mut state = Self {
            canvas,
            ctx,
            bridge: DiagramBridge::new(Arc::new(DiagramLayout::standard())),
            total: 0,
        };
        state.resize_to_layout();
        state
    }

    pub fn layout(&self) -> &DiagramLayout {
        self.bridge.layout()
    }

    pub fn set_layout(&mut self, layout: DiagramLayout) -> Result<(), LayoutError> {
        self.bridge.set_layout(Arc::new(layout))?;
        self.resize_to_layout();
        Ok(())
    }

    fn resize_to_layout(&mut self) {
        let (width, height) = (self.layout().width, self.layout().height);
        self.canvas.set_width(width.round() as u32);
        self.canvas.set_height(height.round() as u32);
    }

    pub fn current_step(&mut self) -> Step {
        self.bridge.widget(DIAGRAM_KEY).picker().current_step()
    }

    pub fn is_idle(&mut self) -> bool {
        self.bridge.widget(DIAGRAM_KEY).phase() == Phase::Idle
    }

    pub fn typed_cavity(&self) -> bool {
        self.layout().cavities.is_empty()
    }

    pub fn redraw(&mut self) {
        let scene = self.bridge.scene(DIAGRAM_KEY);
        draw_scene(&self.ctx, &scene);
    }
}
