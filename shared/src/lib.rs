use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

mod bridge;
mod layout;
mod picker;
mod record;
mod resolver;
mod scene;

pub use bridge::{to_canvas_point, DiagramBridge, DiagramWidget, PointerSample};
pub use layout::{
    CavityRegion, CavityShape, DiagramLayout, LayoutError, RegionKind, RingBand, SectorBand, Step,
};
pub use picker::{PendingSelection, Phase, Picker, PickerInput, StepMark, Transition};
pub use record::{DefectRecord, SessionContext, SessionError, QUANTITY, RECORD_COLUMNS, SIGNATURE};
pub use resolver::{polar, resolve, Polar, RegionMatch};
pub use scene::{build_scene, DrawCommand, Scene};

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One completed interaction cycle of the diagram widget.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct ClickResult {
    pub defect: String,
    pub segment: u32,
    pub distance: u32,
    pub timestamp: String,
    pub cavity: String,
    pub ring: String,
    pub angle: u32,
    pub option: String,
}

impl ClickResult {
    pub fn summary(&self) -> String {
        format!(
            "Segment {} | {} | {} | {} | Cavity: {}",
            self.segment, self.ring, self.option, self.defect, self.cavity
        )
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "defect:log")]
    LogDefect {
        session: SessionContext,
        click: ClickResult,
    },
    #[serde(rename = "count")]
    CountRequest,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "welcome")]
    Welcome {
        layout: DiagramLayout,
        part_numbers: Vec<String>,
        defaults: SessionContext,
        total: u64,
    },
    #[serde(rename = "defect:logged")]
    Logged { id: i64, total: u64 },
    #[serde(rename = "defect:rejected")]
    Rejected { reason: String },
    #[serde(rename = "defect:failed")]
    Failed { message: String },
    #[serde(rename = "count")]
    Count { total: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_click() -> ClickResult {
        ClickResult {
            defect: "Cracks".into(),
            segment: 6,
            distance: 188,
            timestamp: "2026-10-14T08:30:00.000Z".into(),
            cavity: "3".into(),
            ring: "Outer".into(),
            angle: 171,
            option: "Inboard".into(),
        }
    }

    #[test]
    fn summary_lists_the_picked_fields() {
        assert_eq!(
            sample_click().summary(),
            "Segment 6 | Outer | Inboard | Cracks | Cavity: 3"
        );
    }

    #[test]
    fn click_result_json_uses_widget_field_names() {
        let value = serde_json::to_value(sample_click()).unwrap();
        assert_eq!(value["segment"], 6);
        assert_eq!(value["option"], "Inboard");
        assert_eq!(value["timestamp"], "2026-10-14T08:30:00.000Z");
    }

    #[test]
    fn client_message_is_tagged() {
        let message = ClientMessage::LogDefect {
            session: SessionContext::default(),
            click: sample_click(),
        };
        let text = serde_json::to_string(&message).unwrap();
        assert!(text.contains("\"type\":\"defect:log\""));
        let parsed: ClientMessage = serde_json::from_str(&text).unwrap();
        assert!(matches!(parsed, ClientMessage::LogDefect { .. }));
    }

    #[test]
    fn server_message_survives_bincode() {
        let message = ServerMessage::Welcome {
            layout: DiagramLayout::standard(),
            part_numbers: vec!["19.A956.04".into()],
            defaults: SessionContext::default(),
            total: 4,
        };
        let payload = bincode::encode_to_vec(&message, bincode::config::standard()).unwrap();
        let (decoded, _): (ServerMessage, usize) =
            bincode::decode_from_slice(&payload, bincode::config::standard()).unwrap();
        match decoded {
            ServerMessage::Welcome {
                layout,
                part_numbers,
                total,
                ..
            } => {
                assert_eq!(layout, DiagramLayout::standard());
                assert_eq!(part_numbers, vec!["19.A956.04".to_string()]);
                assert_eq!(total, 4);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
}
