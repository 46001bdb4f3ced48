use crate::math::{Matrix, Vector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display names of the five fingers, indexed by [`FingerType`].
pub const FINGER_NAMES: [&str; 5] = ["Thumb", "Index", "Middle", "Ring", "Pinky"];

/// Display names of the four bones, indexed by [`BoneType`].
pub const BONE_NAMES: [&str; 4] = ["Metacarpal", "Proximal", "Middle", "Distal"];

/// One snapshot of everything tracked at a timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: i64,
    /// Device clock, microseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub hands: Vec<Hand>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub gestures: Vec<Gesture>,
}

impl Frame {
    /// Fingers of every hand, in hand order.
    pub fn fingers(&self) -> impl Iterator<Item = &Finger> {
        self.hands.iter().flat_map(|h| h.fingers.iter())
    }

    pub fn extended_finger_count(&self) -> usize {
        self.fingers().filter(|f| f.extended).count()
    }

    pub fn gesture(&self, id: i32) -> Option<&Gesture> {
        self.gestures.iter().find(|g| g.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub id: i32,
    #[serde(default)]
    pub is_left: bool,
    pub palm_position: Vector,
    pub palm_normal: Vector,
    pub direction: Vector,
    #[serde(default)]
    pub basis: Matrix,
    pub arm: Arm,
    #[serde(default)]
    pub fingers: Vec<Finger>,
}

impl Hand {
    pub fn pitch(&self) -> f32 {
        self.direction.pitch()
    }

    pub fn roll(&self) -> f32 {
        self.palm_normal.roll()
    }

    pub fn yaw(&self) -> f32 {
        self.direction.yaw()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Arm {
    pub direction: Vector,
    pub wrist_position: Vector,
    pub elbow_position: Vector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerType {
    Thumb = 0,
    Index = 1,
    Middle = 2,
    Ring = 3,
    Pinky = 4,
}

impl FingerType {
    pub fn name(self) -> &'static str {
        FINGER_NAMES[self as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoneType {
    Metacarpal = 0,
    Proximal = 1,
    Middle = 2,
    Distal = 3,
}

impl BoneType {
    pub const ALL: [BoneType; 4] = [
        BoneType::Metacarpal,
        BoneType::Proximal,
        BoneType::Middle,
        BoneType::Distal,
    ];

    pub fn name(self) -> &'static str {
        BONE_NAMES[self as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finger {
    pub id: i32,
    #[serde(rename = "type")]
    pub finger_type: FingerType,
    pub length: f32,
    pub width: f32,
    #[serde(default)]
    pub extended: bool,
    /// Metacarpal, proximal, middle, distal.
    pub bones: [Bone; 4],
}

impl Finger {
    pub fn bone(&self, bone_type: BoneType) -> &Bone {
        &self.bones[bone_type as usize]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub prev_joint: Vector,
    pub next_joint: Vector,
    pub direction: Vector,
    #[serde(default)]
    pub basis: Matrix,
}

impl Bone {
    /// Vector from the previous joint to the next one.
    pub fn extent(&self) -> Vector {
        self.next_joint - self.prev_joint
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: i32,
    pub tip_position: Vector,
    pub direction: Vector,
}

/// Lifecycle state of a gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureState {
    Start = 1,
    Update = 2,
    #[serde(alias = "stop")]
    End = 3,
    #[default]
    #[serde(other)]
    Invalid = 0,
}

impl GestureState {
    pub fn name(self) -> &'static str {
        match self {
            GestureState::Invalid => "STATE_INVALID",
            GestureState::Start => "STATE_START",
            GestureState::Update => "STATE_UPDATE",
            GestureState::End => "STATE_END",
        }
    }
}

/// A recognized motion pattern, stable by id while active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gesture {
    pub id: i32,
    #[serde(default)]
    pub state: GestureState,
    #[serde(flatten)]
    pub kind: GestureKind,
}

/// Kind-specific gesture payload, tagged by `"kind"` in recordings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureKind {
    Circle {
        /// Number of full turns so far.
        progress: f32,
        radius: f32,
        normal: Vector,
        /// Direction of the finger or tool drawing the circle.
        pointable_direction: Vector,
    },
    Swipe {
        direction: Vector,
        speed: f32,
    },
    KeyTap {
        position: Vector,
        direction: Vector,
    },
    ScreenTap {
        position: Vector,
        direction: Vector,
    },
    #[serde(other)]
    Unknown,
}

impl GestureKind {
    /// Flag used to enable this kind on the controller, `None` for unknown kinds.
    pub fn flag(&self) -> Option<GestureKinds> {
        match self {
            GestureKind::Circle { .. } => Some(GestureKinds::CIRCLE),
            GestureKind::Swipe { .. } => Some(GestureKinds::SWIPE),
            GestureKind::KeyTap { .. } => Some(GestureKinds::KEY_TAP),
            GestureKind::ScreenTap { .. } => Some(GestureKinds::SCREEN_TAP),
            GestureKind::Unknown => None,
        }
    }
}

bitflags::bitflags! {
    /// Gesture kinds the controller delivers to listeners.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GestureKinds: u32 {
        const CIRCLE     = 1 << 0;
        const SWIPE      = 1 << 1;
        const KEY_TAP    = 1 << 2;
        const SCREEN_TAP = 1 << 3;
    }
}

bitflags::bitflags! {
    /// Controller policy flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Policy: u32 {
        /// Keep delivering frames while the application does not have focus.
        const BACKGROUND_FRAMES = 1 << 0;
    }
}

/// A connected tracking device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub serial: String,
    #[serde(default)]
    pub streaming: bool,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device serial: {}", self.serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finger(id: i32, extended: bool) -> Finger {
        Finger {
            id,
            finger_type: FingerType::Index,
            length: 50.0,
            width: 18.0,
            extended,
            bones: [Bone::default(); 4],
        }
    }

    #[test]
    fn test_extended_fingers_span_all_hands() {
        let frame = Frame {
            hands: vec![
                Hand { id: 1, fingers: vec![finger(10, true), finger(11, false)], ..Default::default() },
                Hand { id: 2, fingers: vec![finger(20, true)], ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(frame.fingers().count(), 3);
        assert_eq!(frame.extended_finger_count(), 2);
    }

    #[test]
    fn test_unknown_gesture_kind_decodes() {
        let g: Gesture =
            serde_json::from_str(r#"{"id": 7, "state": "update", "kind": "pinch", "strength": 1}"#)
                .unwrap();
        assert_eq!(g.id, 7);
        assert_eq!(g.state, GestureState::Update);
        assert_eq!(g.kind, GestureKind::Unknown);
        assert_eq!(g.kind.flag(), None);
    }

    #[test]
    fn test_swipe_gesture_decodes() {
        let g: Gesture = serde_json::from_str(
            r#"{"id": 3, "state": "stop", "kind": "swipe", "direction": [1, 0, 0], "speed": 900.5}"#,
        )
        .unwrap();
        assert_eq!(g.state, GestureState::End);
        assert_eq!(
            g.kind,
            GestureKind::Swipe { direction: Vector::new(1.0, 0.0, 0.0), speed: 900.5 }
        );
    }

    #[test]
    fn test_unknown_state_decodes_as_invalid() {
        let g: Gesture = serde_json::from_str(
            r#"{"id": 1, "state": "weird", "kind": "swipe", "direction": [1, 0, 0], "speed": 1}"#,
        )
        .unwrap();
        assert_eq!(g.state, GestureState::Invalid);
        assert_eq!(g.state.name(), "STATE_INVALID");

        let g: Gesture =
            serde_json::from_str(r#"{"id": 2, "kind": "key_tap", "position": [0, 0, 0], "direction": [0, -1, 0]}"#)
                .unwrap();
        assert_eq!(g.state, GestureState::Invalid);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(GestureState::Start.name(), "STATE_START");
        assert_eq!(GestureState::End.name(), "STATE_END");
        assert_eq!(FingerType::Pinky.name(), "Pinky");
        assert_eq!(BoneType::Distal.name(), "Distal");
    }
}
