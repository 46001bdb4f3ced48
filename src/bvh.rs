//! Biovision Hierarchy (BVH) motion capture of the first tracked hand.
//!
//! The hierarchy is fixed by the first frame that has a hand: the palm is the
//! root and every finger is a chain of four joints. Each later frame in which
//! that same hand appears with the same fingers adds one motion row; other
//! frames are skipped. The motion section is written when the recorder exits.

use crate::controller::Controller;
use crate::listener::Listener;
use crate::math::{Matrix, RAD_TO_DEG, Vector};
use crate::types::{BoneType, FingerType, Hand};
use std::fmt::Write as _;
use std::io::Write;

/// Joint names used in the hierarchy, by [`BoneType`].
pub const JOINT_NAMES: [&str; 4] = ["Metacarpal", "Proximal", "Intermediate", "Distal"];

const ROOT_CHANNELS: &str = "CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation";
const JOINT_CHANNELS: &str = "CHANNELS 3 Zrotation Xrotation Yrotation";

pub struct BvhRecorder<W> {
    out: W,
    skeleton: Option<Skeleton>,
    rows: Vec<String>,
    timestamps: Vec<i64>,
}

/// Hand id and finger layout the written hierarchy was built from.
#[derive(Debug, Clone, PartialEq)]
struct Skeleton {
    hand_id: i32,
    fingers: Vec<FingerType>,
}

impl Skeleton {
    fn of(hand: &Hand) -> Self {
        Self {
            hand_id: hand.id,
            fingers: hand.fingers.iter().map(|f| f.finger_type).collect(),
        }
    }

    fn matches(&self, hand: &Hand) -> bool {
        hand.fingers.len() == self.fingers.len()
            && hand.fingers.iter().zip(&self.fingers).all(|(f, t)| f.finger_type == *t)
    }
}

impl<W: Write> BvhRecorder<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            skeleton: None,
            rows: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.rows.len()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            log::warn!("Failed to write BVH output: {}", e);
        }
    }
}

/// `HIERARCHY` section for the skeleton of `hand`.
pub fn hierarchy(hand: &Hand) -> String {
    let mut out = String::from("HIERARCHY\nROOT Hand\n{\n");
    let _ = writeln!(out, "\tOFFSET {}", offset(&Vector::ZERO));
    let _ = writeln!(out, "\t{}", ROOT_CHANNELS);

    for finger in &hand.fingers {
        let mut depth = 1;
        let mut parent_end = hand.palm_position;
        for bone_type in BoneType::ALL {
            let bone = finger.bone(bone_type);
            let tabs = "\t".repeat(depth);
            let _ = writeln!(
                out,
                "{tabs}JOINT {}_{}",
                finger.finger_type.name(),
                JOINT_NAMES[bone_type as usize]
            );
            let _ = writeln!(out, "{tabs}{{");
            let _ = writeln!(out, "{tabs}\tOFFSET {}", offset(&(bone.prev_joint - parent_end)));
            let _ = writeln!(out, "{tabs}\t{}", JOINT_CHANNELS);
            parent_end = bone.prev_joint;
            depth += 1;
        }

        let distal = finger.bone(BoneType::Distal);
        let tabs = "\t".repeat(depth);
        let _ = writeln!(out, "{tabs}End Site");
        let _ = writeln!(out, "{tabs}{{");
        let _ = writeln!(out, "{tabs}\tOFFSET {}", offset(&distal.extent()));
        let _ = writeln!(out, "{tabs}}}");

        while depth > 1 {
            depth -= 1;
            let _ = writeln!(out, "{}}}", "\t".repeat(depth));
        }
    }

    out.push_str("}\n");
    out
}

/// One `MOTION` row: root position, hand rotation, then three rotations per
/// bone relative to its parent.
pub fn motion_row(hand: &Hand) -> String {
    let mut values = vec![
        0.0,
        0.0,
        0.0,
        hand.yaw() * RAD_TO_DEG,
        hand.roll() * RAD_TO_DEG,
        hand.pitch() * RAD_TO_DEG,
    ];

    for finger in &hand.fingers {
        let mut parent: Matrix = hand.basis;
        for bone_type in BoneType::ALL {
            let basis = finger.bone(bone_type).basis;
            let local = basis * parent.rigid_inverse();
            values.extend(local.euler_zxy_deg());
            parent = basis;
        }
    }

    values
        .into_iter()
        .map(channel)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `MOTION` section. `frame_time` is in seconds.
pub fn motion(rows: &[String], frame_time: f64) -> String {
    let mut out = String::from("MOTION\n");
    let _ = writeln!(out, "Frames: {}", rows.len());
    let _ = writeln!(out, "Frame Time: {:.6}", frame_time);
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    out
}

/// Mean spacing of device timestamps (microseconds) in seconds.
pub fn mean_frame_time(timestamps: &[i64]) -> f64 {
    match (timestamps.first(), timestamps.last()) {
        (Some(first), Some(last)) if timestamps.len() > 1 => {
            (last - first) as f64 / (timestamps.len() - 1) as f64 / 1_000_000.0
        }
        _ => 0.0,
    }
}

fn offset(v: &Vector) -> String {
    format!("{} {} {}", channel(v.x), channel(v.y), channel(v.z))
}

fn channel(value: f32) -> String {
    // avoid printing "-0.0000"
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{:.4}", value)
}

impl<W: Write + Send> Listener for BvhRecorder<W> {
    fn on_frame(&mut self, controller: &Controller) {
        let Some(frame) = controller.frame(0) else {
            return;
        };
        if self.skeleton.is_none() {
            let Some(hand) = frame.hands.first() else {
                return;
            };
            log::info!("Recording hand {} from frame {}", hand.id, frame.id);
            let header = hierarchy(hand);
            self.write(&header);
            self.skeleton = Some(Skeleton::of(hand));
        }
        let Some(skeleton) = &self.skeleton else {
            return;
        };

        let Some(hand) = frame.hands.iter().find(|h| h.id == skeleton.hand_id) else {
            log::trace!("Frame {}: hand {} not tracked, skipped", frame.id, skeleton.hand_id);
            return;
        };
        if !skeleton.matches(hand) {
            log::warn!(
                "Frame {}: hand {} changed its fingers, skipped",
                frame.id,
                hand.id
            );
            return;
        }

        self.rows.push(motion_row(hand));
        self.timestamps.push(frame.timestamp);
    }

    fn on_exit(&mut self, _controller: &Controller) {
        if self.skeleton.is_none() {
            log::warn!("No hand was tracked, nothing to write");
            return;
        }
        let section = motion(&self.rows, mean_frame_time(&self.timestamps));
        self.write(&section);
        log::info!("Wrote {} BVH frames", self.rows.len());
    }
}
