//! CSV frame reporter.
//!
//! Writes one CSV row per frame that has at least one hand, followed by one
//! indented line per gesture. A blank separator line follows the gesture
//! lines when there were any. Numbers are printed with six significant
//! digits. Lifecycle events become one-line status messages on the
//! diagnostic stream.

use crate::controller::Controller;
use crate::listener::Listener;
use crate::math::{Significant, RAD_TO_DEG, Vector};
use crate::types::{BoneType, Frame, Gesture, GestureKind, GestureKinds, GestureState};
use std::f32::consts::PI;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Header row written on every connect. The `Middle Proximal` group ends in
/// a `Middle Metacarpal Direction` label; downstream readers address columns
/// by this exact text.
pub const CSV_HEADER: &str = concat!(
    "Frame Id, Hands, Timestamp, Extended Fingers, Tools, Gestures, ",
    "Hand Id, Hand Palm X, Y, Z, Hand Pitch, Hand Roll, Hand Yaw, Arm Direction X, Y, Z, Wrist Position X, Y, Z, Elbow Position X, Y, Z, ",
    "Thumb Id, Thumb Length, Thumb width, ",
    "Thumb Metacarpal Start X, Y, Z, Thumb Metacarpal End X, Y, Z, Thumb Metacarpal Direction X, Y, Z, ",
    "Thumb Proximal Start X, Y, Z, Thumb Proximal End X, Y, Z, Thumb Proximal Direction X, Y, Z, ",
    "Thumb Middle Start X, Y, Z, Thumb Middle End X, Y, Z, Thumb Middle Direction X, Y, Z, ",
    "Thumb Distal Start X, Y, Z, Thumb Distal End X, Y, Z, Thumb Distal Direction X, Y, Z, ",
    "Index Id, Index Length, Index Width, ",
    "Index Metacarpal Start X, Y, Z, Index Metacarpal End X, Y, Z, Index Metacarpal Direction X, Y, Z, ",
    "Index Proximal Start X, Y, Z, Index Proximal End X, Y, Z, Index Proximal Direction X, Y, Z, ",
    "Index Middle Start X, Y, Z, Index Middle End X, Y, Z, Index Middle Direction X, Y, Z, ",
    "Index Distal Start X, Y, Z, Index Distal End X, Y, Z, Index Distal Direction X, Y, Z, ",
    "Middle Id, Middle Length, Middle Width, ",
    "Middle Metacarpal Start X, Y, Z, Middle Metacarpal End X, Y, Z, Middle Metacarpal Direction X, Y, Z, ",
    "Middle Proximal Start X, Y, Z, Middle Proximal End X, Y, Z, Middle Metacarpal Direction X, Y, Z, ",
    "Middle Middle Start X, Y, Z, Middle Middle End X, Y, Z, Middle Middle Direction X, Y, Z, ",
    "Middle Distal Start X, Y, Z, Middle Distal End X, Y, Z, Middle Distal Direction X, Y, Z, ",
    "Ring Id, Ring Length, Ring Width, ",
    "Ring Metacarpal Start X, Y, Z, Ring Metacarpal End X, Y, Z, Ring Metacarpal Direction X, Y, Z, ",
    "Ring Proximal Start X, Y, Z, Ring Proximal End X, Y, Z, Ring Proximal Direction X, Y, Z, ",
    "Ring Middle Start X, Y, Z, Ring Middle End X, Y, Z, Ring Middle Direction X, Y, Z, ",
    "Ring Distal Start X, Y, Z, Ring Distal End X, Y, Z, Ring Distal Direction X, Y, Z, ",
    "Pinky Id, Pinky Length, Pinky Width, ",
    "Pinky Metacarpal Start X, Y, Z, Pinky Metacarpal End X, Y, Z, Pinky Metacarpal Direction X, Y, Z, ",
    "Pinky Proximal Start X, Y, Z, Pinky Proximal End X, Y, Z, Pinky Proximal Direction X, Y, Z, ",
    "Pinky Middle Start X, Y, Z, Pinky Middle End X, Y, Z, Pinky Middle Direction X, Y, Z, ",
    "Pinky Distal Start X, Y, Z, Pinky Distal End X, Y, Z, Pinky Distal Direction X, Y, Z",
);

/// Gesture kinds requested on connect.
pub const REPORTED_GESTURES: GestureKinds = GestureKinds::CIRCLE
    .union(GestureKinds::KEY_TAP)
    .union(GestureKinds::SCREEN_TAP)
    .union(GestureKinds::SWIPE);

/// Listener that prints frames as CSV on `out` and status lines on `diag`.
pub struct FrameReporter<W, E> {
    out: W,
    diag: E,
}

impl FrameReporter<io::Stdout, io::Stderr> {
    /// Reporter writing CSV to stdout and status messages to stderr.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<W: Write, E: Write> FrameReporter<W, E> {
    pub fn new(out: W, diag: E) -> Self {
        Self { out, diag }
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.diag)
    }

    fn status(&mut self, message: &str) {
        if let Err(e) = writeln!(self.diag, "{}", message).and_then(|_| self.diag.flush()) {
            log::warn!("Failed to write status line: {}", e);
        }
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            log::warn!("Failed to write frame report: {}", e);
        }
    }
}

/// Render the report for `frame`, or `None` when it has no hands.
///
/// `previous_progress` looks up the progress a circle gesture had one frame
/// earlier, by gesture id.
pub fn format_frame<F>(frame: &Frame, previous_progress: F) -> Option<String>
where
    F: Fn(i32) -> Option<f32>,
{
    if frame.hands.is_empty() {
        return None;
    }

    let mut out = String::new();
    write_row(&mut out, frame);
    out.push('\n');

    for gesture in &frame.gestures {
        out.push_str("  ");
        write_gesture(&mut out, gesture, &previous_progress);
        out.push('\n');
    }

    if !frame.gestures.is_empty() {
        out.push('\n');
    }
    Some(out)
}

fn write_row(out: &mut String, frame: &Frame) {
    let _ = write!(
        out,
        "{}, {}, {}, {}, {}, {}",
        frame.id,
        frame.timestamp,
        frame.hands.len(),
        frame.extended_finger_count(),
        frame.tools.len(),
        frame.gestures.len()
    );

    for hand in &frame.hands {
        let _ = write!(out, ", {}, {}, ", hand.id, hand.palm_position);
        let _ = write!(
            out,
            "{} degrees, {} degrees, {} degrees ",
            Significant(hand.pitch() * RAD_TO_DEG),
            Significant(hand.roll() * RAD_TO_DEG),
            Significant(hand.yaw() * RAD_TO_DEG)
        );

        let arm = &hand.arm;
        let _ = write!(
            out,
            ", {}, {}, {}",
            arm.direction, arm.wrist_position, arm.elbow_position
        );

        for finger in &hand.fingers {
            let _ = write!(
                out,
                ", {}, {}, {}",
                finger.id,
                Significant(finger.length),
                Significant(finger.width)
            );
            for bone_type in BoneType::ALL {
                let bone = finger.bone(bone_type);
                let _ = write!(
                    out,
                    ", {}, {}, {}",
                    bone.prev_joint, bone.next_joint, bone.direction
                );
            }
        }
    }

    for tool in &frame.tools {
        let _ = write!(out, ", {}, {}, {}", tool.id, tool.tip_position, tool.direction);
    }
}

fn write_gesture<F>(out: &mut String, gesture: &Gesture, previous_progress: &F)
where
    F: Fn(i32) -> Option<f32>,
{
    let state = gesture.state.name();
    match &gesture.kind {
        GestureKind::Circle { progress, radius, normal, pointable_direction } => {
            let direction = clockwiseness(pointable_direction, normal);
            let previous = previous_progress(gesture.id);
            let angle = swept_angle(gesture.state, *progress, previous);
            let _ = write!(
                out,
                "Circle id: {}, state: {}, progress: {}, radius: {}, angle {}, {}",
                gesture.id,
                state,
                Significant(*progress),
                Significant(*radius),
                Significant(angle * RAD_TO_DEG),
                direction
            );
        }
        GestureKind::Swipe { direction, speed } => {
            let _ = write!(
                out,
                "Swipe id: {}, state: {}, direction: {}, speed: {}",
                gesture.id,
                state,
                direction,
                Significant(*speed)
            );
        }
        GestureKind::KeyTap { position, direction } => {
            let _ = write!(
                out,
                "Key Tap id: {}, state: {}, position: {}, direction: {}",
                gesture.id, state, position, direction
            );
        }
        GestureKind::ScreenTap { position, direction } => {
            let _ = write!(
                out,
                "Screen Tap id: {}, state: {}, position: {}, direction: {}",
                gesture.id, state, position, direction
            );
        }
        GestureKind::Unknown => {
            log::warn!("Gesture {} has an unknown type", gesture.id);
            out.push_str("Unknown gesture type.");
        }
    }
}

/// `"clockwise"` when the drawing direction is within a quarter turn of the
/// circle normal, `"counterclockwise"` otherwise.
pub fn clockwiseness(pointable_direction: &Vector, normal: &Vector) -> &'static str {
    clockwiseness_for_angle(pointable_direction.angle_to(normal))
}

pub fn clockwiseness_for_angle(angle: f32) -> &'static str {
    if angle <= PI / 2.0 {
        "clockwise"
    } else {
        "counterclockwise"
    }
}

/// Radians swept since the previous frame. Zero for a gesture that just
/// started; a missing previous sample counts as zero progress.
pub fn swept_angle(state: GestureState, progress: f32, previous: Option<f32>) -> f32 {
    if state == GestureState::Start {
        return 0.0;
    }
    (progress - previous.unwrap_or(0.0)) * 2.0 * PI
}

fn circle_progress(gesture: &Gesture) -> Option<f32> {
    match gesture.kind {
        GestureKind::Circle { progress, .. } => Some(progress),
        _ => None,
    }
}

impl<W, E> Listener for FrameReporter<W, E>
where
    W: Write + Send,
    E: Write + Send,
{
    fn on_init(&mut self, _controller: &Controller) {
        self.status("Initialized");
    }

    fn on_connect(&mut self, controller: &Controller) {
        self.status("Connected");
        self.emit(CSV_HEADER);
        self.emit("\n");
        controller.enable_gesture(REPORTED_GESTURES);
    }

    // not dispatched when running in a debugger
    fn on_disconnect(&mut self, _controller: &Controller) {
        self.status("Disconnected");
    }

    fn on_exit(&mut self, _controller: &Controller) {
        self.status("Exited");
    }

    fn on_frame(&mut self, controller: &Controller) {
        let Some(frame) = controller.frame(0) else {
            return;
        };
        log::trace!("Frame {}: {} hands", frame.id, frame.hands.len());
        let report = format_frame(frame, |id| {
            controller.gesture(id, 1).and_then(circle_progress)
        });
        if let Some(report) = report {
            self.emit(&report);
        }
    }

    fn on_focus_gained(&mut self, _controller: &Controller) {
        self.status("Focus Gained");
    }

    fn on_focus_lost(&mut self, _controller: &Controller) {
        self.status("Focus Lost");
    }

    fn on_device_change(&mut self, controller: &Controller) {
        self.status("Device Changed");
        for device in controller.devices() {
            self.status(&format!("id: {}", device));
            self.status(&format!(
                "  isStreaming: {}",
                if device.streaming { "true" } else { "false" }
            ));
        }
    }

    fn on_service_connect(&mut self, _controller: &Controller) {
        self.status("Service Connected");
    }

    fn on_service_disconnect(&mut self, _controller: &Controller) {
        self.status("Service Disconnected");
    }
}
