use crate::types::{Frame, Gesture};
use std::collections::VecDeque;

/// Number of frames kept when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 60;

/// Bounded buffer of the most recent frames, newest first.
#[derive(Debug, Clone)]
pub struct FrameHistory {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameHistory {
    /// A capacity of zero is raised to one so the current frame is always kept.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Make `frame` the current one, evicting the oldest when full.
    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_back();
        }
        self.frames.push_front(frame);
    }

    /// Frame `back` steps before the current one (0 = current).
    pub fn get(&self, back: usize) -> Option<&Frame> {
        self.frames.get(back)
    }

    /// Gesture with `id` as it was `back` frames ago.
    pub fn gesture(&self, id: i32, back: usize) -> Option<&Gesture> {
        self.get(back)?.gesture(id)
    }
}

impl Default for FrameHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
