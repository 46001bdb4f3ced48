//! Recording format: one JSON object per line, tagged by `"event"`.
//!
//! ```text
//! {"event":"service_connect"}
//! {"event":"connect"}
//! {"event":"device_change","devices":[{"serial":"LP00000000001","streaming":true}]}
//! {"event":"frame","frame":{"id":1,"timestamp":1000,"hands":[...],"tools":[],"gestures":[]}}
//! {"event":"focus_lost"}
//! ```
//!
//! Vectors are `[x, y, z]` arrays and bases are three row arrays. Blank lines
//! and lines starting with `#` are ignored.

use crate::types::{Device, Frame};
use crate::{LeapError, Result};
use serde::{Deserialize, Serialize};

/// Prefix of a comment line.
pub const COMMENT_PREFIX: char = '#';

/// One event delivered by the tracking service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    ServiceConnect,
    ServiceDisconnect,
    Connect,
    Disconnect,
    FocusGained,
    FocusLost,
    DeviceChange { devices: Vec<Device> },
    Frame { frame: Frame },
}

impl Event {
    /// Short name used in log messages.
    pub fn name(&self) -> &'static str {
        match self {
            Event::ServiceConnect => "service_connect",
            Event::ServiceDisconnect => "service_disconnect",
            Event::Connect => "connect",
            Event::Disconnect => "disconnect",
            Event::FocusGained => "focus_gained",
            Event::FocusLost => "focus_lost",
            Event::DeviceChange { .. } => "device_change",
            Event::Frame { .. } => "frame",
        }
    }
}

/// Parse one recording line. `Ok(None)` for blank and comment lines.
///
/// `line_no` is 1-based and only used for error reporting.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<Event>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| LeapError::Record { line: line_no, source })
}

/// Encode an event as a single recording line, without the trailing newline.
pub fn encode_event(event: &Event) -> Result<String> {
    serde_json::to_string(event).map_err(|source| LeapError::Record { line: 0, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_blank_and_comment_lines() {
        assert!(parse_line("", 1).unwrap().is_none());
        assert!(parse_line("   \t", 2).unwrap().is_none());
        assert!(parse_line("# captured 2014-06-02", 3).unwrap().is_none());
    }

    #[test]
    fn test_parse_lifecycle_events() {
        assert_eq!(parse_line(r#"{"event":"connect"}"#, 1).unwrap(), Some(Event::Connect));
        assert_eq!(
            parse_line(r#"{"event":"focus_lost"}"#, 1).unwrap(),
            Some(Event::FocusLost)
        );
    }

    #[test]
    fn test_parse_device_change() {
        let event = parse_line(
            r#"{"event":"device_change","devices":[{"serial":"LP42","streaming":true}]}"#,
            1,
        )
        .unwrap()
        .unwrap();
        match event {
            Event::DeviceChange { devices } => {
                assert_eq!(devices.len(), 1);
                assert_eq!(devices[0].serial, "LP42");
                assert!(devices[0].streaming);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_frame() {
        let event = parse_line(r#"{"event":"frame","frame":{"id":5,"timestamp":123}}"#, 1)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            Event::Frame { frame: Frame { id: 5, timestamp: 123, ..Default::default() } }
        );
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        match parse_line(r#"{"event":"frame""#, 17) {
            Err(LeapError::Record { line, .. }) => assert_eq!(line, 17),
            other => panic!("expected record error, got {:?}", other),
        }
        assert!(parse_line(r#"{"event":"teleport"}"#, 1).is_err());
    }

    #[test]
    fn test_encode_then_parse() {
        let line = encode_event(&Event::FocusGained).unwrap();
        assert_eq!(line, r#"{"event":"focus_gained"}"#);
        assert_eq!(parse_line(&line, 1).unwrap(), Some(Event::FocusGained));
    }
}
