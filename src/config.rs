use crate::history::DEFAULT_CAPACITY;
use crate::source::Pacing;
use crate::types::Policy;

/// Frames kept for "N frames back" lookups.
pub const ENV_HISTORY_FRAMES: &str = "LEAP_HISTORY_FRAMES";
/// Replay at recorded speed.
pub const ENV_REPLAY_REALTIME: &str = "LEAP_REPLAY_REALTIME";
/// Deliver frames while the application lacks focus.
pub const ENV_BACKGROUND_FRAMES: &str = "LEAP_BACKGROUND_FRAMES";

/// Runtime settings for a replay session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub history_frames: usize,
    pub pacing: Pacing,
    pub policy: Policy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_frames: DEFAULT_CAPACITY,
            pacing: Pacing::Immediate,
            policy: Policy::empty(),
        }
    }
}

impl Config {
    /// Defaults overridden by the `LEAP_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut policy = defaults.policy;
        if read_env_bool(ENV_BACKGROUND_FRAMES, false) {
            policy |= Policy::BACKGROUND_FRAMES;
        }
        Self {
            history_frames: read_env_usize(ENV_HISTORY_FRAMES, defaults.history_frames),
            pacing: if read_env_bool(ENV_REPLAY_REALTIME, false) {
                Pacing::Realtime
            } else {
                defaults.pacing
            },
            policy,
        }
    }
}

pub fn read_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

pub fn read_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_unset_variables_fall_back() {
        assert!(read_env_bool("LEAP_TEST_SURELY_UNSET_BOOL", true));
        assert_eq!(read_env_usize("LEAP_TEST_SURELY_UNSET_USIZE", 7), 7);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.history_frames, 60);
        assert_eq!(config.pacing, Pacing::Immediate);
        assert!(config.policy.is_empty());
    }
}
