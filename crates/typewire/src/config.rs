//! Channel configuration.

use serde::{Deserialize, Serialize};

/// Default maximum frame size: 1 MiB.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Settings for one [`Channel`](crate::Channel).
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes:
///
/// ```
/// # #[cfg(feature = "json")] {
/// let config = typewire::ChannelConfig::from_json(r#"{ "max_frame_len": 4096 }"#).unwrap();
/// assert_eq!(config.name, "typewire");
/// assert_eq!(config.max_frame_len, 4096);
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Name of the channel, attached to its log events.
    pub name: String,

    /// Largest frame accepted or sent, in bytes, discriminator included.
    ///
    /// Default: 1 MiB.
    pub max_frame_len: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "typewire".to_string(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

#[cfg(feature = "json")]
impl ChannelConfig {
    /// Parses a configuration from JSON; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.name, "typewire");
        assert_eq!(config.max_frame_len, 1_048_576);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_from_json_fills_defaults() {
        let config = ChannelConfig::from_json(r#"{ "name": "game" }"#).unwrap();
        assert_eq!(config.name, "game");
        assert_eq!(config.max_frame_len, DEFAULT_MAX_FRAME_LEN);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_from_json_rejects_bad_types() {
        assert!(ChannelConfig::from_json(r#"{ "max_frame_len": "big" }"#).is_err());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_round_trip() {
        let config = ChannelConfig {
            name: "x".into(),
            max_frame_len: 10,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ChannelConfig::from_json(&json).unwrap(), config);
    }
}
