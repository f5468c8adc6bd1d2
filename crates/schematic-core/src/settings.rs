use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchematicError};

/// Refresh intervals offered to the operator.
pub const REFRESH_PRESETS: [Duration; 5] = [
    Duration::from_secs(1),
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(30),
    Duration::from_secs(60),
];

/// Settings the surrounding application hands to a view.
///
/// Values are never mutated in place; `with_*` returns the next settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawViewSettings")]
pub struct ViewSettings {
    refresh_interval: Duration,
}

#[derive(Deserialize)]
struct RawViewSettings {
    refresh_interval: Duration,
}

impl TryFrom<RawViewSettings> for ViewSettings {
    type Error = SchematicError;

    fn try_from(raw: RawViewSettings) -> Result<Self> {
        Self::new(raw.refresh_interval)
    }
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5),
        }
    }
}

impl ViewSettings {
    pub fn new(refresh_interval: Duration) -> Result<Self> {
        Self::default().with_refresh_interval(refresh_interval)
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn with_refresh_interval(self, refresh_interval: Duration) -> Result<Self> {
        if refresh_interval.is_zero() {
            return Err(SchematicError::InvalidRefreshInterval(refresh_interval));
        }
        Ok(Self { refresh_interval })
    }

    pub fn with_refresh_millis(self, millis: u64) -> Result<Self> {
        self.with_refresh_interval(Duration::from_millis(millis))
    }

    pub fn is_preset(&self) -> bool {
        REFRESH_PRESETS.contains(&self.refresh_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_five_seconds() {
        let settings = ViewSettings::default();
        assert_eq!(settings.refresh_interval(), Duration::from_secs(5));
        assert!(settings.is_preset());
    }

    #[test]
    fn test_with_refresh_interval() {
        let base = ViewSettings::default();
        let next = base.with_refresh_millis(1000).unwrap();
        assert_eq!(next.refresh_interval(), Duration::from_secs(1));
        // The original value is untouched.
        assert_eq!(base.refresh_interval(), Duration::from_secs(5));

        let odd = base.with_refresh_millis(2500).unwrap();
        assert!(!odd.is_preset());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(matches!(
            ViewSettings::new(Duration::ZERO),
            Err(SchematicError::InvalidRefreshInterval(_))
        ));
    }

    #[test]
    fn test_serde() {
        let settings = ViewSettings::new(Duration::from_secs(30)).unwrap();
        let json = serde_json::to_string(&settings).unwrap();
        let back: ViewSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_deserialize_rejects_zero_interval() {
        let json = r#"{"refresh_interval":{"secs":0,"nanos":0}}"#;
        let err = serde_json::from_str::<ViewSettings>(json).unwrap_err();
        assert!(err.to_string().contains("non-zero"), "{err}");
    }
}
