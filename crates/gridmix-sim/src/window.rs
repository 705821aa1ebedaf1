//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Trend window definitions."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Time window offered by the trend view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WindowKind {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[default]
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "custom")]
    Custom,
}

impl WindowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKind::OneHour => "1h",
            WindowKind::SixHours => "6h",
            WindowKind::OneDay => "24h",
            WindowKind::SevenDays => "7d",
            WindowKind::ThirtyDays => "30d",
            WindowKind::Custom => "custom",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1h" => Ok(WindowKind::OneHour),
            "6h" => Ok(WindowKind::SixHours),
            "24h" => Ok(WindowKind::OneDay),
            "7d" => Ok(WindowKind::SevenDays),
            "30d" => Ok(WindowKind::ThirtyDays),
            "custom" => Ok(WindowKind::Custom),
            other => Err(format!("unknown window: {}", other)),
        }
    }
}

/// Window plus horizon for a trend projection.
///
/// `horizon_years` only affects [`WindowKind::Custom`] and is always within
/// `MIN_YEARS..=MAX_YEARS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRequest {
    pub window: WindowKind,
    pub horizon_years: u32,
}

impl TrendRequest {
    pub const MIN_YEARS: u32 = 1;
    pub const MAX_YEARS: u32 = 50;

    /// Any requested horizon is accepted; out-of-range values are clamped.
    pub fn new(window: WindowKind, horizon_years: Option<i64>) -> Self {
        let years = horizon_years
            .unwrap_or(i64::from(Self::MIN_YEARS))
            .clamp(i64::from(Self::MIN_YEARS), i64::from(Self::MAX_YEARS));
        Self {
            window,
            horizon_years: u32::try_from(years).unwrap_or(Self::MAX_YEARS),
        }
    }

    pub fn custom(years: i64) -> Self {
        Self::new(WindowKind::Custom, Some(years))
    }

    pub fn point_count(&self) -> usize {
        match self.window {
            WindowKind::OneHour => 60,
            WindowKind::SixHours => 72,
            WindowKind::OneDay => 96,
            WindowKind::SevenDays => 168,
            WindowKind::ThirtyDays => 30,
            WindowKind::Custom => self.horizon_years as usize * 365,
        }
    }

    pub fn interval(&self) -> Duration {
        let secs = match self.window {
            WindowKind::OneHour => MINUTE,
            WindowKind::SixHours => 5 * MINUTE,
            WindowKind::OneDay => 15 * MINUTE,
            WindowKind::SevenDays => HOUR,
            WindowKind::ThirtyDays | WindowKind::Custom => DAY,
        };
        Duration::from_secs(secs)
    }

    /// Horizon fed to the long-horizon trend term; only custom windows carry one.
    pub fn long_horizon_years(&self) -> Option<f64> {
        match self.window {
            WindowKind::Custom => Some(f64::from(self.horizon_years)),
            _ => None,
        }
    }
}

impl Default for TrendRequest {
    fn default() -> Self {
        Self::new(WindowKind::default(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_horizon_is_clamped() {
        assert_eq!(TrendRequest::custom(100).horizon_years, 50);
        assert_eq!(TrendRequest::custom(0).horizon_years, 1);
        assert_eq!(TrendRequest::custom(-3).horizon_years, 1);
        assert_eq!(TrendRequest::custom(5_000_000_000).horizon_years, 50);
        assert_eq!(TrendRequest::custom(12).point_count(), 12 * 365);
    }

    #[test]
    fn fixed_windows_match_their_spans() {
        let cases = [
            (WindowKind::OneHour, 60, 60),
            (WindowKind::SixHours, 72, 300),
            (WindowKind::OneDay, 96, 900),
            (WindowKind::SevenDays, 168, 3_600),
            (WindowKind::ThirtyDays, 30, 86_400),
        ];
        for (window, points, secs) in cases {
            let request = TrendRequest::new(window, None);
            assert_eq!(request.point_count(), points);
            assert_eq!(request.interval(), Duration::from_secs(secs));
            assert!(request.long_horizon_years().is_none());
        }
    }

    #[test]
    fn window_labels_round_trip_through_parse() {
        for label in ["1h", "6h", "24h", "7d", "30d", "custom"] {
            let window: WindowKind = label.parse().unwrap();
            assert_eq!(window.as_str(), label);
        }
        assert!("2w".parse::<WindowKind>().is_err());
    }
}
