//! Tunables for snapping, sizing, label flow and scoring, with env overrides.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::consts::{
    LABEL_CHAR_WIDTH, LABEL_HEIGHT, LABEL_MARGIN, LABEL_MIN_WIDTH, LABEL_PADDING, LABEL_ROW_HEIGHT,
    MIN_REGION_SIZE, PASS_PERCENTAGE, SNAP_RADIUS,
};
use crate::doc::ConnectorStyle;
use crate::error::ErrorCode;
use crate::placement::OccupiedPolicy;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown {var}: {value} (expected 'evict' or 'reject')")]
    UnknownPolicy { var: &'static str, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownPolicy { .. } => "E_CONFIG",
        }
    }
}

/// Metrics of the unplaced-label flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelLayout {
    pub min_width: f64,
    pub char_width: f64,
    pub padding: f64,
    pub height: f64,
    pub row_height: f64,
    pub margin: f64,
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self {
            min_width: LABEL_MIN_WIDTH,
            char_width: LABEL_CHAR_WIDTH,
            padding: LABEL_PADDING,
            height: LABEL_HEIGHT,
            row_height: LABEL_ROW_HEIGHT,
            margin: LABEL_MARGIN,
        }
    }
}

impl LabelLayout {
    /// Box width for `text`: `max(min_width, chars * char_width + padding)`.
    #[must_use]
    pub fn width_for(&self, text: &str) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let chars = text.chars().count() as f64;
        (chars * self.char_width + self.padding).max(self.min_width)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub snap_radius: f64,
    pub min_region_size: f64,
    pub pass_percentage: u32,
    pub label_layout: LabelLayout,
    pub arrow_style: ConnectorStyle,
    pub occupied_policy: OccupiedPolicy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            snap_radius: SNAP_RADIUS,
            min_region_size: MIN_REGION_SIZE,
            pass_percentage: PASS_PERCENTAGE,
            label_layout: LabelLayout::default(),
            arrow_style: ConnectorStyle::default(),
            occupied_policy: OccupiedPolicy::default(),
        }
    }
}

impl MatchConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// Optional:
    /// - `PICMATCH_SNAP_RADIUS`: default 60
    /// - `PICMATCH_MIN_REGION_SIZE`: default 10
    /// - `PICMATCH_PASS_PERCENTAGE`: default 60
    /// - `PICMATCH_ARROW_COLOR`, `PICMATCH_ARROW_THICKNESS`
    /// - `PICMATCH_OCCUPIED_POLICY`: `evict` (default) or `reject`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPolicy`] for an unrecognized policy name.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Same as [`MatchConfig::from_env`] over an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPolicy`] for an unrecognized policy name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let occupied_policy = match lookup("PICMATCH_OCCUPIED_POLICY").as_deref() {
            None | Some("evict") => OccupiedPolicy::Evict,
            Some("reject") => OccupiedPolicy::Reject,
            Some(other) => {
                return Err(ConfigError::UnknownPolicy { var: "PICMATCH_OCCUPIED_POLICY", value: other.to_owned() });
            }
        };
        Ok(Self {
            snap_radius: env_parse(&lookup, "PICMATCH_SNAP_RADIUS", defaults.snap_radius),
            min_region_size: env_parse(&lookup, "PICMATCH_MIN_REGION_SIZE", defaults.min_region_size),
            pass_percentage: env_parse(&lookup, "PICMATCH_PASS_PERCENTAGE", defaults.pass_percentage),
            label_layout: defaults.label_layout,
            arrow_style: ConnectorStyle {
                color: lookup("PICMATCH_ARROW_COLOR").unwrap_or(defaults.arrow_style.color),
                thickness: env_parse(&lookup, "PICMATCH_ARROW_THICKNESS", defaults.arrow_style.thickness),
            },
            occupied_policy,
        })
    }
}

fn env_parse<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or(default),
        None => default,
    }
}
