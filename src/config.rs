//! JSON configuration for the CLI and embedding applications.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;

use crate::animation::fade::AnimationSpec;
use crate::foundation::error::{HoloError, HoloResult};
use crate::geometry::layout::{CENTER_GAP_RATIO, NARROW_EDGE_RATIO};
use crate::policy::resource::{
    CapabilityClass, CapabilityProbe, ResourceBudget, budget_for, detect_capability_class,
};
use crate::preview::still::DEFAULT_PREVIEW_MAX_WIDTH;

/// How the capability class is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityOverride {
    /// Ask the probe.
    #[default]
    Auto,
    /// Force [`CapabilityClass::Constrained`].
    Constrained,
    /// Force [`CapabilityClass::Normal`].
    Normal,
}

impl std::str::FromStr for CapabilityOverride {
    type Err = HoloError;

    fn from_str(s: &str) -> HoloResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            other => other.parse::<CapabilityClass>().map(|class| match class {
                CapabilityClass::Constrained => Self::Constrained,
                CapabilityClass::Normal => Self::Normal,
            }),
        }
    }
}

/// Everything a hologram run can be configured with.
///
/// The animation keys sit at the top level:
///
/// ```json
/// { "durationSeconds": 3, "fps": 24, "direction": "forward", "loop": false,
///   "capability": "auto", "previewMaxWidth": 800 }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HologramConfig {
    /// Fade animation settings.
    #[serde(flatten)]
    pub animation: AnimationSpec,
    /// Capability class selection.
    pub capability: CapabilityOverride,
    /// Largest preview side.
    pub preview_max_width: u32,
    /// Fixed at 0.25; accepted only so existing configs that spell it out still load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_gap_ratio: Option<f64>,
    /// Fixed at 0.45; accepted for the same reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrow_edge_ratio: Option<f64>,
}

impl Default for HologramConfig {
    fn default() -> Self {
        Self {
            animation: AnimationSpec::default(),
            capability: CapabilityOverride::Auto,
            preview_max_width: DEFAULT_PREVIEW_MAX_WIDTH,
            center_gap_ratio: None,
            narrow_edge_ratio: None,
        }
    }
}

impl HologramConfig {
    /// Load and validate a JSON config file.
    pub fn from_path(path: &Path) -> HoloResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config JSON '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate JSON text.
    pub fn from_json(text: &str) -> HoloResult<Self> {
        let cfg: Self = serde_json::from_str(text).context("parse config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check ranges and the fixed geometry ratios.
    pub fn validate(&self) -> HoloResult<()> {
        self.animation.validate()?;
        if self.preview_max_width == 0 {
            return Err(HoloError::validation("previewMaxWidth must be > 0"));
        }
        check_fixed("centerGapRatio", self.center_gap_ratio, CENTER_GAP_RATIO)?;
        check_fixed("narrowEdgeRatio", self.narrow_edge_ratio, NARROW_EDGE_RATIO)?;
        Ok(())
    }

    /// Capability class under this config.
    pub fn capability_class(&self, probe: &dyn CapabilityProbe) -> CapabilityClass {
        match self.capability {
            CapabilityOverride::Auto => detect_capability_class(probe),
            CapabilityOverride::Constrained => CapabilityClass::Constrained,
            CapabilityOverride::Normal => CapabilityClass::Normal,
        }
    }

    /// Budget under this config.
    pub fn budget(&self, probe: &dyn CapabilityProbe) -> ResourceBudget {
        budget_for(self.capability_class(probe))
    }
}

fn check_fixed(key: &str, value: Option<f64>, fixed: f64) -> HoloResult<()> {
    match value {
        Some(v) if (v - fixed).abs() > 1e-9 => Err(HoloError::validation(format!(
            "{key} is fixed at {fixed}, got {v}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
