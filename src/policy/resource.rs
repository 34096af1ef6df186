//! Device-capability-aware frame and resolution budgets.

use crate::foundation::error::{HoloError, HoloResult};

/// Memory ceiling (GiB) at or below which a device is treated as constrained.
pub const CONSTRAINED_MEMORY_GB: f64 = 4.0;

/// Coarse capability signals read once per operation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CapabilitySnapshot {
    /// Touch-primary mobile platform.
    pub touch_primary: bool,
    /// Reported memory ceiling in GiB, when known.
    pub device_memory_gb: Option<f64>,
}

/// Source of [`CapabilitySnapshot`]s. Swappable so tests and callers can force a class.
pub trait CapabilityProbe: Send + Sync {
    /// Read the current capability signals.
    fn snapshot(&self) -> CapabilitySnapshot;
}

/// Probe backed by the target platform and, on Linux, `/proc/meminfo`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemProbe;

impl CapabilityProbe for SystemProbe {
    fn snapshot(&self) -> CapabilitySnapshot {
        CapabilitySnapshot {
            touch_primary: cfg!(any(target_os = "android", target_os = "ios")),
            device_memory_gb: read_meminfo_gb(),
        }
    }
}

/// Probe returning a fixed snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticProbe(pub CapabilitySnapshot);

impl StaticProbe {
    /// A probe that always classifies as [`CapabilityClass::Constrained`].
    pub fn constrained() -> Self {
        Self(CapabilitySnapshot {
            touch_primary: true,
            device_memory_gb: Some(2.0),
        })
    }

    /// A probe that always classifies as [`CapabilityClass::Normal`].
    pub fn normal() -> Self {
        Self(CapabilitySnapshot {
            touch_primary: false,
            device_memory_gb: Some(16.0),
        })
    }
}

impl CapabilityProbe for StaticProbe {
    fn snapshot(&self) -> CapabilitySnapshot {
        self.0
    }
}

/// Device capability class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityClass {
    /// Mobile or low-memory device.
    Constrained,
    /// Everything else.
    Normal,
}

impl std::str::FromStr for CapabilityClass {
    type Err = HoloError;

    fn from_str(s: &str) -> HoloResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constrained" => Ok(Self::Constrained),
            "normal" => Ok(Self::Normal),
            other => Err(HoloError::validation(format!(
                "unknown capability class '{other}'"
            ))),
        }
    }
}

/// Classify a snapshot: touch-primary or `<= 4` GiB is constrained.
pub fn classify(snapshot: CapabilitySnapshot) -> CapabilityClass {
    let low_memory = snapshot
        .device_memory_gb
        .is_some_and(|gb| gb <= CONSTRAINED_MEMORY_GB);
    if snapshot.touch_primary || low_memory {
        CapabilityClass::Constrained
    } else {
        CapabilityClass::Normal
    }
}

/// Read the probe once and classify it.
pub fn detect_capability_class(probe: &dyn CapabilityProbe) -> CapabilityClass {
    let class = classify(probe.snapshot());
    tracing::debug!(?class, "detected capability class");
    class
}

/// Frame-count and resolution limits for one operation.
///
/// Chosen once at the start of an operation and held fixed for its duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceBudget {
    /// Largest side of any intermediate raster.
    pub max_raster_dimension: u32,
    /// Largest number of emitted frames.
    pub max_frames: u32,
    /// Frame-rate cap, if any.
    pub max_fps: Option<u32>,
}

impl ResourceBudget {
    /// Clamp a requested frame rate to the budget's cap.
    pub fn clamp_fps(&self, fps: u32) -> u32 {
        match self.max_fps {
            Some(cap) => fps.min(cap),
            None => fps,
        }
    }
}

/// Budget for a capability class.
pub fn budget_for(class: CapabilityClass) -> ResourceBudget {
    match class {
        CapabilityClass::Constrained => ResourceBudget {
            max_raster_dimension: 1024,
            max_frames: 48,
            max_fps: Some(16),
        },
        CapabilityClass::Normal => ResourceBudget {
            max_raster_dimension: 1800,
            max_frames: 160,
            max_fps: None,
        },
    }
}

fn read_meminfo_gb() -> Option<f64> {
    let text = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo_gb(&text)
}

fn parse_meminfo_gb(text: &str) -> Option<f64> {
    let line = text.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kib: f64 = line
        .trim_start_matches("MemTotal:")
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kib / (1024.0 * 1024.0))
}

#[cfg(test)]
#[path = "../../tests/unit/policy/resource.rs"]
mod tests;
