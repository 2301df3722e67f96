//! Separable blend functions and the name registry used to select them.
//!
//! All functions take normalized channel values: `cb` is the backdrop (main
//! image) and `cs` is the source (grain). Formulas follow the W3C
//! Compositing and Blending Level 1 definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::grain::GrainError;

/// A per-channel blend function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Source over: the grain replaces the backdrop.
    Normal,
    Multiply,
    /// `1 − (1 − cb)(1 − cs)`. Default for grain.
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    /// Clamped sum, a.k.a. linear dodge.
    Addition,
    Subtract,
    Divide,
    LinearBurn,
}

/// Accepted spellings for each mode. Matching ignores case and punctuation,
/// so `soft-light`, `SoftLight` and `soft_light` are the same name. The Core
/// Image filter names are accepted so existing presets keep working.
const REGISTRY: &[(BlendMode, &[&str])] = &[
    (BlendMode::Normal, &["normal", "source-over", "CISourceOverCompositing"]),
    (BlendMode::Multiply, &["multiply", "CIMultiplyBlendMode"]),
    (BlendMode::Screen, &["screen", "CIScreenBlendMode"]),
    (BlendMode::Overlay, &["overlay", "CIOverlayBlendMode"]),
    (BlendMode::Darken, &["darken", "CIDarkenBlendMode"]),
    (BlendMode::Lighten, &["lighten", "CILightenBlendMode"]),
    (BlendMode::ColorDodge, &["color-dodge", "CIColorDodgeBlendMode"]),
    (BlendMode::ColorBurn, &["color-burn", "CIColorBurnBlendMode"]),
    (BlendMode::HardLight, &["hard-light", "CIHardLightBlendMode"]),
    (BlendMode::SoftLight, &["soft-light", "CISoftLightBlendMode"]),
    (BlendMode::Difference, &["difference", "CIDifferenceBlendMode"]),
    (BlendMode::Exclusion, &["exclusion", "CIExclusionBlendMode"]),
    (
        BlendMode::Addition,
        &[
            "addition",
            "add",
            "linear-dodge",
            "CIAdditionCompositing",
            "CILinearDodgeBlendMode",
        ],
    ),
    (BlendMode::Subtract, &["subtract", "CISubtractBlendMode"]),
    (BlendMode::Divide, &["divide", "CIDivideBlendMode"]),
    (BlendMode::LinearBurn, &["linear-burn", "CILinearBurnBlendMode"]),
];

impl BlendMode {
    /// Look a mode up by any of its registered names.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        if wanted.is_empty() {
            return None;
        }
        REGISTRY
            .iter()
            .find(|(_, names)| names.iter().any(|n| normalize(n) == wanted))
            .map(|(mode, _)| *mode)
    }

    /// Canonical kebab-case name.
    pub fn name(self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(mode, _)| *mode == self)
            .map_or("normal", |(_, names)| names[0])
    }

    /// Every name this mode answers to, canonical name first.
    pub fn aliases(self) -> &'static [&'static str] {
        REGISTRY
            .iter()
            .find(|(mode, _)| *mode == self)
            .map_or(&[], |(_, names)| *names)
    }

    /// Every supported mode, in registry order.
    pub fn all() -> impl Iterator<Item = Self> {
        REGISTRY.iter().map(|(mode, _)| *mode)
    }

    /// Evaluate `B(cb, cs)` for one channel.
    pub fn blend(self, cb: f32, cs: f32) -> f32 {
        match self {
            Self::Normal => cs,
            Self::Multiply => cb * cs,
            Self::Screen => screen(cb, cs),
            Self::Overlay => hard_light(cs, cb),
            Self::Darken => cb.min(cs),
            Self::Lighten => cb.max(cs),
            Self::ColorDodge => {
                if cb <= 0.0 {
                    0.0
                } else if cs >= 1.0 {
                    1.0
                } else {
                    (cb / (1.0 - cs)).min(1.0)
                }
            }
            Self::ColorBurn => {
                if cb >= 1.0 {
                    1.0
                } else if cs <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - cb) / cs).min(1.0)
                }
            }
            Self::HardLight => hard_light(cb, cs),
            Self::SoftLight => soft_light(cb, cs),
            Self::Difference => (cb - cs).abs(),
            Self::Exclusion => cb + cs - 2.0 * cb * cs,
            Self::Addition => (cb + cs).min(1.0),
            Self::Subtract => (cb - cs).max(0.0),
            Self::Divide => {
                if cs <= 0.0 {
                    if cb <= 0.0 { 0.0 } else { 1.0 }
                } else {
                    (cb / cs).min(1.0)
                }
            }
            Self::LinearBurn => (cb + cs - 1.0).max(0.0),
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendMode {
    type Err = GrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| GrainError::InvalidBlendMode(s.to_string()))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn screen(cb: f32, cs: f32) -> f32 {
    1.0 - (1.0 - cb) * (1.0 - cs)
}

fn hard_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb * 2.0 * cs
    } else {
        screen(cb, 2.0 * cs - 1.0)
    }
}

/// ```text
/// cs ≤ 0.5 → cb − (1 − 2cs)·cb·(1 − cb)
/// cs > 0.5 → cb + (2cs − 1)·(D(cb) − cb)
/// D(cb) = ((16cb − 12)cb + 4)cb  if cb ≤ 0.25, else √cb
/// ```
fn soft_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
    } else {
        let d = if cb <= 0.25 {
            ((16.0 * cb - 12.0) * cb + 4.0) * cb
        } else {
            cb.sqrt()
        };
        cb + (2.0 * cs - 1.0) * (d - cb)
    }
}
