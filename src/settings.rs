//! Simulation settings
//!
//! Persisted as JSON next to the binary. Every field has a default, so a
//! partial file only overrides what it names.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// What to do when the collision table has no row for a pair of kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnclassifiedPolicy {
    /// Stop the tick with an error
    Abort,
    /// Log and skip the pair
    Warn,
}

impl Default for UnclassifiedPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            UnclassifiedPolicy::Abort
        } else {
            UnclassifiedPolicy::Warn
        }
    }
}

impl UnclassifiedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnclassifiedPolicy::Abort => "abort",
            UnclassifiedPolicy::Warn => "warn",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "abort" | "error" => Some(UnclassifiedPolicy::Abort),
            "warn" | "warning" => Some(UnclassifiedPolicy::Warn),
            _ => None,
        }
    }
}

/// Broad phase shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadtreeSettings {
    pub max_depth: u32,
    /// A leaf splits once it holds more than this many bodies
    pub max_per_node: usize,
}

impl Default for QuadtreeSettings {
    fn default() -> Self {
        Self {
            max_depth: QUADTREE_MAX_DEPTH,
            max_per_node: QUADTREE_MAX_PER_NODE,
        }
    }
}

/// Restitution of bullets and props against floors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BounceSettings {
    /// Fraction of vertical speed kept on landing
    pub vertical: f32,
    /// Fraction of horizontal speed kept on any floor contact
    pub horizontal: f32,
    /// Minimum upward speed after a bounce
    pub min_speed: f32,
}

impl Default for BounceSettings {
    fn default() -> Self {
        Self {
            vertical: 0.5,
            horizontal: 0.75,
            min_speed: 4.0,
        }
    }
}

/// Simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Collision table misses
    pub unclassified_pair: UnclassifiedPolicy,
    pub quadtree: QuadtreeSettings,
    pub bounce: BounceSettings,

    // === World ===
    /// Window used for on-screen collision culling, centred on the camera
    pub viewport: Vec2,
    /// Margin around the world for the broad phase and pooled-object culling
    pub world_margin: f32,

    // === Pools ===
    pub particle_capacity: usize,
    pub bullet_capacity: usize,
    pub prop_capacity: usize,

    // === Text ===
    /// Seconds per revealed character
    pub text_char_delay: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            unclassified_pair: UnclassifiedPolicy::default(),
            quadtree: QuadtreeSettings::default(),
            bounce: BounceSettings::default(),

            viewport: Vec2::new(VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
            world_margin: WORLD_MARGIN,

            particle_capacity: PARTICLE_CAPACITY,
            bullet_capacity: BULLET_CAPACITY,
            prop_capacity: PROP_CAPACITY,

            text_char_delay: TEXT_CHAR_DELAY,
        }
    }
}

impl Settings {
    /// Settings with a specific collision policy
    pub fn with_policy(policy: UnclassifiedPolicy) -> Self {
        Self {
            unclassified_pair: policy,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        if let Ok(json) = std::fs::read_to_string(path) {
            match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return settings;
                }
                Err(e) => log::warn!("Ignoring malformed settings in {}: {e}", path.display()),
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved");
        Ok(())
    }
}
