//! View configuration: display toggles, renderer backend, classifier and
//! scene-construction parameters.
//!
//! Everything has a default, so a TOML file only needs the keys it changes.

use crate::error::ConfigError;
use crate::habitability::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewFlags {
    pub show_orbits: bool,
    pub show_zone: bool,
    pub show_labels: bool,
    pub show_field_stars: bool,
    /// Auto-rotate state a freshly mounted view starts in.
    pub auto_rotate: bool,
}

impl Default for ViewFlags {
    fn default() -> Self {
        Self {
            show_orbits: true,
            show_zone: true,
            show_labels: true,
            show_field_stars: true,
            auto_rotate: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    Canvas,
    #[default]
    SceneGraph,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Canvas, Backend::SceneGraph];

    pub fn label(&self) -> &'static str {
        match self {
            Backend::Canvas => "Projected canvas",
            Backend::SceneGraph => "Scene graph (GPU)",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Field-mode objects closer than this (parsecs) are not drawn.
    pub min_field_range_pc: f64,
    /// `k` in `display_radius = sqrt(a) * k` for system mode.
    pub orbit_scale: f64,
    /// Zone annulus narrower than this (display units) is drawn as outlines only.
    pub min_zone_band_width: f64,
    pub field_star_count: usize,
    /// Radius of the background star shell relative to the scene's view radius.
    pub field_star_shell: f64,
    /// Symbolic scale of the central body's zone ring in field mode.
    pub field_zone_scale: f64,
    pub field_object_radius: (f64, f64),
    pub system_planet_radius: (f64, f64),
    pub central_body_radius: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            min_field_range_pc: 1.0,
            orbit_scale: 10.0,
            min_zone_band_width: 0.5,
            field_star_count: 1200,
            field_star_shell: 4.0,
            field_zone_scale: 1.5,
            field_object_radius: (0.15, 0.6),
            system_planet_radius: (0.2, 0.9),
            central_body_radius: 0.6,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub backend: Backend,
    pub flags: ViewFlags,
    pub classifier: ClassifierConfig,
    pub scene: SceneConfig,
}

impl ViewConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("loaded view config from {}", path.display());
        Ok(config)
    }
}
