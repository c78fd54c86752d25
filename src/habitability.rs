//! Habitable-zone physics and per-object classification.
//!
//! Luminosity follows the Stefan-Boltzmann scaling against the Sun. Zone
//! edges come from either a fixed stellar-flux ratio or the Kopparapu et al.
//! (2013, ApJ 765, 131) polynomial fit; which one is used is always an
//! explicit `ZoneModel`. The resulting three-way verdict is shared by the
//! 3D views and any panel that color-codes the same objects.

use eframe::egui;
use serde::{Deserialize, Serialize};

pub const T_SUN_K: f64 = 5778.0;

/// Stellar-flux limits of the fixed-ratio approximation.
pub const FIXED_INNER_FLUX: f64 = 1.1;
pub const FIXED_OUTER_FLUX: f64 = 0.53;

/// Reference temperature of the Kopparapu polynomial.
pub const KOPPARAPU_T_REF_K: f64 = 5780.0;
/// Effective-temperature range the Kopparapu fit was derived for.
pub const KOPPARAPU_T_RANGE_K: (f64, f64) = (2600.0, 7200.0);

/// `Seff = s0 + a·ΔT + b·ΔT² + c·ΔT³ + d·ΔT⁴`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluxFit {
    pub s0: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

/// Inner edge.
pub const RUNAWAY_GREENHOUSE: FluxFit = FluxFit {
    s0: 1.0385,
    a: 1.2456e-4,
    b: 1.4612e-8,
    c: -7.6345e-12,
    d: -1.7511e-15,
};

/// Outer edge.
pub const MAXIMUM_GREENHOUSE: FluxFit = FluxFit {
    s0: 0.3507,
    a: 5.9578e-5,
    b: 1.6707e-9,
    c: -3.0058e-12,
    d: -5.1925e-16,
};

impl FluxFit {
    pub fn effective_flux(&self, teff_k: f64) -> f64 {
        let (lo, hi) = KOPPARAPU_T_RANGE_K;
        let dt = teff_k.clamp(lo, hi) - KOPPARAPU_T_REF_K;
        self.s0 + dt * (self.a + dt * (self.b + dt * (self.c + dt * self.d)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneModel {
    FixedRatio,
    #[default]
    Kopparapu2013,
}

impl ZoneModel {
    pub const ALL: [ZoneModel; 2] = [ZoneModel::FixedRatio, ZoneModel::Kopparapu2013];

    pub fn label(&self) -> &'static str {
        match self {
            ZoneModel::FixedRatio => "Fixed flux ratio",
            ZoneModel::Kopparapu2013 => "Kopparapu 2013",
        }
    }

    /// (inner, outer) effective stellar flux in units of the solar constant.
    pub fn flux_limits(&self, teff_k: f64) -> (f64, f64) {
        match self {
            ZoneModel::FixedRatio => (FIXED_INNER_FLUX, FIXED_OUTER_FLUX),
            ZoneModel::Kopparapu2013 => (
                RUNAWAY_GREENHOUSE.effective_flux(teff_k),
                MAXIMUM_GREENHOUSE.effective_flux(teff_k),
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HabitableZone {
    pub inner_au: f64,
    pub outer_au: f64,
    pub luminosity: f64,
}

impl HabitableZone {
    pub fn classify(&self, distance_au: f64) -> Classification {
        classify(distance_au, self.inner_au, self.outer_au)
    }

    pub fn width_au(&self) -> f64 {
        self.outer_au - self.inner_au
    }
}

/// Luminosity in solar units from radius (R☉) and effective temperature (K).
pub fn luminosity(radius_solar: f64, teff_k: f64) -> f64 {
    radius_solar.powi(2) * (teff_k / T_SUN_K).powi(4)
}

pub fn zone_boundaries(radius_solar: f64, teff_k: f64, model: ZoneModel) -> Option<HabitableZone> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !valid(radius_solar) || !valid(teff_k) {
        return None;
    }
    let lum = luminosity(radius_solar, teff_k);
    let (s_in, s_out) = model.flux_limits(teff_k);
    if !valid(s_in) || !valid(s_out) {
        return None;
    }
    Some(HabitableZone {
        inner_au: (lum / s_in).sqrt(),
        outer_au: (lum / s_out).sqrt(),
        luminosity: lum,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Habitable,
    TooHot,
    TooCold,
}

impl Classification {
    pub const ALL: [Classification; 3] = [
        Classification::Habitable,
        Classification::TooHot,
        Classification::TooCold,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Classification::Habitable => "Habitable",
            Classification::TooHot => "Too hot",
            Classification::TooCold => "Too cold",
        }
    }

    pub fn color(&self) -> egui::Color32 {
        match self {
            Classification::Habitable => egui::Color32::from_rgb(50, 205, 50),
            Classification::TooHot => egui::Color32::from_rgb(255, 99, 71),
            Classification::TooCold => egui::Color32::from_rgb(30, 144, 255),
        }
    }
}

/// Non-positive or non-finite distances count as missing and read as too cold.
pub fn classify(distance_au: f64, inner_au: f64, outer_au: f64) -> Classification {
    if !distance_au.is_finite() || distance_au <= 0.0 {
        return Classification::TooCold;
    }
    if distance_au < inner_au {
        Classification::TooHot
    } else if distance_au > outer_au {
        Classification::TooCold
    } else {
        Classification::Habitable
    }
}

/// Liquid-water equilibrium temperature band in Kelvin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeqBand {
    pub min_k: f64,
    pub max_k: f64,
}

impl Default for TeqBand {
    fn default() -> Self {
        Self { min_k: 235.0, max_k: 350.0 }
    }
}

impl TeqBand {
    pub fn contains(&self, teq_k: f64) -> bool {
        teq_k >= self.min_k && teq_k <= self.max_k
    }

    pub fn classify(&self, teq_k: f64) -> Classification {
        if !teq_k.is_finite() || teq_k < self.min_k {
            Classification::TooCold
        } else if teq_k > self.max_k {
            Classification::TooHot
        } else {
            Classification::Habitable
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifyBy {
    #[default]
    OrbitalDistance,
    EquilibriumTemperature,
}

impl ClassifyBy {
    pub const ALL: [ClassifyBy; 2] = [ClassifyBy::OrbitalDistance, ClassifyBy::EquilibriumTemperature];

    pub fn label(&self) -> &'static str {
        match self {
            ClassifyBy::OrbitalDistance => "Orbital distance",
            ClassifyBy::EquilibriumTemperature => "Equilibrium temperature",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub zone_model: ZoneModel,
    pub classify_by: ClassifyBy,
    /// Downgrade distance-derived "habitable" verdicts whose equilibrium
    /// temperature falls outside `teq_band`.
    pub teq_guard: bool,
    pub teq_band: TeqBand,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            zone_model: ZoneModel::default(),
            classify_by: ClassifyBy::default(),
            teq_guard: true,
            teq_band: TeqBand::default(),
        }
    }
}

/// The subset of a catalog record the classifier reads.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlanetInputs {
    pub star_radius_solar: Option<f64>,
    pub star_teff_k: Option<f64>,
    pub orbital_distance_au: Option<f64>,
    pub eq_temp_k: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Assessment {
    pub zone: Option<HabitableZone>,
    pub classification: Classification,
    /// Set when the equilibrium-temperature guard overrode a habitable verdict.
    pub downgraded: bool,
}

pub fn assess(inputs: &PlanetInputs, config: &ClassifierConfig) -> Assessment {
    let zone = match (inputs.star_radius_solar, inputs.star_teff_k) {
        (Some(r), Some(t)) => zone_boundaries(r, t, config.zone_model),
        _ => None,
    };
    let teq = inputs.eq_temp_k.filter(|t| t.is_finite());

    match config.classify_by {
        ClassifyBy::EquilibriumTemperature => Assessment {
            zone,
            classification: teq
                .map(|t| config.teq_band.classify(t))
                .unwrap_or(Classification::TooCold),
            downgraded: false,
        },
        ClassifyBy::OrbitalDistance => {
            let verdict = match (zone, inputs.orbital_distance_au) {
                (Some(z), Some(d)) => z.classify(d),
                _ => Classification::TooCold,
            };
            let implausible = config.teq_guard
                && verdict == Classification::Habitable
                && teq.is_some_and(|t| !config.teq_band.contains(t));
            Assessment {
                zone,
                classification: if implausible { Classification::TooCold } else { verdict },
                downgraded: implausible,
            }
        }
    }
}
