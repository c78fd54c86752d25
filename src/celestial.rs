//! Stellar classes and visual sizing of catalog bodies.

use eframe::egui;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SpectralClass {
    O,
    B,
    A,
    F,
    G,
    K,
    M,
}

impl SpectralClass {
    pub const ALL: [SpectralClass; 7] = [
        SpectralClass::O,
        SpectralClass::B,
        SpectralClass::A,
        SpectralClass::F,
        SpectralClass::G,
        SpectralClass::K,
        SpectralClass::M,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SpectralClass::O => "O",
            SpectralClass::B => "B",
            SpectralClass::A => "A",
            SpectralClass::F => "F",
            SpectralClass::G => "G",
            SpectralClass::K => "K",
            SpectralClass::M => "M",
        }
    }

    /// Lower bound of the class's effective temperature (K).
    pub fn min_teff_k(&self) -> f64 {
        match self {
            SpectralClass::O => 30000.0,
            SpectralClass::B => 10000.0,
            SpectralClass::A => 7500.0,
            SpectralClass::F => 6000.0,
            SpectralClass::G => 5200.0,
            SpectralClass::K => 3700.0,
            SpectralClass::M => 0.0,
        }
    }

    pub fn color(&self) -> egui::Color32 {
        match self {
            SpectralClass::O => egui::Color32::from_rgb(155, 176, 255),
            SpectralClass::B => egui::Color32::from_rgb(170, 191, 255),
            SpectralClass::A => egui::Color32::from_rgb(202, 215, 255),
            SpectralClass::F => egui::Color32::from_rgb(248, 247, 255),
            SpectralClass::G => egui::Color32::from_rgb(255, 244, 234),
            SpectralClass::K => egui::Color32::from_rgb(255, 210, 161),
            SpectralClass::M => egui::Color32::from_rgb(255, 204, 111),
        }
    }

    pub fn from_teff(teff_k: f64) -> Option<Self> {
        if !teff_k.is_finite() || teff_k <= 0.0 {
            return None;
        }
        Self::ALL.into_iter().find(|c| teff_k >= c.min_teff_k())
    }

    /// Leading class letter of a catalog spectral type such as "M5.5 V".
    pub fn parse(spectral_type: &str) -> Option<Self> {
        match spectral_type.trim().chars().next()?.to_ascii_uppercase() {
            'O' => Some(SpectralClass::O),
            'B' => Some(SpectralClass::B),
            'A' => Some(SpectralClass::A),
            'F' => Some(SpectralClass::F),
            'G' => Some(SpectralClass::G),
            'K' => Some(SpectralClass::K),
            'M' => Some(SpectralClass::M),
            _ => None,
        }
    }

    /// Spectral type string first, effective temperature second.
    pub fn resolve(spectral_type: Option<&str>, teff_k: Option<f64>) -> Option<Self> {
        spectral_type
            .and_then(Self::parse)
            .or_else(|| teff_k.and_then(Self::from_teff))
    }
}

pub const SUN_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 220, 120);

pub fn star_color(spectral_type: Option<&str>, teff_k: Option<f64>) -> egui::Color32 {
    SpectralClass::resolve(spectral_type, teff_k)
        .map(|c| c.color())
        .unwrap_or(SUN_COLOR)
}

/// Square-root compression of physical radius (Earth radii) into
/// `[min, max]` display units; unknown sizes sit at the low end.
pub fn planet_visual_radius(radius_earth: Option<f64>, min: f64, max: f64) -> f64 {
    match radius_earth.filter(|r| r.is_finite() && *r > 0.0) {
        Some(r) => (min * r.sqrt()).clamp(min, max),
        None => min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("M5.5 V", SpectralClass::M)]
    #[case("g2 IV", SpectralClass::G)]
    #[case(" K", SpectralClass::K)]
    fn parses_leading_letter(#[case] s: &str, #[case] expected: SpectralClass) {
        assert_eq!(SpectralClass::parse(s), Some(expected));
    }

    #[rstest]
    #[case(2566.0, SpectralClass::M)]
    #[case(4402.0, SpectralClass::K)]
    #[case(5778.0, SpectralClass::G)]
    #[case(6091.0, SpectralClass::F)]
    #[case(40000.0, SpectralClass::O)]
    fn class_from_temperature(#[case] teff: f64, #[case] expected: SpectralClass) {
        assert_eq!(SpectralClass::from_teff(teff), Some(expected));
    }

    #[test]
    fn spectral_type_wins_over_temperature() {
        assert_eq!(SpectralClass::resolve(Some("K1"), Some(5778.0)), Some(SpectralClass::K));
        assert_eq!(SpectralClass::resolve(Some("?"), Some(5778.0)), Some(SpectralClass::G));
        assert_eq!(star_color(None, None), SUN_COLOR);
    }

    #[test]
    fn visual_radius_is_clamped() {
        assert_eq!(planet_visual_radius(None, 0.2, 0.8), 0.2);
        assert_eq!(planet_visual_radius(Some(400.0), 0.2, 0.8), 0.8);
        let earth = planet_visual_radius(Some(1.0), 0.2, 0.8);
        let super_earth = planet_visual_radius(Some(4.0), 0.2, 0.8);
        assert!(super_earth > earth);
    }
}
