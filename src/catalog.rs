//! Catalog records, decoding and the shared classification lookup.
//!
//! Rows use the NASA Exoplanet Archive column names (with plain aliases)
//! and are decoded leniently: numbers may arrive as strings, blanks or
//! nulls, and a row that cannot be decoded is dropped rather than failing
//! the whole catalog.

use crate::error::CatalogError;
use crate::habitability::{assess, Assessment, Classification, ClassifierConfig, PlanetInputs};
use crate::math::placement;
use nalgebra::Vector3;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;

pub const DEMO_CATALOG_JSON: &str = include_str!("../assets/demo_catalog.json");

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogRow {
    #[serde(rename = "pl_name", alias = "name", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(rename = "hostname", alias = "host", alias = "parent", deserialize_with = "lenient_string")]
    pub host: Option<String>,
    #[serde(rename = "ra", alias = "bearing", deserialize_with = "lenient_f64")]
    pub ra_deg: Option<f64>,
    #[serde(rename = "dec", alias = "elevation", deserialize_with = "lenient_f64")]
    pub dec_deg: Option<f64>,
    #[serde(rename = "sy_dist", alias = "range", alias = "distance", deserialize_with = "lenient_f64")]
    pub distance_pc: Option<f64>,
    #[serde(rename = "pl_rade", alias = "radius", deserialize_with = "lenient_f64")]
    pub radius_earth: Option<f64>,
    #[serde(rename = "pl_bmasse", alias = "mass", deserialize_with = "lenient_f64")]
    pub mass_earth: Option<f64>,
    #[serde(rename = "pl_orbsmax", alias = "semi_major_axis", deserialize_with = "lenient_f64")]
    pub semi_major_axis_au: Option<f64>,
    #[serde(rename = "pl_orbeccen", alias = "eccentricity", deserialize_with = "lenient_f64")]
    pub eccentricity: Option<f64>,
    #[serde(rename = "pl_orbper", alias = "period", deserialize_with = "lenient_f64")]
    pub orbital_period_days: Option<f64>,
    #[serde(rename = "pl_eqt", alias = "eq_temp", deserialize_with = "lenient_f64")]
    pub eq_temp_k: Option<f64>,
    #[serde(rename = "st_rad", alias = "star_radius", deserialize_with = "lenient_f64")]
    pub star_radius_solar: Option<f64>,
    #[serde(rename = "st_teff", alias = "star_temp", deserialize_with = "lenient_f64")]
    pub star_teff_k: Option<f64>,
    #[serde(rename = "st_mass", alias = "star_mass", deserialize_with = "lenient_f64")]
    pub star_mass_solar: Option<f64>,
    #[serde(rename = "st_spectype", alias = "spectral_type", deserialize_with = "lenient_string")]
    pub spectral_type: Option<String>,
    #[serde(rename = "discoverymethod", alias = "discovery_method", deserialize_with = "lenient_string")]
    pub discovery_method: Option<String>,
    #[serde(rename = "disc_year", alias = "discovery_year", deserialize_with = "lenient_f64")]
    pub discovery_year: Option<f64>,
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    let s = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return Ok(None),
    };
    Ok(if s.is_empty() { None } else { Some(s) })
}

/// One catalog body. Source fields never change after construction; the
/// Cartesian position is derived once and cached.
#[derive(Clone, Debug)]
pub struct CatalogObject {
    pub name: String,
    pub host: String,
    bearing_deg: Option<f64>,
    elevation_deg: Option<f64>,
    range_pc: Option<f64>,
    pub radius_earth: Option<f64>,
    pub mass_earth: Option<f64>,
    pub semi_major_axis_au: Option<f64>,
    pub eccentricity: Option<f64>,
    pub orbital_period_days: Option<f64>,
    pub eq_temp_k: Option<f64>,
    pub star_radius_solar: Option<f64>,
    pub star_teff_k: Option<f64>,
    pub star_mass_solar: Option<f64>,
    pub spectral_type: Option<String>,
    pub discovery_method: Option<String>,
    pub discovery_year: Option<i32>,
    position: Option<Vector3<f64>>,
}

impl CatalogObject {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            bearing_deg: None,
            elevation_deg: None,
            range_pc: None,
            radius_earth: None,
            mass_earth: None,
            semi_major_axis_au: None,
            eccentricity: None,
            orbital_period_days: None,
            eq_temp_k: None,
            star_radius_solar: None,
            star_teff_k: None,
            star_mass_solar: None,
            spectral_type: None,
            discovery_method: None,
            discovery_year: None,
            position: None,
        }
    }

    pub fn with_coordinates(mut self, bearing_deg: f64, elevation_deg: f64, range_pc: f64) -> Self {
        self.bearing_deg = Some(bearing_deg);
        self.elevation_deg = Some(elevation_deg);
        self.range_pc = Some(range_pc);
        self.position = placement(self.bearing_deg, self.elevation_deg, self.range_pc);
        self
    }

    pub fn with_star(mut self, radius_solar: f64, teff_k: f64) -> Self {
        self.star_radius_solar = Some(radius_solar);
        self.star_teff_k = Some(teff_k);
        self
    }

    pub fn with_orbit(mut self, semi_major_axis_au: f64) -> Self {
        self.semi_major_axis_au = Some(semi_major_axis_au);
        self
    }

    pub fn with_radius(mut self, radius_earth: f64) -> Self {
        self.radius_earth = Some(radius_earth);
        self
    }

    pub fn with_eq_temp(mut self, eq_temp_k: f64) -> Self {
        self.eq_temp_k = Some(eq_temp_k);
        self
    }

    /// `None` when the row has no name. A missing host makes the object its
    /// own system.
    pub fn from_row(row: CatalogRow) -> Option<Self> {
        let name = row.name?;
        let host = row.host.unwrap_or_else(|| name.clone());
        let position = placement(row.ra_deg, row.dec_deg, row.distance_pc);
        Some(Self {
            name,
            host,
            bearing_deg: row.ra_deg,
            elevation_deg: row.dec_deg,
            range_pc: row.distance_pc,
            radius_earth: row.radius_earth,
            mass_earth: row.mass_earth,
            semi_major_axis_au: row.semi_major_axis_au,
            eccentricity: row.eccentricity,
            orbital_period_days: row.orbital_period_days,
            eq_temp_k: row.eq_temp_k,
            star_radius_solar: row.star_radius_solar,
            star_teff_k: row.star_teff_k,
            star_mass_solar: row.star_mass_solar,
            spectral_type: row.spectral_type,
            discovery_method: row.discovery_method,
            discovery_year: row.discovery_year.map(|y| y.round() as i32),
            position,
        })
    }

    pub fn bearing_deg(&self) -> Option<f64> {
        self.bearing_deg
    }

    pub fn elevation_deg(&self) -> Option<f64> {
        self.elevation_deg
    }

    pub fn range_pc(&self) -> Option<f64> {
        self.range_pc
    }

    /// Cached observer-centred position in parsecs; `None` when unplaced.
    pub fn position(&self) -> Option<Vector3<f64>> {
        self.position
    }

    pub fn habitability_inputs(&self) -> PlanetInputs {
        PlanetInputs {
            star_radius_solar: self.star_radius_solar,
            star_teff_k: self.star_teff_k,
            orbital_distance_au: self.semi_major_axis_au,
            eq_temp_k: self.eq_temp_k,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassificationCounts {
    pub habitable: usize,
    pub too_hot: usize,
    pub too_cold: usize,
}

/// Immutable object list with a name index and per-object assessments.
#[derive(Clone, Debug)]
pub struct Catalog {
    objects: Vec<CatalogObject>,
    by_name: HashMap<String, usize>,
    assessments: Vec<Assessment>,
    classifier: ClassifierConfig,
    skipped_rows: usize,
}

impl Catalog {
    pub fn new(objects: Vec<CatalogObject>, classifier: ClassifierConfig) -> Self {
        let mut by_name = HashMap::with_capacity(objects.len());
        let mut unique = Vec::with_capacity(objects.len());
        for obj in objects {
            if by_name.contains_key(&obj.name) {
                log::warn!("duplicate catalog entry {:?} ignored", obj.name);
                continue;
            }
            by_name.insert(obj.name.clone(), unique.len());
            unique.push(obj);
        }
        let assessments = unique
            .iter()
            .map(|o| assess(&o.habitability_inputs(), &classifier))
            .collect();
        Self {
            objects: unique,
            by_name,
            assessments,
            classifier,
            skipped_rows: 0,
        }
    }

    /// Accepts a bare array of rows or an object carrying a `data` (or
    /// `rows`) array.
    pub fn from_json_str(json: &str, classifier: ClassifierConfig) -> Result<Self, CatalogError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let rows = match value {
            serde_json::Value::Array(rows) => rows,
            serde_json::Value::Object(mut map) => match map.remove("data").or_else(|| map.remove("rows")) {
                Some(serde_json::Value::Array(rows)) => rows,
                _ => return Err(CatalogError::UnexpectedShape),
            },
            _ => return Err(CatalogError::UnexpectedShape),
        };

        let total = rows.len();
        let objects: Vec<CatalogObject> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<CatalogRow>(row) {
                Ok(row) => CatalogObject::from_row(row),
                Err(e) => {
                    log::debug!("skipping catalog row: {e}");
                    None
                }
            })
            .collect();
        if objects.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut catalog = Self::new(objects, classifier);
        catalog.skipped_rows = total - catalog.objects.len();
        let unplaced = catalog.objects.iter().filter(|o| o.position().is_none()).count();
        log::info!(
            "catalog decoded: {} objects, {} rows skipped, {} without coordinates",
            catalog.objects.len(),
            catalog.skipped_rows,
            unplaced,
        );
        Ok(catalog)
    }

    pub fn load_file(path: &Path, classifier: ClassifierConfig) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, classifier)
    }

    pub fn fetch(url: &str, classifier: ClassifierConfig) -> Result<Self, CatalogError> {
        log::info!("fetching catalog from {url}");
        let body = ureq::get(url)
            .call()
            .map_err(|e| CatalogError::Fetch(format!("HTTP error: {e}")))?
            .into_string()
            .map_err(|e| CatalogError::Fetch(format!("read error: {e}")))?;
        Self::from_json_str(&body, classifier)
    }

    pub fn demo(classifier: ClassifierConfig) -> Result<Self, CatalogError> {
        Self::from_json_str(DEMO_CATALOG_JSON, classifier)
    }

    /// Same objects re-assessed under a different classifier.
    pub fn reclassified(&self, classifier: ClassifierConfig) -> Self {
        let assessments = self
            .objects
            .iter()
            .map(|o| assess(&o.habitability_inputs(), &classifier))
            .collect();
        Self {
            objects: self.objects.clone(),
            by_name: self.by_name.clone(),
            assessments,
            classifier,
            skipped_rows: self.skipped_rows,
        }
    }

    pub fn objects(&self) -> &[CatalogObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CatalogObject> {
        self.objects.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn classifier(&self) -> &ClassifierConfig {
        &self.classifier
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn assessment(&self, index: usize) -> Option<&Assessment> {
        self.assessments.get(index)
    }

    /// Lookup used by panels that color-code objects consistently with the
    /// 3D views.
    pub fn classification(&self, name: &str) -> Option<Classification> {
        self.index_of(name)
            .and_then(|i| self.assessments.get(i))
            .map(|a| a.classification)
    }

    pub fn system_members<'a>(&'a self, host: &'a str) -> impl Iterator<Item = (usize, &'a CatalogObject)> + 'a {
        self.objects.iter().enumerate().filter(move |(_, o)| o.host == host)
    }

    /// Distinct host names, sorted.
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.objects.iter().map(|o| o.host.as_str()).collect();
        hosts.sort_unstable();
        hosts.dedup();
        hosts
    }

    pub fn counts(&self) -> ClassificationCounts {
        let mut counts = ClassificationCounts::default();
        for a in &self.assessments {
            match a.classification {
                Classification::Habitable => counts.habitable += 1,
                Classification::TooHot => counts.too_hot += 1,
                Classification::TooCold => counts.too_cold += 1,
            }
        }
        counts
    }
}
