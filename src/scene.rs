//! Renderable entities for one view.
//!
//! A `SceneModel` is rebuilt wholesale whenever the view mode or selected
//! system changes. Each build bumps `generation`; ids from an older build no
//! longer resolve, and backends use the generation to drop stale GPU
//! buffers. Nothing here holds backend handles.

use crate::catalog::Catalog;
use crate::celestial::{planet_visual_radius, star_color, SUN_COLOR};
use crate::config::SceneConfig;
use crate::habitability::{zone_boundaries, Classification, HabitableZone, T_SUN_K};
use crate::math::{display_radius, hash_direction, hash_unit, name_hash};
use eframe::egui;
use nalgebra::Vector3;
use std::f64::consts::TAU;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ViewMode {
    /// Every placed catalog object at its absolute position.
    Field,
    /// Planets of one host on synthetic circular orbits.
    System(String),
}

impl ViewMode {
    pub fn label(&self) -> String {
        match self {
            ViewMode::Field => "Field".to_string(),
            ViewMode::System(host) => host.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub generation: u64,
    pub index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ZoneEdge {
    Inner,
    Outer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    CentralBody,
    FieldStar,
    Object { catalog_index: usize },
    OrbitRing { catalog_index: usize },
    ZoneRing { edge: ZoneEdge },
    /// Annulus between `inner_radius` and `radius`.
    ZoneBand,
}

#[derive(Clone, Debug)]
pub struct SceneEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Centre; rings and bands lie in the z = 0 plane around it.
    pub position: Vector3<f64>,
    pub radius: f64,
    pub inner_radius: f64,
    pub color: egui::Color32,
    pub classification: Option<Classification>,
}

impl SceneEntity {
    pub fn catalog_index(&self) -> Option<usize> {
        match self.kind {
            EntityKind::Object { catalog_index } => Some(catalog_index),
            _ => None,
        }
    }

    pub fn is_pickable(&self) -> bool {
        matches!(self.kind, EntityKind::Object { .. })
    }

    pub fn is_body(&self) -> bool {
        matches!(self.kind, EntityKind::CentralBody | EntityKind::Object { .. })
    }

    pub fn is_ring(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::OrbitRing { .. } | EntityKind::ZoneRing { .. } | EntityKind::ZoneBand
        )
    }
}

/// Size of the populated region, used to derive camera limits and the
/// canvas projection scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Framing {
    pub view_radius: f64,
    pub star_shell: f64,
}

pub const ZONE_COLOR: egui::Color32 = egui::Color32::from_rgb(50, 205, 50);
pub const ORBIT_COLOR: egui::Color32 = egui::Color32::from_rgb(110, 110, 130);

#[derive(Clone, Debug)]
pub struct SceneModel {
    mode: ViewMode,
    generation: u64,
    entities: Arc<Vec<SceneEntity>>,
    framing: Framing,
    zone: Option<HabitableZone>,
    skipped: usize,
}

impl SceneModel {
    pub fn new(catalog: &Catalog, mode: ViewMode, cfg: &SceneConfig) -> Self {
        let mut scene = Self {
            mode: ViewMode::Field,
            generation: 0,
            entities: Arc::new(Vec::new()),
            framing: Framing {
                view_radius: 1.0,
                star_shell: cfg.field_star_shell,
            },
            zone: None,
            skipped: 0,
        };
        scene.rebuild(catalog, mode, cfg);
        scene
    }

    /// Drops every entity of the previous build and constructs the new mode
    /// from scratch.
    pub fn rebuild(&mut self, catalog: &Catalog, mode: ViewMode, cfg: &SceneConfig) {
        self.generation += 1;
        let mut builder = Builder {
            generation: self.generation,
            entities: Vec::new(),
            skipped: 0,
        };
        let (framing, zone) = match &mode {
            ViewMode::Field => builder.field(catalog, cfg),
            ViewMode::System(host) => builder.system(catalog, host, cfg),
        };
        log::debug!(
            "scene generation {} ({}): {} entities, {} skipped",
            self.generation,
            mode.label(),
            builder.entities.len(),
            builder.skipped,
        );
        self.mode = mode;
        self.entities = Arc::new(builder.entities);
        self.framing = framing;
        self.zone = zone;
        self.skipped = builder.skipped;
    }

    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entities(&self) -> &[SceneEntity] {
        &self.entities
    }

    pub fn shared_entities(&self) -> Arc<Vec<SceneEntity>> {
        Arc::clone(&self.entities)
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn zone(&self) -> Option<HabitableZone> {
        self.zone
    }

    /// Catalog objects left out of the current build for missing data.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// `None` for ids from an earlier build.
    pub fn entity(&self, id: EntityId) -> Option<&SceneEntity> {
        if id.generation != self.generation {
            return None;
        }
        self.entities.get(id.index as usize)
    }

    pub fn object_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_pickable()).count()
    }
}

struct Builder {
    generation: u64,
    entities: Vec<SceneEntity>,
    skipped: usize,
}

impl Builder {
    fn push(
        &mut self,
        kind: EntityKind,
        position: Vector3<f64>,
        radius: f64,
        color: egui::Color32,
        classification: Option<Classification>,
    ) {
        let id = EntityId {
            generation: self.generation,
            index: self.entities.len() as u32,
        };
        self.entities.push(SceneEntity {
            id,
            kind,
            position,
            radius,
            inner_radius: 0.0,
            color,
            classification,
        });
    }

    fn ring(&mut self, kind: EntityKind, radius: f64, color: egui::Color32) {
        self.push(kind, Vector3::zeros(), radius, color, None);
    }

    fn stars(&mut self, count: usize, shell: f64) {
        for i in 0..count {
            let dir = hash_direction(i as u64);
            let brightness = 120 + (hash_unit(i as u64 ^ 0x5157_4152) * 135.0) as u8;
            let color = egui::Color32::from_rgb(brightness, brightness, brightness.saturating_add(10));
            self.push(EntityKind::FieldStar, dir * shell, 0.0, color, None);
        }
    }

    fn field(&mut self, catalog: &Catalog, cfg: &SceneConfig) -> (Framing, Option<HabitableZone>) {
        let placed: Vec<(usize, Vector3<f64>)> = catalog
            .objects()
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.position().map(|p| (i, p)))
            .filter(|(_, p)| p.norm() >= cfg.min_field_range_pc)
            .collect();
        self.skipped = catalog.len() - placed.len();

        let view_radius = placed
            .iter()
            .map(|(_, p)| p.norm())
            .fold(10.0_f64, f64::max);
        let unit = view_radius / 200.0;
        let star_shell = view_radius * cfg.field_star_shell;

        self.push(
            EntityKind::CentralBody,
            Vector3::zeros(),
            cfg.central_body_radius * unit,
            SUN_COLOR,
            None,
        );

        let zone = zone_boundaries(1.0, T_SUN_K, catalog.classifier().zone_model);
        if let Some(z) = zone {
            let inner = display_radius(z.inner_au, cfg.field_zone_scale) * unit;
            let outer = display_radius(z.outer_au, cfg.field_zone_scale) * unit;
            self.ring(EntityKind::ZoneRing { edge: ZoneEdge::Inner }, inner, ZONE_COLOR);
            self.ring(EntityKind::ZoneRing { edge: ZoneEdge::Outer }, outer, ZONE_COLOR);
        }

        let (min_r, max_r) = cfg.field_object_radius;
        for (i, p) in placed {
            let obj = &catalog.objects()[i];
            let class = catalog.assessment(i).map(|a| a.classification);
            let color = class.map(|c| c.color()).unwrap_or(egui::Color32::GRAY);
            let radius = planet_visual_radius(obj.radius_earth, min_r, max_r) * unit;
            self.push(EntityKind::Object { catalog_index: i }, p, radius, color, class);
        }

        self.stars(cfg.field_star_count, star_shell);

        (
            Framing {
                view_radius,
                star_shell,
            },
            zone,
        )
    }

    fn system(&mut self, catalog: &Catalog, host: &str, cfg: &SceneConfig) -> (Framing, Option<HabitableZone>) {
        let members: Vec<usize> = catalog.system_members(host).map(|(i, _)| i).collect();
        if members.is_empty() {
            log::warn!("system {host:?} has no catalog members");
        }

        let star = members.iter().filter_map(|&i| catalog.get(i)).find(|o| {
            o.star_radius_solar.is_some() || o.star_teff_k.is_some() || o.spectral_type.is_some()
        });
        let star_colour = star
            .map(|o| star_color(o.spectral_type.as_deref(), o.star_teff_k))
            .unwrap_or(SUN_COLOR);
        let zone = members
            .iter()
            .filter_map(|&i| catalog.assessment(i))
            .find_map(|a| a.zone);

        let orbits: Vec<(usize, f64)> = members
            .iter()
            .filter_map(|&i| {
                let a = catalog.get(i)?.semi_major_axis_au?;
                (a.is_finite() && a > 0.0).then(|| (i, display_radius(a, cfg.orbit_scale)))
            })
            .collect();
        self.skipped = members.len() - orbits.len();

        let innermost = orbits.iter().map(|(_, r)| *r).fold(f64::INFINITY, f64::min);
        let central_radius = if innermost.is_finite() {
            cfg.central_body_radius.min(0.5 * innermost)
        } else {
            cfg.central_body_radius
        };
        self.push(EntityKind::CentralBody, Vector3::zeros(), central_radius, star_colour, None);

        let mut view_radius = orbits.iter().map(|(_, r)| *r).fold(cfg.orbit_scale, f64::max);

        if let Some(z) = zone {
            let inner = display_radius(z.inner_au, cfg.orbit_scale);
            let outer = display_radius(z.outer_au, cfg.orbit_scale);
            if outer - inner >= cfg.min_zone_band_width {
                self.push(EntityKind::ZoneBand, Vector3::zeros(), outer, ZONE_COLOR, None);
                if let Some(band) = self.entities.last_mut() {
                    band.inner_radius = inner;
                }
            }
            self.ring(EntityKind::ZoneRing { edge: ZoneEdge::Inner }, inner, ZONE_COLOR);
            self.ring(EntityKind::ZoneRing { edge: ZoneEdge::Outer }, outer, ZONE_COLOR);
            view_radius = view_radius.max(outer);
        }

        let (min_r, max_r) = cfg.system_planet_radius;
        for &(i, r) in &orbits {
            let obj = &catalog.objects()[i];
            let phase = hash_unit(name_hash(&obj.name)) * TAU;
            let position = Vector3::new(r * phase.cos(), r * phase.sin(), 0.0);
            let class = catalog.assessment(i).map(|a| a.classification);
            let color = class.map(|c| c.color()).unwrap_or(egui::Color32::GRAY);
            let radius = planet_visual_radius(obj.radius_earth, min_r, max_r);
            self.ring(EntityKind::OrbitRing { catalog_index: i }, r, ORBIT_COLOR);
            self.push(EntityKind::Object { catalog_index: i }, position, radius, color, class);
        }

        let view_radius = view_radius * 1.1;
        let star_shell = view_radius * cfg.field_star_shell;
        self.stars(cfg.field_star_count, star_shell);

        (
            Framing {
                view_radius,
                star_shell,
            },
            zone,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogObject;
    use crate::habitability::ClassifierConfig;
    use approx::assert_abs_diff_eq;

    fn sample_catalog() -> Catalog {
        let objects = vec![
            CatalogObject::new("Near b", "Near").with_coordinates(10.0, 5.0, 0.5),
            CatalogObject::new("Sol-like b", "Sol-like")
                .with_coordinates(90.0, 0.0, 10.0)
                .with_star(1.0, 5778.0)
                .with_orbit(1.0)
                .with_radius(1.0),
            CatalogObject::new("Sol-like c", "Sol-like")
                .with_coordinates(90.0, 0.0, 10.0)
                .with_star(1.0, 5778.0)
                .with_orbit(4.0),
            CatalogObject::new("Sol-like d", "Sol-like")
                .with_coordinates(90.0, 0.0, 10.0)
                .with_star(1.0, 5778.0),
            CatalogObject::new("Lost b", "Lost"),
        ];
        Catalog::new(objects, ClassifierConfig::default())
    }

    fn cfg() -> SceneConfig {
        SceneConfig {
            field_star_count: 50,
            ..Default::default()
        }
    }

    #[test]
    fn field_mode_skips_unplaced_and_near_objects() {
        let catalog = sample_catalog();
        let scene = SceneModel::new(&catalog, ViewMode::Field, &cfg());
        let indices: Vec<usize> = scene.entities().iter().filter_map(|e| e.catalog_index()).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(scene.skipped(), 2);
        assert_eq!(
            scene.entities().iter().filter(|e| e.kind == EntityKind::FieldStar).count(),
            50
        );
        assert_eq!(scene.entities()[0].kind, EntityKind::CentralBody);
    }

    #[test]
    fn field_mode_uses_absolute_positions() {
        let catalog = sample_catalog();
        let scene = SceneModel::new(&catalog, ViewMode::Field, &cfg());
        let obj = scene.entities().iter().find(|e| e.catalog_index() == Some(1)).unwrap();
        assert_abs_diff_eq!(obj.position.y, 10.0, epsilon = 1e-12);
        assert_eq!(obj.classification, Some(Classification::Habitable));
    }

    #[test]
    fn system_mode_places_planets_on_sqrt_orbits() {
        let catalog = sample_catalog();
        let config = cfg();
        let scene = SceneModel::new(&catalog, ViewMode::System("Sol-like".into()), &config);
        assert_eq!(scene.object_count(), 2);
        assert_eq!(scene.skipped(), 1);

        for e in scene.entities().iter().filter(|e| e.is_pickable()) {
            let a = catalog.get(e.catalog_index().unwrap()).unwrap().semi_major_axis_au.unwrap();
            assert_abs_diff_eq!(e.position.norm(), a.sqrt() * config.orbit_scale, epsilon = 1e-9);
            assert_eq!(e.position.z, 0.0);
        }
        let rings = scene
            .entities()
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::OrbitRing { .. }))
            .count();
        assert_eq!(rings, 2);
    }

    #[test]
    fn orbit_phase_is_stable_across_rebuilds() {
        let catalog = sample_catalog();
        let mode = ViewMode::System("Sol-like".into());
        let a = SceneModel::new(&catalog, mode.clone(), &cfg());
        let b = SceneModel::new(&catalog, mode, &cfg());
        let pa: Vec<_> = a.entities().iter().map(|e| e.position).collect();
        let pb: Vec<_> = b.entities().iter().map(|e| e.position).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn zone_band_only_when_wide_enough() {
        let catalog = sample_catalog();
        let mode = ViewMode::System("Sol-like".into());
        let has_band = |scene: &SceneModel| scene.entities().iter().any(|e| e.kind == EntityKind::ZoneBand);
        let outlines = |scene: &SceneModel| {
            scene
                .entities()
                .iter()
                .filter(|e| matches!(e.kind, EntityKind::ZoneRing { .. }))
                .count()
        };

        let wide = SceneModel::new(&catalog, mode.clone(), &cfg());
        assert!(has_band(&wide));
        assert_eq!(outlines(&wide), 2);
        let band = wide.entities().iter().find(|e| e.kind == EntityKind::ZoneBand).unwrap();
        assert!(band.inner_radius < band.radius);

        let narrow_cfg = SceneConfig {
            min_zone_band_width: 1e6,
            ..cfg()
        };
        let narrow = SceneModel::new(&catalog, mode, &narrow_cfg);
        assert!(!has_band(&narrow));
        assert_eq!(outlines(&narrow), 2);
    }

    #[test]
    fn rebuild_invalidates_old_ids() {
        let catalog = sample_catalog();
        let mut scene = SceneModel::new(&catalog, ViewMode::Field, &cfg());
        let old = scene.entities().iter().find(|e| e.is_pickable()).unwrap().id;
        assert!(scene.entity(old).is_some());

        scene.rebuild(&catalog, ViewMode::System("Sol-like".into()), &cfg());
        assert_eq!(scene.generation(), old.generation + 1);
        assert!(scene.entity(old).is_none());
    }

    #[test]
    fn unknown_system_has_only_central_body_and_stars() {
        let catalog = sample_catalog();
        let scene = SceneModel::new(&catalog, ViewMode::System("Nowhere".into()), &cfg());
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.entities().len(), 1 + 50);
    }
}
