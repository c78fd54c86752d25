//! Pointer-to-entity resolution and the hovered-object label.
//!
//! The scene-graph view casts a ray through the pointer and intersects
//! bounding spheres; the projected canvas hit-tests the discs it just
//! painted. Only catalog objects are ever returned.

use crate::catalog::Catalog;
use crate::scene::{EntityId, SceneEntity, SceneModel};
use eframe::egui;
use nalgebra::{Matrix4, Point3, Vector2, Vector3};

/// Minimum on-screen pick radius in points.
pub const MIN_PICK_RADIUS_PX: f64 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f64>,
    pub dir: Vector3<f64>,
}

/// Normalized device coordinates of `pos` in `rect`, y up. `None` for a
/// zero-sized surface.
pub fn screen_to_ndc(pos: egui::Pos2, rect: egui::Rect) -> Option<Vector2<f64>> {
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return None;
    }
    let x = (pos.x - rect.min.x) as f64 / rect.width() as f64 * 2.0 - 1.0;
    let y = 1.0 - (pos.y - rect.min.y) as f64 / rect.height() as f64 * 2.0;
    Some(Vector2::new(x, y))
}

pub fn ray_from_ndc(ndc: Vector2<f64>, inv_view_proj: &Matrix4<f64>) -> Option<Ray> {
    let near = inv_view_proj.transform_point(&Point3::new(ndc.x, ndc.y, -1.0));
    let far = inv_view_proj.transform_point(&Point3::new(ndc.x, ndc.y, 1.0));
    let dir = far - near;
    let len = dir.norm();
    if !len.is_finite() || len <= 0.0 {
        return None;
    }
    Some(Ray {
        origin: near.coords,
        dir: dir / len,
    })
}

/// Distance along the ray to the first intersection with the sphere, or 0
/// when the origin is inside it.
pub fn ray_sphere(ray: &Ray, center: &Vector3<f64>, radius: f64) -> Option<f64> {
    let oc = ray.origin - center;
    let b = oc.dot(&ray.dir);
    let c = oc.norm_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

/// Nearest catalog object hit by `ray`. Each sphere is inflated to at least
/// `min_angular_radius` (radians) as seen from the ray origin so tiny
/// bodies stay clickable.
pub fn pick_ray(ray: &Ray, entities: &[SceneEntity], min_angular_radius: f64) -> Option<EntityId> {
    entities
        .iter()
        .filter(|e| e.is_pickable())
        .filter_map(|e| {
            let dist = (e.position - ray.origin).norm();
            let radius = e.radius.max(dist * min_angular_radius);
            ray_sphere(ray, &e.position, radius).map(|t| (t, e.id))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, id)| id)
}

/// A painted body as the canvas saw it this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenDisc {
    pub id: EntityId,
    pub center: egui::Pos2,
    pub radius: f32,
    /// Larger is farther.
    pub depth: f64,
}

/// Frontmost disc under the pointer.
pub fn pick_screen(pointer: egui::Pos2, discs: &[ScreenDisc]) -> Option<EntityId> {
    discs
        .iter()
        .filter(|d| {
            let r = d.radius.max(MIN_PICK_RADIUS_PX as f32);
            d.center.distance_sq(pointer) <= r * r
        })
        .min_by(|a, b| a.depth.total_cmp(&b.depth))
        .map(|d| d.id)
}

#[derive(Clone, Debug, PartialEq)]
pub struct HoverLabel {
    pub entity: EntityId,
    pub catalog_index: usize,
    pub text: String,
}

/// Owns the single hover label. It is torn down and rebuilt only when the
/// hovered entity changes.
#[derive(Default)]
pub struct HoverTracker {
    label: Option<HoverLabel>,
    builds: usize,
}

impl HoverTracker {
    /// Returns true when the labelled entity changed. Ids that resolve to
    /// no catalog object leave the tracker empty.
    pub fn update(&mut self, hovered: Option<EntityId>, scene: &SceneModel, catalog: &Catalog) -> bool {
        let before = self.current();
        if before == hovered {
            return false;
        }
        self.label = hovered.and_then(|id| {
            let index = scene.entity(id)?.catalog_index()?;
            let text = label_text(catalog, index)?;
            Some(HoverLabel {
                entity: id,
                catalog_index: index,
                text,
            })
        });
        if self.label.is_some() {
            self.builds += 1;
        }
        self.current() != before
    }

    pub fn current(&self) -> Option<EntityId> {
        self.label.as_ref().map(|l| l.entity)
    }

    pub fn label(&self) -> Option<&HoverLabel> {
        self.label.as_ref()
    }

    pub fn builds(&self) -> usize {
        self.builds
    }

    pub fn clear(&mut self) {
        self.label = None;
    }
}

pub fn label_text(catalog: &Catalog, index: usize) -> Option<String> {
    let obj = catalog.get(index)?;
    let mut text = obj.name.clone();
    if let Some(a) = catalog.assessment(index) {
        text.push_str(&format!("\n{}", a.classification.label()));
    }
    if let Some(d) = obj.range_pc() {
        text.push_str(&format!("\n{:.1} pc", d));
    }
    if let Some(a) = obj.semi_major_axis_au {
        text.push_str(&format!("  a = {:.3} AU", a));
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraController, CameraProfile};
    use crate::catalog::CatalogObject;
    use crate::config::SceneConfig;
    use crate::habitability::ClassifierConfig;
    use crate::scene::{EntityKind, Framing, ViewMode};
    use approx::assert_abs_diff_eq;

    fn entity(index: u32, kind: EntityKind, position: Vector3<f64>, radius: f64) -> SceneEntity {
        SceneEntity {
            id: EntityId { generation: 1, index },
            kind,
            position,
            radius,
            inner_radius: 0.0,
            color: egui::Color32::WHITE,
            classification: None,
        }
    }

    #[test]
    fn ndc_corners() {
        let rect = egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(200.0, 100.0));
        let tl = screen_to_ndc(rect.min, rect).unwrap();
        assert_abs_diff_eq!(tl.x, -1.0);
        assert_abs_diff_eq!(tl.y, 1.0);
        let c = screen_to_ndc(rect.center(), rect).unwrap();
        assert_abs_diff_eq!(c.norm(), 0.0);
        let empty = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(0.0, 50.0));
        assert!(screen_to_ndc(egui::pos2(0.0, 0.0), empty).is_none());
    }

    #[test]
    fn ray_sphere_cases() {
        let ray = Ray {
            origin: Vector3::new(0.0, 0.0, 10.0),
            dir: Vector3::new(0.0, 0.0, -1.0),
        };
        assert_abs_diff_eq!(ray_sphere(&ray, &Vector3::zeros(), 1.0).unwrap(), 9.0, epsilon = 1e-12);
        assert!(ray_sphere(&ray, &Vector3::new(5.0, 0.0, 0.0), 1.0).is_none());
        assert!(ray_sphere(&ray, &Vector3::new(0.0, 0.0, 20.0), 1.0).is_none());
        assert_eq!(ray_sphere(&ray, &Vector3::new(0.0, 0.0, 10.5), 1.0), Some(0.0));
    }

    #[test]
    fn pick_ray_returns_nearest_object_only() {
        let ray = Ray {
            origin: Vector3::new(0.0, 0.0, 10.0),
            dir: Vector3::new(0.0, 0.0, -1.0),
        };
        let entities = vec![
            entity(0, EntityKind::CentralBody, Vector3::new(0.0, 0.0, 5.0), 1.0),
            entity(1, EntityKind::Object { catalog_index: 0 }, Vector3::zeros(), 0.5),
            entity(2, EntityKind::Object { catalog_index: 1 }, Vector3::new(0.0, 0.0, 2.0), 0.5),
            entity(3, EntityKind::FieldStar, Vector3::new(0.0, 0.0, 8.0), 0.5),
            entity(4, EntityKind::OrbitRing { catalog_index: 0 }, Vector3::zeros(), 3.0),
        ];
        assert_eq!(pick_ray(&ray, &entities, 0.0).map(|id| id.index), Some(2));

        let miss = Ray {
            origin: Vector3::new(3.0, 0.0, 10.0),
            dir: Vector3::new(0.0, 0.0, -1.0),
        };
        assert_eq!(pick_ray(&miss, &entities, 0.0), None);
    }

    #[test]
    fn min_angular_radius_inflates_tiny_bodies() {
        let ray = Ray {
            origin: Vector3::new(0.05, 0.0, 10.0),
            dir: Vector3::new(0.0, 0.0, -1.0),
        };
        let entities = vec![entity(0, EntityKind::Object { catalog_index: 0 }, Vector3::zeros(), 0.001)];
        assert_eq!(pick_ray(&ray, &entities, 0.0), None);
        assert!(pick_ray(&ray, &entities, 0.01).is_some());
    }

    #[test]
    fn center_ray_runs_from_eye_to_target() {
        let framing = Framing {
            view_radius: 10.0,
            star_shell: 40.0,
        };
        let cam = CameraController::new(CameraProfile::orbit(&framing), false);
        let inv = cam.view_projection(1.5).try_inverse().unwrap();
        let ray = ray_from_ndc(Vector2::zeros(), &inv).unwrap();
        let expected = (cam.state().target - cam.eye()).normalize();
        assert_abs_diff_eq!(ray.dir.dot(&expected), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn screen_pick_prefers_frontmost() {
        let disc = |index, x: f32, depth| ScreenDisc {
            id: EntityId { generation: 1, index },
            center: egui::pos2(x, 50.0),
            radius: 10.0,
            depth,
        };
        let discs = vec![disc(0, 100.0, 5.0), disc(1, 104.0, 2.0), disc(2, 300.0, 0.0)];
        assert_eq!(pick_screen(egui::pos2(102.0, 50.0), &discs).map(|i| i.index), Some(1));
        assert_eq!(pick_screen(egui::pos2(200.0, 50.0), &discs), None);
    }

    #[test]
    fn hover_label_rebuilt_only_on_change() {
        let catalog = Catalog::new(
            vec![
                CatalogObject::new("A b", "A").with_coordinates(0.0, 0.0, 5.0),
                CatalogObject::new("B b", "B").with_coordinates(90.0, 0.0, 5.0),
            ],
            ClassifierConfig::default(),
        );
        let cfg = SceneConfig {
            field_star_count: 0,
            ..Default::default()
        };
        let scene = SceneModel::new(&catalog, ViewMode::Field, &cfg);
        let ids: Vec<EntityId> = scene
            .entities()
            .iter()
            .filter(|e| e.catalog_index().is_some())
            .map(|e| e.id)
            .collect();

        let mut hover = HoverTracker::default();
        assert!(hover.update(Some(ids[0]), &scene, &catalog));
        assert!(!hover.update(Some(ids[0]), &scene, &catalog));
        assert!(!hover.update(Some(ids[0]), &scene, &catalog));
        assert_eq!(hover.builds(), 1);
        assert!(hover.label().unwrap().text.starts_with("A b"));

        assert!(hover.update(Some(ids[1]), &scene, &catalog));
        assert_eq!(hover.builds(), 2);
        assert!(hover.update(None, &scene, &catalog));
        assert!(hover.label().is_none());
        assert_eq!(hover.builds(), 2);
    }

    #[test]
    fn unresolvable_hover_is_not_a_change() {
        let catalog = Catalog::new(
            vec![CatalogObject::new("A b", "A").with_coordinates(0.0, 0.0, 5.0)],
            ClassifierConfig::default(),
        );
        let cfg = SceneConfig {
            field_star_count: 0,
            ..Default::default()
        };
        let mut scene = SceneModel::new(&catalog, ViewMode::Field, &cfg);
        let object = |scene: &SceneModel| scene.entities().iter().find(|e| e.catalog_index().is_some()).unwrap().id;
        let stale = object(&scene);
        scene.rebuild(&catalog, ViewMode::Field, &cfg);
        let sun = scene.entities()[0].id;
        assert_eq!(scene.entities()[0].kind, EntityKind::CentralBody);

        let mut hover = HoverTracker::default();
        for _ in 0..3 {
            assert!(!hover.update(Some(stale), &scene, &catalog));
            assert!(!hover.update(Some(sun), &scene, &catalog));
        }
        assert!(hover.label().is_none());
        assert_eq!(hover.builds(), 0);

        let fresh = object(&scene);
        assert!(hover.update(Some(fresh), &scene, &catalog));
        assert!(hover.update(Some(stale), &scene, &catalog));
        assert!(hover.label().is_none());
        assert!(!hover.update(Some(stale), &scene, &catalog));
    }
}
