//! Projected-canvas renderer.
//!
//! Rotates every entity with the camera's yaw-then-pitch matrix, applies a
//! perspective scalar and paints discs, rings and the zone band with the
//! egui painter. There is no depth buffer, so bodies are sorted far to near
//! before painting.

use crate::camera::{CameraController, CameraProfile};
use crate::config::Backend;
use crate::math::{hash_unit, rotate_point_matrix};
use crate::picking::{pick_screen, ScreenDisc};
use crate::scene::{EntityId, EntityKind, Framing, SceneEntity, SceneModel};
use crate::viewer::{FrameInput, Renderer};
use eframe::{egui, glow};
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::TAU;

pub const BACKGROUND: egui::Color32 = egui::Color32::from_rgb(5, 6, 16);
pub const MIN_SCALE: f64 = 0.35;
pub const MAX_SCALE: f64 = 2.5;
/// Focal distance in units of the scene's view radius.
const FOCAL_FACTOR: f64 = 3.0;
const RING_SEGMENTS: usize = 96;

#[derive(Clone, Copy, Debug)]
pub struct Projected {
    pub pos: egui::Pos2,
    /// Rotated z; larger is farther from the viewer.
    pub depth: f64,
    pub scale: f64,
}

pub struct Projection {
    center: egui::Pos2,
    ppu: f64,
    rotation: Matrix3<f64>,
    target: Vector3<f64>,
    focal: f64,
}

impl Projection {
    /// `None` when the surface has no area.
    pub fn new(rect: egui::Rect, camera: &CameraController, framing: &Framing) -> Option<Self> {
        if rect.width() < 1.0 || rect.height() < 1.0 {
            return None;
        }
        let view_radius = framing.view_radius.max(1e-9);
        let state = camera.state();
        Some(Self {
            center: rect.center(),
            ppu: rect.width().min(rect.height()) as f64 * 0.45 / view_radius * state.zoom,
            rotation: camera.rotation_matrix(),
            target: state.target,
            focal: view_radius * FOCAL_FACTOR,
        })
    }

    pub fn pixels_per_unit(&self) -> f64 {
        self.ppu
    }

    pub fn project(&self, p: &Vector3<f64>) -> Projected {
        let q = rotate_point_matrix(&(p - self.target), &self.rotation);
        let denom = self.focal + q.z;
        let scale = if denom > 1e-9 {
            (self.focal / denom).clamp(MIN_SCALE, MAX_SCALE)
        } else {
            MAX_SCALE
        };
        let pos = self.center + egui::vec2((q.x * scale * self.ppu) as f32, (-q.y * scale * self.ppu) as f32);
        Projected { pos, depth: q.z, scale }
    }

    fn circle(&self, center: &Vector3<f64>, radius: f64) -> Vec<egui::Pos2> {
        (0..=RING_SEGMENTS)
            .map(|k| {
                let a = k as f64 / RING_SEGMENTS as f64 * TAU;
                self.project(&(center + Vector3::new(radius * a.cos(), radius * a.sin(), 0.0))).pos
            })
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct BodySprite {
    pub id: EntityId,
    pub center: egui::Pos2,
    pub radius: f32,
    pub depth: f64,
    pub color: egui::Color32,
    pub opacity: f32,
    pub central: bool,
}

#[derive(Clone, Debug)]
pub struct RingPath {
    pub kind: EntityKind,
    pub points: Vec<egui::Pos2>,
    pub color: egui::Color32,
}

#[derive(Clone, Debug)]
pub struct BandMesh {
    pub inner: Vec<egui::Pos2>,
    pub outer: Vec<egui::Pos2>,
    pub color: egui::Color32,
}

#[derive(Clone, Debug, Default)]
pub struct DrawList {
    /// Far to near.
    pub bodies: Vec<BodySprite>,
    pub rings: Vec<RingPath>,
    pub bands: Vec<BandMesh>,
    pub star_count: usize,
}

impl DrawList {
    pub fn discs(&self) -> Vec<ScreenDisc> {
        self.bodies
            .iter()
            .filter(|b| !b.central)
            .map(|b| ScreenDisc {
                id: b.id,
                center: b.center,
                radius: b.radius,
                depth: b.depth,
            })
            .collect()
    }
}

fn opacity(scale: f64) -> f32 {
    (0.5 + 0.5 * scale).clamp(0.3, 1.0) as f32
}

fn body_sprite(projection: &Projection, e: &SceneEntity) -> BodySprite {
    let p = projection.project(&e.position);
    let central = e.kind == EntityKind::CentralBody;
    let (lo, hi) = if central { (6.0, 60.0) } else { (2.0, 24.0) };
    BodySprite {
        id: e.id,
        center: p.pos,
        radius: (e.radius * projection.ppu * p.scale).clamp(lo, hi) as f32,
        depth: p.depth,
        color: e.color,
        opacity: opacity(p.scale),
        central,
    }
}

/// Everything the canvas paints this frame. `None` for a zero-sized surface.
pub fn build_draw_list(rect: egui::Rect, frame: &FrameInput<'_>) -> Option<DrawList> {
    let projection = Projection::new(rect, frame.camera, &frame.scene.framing())?;
    let flags = frame.flags;
    let mut list = DrawList::default();

    for e in frame.scene.entities() {
        match e.kind {
            EntityKind::FieldStar => list.star_count += 1,
            EntityKind::CentralBody | EntityKind::Object { .. } => {
                if e.position.iter().all(|c| c.is_finite()) {
                    list.bodies.push(body_sprite(&projection, e));
                }
            }
            EntityKind::OrbitRing { .. } if flags.show_orbits => list.rings.push(RingPath {
                kind: e.kind,
                points: projection.circle(&e.position, e.radius),
                color: e.color.gamma_multiply(0.6),
            }),
            EntityKind::ZoneRing { .. } if flags.show_zone => list.rings.push(RingPath {
                kind: e.kind,
                points: projection.circle(&e.position, e.radius),
                color: e.color.gamma_multiply(0.8),
            }),
            EntityKind::ZoneBand if flags.show_zone => list.bands.push(BandMesh {
                inner: projection.circle(&e.position, e.inner_radius),
                outer: projection.circle(&e.position, e.radius),
                color: e.color.gamma_multiply(0.15),
            }),
            _ => {}
        }
    }

    list.bodies.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    Some(list)
}

fn paint_stars(painter: &egui::Painter, rect: egui::Rect, count: usize) {
    for i in 0..count as u64 {
        let x = rect.min.x + hash_unit(2 * i) as f32 * rect.width();
        let y = rect.min.y + hash_unit(2 * i + 1) as f32 * rect.height();
        let b = hash_unit(i ^ 0x0005_7A25);
        let shade = (90.0 + b * 140.0) as u8;
        painter.circle_filled(
            egui::pos2(x, y),
            0.5 + b as f32,
            egui::Color32::from_rgb(shade, shade, shade.saturating_add(15)),
        );
    }
}

fn paint_band(painter: &egui::Painter, band: &BandMesh) {
    let mut mesh = egui::Mesh::default();
    for (inner, outer) in band.inner.iter().zip(&band.outer) {
        mesh.colored_vertex(*inner, band.color);
        mesh.colored_vertex(*outer, band.color);
    }
    let n = band.inner.len().min(band.outer.len()) as u32;
    for k in 0..n.saturating_sub(1) {
        let i = 2 * k;
        mesh.add_triangle(i, i + 1, i + 2);
        mesh.add_triangle(i + 1, i + 3, i + 2);
    }
    painter.add(egui::Shape::mesh(mesh));
}

fn paint_body(painter: &egui::Painter, body: &BodySprite, hovered: bool) {
    let layers = if body.central { 6 } else { 3 };
    for k in (1..=layers).rev() {
        let spread = 1.0 + 0.45 * k as f32;
        let alpha = body.opacity * 0.5 / (k as f32 + 1.0);
        painter.circle_filled(body.center, body.radius * spread, body.color.gamma_multiply(alpha));
    }
    painter.circle_filled(body.center, body.radius, body.color.gamma_multiply(body.opacity));
    if hovered {
        painter.circle_stroke(
            body.center,
            body.radius + 3.0,
            egui::Stroke::new(1.5, egui::Color32::WHITE),
        );
    }
}

pub fn paint_label(painter: &egui::Painter, anchor: egui::Pos2, text: &str) {
    let font = egui::FontId::proportional(13.0);
    let galley = painter.layout_no_wrap(text.to_string(), font, egui::Color32::WHITE);
    let pos = anchor + egui::vec2(12.0, -12.0 - galley.size().y);
    let bg = egui::Rect::from_min_size(pos, galley.size()).expand(4.0);
    painter.rect_filled(bg, 4.0, egui::Color32::from_rgba_unmultiplied(0, 0, 0, 190));
    painter.galley(pos, galley, egui::Color32::WHITE);
}

#[derive(Default)]
pub struct CanvasRenderer {
    surface_missing: bool,
}

impl CanvasRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for CanvasRenderer {
    fn backend(&self) -> Backend {
        Backend::Canvas
    }

    fn camera_profile(&self, _scene: &SceneModel) -> CameraProfile {
        CameraProfile::projected()
    }

    fn paint(&mut self, painter: &egui::Painter, rect: egui::Rect, frame: &FrameInput<'_>) {
        let Some(list) = build_draw_list(rect, frame) else {
            if !self.surface_missing {
                log::debug!("canvas surface unavailable ({:?}), skipping paint", rect.size());
            }
            self.surface_missing = true;
            return;
        };
        self.surface_missing = false;

        painter.rect_filled(rect, 0.0, BACKGROUND);
        if frame.flags.show_field_stars {
            paint_stars(painter, rect, list.star_count);
        }
        for band in &list.bands {
            paint_band(painter, band);
        }
        for ring in &list.rings {
            painter.add(egui::Shape::line(ring.points.clone(), egui::Stroke::new(1.0, ring.color)));
        }
        for body in &list.bodies {
            paint_body(painter, body, frame.hovered == Some(body.id));
        }

        if frame.flags.show_labels {
            if let Some(label) = frame.label {
                if let Some(body) = list.bodies.iter().find(|b| b.id == label.entity) {
                    paint_label(painter, body.center + egui::vec2(body.radius, -body.radius), &label.text);
                }
            }
        }
    }

    fn pick(&self, pointer: egui::Pos2, rect: egui::Rect, frame: &FrameInput<'_>) -> Option<EntityId> {
        let list = build_draw_list(rect, frame)?;
        pick_screen(pointer, &list.discs())
    }

    fn destroy(&mut self, _gl: Option<&glow::Context>) {}
}
