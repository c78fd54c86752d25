//! Scene-graph renderer on OpenGL.
//!
//! Bodies are instanced from one shared unit-sphere mesh and drawn with a
//! lit shader; orbits, zone outlines, the zone band and field stars share a
//! colored-vertex program. Geometry is regenerated on the CPU whenever the
//! scene generation changes and uploaded inside the paint callback.

use crate::camera::{CameraController, CameraProfile};
use crate::config::{Backend, ViewFlags};
use crate::drawing::{paint_label, BACKGROUND};
use crate::error::RenderError;
use crate::picking::{pick_ray, ray_from_ndc, screen_to_ndc, MIN_PICK_RADIUS_PX};
use crate::scene::{EntityId, EntityKind, SceneEntity, SceneModel};
use crate::viewer::{FrameInput, Renderer};
use eframe::{egui, egui_glow, glow};
use glow::HasContext as _;
use nalgebra::{Matrix4, Point3, Vector3};
use std::f64::consts::{PI, TAU};
use std::ops::Range;
use std::sync::Arc;

const SPHERE_STACKS: usize = 16;
const SPHERE_SLICES: usize = 24;
const RING_SEGMENTS: usize = 128;
/// Floats per overlay vertex: position then premultiplied RGBA.
const OVERLAY_STRIDE: usize = 7;
const STAR_POINT_SIZE: f32 = 2.0;

/// Unit sphere as interleaved positions (which double as normals) and
/// triangle indices.
pub fn sphere_mesh(stacks: usize, slices: usize) -> (Vec<f32>, Vec<u32>) {
    let mut positions = Vec::with_capacity((stacks + 1) * (slices + 1) * 3);
    for i in 0..=stacks {
        let phi = PI * i as f64 / stacks as f64;
        for j in 0..=slices {
            let theta = TAU * j as f64 / slices as f64;
            positions.push((phi.sin() * theta.cos()) as f32);
            positions.push((phi.sin() * theta.sin()) as f32);
            positions.push(phi.cos() as f32);
        }
    }
    let mut indices = Vec::with_capacity(stacks * slices * 6);
    let row = (slices + 1) as u32;
    for i in 0..stacks as u32 {
        for j in 0..slices as u32 {
            let a = i * row + j;
            let b = a + row;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    (positions, indices)
}

/// Line, band and point geometry for one scene generation. Ranges count
/// vertices.
#[derive(Clone, Debug, Default)]
pub struct OverlayGeometry {
    pub vertices: Vec<f32>,
    pub band: Range<i32>,
    pub orbits: Range<i32>,
    pub zone_lines: Range<i32>,
    pub stars: Range<i32>,
}

impl OverlayGeometry {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / OVERLAY_STRIDE
    }
}

fn push_vertex(out: &mut Vec<f32>, p: Vector3<f64>, color: [f32; 4]) {
    out.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
    out.extend_from_slice(&color);
}

fn circle_point(center: &Vector3<f64>, radius: f64, k: usize, segments: usize) -> Vector3<f64> {
    let a = k as f64 / segments as f64 * TAU;
    center + Vector3::new(radius * a.cos(), radius * a.sin(), 0.0)
}

fn push_ring(out: &mut Vec<f32>, e: &SceneEntity, color: [f32; 4], segments: usize) {
    for k in 0..segments {
        push_vertex(out, circle_point(&e.position, e.radius, k, segments), color);
        push_vertex(out, circle_point(&e.position, e.radius, k + 1, segments), color);
    }
}

fn push_band(out: &mut Vec<f32>, e: &SceneEntity, color: [f32; 4], segments: usize) {
    for k in 0..segments {
        let i0 = circle_point(&e.position, e.inner_radius, k, segments);
        let i1 = circle_point(&e.position, e.inner_radius, k + 1, segments);
        let o0 = circle_point(&e.position, e.radius, k, segments);
        let o1 = circle_point(&e.position, e.radius, k + 1, segments);
        for p in [i0, o0, i1, o0, o1, i1] {
            push_vertex(out, p, color);
        }
    }
}

fn section(out: &mut Vec<f32>, entities: &[SceneEntity], mut push: impl FnMut(&mut Vec<f32>, &SceneEntity)) -> Range<i32> {
    let start = (out.len() / OVERLAY_STRIDE) as i32;
    for e in entities {
        push(out, e);
    }
    start..(out.len() / OVERLAY_STRIDE) as i32
}

pub fn build_overlay(entities: &[SceneEntity], segments: usize) -> OverlayGeometry {
    let mut v = Vec::new();
    let band = section(&mut v, entities, |out, e| {
        if e.kind == EntityKind::ZoneBand {
            push_band(out, e, e.color.gamma_multiply(0.15).to_normalized_gamma_f32(), segments);
        }
    });
    let orbits = section(&mut v, entities, |out, e| {
        if matches!(e.kind, EntityKind::OrbitRing { .. }) {
            push_ring(out, e, e.color.gamma_multiply(0.6).to_normalized_gamma_f32(), segments);
        }
    });
    let zone_lines = section(&mut v, entities, |out, e| {
        if matches!(e.kind, EntityKind::ZoneRing { .. }) {
            push_ring(out, e, e.color.gamma_multiply(0.8).to_normalized_gamma_f32(), segments);
        }
    });
    let stars = section(&mut v, entities, |out, e| {
        if e.kind == EntityKind::FieldStar {
            push_vertex(out, e.position, e.color.to_normalized_gamma_f32());
        }
    });
    OverlayGeometry {
        vertices: v,
        band,
        orbits,
        zone_lines,
        stars,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyInstance {
    pub id: EntityId,
    pub center: [f32; 3],
    pub radius: f32,
    pub color: [f32; 4],
    /// Direction towards the light, in world space.
    pub light: [f32; 3],
    pub emissive: bool,
}

pub fn body_instances(entities: &[SceneEntity]) -> Vec<BodyInstance> {
    entities
        .iter()
        .filter(|e| e.is_body() && e.position.iter().all(|c| c.is_finite()))
        .map(|e| {
            let norm = e.position.norm();
            let light = if norm > 1e-9 { -e.position / norm } else { Vector3::z() };
            BodyInstance {
                id: e.id,
                center: [e.position.x as f32, e.position.y as f32, e.position.z as f32],
                radius: e.radius as f32,
                color: e.color.to_normalized_gamma_f32(),
                light: [light.x as f32, light.y as f32, light.z as f32],
                emissive: e.kind == EntityKind::CentralBody,
            }
        })
        .collect()
}

/// Screen position of a world point, or `None` behind the camera.
pub fn world_to_screen(p: &Vector3<f64>, view_proj: &Matrix4<f64>, rect: egui::Rect) -> Option<egui::Pos2> {
    let clip = view_proj * Point3::from(*p).to_homogeneous();
    if clip.w <= 1e-9 {
        return None;
    }
    let x = clip.x / clip.w;
    let y = clip.y / clip.w;
    Some(egui::pos2(
        rect.min.x + ((x + 1.0) * 0.5) as f32 * rect.width(),
        rect.min.y + ((1.0 - y) * 0.5) as f32 * rect.height(),
    ))
}

fn aspect(rect: egui::Rect) -> Option<f64> {
    (rect.width() >= 1.0 && rect.height() >= 1.0).then(|| rect.width() as f64 / rect.height() as f64)
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn u32_bytes(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

/// Geometry waiting for the next paint callback to upload it.
struct PendingUpload {
    generation: u64,
    overlay: OverlayGeometry,
    bodies: Vec<BodyInstance>,
}

struct GpuScene {
    body_program: glow::Program,
    line_program: glow::Program,
    sphere_vao: glow::VertexArray,
    sphere_vbo: glow::Buffer,
    sphere_ebo: glow::Buffer,
    sphere_index_count: i32,
    overlay_vao: glow::VertexArray,
    overlay_vbo: glow::Buffer,
    overlay: OverlayGeometry,
    bodies: Vec<BodyInstance>,
    uploaded_generation: Option<u64>,
    pending: Option<PendingUpload>,
    destroyed: bool,
}

unsafe fn build_program(gl: &glow::Context, vertex: &str, fragment: &str) -> Result<glow::Program, RenderError> {
    let shader_version = if cfg!(target_arch = "wasm32") {
        "#version 300 es"
    } else {
        "#version 330"
    };
    let program = gl.create_program().map_err(RenderError::Gl)?;
    let mut shaders = Vec::with_capacity(2);
    for (shader_type, source) in [(glow::VERTEX_SHADER, vertex), (glow::FRAGMENT_SHADER, fragment)] {
        let shader = gl.create_shader(shader_type).map_err(RenderError::Gl)?;
        gl.shader_source(shader, &format!("{shader_version}\n{source}"));
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            for s in shaders {
                gl.delete_shader(s);
            }
            gl.delete_program(program);
            return Err(RenderError::Shader(log));
        }
        gl.attach_shader(program, shader);
        shaders.push(shader);
    }

    gl.link_program(program);
    let linked = gl.get_program_link_status(program);
    for shader in shaders {
        gl.detach_shader(program, shader);
        gl.delete_shader(shader);
    }
    if !linked {
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        return Err(RenderError::Link(log));
    }
    Ok(program)
}

const BODY_VS: &str = r#"
    layout(location = 0) in vec3 a_pos;
    uniform mat4 u_view_proj;
    uniform vec3 u_center;
    uniform float u_radius;
    out vec3 v_normal;
    void main() {
        v_normal = a_pos;
        gl_Position = u_view_proj * vec4(u_center + a_pos * u_radius, 1.0);
    }
"#;

const BODY_FS: &str = r#"
    precision highp float;
    in vec3 v_normal;
    out vec4 out_color;
    uniform vec4 u_color;
    uniform vec3 u_light;
    uniform float u_emissive;
    uniform float u_highlight;
    void main() {
        vec3 n = normalize(v_normal);
        float shade = mix(0.25 + 0.75 * max(dot(n, u_light), 0.0), 1.0, u_emissive);
        vec3 color = u_color.rgb * shade + vec3(0.35 * u_highlight);
        out_color = vec4(color, u_color.a);
    }
"#;

const LINE_VS: &str = r#"
    layout(location = 0) in vec3 a_pos;
    layout(location = 1) in vec4 a_color;
    uniform mat4 u_view_proj;
    uniform float u_point_size;
    out vec4 v_color;
    void main() {
        v_color = a_color;
        gl_PointSize = u_point_size;
        gl_Position = u_view_proj * vec4(a_pos, 1.0);
    }
"#;

const LINE_FS: &str = r#"
    precision highp float;
    in vec4 v_color;
    out vec4 out_color;
    void main() {
        out_color = v_color;
    }
"#;

impl GpuScene {
    fn new(gl: &glow::Context) -> Result<Self, RenderError> {
        unsafe {
            let body_program = build_program(gl, BODY_VS, BODY_FS)?;
            let line_program = match build_program(gl, LINE_VS, LINE_FS) {
                Ok(p) => p,
                Err(e) => {
                    gl.delete_program(body_program);
                    return Err(e);
                }
            };

            let (positions, indices) = sphere_mesh(SPHERE_STACKS, SPHERE_SLICES);
            let sphere_vao = gl.create_vertex_array().map_err(RenderError::Gl)?;
            let sphere_vbo = gl.create_buffer().map_err(RenderError::Gl)?;
            let sphere_ebo = gl.create_buffer().map_err(RenderError::Gl)?;
            gl.bind_vertex_array(Some(sphere_vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(sphere_vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, &f32_bytes(&positions), glow::STATIC_DRAW);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(sphere_ebo));
            gl.buffer_data_u8_slice(glow::ELEMENT_ARRAY_BUFFER, &u32_bytes(&indices), glow::STATIC_DRAW);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 12, 0);

            let overlay_vao = gl.create_vertex_array().map_err(RenderError::Gl)?;
            let overlay_vbo = gl.create_buffer().map_err(RenderError::Gl)?;
            gl.bind_vertex_array(Some(overlay_vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(overlay_vbo));
            let stride = (OVERLAY_STRIDE * 4) as i32;
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 4, glow::FLOAT, false, stride, 12);

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            Ok(Self {
                body_program,
                line_program,
                sphere_vao,
                sphere_vbo,
                sphere_ebo,
                sphere_index_count: indices.len() as i32,
                overlay_vao,
                overlay_vbo,
                overlay: OverlayGeometry::default(),
                bodies: Vec::new(),
                uploaded_generation: None,
                pending: None,
                destroyed: false,
            })
        }
    }

    fn needs_upload(&self, generation: u64) -> bool {
        self.uploaded_generation != Some(generation)
            && self.pending.as_ref().map(|p| p.generation) != Some(generation)
    }

    fn flush_pending(&mut self, gl: &glow::Context) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.overlay_vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, &f32_bytes(&pending.overlay.vertices), glow::DYNAMIC_DRAW);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
        log::debug!(
            "uploaded scene generation {}: {} bodies, {} overlay vertices",
            pending.generation,
            pending.bodies.len(),
            pending.overlay.vertex_count()
        );
        self.overlay = pending.overlay;
        self.bodies = pending.bodies;
        self.uploaded_generation = Some(pending.generation);
    }

    fn paint(&mut self, gl: &glow::Context, view_proj: &[f32; 16], flags: ViewFlags, hovered: Option<EntityId>) {
        if self.destroyed {
            return;
        }
        self.flush_pending(gl);

        unsafe {
            gl.clear(glow::DEPTH_BUFFER_BIT);
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.depth_mask(true);
            gl.enable(glow::BLEND);
            gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);

            gl.use_program(Some(self.body_program));
            gl.bind_vertex_array(Some(self.sphere_vao));
            let loc = |name: &str| gl.get_uniform_location(self.body_program, name);
            gl.uniform_matrix_4_f32_slice(loc("u_view_proj").as_ref(), false, view_proj);
            for body in &self.bodies {
                let [x, y, z] = body.center;
                let [r, g, b, a] = body.color;
                let [lx, ly, lz] = body.light;
                gl.uniform_3_f32(loc("u_center").as_ref(), x, y, z);
                gl.uniform_1_f32(loc("u_radius").as_ref(), body.radius);
                gl.uniform_4_f32(loc("u_color").as_ref(), r, g, b, a);
                gl.uniform_3_f32(loc("u_light").as_ref(), lx, ly, lz);
                gl.uniform_1_f32(loc("u_emissive").as_ref(), if body.emissive { 1.0 } else { 0.0 });
                gl.uniform_1_f32(loc("u_highlight").as_ref(), if hovered == Some(body.id) { 1.0 } else { 0.0 });
                gl.draw_elements(glow::TRIANGLES, self.sphere_index_count, glow::UNSIGNED_INT, 0);
            }

            gl.depth_mask(false);
            gl.use_program(Some(self.line_program));
            gl.bind_vertex_array(Some(self.overlay_vao));
            gl.uniform_matrix_4_f32_slice(
                gl.get_uniform_location(self.line_program, "u_view_proj").as_ref(),
                false,
                view_proj,
            );
            gl.uniform_1_f32(
                gl.get_uniform_location(self.line_program, "u_point_size").as_ref(),
                STAR_POINT_SIZE,
            );
            let draw = |mode: u32, range: &Range<i32>| {
                if !range.is_empty() {
                    gl.draw_arrays(mode, range.start, range.end - range.start);
                }
            };
            if flags.show_zone {
                draw(glow::TRIANGLES, &self.overlay.band);
                draw(glow::LINES, &self.overlay.zone_lines);
            }
            if flags.show_orbits {
                draw(glow::LINES, &self.overlay.orbits);
            }
            if flags.show_field_stars {
                gl.enable(glow::PROGRAM_POINT_SIZE);
                draw(glow::POINTS, &self.overlay.stars);
                gl.disable(glow::PROGRAM_POINT_SIZE);
            }

            gl.depth_mask(true);
            gl.disable(glow::DEPTH_TEST);
            gl.bind_vertex_array(None);
            gl.use_program(None);
        }
    }

    fn destroy(&mut self, gl: &glow::Context) {
        if self.destroyed {
            return;
        }
        unsafe {
            gl.delete_program(self.body_program);
            gl.delete_program(self.line_program);
            gl.delete_vertex_array(self.sphere_vao);
            gl.delete_buffer(self.sphere_vbo);
            gl.delete_buffer(self.sphere_ebo);
            gl.delete_vertex_array(self.overlay_vao);
            gl.delete_buffer(self.overlay_vbo);
        }
        self.bodies.clear();
        self.overlay = OverlayGeometry::default();
        self.pending = None;
        self.uploaded_generation = None;
        self.destroyed = true;
    }
}

pub struct SceneGraphRenderer {
    gpu: Arc<egui::mutex::Mutex<GpuScene>>,
}

impl SceneGraphRenderer {
    pub fn new(gl: &glow::Context) -> Result<Self, RenderError> {
        let gpu = GpuScene::new(gl)?;
        log::info!("scene-graph renderer ready");
        Ok(Self {
            gpu: Arc::new(egui::mutex::Mutex::new(gpu)),
        })
    }

    fn view_proj(camera: &CameraController, rect: egui::Rect) -> Option<Matrix4<f64>> {
        aspect(rect).map(|a| camera.view_projection(a))
    }
}

impl Renderer for SceneGraphRenderer {
    fn backend(&self) -> Backend {
        Backend::SceneGraph
    }

    fn camera_profile(&self, scene: &SceneModel) -> CameraProfile {
        CameraProfile::orbit(&scene.framing())
    }

    fn paint(&mut self, painter: &egui::Painter, rect: egui::Rect, frame: &FrameInput<'_>) {
        let Some(view_proj) = Self::view_proj(frame.camera, rect) else {
            return;
        };

        {
            let mut gpu = self.gpu.lock();
            if gpu.destroyed {
                return;
            }
            let generation = frame.scene.generation();
            if gpu.needs_upload(generation) {
                let entities = frame.scene.entities();
                gpu.pending = Some(PendingUpload {
                    generation,
                    overlay: build_overlay(entities, RING_SEGMENTS),
                    bodies: body_instances(entities),
                });
            }
        }

        painter.rect_filled(rect, 0.0, BACKGROUND);

        let mut matrix = [0.0f32; 16];
        for (dst, src) in matrix.iter_mut().zip(view_proj.as_slice()) {
            *dst = *src as f32;
        }
        let gpu = Arc::clone(&self.gpu);
        let flags = *frame.flags;
        let hovered = frame.hovered;
        let callback = egui::PaintCallback {
            rect,
            callback: Arc::new(egui_glow::CallbackFn::new(move |_info, painter| {
                let gl = painter.gl();
                gpu.lock().paint(gl, &matrix, flags, hovered);
            })),
        };
        painter.add(callback);

        if frame.flags.show_labels {
            if let Some(label) = frame.label {
                let anchor = frame
                    .scene
                    .entity(label.entity)
                    .and_then(|e| world_to_screen(&e.position, &view_proj, rect));
                if let Some(anchor) = anchor.filter(|p| rect.contains(*p)) {
                    paint_label(painter, anchor + egui::vec2(8.0, -8.0), &label.text);
                }
            }
        }
    }

    fn pick(&self, pointer: egui::Pos2, rect: egui::Rect, frame: &FrameInput<'_>) -> Option<EntityId> {
        let view_proj = Self::view_proj(frame.camera, rect)?;
        let inv = view_proj.try_inverse()?;
        let ray = ray_from_ndc(screen_to_ndc(pointer, rect)?, &inv)?;
        let min_angle = MIN_PICK_RADIUS_PX * frame.camera.profile().fov_y / rect.height() as f64;
        pick_ray(&ray, frame.scene.entities(), min_angle)
    }

    fn destroy(&mut self, gl: Option<&glow::Context>) {
        let mut gpu = self.gpu.lock();
        match gl {
            Some(gl) => gpu.destroy(gl),
            None if !gpu.destroyed => {
                log::warn!("GL context already gone, GPU objects of this view are leaked");
                gpu.destroyed = true;
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogObject};
    use crate::config::SceneConfig;
    use crate::habitability::ClassifierConfig;
    use crate::scene::{Framing, ViewMode};
    use approx::assert_abs_diff_eq;

    fn system_scene() -> SceneModel {
        let catalog = Catalog::new(
            vec![
                CatalogObject::new("Sol-like b", "Sol-like")
                    .with_coordinates(10.0, 5.0, 20.0)
                    .with_star(1.0, 5778.0)
                    .with_orbit(1.0),
                CatalogObject::new("Sol-like c", "Sol-like")
                    .with_coordinates(10.0, 5.0, 20.0)
                    .with_star(1.0, 5778.0)
                    .with_orbit(3.0),
            ],
            ClassifierConfig::default(),
        );
        let cfg = SceneConfig {
            field_star_count: 25,
            ..Default::default()
        };
        SceneModel::new(&catalog, ViewMode::System("Sol-like".into()), &cfg)
    }

    #[test]
    fn sphere_mesh_is_unit_and_closed() {
        let (positions, indices) = sphere_mesh(4, 6);
        assert_eq!(positions.len(), 5 * 7 * 3);
        assert_eq!(indices.len(), 4 * 6 * 6);
        for p in positions.chunks(3) {
            let n = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert_abs_diff_eq!(n, 1.0, epsilon = 1e-5);
        }
        let max = *indices.iter().max().unwrap() as usize;
        assert!(max < positions.len() / 3);
    }

    #[test]
    fn overlay_sections_follow_scene() {
        let scene = system_scene();
        let overlay = build_overlay(scene.entities(), 8);
        let count = |kind: fn(&EntityKind) -> bool| scene.entities().iter().filter(|e| kind(&e.kind)).count() as i32;

        let orbits = count(|k| matches!(k, EntityKind::OrbitRing { .. }));
        let zone_rings = count(|k| matches!(k, EntityKind::ZoneRing { .. }));
        let bands = count(|k| *k == EntityKind::ZoneBand);
        assert_eq!(orbits, 2);
        assert_eq!(overlay.orbits.end - overlay.orbits.start, orbits * 8 * 2);
        assert_eq!(overlay.zone_lines.end - overlay.zone_lines.start, zone_rings * 8 * 2);
        assert_eq!(overlay.band.end - overlay.band.start, bands * 8 * 6);
        assert_eq!(overlay.stars.end - overlay.stars.start, 25);
        assert_eq!(overlay.stars.end as usize, overlay.vertex_count());
        assert_eq!(overlay.band.start, 0);
    }

    #[test]
    fn orbit_vertices_lie_on_ring() {
        let scene = system_scene();
        let overlay = build_overlay(scene.entities(), 16);
        let ring = scene
            .entities()
            .iter()
            .find(|e| matches!(e.kind, EntityKind::OrbitRing { .. }))
            .unwrap();
        let first = overlay.orbits.start as usize * OVERLAY_STRIDE;
        let v = &overlay.vertices[first..first + 3];
        let r = ((v[0] as f64 - ring.position.x).powi(2) + (v[1] as f64 - ring.position.y).powi(2)).sqrt();
        assert_abs_diff_eq!(r, ring.radius, epsilon = 1e-3 * ring.radius.max(1.0));
    }

    #[test]
    fn bodies_are_lit_from_the_host() {
        let scene = system_scene();
        let bodies = body_instances(scene.entities());
        assert_eq!(bodies.iter().filter(|b| b.emissive).count(), 1);
        assert_eq!(bodies.len(), 3);
        for b in bodies.iter().filter(|b| !b.emissive) {
            let c = Vector3::new(b.center[0], b.center[1], b.center[2]).normalize();
            let l = Vector3::new(b.light[0], b.light[1], b.light[2]);
            assert_abs_diff_eq!(c.dot(&l), -1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn world_to_screen_matches_ray_picking() {
        let framing = Framing {
            view_radius: 10.0,
            star_shell: 40.0,
        };
        let camera = CameraController::new(CameraProfile::orbit(&framing), false);
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(800.0, 600.0));
        let view_proj = camera.view_projection(800.0 / 600.0);

        let target = world_to_screen(&Vector3::zeros(), &view_proj, rect).unwrap();
        assert_abs_diff_eq!(target.x, 400.0, epsilon = 1e-3);
        assert_abs_diff_eq!(target.y, 300.0, epsilon = 1e-3);

        let behind = camera.eye() + (camera.eye() - camera.state().target);
        assert!(world_to_screen(&behind, &view_proj, rect).is_none());

        let p = Vector3::new(3.0, -2.0, 1.0);
        let s = world_to_screen(&p, &view_proj, rect).unwrap();
        let ray = ray_from_ndc(screen_to_ndc(s, rect).unwrap(), &view_proj.try_inverse().unwrap()).unwrap();
        let to_p = (p - ray.origin).normalize();
        assert_abs_diff_eq!(to_p.dot(&ray.dir), 1.0, epsilon = 1e-4);
    }
}
