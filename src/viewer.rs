//! Per-tab view engine and the dock tab viewer.
//!
//! A `Viewer` is one mounted view: it owns exactly one camera controller,
//! one scene model and one renderer, and turns pointer and keyboard input
//! into camera updates, hover labels and system selection. `ViewerState`
//! keeps the viewers of all dock tabs.

use crate::camera::{CameraController, CameraProfile};
use crate::catalog::Catalog;
use crate::config::{Backend, ViewConfig, ViewFlags};
use crate::drawing::CanvasRenderer;
use crate::picking::{HoverLabel, HoverTracker};
use crate::renderer::SceneGraphRenderer;
use crate::scene::{EntityId, SceneModel, ViewMode};
use eframe::{egui, glow};
use egui_dock::tab_viewer::OnCloseResponse;
use egui_dock::{NodeIndex, SurfaceIndex, TabViewer};
use nalgebra::Vector2;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only view of everything a renderer needs for one frame.
pub struct FrameInput<'a> {
    pub catalog: &'a Catalog,
    pub scene: &'a SceneModel,
    pub camera: &'a CameraController,
    pub flags: &'a ViewFlags,
    pub hovered: Option<EntityId>,
    pub label: Option<&'a HoverLabel>,
}

/// A rendering backend. Scene and camera stay backend-agnostic; anything
/// GPU-side lives behind this trait and is released in `destroy`.
pub trait Renderer {
    fn backend(&self) -> Backend;

    /// Camera limits and defaults for the given scene.
    fn camera_profile(&self, scene: &SceneModel) -> CameraProfile;

    fn paint(&mut self, painter: &egui::Painter, rect: egui::Rect, frame: &FrameInput<'_>);

    fn pick(&self, pointer: egui::Pos2, rect: egui::Rect, frame: &FrameInput<'_>) -> Option<EntityId>;

    fn destroy(&mut self, gl: Option<&glow::Context>);
}

/// Builds the requested backend, falling back to the canvas when there is
/// no GL context or the GPU pipeline cannot be created.
pub fn make_renderer(backend: Backend, gl: Option<&Arc<glow::Context>>) -> Box<dyn Renderer> {
    match (backend, gl) {
        (Backend::Canvas, _) => Box::new(CanvasRenderer::new()),
        (Backend::SceneGraph, Some(gl)) => match SceneGraphRenderer::new(gl) {
            Ok(renderer) => Box::new(renderer),
            Err(e) => {
                log::error!("scene-graph renderer unavailable, falling back to canvas: {e}");
                Box::new(CanvasRenderer::new())
            }
        },
        (Backend::SceneGraph, None) => {
            log::warn!("no GL context, falling back to canvas renderer");
            Box::new(CanvasRenderer::new())
        }
    }
}

const MAX_FRAME_DT: f64 = 0.1;

pub struct Viewer {
    catalog: Arc<Catalog>,
    config: ViewConfig,
    scene: SceneModel,
    camera: Option<CameraController>,
    renderer: Box<dyn Renderer>,
    hover: HoverTracker,
    selected: Option<usize>,
    surface_ready: bool,
    /// Set once `unmount` has destroyed the renderer's GPU objects.
    released: bool,
}

impl Viewer {
    pub fn new(catalog: Arc<Catalog>, config: ViewConfig, renderer: Box<dyn Renderer>) -> Self {
        let scene = SceneModel::new(&catalog, ViewMode::Field, &config.scene);
        Self {
            catalog,
            config,
            scene,
            camera: None,
            renderer,
            hover: HoverTracker::default(),
            selected: None,
            surface_ready: false,
            released: false,
        }
    }

    /// Creates the camera and, after an `unmount`, a fresh renderer of the
    /// same backend.
    pub fn mount(&mut self, gl: Option<&Arc<glow::Context>>) {
        if self.camera.is_some() {
            return;
        }
        if self.released {
            self.renderer = make_renderer(self.renderer.backend(), gl);
            self.released = false;
        }
        let profile = self.renderer.camera_profile(&self.scene);
        self.camera = Some(CameraController::new(profile, self.config.flags.auto_rotate));
        log::debug!("view mounted with {:?} renderer", self.renderer.backend());
    }

    pub fn is_mounted(&self) -> bool {
        self.camera.is_some()
    }

    /// Releases GPU resources and input state. A later `mount` rebuilds them.
    pub fn unmount(&mut self, gl: Option<&glow::Context>) {
        self.renderer.destroy(gl);
        self.released = true;
        self.camera = None;
        self.hover.clear();
        self.surface_ready = false;
        log::debug!("view unmounted");
    }

    /// Records the container size; false while it has no area.
    pub fn resize(&mut self, rect: egui::Rect) -> bool {
        let ready = rect.width() >= 1.0 && rect.height() >= 1.0;
        if !ready && self.surface_ready {
            log::debug!("view surface collapsed to {:?}", rect.size());
        }
        self.surface_ready = ready;
        ready
    }

    /// Tears down the current scene, builds the new mode and resets the
    /// camera to that mode's defaults.
    pub fn set_mode(&mut self, mode: ViewMode) {
        self.scene.rebuild(&self.catalog, mode, &self.config.scene);
        self.hover.clear();
        let profile = self.renderer.camera_profile(&self.scene);
        if let Some(camera) = self.camera.as_mut() {
            camera.set_profile(profile);
        }
    }

    /// Makes the object's host the selected system.
    pub fn select_object(&mut self, index: usize) {
        let Some(obj) = self.catalog.get(index) else {
            return;
        };
        let host = obj.host.clone();
        log::info!("selected {} (system {})", obj.name, host);
        self.selected = Some(index);
        self.set_mode(ViewMode::System(host));
    }

    pub fn select_system(&mut self, host: &str) {
        self.selected = None;
        self.set_mode(ViewMode::System(host.to_string()));
    }

    pub fn back_to_field(&mut self) {
        self.selected = None;
        self.set_mode(ViewMode::Field);
    }

    /// Rebuilds the current mode in place. The camera keeps its pose and
    /// only picks up the new limits.
    fn refresh_scene(&mut self) {
        let mode = self.scene.mode().clone();
        self.scene.rebuild(&self.catalog, mode, &self.config.scene);
        self.hover.clear();
        let profile = self.renderer.camera_profile(&self.scene);
        if let Some(camera) = self.camera.as_mut() {
            camera.set_limits(profile);
        }
    }

    pub fn set_catalog(&mut self, catalog: Arc<Catalog>) {
        self.catalog = catalog;
        self.selected = self.selected.filter(|&i| i < self.catalog.len());
        self.refresh_scene();
    }

    /// Scene parameters changed; rebuild the current mode.
    pub fn set_config(&mut self, config: ViewConfig) {
        self.config = config;
        self.refresh_scene();
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>, gl: Option<&glow::Context>) {
        if !self.released {
            self.renderer.destroy(gl);
        }
        self.released = false;
        self.renderer = renderer;
        self.hover.clear();
        let profile = self.renderer.camera_profile(&self.scene);
        if let Some(camera) = self.camera.as_mut() {
            camera.set_profile(profile);
        }
    }

    pub fn backend(&self) -> Backend {
        self.renderer.backend()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn flags_mut(&mut self) -> &mut ViewFlags {
        &mut self.config.flags
    }

    pub fn scene(&self) -> &SceneModel {
        &self.scene
    }

    pub fn camera(&self) -> Option<&CameraController> {
        self.camera.as_ref()
    }

    /// Catalog index of the object under the pointer.
    pub fn hovered_object(&self) -> Option<usize> {
        self.hover.label().map(|l| l.catalog_index)
    }

    pub fn selected_object(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_system(&self) -> Option<&str> {
        match self.scene.mode() {
            ViewMode::System(host) => Some(host.as_str()),
            ViewMode::Field => None,
        }
    }

    /// Runs `f` on the camera. Using the camera before `mount` is a bug:
    /// it asserts in debug builds and is ignored otherwise.
    pub fn with_camera<R>(&mut self, f: impl FnOnce(&mut CameraController) -> R) -> Option<R> {
        debug_assert!(self.camera.is_some(), "camera used before the view was mounted");
        self.camera.as_mut().map(f)
    }

    pub fn zoom_in(&mut self) {
        self.with_camera(|c| c.zoom_in());
    }

    pub fn zoom_out(&mut self) {
        self.with_camera(|c| c.zoom_out());
    }

    pub fn reset_camera(&mut self) {
        self.with_camera(|c| c.reset());
    }

    pub fn toggle_auto_rotate(&mut self) {
        self.with_camera(|c| c.toggle_auto_rotate());
    }

    pub fn pick(&self, pointer: egui::Pos2, rect: egui::Rect) -> Option<EntityId> {
        let camera = self.camera.as_ref()?;
        let frame = FrameInput {
            catalog: &self.catalog,
            scene: &self.scene,
            camera,
            flags: &self.config.flags,
            hovered: self.hover.current(),
            label: self.hover.label(),
        };
        self.renderer.pick(pointer, rect, &frame)
    }

    /// Updates the hover label; returns true when the hovered entity changed.
    pub fn hover_at(&mut self, pointer: Option<egui::Pos2>, rect: egui::Rect) -> bool {
        let hovered = pointer.and_then(|p| self.pick(p, rect));
        self.hover.update(hovered, &self.scene, &self.catalog)
    }

    pub fn click_at(&mut self, pointer: egui::Pos2, rect: egui::Rect) {
        let index = self
            .pick(pointer, rect)
            .and_then(|id| self.scene.entity(id))
            .and_then(|e| e.catalog_index());
        if let Some(index) = index {
            self.select_object(index);
        }
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, response: &egui::Response, rect: egui::Rect) {
        let to_vec = |p: egui::Pos2| Vector2::new(p.x as f64, p.y as f64);

        if response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                self.with_camera(|c| c.begin_drag(to_vec(pos)));
            }
        }
        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                self.with_camera(|c| c.update_drag(to_vec(pos)));
            }
        }
        if response.dragged_by(egui::PointerButton::Secondary) {
            let d = response.drag_delta();
            self.with_camera(|c| c.pan(Vector2::new(d.x as f64, d.y as f64)));
        }
        if response.drag_stopped() {
            self.with_camera(|c| c.end_drag());
        }

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                self.with_camera(|c| c.scroll(scroll as f64));
            }
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.click_at(pos, rect);
            }
        }
    }

    fn handle_keys(&mut self, ui: &egui::Ui) {
        let (zoom_in, zoom_out, reset, toggle, back) = ui.input(|i| {
            (
                i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals),
                i.key_pressed(egui::Key::Minus),
                i.key_pressed(egui::Key::R),
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::Escape),
            )
        });
        if zoom_in {
            self.zoom_in();
        }
        if zoom_out {
            self.zoom_out();
        }
        if reset {
            self.reset_camera();
        }
        if toggle {
            self.toggle_auto_rotate();
        }
        if back && matches!(self.scene.mode(), ViewMode::System(_)) {
            self.back_to_field();
        }
    }

    /// One frame: input, camera tick, hover, paint.
    pub fn ui(&mut self, ui: &mut egui::Ui, gl: Option<&Arc<glow::Context>>) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        if !self.resize(rect) {
            return;
        }
        self.mount(gl);

        self.handle_pointer(ui, &response, rect);
        if response.hovered() {
            self.handle_keys(ui);
        }
        let dt = (ui.input(|i| i.stable_dt) as f64).min(MAX_FRAME_DT);
        self.with_camera(|c| c.tick(dt));

        self.hover_at(response.hover_pos(), rect);
        let dragging = self.camera.as_ref().is_some_and(|c| c.state().dragging);
        if dragging {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if self.hover.current().is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        }

        let Some(camera) = self.camera.as_ref() else {
            return;
        };
        let frame = FrameInput {
            catalog: &self.catalog,
            scene: &self.scene,
            camera,
            flags: &self.config.flags,
            hovered: self.hover.current(),
            label: self.hover.label(),
        };
        let painter = ui.painter_at(rect);
        self.renderer.paint(&painter, rect, &frame);

        ui.ctx().request_repaint();
    }
}

pub(crate) struct ViewerState {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) config: ViewConfig,
    pub(crate) views: HashMap<usize, Viewer>,
    pub(crate) tab_counter: usize,
    pub(crate) active_tab: Option<usize>,
    pub(crate) pending_add_tab: Option<usize>,
    pub(crate) gl: Option<Arc<glow::Context>>,
    pub(crate) show_side_panel: bool,
}

impl ViewerState {
    pub(crate) fn new(catalog: Arc<Catalog>, config: ViewConfig, gl: Option<Arc<glow::Context>>) -> Self {
        Self {
            catalog,
            config,
            views: HashMap::new(),
            tab_counter: 0,
            active_tab: None,
            pending_add_tab: None,
            gl,
            show_side_panel: true,
        }
    }

    /// Creates a viewer for a new tab and returns its id.
    pub(crate) fn add_view(&mut self) -> usize {
        let id = self.tab_counter;
        self.tab_counter += 1;
        let renderer = make_renderer(self.config.backend, self.gl.as_ref());
        let viewer = Viewer::new(Arc::clone(&self.catalog), self.config.clone(), renderer);
        self.views.insert(id, viewer);
        id
    }

    pub(crate) fn active_view_mut(&mut self) -> Option<&mut Viewer> {
        self.active_tab.and_then(|id| self.views.get_mut(&id))
    }

    /// Swaps the catalog of every view, e.g. after re-classification.
    pub(crate) fn set_catalog(&mut self, catalog: Arc<Catalog>) {
        self.catalog = Arc::clone(&catalog);
        for viewer in self.views.values_mut() {
            viewer.set_catalog(Arc::clone(&catalog));
        }
    }

    pub(crate) fn destroy_all(&mut self, gl: Option<&glow::Context>) {
        for viewer in self.views.values_mut() {
            viewer.unmount(gl);
        }
    }
}

impl TabViewer for ViewerState {
    type Tab = usize;

    fn title(&mut self, tab: &mut Self::Tab) -> egui::WidgetText {
        self.views
            .get(tab)
            .map(|v| v.scene().mode().label())
            .unwrap_or_else(|| "?".to_string())
            .into()
    }

    fn ui(&mut self, ui: &mut egui::Ui, tab: &mut Self::Tab) {
        if let Some(viewer) = self.views.get_mut(tab) {
            if ui.ui_contains_pointer() || self.active_tab.is_none() {
                self.active_tab = Some(*tab);
            }
            viewer.ui(ui, self.gl.as_ref());
        }
    }

    fn scroll_bars(&self, _tab: &Self::Tab) -> [bool; 2] {
        [false, false]
    }

    fn closeable(&mut self, _tab: &mut Self::Tab) -> bool {
        self.views.len() > 1
    }

    fn on_close(&mut self, tab: &mut Self::Tab) -> OnCloseResponse {
        if self.views.len() <= 1 {
            return OnCloseResponse::Ignore;
        }
        if let Some(mut viewer) = self.views.remove(tab) {
            viewer.unmount(self.gl.as_deref());
        }
        if self.active_tab == Some(*tab) {
            self.active_tab = None;
        }
        OnCloseResponse::Close
    }

    fn on_add(&mut self, _surface: SurfaceIndex, _node: NodeIndex) {
        let id = self.add_view();
        self.pending_add_tab = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogObject;
    use crate::config::SceneConfig;
    use crate::habitability::ClassifierConfig;
    use crate::scene::EntityKind;
    use std::cell::Cell;
    use std::rc::Rc;

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::new(
            vec![
                CatalogObject::new("Alpha b", "Alpha")
                    .with_coordinates(30.0, 10.0, 12.0)
                    .with_star(0.9, 5300.0)
                    .with_orbit(0.8)
                    .with_radius(1.2),
                CatalogObject::new("Alpha c", "Alpha")
                    .with_coordinates(30.0, 10.0, 12.0)
                    .with_star(0.9, 5300.0)
                    .with_orbit(0.05),
                CatalogObject::new("Beta b", "Beta").with_coordinates(200.0, -40.0, 30.0),
            ],
            ClassifierConfig::default(),
        ))
    }

    fn config() -> ViewConfig {
        ViewConfig {
            backend: Backend::Canvas,
            scene: SceneConfig {
                field_star_count: 40,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn mounted() -> Viewer {
        let mut viewer = Viewer::new(catalog(), config(), Box::new(CanvasRenderer::new()));
        viewer.mount(None);
        viewer
    }

    fn disturb(viewer: &mut Viewer) {
        viewer.with_camera(|c| {
            c.begin_drag(Vector2::new(0.0, 0.0));
            c.update_drag(Vector2::new(80.0, 45.0));
            c.end_drag();
            c.zoom_in();
            c.zoom_in();
        });
    }

    #[test]
    fn camera_exists_only_while_mounted() {
        let mut viewer = Viewer::new(catalog(), config(), Box::new(CanvasRenderer::new()));
        assert!(viewer.camera().is_none());
        viewer.mount(None);
        assert!(viewer.is_mounted());
        viewer.unmount(None);
        assert!(viewer.camera().is_none());
        assert!(viewer.hovered_object().is_none());
    }

    #[test]
    fn field_system_field_round_trip() {
        let mut viewer = mounted();
        let field_profile = CameraProfile::projected();

        disturb(&mut viewer);
        viewer.select_object(0);
        assert_eq!(viewer.selected_system(), Some("Alpha"));
        assert_eq!(viewer.selected_object(), Some(0));
        let system_entities = viewer.scene().entities().len();
        let system_generation = viewer.scene().generation();

        disturb(&mut viewer);
        viewer.back_to_field();
        assert_eq!(viewer.selected_system(), None);
        let s = viewer.camera().unwrap().state();
        assert_eq!(s.yaw, field_profile.default_yaw);
        assert_eq!(s.pitch, field_profile.default_pitch);
        assert_eq!(s.zoom, field_profile.default_zoom);

        disturb(&mut viewer);
        viewer.select_object(1);
        let s = viewer.camera().unwrap().state();
        assert_eq!((s.yaw, s.pitch, s.zoom), (0.0, 0.0, 1.0));
        assert_eq!(viewer.scene().entities().len(), system_entities);
        assert!(viewer.scene().generation() > system_generation);

        let mut fresh = mounted();
        fresh.select_object(0);
        assert_eq!(fresh.scene().entities().len(), viewer.scene().entities().len());
    }

    #[test]
    fn system_mode_shows_only_host_members() {
        let mut viewer = mounted();
        viewer.select_system("Alpha");
        let hosts: Vec<&str> = viewer
            .scene()
            .entities()
            .iter()
            .filter_map(|e| e.catalog_index())
            .map(|i| viewer.catalog().get(i).unwrap().host.as_str())
            .collect();
        assert_eq!(hosts, vec!["Alpha", "Alpha"]);
        assert!(viewer
            .scene()
            .entities()
            .iter()
            .any(|e| matches!(e.kind, EntityKind::OrbitRing { .. })));
    }

    #[test]
    fn click_on_object_selects_its_system() {
        let mut viewer = mounted();
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(900.0, 700.0));
        assert!(viewer.resize(rect));

        let camera = viewer.camera().unwrap();
        let frame = FrameInput {
            catalog: viewer.catalog(),
            scene: viewer.scene(),
            camera,
            flags: &viewer.config().flags,
            hovered: None,
            label: None,
        };
        let list = crate::drawing::build_draw_list(rect, &frame).unwrap();
        let beta = list
            .bodies
            .iter()
            .find(|b| viewer.scene().entity(b.id).and_then(|e| e.catalog_index()) == Some(2))
            .unwrap()
            .center;

        assert!(viewer.hover_at(Some(beta), rect));
        assert_eq!(viewer.hovered_object(), Some(2));
        viewer.click_at(beta, rect);
        assert_eq!(viewer.selected_system(), Some("Beta"));
        assert_eq!(viewer.hovered_object(), None);
    }

    #[test]
    fn zero_sized_surface_is_not_ready() {
        let mut viewer = mounted();
        let empty = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(0.0, 0.0));
        assert!(!viewer.resize(empty));
        assert_eq!(viewer.pick(egui::pos2(0.0, 0.0), empty), None);
    }

    #[test]
    fn catalog_swap_keeps_mode() {
        let mut viewer = mounted();
        viewer.select_system("Alpha");
        disturb(&mut viewer);
        let before = viewer.camera().unwrap().state().clone();
        let generation = viewer.scene().generation();

        viewer.set_catalog(catalog());
        assert_eq!(viewer.selected_system(), Some("Alpha"));
        assert_eq!(viewer.scene().generation(), generation + 1);
        let after = viewer.camera().unwrap().state();
        assert_eq!((after.yaw, after.pitch, after.zoom), (before.yaw, before.pitch, before.zoom));

        let mut config = config();
        config.flags.show_labels = !config.flags.show_labels;
        viewer.set_config(config);
        let after = viewer.camera().unwrap().state();
        assert_eq!((after.yaw, after.pitch, after.zoom), (before.yaw, before.pitch, before.zoom));
        assert_eq!(viewer.selected_system(), Some("Alpha"));
    }

    /// Canvas stand-in that counts how often its resources are released.
    struct CountingRenderer {
        inner: CanvasRenderer,
        destroyed: Rc<Cell<usize>>,
    }

    impl Renderer for CountingRenderer {
        fn backend(&self) -> Backend {
            Backend::Canvas
        }

        fn camera_profile(&self, scene: &SceneModel) -> CameraProfile {
            self.inner.camera_profile(scene)
        }

        fn paint(&mut self, painter: &egui::Painter, rect: egui::Rect, frame: &FrameInput<'_>) {
            self.inner.paint(painter, rect, frame);
        }

        fn pick(&self, pointer: egui::Pos2, rect: egui::Rect, frame: &FrameInput<'_>) -> Option<EntityId> {
            self.inner.pick(pointer, rect, frame)
        }

        fn destroy(&mut self, _gl: Option<&glow::Context>) {
            self.destroyed.set(self.destroyed.get() + 1);
        }
    }

    #[test]
    fn remount_replaces_a_released_renderer() {
        let destroyed = Rc::new(Cell::new(0));
        let renderer = CountingRenderer {
            inner: CanvasRenderer::new(),
            destroyed: destroyed.clone(),
        };
        let mut viewer = Viewer::new(catalog(), config(), Box::new(renderer));
        viewer.mount(None);
        viewer.unmount(None);
        assert_eq!(destroyed.get(), 1);

        viewer.mount(None);
        assert!(viewer.is_mounted());
        assert_eq!(viewer.backend(), Backend::Canvas);
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(640.0, 480.0));
        assert!(viewer.resize(rect));

        viewer.unmount(None);
        viewer.set_renderer(Box::new(CanvasRenderer::new()), None);
        assert_eq!(destroyed.get(), 1);
    }

    #[test]
    fn canvas_is_used_without_gl() {
        let renderer = make_renderer(Backend::SceneGraph, None);
        assert_eq!(renderer.backend(), Backend::Canvas);
    }
}
