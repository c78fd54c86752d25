//! Application shell and eframe integration.
//!
//! Owns the dock layout and the per-tab viewers, draws the settings side
//! panel and releases every view's GPU resources on exit.

use crate::catalog::Catalog;
use crate::config::ViewConfig;
use crate::viewer::ViewerState;
use eframe::{egui, glow};
use egui_dock::{DockArea, DockState};
use std::sync::Arc;

pub struct App {
    dock_state: DockState<usize>,
    viewer: ViewerState,
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>, catalog: Catalog, config: ViewConfig) -> Self {
        let gl = cc.gl.clone();
        if gl.is_none() {
            log::warn!("no GL context available, views will use the canvas renderer");
        }
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let counts = catalog.counts();
        log::info!(
            "catalog: {} objects ({} habitable, {} too hot, {} too cold, {} rows skipped)",
            catalog.len(),
            counts.habitable,
            counts.too_hot,
            counts.too_cold,
            catalog.skipped_rows()
        );

        let mut viewer = ViewerState::new(Arc::new(catalog), config, gl);
        let first = viewer.add_view();
        viewer.active_tab = Some(first);

        Self {
            dock_state: DockState::new(vec![first]),
            viewer,
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.viewer.show_side_panel {
            egui::SidePanel::left("settings_panel")
                .resizable(true)
                .default_width(240.0)
                .show_separator_line(false)
                .frame(egui::Frame::side_top_panel(ctx.style().as_ref()).inner_margin(4.0).stroke(egui::Stroke::NONE))
                .show(ctx, |ui| {
                    ui.add_space(4.0);
                    ui.horizontal(|ui| {
                        ui.add_space(4.0);
                        ui.strong("Settings");
                        if ui.small_button("x").clicked() {
                            self.viewer.show_side_panel = false;
                        }
                    });
                    ui.separator();
                    egui::ScrollArea::vertical().id_salt("settings_scroll").show(ui, |ui| {
                        self.viewer.show_settings(ui);
                    });
                });
        }

        let mut dock_style = egui_dock::Style::from_egui(ctx.style().as_ref());
        dock_style.main_surface_border_stroke = egui::Stroke::NONE;
        let tab_bar_height = dock_style.tab_bar.height;
        DockArea::new(&mut self.dock_state)
            .style(dock_style)
            .show_add_buttons(true)
            .show(ctx, &mut self.viewer);

        if !self.viewer.show_side_panel {
            egui::Area::new(egui::Id::new("settings_btn"))
                .fixed_pos(egui::pos2(4.0, (tab_bar_height - 16.0) / 2.0))
                .order(egui::Order::Foreground)
                .show(ctx, |ui| {
                    if ui.small_button("+").clicked() {
                        self.viewer.show_side_panel = true;
                    }
                });
        }

        if let Some(new_idx) = self.viewer.pending_add_tab.take() {
            self.dock_state.push_to_focused_leaf(new_idx);
            self.viewer.active_tab = Some(new_idx);
        }
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        self.viewer.destroy_all(gl);
    }
}
