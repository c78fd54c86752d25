//! Side-panel settings UI for classification, display and camera options,
//! plus the details of the selected object.

use crate::catalog::Catalog;
use crate::config::Backend;
use crate::habitability::{Classification, ClassifyBy, ZoneModel};
use crate::scene::ViewMode;
use crate::viewer::{make_renderer, Viewer, ViewerState};
use eframe::egui;
use std::sync::Arc;

impl ViewerState {
    pub(crate) fn show_settings(&mut self, ui: &mut egui::Ui) {
        self.show_classifier(ui);
        ui.separator();

        let gl = self.gl.clone();
        let hosts: Vec<String> = self.catalog.hosts().into_iter().map(str::to_string).collect();
        let Some(viewer) = self.active_view_mut() else {
            ui.label("No view open");
            return;
        };

        ui.label(egui::RichText::new("View").strong());
        let mut backend = viewer.backend();
        let mut picked = false;
        ui.horizontal(|ui| {
            ui.label("Renderer:");
            egui::ComboBox::from_id_salt("backend")
                .selected_text(backend.label())
                .show_ui(ui, |ui| {
                    for b in Backend::ALL {
                        picked |= ui.selectable_value(&mut backend, b, b.label()).changed();
                    }
                });
        });
        let chosen = picked.then_some(backend);
        if let Some(backend) = chosen {
            log::info!("switching view to {} renderer", backend.label());
            viewer.set_renderer(make_renderer(backend, gl.as_ref()), gl.as_deref());
        }

        let flags = viewer.flags_mut();
        ui.checkbox(&mut flags.show_orbits, "Show orbits");
        ui.checkbox(&mut flags.show_zone, "Show habitable zone");
        ui.checkbox(&mut flags.show_labels, "Show labels");
        ui.checkbox(&mut flags.show_field_stars, "Show background stars");

        ui.separator();
        ui.label(egui::RichText::new("Navigation").strong());
        let mut jump: Option<String> = None;
        ui.horizontal(|ui| {
            ui.label("System:");
            let current = viewer.selected_system().unwrap_or("Field").to_string();
            egui::ComboBox::from_id_salt("system_select")
                .selected_text(current)
                .height(300.0)
                .show_ui(ui, |ui| {
                    for host in &hosts {
                        if ui.selectable_label(viewer.selected_system() == Some(host.as_str()), host).clicked() {
                            jump = Some(host.clone());
                        }
                    }
                });
        });
        if let Some(host) = jump {
            viewer.select_system(&host);
        }
        let in_system = matches!(viewer.scene().mode(), ViewMode::System(_));
        if ui.add_enabled(in_system, egui::Button::new("Back to field")).clicked() {
            viewer.back_to_field();
        }

        if viewer.is_mounted() {
            ui.separator();
            ui.label(egui::RichText::new("Camera").strong());
            ui.horizontal(|ui| {
                if ui.button("+").on_hover_text("Zoom in").clicked() {
                    viewer.zoom_in();
                }
                if ui.button("-").on_hover_text("Zoom out").clicked() {
                    viewer.zoom_out();
                }
                if ui.button("Reset").clicked() {
                    viewer.reset_camera();
                }
            });
            let mut auto = viewer.camera().is_some_and(|c| c.state().auto_rotate);
            if ui.checkbox(&mut auto, "Auto-rotate").changed() {
                viewer.toggle_auto_rotate();
            }
            if let Some(c) = viewer.camera() {
                let s = c.state();
                ui.label(
                    egui::RichText::new(format!(
                        "yaw {:.0}°  pitch {:.0}°  zoom {:.2}",
                        s.yaw.to_degrees(),
                        s.pitch.to_degrees(),
                        s.zoom
                    ))
                    .weak(),
                );
            }
        }

        ui.separator();
        show_details(ui, viewer);

        if let Some(backend) = chosen {
            self.config.backend = backend;
        }
        ui.separator();
        ui.label(egui::RichText::new(format!("build {}", env!("GIT_HASH"))).weak().small());
    }

    fn show_classifier(&mut self, ui: &mut egui::Ui) {
        let mut cfg = self.config.classifier;

        ui.label(egui::RichText::new("Habitability").strong());
        ui.horizontal(|ui| {
            ui.label("Zone:");
            egui::ComboBox::from_id_salt("zone_model")
                .selected_text(cfg.zone_model.label())
                .show_ui(ui, |ui| {
                    for m in ZoneModel::ALL {
                        ui.selectable_value(&mut cfg.zone_model, m, m.label());
                    }
                });
        });
        ui.horizontal(|ui| {
            ui.label("By:");
            egui::ComboBox::from_id_salt("classify_by")
                .selected_text(cfg.classify_by.label())
                .show_ui(ui, |ui| {
                    for c in ClassifyBy::ALL {
                        ui.selectable_value(&mut cfg.classify_by, c, c.label());
                    }
                });
        });
        ui.checkbox(&mut cfg.teq_guard, "Temperature guard");
        ui.indent("teq_band", |ui| {
            ui.add_enabled_ui(cfg.teq_guard || cfg.classify_by == ClassifyBy::EquilibriumTemperature, |ui| {
                ui.horizontal(|ui| {
                    ui.add(
                        egui::DragValue::new(&mut cfg.teq_band.min_k)
                            .range(0.0..=cfg.teq_band.max_k)
                            .speed(1.0)
                            .suffix(" K"),
                    );
                    ui.label("to");
                    ui.add(
                        egui::DragValue::new(&mut cfg.teq_band.max_k)
                            .range(cfg.teq_band.min_k..=2000.0)
                            .speed(1.0)
                            .suffix(" K"),
                    );
                });
            });
        });

        if cfg != self.config.classifier {
            log::info!(
                "re-classifying catalog: {}, {}",
                cfg.zone_model.label(),
                cfg.classify_by.label()
            );
            self.config.classifier = cfg;
            let catalog = Arc::new(self.catalog.reclassified(cfg));
            self.set_catalog(catalog);
        }

        show_legend(ui, &self.catalog);
    }
}

fn show_legend(ui: &mut egui::Ui, catalog: &Catalog) {
    let counts = catalog.counts();
    for class in Classification::ALL {
        let n = match class {
            Classification::Habitable => counts.habitable,
            Classification::TooHot => counts.too_hot,
            Classification::TooCold => counts.too_cold,
        };
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
            ui.painter().circle_filled(rect.center(), 5.0, class.color());
            ui.label(format!("{}: {}", class.label(), n));
        });
    }
    let mut summary = format!("{} objects", catalog.len());
    if catalog.skipped_rows() > 0 {
        summary.push_str(&format!(", {} rows skipped", catalog.skipped_rows()));
    }
    ui.label(egui::RichText::new(summary).weak());
}

fn row(ui: &mut egui::Ui, label: &str, value: Option<String>) {
    ui.label(label);
    ui.label(value.unwrap_or_else(|| "-".to_string()));
    ui.end_row();
}

fn show_details(ui: &mut egui::Ui, viewer: &Viewer) {
    ui.label(egui::RichText::new("Details").strong());
    let index = viewer.hovered_object().or(viewer.selected_object());
    let catalog = viewer.catalog();
    let Some(obj) = index.and_then(|i| catalog.get(i)) else {
        ui.label(egui::RichText::new("Hover or click a planet").weak());
        return;
    };
    let assessment = index.and_then(|i| catalog.assessment(i));

    ui.label(egui::RichText::new(&obj.name).heading());
    if let Some(a) = assessment {
        ui.colored_label(a.classification.color(), a.classification.label());
        if a.downgraded {
            ui.label(egui::RichText::new("outside temperature band").weak().small());
        }
    }
    egui::Grid::new("details_grid").num_columns(2).striped(true).show(ui, |ui| {
        row(ui, "Host", Some(obj.host.clone()));
        row(ui, "Distance", obj.range_pc().map(|d| format!("{d:.2} pc")));
        row(ui, "Semi-major axis", obj.semi_major_axis_au.map(|a| format!("{a:.4} AU")));
        row(ui, "Period", obj.orbital_period_days.map(|p| format!("{p:.2} d")));
        row(ui, "Eccentricity", obj.eccentricity.map(|e| format!("{e:.3}")));
        row(ui, "Radius", obj.radius_earth.map(|r| format!("{r:.2} R⊕")));
        row(ui, "Mass", obj.mass_earth.map(|m| format!("{m:.2} M⊕")));
        row(ui, "Eq. temperature", obj.eq_temp_k.map(|t| format!("{t:.0} K")));
        row(ui, "Star Teff", obj.star_teff_k.map(|t| format!("{t:.0} K")));
        row(ui, "Star radius", obj.star_radius_solar.map(|r| format!("{r:.3} R☉")));
        row(ui, "Spectral type", obj.spectral_type.clone());
        row(
            ui,
            "Habitable zone",
            assessment
                .and_then(|a| a.zone)
                .map(|z| format!("{:.3} – {:.3} AU", z.inner_au, z.outer_au)),
        );
        row(
            ui,
            "Discovered",
            match (&obj.discovery_method, obj.discovery_year) {
                (Some(m), Some(y)) => Some(format!("{m}, {y}")),
                (Some(m), None) => Some(m.clone()),
                (None, Some(y)) => Some(y.to_string()),
                (None, None) => None,
            },
        );
    });
}
