//! Interactive 3D viewer for exoplanet catalogs.
//!
//! Catalog records are placed in a heliocentric field view or an orbital
//! view of one system, classified against their host star's habitable
//! zone, and rendered either on a projected egui canvas or through an
//! OpenGL scene graph.

pub mod app;
pub mod camera;
pub mod catalog;
pub mod celestial;
pub mod config;
pub mod drawing;
pub mod error;
pub mod habitability;
pub mod math;
pub mod picking;
pub mod renderer;
pub mod scene;
mod settings;
pub mod viewer;

pub use app::App;
pub use catalog::{Catalog, CatalogObject};
pub use config::{Backend, ViewConfig};
pub use error::{CatalogError, ConfigError, RenderError};
