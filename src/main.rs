use clap::Parser;
use eframe::egui;
use exo_viz::{App, Backend, Catalog, CatalogError, ViewConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "exo-viz", version, about = "Interactive 3D exoplanet catalog viewer")]
struct Cli {
    /// Catalog JSON file (array of rows or an object with a `data` array)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Fetch the catalog from this URL instead of a file
    #[arg(short, long, conflicts_with = "catalog")]
    url: Option<String>,

    /// TOML view configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rendering backend, overrides the config file
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,
}

fn load_catalog(cli: &Cli, config: &ViewConfig) -> Result<Catalog, CatalogError> {
    let loaded = if let Some(path) = &cli.catalog {
        Some(Catalog::load_file(path, config.classifier))
    } else {
        cli.url.as_deref().map(|url| Catalog::fetch(url, config.classifier))
    };
    match loaded {
        Some(Ok(catalog)) => Ok(catalog),
        Some(Err(e)) => {
            log::error!("{e}; falling back to the built-in demo catalog");
            Catalog::demo(config.classifier)
        }
        None => Catalog::demo(config.classifier),
    }
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ViewConfig::load(path).unwrap_or_else(|e| {
            log::error!("{e}; using default settings");
            ViewConfig::default()
        }),
        None => ViewConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let catalog = match load_catalog(&cli, &config) {
        Ok(catalog) => catalog,
        Err(e) => {
            log::error!("no catalog could be loaded: {e}");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 900.0]),
        renderer: eframe::Renderer::Glow,
        depth_buffer: 24,
        ..Default::default()
    };

    eframe::run_native(
        "Exo Viz",
        options,
        Box::new(move |cc| Ok(Box::new(App::new(cc, catalog, config)))),
    )
}
