#![allow(clippy::too_many_arguments)]

use adstudio::app::EditorApp;
use adstudio::cli::{self, CliArgs};
use adstudio::logger;
use adstudio::settings::EditorSettings;
use clap::Parser;
use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    let args = CliArgs::parse();
    let settings = EditorSettings::load();

    // -- CLI / headless mode ---------------------------------------------
    if args.is_headless() {
        let level = if args.verbose { log::LevelFilter::Debug } else { settings.level_filter() };
        logger::init(level, args.verbose);
        let code = cli::run(args, &settings);
        log::logger().flush();
        std::process::exit(if code == std::process::ExitCode::SUCCESS { 0 } else { 1 });
    }

    // -- GUI mode -----------------------------------------------------
    let level = if args.verbose { log::LevelFilter::Debug } else { settings.level_filter() };
    logger::init(level, args.verbose);

    let initial = args.creatives.first().map(std::path::PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 500.0])
            .with_title("AdStudio"),
        ..Default::default()
    };

    eframe::run_native(
        "AdStudio",
        options,
        Box::new(move |cc| Box::new(EditorApp::new(cc, settings, initial))),
    )
}
