//! `worldframe` – interactive inspector for robot cell scenes.
//!
//! The binary:
//!
//! 1. Installs structured logging (stderr) and, when an OTLP endpoint is
//!    configured, span export.
//! 2. Loads `~/.worldframe/config.toml`, writing a default one on first run.
//! 3. Loads the scene named on the command line (or in the config) into a
//!    world.
//! 4. Drops the user into a REPL answering path, transformation and twist
//!    queries (`/path`, `/tf`, `/twist`, `/help`).
//! 5. Exits cleanly on Ctrl-C.

mod config;
mod repl;
mod scene;
mod telemetry;

use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

fn main() -> ExitCode {
    let telemetry = telemetry::init_tracing("worldframe");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    let flush_telemetry = telemetry.flusher();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "Ctrl-C received, exiting.".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
        // The REPL is blocked on stdin and would not notice the flag, and
        // exiting skips the telemetry guard's drop.
        flush_telemetry();
        std::process::exit(130);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(loaded) if loaded.from_file => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            loaded.config
        }
        Ok(loaded) => {
            // Persist the plain defaults, not this run's overrides.
            match config::save(&config::Config::default()) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            loaded.config
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    // ── Scene ─────────────────────────────────────────────────────────────
    let scene_path = std::env::args().nth(1).map(PathBuf::from).or(cfg.scene_path.clone());
    let scene = match scene_path {
        Some(path) => match scene::load(&path) {
            Ok(scene) => {
                println!(
                    "  Scene {} – {} frame(s), {} relation(s)",
                    path.display().to_string().bold(),
                    scene.world.frame_count(),
                    scene.world.relations().count()
                );
                scene
            }
            Err(e) => {
                eprintln!("{}: {}", "Scene error".red(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            println!("  {}", "No scene given; starting with an empty world.".dimmed());
            scene::Scene::empty()
        }
    };

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    let session = repl::Session::new(scene, cfg.default_view, cfg.precision);
    repl::run(session, shutdown);
    ExitCode::SUCCESS
}

fn print_banner() {
    println!();
    println!("{}", "  worldframe".bold().cyan());
    println!(
        "{}",
        format!("  frames, relations and motion · v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!();
}
