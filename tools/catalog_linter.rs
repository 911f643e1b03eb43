/// Catalog Linter — validates a scene catalog and reports reachability problems.
///
/// Usage: catalog_linter <catalog.ron> [--strict]

use scene_engine::core::catalog::SceneCatalog;
use scene_engine::schema::scene::Scene;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: catalog_linter <catalog.ron> [--strict]");
        process::exit(0);
    }

    let catalog_path = Path::new(&args[1]);
    let strict = args[2..].iter().any(|a| a == "--strict");

    let catalog = match SceneCatalog::load_from_ron(catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("ERROR: Failed to load catalog: {}", e);
            process::exit(1);
        }
    };

    println!("Loaded {} scenes", catalog.len());

    let (errors, warnings) = lint_catalog(&catalog);

    println!("\n=== Catalog Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() && !(strict && !warnings.is_empty()) {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_catalog(catalog: &SceneCatalog) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for index in catalog.unreachable() {
        if let Some(scene) = catalog.get(index) {
            warnings.push(format!(
                "{} scene '{}' ({}) is never reached from the start scene",
                scene.kind(),
                scene.name(),
                index
            ));
        }
    }

    for index in catalog.dead_ends() {
        if let Some(scene) = catalog.get(index) {
            warnings.push(format!(
                "linear scene '{}' ({}) has no successor; the story stops there",
                scene.name(),
                index
            ));
        }
    }

    for (index, scene) in catalog.iter() {
        match scene {
            Scene::Linear(linear) => {
                for (i, sentence) in linear.sentences.iter().enumerate() {
                    if sentence.text.trim().is_empty() {
                        warnings.push(format!(
                            "scene '{}' ({}) sentence {} has no text",
                            linear.name, index, i
                        ));
                    }
                }
                if linear.background.trim().is_empty() {
                    errors.push(format!(
                        "scene '{}' ({}) has no background image",
                        linear.name, index
                    ));
                }
            }
            Scene::Choice(choice) => {
                for option in &choice.options {
                    if option.next == index {
                        errors.push(format!(
                            "choice '{}' ({}) option '{}' loops back to itself",
                            choice.name, index, option.label
                        ));
                    }
                }
            }
            Scene::Handoff(handoff) => {
                if handoff.screen.trim().is_empty() {
                    errors.push(format!(
                        "handoff '{}' ({}) names no screen",
                        handoff.name, index
                    ));
                }
            }
        }
    }

    (errors, warnings)
}
