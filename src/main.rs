use std::path::PathBuf;
use std::process::ExitCode;

use ax_progression::content::{validate_catalog, Catalog};
use ax_progression::logging::init_tracing;
use ax_progression::Config;
use tracing::{error, info};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    let _log_guard = init_tracing(&config);

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.catalog_path.clone());

    let catalog = match Catalog::from_path(&path) {
        Ok(catalog) => catalog,
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to load catalog");
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let report = validate_catalog(&catalog);
    for issue in &report.issues {
        eprintln!("{issue}");
    }
    info!(warnings = report.warnings().count(), "catalog checked");

    if !report.is_ok() {
        error!(errors = report.errors().count(), "catalog validation failed");
        return ExitCode::FAILURE;
    }

    let grades: Vec<&str> = report.grades.iter().map(|grade| grade.as_str()).collect();
    println!(
        "Validated {} lessons across grades: {}",
        report.lesson_count,
        grades.join(", ")
    );
    ExitCode::SUCCESS
}
