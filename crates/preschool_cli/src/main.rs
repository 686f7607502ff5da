//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `preschool_core` linkage.
//! - Optionally open a configured database and print per-organization
//!   dashboard numbers for today.
//!
//! Usage: `preschool_cli [config.json]`. Without a path, configuration comes
//! from `PRESCHOOL_*` environment variables only.

use chrono::Utc;
use log::info;
use preschool_core::{
    open_db, CoreConfig, DashboardService, OrganizationRepository, SqliteDocumentStore,
    SqliteOrganizationRepository,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("preschool_core ping={}", preschool_core::ping());
    println!("preschool_core version={}", preschool_core::core_version());

    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: Option<String>) -> Result<(), String> {
    let config = match config_path {
        Some(path) => CoreConfig::from_file(path),
        None => CoreConfig::from_env(),
    }
    .map_err(|err| err.to_string())?;
    preschool_core::init_logging_from_config(&config)?;

    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let organizations = SqliteOrganizationRepository::new(&conn)
        .list_organizations()
        .map_err(|err| err.to_string())?;
    println!("organizations={}", organizations.len());
    info!(
        "event=cli_run module=cli status=start organizations={}",
        organizations.len()
    );

    let today = Utc::now().date_naive();
    let store = SqliteDocumentStore::new(&conn);
    for organization in organizations {
        let overview = DashboardService::new(store, organization.id)
            .overview(today)
            .map_err(|err| err.to_string())?;
        let rate = overview
            .attendance_rate
            .map(|rate| format!("{:.1}%", rate * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "organization={} status={} active_students={} waitlisted={} active_staff={} classes={} checked_in_now={} present_today={} attendance_rate={}",
            organization.id,
            organization.status.as_str(),
            overview.active_students,
            overview.waitlisted_students,
            overview.active_staff,
            overview.classes,
            overview.checked_in_now,
            overview.present_today,
            rate
        );
    }

    info!("event=cli_run module=cli status=ok");
    Ok(())
}
