//! `quay add` command implementation.

use super::INSTALL_DIR;
use miette::{IntoDiagnostic, Result};
use quay_core::pkg::{
    record_dependency, GraphState, PackageSpec, RegistryClient, WalkReport, Walker,
    MANIFEST_NAME,
};
use quay_core::Config;
use serde::Serialize;
use std::fs;
use tracing::{error, info};

/// Add summary for JSON output.
#[derive(Serialize)]
struct AddJson<'a> {
    ok: bool,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    install: &'a WalkReport,
}

/// Run the add command: resolve and install one package (plus its
/// transitive dependencies) and record the resolved exact version in
/// package.json.
///
/// Resolution failures are logged, not fatal; the process still exits
/// zero with the failure visible in the summary.
pub async fn run(config: &Config, raw_spec: &str) -> Result<()> {
    let spec = match PackageSpec::parse(raw_spec) {
        Ok(spec) => spec,
        Err(e) => {
            error!(spec = %raw_spec, error = %e, "Invalid package spec");
            return Ok(());
        }
    };

    let install_root = config.cwd.join(INSTALL_DIR);
    fs::create_dir_all(&install_root).into_diagnostic()?;

    let registry = RegistryClient::from_env().into_diagnostic()?;
    let walker = Walker::new(&registry, &install_root);
    let mut state = GraphState::new();
    let mut report = WalkReport::default();

    walker
        .resolve(&mut state, &mut report, &spec.name, spec.specifier())
        .await;

    let version = state.installed_version(&spec.name);
    match version {
        Some(version) => {
            let manifest_path = config.cwd.join(MANIFEST_NAME);
            match record_dependency(&manifest_path, &spec.name, version) {
                Ok(()) => {
                    info!(package = %spec.name, version = %version, "Recorded in package.json");
                }
                Err(e) => {
                    error!(package = %spec.name, error = %e, "Failed to update package.json");
                }
            }
        }
        None => {
            error!(package = %spec.name, "Package could not be resolved; nothing recorded");
        }
    }

    print_summary(config, &spec, version, &report);
    Ok(())
}

fn print_summary(config: &Config, spec: &PackageSpec, version: Option<&str>, report: &WalkReport) {
    if config.json {
        let summary = AddJson {
            ok: version.is_some(),
            name: &spec.name,
            version,
            install: report,
        };
        println!("{}", serde_json::to_string_pretty(&summary).unwrap());
        return;
    }

    match version {
        Some(version) => println!("Added {}@{version}", spec.name),
        None => println!("Failed to add {}", spec.name),
    }
}
