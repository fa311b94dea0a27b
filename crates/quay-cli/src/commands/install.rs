//! `quay install` command implementation.

use super::INSTALL_DIR;
use miette::{IntoDiagnostic, Result};
use quay_core::pkg::{
    read_dependencies, GraphState, RegistryClient, WalkReport, Walker, MANIFEST_NAME,
};
use quay_core::Config;
use serde::Serialize;
use std::fs;
use tracing::info;

/// Install summary for JSON output.
#[derive(Serialize)]
struct InstallJson<'a> {
    ok: bool,
    install: &'a WalkReport,
}

/// Run the install command: resolve and install every manifest-declared
/// top-level dependency and its transitive closure.
///
/// A missing (or unreadable) manifest is the one fatal condition; every
/// per-package failure is logged by the walker and reflected in the
/// summary only.
pub async fn run(config: &Config) -> Result<()> {
    let manifest_path = config.cwd.join(MANIFEST_NAME);
    let deps = read_dependencies(&manifest_path).into_diagnostic()?;

    let install_root = config.cwd.join(INSTALL_DIR);
    fs::create_dir_all(&install_root).into_diagnostic()?;

    let registry = RegistryClient::from_env().into_diagnostic()?;
    let walker = Walker::new(&registry, &install_root);
    let mut state = GraphState::new();
    let mut report = WalkReport::default();

    info!(
        cwd = %config.cwd.display(),
        dependencies = deps.len(),
        "Installing manifest dependencies"
    );

    for (name, specifier) in &deps {
        walker.resolve(&mut state, &mut report, name, specifier).await;
    }

    print_summary(config, &report);
    Ok(())
}

fn print_summary(config: &Config, report: &WalkReport) {
    if config.json {
        let summary = InstallJson {
            ok: true,
            install: report,
        };
        println!("{}", serde_json::to_string_pretty(&summary).unwrap());
        return;
    }

    println!("Installed {} package(s)", report.installed);

    let abandoned = report.specifier_errors + report.fetch_failures;
    if abandoned > 0 {
        println!("! {abandoned} branch(es) abandoned (unresolvable specifier or fetch failure)");
    }
    if report.cycles > 0 {
        println!("! {} circular dependency path(s) dropped", report.cycles);
    }
    if report.conflicts > 0 {
        println!("! {} version conflict(s) left in place", report.conflicts);
    }
}
