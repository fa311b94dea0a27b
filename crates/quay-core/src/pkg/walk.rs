//! Dependency graph walking.
//!
//! Resolution state lives in one [`GraphState`] owned by the caller and
//! the traversal is driven by an explicit frame stack, so arbitrarily
//! deep dependency chains cannot exhaust the call stack. Everything runs
//! strictly sequentially: one fetch, one install, one edge at a time.

use super::error::PkgError;
use super::install::install_package;
use super::registry::RegistryClient;
use super::version::{resolve_version, version_satisfies};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, info, warn};

/// Shared resolution state for one `install`/`add` run.
///
/// Created empty at the start of an invocation and discarded at its end;
/// there is no cross-run state.
#[derive(Debug, Default)]
pub struct GraphState {
    /// Package name to the single exact version considered installed
    /// for that name during this run. At most one entry per name.
    installed: BTreeMap<String, String>,
    /// (name, declared specifier) edges already evaluated this run.
    checked: HashSet<(String, String)>,
    /// Names currently being expanded on the active path, root first.
    stack: Vec<String>,
}

impl GraphState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The exact version recorded for a name, if any.
    #[must_use]
    pub fn installed_version(&self, name: &str) -> Option<&str> {
        self.installed.get(name).map(String::as_str)
    }

    /// All name to exact-version pairs recorded this run.
    #[must_use]
    pub fn installed(&self) -> &BTreeMap<String, String> {
        &self.installed
    }
}

/// Counters accumulated across one walk; the CLI prints these as the
/// run summary. Abandoned branches are visible here, not in the exit
/// code: the walk is best-effort by design.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkReport {
    /// Packages resolved and recorded as installed.
    pub installed: usize,
    /// Edges abandoned because their specifier was invalid or
    /// unsatisfiable.
    pub specifier_errors: usize,
    /// Circular dependencies detected (each logged with its full path).
    pub cycles: usize,
    /// Edges whose requirement the already-installed version does not
    /// satisfy.
    pub conflicts: usize,
    /// Branches abandoned on registry or download failure.
    pub fetch_failures: usize,
}

/// One open node in the traversal: its remaining dependency edges, taken
/// in declaration order.
struct Frame {
    name: String,
    edges: VecDeque<(String, String)>,
}

/// Walks the dependency graph: resolves specifiers, installs packages,
/// and recurses into their declared dependencies.
///
/// The registry client and install root are injected so tests can point
/// the walker at a fake registry and a scratch directory.
pub struct Walker<'a> {
    registry: &'a RegistryClient,
    install_root: &'a Path,
}

impl<'a> Walker<'a> {
    #[must_use]
    pub fn new(registry: &'a RegistryClient, install_root: &'a Path) -> Self {
        Self {
            registry,
            install_root,
        }
    }

    /// Resolve and install `name` per `specifier`, then its transitive
    /// dependency graph.
    ///
    /// Never fails the run: every error class is logged at the edge it
    /// concerns, counted in `report`, and the branch abandoned. The
    /// checked-edge set bounds total edge expansions and the resolution
    /// stack cuts re-entrant paths, so the walk terminates on any finite
    /// registry graph, cycles included.
    pub async fn resolve(
        &self,
        state: &mut GraphState,
        report: &mut WalkReport,
        name: &str,
        specifier: &str,
    ) {
        let mut frames: Vec<Frame> = Vec::new();
        self.enter(state, report, &mut frames, name, specifier).await;

        loop {
            let next = match frames.last_mut() {
                Some(top) => top.edges.pop_front(),
                None => break,
            };
            let Some((dep_name, dep_spec)) = next else {
                // Node fully expanded; leave the active path.
                frames.pop();
                state.stack.pop();
                continue;
            };

            let edge = (dep_name.clone(), dep_spec.clone());
            if !state.checked.insert(edge) {
                debug!(
                    package = %dep_name,
                    specifier = %dep_spec,
                    "Edge already evaluated this run; skipping"
                );
                continue;
            }

            if state.stack.iter().any(|open| *open == dep_name) {
                let mut path = state.stack.join(" -> ");
                path.push_str(" -> ");
                path.push_str(&dep_name);
                warn!(path = %path, "Circular dependency detected; dropping edge");
                report.cycles += 1;
                continue;
            }

            if let Some(present) = state.installed.get(&dep_name) {
                if version_satisfies(present, &dep_spec) {
                    debug!(
                        package = %dep_name,
                        installed = %present,
                        "Installed version satisfies specifier"
                    );
                } else {
                    // Accepted limitation of the flat tree: report it,
                    // change nothing.
                    warn!(
                        package = %dep_name,
                        required = %dep_spec,
                        installed = %present,
                        "Version conflict detected; no remediation attempted"
                    );
                    report.conflicts += 1;
                }
                continue;
            }

            self.enter(state, report, &mut frames, &dep_name, &dep_spec)
                .await;
        }
    }

    /// Resolve, install, and open a frame for one package. On success
    /// the package joins the active path (resolution stack) until its
    /// frame is exhausted; on any failure the branch is abandoned with
    /// one log line and the path is unchanged.
    async fn enter(
        &self,
        state: &mut GraphState,
        report: &mut WalkReport,
        frames: &mut Vec<Frame>,
        name: &str,
        specifier: &str,
    ) {
        match self.resolve_node(state, name, specifier).await {
            Ok(Some(frame)) => {
                report.installed += 1;
                state.stack.push(frame.name.clone());
                frames.push(frame);
            }
            Ok(None) => {
                report.specifier_errors += 1;
            }
            Err(e) => {
                warn!(package = %name, error = %e, "Fetch failed; abandoning branch");
                report.fetch_failures += 1;
            }
        }
    }

    /// The per-node pipeline: packument fetch, specifier resolution,
    /// installation, installed-map recording.
    ///
    /// `Ok(None)` means the specifier could not be resolved (logged
    /// here); `Err` is the fetch family, logged by the caller.
    async fn resolve_node(
        &self,
        state: &mut GraphState,
        name: &str,
        specifier: &str,
    ) -> Result<Option<Frame>, PkgError> {
        // One metadata fetch serves both specifier resolution and the
        // dependency map.
        let packument = self.registry.packument(name).await?;

        let version = match resolve_version(&packument, specifier) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    package = %name,
                    specifier = %specifier,
                    error = %e,
                    "Cannot resolve specifier; abandoning branch"
                );
                return Ok(None);
            }
        };

        let edges = packument
            .dependencies_of(&version)
            .ok_or_else(|| PkgError::version_not_found(name, &version))?;

        install_package(self.registry, name, &version, self.install_root).await?;

        // Recorded for every visited package, not just top-level ones:
        // the installed map is what every later sibling edge checks
        // conflicts against.
        state.installed.insert(name.to_string(), version.clone());
        info!(package = %name, version = %version, "Resolved");

        Ok(Some(Frame {
            name: name.to_string(),
            edges: edges.into_iter().collect(),
        }))
    }
}
