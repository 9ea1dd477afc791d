//! Mapping a saved file to the cargo targets that compile it.
//!
//! Cargo has no "which target owns this file" query, so the mapping is a
//! heuristic over `cargo metadata`: a target root is taken to own every file
//! under its directory. A shared module can therefore map to several targets;
//! the orchestrator checks them in order and stops once the saved file has a
//! diagnostic.

use camino::Utf8PathBuf;
use serde::Deserialize;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use savecheck_runner::CommandSpec;

use crate::config::Config;
use crate::error::SaveCheckError;
use crate::paths;
use crate::types::Target;

/// Resolves the ordered targets to check for a saved file.
pub trait TargetResolver: Send + Sync {
    /// Targets whose compilation plausibly includes `file`, most specific
    /// first. Never empty for a resolvable project.
    fn resolve_targets(
        &self,
        manifest_dir: &Path,
        file: &Path,
        config: &Config,
    ) -> Result<Vec<Target>, SaveCheckError>;
}

/// Resolver backed by `cargo metadata --no-deps`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CargoTargetResolver;

#[derive(Debug, Deserialize)]
pub(crate) struct Metadata {
    pub packages: Vec<MetaPackage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetaPackage {
    pub manifest_path: Utf8PathBuf,
    pub targets: Vec<MetaTarget>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetaTarget {
    pub name: String,
    pub kind: Vec<String>,
    pub src_path: Utf8PathBuf,
}

impl MetaTarget {
    /// Cargo arguments selecting this target; `None` for build scripts and
    /// kinds cargo cannot select directly.
    fn selection_args(&self) -> Option<Vec<String>> {
        const LIB_KINDS: &[&str] = &["lib", "rlib", "dylib", "cdylib", "staticlib", "proc-macro"];

        if self.kind.iter().any(|k| k == "custom-build") {
            return None;
        }
        if self.kind.iter().any(|k| LIB_KINDS.contains(&k.as_str())) {
            return Some(vec!["--lib".to_string()]);
        }
        let flag = self.kind.iter().find_map(|k| match k.as_str() {
            "bin" => Some("--bin"),
            "test" => Some("--test"),
            "bench" => Some("--bench"),
            "example" => Some("--example"),
            _ => None,
        })?;
        Some(vec![flag.to_string(), self.name.clone()])
    }
}

impl CargoTargetResolver {
    fn load_metadata(manifest_dir: &Path, config: &Config) -> Result<Metadata, SaveCheckError> {
        let mut cmd = CommandSpec::new(config.cargo_binary());
        if let Some(toolchain) = config.toolchain_for(config.mode()) {
            cmd.push_arg(format!("+{toolchain}"));
        }
        let cmd = cmd
            .args(["metadata", "--no-deps", "--format-version", "1"])
            .cwd(manifest_dir);

        tracing::debug!(command = %cmd.display(), "reading cargo metadata");
        let output = cmd
            .to_command()
            .stdin(std::process::Stdio::null())
            .output()
            .map_err(|e| SaveCheckError::TargetResolution {
                reason: format!("failed to run {}: {e}", cmd.display()),
            })?;

        if !output.status.success() {
            return Err(SaveCheckError::TargetResolution {
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| SaveCheckError::TargetResolution {
            reason: format!("unreadable cargo metadata: {e}"),
        })
    }
}

impl TargetResolver for CargoTargetResolver {
    fn resolve_targets(
        &self,
        manifest_dir: &Path,
        file: &Path,
        config: &Config,
    ) -> Result<Vec<Target>, SaveCheckError> {
        let targets = match Self::load_metadata(manifest_dir, config) {
            Ok(metadata) => select_targets(&metadata.packages, manifest_dir, file),
            Err(e) => {
                tracing::warn!(error = %e, "target detection failed, checking package defaults");
                Vec::new()
            }
        };

        if targets.is_empty() {
            return Ok(vec![Target::package_default(manifest_dir)]);
        }
        Ok(targets)
    }
}

/// Pick the targets owning `file` from metadata packages.
///
/// Only packages whose manifest sits in `manifest_dir` are considered when
/// there are any; a virtual workspace manifest falls back to every member.
pub(crate) fn select_targets(
    packages: &[MetaPackage],
    manifest_dir: &Path,
    file: &Path,
) -> Vec<Target> {
    let file = paths::normalize(file);
    let local: Vec<&MetaPackage> = packages
        .iter()
        .filter(|p| p.manifest_path.parent().is_some_and(|d| d.as_std_path() == manifest_dir))
        .collect();
    let candidates: Vec<&MetaPackage> = if local.is_empty() {
        packages.iter().collect()
    } else {
        local
    };

    let selectable: Vec<(PathBuf, Vec<String>)> = candidates
        .iter()
        .flat_map(|p| p.targets.iter())
        .filter_map(|t| {
            let args = t.selection_args()?;
            Some((paths::normalize(t.src_path.as_std_path()), args))
        })
        .collect();

    let exact: Vec<Target> = selectable
        .iter()
        .filter(|(src, _)| *src == file)
        .map(|(src, args)| Target::new(src.clone(), args.clone()))
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let mut owning: Vec<(usize, Target)> = selectable
        .into_iter()
        .filter_map(|(src, args)| {
            let root = src.parent()?;
            if !file.starts_with(root) {
                return None;
            }
            let depth = root.components().count();
            Some((depth, Target::new(src, args)))
        })
        .collect();
    owning.sort_by_key(|(depth, _)| Reverse(*depth));
    owning.into_iter().map(|(_, t)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(manifest: &str, targets: &[(&str, &[&str], &str)]) -> MetaPackage {
        MetaPackage {
            manifest_path: Utf8PathBuf::from(manifest),
            targets: targets
                .iter()
                .map(|(name, kind, src)| MetaTarget {
                    name: (*name).to_string(),
                    kind: kind.iter().map(|k| (*k).to_string()).collect(),
                    src_path: Utf8PathBuf::from(*src),
                })
                .collect(),
        }
    }

    fn demo() -> Vec<MetaPackage> {
        vec![package(
            "/p/Cargo.toml",
            &[
                ("demo", &["lib"], "/p/src/lib.rs"),
                ("demo", &["bin"], "/p/src/main.rs"),
                ("tool", &["bin"], "/p/src/bin/tool.rs"),
                ("it", &["test"], "/p/tests/it.rs"),
                ("speed", &["bench"], "/p/benches/speed.rs"),
                ("hello", &["example"], "/p/examples/hello.rs"),
                ("build-script-build", &["custom-build"], "/p/build.rs"),
            ],
        )]
    }

    fn args_of(targets: &[Target]) -> Vec<String> {
        targets.iter().map(|t| t.args.join(" ")).collect()
    }

    #[test]
    fn test_exact_root_match_wins() {
        let targets = select_targets(&demo(), Path::new("/p"), Path::new("/p/src/bin/tool.rs"));
        assert_eq!(args_of(&targets), ["--bin tool"]);

        let targets = select_targets(&demo(), Path::new("/p"), Path::new("/p/tests/it.rs"));
        assert_eq!(args_of(&targets), ["--test it"]);
    }

    #[test]
    fn test_shared_module_maps_to_all_owning_targets() {
        let targets = select_targets(&demo(), Path::new("/p"), Path::new("/p/src/net/tcp.rs"));
        assert_eq!(args_of(&targets), ["--lib", "--bin demo"]);
    }

    #[test]
    fn test_deepest_root_first() {
        let targets = select_targets(&demo(), Path::new("/p"), Path::new("/p/src/bin/common.rs"));
        assert_eq!(args_of(&targets), ["--bin tool", "--lib", "--bin demo"]);
    }

    #[test]
    fn test_build_script_is_never_selected() {
        let targets = select_targets(&demo(), Path::new("/p"), Path::new("/p/build.rs"));
        assert!(targets.is_empty());
    }

    #[test]
    fn test_proc_macro_and_cdylib_use_lib_flag() {
        let packages = vec![package(
            "/m/Cargo.toml",
            &[("derive", &["proc-macro"], "/m/src/lib.rs")],
        )];
        let targets = select_targets(&packages, Path::new("/m"), Path::new("/m/src/expand.rs"));
        assert_eq!(args_of(&targets), ["--lib"]);

        let packages = vec![package(
            "/c/Cargo.toml",
            &[("ffi", &["cdylib", "rlib"], "/c/src/lib.rs")],
        )];
        let targets = select_targets(&packages, Path::new("/c"), Path::new("/c/src/lib.rs"));
        assert_eq!(args_of(&targets), ["--lib"]);
    }

    #[test]
    fn test_prefers_package_in_manifest_dir() {
        let packages = vec![
            package("/ws/a/Cargo.toml", &[("a", &["lib"], "/ws/a/src/lib.rs")]),
            package("/ws/b/Cargo.toml", &[("b", &["lib"], "/ws/b/src/lib.rs")]),
        ];
        let targets = select_targets(&packages, Path::new("/ws/b"), Path::new("/ws/b/src/x.rs"));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].src_path, PathBuf::from("/ws/b/src/lib.rs"));

        // Virtual manifest: no package lives in /ws itself.
        let targets = select_targets(&packages, Path::new("/ws"), Path::new("/ws/a/src/x.rs"));
        assert_eq!(targets[0].src_path, PathBuf::from("/ws/a/src/lib.rs"));
    }

    #[test]
    fn test_metadata_parses_cargo_output() {
        let json = r#"{
            "packages": [{
                "name": "demo",
                "version": "0.1.0",
                "manifest_path": "/p/Cargo.toml",
                "targets": [{
                    "name": "demo",
                    "kind": ["lib"],
                    "crate_types": ["lib"],
                    "src_path": "/p/src/lib.rs",
                    "edition": "2021"
                }]
            }],
            "workspace_members": [],
            "version": 1
        }"#;
        let metadata: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.packages[0].targets[0].selection_args().unwrap(), ["--lib"]);
    }
}
