//! Path helpers: manifest discovery and lexical normalisation.

use std::path::{Component, Path, PathBuf};

/// File name of the cargo manifest.
pub const MANIFEST_FILE: &str = "Cargo.toml";

/// Find the directory holding the nearest `Cargo.toml` at or above `file`.
///
/// The search starts in the file's parent directory (or `file` itself if it
/// is a directory) and walks up to the filesystem root.
///
/// ```rust,no_run
/// use savecheck_utils::paths::find_manifest_dir;
/// use std::path::Path;
///
/// if let Some(dir) = find_manifest_dir(Path::new("/work/project/src/lib.rs")) {
///     println!("cargo runs in {}", dir.display());
/// }
/// ```
#[must_use]
pub fn find_manifest_dir(file: &Path) -> Option<PathBuf> {
    let start = if file.is_dir() { Some(file) } else { file.parent() };
    let mut current = start?;

    loop {
        if current.join(MANIFEST_FILE).is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Whether `path` names a Rust source file.
#[must_use]
pub fn is_rust_source(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "rs")
}

/// Make `path` absolute against the current directory, then normalise it.
///
/// Symlinks are not resolved; the saved file's path is compared textually
/// against paths reported by the compiler.
///
/// # Errors
///
/// Fails only if `path` is relative and the current directory is unavailable.
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Resolve `path` against `base` when relative, then normalise.
#[must_use]
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Lexically remove `.` and `..` components.
///
/// `..` at the root is dropped rather than escaping it.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    Some(Component::RootDir | Component::Prefix(_)) => true,
                    _ => false,
                };
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_manifest_dir_walks_up() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        fs::create_dir_all(root.join("src/net")).unwrap();
        let file = root.join("src/net/tcp.rs");
        fs::write(&file, "").unwrap();

        assert_eq!(find_manifest_dir(&file), Some(root.to_path_buf()));
    }

    #[test]
    fn test_find_manifest_dir_prefers_nearest() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("Cargo.toml"), "[workspace]\n").unwrap();
        fs::create_dir_all(root.join("crates/core/src")).unwrap();
        fs::write(root.join("crates/core/Cargo.toml"), "[package]\n").unwrap();
        let file = root.join("crates/core/src/lib.rs");
        fs::write(&file, "").unwrap();

        assert_eq!(find_manifest_dir(&file), Some(root.join("crates/core")));
    }

    #[test]
    fn test_find_manifest_dir_none_without_manifest() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("loose.rs");
        fs::write(&file, "").unwrap();

        // A Cargo.toml further up (outside the temp dir) would be a broken test
        // environment, so only assert when the temp root itself has none above.
        let found = find_manifest_dir(&file);
        if let Some(dir) = found {
            assert!(!dir.starts_with(temp.path()));
        }
    }

    #[test]
    fn test_is_rust_source() {
        assert!(is_rust_source(Path::new("src/main.rs")));
        assert!(!is_rust_source(Path::new("Cargo.toml")));
        assert!(!is_rust_source(Path::new("README")));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/p/src/../src/./lib.rs")),
            PathBuf::from("/p/src/lib.rs")
        );
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("../a/b")), PathBuf::from("../a/b"));
    }

    #[test]
    fn test_resolve_against() {
        assert_eq!(
            resolve_against(Path::new("/ws"), Path::new("crates/a/src/lib.rs")),
            PathBuf::from("/ws/crates/a/src/lib.rs")
        );
        assert_eq!(
            resolve_against(Path::new("/ws"), Path::new("/abs/x.rs")),
            PathBuf::from("/abs/x.rs")
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_relative() -> impl Strategy<Value = PathBuf> {
            prop::collection::vec(
                prop_oneof![Just(".".to_string()), Just("..".to_string()), "[a-z]{1,6}(\\.rs)?"],
                0..8,
            )
            .prop_map(|parts| parts.iter().collect())
        }

        proptest! {
            #[test]
            fn prop_normalize_is_idempotent(path in arb_relative()) {
                let abs = Path::new("/ws").join(&path);
                let once = normalize(&abs);
                prop_assert_eq!(normalize(&once), once.clone());
                prop_assert!(once.is_absolute());
                prop_assert!(!once.components().any(|c| matches!(c, Component::CurDir | Component::ParentDir)));
            }

            #[test]
            fn prop_resolve_against_matches_join(path in arb_relative()) {
                let base = Path::new("/ws/member");
                prop_assert_eq!(resolve_against(base, &path), normalize(&base.join(&path)));
            }
        }
    }
}
