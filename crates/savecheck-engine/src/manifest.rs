use std::path::{Path, PathBuf};

use crate::paths;

/// Finds the directory cargo should run in for a saved file.
pub trait ManifestLocator: Send + Sync {
    /// Directory of the nearest `Cargo.toml` at or above `file`.
    fn locate(&self, file: &Path) -> Option<PathBuf>;
}

/// Upward filesystem search for `Cargo.toml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CargoManifestLocator;

impl ManifestLocator for CargoManifestLocator {
    fn locate(&self, file: &Path) -> Option<PathBuf> {
        paths::find_manifest_dir(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_locates_package_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Cargo.toml"), "[package]\n").unwrap();
        fs::create_dir_all(temp.path().join("src/bin")).unwrap();

        let found = CargoManifestLocator.locate(&temp.path().join("src/bin/tool.rs"));
        assert_eq!(found.as_deref(), Some(temp.path()));
    }
}
