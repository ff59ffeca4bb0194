//! Locating optional real sample files.
//!
//! Real segment files are large and not checked in; tests that need one
//! look for it here and skip when it is absent.

use std::path::{Path, PathBuf};

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .ancestors()
        .nth(2)
        .unwrap_or(manifest)
        .to_path_buf()
}

/// Directories searched for sample files, most specific first:
/// `$TEST_DATA_DIR`, `crates/hsd-parser/testdata`, then `testdata`.
pub fn sample_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    let mut dirs: Vec<PathBuf> = std::env::var_os("TEST_DATA_DIR")
        .map(PathBuf::from)
        .into_iter()
        .collect();
    dirs.push(root.join("crates").join("hsd-parser").join("testdata"));
    dirs.push(root.join("testdata"));
    dirs
}

/// First existing `name` under [`sample_dirs`].
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    sample_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_holds_manifest() {
        assert!(workspace_root().join("Cargo.toml").is_file());
        assert!(workspace_root().join("crates").join("test-utils").is_dir());
    }

    #[test]
    fn test_unknown_sample_is_none() {
        assert!(find_test_file("HS_H08_19990101_0000_B99_FLDK_R20_S0110.DAT").is_none());
    }

    #[test]
    fn test_search_order_ends_at_workspace_testdata() {
        let dirs = sample_dirs();
        assert_eq!(dirs.last(), Some(&workspace_root().join("testdata")));
    }
}
