//! Filesystem helpers for configuration loading and tool discovery.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

const UTF8_BOM: &str = "\u{feff}";

/// Read a JSON document, tolerating a leading UTF-8 byte-order mark.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let body = text.strip_prefix(UTF8_BOM).unwrap_or(&text);
    serde_json::from_str(body).with_context(|| format!("failed to parse {}", path.display()))
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Candidate renderer locations relative to `root`, most specific first.
pub fn renderer_candidates(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for rel in ["vendor/zint/zint", "zint-2.12.0/zint", "zint"] {
        out.push(root.join(rel));
        out.push(root.join(format!("{rel}.exe")));
    }
    out
}

/// Candidate font locations relative to `root`.
pub fn font_candidates(root: &Path) -> Vec<PathBuf> {
    ["assets/fonts/OCR-B.ttf", "font/OCR-B.ttf", "assets/fonts/OCR-B.otf", "font/OCR-B.otf"]
        .iter()
        .map(|rel| root.join(rel))
        .collect()
}

/// Look for the renderer under `root`, then on `PATH`.
pub fn discover_renderer(root: &Path) -> Option<PathBuf> {
    renderer_candidates(root)
        .into_iter()
        .find(|p| p.is_file())
        .or_else(|| search_path("zint"))
}

pub fn discover_font(root: &Path) -> Option<PathBuf> {
    font_candidates(root).into_iter().find(|p| p.is_file())
}

/// First executable-looking file called `name` on `PATH`.
pub fn search_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| {
        [dir.join(name), dir.join(format!("{name}.exe"))]
            .into_iter()
            .find(|p| p.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        title: String,
    }

    #[test]
    fn bom_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, "\u{feff}{\"title\":\"YMCA\"}").unwrap();
        let parsed: Sample = read_json(&path).unwrap();
        assert_eq!(parsed.title, "YMCA");
    }

    #[test]
    fn broken_json_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, "{").unwrap();
        let err = read_json::<Sample>(&path).unwrap_err();
        assert!(format!("{err}").contains("c.json"));
    }

    #[test]
    fn vendored_renderer_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("vendor/zint")).unwrap();
        fs::create_dir_all(dir.path().join("zint-2.12.0")).unwrap();
        fs::write(dir.path().join("vendor/zint/zint"), "").unwrap();
        fs::write(dir.path().join("zint-2.12.0/zint"), "").unwrap();
        assert_eq!(
            discover_renderer(dir.path()),
            Some(dir.path().join("vendor/zint/zint"))
        );
    }

    #[test]
    fn font_prefers_ttf_in_assets() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("assets/fonts")).unwrap();
        fs::create_dir_all(dir.path().join("font")).unwrap();
        fs::write(dir.path().join("font/OCR-B.ttf"), "").unwrap();
        fs::write(dir.path().join("assets/fonts/OCR-B.otf"), "").unwrap();
        assert_eq!(discover_font(dir.path()), Some(dir.path().join("font/OCR-B.ttf")));

        fs::write(dir.path().join("assets/fonts/OCR-B.ttf"), "").unwrap();
        assert_eq!(
            discover_font(dir.path()),
            Some(dir.path().join("assets/fonts/OCR-B.ttf"))
        );
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/etc/cardmaker");
        assert_eq!(resolve_against(base, Path::new("fonts/a.ttf")), base.join("fonts/a.ttf"));
        assert_eq!(resolve_against(base, Path::new("/opt/a.ttf")), PathBuf::from("/opt/a.ttf"));
    }
}
