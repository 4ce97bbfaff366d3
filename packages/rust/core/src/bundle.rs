//! Loading page bundles from disk.
//!
//! A bundle is one JSON document holding a page's `metadata` and its
//! `content` tree. See `fixtures/json/` for examples.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use docrender_shared::{DocRenderError, PageBundle, Result};

/// Parse a bundle from JSON text.
pub fn parse_bundle(json: &str) -> Result<PageBundle> {
    serde_json::from_str(json).map_err(|e| DocRenderError::parse(format!("invalid page bundle: {e}")))
}

/// Read and parse a bundle file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_bundle(path: &Path) -> Result<PageBundle> {
    let raw = std::fs::read_to_string(path).map_err(|e| DocRenderError::io(path, e))?;
    let bundle = parse_bundle(&raw).map_err(|e| match e {
        DocRenderError::Parse { message } => {
            DocRenderError::parse(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;

    debug!(
        has_metadata = bundle.metadata.is_some(),
        root = %bundle.content.tag,
        "bundle loaded"
    );
    Ok(bundle)
}

/// List the `*.json` files directly inside `dir`, sorted by path.
pub fn bundle_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| DocRenderError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DocRenderError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every bundle in `dir`. Each result is paired with its path so one
/// bad file does not hide the others.
pub fn load_bundle_dir(dir: &Path) -> Result<Vec<(PathBuf, Result<PageBundle>)>> {
    let paths = bundle_paths(dir)?;
    debug!(dir = %dir.display(), count = paths.len(), "loading bundle directory");
    Ok(paths
        .into_iter()
        .map(|path| {
            let bundle = load_bundle(&path);
            (path, bundle)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures/json")
    }

    #[test]
    fn parses_minimal_bundle() {
        let bundle = parse_bundle(
            r##"{
                "metadata": {"title": "retrieve_utils", "permalink": "/docs/reference/retrieve_utils"},
                "content": {"tag": "wrapper", "children": [
                    {"tag": "h2", "props": {"id": "split_text_to_chunks"}, "children": ["split_text_to_chunks"]}
                ]}
            }"##,
        )
        .unwrap();

        let meta = bundle.metadata.expect("metadata");
        assert_eq!(meta.title, "retrieve_utils");
        assert_eq!(bundle.content.children[0].text_content(), "split_text_to_chunks");
    }

    #[test]
    fn bundle_without_metadata_parses() {
        let bundle = parse_bundle(r#"{"content": {"tag": "wrapper"}}"#).unwrap();
        assert!(bundle.metadata.is_none());
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = parse_bundle("{not json").unwrap_err();
        assert!(matches!(err, DocRenderError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_bundle(Path::new("/nonexistent/page.json")).unwrap_err();
        assert!(matches!(err, DocRenderError::Io { .. }));
    }

    #[test]
    fn loads_fixture_directory_in_order() {
        let loaded = load_bundle_dir(&fixtures_dir()).unwrap();
        assert!(loaded.len() >= 3);

        let names: Vec<String> = loaded
            .iter()
            .filter_map(|(p, _)| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        for (path, bundle) in &loaded {
            assert!(bundle.is_ok(), "{} failed to load", path.display());
        }
    }
}
