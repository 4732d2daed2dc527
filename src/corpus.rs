//! Loading a directory of markup files into a [`DocumentMap`].

use std::path::{Path, MAIN_SEPARATOR};
use walkdir::WalkDir;

use crate::{
    codec::MarkupParser,
    config::get_content,
    error::ExoError,
    graph::DocumentMap,
};

/// The document name for `path`: its location under `root`, without the extension, with `/`
/// separators on every platform.
pub fn document_name(root: &Path, path: &Path) -> Result<String, ExoError> {
    let relative = path.strip_prefix(root)?.with_extension("");
    let name = relative.to_string_lossy();
    Ok(if MAIN_SEPARATOR == '/' {
        name.into_owned()
    } else {
        name.replace(MAIN_SEPARATOR, "/")
    })
}

/// Parse every file under `root` ending in `.extension`. The walk is depth-first with
/// siblings sorted by file name.
#[tracing::instrument(skip(parser))]
pub fn load_dir(
    parser: &MarkupParser,
    root: &Path,
    extension: &str,
) -> Result<DocumentMap, ExoError> {
    if !root.is_dir() {
        return Err(ExoError::not_found("content directory", root.display()));
    }
    let mut documents = DocumentMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(extension)
        {
            continue;
        }
        let name = document_name(root, path)?;
        tracing::debug!("[{name}] parsing {}", path.display());
        documents.insert(parser.parse_document(&name, &get_content(path)?))?;
    }
    tracing::info!("loaded {} documents from {}", documents.len(), root.display());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MARKUP;
    use std::fs::{create_dir_all, write};
    use tempfile::tempdir;
    use test_log::test;

    #[test]
    fn names_are_relative_and_sorted() {
        let dir = tempdir().unwrap();
        create_dir_all(dir.path().join("physics")).unwrap();
        write(dir.path().join("physics/optics.md"), "[[in|physics]]").unwrap();
        write(dir.path().join("physics.md"), "# Physics").unwrap();
        write(dir.path().join("art.md"), "").unwrap();
        write(dir.path().join("notes.txt"), "ignored").unwrap();

        let documents = load_dir(&MARKUP, dir.path(), "md").unwrap();
        assert_eq!(
            documents.names().collect::<Vec<_>>(),
            vec!["art", "physics/optics", "physics"]
        );
        assert_eq!(
            documents.get("physics/optics").unwrap().semantic_links()[0].object,
            "physics"
        );
    }

    #[test]
    fn missing_root_is_not_found() {
        let dir = tempdir().unwrap();
        let err = load_dir(&MARKUP, &dir.path().join("absent"), "md").unwrap_err();
        assert!(err.is_not_found());
    }
}
