//! Filesystem-backed document library.
//!
//! Layout under the root directory:
//!
//! ```text
//! books/<title>.txt | books/<title>.pdf | books/<title>.jpg
//! movies/<title>.txt | movies/<title>.pdf | movies/<title>.jpg
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::traits::DocumentSource;
use crate::types::{Category, DocumentId};

const TEXT_EXTENSIONS: [&str; 2] = ["txt", "pdf"];

#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
}

impl Library {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Sorted titles available in a category. A missing directory is an empty shelf.
    pub fn titles(&self, category: Category) -> Result<Vec<String>> {
        let dir = self.category_dir(category);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut titles = BTreeSet::new();
        for entry in walkdir::WalkDir::new(&dir).max_depth(1) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_doc = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| TEXT_EXTENSIONS.iter().any(|t| ext.eq_ignore_ascii_case(t)))
                .unwrap_or(false);
            if let (true, Some(stem)) = (is_doc, path.file_stem().and_then(|s| s.to_str())) {
                titles.insert(stem.to_string());
            }
        }
        Ok(titles.into_iter().collect())
    }

    /// Cover image for a document, if one sits next to it.
    pub fn cover_path(&self, id: &DocumentId) -> Option<PathBuf> {
        let path = self.category_dir(id.category).join(format!("{}.jpg", id.title));
        path.is_file().then_some(path)
    }

    fn find_file(&self, id: &DocumentId) -> Option<PathBuf> {
        let dir = self.category_dir(id.category);
        TEXT_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", id.title, ext)))
            .find(|p| p.is_file())
    }
}

impl DocumentSource for Library {
    fn load(&self, id: &DocumentId) -> Result<String> {
        let path = self.find_file(id).ok_or_else(|| Error::DocumentNotFound(id.clone()))?;
        tracing::debug!(doc = %id, path = %path.display(), "loading document");
        let is_pdf = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            let bytes = fs::read(&path)?;
            return pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| Error::Extraction(format!("{}: {}", path.display(), e)));
        }
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(&path)?).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library_with(files: &[(&str, &[u8])]) -> (TempDir, Library) {
        let tmp = TempDir::new().unwrap();
        for (rel, body) in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        let lib = Library::new(tmp.path());
        (tmp, lib)
    }

    #[test]
    fn lists_titles_per_category() {
        let (_tmp, lib) = library_with(&[
            ("books/Dune.txt", b"spice"),
            ("books/Emma.txt", b"hartfield"),
            ("books/Emma.jpg", b"\xff\xd8"),
            ("movies/Alien.txt", b"nostromo"),
        ]);
        assert_eq!(lib.titles(Category::Book).unwrap(), vec!["Dune", "Emma"]);
        assert_eq!(lib.titles(Category::Movie).unwrap(), vec!["Alien"]);
    }

    #[test]
    fn missing_shelf_is_empty() {
        let (_tmp, lib) = library_with(&[]);
        assert!(lib.titles(Category::Movie).unwrap().is_empty());
    }

    #[test]
    fn loads_text_and_reports_missing() {
        let (_tmp, lib) = library_with(&[("books/Dune.txt", b"The spice must flow.")]);
        let text = lib.load(&DocumentId::new(Category::Book, "Dune")).unwrap();
        assert_eq!(text, "The spice must flow.");

        let err = lib.load(&DocumentId::new(Category::Movie, "Dune")).unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[test]
    fn non_utf8_text_is_decoded_lossily() {
        let (_tmp, lib) = library_with(&[("books/Old.txt", b"caf\xe9 au lait")]);
        let text = lib.load(&DocumentId::new(Category::Book, "Old")).unwrap();
        assert!(text.starts_with("caf"));
        assert!(text.ends_with("au lait"));
    }

    #[test]
    fn finds_cover_only_when_present() {
        let (_tmp, lib) = library_with(&[("books/Emma.txt", b"x"), ("books/Emma.jpg", b"y")]);
        assert!(lib.cover_path(&DocumentId::new(Category::Book, "Emma")).is_some());
        assert!(lib.cover_path(&DocumentId::new(Category::Book, "Dune")).is_none());
    }
}
