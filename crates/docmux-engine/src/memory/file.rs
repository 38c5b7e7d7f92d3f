//! TOML form of a [`MemoryDocument`].
//!
//! ```toml
//! text = "Dear \n<Name>\n"
//!
//! [[bookmarks]]
//! name = "DOC(CMD 'insertFrag' FRAG_ID 'Header')"
//! start = 0
//! end = 0
//!
//! [[fields]]
//! kind = "placeholder"
//! hint = "<Name>"
//! start = 6
//! end = 12
//! ```
//!
//! Offsets are byte offsets into `text`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{FieldKind, MemoryDocument};
use crate::host::StyleFamily;
use crate::services::{ContentLoader, LoadError};

#[derive(Debug, Error)]
pub enum DocumentFileError {
    #[error("Failed to read document file: {path}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse document file: {path}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("unknown style family '{0}'")]
    UnknownStyleFamily(String),

    #[error("{what} spans {start}..{end}, which is not inside the text")]
    InvalidSpan {
        what: String,
        start: usize,
        end: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkEntry {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldSpec {
    Placeholder { hint: String },
    Computed { variable: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    #[serde(flatten)]
    pub spec: FieldSpec,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentFile {
    pub text: String,
    /// Present when the document was saved somewhere, which makes it a non-template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub bookmarks: Vec<BookmarkEntry>,
    pub fields: Vec<FieldEntry>,
    pub annotations: Vec<AnnotationEntry>,
    /// Style names by family (`textstyles`, `pagestyles`, `numberingstyles`).
    pub styles: BTreeMap<String, BTreeSet<String>>,
    pub variables: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
}

impl DocumentFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DocumentFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DocumentFileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| DocumentFileError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn from_document(doc: &MemoryDocument) -> Self {
        Self {
            text: doc.text(),
            location: doc.location.clone(),
            bookmarks: doc
                .bookmarks
                .iter()
                .map(|b| BookmarkEntry {
                    name: b.name.clone(),
                    start: b.span.start,
                    end: b.span.end,
                })
                .collect(),
            fields: doc
                .fields
                .iter()
                .map(|f| FieldEntry {
                    spec: match &f.kind {
                        FieldKind::Placeholder { hint } => FieldSpec::Placeholder { hint: hint.clone() },
                        FieldKind::Computed { variable } => FieldSpec::Computed {
                            variable: variable.clone(),
                        },
                    },
                    start: f.span.start,
                    end: f.span.end,
                })
                .collect(),
            annotations: doc
                .annotations
                .iter()
                .map(|a| AnnotationEntry {
                    text: a.text.clone(),
                    start: a.span.start,
                    end: a.span.end,
                })
                .collect(),
            styles: doc
                .styles
                .iter()
                .map(|(family, names)| (family.to_string(), names.clone()))
                .collect(),
            variables: doc.variables.clone(),
            metadata: doc.metadata.clone(),
        }
    }

    /// Builds the document, checking that every span lies on character boundaries of `text`.
    pub fn into_document(self) -> Result<MemoryDocument, DocumentFileError> {
        let check = |what: &str, start: usize, end: usize| {
            let valid = start <= end
                && end <= self.text.len()
                && self.text.is_char_boundary(start)
                && self.text.is_char_boundary(end);
            if valid {
                Ok(start..end)
            } else {
                Err(DocumentFileError::InvalidSpan {
                    what: what.to_string(),
                    start,
                    end,
                })
            }
        };

        let mut doc = MemoryDocument::new(&self.text);
        for bookmark in &self.bookmarks {
            let span = check(&format!("bookmark '{}'", bookmark.name), bookmark.start, bookmark.end)?;
            doc.add_bookmark(&bookmark.name, span);
        }
        for field in &self.fields {
            let span = check("field", field.start, field.end)?;
            let kind = match &field.spec {
                FieldSpec::Placeholder { hint } => FieldKind::Placeholder { hint: hint.clone() },
                FieldSpec::Computed { variable } => FieldKind::Computed {
                    variable: variable.clone(),
                },
            };
            doc.add_field(kind, span);
        }
        for annotation in &self.annotations {
            let span = check("annotation", annotation.start, annotation.end)?;
            doc.add_annotation(span, &annotation.text);
        }
        for (family, names) in &self.styles {
            let family = StyleFamily::from_command_name(family)
                .ok_or_else(|| DocumentFileError::UnknownStyleFamily(family.clone()))?;
            for name in names {
                doc.add_style(family, name);
            }
        }
        for (name, value) in &self.variables {
            doc.set_variable(name, value);
        }
        doc.metadata = self.metadata.clone();
        doc.location = self.location.clone();
        Ok(doc)
    }
}

/// Loads fragments from document files on disk.
///
/// Locations may use `~` and environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileContentLoader;

impl ContentLoader<MemoryDocument> for FileContentLoader {
    fn load(&self, location: &str) -> Result<MemoryDocument, LoadError> {
        let path = shellexpand::full(location)
            .map(|expanded| expanded.into_owned())
            .unwrap_or_else(|_| location.to_string());
        log::debug!("Loading fragment from {path}");

        let file = DocumentFile::load(&path).map_err(|e| match e {
            DocumentFileError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                LoadError::NotFound(location.to_string())
            }
            DocumentFileError::Read { source, .. } => LoadError::Read {
                location: location.to_string(),
                source,
            },
            other => LoadError::Parse {
                location: location.to_string(),
                message: other.to_string(),
            },
        })?;
        file.into_document().map_err(|e| LoadError::Parse {
            location: location.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TextDocument;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> MemoryDocument {
        let mut doc = MemoryDocument::new("Dear ");
        doc.push_placeholder("<Name>");
        doc.push_text(",\n");
        doc.push_bookmarked("DOC(CMD 'updateFields')", "Total: ");
        doc.push_computed("total", "?");
        doc.add_style(StyleFamily::Page, "Letter");
        doc.set_variable("total", "12");
        doc.set_persistent_data("FormDescription", "Window()");
        doc
    }

    #[test]
    fn test_document_survives_a_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("letters").join("doc.toml");
        let original = DocumentFile::from_document(&sample());

        original.save(&path).unwrap();
        let loaded = DocumentFile::load(&path).unwrap();

        assert_eq!(loaded, original);
        let doc = loaded.into_document().unwrap();
        assert_eq!(doc.text(), "Dear <Name>,\nTotal: ?");
        assert_eq!(doc.styles(StyleFamily::Page), vec!["Letter"]);
        assert_eq!(doc.persistent_data("FormDescription").as_deref(), Some("Window()"));
    }

    #[test]
    fn test_field_kinds_are_tagged() {
        let file: DocumentFile = toml::from_str(
            r#"
            text = "Hi <Name>"

            [[fields]]
            kind = "placeholder"
            hint = "<Name>"
            start = 3
            end = 9
            "#,
        )
        .unwrap();

        assert_eq!(
            file.fields[0].spec,
            FieldSpec::Placeholder {
                hint: "<Name>".into()
            }
        );
    }

    #[test]
    fn test_span_outside_text_is_rejected() {
        let file = DocumentFile {
            text: "abc".into(),
            bookmarks: vec![BookmarkEntry {
                name: "b".into(),
                start: 2,
                end: 7,
            }],
            ..DocumentFile::default()
        };

        assert!(matches!(
            file.into_document(),
            Err(DocumentFileError::InvalidSpan { start: 2, end: 7, .. })
        ));
    }

    #[test]
    fn test_unknown_style_family_is_rejected() {
        let file: DocumentFile = toml::from_str("text = \"\"\n[styles]\nframestyles = [\"Box\"]").unwrap();

        assert!(matches!(
            file.into_document(),
            Err(DocumentFileError::UnknownStyleFamily(name)) if name == "framestyles"
        ));
    }

    #[test]
    fn test_location_marks_document_as_saved() {
        let file: DocumentFile = toml::from_str("text = \"x\"\nlocation = \"/tmp/x.toml\"").unwrap();
        assert!(file.into_document().unwrap().has_location());
    }

    #[test]
    fn test_file_loader() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frag.toml");
        std::fs::write(&path, "text = \"Fragment\"").unwrap();
        let location = path.display().to_string();

        assert_eq!(FileContentLoader.load(&location).unwrap().text(), "Fragment");
        assert!(matches!(
            FileContentLoader.load(&temp_dir.path().join("missing.toml").display().to_string()),
            Err(LoadError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_loader_reports_bad_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "text = ").unwrap();

        assert!(matches!(
            FileContentLoader.load(&path.display().to_string()),
            Err(LoadError::Parse { .. })
        ));
    }
}
