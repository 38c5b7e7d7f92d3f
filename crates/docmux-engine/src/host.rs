//! The document API the interpreter drives.
//!
//! A real word processor sits behind [`TextDocument`]. The crate ships one implementation,
//! [`crate::memory::MemoryDocument`], which the tests and the command line front end use.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::relation::TextRange;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("bookmark '{0}' does not exist")]
    BookmarkNotFound(String),

    #[error("field {0} does not exist")]
    FieldNotFound(String),

    #[error("range {0} lies outside the document")]
    InvalidRange(String),

    #[error("field {field} could not be refreshed: {reason}")]
    RefreshFailed { field: String, reason: String },
}

/// Style families that can be imported from a fragment without inserting its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StyleFamily {
    Text,
    Page,
    Numbering,
}

impl StyleFamily {
    pub const ALL: [StyleFamily; 3] = [StyleFamily::Text, StyleFamily::Page, StyleFamily::Numbering];

    /// Parses the `STYLES` spelling (`textStyles`, `pageStyles`, `numberingStyles`).
    pub fn from_command_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "textstyles" => Some(StyleFamily::Text),
            "pagestyles" => Some(StyleFamily::Page),
            "numberingstyles" => Some(StyleFamily::Numbering),
            _ => None,
        }
    }
}

impl fmt::Display for StyleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StyleFamily::Text => "textstyles",
            StyleFamily::Page => "pagestyles",
            StyleFamily::Numbering => "numberingstyles",
        };
        f.write_str(name)
    }
}

pub type StyleFamilies = BTreeSet<StyleFamily>;

/// A text document with named bookmarks, fields and an element tree.
///
/// Positions are only ever handed out as opaque [`TextDocument::Range`]s. Operations that
/// take a range and a bookmark name work on the bookmark's current range at call time.
pub trait TextDocument {
    type Range: TextRange + Clone + fmt::Debug;
    /// A loaded fragment that can be spliced into this document.
    type Content;
    /// A placeholder field.
    type Field: Clone + fmt::Debug;
    /// A node of the content element tree (paragraphs, fields, ...).
    type Element: Clone + fmt::Debug;

    // ---- flags ----

    fn is_modified(&self) -> bool;
    fn set_modified(&mut self, modified: bool);
    /// Whether the user may edit the document. Programmatic edits are always allowed.
    fn set_modifiable(&mut self, modifiable: bool);
    fn lock_controllers(&mut self);
    fn unlock_controllers(&mut self);
    /// True when the document was opened from a location rather than created from a template.
    fn has_location(&self) -> bool;

    // ---- bookmarks ----

    fn bookmark_names(&self) -> Vec<String>;
    fn bookmark_range(&self, name: &str) -> Option<Self::Range>;
    /// Inserts a bookmark and returns its final name, which the host may make unique.
    fn insert_bookmark(&mut self, name: &str, range: &Self::Range) -> Result<String, HostError>;
    fn remove_bookmark(&mut self, name: &str) -> Result<(), HostError>;
    /// Renames a bookmark and returns its final name.
    fn rename_bookmark(&mut self, name: &str, new_name: &str) -> Result<String, HostError>;
    /// Names of all bookmarks lying inside `range`.
    fn bookmarks_within(&self, range: &Self::Range) -> Vec<String>;
    /// Replaces the bookmark's text. Afterwards the bookmark covers exactly `text`, collapsing
    /// when it is empty.
    fn set_bookmark_text(&mut self, name: &str, text: &str) -> Result<(), HostError>;

    // ---- text and content ----

    fn text_of(&self, range: &Self::Range) -> String;
    /// Inserts `content` at the start of the collapsed range `at`.
    fn insert_content(&mut self, at: &Self::Range, content: &Self::Content)
    -> Result<(), HostError>;
    fn import_styles(
        &mut self,
        content: &Self::Content,
        families: &StyleFamilies,
    ) -> Result<(), HostError>;

    // ---- navigation ----

    fn collapse_to_start(&self, range: &Self::Range) -> Self::Range;
    fn collapse_to_end(&self, range: &Self::Range) -> Self::Range;
    /// Moves the start and end of `range` by the given number of characters, or `None` if
    /// that would leave the text.
    fn shift(&self, range: &Self::Range, start_by: isize, end_by: isize) -> Option<Self::Range>;

    // ---- paragraphs ----

    fn is_start_of_paragraph(&self, at: &Self::Range) -> bool;
    fn is_end_of_paragraph(&self, at: &Self::Range) -> bool;
    fn is_end_of_document(&self, at: &Self::Range) -> bool;
    /// Deletes the paragraph containing `at` together with its paragraph break.
    fn delete_paragraph(&mut self, at: &Self::Range) -> Result<(), HostError>;

    // ---- placeholder fields ----

    /// Placeholder fields inside `range`, in document order.
    fn placeholders_within(&self, range: &Self::Range) -> Vec<Self::Field>;
    fn placeholder_range(&self, field: &Self::Field) -> Option<Self::Range>;
    /// Replaces a placeholder field by plain text.
    fn replace_placeholder(&mut self, field: &Self::Field, text: &str) -> Result<(), HostError>;

    // ---- element tree ----

    /// Top level content elements inside `range`, in document order.
    fn elements_within(&self, range: &Self::Range) -> Vec<Self::Element>;
    fn child_elements(&self, element: &Self::Element) -> Vec<Self::Element>;
    /// Refreshes an element's field. `None` when the element has nothing to refresh.
    fn refresh_element(&mut self, element: &Self::Element) -> Option<Result<(), HostError>>;

    // ---- user interface ----

    fn set_view_cursor(&mut self, range: &Self::Range);
    fn insert_annotation(&mut self, at: &Self::Range, text: &str) -> Result<(), HostError>;

    // ---- persistent metadata ----

    fn persistent_data(&self, key: &str) -> Option<String>;
    fn set_persistent_data(&mut self, key: &str, value: &str);
}

/// Batch-mutation scope: controllers stay locked until the guard is dropped.
pub struct ControllerLock<'a, D: TextDocument> {
    doc: &'a mut D,
}

impl<'a, D: TextDocument> ControllerLock<'a, D> {
    pub fn new(doc: &'a mut D) -> Self {
        doc.lock_controllers();
        Self { doc }
    }
}

impl<D: TextDocument> Deref for ControllerLock<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.doc
    }
}

impl<D: TextDocument> DerefMut for ControllerLock<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.doc
    }
}

impl<D: TextDocument> Drop for ControllerLock<'_, D> {
    fn drop(&mut self) {
        self.doc.unlock_controllers();
    }
}
