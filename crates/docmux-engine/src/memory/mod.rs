//! In-memory [`TextDocument`] used by the tests and the command line front end.
//!
//! The text lives in a single `xi_rope::Rope`. Every edit is compiled into a `Delta` and
//! applied to the buffer. Bookmarks, fields, annotations and the view cursor are byte spans
//! that are re-anchored after each edit by [`reanchor`].
//!
//! Paragraphs are separated by `\n`.

pub mod file;

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use xi_rope::Rope;
use xi_rope::delta::Builder;

use crate::host::{HostError, StyleFamilies, StyleFamily, TextDocument};
use crate::relation::TextRange;
use crate::services::{ContentLoader, LoadError};

pub use file::{DocumentFile, DocumentFileError, FileContentLoader};

/// Container id of a document's main text.
pub const BODY: u32 = 0;

/// A byte span inside one text container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextSpan {
    pub container: u32,
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self::in_container(BODY, start, end)
    }

    pub fn in_container(container: u32, start: usize, end: usize) -> Self {
        Self {
            container,
            start,
            end,
        }
    }

    pub fn collapsed(at: usize) -> Self {
        Self::new(at, at)
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

impl TextRange for TextSpan {
    fn compare_starts(&self, other: &Self) -> Option<Ordering> {
        (self.container == other.container).then(|| self.start.cmp(&other.start))
    }

    fn compare_ends(&self, other: &Self) -> Option<Ordering> {
        (self.container == other.container).then(|| self.end.cmp(&other.end))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub name: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Jump-target placeholder showing a hint until it is filled.
    Placeholder { hint: String },
    /// Shows the value of a document variable once refreshed.
    Computed { variable: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub id: FieldId,
    pub kind: FieldKind,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub span: Range<usize>,
    pub text: String,
}

/// Element tree of a [`MemoryDocument`]: paragraphs by index, with their fields as children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryElement {
    Paragraph(usize),
    Field(FieldId),
}

/// Whose span follows an edit exactly instead of being re-anchored.
enum Owner<'a> {
    Bookmark(&'a str),
    Field(FieldId),
}

/// Where `span` ends up after `edited` is replaced by `inserted` bytes of new text.
///
/// Returns `None` when the span disappears with the replaced text. Boundaries touching the
/// edit stay outside of it: text inserted at a span's start or end does not join the span.
pub fn reanchor(span: &Range<usize>, edited: &Range<usize>, inserted: usize) -> Option<Range<usize>> {
    let (s, e) = (edited.start, edited.end);
    let moved = |p: usize| p - (e - s) + inserted;

    if span.start == span.end {
        let p = span.start;
        return if p <= s {
            Some(p..p)
        } else if p >= e {
            Some(moved(p)..moved(p))
        } else {
            None
        };
    }

    let (bs, be) = (span.start, span.end);
    if be <= s {
        Some(bs..be)
    } else if bs >= e {
        Some(moved(bs)..moved(be))
    } else if s <= bs && be <= e {
        None
    } else if bs <= s && e <= be {
        Some(bs..moved(be))
    } else if bs < s {
        Some(bs..s)
    } else {
        Some(s + inserted..moved(be))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    buffer: Rope,
    bookmarks: Vec<Bookmark>,
    fields: Vec<Field>,
    annotations: Vec<Annotation>,
    styles: BTreeMap<StyleFamily, BTreeSet<String>>,
    variables: BTreeMap<String, String>,
    metadata: BTreeMap<String, String>,
    location: Option<String>,
    view_cursor: Option<Range<usize>>,
    modified: bool,
    modifiable: bool,
    controller_locks: usize,
    next_field_id: u64,
}

impl MemoryDocument {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: Rope::from(text),
            modifiable: true,
            ..Self::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    // ---- building ----

    /// Appends plain text.
    pub fn push_text(&mut self, text: &str) {
        let end = self.len();
        self.edit(end..end, text, None);
    }

    /// Appends `text` covered by a new bookmark and returns the bookmark's final name.
    pub fn push_bookmarked(&mut self, name: &str, text: &str) -> String {
        let start = self.len();
        self.push_text(text);
        self.add_bookmark(name, start..self.len())
    }

    /// Appends a placeholder field showing `hint`.
    pub fn push_placeholder(&mut self, hint: &str) -> FieldId {
        let start = self.len();
        self.push_text(hint);
        self.add_field(
            FieldKind::Placeholder {
                hint: hint.to_string(),
            },
            start..self.len(),
        )
    }

    /// Appends a computed field bound to `variable`, initially showing `text`.
    pub fn push_computed(&mut self, variable: &str, text: &str) -> FieldId {
        let start = self.len();
        self.push_text(text);
        self.add_field(
            FieldKind::Computed {
                variable: variable.to_string(),
            },
            start..self.len(),
        )
    }

    pub fn add_bookmark(&mut self, name: &str, span: Range<usize>) -> String {
        let name = self.unique_name(name, None);
        self.bookmarks.push(Bookmark {
            name: name.clone(),
            span,
        });
        name
    }

    pub fn add_field(&mut self, kind: FieldKind, span: Range<usize>) -> FieldId {
        let id = FieldId(self.next_field_id);
        self.next_field_id += 1;
        self.fields.push(Field { id, kind, span });
        id
    }

    pub fn add_annotation(&mut self, span: Range<usize>, text: &str) {
        self.annotations.push(Annotation {
            span,
            text: text.to_string(),
        });
    }

    pub fn add_style(&mut self, family: StyleFamily, name: &str) {
        self.styles
            .entry(family)
            .or_default()
            .insert(name.to_string());
    }

    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    // ---- inspection ----

    pub fn bookmark(&self, name: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.name == name)
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    /// Text currently covered by the bookmark.
    pub fn bookmark_text(&self, name: &str) -> Option<String> {
        self.bookmark(name).map(|b| self.slice(b.span.clone()))
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn styles(&self, family: StyleFamily) -> Vec<&str> {
        self.styles
            .get(&family)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn view_cursor(&self) -> Option<Range<usize>> {
        self.view_cursor.clone()
    }

    pub fn is_modifiable(&self) -> bool {
        self.modifiable
    }

    pub fn controllers_locked(&self) -> bool {
        self.controller_locks > 0
    }

    pub fn slice(&self, range: Range<usize>) -> String {
        let len = self.len();
        let start = range.start.min(len);
        let end = range.end.min(len).max(start);
        self.buffer.slice_to_cow(start..end).into_owned()
    }

    // ---- editing ----

    fn check_span(&self, span: &TextSpan) -> Result<(), HostError> {
        if span.container != BODY || span.start > span.end || span.end > self.len() {
            return Err(HostError::InvalidRange(format!("{span:?}")));
        }
        Ok(())
    }

    /// Replaces `span` with `text` and re-anchors everything that points into the buffer.
    fn edit(&mut self, span: Range<usize>, text: &str, owner: Option<Owner<'_>>) {
        let mut builder = Builder::new(self.buffer.len());
        builder.replace(span.clone(), Rope::from(text));
        let delta = builder.build();
        self.buffer = delta.apply(&self.buffer);

        let inserted = text.len();
        let owned_span = span.start..span.start + inserted;

        self.bookmarks.retain_mut(|bookmark| {
            if matches!(owner, Some(Owner::Bookmark(name)) if name == bookmark.name) {
                bookmark.span = owned_span.clone();
                return true;
            }
            match reanchor(&bookmark.span, &span, inserted) {
                Some(moved) => {
                    bookmark.span = moved;
                    true
                }
                None => false,
            }
        });
        self.fields.retain_mut(|field| {
            if matches!(owner, Some(Owner::Field(id)) if id == field.id) {
                field.span = owned_span.clone();
                return true;
            }
            match reanchor(&field.span, &span, inserted) {
                Some(moved) => {
                    field.span = moved;
                    true
                }
                None => false,
            }
        });
        self.annotations.retain_mut(|annotation| {
            match reanchor(&annotation.span, &span, inserted) {
                Some(moved) => {
                    annotation.span = moved;
                    true
                }
                None => false,
            }
        });
        if let Some(cursor) = self.view_cursor.take() {
            self.view_cursor =
                Some(reanchor(&cursor, &span, inserted).unwrap_or(span.start..span.start));
        }

        self.modified = true;
    }

    fn unique_name(&self, name: &str, except: Option<&str>) -> String {
        let taken = |candidate: &str| {
            self.bookmarks
                .iter()
                .any(|b| b.name == candidate && Some(b.name.as_str()) != except)
        };
        if !taken(name) {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{name}{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    fn paragraph_bounds(&self, at: usize) -> Range<usize> {
        let text = self.text();
        let at = at.min(text.len());
        let start = text[..at].rfind('\n').map_or(0, |i| i + 1);
        let end = text[at..].find('\n').map_or(text.len(), |i| at + i);
        start..end
    }

    /// Byte spans of all paragraphs, in order.
    fn paragraphs(&self) -> Vec<Range<usize>> {
        let text = self.text();
        let mut start = 0;
        let mut paragraphs = Vec::new();
        for (i, _) in text.match_indices('\n') {
            paragraphs.push(start..i);
            start = i + 1;
        }
        paragraphs.push(start..text.len());
        paragraphs
    }

    fn step(&self, text: &str, at: usize, by: isize) -> Option<usize> {
        let mut at = at;
        if by >= 0 {
            for _ in 0..by {
                at += text.get(at..)?.chars().next()?.len_utf8();
            }
        } else {
            for _ in 0..by.unsigned_abs() {
                at -= text.get(..at)?.chars().next_back()?.len_utf8();
            }
        }
        Some(at)
    }
}

impl TextDocument for MemoryDocument {
    type Range = TextSpan;
    type Content = MemoryDocument;
    type Field = FieldId;
    type Element = MemoryElement;

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    fn set_modifiable(&mut self, modifiable: bool) {
        self.modifiable = modifiable;
    }

    fn lock_controllers(&mut self) {
        self.controller_locks += 1;
    }

    fn unlock_controllers(&mut self) {
        self.controller_locks = self.controller_locks.saturating_sub(1);
    }

    fn has_location(&self) -> bool {
        self.location.is_some()
    }

    fn bookmark_names(&self) -> Vec<String> {
        let mut bookmarks: Vec<&Bookmark> = self.bookmarks.iter().collect();
        bookmarks.sort_by_key(|b| (b.span.start, Reverse(b.span.end)));
        bookmarks.into_iter().map(|b| b.name.clone()).collect()
    }

    fn bookmark_range(&self, name: &str) -> Option<TextSpan> {
        self.bookmark(name)
            .map(|b| TextSpan::new(b.span.start, b.span.end))
    }

    fn insert_bookmark(&mut self, name: &str, range: &TextSpan) -> Result<String, HostError> {
        self.check_span(range)?;
        Ok(self.add_bookmark(name, range.range()))
    }

    fn remove_bookmark(&mut self, name: &str) -> Result<(), HostError> {
        let before = self.bookmarks.len();
        self.bookmarks.retain(|b| b.name != name);
        if self.bookmarks.len() == before {
            return Err(HostError::BookmarkNotFound(name.to_string()));
        }
        Ok(())
    }

    fn rename_bookmark(&mut self, name: &str, new_name: &str) -> Result<String, HostError> {
        let unique = self.unique_name(new_name, Some(name));
        let bookmark = self
            .bookmarks
            .iter_mut()
            .find(|b| b.name == name)
            .ok_or_else(|| HostError::BookmarkNotFound(name.to_string()))?;
        bookmark.name = unique.clone();
        Ok(unique)
    }

    fn bookmarks_within(&self, range: &TextSpan) -> Vec<String> {
        self.bookmarks
            .iter()
            .filter(|b| range.start <= b.span.start && b.span.end <= range.end)
            .map(|b| b.name.clone())
            .collect()
    }

    fn set_bookmark_text(&mut self, name: &str, text: &str) -> Result<(), HostError> {
        let span = self
            .bookmark(name)
            .map(|b| b.span.clone())
            .ok_or_else(|| HostError::BookmarkNotFound(name.to_string()))?;
        self.edit(span, text, Some(Owner::Bookmark(name)));
        Ok(())
    }

    fn text_of(&self, range: &TextSpan) -> String {
        self.slice(range.range())
    }

    fn insert_content(&mut self, at: &TextSpan, content: &MemoryDocument) -> Result<(), HostError> {
        self.check_span(at)?;
        let offset = at.start;
        self.edit(offset..offset, &content.text(), None);

        let shifted = |span: &Range<usize>| span.start + offset..span.end + offset;
        for bookmark in &content.bookmarks {
            self.add_bookmark(&bookmark.name, shifted(&bookmark.span));
        }
        for field in &content.fields {
            self.add_field(field.kind.clone(), shifted(&field.span));
        }
        for annotation in &content.annotations {
            self.add_annotation(shifted(&annotation.span), &annotation.text);
        }
        Ok(())
    }

    fn import_styles(
        &mut self,
        content: &MemoryDocument,
        families: &StyleFamilies,
    ) -> Result<(), HostError> {
        for family in families {
            if let Some(names) = content.styles.get(family) {
                self.styles
                    .entry(*family)
                    .or_default()
                    .extend(names.iter().cloned());
            }
        }
        self.modified = true;
        Ok(())
    }

    fn collapse_to_start(&self, range: &TextSpan) -> TextSpan {
        TextSpan::in_container(range.container, range.start, range.start)
    }

    fn collapse_to_end(&self, range: &TextSpan) -> TextSpan {
        TextSpan::in_container(range.container, range.end, range.end)
    }

    fn shift(&self, range: &TextSpan, start_by: isize, end_by: isize) -> Option<TextSpan> {
        let text = self.text();
        let start = self.step(&text, range.start, start_by)?;
        let end = self.step(&text, range.end, end_by)?;
        (start <= end).then(|| TextSpan::in_container(range.container, start, end))
    }

    fn is_start_of_paragraph(&self, at: &TextSpan) -> bool {
        at.start == 0 || self.slice(at.start - 1..at.start) == "\n"
    }

    fn is_end_of_paragraph(&self, at: &TextSpan) -> bool {
        at.end >= self.len() || self.slice(at.end..at.end + 1) == "\n"
    }

    fn is_end_of_document(&self, at: &TextSpan) -> bool {
        at.end >= self.len()
    }

    fn delete_paragraph(&mut self, at: &TextSpan) -> Result<(), HostError> {
        self.check_span(at)?;
        let paragraph = self.paragraph_bounds(at.start);
        let len = self.len();
        let span = if paragraph.end < len {
            paragraph.start..paragraph.end + 1
        } else if paragraph.start > 0 {
            paragraph.start - 1..paragraph.end
        } else {
            paragraph
        };
        self.edit(span, "", None);
        Ok(())
    }

    fn placeholders_within(&self, range: &TextSpan) -> Vec<FieldId> {
        let mut placeholders: Vec<&Field> = self
            .fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Placeholder { .. }))
            .filter(|f| range.start <= f.span.start && f.span.end <= range.end)
            .collect();
        placeholders.sort_by_key(|f| f.span.start);
        placeholders.into_iter().map(|f| f.id).collect()
    }

    fn placeholder_range(&self, field: &FieldId) -> Option<TextSpan> {
        self.field(*field)
            .map(|f| TextSpan::new(f.span.start, f.span.end))
    }

    fn replace_placeholder(&mut self, field: &FieldId, text: &str) -> Result<(), HostError> {
        let span = self
            .field(*field)
            .map(|f| f.span.clone())
            .ok_or_else(|| HostError::FieldNotFound(format!("{field:?}")))?;
        self.edit(span, text, None);
        self.fields.retain(|f| f.id != *field);
        Ok(())
    }

    fn elements_within(&self, range: &TextSpan) -> Vec<MemoryElement> {
        self.paragraphs()
            .into_iter()
            .enumerate()
            .filter(|(_, p)| p.start <= range.end && range.start <= p.end)
            .map(|(i, _)| MemoryElement::Paragraph(i))
            .collect()
    }

    fn child_elements(&self, element: &MemoryElement) -> Vec<MemoryElement> {
        let MemoryElement::Paragraph(index) = element else {
            return Vec::new();
        };
        let Some(paragraph) = self.paragraphs().into_iter().nth(*index) else {
            return Vec::new();
        };
        let mut fields: Vec<&Field> = self
            .fields
            .iter()
            .filter(|f| paragraph.start <= f.span.start && f.span.end <= paragraph.end)
            .collect();
        fields.sort_by_key(|f| f.span.start);
        fields
            .into_iter()
            .map(|f| MemoryElement::Field(f.id))
            .collect()
    }

    fn refresh_element(&mut self, element: &MemoryElement) -> Option<Result<(), HostError>> {
        let MemoryElement::Field(id) = element else {
            return None;
        };
        let field = self.field(*id)?;
        let FieldKind::Computed { variable } = &field.kind else {
            return None;
        };
        let Some(value) = self.variables.get(variable).cloned() else {
            return Some(Err(HostError::RefreshFailed {
                field: format!("{id:?}"),
                reason: format!("variable '{variable}' is not set"),
            }));
        };
        let span = field.span.clone();
        self.edit(span, &value, Some(Owner::Field(*id)));
        Some(Ok(()))
    }

    fn set_view_cursor(&mut self, range: &TextSpan) {
        self.view_cursor = Some(range.range());
    }

    fn insert_annotation(&mut self, at: &TextSpan, text: &str) -> Result<(), HostError> {
        self.check_span(at)?;
        self.add_annotation(at.range(), text);
        Ok(())
    }

    fn persistent_data(&self, key: &str) -> Option<String> {
        self.metadata.get(key).cloned()
    }

    fn set_persistent_data(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }
}

/// Fragments held in memory, keyed by location.
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    entries: BTreeMap<String, MemoryDocument>,
}

impl ContentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, content: MemoryDocument) {
        self.entries.insert(location.into(), content);
    }

    pub fn with(mut self, location: impl Into<String>, content: MemoryDocument) -> Self {
        self.insert(location, content);
        self
    }
}

impl ContentLoader<MemoryDocument> for ContentLibrary {
    fn load(&self, location: &str) -> Result<MemoryDocument, LoadError> {
        self.entries
            .get(location)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(location.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    // ============ Re-anchoring ============

    #[rstest]
    #[case::before_edit(0..2, 4..6, 3, Some(0..2))]
    #[case::touching_edit_start(0..4, 4..6, 3, Some(0..4))]
    #[case::after_edit(8..9, 4..6, 3, Some(9..10))]
    #[case::touching_edit_end(6..9, 4..6, 0, Some(4..7))]
    #[case::covered(4..6, 4..6, 0, None)]
    #[case::containing(2..8, 4..6, 5, Some(2..11))]
    #[case::insert_inside(2..8, 5..5, 2, Some(2..10))]
    #[case::insert_at_start(2..8, 2..2, 2, Some(4..10))]
    #[case::tail_overlap(2..5, 4..8, 1, Some(2..4))]
    #[case::head_overlap(5..10, 4..8, 1, Some(5..7))]
    #[case::collapsed_at_insert(3..3, 3..3, 4, Some(3..3))]
    #[case::collapsed_inside(5..5, 4..8, 0, None)]
    #[case::collapsed_at_end(8..8, 4..8, 1, Some(5..5))]
    fn test_reanchor(
        #[case] span: Range<usize>,
        #[case] edited: Range<usize>,
        #[case] inserted: usize,
        #[case] expected: Option<Range<usize>>,
    ) {
        assert_eq!(reanchor(&span, &edited, inserted), expected);
    }

    // ============ Bookmarks ============

    #[test]
    fn test_set_bookmark_text_decollapses_and_collapses() {
        let mut doc = MemoryDocument::new("ab");
        let name = doc.add_bookmark("mark", 1..1);

        doc.set_bookmark_text(&name, "XYZ").unwrap();
        assert_eq!(doc.text(), "aXYZb");
        assert_eq!(doc.bookmark_text(&name).as_deref(), Some("XYZ"));

        doc.set_bookmark_text(&name, "").unwrap();
        assert_eq!(doc.text(), "ab");
        assert_eq!(doc.bookmark(&name).unwrap().span, 1..1);
    }

    #[test]
    fn test_bookmark_names_are_made_unique() {
        let mut doc = MemoryDocument::new("abc");
        let first = doc.add_bookmark("same", 0..1);
        let second = doc.add_bookmark("same", 1..2);
        let third = doc.add_bookmark("same", 2..3);

        assert_eq!((first.as_str(), second.as_str(), third.as_str()), ("same", "same1", "same2"));
    }

    #[test]
    fn test_rename_keeps_span() {
        let mut doc = MemoryDocument::new("abc");
        doc.add_bookmark("old", 1..2);

        let renamed = doc.rename_bookmark("old", "new").unwrap();

        assert_eq!(renamed, "new");
        assert_eq!(doc.bookmark("new").unwrap().span, 1..2);
        assert!(doc.rename_bookmark("old", "x").is_err());
    }

    #[test]
    fn test_bookmark_names_in_document_order_parents_first() {
        let mut doc = MemoryDocument::new("0123456789");
        doc.add_bookmark("late", 6..8);
        doc.add_bookmark("child", 2..4);
        doc.add_bookmark("parent", 2..9);

        assert_eq!(doc.bookmark_names(), vec!["parent", "child", "late"]);
    }

    #[test]
    fn test_insert_content_brings_bookmarks_and_fields() {
        let mut fragment = MemoryDocument::new("Dear ");
        fragment.push_placeholder("<Name>");
        fragment.push_bookmarked("inner", "!");
        let mut doc = MemoryDocument::new("[]");

        doc.insert_content(&TextSpan::collapsed(1), &fragment).unwrap();

        assert_eq!(doc.text(), "[Dear <Name>!]");
        assert_eq!(doc.bookmark("inner").unwrap().span, 12..13);
        assert_eq!(doc.fields()[0].span, 6..12);
    }

    // ============ Paragraphs ============

    #[rstest]
    #[case::middle_paragraph("a\nbb\nc", 3, "a\nc")]
    #[case::first_paragraph("a\nbb\nc", 0, "bb\nc")]
    #[case::last_paragraph("a\nbb\nc", 5, "a\nbb")]
    #[case::only_paragraph("abc", 1, "")]
    fn test_delete_paragraph(#[case] text: &str, #[case] at: usize, #[case] expected: &str) {
        let mut doc = MemoryDocument::new(text);
        doc.delete_paragraph(&TextSpan::collapsed(at)).unwrap();
        assert_eq!(doc.text(), expected);
    }

    #[test]
    fn test_paragraph_boundaries() {
        let doc = MemoryDocument::new("ab\ncd");

        assert!(doc.is_start_of_paragraph(&TextSpan::collapsed(0)));
        assert!(doc.is_start_of_paragraph(&TextSpan::collapsed(3)));
        assert!(!doc.is_start_of_paragraph(&TextSpan::collapsed(1)));
        assert!(doc.is_end_of_paragraph(&TextSpan::collapsed(2)));
        assert!(doc.is_end_of_paragraph(&TextSpan::collapsed(5)));
        assert!(!doc.is_end_of_paragraph(&TextSpan::collapsed(4)));
        assert!(doc.is_end_of_document(&TextSpan::collapsed(5)));
        assert!(!doc.is_end_of_document(&TextSpan::collapsed(2)));
    }

    #[test]
    fn test_shift_moves_by_characters() {
        let doc = MemoryDocument::new("äbc");

        assert_eq!(
            doc.shift(&TextSpan::collapsed(0), 1, 2),
            Some(TextSpan::new(2, 3))
        );
        assert_eq!(doc.shift(&TextSpan::collapsed(0), -1, 0), None);
        assert_eq!(doc.shift(&TextSpan::collapsed(4), 0, 1), None);
    }

    // ============ Fields ============

    #[test]
    fn test_refresh_computed_field() {
        let mut doc = MemoryDocument::new("Total: ");
        let id = doc.push_computed("total", "?");
        doc.push_text(" EUR");
        doc.set_variable("total", "42");

        let result = doc.refresh_element(&MemoryElement::Field(id));

        assert!(matches!(result, Some(Ok(()))));
        assert_eq!(doc.text(), "Total: 42 EUR");
        assert_eq!(doc.field(id).unwrap().span, 7..9);
    }

    #[test]
    fn test_refresh_without_variable_fails() {
        let mut doc = MemoryDocument::new("");
        let id = doc.push_computed("missing", "?");

        assert!(matches!(
            doc.refresh_element(&MemoryElement::Field(id)),
            Some(Err(HostError::RefreshFailed { .. }))
        ));
        assert!(doc.refresh_element(&MemoryElement::Paragraph(0)).is_none());
    }

    #[test]
    fn test_replace_placeholder_removes_field() {
        let mut doc = MemoryDocument::new("Hi ");
        let id = doc.push_placeholder("<Name>");

        doc.replace_placeholder(&id, "Ada").unwrap();

        assert_eq!(doc.text(), "Hi Ada");
        assert!(doc.field(id).is_none());
    }

    #[test]
    fn test_elements_are_paragraphs_with_field_children() {
        let mut doc = MemoryDocument::new("one\ntwo ");
        let id = doc.push_computed("x", "?");
        doc.push_text("\nthree");

        let elements = doc.elements_within(&TextSpan::new(4, 9));

        assert_eq!(elements, vec![MemoryElement::Paragraph(1)]);
        assert_eq!(
            doc.child_elements(&elements[0]),
            vec![MemoryElement::Field(id)]
        );
    }

    // ============ Flags ============

    #[test]
    fn test_edits_set_modified_flag() {
        let mut doc = MemoryDocument::new("x");
        assert!(!doc.is_modified());

        doc.push_text("y");

        assert!(doc.is_modified());
    }

    #[test]
    fn test_content_library_reports_unknown_location() {
        let library = ContentLibrary::new().with("a", MemoryDocument::new("A"));

        assert_eq!(library.load("a").unwrap().text(), "A");
        assert!(matches!(library.load("b"), Err(LoadError::NotFound(_))));
    }
}
