//! Removes insertion marks and the paragraphs they leave empty.
//!
//! Cleanup happens in two passes. [`collect`] looks at every insertion command and records
//! what has to go as [`Cleaner`]s. [`sweep`] then applies them, last first.

use std::cmp::Ordering;

use crate::commands::CommandKind;
use crate::host::{ControllerLock, HostError, TextDocument};
use crate::model::DocumentModel;
use crate::relation::TextRange;

/// Name of the temporary bookmark used to clear a range.
const KILLER_BOOKMARK: &str = "killer";

/// One pending deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleaner<R> {
    /// Delete the text of the range, keeping the bookmarks inside it.
    Range(R),
    /// Delete the paragraph at the position.
    Paragraph(R),
}

impl<R> Cleaner<R> {
    pub fn range(&self) -> &R {
        match self {
            Cleaner::Range(range) | Cleaner::Paragraph(range) => range,
        }
    }
}

/// Marks every insertion command done and returns the cleaners for its insertion marks.
pub(crate) fn collect<D: TextDocument>(
    model: &mut DocumentModel<D>,
    debug: bool,
) -> Vec<Cleaner<D::Range>> {
    let mut cleaners = Vec::new();
    for cmd in model.commands.iter_mut() {
        let trailing_paragraph_removable = match cmd.kind() {
            CommandKind::InsertFrag(frag) => !frag.manual_mode,
            CommandKind::InsertContent => true,
            CommandKind::InsertValue(_)
            | CommandKind::InsertFormValue { .. }
            | CommandKind::OverrideFrag { .. }
            | CommandKind::UpdateFields
            | CommandKind::SetType(_)
            | CommandKind::SetPrintFunction { .. }
            | CommandKind::Form
            | CommandKind::SetJumpMark
            | CommandKind::SetGroups { .. }
            | CommandKind::PrintBlock { .. }
            | CommandKind::Invalid { .. } => continue,
        };

        if cmd.has_insert_marks() {
            if let Some(range) = cmd.range(&model.doc) {
                cleaners.extend(mark_cleaners(&model.doc, &range, trailing_paragraph_removable));
            }
            cmd.unset_insert_marks();
        }
        cmd.mark_done(&mut model.doc, !debug);
    }
    cleaners
}

fn mark_cleaners<D: TextDocument>(
    doc: &D,
    range: &D::Range,
    trailing_paragraph_removable: bool,
) -> Vec<Cleaner<D::Range>> {
    let mut cleaners = Vec::new();

    let s0 = doc.collapse_to_start(range);
    if let Some(s1) = doc.shift(&s0, 1, 1) {
        if doc.is_start_of_paragraph(&s0) && doc.is_end_of_paragraph(&s1) {
            cleaners.push(Cleaner::Paragraph(s1));
        } else if let Some(mark) = doc.shift(&s0, 0, 1) {
            cleaners.push(Cleaner::Range(mark));
        }
    }

    let e1 = doc.collapse_to_end(range);
    if let Some(e0) = doc.shift(&e1, -1, -1) {
        let at_end = doc.is_end_of_document(&e1);
        if trailing_paragraph_removable
            && doc.is_start_of_paragraph(&e0)
            && doc.is_end_of_paragraph(&e1)
            && !at_end
        {
            cleaners.push(Cleaner::Paragraph(e1));
        } else if let Some(mark) = doc.shift(&e1, -1, 0) {
            cleaners.push(Cleaner::Range(mark));
        }
    }
    cleaners
}

/// Applies the cleaners from the end of the document backwards. Failures are only logged.
pub(crate) fn sweep<D: TextDocument>(doc: &mut D, mut cleaners: Vec<Cleaner<D::Range>>) {
    cleaners.sort_by(|a, b| {
        b.range()
            .compare_starts(a.range())
            .unwrap_or(Ordering::Equal)
    });

    let mut doc = ControllerLock::new(doc);
    for cleaner in &cleaners {
        let result = match cleaner {
            Cleaner::Range(range) => clear_range(&mut *doc, range),
            Cleaner::Paragraph(at) => doc.delete_paragraph(at),
        };
        if let Err(e) = result {
            log::error!("Failed to remove insertion mark at {:?}: {e}", cleaner.range());
        }
    }
}

/// Deletes the text of `range`. Bookmarks inside it that get lost are recreated, collapsed,
/// where the text was.
fn clear_range<D: TextDocument>(doc: &mut D, range: &D::Range) -> Result<(), HostError> {
    let killer = doc.insert_bookmark(KILLER_BOOKMARK, range)?;
    let collateral: Vec<String> = doc
        .bookmarks_within(range)
        .into_iter()
        .filter(|name| *name != killer)
        .collect();

    doc.set_bookmark_text(&killer, "")?;
    let cleared = doc.bookmark_range(&killer);
    doc.remove_bookmark(&killer)?;

    let Some(at) = cleared else {
        return Ok(());
    };
    for name in collateral {
        if doc.bookmark_range(&name).is_none() {
            log::debug!("Recreating bookmark '{name}'");
            if let Err(e) = doc.insert_bookmark(&name, &at) {
                log::error!("Failed to recreate bookmark '{name}': {e}");
            }
        }
    }
    Ok(())
}

/// Collects and applies the cleanup for all insertion commands.
pub(crate) fn collect_garbage<D: TextDocument>(model: &mut DocumentModel<D>, debug: bool) {
    let cleaners = collect(model, debug);
    log::debug!("Removing {} insertion marks", cleaners.len());
    sweep(&mut model.doc, cleaners);
}
