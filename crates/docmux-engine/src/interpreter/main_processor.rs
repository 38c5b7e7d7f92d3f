//! Fills `insertValue` commands from the data row and handles `form` and invalid commands.

use crate::commands::{CommandKind, DocumentCommand, InsertValue, syntax};
use crate::host::{ControllerLock, TextDocument};
use crate::interpreter::error_field::insert_error_field;
use crate::model::{DocumentModel, DocumentSettings};
use crate::services::{DataRowError, Services};

/// Inserted instead of a value when no data row is selected.
pub const NO_ROW_SELECTED_TEXT: &str = "<ERROR: no sender selected!>";

/// Runs over all pending commands and returns the number of errors.
pub(crate) fn run<D: TextDocument>(
    model: &mut DocumentModel<D>,
    services: &Services<'_, D::Content>,
) -> usize {
    let debug = services.policy.debug_mode;
    let mut doc = ControllerLock::new(&mut model.doc);
    let mut errors = 0;

    for cmd in model.commands.iter_mut().filter(|cmd| cmd.is_pending()) {
        errors += match cmd.kind().clone() {
            CommandKind::Form => form(&mut *doc, cmd, &mut model.settings, debug),
            CommandKind::Invalid { reason } => {
                insert_error_field(&mut *doc, cmd, &reason);
                cmd.set_error(true);
                1
            }
            CommandKind::InsertValue(value) => insert_value(&mut *doc, cmd, &value, services),
            CommandKind::InsertFrag(_)
            | CommandKind::InsertContent
            | CommandKind::InsertFormValue { .. }
            | CommandKind::OverrideFrag { .. }
            | CommandKind::UpdateFields
            | CommandKind::SetType(_)
            | CommandKind::SetPrintFunction { .. }
            | CommandKind::SetJumpMark
            | CommandKind::SetGroups { .. }
            | CommandKind::PrintBlock { .. } => 0,
        };
    }
    errors
}

/// Merges a legacy form description into the document's, unless the document already had one,
/// and removes the description text.
fn form<D: TextDocument>(
    doc: &mut D,
    cmd: &mut DocumentCommand,
    settings: &mut DocumentSettings,
    debug: bool,
) -> usize {
    cmd.set_error(false);
    let text = cmd.range(doc).map(|range| doc.text_of(&range)).unwrap_or_default();
    let nodes = match syntax::parse(&text) {
        Ok(nodes) => nodes,
        Err(e) => {
            insert_error_field(doc, cmd, &format!("form description is broken: {e}"));
            cmd.set_error(true);
            return 1;
        }
    };

    let description = &mut settings.form_description;
    if !description.was_persisted() {
        description.merge(nodes);
        description.persist(doc);
    }
    if let Err(e) = cmd.set_text(doc, "") {
        insert_error_field(doc, cmd, &format!("form description could not be removed: {e}"));
        cmd.set_error(true);
        return 1;
    }
    cmd.mark_done(doc, !debug);
    0
}

fn insert_value<D: TextDocument>(
    doc: &mut D,
    cmd: &mut DocumentCommand,
    value: &InsertValue,
    services: &Services<'_, D::Content>,
) -> usize {
    cmd.set_error(false);

    let fetched = match services.data.value(&value.column) {
        Ok(raw) => match &value.transform {
            Some(name) => services
                .transformer
                .transform(name, &raw)
                .map_err(|e| e.to_string()),
            None => Ok(raw),
        },
        Err(DataRowError::NoRowSelected) => Ok(NO_ROW_SELECTED_TEXT.to_string()),
        Err(e @ DataRowError::ColumnNotFound(_)) => Err(e.to_string()),
    };
    let text = match fetched {
        Ok(text) => text,
        Err(message) => {
            insert_error_field(doc, cmd, &message);
            cmd.set_error(true);
            return 1;
        }
    };

    let result = if text.is_empty() {
        cmd.set_text(doc, "")
    } else {
        cmd.set_text(
            doc,
            &format!("{}{text}{}", value.left_separator, value.right_separator),
        )
    };
    if let Err(e) = result {
        log::error!("Failed to insert value into '{}': {e}", cmd.bookmark());
    }
    cmd.mark_done(doc, false);
    0
}
