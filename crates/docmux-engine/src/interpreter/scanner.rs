//! Single-pass scans that collect document-level information.

use crate::commands::{CommandKind, DocumentType};
use crate::host::TextDocument;
use crate::model::{DocumentModel, FormField};
use crate::relation::classify;

/// Applies `setType` and `setPrintFunction` to the settings and consumes the commands.
pub(crate) fn scan_global<D: TextDocument>(model: &mut DocumentModel<D>) {
    let has_location = model.doc.has_location();
    for cmd in model.commands.iter_mut().filter(|cmd| cmd.is_pending()) {
        match cmd.kind().clone() {
            CommandKind::SetType(doc_type) => {
                model.settings.set_type(doc_type);
                // a template opened for editing keeps its type
                if !(has_location && doc_type == DocumentType::TemplateTemplate) {
                    cmd.mark_done(&mut model.doc, true);
                }
            }
            CommandKind::SetPrintFunction { function } => {
                model.settings.add_print_function(&mut model.doc, &function);
                cmd.mark_done(&mut model.doc, true);
            }
            CommandKind::InsertFrag(_)
            | CommandKind::InsertContent
            | CommandKind::InsertValue(_)
            | CommandKind::InsertFormValue { .. }
            | CommandKind::OverrideFrag { .. }
            | CommandKind::UpdateFields
            | CommandKind::Form
            | CommandKind::SetJumpMark
            | CommandKind::SetGroups { .. }
            | CommandKind::PrintBlock { .. }
            | CommandKind::Invalid { .. } => {}
        }
    }
}

/// Rebuilds the id to form field index from the pending `insertFormValue` commands.
pub(crate) fn scan_insert_form_values<D: TextDocument>(model: &mut DocumentModel<D>) {
    model.form_fields.clear();
    for cmd in model.commands.iter().filter(|cmd| cmd.is_pending()) {
        let CommandKind::InsertFormValue { id, transform } = cmd.kind() else {
            continue;
        };
        let field = FormField {
            id: id.clone(),
            bookmark: cmd.bookmark().to_string(),
            transform: transform.clone(),
        };
        let fields = model.form_fields.entry(id.clone()).or_default();
        let range = field.range(&model.doc);
        let position = fields
            .iter()
            .position(|other| {
                classify(range.as_ref(), other.range(&model.doc).as_ref()).is_a_less_than_b()
            })
            .unwrap_or(fields.len());
        fields.insert(position, field);
    }
}
