use crate::commands::CommandKind;
use crate::host::{ControllerLock, TextDocument};
use crate::model::DocumentModel;

/// Refreshes all fields inside every pending `updateFields` command.
pub(crate) fn update_fields<D: TextDocument>(model: &mut DocumentModel<D>, debug: bool) {
    let mut doc = ControllerLock::new(&mut model.doc);
    for cmd in model.commands.iter_mut().filter(|cmd| cmd.is_pending()) {
        if !matches!(cmd.kind(), CommandKind::UpdateFields) {
            continue;
        }
        if let Some(range) = cmd.range(&*doc) {
            for element in doc.elements_within(&range) {
                refresh_recursive(&mut *doc, &element);
            }
        }
        cmd.mark_done(&mut *doc, !debug);
    }
}

/// Refreshes `element` after all of its children.
fn refresh_recursive<D: TextDocument>(doc: &mut D, element: &D::Element) {
    for child in doc.child_elements(element) {
        refresh_recursive(doc, &child);
    }
    if let Some(Err(e)) = doc.refresh_element(element) {
        log::error!("Failed to update field: {e}");
    }
}
