use crate::commands::DocumentCommand;
use crate::host::{HostError, TextDocument};

/// Text that replaces a failed command.
pub const ERROR_TEXT: &str = "<ERROR:  >";

/// Replaces the command's text by [`ERROR_TEXT`] and attaches `message` as an annotation.
pub(crate) fn insert_error_field<D: TextDocument>(
    doc: &mut D,
    cmd: &DocumentCommand,
    message: &str,
) {
    let annotation = format!("Error in document command '{}':\n\n{message}", cmd.bookmark());
    log::error!("{annotation}");

    let result = cmd.set_text(doc, ERROR_TEXT).and_then(|()| {
        let range = cmd
            .range(doc)
            .ok_or_else(|| HostError::BookmarkNotFound(cmd.bookmark().to_string()))?;
        doc.insert_annotation(&range, &annotation)
    });
    if let Err(e) = result {
        log::error!("Failed to insert error marker for '{}': {e}", cmd.bookmark());
    }
}
