//! Fragment expansion: `overrideFrag`, `insertFrag` and `insertContent`.

use crate::commands::{CommandKind, DocumentCommand, InsertFrag};
use crate::host::TextDocument;
use crate::interpreter::error_field::insert_error_field;
use crate::model::DocumentModel;
use crate::overrides::FragmentOverrides;
use crate::services::Services;

/// Title of messages the user has to acknowledge.
pub const COMMAND_ERROR_TITLE: &str = "Document command error";

/// Expander state for one template execution. It survives the fixpoint iterations.
pub(crate) struct FragmentExpander<'x, 's, C> {
    services: &'x Services<'s, C>,
    /// Index of the next unused content location.
    next_content: usize,
    /// Set once the view cursor has been moved to an unfilled placeholder. A later fragment
    /// whose placeholders are all filled still moves it to the jump mark.
    cursor_relocated: bool,
    errors: usize,
}

impl<'x, 's, C> FragmentExpander<'x, 's, C> {
    pub(crate) fn new(services: &'x Services<'s, C>) -> Self {
        Self {
            services,
            next_content: 0,
            cursor_relocated: false,
            errors: 0,
        }
    }

    pub(crate) fn errors(&self) -> usize {
        self.errors
    }

    /// Records every pending `overrideFrag`.
    pub(crate) fn execute_overrides<D>(&mut self, model: &mut DocumentModel<D>)
    where
        D: TextDocument<Content = C>,
    {
        let debug = self.services.policy.debug_mode;
        for cmd in model.commands.iter_mut().filter(|cmd| cmd.is_pending()) {
            let CommandKind::OverrideFrag {
                frag_id,
                new_frag_id,
            } = cmd.kind().clone()
            else {
                continue;
            };
            match model.overrides.set(&frag_id, &new_frag_id) {
                Ok(()) => {
                    log::debug!("Fragment '{frag_id}' is overridden by '{new_frag_id}'");
                    cmd.mark_done(&mut model.doc, !debug);
                }
                Err(e) => {
                    insert_error_field(&mut model.doc, cmd, &e.to_string());
                    cmd.set_error(true);
                    self.errors += 1;
                }
            }
        }
    }

    /// Executes every pending `insertFrag` and `insertContent`.
    pub(crate) fn execute_inserts<D>(&mut self, model: &mut DocumentModel<D>)
    where
        D: TextDocument<Content = C>,
    {
        let jump_mark = model.commands.first_jump_mark().map(str::to_string);
        for cmd in model.commands.iter_mut().filter(|cmd| cmd.is_pending()) {
            match cmd.kind().clone() {
                CommandKind::InsertFrag(frag) => {
                    self.insert_frag(&mut model.doc, cmd, &frag, &model.overrides, jump_mark.as_deref());
                }
                CommandKind::InsertContent => {
                    self.insert_content(&mut model.doc, cmd, &model.content_locations);
                }
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
                | CommandKind::Invalid { .. } => {}
            }
        }
    }

    fn insert_frag<D>(
        &mut self,
        doc: &mut D,
        cmd: &mut DocumentCommand,
        frag: &InsertFrag,
        overrides: &FragmentOverrides,
        jump_mark: Option<&str>,
    ) where
        D: TextDocument<Content = C>,
    {
        cmd.set_error(false);

        let frag_id = overrides.get(&frag.frag_id);
        if frag_id.is_empty() {
            log::debug!("Fragment '{}' is suppressed by an override", frag.frag_id);
            if let Err(e) = cmd.set_text(doc, "") {
                log::error!("Failed to clear '{}': {e}", cmd.bookmark());
            }
            cmd.mark_done(doc, false);
            return;
        }

        let inserted = self.load_fragment(&frag.frag_id, frag_id).and_then(|content| {
            let result = if frag.imports_styles_only() {
                doc.import_styles(&content, &frag.styles)
                    .and_then(|()| cmd.set_text(doc, ""))
            } else {
                cmd.insert_between_marks(doc, &content)
            };
            result.map_err(|e| e.to_string())
        });

        match inserted {
            Ok(()) => {
                if !frag.imports_styles_only() {
                    self.fill_placeholders(doc, cmd, &frag.args, jump_mark);
                }
                cmd.mark_done(doc, false);
            }
            Err(message) => {
                if frag.manual_mode {
                    let mut text = format!("The fragment '{}'", frag.frag_id);
                    if frag_id != frag.frag_id {
                        text.push_str(&format!(" (overridden by '{frag_id}')"));
                    }
                    text.push_str(&format!(" could not be inserted:\n\n{message}"));
                    log::error!("{text}");
                    self.services
                        .messages
                        .show_blocking_message(COMMAND_ERROR_TITLE, &text);
                } else {
                    insert_error_field(doc, cmd, &message);
                }
                cmd.set_error(true);
                self.errors += 1;
            }
        }
    }

    /// Tries every location of `frag_id` in turn. The first successful load wins.
    /// Errors about a missing definition name `requested`, the id the command was written with.
    fn load_fragment(&self, requested: &str, frag_id: &str) -> Result<C, String> {
        let locations = self.services.resolver.locations(frag_id);
        if locations.is_empty() {
            return Err(format!("fragment with FRAG_ID '{requested}' is not defined"));
        }

        let mut failures = Vec::new();
        for location in &locations {
            match self.services.loader.load(location) {
                Ok(content) => {
                    log::debug!("Loaded fragment '{frag_id}' from {location}");
                    return Ok(content);
                }
                Err(e) => failures.push(e.to_string()),
            }
        }
        Err(format!(
            "fragment '{frag_id}' could not be loaded from any of its locations:\n{}",
            failures.join("\n")
        ))
    }

    fn insert_content<D>(&mut self, doc: &mut D, cmd: &mut DocumentCommand, locations: &[String])
    where
        D: TextDocument<Content = C>,
    {
        if let Some(location) = locations.get(self.next_content) {
            self.next_content += 1;
            let inserted = self
                .services
                .loader
                .load(location)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    cmd.insert_between_marks(doc, &content)
                        .map_err(|e| e.to_string())
                });
            if let Err(message) = inserted {
                insert_error_field(doc, cmd, &message);
                cmd.set_error(true);
                self.errors += 1;
            }
        } else {
            log::debug!("No content left for '{}'", cmd.bookmark());
        }
        cmd.mark_done(doc, false);
    }

    /// Fills the placeholders of an inserted fragment with its arguments and places the
    /// view cursor where the user should continue.
    fn fill_placeholders<D>(
        &mut self,
        doc: &mut D,
        cmd: &DocumentCommand,
        args: &[String],
        jump_mark: Option<&str>,
    ) where
        D: TextDocument<Content = C>,
    {
        let Some(range) = cmd.range(doc) else {
            return;
        };
        let placeholders = doc.placeholders_within(&range);

        for (placeholder, arg) in placeholders.iter().zip(args) {
            if !arg.is_empty() {
                if let Err(e) = doc.replace_placeholder(placeholder, arg) {
                    log::error!("Failed to fill placeholder in '{}': {e}", cmd.bookmark());
                }
            } else if !self.cursor_relocated {
                self.move_cursor_to(doc, placeholder);
            }
        }

        if placeholders.len() > args.len() {
            if !self.cursor_relocated {
                self.move_cursor_to(doc, &placeholders[args.len()]);
            }
        } else if let Some(target) = jump_mark.and_then(|name| doc.bookmark_range(name)) {
            doc.set_view_cursor(&target);
        }

        if placeholders.len() < args.len() {
            let message = format!(
                "Fragment '{}' got {} arguments but has only {} placeholders",
                cmd.bookmark(),
                args.len(),
                placeholders.len()
            );
            log::warn!("{message}");
            if self.services.policy.warn_on_excess_args {
                self.services
                    .messages
                    .show_blocking_message(COMMAND_ERROR_TITLE, &message);
            }
        }
    }

    fn move_cursor_to<D>(&mut self, doc: &mut D, placeholder: &D::Field)
    where
        D: TextDocument<Content = C>,
    {
        if let Some(range) = doc.placeholder_range(placeholder) {
            doc.set_view_cursor(&range);
            self.cursor_relocated = true;
        }
    }
}
