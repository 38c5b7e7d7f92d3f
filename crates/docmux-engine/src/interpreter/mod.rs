//! The processing pipeline for a document's commands.
//!
//! [`process_document`] runs the phases in their fixed order:
//!
//! 1. the global scan reads `setType` and `setPrintFunction`,
//! 2. templates get their fragments expanded to a fixpoint, their fields updated, their
//!    values filled and their insertion marks removed, followed by a second global scan,
//! 3. form documents get their `insertFormValue` commands indexed.
//!
//! Every phase restores the document's modified flag when it ends, successful or not.

mod error_field;
mod expander;
mod field_updater;
mod garbage;
mod main_processor;
mod scanner;

use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::host::TextDocument;
use crate::model::DocumentModel;
use crate::services::Services;

pub use error_field::ERROR_TEXT;
pub use expander::COMMAND_ERROR_TITLE;
pub use garbage::Cleaner;
pub use main_processor::NO_ROW_SELECTED_TEXT;

/// Upper bound on expansion rounds. Fragments including each other hit it.
pub const MAX_EXPANSION_ROUNDS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    #[error(
        "The template contains {}.\nPlease check the template and the fragments it uses.",
        describe_errors(.errors)
    )]
    CommandsFailed { errors: usize },
}

fn describe_errors(errors: &usize) -> String {
    match *errors {
        1 => "one error".to_string(),
        n => format!("{n} errors"),
    }
}

/// How fragment expansion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixpoint {
    /// A round brought no new commands.
    Converged { iterations: usize },
    /// Rounds kept producing commands until the limit.
    CapReached { iterations: usize },
}

impl Fixpoint {
    pub fn iterations(self) -> usize {
        match self {
            Fixpoint::Converged { iterations } | Fixpoint::CapReached { iterations } => iterations,
        }
    }
}

/// What [`process_document`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    /// Present when template commands were executed.
    pub fixpoint: Option<Fixpoint>,
    pub is_form_document: bool,
}

impl ProcessReport {
    pub fn executed_template(&self) -> bool {
        self.fixpoint.is_some()
    }
}

/// Keeps the document's modified flag as it was and the document read-only for the user
/// while a phase runs.
pub struct ModifiedFlagGuard<'a, D: TextDocument> {
    model: &'a mut DocumentModel<D>,
    was_modified: bool,
}

impl<'a, D: TextDocument> ModifiedFlagGuard<'a, D> {
    pub fn new(model: &'a mut DocumentModel<D>) -> Self {
        let was_modified = model.doc.is_modified();
        model.doc.set_modifiable(false);
        Self {
            model,
            was_modified,
        }
    }
}

impl<D: TextDocument> Deref for ModifiedFlagGuard<'_, D> {
    type Target = DocumentModel<D>;

    fn deref(&self) -> &DocumentModel<D> {
        self.model
    }
}

impl<D: TextDocument> DerefMut for ModifiedFlagGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut DocumentModel<D> {
        self.model
    }
}

impl<D: TextDocument> Drop for ModifiedFlagGuard<'_, D> {
    fn drop(&mut self) {
        self.model.doc.set_modified(self.was_modified);
        self.model.doc.set_modifiable(true);
    }
}

/// Runs the processing phases over one document model.
pub struct DocumentCommandInterpreter<'a, 's, D: TextDocument> {
    model: &'a mut DocumentModel<D>,
    services: &'a Services<'s, D::Content>,
}

impl<'a, 's, D: TextDocument> DocumentCommandInterpreter<'a, 's, D> {
    pub fn new(model: &'a mut DocumentModel<D>, services: &'a Services<'s, D::Content>) -> Self {
        Self { model, services }
    }

    /// Applies the document-level settings commands.
    pub fn scan_global_document_commands(&mut self) {
        log::debug!("Scanning global document commands");
        let mut guard = ModifiedFlagGuard::new(self.model);
        scanner::scan_global(&mut guard);
    }

    /// Expands fragments, updates fields, fills values and removes the insertion marks.
    ///
    /// Every command that fails is marked in the document and counted. The count is returned
    /// as [`InterpreterError::CommandsFailed`] once the document is cleaned up.
    pub fn execute_template_commands(&mut self) -> Result<Fixpoint, InterpreterError> {
        log::debug!("Executing template commands");
        let debug = self.services.policy.debug_mode;
        let mut guard = ModifiedFlagGuard::new(self.model);
        let model: &mut DocumentModel<D> = &mut guard;

        let mut expander = expander::FragmentExpander::new(self.services);
        let mut iterations = 0;
        let fixpoint = loop {
            iterations += 1;
            expander.execute_overrides(model);
            expander.execute_inserts(model);
            let changed = model.commands.refresh(&model.doc);
            if !changed {
                break Fixpoint::Converged { iterations };
            }
            if iterations >= MAX_EXPANSION_ROUNDS {
                log::warn!(
                    "Fragment expansion stopped after {iterations} rounds, fragments may include each other"
                );
                break Fixpoint::CapReached { iterations };
            }
        };
        let mut errors = expander.errors();

        log::debug!("Updating fields");
        field_updater::update_fields(model, debug);

        log::debug!("Filling values");
        errors += main_processor::run(model, self.services);

        log::debug!("Removing insertion marks");
        garbage::collect_garbage(model, debug);
        model.commands.refresh(&model.doc);

        if model.settings.form_description.has_window() {
            model.settings.mark_form_document();
        }

        drop(guard);
        if errors > 0 {
            return Err(InterpreterError::CommandsFailed { errors });
        }
        Ok(fixpoint)
    }

    /// Indexes the `insertFormValue` commands by id.
    pub fn scan_insert_form_value_commands(&mut self) {
        log::debug!("Scanning form value commands");
        scanner::scan_insert_form_values(self.model);
    }

    /// Runs the whole pipeline.
    pub fn process(&mut self) -> Result<ProcessReport, InterpreterError> {
        self.scan_global_document_commands();

        let mut fixpoint = None;
        if self.model.is_template() || self.model.must_process {
            fixpoint = Some(self.execute_template_commands()?);
            // expanded fragments can bring their own settings
            self.scan_global_document_commands();
        }

        let is_form_document = self.model.settings.is_form_document();
        if is_form_document {
            self.scan_insert_form_value_commands();
        }

        Ok(ProcessReport {
            fixpoint,
            is_form_document,
        })
    }
}

/// Processes a freshly opened document.
pub fn process_document<D: TextDocument>(
    model: &mut DocumentModel<D>,
    services: &Services<'_, D::Content>,
) -> Result<ProcessReport, InterpreterError> {
    DocumentCommandInterpreter::new(model, services).process()
}
