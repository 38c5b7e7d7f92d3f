//! Per-document state shared by the processing phases.

use std::collections::{BTreeMap, BTreeSet};

use crate::commands::{ConfigNode, DocumentCommands, DocumentType, syntax};
use crate::host::TextDocument;
use crate::overrides::FragmentOverrides;

/// Metadata key of the form description.
pub const FORM_DESCRIPTION_KEY: &str = "FormDescription";
/// Metadata key of the registered print functions, comma separated.
pub const PRINT_FUNCTIONS_KEY: &str = "PrintFunctions";
/// Metadata key of a persisted document type.
pub const DOCUMENT_TYPE_KEY: &str = "SetType";

/// The form description stored in a document's metadata, as config nodes.
#[derive(Debug, Clone, Default)]
pub struct FormDescription {
    nodes: Vec<ConfigNode>,
    persisted: bool,
}

impl FormDescription {
    /// Reads the description from the document. A broken description is logged and ignored.
    pub fn from_document<D: TextDocument>(doc: &D) -> Self {
        let Some(text) = doc.persistent_data(FORM_DESCRIPTION_KEY) else {
            return Self::default();
        };
        let nodes = syntax::parse(&text).unwrap_or_else(|e| {
            log::error!("Form description is broken: {e}");
            Vec::new()
        });
        Self {
            nodes,
            persisted: true,
        }
    }

    /// True when the document carried a description when it was opened.
    pub fn was_persisted(&self) -> bool {
        self.persisted
    }

    pub fn merge(&mut self, nodes: Vec<ConfigNode>) {
        self.nodes.extend(nodes);
    }

    /// Whether any `Window` section has content.
    pub fn has_window(&self) -> bool {
        self.nodes.iter().any(|node| {
            (node.name == "Window" && !node.is_leaf())
                || node
                    .descendants_named("Window")
                    .iter()
                    .any(|window| !window.is_leaf())
        })
    }

    pub fn persist<D: TextDocument>(&self, doc: &mut D) {
        let text = self
            .nodes
            .iter()
            .map(ConfigNode::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        doc.set_persistent_data(FORM_DESCRIPTION_KEY, &text);
    }
}

/// Document-level settings collected by the global scan.
#[derive(Debug, Clone, Default)]
pub struct DocumentSettings {
    /// The first type seen wins. A type persisted in the document comes first.
    pub doc_type: Option<DocumentType>,
    pub print_functions: BTreeSet<String>,
    pub form_description: FormDescription,
    form_document: bool,
}

impl DocumentSettings {
    pub fn from_document<D: TextDocument>(doc: &D) -> Self {
        let doc_type = doc
            .persistent_data(DOCUMENT_TYPE_KEY)
            .and_then(|name| DocumentType::parse(&name));
        let print_functions = doc
            .persistent_data(PRINT_FUNCTIONS_KEY)
            .map(|names| {
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            doc_type,
            print_functions,
            form_description: FormDescription::from_document(doc),
            form_document: false,
        }
    }

    pub fn set_type(&mut self, doc_type: DocumentType) {
        self.doc_type.get_or_insert(doc_type);
    }

    /// Templates get their commands executed. Without an explicit type, a document is a
    /// template unless it was opened from a location.
    pub fn is_template(&self, has_location: bool) -> bool {
        match self.doc_type {
            Some(DocumentType::NormalTemplate) => true,
            Some(DocumentType::TemplateTemplate | DocumentType::FormDocument) => false,
            None => !has_location,
        }
    }

    pub fn is_form_document(&self) -> bool {
        self.form_document || self.doc_type == Some(DocumentType::FormDocument)
    }

    pub fn mark_form_document(&mut self) {
        self.form_document = true;
    }

    pub fn add_print_function<D: TextDocument>(&mut self, doc: &mut D, function: &str) {
        if self.print_functions.insert(function.to_string()) {
            let names = self
                .print_functions
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(",");
            doc.set_persistent_data(PRINT_FUNCTIONS_KEY, &names);
        }
    }
}

/// An `insertFormValue` command found by the form-value scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub id: String,
    pub bookmark: String,
    pub transform: Option<String>,
}

impl FormField {
    pub fn range<D: TextDocument>(&self, doc: &D) -> Option<D::Range> {
        doc.bookmark_range(&self.bookmark)
    }
}

/// A document together with everything the phases learn about it.
pub struct DocumentModel<D: TextDocument> {
    pub doc: D,
    pub commands: DocumentCommands,
    pub settings: DocumentSettings,
    pub overrides: FragmentOverrides,
    /// Sources for `insertContent`, consumed in document order.
    pub content_locations: Vec<String>,
    /// Runs template execution even when the document is no template.
    pub must_process: bool,
    /// Form fields by id, each list in document order.
    pub form_fields: BTreeMap<String, Vec<FormField>>,
}

impl<D: TextDocument> DocumentModel<D> {
    pub fn new(doc: D) -> Self {
        let commands = DocumentCommands::from_document(&doc);
        let settings = DocumentSettings::from_document(&doc);
        Self {
            doc,
            commands,
            settings,
            overrides: FragmentOverrides::new(),
            content_locations: Vec::new(),
            must_process: false,
            form_fields: BTreeMap::new(),
        }
    }

    pub fn with_content_locations(mut self, locations: Vec<String>) -> Self {
        self.content_locations = locations;
        self
    }

    pub fn is_template(&self) -> bool {
        self.settings.is_template(self.doc.has_location())
    }

    pub fn into_document(self) -> D {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::untyped_new_document(None, false, true)]
    #[case::untyped_saved_document(None, true, false)]
    #[case::normal_template(Some(DocumentType::NormalTemplate), true, true)]
    #[case::template_template(Some(DocumentType::TemplateTemplate), false, false)]
    #[case::form_document(Some(DocumentType::FormDocument), false, false)]
    fn test_is_template(
        #[case] doc_type: Option<DocumentType>,
        #[case] has_location: bool,
        #[case] expected: bool,
    ) {
        let settings = DocumentSettings {
            doc_type,
            ..DocumentSettings::default()
        };
        assert_eq!(settings.is_template(has_location), expected);
    }

    #[test]
    fn test_first_type_wins() {
        let mut settings = DocumentSettings::default();

        settings.set_type(DocumentType::FormDocument);
        settings.set_type(DocumentType::NormalTemplate);

        assert_eq!(settings.doc_type, Some(DocumentType::FormDocument));
        assert!(settings.is_form_document());
    }

    #[test]
    fn test_settings_read_persisted_metadata() {
        let mut doc = MemoryDocument::new("");
        doc.set_persistent_data(DOCUMENT_TYPE_KEY, "normalTemplate");
        doc.set_persistent_data(PRINT_FUNCTIONS_KEY, "Letter, Fax");
        doc.set_persistent_data(FORM_DESCRIPTION_KEY, "Form(Window(Title 'x'))");

        let settings = DocumentSettings::from_document(&doc);

        assert_eq!(settings.doc_type, Some(DocumentType::NormalTemplate));
        assert_eq!(
            settings.print_functions.iter().collect::<Vec<_>>(),
            vec!["Fax", "Letter"]
        );
        assert!(settings.form_description.was_persisted());
        assert!(settings.form_description.has_window());
    }

    #[test]
    fn test_print_functions_are_persisted() {
        let mut doc = MemoryDocument::new("");
        let mut settings = DocumentSettings::default();

        settings.add_print_function(&mut doc, "Letter");
        settings.add_print_function(&mut doc, "Fax");

        assert_eq!(
            doc.persistent_data(PRINT_FUNCTIONS_KEY).as_deref(),
            Some("Fax,Letter")
        );
    }

    #[test]
    fn test_form_description_merge_and_persist() {
        let mut doc = MemoryDocument::new("");
        let mut description = FormDescription::from_document(&doc);
        assert!(!description.was_persisted());
        assert!(!description.has_window());

        description.merge(syntax::parse("Form(Title 'Letter' Window(Tab(Label 'x')))").unwrap());
        description.persist(&mut doc);

        insta::assert_snapshot!(
            doc.persistent_data(FORM_DESCRIPTION_KEY).unwrap(),
            @"Form(Title 'Letter' Window(Tab(Label 'x')))"
        );
        assert!(description.has_window());
    }

    #[test]
    fn test_empty_window_is_no_form() {
        let mut description = FormDescription::default();
        description.merge(syntax::parse("Form(Window())").unwrap());

        assert!(!description.has_window());
    }
}
