use std::collections::HashSet;

use crate::commands::{CommandKind, DocumentCommand};
use crate::host::TextDocument;
use crate::relation::classify;

/// The commands of a document in document order.
///
/// Parents come before their children. The collection is rebuilt incrementally by
/// [`DocumentCommands::refresh`] after the document changed.
#[derive(Debug, Clone, Default)]
pub struct DocumentCommands {
    commands: Vec<DocumentCommand>,
}

impl DocumentCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the collection from the document's current bookmarks.
    pub fn from_document<D: TextDocument>(doc: &D) -> Self {
        let mut commands = Self::new();
        commands.refresh(doc);
        commands
    }

    /// Drops commands whose bookmark is gone and adds commands for new bookmarks.
    ///
    /// Returns true when anything changed.
    pub fn refresh<D: TextDocument>(&mut self, doc: &D) -> bool {
        let names = doc.bookmark_names();
        let present: HashSet<&str> = names.iter().map(String::as_str).collect();

        let before = self.commands.len();
        self.commands
            .retain(|cmd| present.contains(cmd.bookmark()));
        let mut changed = self.commands.len() != before;

        let known: HashSet<String> = self
            .commands
            .iter()
            .map(|cmd| cmd.bookmark().to_string())
            .collect();
        for name in names.iter().filter(|name| !known.contains(name.as_str())) {
            if let Some(cmd) = DocumentCommand::from_bookmark(name) {
                log::debug!("Found document command '{name}'");
                self.insert_sorted(doc, cmd);
                changed = true;
            }
        }
        changed
    }

    /// Inserts before the first command the new one is less than.
    fn insert_sorted<D: TextDocument>(&mut self, doc: &D, cmd: DocumentCommand) {
        let range = cmd.range(doc);
        let position = self
            .commands
            .iter()
            .position(|other| classify(range.as_ref(), other.range(doc).as_ref()).is_a_less_than_b())
            .unwrap_or(self.commands.len());
        self.commands.insert(position, cmd);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentCommand> {
        self.commands.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DocumentCommand> {
        self.commands.iter_mut()
    }

    /// Bookmark of the first `setJumpMark` command.
    pub fn first_jump_mark(&self) -> Option<&str> {
        self.commands
            .iter()
            .find(|cmd| matches!(cmd.kind(), CommandKind::SetJumpMark))
            .map(DocumentCommand::bookmark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;
    use pretty_assertions::assert_eq;

    fn kinds(commands: &DocumentCommands) -> Vec<&'static str> {
        commands.iter().map(|cmd| cmd.kind().name()).collect()
    }

    #[test]
    fn test_commands_are_in_document_order_parents_first() {
        let mut doc = MemoryDocument::new("0123456789");
        doc.add_bookmark("DOC(CMD 'setJumpMark')", 8..9);
        doc.add_bookmark("DOC(CMD 'form')", 2..3);
        doc.add_bookmark("DOC(CMD 'updateFields')", 1..6);
        doc.add_bookmark("Unrelated", 0..10);

        let commands = DocumentCommands::from_document(&doc);

        assert_eq!(kinds(&commands), vec!["updateFields", "form", "setJumpMark"]);
    }

    #[test]
    fn test_refresh_reports_changes() {
        let mut doc = MemoryDocument::new("abc");
        doc.add_bookmark("DOC(CMD 'form')", 1..2);
        let mut commands = DocumentCommands::from_document(&doc);

        assert!(!commands.refresh(&doc));

        doc.add_bookmark("DOC(CMD 'setJumpMark')", 0..0);
        assert!(commands.refresh(&doc));
        assert_eq!(kinds(&commands), vec!["setJumpMark", "form"]);

        doc.remove_bookmark("DOC(CMD 'form')").unwrap();
        assert!(commands.refresh(&doc));
        assert_eq!(kinds(&commands), vec!["setJumpMark"]);
    }

    #[test]
    fn test_renamed_command_is_not_a_change() {
        let mut doc = MemoryDocument::new("abc");
        doc.add_bookmark("DOC(CMD 'insertContent')", 0..1);
        let mut commands = DocumentCommands::from_document(&doc);

        for cmd in commands.iter_mut() {
            cmd.mark_done(&mut doc, false);
        }

        assert!(!commands.refresh(&doc));
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_first_jump_mark() {
        let mut doc = MemoryDocument::new("abc");
        doc.add_bookmark("DOC(CMD 'setJumpMark')", 2..2);
        doc.add_bookmark("DOC(CMD 'setJumpMark')", 1..1);

        let commands = DocumentCommands::from_document(&doc);

        assert_eq!(commands.first_jump_mark(), Some("DOC(CMD 'setJumpMark')1"));
    }
}
