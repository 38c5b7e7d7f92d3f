//! Document commands: bookmarks named `DOC(CMD '<kind>' ...)`.

pub mod kind;
pub mod syntax;
pub mod tree;

use std::sync::OnceLock;

use regex::Regex;

use crate::host::{HostError, TextDocument};

pub use kind::{CommandKind, DocumentType, InsertFrag, InsertValue, PrintBlock};
pub use syntax::{ConfigNode, SyntaxError};
pub use tree::DocumentCommands;

/// Text written over a command before content is spliced in between the two characters.
pub const INSERT_MARKS: &str = "<>";

/// Matches command bookmark names. The trailing digits are added by hosts to keep names unique.
fn command_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\A\s*(DOC\s*\(.*\))\s*(\d*)\z").expect("valid regex"))
}

/// Returns the `DOC(...)` part of a command bookmark name, or `None` for other bookmarks.
pub fn command_text(bookmark: &str) -> Option<&str> {
    command_regex()
        .captures(bookmark)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// One command found in the document.
///
/// The command knows its bookmark only by name; its range is looked up in the document on
/// demand, so it always reflects the latest edits.
#[derive(Debug, Clone)]
pub struct DocumentCommand {
    bookmark: String,
    config: ConfigNode,
    kind: CommandKind,
    done: bool,
    error: bool,
    has_insert_marks: bool,
}

impl DocumentCommand {
    /// Parses a bookmark name. Bookmarks that are not commands yield `None`; commands that
    /// fail to parse yield [`CommandKind::Invalid`].
    pub fn from_bookmark(bookmark: &str) -> Option<Self> {
        let text = command_text(bookmark)?;
        let (config, kind) = match syntax::parse_node(text) {
            Ok(config) => {
                let kind = CommandKind::from_config(&config);
                (config, kind)
            }
            Err(e) => (
                ConfigNode::leaf("DOC"),
                CommandKind::Invalid {
                    reason: e.to_string(),
                },
            ),
        };

        let state = config.child("STATE");
        let flag = |name: &str| {
            state
                .and_then(|state| state.child_value(name))
                .is_some_and(|value| value.eq_ignore_ascii_case("true"))
        };
        let done = flag("DONE");
        let error = flag("ERROR");

        Some(Self {
            bookmark: bookmark.to_string(),
            config,
            kind,
            done,
            error,
            has_insert_marks: false,
        })
    }

    pub fn bookmark(&self) -> &str {
        &self.bookmark
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Neither done nor errored.
    pub fn is_pending(&self) -> bool {
        !self.done && !self.error
    }

    pub fn set_error(&mut self, error: bool) {
        self.error = error;
    }

    pub fn has_insert_marks(&self) -> bool {
        self.has_insert_marks
    }

    pub fn unset_insert_marks(&mut self) {
        self.has_insert_marks = false;
    }

    pub fn range<D: TextDocument>(&self, doc: &D) -> Option<D::Range> {
        doc.bookmark_range(&self.bookmark)
    }

    /// Replaces the command's text. The bookmark then covers exactly `text`.
    pub fn set_text<D: TextDocument>(&self, doc: &mut D, text: &str) -> Result<(), HostError> {
        doc.set_bookmark_text(&self.bookmark, text)
    }

    /// Writes the insertion marks over the command and inserts `content` between them.
    pub fn insert_between_marks<D: TextDocument>(
        &mut self,
        doc: &mut D,
        content: &D::Content,
    ) -> Result<(), HostError> {
        self.set_text(doc, INSERT_MARKS)?;
        self.has_insert_marks = true;
        let range = self
            .range(doc)
            .ok_or_else(|| HostError::BookmarkNotFound(self.bookmark.clone()))?;
        let start = doc.collapse_to_start(&range);
        let between = doc
            .shift(&start, 1, 1)
            .ok_or_else(|| HostError::InvalidRange(format!("{range:?}")))?;
        doc.insert_content(&between, content)
    }

    /// Marks the command as done. With `remove` the bookmark is deleted, otherwise its name
    /// records the state so that a reloaded document does not run the command again.
    pub fn mark_done<D: TextDocument>(&mut self, doc: &mut D, remove: bool) {
        self.done = true;
        let result = if remove {
            doc.remove_bookmark(&self.bookmark)
        } else {
            let name = self.state_name();
            doc.rename_bookmark(&self.bookmark, &name).map(|renamed| {
                self.bookmark = renamed;
            })
        };
        if let Err(e) = result {
            log::error!("Failed to update bookmark '{}': {e}", self.bookmark);
        }
    }

    /// Bookmark name carrying the current state. Flags are only written when set or when they
    /// were present before.
    fn state_name(&mut self) -> String {
        let mut state = self
            .config
            .child("STATE")
            .cloned()
            .unwrap_or_else(|| ConfigNode::leaf("STATE"));
        for (name, value) in [("DONE", self.done), ("ERROR", self.error)] {
            if value || state.child(name).is_some() {
                state.set_child(ConfigNode::key_value(name, value.to_string()));
            }
        }
        if !state.is_leaf() {
            self.config.set_child(state);
        }
        self.config.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::plain("DOC(CMD 'setJumpMark')", Some("DOC(CMD 'setJumpMark')"))]
    #[case::unique_suffix("DOC(CMD 'setJumpMark') 12", Some("DOC(CMD 'setJumpMark')"))]
    #[case::padded("  DOC (CMD 'form')  ", Some("DOC (CMD 'form')"))]
    #[case::other_bookmark("Chapter1", None)]
    #[case::other_prefix("XDOC(CMD 'form')", None)]
    fn test_command_text(#[case] bookmark: &str, #[case] expected: Option<&str>) {
        assert_eq!(command_text(bookmark), expected);
    }

    #[test]
    fn test_from_bookmark_reads_state() {
        let cmd =
            DocumentCommand::from_bookmark("DOC(CMD 'updateFields' STATE(DONE 'true' ERROR 'TRUE'))").unwrap();

        assert!(cmd.is_done());
        assert!(cmd.has_error());
        assert!(!cmd.is_pending());
        assert_eq!(cmd.kind(), &CommandKind::UpdateFields);
    }

    #[test]
    fn test_unparseable_command_is_invalid() {
        let cmd = DocumentCommand::from_bookmark("DOC(CMD 'insertFrag' FRAG_ID)").unwrap();

        assert!(matches!(cmd.kind(), CommandKind::Invalid { .. }));
        assert!(cmd.is_pending());
    }

    #[test]
    fn test_mark_done_keeps_state_in_bookmark_name() {
        let mut doc = MemoryDocument::new("");
        let name = doc.push_bookmarked("DOC(CMD 'insertContent')", "x");
        let mut cmd = DocumentCommand::from_bookmark(&name).unwrap();

        cmd.mark_done(&mut doc, false);

        insta::assert_snapshot!(cmd.bookmark(), @"DOC(CMD 'insertContent' STATE(DONE 'true'))");
        assert!(doc.bookmark(cmd.bookmark()).is_some());
        let reloaded = DocumentCommand::from_bookmark(cmd.bookmark()).unwrap();
        assert!(reloaded.is_done());
    }

    #[test]
    fn test_mark_done_with_error_writes_both_flags() {
        let mut doc = MemoryDocument::new("");
        let name = doc.push_bookmarked("DOC(CMD 'insertContent')", "x");
        let mut cmd = DocumentCommand::from_bookmark(&name).unwrap();

        cmd.set_error(true);
        cmd.mark_done(&mut doc, false);

        insta::assert_snapshot!(
            cmd.bookmark(),
            @"DOC(CMD 'insertContent' STATE(DONE 'true' ERROR 'true'))"
        );
    }

    #[test]
    fn test_mark_done_removes_bookmark() {
        let mut doc = MemoryDocument::new("");
        let name = doc.push_bookmarked("DOC(CMD 'updateFields')", "x");
        let mut cmd = DocumentCommand::from_bookmark(&name).unwrap();

        cmd.mark_done(&mut doc, true);

        assert!(cmd.is_done());
        assert!(doc.bookmarks().is_empty());
        assert_eq!(doc.text(), "x");
    }

    #[test]
    fn test_insert_between_marks() {
        let mut doc = MemoryDocument::new("A\n");
        let name = doc.push_bookmarked("DOC(CMD 'insertContent')", "");
        doc.push_text("\nB");
        let mut cmd = DocumentCommand::from_bookmark(&name).unwrap();

        cmd.insert_between_marks(&mut doc, &MemoryDocument::new("text"))
            .unwrap();

        assert_eq!(doc.text(), "A\n<text>\nB");
        assert!(cmd.has_insert_marks());
        assert_eq!(doc.bookmark_text(cmd.bookmark()).as_deref(), Some("<text>"));
    }
}
