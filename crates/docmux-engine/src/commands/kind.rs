use std::fmt;

use crate::commands::syntax::ConfigNode;
use crate::host::{StyleFamilies, StyleFamily};

/// Separator used by `AUTOSEP` when no `SEPARATOR` was given.
pub const DEFAULT_SEPARATOR: &str = " ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertFrag {
    pub frag_id: String,
    pub args: Vec<String>,
    pub manual_mode: bool,
    /// Non-empty means only these style families are imported and no text is inserted.
    pub styles: StyleFamilies,
}

impl InsertFrag {
    pub fn imports_styles_only(&self) -> bool {
        !self.styles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertValue {
    pub column: String,
    pub left_separator: String,
    pub right_separator: String,
    pub transform: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    NormalTemplate,
    TemplateTemplate,
    FormDocument,
}

impl DocumentType {
    /// Case-insensitive.
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("normalTemplate") {
            Some(DocumentType::NormalTemplate)
        } else if name.eq_ignore_ascii_case("templateTemplate") {
            Some(DocumentType::TemplateTemplate)
        } else if name.eq_ignore_ascii_case("formDocument") {
            Some(DocumentType::FormDocument)
        } else {
            None
        }
    }
}

/// Print blocks mark text that only certain print versions show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintBlock {
    DraftOnly,
    NotInOriginal,
    OriginalOnly,
    CopyOnly,
    AllVersions,
}

impl PrintBlock {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "draftonly" => Some(PrintBlock::DraftOnly),
            "notinoriginal" => Some(PrintBlock::NotInOriginal),
            "originalonly" => Some(PrintBlock::OriginalOnly),
            "copyonly" => Some(PrintBlock::CopyOnly),
            "allversions" => Some(PrintBlock::AllVersions),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrintBlock::DraftOnly => "draftOnly",
            PrintBlock::NotInOriginal => "notInOriginal",
            PrintBlock::OriginalOnly => "originalOnly",
            PrintBlock::CopyOnly => "copyOnly",
            PrintBlock::AllVersions => "allVersions",
        }
    }
}

/// Every kind of document command. Each phase matches on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    InsertFrag(InsertFrag),
    InsertContent,
    InsertValue(InsertValue),
    InsertFormValue {
        id: String,
        transform: Option<String>,
    },
    OverrideFrag {
        frag_id: String,
        /// Empty when the fragment should be dropped.
        new_frag_id: String,
    },
    UpdateFields,
    SetType(DocumentType),
    SetPrintFunction {
        function: String,
    },
    Form,
    SetJumpMark,
    /// Assigns visibility groups to the text. Only the print and visibility layers read it.
    SetGroups {
        groups: Vec<String>,
    },
    PrintBlock {
        block: PrintBlock,
        highlight_color: Option<String>,
    },
    Invalid {
        reason: String,
    },
}

impl CommandKind {
    /// Reads the kind from a `DOC(...)` node. Problems yield [`CommandKind::Invalid`].
    pub fn from_config(doc: &ConfigNode) -> Self {
        match Self::parse(doc) {
            Ok(kind) => kind,
            Err(reason) => CommandKind::Invalid { reason },
        }
    }

    fn parse(doc: &ConfigNode) -> Result<Self, String> {
        let Some(cmd) = doc.child_value("CMD") else {
            return Err("missing attribute CMD".to_string());
        };
        let kind = match cmd.to_ascii_lowercase().as_str() {
            "insertfrag" => CommandKind::InsertFrag(parse_insert_frag(doc)?),
            "insertcontent" => CommandKind::InsertContent,
            "insertvalue" => CommandKind::InsertValue(parse_insert_value(doc)?),
            "insertformvalue" => CommandKind::InsertFormValue {
                id: required(doc, "ID")?,
                transform: doc.child_value("TRAFO").map(str::to_string),
            },
            "overridefrag" => CommandKind::OverrideFrag {
                frag_id: required(doc, "FRAG_ID")?,
                new_frag_id: doc.child_value("NEW_FRAG_ID").unwrap_or_default().to_string(),
            },
            "updatefields" => CommandKind::UpdateFields,
            "settype" => {
                let name = required(doc, "TYPE")?;
                let doc_type = DocumentType::parse(&name).ok_or_else(|| {
                    format!(
                        "TYPE '{name}' is invalid, expected \"templateTemplate\", \
                         \"normalTemplate\" or \"formDocument\""
                    )
                })?;
                CommandKind::SetType(doc_type)
            }
            "setprintfunction" => CommandKind::SetPrintFunction {
                function: required(doc, "FUNCTION")?,
            },
            "form" => CommandKind::Form,
            "setjumpmark" => CommandKind::SetJumpMark,
            "setgroups" => CommandKind::SetGroups {
                groups: doc
                    .child("GROUPS")
                    .map(|groups| groups.children.iter().map(|g| g.name.clone()).collect())
                    .unwrap_or_default(),
            },
            other => match PrintBlock::parse(other) {
                Some(block) => CommandKind::PrintBlock {
                    block,
                    highlight_color: doc
                        .descendants_named("HIGHLIGHT_COLOR")
                        .into_iter()
                        .find_map(ConfigNode::value)
                        .map(str::to_string),
                },
                None => return Err(format!("unknown command '{cmd}'")),
            },
        };
        Ok(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::InsertFrag(_) => "insertFrag",
            CommandKind::InsertContent => "insertContent",
            CommandKind::InsertValue(_) => "insertValue",
            CommandKind::InsertFormValue { .. } => "insertFormValue",
            CommandKind::OverrideFrag { .. } => "overrideFrag",
            CommandKind::UpdateFields => "updateFields",
            CommandKind::SetType(_) => "setType",
            CommandKind::SetPrintFunction { .. } => "setPrintFunction",
            CommandKind::Form => "form",
            CommandKind::SetJumpMark => "setJumpMark",
            CommandKind::SetGroups { .. } => "setGroups",
            CommandKind::PrintBlock { block, .. } => block.name(),
            CommandKind::Invalid { .. } => "invalid",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn required(doc: &ConfigNode, key: &str) -> Result<String, String> {
    doc.child_value(key)
        .map(str::to_string)
        .ok_or_else(|| format!("missing attribute {key}"))
}

fn parse_insert_frag(doc: &ConfigNode) -> Result<InsertFrag, String> {
    let frag_id = required(doc, "FRAG_ID")?;
    let args = doc
        .child("ARGS")
        .map(|args| args.children.iter().map(|arg| arg.name.clone()).collect())
        .unwrap_or_default();
    let manual_mode = doc
        .child_value("MODE")
        .is_some_and(|mode| mode.eq_ignore_ascii_case("manual"));

    let mut styles = StyleFamilies::new();
    for style in doc.child("STYLES").map(|s| s.children.as_slice()).unwrap_or_default() {
        if style.name.eq_ignore_ascii_case("all") {
            styles.extend(StyleFamily::ALL);
        } else {
            let family = StyleFamily::from_command_name(&style.name)
                .ok_or_else(|| format!("unknown STYLE '{}'", style.name))?;
            styles.insert(family);
        }
    }

    Ok(InsertFrag {
        frag_id,
        args,
        manual_mode,
        styles,
    })
}

fn parse_insert_value(doc: &ConfigNode) -> Result<InsertValue, String> {
    let column = required(doc, "DB_SPALTE")?;
    let mut left_separator = String::new();
    let mut right_separator = String::new();

    // each AUTOSEP takes the next SEPARATOR, or keeps the previous one
    let mut separators = doc
        .descendants_named("SEPARATOR")
        .into_iter()
        .filter_map(ConfigNode::value);
    let mut current = DEFAULT_SEPARATOR.to_string();
    for autosep in doc.descendants_named("AUTOSEP") {
        let side = autosep.value().unwrap_or_default();
        if let Some(separator) = separators.next() {
            current = separator.to_string();
        }
        match side.to_ascii_lowercase().as_str() {
            "left" => left_separator = current.clone(),
            "right" => right_separator = current.clone(),
            "both" => {
                left_separator = current.clone();
                right_separator = current.clone();
            }
            _ => {
                return Err(format!(
                    "unknown AUTOSEP type \"{side}\", expected \"left\", \"right\" or \"both\""
                ));
            }
        }
    }

    Ok(InsertValue {
        column,
        left_separator,
        right_separator,
        transform: doc.child_value("TRAFO").map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::syntax::parse_node;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn kind(source: &str) -> CommandKind {
        CommandKind::from_config(&parse_node(source).unwrap())
    }

    fn invalid_reason(source: &str) -> String {
        match kind(source) {
            CommandKind::Invalid { reason } => reason,
            other => panic!("expected an invalid command, got {other:?}"),
        }
    }

    #[test]
    fn test_insert_frag_with_all_attributes() {
        let parsed =
            kind("DOC(CMD 'insertFrag' FRAG_ID 'Addr' ARGS('Acme' '' 'Main St') MODE 'Manual')");

        assert_eq!(
            parsed,
            CommandKind::InsertFrag(InsertFrag {
                frag_id: "Addr".into(),
                args: vec!["Acme".into(), "".into(), "Main St".into()],
                manual_mode: true,
                styles: StyleFamilies::new(),
            })
        );
    }

    #[test]
    fn test_insert_frag_styles_all_expands() {
        let CommandKind::InsertFrag(frag) =
            kind("DOC(CMD 'insertFrag' FRAG_ID 'Styles' STYLES('all'))")
        else {
            panic!("expected insertFrag");
        };
        assert!(frag.imports_styles_only());
        assert_eq!(frag.styles, StyleFamilies::from(StyleFamily::ALL));
    }

    #[test]
    fn test_insert_frag_styles_are_case_insensitive() {
        let CommandKind::InsertFrag(frag) =
            kind("DOC(CMD 'insertFrag' FRAG_ID 'S' STYLES('pageStyles' 'NUMBERINGSTYLES'))")
        else {
            panic!("expected insertFrag");
        };
        assert_eq!(
            frag.styles,
            StyleFamilies::from([StyleFamily::Page, StyleFamily::Numbering])
        );
    }

    #[rstest]
    #[case::missing_frag_id("DOC(CMD 'insertFrag')", "missing attribute FRAG_ID")]
    #[case::unknown_style("DOC(CMD 'insertFrag' FRAG_ID 'x' STYLES('cellStyles'))", "unknown STYLE 'cellStyles'")]
    #[case::missing_column("DOC(CMD 'insertValue')", "missing attribute DB_SPALTE")]
    #[case::missing_id("DOC(CMD 'insertFormValue')", "missing attribute ID")]
    #[case::missing_function("DOC(CMD 'setPrintFunction')", "missing attribute FUNCTION")]
    #[case::unknown_command("DOC(CMD 'explode')", "unknown command 'explode'")]
    #[case::missing_cmd("DOC(FRAG_ID 'x')", "missing attribute CMD")]
    fn test_invalid_commands(#[case] source: &str, #[case] reason: &str) {
        assert_eq!(invalid_reason(source), reason);
    }

    #[test]
    fn test_set_type_rejects_unknown_type() {
        assert!(invalid_reason("DOC(CMD 'setType' TYPE 'letter')").starts_with("TYPE 'letter'"));
    }

    #[rstest]
    #[case("normalTemplate", DocumentType::NormalTemplate)]
    #[case("TEMPLATETEMPLATE", DocumentType::TemplateTemplate)]
    #[case("formDocument", DocumentType::FormDocument)]
    fn test_set_type(#[case] name: &str, #[case] expected: DocumentType) {
        assert_eq!(
            kind(&format!("DOC(CMD 'setType' TYPE '{name}')")),
            CommandKind::SetType(expected)
        );
    }

    #[rstest]
    #[case("draftOnly", PrintBlock::DraftOnly)]
    #[case("NOTINORIGINAL", PrintBlock::NotInOriginal)]
    #[case("originalOnly", PrintBlock::OriginalOnly)]
    #[case("copyOnly", PrintBlock::CopyOnly)]
    #[case("allVersions", PrintBlock::AllVersions)]
    fn test_print_blocks(#[case] name: &str, #[case] expected: PrintBlock) {
        assert_eq!(
            kind(&format!("DOC(CMD '{name}')")),
            CommandKind::PrintBlock {
                block: expected,
                highlight_color: None,
            }
        );
    }

    #[test]
    fn test_print_block_highlight_color() {
        assert_eq!(
            kind("DOC(CMD 'draftOnly' WM(HIGHLIGHT_COLOR 'ffff00'))"),
            CommandKind::PrintBlock {
                block: PrintBlock::DraftOnly,
                highlight_color: Some("ffff00".into()),
            }
        );
    }

    #[test]
    fn test_set_groups() {
        assert_eq!(
            kind("DOC(CMD 'setGroups' GROUPS('Draft' 'Internal'))"),
            CommandKind::SetGroups {
                groups: vec!["Draft".into(), "Internal".into()],
            }
        );
    }

    #[test]
    fn test_override_frag_without_new_id_drops_fragment() {
        assert_eq!(
            kind("DOC(CMD 'overrideFrag' FRAG_ID 'Logo')"),
            CommandKind::OverrideFrag {
                frag_id: "Logo".into(),
                new_frag_id: String::new(),
            }
        );
    }

    // ============ Separators ============

    fn separators(source: &str) -> (String, String) {
        match kind(source) {
            CommandKind::InsertValue(value) => (value.left_separator, value.right_separator),
            other => panic!("expected insertValue, got {other:?}"),
        }
    }

    #[rstest]
    #[case::none("DOC(CMD 'insertValue' DB_SPALTE 'Name')", "", "")]
    #[case::default_left("DOC(CMD 'insertValue' DB_SPALTE 'Name' AUTOSEP 'left')", " ", "")]
    #[case::both_with_separator(
        "DOC(CMD 'insertValue' DB_SPALTE 'Name' AUTOSEP 'both' SEPARATOR ', ')",
        ", ",
        ", "
    )]
    #[case::pairs_in_order(
        "DOC(CMD 'insertValue' DB_SPALTE 'Name' AUTOSEP 'left' SEPARATOR '(' AUTOSEP 'right' SEPARATOR ')')",
        "(",
        ")"
    )]
    #[case::previous_separator_is_reused(
        "DOC(CMD 'insertValue' DB_SPALTE 'Name' AUTOSEP 'left' SEPARATOR '-' AUTOSEP 'right')",
        "-",
        "-"
    )]
    fn test_autosep(#[case] source: &str, #[case] left: &str, #[case] right: &str) {
        assert_eq!(separators(source), (left.to_string(), right.to_string()));
    }

    #[test]
    fn test_unknown_autosep_is_invalid() {
        assert_eq!(
            invalid_reason("DOC(CMD 'insertValue' DB_SPALTE 'Name' AUTOSEP 'middle')"),
            "unknown AUTOSEP type \"middle\", expected \"left\", \"right\" or \"both\""
        );
    }

    #[test]
    fn test_insert_value_keeps_transform() {
        let CommandKind::InsertValue(value) =
            kind("DOC(CMD 'insertValue' DB_SPALTE 'Name' TRAFO 'Upper')")
        else {
            panic!("expected insertValue");
        };
        assert_eq!(value.transform.as_deref(), Some("Upper"));
        assert_eq!(value.column, "Name");
    }
}
