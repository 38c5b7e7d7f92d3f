pub mod commands;
pub mod host;
pub mod interpreter;
pub mod memory;
pub mod model;
pub mod overrides;
pub mod relation;
pub mod services;

// Re-export key types for easier usage
pub use commands::{CommandKind, DocumentCommand, DocumentCommands};
pub use host::{ControllerLock, HostError, StyleFamilies, StyleFamily, TextDocument};
pub use interpreter::{
    DocumentCommandInterpreter, Fixpoint, InterpreterError, ModifiedFlagGuard, ProcessReport,
    process_document,
};
pub use memory::{ContentLibrary, DocumentFile, FileContentLoader, MemoryDocument, TextSpan};
pub use model::{DocumentModel, FormField};
pub use overrides::{FragmentOverrides, OverrideChainError};
pub use relation::{RangeRelation, TextRange, classify};
pub use services::*;
