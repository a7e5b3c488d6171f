//! XLS error types

use std::fmt;

use biffcells_core::CellRef;
use thiserror::Error;

/// Result type for XLS operations
pub type XlsResult<T> = std::result::Result<T, XlsError>;

/// Which per-sheet anchor index rejected a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    Array,
    Table,
}

impl fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorKind::Array => write!(f, "array"),
            AnchorKind::Table => write!(f, "table"),
        }
    }
}

/// Errors that can occur during XLS reading
#[derive(Debug, Error)]
pub enum XlsError {
    /// IO error (also covers CFB errors which use std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format
    #[error("Invalid XLS format: {0}")]
    InvalidFormat(String),

    /// Unsupported version
    #[error("Unsupported XLS version: {0}")]
    UnsupportedVersion(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Two array (or two table) formulas claim the same anchor cell in one sheet
    #[error("duplicate {kind} formula anchor at {anchor}")]
    DuplicateAnchor { kind: AnchorKind, anchor: CellRef },

    /// Sheet-scoped state was cleared while a decoded cell was still pending
    #[error("cell {row}:{col} of sheet {sheet} is still pending; flush before clearing the sheet")]
    UnflushedCell { sheet: usize, row: u32, col: u16 },

    /// The workbook is encrypted and no decryptor was supplied
    #[error("workbook is encrypted (FILEPASS record present)")]
    Encrypted,

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] biffcells_core::Error),
}
