//! # biffcells-xls
//!
//! Sequential BIFF5/BIFF8 record decoding for legacy Excel (.xls) files.
//!
//! One decode pass walks the workbook stream record by record. Cell records
//! go through a [`DeferredCellEmitter`] that holds each cell back by one
//! record, so trailing STRING, ARRAY and TABLE records can attach to the
//! formula they belong to before its value is resolved. Array and data-table
//! formulas are indexed per sheet so every cell of a multi-cell block
//! resolves back to its anchor formula.
//!
//! Each format revision has its own [`RecordLoader`] implementation;
//! [`XlsReader`] picks one from the first BOF record and drives the pass.

pub mod biff;
pub mod cell;
pub mod emitter;
pub mod error;
pub mod formula;
pub mod index;
pub mod loader;
pub mod reader;
pub mod services;

pub use cell::{CellContent, CellRecord};
pub use emitter::{ArrayRecord, CellValueEvent, DeferredCellEmitter, SheetEvent, TableRecord};
pub use error::{AnchorKind, XlsError, XlsResult};
pub use formula::{ArrayData, FormulaOptions, FormulaRecord, FormulaResult, RecordSpan, TableData};
pub use index::{AnchorLookup, ArrayFormulaIndex, RangeOverlayIndex, TableFormulaIndex};
pub use loader::{Biff5Loader, Biff8Loader, DecodedRecord, RecordLoader};
pub use reader::{
    select_loader, CellListener, FnListener, ReadOptions, WorkbookSummary, XlsReader,
};
pub use services::{
    Decryptor, DefinedName, PlainText, SheetInfo, SheetKind, SheetVisibility, WorkbookServices,
};
