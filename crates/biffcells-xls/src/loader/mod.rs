//! Per-revision record loaders.
//!
//! A loader owns the record stream, the workbook services and the cell
//! emitter for one decode pass. The driver asks it for one header at a
//! time, then for the decoded record; everything that differs between
//! format revisions (string encodings, which records exist, record sizes)
//! stays behind the [`RecordLoader`] trait.

mod biff5;
mod biff8;
pub(crate) mod common;

pub use biff5::Biff5Loader;
pub use biff8::Biff8Loader;

use biffcells_core::SharedString;

use crate::biff::{BiffVersion, BofRecord, RecordHeader};
use crate::cell::CellRecord;
use crate::emitter::{ArrayRecord, DeferredCellEmitter, TableRecord};
use crate::error::XlsResult;
use crate::services::{GlobalRecord, WorkbookServices};

/// One record, decoded by a loader
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRecord {
    Bof(BofRecord),
    Eof,
    /// A workbook-globals record, to be absorbed into the services
    Global(GlobalRecord),
    Cell(CellRecord),
    /// MULRK / MULBLANK
    Cells(Vec<CellRecord>),
    /// STRING: the string result of the preceding formula
    StringResult(SharedString),
    Array(ArrayRecord),
    Table(TableRecord),
    /// ROW, carrying the row number only
    Row(u32),
    /// A record this revision does not interpret (or was asked to skip)
    Unsupported { id: u16, len: usize },
}

/// The decoding contract one format revision implements.
pub trait RecordLoader {
    fn version(&self) -> BiffVersion;

    /// Read the next record header.
    fn read_header(&mut self) -> XlsResult<RecordHeader>;

    /// Read, decrypt and decode the body of the current record.
    ///
    /// Returns the decoded record plus the row it belongs to, if it is a
    /// cell, formula or ROW record.
    fn load_record(&mut self, in_globals: bool) -> XlsResult<(DecodedRecord, Option<u32>)>;

    /// Consume the body of the current record without decoding it.
    fn load_unsupported_record(&mut self) -> XlsResult<DecodedRecord>;

    /// True once the whole stream has been consumed.
    fn eof(&self) -> bool;

    /// Flush the pending cell, then drop all sheet-scoped formula state.
    fn switch_sheet(&mut self) -> XlsResult<()> {
        let emitter = self.emitter();
        emitter.flush();
        emitter.clear_sheet()
    }

    fn emitter(&mut self) -> &mut DeferredCellEmitter;

    fn services(&self) -> &WorkbookServices;

    fn services_mut(&mut self) -> &mut WorkbookServices;
}
