//! Decoded formula records and their array/table payloads.

use biffcells_core::{CellError, CellExtent, CellRef, CellValue, SharedString, TableInputs};

use crate::biff::parser::ByteReader;
use crate::biff::records;
use crate::error::XlsResult;

/// Location of the source record in the workbook stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordSpan {
    /// Byte offset of the record header.
    pub offset: u64,
    /// Body length, CONTINUE bodies included.
    pub len: usize,
}

/// `FORMULA.grbit` bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormulaOptions(pub u16);

impl FormulaOptions {
    pub const SHARED: u16 = 0x0008;

    pub fn is_shared(self) -> bool {
        self.0 & Self::SHARED != 0
    }
}

/// Shared token body of an array formula, taken from its ARRAY record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayData {
    pub extent: CellExtent,
    /// Raw `ARRAY.grbit`
    pub options: u16,
    pub tokens: Vec<u8>,
}

/// Input-cell configuration of a data table, taken from its TABLE record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableData {
    pub extent: CellExtent,
    pub inputs: TableInputs,
    pub always_calc: bool,
}

/// One formula-bearing cell.
///
/// Records are shared behind `Rc` between the pending emitter slot and the
/// per-sheet indices; the only deep copy is [`cell_view`](Self::cell_view).
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaRecord {
    /// Record identifier (`records::FORMULA`)
    pub id: u16,
    pub row: u32,
    pub col: u16,
    pub format_index: u16,
    pub options: FormulaOptions,
    /// Raw parsed-expression tokens (`rgce`)
    pub tokens: Vec<u8>,
    pub array: Option<ArrayData>,
    pub table: Option<TableData>,
    pub buffer: RecordSpan,
}

/// Anchor pointer carried by the first token of a member formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorToken {
    /// `PtgExp`: array or shared formula member
    Exp(CellRef),
    /// `PtgTbl`: data table member
    Table(CellRef),
}

impl AnchorToken {
    pub fn cell(self) -> CellRef {
        match self {
            AnchorToken::Exp(c) | AnchorToken::Table(c) => c,
        }
    }
}

impl FormulaRecord {
    pub fn cell(&self) -> CellRef {
        CellRef::new(self.row, self.col)
    }

    /// Decode the anchor pointer if the token stream is a lone `PtgExp` or `PtgTbl`.
    pub fn anchor_token(&self) -> Option<AnchorToken> {
        let (&ptg, rest) = self.tokens.split_first()?;
        if rest.len() < 4 {
            return None;
        }
        let row = u16::from_le_bytes([rest[0], rest[1]]) as u32;
        let col = u16::from_le_bytes([rest[2], rest[3]]);
        match ptg {
            records::PTG_EXP => Some(AnchorToken::Exp(CellRef::new(row, col))),
            records::PTG_TBL => Some(AnchorToken::Table(CellRef::new(row, col))),
            _ => None,
        }
    }

    /// A copy of this record re-anchored at `cell`, with no array or table
    /// payload: "part of an array, but not its anchor".
    pub fn cell_view(&self, cell: CellRef) -> FormulaRecord {
        FormulaRecord {
            id: self.id,
            row: cell.row,
            col: cell.col,
            format_index: self.format_index,
            options: self.options,
            tokens: self.tokens.clone(),
            array: None,
            table: None,
            buffer: self.buffer,
        }
    }
}

/// Cached result stored in a FORMULA record.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaResult {
    Number(f64),
    Boolean(bool),
    Error(CellError),
    /// An empty string result
    Empty,
    /// A string result whose text arrives in the following STRING record
    PendingString,
    String(SharedString),
}

impl FormulaResult {
    /// Decode the 8-byte result field.
    ///
    /// If bytes 6-7 are `0xFFFF` the value is special and byte 0 selects
    /// the type; otherwise the field is an IEEE 754 double.
    pub fn decode(raw: [u8; 8]) -> Self {
        if raw[6] != 0xFF || raw[7] != 0xFF {
            return FormulaResult::Number(f64::from_le_bytes(raw));
        }
        match raw[0] {
            0x00 => FormulaResult::PendingString,
            0x01 => FormulaResult::Boolean(raw[2] != 0),
            0x02 => FormulaResult::Error(CellError::from_code(raw[2])),
            _ => FormulaResult::Empty,
        }
    }

    /// The cached value to report, `None` if a string result never arrived.
    pub fn into_cached(self) -> Option<CellValue> {
        match self {
            FormulaResult::Number(n) => Some(CellValue::Number(n)),
            FormulaResult::Boolean(b) => Some(CellValue::Boolean(b)),
            FormulaResult::Error(e) => Some(CellValue::Error(e)),
            FormulaResult::Empty => Some(CellValue::string("")),
            FormulaResult::PendingString => None,
            FormulaResult::String(s) => Some(CellValue::String(s)),
        }
    }
}

/// Read a `cce`-prefixed token stream.
pub(crate) fn read_tokens(r: &mut ByteReader<'_>) -> XlsResult<Vec<u8>> {
    let cce = r.u16()? as usize;
    Ok(r.bytes(cce)?.to_vec())
}
