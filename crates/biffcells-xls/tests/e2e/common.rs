//! Common utilities for XLS E2E tests.
//!
//! [`StreamBuilder`] writes BIFF records into an in-memory workbook stream,
//! encoding strings the way the selected revision stores them.

use biffcells_core::{CellExtent, CellRef};
use biffcells_xls::biff::records;
use biffcells_xls::{
    CellValueEvent, ReadOptions, SheetEvent, WorkbookSummary, XlsReader, XlsResult,
};

pub const BOF_GLOBALS: u16 = records::BOF_WORKBOOK_GLOBALS;
pub const BOF_SHEET: u16 = records::BOF_WORKSHEET;
pub const BOF_CHART: u16 = records::BOF_CHART;

pub struct StreamBuilder {
    version: u16,
    data: Vec<u8>,
}

impl StreamBuilder {
    pub fn biff8() -> Self {
        Self {
            version: records::BIFF8_VERSION,
            data: Vec::new(),
        }
    }

    pub fn biff5() -> Self {
        Self {
            version: records::BIFF5_VERSION,
            data: Vec::new(),
        }
    }

    fn is_biff8(&self) -> bool {
        self.version == records::BIFF8_VERSION
    }

    pub fn record(mut self, id: u16, body: &[u8]) -> Self {
        self.data.extend_from_slice(&id.to_le_bytes());
        self.data.extend_from_slice(&(body.len() as u16).to_le_bytes());
        self.data.extend_from_slice(body);
        self
    }

    pub fn bof(self, dt: u16) -> Self {
        let mut body = Vec::new();
        body.extend_from_slice(&self.version.to_le_bytes());
        body.extend_from_slice(&dt.to_le_bytes());
        body.extend_from_slice(&[0; 4]);
        self.record(records::BOF, &body)
    }

    pub fn eof(self) -> Self {
        self.record(records::EOF, &[])
    }

    /// Globals substream with one BOUNDSHEET per `(name, type)` entry.
    pub fn globals(self, sheets: &[(&str, u8)]) -> Self {
        let mut b = self.bof(BOF_GLOBALS);
        for (name, kind) in sheets {
            let mut body = vec![0, 0, 0, 0, 0, *kind];
            body.extend(b.short_string(name));
            b = b.record(records::BOUNDSHEET, &body);
        }
        b
    }

    /// A minimal XF record with the given number format.
    pub fn xf(self, format_index: u16) -> Self {
        let mut body = vec![0u8; if self.is_biff8() { 20 } else { 16 }];
        body[2..4].copy_from_slice(&format_index.to_le_bytes());
        self.record(records::XF, &body)
    }

    pub fn sst(self, strings: &[&str]) -> Self {
        let mut body = Vec::new();
        body.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        body.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        for s in strings {
            let text = latin1(s);
            body.extend_from_slice(&(text.len() as u16).to_le_bytes());
            body.push(0);
            body.extend(text);
        }
        self.record(records::SST, &body)
    }

    /// CONTINUE record extending the previous record's body.
    pub fn continued(self, body: &[u8]) -> Self {
        self.record(records::CONTINUE, body)
    }

    pub fn codepage(self, codepage: u16) -> Self {
        self.record(records::CODEPAGE, &codepage.to_le_bytes())
    }

    pub fn number(self, row: u16, col: u16, value: f64) -> Self {
        let mut body = cell_header(row, col, 0);
        body.extend_from_slice(&value.to_le_bytes());
        self.record(records::NUMBER, &body)
    }

    pub fn number_xf(self, row: u16, col: u16, xf: u16, value: f64) -> Self {
        let mut body = cell_header(row, col, xf);
        body.extend_from_slice(&value.to_le_bytes());
        self.record(records::NUMBER, &body)
    }

    pub fn label(self, row: u16, col: u16, text: &str) -> Self {
        let mut body = cell_header(row, col, 0);
        body.extend(self.long_string(text));
        self.record(records::LABEL, &body)
    }

    /// BIFF5 LABEL with the byte string written as given.
    pub fn label_bytes(self, row: u16, col: u16, raw: &[u8]) -> Self {
        let mut body = cell_header(row, col, 0);
        body.extend_from_slice(&(raw.len() as u16).to_le_bytes());
        body.extend_from_slice(raw);
        self.record(records::LABEL, &body)
    }

    pub fn labelsst(self, row: u16, col: u16, index: u32) -> Self {
        let mut body = cell_header(row, col, 0);
        body.extend_from_slice(&index.to_le_bytes());
        self.record(records::LABELSST, &body)
    }

    pub fn boolerr(self, row: u16, col: u16, value: u8, is_error: bool) -> Self {
        let mut body = cell_header(row, col, 0);
        body.push(value);
        body.push(is_error as u8);
        self.record(records::BOOLERR, &body)
    }

    pub fn blank(self, row: u16, col: u16) -> Self {
        self.record(records::BLANK, &cell_header(row, col, 0))
    }

    pub fn mulrk(self, row: u16, first_col: u16, values: &[i32]) -> Self {
        let mut body = Vec::new();
        body.extend_from_slice(&row.to_le_bytes());
        body.extend_from_slice(&first_col.to_le_bytes());
        for v in values {
            body.extend_from_slice(&0u16.to_le_bytes());
            body.extend_from_slice(&(((*v << 2) as u32) | 0x02).to_le_bytes());
        }
        let last_col = first_col + values.len() as u16 - 1;
        body.extend_from_slice(&last_col.to_le_bytes());
        self.record(records::MULRK, &body)
    }

    pub fn formula(self, row: u16, col: u16, result: [u8; 8], tokens: &[u8]) -> Self {
        let mut body = cell_header(row, col, 0);
        body.extend_from_slice(&result);
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&[0; 4]);
        body.extend_from_slice(&(tokens.len() as u16).to_le_bytes());
        body.extend_from_slice(tokens);
        self.record(records::FORMULA, &body)
    }

    pub fn string(self, text: &str) -> Self {
        let body = self.long_string(text);
        self.record(records::STRING, &body)
    }

    pub fn array(self, extent: CellExtent, tokens: &[u8]) -> Self {
        let mut body = ref_u(extent);
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&[0; 4]);
        body.extend_from_slice(&(tokens.len() as u16).to_le_bytes());
        body.extend_from_slice(tokens);
        self.record(records::ARRAY, &body)
    }

    /// A one-input TABLE driven by the column input cell `input`.
    pub fn column_table(self, extent: CellExtent, input: CellRef) -> Self {
        let mut body = ref_u(extent);
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&(input.row as u16).to_le_bytes());
        body.extend_from_slice(&input.col.to_le_bytes());
        body.extend_from_slice(&[0; 4]);
        self.record(records::TABLE, &body)
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }

    fn short_string(&self, s: &str) -> Vec<u8> {
        let text = latin1(s);
        let mut out = vec![text.len() as u8];
        if self.is_biff8() {
            out.push(0);
        }
        out.extend(text);
        out
    }

    fn long_string(&self, s: &str) -> Vec<u8> {
        let text = latin1(s);
        let mut out = (text.len() as u16).to_le_bytes().to_vec();
        if self.is_biff8() {
            out.push(0);
        }
        out.extend(text);
        out
    }
}

/// 8-bit text; every char of `s` must be below U+0100.
fn latin1(s: &str) -> Vec<u8> {
    s.chars().map(|c| c as u32 as u8).collect()
}

fn cell_header(row: u16, col: u16, xf: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(6);
    out.extend_from_slice(&row.to_le_bytes());
    out.extend_from_slice(&col.to_le_bytes());
    out.extend_from_slice(&xf.to_le_bytes());
    out
}

fn ref_u(extent: CellExtent) -> Vec<u8> {
    let mut out = Vec::with_capacity(6);
    out.extend_from_slice(&(extent.top as u16).to_le_bytes());
    out.extend_from_slice(&(extent.bottom as u16).to_le_bytes());
    out.push(extent.left as u8);
    out.push(extent.right as u8);
    out
}

/// `PtgExp` pointing at `(row, col)`
pub fn exp(row: u16, col: u16) -> Vec<u8> {
    let mut t = vec![records::PTG_EXP];
    t.extend_from_slice(&row.to_le_bytes());
    t.extend_from_slice(&col.to_le_bytes());
    t
}

/// `PtgTbl` pointing at `(row, col)`
pub fn tbl(row: u16, col: u16) -> Vec<u8> {
    let mut t = exp(row, col);
    t[0] = records::PTG_TBL;
    t
}

pub fn num_result(n: f64) -> [u8; 8] {
    n.to_le_bytes()
}

pub fn string_result() -> [u8; 8] {
    [0, 0, 0, 0, 0, 0, 0xFF, 0xFF]
}

pub fn read(data: &[u8]) -> XlsResult<(Vec<SheetEvent>, WorkbookSummary)> {
    read_with(data, ReadOptions::default())
}

pub fn read_with(
    data: &[u8],
    options: ReadOptions,
) -> XlsResult<(Vec<SheetEvent>, WorkbookSummary)> {
    let mut events = Vec::new();
    let summary = XlsReader::with_options(options).read_stream(data, &mut events)?;
    Ok((events, summary))
}

pub fn cells(events: &[SheetEvent]) -> Vec<&CellValueEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            SheetEvent::CellValue(c) => Some(c),
            SheetEvent::SessionStart { .. } => None,
        })
        .collect()
}

pub fn cell_at(events: &[SheetEvent], sheet: usize, a1: &str) -> CellValueEvent {
    let target = CellRef::parse(a1).unwrap();
    cells(events)
        .into_iter()
        .find(|c| c.sheet == sheet && c.cell() == target)
        .cloned()
        .unwrap_or_else(|| panic!("no event for {a1} on sheet {sheet}"))
}
