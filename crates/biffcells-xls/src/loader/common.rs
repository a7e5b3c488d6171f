//! Record decoders shared by the BIFF5 and BIFF8 loaders.
//!
//! Most record layouts are identical across the two revisions; what differs
//! is how strings are stored, which [`TextCodec`] captures. Every reader
//! takes the workbook code page; BIFF8 readers ignore it.

use biffcells_core::{
    CellError, CellExtent, CellRef, CellValue, SharedString, TableInputs, TableMode,
};

use super::DecodedRecord;
use crate::biff::parser::ByteReader;
use crate::biff::strings::{parse_sst, DEFAULT_CODEPAGE};
use crate::biff::{self, records, RecordBody, RecordHeader, RecordStream};
use crate::cell::CellRecord;
use crate::emitter::{ArrayRecord, DeferredCellEmitter, TableRecord};
use crate::error::{XlsError, XlsResult};
use crate::formula::{
    read_tokens, ArrayData, FormulaOptions, FormulaRecord, FormulaResult, RecordSpan, TableData,
};
use crate::services::{
    builtin_name, DefinedName, Font, GlobalRecord, SheetInfo, SheetKind, SheetVisibility,
    WorkbookServices, Xf,
};

/// String readers for one format revision.
pub(crate) struct TextCodec {
    /// 1-byte length prefix (BOUNDSHEET, FONT)
    pub short: fn(&mut ByteReader<'_>, u16) -> XlsResult<String>,
    /// 2-byte length prefix (LABEL, RSTRING, STRING)
    pub long: fn(&mut ByteReader<'_>, u16) -> XlsResult<String>,
    /// Length stored elsewhere in the record (NAME)
    pub chars: fn(&mut ByteReader<'_>, usize, u16) -> XlsResult<String>,
}

/// Revision-specific layout facts.
pub(crate) struct Revision {
    pub codec: TextCodec,
    /// Minimum XF record size
    pub xf_len: usize,
    /// Whether SST/LABELSST exist
    pub shared_strings: bool,
}

impl Revision {
    /// Whether this revision decodes record `id` in the given substream.
    pub fn interprets(&self, id: u16, in_globals: bool) -> bool {
        match id {
            records::BOF | records::EOF => true,
            records::SST => in_globals && self.shared_strings,
            records::LABELSST => !in_globals && self.shared_strings,
            records::FONT
            | records::XF
            | records::NAME
            | records::BOUNDSHEET
            | records::DATEMODE
            | records::CODEPAGE
            | records::FILEPASS => in_globals,
            records::LABEL
            | records::RSTRING
            | records::NUMBER
            | records::RK
            | records::MULRK
            | records::BLANK
            | records::MULBLANK
            | records::BOOLERR
            | records::FORMULA
            | records::STRING
            | records::ARRAY
            | records::TABLE
            | records::ROW => !in_globals,
            _ => false,
        }
    }
}

/// Stream, services and emitter, owned by whichever loader is active.
#[derive(Debug)]
pub(crate) struct LoaderState<'a> {
    pub stream: RecordStream<'a>,
    pub services: WorkbookServices,
    pub emitter: DeferredCellEmitter,
}

impl<'a> LoaderState<'a> {
    pub fn new(stream: &'a [u8], services: WorkbookServices, emitter: DeferredCellEmitter) -> Self {
        Self {
            stream: RecordStream::new(stream),
            services,
            emitter,
        }
    }

    pub fn skip(&mut self) -> XlsResult<DecodedRecord> {
        let (header, len) = self.stream.skip_body()?;
        log::trace!("skip record 0x{:04X} ({len} bytes)", header.id);
        Ok(DecodedRecord::Unsupported { id: header.id, len })
    }

    pub fn load(
        &mut self,
        revision: &Revision,
        in_globals: bool,
    ) -> XlsResult<(DecodedRecord, Option<u32>)> {
        let header = self.stream.current().ok_or_else(|| {
            XlsError::Parse("load_record called without a pending record header".into())
        })?;
        if !revision.interprets(header.id, in_globals) {
            return Ok((self.skip()?, None));
        }

        let (header, mut body) = self.stream.read_body()?;
        // BOF and FILEPASS are never encrypted
        if header.id != records::BOF && header.id != records::FILEPASS {
            self.services.decrypt(&header, &mut body.data)?;
        }
        log::trace!(
            "record 0x{:04X} at {} ({} bytes)",
            header.id,
            header.offset,
            body.len()
        );

        let codepage = self.services.codepage.unwrap_or(DEFAULT_CODEPAGE);
        if in_globals {
            decode_global(revision, &header, &body, codepage).map(|r| (r, None))
        } else {
            decode_sheet(revision, &header, &body, codepage, &self.services)
        }
    }
}

fn decode_global(
    revision: &Revision,
    header: &RecordHeader,
    record: &RecordBody,
    codepage: u16,
) -> XlsResult<DecodedRecord> {
    let codec = &revision.codec;
    let body = record.data.as_slice();
    let global = match header.id {
        records::BOF => return biff::parse_bof(body).map(DecodedRecord::Bof),
        records::EOF => return Ok(DecodedRecord::Eof),
        records::SST => GlobalRecord::SharedStrings(parse_sst(&mut record.reader())?),
        records::FONT => GlobalRecord::Font(parse_font(body, codec, codepage)?),
        records::XF => GlobalRecord::Xf(parse_xf(body, revision.xf_len)?),
        records::NAME => GlobalRecord::Name(parse_name(body, codec, codepage)?),
        records::BOUNDSHEET => {
            GlobalRecord::BoundSheet(parse_boundsheet(body, codec, codepage)?)
        }
        records::DATEMODE => GlobalRecord::DateMode {
            date_1904: ByteReader::new(body).u16()? == 1,
        },
        records::CODEPAGE => GlobalRecord::CodePage(ByteReader::new(body).u16()?),
        records::FILEPASS => GlobalRecord::FilePass(body.to_vec()),
        id => {
            return Ok(DecodedRecord::Unsupported {
                id,
                len: body.len(),
            })
        }
    };
    Ok(DecodedRecord::Global(global))
}

fn decode_sheet(
    revision: &Revision,
    header: &RecordHeader,
    record: &RecordBody,
    codepage: u16,
    services: &WorkbookServices,
) -> XlsResult<(DecodedRecord, Option<u32>)> {
    let codec = &revision.codec;
    let body = record.data.as_slice();
    let mut r = record.reader();

    let cell = match header.id {
        records::BOF => return Ok((DecodedRecord::Bof(biff::parse_bof(body)?), None)),
        records::EOF => return Ok((DecodedRecord::Eof, None)),
        records::ROW => {
            let row = r.u16()? as u32;
            return Ok((DecodedRecord::Row(row), Some(row)));
        }
        records::STRING => {
            let text = (codec.long)(&mut r, codepage)?;
            return Ok((DecodedRecord::StringResult(SharedString::new(text)), None));
        }
        records::ARRAY => {
            let data = parse_array(&mut r)?;
            let row = data.extent.top;
            return Ok((DecodedRecord::Array(ArrayRecord { data }), Some(row)));
        }
        records::TABLE => {
            let data = parse_table(&mut r)?;
            let row = data.extent.top;
            return Ok((DecodedRecord::Table(TableRecord { data }), Some(row)));
        }
        records::MULRK => {
            let cells = parse_mulrk(body, services)?;
            let row = cells.first().map(|c| c.row);
            return Ok((DecodedRecord::Cells(cells), row));
        }
        records::MULBLANK => {
            let cells = parse_mulblank(body, services)?;
            let row = cells.first().map(|c| c.row);
            return Ok((DecodedRecord::Cells(cells), row));
        }
        records::FORMULA => parse_formula(header, &mut r, services)?,
        id => {
            // Fixed cell header: row(2) + col(2) + xf(2)
            let (row, col, xf) = (r.u16()? as u32, r.u16()?, r.u16()?);
            let value = match id {
                // LABELSST: sst_index(4)
                records::LABELSST => {
                    CellValue::String(services.shared_string(r.u32()? as usize))
                }
                // LABEL / RSTRING: string (trailing rich-text runs ignored)
                records::LABEL | records::RSTRING => {
                    CellValue::string((codec.long)(&mut r, codepage)?)
                }
                records::NUMBER => CellValue::Number(r.f64()?),
                records::RK => CellValue::Number(r.rk()?),
                records::BLANK => CellValue::Empty,
                // BOOLERR: value(1) + is_error(1)
                records::BOOLERR => {
                    let value = r.u8()?;
                    if r.u8()? != 0 {
                        CellValue::Error(CellError::from_code(value))
                    } else {
                        CellValue::Boolean(value != 0)
                    }
                }
                other => {
                    return Ok((
                        DecodedRecord::Unsupported {
                            id: other,
                            len: body.len(),
                        },
                        None,
                    ))
                }
            };
            CellRecord::value(row, col, services.xf_table.format_index(xf), value)
        }
    };

    let row = cell.row;
    Ok((DecodedRecord::Cell(cell), Some(row)))
}

/// FORMULA: row(2) + col(2) + xf(2) + result(8) + grbit(2) + chn(4) + cce(2) + rgce
fn parse_formula(
    header: &RecordHeader,
    r: &mut ByteReader<'_>,
    services: &WorkbookServices,
) -> XlsResult<CellRecord> {
    let row = r.u16()? as u32;
    let col = r.u16()?;
    let xf = r.u16()?;
    let result = FormulaResult::decode(r.array8()?);
    let options = FormulaOptions(r.u16()?);
    r.skip(4)?;
    let tokens = read_tokens(r)?;

    let formula = FormulaRecord {
        id: header.id,
        row,
        col,
        format_index: services.xf_table.format_index(xf),
        options,
        tokens,
        array: None,
        table: None,
        buffer: RecordSpan {
            offset: header.offset,
            len: r.position() + r.remaining(),
        },
    };
    Ok(CellRecord::formula(formula, result))
}

/// RefU: rwFirst(2) + rwLast(2) + colFirst(1) + colLast(1)
fn read_ref_u(r: &mut ByteReader<'_>) -> XlsResult<CellExtent> {
    let top = r.u16()? as u32;
    let bottom = r.u16()? as u32;
    let left = r.u8()? as u16;
    let right = r.u8()? as u16;
    Ok(CellExtent::new(top, left, bottom, right))
}

/// ARRAY: RefU(6) + grbit(2) + chn(4) + cce(2) + rgce
fn parse_array(r: &mut ByteReader<'_>) -> XlsResult<ArrayData> {
    let extent = read_ref_u(r)?;
    let options = r.u16()?;
    r.skip(4)?;
    let tokens = read_tokens(r)?;
    Ok(ArrayData {
        extent,
        options,
        tokens,
    })
}

const TABLE_ALWAYS_CALC: u16 = 0x0001;
const TABLE_ROW_INPUT: u16 = 0x0004;
const TABLE_TWO_INPUT: u16 = 0x0008;

/// TABLE: RefU(6) + grbit(2) + rwInpRw(2) + colInpRw(2) + rwInpCol(2) + colInpCol(2)
fn parse_table(r: &mut ByteReader<'_>) -> XlsResult<TableData> {
    let extent = read_ref_u(r)?;
    let flags = r.u16()?;
    let first = CellRef::new(r.u16()? as u32, r.u16()?);
    let second = CellRef::new(r.u16()? as u32, r.u16()?);

    let inputs = if flags & TABLE_TWO_INPUT != 0 {
        TableInputs {
            mode: TableMode::TwoInput,
            row_input: Some(first),
            col_input: Some(second),
        }
    } else if flags & TABLE_ROW_INPUT != 0 {
        TableInputs {
            mode: TableMode::RowInput,
            row_input: Some(first),
            col_input: None,
        }
    } else {
        TableInputs {
            mode: TableMode::ColumnInput,
            row_input: None,
            col_input: Some(first),
        }
    };

    Ok(TableData {
        extent,
        inputs,
        always_calc: flags & TABLE_ALWAYS_CALC != 0,
    })
}

/// Split a MULRK/MULBLANK body into row, first column, the per-cell block
/// and the trailing last column.
fn split_multi<'a>(body: &'a [u8], name: &str) -> XlsResult<(u32, u16, u16, &'a [u8])> {
    if body.len() < 6 {
        return Err(XlsError::Parse(format!("{name} record too short")));
    }
    let mut r = ByteReader::new(body);
    let row = r.u16()? as u32;
    let first_col = r.u16()?;
    let last_col = u16::from_le_bytes([body[body.len() - 2], body[body.len() - 1]]);
    if last_col < first_col {
        return Err(XlsError::Parse(format!(
            "{name} column range {first_col}..{last_col} is inverted"
        )));
    }
    Ok((row, first_col, last_col, &body[4..body.len() - 2]))
}

/// MULRK: row(2) + first_col(2) + [xf(2) + rk(4)]* + last_col(2)
fn parse_mulrk(body: &[u8], services: &WorkbookServices) -> XlsResult<Vec<CellRecord>> {
    let (row, first_col, last_col, block) = split_multi(body, "MULRK")?;
    let mut r = ByteReader::new(block);
    let mut cells = Vec::with_capacity((last_col - first_col) as usize + 1);
    for col in first_col..=last_col {
        if r.remaining() < 6 {
            break;
        }
        let xf = r.u16()?;
        let value = r.rk()?;
        cells.push(CellRecord::value(
            row,
            col,
            services.xf_table.format_index(xf),
            CellValue::Number(value),
        ));
    }
    Ok(cells)
}

/// MULBLANK: row(2) + first_col(2) + [xf(2)]* + last_col(2)
fn parse_mulblank(body: &[u8], services: &WorkbookServices) -> XlsResult<Vec<CellRecord>> {
    let (row, first_col, last_col, block) = split_multi(body, "MULBLANK")?;
    let mut r = ByteReader::new(block);
    let mut cells = Vec::with_capacity((last_col - first_col) as usize + 1);
    for col in first_col..=last_col {
        if r.remaining() < 2 {
            break;
        }
        let xf = r.u16()?;
        cells.push(CellRecord::value(
            row,
            col,
            services.xf_table.format_index(xf),
            CellValue::Empty,
        ));
    }
    Ok(cells)
}

/// FONT:
///   0  u16  dyHeight   (twips)
///   2  u16  grbit      (bit 1 = italic)
///   4  u16  icv
///   6  u16  bls        (400 = normal, 700 = bold)
///   8  u16  sss
///  10  u8   uls, bFamily, bCharSet, reserved
///  14  ...  font name
fn parse_font(body: &[u8], codec: &TextCodec, codepage: u16) -> XlsResult<Font> {
    if body.len() < 15 {
        return Err(XlsError::Parse("FONT record too short".into()));
    }
    let mut r = ByteReader::new(body);
    let height_twips = r.u16()?;
    let grbit = r.u16()?;
    let _icv = r.u16()?;
    let bls = r.u16()?;
    r.skip(6)?;
    let name = (codec.short)(&mut r, codepage).unwrap_or_default();

    Ok(Font {
        name,
        height_twips,
        bold: bls >= 700,
        italic: grbit & 0x0002 != 0,
    })
}

const XF_STYLE: u16 = 0x0004;

/// XF: ifnt(2) + ifmt(2) + type/protection(2) + alignment, border and fill data
fn parse_xf(body: &[u8], min_len: usize) -> XlsResult<Xf> {
    if body.len() < min_len {
        return Err(XlsError::Parse(format!(
            "XF record too short: {} bytes (expected {min_len})",
            body.len()
        )));
    }
    let mut r = ByteReader::new(body);
    let font_index = r.u16()?;
    let format_index = r.u16()?;
    let type_prot = r.u16()?;
    Ok(Xf {
        font_index,
        format_index,
        is_style: type_prot & XF_STYLE != 0,
    })
}

const NAME_BUILTIN: u16 = 0x0020;

/// NAME: grbit(2) + chKey(1) + cch(1) + cce(2) + ixals(2) + itab(2)
/// + 4 menu/description lengths, then the name
fn parse_name(body: &[u8], codec: &TextCodec, codepage: u16) -> XlsResult<DefinedName> {
    let mut r = ByteReader::new(body);
    let grbit = r.u16()?;
    let _key = r.u8()?;
    let cch = r.u8()? as usize;
    let _cce = r.u16()?;
    let _ixals = r.u16()?;
    let itab = r.u16()?;
    r.skip(4)?;
    let raw = (codec.chars)(&mut r, cch, codepage)?;

    let builtin = grbit & NAME_BUILTIN != 0;
    let name = match raw.chars().next() {
        Some(code) if builtin && cch == 1 => builtin_name(code as u32 as u8)
            .map(str::to_string)
            .unwrap_or(raw),
        _ => raw,
    };

    Ok(DefinedName {
        name,
        sheet_index: itab.checked_sub(1),
        builtin,
    })
}

/// BOUNDSHEET: offset(4) + visibility(1) + type(1) + name
fn parse_boundsheet(body: &[u8], codec: &TextCodec, codepage: u16) -> XlsResult<SheetInfo> {
    let mut r = ByteReader::new(body);
    let offset = r.u32()?;
    let visibility = SheetVisibility::from_code(r.u8()?);
    let kind = SheetKind::from_code(r.u8()?);
    let name = (codec.short)(&mut r, codepage)?;
    Ok(SheetInfo {
        name,
        kind,
        visibility,
        offset,
    })
}
