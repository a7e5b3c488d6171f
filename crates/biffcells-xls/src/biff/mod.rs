//! BIFF record framing.
//!
//! A BIFF5/BIFF8 stream is a sequence of records, each with a 4-byte header
//! (2 bytes record type + 2 bytes body length) followed by the body.
//!
//! CONTINUE records (type 0x003C) extend the body of the preceding record
//! beyond the 8224-byte per-record limit. [`RecordStream`] merges them into
//! the body it returns and keeps the offset where each one starts: a BIFF8
//! string split across a boundary restarts with a fresh flags byte.

pub mod parser;
pub mod records;
pub mod strings;

use std::fmt;

use crate::error::{XlsError, XlsResult};
use parser::ByteReader;

/// Header of one record as it appears in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record type ID (e.g. `records::NUMBER`).
    pub id: u16,
    /// Body length of this record alone (CONTINUE bodies not included).
    pub len: u16,
    /// Byte offset of this header in the stream.
    pub offset: u64,
}

/// A record body with its CONTINUE bodies appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBody {
    pub data: Vec<u8>,
    /// Offsets into `data` where each CONTINUE body starts
    pub continues: Vec<usize>,
}

impl RecordBody {
    /// A cursor over the body that knows where the continuations start.
    pub fn reader(&self) -> ByteReader<'_> {
        ByteReader::with_continues(&self.data, &self.continues)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Sequential reader over a whole workbook stream.
///
/// Usage alternates [`read_header`](Self::read_header) with either
/// [`read_body`](Self::read_body) or [`skip_body`](Self::skip_body).
#[derive(Debug)]
pub struct RecordStream<'a> {
    data: &'a [u8],
    pos: usize,
    current: Option<RecordHeader>,
}

impl<'a> RecordStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            current: None,
        }
    }

    /// True once every byte of the stream has been consumed.
    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// The header read last whose body has not been consumed yet.
    pub fn current(&self) -> Option<RecordHeader> {
        self.current
    }

    /// Decode the next record header and advance past it.
    pub fn read_header(&mut self) -> XlsResult<RecordHeader> {
        if let Some(pending) = self.current {
            return Err(XlsError::Parse(format!(
                "body of record 0x{:04X} at offset {} was not consumed",
                pending.id, pending.offset
            )));
        }
        let header = self.peek_header().ok_or_else(|| {
            XlsError::Parse(format!(
                "truncated record header at offset {} ({} bytes left)",
                self.pos,
                self.data.len().saturating_sub(self.pos)
            ))
        })?;
        self.pos += 4;
        self.current = Some(header);
        Ok(header)
    }

    /// Consume the current record's body plus any CONTINUE records that follow it.
    pub fn read_body(&mut self) -> XlsResult<(RecordHeader, RecordBody)> {
        let header = self.take_current()?;
        let mut body = RecordBody {
            data: self.take_bytes(header)?.to_vec(),
            continues: Vec::new(),
        };

        while let Some(next) = self.peek_header() {
            if next.id != records::CONTINUE {
                break;
            }
            self.pos += 4;
            body.continues.push(body.data.len());
            body.data.extend_from_slice(self.take_bytes(next)?);
        }

        Ok((header, body))
    }

    /// Consume the current record's body (and its CONTINUE records) without copying.
    pub fn skip_body(&mut self) -> XlsResult<(RecordHeader, usize)> {
        let header = self.take_current()?;
        let mut len = self.take_bytes(header)?.len();

        while let Some(next) = self.peek_header() {
            if next.id != records::CONTINUE {
                break;
            }
            self.pos += 4;
            len += self.take_bytes(next)?.len();
        }

        Ok((header, len))
    }

    fn take_current(&mut self) -> XlsResult<RecordHeader> {
        self.current
            .take()
            .ok_or_else(|| XlsError::Parse("record body requested before its header".into()))
    }

    fn take_bytes(&mut self, header: RecordHeader) -> XlsResult<&'a [u8]> {
        let len = header.len as usize;
        let end = self.pos + len;
        if end > self.data.len() {
            return Err(XlsError::Parse(format!(
                "truncated record 0x{:04X} at offset {}: need {} bytes, have {}",
                header.id,
                header.offset,
                len,
                self.data.len() - self.pos
            )));
        }
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn peek_header(&self) -> Option<RecordHeader> {
        let raw = self.data.get(self.pos..self.pos + 4)?;
        Some(RecordHeader {
            id: u16::from_le_bytes([raw[0], raw[1]]),
            len: u16::from_le_bytes([raw[2], raw[3]]),
            offset: self.pos as u64,
        })
    }
}

/// Binary format revision, taken from the BOF version field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiffVersion {
    /// Excel 5.0/95 (BOF version 0x0500)
    Biff5,
    /// Excel 97-2003 (BOF version 0x0600)
    Biff8,
}

impl BiffVersion {
    pub fn from_bof_version(version: u16) -> Option<Self> {
        match version {
            records::BIFF5_VERSION => Some(BiffVersion::Biff5),
            records::BIFF8_VERSION => Some(BiffVersion::Biff8),
            _ => None,
        }
    }
}

impl fmt::Display for BiffVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiffVersion::Biff5 => write!(f, "BIFF5"),
            BiffVersion::Biff8 => write!(f, "BIFF8"),
        }
    }
}

/// What a BOF..EOF substream contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstreamKind {
    Globals,
    Worksheet,
    Chart,
    Macro,
    VbModule,
    Workspace,
    Other(u16),
}

impl SubstreamKind {
    fn from_dt(dt: u16) -> Self {
        match dt {
            records::BOF_WORKBOOK_GLOBALS => SubstreamKind::Globals,
            records::BOF_WORKSHEET => SubstreamKind::Worksheet,
            records::BOF_CHART => SubstreamKind::Chart,
            records::BOF_MACRO => SubstreamKind::Macro,
            records::BOF_VB_MODULE => SubstreamKind::VbModule,
            records::BOF_WORKSPACE => SubstreamKind::Workspace,
            other => SubstreamKind::Other(other),
        }
    }
}

/// Decoded BOF record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BofRecord {
    /// Raw version field: `0x0600` for BIFF8, `0x0500` for BIFF5/7
    pub version: u16,
    pub kind: SubstreamKind,
}

/// Extract the BOF record fields from a record body.
pub fn parse_bof(data: &[u8]) -> XlsResult<BofRecord> {
    if data.len() < 4 {
        return Err(XlsError::InvalidFormat("BOF record too short".into()));
    }
    let mut r = ByteReader::new(data);
    let version = r.u16()?;
    let dt = r.u16()?;
    Ok(BofRecord {
        version,
        kind: SubstreamKind::from_dt(dt),
    })
}
