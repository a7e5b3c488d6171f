//! BIFF5/BIFF7 (Excel 5.0/95) loader.
//!
//! Strings are 8-bit byte strings in the workbook code page and there is
//! no shared string table. Text is decoded with the CODEPAGE seen so far,
//! or windows-1252 before one appears.

use super::common::{LoaderState, Revision, TextCodec};
use super::{DecodedRecord, RecordLoader};
use crate::biff::{strings, BiffVersion, RecordHeader};
use crate::emitter::DeferredCellEmitter;
use crate::error::XlsResult;
use crate::services::WorkbookServices;

const BIFF5: Revision = Revision {
    codec: TextCodec {
        short: strings::read_byte_string_u8,
        long: strings::read_byte_string_u16,
        chars: strings::read_byte_string,
    },
    xf_len: 16,
    shared_strings: false,
};

/// Loader for workbooks whose BOF version is `0x0500`.
#[derive(Debug)]
pub struct Biff5Loader<'a> {
    state: LoaderState<'a>,
}

impl<'a> Biff5Loader<'a> {
    pub fn new(stream: &'a [u8], services: WorkbookServices, emitter: DeferredCellEmitter) -> Self {
        Self {
            state: LoaderState::new(stream, services, emitter),
        }
    }
}

impl RecordLoader for Biff5Loader<'_> {
    fn version(&self) -> BiffVersion {
        BiffVersion::Biff5
    }

    fn read_header(&mut self) -> XlsResult<RecordHeader> {
        self.state.stream.read_header()
    }

    fn load_record(&mut self, in_globals: bool) -> XlsResult<(DecodedRecord, Option<u32>)> {
        self.state.load(&BIFF5, in_globals)
    }

    fn load_unsupported_record(&mut self) -> XlsResult<DecodedRecord> {
        self.state.skip()
    }

    fn eof(&self) -> bool {
        self.state.stream.at_end()
    }

    fn emitter(&mut self) -> &mut DeferredCellEmitter {
        &mut self.state.emitter
    }

    fn services(&self) -> &WorkbookServices {
        &self.state.services
    }

    fn services_mut(&mut self) -> &mut WorkbookServices {
        &mut self.state.services
    }
}
