//! BIFF8 (Excel 97-2003) loader.

use super::common::{LoaderState, Revision, TextCodec};
use super::{DecodedRecord, RecordLoader};
use crate::biff::parser::ByteReader;
use crate::biff::{strings, BiffVersion, RecordHeader};
use crate::emitter::DeferredCellEmitter;
use crate::error::XlsResult;
use crate::services::WorkbookServices;

/// XLUnicodeString text, 20-byte XF records, SST-backed labels.
const BIFF8: Revision = Revision {
    codec: TextCodec {
        short: short_string,
        long: unicode_string,
        chars: unicode_chars,
    },
    xf_len: 20,
    shared_strings: true,
};

// BIFF8 text is Unicode; the code page does not apply.

fn short_string(r: &mut ByteReader<'_>, _codepage: u16) -> XlsResult<String> {
    strings::read_short_string(r)
}

fn unicode_string(r: &mut ByteReader<'_>, _codepage: u16) -> XlsResult<String> {
    strings::read_unicode_string(r)
}

fn unicode_chars(r: &mut ByteReader<'_>, count: usize, _codepage: u16) -> XlsResult<String> {
    strings::read_unicode_chars(r, count)
}

/// Loader for workbooks whose BOF version is `0x0600`.
#[derive(Debug)]
pub struct Biff8Loader<'a> {
    state: LoaderState<'a>,
}

impl<'a> Biff8Loader<'a> {
    pub fn new(stream: &'a [u8], services: WorkbookServices, emitter: DeferredCellEmitter) -> Self {
        Self {
            state: LoaderState::new(stream, services, emitter),
        }
    }
}

impl RecordLoader for Biff8Loader<'_> {
    fn version(&self) -> BiffVersion {
        BiffVersion::Biff8
    }

    fn read_header(&mut self) -> XlsResult<RecordHeader> {
        self.state.stream.read_header()
    }

    fn load_record(&mut self, in_globals: bool) -> XlsResult<(DecodedRecord, Option<u32>)> {
        self.state.load(&BIFF8, in_globals)
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
