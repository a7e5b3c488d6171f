//! XLS (BIFF5/BIFF8) reader.
//!
//! Opens a Compound File Binary (CFB/OLE2) container, reads the `Workbook`
//! stream, picks a [`RecordLoader`] from the first BOF record and drives a
//! single sequential decode pass, delivering [`SheetEvent`]s to a listener.

use std::io::{Read, Seek};
use std::path::Path;

use crate::biff::parser::ByteReader;
use crate::biff::{records, BiffVersion, SubstreamKind};
use crate::emitter::{DeferredCellEmitter, SheetEvent};
use crate::error::{XlsError, XlsResult};
use crate::loader::{Biff5Loader, Biff8Loader, DecodedRecord, RecordLoader};
use crate::services::{DefinedName, SheetInfo, WorkbookServices};

/// Options for a decode pass
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Drop BLANK/MULBLANK cells before they reach the emitter
    pub skip_blanks: bool,
    /// Only deliver events for this sheet (BOUNDSHEET order)
    pub sheet: Option<usize>,
}

/// Receives the events of a decode pass in stream order.
pub trait CellListener {
    fn on_event(&mut self, event: SheetEvent) -> XlsResult<()>;
}

impl CellListener for Vec<SheetEvent> {
    fn on_event(&mut self, event: SheetEvent) -> XlsResult<()> {
        self.push(event);
        Ok(())
    }
}

/// Adapts a closure into a [`CellListener`].
pub struct FnListener<F>(pub F);

impl<F> CellListener for FnListener<F>
where
    F: FnMut(SheetEvent) -> XlsResult<()>,
{
    fn on_event(&mut self, event: SheetEvent) -> XlsResult<()> {
        (self.0)(event)
    }
}

/// Workbook-level facts gathered during a pass
#[derive(Debug, Clone)]
pub struct WorkbookSummary {
    pub version: BiffVersion,
    /// BOUNDSHEET entries; a sheet id in [`SheetEvent`]s indexes this list
    pub sheets: Vec<SheetInfo>,
    pub names: Vec<DefinedName>,
    pub date_1904: bool,
    pub codepage: Option<u16>,
}

/// XLS file reader.
#[derive(Debug, Clone, Default)]
pub struct XlsReader {
    options: ReadOptions,
}

/// Where the pass currently is in the substream structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Start,
    Globals,
    /// After an EOF, expecting the next top-level BOF
    Between,
    Worksheet { sheet: usize },
    /// Inside a substream whose records are not decoded
    Skipped { depth: u32, resume: Resume },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    Globals,
    Between,
    Worksheet(usize),
}

impl From<Resume> for Section {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::Globals => Section::Globals,
            Resume::Between => Section::Between,
            Resume::Worksheet(sheet) => Section::Worksheet { sheet },
        }
    }
}

impl XlsReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ReadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Read an XLS file from a filesystem path.
    pub fn read_file<P, L>(&self, path: P, listener: &mut L) -> XlsResult<WorkbookSummary>
    where
        P: AsRef<Path>,
        L: CellListener + ?Sized,
    {
        let file = std::fs::File::open(path.as_ref())?;
        self.read(file, listener)
    }

    /// Read an XLS file from any `Read + Seek` source.
    pub fn read<R, L>(&self, reader: R, listener: &mut L) -> XlsResult<WorkbookSummary>
    where
        R: Read + Seek,
        L: CellListener + ?Sized,
    {
        let mut cfb = cfb::CompoundFile::open(reader)?;

        // BIFF5 files use "Book" rather than "Workbook"
        let stream_path = if cfb.exists("/Workbook") {
            "/Workbook"
        } else if cfb.exists("/Book") {
            "/Book"
        } else {
            return Err(XlsError::InvalidFormat(
                "no Workbook or Book stream found in CFB".into(),
            ));
        };

        let mut stream_data = Vec::new();
        {
            let mut stream = cfb.open_stream(stream_path)?;
            stream.read_to_end(&mut stream_data)?;
        }

        self.read_stream(&stream_data, listener)
    }

    /// Decode a bare workbook stream (no CFB container).
    pub fn read_stream<L>(&self, data: &[u8], listener: &mut L) -> XlsResult<WorkbookSummary>
    where
        L: CellListener + ?Sized,
    {
        let loader = select_loader(data, WorkbookServices::new())?;
        self.run(loader, listener)
    }

    /// Drive `loader` to the end of its stream.
    pub fn run<L>(
        &self,
        mut loader: Box<dyn RecordLoader + '_>,
        listener: &mut L,
    ) -> XlsResult<WorkbookSummary>
    where
        L: CellListener + ?Sized,
    {
        let mut section = Section::Start;
        let mut next_sheet = 0usize;

        while !loader.eof() {
            let header = match loader.read_header() {
                Ok(header) => header,
                // Padding after the last EOF
                Err(err) if section == Section::Between => {
                    log::debug!("ignoring trailing bytes: {err}");
                    break;
                }
                Err(err) => return Err(err),
            };

            if let Section::Skipped { depth, resume } = section {
                loader.load_unsupported_record()?;
                section = match header.id {
                    records::BOF => Section::Skipped {
                        depth: depth + 1,
                        resume,
                    },
                    records::EOF if depth <= 1 => resume.into(),
                    records::EOF => Section::Skipped {
                        depth: depth - 1,
                        resume,
                    },
                    _ => section,
                };
                continue;
            }

            section = match section {
                Section::Start | Section::Between => {
                    if header.id != records::BOF {
                        loader.load_unsupported_record()?;
                        continue;
                    }
                    let (record, _) = loader.load_record(section == Section::Start)?;
                    let DecodedRecord::Bof(bof) = record else {
                        return Err(XlsError::InvalidFormat(format!(
                            "BOF at offset {} could not be decoded",
                            header.offset
                        )));
                    };
                    match bof.kind {
                        SubstreamKind::Globals if section == Section::Start => {
                            log::debug!("workbook globals ({})", loader.version());
                            Section::Globals
                        }
                        SubstreamKind::Worksheet => {
                            let sheet = next_sheet;
                            next_sheet += 1;
                            log::debug!("worksheet substream {sheet} at offset {}", header.offset);
                            loader.switch_sheet()?;
                            loader.emitter().start_reading(sheet);
                            Section::Worksheet { sheet }
                        }
                        kind => {
                            if section == Section::Between {
                                next_sheet += 1;
                            }
                            log::debug!("skipping {kind:?} substream at offset {}", header.offset);
                            Section::Skipped {
                                depth: 1,
                                resume: Resume::Between,
                            }
                        }
                    }
                }
                Section::Globals => match loader.load_record(true)?.0 {
                    DecodedRecord::Global(record) => {
                        loader.services_mut().absorb(record)?;
                        section
                    }
                    DecodedRecord::Eof => Section::Between,
                    DecodedRecord::Bof(_) => Section::Skipped {
                        depth: 1,
                        resume: Resume::Globals,
                    },
                    _ => section,
                },
                Section::Worksheet { sheet } => {
                    let (record, _row) = loader.load_record(false)?;
                    self.dispatch(loader.as_mut(), sheet, record)?
                }
                Section::Skipped { .. } => section,
            };

            self.deliver(loader.emitter(), listener)?;
        }

        loader.emitter().flush();
        self.deliver(loader.emitter(), listener)?;

        let services = loader.services();
        Ok(WorkbookSummary {
            version: loader.version(),
            sheets: services.sheets.clone(),
            names: services.names.to_vec(),
            date_1904: services.date_1904,
            codepage: services.codepage,
        })
    }

    /// Apply one worksheet record; returns the section that follows it.
    fn dispatch(
        &self,
        loader: &mut dyn RecordLoader,
        sheet: usize,
        record: DecodedRecord,
    ) -> XlsResult<Section> {
        let emitter = loader.emitter();
        match record {
            DecodedRecord::Cell(cell) => {
                if !(self.options.skip_blanks && cell.is_blank()) {
                    emitter.read(sheet, cell);
                }
            }
            DecodedRecord::Cells(cells) => {
                for cell in cells {
                    if !(self.options.skip_blanks && cell.is_blank()) {
                        emitter.read(sheet, cell);
                    }
                }
            }
            DecodedRecord::StringResult(text) => emitter.attach_string(text),
            DecodedRecord::Array(array) => emitter.register_array(array)?,
            DecodedRecord::Table(table) => emitter.register_table(table)?,
            DecodedRecord::Eof => {
                emitter.flush();
                return Ok(Section::Between);
            }
            // Embedded chart or other nested substream
            DecodedRecord::Bof(_) => {
                return Ok(Section::Skipped {
                    depth: 1,
                    resume: Resume::Worksheet(sheet),
                })
            }
            DecodedRecord::Row(_)
            | DecodedRecord::Global(_)
            | DecodedRecord::Unsupported { .. } => {}
        }
        Ok(Section::Worksheet { sheet })
    }

    fn deliver<L>(&self, emitter: &mut DeferredCellEmitter, listener: &mut L) -> XlsResult<()>
    where
        L: CellListener + ?Sized,
    {
        for event in emitter.drain_events() {
            let sheet = match &event {
                SheetEvent::SessionStart { sheet } => *sheet,
                SheetEvent::CellValue(cell) => cell.sheet,
            };
            if self.options.sheet.map_or(true, |wanted| wanted == sheet) {
                listener.on_event(event)?;
            }
        }
        Ok(())
    }
}

/// Pick the loader for the revision named in the stream's first BOF record.
pub fn select_loader(
    data: &[u8],
    services: WorkbookServices,
) -> XlsResult<Box<dyn RecordLoader + '_>> {
    let mut r = ByteReader::new(data);
    let (id, len) = match (r.u16(), r.u16()) {
        (Ok(id), Ok(len)) => (id, len),
        _ => return Err(XlsError::InvalidFormat("workbook stream is empty".into())),
    };
    if id != records::BOF || len < 4 {
        return Err(XlsError::InvalidFormat(format!(
            "workbook stream must start with BOF, found record 0x{id:04X}"
        )));
    }
    let version = r.u16()?;

    let emitter = DeferredCellEmitter::new();
    match BiffVersion::from_bof_version(version) {
        Some(BiffVersion::Biff8) => {
            log::debug!("selected BIFF8 loader");
            Ok(Box::new(Biff8Loader::new(data, services, emitter)))
        }
        Some(BiffVersion::Biff5) => {
            log::debug!("selected BIFF5 loader");
            Ok(Box::new(Biff5Loader::new(data, services, emitter)))
        }
        None => Err(XlsError::UnsupportedVersion(format!(
            "BOF version 0x{version:04X} (expected 0x0500 or 0x0600)"
        ))),
    }
}
