//! Workbook-global state shared by every sheet of a decode pass.
//!
//! The globals substream (SST, FONT, XF, NAME, BOUNDSHEET, ...) is decoded
//! into [`GlobalRecord`]s by the loader and absorbed here; worksheet
//! decoders then read from it.

use std::fmt;

use biffcells_core::SharedString;

use crate::biff::{strings, RecordHeader};
use crate::error::{XlsError, XlsResult};

/// CODEPAGE value for UTF-16
const UTF16_CODEPAGE: u16 = 1200;

/// Strings referenced by LABELSST cells
#[derive(Debug, Clone, Default)]
pub struct SharedStringTable {
    strings: Vec<SharedString>,
}

impl SharedStringTable {
    pub fn new(strings: Vec<SharedString>) -> Self {
        Self { strings }
    }

    pub fn get(&self, index: usize) -> Option<&SharedString> {
        self.strings.get(index)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// A FONT record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub name: String,
    /// Height in twips (1/20 pt)
    pub height_twips: u16,
    pub bold: bool,
    pub italic: bool,
}

/// Fonts in record order.
///
/// XF records address fonts with an index that skips 4, a quirk kept from
/// the earliest BIFF versions; [`get`](Self::get) applies it.
#[derive(Debug, Clone, Default)]
pub struct FontList {
    fonts: Vec<Font>,
}

impl FontList {
    pub fn push(&mut self, font: Font) {
        self.fonts.push(font);
    }

    /// Look a font up by its XF font index.
    pub fn get(&self, xf_font_index: u16) -> Option<&Font> {
        let i = match xf_font_index {
            4 => return None,
            i if i > 4 => i - 1,
            i => i,
        };
        self.fonts.get(i as usize)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// The parts of an XF record the decoder needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xf {
    pub font_index: u16,
    pub format_index: u16,
    pub is_style: bool,
}

/// Maps the XF index stored in each cell record to a number format id.
#[derive(Debug, Clone, Default)]
pub struct XfTable {
    xfs: Vec<Xf>,
}

impl XfTable {
    pub fn push(&mut self, xf: Xf) {
        self.xfs.push(xf);
    }

    pub fn get(&self, xf_index: u16) -> Option<&Xf> {
        self.xfs.get(xf_index as usize)
    }

    /// Number format id for `xf_index`; 0 (General) if the XF is unknown.
    pub fn format_index(&self, xf_index: u16) -> u16 {
        self.get(xf_index).map_or(0, |xf| xf.format_index)
    }

    pub fn len(&self) -> usize {
        self.xfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xfs.is_empty()
    }
}

/// A NAME record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    /// Zero-based sheet the name is local to; `None` for workbook scope
    pub sheet_index: Option<u16>,
    pub builtin: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: Vec<DefinedName>,
}

impl NameTable {
    pub fn push(&mut self, name: DefinedName) {
        self.names.push(name);
    }

    pub fn iter(&self) -> impl Iterator<Item = &DefinedName> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn to_vec(&self) -> Vec<DefinedName> {
        self.names.clone()
    }
}

/// Display name for a built-in NAME code (`Print_Area`, ...).
pub fn builtin_name(code: u8) -> Option<&'static str> {
    Some(match code {
        0x00 => "Consolidate_Area",
        0x01 => "Auto_Open",
        0x02 => "Auto_Close",
        0x03 => "Extract",
        0x04 => "Database",
        0x05 => "Criteria",
        0x06 => "Print_Area",
        0x07 => "Print_Titles",
        0x08 => "Recorder",
        0x09 => "Data_Form",
        0x0A => "Auto_Activate",
        0x0B => "Auto_Deactivate",
        0x0C => "Sheet_Title",
        0x0D => "_FilterDatabase",
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    Worksheet,
    Macro,
    Chart,
    VbModule,
    Other(u8),
}

impl SheetKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => SheetKind::Worksheet,
            0x01 => SheetKind::Macro,
            0x02 => SheetKind::Chart,
            0x06 => SheetKind::VbModule,
            other => SheetKind::Other(other),
        }
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetKind::Worksheet => write!(f, "worksheet"),
            SheetKind::Macro => write!(f, "macro"),
            SheetKind::Chart => write!(f, "chart"),
            SheetKind::VbModule => write!(f, "vb-module"),
            SheetKind::Other(code) => write!(f, "other(0x{code:02X})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetVisibility {
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetVisibility {
    pub fn from_code(code: u8) -> Self {
        match code & 0x03 {
            0 => SheetVisibility::Visible,
            1 => SheetVisibility::Hidden,
            _ => SheetVisibility::VeryHidden,
        }
    }
}

impl fmt::Display for SheetVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetVisibility::Visible => write!(f, "visible"),
            SheetVisibility::Hidden => write!(f, "hidden"),
            SheetVisibility::VeryHidden => write!(f, "very hidden"),
        }
    }
}

/// A BOUNDSHEET record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub name: String,
    pub kind: SheetKind,
    pub visibility: SheetVisibility,
    /// Absolute byte offset of the sheet's BOF in the workbook stream
    pub offset: u32,
}

/// Decrypts record bodies that follow a FILEPASS record.
pub trait Decryptor: fmt::Debug {
    /// Initialize from the FILEPASS body. Fails if the scheme (or the
    /// password) is not supported.
    fn begin(&mut self, filepass: &[u8]) -> XlsResult<()>;

    fn decrypt(&mut self, header: &RecordHeader, body: &mut [u8]) -> XlsResult<()>;
}

/// The identity decryptor. Refuses encrypted workbooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl Decryptor for PlainText {
    fn begin(&mut self, _filepass: &[u8]) -> XlsResult<()> {
        Err(XlsError::Encrypted)
    }

    fn decrypt(&mut self, _header: &RecordHeader, _body: &mut [u8]) -> XlsResult<()> {
        Ok(())
    }
}

/// A decoded record from the globals substream
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalRecord {
    SharedStrings(Vec<SharedString>),
    Font(Font),
    Xf(Xf),
    Name(DefinedName),
    BoundSheet(SheetInfo),
    DateMode { date_1904: bool },
    CodePage(u16),
    FilePass(Vec<u8>),
}

/// Everything the worksheet decoders look up outside the current record
#[derive(Debug)]
pub struct WorkbookServices {
    pub shared_strings: SharedStringTable,
    pub fonts: FontList,
    pub xf_table: XfTable,
    pub names: NameTable,
    pub sheets: Vec<SheetInfo>,
    pub date_1904: bool,
    pub codepage: Option<u16>,
    pub decryption: Box<dyn Decryptor>,
    /// Set once a FILEPASS record was accepted
    pub encrypted: bool,
}

impl Default for WorkbookServices {
    fn default() -> Self {
        Self::with_decryptor(Box::new(PlainText))
    }
}

impl WorkbookServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decryptor(decryption: Box<dyn Decryptor>) -> Self {
        Self {
            shared_strings: SharedStringTable::default(),
            fonts: FontList::default(),
            xf_table: XfTable::default(),
            names: NameTable::default(),
            sheets: Vec::new(),
            date_1904: false,
            codepage: None,
            decryption,
            encrypted: false,
        }
    }

    /// Fold one globals record into the service tables.
    pub fn absorb(&mut self, record: GlobalRecord) -> XlsResult<()> {
        match record {
            GlobalRecord::SharedStrings(strings) => {
                log::debug!("shared string table: {} entries", strings.len());
                self.shared_strings = SharedStringTable::new(strings);
            }
            GlobalRecord::Font(font) => self.fonts.push(font),
            GlobalRecord::Xf(xf) => self.xf_table.push(xf),
            GlobalRecord::Name(name) => self.names.push(name),
            GlobalRecord::BoundSheet(info) => self.sheets.push(info),
            GlobalRecord::DateMode { date_1904 } => self.date_1904 = date_1904,
            GlobalRecord::CodePage(cp) => {
                // 1200 is UTF-16, written by BIFF8 where text carries its own encoding
                if cp != UTF16_CODEPAGE && strings::encoding_for_codepage(cp).is_none() {
                    log::warn!("unknown code page {cp}, decoding 8-bit text as Latin-1");
                }
                self.codepage = Some(cp);
            }
            GlobalRecord::FilePass(body) => {
                self.decryption.begin(&body)?;
                self.encrypted = true;
            }
        }
        Ok(())
    }

    /// Run a record body through the decryption context.
    pub fn decrypt(&mut self, header: &RecordHeader, body: &mut [u8]) -> XlsResult<()> {
        if self.encrypted {
            self.decryption.decrypt(header, body)?;
        }
        Ok(())
    }

    /// The shared string at `index`, or an empty string if the index is out of range.
    pub fn shared_string(&self, index: usize) -> SharedString {
        match self.shared_strings.get(index) {
            Some(s) => s.clone(),
            None => {
                log::warn!(
                    "SST index {index} out of range ({} strings); using an empty string",
                    self.shared_strings.len()
                );
                SharedString::default()
            }
        }
    }
}
