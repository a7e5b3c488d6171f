//! BIFF5/BIFF8 record type constants.
//!
//! Reference: [MS-XLS] §2.3, Record Enumeration

// ── Stream structure ────────────────────────────────────────────────────
pub const BOF: u16 = 0x0809;
pub const EOF: u16 = 0x000A;
pub const CONTINUE: u16 = 0x003C;
pub const FILEPASS: u16 = 0x002F; // Encryption header; everything after it is encrypted

// ── Workbook globals ────────────────────────────────────────────────────
pub const BOUNDSHEET: u16 = 0x0085; // Sheet name, type, visibility, stream offset
pub const SST: u16 = 0x00FC; // Shared String Table (BIFF8 only)
pub const DATEMODE: u16 = 0x0022; // 1900 vs 1904 date system
pub const CODEPAGE: u16 = 0x0042; // Code page for 8-bit strings
pub const FONT: u16 = 0x0031; // Font definition
pub const XF: u16 = 0x00E0; // Extended Format (cell format record)
pub const NAME: u16 = 0x0018; // Defined name

// ── Cell records ────────────────────────────────────────────────────────
pub const LABELSST: u16 = 0x00FD; // Cell containing SST string index (BIFF8)
pub const LABEL: u16 = 0x0204; // Cell with inline string
pub const RSTRING: u16 = 0x00D6; // Rich-text inline string
pub const NUMBER: u16 = 0x0203; // Cell with IEEE 754 double
pub const RK: u16 = 0x027E; // Cell with compressed number (RK encoding)
pub const MULRK: u16 = 0x00BD; // Multiple RK values in one row
pub const BLANK: u16 = 0x0201; // Empty cell with formatting
pub const MULBLANK: u16 = 0x00BE; // Multiple blanks with formatting
pub const BOOLERR: u16 = 0x0205; // Boolean or error cell
pub const FORMULA: u16 = 0x0006; // Formula cell with cached result

// ── Records trailing a FORMULA ──────────────────────────────────────────
pub const STRING: u16 = 0x0207; // Cached string result for preceding FORMULA
pub const ARRAY: u16 = 0x0221; // Array formula body and extent
pub const TABLE: u16 = 0x0236; // Data table input configuration
pub const SHRFMLA: u16 = 0x04BC; // Shared formula (not indexed; members resolve as unresolved)

// ── Sheet structure ─────────────────────────────────────────────────────
pub const ROW: u16 = 0x0208; // Row height, visibility, default format

// ── BOF subtypes (the `dt` field) ───────────────────────────────────────
pub const BOF_WORKBOOK_GLOBALS: u16 = 0x0005;
pub const BOF_VB_MODULE: u16 = 0x0006;
pub const BOF_WORKSHEET: u16 = 0x0010;
pub const BOF_CHART: u16 = 0x0020;
pub const BOF_MACRO: u16 = 0x0040;
pub const BOF_WORKSPACE: u16 = 0x0100;

// ── BOF version field ───────────────────────────────────────────────────
pub const BIFF5_VERSION: u16 = 0x0500; // Also written by BIFF7 (Excel 95)
pub const BIFF8_VERSION: u16 = 0x0600;

// ── Formula tokens that point at an anchor cell ─────────────────────────
pub const PTG_EXP: u8 = 0x01;
pub const PTG_TBL: u8 = 0x02;
