//! Tests for substream structure: sheet switches, skipped substreams,
//! revisions and the CFB container.

use std::io::{Cursor, Write};

use crate::{
    cell_at, cells, exp, num_result, read, read_with, StreamBuilder, BOF_CHART, BOF_SHEET,
};
use biffcells_core::{CellExtent, CellRef, CellValue, FormulaKind};
use biffcells_xls::biff::{records, BiffVersion};
use biffcells_xls::{ReadOptions, SheetEvent, XlsError, XlsReader};
use pretty_assertions::assert_eq;

#[test]
fn test_xls_last_cell_is_flushed_before_next_sheet() {
    let data = StreamBuilder::biff8()
        .globals(&[("One", 0), ("Two", 0)])
        .eof()
        .bof(BOF_SHEET)
        .number(0, 0, 1.0)
        .number(0, 1, 2.0)
        .eof()
        .bof(BOF_SHEET)
        .number(0, 0, 3.0)
        .eof()
        .build();
    let (events, _) = read(&data).unwrap();

    let shape: Vec<String> = events
        .iter()
        .map(|e| match e {
            SheetEvent::SessionStart { sheet } => format!("start {sheet}"),
            SheetEvent::CellValue(c) => format!("{} {} {}", c.sheet, c.cell(), c.value),
        })
        .collect();
    assert_eq!(
        shape,
        vec!["start 0", "0 A1 1", "0 B1 2", "start 1", "1 A1 3"]
    );
}

#[test]
fn test_xls_indices_reset_between_sheets() {
    let extent = CellExtent::new(0, 0, 1, 0);
    let data = StreamBuilder::biff8()
        .globals(&[("One", 0), ("Two", 0)])
        .eof()
        .bof(BOF_SHEET)
        .formula(0, 0, num_result(1.0), &exp(0, 0))
        .array(extent, &[0x1E, 0x01, 0x00])
        .eof()
        .bof(BOF_SHEET)
        // Same coordinates as sheet 0's array member, but no array here
        .formula(1, 0, num_result(2.0), &exp(0, 0))
        .eof()
        .build();
    let (events, _) = read(&data).unwrap();

    let value = cell_at(&events, 1, "A2").value;
    assert_eq!(
        value.as_formula().unwrap().kind,
        FormulaKind::Unresolved {
            anchor: CellRef::new(0, 0)
        }
    );
}

#[test]
fn test_xls_chart_substreams_are_skipped() {
    let data = StreamBuilder::biff8()
        .globals(&[("Data", 0), ("Chart1", 2), ("More", 0)])
        .eof()
        .bof(BOF_SHEET)
        .number(0, 0, 1.0)
        // Embedded chart inside the worksheet
        .bof(BOF_CHART)
        .number(9, 9, -1.0)
        .eof()
        .number(1, 0, 2.0)
        .eof()
        .bof(BOF_CHART)
        .number(7, 7, -1.0)
        .eof()
        .bof(BOF_SHEET)
        .number(0, 0, 3.0)
        .eof()
        .build();
    let (events, summary) = read(&data).unwrap();

    let got: Vec<_> = cells(&events)
        .iter()
        .map(|c| (c.sheet, c.cell().to_string(), c.value.clone()))
        .collect();
    assert_eq!(
        got,
        vec![
            (0, "A1".to_string(), CellValue::Number(1.0)),
            (0, "A2".to_string(), CellValue::Number(2.0)),
            (2, "A1".to_string(), CellValue::Number(3.0)),
        ]
    );
    // Sheet ids index the BOUNDSHEET list
    assert_eq!(summary.sheets[2].name, "More");
}

#[test]
fn test_xls_sheet_filter() {
    let data = StreamBuilder::biff8()
        .globals(&[("One", 0), ("Two", 0)])
        .eof()
        .bof(BOF_SHEET)
        .number(0, 0, 1.0)
        .eof()
        .bof(BOF_SHEET)
        .number(0, 0, 2.0)
        .eof()
        .build();
    let options = ReadOptions {
        sheet: Some(1),
        ..Default::default()
    };
    let (events, _) = read_with(&data, options).unwrap();
    assert_eq!(events[0], SheetEvent::SessionStart { sheet: 1 });
    assert_eq!(cells(&events).len(), 1);
    assert_eq!(cell_at(&events, 1, "A1").value, CellValue::Number(2.0));
}

#[test]
fn test_xls_biff5_matches_biff8_shapes() {
    let data = StreamBuilder::biff5()
        .globals(&[("Alt", 0)])
        .eof()
        .bof(BOF_SHEET)
        .label(0, 0, "caf\u{e9}")
        .formula(1, 0, crate::string_result(), &[0x17, 0x01, 0x00, b'x'])
        .string("done")
        .eof()
        .build();
    let (events, summary) = read(&data).unwrap();

    assert_eq!(summary.version, BiffVersion::Biff5);
    assert_eq!(summary.sheets[0].name, "Alt");
    assert_eq!(cell_at(&events, 0, "A1").value, CellValue::string("café"));
    assert_eq!(cell_at(&events, 0, "A2").value.as_string(), Some("done"));
}

#[test]
fn test_xls_filepass_is_rejected() {
    let data = StreamBuilder::biff8()
        .bof(records::BOF_WORKBOOK_GLOBALS)
        .record(records::FILEPASS, &[0x01, 0x00, 0x01, 0x00])
        .eof()
        .build();
    let err = read(&data).unwrap_err();
    assert!(matches!(err, XlsError::Encrypted), "unexpected error: {err}");
}

#[test]
fn test_xls_unsupported_version() {
    let mut data = StreamBuilder::biff8().bof(records::BOF_WORKBOOK_GLOBALS).build();
    // BOF version 0x0400 (BIFF4)
    data[4..6].copy_from_slice(&0x0400u16.to_le_bytes());
    let err = read(&data).unwrap_err();
    assert!(matches!(err, XlsError::UnsupportedVersion(_)));
}

#[test]
fn test_xls_read_from_compound_file() {
    let stream = StreamBuilder::biff8()
        .globals(&[("Sheet1", 0)])
        .eof()
        .bof(BOF_SHEET)
        .number(2, 3, 7.0)
        .eof()
        .build();

    let mut cfb = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    cfb.create_stream("/Workbook")
        .unwrap()
        .write_all(&stream)
        .unwrap();
    cfb.flush().unwrap();
    let bytes = cfb.into_inner().into_inner();

    let mut events = Vec::new();
    let summary = XlsReader::new()
        .read(Cursor::new(bytes), &mut events)
        .unwrap();
    assert_eq!(summary.version, BiffVersion::Biff8);
    assert_eq!(cell_at(&events, 0, "D3").value, CellValue::Number(7.0));
}

#[test]
fn test_xls_missing_workbook_stream() {
    let mut cfb = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    cfb.create_stream("/WordDocument").unwrap();
    cfb.flush().unwrap();
    let bytes = cfb.into_inner().into_inner();

    let mut events = Vec::new();
    let err = XlsReader::new()
        .read(Cursor::new(bytes), &mut events)
        .unwrap_err();
    assert!(matches!(err, XlsError::InvalidFormat(_)));
}
