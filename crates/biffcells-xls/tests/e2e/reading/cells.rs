//! Tests for constant cell records.

use crate::{cell_at, cells, read, read_with, StreamBuilder, BOF_SHEET};
use biffcells_core::{CellError, CellValue};
use biffcells_xls::biff::records;
use biffcells_xls::{ReadOptions, SheetEvent};
use pretty_assertions::assert_eq;

fn one_sheet(body: impl FnOnce(StreamBuilder) -> StreamBuilder) -> Vec<u8> {
    let b = StreamBuilder::biff8()
        .globals(&[("Data", 0)])
        .sst(&["alpha", "beta"])
        .xf(0)
        .xf(14)
        .eof()
        .bof(BOF_SHEET);
    body(b).eof().build()
}

#[test]
fn test_xls_constant_values() {
    let data = one_sheet(|b| {
        b.number(0, 0, 42.0)
            .label(0, 1, "inline")
            .labelsst(0, 2, 1)
            .boolerr(1, 0, 1, false)
            .boolerr(1, 1, 0x07, true)
            .mulrk(2, 0, &[10, -3])
    });
    let (events, summary) = read(&data).unwrap();

    assert_eq!(events[0], SheetEvent::SessionStart { sheet: 0 });
    assert_eq!(cell_at(&events, 0, "A1").value, CellValue::Number(42.0));
    assert_eq!(cell_at(&events, 0, "B1").value, CellValue::string("inline"));
    assert_eq!(cell_at(&events, 0, "C1").value, CellValue::string("beta"));
    assert_eq!(cell_at(&events, 0, "A2").value, CellValue::Boolean(true));
    assert_eq!(
        cell_at(&events, 0, "B2").value,
        CellValue::Error(CellError::Div0)
    );
    assert_eq!(cell_at(&events, 0, "A3").value, CellValue::Number(10.0));
    assert_eq!(cell_at(&events, 0, "B3").value, CellValue::Number(-3.0));
    assert_eq!(cells(&events).len(), 7);

    assert_eq!(summary.sheets.len(), 1);
    assert_eq!(summary.sheets[0].name, "Data");
}

#[test]
fn test_xls_events_follow_stream_order() {
    let data = one_sheet(|b| b.number(5, 5, 1.0).number(0, 0, 2.0).number(3, 1, 3.0));
    let (events, _) = read(&data).unwrap();
    let order: Vec<_> = cells(&events).iter().map(|c| c.cell().to_string()).collect();
    assert_eq!(order, vec!["F6", "A1", "B4"]);
}

#[test]
fn test_xls_format_index_comes_from_xf() {
    let data = one_sheet(|b| b.number_xf(0, 0, 1, 45000.0).number_xf(0, 1, 9, 1.0));
    let (events, _) = read(&data).unwrap();
    assert_eq!(cell_at(&events, 0, "A1").format_index, 14);
    // Unknown XF falls back to General
    assert_eq!(cell_at(&events, 0, "B1").format_index, 0);
}

#[test]
fn test_xls_out_of_range_sst_index_is_empty_string() {
    let data = one_sheet(|b| b.labelsst(0, 0, 99));
    let (events, _) = read(&data).unwrap();
    assert_eq!(cell_at(&events, 0, "A1").value, CellValue::string(""));
}

#[test]
fn test_xls_skip_blanks() {
    let data = one_sheet(|b| b.blank(0, 0).number(0, 1, 1.0).blank(0, 2));

    let (events, _) = read(&data).unwrap();
    assert_eq!(cells(&events).len(), 3);
    assert_eq!(cell_at(&events, 0, "A1").value, CellValue::Empty);

    let options = ReadOptions {
        skip_blanks: true,
        ..Default::default()
    };
    let (events, _) = read_with(&data, options).unwrap();
    let got: Vec<_> = cells(&events).iter().map(|c| c.cell().to_string()).collect();
    assert_eq!(got, vec!["B1"]);
}

#[test]
fn test_xls_sst_string_split_by_continue() {
    let mut sst = Vec::new();
    sst.extend_from_slice(&2u32.to_le_bytes());
    sst.extend_from_slice(&2u32.to_le_bytes());
    sst.extend_from_slice(&[0x06, 0x00, 0x00, b'a', b'b', b'c']);
    // The continued half restarts with its own flags byte
    let mut rest = vec![0x00, b'd', b'e', b'f'];
    rest.extend_from_slice(&[0x02, 0x00, 0x00, b'x', b'y']);

    let data = StreamBuilder::biff8()
        .globals(&[("Data", 0)])
        .record(records::SST, &sst)
        .continued(&rest)
        .eof()
        .bof(BOF_SHEET)
        .labelsst(0, 0, 0)
        .labelsst(0, 1, 1)
        .eof()
        .build();
    let (events, _) = read(&data).unwrap();
    assert_eq!(cell_at(&events, 0, "A1").value, CellValue::string("abcdef"));
    assert_eq!(cell_at(&events, 0, "B1").value, CellValue::string("xy"));
}

#[test]
fn test_xls_biff5_text_uses_code_page() {
    let data = StreamBuilder::biff5()
        .globals(&[("Data", 0)])
        .codepage(1252)
        .eof()
        .bof(BOF_SHEET)
        .label_bytes(0, 0, &[0x80, b'5'])
        .eof()
        .build();
    let (events, _) = read(&data).unwrap();
    assert_eq!(cell_at(&events, 0, "A1").value, CellValue::string("\u{20ac}5"));
}

#[test]
fn test_xls_biff5_without_code_page_assumes_windows_1252() {
    let data = StreamBuilder::biff5()
        .globals(&[("Data", 0)])
        .eof()
        .bof(BOF_SHEET)
        .label_bytes(0, 0, &[0x93, b'q', 0x94])
        .eof()
        .build();
    let (events, _) = read(&data).unwrap();
    assert_eq!(
        cell_at(&events, 0, "A1").value,
        CellValue::string("\u{201c}q\u{201d}")
    );
}
