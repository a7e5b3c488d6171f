//! Tests for formula cells and the records that trail them.

use crate::{
    cell_at, cells, exp, num_result, read, string_result, tbl, StreamBuilder, BOF_SHEET,
};
use biffcells_core::{CellExtent, CellRef, CellValue, FormulaKind, TableInputs, TableMode};
use biffcells_xls::{AnchorKind, XlsError};
use pretty_assertions::assert_eq;

const SUM_BODY: &[u8] = &[0x25, 0, 0, 1, 0, 0, 0, 0, 0, 0x19, 0x10, 0x00, 0x00];

fn sheet() -> StreamBuilder {
    StreamBuilder::biff8()
        .globals(&[("Calc", 0)])
        .eof()
        .bof(BOF_SHEET)
}

#[test]
fn test_xls_plain_formula_with_cached_number() {
    let data = sheet()
        .formula(0, 0, num_result(3.5), &[0x1E, 0x02, 0x00])
        .eof()
        .build();
    let (events, _) = read(&data).unwrap();

    let value = cell_at(&events, 0, "A1").value;
    let formula = value.as_formula().unwrap();
    assert_eq!(formula.kind, FormulaKind::Plain);
    assert_eq!(formula.tokens, vec![0x1E, 0x02, 0x00]);
    assert_eq!(value.as_number(), Some(3.5));
}

#[test]
fn test_xls_string_result_attaches_to_formula() {
    let data = sheet()
        .formula(0, 0, string_result(), &[0x17, 0x01, 0x00, b'x'])
        .string("cached text")
        .number(1, 0, 1.0)
        .eof()
        .build();
    let (events, _) = read(&data).unwrap();

    let value = cell_at(&events, 0, "A1").value;
    assert_eq!(value.as_string(), Some("cached text"));
    assert_eq!(cells(&events).len(), 2);
}

#[test]
fn test_xls_array_members_resolve_to_anchor() {
    let extent = CellExtent::new(0, 1, 2, 1);
    let data = sheet()
        .formula(0, 1, num_result(1.0), &exp(0, 1))
        .array(extent, SUM_BODY)
        .formula(1, 1, num_result(2.0), &exp(0, 1))
        .formula(2, 1, num_result(3.0), &exp(0, 1))
        .number(3, 1, 9.0)
        .eof()
        .build();
    let (events, _) = read(&data).unwrap();

    let anchor = cell_at(&events, 0, "B1").value;
    let anchor = anchor.as_formula().unwrap();
    assert_eq!(anchor.kind, FormulaKind::ArrayAnchor { extent });
    assert_eq!(anchor.tokens, SUM_BODY.to_vec());

    for (a1, cached) in [("B2", 2.0), ("B3", 3.0)] {
        let value = cell_at(&events, 0, a1).value;
        let formula = value.as_formula().unwrap();
        assert_eq!(
            formula.kind,
            FormulaKind::ArrayMember {
                anchor: CellRef::new(0, 1),
                extent
            }
        );
        assert_eq!(formula.tokens, SUM_BODY.to_vec());
        assert_eq!(value.as_number(), Some(cached));
    }

    assert_eq!(cell_at(&events, 0, "B4").value, CellValue::Number(9.0));
}

#[test]
fn test_xls_table_formulas() {
    let extent = CellExtent::new(1, 1, 2, 1);
    let data = sheet()
        .formula(1, 1, num_result(10.0), &tbl(1, 1))
        .column_table(extent, CellRef::new(0, 3))
        .formula(2, 1, num_result(20.0), &tbl(1, 1))
        .eof()
        .build();
    let (events, _) = read(&data).unwrap();

    let expected = FormulaKind::Table {
        anchor: CellRef::new(1, 1),
        extent,
        inputs: TableInputs {
            mode: TableMode::ColumnInput,
            row_input: None,
            col_input: Some(CellRef::new(0, 3)),
        },
    };
    for a1 in ["B2", "B3"] {
        let value = cell_at(&events, 0, a1).value;
        assert_eq!(value.as_formula().unwrap().kind, expected);
    }
}

#[test]
fn test_xls_shared_formula_member_is_unresolved() {
    let data = sheet()
        .formula(4, 0, num_result(1.0), &exp(3, 0))
        .eof()
        .build();
    let (events, _) = read(&data).unwrap();
    let value = cell_at(&events, 0, "A5").value;
    assert_eq!(
        value.as_formula().unwrap().kind,
        FormulaKind::Unresolved {
            anchor: CellRef::new(3, 0)
        }
    );
}

#[test]
fn test_xls_duplicate_array_anchor_aborts() {
    let extent = CellExtent::new(0, 0, 1, 0);
    let data = sheet()
        .formula(0, 0, num_result(1.0), &exp(0, 0))
        .array(extent, SUM_BODY)
        .array(extent, SUM_BODY)
        .eof()
        .build();
    let err = read(&data).unwrap_err();
    assert!(
        matches!(
            err,
            XlsError::DuplicateAnchor {
                kind: AnchorKind::Array,
                anchor
            } if anchor == CellRef::new(0, 0)
        ),
        "unexpected error: {err}"
    );
}
