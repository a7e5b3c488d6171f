//! Decoded cell records, before overlay resolution.

use std::rc::Rc;

use biffcells_core::{CellRef, CellValue, FormulaValue};

use crate::formula::{FormulaRecord, FormulaResult};
use crate::index::SheetLookup;

/// One decoded cell-bearing record
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub row: u32,
    pub col: u16,
    /// Number format id (already remapped through the XF table)
    pub format_index: u16,
    pub content: CellContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    /// A constant: number, string, boolean, error or blank
    Value(CellValue),
    /// A formula plus its cached result
    Formula {
        formula: Rc<FormulaRecord>,
        result: FormulaResult,
    },
}

impl CellRecord {
    pub fn value(row: u32, col: u16, format_index: u16, value: CellValue) -> Self {
        Self {
            row,
            col,
            format_index,
            content: CellContent::Value(value),
        }
    }

    pub fn formula(formula: FormulaRecord, result: FormulaResult) -> Self {
        Self {
            row: formula.row,
            col: formula.col,
            format_index: formula.format_index,
            content: CellContent::Formula {
                formula: Rc::new(formula),
                result,
            },
        }
    }

    pub fn cell(&self) -> CellRef {
        CellRef::new(self.row, self.col)
    }

    pub fn is_blank(&self) -> bool {
        matches!(&self.content, CellContent::Value(CellValue::Empty))
    }

    /// The formula record, if this is a formula cell.
    pub fn as_formula(&self) -> Option<&Rc<FormulaRecord>> {
        match &self.content {
            CellContent::Formula { formula, .. } => Some(formula),
            CellContent::Value(_) => None,
        }
    }

    /// Resolve into the value reported to consumers.
    pub fn resolve(self, lookup: &SheetLookup<'_>) -> CellValue {
        let cell = self.cell();
        match self.content {
            CellContent::Value(value) => value,
            CellContent::Formula { formula, result } => {
                let (kind, tokens) = lookup.classify(cell, &formula);
                CellValue::Formula(FormulaValue {
                    tokens,
                    cached: result.into_cached().map(Box::new),
                    kind,
                })
            }
        }
    }
}
