//! One-record-lag cell emission.
//!
//! A decoded cell is held back until the next cell arrives (or the sheet
//! ends) because the records that complete it come *after* it in the
//! stream: a STRING record carries a formula's string result, and ARRAY or
//! TABLE records turn the preceding formula into a multi-cell anchor.

use std::collections::VecDeque;
use std::rc::Rc;

use biffcells_core::{CellRef, CellValue, SharedString};

use crate::cell::{CellContent, CellRecord};
use crate::error::{AnchorKind, XlsError, XlsResult};
use crate::formula::{ArrayData, FormulaRecord, FormulaResult, TableData};
use crate::index::{ArrayFormulaIndex, RangeOverlayIndex, SheetLookup, TableFormulaIndex};

/// Events produced by a decode pass
#[derive(Debug, Clone, PartialEq)]
pub enum SheetEvent {
    /// A worksheet's cell records are about to be delivered
    SessionStart { sheet: usize },
    CellValue(CellValueEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellValueEvent {
    pub sheet: usize,
    pub row: u32,
    pub col: u16,
    pub value: CellValue,
    pub format_index: u16,
}

impl CellValueEvent {
    pub fn cell(&self) -> CellRef {
        CellRef::new(self.row, self.col)
    }
}

/// A decoded ARRAY record
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRecord {
    pub data: ArrayData,
}

/// A decoded TABLE record
#[derive(Debug, Clone, PartialEq)]
pub struct TableRecord {
    pub data: TableData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingCell {
    pub sheet: usize,
    pub cell: CellRecord,
}

#[derive(Debug, Default)]
enum PendingSlot {
    #[default]
    Empty,
    Pending(PendingCell),
}

/// Holds at most one decoded cell and resolves it against the current
/// sheet's formula indices when it is flushed.
#[derive(Debug, Default)]
pub struct DeferredCellEmitter {
    slot: PendingSlot,
    arrays: ArrayFormulaIndex,
    tables: TableFormulaIndex,
    overlay: RangeOverlayIndex,
    events: VecDeque<SheetEvent>,
}

impl DeferredCellEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `cell`, emitting whatever was pending before it.
    pub fn read(&mut self, sheet: usize, cell: CellRecord) {
        self.flush();
        self.slot = PendingSlot::Pending(PendingCell { sheet, cell });
    }

    /// Emit the pending cell, if any.
    pub fn flush(&mut self) {
        let PendingSlot::Pending(PendingCell { sheet, cell }) = std::mem::take(&mut self.slot)
        else {
            return;
        };

        let lookup = SheetLookup {
            arrays: &self.arrays,
            tables: &self.tables,
            overlay: &self.overlay,
        };
        let (row, col, format_index) = (cell.row, cell.col, cell.format_index);
        let value = cell.resolve(&lookup);

        log::trace!("emit sheet {sheet} {}: {}", CellRef::new(row, col), value.type_name());
        self.events.push_back(SheetEvent::CellValue(CellValueEvent {
            sheet,
            row,
            col,
            value,
            format_index,
        }));
    }

    /// Announce the start of a sheet. The pending slot is not touched.
    pub fn start_reading(&mut self, sheet: usize) {
        self.events.push_back(SheetEvent::SessionStart { sheet });
    }

    /// Drop all sheet-scoped formula state.
    ///
    /// Fails without clearing anything if a cell is still pending, since
    /// resolving it afterwards would use the wrong sheet's indices.
    pub fn clear_sheet(&mut self) -> XlsResult<()> {
        if let PendingSlot::Pending(p) = &self.slot {
            return Err(XlsError::UnflushedCell {
                sheet: p.sheet,
                row: p.cell.row,
                col: p.cell.col,
            });
        }
        self.arrays.clear();
        self.tables.clear();
        self.overlay.clear();
        Ok(())
    }

    /// Complete the pending formula's string result with a STRING record.
    pub fn attach_string(&mut self, text: SharedString) {
        if let PendingSlot::Pending(PendingCell { cell, .. }) = &mut self.slot {
            if let CellContent::Formula { result, .. } = &mut cell.content {
                if *result == FormulaResult::PendingString {
                    *result = FormulaResult::String(text);
                    return;
                }
            }
        }
        log::warn!("STRING record without a pending string formula; ignored");
    }

    /// Attach an ARRAY record to the pending anchor formula and index it.
    pub fn register_array(&mut self, record: ArrayRecord) -> XlsResult<()> {
        let extent = record.data.extent;
        let anchor = extent.anchor();
        if self.arrays.contains(anchor) {
            return Err(XlsError::DuplicateAnchor {
                kind: AnchorKind::Array,
                anchor,
            });
        }
        let holder = if self.tables.contains(anchor) {
            AnchorKind::Table
        } else {
            AnchorKind::Array
        };
        let Some(formula) = pending_formula_at(&mut self.slot, anchor) else {
            log::warn!("ARRAY record for {extent} has no formula at its anchor; skipped");
            return Ok(());
        };
        let shared = attach(formula, holder, anchor, |f| f.array = Some(record.data))?;

        self.arrays.register(anchor, Rc::clone(&shared))?;
        if !extent.is_single_cell() {
            self.overlay.register_range(extent, shared);
        }
        Ok(())
    }

    /// Attach a TABLE record to the pending anchor formula and index it.
    pub fn register_table(&mut self, record: TableRecord) -> XlsResult<()> {
        let extent = record.data.extent;
        let anchor = extent.anchor();
        if self.tables.contains(anchor) {
            return Err(XlsError::DuplicateAnchor {
                kind: AnchorKind::Table,
                anchor,
            });
        }
        let holder = if self.arrays.contains(anchor) {
            AnchorKind::Array
        } else {
            AnchorKind::Table
        };
        let Some(formula) = pending_formula_at(&mut self.slot, anchor) else {
            log::warn!("TABLE record for {extent} has no formula at its anchor; skipped");
            return Ok(());
        };
        let shared = attach(formula, holder, anchor, |f| f.table = Some(record.data))?;

        self.tables.register(anchor, shared)
    }

    /// The formula governing `cell` on the current sheet: the anchor record
    /// itself for an anchor, a re-anchored view for an overlay cell.
    pub fn formula_at(&self, cell: CellRef) -> Option<FormulaRecord> {
        if let Some(anchor) = self
            .arrays
            .raw_formula(cell)
            .or_else(|| self.tables.raw_formula(cell))
        {
            return Some(FormulaRecord::clone(anchor));
        }
        self.overlay.cell_view(cell)
    }

    pub fn pending(&self) -> Option<&PendingCell> {
        match &self.slot {
            PendingSlot::Pending(p) => Some(p),
            PendingSlot::Empty => None,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// Take every event queued since the last call.
    pub fn drain_events(&mut self) -> impl Iterator<Item = SheetEvent> + '_ {
        self.events.drain(..)
    }

    pub fn array_index(&self) -> &ArrayFormulaIndex {
        &self.arrays
    }

    pub fn table_index(&self) -> &TableFormulaIndex {
        &self.tables
    }

    pub fn overlay(&self) -> &RangeOverlayIndex {
        &self.overlay
    }
}

fn pending_formula_at(slot: &mut PendingSlot, anchor: CellRef) -> Option<&mut Rc<FormulaRecord>> {
    match slot {
        PendingSlot::Pending(PendingCell { cell, .. }) if cell.cell() == anchor => {
            match &mut cell.content {
                CellContent::Formula { formula, .. } => Some(formula),
                CellContent::Value(_) => None,
            }
        }
        _ => None,
    }
}

/// Set a payload on the pending formula and return a shared handle to it.
///
/// The pending record is only shared once it has been indexed, so a failed
/// `get_mut` means this formula already anchors another block; the error
/// names `holder`, the index that has it.
fn attach(
    formula: &mut Rc<FormulaRecord>,
    holder: AnchorKind,
    anchor: CellRef,
    set: impl FnOnce(&mut FormulaRecord),
) -> XlsResult<Rc<FormulaRecord>> {
    let record = Rc::get_mut(formula).ok_or(XlsError::DuplicateAnchor {
        kind: holder,
        anchor,
    })?;
    set(record);
    Ok(Rc::clone(formula))
}
