//! Per-sheet indices for multi-cell formulas.
//!
//! Array formulas and data tables are stored once, under their anchor cell.
//! The [`RangeOverlayIndex`] maps every other cell covered by a multi-cell
//! array back to the anchor's record, so member cells resolve without a
//! copy per cell. All three indices are cleared together on a sheet switch.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use ahash::AHashMap;
use biffcells_core::{CellExtent, CellRef, FormulaKind};

use crate::error::{AnchorKind, XlsError, XlsResult};
use crate::formula::{AnchorToken, ArrayData, FormulaRecord, TableData};

/// Result of looking up a payload by anchor.
///
/// "No formula at this anchor" and "formula present but without the
/// payload" are distinct outcomes, neither of them an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorLookup<'a, T> {
    NotFound,
    NoPayload,
    Payload(&'a T),
}

impl<'a, T> AnchorLookup<'a, T> {
    /// True if a formula is registered at the anchor, with or without payload.
    pub fn is_found(&self) -> bool {
        !matches!(self, AnchorLookup::NotFound)
    }

    pub fn payload(self) -> Option<&'a T> {
        match self {
            AnchorLookup::Payload(p) => Some(p),
            _ => None,
        }
    }
}

/// Selects which payload of a [`FormulaRecord`] an [`AnchorIndex`] serves.
pub trait AnchorPayload {
    type Payload;
    const KIND: AnchorKind;

    fn payload(record: &FormulaRecord) -> Option<&Self::Payload>;
}

#[derive(Debug, Clone, Copy)]
pub struct ArrayAnchors;

#[derive(Debug, Clone, Copy)]
pub struct TableAnchors;

impl AnchorPayload for ArrayAnchors {
    type Payload = ArrayData;
    const KIND: AnchorKind = AnchorKind::Array;

    fn payload(record: &FormulaRecord) -> Option<&ArrayData> {
        record.array.as_ref()
    }
}

impl AnchorPayload for TableAnchors {
    type Payload = TableData;
    const KIND: AnchorKind = AnchorKind::Table;

    fn payload(record: &FormulaRecord) -> Option<&TableData> {
        record.table.as_ref()
    }
}

/// Anchor cell → formula record, for one kind of multi-cell formula.
pub struct AnchorIndex<K> {
    entries: AHashMap<CellRef, Rc<FormulaRecord>>,
    _kind: PhantomData<K>,
}

pub type ArrayFormulaIndex = AnchorIndex<ArrayAnchors>;
pub type TableFormulaIndex = AnchorIndex<TableAnchors>;

impl<K> Default for AnchorIndex<K> {
    fn default() -> Self {
        Self {
            entries: AHashMap::new(),
            _kind: PhantomData,
        }
    }
}

impl<K: AnchorPayload> fmt::Debug for AnchorIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnchorIndex")
            .field("kind", &K::KIND)
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<K: AnchorPayload> AnchorIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` under `anchor`.
    ///
    /// An anchor is registered at most once per sheet; a second
    /// registration fails and leaves the first entry in place.
    pub fn register(&mut self, anchor: CellRef, record: Rc<FormulaRecord>) -> XlsResult<()> {
        use std::collections::hash_map::Entry;

        match self.entries.entry(anchor) {
            Entry::Occupied(_) => Err(XlsError::DuplicateAnchor {
                kind: K::KIND,
                anchor,
            }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// The record registered at `anchor`, payload or not.
    pub fn raw_formula(&self, anchor: CellRef) -> Option<&Rc<FormulaRecord>> {
        self.entries.get(&anchor)
    }

    pub fn lookup(&self, anchor: CellRef) -> AnchorLookup<'_, K::Payload> {
        match self.entries.get(&anchor) {
            None => AnchorLookup::NotFound,
            Some(record) => match K::payload(record) {
                Some(payload) => AnchorLookup::Payload(payload),
                None => AnchorLookup::NoPayload,
            },
        }
    }

    pub fn contains(&self, anchor: CellRef) -> bool {
        self.entries.contains_key(&anchor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl AnchorIndex<ArrayAnchors> {
    pub fn try_find_array_payload(&self, anchor: CellRef) -> AnchorLookup<'_, ArrayData> {
        self.lookup(anchor)
    }
}

impl AnchorIndex<TableAnchors> {
    pub fn try_find_table_payload(&self, anchor: CellRef) -> AnchorLookup<'_, TableData> {
        self.lookup(anchor)
    }
}

/// Covered cell → anchor record, for every non-anchor cell of each
/// multi-cell array extent on the current sheet.
#[derive(Debug, Default)]
pub struct RangeOverlayIndex {
    cells: AHashMap<CellRef, Rc<FormulaRecord>>,
}

impl RangeOverlayIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point every cell of `extent` except its anchor at `record`.
    pub fn register_range(&mut self, extent: CellExtent, record: Rc<FormulaRecord>) {
        let anchor = extent.anchor();
        let covered = extent.cell_count().saturating_sub(1);
        self.cells.reserve(covered.min(u16::MAX as u64) as usize);
        for cell in extent.cells().filter(|&c| c != anchor) {
            self.cells.insert(cell, Rc::clone(&record));
        }
    }

    /// The anchor record covering `cell`, shared rather than copied.
    pub fn resolve(&self, cell: CellRef) -> Option<&Rc<FormulaRecord>> {
        self.cells.get(&cell)
    }

    /// Build the per-cell view of the covering record: re-anchored at `cell`,
    /// with both payloads cleared.
    pub fn cell_view(&self, cell: CellRef) -> Option<FormulaRecord> {
        self.resolve(cell).map(|record| record.cell_view(cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

/// Read-only view over one sheet's indices, used to resolve formula cells.
#[derive(Debug, Clone, Copy)]
pub struct SheetLookup<'a> {
    pub arrays: &'a ArrayFormulaIndex,
    pub tables: &'a TableFormulaIndex,
    pub overlay: &'a RangeOverlayIndex,
}

impl<'a> SheetLookup<'a> {
    /// Classify the formula at `cell` and pick the tokens to report for it.
    pub fn classify(&self, cell: CellRef, formula: &FormulaRecord) -> (FormulaKind, Vec<u8>) {
        if let AnchorLookup::Payload(array) = self.arrays.try_find_array_payload(cell) {
            return (
                FormulaKind::ArrayAnchor {
                    extent: array.extent,
                },
                array.tokens.clone(),
            );
        }

        if let Some(owner) = self.overlay.resolve(cell) {
            if let Some(array) = owner.array.as_ref() {
                let anchor = owner.cell();
                if let Some(AnchorToken::Exp(pointer)) = formula.anchor_token() {
                    if pointer != anchor {
                        log::warn!(
                            "formula at {cell} points at {pointer}, covered by array at {anchor}"
                        );
                    }
                }
                return (
                    FormulaKind::ArrayMember {
                        anchor,
                        extent: array.extent,
                    },
                    array.tokens.clone(),
                );
            }
        }

        match formula.anchor_token() {
            Some(AnchorToken::Table(anchor)) => {
                if let AnchorLookup::Payload(table) = self.tables.try_find_table_payload(anchor) {
                    return (
                        FormulaKind::Table {
                            anchor,
                            extent: table.extent,
                            inputs: table.inputs,
                        },
                        formula.tokens.clone(),
                    );
                }
                (FormulaKind::Unresolved { anchor }, formula.tokens.clone())
            }
            Some(AnchorToken::Exp(anchor)) => {
                if formula.options.is_shared() {
                    log::debug!("shared formula at {cell} points at {anchor}, left unresolved");
                } else {
                    log::warn!("formula at {cell} points at {anchor}, which has no ARRAY record");
                }
                (FormulaKind::Unresolved { anchor }, formula.tokens.clone())
            }
            None => (FormulaKind::Plain, formula.tokens.clone()),
        }
    }
}
