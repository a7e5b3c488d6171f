//! Cell-related types
//!
//! This module contains:
//! - [`CellRef`] - A cell's location, used as a hash-map key
//! - [`CellExtent`] - A rectangular block of cells (e.g., an array formula's range)
//! - [`CellValue`] - The resolved value of a decoded cell

mod address;
mod value;

pub use address::{CellExtent, CellExtentIter, CellRef};
pub use value::{
    CellError, CellValue, FormulaKind, FormulaValue, SharedString, TableInputs, TableMode,
};
