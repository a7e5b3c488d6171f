//! # biffcells-core
//!
//! Core data types shared by the biffcells crates.
//!
//! This crate provides:
//! - [`CellRef`] - A value-typed `(row, col)` cell key
//! - [`CellExtent`] - An inclusive rectangular block of cells
//! - [`CellValue`] - A resolved cell value (numbers, strings, booleans, errors, formulas)
//! - [`FormulaValue`] and [`FormulaKind`] - Formula token data plus its array/table membership
//!
//! ## Example
//!
//! ```rust
//! use biffcells_core::{CellExtent, CellRef};
//!
//! let extent = CellExtent::parse("B3:C4").unwrap();
//! assert_eq!(extent.anchor(), CellRef::new(2, 1));
//! assert!(extent.contains(CellRef::parse("C4").unwrap()));
//! assert_eq!(extent.cell_count(), 4);
//! ```

pub mod cell;
pub mod error;

pub use cell::{
    CellError, CellExtent, CellRef, CellValue, FormulaKind, FormulaValue, SharedString,
    TableInputs, TableMode,
};
pub use error::{Error, Result};

/// Maximum number of rows in a BIFF8 worksheet
pub const MAX_ROWS: u32 = 65_536;

/// Maximum number of columns in a BIFF8 worksheet
pub const MAX_COLS: u16 = 256;
