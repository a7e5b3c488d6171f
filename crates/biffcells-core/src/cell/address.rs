//! Cell reference and extent types

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell location within one sheet.
///
/// Rows and columns are 0-based. Two references are equal iff both fields
/// match, and the derived `Hash` combines both, so a `CellRef` can key the
/// per-sheet formula indices directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellRef {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., IV=255)
    pub col: u16,
}

impl CellRef {
    /// Create a new cell reference
    pub const fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse a cell reference from A1-style notation.
    ///
    /// `$` markers are accepted and ignored; a `CellRef` carries no
    /// absolute/relative flags.
    ///
    /// # Examples
    /// ```
    /// use biffcells_core::CellRef;
    ///
    /// let cell = CellRef::parse("B2").unwrap();
    /// assert_eq!(cell, CellRef::new(1, 1));
    ///
    /// let cell = CellRef::parse("$C$10").unwrap();
    /// assert_eq!(cell, CellRef::new(9, 2));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        let col = Self::letters_to_column(&s[col_start..pos])?;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        // Rows are 1-based in A1 notation
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }
        let row = row - 1;
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self { row, col })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut result = String::new();
        let mut n = col as u32 + 1;

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::ColumnOutOfBounds(u16::MAX, MAX_COLS - 1));
            }
        }

        Ok((col - 1) as u16)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<(u32, u16)> for CellRef {
    fn from((row, col): (u32, u16)) -> Self {
        Self::new(row, col)
    }
}

/// An inclusive rectangular block of cells.
///
/// This is the range descriptor carried by ARRAY and TABLE records. The
/// top-left cell is the block's anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellExtent {
    pub top: u32,
    pub left: u16,
    pub bottom: u32,
    pub right: u16,
}

impl CellExtent {
    /// Create an extent from its bounds, normalizing so `top <= bottom` and
    /// `left <= right`.
    pub fn new(top: u32, left: u16, bottom: u32, right: u16) -> Self {
        Self {
            top: top.min(bottom),
            left: left.min(right),
            bottom: top.max(bottom),
            right: left.max(right),
        }
    }

    /// Create an extent spanning two corner cells
    pub fn from_corners(a: CellRef, b: CellRef) -> Self {
        Self::new(a.row, a.col, b.row, b.col)
    }

    /// Create a single-cell extent
    pub fn single(cell: CellRef) -> Self {
        Self::new(cell.row, cell.col, cell.row, cell.col)
    }

    /// Parse an extent from A1:B10 notation (or a single A1 cell)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((start, end)) => {
                let start = CellRef::parse(start)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                let end = CellRef::parse(end)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::from_corners(start, end))
            }
            None => Ok(Self::single(CellRef::parse(s)?)),
        }
    }

    /// The top-left cell
    pub fn anchor(&self) -> CellRef {
        CellRef::new(self.top, self.left)
    }

    /// Check if a cell is within this extent
    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row >= self.top
            && cell.row <= self.bottom
            && cell.col >= self.left
            && cell.col <= self.right
    }

    /// Get the number of rows in the extent
    pub fn row_count(&self) -> u32 {
        self.bottom - self.top + 1
    }

    /// Get the number of columns in the extent
    pub fn col_count(&self) -> u16 {
        self.right - self.left + 1
    }

    /// Get the total number of cells in the extent
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    pub fn is_single_cell(&self) -> bool {
        self.top == self.bottom && self.left == self.right
    }

    /// Iterate over all cells in the extent (row by row)
    pub fn cells(&self) -> CellExtentIter {
        CellExtentIter {
            extent: *self,
            row: self.top,
            col: self.left,
            remaining: self.cell_count(),
        }
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        if self.is_single_cell() {
            self.anchor().to_a1_string()
        } else {
            format!(
                "{}:{}",
                self.anchor(),
                CellRef::new(self.bottom, self.right)
            )
        }
    }
}

impl fmt::Display for CellExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellExtent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over cells in an extent
pub struct CellExtentIter {
    extent: CellExtent,
    row: u32,
    col: u16,
    remaining: u64,
}

impl Iterator for CellExtentIter {
    type Item = CellRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let cell = CellRef::new(self.row, self.col);
        self.remaining -= 1;

        if self.col == self.extent.right {
            self.col = self.extent.left;
            self.row = self.row.saturating_add(1);
        } else {
            self.col += 1;
        }

        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellExtentIter {}
