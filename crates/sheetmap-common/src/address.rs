//! Zero-based grid coordinates.
//!
//! `GridAddress` names one cell of a sheet by (row, column). Limits match the
//! spreadsheet engines the crates talk to: 1,048,576 rows × 16,384 columns.
//! Ordering is lexicographic, row first, which is also the order rows are
//! committed in.

use core::fmt;
use std::error::Error;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest addressable zero-based row.
pub const ROW_MAX: u32 = (1 << 20) - 1;
/// Largest addressable zero-based column.
pub const COL_MAX: u32 = (1 << 14) - 1;

/// Errors returned when constructing addresses from unchecked inputs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AddressError {
    RowOverflow(u64),
    ColOverflow(u64),
    /// Text was not an `A1` style reference.
    Parse(String),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::RowOverflow(row) => write!(f, "row {row} exceeds {ROW_MAX}"),
            AddressError::ColOverflow(col) => write!(f, "col {col} exceeds {COL_MAX}"),
            AddressError::Parse(text) => write!(f, "`{text}` is not an A1 cell reference"),
        }
    }
}

impl Error for AddressError {}

/// Absolute (row, column) position in a grid.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GridAddress {
    row: u32,
    col: u32,
}

impl GridAddress {
    pub const ORIGIN: Self = Self { row: 0, col: 0 };

    /// Construct an address, panicking if values exceed the supported limits.
    pub const fn new(row: u32, col: u32) -> Self {
        assert!(row <= ROW_MAX, "row exceeds 20 bits");
        assert!(col <= COL_MAX, "col exceeds 14 bits");
        Self { row, col }
    }

    /// Fallible constructor that reports overflow rather than panicking.
    pub fn try_new(row: u32, col: u32) -> Result<Self, AddressError> {
        if row > ROW_MAX {
            return Err(AddressError::RowOverflow(row as u64));
        }
        if col > COL_MAX {
            return Err(AddressError::ColOverflow(col as u64));
        }
        Ok(Self { row, col })
    }

    /// Parse an `A1` style reference. `$` anchors are accepted and ignored.
    pub fn try_from_a1(reference: &str) -> Result<Self, AddressError> {
        let parse_err = || AddressError::Parse(reference.to_string());
        let cleaned: String = reference.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(parse_err)?;
        let (letters, digits) = cleaned.split_at(split);
        let col = letters_to_column(&letters.to_ascii_uppercase()).ok_or_else(parse_err)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(parse_err());
        }
        let row1: u64 = digits.parse().map_err(|_| parse_err())?;
        if row1 == 0 {
            return Err(parse_err());
        }
        if row1 - 1 > ROW_MAX as u64 {
            return Err(AddressError::RowOverflow(row1 - 1));
        }
        Self::try_new((row1 - 1) as u32, col)
    }

    #[inline(always)]
    pub const fn row(self) -> u32 {
        self.row
    }

    #[inline(always)]
    pub const fn col(self) -> u32 {
        self.col
    }

    /// Same column, different row.
    #[inline]
    pub fn with_row(self, row: u32) -> Self {
        Self::new(row, self.col)
    }

    /// Same row, different column.
    #[inline]
    pub fn with_col(self, col: u32) -> Self {
        Self::new(self.row, col)
    }

    /// Render the column part of this address in letters (`0` -> `A`).
    pub fn col_letters(self) -> String {
        column_to_letters(self.col)
    }
}

impl fmt::Display for GridAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row + 1)
    }
}

impl FromStr for GridAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from_a1(s)
    }
}

impl From<GridAddress> for (u32, u32) {
    fn from(address: GridAddress) -> Self {
        (address.row, address.col)
    }
}

impl TryFrom<(u32, u32)> for GridAddress {
    type Error = AddressError;

    fn try_from(value: (u32, u32)) -> Result<Self, Self::Error> {
        Self::try_new(value.0, value.1)
    }
}

/// Convert a zero-based column index to spreadsheet letters.
pub fn column_to_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    loop {
        let rem = (col % 26) as u8;
        buf.push(b'A' + rem);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

/// Convert upper-case spreadsheet letters to a zero-based column index.
pub fn letters_to_column(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for (idx, ch) in s.bytes().enumerate() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        let val = (ch - b'A') as u32;
        col = col.checked_mul(26)?;
        col = col.checked_add(val)?;
        if idx != s.len() - 1 {
            col = col.checked_add(1)?;
        }
    }
    (col <= COL_MAX).then_some(col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_row_major() {
        let a = GridAddress::new(1, 9);
        let b = GridAddress::new(2, 0);
        let c = GridAddress::new(2, 1);
        assert!(a < b);
        assert!(b < c);
        let mut all = vec![c, a, b];
        all.sort();
        assert_eq!(all, vec![a, b, c]);
    }

    #[test]
    fn try_new_reports_overflow() {
        assert!(GridAddress::try_new(ROW_MAX, COL_MAX).is_ok());
        assert_eq!(
            GridAddress::try_new(ROW_MAX + 1, 0),
            Err(AddressError::RowOverflow((ROW_MAX + 1) as u64))
        );
        assert_eq!(
            GridAddress::try_new(0, COL_MAX + 1),
            Err(AddressError::ColOverflow((COL_MAX + 1) as u64))
        );
    }

    #[test]
    fn a1_display_and_parse() {
        assert_eq!(GridAddress::new(0, 0).to_string(), "A1");
        assert_eq!(GridAddress::new(5, 27).to_string(), "AB6");
        assert_eq!(GridAddress::try_from_a1("AB6").unwrap(), GridAddress::new(5, 27));
        assert_eq!(GridAddress::try_from_a1("$c$3").unwrap(), GridAddress::new(2, 2));
        assert!(GridAddress::try_from_a1("A0").is_err());
        assert!(GridAddress::try_from_a1("12").is_err());
        assert!(GridAddress::try_from_a1("B").is_err());
        assert!(GridAddress::try_from_a1("B2x").is_err());
    }

    #[test]
    fn column_letter_roundtrip() {
        assert_eq!(column_to_letters(25), "Z");
        assert_eq!(column_to_letters(26), "AA");
        assert_eq!(letters_to_column("AB"), Some(27));
        assert_eq!(letters_to_column("XFD"), Some(COL_MAX));
        assert_eq!(letters_to_column("XFE"), None);
        assert!(letters_to_column("a1").is_none());
    }
}
