//! Cell-reference algebra: column letters and `A1`-style references.

use std::fmt;

/// Spreadsheet column name for a zero-based index.
///
/// Column names are bijective base-26: there is no zero digit, so `Z` (25)
/// is followed by `AA` (26) and `ZZ` (701) by `AAA` (702).
pub fn column_letters(index: u32) -> String {
    let mut n = u64::from(index) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Inverse of [`column_letters`]. Accepts lower-case letters.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = u64::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    u32::try_from(n - 1).ok()
}

/// Reference to a single cell. `column` is zero-based, `row` is one-based as
/// displayed by spreadsheet applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub column: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Parse an `A1`-style reference. Absolute markers (`$A$1`) are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        let s: String = s.chars().filter(|c| *c != '$').collect();
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);
        let column = column_index(letters)?;
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(Self { column, row })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}
