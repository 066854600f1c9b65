//! Metadata tokens identifying methods, types and fields.
//!
//! A token is the 32-bit reference the binary reader hands out for every metadata row:
//! the high byte selects the table, the low 24 bits the row. The compiler core never
//! resolves tokens itself; it only uses them as stable identities, most importantly to
//! tell which method a basic block belongs to.

use std::fmt;

/// Table id of `MethodDef` rows.
pub const TABLE_METHOD_DEF: u8 = 0x06;
/// Table id of `MemberRef` rows.
pub const TABLE_MEMBER_REF: u8 = 0x0A;
/// Table id of `TypeDef` rows.
pub const TABLE_TYPE_DEF: u8 = 0x02;
/// Table id of `Field` rows.
pub const TABLE_FIELD: u8 = 0x04;

/// A metadata token: table id in the high byte, 1-based row in the low 24 bits.
///
/// # Examples
///
/// ```rust
/// use cilflow::metadata::token::Token;
///
/// let token = Token::method(3);
/// assert_eq!(token.value(), 0x0600_0003);
/// assert!(token.is_method());
/// assert_eq!(format!("{token}"), "0x06000003");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token(pub u32);

impl Token {
    /// Creates a token from its raw value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a `MethodDef` token for the given row.
    #[must_use]
    pub const fn method(row: u32) -> Self {
        Token(((TABLE_METHOD_DEF as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw 32-bit value.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns the table id.
    #[must_use]
    pub const fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the row within the table.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// True for the null token.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// True if the token references a method definition or a member reference.
    #[must_use]
    pub const fn is_method(&self) -> bool {
        matches!(self.table(), TABLE_METHOD_DEF | TABLE_MEMBER_REF)
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_parts() {
        let token = Token(0x0A00_0010);
        assert_eq!(token.table(), TABLE_MEMBER_REF);
        assert_eq!(token.row(), 0x10);
        assert!(token.is_method());
        assert!(!Token(0x0200_0001).is_method());
    }

    #[test]
    fn test_method_constructor_masks_row() {
        let token = Token::method(0xFF00_0001);
        assert_eq!(token.table(), TABLE_METHOD_DEF);
        assert_eq!(token.row(), 1);
    }

    #[test]
    fn test_null_and_formatting() {
        assert!(Token::default().is_null());
        let token = Token::method(1);
        assert_eq!(format!("{token}"), "0x06000001");
        assert_eq!(
            format!("{token:?}"),
            "Token(0x06000001, table: 0x06, row: 1)"
        );
    }
}
