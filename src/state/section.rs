//! Named sub-ranges of the abstract stack.

use std::{fmt, ops::Range};

/// A contiguous `(base, len)` view into an abstract stack.
///
/// Sections never own values; they only describe where the struct-return slot,
/// `this`, the arguments and the locals live inside the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Section {
    base: usize,
    len: usize,
}

impl Section {
    /// Creates a section covering `[base, base + len)`.
    #[must_use]
    pub const fn new(base: usize, len: usize) -> Self {
        Section { base, len }
    }

    /// An empty section at slot 0.
    #[must_use]
    pub const fn empty() -> Self {
        Section { base: 0, len: 0 }
    }

    /// First slot.
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Number of slots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if the section covers no slot.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last slot.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.base + self.len
    }

    /// The covered slots as a range.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.base..self.end()
    }

    /// Absolute slot of the `index`th element, if inside the section.
    #[must_use]
    pub const fn slot(&self, index: usize) -> Option<usize> {
        if index < self.len {
            Some(self.base + index)
        } else {
            None
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.base, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_bounds() {
        let locals = Section::new(2, 3);
        assert_eq!(locals.end(), 5);
        assert_eq!(locals.range(), 2..5);
        assert_eq!(locals.slot(0), Some(2));
        assert_eq!(locals.slot(3), None);
        assert_eq!(locals.to_string(), "[2, 5)");
        assert!(Section::empty().is_empty());
    }
}
