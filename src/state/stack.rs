//! The abstract operand stack.
//!
//! Unlike a real evaluation stack, the abstract stack also holds the method's
//! arguments and locals at its bottom, so that every value a block can see lives
//! in one index-addressable sequence. Pushes and pops happen at the tail; merges
//! replace slots in place.

use crate::{ir::Value, state::Section};

/// An ordered, index-addressable sequence of [`Value`]s.
///
/// # Examples
///
/// ```rust
/// use cilflow::{ir::Value, state::{AbstractStack, Section}};
///
/// let mut stack = AbstractStack::new();
/// stack.push(Value::i32_zero());
/// stack.push(Value::null(cilflow::ir::IrType::Pointer));
/// assert_eq!(stack.len(), 2);
/// assert_eq!(stack.view(Section::new(1, 1)).len(), 1);
/// assert!(stack.pop().is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbstractStack {
    slots: Vec<Value>,
}

impl AbstractStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty stack with room for `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        AbstractStack {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Pushes `value` onto the tail.
    pub fn push(&mut self, value: Value) {
        self.slots.push(value);
    }

    /// Pops the tail value.
    pub fn pop(&mut self) -> Option<Value> {
        self.slots.pop()
    }

    /// The tail value.
    #[must_use]
    pub fn peek(&self) -> Option<&Value> {
        self.slots.last()
    }

    /// The value in slot `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.slots.get(index)
    }

    /// Replaces slot `index` and returns the previous value, or `None` if the
    /// slot does not exist.
    pub fn set(&mut self, index: usize, value: Value) -> Option<Value> {
        self.slots
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// Current depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if the stack holds no value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Value> + '_ {
        self.slots.iter()
    }

    /// The slots covered by `section`, clamped to the current depth.
    #[must_use]
    pub fn view(&self, section: Section) -> &[Value] {
        let end = section.end().min(self.slots.len());
        let base = section.base().min(end);
        &self.slots[base..end]
    }

    /// All slots, bottom to top.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrType;

    #[test]
    fn test_push_pop_set() {
        let mut stack = AbstractStack::with_capacity(4);
        stack.push(Value::i32_zero());
        stack.push(Value::const_int(IrType::I32, 7));

        let old = stack.set(0, Value::null(IrType::Pointer)).unwrap();
        assert_eq!(old, Value::i32_zero());
        assert!(stack.set(5, Value::i32_zero()).is_none());

        assert_eq!(stack.peek(), Some(&Value::const_int(IrType::I32, 7)));
        assert_eq!(stack.pop(), Some(Value::const_int(IrType::I32, 7)));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.get(0).unwrap().ty(), &IrType::Pointer);
    }

    #[test]
    fn test_view_is_clamped() {
        let mut stack = AbstractStack::new();
        stack.push(Value::i32_zero());
        assert_eq!(stack.view(Section::new(0, 3)).len(), 1);
        assert!(stack.view(Section::new(4, 2)).is_empty());
    }
}
