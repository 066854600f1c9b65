//! Target-IR value handles.
//!
//! A [`Value`] is what sits in an abstract stack slot. It is either a constant the
//! core can materialise on its own, or a handle to a definition owned by the
//! [`Backend`](crate::ir::Backend): a function parameter, a stack allocation or a phi.
//! Values are cheap to clone and are shared by handle between states; cloning never
//! duplicates the backend definition behind it.

use std::fmt;

use crate::ir::IrType;

/// Identifier of a backend definition.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub(crate) usize);

impl ValueId {
    /// Creates a value id from a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        ValueId(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Constants the core creates without consulting the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    /// Integer constant
    Int(i64),
    /// Floating point constant
    Real(f64),
    /// Null pointer
    Null,
    /// Zero initialiser of an aggregate
    Zero,
}

/// What a [`Value`] refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    /// A constant
    Const(Constant),
    /// A backend definition
    Def(ValueId),
}

/// A typed value handle.
///
/// # Examples
///
/// ```rust
/// use cilflow::ir::{IrType, Value};
///
/// let zero = Value::i32_zero();
/// assert_eq!(zero.ty(), &IrType::I32);
/// assert!(zero.is_const());
/// assert_eq!(zero.to_string(), "i32 0");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    kind: ValueKind,
    ty: IrType,
}

impl Value {
    /// A handle to backend definition `id` of type `ty`.
    #[must_use]
    pub fn def(id: ValueId, ty: IrType) -> Self {
        Value {
            kind: ValueKind::Def(id),
            ty,
        }
    }

    /// An integer constant of type `ty`.
    #[must_use]
    pub fn const_int(ty: IrType, value: i64) -> Self {
        Value {
            kind: ValueKind::Const(Constant::Int(value)),
            ty,
        }
    }

    /// A floating point constant of type `ty`.
    #[must_use]
    pub fn const_real(ty: IrType, value: f64) -> Self {
        Value {
            kind: ValueKind::Const(Constant::Real(value)),
            ty,
        }
    }

    /// The null pointer of type `ty`.
    #[must_use]
    pub fn null(ty: IrType) -> Self {
        Value {
            kind: ValueKind::Const(Constant::Null),
            ty,
        }
    }

    /// The zero initialiser of type `ty`.
    #[must_use]
    pub fn zero(ty: IrType) -> Self {
        Value {
            kind: ValueKind::Const(Constant::Zero),
            ty,
        }
    }

    /// The 32-bit integer zero used for padding and placeholder seeding.
    #[must_use]
    pub fn i32_zero() -> Self {
        Value::const_int(IrType::I32, 0)
    }

    /// Returns what this value refers to.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns the value's type.
    #[must_use]
    pub const fn ty(&self) -> &IrType {
        &self.ty
    }

    /// True for constants.
    #[must_use]
    pub const fn is_const(&self) -> bool {
        matches!(self.kind, ValueKind::Const(_))
    }

    /// The backend definition this value refers to, if any.
    #[must_use]
    pub const fn as_def(&self) -> Option<ValueId> {
        match self.kind {
            ValueKind::Def(id) => Some(id),
            ValueKind::Const(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ValueKind::Def(id) => write!(f, "{} {id}", self.ty),
            ValueKind::Const(Constant::Int(v)) => write!(f, "{} {v}", self.ty),
            ValueKind::Const(Constant::Real(v)) => write!(f, "{} {v:?}", self.ty),
            ValueKind::Const(Constant::Null) => write!(f, "{} null", self.ty),
            ValueKind::Const(Constant::Zero) => write!(f, "{} zeroinitializer", self.ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(Value::null(IrType::Pointer).to_string(), "ptr null");
        assert_eq!(Value::const_real(IrType::F64, 0.0).to_string(), "double 0.0");
        assert!(Value::i32_zero().as_def().is_none());
    }

    #[test]
    fn test_def_handles_compare_by_id() {
        let a = Value::def(ValueId::new(4), IrType::I32);
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.as_def(), Some(ValueId::new(4)));
        assert_ne!(a, Value::def(ValueId::new(5), IrType::I32));
        assert_eq!(a.to_string(), "i32 %4");
    }
}
