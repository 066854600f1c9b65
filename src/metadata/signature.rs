//! Method signatures and source-level types as delivered by the binary reader.
//!
//! The compiler core only needs the *shape* of a signature: how many formal
//! parameters the lowered function takes, whether slot 0 carries a hidden
//! struct-return pointer, whether there is a `this` pointer, and the declared
//! types of parameters and locals. Everything else about the signature stays with
//! the external metadata reader.

use std::{fmt, sync::Arc};

use bitflags::bitflags;

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
    /// Calling-convention flags relevant to stack layout.
    pub struct SignatureFlags : u8 {
        /// The method receives a `this` pointer as its first argument
        const HAS_THIS = 0x01;
        /// The return value is written through a hidden pointer passed before `this`
        const STRUCT_RETURN = 0x02;
    }
}

/// A named field of a value type, as laid out by the reader.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceField {
    /// Field name, informational only
    pub name: String,
    /// Declared field type
    pub ty: SourceType,
}

/// A source-level type from a signature or a local variable declaration.
///
/// This is deliberately smaller than the full ECMA-335 type grammar: generic
/// instantiations are expected to be substituted by the reader, and anything
/// object-like collapses to a reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SourceType {
    /// `void`
    #[default]
    Void,
    /// `bool`
    Bool,
    /// `char` (UTF-16 code unit)
    Char,
    /// `sbyte`
    I8,
    /// `byte`
    U8,
    /// `short`
    I16,
    /// `ushort`
    U16,
    /// `int`
    I32,
    /// `uint`
    U32,
    /// `long`
    I64,
    /// `ulong`
    U64,
    /// `nint`
    NativeInt,
    /// `nuint`
    NativeUInt,
    /// `float`
    F32,
    /// `double`
    F64,
    /// `object`
    Object,
    /// `string`
    String,
    /// A reference type by name
    Class(Arc<str>),
    /// A value type with its field layout
    ValueType {
        /// Type name
        name: Arc<str>,
        /// Fields in layout order
        fields: Arc<[SourceField]>,
    },
    /// Single-dimensional array of an element type
    SzArray(Box<SourceType>),
    /// Unmanaged pointer
    Pointer(Box<SourceType>),
    /// Managed reference (`ref T`)
    ByRef(Box<SourceType>),
    /// Unsubstituted generic type parameter (`!n`)
    GenericParam(u32),
    /// Unsubstituted generic method parameter (`!!n`)
    MethodGenericParam(u32),
    /// Fixed-length inline buffer, lowered to a target array
    FixedBuffer(Box<SourceType>, u32),
    /// Function pointer
    FnPtr,
}

impl SourceType {
    /// Convenience constructor for a value type.
    #[must_use]
    pub fn value_type(name: &str, fields: Vec<(&str, SourceType)>) -> Self {
        SourceType::ValueType {
            name: Arc::from(name),
            fields: fields
                .into_iter()
                .map(|(name, ty)| SourceField {
                    name: name.to_string(),
                    ty,
                })
                .collect(),
        }
    }

    /// Convenience constructor for a class reference.
    #[must_use]
    pub fn class(name: &str) -> Self {
        SourceType::Class(Arc::from(name))
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Void => write!(f, "void"),
            SourceType::Bool => write!(f, "bool"),
            SourceType::Char => write!(f, "char"),
            SourceType::I8 => write!(f, "int8"),
            SourceType::U8 => write!(f, "uint8"),
            SourceType::I16 => write!(f, "int16"),
            SourceType::U16 => write!(f, "uint16"),
            SourceType::I32 => write!(f, "int32"),
            SourceType::U32 => write!(f, "uint32"),
            SourceType::I64 => write!(f, "int64"),
            SourceType::U64 => write!(f, "uint64"),
            SourceType::NativeInt => write!(f, "native int"),
            SourceType::NativeUInt => write!(f, "native uint"),
            SourceType::F32 => write!(f, "float32"),
            SourceType::F64 => write!(f, "float64"),
            SourceType::Object => write!(f, "object"),
            SourceType::String => write!(f, "string"),
            SourceType::Class(name) => write!(f, "class {name}"),
            SourceType::ValueType { name, .. } => write!(f, "valuetype {name}"),
            SourceType::SzArray(elem) => write!(f, "{elem}[]"),
            SourceType::Pointer(elem) => write!(f, "{elem}*"),
            SourceType::ByRef(elem) => write!(f, "{elem}&"),
            SourceType::GenericParam(n) => write!(f, "!{n}"),
            SourceType::MethodGenericParam(n) => write!(f, "!!{n}"),
            SourceType::FixedBuffer(elem, len) => write!(f, "{elem}[{len}] fixed"),
            SourceType::FnPtr => write!(f, "method*"),
        }
    }
}

/// The parts of a method signature that shape the abstract stack.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodSignature {
    /// Calling-convention flags
    pub flags: SignatureFlags,
    /// Declared return type
    pub ret: SourceType,
    /// Declared parameters, excluding `this` and the struct-return pointer
    pub params: Vec<SourceType>,
    /// Type of `this`, used when [`SignatureFlags::HAS_THIS`] is set
    pub this_type: Option<SourceType>,
}

impl MethodSignature {
    /// A static method with the given parameters.
    #[must_use]
    pub fn new_static(params: Vec<SourceType>, ret: SourceType) -> Self {
        MethodSignature {
            flags: SignatureFlags::empty(),
            ret,
            params,
            this_type: None,
        }
    }

    /// An instance method on `this_type` with the given parameters.
    #[must_use]
    pub fn new_instance(this_type: SourceType, params: Vec<SourceType>, ret: SourceType) -> Self {
        MethodSignature {
            flags: SignatureFlags::HAS_THIS,
            ret,
            params,
            this_type: Some(this_type),
        }
    }

    /// Marks the return value as passed through a hidden struct-return pointer.
    #[must_use]
    pub fn with_struct_return(mut self) -> Self {
        self.flags |= SignatureFlags::STRUCT_RETURN;
        self
    }

    /// True if the method has a `this` argument.
    #[must_use]
    pub fn has_this(&self) -> bool {
        self.flags.contains(SignatureFlags::HAS_THIS)
    }

    /// True if the method returns through a struct-return slot.
    #[must_use]
    pub fn has_struct_return(&self) -> bool {
        self.flags.contains(SignatureFlags::STRUCT_RETURN)
    }

    /// Number of formal arguments of the lowered function, hidden slots included.
    #[must_use]
    pub fn formal_count(&self) -> usize {
        self.params.len() + usize::from(self.has_this()) + usize::from(self.has_struct_return())
    }

    /// Formal argument types in lowered order: struct-return, `this`, parameters.
    #[must_use]
    pub fn formal_types(&self) -> Vec<SourceType> {
        let mut formals = Vec::with_capacity(self.formal_count());
        if self.has_struct_return() {
            formals.push(SourceType::ByRef(Box::new(self.ret.clone())));
        }
        if self.has_this() {
            formals.push(self.this_type.clone().unwrap_or(SourceType::Object));
        }
        formals.extend(self.params.iter().cloned());
        formals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formal_count_includes_hidden_slots() {
        let sig = MethodSignature::new_instance(
            SourceType::class("Sorter"),
            vec![SourceType::I32, SourceType::I32],
            SourceType::value_type("Pair", vec![("a", SourceType::I32)]),
        )
        .with_struct_return();

        assert!(sig.has_this());
        assert!(sig.has_struct_return());
        assert_eq!(sig.formal_count(), 4);

        let formals = sig.formal_types();
        assert!(matches!(formals[0], SourceType::ByRef(_)));
        assert_eq!(formals[1], SourceType::class("Sorter"));
        assert_eq!(formals[2], SourceType::I32);
    }

    #[test]
    fn test_static_signature() {
        let sig = MethodSignature::new_static(vec![SourceType::F64], SourceType::Void);
        assert!(!sig.has_this());
        assert_eq!(sig.formal_count(), 1);
        assert_eq!(sig.formal_types(), vec![SourceType::F64]);
    }

    #[test]
    fn test_display() {
        assert_eq!(SourceType::SzArray(Box::new(SourceType::I32)).to_string(), "int32[]");
        assert_eq!(SourceType::MethodGenericParam(1).to_string(), "!!1");
    }
}
