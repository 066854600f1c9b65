//! Target-IR type handles.
//!
//! An [`IrType`] is the resolved target representation of a [`SourceType`]. The
//! resolver only ever asks for its [`TypeKind`] (to pick a zero-initialiser for a
//! local) and compares types for equality (to check phi operands), so the model is
//! kept close to what an LLVM-style backend exposes: sized integers, IEEE floats,
//! opaque pointers, literal structs, arrays and function types.

use std::{fmt, sync::Arc};

use strum::{Display, EnumIter, EnumString};

use crate::{metadata::signature::SourceType, Result};

/// Coarse classification of an [`IrType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TypeKind {
    /// No value
    Void,
    /// Fixed-width integer
    Integer,
    /// IEEE floating point
    Float,
    /// Opaque pointer
    Pointer,
    /// Aggregate of fields
    Struct,
    /// Fixed-length array
    Array,
    /// Function signature
    Function,
}

/// A resolved target type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    /// `void`
    Void,
    /// Integer of the given bit width
    Int(u32),
    /// Float of the given bit width (32 or 64)
    Float(u32),
    /// Opaque pointer
    Pointer,
    /// Named struct with field types in layout order
    Struct {
        /// Struct name
        name: Arc<str>,
        /// Field types
        fields: Arc<[IrType]>,
    },
    /// Array of `len` elements
    Array {
        /// Element type
        elem: Box<IrType>,
        /// Element count
        len: u32,
    },
    /// Function type
    Function {
        /// Return type
        ret: Box<IrType>,
        /// Parameter types
        params: Arc<[IrType]>,
    },
}

impl IrType {
    /// The 32-bit integer type used for stack padding and placeholder seeds.
    pub const I32: IrType = IrType::Int(32);

    /// The double-precision float type.
    pub const F64: IrType = IrType::Float(64);

    /// Returns the kind of this type.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        match self {
            IrType::Void => TypeKind::Void,
            IrType::Int(_) => TypeKind::Integer,
            IrType::Float(_) => TypeKind::Float,
            IrType::Pointer => TypeKind::Pointer,
            IrType::Struct { .. } => TypeKind::Struct,
            IrType::Array { .. } => TypeKind::Array,
            IrType::Function { .. } => TypeKind::Function,
        }
    }

    /// Resolves a source type to its target representation.
    ///
    /// References of any flavour become opaque pointers, value types become
    /// structs and fixed buffers become arrays.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for generic parameters that the reader
    /// did not substitute.
    pub fn from_source(source: &SourceType) -> Result<IrType> {
        let resolved = match source {
            SourceType::Void => IrType::Void,
            SourceType::Bool | SourceType::I8 | SourceType::U8 => IrType::Int(8),
            SourceType::Char | SourceType::I16 | SourceType::U16 => IrType::Int(16),
            SourceType::I32 | SourceType::U32 => IrType::Int(32),
            SourceType::I64
            | SourceType::U64
            | SourceType::NativeInt
            | SourceType::NativeUInt => IrType::Int(64),
            SourceType::F32 => IrType::Float(32),
            SourceType::F64 => IrType::Float(64),
            SourceType::Object
            | SourceType::String
            | SourceType::Class(_)
            | SourceType::SzArray(_)
            | SourceType::Pointer(_)
            | SourceType::ByRef(_)
            | SourceType::FnPtr => IrType::Pointer,
            SourceType::ValueType { name, fields } => IrType::Struct {
                name: name.clone(),
                fields: fields
                    .iter()
                    .map(|field| IrType::from_source(&field.ty))
                    .collect::<Result<Vec<_>>>()?
                    .into(),
            },
            SourceType::FixedBuffer(elem, len) => IrType::Array {
                elem: Box::new(IrType::from_source(elem)?),
                len: *len,
            },
            SourceType::GenericParam(_) | SourceType::MethodGenericParam(_) => {
                return Err(malformed_error!(
                    "Generic parameter {} was not substituted before lowering",
                    source
                ))
            }
        };
        Ok(resolved)
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(bits) => write!(f, "i{bits}"),
            IrType::Float(32) => write!(f, "float"),
            IrType::Float(_) => write!(f, "double"),
            IrType::Pointer => write!(f, "ptr"),
            IrType::Struct { name, .. } => write!(f, "%{name}"),
            IrType::Array { elem, len } => write!(f, "[{len} x {elem}]"),
            IrType::Function { ret, params } => {
                write!(f, "{ret} (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ")")
            }
        }
    }
}
