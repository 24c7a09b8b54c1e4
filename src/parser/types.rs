//! Wire-level types of the binary format
//!
//! Everything here is a thin decoder layered on [`Cursor`]: value types,
//! block types, limits, memory arguments, branch tables, and the
//! import/export descriptions.

use super::cursor::Cursor;
use crate::error::{ParseError, Result, ValidationError};
use std::fmt;

/// Maximum memory size in 64 KiB pages
pub const MAX_MEMORY_PAGES: u64 = 1 << 16;

/// Value types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
    V128,
    FuncRef,
    ExternRef,
}

impl ValueType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x7F => Some(ValueType::I32),
            0x7E => Some(ValueType::I64),
            0x7D => Some(ValueType::F32),
            0x7C => Some(ValueType::F64),
            0x70 => Some(ValueType::FuncRef),
            0x6F => Some(ValueType::ExternRef),
            _ => None,
        }
    }

    /// Decode a value type tag. `v128` never appears on the wire here; it
    /// only enters the stack through SIMD-typed contexts.
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let tag = cursor.read_byte()?;
        Self::from_byte(tag).ok_or_else(|| ParseError::InvalidValueTypeTag { tag }.into())
    }

    /// Decode a value type that must be a reference type
    pub fn read_reference(cursor: &mut Cursor) -> Result<Self> {
        let tag = cursor.read_byte()?;
        match Self::from_byte(tag) {
            Some(ty) if ty.is_reference() => Ok(ty),
            _ => Err(ParseError::ExpectedReferenceType { tag }.into()),
        }
    }

    pub fn is_reference(self) -> bool {
        matches!(self, ValueType::FuncRef | ValueType::ExternRef)
    }

    pub fn is_numeric(self) -> bool {
        !self.is_reference() && self != ValueType::V128
    }

    /// Width in bits for numeric and vector types
    pub fn bit_width(self) -> Option<u32> {
        match self {
            ValueType::I32 | ValueType::F32 => Some(32),
            ValueType::I64 | ValueType::F64 => Some(64),
            ValueType::V128 => Some(128),
            ValueType::FuncRef | ValueType::ExternRef => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::V128 => "v128",
            ValueType::FuncRef => "funcref",
            ValueType::ExternRef => "externref",
        };
        f.write_str(name)
    }
}

/// Function signature: parameter and result types
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl FunctionType {
    /// Decode a function type, tag 0x60 included
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let tag = cursor.read_byte()?;
        if tag != 0x60 {
            return Err(ParseError::InvalidFunctionTypeTag { tag }.into());
        }
        let params = read_value_types(cursor)?;
        let results = read_value_types(cursor)?;
        Ok(FunctionType { params, results })
    }
}

fn read_value_types(cursor: &mut Cursor) -> Result<Vec<ValueType>> {
    let count = cursor.read_u32_leb128()? as usize;
    let mut types = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        types.push(ValueType::read(cursor)?);
    }
    Ok(types)
}

/// Type of a block, loop, or if
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// No parameters, no results
    Empty,
    /// No parameters, one result
    Single(ValueType),
    /// Parameters and results come from the module type table
    TypeIndex(u32),
}

impl BlockType {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let byte = cursor.peek_byte()?;
        if byte == 0x40 {
            cursor.read_byte()?;
            return Ok(BlockType::Empty);
        }
        if let Some(ty) = ValueType::from_byte(byte) {
            cursor.read_byte()?;
            return Ok(BlockType::Single(ty));
        }
        // Signed LEB128 type index; any well-formed encoding is accepted,
        // values outside the type table are rejected at resolution
        let raw = cursor.read_i64_leb128()?;
        let index = u32::try_from(raw)
            .map_err(|_| ValidationError::InvalidTypeIndex { index: raw as u32 })?;
        Ok(BlockType::TypeIndex(index))
    }
}

/// Size bounds of a table or memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl Limits {
    /// Decode limits and enforce `min <= max <= bound`
    pub fn read(cursor: &mut Cursor, bound: u64) -> Result<Self> {
        let flag = cursor.read_byte()?;
        let has_max = match flag {
            0x00 => false,
            0x01 => true,
            _ => return Err(ParseError::InvalidLimitsFlag { flag }.into()),
        };
        let min = cursor.read_u32_leb128()?;
        let max = if has_max {
            Some(cursor.read_u32_leb128()?)
        } else {
            None
        };
        let limits = Limits { min, max };
        limits.validate(bound)?;
        Ok(limits)
    }

    fn validate(&self, bound: u64) -> Result<()> {
        let invalid = ValidationError::InvalidLimits {
            min: self.min as u64,
            max: self.max.map(|m| m as u64).unwrap_or(bound),
        };
        if self.min as u64 > bound {
            return Err(invalid.into());
        }
        if let Some(max) = self.max {
            if max as u64 > bound || self.min > max {
                return Err(invalid.into());
            }
        }
        Ok(())
    }
}

/// Table type: element type plus limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub element_type: ValueType,
    pub limits: Limits,
}

impl TableType {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let element_type = ValueType::read_reference(cursor)?;
        let limits = Limits::read(cursor, u32::MAX as u64)?;
        Ok(TableType {
            element_type,
            limits,
        })
    }
}

/// Memory type: limits in page units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: Limits,
}

impl MemoryType {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let limits = Limits::read(cursor, MAX_MEMORY_PAGES)?;
        Ok(MemoryType { limits })
    }
}

/// Global type: value type plus mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

impl GlobalType {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let value_type = ValueType::read(cursor)?;
        let flag = cursor.read_byte()?;
        let mutable = match flag {
            0x00 => false,
            0x01 => true,
            _ => return Err(ParseError::InvalidMutabilityFlag { flag }.into()),
        };
        Ok(GlobalType {
            value_type,
            mutable,
        })
    }
}

/// Import entry
#[derive(Debug, Clone)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub desc: ImportDesc,
}

/// What an import brings into the module
#[derive(Debug, Clone)]
pub enum ImportDesc {
    /// By type index
    Function(u32),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

impl Import {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let module = read_name(cursor)?;
        let name = read_name(cursor)?;
        let tag = cursor.read_byte()?;
        let desc = match tag {
            0x00 => ImportDesc::Function(cursor.read_u32_leb128()?),
            0x01 => ImportDesc::Table(TableType::read(cursor)?),
            0x02 => ImportDesc::Memory(MemoryType::read(cursor)?),
            0x03 => ImportDesc::Global(GlobalType::read(cursor)?),
            _ => return Err(ParseError::InvalidExternTag { tag }.into()),
        };
        Ok(Import { module, name, desc })
    }
}

/// Export entry
#[derive(Debug, Clone)]
pub struct Export {
    pub name: String,
    pub desc: ExportDesc,
}

/// What an export exposes, by index into the matching index space
#[derive(Debug, Clone, Copy)]
pub enum ExportDesc {
    Function(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
}

impl Export {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let name = read_name(cursor)?;
        let tag = cursor.read_byte()?;
        let index = cursor.read_u32_leb128()?;
        let desc = match tag {
            0x00 => ExportDesc::Function(index),
            0x01 => ExportDesc::Table(index),
            0x02 => ExportDesc::Memory(index),
            0x03 => ExportDesc::Global(index),
            _ => return Err(ParseError::InvalidExternTag { tag }.into()),
        };
        Ok(Export { name, desc })
    }
}

/// Immediate operand of a memory load or store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    pub align: u32,
    pub memory_index: u32,
    pub offset: u32,
}

impl MemArg {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let mut align = cursor.read_u32_leb128()?;
        // Bit 6 of the alignment flags selects an explicit memory index
        let memory_index = if align & 0x40 != 0 {
            align &= !0x40;
            cursor.read_u32_leb128()?
        } else {
            0
        };
        let offset = cursor.read_u32_leb128()?;
        Ok(MemArg {
            align,
            memory_index,
            offset,
        })
    }
}

/// Branch table: label vector plus the default label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrTable {
    pub labels: Vec<u32>,
    pub default: u32,
}

impl BrTable {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let count = cursor.read_u32_leb128()? as usize;
        let mut labels = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            labels.push(cursor.read_u32_leb128()?);
        }
        let default = cursor.read_u32_leb128()?;
        Ok(BrTable { labels, default })
    }
}

/// Length-prefixed UTF-8 name
pub fn read_name(cursor: &mut Cursor) -> Result<String> {
    let len = cursor.read_u32_leb128()? as usize;
    let bytes = cursor.read_exact(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::InvalidUtf8.into())
}
