//! Value kinds and the composite types built from them.

use std::fmt;

use crate::encoding::{self, LIMITS_MIN, LIMITS_MIN_MAX, TYPE_FUNC};

/// A WebAssembly value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    // Number types
    I32,
    I64,
    F32,
    F64,
    // Vector types
    V128,
    // Reference types
    FuncRef,
    ExternRef,
}

impl ValueType {
    /// The single-byte type code.
    pub fn wire_byte(self) -> u8 {
        match self {
            ValueType::I32 => 0x7f,
            ValueType::I64 => 0x7e,
            ValueType::F32 => 0x7d,
            ValueType::F64 => 0x7c,
            ValueType::V128 => 0x7b,
            ValueType::FuncRef => 0x70,
            ValueType::ExternRef => 0x6f,
        }
    }

    pub fn encode(self, buf: &mut Vec<u8>) {
        buf.push(self.wire_byte());
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::V128 => "v128",
            ValueType::FuncRef => "funcref",
            ValueType::ExternRef => "externref",
        })
    }
}

/// A function signature.
///
/// Equality and hashing are structural over the parameter and result
/// sequences; that is what type deduplication keys on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl FunctionType {
    pub fn new(params: &[ValueType], results: &[ValueType]) -> Self {
        Self {
            params: params.to_vec(),
            results: results.to_vec(),
        }
    }

    /// ```text
    /// functype ::= 0x60 vec(valtype) vec(valtype)
    /// ```
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(TYPE_FUNC);
        encoding::write_len(buf, self.params.len());
        for p in &self.params {
            p.encode(buf);
        }
        encoding::write_len(buf, self.results.len());
        for r in &self.results {
            r.encode(buf);
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(func")?;
        if !self.params.is_empty() {
            write!(f, " (param")?;
            for p in &self.params {
                write!(f, " {p}")?;
            }
            write!(f, ")")?;
        }
        if !self.results.is_empty() {
            write!(f, " (result")?;
            for r in &self.results {
                write!(f, " {r}")?;
            }
            write!(f, ")")?;
        }
        write!(f, ")")
    }
}

/// Memory limits in 64 KiB pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub min_pages: u32,
    pub max_pages: Option<u32>,
}

impl MemoryType {
    pub fn new(min_pages: u32, max_pages: Option<u32>) -> Self {
        Self { min_pages, max_pages }
    }

    /// ```text
    /// limits ::= 0x00 min:u32 | 0x01 min:u32 max:u32
    /// ```
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self.max_pages {
            Some(max) => {
                buf.push(LIMITS_MIN_MAX);
                encoding::write_vu32(buf, self.min_pages);
                encoding::write_vu32(buf, max);
            }
            None => {
                buf.push(LIMITS_MIN);
                encoding::write_vu32(buf, self.min_pages);
            }
        }
    }
}

/// The type of a global: value kind plus mutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

impl GlobalType {
    pub fn new(value_type: ValueType, mutable: bool) -> Self {
        Self { value_type, mutable }
    }

    /// ```text
    /// globaltype ::= valtype mut
    /// mut        ::= 0x00 (const) | 0x01 (var)
    /// ```
    pub fn encode(&self, buf: &mut Vec<u8>) {
        self.value_type.encode(buf);
        encoding::write_vu1(buf, self.mutable);
    }
}

/// Block type for structured control instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// Empty block type (no results)
    Empty,
    /// Single value type result
    Value(ValueType),
}

impl BlockType {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            BlockType::Empty => buf.push(encoding::BLOCK_TYPE_EMPTY),
            BlockType::Value(vt) => vt.encode(buf),
        }
    }
}

/// Memory argument for memory access instructions
///
/// `MemArg::default()` and [`MemArg::at`] leave the alignment at 0; use
/// [`Instruction::with_natural_alignment`](crate::Instruction::with_natural_alignment)
/// to match it to the access width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemArg {
    /// Memory alignment (as power of 2)
    pub align: u32,
    /// Memory offset
    pub offset: u32,
}

impl MemArg {
    pub fn new(align: u32, offset: u32) -> Self {
        Self { align, offset }
    }

    /// An offset with alignment still to be chosen.
    pub fn at(offset: u32) -> Self {
        Self { align: 0, offset }
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        encoding::write_vu32(buf, self.align);
        encoding::write_vu32(buf, self.offset);
    }
}
