//! WebAssembly instruction representation
//!
//! A closed catalogue of the operations a function body or constant
//! expression may contain. Each variant carries only the immediates its opcode
//! needs. Instructions that name a function or global hold the module handle
//! rather than a raw index; the index is read from the [`Resolution`] when the
//! instruction is encoded.
//!
//! [`Resolution`]: crate::resolve::Resolution

pub mod encode;

use std::fmt;

use crate::module::{FuncId, GlobalId};
use crate::types::{BlockType, MemArg};

/// Declares the instruction catalogue from one table of
/// `Variant { immediates } = opcode, "mnemonic";` rows and derives
/// [`Instruction::opcode`] and [`Instruction::mnemonic`] from it.
macro_rules! instructions {
    ($( $name:ident $({ $($field:ident : $ty:ty),* })? = $opcode:literal, $mnemonic:literal; )*) => {
        /// A single WebAssembly instruction with its immediates.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Instruction {
            $( $name $({ $($field: $ty),* })?, )*
        }

        impl Instruction {
            /// The primary opcode byte. Prefixed instructions return the prefix.
            pub fn opcode(&self) -> u8 {
                match self {
                    $( Instruction::$name { .. } => $opcode, )*
                }
            }

            /// The text-format name, e.g. `i32.add`.
            pub fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name { .. } => $mnemonic, )*
                }
            }
        }
    };
}

instructions! {
    // Control instructions
    Unreachable = 0x00, "unreachable";
    Nop = 0x01, "nop";
    Block { block_type: BlockType } = 0x02, "block";
    Loop { block_type: BlockType } = 0x03, "loop";
    If { block_type: BlockType } = 0x04, "if";
    Else = 0x05, "else";
    End = 0x0B, "end";
    Br { label_idx: u32 } = 0x0C, "br";
    BrIf { label_idx: u32 } = 0x0D, "br_if";
    BrTable { labels: Vec<u32>, default: u32 } = 0x0E, "br_table";
    Return = 0x0F, "return";
    Call { func: FuncId } = 0x10, "call";
    CallIndirect { type_idx: u32, table_idx: u32 } = 0x11, "call_indirect";

    // Parametric instructions
    Drop = 0x1A, "drop";
    Select = 0x1B, "select";

    // Variable instructions
    LocalGet { local_idx: u32 } = 0x20, "local.get";
    LocalSet { local_idx: u32 } = 0x21, "local.set";
    LocalTee { local_idx: u32 } = 0x22, "local.tee";
    GlobalGet { global: GlobalId } = 0x23, "global.get";
    GlobalSet { global: GlobalId } = 0x24, "global.set";

    // Table instructions
    TableGet { table_idx: u32 } = 0x25, "table.get";
    TableSet { table_idx: u32 } = 0x26, "table.set";

    // Memory instructions
    I32Load { memarg: MemArg } = 0x28, "i32.load";
    I64Load { memarg: MemArg } = 0x29, "i64.load";
    F32Load { memarg: MemArg } = 0x2A, "f32.load";
    F64Load { memarg: MemArg } = 0x2B, "f64.load";
    I32Load8S { memarg: MemArg } = 0x2C, "i32.load8_s";
    I32Load8U { memarg: MemArg } = 0x2D, "i32.load8_u";
    I32Load16S { memarg: MemArg } = 0x2E, "i32.load16_s";
    I32Load16U { memarg: MemArg } = 0x2F, "i32.load16_u";
    I64Load8S { memarg: MemArg } = 0x30, "i64.load8_s";
    I64Load8U { memarg: MemArg } = 0x31, "i64.load8_u";
    I64Load16S { memarg: MemArg } = 0x32, "i64.load16_s";
    I64Load16U { memarg: MemArg } = 0x33, "i64.load16_u";
    I64Load32S { memarg: MemArg } = 0x34, "i64.load32_s";
    I64Load32U { memarg: MemArg } = 0x35, "i64.load32_u";
    I32Store { memarg: MemArg } = 0x36, "i32.store";
    I64Store { memarg: MemArg } = 0x37, "i64.store";
    F32Store { memarg: MemArg } = 0x38, "f32.store";
    F64Store { memarg: MemArg } = 0x39, "f64.store";
    I32Store8 { memarg: MemArg } = 0x3A, "i32.store8";
    I32Store16 { memarg: MemArg } = 0x3B, "i32.store16";
    I64Store8 { memarg: MemArg } = 0x3C, "i64.store8";
    I64Store16 { memarg: MemArg } = 0x3D, "i64.store16";
    I64Store32 { memarg: MemArg } = 0x3E, "i64.store32";
    MemorySize = 0x3F, "memory.size";
    MemoryGrow = 0x40, "memory.grow";

    // Numeric instructions - Constants
    I32Const { value: i32 } = 0x41, "i32.const";
    I64Const { value: i64 } = 0x42, "i64.const";
    F32Const { value: f32 } = 0x43, "f32.const";
    F64Const { value: f64 } = 0x44, "f64.const";

    // Numeric instructions - i32 operations
    I32Eqz = 0x45, "i32.eqz";
    I32Eq = 0x46, "i32.eq";
    I32Ne = 0x47, "i32.ne";
    I32LtS = 0x48, "i32.lt_s";
    I32LtU = 0x49, "i32.lt_u";
    I32GtS = 0x4A, "i32.gt_s";
    I32GtU = 0x4B, "i32.gt_u";
    I32LeS = 0x4C, "i32.le_s";
    I32LeU = 0x4D, "i32.le_u";
    I32GeS = 0x4E, "i32.ge_s";
    I32GeU = 0x4F, "i32.ge_u";
    I32Clz = 0x67, "i32.clz";
    I32Ctz = 0x68, "i32.ctz";
    I32Popcnt = 0x69, "i32.popcnt";
    I32Add = 0x6A, "i32.add";
    I32Sub = 0x6B, "i32.sub";
    I32Mul = 0x6C, "i32.mul";
    I32DivS = 0x6D, "i32.div_s";
    I32DivU = 0x6E, "i32.div_u";
    I32RemS = 0x6F, "i32.rem_s";
    I32RemU = 0x70, "i32.rem_u";
    I32And = 0x71, "i32.and";
    I32Or = 0x72, "i32.or";
    I32Xor = 0x73, "i32.xor";
    I32Shl = 0x74, "i32.shl";
    I32ShrS = 0x75, "i32.shr_s";
    I32ShrU = 0x76, "i32.shr_u";
    I32Rotl = 0x77, "i32.rotl";
    I32Rotr = 0x78, "i32.rotr";

    // Numeric instructions - i64 operations
    I64Eqz = 0x50, "i64.eqz";
    I64Eq = 0x51, "i64.eq";
    I64Ne = 0x52, "i64.ne";
    I64LtS = 0x53, "i64.lt_s";
    I64LtU = 0x54, "i64.lt_u";
    I64GtS = 0x55, "i64.gt_s";
    I64GtU = 0x56, "i64.gt_u";
    I64LeS = 0x57, "i64.le_s";
    I64LeU = 0x58, "i64.le_u";
    I64GeS = 0x59, "i64.ge_s";
    I64GeU = 0x5A, "i64.ge_u";
    I64Clz = 0x79, "i64.clz";
    I64Ctz = 0x7A, "i64.ctz";
    I64Popcnt = 0x7B, "i64.popcnt";
    I64Add = 0x7C, "i64.add";
    I64Sub = 0x7D, "i64.sub";
    I64Mul = 0x7E, "i64.mul";
    I64DivS = 0x7F, "i64.div_s";
    I64DivU = 0x80, "i64.div_u";
    I64RemS = 0x81, "i64.rem_s";
    I64RemU = 0x82, "i64.rem_u";
    I64And = 0x83, "i64.and";
    I64Or = 0x84, "i64.or";
    I64Xor = 0x85, "i64.xor";
    I64Shl = 0x86, "i64.shl";
    I64ShrS = 0x87, "i64.shr_s";
    I64ShrU = 0x88, "i64.shr_u";
    I64Rotl = 0x89, "i64.rotl";
    I64Rotr = 0x8A, "i64.rotr";

    // Numeric instructions - f32 operations
    F32Eq = 0x5B, "f32.eq";
    F32Ne = 0x5C, "f32.ne";
    F32Lt = 0x5D, "f32.lt";
    F32Gt = 0x5E, "f32.gt";
    F32Le = 0x5F, "f32.le";
    F32Ge = 0x60, "f32.ge";
    F32Abs = 0x8B, "f32.abs";
    F32Neg = 0x8C, "f32.neg";
    F32Ceil = 0x8D, "f32.ceil";
    F32Floor = 0x8E, "f32.floor";
    F32Trunc = 0x8F, "f32.trunc";
    F32Nearest = 0x90, "f32.nearest";
    F32Sqrt = 0x91, "f32.sqrt";
    F32Add = 0x92, "f32.add";
    F32Sub = 0x93, "f32.sub";
    F32Mul = 0x94, "f32.mul";
    F32Div = 0x95, "f32.div";
    F32Min = 0x96, "f32.min";
    F32Max = 0x97, "f32.max";
    F32Copysign = 0x98, "f32.copysign";

    // Numeric instructions - f64 operations
    F64Eq = 0x61, "f64.eq";
    F64Ne = 0x62, "f64.ne";
    F64Lt = 0x63, "f64.lt";
    F64Gt = 0x64, "f64.gt";
    F64Le = 0x65, "f64.le";
    F64Ge = 0x66, "f64.ge";
    F64Abs = 0x99, "f64.abs";
    F64Neg = 0x9A, "f64.neg";
    F64Ceil = 0x9B, "f64.ceil";
    F64Floor = 0x9C, "f64.floor";
    F64Trunc = 0x9D, "f64.trunc";
    F64Nearest = 0x9E, "f64.nearest";
    F64Sqrt = 0x9F, "f64.sqrt";
    F64Add = 0xA0, "f64.add";
    F64Sub = 0xA1, "f64.sub";
    F64Mul = 0xA2, "f64.mul";
    F64Div = 0xA3, "f64.div";
    F64Min = 0xA4, "f64.min";
    F64Max = 0xA5, "f64.max";
    F64Copysign = 0xA6, "f64.copysign";

    // Numeric instructions - Conversions
    I32WrapI64 = 0xA7, "i32.wrap_i64";
    I32TruncF32S = 0xA8, "i32.trunc_f32_s";
    I32TruncF32U = 0xA9, "i32.trunc_f32_u";
    I32TruncF64S = 0xAA, "i32.trunc_f64_s";
    I32TruncF64U = 0xAB, "i32.trunc_f64_u";
    I64ExtendI32S = 0xAC, "i64.extend_i32_s";
    I64ExtendI32U = 0xAD, "i64.extend_i32_u";
    I64TruncF32S = 0xAE, "i64.trunc_f32_s";
    I64TruncF32U = 0xAF, "i64.trunc_f32_u";
    I64TruncF64S = 0xB0, "i64.trunc_f64_s";
    I64TruncF64U = 0xB1, "i64.trunc_f64_u";
    F32ConvertI32S = 0xB2, "f32.convert_i32_s";
    F32ConvertI32U = 0xB3, "f32.convert_i32_u";
    F32ConvertI64S = 0xB4, "f32.convert_i64_s";
    F32ConvertI64U = 0xB5, "f32.convert_i64_u";
    F32DemoteF64 = 0xB6, "f32.demote_f64";
    F64ConvertI32S = 0xB7, "f64.convert_i32_s";
    F64ConvertI32U = 0xB8, "f64.convert_i32_u";
    F64ConvertI64S = 0xB9, "f64.convert_i64_s";
    F64ConvertI64U = 0xBA, "f64.convert_i64_u";
    F64PromoteF32 = 0xBB, "f64.promote_f32";
    I32ReinterpretF32 = 0xBC, "i32.reinterpret_f32";
    I64ReinterpretF64 = 0xBD, "i64.reinterpret_f64";
    F32ReinterpretI32 = 0xBE, "f32.reinterpret_i32";
    F64ReinterpretI64 = 0xBF, "f64.reinterpret_i64";

    // Sign extension operations
    I32Extend8S = 0xC0, "i32.extend8_s";
    I32Extend16S = 0xC1, "i32.extend16_s";
    I64Extend8S = 0xC2, "i64.extend8_s";
    I64Extend16S = 0xC3, "i64.extend16_s";
    I64Extend32S = 0xC4, "i64.extend32_s";

    // Saturating truncation operations (0xFC prefix)
    I32TruncSatF32S = 0xFC, "i32.trunc_sat_f32_s";
    I32TruncSatF32U = 0xFC, "i32.trunc_sat_f32_u";
    I32TruncSatF64S = 0xFC, "i32.trunc_sat_f64_s";
    I32TruncSatF64U = 0xFC, "i32.trunc_sat_f64_u";
    I64TruncSatF32S = 0xFC, "i64.trunc_sat_f32_s";
    I64TruncSatF32U = 0xFC, "i64.trunc_sat_f32_u";
    I64TruncSatF64S = 0xFC, "i64.trunc_sat_f64_s";
    I64TruncSatF64U = 0xFC, "i64.trunc_sat_f64_u";
}

/// Binds the memarg of any load or store, by reference or mutably depending
/// on `$insn`.
macro_rules! match_memarg {
    ($insn:expr) => {{
        use Instruction::*;
        match $insn {
            I32Load { memarg }
            | I64Load { memarg }
            | F32Load { memarg }
            | F64Load { memarg }
            | I32Load8S { memarg }
            | I32Load8U { memarg }
            | I32Load16S { memarg }
            | I32Load16U { memarg }
            | I64Load8S { memarg }
            | I64Load8U { memarg }
            | I64Load16S { memarg }
            | I64Load16U { memarg }
            | I64Load32S { memarg }
            | I64Load32U { memarg }
            | I32Store { memarg }
            | I64Store { memarg }
            | F32Store { memarg }
            | F64Store { memarg }
            | I32Store8 { memarg }
            | I32Store16 { memarg }
            | I64Store8 { memarg }
            | I64Store16 { memarg }
            | I64Store32 { memarg } => Some(memarg),
            _ => None,
        }
    }};
}

impl Instruction {
    /// Natural alignment exponent of a memory access, `None` for everything
    /// else.
    pub fn natural_alignment(&self) -> Option<u32> {
        use Instruction::*;
        match self {
            I32Load8S { .. }
            | I32Load8U { .. }
            | I64Load8S { .. }
            | I64Load8U { .. }
            | I32Store8 { .. }
            | I64Store8 { .. } => Some(0),
            I32Load16S { .. }
            | I32Load16U { .. }
            | I64Load16S { .. }
            | I64Load16U { .. }
            | I32Store16 { .. }
            | I64Store16 { .. } => Some(1),
            I32Load { .. }
            | F32Load { .. }
            | I64Load32S { .. }
            | I64Load32U { .. }
            | I32Store { .. }
            | F32Store { .. }
            | I64Store32 { .. } => Some(2),
            I64Load { .. } | F64Load { .. } | I64Store { .. } | F64Store { .. } => Some(3),
            _ => None,
        }
    }

    /// The memory argument of a load or store.
    pub fn memarg(&self) -> Option<&MemArg> {
        match_memarg!(self)
    }

    /// Sets the alignment of a load or store to its access width, keeping the
    /// offset. Other instructions are returned unchanged.
    ///
    /// ```
    /// use wasmgen::{Instruction, MemArg};
    ///
    /// let load = Instruction::I64Load { memarg: MemArg::at(8) }.with_natural_alignment();
    /// assert_eq!(load.memarg(), Some(&MemArg::new(3, 8)));
    /// ```
    pub fn with_natural_alignment(mut self) -> Self {
        if let Some(natural) = self.natural_alignment() {
            if let Some(memarg) = self.memarg_mut() {
                memarg.align = natural;
            }
        }
        self
    }

    fn memarg_mut(&mut self) -> Option<&mut MemArg> {
        match_memarg!(self)
    }

    /// True for the expression terminator.
    pub fn is_end(&self) -> bool {
        matches!(self, Instruction::End)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        write!(f, "{}", self.mnemonic())?;
        match self {
            Block { block_type } | Loop { block_type } | If { block_type } => match block_type {
                BlockType::Empty => Ok(()),
                BlockType::Value(vt) => write!(f, " (result {vt})"),
            },
            Br { label_idx } | BrIf { label_idx } => write!(f, " {label_idx}"),
            BrTable { labels, default } => {
                for label in labels {
                    write!(f, " {label}")?;
                }
                write!(f, " {default}")
            }
            Call { func } => write!(f, " {func}"),
            CallIndirect { type_idx, table_idx } => write!(f, " {table_idx} (type {type_idx})"),
            LocalGet { local_idx } | LocalSet { local_idx } | LocalTee { local_idx } => write!(f, " {local_idx}"),
            GlobalGet { global } | GlobalSet { global } => write!(f, " {global}"),
            TableGet { table_idx } | TableSet { table_idx } => write!(f, " {table_idx}"),
            I32Const { value } => write!(f, " {value}"),
            I64Const { value } => write!(f, " {value}"),
            F32Const { value } => write!(f, " {value}"),
            F64Const { value } => write!(f, " {value}"),
            _ => {
                if let (Some(memarg), Some(natural)) = (self.memarg(), self.natural_alignment()) {
                    if memarg.offset != 0 {
                        write!(f, " offset={}", memarg.offset)?;
                    }
                    if memarg.align != natural {
                        write!(f, " align={}", 1u64 << memarg.align.min(63))?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;

    #[test]
    fn display_plain_and_immediates() {
        assert_eq!(Instruction::I32Add.to_string(), "i32.add");
        assert_eq!(Instruction::I32Const { value: -7 }.to_string(), "i32.const -7");
        assert_eq!(Instruction::LocalGet { local_idx: 2 }.to_string(), "local.get 2");
        assert_eq!(
            Instruction::BrTable {
                labels: vec![0, 1],
                default: 2
            }
            .to_string(),
            "br_table 0 1 2"
        );
        assert_eq!(
            Instruction::Block {
                block_type: BlockType::Value(ValueType::I32)
            }
            .to_string(),
            "block (result i32)"
        );
    }

    #[test]
    fn display_memarg_only_when_not_natural() {
        let natural = Instruction::I32Load {
            memarg: MemArg::new(2, 0),
        };
        assert_eq!(natural.to_string(), "i32.load");

        let unusual = Instruction::I64Store8 {
            memarg: MemArg::new(1, 16),
        };
        assert_eq!(unusual.to_string(), "i64.store8 offset=16 align=2");
    }

    #[test]
    fn natural_alignment_matches_access_width() {
        assert_eq!(Instruction::I64Load { memarg: MemArg::new(3, 0) }.natural_alignment(), Some(3));
        assert_eq!(Instruction::I32Load16U { memarg: MemArg::new(1, 0) }.natural_alignment(), Some(1));
        assert_eq!(Instruction::I64Store8 { memarg: MemArg::default() }.natural_alignment(), Some(0));
        assert_eq!(Instruction::I32Add.natural_alignment(), None);
        assert!(Instruction::I32Add.memarg().is_none());
    }

    #[test]
    fn with_natural_alignment_fills_in_align() {
        let load = Instruction::F64Load { memarg: MemArg::at(24) }.with_natural_alignment();
        assert_eq!(load.memarg(), Some(&MemArg::new(3, 24)));
        assert_eq!(load.to_string(), "f64.load offset=24");

        let store = Instruction::I32Store16 { memarg: MemArg::new(0, 0) }.with_natural_alignment();
        assert_eq!(store.memarg(), Some(&MemArg::new(1, 0)));

        assert_eq!(Instruction::Drop.with_natural_alignment(), Instruction::Drop);
    }
}
