//! Instruction encoding to binary format

use super::Instruction;
use crate::encoding;
use crate::error::EncodeError;
use crate::resolve::Resolution;

impl Instruction {
    /// Get the subopcode for 0xFC prefix instructions
    pub fn subopcode_0xfc(&self) -> Option<u32> {
        use Instruction::*;
        match self {
            I32TruncSatF32S => Some(0x00),
            I32TruncSatF32U => Some(0x01),
            I32TruncSatF64S => Some(0x02),
            I32TruncSatF64U => Some(0x03),
            I64TruncSatF32S => Some(0x04),
            I64TruncSatF32U => Some(0x05),
            I64TruncSatF64S => Some(0x06),
            I64TruncSatF64U => Some(0x07),
            _ => None,
        }
    }

    /// Encode this instruction, reading function and global indices from
    /// `resolution`.
    pub fn encode(&self, buf: &mut Vec<u8>, resolution: &Resolution) -> Result<(), EncodeError> {
        use Instruction::*;

        buf.push(self.opcode());

        // Prefix subopcode
        if let Some(sub) = self.subopcode_0xfc() {
            encoding::write_vu32(buf, sub);
        }

        // Instruction-specific operands
        match self {
            // Block types
            Block { block_type } | Loop { block_type } | If { block_type } => {
                block_type.encode(buf);
            }

            // Label indices
            Br { label_idx } | BrIf { label_idx } => {
                encoding::write_vu32(buf, *label_idx);
            }

            // Branch table
            BrTable { labels, default } => {
                encoding::write_len(buf, labels.len());
                for label in labels {
                    encoding::write_vu32(buf, *label);
                }
                encoding::write_vu32(buf, *default);
            }

            // Function/variable indices
            Call { func } => {
                encoding::write_vu32(buf, resolution.function_index(*func)?);
            }
            LocalGet { local_idx } | LocalSet { local_idx } | LocalTee { local_idx } => {
                encoding::write_vu32(buf, *local_idx);
            }
            GlobalGet { global } | GlobalSet { global } => {
                encoding::write_vu32(buf, resolution.global_index(*global)?);
            }

            // Call indirect
            CallIndirect { type_idx, table_idx } => {
                encoding::write_vu32(buf, *type_idx);
                encoding::write_vu32(buf, *table_idx);
            }

            // Table instructions
            TableGet { table_idx } | TableSet { table_idx } => {
                encoding::write_vu32(buf, *table_idx);
            }

            // Memory size/grow
            MemorySize | MemoryGrow => {
                buf.push(0x00); // reserved byte
            }

            // Constants
            I32Const { value } => {
                encoding::write_vs32(buf, *value);
            }
            I64Const { value } => {
                encoding::write_vs64(buf, *value);
            }
            F32Const { value } => {
                encoding::write_f32(buf, *value);
            }
            F64Const { value } => {
                encoding::write_f64(buf, *value);
            }

            // Memory instructions with memarg, or no operands at all
            _ => {
                if let Some(memarg) = self.memarg() {
                    memarg.encode(buf);
                }
            }
        }

        Ok(())
    }
}

/// Encodes an instruction sequence back to back, with no length prefix.
pub fn encode_all(buf: &mut Vec<u8>, instructions: &[Instruction], resolution: &Resolution) -> Result<(), EncodeError> {
    for instruction in instructions {
        instruction.encode(buf, resolution)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use crate::types::{BlockType, FunctionType, GlobalType, MemArg, ValueType};

    fn encode_one(instruction: Instruction) -> Vec<u8> {
        let resolution = Resolution::resolve(&Module::new());
        let mut buf = Vec::new();
        instruction.encode(&mut buf, &resolution).unwrap();
        buf
    }

    #[test]
    fn plain_opcodes() {
        assert_eq!(encode_one(Instruction::Unreachable), vec![0x00]);
        assert_eq!(encode_one(Instruction::End), vec![0x0B]);
        assert_eq!(encode_one(Instruction::I32Add), vec![0x6A]);
        assert_eq!(encode_one(Instruction::I64Extend32S), vec![0xC4]);
        assert_eq!(encode_one(Instruction::F64ReinterpretI64), vec![0xBF]);
    }

    #[test]
    fn prefixed_opcodes() {
        assert_eq!(encode_one(Instruction::I32TruncSatF32S), vec![0xFC, 0x00]);
        assert_eq!(encode_one(Instruction::I64TruncSatF64U), vec![0xFC, 0x07]);
    }

    #[test]
    fn constants_are_signed() {
        assert_eq!(encode_one(Instruction::I32Const { value: 42 }), vec![0x41, 0x2A]);
        assert_eq!(encode_one(Instruction::I32Const { value: 64 }), vec![0x41, 0xC0, 0x00]);
        assert_eq!(encode_one(Instruction::I32Const { value: -1 }), vec![0x41, 0x7F]);
        assert_eq!(
            encode_one(Instruction::I64Const { value: -123456 }),
            vec![0x42, 0xC0, 0xBB, 0x78]
        );
        assert_eq!(
            encode_one(Instruction::F32Const { value: 1.0 }),
            vec![0x43, 0x00, 0x00, 0x80, 0x3F]
        );
        assert_eq!(encode_one(Instruction::F64Const { value: 0.0 }), vec![0x44, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn memory_immediates_are_align_then_offset() {
        assert_eq!(
            encode_one(Instruction::I32Load {
                memarg: MemArg::new(2, 0)
            }),
            vec![0x28, 0x02, 0x00]
        );
        assert_eq!(
            encode_one(Instruction::I64Store32 {
                memarg: MemArg::new(2, 200)
            }),
            vec![0x3E, 0x02, 0xC8, 0x01]
        );
        assert_eq!(encode_one(Instruction::MemoryGrow), vec![0x40, 0x00]);
    }

    #[test]
    fn natural_alignment_defaults() {
        let natural = |instruction: Instruction| encode_one(instruction.with_natural_alignment());
        assert_eq!(natural(Instruction::I64Load { memarg: MemArg::default() }), vec![0x29, 0x03, 0x00]);
        assert_eq!(natural(Instruction::I32Load8U { memarg: MemArg::default() }), vec![0x2D, 0x00, 0x00]);
        assert_eq!(natural(Instruction::I32Load { memarg: MemArg::at(4) }), vec![0x28, 0x02, 0x04]);
        assert_eq!(natural(Instruction::I64Store16 { memarg: MemArg::default() }), vec![0x3D, 0x01, 0x00]);
    }

    #[test]
    fn control_immediates() {
        assert_eq!(
            encode_one(Instruction::Block {
                block_type: BlockType::Empty
            }),
            vec![0x02, 0x40]
        );
        assert_eq!(
            encode_one(Instruction::If {
                block_type: BlockType::Value(ValueType::I32)
            }),
            vec![0x04, 0x7F]
        );
        assert_eq!(
            encode_one(Instruction::BrTable {
                labels: vec![0, 2],
                default: 1
            }),
            vec![0x0E, 0x02, 0x00, 0x02, 0x01]
        );
        assert_eq!(
            encode_one(Instruction::CallIndirect {
                type_idx: 3,
                table_idx: 0
            }),
            vec![0x11, 0x03, 0x00]
        );
    }

    #[test]
    fn references_read_resolved_indices() {
        let mut module = Module::new();
        let sp = module.import_global("env", "__stack_pointer", GlobalType::new(ValueType::I32, true));
        let _first = module.import_function("sys", "a", FunctionType::default());
        let second = module.import_function("sys", "b", FunctionType::default());
        let resolution = Resolution::resolve(&module);

        let mut buf = Vec::new();
        encode_all(
            &mut buf,
            &[
                Instruction::Call { func: second },
                Instruction::GlobalSet { global: sp },
            ],
            &resolution,
        )
        .unwrap();
        assert_eq!(buf, vec![0x10, 0x01, 0x24, 0x00]);
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let mut other = Module::new();
        let foreign = other.import_function("sys", "x", FunctionType::default());
        let resolution = Resolution::resolve(&Module::new());

        let mut buf = Vec::new();
        let err = Instruction::Call { func: foreign }
            .encode(&mut buf, &resolution)
            .unwrap_err();
        assert!(matches!(err, EncodeError::UnknownFunction(0)));
    }

    #[test]
    fn foreign_handles_in_range_are_rejected() {
        let mut other = Module::new();
        let foreign = other.import_function("sys", "x", FunctionType::default());
        let foreign_global = other.import_global("env", "g", GlobalType::new(ValueType::I32, true));

        let mut module = Module::new();
        module.import_function("sys", "x", FunctionType::default());
        module.import_global("env", "g", GlobalType::new(ValueType::I32, true));
        let resolution = Resolution::resolve(&module);

        let mut buf = Vec::new();
        let err = Instruction::Call { func: foreign }
            .encode(&mut buf, &resolution)
            .unwrap_err();
        assert!(matches!(err, EncodeError::UnknownFunction(0)));
        let err = Instruction::GlobalGet { global: foreign_global }
            .encode(&mut buf, &resolution)
            .unwrap_err();
        assert!(matches!(err, EncodeError::UnknownGlobal(0)));
    }
}
