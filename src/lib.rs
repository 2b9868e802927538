//! A WebAssembly binary encoder written in Rust.
//!
//! wasmgen builds WebAssembly modules in memory and serialises them to the
//! `.wasm` binary format. Callers declare functions, memories, globals,
//! imports, exports and data segments against a [`Module`], refer to them
//! through typed handles, and let the encoder assign indices, deduplicate
//! function signatures and lay the sections out in wire order.
//!
//! # Modules
//!
//! - [`encoding`] -- LEB128 varints and the primitive writers everything else is built from.
//! - [`types`] -- Value kinds, function signatures, memory and global types.
//! - [`instruction`] -- The instruction catalogue and its byte encoding.
//! - [`module`] -- The entity model: [`Module`] and the handles into it.
//! - [`resolve`] -- Index assignment and type deduplication.
//! - [`encoder`] -- Section layout and the top-level [`encoder::encode`].
//! - [`samples`] -- Ready-made example modules.
//!
//! # Example
//!
//! Build a module exporting a function that adds its two arguments:
//!
//! ```
//! use wasmgen::{FunctionBody, FunctionType, Instruction, Module, ValueType};
//!
//! let mut module = Module::new();
//! let add = module.add_function(
//!     FunctionType::new(&[ValueType::I32, ValueType::I32], &[ValueType::I32]),
//!     FunctionBody::new(vec![
//!         Instruction::LocalGet { local_idx: 0 },
//!         Instruction::LocalGet { local_idx: 1 },
//!         Instruction::I32Add,
//!         Instruction::End,
//!     ]),
//! );
//! module.export("add", add);
//!
//! let bytes = module.encode().unwrap();
//! assert_eq!(&bytes[..8], b"\0asm\x01\0\0\0");
//! ```

pub mod encoder;
pub mod encoding;
pub mod error;
pub mod instruction;
pub mod module;
pub mod resolve;
pub mod samples;
pub mod types;

pub use error::EncodeError;
pub use instruction::Instruction;
pub use module::{DataSegment, EntityRef, FuncId, FunctionBody, GlobalId, Local, MemoryId, Module};
pub use resolve::Resolution;
pub use types::{BlockType, FunctionType, GlobalType, MemArg, MemoryType, ValueType};
