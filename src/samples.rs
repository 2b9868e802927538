//! Ready-made modules used by the command line tool, the fixture tests and the
//! benchmarks.
//!
//! The `sys` samples target a small host runtime that provides console I/O
//! (`OpenInput`, `ReadInt`, `eot`, `WriteChar`, `WriteInt`, `WriteLn`), a
//! linear memory `env.memory` and a mutable stack pointer
//! `env.__stack_pointer`.

use crate::instruction::Instruction::{self, *};
use crate::module::{DataSegment, FuncId, FunctionBody, GlobalId, Module};
use crate::types::{FunctionType, GlobalType, MemArg, MemoryType, ValueType::I32};

/// A named sample module builder.
pub struct Sample {
    pub name: &'static str,
    pub description: &'static str,
    pub build: fn() -> Module,
}

pub const SAMPLES: &[Sample] = &[
    Sample {
        name: "say42",
        description: "prints 42 through the sys host imports",
        build: say42,
    },
    Sample {
        name: "add",
        description: "reads two integers into stack memory and prints their sum",
        build: add,
    },
    Sample {
        name: "hello-wasi",
        description: "WASI command printing \"Hello, World!\" with fd_write",
        build: hello_wasi,
    },
    Sample {
        name: "oberon-add",
        description: "compiled form of a small Oberon-0 addition program",
        build: oberon_add,
    },
];

pub fn find(name: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|s| s.name == name)
}

/// Handles to the `sys` host environment imports.
struct SysEnv {
    open_input: FuncId,
    read_int: FuncId,
    write_int: FuncId,
    write_ln: FuncId,
    stack_pointer: GlobalId,
}

fn import_sys(module: &mut Module, read_int: FunctionType) -> SysEnv {
    let open_input = module.import_function("sys", "OpenInput", FunctionType::default());
    let read_int = module.import_function("sys", "ReadInt", read_int);
    module.import_function("sys", "eot", FunctionType::new(&[], &[I32]));
    module.import_function("sys", "WriteChar", FunctionType::new(&[I32], &[]));
    let write_int = module.import_function("sys", "WriteInt", FunctionType::new(&[I32, I32], &[]));
    let write_ln = module.import_function("sys", "WriteLn", FunctionType::default());
    module.import_memory("env", "memory", MemoryType::new(1, None));
    let stack_pointer = module.import_global("env", "__stack_pointer", GlobalType::new(I32, true));
    SysEnv {
        open_input,
        read_int,
        write_int,
        write_ln,
        stack_pointer,
    }
}

fn load_word() -> Instruction {
    I32Load { memarg: MemArg::default() }.with_natural_alignment()
}

fn store_word() -> Instruction {
    I32Store { memarg: MemArg::default() }.with_natural_alignment()
}

/// Pushes `stack_pointer + offset`.
fn frame_slot(sp: GlobalId, offset: i32) -> [Instruction; 3] {
    [GlobalGet { global: sp }, I32Const { value: offset }, I32Add]
}

/// Prints 42 and a newline.
pub fn say42() -> Module {
    let mut module = Module::new();
    let sys = import_sys(&mut module, FunctionType::new(&[I32], &[]));
    let body = FunctionBody::new(vec![
        I32Const { value: 42 },
        I32Const { value: 5 },
        Call { func: sys.write_int },
        Call { func: sys.write_ln },
        End,
    ]);
    let say42 = module.add_function(FunctionType::default(), body);
    module.export("say42", say42);
    module
}

/// Reads two integers into a 12-byte stack frame, stores their sum in the
/// third slot and prints it.
pub fn add() -> Module {
    let mut module = Module::new();
    let sys = import_sys(&mut module, FunctionType::new(&[I32], &[]));
    let sp = sys.stack_pointer;

    let mut code = vec![
        GlobalGet { global: sp },
        I32Const { value: 12 },
        I32Sub,
        GlobalSet { global: sp },
        Call { func: sys.open_input },
    ];
    // address of the result slot, consumed by the store below
    code.extend(frame_slot(sp, 8));
    code.extend(frame_slot(sp, 0));
    code.push(Call { func: sys.read_int });
    code.extend(frame_slot(sp, 4));
    code.push(Call { func: sys.read_int });
    code.extend(frame_slot(sp, 0));
    code.push(load_word());
    code.extend(frame_slot(sp, 4));
    code.push(load_word());
    code.extend([I32Add, store_word()]);
    code.extend(frame_slot(sp, 8));
    code.extend([
        load_word(),
        I32Const { value: 5 },
        Call { func: sys.write_int },
        Call { func: sys.write_ln },
    ]);
    code.extend(frame_slot(sp, 12));
    code.extend([GlobalSet { global: sp }, End]);

    let add = module.add_function(FunctionType::default(), FunctionBody::new(code));
    module.export("add", add);
    module
}

/// A WASI command writing "Hello, World!\n" to stdout.
///
/// The iovec at address 0 points at the string, placed at address 8 by an
/// active data segment; `fd_write` stores the written byte count at 20.
pub fn hello_wasi() -> Module {
    const MESSAGE: &[u8] = b"Hello, World!\n";

    let mut module = Module::new();
    let fd_write = module.import_function(
        "wasi_snapshot_preview1",
        "fd_write",
        FunctionType::new(&[I32, I32, I32, I32], &[I32]),
    );
    let memory = module.add_memory(MemoryType::new(1, None));
    module.add_data(DataSegment::active(memory, vec![I32Const { value: 8 }], MESSAGE));

    let body = FunctionBody::new(vec![
        // iovec.buf
        I32Const { value: 0 },
        I32Const { value: 8 },
        store_word(),
        // iovec.len
        I32Const { value: 4 },
        I32Const { value: MESSAGE.len() as i32 },
        store_word(),
        // fd_write(stdout, iovs, iovs_len, nwritten)
        I32Const { value: 1 },
        I32Const { value: 0 },
        I32Const { value: 1 },
        I32Const { value: 20 },
        Call { func: fd_write },
        Drop,
        End,
    ]);
    let start = module.add_function(FunctionType::default(), body);
    module.export("_start", start);
    module.export("memory", memory);
    module
}

/// Reads and adds two integers, then round-trips 42 through a stack slot.
pub fn oberon_add() -> Module {
    let mut module = Module::new();
    let sys = import_sys(&mut module, FunctionType::new(&[], &[I32]));
    let sp = sys.stack_pointer;

    let print = [
        I32Const { value: 5 },
        Call { func: sys.write_int },
        Call { func: sys.write_ln },
    ];
    let mut code = vec![
        Call { func: sys.open_input },
        Call { func: sys.read_int },
        Call { func: sys.read_int },
        I32Add,
    ];
    code.extend(print.clone());
    code.extend([
        GlobalGet { global: sp },
        I32Const { value: 4 },
        I32Sub,
        GlobalSet { global: sp },
        GlobalGet { global: sp },
        I32Const { value: 42 },
        store_word(),
        GlobalGet { global: sp },
    ]);
    code.extend(print.clone());
    code.extend([GlobalGet { global: sp }, load_word()]);
    code.extend(print);
    code.push(End);

    let add = module.add_function(FunctionType::default(), FunctionBody::new(code));
    module.export("add", add);
    module
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_names_are_unique() {
        for (i, a) in SAMPLES.iter().enumerate() {
            assert!(SAMPLES[i + 1..].iter().all(|b| b.name != a.name), "{}", a.name);
        }
        assert!(find("hello-wasi").is_some());
        assert!(find("nope").is_none());
    }

    #[test]
    fn every_sample_encodes() {
        for sample in SAMPLES {
            let bytes = (sample.build)().encode().unwrap();
            assert_eq!(&bytes[..4], b"\0asm", "{}", sample.name);
        }
    }
}
