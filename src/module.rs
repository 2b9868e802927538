//! The in-memory module model.
//!
//! A [`Module`] owns every entity it declares. Functions, memories and globals
//! live in per-kind arenas and are referred to by the copyable handles
//! [`FuncId`], [`MemoryId`] and [`GlobalId`]; imports, exports and
//! instructions hold handles, never raw indices. Indices are assigned when the
//! module is encoded (see [`crate::resolve`]).

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;

use crate::encoding::{self, DESC_FUNC, DESC_GLOBAL, DESC_MEMORY};
use crate::error::EncodeError;
use crate::instruction::encode::encode_all;
use crate::instruction::Instruction;
use crate::resolve::Resolution;
use crate::types::{FunctionType, GlobalType, MemoryType, ValueType};

/// Handle to a function declared in a [`Module`].
///
/// Handles remember the module that issued them and are rejected by any
/// other module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId {
    pub(crate) module: u32,
    pub(crate) index: u32,
}

/// Handle to a memory declared in a [`Module`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryId {
    pub(crate) module: u32,
    pub(crate) index: u32,
}

/// Handle to a global declared in a [`Module`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId {
    pub(crate) module: u32,
    pub(crate) index: u32,
}

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$f{}", self.index)
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$m{}", self.index)
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$g{}", self.index)
    }
}

/// The target of an import or export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Function(FuncId),
    Memory(MemoryId),
    Global(GlobalId),
}

impl From<FuncId> for EntityRef {
    fn from(id: FuncId) -> Self {
        EntityRef::Function(id)
    }
}

impl From<MemoryId> for EntityRef {
    fn from(id: MemoryId) -> Self {
        EntityRef::Memory(id)
    }
}

impl From<GlobalId> for EntityRef {
    fn from(id: GlobalId) -> Self {
        EntityRef::Global(id)
    }
}

impl EntityRef {
    /// The one-byte import/export descriptor kind.
    pub fn kind_byte(&self) -> u8 {
        match self {
            EntityRef::Function(_) => DESC_FUNC,
            EntityRef::Memory(_) => DESC_MEMORY,
            EntityRef::Global(_) => DESC_GLOBAL,
        }
    }
}

// ===========================================================================
// Entities
// ===========================================================================

/// A run of `count` locals of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Local {
    pub count: u32,
    pub value_type: ValueType,
}

impl Local {
    pub fn new(count: u32, value_type: ValueType) -> Self {
        Self { count, value_type }
    }
}

/// Locals and instructions of a locally defined function.
///
/// The instruction list must end with [`Instruction::End`]; encoding fails
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionBody {
    pub locals: Vec<Local>,
    pub instructions: Vec<Instruction>,
}

impl FunctionBody {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            locals: Vec::new(),
            instructions,
        }
    }

    pub fn with_locals(locals: Vec<Local>, instructions: Vec<Instruction>) -> Self {
        Self { locals, instructions }
    }

    /// ```text
    /// code ::= size:u32 func
    /// func ::= vec(locals) expr
    /// ```
    ///
    /// The body is rendered into a scratch buffer first so its size can be
    /// written ahead of it.
    pub fn encode(&self, buf: &mut Vec<u8>, resolution: &Resolution) -> Result<(), EncodeError> {
        let mut body = Vec::new();
        encoding::write_vec(&mut body, &self.locals, |b, local| {
            encoding::write_vu32(b, local.count);
            local.value_type.encode(b);
            Ok::<_, EncodeError>(())
        })?;
        encode_all(&mut body, &self.instructions, resolution)?;
        encoding::write_u8vec(buf, &body);
        Ok(())
    }
}

/// A function: a signature plus, when defined locally, a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub signature: FunctionType,
    pub body: Option<FunctionBody>,
}

/// A linear memory declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memory {
    pub memory_type: MemoryType,
}

/// A global: its type plus, when defined locally, a constant initializer
/// expression terminated by [`Instruction::End`].
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: Option<Vec<Instruction>>,
}

/// A data segment.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSegment {
    /// Raw bytes copied at runtime by an explicit instruction.
    Passive { bytes: Vec<u8> },
    /// Bytes placed into `memory` at the address computed by `offset`.
    Active {
        memory: MemoryId,
        offset: Vec<Instruction>,
        bytes: Vec<u8>,
    },
}

impl DataSegment {
    pub fn passive(bytes: impl Into<Vec<u8>>) -> Self {
        DataSegment::Passive { bytes: bytes.into() }
    }

    /// An active segment. A missing trailing `end` on `offset` is supplied
    /// when the segment is encoded.
    pub fn active(memory: MemoryId, offset: Vec<Instruction>, bytes: impl Into<Vec<u8>>) -> Self {
        DataSegment::Active {
            memory,
            offset,
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            DataSegment::Passive { bytes } | DataSegment::Active { bytes, .. } => bytes,
        }
    }

    fn bytes_mut(&mut self) -> &mut Vec<u8> {
        match self {
            DataSegment::Passive { bytes } | DataSegment::Active { bytes, .. } => bytes,
        }
    }

    /// ```text
    /// data ::= 0x00 expr vec(byte)         (active, memory 0)
    ///        | 0x01 vec(byte)              (passive)
    ///        | 0x02 memidx expr vec(byte)  (active, explicit memory)
    /// ```
    pub fn encode(&self, buf: &mut Vec<u8>, resolution: &Resolution) -> Result<(), EncodeError> {
        match self {
            DataSegment::Passive { bytes } => {
                encoding::write_vu32(buf, encoding::DATA_PASSIVE);
                encoding::write_u8vec(buf, bytes);
            }
            DataSegment::Active { memory, offset, bytes } => {
                let memory_index = resolution.memory_index(*memory)?;
                if memory_index == 0 {
                    encoding::write_vu32(buf, encoding::DATA_ACTIVE);
                } else {
                    encoding::write_vu32(buf, encoding::DATA_ACTIVE_EXPLICIT);
                    encoding::write_vu32(buf, memory_index);
                }
                encode_all(buf, offset, resolution)?;
                if !offset.last().is_some_and(Instruction::is_end) {
                    buf.push(encoding::OP_END);
                }
                encoding::write_u8vec(buf, bytes);
            }
        }
        Ok(())
    }
}

/// Appends to the segment payload.
impl io::Write for DataSegment {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.bytes_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An import binding `module`.`field` to a bodiless entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub field: String,
    pub target: EntityRef,
}

/// An export binding `field` to an entity of this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub field: String,
    pub target: EntityRef,
}

// ===========================================================================
// Module
// ===========================================================================

/// A WebAssembly module under construction.
///
/// Encoding takes `&self`; index assignment lives in a separate
/// [`Resolution`], so a module can be encoded any number of times. A module
/// is plain data and can be cloned to encode copies on other threads.
#[derive(Debug, Clone)]
pub struct Module {
    id: u32,
    version: u32,
    functions: Vec<Function>,
    memories: Vec<Memory>,
    globals: Vec<Global>,
    imports: Vec<Import>,
    exports: Vec<Export>,
    defined_functions: Vec<FuncId>,
    defined_memories: Vec<MemoryId>,
    defined_globals: Vec<GlobalId>,
    data: Vec<DataSegment>,
}

/// Source of [`Module`] identities. Clones share their original's identity.
static NEXT_MODULE_ID: AtomicU32 = AtomicU32::new(0);

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    pub fn new() -> Self {
        Self {
            id: NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed),
            version: encoding::DEFAULT_VERSION,
            functions: Vec::new(),
            memories: Vec::new(),
            globals: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            defined_functions: Vec::new(),
            defined_memories: Vec::new(),
            defined_globals: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Overrides the format version written after the magic number.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Identity stamped into every handle this module issues.
    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    // -- Imports --

    pub fn import_function(&mut self, module: &str, field: &str, signature: FunctionType) -> FuncId {
        let id = self.push_function(Function { signature, body: None });
        self.push_import(module, field, id.into());
        id
    }

    pub fn import_memory(&mut self, module: &str, field: &str, memory_type: MemoryType) -> MemoryId {
        let id = self.push_memory(memory_type);
        self.push_import(module, field, id.into());
        id
    }

    pub fn import_global(&mut self, module: &str, field: &str, global_type: GlobalType) -> GlobalId {
        let id = self.push_global(Global { global_type, init: None });
        self.push_import(module, field, id.into());
        id
    }

    // -- Local definitions --

    /// Adds a locally defined function.
    pub fn add_function(&mut self, signature: FunctionType, body: FunctionBody) -> FuncId {
        let id = self.push_function(Function {
            signature,
            body: Some(body),
        });
        self.defined_functions.push(id);
        id
    }

    /// Reserves a locally defined function whose body is supplied later with
    /// [`Module::define_function`], so bodies can call functions declared
    /// after them (or themselves).
    pub fn declare_function(&mut self, signature: FunctionType) -> FuncId {
        let id = self.push_function(Function { signature, body: None });
        self.defined_functions.push(id);
        id
    }

    /// Supplies or replaces the body of a locally defined function.
    pub fn define_function(&mut self, id: FuncId, body: FunctionBody) -> Result<(), EncodeError> {
        if id.module != self.id || !self.defined_functions.contains(&id) {
            return Err(EncodeError::UnknownFunction(id.index));
        }
        let function = self
            .functions
            .get_mut(id.index as usize)
            .ok_or(EncodeError::UnknownFunction(id.index))?;
        function.body = Some(body);
        Ok(())
    }

    pub fn add_memory(&mut self, memory_type: MemoryType) -> MemoryId {
        let id = self.push_memory(memory_type);
        self.defined_memories.push(id);
        id
    }

    /// Adds a locally defined global. `init` is a constant expression ending
    /// in [`Instruction::End`].
    pub fn add_global(&mut self, global_type: GlobalType, init: Vec<Instruction>) -> GlobalId {
        let id = self.push_global(Global {
            global_type,
            init: Some(init),
        });
        self.defined_globals.push(id);
        id
    }

    pub fn add_data(&mut self, segment: DataSegment) {
        self.data.push(segment);
    }

    pub fn export(&mut self, field: &str, target: impl Into<EntityRef>) {
        self.exports.push(Export {
            field: field.to_string(),
            target: target.into(),
        });
    }

    // -- Accessors --

    /// Looks up a function. Handles issued by another module yield `None`.
    pub fn function(&self, id: FuncId) -> Option<&Function> {
        (id.module == self.id).then(|| self.functions.get(id.index as usize)).flatten()
    }

    pub fn memory(&self, id: MemoryId) -> Option<&Memory> {
        (id.module == self.id).then(|| self.memories.get(id.index as usize)).flatten()
    }

    pub fn global(&self, id: GlobalId) -> Option<&Global> {
        (id.module == self.id).then(|| self.globals.get(id.index as usize)).flatten()
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Locally defined functions in declaration order.
    pub fn defined_functions(&self) -> &[FuncId] {
        &self.defined_functions
    }

    pub fn defined_memories(&self) -> &[MemoryId] {
        &self.defined_memories
    }

    pub fn defined_globals(&self) -> &[GlobalId] {
        &self.defined_globals
    }

    pub fn data(&self) -> &[DataSegment] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [DataSegment] {
        &mut self.data
    }

    // -- Output --

    /// Encodes the module to its binary form. See [`crate::encoder::encode`].
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        crate::encoder::encode(self)
    }

    /// Encodes the module and writes it to `path`. Nothing is written if
    /// encoding fails.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), EncodeError> {
        let bytes = self.encode()?;
        fs::write(path.as_ref(), &bytes)?;
        debug!("wrote {} bytes to {}", bytes.len(), path.as_ref().display());
        Ok(())
    }

    // -- Arena plumbing --

    fn push_function(&mut self, function: Function) -> FuncId {
        self.functions.push(function);
        FuncId {
            module: self.id,
            index: self.functions.len() as u32 - 1,
        }
    }

    fn push_memory(&mut self, memory_type: MemoryType) -> MemoryId {
        self.memories.push(Memory { memory_type });
        MemoryId {
            module: self.id,
            index: self.memories.len() as u32 - 1,
        }
    }

    fn push_global(&mut self, global: Global) -> GlobalId {
        self.globals.push(global);
        GlobalId {
            module: self.id,
            index: self.globals.len() as u32 - 1,
        }
    }

    fn push_import(&mut self, module: &str, field: &str, target: EntityRef) {
        self.imports.push(Import {
            module: module.to_string(),
            field: field.to_string(),
            target,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};
    use std::io::Write;

    #[test]
    fn handles_are_per_kind() {
        let mut module = Module::new();
        let f = module.import_function("env", "f", FunctionType::default());
        let m = module.import_memory("env", "memory", MemoryType::new(1, None));
        let g = module.add_global(
            GlobalType::new(ValueType::I32, false),
            vec![Instruction::I32Const { value: 0 }, Instruction::End],
        );
        assert_eq!((f.index, m.index, g.index), (0, 0, 0));
        assert_eq!(module.imports().len(), 2);
        assert_eq!(module.defined_globals(), &[g]);
        assert_eq!(module.imports()[1].target.kind_byte(), DESC_MEMORY);
    }

    #[test]
    fn define_function_requires_local_declaration() {
        let mut module = Module::new();
        let imported = module.import_function("env", "f", FunctionType::default());
        let declared = module.declare_function(FunctionType::default());

        assert!(matches!(
            module.define_function(imported, FunctionBody::new(vec![Instruction::End])),
            Err(EncodeError::UnknownFunction(0))
        ));
        module
            .define_function(declared, FunctionBody::new(vec![Instruction::End]))
            .unwrap();
        assert!(module.function(declared).unwrap().body.is_some());
    }

    #[test]
    fn handles_belong_to_their_module() {
        let mut other = Module::new();
        let foreign = other.declare_function(FunctionType::default());
        let foreign_memory = other.add_memory(MemoryType::new(1, None));

        let mut module = Module::new();
        let local = module.declare_function(FunctionType::default());
        module.add_memory(MemoryType::new(1, None));
        assert_eq!(foreign.index, local.index);

        assert!(module.function(foreign).is_none());
        assert!(module.memory(foreign_memory).is_none());
        assert!(matches!(
            module.define_function(foreign, FunctionBody::new(vec![Instruction::End])),
            Err(EncodeError::UnknownFunction(0))
        ));
        assert!(module.function(local).unwrap().body.is_none());

        let copy = module.clone();
        assert!(copy.function(local).is_some());
    }

    #[test]
    fn data_segment_accepts_writes() {
        let mut module = Module::new();
        let memory = module.add_memory(MemoryType::new(1, None));
        let mut segment = DataSegment::active(memory, vec![Instruction::I32Const { value: 0 }], Vec::new());
        segment.write_all(b"hi").unwrap();
        segment.write_u32::<LittleEndian>(0x0102_0304).unwrap();
        assert_eq!(segment.bytes(), &[b'h', b'i', 4, 3, 2, 1]);
    }

    #[test]
    fn active_segment_gets_implicit_end() {
        let mut module = Module::new();
        let memory = module.add_memory(MemoryType::new(1, None));
        let resolution = Resolution::resolve(&module);

        let without_end = DataSegment::active(memory, vec![Instruction::I32Const { value: 8 }], b"ab".to_vec());
        let with_end = DataSegment::active(
            memory,
            vec![Instruction::I32Const { value: 8 }, Instruction::End],
            b"ab".to_vec(),
        );

        let mut a = Vec::new();
        without_end.encode(&mut a, &resolution).unwrap();
        let mut b = Vec::new();
        with_end.encode(&mut b, &resolution).unwrap();
        assert_eq!(a, vec![0x00, 0x41, 0x08, 0x0B, 0x02, b'a', b'b']);
        assert_eq!(a, b);
    }

    #[test]
    fn active_segment_on_second_memory_names_it() {
        let mut module = Module::new();
        module.import_memory("env", "memory", MemoryType::new(1, None));
        let second = module.add_memory(MemoryType::new(1, None));
        let resolution = Resolution::resolve(&module);

        let mut buf = Vec::new();
        DataSegment::active(second, vec![], b"z".to_vec())
            .encode(&mut buf, &resolution)
            .unwrap();
        assert_eq!(buf, vec![0x02, 0x01, 0x0B, 0x01, b'z']);
    }

    #[test]
    fn passive_segment_encoding() {
        let resolution = Resolution::resolve(&Module::new());
        let mut buf = Vec::new();
        DataSegment::passive(b"xyz".to_vec()).encode(&mut buf, &resolution).unwrap();
        assert_eq!(buf, vec![0x01, 0x03, b'x', b'y', b'z']);
    }

    #[test]
    fn function_body_is_size_prefixed() {
        let resolution = Resolution::resolve(&Module::new());
        let body = FunctionBody::with_locals(
            vec![Local::new(2, ValueType::I32)],
            vec![Instruction::LocalGet { local_idx: 0 }, Instruction::End],
        );
        let mut buf = Vec::new();
        body.encode(&mut buf, &resolution).unwrap();
        assert_eq!(buf, vec![0x06, 0x01, 0x02, 0x7F, 0x20, 0x00, 0x0B]);
    }
}
