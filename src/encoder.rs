//! Encodes a [`Module`] to WebAssembly binary format (`.wasm`).
//!
//! # Binary format overview
//!
//! A WebAssembly binary begins with a magic number (`\0asm`) and a 4-byte
//! little-endian version, followed by sections in a fixed order. Each section
//! is encoded as:
//!
//! ```text
//! section_id: u8 | byte_length: vu32 | contents: byte*
//! ```
//!
//! The type, import, function, export and code sections are always written,
//! even when they hold zero entries. The memory, global and data sections are
//! written only when non-empty.
//!
//! Every function body and global initializer is checked before any byte is
//! produced, so a failed encode never yields partial output.
//!
//! # Example
//!
//! ```
//! use wasmgen::{encoder, FunctionBody, FunctionType, Instruction, Module};
//!
//! let mut module = Module::new();
//! let main = module.add_function(FunctionType::default(), FunctionBody::new(vec![Instruction::End]));
//! module.export("main", main);
//! let bytes = encoder::encode(&module).unwrap();
//! assert_eq!(&bytes[0..4], b"\0asm");
//! ```
use log::debug;

use crate::encoding::{
    self, MAGIC, SECTION_CODE, SECTION_DATA, SECTION_EXPORT, SECTION_FUNCTION, SECTION_GLOBAL, SECTION_IMPORT,
    SECTION_MEMORY, SECTION_TYPE, write_vu32,
};
use crate::error::EncodeError;
use crate::instruction::encode::encode_all;
use crate::instruction::Instruction;
use crate::module::{EntityRef, Module};
use crate::resolve::Resolution;

// ===========================================================================
// Public API
// ===========================================================================

/// Encodes a WebAssembly module to binary format.
pub fn encode(module: &Module) -> Result<Vec<u8>, EncodeError> {
    let resolution = Resolution::resolve(module);
    validate(module, &resolution)?;

    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&module.version().to_le_bytes());

    // Sections in wire order
    encode_type_section(&mut buf, &resolution);
    encode_import_section(&mut buf, module, &resolution)?;
    encode_function_section(&mut buf, module, &resolution)?;
    encode_memory_section(&mut buf, module);
    encode_global_section(&mut buf, module, &resolution)?;
    encode_export_section(&mut buf, module, &resolution)?;
    encode_code_section(&mut buf, module, &resolution)?;
    encode_data_section(&mut buf, module, &resolution)?;

    debug!("encoded module: {} bytes", buf.len());
    Ok(buf)
}

// ===========================================================================
// Validation
// ===========================================================================

/// Checks that every locally defined function has a body ending in `end` and
/// every locally defined global has an initializer ending in `end`.
fn validate(module: &Module, resolution: &Resolution) -> Result<(), EncodeError> {
    for &id in module.defined_functions() {
        let function_idx = resolution.function_index(id)?;
        let body = module
            .function(id)
            .and_then(|f| f.body.as_ref())
            .ok_or(EncodeError::MissingFunctionBody { function: function_idx })?;
        match body.instructions.last() {
            None => return Err(EncodeError::EmptyFunctionBody { function: function_idx }),
            Some(last) if !last.is_end() => {
                return Err(EncodeError::UnterminatedFunctionBody {
                    function: function_idx,
                    last: last.to_string(),
                })
            }
            Some(_) => {}
        }
    }

    for &id in module.defined_globals() {
        let global_idx = resolution.global_index(id)?;
        let init = module
            .global(id)
            .and_then(|g| g.init.as_deref())
            .unwrap_or_default();
        check_initializer(init, global_idx)?;
    }
    Ok(())
}

fn check_initializer(init: &[Instruction], global: u32) -> Result<(), EncodeError> {
    match init.last() {
        None => Err(EncodeError::EmptyGlobalInitializer { global }),
        Some(last) if !last.is_end() => Err(EncodeError::UnterminatedGlobalInitializer {
            global,
            last: last.to_string(),
        }),
        Some(_) => Ok(()),
    }
}

// ===========================================================================
// Section encoders (in wire order)
// ===========================================================================

/// Type section (id 1): deduplicated function signatures.
///
/// ```text
/// typesec  ::= section_1(vec(functype))
/// functype ::= 0x60 vec(valtype) vec(valtype)
/// ```
fn encode_type_section(buf: &mut Vec<u8>, resolution: &Resolution) {
    let types = resolution.types();
    let mut contents = Vec::new();
    encoding::write_len(&mut contents, types.len());
    for ft in types {
        ft.encode(&mut contents);
    }
    emit_section(buf, SECTION_TYPE, &contents);
}

/// Import section (id 2).
///
/// ```text
/// importsec  ::= section_2(vec(import))
/// import     ::= module:name name:name importdesc
/// importdesc ::= 0x00 typeidx | 0x02 memtype | 0x03 globaltype
/// ```
fn encode_import_section(buf: &mut Vec<u8>, module: &Module, resolution: &Resolution) -> Result<(), EncodeError> {
    let mut contents = Vec::new();
    encoding::write_vec(&mut contents, module.imports(), |b, imp| {
        encoding::write_name(b, &imp.module);
        encoding::write_name(b, &imp.field);
        b.push(imp.target.kind_byte());
        match imp.target {
            EntityRef::Function(id) => write_vu32(b, resolution.type_index(id)?),
            EntityRef::Memory(id) => module
                .memory(id)
                .ok_or(EncodeError::UnknownMemory(id.index))?
                .memory_type
                .encode(b),
            EntityRef::Global(id) => module
                .global(id)
                .ok_or(EncodeError::UnknownGlobal(id.index))?
                .global_type
                .encode(b),
        }
        Ok::<_, EncodeError>(())
    })?;
    emit_section(buf, SECTION_IMPORT, &contents);
    Ok(())
}

/// Function section (id 3): type index per local function.
///
/// ```text
/// funcsec ::= section_3(vec(typeidx))
/// ```
fn encode_function_section(buf: &mut Vec<u8>, module: &Module, resolution: &Resolution) -> Result<(), EncodeError> {
    let mut contents = Vec::new();
    encoding::write_vec(&mut contents, module.defined_functions(), |b, &id| {
        write_vu32(b, resolution.type_index(id)?);
        Ok::<_, EncodeError>(())
    })?;
    emit_section(buf, SECTION_FUNCTION, &contents);
    Ok(())
}

/// Memory section (id 5).
///
/// ```text
/// memsec ::= section_5(vec(memtype))
/// ```
fn encode_memory_section(buf: &mut Vec<u8>, module: &Module) {
    let memories: Vec<_> = module
        .defined_memories()
        .iter()
        .filter_map(|&id| module.memory(id))
        .collect();
    if memories.is_empty() {
        return;
    }

    let mut contents = Vec::new();
    encoding::write_len(&mut contents, memories.len());
    for mem in memories {
        mem.memory_type.encode(&mut contents);
    }
    emit_section(buf, SECTION_MEMORY, &contents);
}

/// Global section (id 6).
///
/// ```text
/// globalsec ::= section_6(vec(global))
/// global    ::= globaltype expr
/// ```
fn encode_global_section(buf: &mut Vec<u8>, module: &Module, resolution: &Resolution) -> Result<(), EncodeError> {
    let defined = module.defined_globals();
    if defined.is_empty() {
        return Ok(());
    }

    let mut contents = Vec::new();
    encoding::write_vec(&mut contents, defined, |b, &id| {
        let global = module.global(id).ok_or(EncodeError::UnknownGlobal(id.index))?;
        global.global_type.encode(b);
        encode_all(b, global.init.as_deref().unwrap_or_default(), resolution)
    })?;
    emit_section(buf, SECTION_GLOBAL, &contents);
    Ok(())
}

/// Export section (id 7).
///
/// ```text
/// exportsec  ::= section_7(vec(export))
/// export     ::= name exportdesc
/// exportdesc ::= 0x00 funcidx | 0x02 memidx | 0x03 globalidx
/// ```
fn encode_export_section(buf: &mut Vec<u8>, module: &Module, resolution: &Resolution) -> Result<(), EncodeError> {
    let mut contents = Vec::new();
    encoding::write_vec(&mut contents, module.exports(), |b, export| {
        encoding::write_name(b, &export.field);
        b.push(export.target.kind_byte());
        write_vu32(b, resolution.entity_index(export.target)?);
        Ok::<_, EncodeError>(())
    })?;
    emit_section(buf, SECTION_EXPORT, &contents);
    Ok(())
}

/// Code section (id 10): one size-prefixed entry per local function.
///
/// ```text
/// codesec ::= section_10(vec(code))
/// code    ::= size:u32 func
/// func    ::= vec(locals) expr
/// locals  ::= n:u32 t:valtype
/// ```
fn encode_code_section(buf: &mut Vec<u8>, module: &Module, resolution: &Resolution) -> Result<(), EncodeError> {
    let mut contents = Vec::new();
    encoding::write_vec(&mut contents, module.defined_functions(), |b, &id| {
        let function_idx = resolution.function_index(id)?;
        let body = module
            .function(id)
            .and_then(|f| f.body.as_ref())
            .ok_or(EncodeError::MissingFunctionBody { function: function_idx })?;
        body.encode(b, resolution)
    })?;
    emit_section(buf, SECTION_CODE, &contents);
    Ok(())
}

/// Data section (id 11): memory initialisation segments.
///
/// ```text
/// datasec ::= section_11(vec(data))
/// ```
fn encode_data_section(buf: &mut Vec<u8>, module: &Module, resolution: &Resolution) -> Result<(), EncodeError> {
    let data = module.data();
    if data.is_empty() {
        return Ok(());
    }

    let mut contents = Vec::new();
    encoding::write_vec(&mut contents, data, |b, seg| seg.encode(b, resolution))?;
    emit_section(buf, SECTION_DATA, &contents);
    Ok(())
}

// ===========================================================================
// Shared helpers
// ===========================================================================

/// Wraps section contents with a section ID and length prefix.
fn emit_section(buf: &mut Vec<u8>, id: u8, contents: &[u8]) {
    debug!("section {id}: {} bytes", contents.len());
    buf.push(id);
    encoding::write_len(buf, contents.len());
    buf.extend_from_slice(contents);
}
