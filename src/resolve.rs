//! Index assignment.
//!
//! WebAssembly refers to everything by position within a per-kind index space
//! where imports come first. [`Resolution::resolve`] walks a [`Module`] once
//! and records, for every handle, the index it will be emitted at. It also
//! deduplicates function signatures into the type table.

use indexmap::IndexSet;
use log::{debug, trace};

use crate::error::EncodeError;
use crate::module::{EntityRef, FuncId, GlobalId, MemoryId, Module};
use crate::types::FunctionType;

/// The index tables for one encoding pass.
///
/// Resolving is a pure function of the module, so the same module always
/// resolves to the same tables. Handles issued by any other module are
/// unknown to the result.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    module: u32,
    types: Vec<FunctionType>,
    function_types: Vec<Option<u32>>,
    function_indices: Vec<Option<u32>>,
    memory_indices: Vec<Option<u32>>,
    global_indices: Vec<Option<u32>>,
}

/// Interns `signature`; the first occurrence of a signature keeps its index.
fn intern(table: &mut IndexSet<FunctionType>, signature: &FunctionType) -> u32 {
    let (idx, inserted) = table.insert_full(signature.clone());
    if inserted {
        trace!("type {idx}: {signature}");
    }
    idx as u32
}

fn assign(slots: &mut Vec<Option<u32>>, handle: usize, next: &mut u32) -> u32 {
    if slots.len() <= handle {
        slots.resize(handle + 1, None);
    }
    let idx = *next;
    slots[handle] = Some(idx);
    *next += 1;
    idx
}

impl Resolution {
    pub fn resolve(module: &Module) -> Self {
        let mut table = IndexSet::new();
        let mut resolution = Resolution {
            module: module.id(),
            ..Resolution::default()
        };
        let mut next_function = 0u32;
        let mut next_memory = 0u32;
        let mut next_global = 0u32;

        for import in module.imports() {
            match import.target {
                EntityRef::Function(id) => {
                    let idx = assign(&mut resolution.function_indices, id.index as usize, &mut next_function);
                    if let Some(function) = module.function(id) {
                        let type_idx = intern(&mut table, &function.signature);
                        set(&mut resolution.function_types, id.index as usize, type_idx);
                    }
                    trace!("import {}.{} -> func {idx}", import.module, import.field);
                }
                EntityRef::Memory(id) => {
                    let idx = assign(&mut resolution.memory_indices, id.index as usize, &mut next_memory);
                    trace!("import {}.{} -> memory {idx}", import.module, import.field);
                }
                EntityRef::Global(id) => {
                    let idx = assign(&mut resolution.global_indices, id.index as usize, &mut next_global);
                    trace!("import {}.{} -> global {idx}", import.module, import.field);
                }
            }
        }

        for &id in module.defined_functions() {
            let idx = assign(&mut resolution.function_indices, id.index as usize, &mut next_function);
            if let Some(function) = module.function(id) {
                let type_idx = intern(&mut table, &function.signature);
                set(&mut resolution.function_types, id.index as usize, type_idx);
                trace!("{id} -> func {idx}, type {type_idx}");
            }
        }
        for &id in module.defined_memories() {
            assign(&mut resolution.memory_indices, id.index as usize, &mut next_memory);
        }
        for &id in module.defined_globals() {
            assign(&mut resolution.global_indices, id.index as usize, &mut next_global);
        }

        resolution.types = table.into_iter().collect();
        debug!(
            "resolved {} types, {next_function} functions, {next_memory} memories, {next_global} globals",
            resolution.types.len()
        );
        resolution
    }

    /// The deduplicated type table in emission order.
    pub fn types(&self) -> &[FunctionType] {
        &self.types
    }

    pub fn type_index(&self, id: FuncId) -> Result<u32, EncodeError> {
        self.lookup(&self.function_types, id.module, id.index)
            .ok_or(EncodeError::UnknownFunction(id.index))
    }

    pub fn function_index(&self, id: FuncId) -> Result<u32, EncodeError> {
        self.lookup(&self.function_indices, id.module, id.index)
            .ok_or(EncodeError::UnknownFunction(id.index))
    }

    pub fn memory_index(&self, id: MemoryId) -> Result<u32, EncodeError> {
        self.lookup(&self.memory_indices, id.module, id.index)
            .ok_or(EncodeError::UnknownMemory(id.index))
    }

    pub fn global_index(&self, id: GlobalId) -> Result<u32, EncodeError> {
        self.lookup(&self.global_indices, id.module, id.index)
            .ok_or(EncodeError::UnknownGlobal(id.index))
    }

    /// Index of an import or export target in its kind's index space.
    pub fn entity_index(&self, target: EntityRef) -> Result<u32, EncodeError> {
        match target {
            EntityRef::Function(id) => self.function_index(id),
            EntityRef::Memory(id) => self.memory_index(id),
            EntityRef::Global(id) => self.global_index(id),
        }
    }

    fn lookup(&self, slots: &[Option<u32>], module: u32, handle: u32) -> Option<u32> {
        if module != self.module {
            return None;
        }
        slots.get(handle as usize).copied().flatten()
    }
}

fn set(slots: &mut Vec<Option<u32>>, handle: usize, value: u32) {
    if slots.len() <= handle {
        slots.resize(handle + 1, None);
    }
    slots[handle] = Some(value);
}
