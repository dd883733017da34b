use std::sync::Arc;
use tracing::debug;
use wasmtime::{ExternType, Instance, Memory, Module, Store, TypedFunc};

use persona_core::contract::{ALLOC_EXPORT, STRING_ENTRY_POINT};
use persona_core::{ExecutionPath, HostAdapterSet, PersonaError, PluginDescriptor, Result};

use crate::guest;
use crate::host::signature_matches;

/// Per-instance data reachable from host functions.
pub(crate) struct HostState {
    pub(crate) plugin: String,
    pub(crate) adapters: Arc<dyn HostAdapterSet>,
}

/// A loaded plugin instance with its imports bound to one adapter set.
///
/// Entry points take and return a UTF-8 string. Calls into the plugin may in
/// turn call back into the bound adapters.
pub struct PluginHandle {
    pub(crate) descriptor: PluginDescriptor,
    pub(crate) path: ExecutionPath,
    pub(crate) module: Module,
    pub(crate) store: Store<HostState>,
    pub(crate) instance: Instance,
    pub(crate) memory: Memory,
    pub(crate) alloc: TypedFunc<i32, i32>,
    pub(crate) fuel: u64,
}

impl PluginHandle {
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn execution_path(&self) -> ExecutionPath {
        self.path
    }

    /// Name of the adapter set bound to this instance.
    pub fn adapters(&self) -> &'static str {
        self.store.data().adapters.name()
    }

    /// Exported entry points callable through [`PluginHandle::call`].
    pub fn exports(&self) -> Vec<String> {
        self.module
            .exports()
            .filter(|export| match export.ty() {
                ExternType::Func(ty) => signature_matches(&ty, STRING_ENTRY_POINT),
                _ => false,
            })
            .map(|export| export.name().to_string())
            .collect()
    }

    /// Current size of the guest's linear memory in 64 KiB pages.
    pub fn memory_pages(&self) -> u64 {
        self.memory.size(&self.store)
    }

    pub fn greet(&mut self, name: &str) -> Result<String> {
        self.call("greet", name)
    }

    pub fn read_file(&mut self, path: &str) -> Result<String> {
        self.call("read_file", path)
    }

    /// Call a string entry point exported by the plugin.
    ///
    /// Each call gets a fresh fuel budget. An adapter failure inside the call
    /// is returned as the adapter's own error.
    pub fn call(&mut self, export: &str, input: &str) -> Result<String> {
        let plugin = self.descriptor.id.clone();
        if export == ALLOC_EXPORT {
            return Err(PersonaError::Plugin {
                plugin,
                reason: format!("{ALLOC_EXPORT} is not an entry point"),
            });
        }

        let func = self
            .instance
            .get_typed_func::<(i32, i32), i64>(&mut self.store, export)
            .map_err(|e| PersonaError::Plugin {
                plugin: plugin.clone(),
                reason: format!("no entry point '{export}' with signature {STRING_ENTRY_POINT}: {e}"),
            })?;

        self.store
            .set_fuel(self.fuel)
            .map_err(|e| guest_error(&plugin, export, e))?;

        debug!(plugin = %plugin, export, path = %self.path, "calling plugin");

        let input = guest::write_str(&mut self.store, &self.memory, &self.alloc, input)
            .map_err(|e| guest_error(&plugin, export, e))?;
        let (ptr, len) = guest::unpack(input);

        let output = func
            .call(&mut self.store, (ptr as i32, len as i32))
            .map_err(|e| guest_error(&plugin, export, e))?;
        let (ptr, len) = guest::unpack(output);

        guest::read_str(&self.store, &self.memory, ptr, len)
            .map_err(|e| guest_error(&plugin, export, e))
    }
}

/// Recover the adapter error behind a trap, or describe the trap.
pub(crate) fn guest_error(plugin: &str, export: &str, err: wasmtime::Error) -> PersonaError {
    match err.downcast::<PersonaError>() {
        Ok(adapter_err) => adapter_err,
        Err(err) => PersonaError::Plugin {
            plugin: plugin.to_string(),
            reason: format!("{export} trapped: {err:#}"),
        },
    }
}
