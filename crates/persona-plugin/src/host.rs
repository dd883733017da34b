use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use wasmtime::*;

use persona_core::contract::{ALLOC_EXPORT, HOST_MODULE, MEMORY_EXPORT, REQUIRED_EXPORTS};
use persona_core::{
    CapabilitySlot, ExecutionPath, HostAdapterSet, LoadErrorReason, PersonaError,
    PluginDescriptor, Result, RuntimeEnvironment, Signature, WasmType,
};

use crate::discovery;
use crate::gateway::GatewayAdapterSet;
use crate::guest;
use crate::handle::{HostState, PluginHandle, guest_error};
use crate::local::LocalAdapterSet;

/// Engine settings for [`PluginHost`].
#[derive(Debug, Clone)]
pub struct HostSettings {
    /// Fuel granted to each guest call.
    pub fuel: u64,
    /// Timeout for gateway adapter requests (`None` = no timeout).
    pub gateway_timeout: Option<Duration>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            fuel: 10_000_000,
            gateway_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// The plugin host discovers plugins and instantiates them with the adapter
/// set matching the execution path.
///
/// ## Plugin ABI
///
/// Plugins are WASM modules that may import any subset of the capability
/// contract from the `persona` module, and must export:
///
/// - `memory` — linear memory
/// - `persona_alloc(size: i32) -> i32` — allocate `size` bytes, return pointer
/// - `init()` — called once after instantiation
/// - `greet(ptr: i32, len: i32) -> i64` and `read_file(ptr: i32, len: i32) -> i64`
///
/// Every string entry point receives UTF-8 input at `ptr`/`len` and returns
/// `(result_ptr << 32) | result_len`.
pub struct PluginHost {
    engine: Engine,
    environment: RuntimeEnvironment,
    settings: HostSettings,
    plugin_dir: PathBuf,
}

impl PluginHost {
    pub fn new(
        plugin_dir: &Path,
        environment: RuntimeEnvironment,
        settings: HostSettings,
    ) -> Result<Self> {
        let mut config = Config::new();
        config.consume_fuel(true);

        let engine = Engine::new(&config).map_err(|e| PersonaError::Plugin {
            plugin: "host".into(),
            reason: format!("failed to create WASM engine: {}", e),
        })?;

        Ok(Self {
            engine,
            environment,
            settings,
            plugin_dir: plugin_dir.to_path_buf(),
        })
    }

    pub fn environment(&self) -> &RuntimeEnvironment {
        &self.environment
    }

    /// Get the plugin directory path.
    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// The path this environment uses when the caller does not choose one.
    pub fn select_path(&self) -> ExecutionPath {
        self.environment.default_path()
    }

    /// Scan the plugin directory. Never cached.
    pub fn discover(&self) -> Result<Vec<PluginDescriptor>> {
        discovery::discover_plugins(&self.plugin_dir)
    }

    /// Build the adapter set for `path`, failing when the environment cannot
    /// provide it.
    pub fn adapters(&self, path: ExecutionPath) -> Result<Arc<dyn HostAdapterSet>> {
        if !self.environment.supports(path) {
            return Err(PersonaError::load(
                "host",
                LoadErrorReason::EnvironmentUnsupported,
                format!("{path} is not available in this runtime"),
            ));
        }
        match path {
            ExecutionPath::DirectBinary => Ok(Arc::new(LocalAdapterSet::new())),
            ExecutionPath::GatewayFallback => {
                let url = self.environment.gateway_url.as_deref().unwrap_or_default();
                Ok(Arc::new(GatewayAdapterSet::new(url, self.settings.gateway_timeout)?))
            }
        }
    }

    /// Instantiate a discovered plugin on the given execution path.
    pub fn load(&self, descriptor: &PluginDescriptor, path: ExecutionPath) -> Result<PluginHandle> {
        let adapters = self.adapters(path).map_err(|e| match e {
            PersonaError::Load { reason, detail, .. } => {
                PersonaError::load(&descriptor.id, reason, detail)
            }
            other => other,
        })?;
        self.load_with_adapters(descriptor, path, adapters)
    }

    /// Instantiate a plugin with an explicit adapter set.
    pub fn load_with_adapters(
        &self,
        descriptor: &PluginDescriptor,
        path: ExecutionPath,
        adapters: Arc<dyn HostAdapterSet>,
    ) -> Result<PluginHandle> {
        let plugin = descriptor.id.as_str();
        let failed =
            |detail: String| PersonaError::load(plugin, LoadErrorReason::InstantiationFailed, detail);

        let manifest = discovery::read_manifest(descriptor).map_err(|e| failed(e.to_string()))?;
        let module_path =
            discovery::resolve_module(descriptor, manifest.as_ref()).map_err(|e| failed(e.to_string()))?;
        let module_bytes = std::fs::read(&module_path)
            .map_err(|e| failed(format!("failed to read {}: {}", module_path.display(), e)))?;

        // Verify checksum
        if let Some(ref manifest) = manifest {
            if !manifest.verify_checksum(&module_bytes) {
                return Err(failed("module checksum verification failed".into()));
            }
        }

        let module = Module::new(&self.engine, &module_bytes)
            .map_err(|e| failed(format!("failed to compile module: {}", e)))?;

        // Nothing below may run before the contract check passes
        check_contract(plugin, &module)?;

        let mut linker = Linker::new(&self.engine);
        link_contract(&mut linker).map_err(|e| failed(format!("failed to link contract: {e}")))?;

        let mut store = Store::new(
            &self.engine,
            HostState {
                plugin: plugin.to_string(),
                adapters,
            },
        );
        store
            .set_fuel(self.settings.fuel)
            .map_err(|e| failed(format!("failed to set fuel: {e}")))?;

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| failed(format!("failed to instantiate module: {e}")))?;

        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .ok_or_else(|| failed(format!("plugin does not export '{MEMORY_EXPORT}'")))?;
        let alloc = instance
            .get_typed_func::<i32, i32>(&mut store, ALLOC_EXPORT)
            .map_err(|e| failed(format!("missing export '{ALLOC_EXPORT}': {e}")))?;
        let init = instance
            .get_typed_func::<(), ()>(&mut store, "init")
            .map_err(|e| failed(format!("missing export 'init': {e}")))?;

        // An adapter failing during init (an unreachable gateway) is a load failure too
        init.call(&mut store, ())
            .map_err(|e| failed(format!("init failed: {}", guest_error(plugin, "init", e))))?;

        info!(
            plugin,
            module = %module_path.display(),
            path = %path,
            adapters = store.data().adapters.name(),
            "plugin loaded"
        );

        Ok(PluginHandle {
            descriptor: descriptor.clone(),
            path,
            module,
            store,
            instance,
            memory,
            alloc,
            fuel: self.settings.fuel,
        })
    }

    /// Discover and load every plugin, logging (not failing on) individual
    /// load errors.
    pub fn load_all(&self, path: ExecutionPath) -> Result<Vec<PluginHandle>> {
        let mut handles = Vec::new();
        for descriptor in self.discover()? {
            match self.load(&descriptor, path) {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!(plugin = %descriptor.id, error = %e, "failed to load plugin"),
            }
        }
        Ok(handles)
    }
}

fn wasm_type(ty: &ValType) -> Option<WasmType> {
    match ty {
        ValType::I32 => Some(WasmType::I32),
        ValType::I64 => Some(WasmType::I64),
        ValType::F64 => Some(WasmType::F64),
        _ => None,
    }
}

/// Structural comparison of a module function type against a contract signature.
pub(crate) fn signature_matches(ty: &FuncType, signature: Signature) -> bool {
    let expected = |types: &[WasmType]| types.iter().map(|t| Some(*t)).collect::<Vec<_>>();
    let params: Vec<_> = ty.params().map(|t| wasm_type(&t)).collect();
    let results: Vec<_> = ty.results().map(|t| wasm_type(&t)).collect();
    params == expected(signature.params) && results == expected(signature.results)
}

fn describe(ty: &FuncType) -> String {
    let list = |types: Vec<ValType>| {
        types
            .iter()
            .map(|t| format!("{t:?}").to_lowercase())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "({}) -> ({})",
        list(ty.params().collect()),
        list(ty.results().collect())
    )
}

/// Reject any module whose imports exceed the capability contract or whose
/// exports do not match the plugin interface.
pub(crate) fn check_contract(plugin: &str, module: &Module) -> Result<()> {
    let incompatible =
        |detail: String| PersonaError::load(plugin, LoadErrorReason::IncompatibleContract, detail);

    for import in module.imports() {
        let Some(slot) = CapabilitySlot::from_import(import.module(), import.name()) else {
            return Err(incompatible(format!(
                "import {}::{} is not part of the capability contract",
                import.module(),
                import.name()
            )));
        };
        match import.ty() {
            ExternType::Func(ty) if signature_matches(&ty, slot.signature()) => {
                debug!(plugin, %slot, "import matches contract");
            }
            ExternType::Func(ty) => {
                return Err(incompatible(format!(
                    "{slot} declared as {}, contract requires {}",
                    describe(&ty),
                    slot.signature()
                )));
            }
            _ => {
                return Err(incompatible(format!("{slot} must be imported as a function")));
            }
        }
    }

    if !matches!(module.get_export(MEMORY_EXPORT), Some(ExternType::Memory(_))) {
        return Err(incompatible(format!("missing memory export '{MEMORY_EXPORT}'")));
    }

    for (name, signature) in REQUIRED_EXPORTS {
        match module.get_export(name) {
            Some(ExternType::Func(ty)) if signature_matches(&ty, signature) => {}
            Some(ExternType::Func(ty)) => {
                return Err(incompatible(format!(
                    "export '{name}' is {}, interface requires {signature}",
                    describe(&ty)
                )));
            }
            _ => return Err(incompatible(format!("missing export '{name}'"))),
        }
    }

    Ok(())
}

fn guest_buffers(caller: &mut Caller<'_, HostState>) -> wasmtime::Result<(Memory, TypedFunc<i32, i32>)> {
    let memory = caller
        .get_export(MEMORY_EXPORT)
        .and_then(Extern::into_memory)
        .ok_or_else(|| wasmtime::Error::msg("plugin does not export memory"))?;
    let alloc = caller
        .get_export(ALLOC_EXPORT)
        .and_then(Extern::into_func)
        .ok_or_else(|| wasmtime::Error::msg("plugin does not export persona_alloc"))?
        .typed::<i32, i32>(&*caller)?;
    Ok((memory, alloc))
}

fn read_arg(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> wasmtime::Result<String> {
    let (memory, _) = guest_buffers(caller)?;
    guest::read_str(&*caller, &memory, ptr as u32, len as u32)
}

fn return_str(caller: &mut Caller<'_, HostState>, s: &str) -> wasmtime::Result<i64> {
    let (memory, alloc) = guest_buffers(caller)?;
    guest::write_str(&mut *caller, &memory, &alloc, s)
}

fn adapters(caller: &Caller<'_, HostState>, slot: CapabilitySlot) -> Arc<dyn HostAdapterSet> {
    let state = caller.data();
    debug!(plugin = %state.plugin, %slot, adapters = state.adapters.name(), "host call");
    Arc::clone(&state.adapters)
}

/// Bind every contract slot to the adapter set stored in the instance data.
/// Adapter errors become traps carrying the original [`PersonaError`].
fn link_contract(linker: &mut Linker<HostState>) -> wasmtime::Result<()> {
    linker.func_wrap(
        HOST_MODULE,
        CapabilitySlot::ReadFile.name(),
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<i64> {
            let path = read_arg(&mut caller, ptr, len)?;
            let content = adapters(&caller, CapabilitySlot::ReadFile)
                .read_file(&path)
                .map_err(wasmtime::Error::new)?;
            return_str(&mut caller, &content)
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        CapabilitySlot::WriteFile.name(),
        |mut caller: Caller<'_, HostState>,
         path_ptr: i32,
         path_len: i32,
         content_ptr: i32,
         content_len: i32|
         -> wasmtime::Result<()> {
            let path = read_arg(&mut caller, path_ptr, path_len)?;
            let content = read_arg(&mut caller, content_ptr, content_len)?;
            adapters(&caller, CapabilitySlot::WriteFile)
                .write_file(&path, &content)
                .map_err(wasmtime::Error::new)
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        CapabilitySlot::GetCpuLoad.name(),
        |caller: Caller<'_, HostState>| -> wasmtime::Result<(f64, f64, f64)> {
            let [one, five, fifteen] = adapters(&caller, CapabilitySlot::GetCpuLoad)
                .get_cpu_load()
                .map_err(wasmtime::Error::new)?;
            Ok((one, five, fifteen))
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        CapabilitySlot::GetFreeMemory.name(),
        |caller: Caller<'_, HostState>| -> wasmtime::Result<i64> {
            let bytes = adapters(&caller, CapabilitySlot::GetFreeMemory)
                .get_free_memory()
                .map_err(wasmtime::Error::new)?;
            Ok(bytes as i64)
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        CapabilitySlot::GetTotalMemory.name(),
        |caller: Caller<'_, HostState>| -> wasmtime::Result<i64> {
            let bytes = adapters(&caller, CapabilitySlot::GetTotalMemory)
                .get_total_memory()
                .map_err(wasmtime::Error::new)?;
            Ok(bytes as i64)
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        CapabilitySlot::Init.name(),
        |caller: Caller<'_, HostState>| -> wasmtime::Result<()> {
            adapters(&caller, CapabilitySlot::Init)
                .init()
                .map_err(wasmtime::Error::new)
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        CapabilitySlot::Greet.name(),
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<i64> {
            let name = read_arg(&mut caller, ptr, len)?;
            let greeting = adapters(&caller, CapabilitySlot::Greet)
                .greet(&name)
                .map_err(wasmtime::Error::new)?;
            return_str(&mut caller, &greeting)
        },
    )?;

    Ok(())
}
