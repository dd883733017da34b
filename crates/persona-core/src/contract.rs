//! The capability contract: the closed set of host functions a plugin may import.
//!
//! Every slot lives in the [`HOST_MODULE`] import namespace. Strings cross the
//! boundary as `(ptr: i32, len: i32)` pairs in guest memory; string results are
//! returned as an `i64` packing `(ptr << 32) | len`, written into a buffer the
//! host obtains from the guest's [`ALLOC_EXPORT`].

use serde::{Deserialize, Serialize};

use crate::Result;

/// Import module name every contract slot is declared under.
pub const HOST_MODULE: &str = "persona";

/// Guest export the host calls to allocate result buffers.
pub const ALLOC_EXPORT: &str = "persona_alloc";

/// Guest export holding linear memory.
pub const MEMORY_EXPORT: &str = "memory";

/// Core wasm value types used by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasmType {
    I32,
    I64,
    F64,
}

/// Parameter and result types of one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub params: &'static [WasmType],
    pub results: &'static [WasmType],
}

impl Signature {
    pub const fn new(params: &'static [WasmType], results: &'static [WasmType]) -> Self {
        Self { params, results }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_list = |types: &[WasmType]| {
            types
                .iter()
                .map(|t| format!("{t:?}").to_lowercase())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "({}) -> ({})", fmt_list(self.params), fmt_list(self.results))
    }
}

const STR_ARG: &[WasmType] = &[WasmType::I32, WasmType::I32];
const STR_RESULT: &[WasmType] = &[WasmType::I64];

/// Signature of a plugin entry point taking and returning a string.
pub const STRING_ENTRY_POINT: Signature = Signature::new(STR_ARG, STR_RESULT);

/// Signature of the guest allocator.
pub const ALLOC_SIGNATURE: Signature = Signature::new(&[WasmType::I32], &[WasmType::I32]);

/// Function exports every plugin module must provide, besides [`MEMORY_EXPORT`].
pub const REQUIRED_EXPORTS: [(&str, Signature); 4] = [
    (ALLOC_EXPORT, ALLOC_SIGNATURE),
    ("init", Signature::new(&[], &[])),
    ("greet", STRING_ENTRY_POINT),
    ("read_file", STRING_ENTRY_POINT),
];

/// One import slot of the capability contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilitySlot {
    ReadFile,
    WriteFile,
    GetCpuLoad,
    GetFreeMemory,
    GetTotalMemory,
    Init,
    Greet,
}

/// The contract, in declaration order.
pub const CONTRACT: [CapabilitySlot; 7] = [
    CapabilitySlot::ReadFile,
    CapabilitySlot::WriteFile,
    CapabilitySlot::GetCpuLoad,
    CapabilitySlot::GetFreeMemory,
    CapabilitySlot::GetTotalMemory,
    CapabilitySlot::Init,
    CapabilitySlot::Greet,
];

impl CapabilitySlot {
    /// Import name inside [`HOST_MODULE`].
    pub fn name(self) -> &'static str {
        match self {
            CapabilitySlot::ReadFile => "read_file",
            CapabilitySlot::WriteFile => "write_file",
            CapabilitySlot::GetCpuLoad => "get_cpu_load",
            CapabilitySlot::GetFreeMemory => "get_free_memory",
            CapabilitySlot::GetTotalMemory => "get_total_memory",
            CapabilitySlot::Init => "init",
            CapabilitySlot::Greet => "greet",
        }
    }

    pub fn signature(self) -> Signature {
        use WasmType::*;
        match self {
            CapabilitySlot::ReadFile => Signature::new(STR_ARG, STR_RESULT),
            CapabilitySlot::WriteFile => Signature::new(&[I32, I32, I32, I32], &[]),
            CapabilitySlot::GetCpuLoad => Signature::new(&[], &[F64, F64, F64]),
            CapabilitySlot::GetFreeMemory | CapabilitySlot::GetTotalMemory => {
                Signature::new(&[], &[I64])
            }
            CapabilitySlot::Init => Signature::new(&[], &[]),
            CapabilitySlot::Greet => Signature::new(STR_ARG, STR_RESULT),
        }
    }

    /// Look up the slot a module import refers to. `None` means the import is
    /// outside the contract.
    pub fn from_import(module: &str, name: &str) -> Option<Self> {
        if module != HOST_MODULE {
            return None;
        }
        CONTRACT.into_iter().find(|slot| slot.name() == name)
    }
}

impl std::fmt::Display for CapabilitySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", HOST_MODULE, self.name())
    }
}

/// The greeting returned by the `greet` slot.
pub fn greeting(name: &str) -> String {
    format!("Hello, {name}!")
}

/// A binding of every contract slot to a host implementation.
///
/// Implementations hold no per-call state and must agree with each other for
/// every input the contract permits.
pub trait HostAdapterSet: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    fn read_file(&self, path: &str) -> Result<String>;

    fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// 1, 5 and 15 minute load averages, not normalized to core count.
    fn get_cpu_load(&self) -> Result<[f64; 3]>;

    /// Bytes. Sampled independently of [`HostAdapterSet::get_total_memory`].
    fn get_free_memory(&self) -> Result<u64>;

    fn get_total_memory(&self) -> Result<u64>;

    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn greet(&self, name: &str) -> Result<String> {
        Ok(greeting(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_import_requires_host_module() {
        assert_eq!(
            CapabilitySlot::from_import("persona", "read_file"),
            Some(CapabilitySlot::ReadFile)
        );
        assert_eq!(CapabilitySlot::from_import("env", "read_file"), None);
        assert_eq!(CapabilitySlot::from_import("persona", "delete_file"), None);
    }

    #[test]
    fn every_slot_round_trips_through_its_name() {
        for slot in CONTRACT {
            assert_eq!(CapabilitySlot::from_import(HOST_MODULE, slot.name()), Some(slot));
        }
    }

    #[test]
    fn signature_display() {
        assert_eq!(
            CapabilitySlot::GetCpuLoad.signature().to_string(),
            "() -> (f64, f64, f64)"
        );
        assert_eq!(STRING_ENTRY_POINT.to_string(), "(i32, i32) -> (i64)");
    }
}
