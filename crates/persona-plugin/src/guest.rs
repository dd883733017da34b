//! Moving strings in and out of guest linear memory.

use wasmtime::{AsContext, AsContextMut, Memory, TypedFunc};

/// Pack a guest buffer as `(ptr << 32) | len`.
pub(crate) fn pack(ptr: u32, len: u32) -> i64 {
    (((ptr as u64) << 32) | len as u64) as i64
}

/// Inverse of [`pack`].
pub(crate) fn unpack(packed: i64) -> (u32, u32) {
    let packed = packed as u64;
    ((packed >> 32) as u32, (packed & 0xFFFF_FFFF) as u32)
}

/// Copy `len` bytes at `ptr` out of guest memory and decode them as UTF-8.
pub(crate) fn read_str(
    store: impl AsContext,
    memory: &Memory,
    ptr: u32,
    len: u32,
) -> wasmtime::Result<String> {
    let (ptr, len) = (ptr as usize, len as usize);
    let end = ptr
        .checked_add(len)
        .filter(|end| *end <= memory.data_size(&store))
        .ok_or_else(|| wasmtime::Error::msg("string exceeds guest memory bounds"))?;

    let mut buf = vec![0u8; end - ptr];
    memory.read(&store, ptr, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Allocate a guest buffer through the plugin's allocator and copy `s` into
/// it. Returns the packed buffer.
pub(crate) fn write_str(
    mut store: impl AsContextMut,
    memory: &Memory,
    alloc: &TypedFunc<i32, i32>,
    s: &str,
) -> wasmtime::Result<i64> {
    let len = i32::try_from(s.len())
        .map_err(|_| wasmtime::Error::msg("string too large for guest memory"))?;
    let ptr = alloc.call(&mut store, len)?;
    memory.write(&mut store, ptr as u32 as usize, s.as_bytes())?;
    Ok(pack(ptr as u32, len as u32))
}
