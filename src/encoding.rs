//! Binary encoding primitives for WebAssembly values.
//!
//! Provides LEB128 integer encoding, IEEE 754 float encoding, names, and
//! length-prefixed vectors as specified by the WebAssembly binary format.
//!
//! All functions write directly into a caller-provided `&mut Vec<u8>` buffer,
//! avoiding intermediate allocations.

use byteorder::{ByteOrder, LittleEndian};

// ---------------------------------------------------------------------------
// WebAssembly binary format constants
// ---------------------------------------------------------------------------

/// Module preamble: `\0asm`.
pub const MAGIC: &[u8; 4] = b"\0asm";

/// Binary format version emitted unless the module overrides it.
pub const DEFAULT_VERSION: u32 = 1;

// Section IDs (§5.5.2)
pub const SECTION_TYPE: u8 = 1;
pub const SECTION_IMPORT: u8 = 2;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_MEMORY: u8 = 5;
pub const SECTION_GLOBAL: u8 = 6;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_CODE: u8 = 10;
pub const SECTION_DATA: u8 = 11;

// Type constructors (§5.3.6)
pub const TYPE_FUNC: u8 = 0x60;

// Import/export descriptor kinds (§5.5.5, §5.5.10)
pub const DESC_FUNC: u8 = 0x00;
pub const DESC_MEMORY: u8 = 0x02;
pub const DESC_GLOBAL: u8 = 0x03;

// Data segment flags (§5.5.14)
pub const DATA_ACTIVE: u32 = 0;
pub const DATA_PASSIVE: u32 = 1;
pub const DATA_ACTIVE_EXPLICIT: u32 = 2;

// Limits flags (§5.3.7)
pub const LIMITS_MIN: u8 = 0x00;
pub const LIMITS_MIN_MAX: u8 = 0x01;

// Expression terminator (§5.4.9)
pub const OP_END: u8 = 0x0B;

// Block type: empty (§5.4.1)
pub const BLOCK_TYPE_EMPTY: u8 = 0x40;

// ---------------------------------------------------------------------------
// Unsigned LEB128
// ---------------------------------------------------------------------------

/// Appends the unsigned LEB128 encoding of `value`, emitting at least
/// `min_len` bytes.
///
/// Padding bytes are redundant zero groups carrying the continuation bit, so
/// `1` padded to five bytes is `81 80 80 80 00`.
pub fn write_vu_padded(buf: &mut Vec<u8>, mut value: u64, min_len: usize) {
    let mut written = 0;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        written += 1;
        if value == 0 && written >= min_len {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

/// Appends the unsigned LEB128 encoding of a u32 value to `buf`.
pub fn write_vu32(buf: &mut Vec<u8>, v: u32) {
    write_vu_padded(buf, v as u64, 0);
}

/// Appends the unsigned LEB128 encoding of a u64 value to `buf`.
pub fn write_vu64(buf: &mut Vec<u8>, v: u64) {
    write_vu_padded(buf, v, 0);
}

/// Appends a single-bit boolean as a one-byte LEB128 value (0x00 or 0x01).
pub fn write_vu1(buf: &mut Vec<u8>, v: bool) {
    buf.push(if v { 1 } else { 0 });
}

/// Appends a collection length as an unsigned LEB128 integer.
pub fn write_len(buf: &mut Vec<u8>, len: usize) {
    write_vu64(buf, len as u64);
}

// ---------------------------------------------------------------------------
// Signed LEB128
// ---------------------------------------------------------------------------

/// Appends the signed LEB128 encoding of `value`, emitting at least
/// `min_len` bytes.
///
/// Termination is sign-aware: the last byte's bit 6 must agree with the sign
/// of what remains, which is why `64` needs two bytes (`c0 00`).
pub fn write_vs_padded(buf: &mut Vec<u8>, mut value: i64, min_len: usize) {
    let mut written = 0;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        written += 1;
        let done = (value == 0 && (byte & 0x40) == 0) || (value == -1 && (byte & 0x40) != 0);
        if done && written >= min_len {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

/// Appends the signed LEB128 encoding of an i32 value to `buf`.
pub fn write_vs32(buf: &mut Vec<u8>, v: i32) {
    write_vs_padded(buf, v as i64, 0);
}

/// Appends the signed LEB128 encoding of an i64 value to `buf`.
pub fn write_vs64(buf: &mut Vec<u8>, v: i64) {
    write_vs_padded(buf, v, 0);
}

// ---------------------------------------------------------------------------
// IEEE 754 floats (little-endian)
// ---------------------------------------------------------------------------

/// Byte width of a fixed-size float immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    /// Single precision, 4 bytes.
    Single,
    /// Double precision, 8 bytes.
    Double,
}

impl FloatWidth {
    pub fn byte_len(self) -> usize {
        match self {
            FloatWidth::Single => 4,
            FloatWidth::Double => 8,
        }
    }
}

/// Appends the little-endian IEEE 754 encoding of an f32 value to `buf`.
pub fn write_f32(buf: &mut Vec<u8>, v: f32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_f32(&mut bytes, v);
    buf.extend_from_slice(&bytes);
}

/// Appends the little-endian IEEE 754 encoding of an f64 value to `buf`.
pub fn write_f64(buf: &mut Vec<u8>, v: f64) {
    let mut bytes = [0u8; 8];
    LittleEndian::write_f64(&mut bytes, v);
    buf.extend_from_slice(&bytes);
}

/// Appends `v` at the requested width. Narrowing to single precision rounds
/// to nearest.
pub fn write_float(buf: &mut Vec<u8>, v: f64, width: FloatWidth) {
    match width {
        FloatWidth::Single => write_f32(buf, v as f32),
        FloatWidth::Double => write_f64(buf, v),
    }
}

// ---------------------------------------------------------------------------
// Names and vectors
// ---------------------------------------------------------------------------

/// Appends a UTF-8 name prefixed with its byte length (not its char count).
pub fn write_name(buf: &mut Vec<u8>, name: &str) {
    write_u8vec(buf, name.as_bytes());
}

/// Appends a length-prefixed byte vector (vu32 length + raw bytes) to `buf`.
pub fn write_u8vec(buf: &mut Vec<u8>, v: &[u8]) {
    write_len(buf, v.len());
    buf.extend_from_slice(v);
}

/// Appends `vec(T)`: the element count followed by each element's encoding.
pub fn write_vec<T, E>(
    buf: &mut Vec<u8>,
    items: &[T],
    mut write_item: impl FnMut(&mut Vec<u8>, &T) -> Result<(), E>,
) -> Result<(), E> {
    write_len(buf, items.len());
    for item in items {
        write_item(buf, item)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
