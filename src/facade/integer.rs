//! Integer and bitwise operations over the C `math_ops` library

use std::ffi::{c_char, CString};

use log::trace;

use super::{check_shift, non_empty, Facade};
use crate::error::{CalcError, CalcResult};
use crate::ffi::{DynamicLibrary, FfiError, FfiSignature, LibraryFamily, SignatureBinder};

/// Capacity used by [`IntegerOps::string_copy`].
pub const DEFAULT_COPY_CAPACITY: usize = 1024;

type BinaryI32 = unsafe extern "C" fn(i32, i32) -> i32;
type BinaryU32 = unsafe extern "C" fn(u32, u32) -> u32;
type ShiftU32 = unsafe extern "C" fn(u32, i32) -> u32;
type SumI32 = unsafe extern "C" fn(*const i32, usize) -> i64;
type ExtremumI32 = unsafe extern "C" fn(*const i32, usize) -> i32;
type StrLen = unsafe extern "C" fn(*const c_char) -> usize;
type StrCopy = unsafe extern "C" fn(*mut c_char, *const c_char, usize);

/// Facade over `libmath_ops`: 32-bit arithmetic, bitwise, array and string operations
pub struct IntegerOps {
    add_int: BinaryI32,
    sub_int: BinaryI32,
    mul_int: BinaryI32,
    div_int: BinaryI32,
    mod_int: BinaryI32,
    bitwise_and: BinaryU32,
    bitwise_or: BinaryU32,
    bitwise_xor: BinaryU32,
    left_shift: ShiftU32,
    right_shift: ShiftU32,
    sum_array: SumI32,
    find_max: ExtremumI32,
    find_min: ExtremumI32,
    string_length: StrLen,
    string_copy: StrCopy,
    signatures: Vec<FfiSignature>,
    // Keeps the symbols above valid.
    _library: DynamicLibrary,
}

impl Facade for IntegerOps {
    const FAMILY: LibraryFamily = LibraryFamily::Integer;

    fn bind(library: DynamicLibrary) -> Result<Self, FfiError> {
        let mut b = SignatureBinder::new(&library);

        let add_int = b.bind("int32_t add_int(int32_t, int32_t)")?;
        let sub_int = b.bind("int32_t sub_int(int32_t, int32_t)")?;
        let mul_int = b.bind("int32_t mul_int(int32_t, int32_t)")?;
        let div_int = b.bind("int32_t div_int(int32_t, int32_t)")?;
        let mod_int = b.bind("int32_t mod_int(int32_t, int32_t)")?;

        let bitwise_and = b.bind("uint32_t bitwise_and(uint32_t, uint32_t)")?;
        let bitwise_or = b.bind("uint32_t bitwise_or(uint32_t, uint32_t)")?;
        let bitwise_xor = b.bind("uint32_t bitwise_xor(uint32_t, uint32_t)")?;
        let left_shift = b.bind("uint32_t left_shift(uint32_t, int32_t)")?;
        let right_shift = b.bind("uint32_t right_shift(uint32_t, int32_t)")?;

        let sum_array = b.bind("int64_t sum_array(const int32_t*, size_t)")?;
        let find_max = b.bind("int32_t find_max(const int32_t*, size_t)")?;
        let find_min = b.bind("int32_t find_min(const int32_t*, size_t)")?;

        let string_length = b.bind("size_t string_length(const char*)")?;
        let string_copy = b.bind("void string_copy(char*, const char*, size_t)")?;

        let signatures = b.finish();
        Ok(Self {
            add_int,
            sub_int,
            mul_int,
            div_int,
            mod_int,
            bitwise_and,
            bitwise_or,
            bitwise_xor,
            left_shift,
            right_shift,
            sum_array,
            find_max,
            find_min,
            string_length,
            string_copy,
            signatures,
            _library: library,
        })
    }

    fn signatures(&self) -> &[FfiSignature] {
        &self.signatures
    }
}

impl IntegerOps {
    /// Construct with the default search chain
    pub fn new() -> CalcResult<Self> {
        Self::open_default()
    }

    /// 32-bit addition
    pub fn add(&self, a: i32, b: i32) -> i32 {
        unsafe { (self.add_int)(a, b) }
    }

    /// 32-bit subtraction
    pub fn subtract(&self, a: i32, b: i32) -> i32 {
        unsafe { (self.sub_int)(a, b) }
    }

    /// 32-bit multiplication
    pub fn multiply(&self, a: i32, b: i32) -> i32 {
        unsafe { (self.mul_int)(a, b) }
    }

    /// Truncating division
    ///
    /// The native library answers a zero divisor with a 0 sentinel that is
    /// indistinguishable from a real quotient, so the divisor is checked
    /// here. `i32::MIN / -1` traps in native code and is rejected too.
    pub fn divide(&self, a: i32, b: i32) -> CalcResult<i32> {
        check_divisor(a, b)?;
        Ok(unsafe { (self.div_int)(a, b) })
    }

    /// Remainder with the sign of the dividend
    pub fn modulo(&self, a: i32, b: i32) -> CalcResult<i32> {
        check_divisor(a, b)?;
        Ok(unsafe { (self.mod_int)(a, b) })
    }

    /// `a & b`
    pub fn bitwise_and(&self, a: u32, b: u32) -> u32 {
        unsafe { (self.bitwise_and)(a, b) }
    }

    /// `a | b`
    pub fn bitwise_or(&self, a: u32, b: u32) -> u32 {
        unsafe { (self.bitwise_or)(a, b) }
    }

    /// `a ^ b`
    pub fn bitwise_xor(&self, a: u32, b: u32) -> u32 {
        unsafe { (self.bitwise_xor)(a, b) }
    }

    /// `value << shift`; `shift` must be in `0..32`
    pub fn left_shift(&self, value: u32, shift: i32) -> CalcResult<u32> {
        check_shift(shift, u32::BITS)?;
        Ok(unsafe { (self.left_shift)(value, shift) })
    }

    /// `value >> shift`; `shift` must be in `0..32`
    pub fn right_shift(&self, value: u32, shift: i32) -> CalcResult<u32> {
        check_shift(shift, u32::BITS)?;
        Ok(unsafe { (self.right_shift)(value, shift) })
    }

    /// Sum widened to 64 bits; an empty slice sums to 0
    pub fn sum_array(&self, values: &[i32]) -> i64 {
        if values.is_empty() {
            return 0;
        }
        unsafe { (self.sum_array)(values.as_ptr(), values.len()) }
    }

    /// Largest element; an empty slice is an invalid argument
    pub fn find_max(&self, values: &[i32]) -> CalcResult<i32> {
        non_empty(values)?;
        Ok(unsafe { (self.find_max)(values.as_ptr(), values.len()) })
    }

    /// Smallest element; an empty slice is an invalid argument
    pub fn find_min(&self, values: &[i32]) -> CalcResult<i32> {
        non_empty(values)?;
        Ok(unsafe { (self.find_min)(values.as_ptr(), values.len()) })
    }

    /// Length in bytes of the UTF-8 encoding
    pub fn string_length(&self, s: &str) -> CalcResult<usize> {
        let c_string = to_c_string(s)?;
        Ok(unsafe { (self.string_length)(c_string.as_ptr()) })
    }

    /// Copy through the native routine with [`DEFAULT_COPY_CAPACITY`]
    pub fn string_copy(&self, src: &str) -> CalcResult<String> {
        self.string_copy_bounded(src, DEFAULT_COPY_CAPACITY)
    }

    /// Copy into a buffer of `capacity` bytes, NUL included
    ///
    /// Text that does not fit is truncated to `capacity - 1` bytes; a
    /// truncated multi-byte character is replaced with U+FFFD.
    pub fn string_copy_bounded(&self, src: &str, capacity: usize) -> CalcResult<String> {
        if capacity == 0 {
            trace!("string_copy rejected: zero capacity");
            return Err(CalcError::invalid("copy capacity must be at least 1"));
        }
        let c_src = to_c_string(src)?;
        let mut dest = vec![0u8; capacity];
        unsafe { (self.string_copy)(dest.as_mut_ptr().cast::<c_char>(), c_src.as_ptr(), capacity) };

        let len = dest.iter().position(|&b| b == 0).unwrap_or(capacity);
        Ok(String::from_utf8_lossy(&dest[..len]).into_owned())
    }
}

fn check_divisor(a: i32, b: i32) -> CalcResult<()> {
    if b == 0 {
        trace!("rejected {} / 0", a);
        return Err(CalcError::DivisionByZero);
    }
    if a == i32::MIN && b == -1 {
        return Err(CalcError::invalid("i32::MIN / -1 overflows int32"));
    }
    Ok(())
}

fn to_c_string(s: &str) -> CalcResult<CString> {
    CString::new(s).map_err(|e| {
        CalcError::invalid(format!(
            "string contains a NUL byte at offset {}",
            e.nul_position()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_divisor() {
        assert!(matches!(check_divisor(10, 0), Err(CalcError::DivisionByZero)));
        assert!(check_divisor(i32::MIN, -1).unwrap_err().is_invalid_argument());
        assert!(check_divisor(i32::MIN, 1).is_ok());
        assert!(check_divisor(-7, 2).is_ok());
    }

    #[test]
    fn test_to_c_string_rejects_interior_nul() {
        let err = to_c_string("ab\0c").unwrap_err();
        assert!(err.to_string().contains("offset 2"));
        assert_eq!(to_c_string("abc").unwrap().as_bytes(), b"abc");
    }
}
