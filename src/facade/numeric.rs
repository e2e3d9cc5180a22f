//! 64-bit numeric operations over the assembly `asm_math_ops` library

use log::trace;

use super::{check_shift, Facade};
use crate::error::{CalcError, CalcResult};
use crate::ffi::{DynamicLibrary, FfiError, FfiSignature, LibraryFamily, SignatureBinder};

/// Largest `n` whose factorial fits in a `u64`.
pub const MAX_FACTORIAL_U64: i64 = 20;

type BinaryI64 = unsafe extern "C" fn(i64, i64) -> i64;
type BinaryU64 = unsafe extern "C" fn(u64, u64) -> u64;

/// Facade over `libasm_math_ops`
pub struct FastMath {
    add: BinaryI64,
    subtract: BinaryI64,
    multiply: BinaryI64,
    factorial: unsafe extern "C" fn(u32) -> u64,
    power: unsafe extern "C" fn(u32, u32) -> u64,
    bitwise_and: BinaryU64,
    bitwise_or: BinaryU64,
    left_shift: unsafe extern "C" fn(u64, i32) -> u64,
    signatures: Vec<FfiSignature>,
    _library: DynamicLibrary,
}

impl Facade for FastMath {
    const FAMILY: LibraryFamily = LibraryFamily::Numeric;

    fn bind(library: DynamicLibrary) -> Result<Self, FfiError> {
        let mut b = SignatureBinder::new(&library);

        let add = b.bind("int64_t asm_add(int64_t, int64_t)")?;
        let subtract = b.bind("int64_t asm_subtract(int64_t, int64_t)")?;
        let multiply = b.bind("int64_t asm_multiply(int64_t, int64_t)")?;
        let factorial = b.bind("uint64_t asm_factorial(uint32_t)")?;
        let power = b.bind("uint64_t asm_power(uint32_t, uint32_t)")?;
        let bitwise_and = b.bind("uint64_t asm_bitwise_and(uint64_t, uint64_t)")?;
        let bitwise_or = b.bind("uint64_t asm_bitwise_or(uint64_t, uint64_t)")?;
        let left_shift = b.bind("uint64_t asm_left_shift(uint64_t, int32_t)")?;

        let signatures = b.finish();
        Ok(Self {
            add,
            subtract,
            multiply,
            factorial,
            power,
            bitwise_and,
            bitwise_or,
            left_shift,
            signatures,
            _library: library,
        })
    }

    fn signatures(&self) -> &[FfiSignature] {
        &self.signatures
    }
}

impl FastMath {
    /// Construct with the default search chain
    pub fn new() -> CalcResult<Self> {
        Self::open_default()
    }

    /// Wrapping 64-bit addition
    pub fn add(&self, a: i64, b: i64) -> i64 {
        unsafe { (self.add)(a, b) }
    }

    /// Wrapping 64-bit subtraction
    pub fn subtract(&self, a: i64, b: i64) -> i64 {
        unsafe { (self.subtract)(a, b) }
    }

    /// Wrapping 64-bit multiplication
    pub fn multiply(&self, a: i64, b: i64) -> i64 {
        unsafe { (self.multiply)(a, b) }
    }

    /// `n!` for `n` in `0..=20`
    pub fn factorial(&self, n: i64) -> CalcResult<u64> {
        if n < 0 {
            trace!("factorial rejected: {}", n);
            return Err(CalcError::invalid(
                "factorial is not defined for negative numbers",
            ));
        }
        if n > MAX_FACTORIAL_U64 {
            trace!("factorial rejected: {}", n);
            return Err(CalcError::invalid(format!(
                "factorial too large (max n={})",
                MAX_FACTORIAL_U64
            )));
        }
        Ok(unsafe { (self.factorial)(n as u32) })
    }

    /// `base^exp`, wrapping modulo 2^64
    pub fn power(&self, base: u32, exp: i64) -> CalcResult<u64> {
        if exp < 0 {
            trace!("power rejected: exponent {}", exp);
            return Err(CalcError::invalid("negative exponents are not supported"));
        }
        let exp = u32::try_from(exp)
            .map_err(|_| CalcError::invalid(format!("exponent {} does not fit in uint32", exp)))?;
        Ok(unsafe { (self.power)(base, exp) })
    }

    /// `a & b`
    pub fn bitwise_and(&self, a: u64, b: u64) -> u64 {
        unsafe { (self.bitwise_and)(a, b) }
    }

    /// `a | b`
    pub fn bitwise_or(&self, a: u64, b: u64) -> u64 {
        unsafe { (self.bitwise_or)(a, b) }
    }

    /// `value << shift`; `shift` must be in `0..64`
    pub fn left_shift(&self, value: u64, shift: i32) -> CalcResult<u64> {
        check_shift(shift, u64::BITS)?;
        Ok(unsafe { (self.left_shift)(value, shift) })
    }
}
