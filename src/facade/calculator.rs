//! Object-oriented calculator over the C++ library's C ABI
//!
//! The native side owns two objects: a basic `Calculator`, which serves the
//! four arithmetic operations and keeps the history, and an
//! `AdvancedCalculator` for everything else. Both live exactly as long as
//! the facade.

use std::ffi::{c_char, CStr};
use std::ptr::NonNull;

use log::{debug, trace};

use super::translate::{self, CALC_SUCCESS};
use super::Facade;
use crate::error::{CalcError, CalcResult};
use crate::ffi::{
    AdvancedCalculatorHandle, CalculatorHandle, DynamicLibrary, FfiError, FfiSignature,
    LibraryFamily, LibraryLocator, SignatureBinder,
};

/// Largest `n` whose factorial is finite as an `f64`.
pub const MAX_FACTORIAL_F64: i32 = 170;

/// `Calculator::getCalculatorType()` of the basic native class; the C ABI does
/// not export it.
pub const BASIC_CALCULATOR_TYPE: &str = "Basic Calculator";

const HISTORY_BUFFER_START: usize = 128;
const HISTORY_BUFFER_MAX: usize = 64 * 1024;

type Basic = *mut CalculatorHandle;
type Advanced = *mut AdvancedCalculatorHandle;

type BasicBinary = unsafe extern "C" fn(Basic, f64, f64, *mut f64) -> i32;
type AdvancedUnary = unsafe extern "C" fn(Advanced, f64, *mut f64) -> i32;
type SumI32 = unsafe extern "C" fn(Advanced, *const i32, usize, *mut i64) -> i32;
type ExtremumI32 = unsafe extern "C" fn(Advanced, *const i32, usize, *mut i32) -> i32;
type ReduceF64 = unsafe extern "C" fn(Advanced, *const f64, usize, *mut f64) -> i32;

struct CalculatorApi {
    destroy: unsafe extern "C" fn(Basic),
    add: BasicBinary,
    subtract: BasicBinary,
    multiply: BasicBinary,
    divide: BasicBinary,
    last_result: unsafe extern "C" fn(Basic) -> f64,
    history_count: unsafe extern "C" fn(Basic) -> usize,
    history_entry: unsafe extern "C" fn(Basic, usize, *mut c_char, usize) -> i32,
    clear_history: unsafe extern "C" fn(Basic),

    advanced_destroy: unsafe extern "C" fn(Advanced),
    power: unsafe extern "C" fn(Advanced, f64, i32, *mut f64) -> i32,
    square_root: AdvancedUnary,
    factorial: unsafe extern "C" fn(Advanced, i32, *mut f64) -> i32,
    sine: AdvancedUnary,
    cosine: AdvancedUnary,
    sum_i32: SumI32,
    max_i32: ExtremumI32,
    min_i32: ExtremumI32,
    sum_f64: ReduceF64,
    max_f64: ReduceF64,
    min_f64: ReduceF64,
    batch_add: unsafe extern "C" fn(Advanced, *const f64, usize, f64, *mut f64) -> i32,

    error_to_string: unsafe extern "C" fn(i32) -> *const c_char,
}

/// Facade over `libcpp_calculator`
pub struct Calculator {
    api: CalculatorApi,
    basic: NonNull<CalculatorHandle>,
    advanced: NonNull<AdvancedCalculatorHandle>,
    signatures: Vec<FfiSignature>,
    _library: DynamicLibrary,
}

impl Facade for Calculator {
    const FAMILY: LibraryFamily = LibraryFamily::Calculator;

    fn load(locator: &LibraryLocator) -> Result<DynamicLibrary, FfiError> {
        DynamicLibrary::load_first_loadable(locator)
    }

    fn bind(library: DynamicLibrary) -> Result<Self, FfiError> {
        let mut b = SignatureBinder::new(&library);

        let create: unsafe extern "C" fn() -> Basic =
            b.bind("CalculatorHandle* calculator_create(void)")?;
        let advanced_create: unsafe extern "C" fn() -> Advanced =
            b.bind("AdvancedCalculatorHandle* advanced_calculator_create(void)")?;

        let api = CalculatorApi {
            destroy: b.bind("void calculator_destroy(CalculatorHandle*)")?,
            add: b.bind("CalculatorError calculator_add(CalculatorHandle*, double, double, double*)")?,
            subtract: b.bind(
                "CalculatorError calculator_subtract(CalculatorHandle*, double, double, double*)",
            )?,
            multiply: b.bind(
                "CalculatorError calculator_multiply(CalculatorHandle*, double, double, double*)",
            )?,
            divide: b.bind(
                "CalculatorError calculator_divide(CalculatorHandle*, double, double, double*)",
            )?,
            last_result: b.bind("double calculator_get_last_result(CalculatorHandle*)")?,
            history_count: b.bind("size_t calculator_get_history_count(CalculatorHandle*)")?,
            history_entry: b.bind(
                "CalculatorError calculator_get_history_entry(CalculatorHandle*, size_t, char*, size_t)",
            )?,
            clear_history: b.bind("void calculator_clear_history(CalculatorHandle*)")?,

            advanced_destroy: b.bind("void advanced_calculator_destroy(AdvancedCalculatorHandle*)")?,
            power: b.bind(
                "CalculatorError advanced_calculator_power(AdvancedCalculatorHandle*, double, int32_t, double*)",
            )?,
            square_root: b.bind(
                "CalculatorError advanced_calculator_square_root(AdvancedCalculatorHandle*, double, double*)",
            )?,
            factorial: b.bind(
                "CalculatorError advanced_calculator_factorial(AdvancedCalculatorHandle*, int32_t, double*)",
            )?,
            sine: b.bind(
                "CalculatorError advanced_calculator_sine(AdvancedCalculatorHandle*, double, double*)",
            )?,
            cosine: b.bind(
                "CalculatorError advanced_calculator_cosine(AdvancedCalculatorHandle*, double, double*)",
            )?,
            sum_i32: b.bind(
                "CalculatorError advanced_calculator_sum_array_int32(AdvancedCalculatorHandle*, const int32_t*, size_t, int64_t*)",
            )?,
            max_i32: b.bind(
                "CalculatorError advanced_calculator_max_element_int32(AdvancedCalculatorHandle*, const int32_t*, size_t, int32_t*)",
            )?,
            min_i32: b.bind(
                "CalculatorError advanced_calculator_min_element_int32(AdvancedCalculatorHandle*, const int32_t*, size_t, int32_t*)",
            )?,
            sum_f64: b.bind(
                "CalculatorError advanced_calculator_sum_array_double(AdvancedCalculatorHandle*, const double*, size_t, double*)",
            )?,
            max_f64: b.bind(
                "CalculatorError advanced_calculator_max_element_double(AdvancedCalculatorHandle*, const double*, size_t, double*)",
            )?,
            min_f64: b.bind(
                "CalculatorError advanced_calculator_min_element_double(AdvancedCalculatorHandle*, const double*, size_t, double*)",
            )?,
            batch_add: b.bind(
                "CalculatorError advanced_calculator_batch_add(AdvancedCalculatorHandle*, const double*, size_t, double, double*)",
            )?,

            error_to_string: b.bind("const char* calculator_error_to_string(CalculatorError)")?,
        };
        let signatures = b.finish();

        let basic = NonNull::new(unsafe { create() })
            .ok_or_else(|| FfiError::NullHandle("calculator_create".to_string()))?;
        let advanced = match NonNull::new(unsafe { advanced_create() }) {
            Some(handle) => handle,
            None => {
                unsafe { (api.destroy)(basic.as_ptr()) };
                return Err(FfiError::NullHandle(
                    "advanced_calculator_create".to_string(),
                ));
            }
        };

        Ok(Self {
            api,
            basic,
            advanced,
            signatures,
            _library: library,
        })
    }

    fn signatures(&self) -> &[FfiSignature] {
        &self.signatures
    }
}

impl Calculator {
    /// Construct with the default search chain
    pub fn new() -> CalcResult<Self> {
        Self::open_default()
    }

    /// `a + b`, recorded in the history
    pub fn add(&self, a: f64, b: f64) -> CalcResult<f64> {
        self.basic_binary("add", self.api.add, a, b)
    }

    /// `a - b`, recorded in the history
    pub fn subtract(&self, a: f64, b: f64) -> CalcResult<f64> {
        self.basic_binary("subtract", self.api.subtract, a, b)
    }

    /// `a * b`, recorded in the history
    pub fn multiply(&self, a: f64, b: f64) -> CalcResult<f64> {
        self.basic_binary("multiply", self.api.multiply, a, b)
    }

    /// Division; a zero divisor is reported by the native library
    pub fn divide(&self, a: f64, b: f64) -> CalcResult<f64> {
        self.basic_binary("divide", self.api.divide, a, b)
    }

    /// Result of the most recent arithmetic operation (0 before any)
    pub fn last_result(&self) -> f64 {
        unsafe { (self.api.last_result)(self.basic.as_ptr()) }
    }

    /// Every recorded arithmetic operation, oldest first
    pub fn history(&self) -> CalcResult<Vec<String>> {
        let count = unsafe { (self.api.history_count)(self.basic.as_ptr()) };
        (0..count).map(|index| self.history_entry(index)).collect()
    }

    /// Forget every recorded operation
    pub fn clear_history(&self) {
        unsafe { (self.api.clear_history)(self.basic.as_ptr()) }
    }

    /// Type name of the handle serving arithmetic and history
    pub fn calculator_type(&self) -> &'static str {
        BASIC_CALCULATOR_TYPE
    }

    /// `base^exponent` for a non-negative integer exponent
    pub fn power(&self, base: f64, exponent: i32) -> CalcResult<f64> {
        if exponent < 0 {
            trace!("power rejected: exponent {}", exponent);
            return Err(CalcError::invalid("negative exponents are not supported"));
        }
        self.call_out("power", |out| unsafe {
            (self.api.power)(self.advanced.as_ptr(), base, exponent, out)
        })
    }

    pub fn square_root(&self, value: f64) -> CalcResult<f64> {
        if value < 0.0 {
            trace!("square_root rejected: {}", value);
            return Err(CalcError::invalid(
                "cannot calculate square root of negative number",
            ));
        }
        self.advanced_unary("square_root", self.api.square_root, value)
    }

    /// `n!` as an `f64`, for `n` in `0..=170`
    pub fn factorial(&self, n: i32) -> CalcResult<f64> {
        if n < 0 {
            trace!("factorial rejected: {}", n);
            return Err(CalcError::invalid(
                "factorial is not defined for negative numbers",
            ));
        }
        if n > MAX_FACTORIAL_F64 {
            trace!("factorial rejected: {}", n);
            return Err(CalcError::invalid(format!(
                "factorial too large (max n={})",
                MAX_FACTORIAL_F64
            )));
        }
        self.call_out("factorial", |out| unsafe {
            (self.api.factorial)(self.advanced.as_ptr(), n, out)
        })
    }

    /// Sine of an angle in degrees
    pub fn sine(&self, degrees: f64) -> CalcResult<f64> {
        self.advanced_unary("sine", self.api.sine, degrees)
    }

    /// Cosine of an angle in degrees
    pub fn cosine(&self, degrees: f64) -> CalcResult<f64> {
        self.advanced_unary("cosine", self.api.cosine, degrees)
    }

    /// Sum of the elements; an empty slice sums to zero
    pub fn sum_array<T: ArrayElement>(&self, values: &[T]) -> CalcResult<T::Sum> {
        if values.is_empty() {
            return Ok(<T::Sum as Default>::default());
        }
        T::native_sum(self, values)
    }

    /// Largest element; an empty slice is an invalid argument
    pub fn max_element<T: ArrayElement>(&self, values: &[T]) -> CalcResult<T> {
        super::non_empty(values)?;
        T::native_max(self, values)
    }

    /// Smallest element; an empty slice is an invalid argument
    pub fn min_element<T: ArrayElement>(&self, values: &[T]) -> CalcResult<T> {
        super::non_empty(values)?;
        T::native_min(self, values)
    }

    /// `addend` added to every value
    pub fn batch_add(&self, values: &[f64], addend: f64) -> CalcResult<Vec<f64>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let mut results = vec![0.0; values.len()];
        let code = unsafe {
            (self.api.batch_add)(
                self.advanced.as_ptr(),
                values.as_ptr(),
                values.len(),
                addend,
                results.as_mut_ptr(),
            )
        };
        self.check("batch_add", code)?;
        Ok(results)
    }

    fn basic_binary(&self, op: &str, f: BasicBinary, a: f64, b: f64) -> CalcResult<f64> {
        self.call_out(op, |out| unsafe { f(self.basic.as_ptr(), a, b, out) })
    }

    fn advanced_unary(&self, op: &str, f: AdvancedUnary, value: f64) -> CalcResult<f64> {
        self.call_out(op, |out| unsafe { f(self.advanced.as_ptr(), value, out) })
    }

    /// Run a native call that writes its result through an out-pointer
    fn call_out<T: Default>(&self, op: &str, call: impl FnOnce(*mut T) -> i32) -> CalcResult<T> {
        let mut out = T::default();
        let code = call(&mut out as *mut T);
        self.check(op, code)?;
        Ok(out)
    }

    fn check(&self, op: &str, code: i32) -> CalcResult<()> {
        if code == CALC_SUCCESS {
            return Ok(());
        }
        Err(self.native_error(op, code))
    }

    fn native_error(&self, op: &str, code: i32) -> CalcError {
        let message = unsafe { c_str_lossy((self.api.error_to_string)(code)) };
        debug!("native {} failed with code {}: {}", op, code, message);
        translate::translate(code, &message)
    }

    fn history_entry(&self, index: usize) -> CalcResult<String> {
        let mut capacity = HISTORY_BUFFER_START;
        loop {
            let mut buffer = vec![0u8; capacity];
            let code = unsafe {
                (self.api.history_entry)(
                    self.basic.as_ptr(),
                    index,
                    buffer.as_mut_ptr().cast::<c_char>(),
                    capacity,
                )
            };
            if code == CALC_SUCCESS {
                let len = buffer.iter().position(|&b| b == 0).unwrap_or(capacity);
                return Ok(String::from_utf8_lossy(&buffer[..len]).into_owned());
            }
            // The native side reports a short buffer as an invalid argument.
            if capacity >= HISTORY_BUFFER_MAX {
                return Err(self.native_error("history_entry", code));
            }
            capacity *= 2;
        }
    }
}

impl Drop for Calculator {
    fn drop(&mut self) {
        unsafe {
            (self.api.advanced_destroy)(self.advanced.as_ptr());
            (self.api.destroy)(self.basic.as_ptr());
        }
    }
}

/// Copy a borrowed native C string; null reads as empty
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
unsafe fn c_str_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f64 {}
}

/// Element types the native array reductions accept
pub trait ArrayElement: Copy + Default + sealed::Sealed {
    /// Sum type; `i32` sums widen to `i64`
    type Sum: Copy + Default;

    #[doc(hidden)]
    fn native_sum(calc: &Calculator, values: &[Self]) -> CalcResult<Self::Sum>;
    #[doc(hidden)]
    fn native_max(calc: &Calculator, values: &[Self]) -> CalcResult<Self>;
    #[doc(hidden)]
    fn native_min(calc: &Calculator, values: &[Self]) -> CalcResult<Self>;
}

impl ArrayElement for i32 {
    type Sum = i64;

    fn native_sum(calc: &Calculator, values: &[Self]) -> CalcResult<i64> {
        calc.call_out("sum_array", |out| unsafe {
            (calc.api.sum_i32)(calc.advanced.as_ptr(), values.as_ptr(), values.len(), out)
        })
    }

    fn native_max(calc: &Calculator, values: &[Self]) -> CalcResult<i32> {
        calc.call_out("max_element", |out| unsafe {
            (calc.api.max_i32)(calc.advanced.as_ptr(), values.as_ptr(), values.len(), out)
        })
    }

    fn native_min(calc: &Calculator, values: &[Self]) -> CalcResult<i32> {
        calc.call_out("min_element", |out| unsafe {
            (calc.api.min_i32)(calc.advanced.as_ptr(), values.as_ptr(), values.len(), out)
        })
    }
}

impl ArrayElement for f64 {
    type Sum = f64;

    fn native_sum(calc: &Calculator, values: &[Self]) -> CalcResult<f64> {
        calc.call_out("sum_array", |out| unsafe {
            (calc.api.sum_f64)(calc.advanced.as_ptr(), values.as_ptr(), values.len(), out)
        })
    }

    fn native_max(calc: &Calculator, values: &[Self]) -> CalcResult<f64> {
        calc.call_out("max_element", |out| unsafe {
            (calc.api.max_f64)(calc.advanced.as_ptr(), values.as_ptr(), values.len(), out)
        })
    }

    fn native_min(calc: &Calculator, values: &[Self]) -> CalcResult<f64> {
        calc.call_out("min_element", |out| unsafe {
            (calc.api.min_f64)(calc.advanced.as_ptr(), values.as_ptr(), values.len(), out)
        })
    }
}
