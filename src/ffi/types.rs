//! FFI Type System
//!
//! Declared C types for foreign signatures, and the mapping from Rust
//! function-pointer types onto them so a declaration can be checked against
//! the pointer it is bound to.

use std::ffi::c_char;
use std::fmt;

use super::FfiError;

/// Opaque handle to a native `Calculator` object
#[repr(C)]
pub struct CalculatorHandle {
    _private: [u8; 0],
}

/// Opaque handle to a native `AdvancedCalculator` object
#[repr(C)]
pub struct AdvancedCalculatorHandle {
    _private: [u8; 0],
}

/// C types that may appear in a declared foreign signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiType {
    /// Void (no value)
    Void,
    /// `int32_t`, also C enums such as `CalculatorError`
    I32,
    /// `uint32_t`
    U32,
    /// `int64_t`
    I64,
    /// `uint64_t`
    U64,
    /// `double`
    F64,
    /// `size_t`
    Size,
    /// `const char*`, NUL-terminated input text
    CStr,
    /// `char*`, writable text buffer
    CharBuf,
    /// `const int32_t*`, element pointer of a buffer+length pair
    I32Array,
    /// `const double*`, element pointer of a buffer+length pair
    F64Array,
    /// `int32_t*` out-parameter
    I32Out,
    /// `int64_t*` out-parameter
    I64Out,
    /// `double*` out-parameter (single value or result array)
    F64Out,
    /// Opaque object handle (`CalculatorHandle*` and friends)
    Handle,
}

impl FfiType {
    /// Get the size in bytes of this type
    pub fn size(&self) -> usize {
        match self {
            FfiType::Void => 0,
            FfiType::I32 | FfiType::U32 => 4,
            FfiType::I64 | FfiType::U64 | FfiType::F64 => 8,
            _ => std::mem::size_of::<usize>(),
        }
    }

    /// Check if this type is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FfiType::I32 | FfiType::U32 | FfiType::I64 | FfiType::U64 | FfiType::Size
        )
    }

    /// Check if this type is passed as a pointer
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            FfiType::CStr
                | FfiType::CharBuf
                | FfiType::I32Array
                | FfiType::F64Array
                | FfiType::I32Out
                | FfiType::I64Out
                | FfiType::F64Out
                | FfiType::Handle
        )
    }

    /// Element pointer that must be paired with a `size_t` length
    pub fn is_array(&self) -> bool {
        matches!(self, FfiType::I32Array | FfiType::F64Array)
    }

    /// Parse a C type spelling
    pub fn from_c(s: &str) -> Option<Self> {
        let normalized = normalize_c_type(s);
        let ty = match normalized.as_str() {
            "void" => FfiType::Void,
            "int32_t" | "int" | "calculatorerror" => FfiType::I32,
            "uint32_t" | "unsigned int" => FfiType::U32,
            "int64_t" | "long long" => FfiType::I64,
            "uint64_t" | "unsigned long long" => FfiType::U64,
            "double" => FfiType::F64,
            "size_t" => FfiType::Size,
            "const char*" => FfiType::CStr,
            "char*" => FfiType::CharBuf,
            "const int32_t*" | "const int*" => FfiType::I32Array,
            "const double*" => FfiType::F64Array,
            "int32_t*" | "int*" => FfiType::I32Out,
            "int64_t*" => FfiType::I64Out,
            "double*" => FfiType::F64Out,
            "void*" => FfiType::Handle,
            other if other.ends_with("handle*") => FfiType::Handle,
            _ => return None,
        };
        Some(ty)
    }
}

/// Lowercase, collapse whitespace and glue `*` onto the type name.
fn normalize_c_type(s: &str) -> String {
    let joined = s.split_whitespace().collect::<Vec<_>>().join(" ");
    joined.replace(" *", "*").to_lowercase()
}

impl fmt::Display for FfiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FfiType::Void => "void",
            FfiType::I32 => "i32",
            FfiType::U32 => "u32",
            FfiType::I64 => "i64",
            FfiType::U64 => "u64",
            FfiType::F64 => "f64",
            FfiType::Size => "usize",
            FfiType::CStr => "cstr",
            FfiType::CharBuf => "char_buf",
            FfiType::I32Array => "const i32*",
            FfiType::F64Array => "const f64*",
            FfiType::I32Out => "i32*",
            FfiType::I64Out => "i64*",
            FfiType::F64Out => "f64*",
            FfiType::Handle => "handle",
        };
        f.write_str(name)
    }
}

/// Rust types that cross the boundary as a specific C type
pub trait FfiRepr {
    const FFI_TYPE: FfiType;
}

macro_rules! impl_ffi_repr {
    ($($ty:ty => $ffi:ident),* $(,)?) => {
        $(impl FfiRepr for $ty {
            const FFI_TYPE: FfiType = FfiType::$ffi;
        })*
    };
}

impl_ffi_repr! {
    () => Void,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f64 => F64,
    usize => Size,
    *const c_char => CStr,
    *mut c_char => CharBuf,
    *const i32 => I32Array,
    *const f64 => F64Array,
    *mut i32 => I32Out,
    *mut i64 => I64Out,
    *mut f64 => F64Out,
    *mut CalculatorHandle => Handle,
    *mut AdvancedCalculatorHandle => Handle,
}

/// A foreign function pointer type whose C signature is known statically
pub trait NativeFn: Copy {
    /// Parameter types in call order
    fn params() -> Vec<FfiType>;
    /// Return type
    fn return_type() -> FfiType;
}

macro_rules! impl_native_fn {
    ($($arg:ident),*) => {
        impl<R: FfiRepr, $($arg: FfiRepr),*> NativeFn for unsafe extern "C" fn($($arg),*) -> R {
            fn params() -> Vec<FfiType> {
                vec![$($arg::FFI_TYPE),*]
            }

            fn return_type() -> FfiType {
                R::FFI_TYPE
            }
        }
    };
}

impl_native_fn!();
impl_native_fn!(A);
impl_native_fn!(A, B);
impl_native_fn!(A, B, C);
impl_native_fn!(A, B, C, D);
impl_native_fn!(A, B, C, D, E);

/// Function signature for FFI calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfiSignature {
    /// Function name
    pub name: String,
    /// Parameter types
    pub params: Vec<FfiType>,
    /// Return type
    pub return_type: FfiType,
}

impl FfiSignature {
    /// Create a new function signature
    pub fn new(name: impl Into<String>, params: Vec<FfiType>, return_type: FfiType) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
        }
    }

    /// Signature of a Rust function-pointer type under the given symbol name
    pub fn of<F: NativeFn>(name: impl Into<String>) -> Self {
        Self::new(name, F::params(), F::return_type())
    }

    /// Parse from a C-style declaration
    ///
    /// Format: `"return_type function_name(param_type, param_type, ...)"`.
    /// Parameter names are not allowed; `(void)` and `()` both mean no
    /// parameters.
    pub fn parse(declaration: &str) -> Result<Self, FfiError> {
        let invalid = |reason: &str| FfiError::InvalidDeclaration {
            declaration: declaration.to_string(),
            reason: reason.to_string(),
        };

        let declaration_trimmed = declaration.trim().trim_end_matches(';').trim_end();
        let open = declaration_trimmed
            .find('(')
            .ok_or_else(|| invalid("missing '('"))?;
        let inner = declaration_trimmed[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| invalid("missing ')'"))?;
        let before_paren = declaration_trimmed[..open].trim();

        let name_start = before_paren
            .rfind(|c: char| c.is_whitespace() || c == '*')
            .map(|i| i + 1)
            .ok_or_else(|| invalid("missing return type"))?;
        let name = &before_paren[name_start..];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("bad function name"));
        }

        let return_str = &before_paren[..name_start];
        let return_type =
            FfiType::from_c(return_str).ok_or_else(|| invalid("unknown return type"))?;

        let mut params = Vec::new();
        let inner = inner.trim();
        if !inner.is_empty() && inner != "void" {
            for param in inner.split(',') {
                let ty = FfiType::from_c(param)
                    .ok_or_else(|| invalid(&format!("unknown parameter type '{}'", param.trim())))?;
                if ty == FfiType::Void {
                    return Err(invalid("void parameter"));
                }
                params.push(ty);
            }
        }

        Ok(Self {
            name: name.to_string(),
            params,
            return_type,
        })
    }

    /// Check buffer+length and text-buffer+capacity pairing
    ///
    /// Every array pointer must be immediately followed by a `size_t` length,
    /// and every writable `char*` must be followed somewhere later by a
    /// `size_t` capacity.
    pub fn check_shape(&self) -> Result<(), FfiError> {
        let malformed = |reason: String| FfiError::MalformedSignature {
            signature: self.to_string(),
            reason,
        };

        for (i, param) in self.params.iter().enumerate() {
            if param.is_array() && self.params.get(i + 1) != Some(&FfiType::Size) {
                return Err(malformed(format!(
                    "parameter {} ({}) is not followed by a size_t length",
                    i, param
                )));
            }
            if *param == FfiType::CharBuf && !self.params[i + 1..].contains(&FfiType::Size) {
                return Err(malformed(format!(
                    "text buffer parameter {} has no size_t capacity",
                    i
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for FfiSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}
