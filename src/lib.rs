//! Polycalc - Typed facades over native math libraries
//!
//! Three native libraries, three ways of building them, one calling
//! convention on the Rust side:
//!
//! - **C** (`libmath_ops`): 32-bit arithmetic, bitwise, array and string operations
//! - **x86-64 assembly** (`libasm_math_ops`): 64-bit arithmetic, factorial, power
//! - **C++** (`libcpp_calculator`, through its C ABI): a floating-point
//!   calculator with history, trigonometry and array reductions
//!
//! Every library is resolved from an ordered search chain, loaded once per
//! process with libloading, and bound symbol by symbol against a declared C
//! signature that must match the Rust function-pointer type exactly.
//!
//! # Example
//!
//! ```no_run
//! use polycalc::{Calculator, CalcError, IntegerOps};
//!
//! let ops = IntegerOps::new()?;
//! assert_eq!(ops.add(5, 3), 8);
//! assert!(matches!(ops.divide(10, 0), Err(CalcError::DivisionByZero)));
//!
//! let calc = Calculator::new()?;
//! calc.add(1.0, 2.0)?;
//! assert_eq!(calc.history()?, vec!["1 + 2 = 3".to_string()]);
//! # Ok::<(), CalcError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Facade::open    │  IntegerOps / FastMath / Calculator
//! └────────┬─────────┘
//!          │
//!     ┌────┴─────┬──────────────┐
//!     ▼          ▼              ▼
//! ┌────────┐ ┌────────┐ ┌─────────────────┐
//! │Locator │ │ Loader │ │ SignatureBinder │
//! └────────┘ └───┬────┘ └─────────────────┘
//!                │
//!                ▼
//! ┌─────────────────────┐
//! │   Native Code       │
//! └─────────────────────┘
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod facade;
pub mod ffi;

pub use config::{ConfigError, ConfigResult, PolycalcConfig};
pub use error::{CalcError, CalcResult};
pub use facade::{ArrayElement, Calculator, Facade, FastMath, IntegerOps};

// FFI (Foreign Function Interface) building blocks
pub use ffi::{
    DynamicLibrary, FfiError, FfiSignature, FfiType, LibraryFamily, LibraryLocator, Located,
    ResolutionStrategy, SignatureBinder,
};
