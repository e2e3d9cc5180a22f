//! FFI Module for Polycalc
//!
//! Locates, loads and binds native libraries for the operation facades.
//!
//! # Architecture
//!
//! ```text
//! Facade::open(&locator)
//!       │
//!       ▼
//! LibraryLocator (ordered search dirs, then system default)
//!       │
//!       ▼
//! DynamicLibrary (libloading, one handle per library per process)
//!       │
//!       ▼
//! SignatureBinder (declared C signature == Rust fn type, all or nothing)
//!       │
//!       ▼
//! Native Function Call
//! ```
//!
//! # Example
//!
//! ```ignore
//! let locator = LibraryLocator::for_family(LibraryFamily::Integer);
//! let library = DynamicLibrary::load(&locator)?;
//!
//! let mut binder = SignatureBinder::new(&library);
//! let add: unsafe extern "C" fn(i32, i32) -> i32 =
//!     binder.bind("int32_t add_int(int32_t, int32_t)")?;
//! ```

mod binder;
mod error;
mod loader;
mod locator;
mod types;

pub use binder::SignatureBinder;
pub use error::FfiError;
pub use loader::{loaded_library_count, DynamicLibrary};
pub use locator::{library_filename, LibraryFamily, LibraryLocator, Located, ResolutionStrategy};
pub use types::{
    AdvancedCalculatorHandle, CalculatorHandle, FfiRepr, FfiSignature, FfiType, NativeFn,
};

#[cfg(test)]
mod tests;
