//! Signature Binder
//!
//! Declares each foreign symbol's C signature, checks it against the Rust
//! function-pointer type it will be called through, and resolves it.

use log::debug;

use super::loader::DynamicLibrary;
use super::types::{FfiSignature, NativeFn};
use super::FfiError;

/// Binds declared signatures against one loaded library
///
/// Each `bind` either returns a callable pointer or an error; facades bind
/// every symbol with `?` so a single failure abandons the whole binding.
pub struct SignatureBinder<'lib> {
    library: &'lib DynamicLibrary,
    bound: Vec<FfiSignature>,
}

impl<'lib> SignatureBinder<'lib> {
    /// Start binding against a loaded library
    pub fn new(library: &'lib DynamicLibrary) -> Self {
        Self {
            library,
            bound: Vec::new(),
        }
    }

    /// Declare a symbol and resolve it as `F`
    ///
    /// The declaration is C text such as
    /// `"int64_t sum_array(const int32_t*, size_t)"`. It must parse, have
    /// well-formed buffer pairs, and match `F` exactly.
    pub fn bind<F: NativeFn>(&mut self, declaration: &str) -> Result<F, FfiError> {
        let declared = FfiSignature::parse(declaration)?;
        declared.check_shape()?;

        let expected = FfiSignature::of::<F>(declared.name.clone());
        if declared != expected {
            return Err(FfiError::SignatureMismatch {
                symbol: declared.name.clone(),
                declared: declared.to_string(),
                bound: expected.to_string(),
            });
        }

        let mut symbol_name = declared.name.clone().into_bytes();
        symbol_name.push(0);

        // Safety: the symbol's type was just checked against its declaration,
        // which mirrors the library's header. The pointer is only used while
        // the facade holds the library's Arc.
        let func: F = unsafe {
            let symbol = self
                .library
                .library()
                .get::<F>(&symbol_name)
                .map_err(|e| FfiError::SymbolNotFound {
                    symbol: declared.name.clone(),
                    library: self.library.display_name(),
                    message: e.to_string(),
                })?;
            *symbol
        };

        debug!("bound {}", declared);
        self.bound.push(declared);
        Ok(func)
    }

    /// Signatures bound so far, in binding order
    pub fn finish(self) -> Vec<FfiSignature> {
        self.bound
    }
}
