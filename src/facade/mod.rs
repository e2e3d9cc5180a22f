//! Operation Facades
//!
//! Validated, typed calling surfaces over the three native libraries.
//! Construction runs locate → load → bind; a facade value only exists once
//! every signature is bound.

mod calculator;
mod integer;
mod numeric;
pub mod translate;

pub use calculator::{ArrayElement, Calculator, BASIC_CALCULATOR_TYPE};
pub use integer::IntegerOps;
pub use numeric::FastMath;

use log::{debug, trace};

use crate::config::PolycalcConfig;
use crate::error::{CalcError, CalcResult};
use crate::ffi::{DynamicLibrary, FfiError, FfiSignature, LibraryFamily, LibraryLocator};

/// Shared construction path for every facade
pub trait Facade: Sized {
    /// Which native library this facade wraps
    const FAMILY: LibraryFamily;

    /// Bind every symbol the facade needs from a loaded library
    fn bind(library: DynamicLibrary) -> Result<Self, FfiError>;

    /// Signatures bound at construction, in binding order
    fn signatures(&self) -> &[FfiSignature];

    /// Resolve and load the library for this facade
    fn load(locator: &LibraryLocator) -> Result<DynamicLibrary, FfiError> {
        DynamicLibrary::load(locator)
    }

    /// Construct from an explicit resolution chain
    fn open(locator: &LibraryLocator) -> CalcResult<Self> {
        let library = Self::load(locator)?;
        let origin = library.display_name();
        let facade = Self::bind(library)?;
        debug!(
            "{} facade ready: {} symbols from {}",
            Self::FAMILY,
            facade.signatures().len(),
            origin
        );
        Ok(facade)
    }

    /// Construct with the family's default search chain
    fn open_default() -> CalcResult<Self> {
        Self::open(&LibraryLocator::for_family(Self::FAMILY))
    }

    /// Construct with a chain derived from configuration
    fn from_config(config: &PolycalcConfig) -> CalcResult<Self> {
        Self::open(&config.locator_for(Self::FAMILY))
    }
}

/// Reject shift counts that are negative or not below `width`
pub(crate) fn check_shift(shift: i32, width: u32) -> CalcResult<()> {
    if shift < 0 {
        trace!("rejected negative shift {}", shift);
        return Err(CalcError::invalid(format!(
            "negative shift count {} is not supported",
            shift
        )));
    }
    if shift as u32 >= width {
        return Err(CalcError::invalid(format!(
            "shift count {} must be below the operand width {}",
            shift, width
        )));
    }
    Ok(())
}

/// Reject an empty slice where a reduction needs at least one element
pub(crate) fn non_empty<T>(values: &[T]) -> CalcResult<()> {
    if values.is_empty() {
        return Err(CalcError::invalid("array cannot be empty"));
    }
    Ok(())
}
