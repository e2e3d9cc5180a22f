//! Dynamic Library Loader
//!
//! Opens located libraries through libloading and keeps one handle per
//! library for the whole process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use libloading::Library;
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::locator::{LibraryLocator, Located, ResolutionStrategy};
use super::FfiError;

/// Handles shared by every facade that loads the same library
static LOADED: Lazy<Mutex<HashMap<PathBuf, Arc<Library>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// A loaded library together with where it came from
#[derive(Clone)]
pub struct DynamicLibrary {
    /// What the loader opened
    origin: Located,
    /// The loaded library handle
    library: Arc<Library>,
}

impl DynamicLibrary {
    /// Open a located library, reusing an existing handle when there is one
    pub fn open(located: &Located) -> Result<Self, FfiError> {
        let key = located.cache_key();
        let mut loaded = LOADED.lock();

        if let Some(library) = loaded.get(&key) {
            debug!("reusing loaded library {}", key.display());
            return Ok(Self {
                origin: located.clone(),
                library: Arc::clone(library),
            });
        }

        // Safety: loading runs the library's initializers. Only libraries the
        // caller's search chain points at are opened.
        let library = unsafe {
            Library::new(located.as_os_str()).map_err(|e| FfiError::LoadError {
                path: key.display().to_string(),
                message: e.to_string(),
            })?
        };
        debug!("loaded library {}", key.display());

        let library = Arc::new(library);
        loaded.insert(key, Arc::clone(&library));
        Ok(Self {
            origin: located.clone(),
            library,
        })
    }

    /// Resolve through the locator, then open
    ///
    /// Only the first resolution is attempted; a library that exists but
    /// fails to load is a load error.
    pub fn load(locator: &LibraryLocator) -> Result<Self, FfiError> {
        let located = locator.locate().ok_or_else(|| not_found(locator))?;
        Self::open(&located).map_err(|e| match (&located, e) {
            (Located::System(_), FfiError::LoadError { .. }) => not_found(locator),
            (_, e) => e,
        })
    }

    /// Try every existing candidate in order, then the system default
    ///
    /// The first library that actually loads wins.
    pub fn load_first_loadable(locator: &LibraryLocator) -> Result<Self, FfiError> {
        let mut last_error = None;
        for path in locator.candidates() {
            match Self::open(&Located::Path(path)) {
                Ok(library) => return Ok(library),
                Err(e) => {
                    debug!("skipping candidate: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if locator.strategies().contains(&ResolutionStrategy::SystemDefault) {
            if let Ok(library) = Self::open(&Located::System(locator.file_name())) {
                return Ok(library);
            }
        }

        Err(last_error.unwrap_or_else(|| not_found(locator)))
    }

    /// Where this library was resolved
    pub fn origin(&self) -> &Located {
        &self.origin
    }

    /// Human-readable origin for diagnostics
    pub fn display_name(&self) -> String {
        self.origin.cache_key().display().to_string()
    }

    /// The shared libloading handle
    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }
}

impl std::fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

fn not_found(locator: &LibraryLocator) -> FfiError {
    FfiError::LibraryNotFound {
        name: locator.file_name().to_string_lossy().into_owned(),
        searched: locator.search_dirs(),
    }
}

/// Number of distinct libraries currently held by the process-wide cache
pub fn loaded_library_count() -> usize {
    LOADED.lock().len()
}
