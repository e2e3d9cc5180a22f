//! Library Locator
//!
//! Resolves a logical library name to something the dynamic loader can open,
//! by trying an ordered list of resolution strategies.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::debug;

/// One step in a resolution chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Look for the platform file name inside this directory
    SearchDir(PathBuf),
    /// Hand the bare file name to the platform loader's own search
    SystemDefault,
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// An existing file found in a search directory
    Path(PathBuf),
    /// A file name for the platform loader to resolve
    System(OsString),
}

impl Located {
    /// Key identifying the library in the process-wide cache
    pub fn cache_key(&self) -> PathBuf {
        match self {
            Located::Path(p) => p.canonicalize().unwrap_or_else(|_| p.clone()),
            Located::System(name) => PathBuf::from(name),
        }
    }

    /// What the dynamic loader is asked to open
    pub fn as_os_str(&self) -> &std::ffi::OsStr {
        match self {
            Located::Path(p) => p.as_os_str(),
            Located::System(name) => name.as_os_str(),
        }
    }
}

/// Which native library a facade wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryFamily {
    /// C integer, bitwise, array and string operations
    Integer,
    /// x86-64 assembly numeric operations
    Numeric,
    /// C++ calculator behind its C ABI
    Calculator,
}

impl LibraryFamily {
    /// Default logical library name (without platform prefix/suffix)
    pub fn default_library_name(&self) -> &'static str {
        match self {
            LibraryFamily::Integer => "math_ops",
            LibraryFamily::Numeric => "asm_math_ops",
            LibraryFamily::Calculator => "cpp_calculator",
        }
    }

    /// Build-output directories relative to the project root, in search order
    fn build_dirs(&self) -> &'static [&'static str] {
        match self {
            LibraryFamily::Integer => &["build/libs/c", "build/lib"],
            LibraryFamily::Numeric => &["build/lib"],
            LibraryFamily::Calculator => &["build/lib", "build/lib/cpp", "build/libs/cpp"],
        }
    }

    /// Whether system library directories are probed before the loader's search
    fn probes_system_dirs(&self) -> bool {
        !matches!(self, LibraryFamily::Calculator)
    }
}

impl std::fmt::Display for LibraryFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryFamily::Integer => write!(f, "integer"),
            LibraryFamily::Numeric => write!(f, "numeric"),
            LibraryFamily::Calculator => write!(f, "calculator"),
        }
    }
}

/// Ordered resolution chain for one library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLocator {
    /// Logical library name
    name: String,
    /// Strategies, tried first to last
    strategies: Vec<ResolutionStrategy>,
}

impl LibraryLocator {
    /// Create a locator with an explicit strategy list
    pub fn new(name: impl Into<String>, strategies: Vec<ResolutionStrategy>) -> Self {
        Self {
            name: name.into(),
            strategies,
        }
    }

    /// Default chain for a family, rooted at the crate's manifest directory
    pub fn for_family(family: LibraryFamily) -> Self {
        Self::for_family_at(family, Path::new(env!("CARGO_MANIFEST_DIR")))
    }

    /// Default chain for a family, rooted at `project_root`
    pub fn for_family_at(family: LibraryFamily, project_root: &Path) -> Self {
        let mut strategies: Vec<ResolutionStrategy> = family
            .build_dirs()
            .iter()
            .map(|dir| ResolutionStrategy::SearchDir(project_root.join(dir)))
            .collect();

        if family.probes_system_dirs() {
            strategies.extend(system_library_dirs().into_iter().map(ResolutionStrategy::SearchDir));
        }
        strategies.push(ResolutionStrategy::SystemDefault);

        Self::new(family.default_library_name(), strategies)
    }

    /// Logical library name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the logical library name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Put a directory ahead of every existing strategy
    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.strategies
            .insert(0, ResolutionStrategy::SearchDir(dir.as_ref().to_path_buf()));
        self
    }

    /// Put several directories ahead of every existing strategy, keeping their order
    pub fn with_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let front: Vec<_> = dirs
            .into_iter()
            .map(|d| ResolutionStrategy::SearchDir(d.as_ref().to_path_buf()))
            .collect();
        self.strategies.splice(0..0, front);
        self
    }

    /// Drop the trailing system-default fallback
    pub fn without_system_default(mut self) -> Self {
        self.strategies
            .retain(|s| *s != ResolutionStrategy::SystemDefault);
        self
    }

    /// The resolution chain
    pub fn strategies(&self) -> &[ResolutionStrategy] {
        &self.strategies
    }

    /// Search directories in order
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        self.strategies
            .iter()
            .filter_map(|s| match s {
                ResolutionStrategy::SearchDir(dir) => Some(dir.clone()),
                ResolutionStrategy::SystemDefault => None,
            })
            .collect()
    }

    /// Platform file name of the library (`libfoo.so`, `libfoo.dylib`, `foo.dll`)
    pub fn file_name(&self) -> OsString {
        library_filename(&self.name)
    }

    /// Every existing file matching the name, in strategy order
    pub fn candidates(&self) -> Vec<PathBuf> {
        let file_name = self.file_name();
        self.search_dirs()
            .into_iter()
            .map(|dir| dir.join(&file_name))
            .filter(|path| path.is_file())
            .collect()
    }

    /// Resolve the library; the first strategy that succeeds wins
    pub fn locate(&self) -> Option<Located> {
        let file_name = self.file_name();
        for strategy in &self.strategies {
            match strategy {
                ResolutionStrategy::SearchDir(dir) => {
                    let full_path = dir.join(&file_name);
                    if full_path.is_file() {
                        debug!("located '{}' at {}", self.name, full_path.display());
                        return Some(Located::Path(full_path));
                    }
                }
                ResolutionStrategy::SystemDefault => {
                    debug!(
                        "'{}' not in search dirs, deferring to system loader",
                        self.name
                    );
                    return Some(Located::System(file_name));
                }
            }
        }
        None
    }
}

/// Standard system library directories for this platform
fn system_library_dirs() -> Vec<PathBuf> {
    #[cfg(unix)]
    {
        vec![PathBuf::from("/usr/local/lib"), PathBuf::from("/usr/lib")]
    }

    #[cfg(not(unix))]
    {
        Vec::new()
    }
}

/// Construct the platform-specific library filename
///
/// Names already carrying the platform suffix are used as given.
pub fn library_filename(name: &str) -> OsString {
    let suffix = std::env::consts::DLL_SUFFIX;
    let prefix = std::env::consts::DLL_PREFIX;
    if name.ends_with(suffix) && name.starts_with(prefix) {
        OsString::from(name)
    } else {
        libloading::library_filename(name)
    }
}
