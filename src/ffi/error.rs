//! FFI construction errors

use std::path::PathBuf;

use thiserror::Error;

/// Error type for locating, loading and binding native libraries
#[derive(Debug, Clone, Error)]
pub enum FfiError {
    /// No strategy produced a loadable library
    #[error("library '{name}' not found (searched: {})", display_dirs(.searched))]
    LibraryNotFound { name: String, searched: Vec<PathBuf> },

    /// The dynamic loader rejected the library
    #[error("failed to load library '{path}': {message}")]
    LoadError { path: String, message: String },

    /// Symbol not found in library
    #[error("symbol '{symbol}' not found in '{library}': {message}")]
    SymbolNotFound {
        symbol: String,
        library: String,
        message: String,
    },

    /// A C declaration could not be parsed
    #[error("invalid declaration '{declaration}': {reason}")]
    InvalidDeclaration { declaration: String, reason: String },

    /// Buffer/length or text/capacity pairing is broken
    #[error("malformed signature '{signature}': {reason}")]
    MalformedSignature { signature: String, reason: String },

    /// The declared signature disagrees with the bound Rust type
    #[error("signature mismatch for '{symbol}': declared {declared}, bound as {bound}")]
    SignatureMismatch {
        symbol: String,
        declared: String,
        bound: String,
    },

    /// A native constructor returned a null handle
    #[error("{0} returned a null handle")]
    NullHandle(String),
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    if dirs.is_empty() {
        return "<none>".to_string();
    }
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
