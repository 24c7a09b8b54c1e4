//! Streaming WebAssembly binary parser and validator
//!
//! Feed a module in arbitrary chunks with [`ModuleParser::push`], then call
//! [`ModuleParser::finish`] to obtain the fully parsed and type-checked
//! [`Module`]. Function bodies validate on a worker pool while parsing
//! continues; the first failure wins.
//!
//! ```no_run
//! let module = wasmvet::validate_file("module.wasm")?;
//! println!("{} functions", module.total_functions());
//! # Ok::<(), wasmvet::WasmvetError>(())
//! ```

pub mod debug;
pub mod error;
pub mod parser;
pub mod summary;
pub mod validator;

pub use error::{ParseError, ReadError, Result, ValidationError, WasmvetError};
pub use parser::module::{Module, ModuleContext};
pub use parser::pool::CancelToken;
pub use parser::streaming::ModuleParser;
pub use validator::CodeValidator;

/// Parse and validate a complete in-memory module
pub fn validate_bytes(bytes: &[u8]) -> Result<Module> {
    let mut parser = ModuleParser::new();
    parser.push(bytes)?;
    parser.finish()
}

/// Read a module from disk and validate it
pub fn validate_file(path: impl AsRef<std::path::Path>) -> Result<Module> {
    let bytes = std::fs::read(path)?;
    validate_bytes(&bytes)
}
