use clap::Parser;

/// Wasmvet - validate WebAssembly modules from the command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to .wasm file
    pub path: String,

    /// Feed the parser in chunks of this many bytes
    #[arg(short = 'c', long, default_value_t = 64 * 1024)]
    pub chunk_size: usize,

    /// Validation worker threads (default: one per core)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Print the module summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

pub fn get_args() -> Args {
    Args::parse()
}
