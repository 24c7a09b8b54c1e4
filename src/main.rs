mod cli;

use anyhow::{Context, Result};
use cli::{get_args, Args};
use std::fs;
use wasmvet::summary::ModuleSummary;
use wasmvet::ModuleParser;

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\nWasmvet encountered an unexpected error:");
        eprintln!("{panic_info}");
        eprintln!("\nThis is likely a bug. Please report it with the module that triggered it.");
    }));

    let args = get_args();

    if args.debug {
        wasmvet::debug::enable_debug();
    } else {
        wasmvet::debug::enable_debug_from_env();
    }

    if let Err(err) = run(&args) {
        eprintln!("❌ {err:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let bytes =
        fs::read(&args.path).with_context(|| format!("failed to read {}", args.path))?;

    let mut parser = match args.workers {
        Some(workers) => ModuleParser::with_workers(workers),
        None => ModuleParser::new(),
    };

    // Ctrl-C cancels the validation pool at the next safe point
    let cancel = parser.cancel_token();
    ctrlc::set_handler(move || cancel.cancel())
        .context("failed to install interrupt handler")?;

    for chunk in bytes.chunks(args.chunk_size.max(1)) {
        parser
            .push(chunk)
            .with_context(|| format!("{} is not a valid module", args.path))?;
    }
    let module = parser
        .finish()
        .with_context(|| format!("{} is not a valid module", args.path))?;

    let summary = ModuleSummary::from(&module);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&args.path, &summary);
    }
    Ok(())
}

fn print_summary(path: &str, summary: &ModuleSummary) {
    println!("✅ {path} is a valid WebAssembly module");
    println!("  - Types: {}", summary.types);
    println!(
        "  - Functions: {} ({} imported)",
        summary.functions, summary.imported_functions
    );
    println!("  - Tables: {}", summary.tables);
    println!("  - Memories: {}", summary.memories);
    println!("  - Globals: {}", summary.globals);
    if let Some(start) = summary.start {
        println!("  - Start function: {start}");
    }
    for name in &summary.exports {
        println!("  - Export: {name}");
    }
    if summary.element_segments > 0 {
        println!("  - Element segments: {}", summary.element_segments);
    }
    if summary.data_segments > 0 {
        println!("  - Data segments: {}", summary.data_segments);
    }
}
