use sable::sable_value::Function;
use sable::sable_value::chunk_serializer::{NoHostTypes, deserialize_function};
use std::env;
use std::fs;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SABLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let bytes = if args.len() > 1 {
        let filename = &args[1];
        match fs::read(filename) {
            Ok(content) => {
                println!("=== File: {} ({} bytes) ===\n", filename, content.len());
                content
            }
            Err(e) => {
                eprintln!("Error reading file '{}': {}", filename, e);
                std::process::exit(1);
            }
        }
    } else {
        println!("Usage: bytecode_dump <bytecode_file>");
        std::process::exit(0);
    };

    // Host types are unknown here; files holding host constants fail to load.
    match deserialize_function(&bytes, &NoHostTypes) {
        Ok(function) => dump_summary(&function),
        Err(e) => {
            eprintln!("Load error: {}", e);
            std::process::exit(1);
        }
    }
}

fn dump_summary(function: &Function) {
    if let Some(script) = function.as_script() {
        println!(
            "source: {}, params: {}, locals: {}, instructions: {}",
            script.source_name,
            script.params.len(),
            script.locals.len(),
            script.instructions.len()
        );
        println!();
    }
    print!("{}", function.disassemble());
}
