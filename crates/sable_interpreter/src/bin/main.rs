use sable::sable_vm::sable_limits::BYTECODE_VERSION;
use sable::{Context, Value, VmOption};
use std::env;
use std::fs;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const VERSION: &str = "Sable VM";

fn print_usage() {
    eprintln!("usage: sable [options] bytecode_file [args]");
    eprintln!("Available options are:");
    eprintln!("  -d          print the disassembly before running");
    eprintln!("  -v          show version information");
    eprintln!("  --depth n   limit the call depth to n");
    eprintln!("  --          stop handling options");
    eprintln!();
    eprintln!("Set SABLE_LOG (e.g. SABLE_LOG=debug) to enable logging.");
}

fn print_version() {
    let (major, minor, build) = BYTECODE_VERSION;
    println!("{} (bytecode {}.{}.{})", VERSION, major, minor, build);
}

#[derive(Default)]
struct Options {
    disassemble: bool,
    show_version: bool,
    max_call_depth: Option<usize>,
    script_file: Option<String>,
    script_args: Vec<String>,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut opts = Options::default();
    let mut i = 1;
    let mut stop_options = false;

    while i < args.len() {
        let arg = &args[i];

        if !stop_options && arg.starts_with('-') {
            match arg.as_str() {
                "-d" => {
                    opts.disassemble = true;
                }
                "-v" => {
                    opts.show_version = true;
                }
                "--depth" => {
                    i += 1;
                    let value = args.get(i).ok_or("'--depth' needs argument")?;
                    let depth = value
                        .parse::<usize>()
                        .map_err(|_| format!("invalid depth '{}'", value))?;
                    opts.max_call_depth = Some(depth);
                }
                "--" => {
                    stop_options = true;
                }
                _ => {
                    return Err(format!("unrecognized option '{}'", arg));
                }
            }
        } else {
            // First non-option argument is the bytecode file
            opts.script_file = Some(arg.clone());
            i += 1;
            // Remaining arguments are script arguments
            while i < args.len() {
                opts.script_args.push(args[i].clone());
                i += 1;
            }
            break;
        }
        i += 1;
    }

    Ok(opts)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SABLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let opts = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("sable: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    if opts.show_version {
        print_version();
        if opts.script_file.is_none() {
            return;
        }
    }

    let Some(filename) = opts.script_file else {
        print_usage();
        std::process::exit(1);
    };

    let bytes = match fs::read(&filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("sable: cannot open {}: {}", filename, e);
            std::process::exit(1);
        }
    };

    let mut option = VmOption::default();
    if let Some(depth) = opts.max_call_depth {
        option.max_call_depth = depth;
    }
    let context = Context::new(option);
    context.open_libs();

    // arg = [script args...]
    let script_args = opts.script_args.iter().map(|a| Value::string(a.as_str())).collect();
    context.set_global("arg", Value::new_array(script_args));

    let function = match context.load_bytecode(&bytes) {
        Ok(function) => function,
        Err(e) => {
            eprintln!("sable: {}: {}", filename, e);
            std::process::exit(1);
        }
    };
    debug!(file = %filename, bytes = bytes.len(), "loaded bytecode");

    if opts.disassemble {
        print!("{}", function.disassemble());
    }

    match context.execute(&function) {
        Ok(Value::Nil) => {}
        Ok(value) => println!("{}", value),
        Err(e) => {
            eprintln!("sable: {}", e);
            std::process::exit(1);
        }
    }
}
