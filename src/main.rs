//! Sample module generator
//!
//! Builds one of the bundled sample modules and writes it as a `.wasm` file.
//!
//! Usage: wasmgen <sample> [output.wasm] [--hex]
//!        wasmgen --list

use std::env;
use std::process;

use wasmgen::samples;

fn print_help(prog: &str) {
    eprintln!("Usage: {} <sample> [output.wasm] [--hex]", prog);
    eprintln!("       {} --list", prog);
    eprintln!();
    eprintln!("Builds a sample WebAssembly module. The output file defaults to <sample>.wasm.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --hex           Print the encoded bytes as hex instead of writing a file");
    eprintln!("  --list          List the available samples");
    eprintln!("  -h, --help      Show this help message");
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("wasmgen");

    if args.len() < 2 || args.iter().any(|a| a == "-h" || a == "--help") {
        print_help(prog);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    if args.iter().any(|a| a == "--list") {
        for sample in samples::SAMPLES {
            println!("{:<12} {}", sample.name, sample.description);
        }
        return;
    }

    let mut hex_output = false;
    let mut positional = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "--hex" => hex_output = true,
            a if a.starts_with("--") => {
                eprintln!("Unknown option: {}", a);
                process::exit(1);
            }
            a => positional.push(a),
        }
    }

    let Some(name) = positional.first() else {
        print_help(prog);
        process::exit(1);
    };
    let Some(sample) = samples::find(name) else {
        eprintln!("Unknown sample: {} (try --list)", name);
        process::exit(1);
    };

    let module = (sample.build)();
    if hex_output {
        match module.encode() {
            Ok(bytes) => println!("{}", hex::encode(bytes)),
            Err(e) => {
                eprintln!("Error encoding {}: {}", sample.name, e);
                process::exit(1);
            }
        }
        return;
    }

    let output = positional
        .get(1)
        .map(|p| p.to_string())
        .unwrap_or_else(|| format!("{}.wasm", sample.name));
    if let Err(e) = module.write_to(&output) {
        eprintln!("Error writing {}: {}", output, e);
        process::exit(1);
    }
    eprintln!("Wrote {}", output);
}
