//! # vOS Demo Daemon
//!
//! Main entry point for the host demo.

use services_logger::{ConsoleSink, LogLevel, Logger};
use std::env;
use std::process;
use std::sync::Arc;
use vosd::{parse_args, usage, CliCommand, DemoRuntime};

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("vosd");

    let config = match parse_args(&args) {
        Ok(CliCommand::Run(config)) => config,
        Ok(CliCommand::Help) => {
            eprint!("{}", usage(program));
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprint!("{}", usage(program));
            process::exit(1);
        }
    };

    let min_level = if config.quiet {
        LogLevel::Warn
    } else {
        LogLevel::Info
    };
    let console = Arc::new(ConsoleSink::with_min_level(min_level));
    let logger = Logger::new(console.clone());
    let json = config.json;

    let runtime = DemoRuntime::new(config, logger).unwrap_or_else(|e| {
        eprintln!("Failed to create runtime: {}", e);
        process::exit(1);
    });

    let stats = runtime.run().unwrap_or_else(|e| {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    });
    console.shutdown();

    if json {
        match DemoRuntime::render_json(&stats) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
    }
}
