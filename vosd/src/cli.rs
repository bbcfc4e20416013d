//! Command line parsing

use crate::runtime::DemoConfig;
use std::time::Duration;

/// What the command line asked for
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Run(DemoConfig),
    Help,
}

/// Parses `args` (including the program name at index 0)
pub fn parse_args(args: &[String]) -> Result<CliCommand, String> {
    let mut config = DemoConfig::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--duration" | "-d" => {
                i += 1;
                config.duration = parse_seconds(args, i, "--duration")?;
            }
            "--status-every" => {
                i += 1;
                config.status_every = parse_seconds(args, i, "--status-every")?;
                if config.status_every.is_zero() {
                    return Err("--status-every must be at least 1 second".to_string());
                }
            }
            "--adjust-at" => {
                i += 1;
                config.adjust_at = Some(parse_seconds(args, i, "--adjust-at")?);
            }
            "--no-adjust" => {
                config.adjust_at = None;
            }
            "--countdown" => {
                i += 1;
                let name = args
                    .get(i)
                    .ok_or_else(|| "Missing value for --countdown".to_string())?;
                config.countdown_task = match name.as_str() {
                    "none" => None,
                    name => Some(name.to_string()),
                };
            }
            "--json" => {
                config.json = true;
            }
            "--quiet" | "-q" => {
                config.quiet = true;
            }
            "--help" | "-h" => {
                return Ok(CliCommand::Help);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    Ok(CliCommand::Run(config))
}

fn parse_seconds(args: &[String], i: usize, flag: &str) -> Result<Duration, String> {
    let value = args
        .get(i)
        .ok_or_else(|| format!("Missing value for {}", flag))?;
    let secs: u64 = value
        .parse()
        .map_err(|_| format!("Invalid {} value: {}", flag, value))?;
    Ok(Duration::from_secs(secs))
}

/// Usage text for `program`
pub fn usage(program: &str) -> String {
    let mut text = String::new();
    text.push_str(&format!("Usage: {} [OPTIONS]\n\n", program));
    text.push_str("Options:\n");
    text.push_str("  -d, --duration <SECS>     Demo run time (default 60)\n");
    text.push_str("  --status-every <SECS>     Status report interval (default 5)\n");
    text.push_str("  --adjust-at <SECS>        When to set SystemMonitor to 6 ticks (default 30)\n");
    text.push_str("  --no-adjust               Never adjust SystemMonitor\n");
    text.push_str("  --countdown <TASK|none>   Log this task's countdown every tick\n");
    text.push_str("                            (default BackgroundLogger)\n");
    text.push_str("  --json                    Print final statistics as JSON\n");
    text.push_str("  -q, --quiet               Only print warnings and errors\n");
    text.push_str("  -h, --help                Show this help message\n\n");
    text.push_str("Examples:\n");
    text.push_str(&format!("  {} --duration 10 --status-every 2\n", program));
    text.push_str(&format!("  {} --quiet --json\n", program));
    text
}
