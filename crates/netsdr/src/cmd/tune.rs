use serde::Serialize;
use tracing::info;

use crate::cmd::TuneArgs;
use crate::exit::{client_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

/// Largest value a 5-byte little-endian frequency field can carry.
const MAX_FREQUENCY_HZ: u64 = (1 << 40) - 1;

#[derive(Debug, Serialize)]
struct TuneOutput {
    frequency_hz: u64,
    channel: u8,
}

pub fn run(args: TuneArgs, format: OutputFormat) -> CliResult<i32> {
    let frequency_hz = parse_frequency(&args.frequency)?;

    let client = crate::cmd::connect_device(&args.device)?;
    let result = client
        .change_frequency(frequency_hz, args.channel)
        .map_err(|err| client_error("tune failed", err));
    client.disconnect();
    result?;

    info!(frequency_hz, channel = args.channel, "tuned");
    let output = TuneOutput {
        frequency_hz,
        channel: args.channel,
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        ),
        _ => println!("tuned channel {} to {} Hz", args.channel, frequency_hz),
    }
    Ok(SUCCESS)
}

/// Accepts plain Hz or a k/M-suffixed decimal (`7100k`, `14.2M`).
fn parse_frequency(input: &str) -> CliResult<u64> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "frequency must not be empty"));
    }

    let (number, multiplier) = match input.strip_suffix(['M', 'm']) {
        Some(num) => (num, 1_000_000f64),
        None => match input.strip_suffix(['K', 'k']) {
            Some(num) => (num, 1_000f64),
            None => (input, 1f64),
        },
    };

    let value: f64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid frequency: {input}")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(CliError::new(USAGE, format!("invalid frequency: {input}")));
    }

    let hz = (value * multiplier).round() as u64;
    if hz > MAX_FREQUENCY_HZ {
        return Err(CliError::new(
            USAGE,
            format!("frequency {hz} Hz exceeds the 40-bit wire field"),
        ));
    }
    Ok(hz)
}
