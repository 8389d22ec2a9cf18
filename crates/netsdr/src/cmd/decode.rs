use std::fs;

use netsdr_frame::{decode_frame, extract_samples};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = fs::read(&args.input)
        .map_err(|err| io_error(&format!("failed reading {}", args.input.display()), err))?;
    let raw = if args.hex {
        parse_hex(&String::from_utf8_lossy(&raw))?
    } else {
        raw
    };

    let frame = decode_frame(&raw).map_err(|err| frame_error("decode failed", err))?;
    print_frame(&frame, format);

    if let Some(width) = args.width {
        let samples = extract_samples(width, &frame.body)
            .map_err(|err| frame_error("sample extraction failed", err))?;
        println!("{} samples of {} bits", samples.len(), width);
    }

    Ok(SUCCESS)
}

/// Hex text with optional whitespace between bytes.
fn parse_hex(text: &str) -> CliResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() % 2 != 0 {
        return Err(CliError::new(
            DATA_INVALID,
            "hex input has an odd number of digits",
        ));
    }

    (0..compact.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&compact[i..i + 2], 16).map_err(|_| {
                CliError::new(
                    DATA_INVALID,
                    format!("invalid hex byte: {}", &compact[i..i + 2]),
                )
            })
        })
        .collect()
}
