use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::cmd::ProbeArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Debug, Serialize)]
struct ProbeOutput {
    host: String,
    control_port: u16,
    data_port: u16,
    connected: bool,
    sample_rate_hz: u32,
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let client = crate::cmd::connect_device(&args.device)?;

    let output = ProbeOutput {
        host: args.device.host.clone(),
        control_port: args.device.control_port,
        data_port: args.device.data_port,
        connected: client.is_connected(),
        sample_rate_hz: args.device.sample_rate,
    };
    client.disconnect();

    print_probe(&output, format);
    Ok(SUCCESS)
}

fn print_probe(output: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["HOST", "CONTROL", "DATA", "CONNECTED", "RATE"])
                .add_row(vec![
                    output.host.clone(),
                    output.control_port.to_string(),
                    output.data_port.to_string(),
                    output.connected.to_string(),
                    format!("{} Hz", output.sample_rate_hz),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "host={} control={} data={} connected={} rate={}Hz",
                output.host,
                output.control_port,
                output.data_port,
                output.connected,
                output.sample_rate_hz
            );
        }
    }
}
