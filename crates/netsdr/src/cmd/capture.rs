use std::fs::File;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use netsdr_client::ClientError;
use netsdr_frame::{decode_frame, extract_samples};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cmd::CaptureArgs;
use crate::exit::{client_error, frame_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::OutputFormat;

/// Poll interval for the stop flag while no datagrams arrive.
const RECV_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
struct CaptureSummary {
    datagrams: usize,
    samples: usize,
    malformed: usize,
    sequence_gaps: usize,
}

pub fn run(args: CaptureArgs, format: OutputFormat) -> CliResult<i32> {
    // Fail on a bad width before touching the device.
    extract_samples(args.width, &[]).map_err(|err| frame_error("invalid sample width", err))?;

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).map_err(|err| {
            io_error(&format!("cannot create {}", path.display()), err)
        })?),
        None => Box::new(std::io::stdout()),
    };

    let client = crate::cmd::connect_device(&args.device)?;
    client
        .start_iq()
        .map_err(|err| client_error("start streaming failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut summary = CaptureSummary {
        datagrams: 0,
        samples: 0,
        malformed: 0,
        sequence_gaps: 0,
    };
    let mut expected_sequence: Option<u16> = None;

    let result = (|| -> CliResult<()> {
        while running.load(Ordering::SeqCst) {
            if let Some(count) = args.count {
                if summary.datagrams >= count {
                    break;
                }
            }

            let datagram = match client.recv_iq(RECV_TIMEOUT) {
                Ok(datagram) => datagram,
                Err(ClientError::Timeout(_)) => continue,
                Err(err) => return Err(client_error("stream receive failed", err)),
            };

            let frame = match decode_frame(&datagram) {
                Ok(frame) => frame,
                Err(err) => {
                    debug!(error = %err, "dropping malformed datagram");
                    summary.malformed += 1;
                    continue;
                }
            };
            if !frame.kind.is_data() {
                debug!(kind = ?frame.kind, "ignoring non-data frame on stream socket");
                continue;
            }

            if let Some(expected) = expected_sequence {
                if frame.discriminator != expected {
                    summary.sequence_gaps += 1;
                }
            }
            expected_sequence = Some(frame.discriminator.wrapping_add(1));

            for sample in extract_samples(args.width, &frame.body)
                .map_err(|err| frame_error("sample extraction failed", err))?
            {
                sink.write_all(sample)
                    .map_err(|err| io_error("write failed", err))?;
                summary.samples += 1;
            }
            summary.datagrams += 1;
        }
        sink.flush().map_err(|err| io_error("flush failed", err))
    })();

    if let Err(err) = client.stop_iq() {
        warn!(error = %err, "stop streaming failed");
    }
    client.disconnect();
    result?;

    info!(
        datagrams = summary.datagrams,
        samples = summary.samples,
        malformed = summary.malformed,
        sequence_gaps = summary.sequence_gaps,
        "capture finished"
    );
    // Raw samples on stdout leave no room for a summary there.
    if args.output.is_some() {
        print_summary(&summary, format);
    }
    Ok(SUCCESS)
}

fn print_summary(summary: &CaptureSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
        ),
        _ => println!(
            "captured {} datagrams, {} samples ({} malformed, {} sequence gaps)",
            summary.datagrams, summary.samples, summary.malformed, summary.sequence_gaps
        ),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
