use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use netsdr_client::{
    ClientConfig, NetSdrClient, TcpCommandChannel, UdpStreamChannel, DEFAULT_CONTROL_PORT,
    DEFAULT_DATA_PORT,
};

use crate::exit::{client_error, CliError, CliResult, FAILURE, USAGE};
use crate::output::OutputFormat;

pub mod capture;
pub mod decode;
pub mod probe;
pub mod tune;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a device, run the handshake, and report its state.
    Probe(ProbeArgs),
    /// Tune a receiver channel to a frequency.
    Tune(TuneArgs),
    /// Stream IQ sample data and write raw samples out.
    Capture(CaptureArgs),
    /// Decode a raw frame from a file and print it.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, format),
        Command::Tune(args) => tune::run(args, format),
        Command::Capture(args) => capture::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Connection arguments shared by every device-facing subcommand.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Device host name or IP address.
    pub host: String,
    /// TCP control port.
    #[arg(long, default_value_t = DEFAULT_CONTROL_PORT)]
    pub control_port: u16,
    /// UDP data port.
    #[arg(long, default_value_t = DEFAULT_DATA_PORT)]
    pub data_port: u16,
    /// Command response timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// IQ output sample rate in Hz, pushed during connect.
    #[arg(long, default_value_t = 200_000)]
    pub sample_rate: u32,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct TuneArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Target frequency in Hz; k/M suffixes accepted (e.g. 14.2M, 7100k).
    pub frequency: String,
    /// Receiver channel to tune.
    #[arg(long, short = 'c', default_value_t = 0)]
    pub channel: u8,
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Stop after this many datagrams (default: run until Ctrl-C).
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
    /// Sample width in bits (8, 16, or 32).
    #[arg(long, default_value_t = 16)]
    pub width: u16,
    /// Write raw sample bytes to this file instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding one raw frame.
    pub input: PathBuf,
    /// Treat the input as hex text instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
    /// Also extract samples of this width from data-frame bodies.
    #[arg(long, value_name = "BITS")]
    pub width: Option<u16>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Build a session from CLI arguments and run the connect handshake.
/// An unreachable device is a command failure here even though the
/// session API absorbs it.
pub fn connect_device(
    device: &DeviceArgs,
) -> CliResult<NetSdrClient<TcpCommandChannel, UdpStreamChannel>> {
    let config = ClientConfig {
        response_timeout: parse_duration(&device.timeout)?,
        iq_sample_rate_hz: device.sample_rate,
    };

    let control = resolve(&device.host, device.control_port)?;
    let data = resolve(&device.host, device.data_port)?;

    let client = NetSdrClient::with_config(
        TcpCommandChannel::new(control),
        UdpStreamChannel::new(data),
        config,
    );
    client
        .connect()
        .map_err(|err| client_error("connect failed", err))?;
    if !client.is_connected() {
        return Err(CliError::new(
            FAILURE,
            format!("device at {control} is unreachable"),
        ));
    }
    Ok(client)
}

fn resolve(host: &str, port: u16) -> CliResult<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|err| CliError::new(USAGE, format!("cannot resolve {host}:{port}: {err}")))?
        .next()
        .ok_or_else(|| CliError::new(USAGE, format!("{host}:{port} resolves to no addresses")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn resolve_accepts_literal_addresses() {
        let addr = resolve("127.0.0.1", 50000).unwrap();
        assert_eq!(addr.port(), 50000);
    }
}
