use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use netsdr_frame::{decode_frame, encode_frame, ControlItem, Frame, FrameKind};
use tracing::{debug, info, warn};

use crate::channel::{CommandChannel, StreamChannel};
use crate::error::{ClientError, Result};

/// TCP port the device listens on for commands.
pub const DEFAULT_CONTROL_PORT: u16 = 50000;

/// UDP port sample datagrams are exchanged on.
pub const DEFAULT_DATA_PORT: u16 = 50001;

/// Receiver-state body: complex IQ, run, 16-bit contiguous capture.
const RECEIVER_STATE_RUN: [u8; 4] = [0x80, 0x02, 0x00, 0x00];

/// Receiver-state body: complex IQ, stop.
const RECEIVER_STATE_STOP: [u8; 4] = [0x80, 0x01, 0x00, 0x00];

/// Default A/D mode body: channel 0, dither + A/D gain enabled.
const AD_MODES_DEFAULT: [u8; 2] = [0x00, 0x03];

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long each command waits for its reply.
    pub response_timeout: Duration,
    /// IQ output sample rate pushed during the connect handshake.
    pub iq_sample_rate_hz: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(5),
            iq_sample_rate_hz: 200_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Disconnected,
    Connecting,
    Ready,
}

struct CommandPath<C> {
    channel: C,
    state: SessionState,
    next_sequence: u16,
}

impl<C> CommandPath<C> {
    /// Advance the rolling sequence counter. Wraps silently; data-style
    /// frames carry the assigned value as their discriminator.
    fn take_sequence(&mut self) -> u16 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        sequence
    }
}

/// The session controller for one device connection.
///
/// Owns the connect handshake, serialized command/response exchange,
/// and IQ streaming start/stop against two injected channel
/// collaborators. The command path is strictly half-duplex: one lock
/// spans sequence assignment through reply receipt, and the next
/// inbound frame is unconditionally the reply to the request just
/// sent. The streaming path runs independently and shares nothing
/// with the command path beyond the `iq_started` flag.
pub struct NetSdrClient<C, S> {
    command: Mutex<CommandPath<C>>,
    stream: Mutex<S>,
    connected: AtomicBool,
    iq_started: AtomicBool,
    config: ClientConfig,
}

impl<C: CommandChannel, S: StreamChannel> NetSdrClient<C, S> {
    pub fn new(command: C, stream: S) -> Self {
        Self::with_config(command, stream, ClientConfig::default())
    }

    pub fn with_config(command: C, stream: S, config: ClientConfig) -> Self {
        Self {
            command: Mutex::new(CommandPath {
                channel: command,
                state: SessionState::Disconnected,
                next_sequence: 0,
            }),
            stream: Mutex::new(stream),
            connected: AtomicBool::new(false),
            iq_started: AtomicBool::new(false),
            config,
        }
    }

    /// Whether the session is `Ready` (connected and initialized).
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Whether IQ streaming is currently active.
    pub fn iq_started(&self) -> bool {
        self.iq_started.load(Ordering::Acquire)
    }

    /// Open the command channel and run the three-step initialization
    /// handshake.
    ///
    /// A transport-level connect failure is absorbed: the session
    /// stays `Disconnected` and `Ok(())` is returned, so callers poll
    /// [`is_connected`](Self::is_connected) instead of matching on
    /// unreachable-host errors. A handshake step that never gets its
    /// reply is a hard failure: the channel is torn down and
    /// `HandshakeFailed` surfaces once, with no retry.
    pub fn connect(&self) -> Result<()> {
        let mut command = lock(&self.command);
        if command.state == SessionState::Ready {
            return Ok(());
        }

        command.state = SessionState::Connecting;
        if let Err(e) = command.channel.open() {
            warn!(error = %e, "device unreachable; session stays disconnected");
            command.state = SessionState::Disconnected;
            return Ok(());
        }

        // Baseline configuration, strictly one exchange at a time.
        for (kind, item, body) in self.handshake_steps() {
            if let Err(e) = exchange(
                &mut command,
                self.config.response_timeout,
                kind,
                item,
                &body,
            ) {
                command.channel.close();
                command.state = SessionState::Disconnected;
                return Err(ClientError::HandshakeFailed(format!(
                    "{} exchange: {e}",
                    item.name()
                )));
            }
        }

        command.state = SessionState::Ready;
        self.connected.store(true, Ordering::Release);
        info!("session ready");
        Ok(())
    }

    fn handshake_steps(&self) -> [(FrameKind, ControlItem, Vec<u8>); 3] {
        let mut rate_body = Vec::with_capacity(5);
        rate_body.push(0x00);
        rate_body.extend_from_slice(&self.config.iq_sample_rate_hz.to_le_bytes());

        [
            (
                FrameKind::CurrentControlItem,
                ControlItem::ReceiverState,
                Vec::new(),
            ),
            (
                FrameKind::SetControlItem,
                ControlItem::IQOutputDataSampleRate,
                rate_body,
            ),
            (
                FrameKind::SetControlItem,
                ControlItem::ADModes,
                AD_MODES_DEFAULT.to_vec(),
            ),
        ]
    }

    /// Tear the session down. Idempotent: sends a best-effort receiver
    /// off while streaming, stops the receive loop, closes the command
    /// channel, and resets the sequence counter. Never fails, even
    /// when nothing was connected or the device stopped answering.
    pub fn disconnect(&self) {
        {
            let mut command = lock(&self.command);
            if command.state == SessionState::Ready && self.iq_started.load(Ordering::Acquire) {
                if let Err(e) = exchange(
                    &mut command,
                    self.config.response_timeout,
                    FrameKind::SetControlItem,
                    ControlItem::ReceiverState,
                    &RECEIVER_STATE_STOP,
                ) {
                    debug!(error = %e, "receiver off during teardown failed");
                }
            }
            command.channel.close();
            command.state = SessionState::Disconnected;
            command.next_sequence = 0;
            self.connected.store(false, Ordering::Release);
        }

        lock(&self.stream).stop();
        self.iq_started.store(false, Ordering::Release);
        info!("session disconnected");
    }

    /// Put the receiver into run state and begin background datagram
    /// delivery. Observable no-op while not `Ready`.
    pub fn start_iq(&self) -> Result<()> {
        let reply = self.send_command(
            FrameKind::SetControlItem,
            ControlItem::ReceiverState,
            &RECEIVER_STATE_RUN,
        )?;
        if reply.is_none() {
            return Ok(());
        }

        lock(&self.stream).start()?;
        self.iq_started.store(true, Ordering::Release);
        info!("IQ streaming started");
        Ok(())
    }

    /// Take the receiver out of run state and stop the background
    /// loop (returns once it has exited). Observable no-op while not
    /// `Ready`; safe when streaming was never started.
    ///
    /// The loop is halted and `iq_started` cleared even when the stop
    /// command gets no reply; the wire error surfaces after the local
    /// teardown so a dead device cannot leave the loop running.
    pub fn stop_iq(&self) -> Result<()> {
        let reply = self.send_command(
            FrameKind::SetControlItem,
            ControlItem::ReceiverState,
            &RECEIVER_STATE_STOP,
        );
        if matches!(reply, Ok(None)) {
            return Ok(());
        }

        lock(&self.stream).stop();
        self.iq_started.store(false, Ordering::Release);
        reply?;
        info!("IQ streaming stopped");
        Ok(())
    }

    /// Tune `channel` to `frequency_hz`. One frame, one ack.
    /// Observable no-op while not `Ready`.
    pub fn change_frequency(&self, frequency_hz: u64, channel: u8) -> Result<()> {
        // 1-byte channel selector + 5-byte little-endian frequency.
        let mut body = Vec::with_capacity(6);
        body.push(channel);
        body.extend_from_slice(&frequency_hz.to_le_bytes()[..5]);

        self.send_command(FrameKind::SetControlItem, ControlItem::ReceiverFrequency, &body)?;
        Ok(())
    }

    /// Pop the next streamed datagram's raw bytes, waiting up to
    /// `timeout`. Callers feed these through the frame codec and
    /// sample extractor.
    pub fn recv_iq(&self, timeout: Duration) -> Result<Bytes> {
        lock(&self.stream).recv_timeout(timeout)
    }

    /// The internal command primitive: `Ok(None)` is the observable
    /// no-op when the session is not `Ready` (no frame sent, no state
    /// changed); otherwise the decoded reply frame.
    fn send_command(
        &self,
        kind: FrameKind,
        item: ControlItem,
        body: &[u8],
    ) -> Result<Option<Frame>> {
        let mut command = lock(&self.command);
        if command.state != SessionState::Ready {
            debug!(item = item.name(), "not connected; command dropped");
            return Ok(None);
        }
        exchange(&mut command, self.config.response_timeout, kind, item, body).map(Some)
    }
}

/// Recover the guard from a poisoned lock; the session state is a
/// plain value and stays usable after a panicking holder.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One serialized request/response exchange. Runs entirely under the
/// command lock: assigns the sequence number, sends the frame, then
/// treats the next decodable inbound frame as the reply — the device
/// protocol is half-duplex, so ordering is the only correlation.
/// Frames carrying unregistered control items are skipped, not fatal.
fn exchange<C: CommandChannel>(
    path: &mut CommandPath<C>,
    timeout: Duration,
    kind: FrameKind,
    item: ControlItem,
    body: &[u8],
) -> Result<Frame> {
    let sequence = path.take_sequence();
    let discriminator = if kind.is_data() {
        sequence
    } else {
        item.code()
    };

    let mut wire = BytesMut::new();
    encode_frame(kind, discriminator, body, &mut wire)?;
    path.channel.send(&wire)?;
    debug!(item = item.name(), kind = ?kind, len = wire.len(), "command sent");

    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ClientError::Timeout(timeout));
        }

        let raw = path.channel.recv_timeout(remaining)?;
        match decode_frame(&raw) {
            Ok(frame) => return Ok(frame),
            Err(e) if e.is_soft() => {
                debug!(error = %e, "ignoring frame with unregistered item");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
