//! SLCAN Serial Transport
//!
//! Drives a serial-line CAN adapter (LAWICEL / CAN232 ASCII protocol):
//!
//! - `S<n>\r` selects the bitrate, `O\r` opens the channel, `C\r` closes it
//! - `t<ID:3><DLC:1><DATA>\r` / `T<ID:8><DLC:1><DATA>\r` are data frames
//! - `r<ID:3><DLC:1>\r` / `R<ID:8><DLC:1>\r` are remote requests
//! - a BELL (0x07) reply means the adapter rejected a command

use crate::bitrate::Bitrate;
use crate::error::TransportError;
use crate::frame::CanFrame;
use crate::transport::CanTransport;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

/// Adapter error reply
const BELL: u8 = 0x07;

/// Default serial baud rate for USB SLCAN adapters
pub const SLCAN_BAUD_RATE: u32 = 115_200;

/// Longest line accepted from the adapter before the buffer is discarded
const MAX_LINE_LEN: usize = 64;

/// One reply from the adapter
#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Line(String),
    Bell,
}

/// Splits the adapter byte stream into replies
///
/// Cancel-safe: partial input stays buffered for the next call.
#[derive(Debug, Default)]
struct LineReader {
    buf: Vec<u8>,
}

impl LineReader {
    fn clear(&mut self) {
        self.buf.clear();
    }

    /// Read one reply, terminated by CR or BELL
    async fn read_reply<R: AsyncRead + Unpin>(
        &mut self,
        port: &mut R,
    ) -> Result<Reply, TransportError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\r' || b == BELL) {
                let line: Vec<u8> = self.buf.drain(..=pos).collect();
                if line[pos] == BELL {
                    return Ok(Reply::Bell);
                }
                return Ok(Reply::Line(String::from_utf8_lossy(&line[..pos]).into_owned()));
            }
            if self.buf.len() > MAX_LINE_LEN {
                let dropped = self.buf.len();
                self.buf.clear();
                return Err(TransportError::InvalidFrame(format!(
                    "slcan: no line terminator in {} bytes",
                    dropped
                )));
            }

            let mut chunk = [0u8; 64];
            let n = port.read(&mut chunk).await?;
            if n == 0 {
                return Err(TransportError::Serial("adapter closed the port".to_string()));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Read replies until a frame arrives, skipping acknowledgements
    async fn next_frame<R: AsyncRead + Unpin>(
        &mut self,
        port: &mut R,
    ) -> Result<CanFrame, TransportError> {
        loop {
            match self.read_reply(port).await? {
                Reply::Bell => {
                    return Err(TransportError::BusError(
                        "adapter reported an error".to_string(),
                    ))
                }
                // Command acknowledgements and blank lines
                Reply::Line(line) if line.is_empty() || line == "z" || line == "Z" => continue,
                Reply::Line(line) => return parse_slcan_line(&line),
            }
        }
    }
}

/// CAN transport over an SLCAN adapter
pub struct SlcanTransport {
    /// Serial device path (e.g., "/dev/ttyACM0" or "COM3")
    device: String,
    /// Serial baud rate
    baud_rate: u32,
    /// Open port, present once installed
    port: Option<SerialStream>,
    /// Bytes read but not yet consumed as a line
    reader: LineReader,
    /// Whether the channel is open
    running: bool,
}

impl SlcanTransport {
    /// Create a transport for the given device; the port opens on install
    pub fn new(device: &str, baud_rate: u32) -> Self {
        info!("Creating SLCAN transport for device: {}", device);
        Self {
            device: device.to_string(),
            baud_rate,
            port: None,
            reader: LineReader::default(),
            running: false,
        }
    }

    async fn send_command(&mut self, command: &str) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotInstalled)?;
        debug!("SLCAN command: {}", command);
        port.write_all(command.as_bytes()).await?;
        port.write_all(b"\r").await?;
        port.flush().await?;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<CanFrame, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotInstalled)?;
        self.reader.next_frame(port).await
    }
}

impl CanTransport for SlcanTransport {
    async fn install(&mut self, bitrate: Bitrate) -> Result<(), TransportError> {
        info!(
            "Installing SLCAN driver on {} ({} baud, {} bit/s)",
            self.device,
            self.baud_rate,
            bitrate.bits_per_second()
        );

        let port = tokio_serial::new(&self.device, self.baud_rate)
            .open_native_async()
            .map_err(|e| TransportError::Install(e.to_string()))?;
        self.port = Some(port);
        self.reader.clear();

        // Close any channel left open by a previous session, then set the rate
        self.send_command("C")
            .await
            .map_err(|e| TransportError::Install(e.to_string()))?;
        self.send_command(bitrate.slcan_command())
            .await
            .map_err(|e| TransportError::Install(e.to_string()))?;

        info!("SLCAN driver installed");
        Ok(())
    }

    async fn start(&mut self) -> Result<(), TransportError> {
        if self.port.is_none() {
            return Err(TransportError::NotInstalled);
        }
        if self.running {
            warn!("SLCAN channel already open");
            return Ok(());
        }

        self.send_command("O")
            .await
            .map_err(|e| TransportError::Start(e.to_string()))?;
        self.running = true;
        info!("SLCAN channel opened");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        if !self.running {
            warn!("SLCAN channel not open");
            return Ok(());
        }

        self.running = false;
        self.reader.clear();
        self.send_command("C")
            .await
            .map_err(|e| TransportError::Stop(e.to_string()))?;
        info!("SLCAN channel closed");
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<CanFrame, TransportError> {
        if !self.running {
            return Err(TransportError::NotRunning);
        }

        match tokio::time::timeout(timeout, self.next_frame()).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout.as_millis() as u64)),
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Parse one SLCAN frame line (without the trailing CR)
pub fn parse_slcan_line(line: &str) -> Result<CanFrame, TransportError> {
    let bytes = line.as_bytes();
    let invalid = |msg: String| TransportError::InvalidFrame(format!("slcan: {}", msg));

    if !line.is_ascii() {
        return Err(invalid("non-ASCII input".to_string()));
    }

    let (extended, remote) = match bytes.first() {
        Some(b't') => (false, false),
        Some(b'T') => (true, false),
        Some(b'r') => (false, true),
        Some(b'R') => (true, true),
        Some(&c) => return Err(invalid(format!("unexpected prefix '{}'", c as char))),
        None => return Err(invalid("empty line".to_string())),
    };

    let id_len = if extended { 8 } else { 3 };
    if bytes.len() < 1 + id_len + 1 {
        return Err(invalid(format!("line too short: {}", line)));
    }

    let id_str = &line[1..1 + id_len];
    if !id_str.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid(format!("invalid identifier '{}'", id_str)));
    }
    let id = u32::from_str_radix(id_str, 16)
        .map_err(|_| invalid(format!("invalid identifier '{}'", id_str)))?;

    let dlc_char = bytes[1 + id_len] as char;
    let dlc = dlc_char
        .to_digit(16)
        .filter(|&d| d <= 8)
        .ok_or_else(|| invalid(format!("invalid DLC '{}'", dlc_char)))? as u8;

    if remote {
        return CanFrame::new_remote(id, dlc, extended);
    }

    let data_start = 1 + id_len + 1;
    let data_end = data_start + dlc as usize * 2;
    if bytes.len() < data_end {
        return Err(invalid(format!("incomplete data: {}", line)));
    }

    let mut payload = [0u8; 8];
    for (i, slot) in payload.iter_mut().take(dlc as usize).enumerate() {
        let byte_str = &line[data_start + i * 2..data_start + i * 2 + 2];
        if !byte_str.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid(format!("invalid data byte '{}'", byte_str)));
        }
        *slot = u8::from_str_radix(byte_str, 16)
            .map_err(|_| invalid(format!("invalid data byte '{}'", byte_str)))?;
    }

    // Trailing characters (adapter timestamps) are ignored
    if extended {
        CanFrame::new_extended(id, &payload[..dlc as usize])
    } else {
        CanFrame::new(id, &payload[..dlc as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_standard_frame() {
        let frame = parse_slcan_line("t2808000A1E003219004B").unwrap();
        assert_eq!(frame.id(), 0x280);
        assert_eq!(frame.len(), 8);
        assert_eq!(frame.payload()[2], 0x1E);
        assert_eq!(frame.payload()[7], 0x4B);
        assert!(!frame.is_extended());
    }

    #[test]
    fn test_parse_extended_frame() {
        let frame = parse_slcan_line("T18FEF1002AABB").unwrap();
        assert_eq!(frame.id(), 0x18FE_F100);
        assert_eq!(frame.payload(), &[0xAA, 0xBB]);
        assert!(frame.is_extended());
    }

    #[test]
    fn test_parse_remote_frame() {
        let frame = parse_slcan_line("r2063").unwrap();
        assert!(frame.is_remote());
        assert_eq!(frame.len(), 3);
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn test_parse_ignores_trailing_timestamp() {
        let frame = parse_slcan_line("t39410F1A2").unwrap();
        assert_eq!(frame.payload(), &[0x0F]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_slcan_line("").is_err());
        assert!(parse_slcan_line("x1231AA").is_err());
        assert!(parse_slcan_line("t12").is_err());
        assert!(parse_slcan_line("t1239").is_err());
        assert!(parse_slcan_line("t1232AA").is_err());
        assert!(parse_slcan_line("t1231ZZ").is_err());
    }

    #[test]
    fn test_parse_rejects_sign_characters() {
        assert!(parse_slcan_line("t+2F1AA").is_err());
        assert!(parse_slcan_line("t1231+A").is_err());
        assert!(parse_slcan_line("T+18FEF101AA").is_err());
    }

    #[tokio::test]
    async fn test_bell_reply_is_a_fault() {
        let (mut adapter, mut host) = tokio::io::duplex(64);
        let mut reader = LineReader::default();
        adapter.write_all(&[BELL]).await.unwrap();

        assert!(matches!(
            reader.next_frame(&mut host).await,
            Err(TransportError::BusError(_))
        ));
    }

    #[tokio::test]
    async fn test_acknowledgements_are_skipped() {
        let (mut adapter, mut host) = tokio::io::duplex(64);
        let mut reader = LineReader::default();
        adapter.write_all(b"\rz\rZ\rt2801AA\r").await.unwrap();

        let frame = reader.next_frame(&mut host).await.unwrap();
        assert_eq!(frame.id(), 0x280);
        assert_eq!(frame.payload(), &[0xAA]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_line_survives_timeout() {
        let (mut adapter, mut host) = tokio::io::duplex(64);
        let mut reader = LineReader::default();
        adapter.write_all(b"t2802A").await.unwrap();

        let first = tokio::time::timeout(
            Duration::from_millis(100),
            reader.next_frame(&mut host),
        )
        .await;
        assert!(first.is_err());

        adapter.write_all(b"ABB\r").await.unwrap();
        let frame = reader.next_frame(&mut host).await.unwrap();
        assert_eq!(frame.id(), 0x280);
        assert_eq!(frame.payload(), &[0xAA, 0xBB]);
    }

    #[tokio::test]
    async fn test_unterminated_input_is_discarded() {
        let (mut adapter, mut host) = tokio::io::duplex(256);
        let mut reader = LineReader::default();
        adapter.write_all(&[b'A'; 80]).await.unwrap();

        assert!(matches!(
            reader.next_frame(&mut host).await,
            Err(TransportError::InvalidFrame(_))
        ));
        assert!(reader.buf.is_empty());

        adapter.write_all(b"t58040000271\r").await.unwrap();
        assert!(reader.next_frame(&mut host).await.is_err());
        adapter.write_all(b"t580400002710\r").await.unwrap();
        let frame = reader.next_frame(&mut host).await.unwrap();
        assert_eq!(frame.payload(), &[0x00, 0x00, 0x27, 0x10]);
    }

    #[tokio::test]
    async fn test_receive_before_start_is_a_fault() {
        let mut transport = SlcanTransport::new("/dev/null-slcan", SLCAN_BAUD_RATE);
        assert!(!transport.is_running());
        assert!(matches!(
            transport.receive(Duration::from_millis(10)).await,
            Err(TransportError::NotRunning)
        ));
        assert!(matches!(
            transport.start().await,
            Err(TransportError::NotInstalled)
        ));
    }

    proptest! {
        #[test]
        fn test_parse_never_panics(line in "\\PC{0,32}") {
            let _ = parse_slcan_line(&line);
        }
    }
}
