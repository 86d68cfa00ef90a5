//! Trace Line Format

use can_protocol::{CanFrame, MAX_PAYLOAD};
use std::fmt::Write;

/// One raw frame as written to the trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub timestamp_ms: u64,
    pub id: u32,
    pub extended: bool,
    data: [u8; MAX_PAYLOAD],
    len: usize,
}

impl TraceRecord {
    /// Copy a received frame
    pub fn from_frame(timestamp_ms: u64, frame: &CanFrame) -> Self {
        let mut data = [0u8; MAX_PAYLOAD];
        let payload = frame.payload();
        data[..payload.len()].copy_from_slice(payload);
        Self {
            timestamp_ms,
            id: frame.id(),
            extended: frame.is_extended(),
            data,
            len: payload.len(),
        }
    }

    /// Payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// `<timestamp_ms>,<ID hex>,<len>,<B0 B1 ...>` plus a newline
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(48);
        // Writing into a String cannot fail
        let _ = if self.extended {
            write!(line, "{},{:08X},{},", self.timestamp_ms, self.id, self.len)
        } else {
            write!(line, "{},{:03X},{},", self.timestamp_ms, self.id, self.len)
        };
        for (i, byte) in self.payload().iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            let _ = write!(line, "{:02X}", byte);
        }
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_frame_line() {
        let frame = CanFrame::new(0x280, &[0x00, 0x00, 0x1E, 0x00, 0x32, 0x19, 0x00, 0x4B]).unwrap();
        let record = TraceRecord::from_frame(12345, &frame);
        assert_eq!(record.to_line(), "12345,280,8,00 00 1E 00 32 19 00 4B\n");
    }

    #[test]
    fn test_short_and_empty_payloads() {
        let frame = CanFrame::new(0x06, &[0xAB]).unwrap();
        assert_eq!(TraceRecord::from_frame(7, &frame).to_line(), "7,006,1,AB\n");

        let empty = CanFrame::new(0x580, &[]).unwrap();
        assert_eq!(TraceRecord::from_frame(0, &empty).to_line(), "0,580,0,\n");
    }

    #[test]
    fn test_extended_frame_line() {
        let frame = CanFrame::new_extended(0x18FEF100, &[0x01, 0x02]).unwrap();
        assert_eq!(TraceRecord::from_frame(1, &frame).to_line(), "1,18FEF100,2,01 02\n");
    }
}
