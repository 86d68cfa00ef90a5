//! CAN Frame Definitions

use crate::error::TransportError;
use crate::{id, MAX_PAYLOAD};
use serde::{Deserialize, Serialize};

/// A single frame as received from the bus
///
/// Frames are immutable once built; the payload is stored inline so a frame
/// can be copied into the trace path without allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCanFrame")]
pub struct CanFrame {
    id: u32,
    data: [u8; MAX_PAYLOAD],
    len: u8,
    remote: bool,
    extended: bool,
}

/// Unchecked wire form, validated through the constructors
#[derive(Deserialize)]
struct RawCanFrame {
    id: u32,
    data: [u8; MAX_PAYLOAD],
    len: u8,
    remote: bool,
    extended: bool,
}

impl TryFrom<RawCanFrame> for CanFrame {
    type Error = TransportError;

    fn try_from(raw: RawCanFrame) -> Result<Self, Self::Error> {
        if raw.remote {
            return CanFrame::new_remote(raw.id, raw.len, raw.extended);
        }
        let len = raw.len as usize;
        if len > MAX_PAYLOAD {
            return Err(TransportError::InvalidFrame(format!(
                "DLC {} exceeds {}",
                len, MAX_PAYLOAD
            )));
        }
        CanFrame::build(raw.id, &raw.data[..len], raw.extended)
    }
}

impl CanFrame {
    /// Build a data frame, picking the identifier format from the id value
    pub fn new(id: u32, payload: &[u8]) -> Result<Self, TransportError> {
        Self::build(id, payload, id > id::MAX_STANDARD)
    }

    /// Build a data frame with a 29-bit identifier
    pub fn new_extended(id: u32, payload: &[u8]) -> Result<Self, TransportError> {
        Self::build(id, payload, true)
    }

    /// Build a remote-request frame (no payload, `dlc` requested bytes)
    pub fn new_remote(id: u32, dlc: u8, extended: bool) -> Result<Self, TransportError> {
        if dlc as usize > MAX_PAYLOAD {
            return Err(TransportError::InvalidFrame(format!(
                "DLC {} exceeds {}",
                dlc, MAX_PAYLOAD
            )));
        }
        let mut frame = Self::build(id, &[], extended)?;
        frame.len = dlc;
        frame.remote = true;
        Ok(frame)
    }

    fn build(id: u32, payload: &[u8], extended: bool) -> Result<Self, TransportError> {
        let max_id = if extended { id::MAX_EXTENDED } else { id::MAX_STANDARD };
        if id > max_id {
            return Err(TransportError::InvalidFrame(format!(
                "identifier 0x{:X} exceeds 0x{:X}",
                id, max_id
            )));
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(TransportError::InvalidFrame(format!(
                "payload of {} bytes exceeds {}",
                payload.len(),
                MAX_PAYLOAD
            )));
        }

        let mut data = [0u8; MAX_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);

        Ok(Self {
            id,
            data,
            len: payload.len() as u8,
            remote: false,
            extended,
        })
    }

    /// Numeric identifier
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Data length code
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True if the frame carries no payload bytes
    pub fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }

    /// Payload bytes (empty for remote requests)
    pub fn payload(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.len as usize]
        }
    }

    /// Remote-transmission-request flag
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// Extended (29-bit) identifier flag
    pub fn is_extended(&self) -> bool {
        self.extended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_frame() {
        let frame = CanFrame::new(0x280, &[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(frame.id(), 0x280);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.payload(), &[0x01, 0x02, 0x03]);
        assert!(!frame.is_extended());
        assert!(!frame.is_remote());
    }

    #[test]
    fn test_large_id_selects_extended_format() {
        let frame = CanFrame::new(0x18FEF100, &[0xFF]).unwrap();
        assert!(frame.is_extended());
    }

    #[test]
    fn test_rejects_oversized_payload() {
        assert!(CanFrame::new(0x100, &[0u8; 9]).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_id() {
        assert!(CanFrame::new_extended(0x2000_0000, &[]).is_err());
        assert!(CanFrame::new_remote(0x800, 0, false).is_err());
    }

    #[test]
    fn test_deserialize_checks_length_and_id() {
        let oversized = r#"{"id":640,"data":[0,0,0,0,0,0,0,0],"len":200,"remote":false,"extended":false}"#;
        assert!(serde_json::from_str::<CanFrame>(oversized).is_err());

        let bad_id = r#"{"id":4096,"data":[0,0,0,0,0,0,0,0],"len":1,"remote":false,"extended":false}"#;
        assert!(serde_json::from_str::<CanFrame>(bad_id).is_err());

        let remote = r#"{"id":640,"data":[0,0,0,0,0,0,0,0],"len":200,"remote":true,"extended":false}"#;
        assert!(serde_json::from_str::<CanFrame>(remote).is_err());
    }

    #[test]
    fn test_deserialize_valid_frame() {
        let json = r#"{"id":1408,"data":[0,0,39,16,0,0,0,0],"len":4,"remote":false,"extended":false}"#;
        let frame: CanFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.id(), 0x580);
        assert_eq!(frame.payload(), &[0x00, 0x00, 0x27, 0x10]);
    }

    #[test]
    fn test_remote_frame_has_no_payload() {
        let frame = CanFrame::new_remote(0x123, 4, false).unwrap();
        assert!(frame.is_remote());
        assert_eq!(frame.len(), 4);
        assert!(frame.payload().is_empty());
    }
}
