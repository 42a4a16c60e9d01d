//! Binary encoding of control events.
//!
//! Frames are plain bincode; framing on the transport is the caller's job.

use bytes::Bytes;

use crate::error::ControlError;
use crate::event::ControlEvent;

pub fn encode(event: &ControlEvent) -> Result<Bytes, ControlError> {
    Ok(Bytes::from(bincode::serialize(event)?))
}

pub fn decode(frame: &[u8]) -> Result<ControlEvent, ControlError> {
    Ok(bincode::deserialize(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{MigrationType, NodeAddress};

    #[test]
    fn test_prepare_event_survives_codec() {
        let event = ControlEvent::PrepareMigration {
            kind: MigrationType::Leave,
            nodes: NodeAddress::parse_list("10.0.0.1:11211,10.0.0.2:11211").unwrap(),
        };
        let frame = encode(&event).unwrap();
        assert_eq!(decode(&frame).unwrap(), event);
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let frame = encode(&ControlEvent::RangeApplied { spoint: 1, epoint: 2 }).unwrap();
        let err = decode(&frame[..frame.len() - 1]).unwrap_err();
        assert!(matches!(err, ControlError::Codec(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_bad_address_rejected() {
        // A topology frame whose address string has no port.
        let mut frame = bincode::serialize(&0u32).unwrap();
        frame.extend(bincode::serialize(&vec!["no-port".to_string()]).unwrap());
        frame.extend(bincode::serialize(&Vec::<String>::new()).unwrap());
        assert!(decode(&frame).is_err());
    }
}
