//! MessagePack encode/decode for [`Packet`](crate::packet::Packet).

use crate::error::CodecError;
use crate::packet::Packet;

/// Serialize a packet to a MessagePack-encoded byte buffer.
///
/// This is the payload handed to the encrypted transport for
/// encryption; it carries no length prefix of its own (the frame layer
/// below supplies that).
pub fn encode(packet: &Packet) -> Result<Vec<u8>, CodecError> {
    let bytes = rmp_serde::to_vec_named(packet)?;
    Ok(bytes)
}

/// Deserialize a MessagePack-encoded buffer into a packet.
///
/// A malformed map, an unrecognized `"type"` tag, or a type whose
/// sibling fields don't match the expected schema all surface here as
/// [`CodecError::Decode`].
pub fn decode(bytes: &[u8]) -> Result<Packet, CodecError> {
    let packet = rmp_serde::from_slice(bytes)?;
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::WireMessage;

    fn sample_packets() -> Vec<Packet> {
        vec![
            Packet::Register { password: b"hunter2".to_vec() },
            Packet::RegisterSuccess { id: 12345 },
            Packet::Login { id: 12345, password: b"hunter2".to_vec() },
            Packet::LoginSuccess {},
            Packet::LoginFail {},
            Packet::GetChannelPeers { request_id: 1 },
            Packet::GetChannelPeersSuccess { request_id: 1, peers: vec![2, 3] },
            Packet::GetMessagesCount { request_id: 2, peer_id: 9 },
            Packet::GetMessagesCountSuccess { request_id: 2, count: 7 },
            Packet::GetMessagesCountFailNoSuchClient { request_id: 2 },
            Packet::SendMessage { request_id: 3, receiver_id: 9, content: b"hi".to_vec() },
            Packet::SendMessageSuccess { request_id: 3 },
            Packet::SendMessageFailNoSuchClient { request_id: 3 },
            Packet::GetMessages { request_id: 4, peer_id: 9, first: 0, count: 2 },
            Packet::GetMessagesSuccess {
                request_id: 4,
                messages: vec![
                    WireMessage { sender: 9, content: b"a".to_vec() },
                    WireMessage { sender: 1, content: b"b".to_vec() },
                ],
            },
            Packet::GetMessagesFailInvalidRange { request_id: 4 },
            Packet::SetEncryptionKeysMessage { request_id: 5, peer_id: 9, message_id: 0 },
            Packet::SetEncryptionKeysMessageSuccess { request_id: 5 },
            Packet::SetEncryptionKeysMessageFailNoSuchClient { request_id: 5 },
            Packet::SetEncryptionKeysMessageFailInvalidId { request_id: 5 },
            Packet::GetEncryptionKeysMessage { request_id: 6, keys_owner_id: 1, peer_id: 9 },
            Packet::GetEncryptionKeysMessageSuccess { request_id: 6, message_id: Some(0) },
            Packet::GetEncryptionKeysMessageSuccess { request_id: 6, message_id: None },
            Packet::GetEncryptionKeysMessageFailNoSuchClient { request_id: 6 },
            Packet::NewMessage { message: WireMessage { sender: 1, content: b"push".to_vec() } },
        ]
    }

    #[test]
    fn every_packet_variant_round_trips() {
        for packet in sample_packets() {
            let bytes = encode(&packet).unwrap();
            let decoded = decode(&bytes).unwrap();
            assert_eq!(packet, decoded);
        }
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = decode(&[0xc1, 0xc1, 0xc1]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn unknown_type_tag_is_a_decode_error() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("type".to_string(), "TotallyNotAPacket".to_string());
        let bytes = rmp_serde::to_vec_named(&map).unwrap();
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
