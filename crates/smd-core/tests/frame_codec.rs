mod common;

use pretty_assertions::assert_eq;
use smd_core::protocol::packet::{checksum, encode, Frame, PacketBuilder};
use smd_core::protocol::{AckLength, Command, CommandBuilder, ProtocolError, ENVELOPE_SIZE};
use smd_core::register::{Index, RegisterTable, RegisterValue};

use common::master_with;

fn write_frame() -> Vec<u8> {
    let mut table = RegisterTable::new(12);
    CommandBuilder::write(
        &mut table,
        &[
            (Index::SetPosition, RegisterValue::F32(-90.5)),
            (Index::TorqueLimit, RegisterValue::U16(1200)),
            (Index::MinimumPositionLimit, RegisterValue::I32(-4000)),
        ],
        true,
    )
    .unwrap()
    .bytes
}

#[test]
fn test_encoded_frame_decodes_back() {
    let bytes = write_frame();
    let frame = Frame::decode_and_validate(&bytes, bytes.len()).unwrap();

    assert_eq!(frame.header.marker, 0x55);
    assert_eq!(frame.header.device_id, 12);
    assert_eq!(frame.header.product_type, 0xBA);
    assert_eq!(frame.header.size as usize, bytes.len());
    assert_eq!(frame.command(), Some(Command::WriteAck));
    assert_eq!(
        frame.register_pairs().unwrap(),
        vec![
            (Index::SetPosition, RegisterValue::F32(-90.5)),
            (Index::TorqueLimit, RegisterValue::U16(1200)),
            (Index::MinimumPositionLimit, RegisterValue::I32(-4000)),
        ]
    );
    assert_eq!(frame.to_bytes(), bytes);
}

#[test]
fn test_crc_covers_all_preceding_bytes() {
    let bytes = write_frame();
    let body = bytes.len() - 4;
    let trailer = u32::from_le_bytes([bytes[body], bytes[body + 1], bytes[body + 2], bytes[body + 3]]);
    assert_eq!(trailer, checksum(&bytes[..body]));
}

#[test]
fn test_every_single_bit_flip_is_rejected() {
    let bytes = write_frame();

    for bit in 0..bytes.len() * 8 {
        let mut corrupted = bytes.clone();
        corrupted[bit / 8] ^= 1 << (bit % 8);

        let result = Frame::decode_and_validate(&corrupted, bytes.len());
        assert!(
            matches!(
                result,
                Err(ProtocolError::ChecksumMismatch { .. }) | Err(ProtocolError::LengthMismatch { .. })
            ),
            "bit {} was accepted",
            bit
        );
    }
}

#[test]
fn test_empty_payload_frame() {
    let bytes = encode(&RegisterTable::new(0), Command::Ping, &[]).unwrap();
    assert_eq!(bytes.len(), ENVELOPE_SIZE);

    let frame = Frame::decode(&bytes).unwrap();
    assert!(!frame.has_data());
    assert!(frame.payload.is_empty());
}

#[test]
fn test_oversized_frame_is_refused() {
    let table = RegisterTable::new(1);
    let result = PacketBuilder::new(&table, Command::Write).bytes(&[0; 246]).build();
    assert!(matches!(result, Err(ProtocolError::FrameTooLarge(256))));

    let fits = PacketBuilder::new(&table, Command::Write).bytes(&[0; 245]).build().unwrap();
    assert_eq!(fits.len(), 255);
}

#[test]
fn test_version_read_request_and_ack() {
    let table = RegisterTable::new(3);
    let request = CommandBuilder::read(&table, &[Index::HardwareVersion, Index::SoftwareVersion]).unwrap();
    assert_eq!(request.bytes.len(), ENVELOPE_SIZE + 2);
    assert_eq!(&request.bytes[6..8], &[6, 7]);
    assert_eq!(request.ack, AckLength::Exact(20));

    let mut ack = vec![0x55, 3, 0xBA, 20, Command::Read.opcode(), 0x00];
    ack.extend_from_slice(&[6, 0x03, 0x02, 0x01, 0x00]);
    ack.extend_from_slice(&[7, 0x05, 0x04, 0x00, 0x00]);
    let crc = checksum(&ack);
    ack.extend_from_slice(&crc.to_le_bytes());
    assert_eq!(ack.len(), 20);

    let mut master = master_with(&[3]);
    master.transport_mut().reply_with(ack);

    let values = master
        .get_variables(3, &[Index::HardwareVersion, Index::SoftwareVersion])
        .unwrap();
    assert_eq!(values, vec![RegisterValue::U32(0x0001_0203), RegisterValue::U32(0x0000_0405)]);
    assert_eq!(master.registry().lookup(3).unwrap().get(Index::HardwareVersion), RegisterValue::U32(0x0001_0203));
}
