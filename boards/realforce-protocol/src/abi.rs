//! Packet codec for the Realforce configuration protocol.
//!
//! Packet structure (64 bytes):
//! - Bytes 0-1: Direction marker (0xAA 0xAA outbound, 0x55 0x55 inbound)
//! - Byte 2: Command byte
//! - Bytes 3-5: Command arguments (page id at byte 5 for page commands)
//! - Bytes 6-63: Page payload / response data, zero padded

use realforce_core::{KeyboardError, Packet, Result, PACKET_SIZE};

/// Marker at the start of every outbound packet
pub const SEND_PREFIX: [u8; 2] = [0xAA, 0xAA];
/// Marker at the start of every inbound packet
pub const RECV_PREFIX: [u8; 2] = [0x55, 0x55];
/// Offset of the page payload within a packet
pub const PAGE_DATA_OFFSET: usize = 6;
/// Bytes of payload carried by one page
pub const PAGE_SIZE: usize = PACKET_SIZE - PAGE_DATA_OFFSET;
/// Bytes 3-5 of every page read response
pub const READ_ACK: [u8; 3] = [0x00, 0x00, 0x20];

/// The payload of one page
pub type PageData = [u8; PAGE_SIZE];

/// Command identifiers
pub mod cmd {
    /// Session hello/goodbye
    pub const HANDSHAKE: u8 = 0x01;
    /// Model and firmware query
    pub const INFO: u8 = 0x02;
    /// Commit written pages to non-volatile storage
    pub const SAVE: u8 = 0xC0;
    /// Read one page
    pub const READ_PAGE: u8 = 0xC1;
    /// Write one page
    pub const WRITE_PAGE: u8 = 0xC2;
}

/// Build an outbound packet: marker, command, up to 3 argument bytes, payload.
///
/// # Panics
/// If the arguments overflow the header or the payload overflows the packet.
pub fn build_packet(command: u8, args: &[u8], payload: &[u8]) -> Packet {
    assert!(
        args.len() <= PAGE_DATA_OFFSET - 3,
        "command takes at most 3 argument bytes, got {}",
        args.len()
    );
    assert!(
        payload.len() <= PAGE_SIZE,
        "payload holds at most {PAGE_SIZE} bytes, got {}",
        payload.len()
    );

    let mut packet = [0u8; PACKET_SIZE];
    packet[..2].copy_from_slice(&SEND_PREFIX);
    packet[2] = command;
    packet[3..3 + args.len()].copy_from_slice(args);
    packet[PAGE_DATA_OFFSET..PAGE_DATA_OFFSET + payload.len()].copy_from_slice(payload);
    packet
}

/// Query the model and firmware version
pub fn info() -> Packet {
    build_packet(cmd::INFO, &[], &[])
}

/// Open (`goodbye == false`) or close the configuration session.
///
/// Closing makes the keyboard reload its saved settings.
pub fn handshake(goodbye: bool) -> Packet {
    build_packet(cmd::HANDSHAKE, &[0x00, 0x01, goodbye as u8], &[])
}

/// Commit everything written since the last save
pub fn save() -> Packet {
    build_packet(cmd::SAVE, &[0x00, 0x01, 0x01], &[])
}

/// Request a page
pub fn read_page(page: u8) -> Packet {
    build_packet(cmd::READ_PAGE, &[0x00, 0x01, page], &[])
}

/// Replace a page's payload
pub fn write_page(page: u8, payload: &PageData) -> Packet {
    build_packet(cmd::WRITE_PAGE, &[0x00, 0x21, page], payload)
}

/// Check a response against the request it answers.
///
/// The response must be a full packet with the inbound marker, and it must echo
/// the request's command byte.
pub fn validate_response(request: &Packet, response: &[u8]) -> Result<Packet> {
    let packet: Packet = response
        .try_into()
        .map_err(|_| KeyboardError::UnexpectedData(response.to_vec()))?;
    let echo = SEND_PREFIX.len();
    if packet[..2] != RECV_PREFIX || packet[RECV_PREFIX.len()] != request[echo] {
        return Err(KeyboardError::UnexpectedData(response.to_vec()));
    }
    Ok(packet)
}

/// Extract the payload from a page read response
pub fn parse_read_response(response: &Packet) -> Result<PageData> {
    if response[..2] != RECV_PREFIX
        || response[2] != cmd::READ_PAGE
        || response[3..PAGE_DATA_OFFSET] != READ_ACK
    {
        return Err(KeyboardError::UnexpectedData(response.to_vec()));
    }
    Ok(payload(response))
}

/// The payload region of a packet
pub fn payload(packet: &Packet) -> PageData {
    let mut data = [0u8; PAGE_SIZE];
    data.copy_from_slice(&packet[PAGE_DATA_OFFSET..]);
    data
}
