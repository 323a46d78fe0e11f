//! Ones-complement checksums for the transport layer. The pseudo-header is
//! streamed into the sum instead of being written over the IP header, so no
//! headroom in front of a segment is ever required.

use pnet::packet::ip::IpNextHeaderProtocol;

use std::net::Ipv4Addr;

/// 16-bit ones-complement sum with end-around carry over big-endian words.
/// An odd trailing byte is treated as the high byte of a final word.
///
/// Computed over data that embeds its own correct checksum the result is 0,
/// which is how the receive paths verify.
pub fn checksum16(data: &[u8]) -> u16 {
    !fold(sum_bytes(0, data))
}

/// Checksum of a TCP or UDP segment prefixed by the IPv4 pseudo-header
/// (source, destination, zero, protocol, segment length).
pub fn pseudo_header_checksum(src: Ipv4Addr,
                              dst: Ipv4Addr,
                              protocol: IpNextHeaderProtocol,
                              segment: &[u8])
                              -> u16 {
    let mut sum = 0u32;
    sum = sum_bytes(sum, &src.octets());
    sum = sum_bytes(sum, &dst.octets());
    sum += protocol.0 as u32;
    sum += segment.len() as u32;
    sum = sum_bytes(sum, segment);
    !fold(sum)
}

fn sum_bytes(mut sum: u32, data: &[u8]) -> u32 {
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += (word[0] as u32) << 8 | word[1] as u32;
    }
    if let Some(&last) = words.remainder().first() {
        sum += (last as u32) << 8;
    }
    sum
}

fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    sum as u16
}
