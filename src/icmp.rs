//! Stateless ICMP: an echo responder and destination-unreachable emission
//! for the error paths of the layers above.

use arp::Arp;
use errors::{RxError, RxResult, TxResult};
use ethernet::Ethernet;
use ipv4::Ipv4;

use pnet::packet::icmp::{checksum, IcmpCode, IcmpPacket, IcmpTypes, MutableIcmpPacket};
use pnet::packet::icmp::destination_unreachable::DestinationUnreachablePacket;
use pnet::packet::icmp::echo_request::EchoRequestPacket;
use pnet::packet::ip::IpNextHeaderProtocols;

use std::cmp;
use std::net::Ipv4Addr;

/// Handles one incoming ICMP message. Only echo requests are answered,
/// everything else is silently accepted.
pub fn input(ipv4: &mut Ipv4,
             eth: &mut Ethernet,
             arp: &mut Arp,
             payload: &[u8],
             src: Ipv4Addr)
             -> RxResult {
    if payload.len() < EchoRequestPacket::minimum_packet_size() {
        return Err(RxError::InvalidLength);
    }
    let icmp_type = IcmpPacket::new(payload).unwrap().get_icmp_type();
    if icmp_type == IcmpTypes::EchoRequest {
        trace!("Icmp echo request from {}, {} bytes", src, payload.len());
        echo_reply(ipv4, eth, arp, src, payload)
    } else {
        Ok(())
    }
}

/// Mirrors an echo request back to its sender. Identifier, sequence number
/// and payload are taken over unchanged.
fn echo_reply(ipv4: &mut Ipv4,
              eth: &mut Ethernet,
              arp: &mut Arp,
              dst: Ipv4Addr,
              request: &[u8])
              -> RxResult {
    let mut reply = request.to_vec();
    {
        let mut pkg = MutableIcmpPacket::new(&mut reply).unwrap();
        pkg.set_icmp_type(IcmpTypes::EchoReply);
        pkg.set_icmp_code(IcmpCode::new(0));
        pkg.set_checksum(0);
        let csum = checksum(&pkg.to_immutable());
        pkg.set_checksum(csum);
    }
    ipv4.output(eth, arp, dst, IpNextHeaderProtocols::Icmp, &reply)
        .map_err(|e| RxError::Other(format!("Unable to send echo reply: {}", e)))
}

/// Sends a destination-unreachable with the given code, quoting the start
/// of the offending packet as picked up by the IPv4 receive path.
pub fn unreachable(ipv4: &mut Ipv4,
                   eth: &mut Ethernet,
                   arp: &mut Arp,
                   dst: Ipv4Addr,
                   code: IcmpCode,
                   original: &[u8])
                   -> TxResult {
    let header_len = DestinationUnreachablePacket::minimum_packet_size();
    let quote_len = cmp::min(original.len(), 28);
    let mut message = vec![0u8; header_len + quote_len];
    message[header_len..].copy_from_slice(&original[..quote_len]);
    {
        let mut pkg = MutableIcmpPacket::new(&mut message).unwrap();
        pkg.set_icmp_type(IcmpTypes::DestinationUnreachable);
        pkg.set_icmp_code(code);
        let csum = checksum(&pkg.to_immutable());
        pkg.set_checksum(csum);
    }
    ipv4.output(eth, arp, dst, IpNextHeaderProtocols::Icmp, &message)
}
