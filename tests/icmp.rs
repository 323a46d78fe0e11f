extern crate pnet;
extern crate ustack;

mod support;

use pnet::packet::Packet;
use pnet::packet::ethernet::EthernetPacket;
use pnet::packet::icmp::{self, IcmpPacket, IcmpTypes, MutableIcmpPacket};
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;

use ustack::testing;

fn echo_request(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; 8 + payload.len()];
    {
        let mut pkg = MutableEchoRequestPacket::new(&mut buffer).unwrap();
        pkg.set_icmp_type(IcmpTypes::EchoRequest);
        pkg.set_identifier(identifier);
        pkg.set_sequence_number(sequence);
        pkg.set_payload(payload);
    }
    {
        let mut pkg = MutableIcmpPacket::new(&mut buffer).unwrap();
        let csum = icmp::checksum(&pkg.to_immutable());
        pkg.set_checksum(csum);
    }
    support::ipv4_frame(support::peer_ip(), IpNextHeaderProtocols::Icmp, &buffer)
}

#[test]
fn echo_request_is_answered() {
    let (mut stack, inject_handle, read_handle) = testing::dummy_stack();
    stack.arp().insert(support::peer_ip(), support::peer_mac());

    inject_handle.send(echo_request(77, 3, b"abcdefgh")).unwrap();
    assert!(stack.poll().unwrap());

    let frame = read_handle.try_recv().unwrap();
    let eth_pkg = EthernetPacket::new(&frame).unwrap();
    assert_eq!(eth_pkg.get_destination(), support::peer_mac());
    let ip_pkg = Ipv4Packet::new(eth_pkg.payload()).unwrap();
    assert_eq!(ip_pkg.get_destination(), support::peer_ip());
    assert_eq!(ip_pkg.get_next_level_protocol(), IpNextHeaderProtocols::Icmp);

    let message = support::ipv4_payload(eth_pkg.payload());
    let reply = EchoReplyPacket::new(&message).unwrap();
    assert_eq!(reply.get_icmp_type(), IcmpTypes::EchoReply);
    assert_eq!(reply.get_identifier(), 77);
    assert_eq!(reply.get_sequence_number(), 3);
    assert_eq!(reply.payload(), b"abcdefgh");

    let icmp_pkg = IcmpPacket::new(&message).unwrap();
    assert_eq!(icmp_pkg.get_checksum(), icmp::checksum(&icmp_pkg));
    assert!(read_handle.try_recv().is_err());
}

#[test]
fn other_icmp_types_are_ignored() {
    let (mut stack, inject_handle, read_handle) = testing::dummy_stack();
    stack.arp().insert(support::peer_ip(), support::peer_mac());

    let mut buffer = vec![0u8; 8];
    {
        let mut pkg = MutableIcmpPacket::new(&mut buffer).unwrap();
        pkg.set_icmp_type(IcmpTypes::EchoReply);
        let csum = icmp::checksum(&pkg.to_immutable());
        pkg.set_checksum(csum);
    }
    inject_handle.send(support::ipv4_frame(support::peer_ip(),
                                           IpNextHeaderProtocols::Icmp,
                                           &buffer))
        .unwrap();
    assert!(stack.poll().unwrap());
    assert!(read_handle.try_recv().is_err());
}
