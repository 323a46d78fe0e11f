//! Shared helpers for building and dissecting the wire-format frames the
//! integration tests exchange with the stack.

#![allow(dead_code)]

use pnet::packet::Packet;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperation, MutableArpPacket};
use pnet::packet::ethernet::{EtherType, EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv4::{checksum, Ipv4Packet, MutableIpv4Packet};
use pnet::packet::tcp::{self, MutableTcpPacket};
use pnet::packet::udp::{self, MutableUdpPacket};
use pnet::util::MacAddr;

use std::net::Ipv4Addr;

use ustack::testing;

pub fn local_mac() -> MacAddr {
    testing::dummy_mac()
}

pub fn local_ip() -> Ipv4Addr {
    testing::dummy_ipv4()
}

pub fn peer_mac() -> MacAddr {
    MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff)
}

pub fn peer_ip() -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, 2)
}

/// Builds a frame from the peer to the stack with the given payload.
pub fn ethernet_frame(ethertype: EtherType, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; EthernetPacket::minimum_packet_size() + payload.len()];
    {
        let mut pkg = MutableEthernetPacket::new(&mut buffer).unwrap();
        pkg.set_destination(local_mac());
        pkg.set_source(peer_mac());
        pkg.set_ethertype(ethertype);
        pkg.set_payload(payload);
    }
    buffer
}

pub fn arp_frame(operation: ArpOperation,
                 sender_mac: MacAddr,
                 sender_ip: Ipv4Addr,
                 target_mac: MacAddr,
                 target_ip: Ipv4Addr)
                 -> Vec<u8> {
    let mut buffer = vec![0u8; 28];
    {
        let mut pkg = MutableArpPacket::new(&mut buffer).unwrap();
        pkg.set_hardware_type(ArpHardwareTypes::Ethernet);
        pkg.set_protocol_type(EtherTypes::Ipv4);
        pkg.set_hw_addr_len(6);
        pkg.set_proto_addr_len(4);
        pkg.set_operation(operation);
        pkg.set_sender_hw_addr(sender_mac);
        pkg.set_sender_proto_addr(sender_ip);
        pkg.set_target_hw_addr(target_mac);
        pkg.set_target_proto_addr(target_ip);
    }
    ethernet_frame(EtherTypes::Arp, &buffer)
}

/// An IPv4 packet from the peer to the stack, wrapped in an Ethernet
/// frame, with a correct header checksum.
pub fn ipv4_frame(src: Ipv4Addr,
                  protocol: IpNextHeaderProtocol,
                  payload: &[u8])
                  -> Vec<u8> {
    let total = Ipv4Packet::minimum_packet_size() + payload.len();
    let mut buffer = vec![0u8; total];
    {
        let mut pkg = MutableIpv4Packet::new(&mut buffer).unwrap();
        pkg.set_version(4);
        pkg.set_header_length(5);
        pkg.set_total_length(total as u16);
        pkg.set_ttl(64);
        pkg.set_next_level_protocol(protocol);
        pkg.set_source(src);
        pkg.set_destination(local_ip());
        pkg.set_payload(payload);
        let csum = checksum(&pkg.to_immutable());
        pkg.set_checksum(csum);
    }
    ethernet_frame(EtherTypes::Ipv4, &buffer)
}

/// An IPv4 packet addressed to someone other than the stack.
pub fn ipv4_frame_to(dst: Ipv4Addr,
                     protocol: IpNextHeaderProtocol,
                     payload: &[u8])
                     -> Vec<u8> {
    let total = Ipv4Packet::minimum_packet_size() + payload.len();
    let mut buffer = vec![0u8; total];
    {
        let mut pkg = MutableIpv4Packet::new(&mut buffer).unwrap();
        pkg.set_version(4);
        pkg.set_header_length(5);
        pkg.set_total_length(total as u16);
        pkg.set_ttl(64);
        pkg.set_next_level_protocol(protocol);
        pkg.set_source(peer_ip());
        pkg.set_destination(dst);
        pkg.set_payload(payload);
        let csum = checksum(&pkg.to_immutable());
        pkg.set_checksum(csum);
    }
    ethernet_frame(EtherTypes::Ipv4, &buffer)
}

pub fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let length = 8 + payload.len();
    let mut buffer = vec![0u8; length];
    {
        let mut pkg = MutableUdpPacket::new(&mut buffer).unwrap();
        pkg.set_source(src_port);
        pkg.set_destination(dst_port);
        pkg.set_length(length as u16);
        pkg.set_payload(payload);
        let csum = udp::ipv4_checksum(&pkg.to_immutable(), &peer_ip(), &local_ip());
        pkg.set_checksum(csum);
    }
    ipv4_frame(peer_ip(), IpNextHeaderProtocols::Udp, &buffer)
}

pub fn tcp_frame(src_port: u16,
                 dst_port: u16,
                 seq: u32,
                 ack: u32,
                 flags: u8,
                 window: u16,
                 payload: &[u8])
                 -> Vec<u8> {
    let mut buffer = vec![0u8; 20 + payload.len()];
    {
        let mut pkg = MutableTcpPacket::new(&mut buffer).unwrap();
        pkg.set_source(src_port);
        pkg.set_destination(dst_port);
        pkg.set_sequence(seq);
        pkg.set_acknowledgement(ack);
        pkg.set_data_offset(5);
        pkg.set_flags(flags);
        pkg.set_window(window);
        pkg.set_payload(payload);
        let csum = tcp::ipv4_checksum(&pkg.to_immutable(), &peer_ip(), &local_ip());
        pkg.set_checksum(csum);
    }
    ipv4_frame(peer_ip(), IpNextHeaderProtocols::Tcp, &buffer)
}

/// The payload of an Ethernet frame.
pub fn eth_payload(frame: &[u8]) -> Vec<u8> {
    EthernetPacket::new(frame).unwrap().payload().to_vec()
}

/// The payload of an IPv4 packet, honouring header length and total
/// length so Ethernet trailer padding does not leak through.
pub fn ipv4_payload(packet: &[u8]) -> Vec<u8> {
    let pkg = Ipv4Packet::new(packet).unwrap();
    let header = pkg.get_header_length() as usize * 4;
    let total = pkg.get_total_length() as usize;
    packet[header..total].to_vec()
}
