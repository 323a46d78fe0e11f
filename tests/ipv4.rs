extern crate pnet;
extern crate ustack;

mod support;

use pnet::packet::Packet;
use pnet::packet::ethernet::EthernetPacket;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::icmp::IcmpTypes;
use pnet::packet::icmp::destination_unreachable::IcmpCodes;
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv4::Ipv4Packet;

use std::cell::RefCell;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;
use std::sync::mpsc::{Receiver, Sender};

use ustack::NetworkStack;
use ustack::ipv4::{MORE_FRAGMENTS, NO_FLAGS};
use ustack::testing;
use ustack::udp::{UdpListener, UdpTx};
use ustack::util::checksum;

struct Recorder {
    seen: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl UdpListener for Recorder {
    fn recv(&mut self, _tx: &mut UdpTx, data: &[u8], _src: SocketAddrV4) {
        self.seen.borrow_mut().push(data.to_vec());
    }
}

fn recording_stack() -> (NetworkStack, Sender<Vec<u8>>, Receiver<Vec<u8>>,
                         Rc<RefCell<Vec<Vec<u8>>>>) {
    let (mut stack, inject_handle, read_handle) = testing::dummy_stack();
    let seen = Rc::new(RefCell::new(Vec::new()));
    stack.udp_open(6000, Recorder { seen: seen.clone() }).unwrap();
    (stack, inject_handle, read_handle, seen)
}

#[test]
fn drops_corrupted_checksum() {
    let (mut stack, inject_handle, read_handle, seen) = recording_stack();
    let mut frame = support::udp_frame(5000, 6000, b"hi");
    frame[14 + 10] ^= 0xff; // flip the header checksum
    inject_handle.send(frame).unwrap();
    assert!(stack.poll().unwrap());
    assert!(seen.borrow().is_empty());
    assert!(read_handle.try_recv().is_err());
}

#[test]
fn drops_foreign_destination() {
    let (mut stack, inject_handle, read_handle, seen) = recording_stack();
    let frame = support::ipv4_frame_to(Ipv4Addr::new(10, 0, 0, 77),
                                       IpNextHeaderProtocols::Udp,
                                       &[0; 10]);
    inject_handle.send(frame).unwrap();
    assert!(stack.poll().unwrap());
    assert!(seen.borrow().is_empty());
    assert!(read_handle.try_recv().is_err());
}

#[test]
fn strips_ethernet_trailer() {
    let (mut stack, inject_handle, _read_handle, seen) = recording_stack();
    let mut frame = support::udp_frame(5000, 6000, b"hi");
    // Short frames arrive padded to the Ethernet minimum
    while frame.len() < 60 {
        frame.push(0xee);
    }
    inject_handle.send(frame).unwrap();
    assert!(stack.poll().unwrap());
    assert_eq!(*seen.borrow(), vec![b"hi".to_vec()]);
}

#[test]
fn protocol_unreachable() {
    let (mut stack, inject_handle, read_handle) = testing::dummy_stack();
    stack.arp().insert(support::peer_ip(), support::peer_mac());

    let frame = support::ipv4_frame(support::peer_ip(),
                                    IpNextHeaderProtocol::new(222),
                                    &[0; 8]);
    inject_handle.send(frame).unwrap();
    assert!(stack.poll().unwrap());

    let frame = read_handle.try_recv().unwrap();
    let eth_pkg = EthernetPacket::new(&frame).unwrap();
    assert_eq!(eth_pkg.get_destination(), support::peer_mac());
    let ip_pkg = Ipv4Packet::new(eth_pkg.payload()).unwrap();
    assert_eq!(ip_pkg.get_next_level_protocol(), IpNextHeaderProtocols::Icmp);
    assert_eq!(ip_pkg.get_destination(), support::peer_ip());
    let icmp = support::ipv4_payload(eth_pkg.payload());
    let icmp_pkg = IcmpPacket::new(&icmp).unwrap();
    assert_eq!(icmp_pkg.get_icmp_type(), IcmpTypes::DestinationUnreachable);
    assert_eq!(icmp_pkg.get_icmp_code(), IcmpCodes::DestinationProtocolUnreachable);
}

#[test]
fn fragments_large_payload() {
    let (mut stack, _inject_handle, read_handle) = testing::dummy_stack();
    stack.arp().insert(support::peer_ip(), support::peer_mac());

    let payload: Vec<u8> = (0..3200u32).map(|i| i as u8).collect();
    stack.ipv4_send(support::peer_ip(), IpNextHeaderProtocols::Udp, &payload).unwrap();

    let mut reassembled = Vec::new();
    let mut identifications = Vec::new();
    let expected = [(0u16, MORE_FRAGMENTS, 1500u16),
                    (185, MORE_FRAGMENTS, 1500),
                    (370, NO_FLAGS, 260)];
    for &(offset, flags, total_length) in expected.iter() {
        let frame = read_handle.try_recv().unwrap();
        let eth_payload = support::eth_payload(&frame);
        let ip_pkg = Ipv4Packet::new(&eth_payload).unwrap();
        assert_eq!(ip_pkg.get_fragment_offset(), offset);
        assert_eq!(ip_pkg.get_flags(), flags);
        assert_eq!(ip_pkg.get_total_length(), total_length);
        // A header carrying its own checksum sums to zero
        assert_eq!(checksum::checksum16(&eth_payload[..20]), 0);
        identifications.push(ip_pkg.get_identification());
        reassembled.extend(support::ipv4_payload(&eth_payload));
    }
    assert!(read_handle.try_recv().is_err());
    assert_eq!(reassembled, payload);
    assert_eq!(identifications[0], identifications[1]);
    assert_eq!(identifications[1], identifications[2]);

    // The next send uses a fresh identification
    stack.ipv4_send(support::peer_ip(), IpNextHeaderProtocols::Udp, &[0; 4]).unwrap();
    let frame = read_handle.try_recv().unwrap();
    let eth_payload = support::eth_payload(&frame);
    let ip_pkg = Ipv4Packet::new(&eth_payload).unwrap();
    assert!(ip_pkg.get_identification() != identifications[0]);
}
