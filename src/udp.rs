//! Udp port registry and datagram send/receive.

use arp::Arp;
use errors::{RxError, RxResult, TxError, TxResult};
use ethernet::Ethernet;
use ipv4::Ipv4;
use util::checksum;

use pnet::packet::Packet;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::udp::{MutableUdpPacket, UdpPacket};

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Anyone interested in receiving Udp datagrams must implement this. The
/// `UdpTx` handle sends datagrams from inside the callback.
pub trait UdpListener {
    fn recv(&mut self, tx: &mut UdpTx, data: &[u8], src: SocketAddrV4);
}

/// Type binding for how the listeners in `Udp` are structured.
pub type UdpListenerLookup = HashMap<u16, Box<dyn UdpListener>>;

/// The Udp layer: destination ports mapped to their listeners.
pub struct Udp {
    listeners: UdpListenerLookup,
}

impl Udp {
    pub fn new() -> Udp {
        Udp { listeners: HashMap::new() }
    }

    pub fn open(&mut self, port: u16, listener: Box<dyn UdpListener>) -> Result<(), ()> {
        if self.listeners.contains_key(&port) {
            return Err(());
        }
        self.listeners.insert(port, listener);
        Ok(())
    }

    pub fn close(&mut self, port: u16) {
        self.listeners.remove(&port);
    }

    /// Validates one datagram and delivers its payload to the listener on
    /// the destination port. `NoListener` lets the IPv4 layer answer with a
    /// port unreachable.
    pub fn input(&mut self,
                 ipv4: &mut Ipv4,
                 eth: &mut Ethernet,
                 arp: &mut Arp,
                 payload: &[u8],
                 src: Ipv4Addr)
                 -> RxResult {
        if payload.len() < UdpPacket::minimum_packet_size() {
            return Err(RxError::InvalidLength);
        }
        let (src_port, dst_port, length) = {
            let pkg = UdpPacket::new(payload).unwrap();
            (pkg.get_source(), pkg.get_destination(), pkg.get_length() as usize)
        };
        if length < UdpPacket::minimum_packet_size() || length > payload.len() {
            return Err(RxError::InvalidLength);
        }
        let datagram = &payload[..length];
        let has_checksum = datagram[6] != 0 || datagram[7] != 0;
        if has_checksum &&
           checksum::pseudo_header_checksum(src,
                                            ipv4.ip(),
                                            IpNextHeaderProtocols::Udp,
                                            datagram) != 0 {
            return Err(RxError::InvalidChecksum);
        }

        match self.listeners.get_mut(&dst_port) {
            Some(listener) => {
                let data = &datagram[UdpPacket::minimum_packet_size()..];
                let mut tx = UdpTx::new(ipv4, eth, arp);
                listener.recv(&mut tx, data, SocketAddrV4::new(src, src_port));
                Ok(())
            }
            None => Err(RxError::NoListener(format!("Udp, no listener for port {}", dst_port))),
        }
    }
}

/// Udp datagram builder and sender. Borrows the egress path, so it lives
/// only for the duration of one call chain.
pub struct UdpTx<'a> {
    ipv4: &'a mut Ipv4,
    eth: &'a mut Ethernet,
    arp: &'a mut Arp,
}

impl<'a> UdpTx<'a> {
    pub fn new(ipv4: &'a mut Ipv4, eth: &'a mut Ethernet, arp: &'a mut Arp) -> UdpTx<'a> {
        UdpTx {
            ipv4: ipv4,
            eth: eth,
            arp: arp,
        }
    }

    pub fn send(&mut self, src_port: u16, dst: SocketAddrV4, payload: &[u8]) -> TxResult {
        let length = UdpPacket::minimum_packet_size() + payload.len();
        if length > ::std::u16::MAX as usize {
            return Err(TxError::TooLargePayload);
        }
        let mut datagram = vec![0u8; length];
        {
            let mut pkg = MutableUdpPacket::new(&mut datagram).unwrap();
            pkg.set_source(src_port);
            pkg.set_destination(dst.port());
            pkg.set_length(length as u16);
            pkg.set_payload(payload);
            let mut csum = checksum::pseudo_header_checksum(self.ipv4.ip(),
                                                            *dst.ip(),
                                                            IpNextHeaderProtocols::Udp,
                                                            pkg.packet());
            if csum == 0 {
                // A transmitted zero means "no checksum"
                csum = 0xffff;
            }
            pkg.set_checksum(csum);
        }
        self.ipv4.output(self.eth, self.arp, *dst.ip(), IpNextHeaderProtocols::Udp, &datagram)
    }
}
