//! IPv4 receive validation and demultiplexing, and fragmenting send.

use arp::Arp;
use errors::{RxError, RxResult, TxError, TxResult};
use ethernet::Ethernet;
use icmp;
use tcp::Tcp;
use udp::Udp;
use util::FrameBuf;

use ipnetwork::Ipv4Network;

use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv4::{checksum, Ipv4Packet, MutableIpv4Packet};
use pnet::packet::icmp::destination_unreachable::IcmpCodes;

use std::cmp;
use std::net::Ipv4Addr;

pub const MORE_FRAGMENTS: u8 = 0b001;
pub const NO_FLAGS: u8 = 0b000;

/// The IPv4 layer of one interface. Owns the address configuration, the
/// optional gateway and the identification counter shared by all fragments
/// of one send.
pub struct Ipv4 {
    net: Ipv4Network,
    gateway: Option<Ipv4Addr>,
    mtu: usize,
    next_identification: u16,
}

impl Ipv4 {
    pub fn new(net: Ipv4Network, gateway: Option<Ipv4Addr>, mtu: usize) -> Ipv4 {
        assert!(mtu >= Ipv4Packet::minimum_packet_size() * 2);
        Ipv4 {
            net: net,
            gateway: gateway,
            mtu: mtu,
            next_identification: 0,
        }
    }

    /// The address of the local interface.
    pub fn ip(&self) -> Ipv4Addr {
        self.net.ip()
    }

    /// Validates one incoming IPv4 packet and hands its payload to the
    /// protocol above. Unknown protocols draw an ICMP protocol-unreachable,
    /// UDP without a listener a port-unreachable.
    pub fn input(&mut self,
                 eth: &mut Ethernet,
                 arp: &mut Arp,
                 udp: &mut Udp,
                 tcp: &mut Tcp,
                 rxbuf: &mut FrameBuf)
                 -> RxResult {
        if rxbuf.len() < Ipv4Packet::minimum_packet_size() {
            return Err(RxError::InvalidLength);
        }
        let (header_len, total_length, src, protocol) = {
            let pkg = Ipv4Packet::new(rxbuf.as_slice()).unwrap();
            if pkg.get_version() != 4 {
                return Err(RxError::InvalidContent);
            }
            let header_len = pkg.get_header_length() as usize * 4;
            let total_length = pkg.get_total_length() as usize;
            if header_len < Ipv4Packet::minimum_packet_size() ||
               total_length < header_len ||
               total_length > rxbuf.len() {
                return Err(RxError::InvalidLength);
            }
            if pkg.get_checksum() != checksum(&pkg) {
                return Err(RxError::InvalidChecksum);
            }
            if pkg.get_destination() != self.net.ip() {
                trace!("Ipv4 packet for {} is not ours, ignoring",
                       pkg.get_destination());
                return Ok(());
            }
            (header_len, total_length, pkg.get_source(), pkg.get_next_level_protocol())
        };

        // Kept around in case the demux below has to quote the packet in an
        // ICMP error after the header has been stripped.
        let quote_len = cmp::min(rxbuf.len(), header_len + 8);
        let snapshot = rxbuf.as_slice()[..quote_len].to_vec();

        if rxbuf.len() > total_length {
            // Ethernet trailer padding
            let excess = rxbuf.len() - total_length;
            rxbuf.remove_padding(excess).map_err(|_| RxError::InvalidLength)?;
        }
        rxbuf.remove_header(header_len).map_err(|_| RxError::InvalidLength)?;

        if protocol == IpNextHeaderProtocols::Icmp {
            icmp::input(self, eth, arp, rxbuf.as_slice(), src)
        } else if protocol == IpNextHeaderProtocols::Udp {
            match udp.input(self, eth, arp, rxbuf.as_slice(), src) {
                Err(RxError::NoListener(msg)) => {
                    if let Err(e) = icmp::unreachable(self,
                                                      eth,
                                                      arp,
                                                      src,
                                                      IcmpCodes::DestinationPortUnreachable,
                                                      &snapshot) {
                        warn!("Unable to send port unreachable to {}: {}", src, e);
                    }
                    Err(RxError::NoListener(msg))
                }
                result => result,
            }
        } else if protocol == IpNextHeaderProtocols::Tcp {
            tcp.input(self, eth, arp, rxbuf.as_slice(), src)
        } else {
            if let Err(e) = icmp::unreachable(self,
                                              eth,
                                              arp,
                                              src,
                                              IcmpCodes::DestinationProtocolUnreachable,
                                              &snapshot) {
                warn!("Unable to send protocol unreachable to {}: {}", src, e);
            }
            Err(RxError::NoListener(format!("Ipv4 {:?}", protocol)))
        }
    }

    /// Sends `payload` as one IPv4 packet, fragmenting when it exceeds what
    /// a single frame carries. All fragments of the send share one
    /// identification value.
    pub fn output(&mut self,
                  eth: &mut Ethernet,
                  arp: &mut Arp,
                  dst: Ipv4Addr,
                  protocol: IpNextHeaderProtocol,
                  payload: &[u8])
                  -> TxResult {
        if payload.len() > ::std::u16::MAX as usize - Ipv4Packet::minimum_packet_size() {
            return Err(TxError::TooLargePayload);
        }
        let next_hop = self.next_hop(dst)?;
        let identification = self.next_identification;
        self.next_identification = self.next_identification.wrapping_add(1);

        let max_payload = self.max_payload_per_fragment();
        let mut offset = 0;
        while payload.len() - offset > max_payload {
            self.fragment_out(eth,
                              arp,
                              next_hop,
                              dst,
                              protocol,
                              identification,
                              offset,
                              true,
                              &payload[offset..offset + max_payload])?;
            offset += max_payload;
        }
        self.fragment_out(eth,
                          arp,
                          next_hop,
                          dst,
                          protocol,
                          identification,
                          offset,
                          false,
                          &payload[offset..])
    }

    pub fn max_payload_per_fragment(&self) -> usize {
        (self.mtu - Ipv4Packet::minimum_packet_size()) & !0b111
    }

    /// Next hop is the destination itself inside the local network and the
    /// gateway everywhere else.
    fn next_hop(&self, dst: Ipv4Addr) -> Result<Ipv4Addr, TxError> {
        if self.net.contains(dst) {
            Ok(dst)
        } else {
            self.gateway.ok_or(TxError::NoRoute)
        }
    }

    fn fragment_out(&self,
                    eth: &mut Ethernet,
                    arp: &mut Arp,
                    next_hop: Ipv4Addr,
                    dst: Ipv4Addr,
                    protocol: IpNextHeaderProtocol,
                    identification: u16,
                    offset: usize,
                    more_fragments: bool,
                    fragment: &[u8])
                    -> TxResult {
        {
            let txbuf = eth.txbuf_mut();
            txbuf.init(fragment.len());
            txbuf.as_mut_slice().copy_from_slice(fragment);
            txbuf.add_header(Ipv4Packet::minimum_packet_size())
                .map_err(|_| TxError::Other("No headroom for Ipv4 header".to_owned()))?;

            let mut pkg = MutableIpv4Packet::new(txbuf.as_mut_slice()).unwrap();
            pkg.set_version(4);
            pkg.set_header_length(5); // 5 is for no option fields
            pkg.set_dscp(0);
            pkg.set_ecn(0);
            pkg.set_total_length((fragment.len() + Ipv4Packet::minimum_packet_size()) as u16);
            pkg.set_identification(identification);
            pkg.set_flags(if more_fragments { MORE_FRAGMENTS } else { NO_FLAGS });
            pkg.set_fragment_offset((offset / 8) as u16);
            pkg.set_ttl(64);
            pkg.set_next_level_protocol(protocol);
            pkg.set_source(self.net.ip());
            pkg.set_destination(dst);
            let csum = checksum(&pkg.to_immutable());
            pkg.set_checksum(csum);
        }
        arp.output(eth, next_hop)
    }
}
