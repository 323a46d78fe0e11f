//! Address resolution. Keeps the IP to MAC table and at most one egress
//! frame per unresolved destination, to be flushed when the reply arrives.

use errors::{RxError, RxResult, TxResult};
use ethernet::Ethernet;
use util::{CacheMap, FrameBuf};

use pnet::packet::arp::{ArpHardwareTypes, ArpOperation, ArpOperations, ArpPacket,
                        MutableArpPacket};
use pnet::packet::ethernet::EtherTypes;
use pnet::util::MacAddr;

use std::net::Ipv4Addr;
use std::time::Duration;

/// How long a learned address mapping stays valid.
pub const ARP_TIMEOUT: Duration = Duration::from_secs(60);

/// Minimum time between two requests for the same address. While an entry
/// sits in the pending queue no new request for its address is sent.
pub const ARP_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// The Arp resolver of one interface. Every valid incoming Arp packet
/// updates the table, so mappings are also learned gratuitously.
pub struct Arp {
    ip: Ipv4Addr,
    table: CacheMap<Ipv4Addr, MacAddr>,
    pending: CacheMap<Ipv4Addr, FrameBuf>,
}

impl Arp {
    pub fn new(ip: Ipv4Addr) -> Arp {
        Arp {
            ip: ip,
            table: CacheMap::with_timeout(ARP_TIMEOUT),
            pending: CacheMap::with_timeout(ARP_MIN_INTERVAL),
        }
    }

    /// Manually insert an IP -> MAC mapping into the table.
    pub fn insert(&mut self, ip: Ipv4Addr, mac: MacAddr) {
        self.table.insert(ip, mac);
    }

    pub fn lookup(&mut self, ip: Ipv4Addr) -> Option<MacAddr> {
        self.table.get(&ip).cloned()
    }

    /// Takes the IPv4 packet sitting in the Ethernet scratch buffer and
    /// either transmits it directly or, when `next_hop` is unresolved,
    /// queues a copy and broadcasts a request. With a request already in
    /// flight the packet is dropped; the peer retries above us.
    pub fn output(&mut self, eth: &mut Ethernet, next_hop: Ipv4Addr) -> TxResult {
        if let Some(mac) = self.table.get(&next_hop).cloned() {
            return eth.output(mac, EtherTypes::Ipv4);
        }
        if self.pending.get(&next_hop).is_some() {
            trace!("Arp request for {} already in flight, dropping frame", next_hop);
            return Ok(());
        }
        self.pending.insert(next_hop, eth.txbuf().clone());
        self.request(eth, next_hop)
    }

    /// Broadcasts a request for `target_ip`. Requesting the local address
    /// announces this interface to the segment.
    pub fn request(&mut self, eth: &mut Ethernet, target_ip: Ipv4Addr) -> TxResult {
        let sender_mac = eth.mac();
        let sender_ip = self.ip;
        build_arp(eth,
                  ArpOperations::Request,
                  sender_mac,
                  sender_ip,
                  MacAddr::new(0, 0, 0, 0, 0, 0),
                  target_ip);
        eth.output(MacAddr::new(0xff, 0xff, 0xff, 0xff, 0xff, 0xff),
                   EtherTypes::Arp)
    }

    fn reply(&self, eth: &mut Ethernet, target_mac: MacAddr, target_ip: Ipv4Addr) -> TxResult {
        let sender_mac = eth.mac();
        let sender_ip = self.ip;
        build_arp(eth,
                  ArpOperations::Reply,
                  sender_mac,
                  sender_ip,
                  target_mac,
                  target_ip);
        eth.output(target_mac, EtherTypes::Arp)
    }

    /// Handles one incoming Arp packet: learn the sender mapping, flush a
    /// queued frame waiting for it, and answer requests for our address.
    pub fn input(&mut self, eth: &mut Ethernet, payload: &[u8]) -> RxResult {
        if payload.len() < ArpPacket::minimum_packet_size() {
            return Err(RxError::InvalidLength);
        }
        let (operation, sender_mac, sender_ip, target_ip) = {
            let pkg = ArpPacket::new(payload).unwrap();
            if pkg.get_hardware_type() != ArpHardwareTypes::Ethernet ||
               pkg.get_protocol_type() != EtherTypes::Ipv4 ||
               pkg.get_hw_addr_len() != 6 ||
               pkg.get_proto_addr_len() != 4 {
                return Err(RxError::InvalidContent);
            }
            let operation = pkg.get_operation();
            if operation != ArpOperations::Request && operation != ArpOperations::Reply {
                return Err(RxError::InvalidContent);
            }
            (operation,
             pkg.get_sender_hw_addr(),
             pkg.get_sender_proto_addr(),
             pkg.get_target_proto_addr())
        };

        debug!("Arp MAC: {} -> IPv4: {}", sender_mac, sender_ip);
        self.table.insert(sender_ip, sender_mac);

        if let Some(mut frame) = self.pending.remove(&sender_ip) {
            if let Err(e) = eth.output_frame(&mut frame, sender_mac, EtherTypes::Ipv4) {
                warn!("Unable to flush pending frame to {}: {}", sender_ip, e);
            }
        } else if operation == ArpOperations::Request && target_ip == self.ip {
            if let Err(e) = self.reply(eth, sender_mac, sender_ip) {
                warn!("Unable to send Arp reply to {}: {}", sender_ip, e);
            }
        }
        Ok(())
    }
}

fn build_arp(eth: &mut Ethernet,
             operation: ArpOperation,
             sender_mac: MacAddr,
             sender_ip: Ipv4Addr,
             target_mac: MacAddr,
             target_ip: Ipv4Addr) {
    let txbuf = eth.txbuf_mut();
    txbuf.init(ArpPacket::minimum_packet_size());
    let mut pkg = MutableArpPacket::new(txbuf.as_mut_slice()).unwrap();
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
