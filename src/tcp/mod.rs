//! The Tcp engine: a listener registry keyed by local port, a connection
//! table keyed by `(remote ip, remote port, local port)` and the state
//! machine run for every incoming segment. All connections are passively
//! opened by an incoming SYN; active connect is not implemented.

mod connect;

pub use self::connect::{TcpConnect, TcpKey, TcpSocket, TcpState, DEFAULT_MSS};

use arp::Arp;
use errors::{RxError, RxResult};
use ethernet::Ethernet;
use ipv4::Ipv4;
use util::checksum;

use pnet::packet::Packet;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::tcp::{TcpFlags, TcpOptionNumbers, TcpPacket};

use rand::{self, Rng};

use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Event delivered to a `TcpListener` together with the socket it
/// concerns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TcpEvent {
    /// The three-way handshake just completed.
    Connected,
    /// New bytes arrived in the receive buffer.
    DataRecv,
    /// The close handshake completed; the connection is gone after this
    /// callback returns.
    Closed,
}

/// Anyone interested in serving a Tcp port must implement this. Callbacks
/// run synchronously from the poll loop; bytes written during a `DataRecv`
/// callback ride along with the acknowledgement for the triggering
/// segment.
pub trait TcpListener {
    fn on_event(&mut self, socket: &mut TcpSocket, event: TcpEvent);
}

/// Type binding for how the listeners in `Tcp` are structured.
pub type TcpListenerLookup = HashMap<u16, Box<dyn TcpListener>>;

pub struct Tcp {
    listeners: TcpListenerLookup,
    connections: HashMap<TcpKey, TcpConnect>,
}

impl Tcp {
    pub fn new() -> Tcp {
        Tcp {
            listeners: HashMap::new(),
            connections: HashMap::new(),
        }
    }

    /// Registers a listener for a local port. Segments to ports without a
    /// listener are ignored entirely.
    pub fn open(&mut self, port: u16, listener: Box<dyn TcpListener>) -> Result<(), ()> {
        if self.listeners.contains_key(&port) {
            return Err(());
        }
        self.listeners.insert(port, listener);
        Ok(())
    }

    /// Deregisters the listener on `port` and drops every connection keyed
    /// to it, without going through the close handshake.
    pub fn close(&mut self, port: u16) {
        self.connections.retain(|key, _| key.local_port != port);
        self.listeners.remove(&port);
    }

    /// Hook for clock-driven maintenance. Nothing is scheduled yet;
    /// retransmission of unacknowledged segments belongs here once the
    /// engine grows a timer. Until then a stalled transfer is only retried
    /// through the peer's own retransmissions and further write calls.
    pub fn tick(&mut self) {}

    /// Runs one received segment through checksum verification, connection
    /// lookup and the state machine.
    pub fn input(&mut self,
                 ipv4: &mut Ipv4,
                 eth: &mut Ethernet,
                 arp: &mut Arp,
                 segment: &[u8],
                 src_ip: Ipv4Addr)
                 -> RxResult {
        if segment.len() < TcpPacket::minimum_packet_size() {
            return Err(RxError::InvalidLength);
        }
        if checksum::pseudo_header_checksum(src_ip,
                                            ipv4.ip(),
                                            IpNextHeaderProtocols::Tcp,
                                            segment) != 0 {
            return Err(RxError::InvalidChecksum);
        }
        let pkg = TcpPacket::new(segment).unwrap();
        let data_offset = pkg.get_data_offset() as usize * 4;
        if data_offset < TcpPacket::minimum_packet_size() || data_offset > segment.len() {
            return Err(RxError::InvalidLength);
        }
        let src_port = pkg.get_source();
        let dst_port = pkg.get_destination();
        let seq = pkg.get_sequence();
        let ack_no = pkg.get_acknowledgement();
        let flags = pkg.get_flags();
        let window = pkg.get_window();
        let data = pkg.payload();

        if !self.listeners.contains_key(&dst_port) {
            return Err(RxError::NoListener(format!("Tcp, no listener for port {}", dst_port)));
        }
        let key = TcpKey {
            remote_ip: src_ip,
            remote_port: src_port,
            local_port: dst_port,
        };

        // No connection for the key means the port is in its listen state.
        if !self.connections.contains_key(&key) {
            if flags & TcpFlags::RST != 0 {
                return Ok(());
            }
            if flags & TcpFlags::SYN == 0 {
                // The first segment of a connection must be a SYN
                debug!("Tcp non-SYN segment for listening port {}, resetting", dst_port);
                let mut stub = TcpConnect::reset_stub(key, seq, window);
                if let Err(e) = stub.send_segment(ipv4,
                                                  eth,
                                                  arp,
                                                  TcpFlags::RST | TcpFlags::ACK,
                                                  &[]) {
                    warn!("Tcp unable to send RST: {}", e);
                }
                return Ok(());
            }
            let iss: u32 = rand::thread_rng().gen();
            let mut connect =
                TcpConnect::new(key, iss, seq.wrapping_add(1), window, mss_option(&pkg));
            debug!("Tcp SYN from {}:{} on port {}", src_ip, src_port, dst_port);
            if let Err(e) = connect.send_segment(ipv4,
                                                 eth,
                                                 arp,
                                                 TcpFlags::SYN | TcpFlags::ACK,
                                                 &[]) {
                warn!("Tcp unable to send SYN+ACK: {}", e);
            }
            self.connections.insert(key, connect);
            return Ok(());
        }

        let out_of_order = {
            let connect = self.connections.get_mut(&key).unwrap();
            connect.remote_win = window;
            if seq != connect.ack {
                debug!("Tcp segment out of order (seq {}, expected {}), resetting",
                       seq,
                       connect.ack);
                connect.next_seq = 0;
                connect.ack = seq.wrapping_add(1);
                if let Err(e) = connect.send_segment(ipv4,
                                                     eth,
                                                     arp,
                                                     TcpFlags::RST | TcpFlags::ACK,
                                                     &[]) {
                    warn!("Tcp unable to send RST: {}", e);
                }
                true
            } else {
                false
            }
        };
        if out_of_order {
            self.connections.remove(&key);
            return Ok(());
        }
        if flags & TcpFlags::RST != 0 {
            debug!("Tcp connection reset by {}:{}", src_ip, src_port);
            self.connections.remove(&key);
            return Ok(());
        }

        let state = self.connections[&key].state;
        match state {
            TcpState::SynRcvd => {
                if flags & TcpFlags::ACK == 0 {
                    return Ok(());
                }
                {
                    let connect = self.connections.get_mut(&key).unwrap();
                    // The acknowledgement covers our SYN
                    connect.unack_seq = connect.unack_seq.wrapping_add(1);
                    connect.state = TcpState::Established;
                }
                debug!("Tcp connection to {}:{} established", src_ip, src_port);
                self.dispatch(ipv4, eth, arp, key, TcpEvent::Connected);
                self.sweep(key);
            }
            TcpState::Established => {
                if flags & (TcpFlags::ACK | TcpFlags::FIN) == 0 {
                    return Ok(());
                }
                let got_data = {
                    let connect = self.connections.get_mut(&key).unwrap();
                    if flags & TcpFlags::ACK != 0 && seq_lt(connect.unack_seq, ack_no) &&
                       seq_le(ack_no, connect.next_seq) {
                        let acked = ack_no.wrapping_sub(connect.unack_seq) as usize;
                        connect.release_acked(acked);
                        connect.unack_seq = ack_no;
                    }
                    !data.is_empty() && connect.receive(data) > 0
                };
                if flags & TcpFlags::FIN != 0 {
                    let connect = self.connections.get_mut(&key).unwrap();
                    connect.ack = connect.ack.wrapping_add(1);
                    connect.state = TcpState::LastAck;
                    if let Err(e) = connect.send_segment(ipv4,
                                                         eth,
                                                         arp,
                                                         TcpFlags::FIN | TcpFlags::ACK,
                                                         &[]) {
                        warn!("Tcp unable to send FIN+ACK: {}", e);
                    }
                    return Ok(());
                }
                if !got_data {
                    // Plain acknowledgement or window update
                    return Ok(());
                }
                self.dispatch(ipv4, eth, arp, key, TcpEvent::DataRecv);
                if let Some(connect) = self.connections.get_mut(&key) {
                    if connect.state == TcpState::Established {
                        // Acknowledge what came in, carrying along whatever
                        // the listener queued for transmission.
                        let chunk = connect.take_unsent();
                        if let Err(e) =
                            connect.send_segment(ipv4, eth, arp, TcpFlags::ACK, &chunk) {
                            warn!("Tcp unable to send ACK: {}", e);
                        }
                    }
                }
                self.sweep(key);
            }
            TcpState::FinWait1 => {
                if flags & TcpFlags::FIN != 0 && flags & TcpFlags::ACK != 0 {
                    self.connections.remove(&key);
                } else if flags & TcpFlags::ACK != 0 {
                    self.connections.get_mut(&key).unwrap().state = TcpState::FinWait2;
                }
            }
            TcpState::FinWait2 => {
                if flags & TcpFlags::FIN != 0 {
                    {
                        let connect = self.connections.get_mut(&key).unwrap();
                        connect.ack = connect.ack.wrapping_add(1);
                        if let Err(e) = connect.send_segment(ipv4, eth, arp, TcpFlags::ACK, &[]) {
                            warn!("Tcp unable to send ACK: {}", e);
                        }
                    }
                    self.connections.remove(&key);
                }
            }
            TcpState::LastAck => {
                if flags & TcpFlags::ACK != 0 {
                    self.dispatch(ipv4, eth, arp, key, TcpEvent::Closed);
                    debug!("Tcp connection to {}:{} closed", src_ip, src_port);
                    self.connections.remove(&key);
                }
            }
            TcpState::Closed => {
                self.connections.remove(&key);
            }
        }
        Ok(())
    }

    /// Runs the listener callback for `key` with a socket borrowing the
    /// connection and the egress path.
    fn dispatch(&mut self,
                ipv4: &mut Ipv4,
                eth: &mut Ethernet,
                arp: &mut Arp,
                key: TcpKey,
                event: TcpEvent) {
        let connect = match self.connections.get_mut(&key) {
            Some(connect) => connect,
            None => return,
        };
        let listener = match self.listeners.get_mut(&key.local_port) {
            Some(listener) => listener,
            None => return,
        };
        let mut socket = TcpSocket::new(connect, ipv4, eth, arp);
        listener.on_event(&mut socket, event);
    }

    /// Removes a connection a listener marked closed during dispatch.
    fn sweep(&mut self, key: TcpKey) {
        let closed = self.connections
            .get(&key)
            .map(|connect| connect.state == TcpState::Closed)
            .unwrap_or(false);
        if closed {
            self.connections.remove(&key);
        }
    }
}

/// `a < b` in wrapping sequence-number space.
fn seq_lt(a: u32, b: u32) -> bool {
    a != b && b.wrapping_sub(a) < 0x8000_0000
}

/// `a <= b` in wrapping sequence-number space.
fn seq_le(a: u32, b: u32) -> bool {
    b.wrapping_sub(a) < 0x8000_0000
}

/// The MSS value of a SYN segment, if one was sent along.
fn mss_option(pkg: &TcpPacket) -> Option<u16> {
    if pkg.get_data_offset() as usize * 4 <= TcpPacket::minimum_packet_size() {
        return None;
    }
    for option in pkg.get_options_iter() {
        if option.get_number() == TcpOptionNumbers::MSS {
            let payload = option.payload();
            if payload.len() >= 2 {
                return Some((payload[0] as u16) << 8 | payload[1] as u16);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{seq_le, seq_lt};

    #[test]
    fn sequence_compare() {
        assert!(seq_lt(1, 2));
        assert!(!seq_lt(2, 1));
        assert!(!seq_lt(7, 7));
        assert!(seq_le(7, 7));
    }

    #[test]
    fn sequence_compare_wraps() {
        assert!(seq_lt(0xffff_fff0, 5));
        assert!(!seq_lt(5, 0xffff_fff0));
        assert!(seq_le(0xffff_ffff, 0));
    }
}
