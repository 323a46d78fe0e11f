use arp::Arp;
use errors::TxResult;
use ethernet::Ethernet;
use ipv4::Ipv4;
use util::{checksum, FrameBuf};

use pnet::packet::Packet;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::tcp::{MutableTcpPacket, TcpFlags, TcpPacket};

use std::cmp;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Segment size assumed for peers that do not advertise one.
pub const DEFAULT_MSS: u16 = 536;

/// Identifies one connection in the connection table. The local address is
/// implicit, the stack only has one.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TcpKey {
    pub remote_ip: Ipv4Addr,
    pub remote_port: u16,
    pub local_port: u16,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TcpState {
    /// SYN seen, SYN+ACK sent, waiting for the acknowledgement.
    SynRcvd,
    Established,
    /// Our FIN is out, nothing acknowledged yet.
    FinWait1,
    /// Our FIN is acknowledged, waiting for the peer's.
    FinWait2,
    /// The peer's FIN is acknowledged together with ours, waiting for the
    /// final acknowledgement.
    LastAck,
    /// Marked for removal once the current dispatch unwinds.
    Closed,
}

/// State of one connection. A connection only exists from the first SYN
/// on; a key without an entry in the table is in the listen state.
pub struct TcpConnect {
    pub(crate) state: TcpState,
    pub(crate) local_port: u16,
    pub(crate) remote_port: u16,
    pub(crate) remote_ip: Ipv4Addr,
    /// First sequence number the peer has not acknowledged. The bytes from
    /// here up to `next_seq` sit at the head of `tx_buf`.
    pub(crate) unack_seq: u32,
    /// Next sequence number to put on the wire.
    pub(crate) next_seq: u32,
    /// Next sequence number expected from the peer, sent as our
    /// acknowledgement field.
    pub(crate) ack: u32,
    pub(crate) remote_mss: u16,
    pub(crate) remote_win: u16,
    pub(crate) rx_buf: FrameBuf,
    pub(crate) tx_buf: FrameBuf,
}

impl TcpConnect {
    pub(crate) fn new(key: TcpKey,
                      iss: u32,
                      ack: u32,
                      remote_win: u16,
                      remote_mss: Option<u16>)
                      -> TcpConnect {
        TcpConnect {
            state: TcpState::SynRcvd,
            local_port: key.local_port,
            remote_port: key.remote_port,
            remote_ip: key.remote_ip,
            unack_seq: iss,
            next_seq: iss,
            ack: ack,
            remote_mss: remote_mss.unwrap_or(DEFAULT_MSS),
            remote_win: remote_win,
            rx_buf: FrameBuf::new(),
            tx_buf: FrameBuf::new(),
        }
    }

    /// Throwaway connection used to answer segments that belong to no
    /// stored connection: sequence number zero, acknowledging `seq + 1`.
    pub(crate) fn reset_stub(key: TcpKey, seq: u32, remote_win: u16) -> TcpConnect {
        let mut connect = TcpConnect::new(key, 0, seq.wrapping_add(1), remote_win, None);
        connect.state = TcpState::Closed;
        connect
    }

    /// Builds and transmits one segment carrying `payload`, which must
    /// already be accounted for in `next_seq`. SYN and FIN consume one
    /// sequence number after the segment is out.
    pub(crate) fn send_segment(&mut self,
                               ipv4: &mut Ipv4,
                               eth: &mut Ethernet,
                               arp: &mut Arp,
                               flags: u8,
                               payload: &[u8])
                               -> TxResult {
        let mut segment = vec![0u8; TcpPacket::minimum_packet_size() + payload.len()];
        {
            let mut pkg = MutableTcpPacket::new(&mut segment).unwrap();
            pkg.set_source(self.local_port);
            pkg.set_destination(self.remote_port);
            pkg.set_sequence(self.next_seq.wrapping_sub(payload.len() as u32));
            pkg.set_acknowledgement(self.ack);
            pkg.set_data_offset(5);
            pkg.set_reserved(0);
            pkg.set_flags(flags);
            // The window field echoes the peer's window, the receive buffer
            // does its own bookkeeping.
            pkg.set_window(self.remote_win);
            pkg.set_urgent_ptr(0);
            pkg.set_payload(payload);
            let csum = checksum::pseudo_header_checksum(ipv4.ip(),
                                                        self.remote_ip,
                                                        IpNextHeaderProtocols::Tcp,
                                                        pkg.packet());
            pkg.set_checksum(csum);
        }
        let result = ipv4.output(eth, arp, self.remote_ip, IpNextHeaderProtocols::Tcp, &segment);
        if flags & (TcpFlags::SYN | TcpFlags::FIN) != 0 {
            self.next_seq = self.next_seq.wrapping_add(1);
        }
        result
    }

    /// Appends received payload to the receive buffer and advances the
    /// cumulative acknowledgement by what actually fit.
    pub(crate) fn receive(&mut self, data: &[u8]) -> usize {
        if self.rx_buf.tailroom() < data.len() {
            self.rx_buf.compact();
        }
        let size = cmp::min(self.rx_buf.tailroom(), data.len());
        let end = self.rx_buf.len();
        if self.rx_buf.add_padding(size).is_err() {
            return 0;
        }
        self.rx_buf.as_mut_slice()[end..end + size].copy_from_slice(&data[..size]);
        if size < data.len() {
            debug!("Tcp receive buffer exhausted, {} bytes lost", data.len() - size);
        }
        self.ack = self.ack.wrapping_add(size as u32);
        size
    }

    /// Takes the buffered bytes allowed on the wire right now: everything
    /// not yet sent, bounded by the room left in the peer's window.
    /// Advances `next_seq`; the bytes stay buffered until acknowledged.
    pub(crate) fn take_unsent(&mut self) -> Vec<u8> {
        let in_flight = self.next_seq.wrapping_sub(self.unack_seq) as usize;
        debug_assert!(in_flight <= self.tx_buf.len());
        let window = self.remote_win as usize;
        let size = cmp::min(self.tx_buf.len().saturating_sub(in_flight),
                            window.saturating_sub(in_flight));
        let chunk = self.tx_buf.as_slice()[in_flight..in_flight + size].to_vec();
        self.next_seq = self.next_seq.wrapping_add(size as u32);
        chunk
    }

    /// Drops bytes the peer acknowledged from the head of the transmit
    /// buffer.
    pub(crate) fn release_acked(&mut self, acked: usize) {
        debug_assert!(acked <= self.tx_buf.len());
        let _ = self.tx_buf.remove_header(acked);
        if self.tx_buf.is_empty() {
            self.tx_buf.compact();
        }
    }
}

/// Handle to one connection, valid for the duration of a listener
/// callback. Wraps the connection state together with the egress path so
/// reads, writes and closes can be performed from inside the callback.
pub struct TcpSocket<'a> {
    connect: &'a mut TcpConnect,
    ipv4: &'a mut Ipv4,
    eth: &'a mut Ethernet,
    arp: &'a mut Arp,
}

impl<'a> TcpSocket<'a> {
    pub(crate) fn new(connect: &'a mut TcpConnect,
                      ipv4: &'a mut Ipv4,
                      eth: &'a mut Ethernet,
                      arp: &'a mut Arp)
                      -> TcpSocket<'a> {
        TcpSocket {
            connect: connect,
            ipv4: ipv4,
            eth: eth,
            arp: arp,
        }
    }

    pub fn remote(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.connect.remote_ip, self.connect.remote_port)
    }

    pub fn local_port(&self) -> u16 {
        self.connect.local_port
    }

    /// Maximum segment size the peer advertised in its SYN.
    pub fn remote_mss(&self) -> u16 {
        self.connect.remote_mss
    }

    /// Copies up to `buf.len()` received bytes out of the connection,
    /// returning how many were copied.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let rx_buf = &mut self.connect.rx_buf;
        let size = cmp::min(rx_buf.len(), buf.len());
        buf[..size].copy_from_slice(&rx_buf.as_slice()[..size]);
        let _ = rx_buf.remove_header(size);
        if rx_buf.is_empty() {
            rx_buf.compact();
        }
        size
    }

    /// Enqueues up to `data.len()` bytes for transmission. Returns 0
    /// without enqueueing anything when the peer's window cannot take the
    /// data yet or the transmit buffer has to be compacted first; callers
    /// retry later, which also nudges buffered bytes onto the wire.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let connect = &mut *self.connect;
        if connect.state != TcpState::Established {
            return 0;
        }
        let in_flight = connect.next_seq.wrapping_sub(connect.unack_seq) as usize;
        if in_flight + data.len() >= connect.remote_win as usize {
            return 0;
        }
        if connect.tx_buf.tailroom() < data.len() {
            connect.tx_buf.compact();
            let chunk = connect.take_unsent();
            if !chunk.is_empty() {
                if let Err(e) = connect.send_segment(self.ipv4,
                                                     self.eth,
                                                     self.arp,
                                                     TcpFlags::ACK,
                                                     &chunk) {
                    warn!("Tcp unable to flush transmit buffer: {}", e);
                }
            }
            return 0;
        }
        let end = connect.tx_buf.len();
        if connect.tx_buf.add_padding(data.len()).is_err() {
            return 0;
        }
        connect.tx_buf.as_mut_slice()[end..end + data.len()].copy_from_slice(data);
        data.len()
    }

    /// Active close. An established connection flushes what it can of the
    /// transmit buffer with the FIN; any other state is torn down on the
    /// spot.
    pub fn close(&mut self) {
        let connect = &mut *self.connect;
        if connect.state == TcpState::Established {
            let chunk = connect.take_unsent();
            if let Err(e) = connect.send_segment(self.ipv4,
                                                 self.eth,
                                                 self.arp,
                                                 TcpFlags::FIN | TcpFlags::ACK,
                                                 &chunk) {
                warn!("Tcp unable to send FIN: {}", e);
            }
            connect.state = TcpState::FinWait1;
        } else {
            connect.state = TcpState::Closed;
        }
    }
}
