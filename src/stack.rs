use arp::Arp;
use driver::FrameDriver;
use errors::{RxError, RxResult, StackError, StackResult, TxResult};
use ethernet::{self, Ethernet};
use ipv4::Ipv4;
use tcp::{Tcp, TcpListener};
use udp::{Udp, UdpListener, UdpTx};
use util::FrameBuf;

use ipnetwork::Ipv4Network;

use pnet::packet::ethernet::EtherTypes;
use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::util::MacAddr;

use std::net::{Ipv4Addr, SocketAddrV4};

pub static DEFAULT_MTU: usize = 1500;

/// Static configuration of the one interface the stack terminates.
pub struct StackConfig {
    pub mac: MacAddr,
    pub net: Ipv4Network,
    /// Next hop for destinations outside `net`. Without one such
    /// destinations are unroutable.
    pub gateway: Option<Ipv4Addr>,
    pub mtu: usize,
}

impl StackConfig {
    pub fn new(mac: MacAddr, net: Ipv4Network) -> StackConfig {
        StackConfig {
            mac: mac,
            net: net,
            gateway: None,
            mtu: DEFAULT_MTU,
        }
    }
}

/// The main struct of this library, gathering the entire protocol stack of
/// one interface into a single value: the Ethernet device with its frame
/// driver and scratch buffers, the Arp resolver, the IPv4 datapath and the
/// Udp and Tcp engines. All processing happens on the thread calling
/// `poll`.
pub struct NetworkStack {
    eth: Ethernet,
    rxbuf: FrameBuf,
    arp: Arp,
    ipv4: Ipv4,
    udp: Udp,
    tcp: Tcp,
}

impl NetworkStack {
    /// Brings the stack up on the given driver. Announces the configured
    /// address with a gratuitous Arp request.
    pub fn new(driver: Box<dyn FrameDriver>, config: StackConfig) -> NetworkStack {
        let mut eth = Ethernet::new(config.mac, driver);
        let mut arp = Arp::new(config.net.ip());
        if let Err(e) = arp.request(&mut eth, config.net.ip()) {
            warn!("Unable to send gratuitous Arp request: {}", e);
        }
        NetworkStack {
            eth: eth,
            rxbuf: FrameBuf::new(),
            arp: arp,
            ipv4: Ipv4::new(config.net, config.gateway, config.mtu),
            udp: Udp::new(),
            tcp: Tcp::new(),
        }
    }

    pub fn mac(&self) -> MacAddr {
        self.eth.mac()
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ipv4.ip()
    }

    /// The Arp resolver, exposed for manual table entries and diagnostics.
    pub fn arp(&mut self) -> &mut Arp {
        &mut self.arp
    }

    /// Polls the driver for one frame and runs it through the stack to
    /// completion, including any transmissions it provokes. Returns whether
    /// a frame was processed, so callers can drain a backlog by polling
    /// until `false`. Problems with the frame itself are logged, only
    /// driver failures surface as errors.
    pub fn poll(&mut self) -> StackResult<bool> {
        let len = self.eth.recv_into(&mut self.rxbuf)?;
        if len == 0 {
            return Ok(false);
        }
        if let Err(e) = self.handle_frame() {
            warn!("RxError: {:?}", e);
        }
        Ok(true)
    }

    fn handle_frame(&mut self) -> RxResult {
        let (_src, ethertype) = ethernet::strip(&mut self.rxbuf)?;
        if ethertype == EtherTypes::Arp {
            self.arp.input(&mut self.eth, self.rxbuf.as_slice())
        } else if ethertype == EtherTypes::Ipv4 {
            self.ipv4.input(&mut self.eth,
                            &mut self.arp,
                            &mut self.udp,
                            &mut self.tcp,
                            &mut self.rxbuf)
        } else {
            Err(RxError::NoListener(format!("Ethernet: No listener for {}", ethertype)))
        }
    }

    /// Drives time-based maintenance, currently only the Tcp timer hook.
    /// Hosts call this at whatever cadence suits them.
    pub fn tick(&mut self) {
        self.tcp.tick();
    }

    /// Sends a raw IPv4 payload, fragmenting as needed.
    pub fn ipv4_send(&mut self,
                     dst: Ipv4Addr,
                     protocol: IpNextHeaderProtocol,
                     payload: &[u8])
                     -> TxResult {
        self.ipv4.output(&mut self.eth, &mut self.arp, dst, protocol, payload)
    }

    /// Registers a Udp listener on a local port.
    pub fn udp_open<L>(&mut self, port: u16, listener: L) -> StackResult<()>
        where L: UdpListener + 'static
    {
        self.udp
            .open(port, Box::new(listener))
            .map_err(|_| StackError::PortOccupied(port))
    }

    pub fn udp_close(&mut self, port: u16) {
        self.udp.close(port);
    }

    /// Sends one Udp datagram from `src_port` to `dst`.
    pub fn udp_send(&mut self, src_port: u16, dst: SocketAddrV4, payload: &[u8]) -> TxResult {
        UdpTx::new(&mut self.ipv4, &mut self.eth, &mut self.arp).send(src_port, dst, payload)
    }

    /// Registers a Tcp listener on a local port. Connections are accepted
    /// passively and reported to the listener through its events.
    pub fn tcp_open<L>(&mut self, port: u16, listener: L) -> StackResult<()>
        where L: TcpListener + 'static
    {
        self.tcp
            .open(port, Box::new(listener))
            .map_err(|_| StackError::PortOccupied(port))
    }

    /// Deregisters the listener on `port` and tears down every connection
    /// using it.
    pub fn tcp_close(&mut self, port: u16) {
        self.tcp.close(port);
    }
}
