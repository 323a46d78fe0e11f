//! Provides functionality for reading and writing ethernet frames from and
//! to the underlying frame driver.

use driver::FrameDriver;
use errors::{RxError, TxError, TxResult};
use util::FrameBuf;

use pnet::packet::ethernet::{EtherType, EthernetPacket, MutableEthernetPacket};
use pnet::util::MacAddr;

use std::io;

/// Frames shorter than this are padded with zeros before transmission.
pub const ETHERNET_MIN_PAYLOAD: usize = 46;

/// Largest frame `recv_into` accepts from the driver.
pub const ETHERNET_MAX_FRAME: usize = 1522;

/// The sending half of one network interface: the frame driver, the local
/// MAC address and the scratch buffer every egress chain assembles its
/// frame in. Callers own the scratch buffer exclusively from the moment
/// they `init` it until the frame has left through `output`.
pub struct Ethernet {
    mac: MacAddr,
    driver: Box<dyn FrameDriver>,
    txbuf: FrameBuf,
}

impl Ethernet {
    pub fn new(mac: MacAddr, driver: Box<dyn FrameDriver>) -> Ethernet {
        Ethernet {
            mac: mac,
            driver: driver,
            txbuf: FrameBuf::new(),
        }
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn txbuf(&self) -> &FrameBuf {
        &self.txbuf
    }

    pub fn txbuf_mut(&mut self) -> &mut FrameBuf {
        &mut self.txbuf
    }

    /// Polls the driver for one frame, leaving it in `rxbuf`.
    pub fn recv_into(&mut self, rxbuf: &mut FrameBuf) -> io::Result<usize> {
        rxbuf.init(ETHERNET_MAX_FRAME);
        let len = self.driver.try_recv(rxbuf.as_mut_slice())?;
        rxbuf.set_len(len);
        Ok(len)
    }

    /// Wraps the scratch buffer in an Ethernet header and transmits it.
    pub fn output(&mut self, dst: MacAddr, ethertype: EtherType) -> TxResult {
        let Ethernet { mac, ref mut driver, ref mut txbuf } = *self;
        wrap_and_send(driver, txbuf, mac, dst, ethertype)
    }

    /// Like `output` but for a frame held outside the scratch buffer, such
    /// as one queued while awaiting address resolution.
    pub fn output_frame(&mut self,
                        frame: &mut FrameBuf,
                        dst: MacAddr,
                        ethertype: EtherType)
                        -> TxResult {
        wrap_and_send(&mut self.driver, frame, self.mac, dst, ethertype)
    }
}

fn wrap_and_send(driver: &mut Box<dyn FrameDriver>,
                 buf: &mut FrameBuf,
                 src: MacAddr,
                 dst: MacAddr,
                 ethertype: EtherType)
                 -> TxResult {
    if buf.len() < ETHERNET_MIN_PAYLOAD {
        let pad = ETHERNET_MIN_PAYLOAD - buf.len();
        buf.add_padding(pad)
            .map_err(|_| TxError::Other("No tailroom for frame padding".to_owned()))?;
    }
    buf.add_header(EthernetPacket::minimum_packet_size())
        .map_err(|_| TxError::Other("No headroom for Ethernet header".to_owned()))?;
    {
        let mut pkg = MutableEthernetPacket::new(buf.as_mut_slice()).unwrap();
        pkg.set_destination(dst);
        pkg.set_source(src);
        pkg.set_ethertype(ethertype);
    }
    driver.send(buf.as_slice()).map_err(TxError::from)
}

/// Parses and strips the Ethernet header of an incoming frame, returning
/// the source address and the EtherType to demultiplex on.
pub fn strip(rxbuf: &mut FrameBuf) -> Result<(MacAddr, EtherType), RxError> {
    if rxbuf.len() < EthernetPacket::minimum_packet_size() {
        return Err(RxError::InvalidLength);
    }
    let (src, ethertype) = {
        let pkg = EthernetPacket::new(rxbuf.as_slice()).unwrap();
        (pkg.get_source(), pkg.get_ethertype())
    };
    rxbuf.remove_header(EthernetPacket::minimum_packet_size())
        .map_err(|_| RxError::InvalidLength)?;
    Ok((src, ethertype))
}
