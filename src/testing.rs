//! Helpers for running the stack against an in-memory network. The mock
//! driver moves frames over mpsc channels, so tests inject wire-format
//! frames and assert on everything the stack transmits.

use driver::FrameDriver;
use stack::{NetworkStack, StackConfig};

use ipnetwork::Ipv4Network;

use pnet::util::MacAddr;

use std::cmp;
use std::io;
use std::net::Ipv4Addr;
use std::sync::mpsc::{self, Receiver, Sender};

pub fn dummy_mac() -> MacAddr {
    MacAddr::new(1, 2, 3, 4, 5, 6)
}

pub fn dummy_ipv4() -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, 1)
}

/// `FrameDriver` backed by a pair of channels instead of a network
/// adapter.
pub struct MockDriver {
    inject: Receiver<Vec<u8>>,
    sent: Sender<Vec<u8>>,
}

impl FrameDriver for MockDriver {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.sent
            .send(frame.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "Read handle closed"))
    }

    fn try_recv(&mut self, frame: &mut [u8]) -> io::Result<usize> {
        match self.inject.try_recv() {
            Ok(packet) => {
                let len = cmp::min(packet.len(), frame.len());
                frame[..len].copy_from_slice(&packet[..len]);
                Ok(len)
            }
            Err(_) => Ok(0),
        }
    }
}

/// Creates a `MockDriver` together with the handle injecting frames into
/// it and the handle reading every frame sent through it.
pub fn dummy_driver() -> (MockDriver, Sender<Vec<u8>>, Receiver<Vec<u8>>) {
    let (inject_handle, inject) = mpsc::channel();
    let (sent, read_handle) = mpsc::channel();
    let driver = MockDriver {
        inject: inject,
        sent: sent,
    };
    (driver, inject_handle, read_handle)
}

/// A stack on 10.0.0.1/24 over a mock driver. The gratuitous Arp request
/// emitted during construction has already been drained from the read
/// handle.
pub fn dummy_stack() -> (NetworkStack, Sender<Vec<u8>>, Receiver<Vec<u8>>) {
    let (driver, inject_handle, read_handle) = dummy_driver();
    let config = StackConfig::new(dummy_mac(), Ipv4Network::new(dummy_ipv4(), 24).unwrap());
    let stack = NetworkStack::new(Box::new(driver), config);
    read_handle.try_recv().expect("Expected a gratuitous Arp request");
    (stack, inject_handle, read_handle)
}
