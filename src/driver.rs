//! The frame transport the stack runs on top of. Anything that can move
//! whole Ethernet frames in and out implements `FrameDriver`; production
//! setups use the `pnet` datalink backend, tests use a channel-backed mock.

use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender};
use pnet::util::MacAddr;

use std::cmp;
use std::io;
use std::time::Duration;

use DEFAULT_BUFFER_SIZE;

/// Non-blocking transport for complete Ethernet frames.
pub trait FrameDriver {
    /// Transmits one frame.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Polls for one frame. On success the frame has been copied into the
    /// start of `frame` and its length is returned, with zero meaning no
    /// frame was pending.
    fn try_recv(&mut self, frame: &mut [u8]) -> io::Result<usize>;
}

/// `FrameDriver` backed by a `pnet` datalink channel, giving the stack raw
/// Ethernet access on a real interface.
pub struct PnetDriver {
    sender: Box<dyn DataLinkSender>,
    receiver: Box<dyn DataLinkReceiver>,
}

impl PnetDriver {
    pub fn new(sender: Box<dyn DataLinkSender>,
               receiver: Box<dyn DataLinkReceiver>)
               -> PnetDriver {
        PnetDriver {
            sender: sender,
            receiver: receiver,
        }
    }

    /// Opens a datalink channel on the named interface. Returns the driver
    /// together with the MAC address of the interface.
    pub fn open(interface_name: &str) -> io::Result<(PnetDriver, MacAddr)> {
        let interface = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == interface_name)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound,
                               format!("No interface named {}", interface_name))
            })?;
        let mac = interface.mac.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput,
                           format!("Interface {} has no MAC address", interface_name))
        })?;

        let mut config = datalink::Config::default();
        config.write_buffer_size = DEFAULT_BUFFER_SIZE;
        config.read_buffer_size = DEFAULT_BUFFER_SIZE;
        // A short timeout turns the blocking pnet read into the polled
        // receive the stack expects.
        config.read_timeout = Some(Duration::from_millis(1));

        match datalink::channel(&interface, config) {
            Ok(Channel::Ethernet(sender, receiver)) => {
                Ok((PnetDriver::new(sender, receiver), mac))
            }
            Ok(_) => {
                Err(io::Error::new(io::ErrorKind::Other,
                                   "Unsupported datalink channel type".to_owned()))
            }
            Err(e) => Err(e),
        }
    }
}

impl FrameDriver for PnetDriver {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        match self.sender.send_to(frame, None) {
            Some(result) => result,
            None => {
                Err(io::Error::new(io::ErrorKind::Other,
                                   "Insufficient buffer space".to_owned()))
            }
        }
    }

    fn try_recv(&mut self, frame: &mut [u8]) -> io::Result<usize> {
        match self.receiver.next() {
            Ok(packet) => {
                let len = cmp::min(packet.len(), frame.len());
                frame[..len].copy_from_slice(&packet[..len]);
                Ok(len)
            }
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut ||
                          e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }
}
