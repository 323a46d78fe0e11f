//! # ustack
//!
//! A small user-space TCP/IP stack for a single Ethernet interface,
//! backed by [`libpnet`](https://github.com/libpnet/libpnet) for packet
//! parsing and raw ethernet access.
//!
//! **WARNING**: This is not a complete TCP/IP implementation and does not
//! try to be one. It terminates exactly the protocols a small embedded
//! service needs (Arp, IPv4 with egress fragmentation, ICMP echo, Udp and
//! a passively-opened Tcp) and leaves out everything else. See the list
//! below before relying on it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! extern crate ustack;
//!
//! use ustack::{NetworkStack, StackConfig};
//! use ustack::driver::PnetDriver;
//!
//! let (driver, mac) = PnetDriver::open("eth0").unwrap();
//! let config = StackConfig::new(mac, "10.0.0.1/24".parse().unwrap());
//! let mut stack = NetworkStack::new(Box::new(driver), config);
//! stack.tcp_open(80, MyHandler).unwrap();
//! loop {
//!     while stack.poll().unwrap() {}
//!     stack.tick();
//! }
//! ```
//!
//! ## Design
//!
//! The stack is strictly single threaded and polled. `poll` pulls at most
//! one frame out of the driver and runs it through the layers to
//! completion; every transmission the frame provokes (acknowledgements,
//! Arp traffic, ICMP errors, listener writes) has left through the driver
//! by the time `poll` returns. Listener callbacks run synchronously on the
//! polling thread and get a scoped handle to their connection, so there is
//! no locking anywhere.
//!
//! Two scratch buffers are reused for all frame work: one the driver
//! receives into, one every egress chain assembles its frame in. The Tcp
//! engine additionally owns a receive and a transmit buffer per
//! connection.
//!
//! ## Features
//!
//! - [x] Ethernet frame send and receive over a pluggable `FrameDriver`
//! - [x] Arp
//!   - [x] Request, reply, gratuitous announcement
//!   - [x] Single pending egress frame per unresolved destination
//!   - [x] Timing out old entries in the table
//! - [ ] IPv4
//!   - [x] Receive validation (version, lengths, checksum, destination)
//!   - [x] Fragmenting send
//!   - [x] Gateway next hop for off-net destinations
//!   - [ ] Reassembling incoming fragments
//!   - [ ] Header options
//! - [x] ICMP echo responder, protocol- and port-unreachable errors
//! - [x] Udp with per-port listeners
//! - [ ] Tcp
//!   - [x] Passive open, data transfer, active and passive close
//!   - [x] Sliding-window accounting against the peer's window
//!   - [x] MSS observation
//!   - [ ] Active open
//!   - [ ] Retransmission timer (see `Tcp::tick`)
//!   - [ ] Out-of-order segments (they reset the connection)
//! - [ ] IPv6

extern crate ipnetwork;
#[macro_use]
extern crate log;
extern crate pnet;
extern crate rand;

mod errors;
mod stack;

pub mod arp;
pub mod driver;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod tcp;
pub mod udp;
pub mod util;

pub mod testing;

pub use errors::{RxError, RxResult, StackError, StackResult, TxError, TxResult};
pub use stack::{NetworkStack, StackConfig, DEFAULT_MTU};

pub static DEFAULT_BUFFER_SIZE: usize = 1024 * 128;
