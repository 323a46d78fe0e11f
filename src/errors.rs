use std::error::Error;
use std::fmt;
use std::io;

/// Enum representing errors happening while trying to send packets to the
/// network
#[derive(Debug)]
pub enum TxError {
    /// Returned when the destination is outside the configured network and
    /// no gateway is known
    NoRoute,

    /// Returned when the payload does not fit in the given protocol. For
    /// example sending a packet with more than 2^16 bytes in a protocol
    /// with a 16 bit length field
    TooLargePayload,

    /// Returned when there was an `IoError` during transmission
    IoError(io::Error),

    /// Any other error not covered by the more specific enum variants
    Other(String),
}

impl From<io::Error> for TxError {
    fn from(e: io::Error) -> Self {
        TxError::IoError(e)
    }
}

impl From<TxError> for io::Error {
    fn from(e: TxError) -> Self {
        let other = |msg| io::Error::new(io::ErrorKind::Other, msg);
        match e {
            TxError::NoRoute => other("No route to host".to_owned()),
            TxError::TooLargePayload => other("Too large payload".to_owned()),
            TxError::IoError(e2) => e2,
            TxError::Other(msg) => other(format!("Other: {}", msg)),
        }
    }
}

impl fmt::Display for TxError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use TxError::*;
        match *self {
            NoRoute => fmt.write_str("No route to host"),
            TooLargePayload => fmt.write_str("Too large payload"),
            IoError(ref e) => write!(fmt, "IO error: {}", e),
            Other(ref s) => write!(fmt, "Other error: {}", s),
        }
    }
}

impl Error for TxError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let TxError::IoError(ref e) = *self {
            Some(e)
        } else {
            None
        }
    }
}

/// Type binding for the type of `Result` that a send method returns.
pub type TxResult = Result<(), TxError>;

/// Error describing why an incoming packet was not accepted by a receive
/// path.
#[derive(Debug, Eq, PartialEq)]
pub enum RxError {
    /// When nothing is listening for this packet, so it becomes silently
    /// discarded.
    NoListener(String),

    /// When a packet contains an invalid checksum.
    InvalidChecksum,

    /// When the length of the packet does not match the
    /// requirements or header content of a protocol
    InvalidLength,

    /// When other packet content is invalid.
    InvalidContent,

    /// Some error that was not covered by the more specific errors in this
    /// enum.
    Other(String),
}

impl fmt::Display for RxError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use RxError::*;
        match *self {
            NoListener(ref s) => write!(fmt, "No listener for packet: {}", s),
            InvalidChecksum => fmt.write_str("Invalid checksum in packet"),
            InvalidLength => fmt.write_str("Invalid length field in packet"),
            InvalidContent => fmt.write_str("Invalid content in packet"),
            Other(ref s) => write!(fmt, "Other error: {}", s),
        }
    }
}

impl Error for RxError {}

/// Simple type definition for return type of `recv` style methods.
pub type RxResult = Result<(), RxError>;

/// Error returned upon invalid usage or state of the stack.
#[derive(Debug)]
pub enum StackError {
    IllegalArgument,
    PortOccupied(u16),
    TxError(TxError),
    IoError(io::Error),
}

impl From<TxError> for StackError {
    fn from(e: TxError) -> StackError {
        StackError::TxError(e)
    }
}

impl From<io::Error> for StackError {
    fn from(e: io::Error) -> StackError {
        StackError::IoError(e)
    }
}

impl From<StackError> for io::Error {
    fn from(e: StackError) -> io::Error {
        let other = |msg| io::Error::new(io::ErrorKind::Other, msg);
        match e {
            StackError::IllegalArgument => other("Illegal argument".to_owned()),
            StackError::PortOccupied(port) => {
                io::Error::new(io::ErrorKind::AddrInUse, format!("Port {} is occupied", port))
            }
            StackError::TxError(txe) => txe.into(),
            StackError::IoError(io_e) => io_e,
        }
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use StackError::*;
        match *self {
            IllegalArgument => fmt.write_str("Illegal argument"),
            PortOccupied(port) => write!(fmt, "Port {} is occupied", port),
            TxError(ref e) => write!(fmt, "Tx error: {}", e),
            IoError(ref e) => write!(fmt, "IO error: {}", e),
        }
    }
}

impl Error for StackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            StackError::TxError(ref e) => Some(e),
            StackError::IoError(ref e) => Some(e),
            _ => None,
        }
    }
}

pub type StackResult<T> = Result<T, StackError>;
