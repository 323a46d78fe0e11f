mod cachemap;
mod framebuf;

pub mod checksum;

pub use self::cachemap::CacheMap;
pub use self::framebuf::{FrameBuf, BUF_HEADROOM, BUF_MAX_LEN};
