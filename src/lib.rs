pub mod frame;
pub mod pool;
pub mod reader;
pub mod writer;

pub use frame::{RecordHeader, HEADER_SIZE, MAGIC};
pub use pool::{BufferPool, MAX_REUSE_SIZE};
pub use reader::{RecordReader, TruncatedRecord};
pub use writer::{Record, RecordError, RecordWriter};

pub use flate2::Compression;

/// Capacity of the buffering layer wrapped around the sink and source.
pub(crate) const IO_BUF_SIZE: usize = 1 << 16;
