//! Record writer: pooled accumulation and header-then-payload emission.
//!
//! A [`RecordWriter`] hands out one [`Record`] accumulator at a time; the
//! handle borrows the writer mutably, so a second in-flight record (which
//! would interleave bytes on the sink) does not compile.  A record is
//! buffered in full before anything reaches the sink: the header carries the
//! final lengths, and those are only known once the last byte is written.

use std::io::{self, BufWriter, Write};
use std::mem;

use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

use crate::frame::RecordHeader;
use crate::pool::BufferPool;
use crate::IO_BUF_SIZE;

/// Caller-side misuse of a record handle.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("compression must be enabled before the first write ({written} byte(s) already buffered)")]
    CompressAfterWrite { written: u64 },
}

// ── Writer ───────────────────────────────────────────────────────────────────

/// Appends framed records to a byte sink.
pub struct RecordWriter<W: Write> {
    dst: BufWriter<W>,
    pool: BufferPool,
    compress: bool,
    level: Compression,
}

impl<W: Write> RecordWriter<W> {
    /// Writer whose records are stored raw unless a handle opts in.
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, false, Compression::default())
    }

    /// Writer whose records start out compression-enabled.
    pub fn compressed(sink: W) -> Self {
        Self::with_options(sink, true, Compression::default())
    }

    pub fn with_options(sink: W, compress: bool, level: Compression) -> Self {
        Self {
            dst: BufWriter::with_capacity(IO_BUF_SIZE, sink),
            pool: BufferPool::new(),
            compress,
            level,
        }
    }

    /// Borrows out a fresh record accumulator backed by a pooled buffer.
    pub fn new_record(&mut self) -> Record<'_, W> {
        let buf = self.pool.acquire();
        let sink = if self.compress {
            Sink::Gzip(GzEncoder::new(buf, self.level))
        } else {
            Sink::Raw(buf)
        };
        Record { level: self.level, sink, length: 0, writer: self }
    }

    /// Flushes the buffering layer over the sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.dst.flush()
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(self) -> io::Result<W> {
        self.dst.into_inner().map_err(|e| e.into_error())
    }
}

// ── Record handle ────────────────────────────────────────────────────────────

enum Sink {
    Raw(Vec<u8>),
    Gzip(GzEncoder<Vec<u8>>),
}

/// Accumulator for one record.  Bytes written here stay in the backing
/// buffer (raw, or routed through the gzip encoder) until [`finish`]
/// frames and emits them.  Dropping an unfinished handle emits nothing.
///
/// [`finish`]: Record::finish
pub struct Record<'w, W: Write> {
    writer: &'w mut RecordWriter<W>,
    sink: Sink,
    length: u64,
    level: Compression,
}

impl<W: Write> Record<'_, W> {
    /// Routes all subsequent writes through a gzip encoder.  Must be called
    /// before the first write; enabling twice is a no-op.
    pub fn enable_compression(&mut self) -> Result<(), RecordError> {
        if let Sink::Raw(buf) = &mut self.sink {
            if self.length > 0 {
                return Err(RecordError::CompressAfterWrite { written: self.length });
            }
            let buf = mem::take(buf);
            self.sink = Sink::Gzip(GzEncoder::new(buf, self.level));
        }
        Ok(())
    }

    /// Logical (uncompressed) bytes written so far.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Finalizes the record: finishes the compressed stream if one is open,
    /// then writes header and payload to the sink.  The backing buffer goes
    /// back to the pool whether or not the sink writes succeed.
    pub fn finish(mut self) -> io::Result<()> {
        let (buf, clength) = match mem::replace(&mut self.sink, Sink::Raw(Vec::new())) {
            Sink::Raw(buf) => (buf, 0),
            Sink::Gzip(enc) => {
                let buf = enc.finish()?;
                let clength = buf.len() as u64;
                (buf, clength)
            }
        };
        let header = RecordHeader { length: self.length, clength };
        let result = header
            .write(&mut self.writer.dst)
            .and_then(|()| self.writer.dst.write_all(&buf));
        self.writer.pool.release(buf);
        result
    }
}

impl<W: Write> Write for Record<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match &mut self.sink {
            Sink::Raw(dst) => {
                dst.extend_from_slice(buf);
                buf.len()
            }
            Sink::Gzip(enc) => enc.write(buf)?,
        };
        self.length += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> Drop for Record<'_, W> {
    fn drop(&mut self) {
        // A handle abandoned mid-compression keeps its buffer inside the
        // encoder; the pool allocates afresh on the next acquire.
        if let Sink::Raw(buf) = &mut self.sink {
            if buf.capacity() > 0 {
                self.writer.pool.release(mem::take(buf));
            }
        }
    }
}
