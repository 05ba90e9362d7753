//! Record reader: resynchronizing scan and bounded payload streaming.
//!
//! # Locating records
//!
//! [`RecordReader::next_record`] discards any unread remainder of the
//! current record, then slides a 4-byte window over the source until it
//! matches the magic marker, tallying discarded bytes in
//! [`skipped_bytes`].  End of data during the search is the ordinary
//! "no more records" signal (`Ok(false)`); a source that ends inside the
//! 16 header bytes after a located magic is reported as truncation.
//!
//! # Bounded streaming
//!
//! An armed record is consumed through `io::Read`.  Raw payloads are read
//! straight from the source, never past the declared length.  Compressed
//! payloads stream through a gzip decoder whose input side is capped at
//! `clength` source bytes while the output side is still capped at
//! `length`.  Either budget missing its mark surfaces as an
//! `UnexpectedEof` error carrying the declared-vs-actual counts; see
//! [`TruncatedRecord`] for the taxonomy.
//!
//! [`skipped_bytes`]: RecordReader::skipped_bytes

use std::io::{self, BufReader, Read};

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::frame::{RecordHeader, MAGIC};
use crate::pool::MAX_REUSE_SIZE;
use crate::IO_BUF_SIZE;

/// A declared length the stream could not honor.  Wrapped in an
/// `io::Error` of kind `UnexpectedEof` wherever it surfaces.
#[derive(Error, Debug)]
pub enum TruncatedRecord {
    #[error("stream ended inside a record header")]
    Header,
    #[error("record declares {declared} payload byte(s) but only {delivered} could be read")]
    Payload { declared: u64, delivered: u64 },
    #[error("record declares {declared} compressed byte(s) but only {consumed} were available")]
    CompressedPayload { declared: u64, consumed: u64 },
    #[error("compressed payload inflated to {delivered} byte(s), header declares {declared}")]
    ShortDecompression { declared: u64, delivered: u64 },
}

fn eof_error(err: TruncatedRecord) -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, err)
}

// ── Bounded source ───────────────────────────────────────────────────────────

/// Hands the decoder at most `declared` source bytes; a source that dries
/// up before then is a truncated compressed payload, not end of stream.
struct BoundedSource<R: Read> {
    src: BufReader<R>,
    declared: u64,
    remaining: u64,
}

impl<R: Read> Read for BoundedSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = self.remaining.min(buf.len() as u64) as usize;
        let n = self.src.read(&mut buf[..want])?;
        if n == 0 {
            return Err(eof_error(TruncatedRecord::CompressedPayload {
                declared: self.declared,
                consumed: self.declared - self.remaining,
            }));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

enum Stream<R: Read> {
    Plain(BufReader<R>),
    Inflate(GzDecoder<BoundedSource<R>>),
}

/// Extracts framed records from a byte source, one at a time, in order.
pub struct RecordReader<R: Read> {
    /// Always `Some` between method calls; taken while the source is moved
    /// into or out of a decoder.
    stream: Option<Stream<R>>,
    length: u64,
    clength: u64,
    delivered: u64,
    skipped: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(src: R) -> Self {
        Self {
            stream: Some(Stream::Plain(BufReader::with_capacity(IO_BUF_SIZE, src))),
            length: 0,
            clength: 0,
            delivered: 0,
            skipped: 0,
        }
    }

    /// Advances to the next record header.  `Ok(false)` means the source
    /// was exhausted while searching — no more complete records.  I/O
    /// failures and a header truncated after its magic are errors.
    pub fn next_record(&mut self) -> io::Result<bool> {
        let mut src = self.reclaim_source()?;
        match Self::scan(&mut src, &mut self.skipped) {
            Ok(Some(header)) => {
                self.length = header.length;
                self.clength = header.clength;
                self.delivered = 0;
                self.stream = Some(if header.clength > 0 {
                    Stream::Inflate(GzDecoder::new(BoundedSource {
                        src,
                        declared: header.clength,
                        remaining: header.clength,
                    }))
                } else {
                    Stream::Plain(src)
                });
                Ok(true)
            }
            Ok(None) => {
                self.stream = Some(Stream::Plain(src));
                Ok(false)
            }
            Err(e) => {
                self.stream = Some(Stream::Plain(src));
                Err(e)
            }
        }
    }

    /// Logical length declared by the current record's header.
    pub fn record_len(&self) -> u64 {
        self.length
    }

    /// On-wire payload length declared by the current record's header;
    /// 0 means stored raw.
    pub fn compressed_len(&self) -> u64 {
        self.clength
    }

    pub fn is_compressed(&self) -> bool {
        self.clength > 0
    }

    /// Total bytes discarded so far while resynchronizing to a magic
    /// marker.  Bytes abandoned at end of data without a following record
    /// are not counted.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped
    }

    /// Advances and reads one whole record; `Ok(None)` at end of data.
    pub fn read_record(&mut self) -> io::Result<Option<Vec<u8>>> {
        if !self.next_record()? {
            return Ok(None);
        }
        // The declared length is untrusted until the stream delivers the
        // bytes, so cap the preallocation.
        let hint = self.length.min(MAX_REUSE_SIZE as u64) as usize;
        let mut buf = Vec::with_capacity(hint);
        self.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    /// Recovers the buffered source, consuming whatever the current record
    /// still had unread.  A source that dries up during the skip is left at
    /// end of data for the scan to report.
    fn reclaim_source(&mut self) -> io::Result<BufReader<R>> {
        let (mut src, unread) = match self.stream.take() {
            Some(Stream::Plain(src)) => {
                let unread = if self.clength == 0 { self.length - self.delivered } else { 0 };
                (src, unread)
            }
            Some(Stream::Inflate(decoder)) => {
                let bounded = decoder.into_inner();
                (bounded.src, bounded.remaining)
            }
            None => return Err(io::Error::new(io::ErrorKind::Other, "record reader state poisoned")),
        };
        self.length = 0;
        self.clength = 0;
        self.delivered = 0;
        if unread > 0 {
            if let Err(e) = io::copy(&mut Read::by_ref(&mut src).take(unread), &mut io::sink()) {
                self.stream = Some(Stream::Plain(src));
                return Err(e);
            }
        }
        Ok(src)
    }

    /// Rolls a 4-byte window over the source until it matches the magic,
    /// then decodes the header body.  `Ok(None)` = source exhausted.
    fn scan(src: &mut BufReader<R>, skipped: &mut u64) -> io::Result<Option<RecordHeader>> {
        let mut window = [0u8; MAGIC.len()];
        let mut filled = 0;
        while filled < window.len() {
            let n = src.read(&mut window[filled..])?;
            if n == 0 {
                return Ok(None);
            }
            filled += n;
        }
        while window != MAGIC {
            let mut next = [0u8; 1];
            if src.read(&mut next)? == 0 {
                return Ok(None);
            }
            window.copy_within(1.., 0);
            window[MAGIC.len() - 1] = next[0];
            *skipped += 1;
        }
        match RecordHeader::read_body(src) {
            Ok(header) => Ok(Some(header)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(eof_error(TruncatedRecord::Header))
            }
            Err(e) => Err(e),
        }
    }
}

impl<R: Read> Read for RecordReader<R> {
    /// Reads from the current record's payload, bounded by its declared
    /// length.  `Ok(0)` once exactly that many bytes were delivered.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.delivered >= self.length || buf.is_empty() {
            return Ok(0);
        }
        let want = (self.length - self.delivered).min(buf.len() as u64) as usize;
        let (n, inflating) = match self.stream.as_mut() {
            Some(Stream::Plain(src)) => (src.read(&mut buf[..want])?, false),
            Some(Stream::Inflate(decoder)) => (decoder.read(&mut buf[..want])?, true),
            None => return Err(io::Error::new(io::ErrorKind::Other, "record reader state poisoned")),
        };
        self.delivered += n as u64;
        if n == 0 {
            let err = if inflating {
                TruncatedRecord::ShortDecompression {
                    declared: self.length,
                    delivered: self.delivered,
                }
            } else {
                TruncatedRecord::Payload {
                    declared: self.length,
                    delivered: self.delivered,
                }
            };
            return Err(eof_error(err));
        }
        Ok(n)
    }
}
