//! Record framing: the 20-byte wire header and the resynchronization rule.
//!
//! ```text
//! record := MAGIC(4) LENGTH(u64 BE) CLENGTH(u64 BE) PAYLOAD
//! ```
//!
//! `LENGTH` is the logical (uncompressed) payload size.  `CLENGTH == 0`
//! means the payload is stored raw and `LENGTH` bytes follow the header;
//! `CLENGTH > 0` means `CLENGTH` bytes of a single gzip member follow,
//! inflating to exactly `LENGTH` bytes.
//!
//! # Resynchronization
//!
//! A reader at an arbitrary stream offset peeks 4 bytes; if they equal
//! [`MAGIC`] a header is assumed to start there, otherwise exactly one byte
//! is discarded and the peek repeated.  This recovers stream *position*
//! after any run of unparseable bytes.  The magic is not a checksum: a
//! payload that happens to contain the marker can be misread as a header
//! start during resynchronization.  Known limitation of the format.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Header start marker, chosen to be unlikely inside arbitrary payloads.
pub const MAGIC: [u8; 4] = [0x3e, 0xd7, 0x23, 0x0a];

/// On-wire header size: magic + two u64 length fields.
pub const HEADER_SIZE: usize = 20;

/// The two length fields of a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Logical (uncompressed) payload byte count.
    pub length: u64,
    /// On-wire payload byte count when compressed; 0 = stored raw.
    pub clength: u64,
}

impl RecordHeader {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u64::<BigEndian>(self.length)?;
        writer.write_u64::<BigEndian>(self.clength)?;
        Ok(())
    }

    /// Decode the 16 bytes that follow the magic.  The caller has already
    /// consumed and verified the marker; the field values are not validated
    /// here — the reader bounds them against actual stream content.
    pub fn read_body<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Self {
            length: reader.read_u64::<BigEndian>()?,
            clength: reader.read_u64::<BigEndian>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_bit_exact() {
        let mut wire = Vec::new();
        RecordHeader { length: 11, clength: 0 }.write(&mut wire).unwrap();
        assert_eq!(wire.len(), HEADER_SIZE);
        assert_eq!(&wire[..4], &MAGIC);
        assert_eq!(&wire[4..12], &[0, 0, 0, 0, 0, 0, 0, 11]);
        assert_eq!(&wire[12..20], &[0u8; 8]);
    }

    #[test]
    fn header_roundtrip() {
        let header = RecordHeader { length: u64::MAX, clength: 0x0102_0304_0506_0708 };
        let mut wire = Vec::new();
        header.write(&mut wire).unwrap();
        let decoded = RecordHeader::read_body(&wire[4..]).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn read_body_propagates_short_input() {
        let err = RecordHeader::read_body(&[0u8; 7][..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
