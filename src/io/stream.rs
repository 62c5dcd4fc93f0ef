//! Framing of the persisted-state stream.
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                │
//! │ - Magic: "NAKS" (4 bytes)                        │
//! │ - Version: u16 LE                                │
//! │ - Flags: u16 LE                                  │
//! │ - Reserved: 8 bytes                              │
//! ├──────────────────────────────────────────────────┤
//! │ Record Stream                                    │
//! │ [kind:u16][len:u32][postcard payload]...         │
//! ├──────────────────────────────────────────────────┤
//! │ Footer frame (kind 0xFFFF, record_count)         │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! A stream without a footer is truncated. Anything after the footer is
//! corruption.

use std::io::{ErrorKind, Read, Write};

use super::error::{StreamError, StreamResult};
use super::records::{Footer, SerializedData};

/// Magic bytes at start of a state stream.
pub const STATE_MAGIC: [u8; 4] = *b"NAKS";

/// Current stream format version.
pub const STATE_VERSION: u16 = 1;

/// Size of the stream header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Largest accepted frame payload (64 MiB).
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Writes framed records to any `Write`.
pub struct StateWriter<W: Write> {
    writer: W,
    records_written: u64,
}

impl<W: Write> StateWriter<W> {
    /// Write the header and return a writer positioned at the first record.
    pub fn new(mut writer: W) -> StreamResult<Self> {
        let mut header = [0u8; HEADER_SIZE];
        header[..4].copy_from_slice(&STATE_MAGIC);
        header[4..6].copy_from_slice(&STATE_VERSION.to_le_bytes());
        // Flags and reserved bytes stay zero.
        writer.write_all(&header)?;
        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    /// Append one record.
    pub fn write(&mut self, record: &SerializedData) -> StreamResult<()> {
        let payload = record.encode_payload()?;
        self.write_frame(record.kind(), &payload)
    }

    /// Append a raw frame. Counts towards the footer's record count.
    pub fn write_frame(&mut self, kind: u16, payload: &[u8]) -> StreamResult<()> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(StreamError::FrameTooLarge(payload.len()));
        }
        self.writer.write_all(&kind.to_le_bytes())?;
        self.writer.write_all(&(payload.len() as u32).to_le_bytes())?;
        self.writer.write_all(payload)?;
        self.records_written += 1;
        Ok(())
    }

    /// Records written so far, footer excluded.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Write the footer and flush. Returns the number of records written.
    pub fn finish(mut self) -> StreamResult<u64> {
        let record_count = self.records_written;
        let footer = SerializedData::Footer(Footer { record_count });
        let payload = footer.encode_payload()?;
        self.write_frame(footer.kind(), &payload)?;
        self.writer.flush()?;
        Ok(record_count)
    }
}

/// Reads framed records from any `Read`.
pub struct StateReader<R: Read> {
    reader: R,
    version: u16,
    flags: u16,
    records_read: u64,
    footer_seen: bool,
}

impl<R: Read> StateReader<R> {
    /// Read and validate the header.
    pub fn new(mut reader: R) -> StreamResult<Self> {
        let mut header = [0u8; HEADER_SIZE];
        read_exact_or_truncated(&mut reader, &mut header, "header")?;

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[..4]);
        if magic != STATE_MAGIC {
            return Err(StreamError::BadMagic(magic));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != STATE_VERSION {
            return Err(StreamError::UnsupportedVersion(version));
        }
        let flags = u16::from_le_bytes([header[6], header[7]]);

        Ok(Self {
            reader,
            version,
            flags,
            records_read: 0,
            footer_seen: false,
        })
    }

    /// Format version from the header.
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Flags from the header.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Records read so far, footer excluded.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Next record, or `None` once the footer has been read.
    ///
    /// Running out of bytes before the footer is an error.
    pub fn next(&mut self) -> StreamResult<Option<SerializedData>> {
        if self.footer_seen {
            return Ok(None);
        }

        let mut frame_header = [0u8; 6];
        read_exact_or_truncated(&mut self.reader, &mut frame_header, "frame header")?;
        let kind = u16::from_le_bytes([frame_header[0], frame_header[1]]);
        let len = u32::from_le_bytes([
            frame_header[2],
            frame_header[3],
            frame_header[4],
            frame_header[5],
        ]) as usize;
        if len > MAX_FRAME_LEN {
            return Err(StreamError::FrameTooLarge(len));
        }

        let mut payload = Vec::new();
        let read = (&mut self.reader)
            .take(len as u64)
            .read_to_end(&mut payload)?;
        if read != len {
            return Err(StreamError::Truncated(format!(
                "frame payload: {} of {} bytes",
                read, len
            )));
        }

        match SerializedData::decode(kind, &payload)? {
            SerializedData::Footer(footer) => {
                if footer.record_count != self.records_read {
                    return Err(StreamError::RecordCountMismatch {
                        expected: footer.record_count,
                        actual: self.records_read,
                    });
                }
                self.footer_seen = true;
                Ok(None)
            }
            record => {
                self.records_read += 1;
                Ok(Some(record))
            }
        }
    }

    /// Check that the footer was read and nothing follows it.
    pub fn expect_end(&mut self) -> StreamResult<()> {
        if !self.footer_seen {
            return Err(StreamError::Truncated("footer not reached".to_string()));
        }
        let mut probe = [0u8; 1];
        loop {
            match self.reader.read(&mut probe) {
                Ok(0) => return Ok(()),
                Ok(_) => return Err(StreamError::TrailingBytes),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn read_exact_or_truncated<R: Read>(
    reader: &mut R,
    buffer: &mut [u8],
    what: &str,
) -> StreamResult<()> {
    match reader.read_exact(buffer) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            Err(StreamError::Truncated(format!("stream ended inside {}", what)))
        }
        Err(e) => Err(e.into()),
    }
}
