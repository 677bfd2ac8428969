//! Git pkt-line framing.
//!
//! The smart HTTP protocol prefixes each line with a 4-character hex length,
//! or one of the fixed markers "0000" (flush), "0001" (delimiter), "0002"
//! (response-end). The gateway only emits the service-announcement preamble
//! itself; everything after the flush packet comes verbatim from git.

use crate::{GitError, Result};
use std::io::{Read, Write};

/// A single pkt-line packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// Data line with content.
    Data(Vec<u8>),
    /// Flush packet (0000).
    Flush,
    /// Delimiter packet (0001).
    Delimiter,
    /// Response-end packet (0002).
    ResponseEnd,
}

impl PktLine {
    /// Creates a data packet from a string slice.
    pub fn from_string(s: &str) -> Self {
        Self::Data(s.as_bytes().to_vec())
    }

    /// Encodes the packet to bytes.
    ///
    /// The length prefix covers itself plus the payload, rendered as
    /// lowercase hex and left-padded with zeros to a multiple of 4 digits.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Data(data) => {
                let mut prefix = format!("{:x}", data.len() + 4);
                let pad = (4 - prefix.len() % 4) % 4;
                prefix.insert_str(0, &"0".repeat(pad));

                let mut out = prefix.into_bytes();
                out.extend_from_slice(data);
                out
            }
            Self::Flush => b"0000".to_vec(),
            Self::Delimiter => b"0001".to_vec(),
            Self::ResponseEnd => b"0002".to_vec(),
        }
    }

    /// Returns the data content, or `None` for marker packets.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }
}

/// Encodes the `# service=git-<name>` announcement that precedes a ref
/// advertisement, including the trailing flush packet.
pub fn advertisement_preamble(service_name: &str) -> Vec<u8> {
    let mut out = PktLine::from_string(&format!("# service=git-{}\n", service_name)).encode();
    out.extend_from_slice(&PktLine::Flush.encode());
    out
}

/// Reader for pkt-line framed streams.
pub struct PktLineReader<R> {
    reader: R,
}

impl<R: Read> PktLineReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next packet, or `None` at end of stream.
    pub fn read(&mut self) -> Result<Option<PktLine>> {
        let mut len_buf = [0u8; 4];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len_str = std::str::from_utf8(&len_buf)
            .map_err(|_| GitError::InvalidPktLine("non-ascii length prefix".to_string()))?;

        match len_str {
            "0000" => Ok(Some(PktLine::Flush)),
            "0001" => Ok(Some(PktLine::Delimiter)),
            "0002" => Ok(Some(PktLine::ResponseEnd)),
            _ => {
                let len = u16::from_str_radix(len_str, 16)
                    .map_err(|_| GitError::InvalidPktLine("invalid length".to_string()))?
                    as usize;

                if len < 4 {
                    return Err(GitError::InvalidPktLine("length below minimum".to_string()));
                }

                let mut data = vec![0u8; len - 4];
                self.reader.read_exact(&mut data)?;
                Ok(Some(PktLine::Data(data)))
            }
        }
    }
}

/// Writer for pkt-line framed streams.
pub struct PktLineWriter<W> {
    writer: W,
}

impl<W: Write> PktLineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a packet.
    pub fn write(&mut self, pkt: &PktLine) -> Result<()> {
        self.writer.write_all(&pkt.encode())?;
        Ok(())
    }

    /// Writes a data line.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.write(&PktLine::Data(data.to_vec()))
    }

    /// Writes a flush packet.
    pub fn flush_pkt(&mut self) -> Result<()> {
        self.write(&PktLine::Flush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn encode_data_and_markers() {
        assert_eq!(PktLine::from_string("hello\n").encode(), b"000ahello\n");
        assert_eq!(PktLine::Flush.encode(), b"0000");
        assert_eq!(PktLine::Delimiter.encode(), b"0001");
        assert_eq!(PktLine::ResponseEnd.encode(), b"0002");
    }

    #[test]
    fn encode_service_announcement() {
        // 26 payload bytes + 4 for the prefix = 0x1e
        let pkt = PktLine::from_string("# service=git-upload-pack\n");
        let encoded = pkt.encode();
        assert_eq!(&encoded[..4], b"001e");
        assert_eq!(&encoded[4..], b"# service=git-upload-pack\n");
    }

    #[test]
    fn preamble_ends_with_flush() {
        let preamble = advertisement_preamble("receive-pack");
        assert!(preamble.starts_with(b"001f# service=git-receive-pack\n"));
        assert!(preamble.ends_with(b"0000"));
    }

    #[test]
    fn encode_empty_payload() {
        assert_eq!(PktLine::Data(Vec::new()).encode(), b"0004");
    }

    #[test]
    fn read_markers() {
        let mut reader = PktLineReader::new(Cursor::new(b"000000010002".to_vec()));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Flush));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Delimiter));
        assert_eq!(reader.read().unwrap(), Some(PktLine::ResponseEnd));
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn read_rejects_undersized_length() {
        let mut reader = PktLineReader::new(Cursor::new(b"0003".to_vec()));
        assert!(reader.read().is_err());
    }

    #[test]
    fn read_eof_on_empty_stream() {
        let mut reader = PktLineReader::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn writer_roundtrip() {
        let mut buf = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut buf);
            writer.write_data(b"want 0123\n").unwrap();
            writer.flush_pkt().unwrap();
        }

        let mut reader = PktLineReader::new(Cursor::new(buf));
        assert_eq!(
            reader.read().unwrap(),
            Some(PktLine::Data(b"want 0123\n".to_vec()))
        );
        assert_eq!(reader.read().unwrap(), Some(PktLine::Flush));
    }

    proptest! {
        #[test]
        fn roundtrip_recovers_payload(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let encoded = PktLine::Data(payload.clone()).encode();
            let mut reader = PktLineReader::new(Cursor::new(encoded));
            let decoded = reader.read().unwrap().unwrap();
            prop_assert_eq!(decoded.data().unwrap(), payload.as_slice());
        }
    }
}
