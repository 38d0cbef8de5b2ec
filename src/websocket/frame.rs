//! RFC 6455 frame layout.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |           (16/64)             |
//! |N|V|V|V|       |S|             |  (if payload len==126/127)    |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |                               |  Masking-key, if MASK set     |
//! +-------------------------------+-------------------------------+
//! |                         Payload Data                          |
//! +---------------------------------------------------------------+
//! ```

/// Frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl Opcode {
    pub(crate) const fn from_u8(byte: u8) -> Option<Self> {
        match byte & 0x0F {
            0x0 => Some(Opcode::Continuation),
            0x1 => Some(Opcode::Text),
            0x2 => Some(Opcode::Binary),
            0x8 => Some(Opcode::Close),
            0x9 => Some(Opcode::Ping),
            0xA => Some(Opcode::Pong),
            _ => None,
        }
    }
}

/// Type of an outgoing message; decides the opcode of its first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageKind {
    Text,
    Binary,
}

impl MessageKind {
    #[inline]
    const fn opcode(self) -> Opcode {
        match self {
            MessageKind::Text => Opcode::Text,
            MessageKind::Binary => Opcode::Binary,
        }
    }
}

/// Close frame with no status code: `FIN | Close`, zero length.
pub(crate) const CLOSE_FRAME: [u8; 2] = [0x88, 0x00];

/// Appends `payload` to `out` as one message split into frames of at most
/// `max_chunk_size` payload bytes.
///
/// The first frame carries the message opcode and the following ones
/// `Continuation`; only the last frame has `FIN` set. An empty payload is a
/// single empty frame. Server frames are never masked.
pub(crate) fn encode_message(
    kind: MessageKind,
    payload: &[u8],
    max_chunk_size: usize,
    out: &mut Vec<u8>,
) {
    if payload.is_empty() {
        write_header(out, true, kind.opcode(), 0);
        return;
    }

    let mut chunks = payload.chunks(max_chunk_size.max(1)).peekable();
    let mut opcode = kind.opcode();

    while let Some(chunk) = chunks.next() {
        let fin = chunks.peek().is_none();

        write_header(out, fin, opcode, chunk.len() as u64);
        out.extend_from_slice(chunk);

        opcode = Opcode::Continuation;
    }
}

#[inline]
fn write_header(out: &mut Vec<u8>, fin: bool, opcode: Opcode, len: u64) {
    out.push(if fin { 0x80 } else { 0x00 } | opcode as u8);

    if len < 126 {
        out.push(len as u8);
    } else if len < 65536 {
        out.push(126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(127);
        out.extend_from_slice(&len.to_be_bytes());
    }
}

/// Decoded frame header; the payload follows at `header_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub(crate) fin: bool,
    /// Raw 4-bit opcode; unknown values are rejected by the reader.
    pub(crate) opcode: u8,
    pub(crate) mask: Option<[u8; 4]>,
    pub(crate) payload_len: u64,
    pub(crate) header_len: usize,
}

impl FrameHeader {
    /// Decodes the header at the start of `data`.
    ///
    /// Returns `None` while `data` is too short to hold the whole header.
    /// The reserved bits are ignored.
    pub(crate) fn decode(data: &[u8]) -> Option<Self> {
        let [first, second, rest @ ..] = data else {
            return None;
        };

        let (payload_len, rest, ext_len) = match second & 0x7F {
            126 => {
                let (ext, rest) = rest.split_first_chunk::<2>()?;
                (u16::from_be_bytes(*ext) as u64, rest, 2)
            }
            127 => {
                let (ext, rest) = rest.split_first_chunk::<8>()?;
                (u64::from_be_bytes(*ext), rest, 8)
            }
            len => (len as u64, rest, 0),
        };

        let mask = match second & 0x80 != 0 {
            true => Some(*rest.first_chunk::<4>()?),
            false => None,
        };

        Some(FrameHeader {
            fin: first & 0x80 != 0,
            opcode: first & 0x0F,
            mask,
            payload_len,
            header_len: 2 + ext_len + if mask.is_some() { 4 } else { 0 },
        })
    }
}

/// XORs every payload byte with `key[i % 4]`; applying it twice restores
/// the input.
#[inline]
pub(crate) fn unmask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(data: &[u8]) -> Vec<(FrameHeader, &[u8])> {
        let mut frames = Vec::new();
        let mut rest = data;

        while !rest.is_empty() {
            let header = FrameHeader::decode(rest).unwrap();
            let end = header.header_len + header.payload_len as usize;

            frames.push((header, &rest[header.header_len..end]));
            rest = &rest[end..];
        }

        frames
    }

    #[test]
    fn opcodes() {
        #[rustfmt::skip]
        let cases = [
            (0x0, Some(Opcode::Continuation)),
            (0x1, Some(Opcode::Text)),
            (0x2, Some(Opcode::Binary)),
            (0x8, Some(Opcode::Close)),
            (0x9, Some(Opcode::Ping)),
            (0xA, Some(Opcode::Pong)),
            (0x81, Some(Opcode::Text)),

            (0x3, None),
            (0xB, None),
            (0xF, None),
        ];

        for (byte, expected) in cases {
            assert_eq!(Opcode::from_u8(byte), expected, "{byte:#x}");
        }
    }

    #[test]
    fn length_encodings() {
        #[rustfmt::skip]
        let cases: [(usize, &[u8]); 6] = [
            (0,      &[0x81, 0]),
            (5,      &[0x81, 5]),
            (125,    &[0x81, 125]),
            (126,    &[0x81, 126, 0, 126]),
            (65535,  &[0x81, 126, 0xFF, 0xFF]),
            (65536,  &[0x81, 127, 0, 0, 0, 0, 0, 1, 0, 0]),
        ];

        for (len, header) in cases {
            let mut out = Vec::new();
            encode_message(MessageKind::Text, &vec![b'a'; len], usize::MAX, &mut out);

            assert_eq!(&out[..header.len()], header, "{len}");
            assert_eq!(out.len(), header.len() + len, "{len}");
        }
    }

    #[test]
    fn chunked_message() {
        let mut out = Vec::new();
        encode_message(MessageKind::Binary, b"0123456789", 4, &mut out);

        let frames = frames(&out);
        let summary: Vec<_> = frames
            .iter()
            .map(|(h, payload)| (h.fin, h.opcode, *payload))
            .collect();

        #[rustfmt::skip]
        let expected: [(bool, u8, &[u8]); 3] = [
            (false, 0x2, b"0123"),
            (false, 0x0, b"4567"),
            (true,  0x0, b"89"),
        ];

        assert_eq!(summary, expected);
        assert!(frames.iter().all(|(h, _)| h.mask.is_none()));
    }

    #[test]
    fn single_chunk_when_it_fits() {
        for (kind, opcode) in [(MessageKind::Text, 0x81), (MessageKind::Binary, 0x82)] {
            let mut out = Vec::new();
            encode_message(kind, b"abcd", 4, &mut out);

            assert_eq!(out, [opcode, 4, b'a', b'b', b'c', b'd']);
        }
    }

    #[test]
    fn decode_headers() {
        #[rustfmt::skip]
        let cases: [(&[u8], Option<(bool, u8, Option<[u8; 4]>, u64, usize)>); 8] = [
            (&[0x81, 0x85, 1, 2, 3, 4],       Some((true,  1, Some([1, 2, 3, 4]), 5, 6))),
            (&[0x01, 0x03],                   Some((false, 1, None, 3, 2))),
            (&[0xF1, 0x00],                   Some((true,  1, None, 0, 2))),
            (&[0x88, 0x80, 9, 9, 9, 9],       Some((true,  8, Some([9, 9, 9, 9]), 0, 6))),
            (&[0x82, 0xFE, 1, 0, 1, 2, 3, 4], Some((true,  2, Some([1, 2, 3, 4]), 256, 8))),

            (&[0x81],                         None),
            (&[0x81, 0xFE, 1],                None),
            (&[0x81, 0x85, 1, 2, 3],          None),
        ];

        for (data, expected) in cases {
            let got = FrameHeader::decode(data)
                .map(|h| (h.fin, h.opcode, h.mask, h.payload_len, h.header_len));

            assert_eq!(got, expected, "{data:?}");
        }
    }

    #[test]
    fn decode_64bit_length() {
        let mut data = vec![0x82, 0xFF];
        data.extend_from_slice(&(1u64 << 32).to_be_bytes());
        data.extend_from_slice(&[0xA, 0xB, 0xC, 0xD]);

        let header = FrameHeader::decode(&data).unwrap();
        assert_eq!(header.payload_len, 1 << 32);
        assert_eq!(header.header_len, 14);
        assert_eq!(header.mask, Some([0xA, 0xB, 0xC, 0xD]));
    }

    #[test]
    fn masking() {
        let key = [0x37, 0xFA, 0x21, 0x3D];
        let mut payload = b"Hello".to_vec();

        unmask(&mut payload, key);
        assert_eq!(payload, [0x7F, 0x9F, 0x4D, 0x51, 0x58]);

        unmask(&mut payload, key);
        assert_eq!(payload, b"Hello");
    }
}
