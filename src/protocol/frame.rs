//! WebSocket frame parsing and serialization (RFC 6455 Section 5.2).
//!
//! The codec is pure and stateless: it maps between byte buffers and
//! [`Frame`] values one frame at a time, without I/O and without mutating
//! its input.

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask_fast;

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

#[derive(Debug, Clone)]
struct FrameHeader {
    fin: bool,
    rsv1: bool,
    rsv2: bool,
    rsv3: bool,
    opcode: OpCode,
    mask: Option<[u8; 4]>,
    payload_len: usize,
    header_len: usize,
}

/// Parse the fixed and extended header fields from the front of `buf`.
///
/// # Errors
///
/// - `Error::Truncated` if the buffer ends before the header does
/// - `Error::PayloadTooLarge` if the declared length exceeds `usize`
fn parse_header(buf: &[u8]) -> Result<FrameHeader> {
    if buf.len() < 2 {
        return Err(Error::Truncated {
            needed: 2 - buf.len(),
        });
    }

    let byte0 = buf[0];
    let byte1 = buf[1];

    let fin = (byte0 & 0x80) != 0;
    let rsv1 = (byte0 & 0x40) != 0;
    let rsv2 = (byte0 & 0x20) != 0;
    let rsv3 = (byte0 & 0x10) != 0;
    let opcode = OpCode::from_u8(byte0 & 0x0F)?;

    let masked = (byte1 & 0x80) != 0;
    let len7 = byte1 & 0x7F;

    let (payload_len, header_size) = match len7 {
        0..=125 => (len7 as usize, 2),
        126 => {
            if buf.len() < 4 {
                return Err(Error::Truncated {
                    needed: 4 - buf.len(),
                });
            }
            (u16::from_be_bytes([buf[2], buf[3]]) as usize, 4)
        }
        127 => {
            if buf.len() < 10 {
                return Err(Error::Truncated {
                    needed: 10 - buf.len(),
                });
            }
            let len64 = u64::from_be_bytes([
                buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
            ]);
            let len = usize::try_from(len64).map_err(|_| Error::PayloadTooLarge {
                size: u128::from(len64),
            })?;
            (len, 10)
        }
        _ => unreachable!(),
    };

    let total_header_size = if masked { header_size + 4 } else { header_size };

    if masked && buf.len() < total_header_size {
        return Err(Error::Truncated {
            needed: total_header_size - buf.len(),
        });
    }

    let mask = if masked {
        Some([
            buf[header_size],
            buf[header_size + 1],
            buf[header_size + 2],
            buf[header_size + 3],
        ])
    } else {
        None
    };

    Ok(FrameHeader {
        fin,
        rsv1,
        rsv2,
        rsv3,
        opcode,
        mask,
        payload_len,
        header_len: total_header_size,
    })
}

/// A single WebSocket frame.
///
/// `payload` always holds the logical (unmasked) bytes: parsing removes the
/// mask, encoding applies it. The masking key is carried alongside so a
/// parsed frame re-encodes identically.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                 Masking key (if present)                      |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// Reserved bit 1. Preserved but not interpreted (no extensions).
    pub rsv1: bool,
    /// Reserved bit 2. Preserved but not interpreted.
    pub rsv2: bool,
    /// Reserved bit 3. Preserved but not interpreted.
    pub rsv3: bool,
    /// Frame opcode defining the interpretation of the payload.
    pub opcode: OpCode,
    /// Masking key; present iff the wire form of this frame is masked.
    pub masking_key: Option<[u8; 4]>,
    /// Logical (unmasked) payload bytes.
    payload: Vec<u8>,
}

impl Frame {
    /// Create a new unmasked frame.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            masking_key: None,
            payload,
        }
    }

    /// Create a final text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data.into())
    }

    /// Create a final binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, data.into())
    }

    /// Create a close frame with optional status code and reason.
    #[must_use]
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = if let Some(code) = code {
            let mut data = code.to_be_bytes().to_vec();
            data.extend_from_slice(reason.as_bytes());
            data
        } else {
            Vec::new()
        };
        Self::new(true, OpCode::Close, payload)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, data.into())
    }

    /// Attach a masking key, marking the frame for masked encoding.
    #[must_use]
    pub fn masked(mut self, key: [u8; 4]) -> Self {
        self.masking_key = Some(key);
        self
    }

    /// Get the logical payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Parse one frame from the front of `buf`.
    ///
    /// Returns the parsed frame and the number of bytes consumed. The input
    /// buffer is never mutated; masked payloads are copied out and unmasked.
    ///
    /// # Errors
    ///
    /// - `Error::Truncated` if fewer bytes are available than the header
    ///   declares (buffer more and retry; not a protocol violation)
    /// - `Error::PayloadTooLarge` if the declared length exceeds `usize`
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        let header = parse_header(buf)?;

        let total_size = header
            .header_len
            .checked_add(header.payload_len)
            .ok_or(Error::PayloadTooLarge {
                size: header.payload_len as u128,
            })?;

        if buf.len() < total_size {
            return Err(Error::Truncated {
                needed: total_size - buf.len(),
            });
        }

        let mut payload = buf[header.header_len..total_size].to_vec();
        if let Some(key) = header.mask {
            apply_mask_fast(&mut payload, key);
        }

        let frame = Frame {
            fin: header.fin,
            rsv1: header.rsv1,
            rsv2: header.rsv2,
            rsv3: header.rsv3,
            opcode: header.opcode,
            masking_key: header.mask,
            payload,
        };

        Ok((frame, total_size))
    }

    /// Parse as many complete frames as `buf` holds, in wire order.
    ///
    /// Returns the frames and the number of bytes consumed; a trailing
    /// partial frame is left unconsumed for the caller to re-buffer.
    ///
    /// # Errors
    ///
    /// Propagates any non-truncation parse error.
    pub fn parse_all(buf: &[u8]) -> Result<(Vec<Self>, usize)> {
        let mut frames = Vec::new();
        let mut consumed = 0;

        while consumed < buf.len() {
            match Self::parse(&buf[consumed..]) {
                Ok((frame, len)) => {
                    frames.push(frame);
                    consumed += len;
                }
                Err(Error::Truncated { .. }) => break,
                Err(e) => return Err(e),
            }
        }

        Ok((frames, consumed))
    }

    /// Encode the frame to its wire form.
    ///
    /// Applies the masking key, if any, to the payload bytes in the output;
    /// `self` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` if the payload length does not fit
    /// the 64-bit extended length field (unreachable in practice, kept for
    /// explicitness).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload_len = self.payload.len();
        u64::try_from(payload_len).map_err(|_| Error::PayloadTooLarge {
            size: payload_len as u128,
        })?;

        let mut buf = Vec::with_capacity(self.wire_size());

        let mut byte0 = self.opcode.as_u8();
        if self.fin {
            byte0 |= 0x80;
        }
        if self.rsv1 {
            byte0 |= 0x40;
        }
        if self.rsv2 {
            byte0 |= 0x20;
        }
        if self.rsv3 {
            byte0 |= 0x10;
        }
        buf.push(byte0);

        let mask_bit = if self.masking_key.is_some() { 0x80 } else { 0 };
        if payload_len <= 125 {
            buf.push(mask_bit | payload_len as u8);
        } else if payload_len <= 65535 {
            buf.push(mask_bit | 126);
            buf.extend_from_slice(&(payload_len as u16).to_be_bytes());
        } else {
            buf.push(mask_bit | 127);
            buf.extend_from_slice(&(payload_len as u64).to_be_bytes());
        }

        if let Some(key) = self.masking_key {
            buf.extend_from_slice(&key);
            let payload_start = buf.len();
            buf.extend_from_slice(&self.payload);
            apply_mask_fast(&mut buf[payload_start..], key);
        } else {
            buf.extend_from_slice(&self.payload);
        }

        Ok(buf)
    }

    /// Split a message payload into a legal frame sequence.
    ///
    /// The first frame carries `opcode`, every subsequent frame is a
    /// continuation, and only the last has `fin` set. `frame_size` caps the
    /// payload bytes per frame; `None` disables splitting. An empty payload
    /// yields exactly one empty final frame.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidMessage` if `opcode` is not `Text` or `Binary`
    /// - `Error::InvalidFrameSize` if `frame_size` is `Some(0)`
    pub fn for_message(
        opcode: OpCode,
        payload: &[u8],
        frame_size: Option<usize>,
    ) -> Result<Vec<Self>> {
        if !matches!(opcode, OpCode::Text | OpCode::Binary) {
            return Err(Error::InvalidMessage(format!(
                "message opcode must be Text or Binary, got {opcode}"
            )));
        }
        let chunk_size = match frame_size {
            Some(0) => return Err(Error::InvalidFrameSize),
            Some(n) => n,
            None => usize::MAX,
        };

        if payload.is_empty() {
            return Ok(vec![Self::new(true, opcode, Vec::new())]);
        }

        let mut frames = Vec::with_capacity(payload.len().div_ceil(chunk_size.max(1)));
        let mut framed = 0;

        while framed < payload.len() {
            let end = framed.saturating_add(chunk_size).min(payload.len());
            let op = if frames.is_empty() {
                opcode
            } else {
                OpCode::Continuation
            };
            frames.push(Self::new(
                end == payload.len(),
                op,
                payload[framed..end].to_vec(),
            ));
            framed = end;
        }

        Ok(frames)
    }

    /// Validate frame structure according to RFC 6455.
    ///
    /// # Errors
    ///
    /// - `Error::FragmentedControlFrame` if a control frame has FIN=0
    /// - `Error::ControlFrameTooLarge` if a control payload exceeds 125 bytes
    pub fn validate(&self) -> Result<()> {
        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::FragmentedControlFrame);
            }
            if self.payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::ControlFrameTooLarge(self.payload.len()));
            }
        }
        Ok(())
    }

    /// Size of the encoded wire form in bytes.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        let payload_len = self.payload.len();
        let extended_len_size = if payload_len <= 125 {
            0
        } else if payload_len <= 65535 {
            2
        } else {
            8
        };
        let mask_size = if self.masking_key.is_some() { 4 } else { 0 };
        2 + extended_len_size + mask_size + payload_len
    }

    /// Parse the status code and reason from a close frame payload.
    ///
    /// Returns `(None, None)` for an empty payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidData` if the payload is a single byte (a
    /// non-empty close payload must carry a full 16-bit status code).
    pub fn close_status(&self) -> Result<(Option<u16>, Option<String>)> {
        let payload = self.payload();
        match payload.len() {
            0 => Ok((None, None)),
            1 => Err(Error::InvalidData(
                "close payload must be empty or at least 2 bytes".into(),
            )),
            _ => {
                let code = u16::from_be_bytes([payload[0], payload[1]]);
                let reason = std::str::from_utf8(&payload[2..]).ok().and_then(|s| {
                    if s.is_empty() {
                        None
                    } else {
                        Some(s.to_owned())
                    }
                });
                Ok((Some(code), reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unmasked_text_frame() {
        // FIN=1, opcode=1 (text), unmasked, payload="Hello"
        let data = &[0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f];
        let (frame, len) = Frame::parse(data).unwrap();
        assert_eq!(len, 7);
        assert!(frame.fin);
        assert!(!frame.rsv1);
        assert!(!frame.rsv2);
        assert!(!frame.rsv3);
        assert_eq!(frame.opcode, OpCode::Text);
        assert_eq!(frame.masking_key, None);
        assert_eq!(frame.payload(), b"Hello");
    }

    #[test]
    fn test_parse_masked_text_frame() {
        // Mask key 0x37fa213d over "Hello" per the RFC example
        let data = &[
            0x81, 0x85, // FIN + Text, MASK + len=5
            0x37, 0xfa, 0x21, 0x3d, // Mask key
            0x7f, 0x9f, 0x4d, 0x51, 0x58, // Masked "Hello"
        ];
        let (frame, len) = Frame::parse(data).unwrap();
        assert_eq!(len, 11);
        assert!(frame.fin);
        assert_eq!(frame.opcode, OpCode::Text);
        assert_eq!(frame.masking_key, Some([0x37, 0xfa, 0x21, 0x3d]));
        assert_eq!(frame.payload(), b"Hello");
    }

    #[test]
    fn test_parse_does_not_mutate_input() {
        let data = vec![
            0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58,
        ];
        let snapshot = data.clone();
        let _ = Frame::parse(&data).unwrap();
        assert_eq!(data, snapshot);
    }

    #[test]
    fn test_parse_reserved_opcode_roundtrips() {
        // FIN=1, opcode=0x3 (reserved non-control)
        let data = &[0x83, 0x02, 0xaa, 0xbb];
        let (frame, _) = Frame::parse(data).unwrap();
        assert_eq!(frame.opcode, OpCode::Reserved(0x3));
        assert_eq!(frame.encode().unwrap(), data.to_vec());
    }

    #[test]
    fn test_parse_continuation_frame() {
        let data = &[0x80, 0x02, 0x6c, 0x6f];
        let (frame, len) = Frame::parse(data).unwrap();
        assert_eq!(len, 4);
        assert!(frame.fin);
        assert_eq!(frame.opcode, OpCode::Continuation);
        assert_eq!(frame.payload(), b"lo");
    }

    #[test]
    fn test_parse_extended_length_16bit() {
        let mut data = vec![0x82, 0x7e, 0x01, 0x00]; // len=256
        data.extend(vec![0xab; 256]);

        let (frame, len) = Frame::parse(&data).unwrap();
        assert_eq!(len, 4 + 256);
        assert_eq!(frame.opcode, OpCode::Binary);
        assert_eq!(frame.payload().len(), 256);
    }

    #[test]
    fn test_parse_extended_length_64bit() {
        let mut data = vec![0x82, 0x7f];
        data.extend(65536u64.to_be_bytes());
        data.extend(vec![0xcd; 65536]);

        let (frame, len) = Frame::parse(&data).unwrap();
        assert_eq!(len, 10 + 65536);
        assert_eq!(frame.payload().len(), 65536);
    }

    #[test]
    fn test_parse_truncated_header() {
        let data = &[0x81];
        assert!(matches!(
            Frame::parse(data),
            Err(Error::Truncated { needed: 1 })
        ));
    }

    #[test]
    fn test_parse_truncated_payload() {
        // len=5 but only 3 payload bytes present
        let data = &[0x81, 0x05, 0x48, 0x65, 0x6c];
        assert!(matches!(
            Frame::parse(data),
            Err(Error::Truncated { needed: 2 })
        ));
    }

    #[test]
    fn test_parse_truncated_extended_length() {
        let data = &[0x82, 0x7e, 0x01];
        assert!(matches!(
            Frame::parse(data),
            Err(Error::Truncated { needed: 1 })
        ));

        let data = &[0x82, 0x7f, 0x00, 0x00, 0x00];
        assert!(matches!(
            Frame::parse(data),
            Err(Error::Truncated { needed: 5 })
        ));
    }

    #[test]
    fn test_parse_truncated_mask_key() {
        let data = &[0x81, 0x85, 0x37, 0xfa];
        assert!(matches!(Frame::parse(data), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_parse_all_wire_order() {
        let mut data = Frame::text(b"one".to_vec()).encode().unwrap();
        data.extend(Frame::binary(vec![1, 2]).encode().unwrap());
        data.extend(Frame::ping(b"p".to_vec()).encode().unwrap());

        let (frames, consumed) = Frame::parse_all(&data).unwrap();
        assert_eq!(consumed, data.len());
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].opcode, OpCode::Text);
        assert_eq!(frames[1].opcode, OpCode::Binary);
        assert_eq!(frames[2].opcode, OpCode::Ping);
    }

    #[test]
    fn test_parse_all_retains_partial_tail() {
        let mut data = Frame::text(b"whole".to_vec()).encode().unwrap();
        let whole_len = data.len();
        let partial = Frame::binary(vec![0xaa; 10]).encode().unwrap();
        data.extend(&partial[..partial.len() - 3]);

        let (frames, consumed) = Frame::parse_all(&data).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(consumed, whole_len);
    }

    #[test]
    fn test_parse_all_empty() {
        let (frames, consumed) = Frame::parse_all(&[]).unwrap();
        assert!(frames.is_empty());
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_encode_unmasked_text_frame() {
        let frame = Frame::text(b"Hello".to_vec());
        let buf = frame.encode().unwrap();
        assert_eq!(buf, vec![0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f]);
    }

    #[test]
    fn test_encode_masked_text_frame() {
        let frame = Frame::text(b"Hello".to_vec()).masked([0x37, 0xfa, 0x21, 0x3d]);
        let buf = frame.encode().unwrap();

        assert_eq!(buf.len(), 11);
        assert_eq!(buf[0], 0x81);
        assert_eq!(buf[1], 0x85); // MASK + len=5
        assert_eq!(&buf[2..6], &[0x37, 0xfa, 0x21, 0x3d]);
        assert_eq!(&buf[6..11], &[0x7f, 0x9f, 0x4d, 0x51, 0x58]);
        // The logical payload is untouched
        assert_eq!(frame.payload(), b"Hello");
    }

    #[test]
    fn test_length_field_boundaries() {
        // 125: direct 7-bit length
        let buf = Frame::binary(vec![0xab; 125]).encode().unwrap();
        assert_eq!(buf[1], 125);
        assert_eq!(buf.len(), 2 + 125);

        // 126: 16-bit extended
        let buf = Frame::binary(vec![0xab; 126]).encode().unwrap();
        assert_eq!(buf[1], 126);
        assert_eq!(&buf[2..4], &126u16.to_be_bytes());
        assert_eq!(buf.len(), 4 + 126);

        // 65535: still 16-bit
        let buf = Frame::binary(vec![0xab; 65535]).encode().unwrap();
        assert_eq!(buf[1], 126);
        assert_eq!(&buf[2..4], &65535u16.to_be_bytes());
        assert_eq!(buf.len(), 4 + 65535);

        // 65536: 64-bit extended
        let buf = Frame::binary(vec![0xab; 65536]).encode().unwrap();
        assert_eq!(buf[1], 127);
        assert_eq!(&buf[2..10], &65536u64.to_be_bytes());
        assert_eq!(buf.len(), 10 + 65536);
    }

    #[test]
    fn test_roundtrip_unmasked() {
        let original = Frame::text(b"WebSocket roundtrip test!".to_vec());
        let buf = original.encode().unwrap();
        let (parsed, consumed) = Frame::parse(&buf).unwrap();

        assert_eq!(consumed, buf.len());
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_roundtrip_masked() {
        let original = Frame::text(b"Masked roundtrip test!".to_vec()).masked([0x12, 0x34, 0x56, 0x78]);
        let buf = original.encode().unwrap();
        let (parsed, consumed) = Frame::parse(&buf).unwrap();

        assert_eq!(consumed, buf.len());
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_roundtrip_rsv_bits() {
        let mut original = Frame::binary(vec![9, 9, 9]);
        original.rsv1 = true;
        original.rsv3 = true;

        let buf = original.encode().unwrap();
        assert_eq!(buf[0] & 0x70, 0x50);

        let (parsed, _) = Frame::parse(&buf).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_for_message_splits_payload() {
        let frames = Frame::for_message(OpCode::Text, b"hello world", Some(4)).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].opcode, OpCode::Text);
        assert_eq!(frames[1].opcode, OpCode::Continuation);
        assert_eq!(frames[2].opcode, OpCode::Continuation);
        assert_eq!(frames[0].payload(), b"hell");
        assert_eq!(frames[1].payload(), b"o wo");
        assert_eq!(frames[2].payload(), b"rld");
        assert!(!frames[0].fin);
        assert!(!frames[1].fin);
        assert!(frames[2].fin);
    }

    #[test]
    fn test_for_message_unbounded() {
        let frames = Frame::for_message(OpCode::Binary, &[0xcd; 100_000], None).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fin);
        assert_eq!(frames[0].payload().len(), 100_000);
    }

    #[test]
    fn test_for_message_exact_multiple() {
        let frames = Frame::for_message(OpCode::Binary, &[1u8; 30], Some(10)).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[2].fin);
        assert_eq!(frames[2].payload().len(), 10);
    }

    #[test]
    fn test_for_message_empty_payload() {
        let frames = Frame::for_message(OpCode::Text, b"", Some(4)).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fin);
        assert_eq!(frames[0].opcode, OpCode::Text);
        assert!(frames[0].payload().is_empty());
    }

    #[test]
    fn test_for_message_zero_frame_size() {
        let result = Frame::for_message(OpCode::Text, b"data", Some(0));
        assert!(matches!(result, Err(Error::InvalidFrameSize)));
    }

    #[test]
    fn test_for_message_rejects_control_opcode() {
        let result = Frame::for_message(OpCode::Ping, b"data", None);
        assert!(matches!(result, Err(Error::InvalidMessage(_))));
    }

    #[test]
    fn test_validate_fragmented_control_frame() {
        let mut frame = Frame::ping(b"test".to_vec());
        frame.fin = false;
        assert!(matches!(
            frame.validate(),
            Err(Error::FragmentedControlFrame)
        ));
    }

    #[test]
    fn test_validate_control_frame_too_large() {
        let frame = Frame::ping(vec![0u8; 126]);
        assert!(matches!(
            frame.validate(),
            Err(Error::ControlFrameTooLarge(126))
        ));
    }

    #[test]
    fn test_validate_ok() {
        assert!(Frame::text(b"x".to_vec()).validate().is_ok());
        assert!(Frame::ping(vec![0u8; 125]).validate().is_ok());
        assert!(Frame::close(Some(1000), "bye").validate().is_ok());
    }

    #[test]
    fn test_close_frame_payload_layout() {
        let frame = Frame::close(Some(1000), "Normal closure");
        let payload = frame.payload();
        assert_eq!(u16::from_be_bytes([payload[0], payload[1]]), 1000);
        assert_eq!(&payload[2..], b"Normal closure");
    }

    #[test]
    fn test_close_status() {
        let frame = Frame::close(Some(1001), "going away");
        assert_eq!(
            frame.close_status().unwrap(),
            (Some(1001), Some("going away".to_string()))
        );

        let frame = Frame::close(None, "");
        assert_eq!(frame.close_status().unwrap(), (None, None));

        let frame = Frame::new(true, OpCode::Close, vec![0x03]);
        assert!(matches!(frame.close_status(), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_wire_size_matches_encode() {
        for (payload_len, masked) in [(0, false), (5, true), (125, false), (126, true), (65535, false), (65536, false)] {
            let mut frame = Frame::binary(vec![0u8; payload_len]);
            if masked {
                frame = frame.masked([1, 2, 3, 4]);
            }
            assert_eq!(frame.wire_size(), frame.encode().unwrap().len());
        }
    }

    #[test]
    fn test_declared_length_exceeding_memory_is_error_not_panic() {
        let mut data = vec![0x82, 0xFF];
        data.extend_from_slice(&u64::MAX.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        // Truncated on 64-bit, PayloadTooLarge on 32-bit; never a panic
        assert!(Frame::parse(&data).is_err());
    }
}
