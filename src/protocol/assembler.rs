//! Reassembly of fragmented messages into complete [`Message`] values.

use bytes::BytesMut;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::{Frame, OpCode};

/// Accumulates data frames until a message is complete.
///
/// Control frames are ignored so they can be interleaved with fragments as
/// RFC 6455 permits. Fragment ordering violations are reported as errors and
/// leave the assembler reset.
#[derive(Debug)]
pub struct MessageAssembler {
    buffer: BytesMut,
    opcode: Option<OpCode>,
    fragment_count: usize,
    limits: Limits,
}

impl MessageAssembler {
    /// Create an assembler enforcing the given limits.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::new(),
            opcode: None,
            fragment_count: 0,
            limits,
        }
    }

    /// Whether a message is partially assembled.
    #[must_use]
    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }

    /// Discard any partially assembled message.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.opcode = None;
        self.fragment_count = 0;
    }

    /// Feed one frame; returns a complete message when FIN closes it.
    ///
    /// # Errors
    ///
    /// - `Error::BadFrameSequence` on a continuation with no message in
    ///   progress, or a new data frame while one is in progress
    /// - `Error::MessageTooLarge` / `Error::TooManyFragments` when limits
    ///   are exceeded
    /// - `Error::InvalidData` if a completed text message is not valid UTF-8
    pub fn push(&mut self, frame: &Frame) -> Result<Option<Message>> {
        if frame.opcode.is_control() {
            return Ok(None);
        }

        match frame.opcode {
            OpCode::Text | OpCode::Binary => {
                if self.opcode.is_some() {
                    self.reset();
                    return Err(Error::BadFrameSequence(
                        "received new data frame while a fragmented message is in progress".into(),
                    ));
                }
                self.opcode = Some(frame.opcode);
            }
            OpCode::Continuation => {
                if self.opcode.is_none() {
                    return Err(Error::BadFrameSequence(
                        "received continuation frame with no message in progress".into(),
                    ));
                }
            }
            _ => return Ok(None),
        }

        self.fragment_count += 1;
        if let Err(e) = self.check_limits(frame.payload().len()) {
            self.reset();
            return Err(e);
        }

        self.buffer.extend_from_slice(frame.payload());

        if !frame.fin {
            return Ok(None);
        }

        let opcode = self.opcode.take().unwrap_or(OpCode::Binary);
        let payload = self.buffer.split().freeze().to_vec();
        self.fragment_count = 0;

        let message = match opcode {
            OpCode::Text => {
                let text = String::from_utf8(payload).map_err(|_| {
                    Error::InvalidData("invalid utf-8 in text message".into())
                })?;
                Message::Text(text)
            }
            _ => Message::Binary(payload),
        };

        Ok(Some(message))
    }

    fn check_limits(&self, incoming: usize) -> Result<()> {
        self.limits.check_fragment_count(self.fragment_count)?;
        let size = self.buffer.len().saturating_add(incoming);
        self.limits.check_message_size(size)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> MessageAssembler {
        MessageAssembler::new(Limits::default())
    }

    #[test]
    fn test_single_text_frame() {
        let mut asm = assembler();
        let msg = asm.push(&Frame::text(b"hello".to_vec())).unwrap();
        assert_eq!(msg, Some(Message::Text("hello".to_string())));
        assert!(!asm.is_assembling());
    }

    #[test]
    fn test_single_binary_frame() {
        let mut asm = assembler();
        let msg = asm.push(&Frame::binary(vec![1, 2, 3])).unwrap();
        assert_eq!(msg, Some(Message::Binary(vec![1, 2, 3])));
    }

    #[test]
    fn test_fragmented_text_message() {
        let mut asm = assembler();

        let first = Frame::new(false, OpCode::Text, b"Hel".to_vec());
        assert_eq!(asm.push(&first).unwrap(), None);
        assert!(asm.is_assembling());

        let middle = Frame::new(false, OpCode::Continuation, b"lo ".to_vec());
        assert_eq!(asm.push(&middle).unwrap(), None);

        let last = Frame::new(true, OpCode::Continuation, b"World".to_vec());
        let msg = asm.push(&last).unwrap();
        assert_eq!(msg, Some(Message::Text("Hello World".to_string())));
        assert!(!asm.is_assembling());
    }

    #[test]
    fn test_control_frame_interleaved() {
        let mut asm = assembler();

        asm.push(&Frame::new(false, OpCode::Text, b"a".to_vec()))
            .unwrap();
        assert_eq!(asm.push(&Frame::ping(b"ping".to_vec())).unwrap(), None);
        assert!(asm.is_assembling());

        let msg = asm
            .push(&Frame::new(true, OpCode::Continuation, b"b".to_vec()))
            .unwrap();
        assert_eq!(msg, Some(Message::Text("ab".to_string())));
    }

    #[test]
    fn test_continuation_without_start() {
        let mut asm = assembler();
        let result = asm.push(&Frame::new(true, OpCode::Continuation, b"x".to_vec()));
        assert!(matches!(result, Err(Error::BadFrameSequence(_))));
    }

    #[test]
    fn test_new_data_frame_mid_message() {
        let mut asm = assembler();
        asm.push(&Frame::new(false, OpCode::Text, b"a".to_vec()))
            .unwrap();

        let result = asm.push(&Frame::text(b"interloper".to_vec()));
        assert!(matches!(result, Err(Error::BadFrameSequence(_))));
        // Error resets the assembler
        assert!(!asm.is_assembling());
    }

    #[test]
    fn test_message_too_large() {
        let limits = Limits {
            max_message_size: 10,
            ..Limits::default()
        };
        let mut asm = MessageAssembler::new(limits);

        asm.push(&Frame::new(false, OpCode::Binary, vec![0u8; 8]))
            .unwrap();
        let result = asm.push(&Frame::new(true, OpCode::Continuation, vec![0u8; 8]));
        assert!(matches!(result, Err(Error::MessageTooLarge { .. })));
        assert!(!asm.is_assembling());
    }

    #[test]
    fn test_too_many_fragments() {
        let limits = Limits {
            max_fragment_count: 3,
            ..Limits::default()
        };
        let mut asm = MessageAssembler::new(limits);

        asm.push(&Frame::new(false, OpCode::Text, b"a".to_vec()))
            .unwrap();
        asm.push(&Frame::new(false, OpCode::Continuation, b"b".to_vec()))
            .unwrap();
        asm.push(&Frame::new(false, OpCode::Continuation, b"c".to_vec()))
            .unwrap();
        let result = asm.push(&Frame::new(true, OpCode::Continuation, b"d".to_vec()));
        assert!(matches!(result, Err(Error::TooManyFragments { .. })));
    }

    #[test]
    fn test_invalid_utf8_text_message() {
        let mut asm = assembler();
        let result = asm.push(&Frame::text(vec![0xff, 0xfe, 0xfd]));
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_invalid_utf8_split_across_fragments() {
        // A valid 2-byte sequence split so each fragment alone is invalid,
        // but the whole message decodes fine.
        let mut asm = assembler();
        asm.push(&Frame::new(false, OpCode::Text, vec![0xc3])).unwrap();
        let msg = asm
            .push(&Frame::new(true, OpCode::Continuation, vec![0xa9]))
            .unwrap();
        assert_eq!(msg, Some(Message::Text("é".to_string())));
    }

    #[test]
    fn test_empty_text_message() {
        let mut asm = assembler();
        let msg = asm.push(&Frame::text(Vec::new())).unwrap();
        assert_eq!(msg, Some(Message::Text(String::new())));
    }

    #[test]
    fn test_reset_discards_partial_message() {
        let mut asm = assembler();
        asm.push(&Frame::new(false, OpCode::Text, b"partial".to_vec()))
            .unwrap();
        asm.reset();
        assert!(!asm.is_assembling());

        // A fresh message assembles cleanly afterwards
        let msg = asm.push(&Frame::text(b"clean".to_vec())).unwrap();
        assert_eq!(msg, Some(Message::Text("clean".to_string())));
    }
}
