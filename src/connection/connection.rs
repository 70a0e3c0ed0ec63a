//! Sans-IO connection driver.

use std::collections::VecDeque;

use bytes::{Buf, BytesMut};

use crate::config::Config;
use crate::error::{Error, HandshakeError, Result};
use crate::message::{CloseCode, Message};
use crate::protocol::assembler::MessageAssembler;
use crate::protocol::frame::Frame;
use crate::protocol::handshake::{
    self, HandshakeRequest, HandshakeResponse, compute_accept_key, server_handshake,
};
use crate::protocol::opcode::OpCode;

use super::role::Role;
use super::state::ConnectionState;

type DataSender = Box<dyn FnMut(&[u8])>;
type OpenHandler = Box<dyn FnMut()>;
type CloseHandler = Box<dyn FnMut(Option<CloseCode>, Option<String>)>;
type MessageHandler = Box<dyn FnMut(Message)>;
type FrameHandler = Box<dyn FnMut(&Frame)>;
type PongHandler = Box<dyn FnOnce()>;

/// A WebSocket protocol engine for one connection.
///
/// The engine owns no socket: the caller feeds received bytes in with
/// [`feed`](Connection::feed) and registers a data sender that receives the
/// bytes to transmit. Handlers fire synchronously from within `feed`.
///
/// The engine is single-threaded by construction; callers serialize access.
///
/// ```no_run
/// use wsforge::{Config, Connection, Message};
///
/// let mut conn = Connection::server(Config::default());
/// conn.set_data_sender(|bytes| { /* write to the transport */ });
/// conn.on_message(|msg| println!("got {msg:?}"));
/// # let received: &[u8] = &[];
/// conn.feed(received)?;
/// # Ok::<(), wsforge::Error>(())
/// ```
pub struct Connection {
    role: Role,
    config: Config,
    state: ConnectionState,
    recv_buf: BytesMut,
    assembler: MessageAssembler,
    pending_pongs: VecDeque<PongHandler>,
    data_sender: Option<DataSender>,
    on_open: Option<OpenHandler>,
    on_close: Option<CloseHandler>,
    on_message: Option<MessageHandler>,
    on_message_frame: Option<FrameHandler>,
    close_emitted: bool,
    // Client side: the accept value the server must echo.
    expected_accept: Option<String>,
    host: Option<String>,
    origin: Option<String>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("buffered", &self.recv_buf.len())
            .field("pending_pongs", &self.pending_pongs.len())
            .finish_non_exhaustive()
    }
}

impl Connection {
    fn new(role: Role, config: Config) -> Self {
        let assembler = MessageAssembler::new(config.limits.clone());
        Self {
            role,
            config,
            state: ConnectionState::Opening,
            recv_buf: BytesMut::new(),
            assembler,
            pending_pongs: VecDeque::new(),
            data_sender: None,
            on_open: None,
            on_close: None,
            on_message: None,
            on_message_frame: None,
            close_emitted: false,
            expected_accept: None,
            host: None,
            origin: None,
        }
    }

    /// Create a client-side engine in the `Opening` state.
    #[must_use]
    pub fn client(config: Config) -> Self {
        Self::new(Role::Client, config)
    }

    /// Create a server-side engine in the `Opening` state.
    #[must_use]
    pub fn server(config: Config) -> Self {
        Self::new(Role::Server, config)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The endpoint role this engine was created with.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// The `Host` header seen during the handshake, if any.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The `Origin` header seen during the handshake, if any.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Register the callback that receives bytes to transmit.
    pub fn set_data_sender(&mut self, sender: impl FnMut(&[u8]) + 'static) {
        self.data_sender = Some(Box::new(sender));
    }

    /// Register the handler fired once when the connection opens.
    pub fn on_open(&mut self, handler: impl FnMut() + 'static) {
        self.on_open = Some(Box::new(handler));
    }

    /// Register the handler fired once when the connection closes.
    pub fn on_close(&mut self, handler: impl FnMut(Option<CloseCode>, Option<String>) + 'static) {
        self.on_close = Some(Box::new(handler));
    }

    /// Register the handler for complete, reassembled messages.
    pub fn on_message(&mut self, handler: impl FnMut(Message) + 'static) {
        self.on_message = Some(Box::new(handler));
    }

    /// Register the handler for raw data frames.
    ///
    /// When this is the only message handler, reassembly is skipped and
    /// frames are delivered as they arrive. When [`on_message`] is also
    /// registered, both fire.
    ///
    /// [`on_message`]: Connection::on_message
    pub fn on_message_frame(&mut self, handler: impl FnMut(&Frame) + 'static) {
        self.on_message_frame = Some(Box::new(handler));
    }

    /// Feed bytes received from the transport into the engine.
    ///
    /// While `Opening`, bytes are buffered until the handshake terminator
    /// arrives; leftover bytes past the terminator are processed as frames.
    /// While `Open` or `Closing`, complete frames are decoded and dispatched;
    /// a trailing partial frame is kept for the next call. After `Closed`,
    /// input is silently discarded.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidData` if `data` is empty
    /// - `Error::HandshakeTooLarge` / `Error::Handshake` during `Opening`
    /// - Fatal protocol violations (bad opcode, bad fragment sequence,
    ///   oversized control frame, invalid UTF-8, limit breaches); the
    ///   connection is failed before the error is returned
    pub fn feed(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidData("empty input buffer".into()));
        }
        if self.state == ConnectionState::Closed {
            return Ok(());
        }

        self.recv_buf.extend_from_slice(data);

        if self.state == ConnectionState::Opening {
            self.drive_handshake()?;
            if self.state != ConnectionState::Open {
                return Ok(());
            }
        }

        self.drive_frames()
    }

    /// Initiate (or complete) the client handshake: generate a key, remember
    /// the expected accept value, and send the upgrade request.
    ///
    /// # Errors
    ///
    /// - `Error::NotOpen` unless the connection is still `Opening`
    /// - `Error::NoDataSender` if no sender is registered
    /// - `Error::Entropy` / `Error::Handshake` on key or request failures
    pub fn send_handshake_request(&mut self, host: &str, path: &str) -> Result<()> {
        if self.state != ConnectionState::Opening {
            return Err(Error::NotOpen(self.state));
        }
        if self.data_sender.is_none() {
            return Err(Error::NoDataSender);
        }

        let key = handshake::client_key()?;
        self.expected_accept = Some(compute_accept_key(&key));
        self.host = Some(host.to_string());

        let version = self
            .config
            .supported_versions
            .first()
            .cloned()
            .unwrap_or_else(|| "13".to_string());
        let request = HandshakeRequest::build(host, path, &key, &version)?;
        self.send_raw(&request)
    }

    /// Send a message on an open connection.
    ///
    /// The payload is split per `Config::frame_size`, masked when the role
    /// requires it, and handed to the data sender frame by frame.
    ///
    /// # Errors
    ///
    /// - `Error::NotOpen` unless the state is `Open`
    /// - `Error::NoDataSender` if no sender is registered
    pub fn send(&mut self, message: Message) -> Result<()> {
        if !self.state.can_send() {
            return Err(Error::NotOpen(self.state));
        }
        if self.data_sender.is_none() {
            return Err(Error::NoDataSender);
        }

        let opcode = if message.is_text() {
            OpCode::Text
        } else {
            OpCode::Binary
        };
        let payload = message.into_payload();
        let frames = Frame::for_message(opcode, &payload, self.config.frame_size)?;
        for frame in frames {
            self.send_frame(frame)?;
        }
        Ok(())
    }

    /// Send a ping with no interest in the response.
    ///
    /// # Errors
    ///
    /// Same conditions as [`send`](Connection::send), plus
    /// `Error::ControlFrameTooLarge` for payloads over 125 bytes.
    pub fn ping(&mut self, payload: impl Into<Vec<u8>>) -> Result<()> {
        self.send_ping(payload.into(), None)
    }

    /// Send a ping and run `callback` when its pong arrives.
    ///
    /// Callbacks fire in ping order: the peer answers pings in the order it
    /// received them, so each arriving pong settles the oldest outstanding
    /// ping.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ping`](Connection::ping).
    pub fn ping_with(
        &mut self,
        payload: impl Into<Vec<u8>>,
        callback: impl FnOnce() + 'static,
    ) -> Result<()> {
        self.send_ping(payload.into(), Some(Box::new(callback)))
    }

    fn send_ping(&mut self, payload: Vec<u8>, callback: Option<PongHandler>) -> Result<()> {
        if !self.state.can_send() {
            return Err(Error::NotOpen(self.state));
        }
        if self.data_sender.is_none() {
            return Err(Error::NoDataSender);
        }

        let frame = Frame::ping(payload);
        frame.validate()?;
        self.send_frame(frame)?;
        if let Some(cb) = callback {
            self.pending_pongs.push_back(cb);
        }
        Ok(())
    }

    /// Send an unsolicited pong.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ping`](Connection::ping).
    pub fn pong(&mut self, payload: impl Into<Vec<u8>>) -> Result<()> {
        if !self.state.can_send() {
            return Err(Error::NotOpen(self.state));
        }
        if self.data_sender.is_none() {
            return Err(Error::NoDataSender);
        }
        let frame = Frame::pong(payload.into());
        frame.validate()?;
        self.send_frame(frame)
    }

    /// Initiate the closing handshake.
    ///
    /// While `Open`, sends a close frame and moves to `Closing`; the close
    /// completes (and `on_close` fires) when the peer's echo arrives. While
    /// `Opening`, abandons the attempt and moves straight to `Closed`
    /// without sending anything. A no-op in `Closing` and `Closed`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidMessage` for reserved close codes (1004-1006, 1015)
    /// - `Error::NoDataSender` if the state is `Open` and no sender is
    ///   registered
    pub fn close(&mut self, code: CloseCode, reason: &str) -> Result<()> {
        if code.is_reserved() {
            return Err(Error::InvalidMessage(format!(
                "close code {} is reserved and cannot be sent",
                code.as_u16()
            )));
        }

        match self.state {
            ConnectionState::Opening => {
                self.state = ConnectionState::Closed;
                self.recv_buf.clear();
                self.emit_close(Some(code), Some(reason.to_string()));
                Ok(())
            }
            ConnectionState::Open => {
                if self.data_sender.is_none() {
                    return Err(Error::NoDataSender);
                }
                let frame = Frame::close(Some(code.as_u16()), reason);
                self.send_frame(frame)?;
                self.state = ConnectionState::Closing;
                Ok(())
            }
            ConnectionState::Closing | ConnectionState::Closed => Ok(()),
        }
    }

    // Handshake buffering and completion for both roles.
    fn drive_handshake(&mut self) -> Result<()> {
        let terminator = find_terminator(&self.recv_buf);
        let buffered = terminator.unwrap_or(self.recv_buf.len());
        if let Err(e) = self.config.limits.check_handshake_size(buffered) {
            // Oversized handshake ends the attempt; keeping the buffer
            // would let a peer grow it without bound.
            if self.role == Role::Server {
                let rejection = HandshakeError::new("handshake exceeds the configured size limit")
                    .rejection_response();
                if let Some(sender) = self.data_sender.as_mut() {
                    sender(&rejection);
                }
            }
            self.state = ConnectionState::Closed;
            self.recv_buf.clear();
            return Err(e);
        }
        let Some(end) = terminator else {
            return Ok(());
        };

        let head = self.recv_buf.split_to(end).freeze();

        match self.role {
            Role::Server => {
                match server_handshake(&head, &self.config) {
                    Ok(hs) => {
                        self.host = Some(hs.host);
                        self.origin = hs.origin;
                        self.send_raw(&hs.response)?;
                        self.open();
                        Ok(())
                    }
                    Err(e) => {
                        // Best-effort rejection; the attempt is over either way.
                        let rejection = e.rejection_response();
                        if let Some(sender) = self.data_sender.as_mut() {
                            sender(&rejection);
                        }
                        self.state = ConnectionState::Closed;
                        self.recv_buf.clear();
                        Err(Error::Handshake(e))
                    }
                }
            }
            Role::Client => {
                let result = self.check_server_response(&head);
                if let Err(e) = result {
                    self.state = ConnectionState::Closed;
                    self.recv_buf.clear();
                    return Err(Error::Handshake(e));
                }
                self.open();
                Ok(())
            }
        }
    }

    fn check_server_response(&self, head: &[u8]) -> std::result::Result<(), HandshakeError> {
        let expected = self
            .expected_accept
            .as_deref()
            .ok_or_else(|| HandshakeError::new("no handshake request was sent"))?;
        let response = HandshakeResponse::parse(head)?;
        if response.accept != expected {
            return Err(HandshakeError::new(format!(
                "Sec-WebSocket-Accept mismatch: expected {expected}, got {}",
                response.accept
            )));
        }
        Ok(())
    }

    fn open(&mut self) {
        self.state = ConnectionState::Open;
        if let Some(cb) = self.on_open.as_mut() {
            cb();
        }
    }

    // Decode and dispatch every complete frame in the receive buffer.
    fn drive_frames(&mut self) -> Result<()> {
        while self.state.can_receive() && !self.recv_buf.is_empty() {
            let (frame, consumed) = match Frame::parse(&self.recv_buf) {
                Ok(parsed) => parsed,
                Err(Error::Truncated { .. }) => return Ok(()),
                Err(e) => return self.fail(CloseCode::ProtocolError, e),
            };
            self.recv_buf.advance(consumed);
            self.dispatch(frame)?;
        }
        if self.state == ConnectionState::Closed {
            self.recv_buf.clear();
        }
        Ok(())
    }

    fn dispatch(&mut self, frame: Frame) -> Result<()> {
        if let Err(e) = frame.validate() {
            return self.fail(CloseCode::ProtocolError, e);
        }

        match frame.opcode {
            OpCode::Reserved(op) => self.fail(CloseCode::ProtocolError, Error::BadFrameOp(op)),
            OpCode::Ping => {
                // Answered even while Closing; control frames need no Open.
                let pong = Frame::pong(frame.into_payload());
                self.send_frame(pong)?;
                Ok(())
            }
            OpCode::Pong => {
                if let Some(cb) = self.pending_pongs.pop_front() {
                    cb();
                }
                Ok(())
            }
            OpCode::Close => self.handle_close(&frame),
            OpCode::Text | OpCode::Binary | OpCode::Continuation => self.handle_data(&frame),
        }
    }

    fn handle_close(&mut self, frame: &Frame) -> Result<()> {
        let (code, reason) = match frame.close_status() {
            Ok(status) => status,
            Err(e) => return self.fail(CloseCode::ProtocolError, e),
        };
        let code = code.map(CloseCode::from_u16);

        if self.state == ConnectionState::Open {
            // Peer-initiated close: echo and finish, no Closing detour.
            let echo = Frame::close(
                code.map(|c| c.as_u16()),
                reason.as_deref().unwrap_or_default(),
            );
            if self.data_sender.is_some() {
                self.send_frame(echo)?;
            }
        }

        self.state = ConnectionState::Closed;
        self.recv_buf.clear();
        self.emit_close(code, reason);
        Ok(())
    }

    fn handle_data(&mut self, frame: &Frame) -> Result<()> {
        if let Some(cb) = self.on_message_frame.as_mut() {
            cb(frame);
        }

        // Reassembly runs unless frame delivery is the only consumer; it
        // still enforces sequencing and size limits when it runs.
        let buffer_message = self.on_message.is_some() || self.on_message_frame.is_none();
        if !buffer_message {
            return Ok(());
        }

        match self.assembler.push(frame) {
            Ok(Some(message)) => {
                if let Some(cb) = self.on_message.as_mut() {
                    cb(message);
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                let code = match e {
                    Error::InvalidData(_) => CloseCode::InvalidPayload,
                    Error::MessageTooLarge { .. } | Error::TooManyFragments { .. } => {
                        CloseCode::MessageTooBig
                    }
                    _ => CloseCode::ProtocolError,
                };
                self.fail(code, e)
            }
        }
    }

    // Terminate the connection after a protocol violation and surface `err`.
    fn fail(&mut self, code: CloseCode, err: Error) -> Result<()> {
        if self.state == ConnectionState::Open && self.data_sender.is_some() {
            let frame = Frame::close(Some(code.as_u16()), &err.to_string());
            // Best effort; the violation is reported regardless.
            let _ = self.send_frame(frame);
        }
        self.state = ConnectionState::Closed;
        self.recv_buf.clear();
        self.assembler.reset();
        self.pending_pongs.clear();
        self.emit_close(Some(code), Some(err.to_string()));
        Err(err)
    }

    fn emit_close(&mut self, code: Option<CloseCode>, reason: Option<String>) {
        if self.close_emitted {
            return;
        }
        self.close_emitted = true;
        if let Some(cb) = self.on_close.as_mut() {
            cb(code, reason);
        }
    }

    fn send_frame(&mut self, mut frame: Frame) -> Result<()> {
        if self.role.must_mask() {
            frame.masking_key = Some(handshake::masking_key()?);
        }
        let bytes = frame.encode()?;
        self.send_raw(&bytes)
    }

    fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let sender = self.data_sender.as_mut().ok_or(Error::NoDataSender)?;
        sender(bytes);
        Ok(())
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}
