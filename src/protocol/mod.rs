//! WebSocket protocol core (RFC 6455): framing, masking, reassembly, and
//! the opening handshake.

pub mod assembler;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use assembler::MessageAssembler;
pub use frame::{Frame, MAX_CONTROL_FRAME_PAYLOAD};
pub use handshake::{
    HandshakeRequest, HandshakeResponse, ServerHandshake, WS_GUID, compute_accept_key,
    server_handshake,
};
pub use mask::{apply_mask, apply_mask_fast};
pub use opcode::OpCode;
