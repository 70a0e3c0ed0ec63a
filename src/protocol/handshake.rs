//! WebSocket opening handshake (RFC 6455 Section 4).
//!
//! Covers both directions of the HTTP Upgrade mechanism: parsing and
//! validating a client request on the server side, and building a request /
//! checking the `Sec-WebSocket-Accept` echo on the client side. Only the
//! handshake bytes themselves are handled here; [`crate::Connection`] drives
//! the buffering.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};
use std::collections::HashMap;

use crate::config::Config;
use crate::error::HandshakeError;

/// The GUID appended to the client key in the accept computation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Headers whose duplication in a request is treated as an attack.
const SECURITY_HEADERS: [&str; 5] = [
    "host",
    "upgrade",
    "connection",
    "sec-websocket-key",
    "sec-websocket-version",
];

/// Computes the `Sec-WebSocket-Accept` value for a client key.
///
/// The accept key is `Base64(SHA-1(key + GUID))`.
///
/// # Example
///
/// ```
/// use wsforge::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// assert_eq!(compute_accept_key(key), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Generate a fresh `Sec-WebSocket-Key`: 16 random bytes, base64-encoded.
///
/// # Errors
///
/// Returns [`crate::Error::Entropy`] if the platform entropy source fails.
pub fn client_key() -> crate::Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce)?;
    Ok(BASE64.encode(nonce))
}

/// Generate a fresh 4-byte masking key for an outgoing frame.
///
/// # Errors
///
/// Returns [`crate::Error::Entropy`] if the platform entropy source fails.
pub fn masking_key() -> crate::Result<[u8; 4]> {
    let mut key = [0u8; 4];
    getrandom::getrandom(&mut key)?;
    Ok(key)
}

/// Parse HTTP headers into a case-insensitive map.
///
/// When `check_duplicates` is set, a repeated security-critical header is an
/// error rather than a silent overwrite.
fn parse_header_lines<'a, I>(
    lines: I,
    check_duplicates: bool,
) -> Result<HashMap<String, String>, HandshakeError>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers: HashMap<String, String> = HashMap::new();

    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name_lower = name.trim().to_lowercase();

            if check_duplicates
                && SECURITY_HEADERS.contains(&name_lower.as_str())
                && headers.contains_key(&name_lower)
            {
                return Err(HandshakeError::new(format!(
                    "duplicate header: {}",
                    name.trim()
                )));
            }

            headers.insert(name_lower, value.trim().to_string());
        }
    }

    Ok(headers)
}

fn validate_header_value(header: &str, value: &str) -> Result<(), HandshakeError> {
    if value.contains('\r') || value.contains('\n') {
        return Err(HandshakeError::new(format!(
            "{header} value contains CR or LF"
        )));
    }
    Ok(())
}

/// Parsed client handshake request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Request path, e.g. `/chat`.
    pub path: String,
    /// `Host` header value.
    pub host: String,
    /// `Sec-WebSocket-Key` header value.
    pub key: String,
    /// Versions the client offers, in the order they appeared.
    pub versions: Vec<String>,
    /// `Origin` header value, if any.
    pub origin: Option<String>,
    /// `Sec-WebSocket-Protocol` values, if any.
    pub protocols: Vec<String>,
}

impl HandshakeRequest {
    /// Parse a client handshake request from raw HTTP bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`HandshakeError`] if the data is not UTF-8, the request
    /// line is not `GET ... HTTP/1.1`, a required header is missing or
    /// malformed, or a security-critical header is duplicated.
    pub fn parse(data: &[u8]) -> Result<Self, HandshakeError> {
        let text = std::str::from_utf8(data)
            .map_err(|_| HandshakeError::new("request is not valid UTF-8"))?;

        let mut lines = text.lines();

        let request_line = lines
            .next()
            .ok_or_else(|| HandshakeError::new("empty request"))?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(HandshakeError::new("malformed request line"));
        }
        if parts[0] != "GET" {
            return Err(HandshakeError::new(format!(
                "expected GET method, got {}",
                parts[0]
            )));
        }
        if !parts[2].starts_with("HTTP/1.1") {
            return Err(HandshakeError::new(format!(
                "expected HTTP/1.1, got {}",
                parts[2]
            )));
        }
        let path = parts[1].to_string();

        let headers = parse_header_lines(lines, true)?;

        let upgrade = headers
            .get("upgrade")
            .ok_or_else(|| HandshakeError::new("missing Upgrade header"))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(HandshakeError::new(format!(
                "invalid Upgrade header: {upgrade}"
            )));
        }

        let connection = headers
            .get("connection")
            .ok_or_else(|| HandshakeError::new("missing Connection header"))?;
        if !connection.to_lowercase().contains("upgrade") {
            return Err(HandshakeError::new(format!(
                "invalid Connection header: {connection}"
            )));
        }

        let host = headers
            .get("host")
            .ok_or_else(|| HandshakeError::new("missing Host header"))?
            .clone();

        let key = headers
            .get("sec-websocket-key")
            .ok_or_else(|| HandshakeError::new("missing Sec-WebSocket-Key header"))?
            .clone();

        let versions = headers
            .get("sec-websocket-version")
            .ok_or_else(|| HandshakeError::new("missing Sec-WebSocket-Version header"))?
            .split(',')
            .map(|v| v.trim().to_string())
            .collect();

        let origin = headers.get("origin").cloned();

        let protocols = headers
            .get("sec-websocket-protocol")
            .map(|p| p.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        Ok(Self {
            path,
            host,
            key,
            versions,
            origin,
            protocols,
        })
    }

    /// Validate the request against the locally supported versions.
    ///
    /// Returns the negotiated version: the first entry of `supported` that
    /// the client also offered.
    ///
    /// # Errors
    ///
    /// Returns a [`HandshakeError`] carrying `supported` if no offered
    /// version is acceptable, the key does not decode to 16 bytes, or the
    /// host is empty.
    pub fn validate(&self, supported: &[String]) -> Result<String, HandshakeError> {
        let version = supported
            .iter()
            .find(|v| self.versions.contains(v))
            .cloned()
            .ok_or_else(|| {
                HandshakeError::new(format!(
                    "unsupported WebSocket version: {}",
                    self.versions.join(", ")
                ))
                .with_supported_versions(supported)
            })?;

        match BASE64.decode(&self.key) {
            Ok(decoded) if decoded.len() == 16 => {}
            Ok(decoded) => {
                return Err(HandshakeError::new(format!(
                    "Sec-WebSocket-Key must decode to 16 bytes, got {}",
                    decoded.len()
                )));
            }
            Err(_) => {
                return Err(HandshakeError::new(
                    "Sec-WebSocket-Key is not valid base64",
                ));
            }
        }

        if self.host.is_empty() {
            return Err(HandshakeError::new("Host header cannot be empty"));
        }

        Ok(version)
    }

    /// Build the HTTP request bytes for a client-initiated handshake.
    ///
    /// # Errors
    ///
    /// Returns a [`HandshakeError`] if `host` or `path` contain CR or LF.
    pub fn build(
        host: &str,
        path: &str,
        key: &str,
        version: &str,
    ) -> Result<Vec<u8>, HandshakeError> {
        validate_header_value("Host", host)?;
        validate_header_value("request path", path)?;

        let mut buf = Vec::new();
        buf.extend_from_slice(format!("GET {path} HTTP/1.1\r\n").as_bytes());
        buf.extend_from_slice(format!("Host: {host}\r\n").as_bytes());
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Key: {key}\r\n").as_bytes());
        buf.extend_from_slice(format!("Sec-WebSocket-Version: {version}\r\n").as_bytes());
        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }
}

/// Server handshake response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The `Sec-WebSocket-Accept` value.
    pub accept: String,
    /// Selected subprotocol, if any.
    pub protocol: Option<String>,
    /// The negotiated protocol version, if known.
    pub version: Option<String>,
}

impl HandshakeResponse {
    /// Create a response accepting a validated request.
    #[must_use]
    pub fn from_request(req: &HandshakeRequest) -> Self {
        Self {
            accept: compute_accept_key(&req.key),
            protocol: req.protocols.first().cloned(),
            version: None,
        }
    }

    /// Render the 101 Switching Protocols response bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`HandshakeError`] if the selected protocol or version
    /// contains CR/LF.
    pub fn write(&self) -> Result<Vec<u8>, HandshakeError> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Accept: {}\r\n", self.accept).as_bytes());
        if let Some(ref version) = self.version {
            validate_header_value("Sec-WebSocket-Version", version)?;
            buf.extend_from_slice(format!("Sec-WebSocket-Version: {version}\r\n").as_bytes());
        }
        if let Some(ref proto) = self.protocol {
            validate_header_value("Sec-WebSocket-Protocol", proto)?;
            buf.extend_from_slice(format!("Sec-WebSocket-Protocol: {proto}\r\n").as_bytes());
        }
        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }

    /// Parse a server response from raw HTTP bytes (client side).
    ///
    /// # Errors
    ///
    /// Returns a [`HandshakeError`] if the status is not 101, the Upgrade
    /// or Connection headers are wrong, or the accept header is missing.
    pub fn parse(data: &[u8]) -> Result<Self, HandshakeError> {
        let text = std::str::from_utf8(data)
            .map_err(|_| HandshakeError::new("response is not valid UTF-8"))?;

        let mut lines = text.lines();

        let status_line = lines
            .next()
            .ok_or_else(|| HandshakeError::new("empty response"))?;
        if !status_line.starts_with("HTTP/1.1 101") {
            return Err(HandshakeError::new(format!(
                "expected 101 status, got: {status_line}"
            )));
        }

        let headers = parse_header_lines(lines, false)?;

        let upgrade = headers
            .get("upgrade")
            .ok_or_else(|| HandshakeError::new("missing Upgrade header in response"))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(HandshakeError::new(format!(
                "invalid Upgrade header: {upgrade}"
            )));
        }

        let connection = headers
            .get("connection")
            .ok_or_else(|| HandshakeError::new("missing Connection header in response"))?;
        if !connection.to_lowercase().contains("upgrade") {
            return Err(HandshakeError::new(format!(
                "invalid Connection header: {connection}"
            )));
        }

        let accept = headers
            .get("sec-websocket-accept")
            .ok_or_else(|| HandshakeError::new("missing Sec-WebSocket-Accept header"))?
            .clone();

        let protocol = headers.get("sec-websocket-protocol").cloned();
        let version = headers.get("sec-websocket-version").cloned();

        Ok(Self {
            accept,
            protocol,
            version,
        })
    }
}

/// Outcome of a successful server-side handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandshake {
    /// The 101 response bytes to send back.
    pub response: Vec<u8>,
    /// The `Host` header the client sent.
    pub host: String,
    /// The `Origin` header, if any.
    pub origin: Option<String>,
    /// The subprotocol selected for the response, if any.
    pub protocol: Option<String>,
    /// The negotiated protocol version.
    pub version: String,
}

/// Run the full server-side handshake over a complete request.
///
/// # Errors
///
/// Any failure is returned as a [`HandshakeError`] with the configured
/// supported versions attached, ready to render via
/// [`HandshakeError::rejection_response`].
pub fn server_handshake(data: &[u8], config: &Config) -> Result<ServerHandshake, HandshakeError> {
    let attach = |e: HandshakeError| {
        if e.supported_versions.is_empty() {
            e.with_supported_versions(&config.supported_versions)
        } else {
            e
        }
    };

    let request = HandshakeRequest::parse(data).map_err(attach)?;
    let version = request
        .validate(&config.supported_versions)
        .map_err(attach)?;

    let mut response = HandshakeResponse::from_request(&request);
    response.version = Some(version.clone());
    let bytes = response.write().map_err(attach)?;

    Ok(ServerHandshake {
        response: bytes,
        host: request.host,
        origin: request.origin,
        protocol: response.protocol,
        version,
    })
}
