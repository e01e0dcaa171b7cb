use crate::cursor::{Reader, Writer};
use crate::error::{DecodeError, EncodeError};

/// The only protocol version this service speaks on the wire today.
pub const PROTOCOL_VERSION: u8 = 2;

/// A protocol version this service used to speak. Rejected with a distinct
/// error from any other unrecognized version so a caller can tell "client
/// needs to update" apart from "client sent garbage".
const REJECTED_VERSION: u8 = 1;

pub const HEADER_SERVER_NEGOTIATE: u32 = 0xD003CA01;
pub const HEADER_SERVER_EPHEMERAL: u32 = 0xD003CA02;
pub const HEADER_SERVER_PROOF: u32 = 0xD003CA03;
pub const HEADER_AUTH_NEGOTIATE: u32 = 0xD003CA10;
pub const HEADER_AUTH_EPHEMERAL: u32 = 0xD003CA20;
pub const HEADER_AUTH_PROOF: u32 = 0xD003CA30;
pub const HEADER_ERROR_USER: u32 = 0xD003CAFF;
pub const HEADER_ERROR_SESSION: u32 = 0xD003CAEE;

fn check_header(r: &mut Reader<'_>, expected: u32) -> Result<(), DecodeError> {
    let header = r.u32_le()?;
    if header != expected {
        return Err(DecodeError::UnknownHeader(header));
    }
    Ok(())
}

fn check_version(r: &mut Reader<'_>) -> Result<(), DecodeError> {
    let version = r.u8()?;
    if version == REJECTED_VERSION {
        return Err(DecodeError::UnsupportedVersion);
    }
    if version != PROTOCOL_VERSION {
        return Err(DecodeError::UnknownVersion(version));
    }
    Ok(())
}

/// Sent by the game server to begin a login attempt on behalf of a
/// connecting client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNegotiate {
    pub client_session: u32,
    pub username: String,
}

impl ServerNegotiate {
    pub const HEADER: u32 = HEADER_SERVER_NEGOTIATE;

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32_le(Self::HEADER);
        w.u8(PROTOCOL_VERSION);
        w.u32_le(self.client_session);
        w.cstring(&self.username);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        check_header(&mut r, Self::HEADER)?;
        check_version(&mut r)?;
        let client_session = r.u32_le()?;
        let username = r.cstring()?;
        Ok(Self {
            client_session,
            username,
        })
    }
}

/// Our reply to `ServerNegotiate`: a fresh session id and the user's salt,
/// so the client can derive its own ephemeral public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthNegotiate {
    pub client_session: u32,
    pub session: u32,
    pub salt: Vec<u8>,
    pub username: String,
}

impl AuthNegotiate {
    pub const HEADER: u32 = HEADER_AUTH_NEGOTIATE;

    pub fn new(
        client_session: u32,
        session: u32,
        salt: Vec<u8>,
        username: String,
    ) -> Result<Self, EncodeError> {
        if salt.len() > u8::MAX as usize {
            return Err(EncodeError::SaltTooLong(salt.len()));
        }
        Ok(Self {
            client_session,
            session,
            salt,
            username,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32_le(Self::HEADER);
        w.u8(PROTOCOL_VERSION);
        w.u32_le(self.client_session);
        w.u32_le(self.session);
        w.u8(self.salt.len() as u8);
        w.bytes(&self.salt);
        w.cstring(&self.username);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        check_header(&mut r, Self::HEADER)?;
        check_version(&mut r)?;
        let client_session = r.u32_le()?;
        let session = r.u32_le()?;
        let salt_len = r.u8()? as usize;
        let salt = r.length_prefixed(salt_len)?.to_vec();
        let username = r.cstring()?;
        Ok(Self {
            client_session,
            session,
            salt,
            username,
        })
    }
}

/// Carries the client's SRP public ephemeral `A`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEphemeral {
    pub session: u32,
    pub a_pub: Vec<u8>,
}

impl ServerEphemeral {
    pub const HEADER: u32 = HEADER_SERVER_EPHEMERAL;

    pub fn new(session: u32, a_pub: Vec<u8>) -> Result<Self, EncodeError> {
        if a_pub.len() > u16::MAX as usize {
            return Err(EncodeError::FieldTooLong(a_pub.len()));
        }
        Ok(Self { session, a_pub })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32_le(Self::HEADER);
        w.u32_le(self.session);
        w.u16_le(self.a_pub.len() as u16);
        w.bytes(&self.a_pub);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        check_header(&mut r, Self::HEADER)?;
        let session = r.u32_le()?;
        let len = r.u16_le()? as usize;
        let a_pub = r.length_prefixed(len)?.to_vec();
        Ok(Self { session, a_pub })
    }
}

/// Carries our SRP public ephemeral `B`, replying to `ServerEphemeral`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEphemeral {
    pub session: u32,
    pub b_pub: Vec<u8>,
}

impl AuthEphemeral {
    pub const HEADER: u32 = HEADER_AUTH_EPHEMERAL;

    pub fn new(session: u32, b_pub: Vec<u8>) -> Result<Self, EncodeError> {
        if b_pub.len() > u16::MAX as usize {
            return Err(EncodeError::FieldTooLong(b_pub.len()));
        }
        Ok(Self { session, b_pub })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32_le(Self::HEADER);
        w.u32_le(self.session);
        w.u16_le(self.b_pub.len() as u16);
        w.bytes(&self.b_pub);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        check_header(&mut r, Self::HEADER)?;
        let session = r.u32_le()?;
        let len = r.u16_le()? as usize;
        let b_pub = r.length_prefixed(len)?.to_vec();
        Ok(Self { session, b_pub })
    }
}

/// Carries the client's SRP proof `M1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProof {
    pub session: u32,
    pub m1: Vec<u8>,
}

impl ServerProof {
    pub const HEADER: u32 = HEADER_SERVER_PROOF;

    pub fn new(session: u32, m1: Vec<u8>) -> Result<Self, EncodeError> {
        if m1.len() > u16::MAX as usize {
            return Err(EncodeError::FieldTooLong(m1.len()));
        }
        Ok(Self { session, m1 })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32_le(Self::HEADER);
        w.u32_le(self.session);
        w.u16_le(self.m1.len() as u16);
        w.bytes(&self.m1);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        check_header(&mut r, Self::HEADER)?;
        let session = r.u32_le()?;
        let len = r.u16_le()? as usize;
        let m1 = r.length_prefixed(len)?.to_vec();
        Ok(Self { session, m1 })
    }
}

/// Carries our SRP proof `M2`, replying to `ServerProof`. Successful
/// delivery of this message completes the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthProof {
    pub session: u32,
    pub m2: Vec<u8>,
}

impl AuthProof {
    pub const HEADER: u32 = HEADER_AUTH_PROOF;

    pub fn new(session: u32, m2: Vec<u8>) -> Result<Self, EncodeError> {
        if m2.len() > u16::MAX as usize {
            return Err(EncodeError::FieldTooLong(m2.len()));
        }
        Ok(Self { session, m2 })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32_le(Self::HEADER);
        w.u32_le(self.session);
        w.u16_le(self.m2.len() as u16);
        w.bytes(&self.m2);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        check_header(&mut r, Self::HEADER)?;
        let session = r.u32_le()?;
        let len = r.u16_le()? as usize;
        let m2 = r.length_prefixed(len)?.to_vec();
        Ok(Self { session, m2 })
    }
}

/// Reports that the username in a `ServerNegotiate` does not exist (or the
/// negotiate was malformed in a user-identifying way, e.g. an outdated
/// protocol version). Keyed by the client's own session id, since the
/// server never allocated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorUser {
    pub client_session: u32,
}

impl ErrorUser {
    pub const HEADER: u32 = HEADER_ERROR_USER;

    pub fn new(client_session: u32) -> Self {
        Self { client_session }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32_le(Self::HEADER);
        w.u32_le(self.client_session);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        check_header(&mut r, Self::HEADER)?;
        let client_session = r.u32_le()?;
        Ok(Self { client_session })
    }
}

/// Reports that `session` is not in a state that can accept the message
/// that was just received: expired, never existed, already authenticated,
/// out of sequence, or carrying a bad SRP value. These are all folded into
/// one wire code on purpose — see the store/session error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSession {
    pub session: u32,
}

impl ErrorSession {
    pub const HEADER: u32 = HEADER_ERROR_SESSION;

    pub fn new(session: u32) -> Self {
        Self { session }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32_le(Self::HEADER);
        w.u32_le(self.session);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        check_header(&mut r, Self::HEADER)?;
        let session = r.u32_le()?;
        Ok(Self { session })
    }
}

/// Any message this codec understands, for round-trip testing and for
/// callers that want full decode dispatch rather than a handler that
/// already knows which type it expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    ServerNegotiate(ServerNegotiate),
    AuthNegotiate(AuthNegotiate),
    ServerEphemeral(ServerEphemeral),
    AuthEphemeral(AuthEphemeral),
    ServerProof(ServerProof),
    AuthProof(AuthProof),
    ErrorUser(ErrorUser),
    ErrorSession(ErrorSession),
}

impl Message {
    /// Reads the 4-byte header and dispatches to the matching type's
    /// decoder. A datagram shorter than the header is a `ShortRead`; a
    /// header that matches none of the eight known messages is an
    /// `UnknownHeader`.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < 4 {
            return Err(DecodeError::ShortRead {
                need: 4,
                have: buf.len(),
            });
        }
        let header = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        match header {
            HEADER_SERVER_NEGOTIATE => ServerNegotiate::decode(buf).map(Message::ServerNegotiate),
            HEADER_AUTH_NEGOTIATE => AuthNegotiate::decode(buf).map(Message::AuthNegotiate),
            HEADER_SERVER_EPHEMERAL => ServerEphemeral::decode(buf).map(Message::ServerEphemeral),
            HEADER_AUTH_EPHEMERAL => AuthEphemeral::decode(buf).map(Message::AuthEphemeral),
            HEADER_SERVER_PROOF => ServerProof::decode(buf).map(Message::ServerProof),
            HEADER_AUTH_PROOF => AuthProof::decode(buf).map(Message::AuthProof),
            HEADER_ERROR_USER => ErrorUser::decode(buf).map(Message::ErrorUser),
            HEADER_ERROR_SESSION => ErrorSession::decode(buf).map(Message::ErrorSession),
            other => Err(DecodeError::UnknownHeader(other)),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Message::ServerNegotiate(m) => m.encode(),
            Message::AuthNegotiate(m) => m.encode(),
            Message::ServerEphemeral(m) => m.encode(),
            Message::AuthEphemeral(m) => m.encode(),
            Message::ServerProof(m) => m.encode(),
            Message::AuthProof(m) => m.encode(),
            Message::ErrorUser(m) => m.encode(),
            Message::ErrorSession(m) => m.encode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn roundtrip(m: Message) {
        let bytes = m.encode();
        assert_eq!(Message::decode(&bytes).unwrap(), m);
    }

    #[test]
    fn roundtrips_server_negotiate() {
        roundtrip(Message::ServerNegotiate(ServerNegotiate {
            client_session: 42,
            username: "player1".into(),
        }));
    }

    #[test]
    fn roundtrips_auth_negotiate() {
        roundtrip(Message::AuthNegotiate(
            AuthNegotiate::new(42, 7, vec![1, 2, 3, 4], "player1".into()).unwrap(),
        ));
    }

    #[test]
    fn roundtrips_ephemeral_pair() {
        roundtrip(Message::ServerEphemeral(
            ServerEphemeral::new(7, vec![0xAB; 256]).unwrap(),
        ));
        roundtrip(Message::AuthEphemeral(
            AuthEphemeral::new(7, vec![0xCD; 256]).unwrap(),
        ));
    }

    #[test]
    fn roundtrips_proof_pair() {
        roundtrip(Message::ServerProof(
            ServerProof::new(7, vec![0x11; 32]).unwrap(),
        ));
        roundtrip(Message::AuthProof(AuthProof::new(7, vec![0x22; 32]).unwrap()));
    }

    #[test]
    fn roundtrips_errors() {
        roundtrip(Message::ErrorUser(ErrorUser::new(42)));
        roundtrip(Message::ErrorSession(ErrorSession::new(7)));
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut bytes = ServerNegotiate {
            client_session: 1,
            username: "a".into(),
        }
        .encode();
        bytes.extend_from_slice(&[0u8; 16]);
        let decoded = ServerNegotiate::decode(&bytes).unwrap();
        assert_eq!(decoded.username, "a");
    }

    #[test_case(&[] ; "empty datagram")]
    #[test_case(&[0x01] ; "single byte")]
    #[test_case(&[0x01, 0xCA, 0x03] ; "three bytes")]
    fn short_datagrams_are_rejected(bytes: &[u8]) {
        assert_eq!(
            Message::decode(bytes),
            Err(DecodeError::ShortRead {
                need: 4,
                have: bytes.len()
            })
        );
    }

    #[test]
    fn unknown_header_is_rejected() {
        let bytes = 0xDEADBEEFu32.to_le_bytes();
        assert_eq!(
            Message::decode(&bytes),
            Err(DecodeError::UnknownHeader(0xDEADBEEF))
        );
    }

    #[test]
    fn version_one_is_rejected_distinctly() {
        let mut bytes = HEADER_SERVER_NEGOTIATE.to_le_bytes().to_vec();
        bytes.push(1); // version
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.push(0); // empty cstring
        assert_eq!(
            ServerNegotiate::decode(&bytes),
            Err(DecodeError::UnsupportedVersion)
        );
    }

    #[test]
    fn unrecognized_version_is_generic() {
        let mut bytes = HEADER_SERVER_NEGOTIATE.to_le_bytes().to_vec();
        bytes.push(255); // version
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.push(0);
        assert_eq!(
            ServerNegotiate::decode(&bytes),
            Err(DecodeError::UnknownVersion(255))
        );
    }

    #[test]
    fn salt_length_exceeding_buffer_is_length_overflow() {
        let mut bytes = HEADER_AUTH_NEGOTIATE.to_le_bytes().to_vec();
        bytes.push(PROTOCOL_VERSION);
        bytes.extend_from_slice(&1u32.to_le_bytes()); // client_session
        bytes.extend_from_slice(&2u32.to_le_bytes()); // session
        bytes.push(200); // saltLen claims 200 bytes
        bytes.extend_from_slice(&[0u8; 4]); // far fewer actually present
        assert_eq!(
            AuthNegotiate::decode(&bytes),
            Err(DecodeError::LengthOverflow {
                claimed: 200,
                remaining: 4,
            })
        );
    }

    #[test]
    fn missing_nul_terminator_is_rejected() {
        let mut bytes = HEADER_SERVER_NEGOTIATE.to_le_bytes().to_vec();
        bytes.push(PROTOCOL_VERSION);
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(b"no-terminator");
        assert_eq!(
            ServerNegotiate::decode(&bytes),
            Err(DecodeError::MissingTerminator)
        );
    }

    #[test]
    fn salt_too_long_is_rejected_at_construction() {
        assert_eq!(
            AuthNegotiate::new(1, 2, vec![0u8; 256], "x".into()),
            Err(EncodeError::SaltTooLong(256))
        );
    }
}
