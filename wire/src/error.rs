use thiserror::Error;

/// Everything that can go wrong decoding a datagram into a [`crate::Message`].
///
/// Every variant is distinct on purpose: the handler layer maps some of
/// these to a reply (`ErrorUser`/`ErrorSession`) and the rest to a silent
/// drop, and it needs to tell them apart to do that.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("datagram too short: need {need} bytes, have {have}")]
    ShortRead { need: usize, have: usize },

    #[error("unrecognized message header {0:#010X}")]
    UnknownHeader(u32),

    /// Protocol version 1 was a real, once-supported version. It is
    /// rejected distinctly from an unrecognized version so callers can
    /// report "please update your client" rather than a generic parse
    /// failure.
    #[error("protocol version 1 is no longer accepted")]
    UnsupportedVersion,

    #[error("unrecognized protocol version {0}")]
    UnknownVersion(u8),

    #[error("length prefix claims {claimed} bytes but only {remaining} remain")]
    LengthOverflow { claimed: usize, remaining: usize },

    #[error("string field is missing its NUL terminator")]
    MissingTerminator,
}

/// Returned by the fallible constructors on outgoing message types when a
/// field would not fit its wire length prefix.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EncodeError {
    #[error("salt is {0} bytes, longer than the 255-byte length prefix allows")]
    SaltTooLong(usize),

    #[error("field is {0} bytes, longer than the 65535-byte length prefix allows")]
    FieldTooLong(usize),
}
