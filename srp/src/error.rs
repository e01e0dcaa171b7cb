use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SrpError {
    /// The client's public ephemeral `A` reduces to zero mod `N`. A real
    /// client never produces this; it only happens from a forged or
    /// corrupted value, and accepting it would let an attacker force a
    /// predictable shared key.
    #[error("client public ephemeral is invalid (A mod N == 0)")]
    InvalidPublicEphemeral,

    /// The scrambling parameter `u = H(PAD(A) || PAD(B))` reduced to zero.
    /// Astronomically unlikely with honest input.
    #[error("derived scrambling parameter u is zero")]
    InvalidScramblingParameter,

    /// `get_b_pub`/`verify_client_authenticator`/etc. called before the
    /// session reached the state that produces the value being asked for.
    #[error("session is not ready for this operation yet")]
    NotReady,
}
