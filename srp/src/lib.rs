//! SRP-6a server-side primitive: RFC 5054's 2048-bit group, SHA-256.
//!
//! This crate only implements the server half of the handshake — deriving
//! a verifier for a new credential, and walking an existing credential
//! through ephemeral-key exchange and proof verification. It has no
//! knowledge of the wire format or of where credentials are stored.

mod error;
mod group;
mod hash;
mod server;

pub use error::SrpError;
pub use group::N_BYTES;
pub use server::{compute_verifier, SrpServer};
