use num_bigint::BigUint;
use num_traits::Zero;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::error::SrpError;
use crate::group::{pad_biguint, G, N};
use crate::hash::{hash_to_biguint, sha256, xor32};

/// Derives a fresh `(salt, verifier)` pair for a new credential, per
/// `x = H(salt || H(username ":" password))`, `verifier = g^x mod N`.
///
/// The salt is drawn fresh every call; callers never need to (and cannot)
/// supply one, since a caller-chosen salt would undermine the whole point
/// of having one.
pub fn compute_verifier(username: &str, password: &str) -> (Vec<u8>, Vec<u8>) {
    let mut salt = vec![0u8; 16];
    rand::rng().fill_bytes(&mut salt);
    let (salt, verifier) = compute_verifier_with_salt(username, password, salt);
    (salt, verifier)
}

fn compute_verifier_with_salt(username: &str, password: &str, salt: Vec<u8>) -> (Vec<u8>, Vec<u8>) {
    let identity_hash = sha256(&[username.as_bytes(), b":", password.as_bytes()]);
    let x = hash_to_biguint(&[&salt, &identity_hash]);
    let verifier = G.modpow(&x, &N);
    (salt, pad_biguint(&verifier))
}

/// Server-side state for one SRP-6a handshake in progress.
///
/// Constructed with the user's stored salt and verifier once a username has
/// been looked up; walks through `compute_key` then
/// `verify_client_authenticator`/`compute_server_authenticator` as the two
/// remaining client messages arrive. None of these calls mutate anything
/// outside `self` — the caller owns deciding when a session is abandoned,
/// destroyed, or expired.
pub struct SrpServer {
    username: String,
    salt: Vec<u8>,
    verifier: BigUint,
    b: BigUint,
    a_pub: Option<BigUint>,
    b_pub: Option<BigUint>,
    key: Option<[u8; 32]>,
    m1: Option<Vec<u8>>,
}

impl SrpServer {
    /// Begins a new session for `username`, using the credential store's
    /// recorded `salt`/`verifier`. No ephemeral keys exist yet; call
    /// [`SrpServer::compute_key`] once the client's `A` arrives.
    pub fn new(username: impl Into<String>, salt: Vec<u8>, verifier: &[u8]) -> Self {
        let mut b_bytes = vec![0u8; 32];
        rand::rng().fill_bytes(&mut b_bytes);
        Self {
            username: username.into(),
            salt,
            verifier: BigUint::from_bytes_be(verifier),
            b: BigUint::from_bytes_be(&b_bytes),
            a_pub: None,
            b_pub: None,
            key: None,
            m1: None,
        }
    }

    /// Consumes the client's public ephemeral `A`, derives the server's own
    /// public ephemeral `B` and the shared key `K`, and returns `K`.
    ///
    /// Rejects `A` whenever `A mod N == 0` or the derived scrambling
    /// parameter `u` is zero — both indicate a forged or malformed value,
    /// never a value a real client would send.
    pub fn compute_key(&mut self, a_pub_bytes: &[u8]) -> Result<[u8; 32], SrpError> {
        let a_pub = BigUint::from_bytes_be(a_pub_bytes);
        if &a_pub % &*N == BigUint::zero() {
            return Err(SrpError::InvalidPublicEphemeral);
        }

        let k = hash_to_biguint(&[&N.to_bytes_be(), &pad_biguint(&G)]);
        let b_pub = (&k * &self.verifier + G.modpow(&self.b, &N)) % &*N;

        let u = hash_to_biguint(&[&pad_biguint(&a_pub), &pad_biguint(&b_pub)]);
        if u.is_zero() {
            return Err(SrpError::InvalidScramblingParameter);
        }

        let s = (&a_pub * self.verifier.modpow(&u, &N)).modpow(&self.b, &N);
        let key = sha256(&[&s.to_bytes_be()]);

        self.a_pub = Some(a_pub);
        self.b_pub = Some(b_pub);
        self.key = Some(key);
        Ok(key)
    }

    /// Returns the server's public ephemeral `B`, padded to the group's
    /// byte length. Only meaningful after [`SrpServer::compute_key`].
    pub fn get_b_pub(&self) -> Result<Vec<u8>, SrpError> {
        self.b_pub.as_ref().map(pad_biguint).ok_or(SrpError::NotReady)
    }

    /// Verifies the client's proof `M1` in constant time and, on success,
    /// remembers it so [`SrpServer::compute_server_authenticator`] can use
    /// it afterwards.
    pub fn verify_client_authenticator(&mut self, m1: &[u8]) -> Result<bool, SrpError> {
        let (a_pub, b_pub, key) = match (&self.a_pub, &self.b_pub, &self.key) {
            (Some(a), Some(b), Some(k)) => (a, b, k),
            _ => return Err(SrpError::NotReady),
        };

        let hash_n = sha256(&[&N.to_bytes_be()]);
        let hash_g = sha256(&[&G.to_bytes_be()]);
        let hash_identity = sha256(&[self.username.as_bytes()]);

        let expected = sha256(&[
            &xor32(hash_n, hash_g),
            &hash_identity,
            &self.salt,
            &pad_biguint(a_pub),
            &pad_biguint(b_pub),
            key,
        ]);

        if m1.len() != 32 {
            return Ok(false);
        }
        let mut given = [0u8; 32];
        given.copy_from_slice(m1);

        let matches: bool = expected.ct_eq(&given).into();
        if matches {
            self.m1 = Some(m1.to_vec());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Computes `M2 = H(A || M1 || K)`. Only meaningful after a successful
    /// [`SrpServer::verify_client_authenticator`].
    pub fn compute_server_authenticator(&self) -> Result<[u8; 32], SrpError> {
        let (a_pub, m1, key) = match (&self.a_pub, &self.m1, &self.key) {
            (Some(a), Some(m1), Some(k)) => (a, m1, k),
            _ => return Err(SrpError::NotReady),
        };
        Ok(sha256(&[&pad_biguint(a_pub), m1, key]))
    }
}
