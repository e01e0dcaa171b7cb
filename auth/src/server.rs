use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use authd_store::CredentialStore;
use authd_wire::{
    AuthEphemeral, AuthNegotiate, AuthProof, ErrorSession, ErrorUser, Message, ServerEphemeral,
    ServerNegotiate, ServerProof,
};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::session::{SessionState, SessionTable};

/// Datagrams larger than this are truncated by `recv_from`; the codec then
/// rejects the truncated remainder as a decode error, which is fine — a
/// legitimate request never gets close to this size.
const MAX_DATAGRAM: usize = 1024;

pub struct Pipeline {
    socket: UdpSocket,
    store: Arc<dyn CredentialStore>,
    sessions: Arc<SessionTable>,
}

impl Pipeline {
    pub async fn bind(addr: &str, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind UDP socket on {addr}"))?;
        Ok(Self {
            socket,
            store,
            sessions: Arc::new(SessionTable::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receives datagrams until `cancel` fires. Each datagram is dispatched
    /// on its own task so a slow store lookup or SRP computation for one
    /// packet never blocks another. The socket itself is shared (via
    /// `Arc`) for the reply send, which is why every send happens through
    /// this one bound socket rather than opening a fresh one per client.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let socket = Arc::new(self.socket);
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                recv = socket.recv_from(&mut buf) => {
                    let (len, peer) = match recv {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::debug!(error = %e, "udp recv failed");
                            continue;
                        }
                    };
                    let payload = buf[..len].to_vec();
                    let socket = socket.clone();
                    let store = self.store.clone();
                    let sessions = self.sessions.clone();
                    tokio::spawn(async move {
                        dispatch(&socket, peer, &payload, store, sessions).await;
                    });
                }
            }
        }
    }
}

async fn dispatch(
    socket: &UdpSocket,
    peer: SocketAddr,
    payload: &[u8],
    store: Arc<dyn CredentialStore>,
    sessions: Arc<SessionTable>,
) {
    if payload.len() < 4 {
        tracing::debug!(?peer, "dropping datagram shorter than header");
        return;
    }

    let header = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let reply = match header {
        authd_wire::HEADER_SERVER_NEGOTIATE => handle_negotiate(payload, store, &sessions).await,
        authd_wire::HEADER_SERVER_EPHEMERAL => handle_ephemeral(payload, &sessions),
        authd_wire::HEADER_SERVER_PROOF => handle_proof(payload, &sessions),
        other => {
            tracing::debug!(?peer, header = %format!("{other:#010X}"), "unknown header, dropping");
            return;
        }
    };

    let Some(reply) = reply else { return };
    if let Err(e) = socket.send_to(&reply, peer).await {
        tracing::debug!(?peer, error = %e, "failed to send reply");
    }
}

/// `ServerNegotiate -> AuthNegotiate | ErrorUser`
async fn handle_negotiate(
    payload: &[u8],
    store: Arc<dyn CredentialStore>,
    sessions: &SessionTable,
) -> Option<Vec<u8>> {
    let req = match ServerNegotiate::decode(payload) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!(error = %e, "negotiate decode failed, dropping");
            return None;
        }
    };

    let user = match store.find_user(&req.username).await {
        Ok(user) => user,
        Err(authd_store::StoreError::UnknownUser) => {
            return Some(ErrorUser::new(req.client_session).encode());
        }
        Err(e) => {
            tracing::debug!(error = %e, "credential store error, dropping");
            return None;
        }
    };

    let session_id = sessions.insert_negotiated(&user.username, user.salt.clone(), &user.verifier)?;

    let reply = AuthNegotiate::new(req.client_session, session_id, user.salt, user.username)
        .expect("store-provided salt already satisfies the wire length bound");
    Some(reply.encode())
}

/// Distinguishes why `handle_ephemeral`'s closure failed: only
/// [`EphemeralError::BadKey`] warrants destroying the session, since a
/// wrong-state hit can be a harmless duplicate datagram for a session that
/// has already moved on.
enum EphemeralError {
    WrongState,
    BadKey,
}

/// `ServerEphemeral -> AuthEphemeral | ErrorSession`
fn handle_ephemeral(payload: &[u8], sessions: &SessionTable) -> Option<Vec<u8>> {
    let req = match ServerEphemeral::decode(payload) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!(error = %e, "ephemeral decode failed, dropping");
            return None;
        }
    };

    let outcome = sessions.with_session(req.session, |session| {
        if session.state != SessionState::AwaitingEphemeral {
            return Err(EphemeralError::WrongState);
        }
        let key_result = session.srp.compute_key(&req.a_pub);
        match key_result {
            Ok(_) => {
                session.state = SessionState::AwaitingProof;
                Ok(session.srp.get_b_pub().expect("just computed"))
            }
            Err(_) => Err(EphemeralError::BadKey),
        }
    });

    match outcome {
        None => Some(ErrorSession::new(req.session).encode()),
        Some(Err(EphemeralError::WrongState)) => Some(ErrorSession::new(req.session).encode()),
        Some(Err(EphemeralError::BadKey)) => {
            sessions.remove(req.session);
            Some(ErrorSession::new(req.session).encode())
        }
        Some(Ok(b_pub)) => {
            let reply = AuthEphemeral::new(req.session, b_pub)
                .expect("group element already fits the wire length bound");
            Some(reply.encode())
        }
    }
}

/// `ServerProof -> AuthProof | ErrorSession`
fn handle_proof(payload: &[u8], sessions: &SessionTable) -> Option<Vec<u8>> {
    let req = match ServerProof::decode(payload) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!(error = %e, "proof decode failed, dropping");
            return None;
        }
    };

    let outcome = sessions.with_session(req.session, |session| {
        if session.state != SessionState::AwaitingProof {
            return Err(());
        }
        match session.srp.verify_client_authenticator(&req.m1) {
            Ok(true) => Ok(session
                .srp
                .compute_server_authenticator()
                .expect("authenticator just verified")),
            _ => Err(()),
        }
    });

    // Every path through here — success or failure — removes the session:
    // a verified proof completes the handshake, and a failed one must not
    // be retried against the same id.
    sessions.remove(req.session);

    match outcome {
        None | Some(Err(())) => Some(ErrorSession::new(req.session).encode()),
        Some(Ok(m2)) => {
            let reply = AuthProof::new(req.session, m2.to_vec())
                .expect("SHA-256 digest already fits the wire length bound");
            Some(reply.encode())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authd_store::{AccessLevel, UserRecord};
    use std::collections::HashMap;
    use tokio::sync::Mutex as AsyncMutex;

    struct MemStore {
        users: AsyncMutex<HashMap<String, UserRecord>>,
    }

    #[async_trait::async_trait]
    impl CredentialStore for MemStore {
        async fn find_user(&self, login: &str) -> Result<UserRecord, authd_store::StoreError> {
            let users = self.users.lock().await;
            users
                .values()
                .find(|u| {
                    u.username.eq_ignore_ascii_case(login) || u.email.eq_ignore_ascii_case(login)
                })
                .cloned()
                .ok_or(authd_store::StoreError::UnknownUser)
        }

        async fn add_user(
            &self,
            username: &str,
            email: &str,
            password: &str,
        ) -> Result<(), authd_store::StoreError> {
            let (salt, verifier) = authd_srp::compute_verifier(username, password);
            self.users.lock().await.insert(
                username.to_string(),
                UserRecord {
                    username: username.to_string(),
                    email: email.to_string(),
                    salt,
                    verifier,
                    access_level: AccessLevel::User,
                },
            );
            Ok(())
        }
    }

    fn store_with(username: &str, password: &str) -> Arc<dyn CredentialStore> {
        let store = MemStore {
            users: AsyncMutex::new(HashMap::new()),
        };
        let (salt, verifier) = authd_srp::compute_verifier(username, password);
        store.users.try_lock().unwrap().insert(
            username.to_string(),
            UserRecord {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                salt,
                verifier,
                access_level: AccessLevel::User,
            },
        );
        Arc::new(store)
    }

    #[tokio::test]
    async fn negotiate_unknown_user_yields_error_user() {
        let store = store_with("alice", "hunter2");
        let sessions = SessionTable::new();
        let req = ServerNegotiate {
            client_session: 0xFF04EF0C,
            username: "nobody".into(),
        }
        .encode();

        let reply = handle_negotiate(&req, store, &sessions).await.unwrap();
        assert_eq!(
            Message::decode(&reply).unwrap(),
            Message::ErrorUser(ErrorUser::new(0xFF04EF0C))
        );
    }

    #[tokio::test]
    async fn negotiate_known_user_issues_session() {
        let store = store_with("alice", "hunter2");
        let sessions = SessionTable::new();
        let req = ServerNegotiate {
            client_session: 0xFF04EF0C,
            username: "alice".into(),
        }
        .encode();

        let reply = handle_negotiate(&req, store, &sessions).await.unwrap();
        match Message::decode(&reply).unwrap() {
            Message::AuthNegotiate(m) => {
                assert_eq!(m.client_session, 0xFF04EF0C);
                assert_eq!(m.username, "alice");
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn ephemeral_on_unknown_session_is_error_session() {
        let sessions = SessionTable::new();
        let req = ServerEphemeral::new(42, vec![1, 2, 3]).unwrap().encode();
        let reply = handle_ephemeral(&req, &sessions).unwrap();
        assert_eq!(
            Message::decode(&reply).unwrap(),
            Message::ErrorSession(ErrorSession::new(42))
        );
    }

    #[test]
    fn proof_on_unknown_session_is_error_session() {
        let sessions = SessionTable::new();
        let req = ServerProof::new(42, vec![0u8; 32]).unwrap().encode();
        let reply = handle_proof(&req, &sessions).unwrap();
        assert_eq!(
            Message::decode(&reply).unwrap(),
            Message::ErrorSession(ErrorSession::new(42))
        );
    }

    #[tokio::test]
    async fn full_handshake_round_trips_m2() {
        use num_bigint::BigUint;
        use sha2::{Digest, Sha256};

        let store = store_with("carol", "correct horse battery staple");
        let sessions = SessionTable::new();

        let negotiate = ServerNegotiate {
            client_session: 7,
            username: "carol".into(),
        }
        .encode();
        let negotiate_reply = handle_negotiate(&negotiate, store, &sessions).await.unwrap();
        let Message::AuthNegotiate(negotiated) = Message::decode(&negotiate_reply).unwrap() else {
            panic!("expected AuthNegotiate");
        };

        // Minimal client-side SRP math, independent of the server crate,
        // to exercise the pipeline end to end.
        let n = super::authd_srp_test_support::n();
        let g = super::authd_srp_test_support::g();
        let mut rng_bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rng(), &mut rng_bytes);
        let a = BigUint::from_bytes_be(&rng_bytes);
        let a_pub = g.modpow(&a, &n);

        let ephemeral = ServerEphemeral::new(negotiated.session, a_pub.to_bytes_be())
            .unwrap()
            .encode();
        let ephemeral_reply = handle_ephemeral(&ephemeral, &sessions).unwrap();
        let Message::AuthEphemeral(eph) = Message::decode(&ephemeral_reply).unwrap() else {
            panic!("expected AuthEphemeral");
        };
        let b_pub = BigUint::from_bytes_be(&eph.b_pub);

        let pad = |b: &BigUint| super::authd_srp_test_support::pad(&b.to_bytes_be());
        let k = BigUint::from_bytes_be(&Sha256::digest(
            [n.to_bytes_be(), pad(&g)].concat(),
        ));
        let u = BigUint::from_bytes_be(&Sha256::digest(
            [pad(&a_pub), pad(&b_pub)].concat(),
        ));
        let identity_hash = Sha256::digest(b"carol:correct horse battery staple");
        let x = BigUint::from_bytes_be(&Sha256::digest(
            [negotiated.salt.clone(), identity_hash.to_vec()].concat(),
        ));
        let client_s = (&b_pub - &k * g.modpow(&x, &n)).modpow(&(&u * &x + &a), &n);
        let client_key: [u8; 32] = Sha256::digest(client_s.to_bytes_be()).into();

        let hash_n = Sha256::digest(n.to_bytes_be());
        let hash_g = Sha256::digest(g.to_bytes_be());
        let xor: Vec<u8> = hash_n.iter().zip(hash_g.iter()).map(|(a, b)| a ^ b).collect();
        let hash_identity = Sha256::digest(b"carol");
        let m1 = Sha256::digest(
            [
                xor,
                hash_identity.to_vec(),
                negotiated.salt.clone(),
                pad(&a_pub),
                pad(&b_pub),
                client_key.to_vec(),
            ]
            .concat(),
        );

        let proof = ServerProof::new(negotiated.session, m1.to_vec()).unwrap().encode();
        let proof_reply = handle_proof(&proof, &sessions).unwrap();
        let Message::AuthProof(auth_proof) = Message::decode(&proof_reply).unwrap() else {
            panic!("expected AuthProof, session destroyed instead");
        };

        let expected_m2 = Sha256::digest([pad(&a_pub), m1.to_vec(), client_key.to_vec()].concat());
        assert_eq!(auth_proof.m2, expected_m2.to_vec());

        // Session is gone after the proof completes.
        assert!(sessions.with_session(negotiated.session, |_| ()).is_none());
    }

    /// Drives a full handshake over a real loopback socket against a
    /// `Pipeline` bound and run the same way `main` runs it, rather than
    /// calling the handler functions directly — the closest thing this
    /// crate has to the manual `handshake_probe` binary, but automated and
    /// torn down with a cancellation token instead of a live process.
    #[tokio::test]
    async fn pipeline_handles_negotiate_over_real_socket() {
        let store = store_with("erin", "hunter2");
        let pipeline = Pipeline::bind("127.0.0.1:0", store).await.unwrap();
        let server_addr = pipeline.local_addr().unwrap();

        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(pipeline.run(run_cancel));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let req = ServerNegotiate {
            client_session: 99,
            username: "erin".into(),
        }
        .encode();
        client.send_to(&req, server_addr).await.unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        match Message::decode(&buf[..len]).unwrap() {
            Message::AuthNegotiate(m) => {
                assert_eq!(m.client_session, 99);
                assert_eq!(m.username, "erin");
            }
            other => panic!("unexpected reply {other:?}"),
        }

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[test]
    fn tampered_proof_destroys_session_and_second_attempt_also_errors() {
        let sessions = SessionTable::new();
        let (salt, verifier) = authd_srp::compute_verifier("dave", "password");
        let id = sessions
            .insert_negotiated("dave", salt, &verifier)
            .unwrap();

        let mut a_bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rng(), &mut a_bytes);
        let a_pub = super::authd_srp_test_support::g()
            .modpow(&num_bigint::BigUint::from_bytes_be(&a_bytes), &super::authd_srp_test_support::n())
            .to_bytes_be();

        let ephemeral = ServerEphemeral::new(id, a_pub).unwrap().encode();
        handle_ephemeral(&ephemeral, &sessions).unwrap();

        let bad_proof = ServerProof::new(id, vec![0u8; 32]).unwrap().encode();
        let reply = handle_proof(&bad_proof, &sessions).unwrap();
        assert_eq!(
            Message::decode(&reply).unwrap(),
            Message::ErrorSession(ErrorSession::new(id))
        );

        let second = ServerProof::new(id, vec![0u8; 32]).unwrap().encode();
        let second_reply = handle_proof(&second, &sessions).unwrap();
        assert_eq!(
            Message::decode(&second_reply).unwrap(),
            Message::ErrorSession(ErrorSession::new(id))
        );
    }
}

/// Tiny, test-only duplicate of the SRP group constants so the pipeline
/// test above can play the client side without depending on `authd-srp`'s
/// private server-only internals.
#[cfg(test)]
mod authd_srp_test_support {
    use num_bigint::BigUint;
    use num_traits::Num;

    const N_HEX: &str = "AC6BDB41324A9A9BF166DE5E1389582FAF72B6651987EE07FC3192943DB56050A37329CBB4A099ED8193E0757767A13DD52312AB4B03310DCD7F48A9DA04FD50E8083969EDB767B0CF6095179A163AB3661A05FBD5FAAAE82918A9962F0B93B855F97993EC975EEAA80D740ADBF4FF747359D041D5C33EA71D281E446B14773BCA97B43A23FB801676BD207A436C6481F1D2B9078717461A5B9D32E688F87748544523B524B0D57D5EA77A2775D2ECFA032CFBDBF52FB3786160279004E57AE6AF874E7303CE53299CCC041C7BC308D82A5698F3A8D0C38271AE35F8E9DBFBB694B5C803D89F7AE435DE236D525F54759B65E372FCD68EF20FA7111F9E4AFF73";

    pub fn n() -> BigUint {
        BigUint::from_str_radix(N_HEX, 16).unwrap()
    }

    pub fn g() -> BigUint {
        BigUint::from(2u32)
    }

    pub fn pad(bytes: &[u8]) -> Vec<u8> {
        const N_BYTES: usize = 256;
        if bytes.len() >= N_BYTES {
            return bytes[bytes.len() - N_BYTES..].to_vec();
        }
        let mut out = vec![0u8; N_BYTES - bytes.len()];
        out.extend_from_slice(bytes);
        out
    }
}
