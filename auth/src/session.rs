use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use authd_srp::SrpServer;
use rand::RngCore;

/// Bound on how many times [`SessionTable::insert_negotiated`] will redraw a
/// session id after a collision before giving up. Collisions are vanishingly
/// rare at `u32` cardinality; this only guards against a broken or
/// adversarial entropy source producing a stuck stream of duplicates.
const MAX_ID_RETRIES: u8 = 8;

/// How long a session is reachable from the table after creation. Chosen to
/// bound both the replay window and memory under a flood of negotiates that
/// never complete.
pub const SESSION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingEphemeral,
    AwaitingProof,
}

pub struct Session {
    pub username: String,
    pub srp: SrpServer,
    pub state: SessionState,
    created_at: Instant,
}

/// Concurrent-map-shaped session store, single-mutex in this design —
/// sharding by `session_id mod N` is a drop-in swap that doesn't change the
/// contract below if lock contention ever shows up under load.
///
/// Expiry is an explicit min-heap of `(deadline, session_id)` drained
/// opportunistically on every call, rather than a sleep-then-delete task
/// spawned per session.
pub struct SessionTable {
    inner: std::sync::Mutex<Inner>,
}

struct Inner {
    sessions: HashMap<u32, Session>,
    expirations: BinaryHeap<Reverse<(Instant, u32)>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Mutex::new(Inner {
                sessions: HashMap::new(),
                expirations: BinaryHeap::new(),
            }),
        }
    }

    /// Drops every session whose TTL has elapsed. Cheap to call on every
    /// request: the heap's top is always the next thing to expire, so this
    /// stops as soon as it finds a still-live entry.
    fn reap_expired(inner: &mut Inner, now: Instant) {
        while let Some(&Reverse((deadline, id))) = inner.expirations.peek() {
            if deadline > now {
                break;
            }
            inner.expirations.pop();
            // The session may already be gone (removed by a completed
            // handshake); that's fine, this is just cleanup.
            if let Some(session) = inner.sessions.get(&id) {
                if session.created_at + SESSION_TTL <= now {
                    inner.sessions.remove(&id);
                }
            }
        }
    }

    /// Draws a fresh random session id, constructs an [`SrpServer`] from
    /// the looked-up credential, and inserts it under that id. Retries a
    /// bounded number of times on id collision.
    ///
    /// Returns `None` if every retry collided, which a caller should treat
    /// the same as any other transient store failure (drop the datagram).
    pub fn insert_negotiated(
        &self,
        username: &str,
        salt: Vec<u8>,
        verifier: &[u8],
    ) -> Option<u32> {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        Self::reap_expired(&mut inner, now);

        for _ in 0..MAX_ID_RETRIES {
            let id = rand::rng().next_u32();
            if inner.sessions.contains_key(&id) {
                continue;
            }
            let srp = SrpServer::new(username, salt.clone(), verifier);
            inner.sessions.insert(
                id,
                Session {
                    username: username.to_string(),
                    srp,
                    state: SessionState::AwaitingEphemeral,
                    created_at: now,
                },
            );
            inner.expirations.push(Reverse((now + SESSION_TTL, id)));
            return Some(id);
        }
        None
    }

    /// Runs `f` against the live session for `id`, if any, under the
    /// table's lock. Returns `None` if the id is absent or has expired —
    /// the caller can't tell those apart, matching the wire protocol's
    /// single `ErrorSession` reply for both.
    pub fn with_session<R>(&self, id: u32, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        Self::reap_expired(&mut inner, now);

        let session = inner.sessions.get_mut(&id)?;
        if session.created_at + SESSION_TTL <= now {
            inner.sessions.remove(&id);
            return None;
        }
        Some(f(session))
    }

    /// Idempotent removal, used once a session is destroyed (auth failure)
    /// or has served its final reply (auth success).
    pub fn remove(&self, id: u32) {
        self.inner.lock().unwrap().sessions.remove(&id);
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> (Vec<u8>, Vec<u8>) {
        authd_srp::compute_verifier("alice", "hunter2")
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let table = SessionTable::new();
        let (salt, verifier) = verifier();
        let id = table.insert_negotiated("alice", salt, &verifier).unwrap();

        let found = table.with_session(id, |s| s.username.clone());
        assert_eq!(found.as_deref(), Some("alice"));
    }

    #[test]
    fn remove_is_idempotent() {
        let table = SessionTable::new();
        let (salt, verifier) = verifier();
        let id = table.insert_negotiated("bob", salt, &verifier).unwrap();
        table.remove(id);
        table.remove(id);
        assert!(table.with_session(id, |_| ()).is_none());
    }

    #[test]
    fn unknown_id_is_none() {
        let table = SessionTable::new();
        assert!(table.with_session(0xDEADBEEF, |_| ()).is_none());
    }

    #[test]
    fn expired_session_is_unreachable() {
        let table = SessionTable::new();
        let (salt, verifier) = verifier();
        let id = table.insert_negotiated("carol", salt, &verifier).unwrap();

        {
            let mut inner = table.inner.lock().unwrap();
            let session = inner.sessions.get_mut(&id).unwrap();
            session.created_at -= SESSION_TTL + Duration::from_secs(1);
        }

        assert!(table.with_session(id, |_| ()).is_none());
    }
}
