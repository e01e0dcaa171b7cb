//! Manual end-to-end probe: drives a full SRP handshake against a running
//! service over a real UDP socket, the same way a game server would, for
//! poking at a live instance by hand. Not part of the test suite.

use std::env;
use std::net::UdpSocket;
use std::time::Duration;

use num_bigint::BigUint;
use num_traits::Num;
use sha2::{Digest, Sha256};

const N_HEX: &str = "AC6BDB41324A9A9BF166DE5E1389582FAF72B6651987EE07FC3192943DB56050A37329CBB4A099ED8193E0757767A13DD52312AB4B03310DCD7F48A9DA04FD50E8083969EDB767B0CF6095179A163AB3661A05FBD5FAAAE82918A9962F0B93B855F97993EC975EEAA80D740ADBF4FF747359D041D5C33EA71D281E446B14773BCA97B43A23FB801676BD207A436C6481F1D2B9078717461A5B9D32E688F87748544523B524B0D57D5EA77A2775D2ECFA032CFBDBF52FB3786160279004E57AE6AF874E7303CE53299CCC041C7BC308D82A5698F3A8D0C38271AE35F8E9DBFBB694B5C803D89F7AE435DE236D525F54759B65E372FCD68EF20FA7111F9E4AFF73";
const N_BYTES: usize = 256;

fn n() -> BigUint {
    BigUint::from_str_radix(N_HEX, 16).unwrap()
}

fn g() -> BigUint {
    BigUint::from(2u32)
}

fn pad(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() >= N_BYTES {
        return bytes[bytes.len() - N_BYTES..].to_vec();
    }
    let mut out = vec![0u8; N_BYTES - bytes.len()];
    out.extend_from_slice(bytes);
    out
}

fn main() {
    let server = env::args().nth(1).unwrap_or_else(|| "127.0.0.1:16666".into());
    let username = env::args().nth(2).unwrap_or_else(|| "test".into());
    let password = env::args().nth(3).unwrap_or_else(|| "password".into());

    let sock = UdpSocket::bind("0.0.0.0:0").expect("bind local socket");
    sock.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let client_session: u32 = 0x1122_3344;

    // ServerNegotiate
    let mut negotiate = Vec::new();
    negotiate.extend_from_slice(&0xD003CA01u32.to_le_bytes());
    negotiate.push(2); // protocol version
    negotiate.extend_from_slice(&client_session.to_le_bytes());
    negotiate.extend_from_slice(username.as_bytes());
    negotiate.push(0);

    eprintln!("-> ServerNegotiate({username})");
    sock.send_to(&negotiate, &server).expect("send negotiate");

    let mut buf = [0u8; 2048];
    let (n_bytes, peer) = sock.recv_from(&mut buf).expect("recv AuthNegotiate/ErrorUser");
    let reply = &buf[..n_bytes];
    let header = u32::from_le_bytes([reply[0], reply[1], reply[2], reply[3]]);

    if header == 0xD003CAFF {
        eprintln!("<- ErrorUser from {peer}: no such user");
        return;
    }
    assert_eq!(header, 0xD003CA10, "expected AuthNegotiate");

    let session_id = u32::from_le_bytes([reply[9], reply[10], reply[11], reply[12]]);
    let salt_len = reply[13] as usize;
    let salt = reply[14..14 + salt_len].to_vec();
    eprintln!("<- AuthNegotiate(session={session_id:#010x}, salt={} bytes)", salt.len());

    // Client-side SRP math (RFC 5054 2048-bit group, SHA-256).
    let a = BigUint::from_bytes_be(&rand_bytes(32));
    let a_pub = g().modpow(&a, &n());

    let mut ephemeral = Vec::new();
    ephemeral.extend_from_slice(&0xD003CA02u32.to_le_bytes());
    ephemeral.extend_from_slice(&session_id.to_le_bytes());
    let a_pub_bytes = a_pub.to_bytes_be();
    ephemeral.extend_from_slice(&(a_pub_bytes.len() as u16).to_le_bytes());
    ephemeral.extend_from_slice(&a_pub_bytes);

    eprintln!("-> ServerEphemeral");
    sock.send_to(&ephemeral, &server).expect("send ephemeral");

    let (n_bytes, _) = sock.recv_from(&mut buf).expect("recv AuthEphemeral/ErrorSession");
    let reply = &buf[..n_bytes];
    let header = u32::from_le_bytes([reply[0], reply[1], reply[2], reply[3]]);
    if header == 0xD003CAEE {
        eprintln!("<- ErrorSession: handshake rejected");
        return;
    }
    assert_eq!(header, 0xD003CA20, "expected AuthEphemeral");
    let b_len = u16::from_le_bytes([reply[8], reply[9]]) as usize;
    let b_pub = BigUint::from_bytes_be(&reply[10..10 + b_len]);
    eprintln!("<- AuthEphemeral");

    let k = BigUint::from_bytes_be(&Sha256::digest([n().to_bytes_be(), pad(&g().to_bytes_be())].concat()));
    let u = BigUint::from_bytes_be(&Sha256::digest([pad(&a_pub.to_bytes_be()), pad(&b_pub.to_bytes_be())].concat()));
    let identity_hash = Sha256::digest(format!("{username}:{password}").as_bytes());
    let x = BigUint::from_bytes_be(&Sha256::digest([salt.clone(), identity_hash.to_vec()].concat()));
    let s = (&b_pub - &k * g().modpow(&x, &n())).modpow(&(&u * &x + &a), &n());
    let key: [u8; 32] = Sha256::digest(s.to_bytes_be()).into();

    let hash_n = Sha256::digest(n().to_bytes_be());
    let hash_g = Sha256::digest(g().to_bytes_be());
    let xor: Vec<u8> = hash_n.iter().zip(hash_g.iter()).map(|(a, b)| a ^ b).collect();
    let hash_identity = Sha256::digest(username.as_bytes());
    let m1 = Sha256::digest(
        [
            xor,
            hash_identity.to_vec(),
            salt,
            pad(&a_pub.to_bytes_be()),
            pad(&b_pub.to_bytes_be()),
            key.to_vec(),
        ]
        .concat(),
    );

    let mut proof = Vec::new();
    proof.extend_from_slice(&0xD003CA03u32.to_le_bytes());
    proof.extend_from_slice(&session_id.to_le_bytes());
    proof.extend_from_slice(&(m1.len() as u16).to_le_bytes());
    proof.extend_from_slice(&m1);

    eprintln!("-> ServerProof");
    sock.send_to(&proof, &server).expect("send proof");

    let (n_bytes, _) = sock.recv_from(&mut buf).expect("recv AuthProof/ErrorSession");
    let reply = &buf[..n_bytes];
    let header = u32::from_le_bytes([reply[0], reply[1], reply[2], reply[3]]);
    if header == 0xD003CAEE {
        eprintln!("<- ErrorSession: proof rejected");
        return;
    }
    assert_eq!(header, 0xD003CA30, "expected AuthProof");
    let m2_len = u16::from_le_bytes([reply[8], reply[9]]) as usize;
    let m2 = &reply[10..10 + m2_len];

    let expected_m2 = Sha256::digest([pad(&a_pub.to_bytes_be()), m1.to_vec(), key.to_vec()].concat());
    if m2 == expected_m2.as_slice() {
        eprintln!("<- AuthProof: M2 verified, handshake succeeded");
    } else {
        eprintln!("<- AuthProof: M2 MISMATCH, server authenticator is wrong");
    }
}

fn rand_bytes(n: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut buf = vec![0u8; n];
    rand::rng().fill_bytes(&mut buf);
    buf
}
