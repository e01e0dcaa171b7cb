use num_bigint::BigUint;
use num_traits::Num;

/// RFC 5054 2048-bit group, as required by the protocol this service
/// authenticates against. Parsed once and shared; re-parsing a 2048-bit hex
/// literal on every handshake would be a wasteful amount of allocation on
/// what's otherwise a CPU-bound but fast path.
const N_HEX: &str = "AC6BDB41324A9A9BF166DE5E1389582FAF72B6651987EE07FC3192943DB56050A37329CBB4A099ED8193E0757767A13DD52312AB4B03310DCD7F48A9DA04FD50E8083969EDB767B0CF6095179A163AB3661A05FBD5FAAAE82918A9962F0B93B855F97993EC975EEAA80D740ADBF4FF747359D041D5C33EA71D281E446B14773BCA97B43A23FB801676BD207A436C6481F1D2B9078717461A5B9D32E688F87748544523B524B0D57D5EA77A2775D2ECFA032CFBDBF52FB3786160279004E57AE6AF874E7303CE53299CCC041C7BC308D82A5698F3A8D0C38271AE35F8E9DBFBB694B5C803D89F7AE435DE236D525F54759B65E372FCD68EF20FA7111F9E4AFF73";
const G_DEC: u32 = 2;

/// Byte length of `N`. The verifier, `A`, `B` and all PAD() outputs are
/// this long.
pub const N_BYTES: usize = 256;

lazy_static::lazy_static! {
    pub static ref N: BigUint = BigUint::from_str_radix(N_HEX, 16).expect("static N is valid hex");
    pub static ref G: BigUint = BigUint::from(G_DEC);
}

/// Left-pads `bytes` to [`N_BYTES`] with leading zeros, as required
/// wherever the protocol calls for `PAD(...)`. Big-endian throughout.
pub fn pad(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() >= N_BYTES {
        return bytes[bytes.len() - N_BYTES..].to_vec();
    }
    let mut out = vec![0u8; N_BYTES - bytes.len()];
    out.extend_from_slice(bytes);
    out
}

pub fn pad_biguint(n: &BigUint) -> Vec<u8> {
    pad(&n.to_bytes_be())
}
