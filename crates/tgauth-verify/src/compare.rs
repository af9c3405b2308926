//! Constant-time digest comparison.
//!
//! Both operands are copied into fixed-size, zero-padded buffers and compared
//! with [`subtle::ConstantTimeEq`], together with a constant-time comparison of
//! their lengths. The work done is the same whatever the inputs, so timing
//! reveals neither where the first mismatching byte is nor whether the lengths
//! differ. Inputs longer than [`MAX_DIGEST_LEN`] never match.

use subtle::ConstantTimeEq;

/// Largest digest, in bytes, that can be compared.
pub const MAX_DIGEST_LEN: usize = 64;

/// Compare two byte strings in constant time.
///
/// # Examples
///
/// ```
/// use tgauth_verify::compare::constant_time_eq;
///
/// assert!(constant_time_eq(b"abc", b"abc"));
/// assert!(!constant_time_eq(b"abc", b"abd"));
/// assert!(!constant_time_eq(b"abc", b"abc\0"));
/// ```
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let (Some(padded_a), Some(padded_b)) = (pad(a), pad(b)) else {
        return false;
    };

    let same_len = (a.len() as u64).ct_eq(&(b.len() as u64));
    let same_bytes = padded_a[..].ct_eq(&padded_b[..]);
    (same_len & same_bytes).into()
}

/// Compare two hex-encoded digests in constant time.
///
/// Both sides are decoded first (upper- and lowercase hex are accepted). Input
/// that is not valid hex yields `false`.
///
/// # Examples
///
/// ```
/// use tgauth_verify::compare::constant_time_eq_hex;
///
/// assert!(constant_time_eq_hex("00ff", "00FF"));
/// assert!(!constant_time_eq_hex("00ff", "00fe"));
/// assert!(!constant_time_eq_hex("00ff", "zzzz"));
/// ```
#[must_use]
pub fn constant_time_eq_hex(a: &str, b: &str) -> bool {
    match (hex::decode(a), hex::decode(b)) {
        (Ok(a), Ok(b)) => constant_time_eq(&a, &b),
        _ => false,
    }
}

fn pad(bytes: &[u8]) -> Option<[u8; MAX_DIGEST_LEN]> {
    if bytes.len() > MAX_DIGEST_LEN {
        return None;
    }
    let mut buf = [0u8; MAX_DIGEST_LEN];
    buf[..bytes.len()].copy_from_slice(bytes);
    Some(buf)
}
