//! Constant-time comparison primitives.
//!
//! Naive `==` on secrets exits at the first mismatching byte, which leaks
//! position information through response timing. Every signature and digest
//! comparison in this crate goes through these helpers instead.

use subtle::ConstantTimeEq;

/// Compares two byte slices in constant time.
///
/// Slices of different lengths compare unequal; the length check itself is
/// not secret, only the contents are.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Constant-time comparison for strings (signature segments, hex digests).
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}
