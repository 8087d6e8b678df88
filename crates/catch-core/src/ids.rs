//! Identifier generation for annotations and requests.

use rand::Rng;
use uuid::Uuid;

/// Largest integer id handed to legacy clients (JavaScript safe integer).
const MAX_LEGACY_INT_ID: u64 = (1 << 53) - 1;

/// Generate a new UUIDv7 identifier.
///
/// Used for request correlation ids; sorts chronologically.
///
/// ```
/// use catch_core::ids::new_v7;
///
/// let a = new_v7();
/// let b = new_v7();
/// assert!(a <= b);
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a server-assigned annotation id.
///
/// Legacy clients expect integer ids, so `must_be_int` yields a random
/// decimal within the JavaScript safe-integer range; otherwise a UUIDv4
/// string is returned.
pub fn generate_uid(must_be_int: bool) -> String {
    if must_be_int {
        rand::thread_rng()
            .gen_range(1..=MAX_LEGACY_INT_ID)
            .to_string()
    } else {
        Uuid::new_v4().to_string()
    }
}
