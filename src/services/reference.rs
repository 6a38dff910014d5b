//! Booking reference generation

use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a booking reference
pub const REFERENCE_LEN: usize = 8;

/// Random 8-character reference drawn uniformly from `[A-Z0-9]`
pub fn generate_booking_reference() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERENCE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Whether a string has the shape of a generated reference
#[cfg(test)]
pub(crate) fn is_well_formed(reference: &str) -> bool {
    reference.len() == REFERENCE_LEN && reference.bytes().all(|b| ALPHABET.contains(&b))
}
