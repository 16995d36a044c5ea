//! External-facing meeting code generation.

use rand::Rng;

/// Alphabet without easily confused characters (0, O, I, 1).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generates a meeting code in `MTG-XXXX-XXXX` form.
pub fn generate_meeting_code() -> String {
    let mut rng = rand::thread_rng();

    let mut segment = || -> String {
        (0..4)
            .map(|_| {
                let idx = rng.gen_range(0..CODE_ALPHABET.len());
                CODE_ALPHABET[idx] as char
            })
            .collect()
    };

    format!("MTG-{}-{}", segment(), segment())
}

/// Checks whether a string has the shape produced by [`generate_meeting_code`].
pub fn is_meeting_code(code: &str) -> bool {
    let mut parts = code.split('-');
    let (Some(prefix), Some(a), Some(b), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    prefix == "MTG"
        && [a, b].iter().all(|segment| {
            segment.len() == 4 && segment.bytes().all(|c| CODE_ALPHABET.contains(&c))
        })
}
