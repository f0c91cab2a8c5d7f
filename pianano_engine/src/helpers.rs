//! Odds and ends with no better home.
use rand::Rng;

/// The base32 alphabet Nano addresses use (no 0, 2, l or v).
const ADDRESS_ALPHABET: &[u8] = b"13456789abcdefghijkmnopqrstuwxyz";
const ADDRESS_SUFFIX_LEN: usize = 60;

/// A syntactically plausible deposit address for songs submitted without one. It only needs to
/// be unique within the catalogue; nobody can spend from it and nothing validates its checksum.
pub fn random_nano_address() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ADDRESS_SUFFIX_LEN)
        .map(|_| ADDRESS_ALPHABET[rng.gen_range(0..ADDRESS_ALPHABET.len())] as char)
        .collect();
    format!("nano_{suffix}")
}
