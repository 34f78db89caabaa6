//! Content digests used as identity tokens for plans and parameter bundles.
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Types which can write a canonical, order-independent rendering of their contents.
///
/// Two values with equal contents must write identical text. Floats are written with their
/// shortest round-trip representation so that any change of value changes the text.
pub trait Canonical {
    /// Append the canonical rendering of `self` to `out`
    fn write_canonical(&self, out: &mut String);
}

/// Append a labelled section to a canonical rendering
pub fn write_section<T: Canonical + ?Sized>(out: &mut String, label: &str, value: &T) {
    writeln!(out, "[{label}]").unwrap();
    value.write_canonical(out);
    out.push('\n');
}

/// Append a float with round-trip precision.
///
/// `-0.0` is written as `0.0`, as the two compare equal.
pub fn write_float(out: &mut String, value: f64) {
    let value = if value == 0.0 { 0.0 } else { value };
    write!(out, "{value:?}").unwrap();
}

/// The first `len` hex characters of the SHA-256 hash of `text`
pub fn short_digest(text: &str, len: usize) -> String {
    let mut digest = hex::encode(Sha256::digest(text.as_bytes()));
    digest.truncate(len);
    digest
}
