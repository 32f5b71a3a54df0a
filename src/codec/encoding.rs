//! Base64 and name-fragment helpers shared by the URI codecs and pipelines.

use std::borrow::Cow;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};

/// Encodes text with the standard base64 alphabet (padded).
#[must_use]
pub fn encode_base64(text: &str) -> String {
    STANDARD.encode(text)
}

/// Pads `input` with `=` up to a multiple of 4 characters.
fn pad(input: &str) -> Cow<'_, str> {
    let remainder = input.len() % 4;
    if remainder == 0 {
        Cow::Borrowed(input)
    } else {
        let mut padded = String::with_capacity(input.len() + 4 - remainder);
        padded.push_str(input);
        padded.extend(std::iter::repeat_n('=', 4 - remainder));
        Cow::Owned(padded)
    }
}

/// Decodes a base64 fragment after padding it, trying the standard alphabet
/// first and the URL-safe alphabet second.
#[must_use]
pub fn decode_padded(input: &str) -> Option<Vec<u8>> {
    let padded = pad(input);
    STANDARD
        .decode(padded.as_bytes())
        .or_else(|_| URL_SAFE.decode(padded.as_bytes()))
        .ok()
}

/// Decodes a base64 fragment to UTF-8 text (see [`decode_padded`]).
#[must_use]
pub fn decode_padded_text(input: &str) -> Option<String> {
    decode_padded(input).and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Decodes a whole feed blob, ignoring embedded whitespace.
///
/// Returns `None` when the blob is not base64 or does not decode to UTF-8;
/// callers then treat the input as plaintext.
#[must_use]
pub fn decode_blob(blob: &str) -> Option<String> {
    let cleaned: String = blob.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    decode_padded_text(&cleaned)
}

/// Percent-encodes a display name for a URI fragment.
#[must_use]
pub fn encode_name(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

/// Percent-decodes a URI fragment, treating `+` as a space.
///
/// An undecodable fragment yields an empty name, which the codecs then
/// replace with `host:port`.
#[must_use]
pub fn decode_name(fragment: &str) -> String {
    let spaced = fragment.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(Cow::into_owned)
        .unwrap_or_default()
}
