//! The on-disk envelope of a locked secrets file, and state detection.
//!
//! A locked file looks like:
//!
//! ```text
//! $CHEST:<version>:<CIPHER_NAME>;\n<iv-hex>:<ciphertext-hex>
//! ```
//!
//! State is decided by splitting the raw content on the exact header for
//! the active version and cipher, the way `str::split` would: one fragment
//! means plaintext, two mean locked, more mean the header appears several
//! times. Note that a file locked under a *different* version or cipher has
//! one fragment and is therefore plaintext as far as this configuration can
//! tell.

use serde::Serialize;
use std::fmt;

use chest_common::{Error, Result};

/// Literal tag every header starts with.
pub const HEADER_PREFIX: &str = "$CHEST";

/// The exact header for one (version, cipher) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header(String);

impl Header {
    pub fn new(version: &str, cipher: &str) -> Self {
        Self(format!("{HEADER_PREFIX}:{version}:{cipher};\n"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lock state of raw file content relative to one header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeState {
    /// Header absent.
    Plaintext,
    /// Header present exactly once.
    #[serde(rename = "locked")]
    Encrypted,
    /// Header present more than once.
    Ambiguous,
}

impl fmt::Display for EnvelopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeState::Plaintext => write!(f, "plaintext"),
            EnvelopeState::Encrypted => write!(f, "locked"),
            EnvelopeState::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

/// Split `raw` on every non-overlapping occurrence of `needle`, scanning left
/// to right. Always returns at least one fragment.
///
/// An empty needle does not split.
pub fn split_on<'a>(raw: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    if needle.is_empty() {
        return vec![raw];
    }

    let mut fragments = Vec::new();
    let mut start = 0;
    while let Some(at) = find(raw, needle, start) {
        fragments.push(&raw[start..at]);
        start = at + needle.len();
    }
    fragments.push(&raw[start..]);
    fragments
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || haystack.len() - from < needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Classify raw content by the number of fragments it splits into.
pub fn classify(raw: &[u8], header: &Header) -> EnvelopeState {
    match split_on(raw, header.as_bytes()).len() {
        0 | 1 => EnvelopeState::Plaintext,
        2 => EnvelopeState::Encrypted,
        _ => EnvelopeState::Ambiguous,
    }
}

/// Number of times the header occurs in `raw`.
pub fn header_count(raw: &[u8], header: &Header) -> usize {
    split_on(raw, header.as_bytes()).len() - 1
}

/// False only when `raw` splits on `header` into exactly two fragments.
///
/// Ambiguous content is encryptable.
pub fn is_encryptable(raw: &[u8], header: &Header) -> bool {
    classify(raw, header) != EnvelopeState::Encrypted
}

/// True only when `raw` splits on `header` into exactly two fragments.
///
/// Not the complement of [`is_encryptable`]: ambiguous content is neither
/// decryptable nor refused for encryption.
pub fn is_decryptable(raw: &[u8], header: &Header) -> bool {
    classify(raw, header) == EnvelopeState::Encrypted
}

/// Longest tag reported by [`foreign_tag`].
const MAX_TAG_LEN: usize = 64;

/// The first chest header in `raw` that is not `header`, if any.
///
/// Returns the tag up to and including its `;`, or up to the end of the
/// line when the terminator is missing. Content that is locked under
/// `header` itself yields `None`.
pub fn foreign_tag(raw: &[u8], header: &Header) -> Option<String> {
    let prefix = format!("{HEADER_PREFIX}:");
    let mut from = 0;
    while let Some(at) = find(raw, prefix.as_bytes(), from) {
        if !raw[at..].starts_with(header.as_bytes()) {
            let rest = &raw[at..raw.len().min(at + MAX_TAG_LEN)];
            let end = rest
                .iter()
                .position(|&b| b == b';' || b == b'\n')
                .map(|i| if rest[i] == b';' { i + 1 } else { i })
                .unwrap_or(rest.len());
            return Some(String::from_utf8_lossy(&rest[..end]).into_owned());
        }
        from = at + prefix.len();
    }
    None
}

/// Build the locked file content.
pub fn seal(header: &Header, iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let iv_hex = hex::encode(iv);
    let ct_hex = hex::encode(ciphertext);

    let mut out = Vec::with_capacity(header.as_bytes().len() + iv_hex.len() + 1 + ct_hex.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(iv_hex.as_bytes());
    out.push(b':');
    out.extend_from_slice(ct_hex.as_bytes());
    out
}

/// Decoded payload of a locked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Strip the header and decode the payload.
///
/// Every fragment around the header is kept and concatenated. The result is
/// split on `:`; the first field is the IV and the remaining fields are
/// joined back together as the ciphertext.
///
/// # Errors
/// - `MalformedEnvelope` if either field is not valid hex
pub fn open(raw: &[u8], header: &Header) -> Result<Payload> {
    let body = split_on(raw, header.as_bytes()).concat();
    let mut fields = split_on(&body, b":").into_iter();

    let iv_hex = fields.next().unwrap_or_default();
    let ct_hex: Vec<u8> = fields.collect::<Vec<_>>().concat();

    let iv = hex::decode(iv_hex)
        .map_err(|e| Error::MalformedEnvelope(format!("IV is not valid hex: {e}")))?;
    let ciphertext = hex::decode(&ct_hex)
        .map_err(|e| Error::MalformedEnvelope(format!("Ciphertext is not valid hex: {e}")))?;

    Ok(Payload { iv, ciphertext })
}
