//! The cipher table: symbolic names, the AES algorithm each resolves to, and
//! the key length each requires.
//!
//! Key lengths are *not* taken from the algorithm. They come from the digits
//! embedded in the symbolic name (`"AES_256_CTR"` -> `"256"`), looked up in
//! [`KEY_LENGTHS`]. Any name of the family therefore gets its key length the
//! same way, whatever primitive it maps to.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chest_common::{Error, Result};

/// IV length in bytes for every mode in the table.
pub const IV_LENGTH: usize = 16;

/// Bit-size digits to required key length in bytes.
pub const KEY_LENGTHS: [(&str, usize); 3] = [("128", 16), ("192", 24), ("256", 32)];

/// AES key schedule size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySize {
    Aes128,
    Aes192,
    Aes256,
}

/// Block cipher mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// CBC with PKCS#7 padding.
    Cbc,
    /// CTR with a 128-bit big-endian counter.
    Ctr,
    Ofb,
    /// Full-block (128-bit) CFB.
    Cfb,
}

/// Concrete algorithm a symbolic cipher name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Algorithm {
    pub size: KeySize,
    pub mode: Mode,
}

impl Algorithm {
    const fn new(size: KeySize, mode: Mode) -> Self {
        Self { size, mode }
    }

    /// OpenSSL-style identifier, e.g. `aes-256-ctr`.
    pub fn id(&self) -> &'static str {
        use KeySize::*;
        use Mode::*;
        match (self.size, self.mode) {
            (Aes128, Cbc) => "aes-128-cbc",
            (Aes128, Ctr) => "aes-128-ctr",
            (Aes128, Ofb) => "aes-128-ofb",
            (Aes128, Cfb) => "aes-128-cfb",
            (Aes192, Cbc) => "aes-192-cbc",
            (Aes192, Ctr) => "aes-192-ctr",
            (Aes192, Ofb) => "aes-192-ofb",
            (Aes192, Cfb) => "aes-192-cfb",
            (Aes256, Cbc) => "aes-256-cbc",
            (Aes256, Ctr) => "aes-256-ctr",
            (Aes256, Ofb) => "aes-256-ofb",
            (Aes256, Cfb) => "aes-256-cfb",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for Algorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// Every supported symbolic cipher name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CipherName {
    #[serde(rename = "AES_128")]
    Aes128,
    #[serde(rename = "AES_128_CTR")]
    Aes128Ctr,
    #[serde(rename = "AES_128_OFB")]
    Aes128Ofb,
    #[serde(rename = "AES_128_CFB")]
    Aes128Cfb,
    #[serde(rename = "AES_128_CBC")]
    Aes128Cbc,
    #[serde(rename = "AES_192")]
    Aes192,
    #[serde(rename = "AES_192_CTR")]
    Aes192Ctr,
    #[serde(rename = "AES_192_OFB")]
    Aes192Ofb,
    #[serde(rename = "AES_192_CFB")]
    Aes192Cfb,
    #[serde(rename = "AES_192_CBC")]
    Aes192Cbc,
    #[serde(rename = "AES_256")]
    Aes256,
    #[serde(rename = "AES_256_CTR")]
    Aes256Ctr,
    #[serde(rename = "AES_256_OFB")]
    Aes256Ofb,
    #[serde(rename = "AES_256_CFB")]
    Aes256Cfb,
    #[serde(rename = "AES_256_CBC")]
    Aes256Cbc,
}

impl CipherName {
    /// Table order.
    pub const ALL: [CipherName; 15] = [
        CipherName::Aes128,
        CipherName::Aes128Ctr,
        CipherName::Aes128Ofb,
        CipherName::Aes128Cfb,
        CipherName::Aes128Cbc,
        CipherName::Aes192,
        CipherName::Aes192Ctr,
        CipherName::Aes192Ofb,
        CipherName::Aes192Cfb,
        CipherName::Aes192Cbc,
        CipherName::Aes256,
        CipherName::Aes256Ctr,
        CipherName::Aes256Ofb,
        CipherName::Aes256Cfb,
        CipherName::Aes256Cbc,
    ];

    /// The symbolic name as written in headers and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            CipherName::Aes128 => "AES_128",
            CipherName::Aes128Ctr => "AES_128_CTR",
            CipherName::Aes128Ofb => "AES_128_OFB",
            CipherName::Aes128Cfb => "AES_128_CFB",
            CipherName::Aes128Cbc => "AES_128_CBC",
            CipherName::Aes192 => "AES_192",
            CipherName::Aes192Ctr => "AES_192_CTR",
            CipherName::Aes192Ofb => "AES_192_OFB",
            CipherName::Aes192Cfb => "AES_192_CFB",
            CipherName::Aes192Cbc => "AES_192_CBC",
            CipherName::Aes256 => "AES_256",
            CipherName::Aes256Ctr => "AES_256_CTR",
            CipherName::Aes256Ofb => "AES_256_OFB",
            CipherName::Aes256Cfb => "AES_256_CFB",
            CipherName::Aes256Cbc => "AES_256_CBC",
        }
    }

    /// The algorithm this name maps to. Bare `AES_<bits>` names are CBC.
    pub fn algorithm(self) -> Algorithm {
        use KeySize::*;
        use Mode::*;
        match self {
            CipherName::Aes128 | CipherName::Aes128Cbc => Algorithm::new(Aes128, Cbc),
            CipherName::Aes128Ctr => Algorithm::new(Aes128, Ctr),
            CipherName::Aes128Ofb => Algorithm::new(Aes128, Ofb),
            CipherName::Aes128Cfb => Algorithm::new(Aes128, Cfb),
            CipherName::Aes192 | CipherName::Aes192Cbc => Algorithm::new(Aes192, Cbc),
            CipherName::Aes192Ctr => Algorithm::new(Aes192, Ctr),
            CipherName::Aes192Ofb => Algorithm::new(Aes192, Ofb),
            CipherName::Aes192Cfb => Algorithm::new(Aes192, Cfb),
            CipherName::Aes256 | CipherName::Aes256Cbc => Algorithm::new(Aes256, Cbc),
            CipherName::Aes256Ctr => Algorithm::new(Aes256, Ctr),
            CipherName::Aes256Ofb => Algorithm::new(Aes256, Ofb),
            CipherName::Aes256Cfb => Algorithm::new(Aes256, Cfb),
        }
    }
}

impl fmt::Display for CipherName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CipherName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownCipher(s.to_string()))
    }
}

/// A resolved table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CipherDescriptor {
    pub name: CipherName,
    pub algorithm: Algorithm,
    /// Required key length in bytes.
    pub key_length: usize,
}

/// Read-only cipher table, built once on first use.
#[derive(Debug)]
pub struct CipherTable {
    entries: Vec<CipherDescriptor>,
}

impl CipherTable {
    fn build() -> Self {
        let entries = CipherName::ALL
            .iter()
            .filter_map(|&name| {
                let key_length = key_length_for_bits(&extract_bit_size(name.as_str()))?;
                Some(CipherDescriptor {
                    name,
                    algorithm: name.algorithm(),
                    key_length,
                })
            })
            .collect();
        Self { entries }
    }

    /// The process-wide table.
    pub fn global() -> &'static CipherTable {
        static TABLE: OnceLock<CipherTable> = OnceLock::new();
        TABLE.get_or_init(CipherTable::build)
    }

    /// Look up a symbolic name.
    pub fn get(&self, name: &str) -> Option<&CipherDescriptor> {
        self.entries.iter().find(|d| d.name.as_str() == name)
    }

    /// All entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &CipherDescriptor> {
        self.entries.iter()
    }
}

/// Resolve a symbolic cipher name against the global table.
///
/// # Errors
/// - `UnknownCipher` if the name is not in the table
pub fn resolve_cipher(name: &str) -> Result<CipherDescriptor> {
    CipherTable::global()
        .get(name)
        .copied()
        .ok_or_else(|| Error::UnknownCipher(name.to_string()))
}

/// Concatenate every ASCII digit in `name`, in order.
///
/// `"AES_256_CTR"` gives `"256"`. A name without digits gives `""`.
pub fn extract_bit_size(name: &str) -> String {
    name.chars().filter(char::is_ascii_digit).collect()
}

/// Look up the key length for a bit-size digit string.
pub fn key_length_for_bits(bits: &str) -> Option<usize> {
    KEY_LENGTHS
        .iter()
        .find(|(b, _)| *b == bits)
        .map(|&(_, len)| len)
}

/// Required key length for a cipher name, from its digits alone.
///
/// This does not consult the table, so a name like `"AES_256_XTS"` still
/// yields 32.
///
/// # Errors
/// - `UnknownCipher` if the digits are not a known bit size
pub fn required_key_length(name: &str) -> Result<usize> {
    key_length_for_bits(&extract_bit_size(name))
        .ok_or_else(|| Error::UnknownCipher(name.to_string()))
}

/// Byte-exact length check. No truncation, no padding.
pub fn validate_key_length(key: &[u8], required: usize) -> bool {
    key.len() == required
}

/// [`validate_key_length`] as a `Result`.
pub fn check_key_length(key: &[u8], required: usize) -> Result<()> {
    if validate_key_length(key, required) {
        Ok(())
    } else {
        Err(Error::InvalidKeyLength {
            expected: required,
            actual: key.len(),
        })
    }
}
