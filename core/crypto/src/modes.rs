//! AES encryption and decryption in the modes the cipher table names.
//!
//! None of these modes authenticate the ciphertext. A wrong key under CBC
//! usually surfaces as a padding error; under the stream modes it silently
//! produces garbage.

use aes::{Aes128, Aes192, Aes256};
use cipher::block_padding::Pkcs7;
use cipher::{AsyncStreamCipher, BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::table::{Algorithm, KeySize, Mode, IV_LENGTH};
use chest_common::{Error, Result};

/// Run `$body` with `$c` bound to the AES type for `$size`.
macro_rules! with_aes {
    ($size:expr, |$c:ident| $body:expr) => {
        match $size {
            KeySize::Aes128 => {
                type $c = Aes128;
                $body
            }
            KeySize::Aes192 => {
                type $c = Aes192;
                $body
            }
            KeySize::Aes256 => {
                type $c = Aes256;
                $body
            }
        }
    };
}

/// Generate a fresh random IV.
pub fn generate_iv() -> [u8; IV_LENGTH] {
    let mut iv = [0u8; IV_LENGTH];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext` under `algorithm`.
///
/// # Preconditions
/// - `key` must be the AES key size for `algorithm.size`
/// - `iv` must be IV_LENGTH bytes
///
/// # Postconditions
/// - CBC output is padded to a whole number of blocks; the other modes
///   preserve the plaintext length
///
/// # Errors
/// - `Crypto` if the key or IV length is wrong for the algorithm
pub fn encrypt(algorithm: Algorithm, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    check_iv(iv)?;
    match algorithm.mode {
        Mode::Cbc => with_aes!(algorithm.size, |C| cbc_encrypt::<cbc::Encryptor<C>>(
            key, iv, plaintext
        )),
        Mode::Ctr => with_aes!(algorithm.size, |C| apply_keystream::<ctr::Ctr128BE<C>>(
            key, iv, plaintext
        )),
        Mode::Ofb => with_aes!(algorithm.size, |C| apply_keystream::<ofb::Ofb<C>>(
            key, iv, plaintext
        )),
        Mode::Cfb => with_aes!(algorithm.size, |C| cfb_encrypt::<cfb_mode::Encryptor<C>>(
            key, iv, plaintext
        )),
    }
}

/// Decrypt `ciphertext` under `algorithm`.
///
/// # Errors
/// - `Crypto` if the key or IV length is wrong for the algorithm
/// - `Crypto` if CBC padding does not verify
pub fn decrypt(algorithm: Algorithm, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    check_iv(iv)?;
    match algorithm.mode {
        Mode::Cbc => with_aes!(algorithm.size, |C| cbc_decrypt::<cbc::Decryptor<C>>(
            key, iv, ciphertext
        )),
        Mode::Ctr => with_aes!(algorithm.size, |C| apply_keystream::<ctr::Ctr128BE<C>>(
            key, iv, ciphertext
        )),
        Mode::Ofb => with_aes!(algorithm.size, |C| apply_keystream::<ofb::Ofb<C>>(
            key, iv, ciphertext
        )),
        Mode::Cfb => with_aes!(algorithm.size, |C| cfb_decrypt::<cfb_mode::Decryptor<C>>(
            key, iv, ciphertext
        )),
    }
}

fn check_iv(iv: &[u8]) -> Result<()> {
    if iv.len() != IV_LENGTH {
        return Err(Error::Crypto(format!(
            "Invalid IV length: expected {}, got {}",
            IV_LENGTH,
            iv.len()
        )));
    }
    Ok(())
}

fn init<T: KeyIvInit>(key: &[u8], iv: &[u8]) -> Result<T> {
    T::new_from_slices(key, iv).map_err(|_| {
        Error::Crypto(format!(
            "Cipher rejected key of {} bytes and IV of {} bytes",
            key.len(),
            iv.len()
        ))
    })
}

fn cbc_encrypt<E: KeyIvInit + BlockEncryptMut>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let encryptor: E = init(key, iv)?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(data))
}

fn cbc_decrypt<D: KeyIvInit + BlockDecryptMut>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let decryptor: D = init(key, iv)?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| Error::Crypto("Decryption failed: bad padding".to_string()))
}

fn apply_keystream<S: KeyIvInit + StreamCipher>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut stream: S = init(key, iv)?;
    let mut buf = data.to_vec();
    stream.apply_keystream(&mut buf);
    Ok(buf)
}

fn cfb_encrypt<E: KeyIvInit + AsyncStreamCipher + BlockEncryptMut>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let encryptor: E = init(key, iv)?;
    let mut buf = data.to_vec();
    AsyncStreamCipher::encrypt(encryptor, &mut buf);
    Ok(buf)
}

fn cfb_decrypt<D: KeyIvInit + AsyncStreamCipher + BlockDecryptMut>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let decryptor: D = init(key, iv)?;
    let mut buf = data.to_vec();
    AsyncStreamCipher::decrypt(decryptor, &mut buf);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CipherName, CipherTable};
    use proptest::prelude::*;

    fn key_for(algorithm: Algorithm) -> Vec<u8> {
        let len = match algorithm.size {
            KeySize::Aes128 => 16,
            KeySize::Aes192 => 24,
            KeySize::Aes256 => 32,
        };
        vec![0x42u8; len]
    }

    #[test]
    fn test_every_table_entry_round_trips() {
        let plaintext = b"CHEST CONTENT";
        for descriptor in CipherTable::global().iter() {
            let key = key_for(descriptor.algorithm);
            let iv = generate_iv();
            let ct = encrypt(descriptor.algorithm, &key, &iv, plaintext).unwrap();
            assert_ne!(&ct[..plaintext.len()], plaintext, "{}", descriptor.name);
            let pt = decrypt(descriptor.algorithm, &key, &iv, &ct).unwrap();
            assert_eq!(pt, plaintext, "{}", descriptor.name);
        }
    }

    #[test]
    fn test_cbc_pads_to_block() {
        let algorithm = CipherName::Aes256Cbc.algorithm();
        let key = key_for(algorithm);
        let iv = [7u8; IV_LENGTH];
        assert_eq!(encrypt(algorithm, &key, &iv, b"").unwrap().len(), 16);
        assert_eq!(encrypt(algorithm, &key, &iv, &[1u8; 16]).unwrap().len(), 32);
    }

    #[test]
    fn test_stream_modes_preserve_length() {
        for name in [CipherName::Aes128Ctr, CipherName::Aes192Ofb, CipherName::Aes256Cfb] {
            let algorithm = name.algorithm();
            let key = key_for(algorithm);
            let iv = [7u8; IV_LENGTH];
            assert_eq!(encrypt(algorithm, &key, &iv, b"abcde").unwrap().len(), 5);
        }
    }

    #[test]
    fn test_ctr_known_answer() {
        // NIST SP 800-38A F.5.5, first block.
        let key = hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
            .unwrap();
        let iv = hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff").unwrap();
        let pt = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let ct = encrypt(CipherName::Aes256Ctr.algorithm(), &key, &iv, &pt).unwrap();
        assert_eq!(hex::encode(ct), "601ec313775789a5b7a7f504bbf3d228");
    }

    #[test]
    fn test_cbc_wrong_key_fails_or_differs() {
        let algorithm = CipherName::Aes256Cbc.algorithm();
        let iv = generate_iv();
        let ct = encrypt(algorithm, &[1u8; 32], &iv, b"Secret data").unwrap();
        match decrypt(algorithm, &[2u8; 32], &iv, &ct) {
            Err(Error::Crypto(_)) => {}
            Ok(pt) => assert_ne!(pt, b"Secret data"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cbc_truncated_ciphertext_fails() {
        let algorithm = CipherName::Aes128Cbc.algorithm();
        let key = key_for(algorithm);
        let iv = generate_iv();
        let ct = encrypt(algorithm, &key, &iv, b"0123456789abcdef-more").unwrap();
        assert!(decrypt(algorithm, &key, &iv, &ct[..ct.len() - 3]).is_err());
    }

    #[test]
    fn test_rejects_bad_key_and_iv_lengths() {
        let algorithm = CipherName::Aes256Ctr.algorithm();
        assert!(matches!(
            encrypt(algorithm, &[0u8; 16], &[0u8; IV_LENGTH], b"x"),
            Err(Error::Crypto(_))
        ));
        assert!(matches!(
            encrypt(algorithm, &[0u8; 32], &[0u8; 12], b"x"),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_generate_iv_is_fresh() {
        assert_ne!(generate_iv(), generate_iv());
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            index in 0usize..CipherName::ALL.len(),
            data in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let algorithm = CipherName::ALL[index].algorithm();
            let key = key_for(algorithm);
            let iv = generate_iv();
            let ct = encrypt(algorithm, &key, &iv, &data).unwrap();
            prop_assert_eq!(decrypt(algorithm, &key, &iv, &ct).unwrap(), data);
        }
    }
}
