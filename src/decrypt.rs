//! Decryption of Deezer's striped Blowfish payloads.
//!
//! # Encryption Format
//!
//! Deezer uses a striped encryption pattern:
//! * Content is divided into 2KB blocks
//! * Every third block, starting with the first, is encrypted
//! * A trailing block shorter than 2KB is never encrypted
//! * Encryption uses Blowfish in CBC mode with a fixed IV, reset per block
//!
//! The Blowfish key is derived per track from the track id and a secret
//! that is not part of this crate and must be configured by the user.
//!
//! Payloads are decrypted in place once fully downloaded.

use std::{ops::Deref, str::FromStr};

use blowfish::{cipher::BlockDecryptMut, cipher::KeyIvInit, Blowfish};
use cbc::cipher::block_padding::NoPadding;
use md5::{Digest, Md5};
use veil::Redact;

use crate::error::{Error, Result};

/// Length of decryption keys in bytes.
pub const KEY_LENGTH: usize = 16;

/// Raw key bytes.
pub type RawKey = [u8; KEY_LENGTH];

/// Fixed IV for CBC decryption.
const CBC_BF_IV: &[u8; 8] = b"\x00\x01\x02\x03\x04\x05\x06\x07";

/// Size of each stripe block.
pub const CBC_BLOCK_SIZE: usize = 2 * 1024;

/// One in this many blocks is encrypted.
const CBC_STRIPE_COUNT: usize = 3;

/// Decryption key, either the configured secret or one derived from it.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Redact)]
#[redact(all)]
pub struct Key(RawKey);

impl FromStr for Key {
    type Err = Error;

    /// Parses a key from exactly 16 bytes of text.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `s` is not 16 bytes long.
    fn from_str(s: &str) -> Result<Self> {
        let len = s.len();
        if len != KEY_LENGTH {
            return Err(Error::out_of_range(format!(
                "key length is {len} but should be {KEY_LENGTH}",
            )));
        }

        let mut key = RawKey::default();
        key.copy_from_slice(s.as_bytes());

        Ok(Self(key))
    }
}

impl Deref for Key {
    type Target = RawKey;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Derives the Blowfish key of a track.
///
/// Byte `i` of the key is `h[i] ^ h[i + 16] ^ secret[i]`, where `h` is the
/// lowercase hexadecimal MD5 digest of the decimal track id.
#[must_use]
pub fn key_for_track_id(track_id: u64, secret: &Key) -> Key {
    let track_hash = format!("{:x}", Md5::digest(track_id.to_string()));
    let track_hash = track_hash.as_bytes();

    let mut key = RawKey::default();
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = track_hash[i] ^ track_hash[i + KEY_LENGTH] ^ secret[i];
    }
    Key(key)
}

/// Decrypts the payload of track `track_id` in place.
///
/// # Errors
///
/// Returns `DataLoss` if a block cannot be decrypted.
pub fn decrypt(track_id: u64, secret: &Key, payload: &mut [u8]) -> Result<()> {
    let key = key_for_track_id(track_id, secret);

    for block in payload
        .chunks_exact_mut(CBC_BLOCK_SIZE)
        .step_by(CBC_STRIPE_COUNT)
    {
        // The state of the cipher is reset on each block.
        let cipher = cbc::Decryptor::<Blowfish>::new_from_slices(&*key, CBC_BF_IV)
            .map_err(|e| Error::internal(e.to_string()))?;

        cipher
            .decrypt_padded_mut::<NoPadding>(block)
            .map_err(|e| Error::data_loss(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blowfish::cipher::BlockEncryptMut;

    const SECRET: &str = "0123456789abcdef";

    fn encrypt_block(key: &Key, block: &mut [u8]) {
        let len = block.len();
        cbc::Encryptor::<Blowfish>::new_from_slices(&**key, CBC_BF_IV)
            .unwrap()
            .encrypt_padded_mut::<NoPadding>(block, len)
            .unwrap();
    }

    #[test]
    fn derived_key_mixes_hash_and_secret() {
        let secret: Key = SECRET.parse().unwrap();
        let key = key_for_track_id(3_135_553, &secret);

        let hash = format!("{:x}", Md5::digest("3135553"));
        let hash = hash.as_bytes();
        assert_eq!(key[0], hash[0] ^ hash[16] ^ b'0');
        assert_eq!(key[15], hash[15] ^ hash[31] ^ b'f');
        assert_ne!(key, key_for_track_id(3_135_554, &secret));
    }

    #[test]
    fn decrypts_every_third_full_block() {
        let secret: Key = SECRET.parse().unwrap();
        let key = key_for_track_id(42, &secret);

        let plain: Vec<u8> = (0..CBC_BLOCK_SIZE * 3 + 100)
            .map(|i| u8::try_from(i % 251).unwrap())
            .collect();

        let mut payload = plain.clone();
        encrypt_block(&key, &mut payload[..CBC_BLOCK_SIZE]);
        assert_ne!(payload, plain);

        decrypt(42, &secret, &mut payload).unwrap();
        assert_eq!(payload, plain);
    }

    #[test]
    fn short_payload_is_untouched() {
        let secret: Key = SECRET.parse().unwrap();
        let mut payload = vec![9u8; CBC_BLOCK_SIZE - 1];

        decrypt(42, &secret, &mut payload).unwrap();
        assert_eq!(payload, vec![9u8; CBC_BLOCK_SIZE - 1]);
    }

    #[test]
    fn key_must_be_sixteen_bytes() {
        assert!("12345".parse::<Key>().is_err());
        assert!("12345678901234567".parse::<Key>().is_err());
        assert_eq!(&*"1234567890123456".parse::<Key>().unwrap(), b"1234567890123456");
    }
}
