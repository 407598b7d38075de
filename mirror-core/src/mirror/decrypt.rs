//! Optional payload decryption for the video-data channel.
//!
//! Without a session key the bridge is the identity, which is what
//! unencrypted test streams rely on. With a key, each payload is
//! decrypted independently with AES-CBC and a fixed all-zero IV: no
//! chaining state survives between packets.
//!
//! The fixed IV and out-of-band key are placeholders. Real senders
//! derive both from a key-exchange handshake that this receiver does not
//! implement, so encrypted streams from such senders will not decode.

use std::fmt;

use aes::{Aes128, Aes192, Aes256};
use bytes::Bytes;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockCipher, BlockDecryptMut, KeyInit, KeyIvInit};

use crate::error::MirrorError;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// IV used for every packet until key exchange exists.
pub const PLACEHOLDER_IV: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

/// A validated AES session key.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionKey {
    Aes128([u8; 16]),
    Aes192([u8; 24]),
    Aes256([u8; 32]),
}

impl SessionKey {
    /// Accepts 16, 24 or 32 raw bytes.
    pub fn from_bytes(key: &[u8]) -> Result<Self, MirrorError> {
        let bad = |_| MirrorError::InvalidKey(format!("{} bytes is not an AES key length", key.len()));
        match key.len() {
            16 => Ok(Self::Aes128(key.try_into().map_err(bad)?)),
            24 => Ok(Self::Aes192(key.try_into().map_err(bad)?)),
            32 => Ok(Self::Aes256(key.try_into().map_err(bad)?)),
            n => Err(MirrorError::InvalidKey(format!(
                "{n} bytes is not an AES key length"
            ))),
        }
    }

    /// Parse a hex-encoded key.
    pub fn from_hex(hex_key: &str) -> Result<Self, MirrorError> {
        Self::from_bytes(&hex::decode(hex_key.trim())?)
    }

    pub fn bits(&self) -> usize {
        match self {
            Self::Aes128(_) => 128,
            Self::Aes192(_) => 192,
            Self::Aes256(_) => 256,
        }
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey(AES-{}, <redacted>)", self.bits())
    }
}

/// Decrypt one payload.
///
/// Returns the payload unchanged when `key` is `None`. Returns `None`
/// when a key is set and decryption fails; the caller drops the frame.
pub fn decrypt(payload: &[u8], key: Option<&SessionKey>) -> Option<Bytes> {
    match key {
        None => Some(Bytes::copy_from_slice(payload)),
        Some(key) => try_decrypt(payload, key).ok(),
    }
}

/// Decrypt with a key, reporting why it failed.
pub fn try_decrypt(payload: &[u8], key: &SessionKey) -> Result<Bytes, MirrorError> {
    if payload.len() % BLOCK_SIZE != 0 {
        return Err(MirrorError::Decrypt("payload is not a whole number of blocks"));
    }

    let mut buf = payload.to_vec();
    let plain_len = match key {
        SessionKey::Aes128(k) => cbc_decrypt::<Aes128>(k, &mut buf)?,
        SessionKey::Aes192(k) => cbc_decrypt::<Aes192>(k, &mut buf)?,
        SessionKey::Aes256(k) => cbc_decrypt::<Aes256>(k, &mut buf)?,
    };
    buf.truncate(plain_len);
    Ok(Bytes::from(buf))
}

fn cbc_decrypt<C>(key: &[u8], buf: &mut [u8]) -> Result<usize, MirrorError>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let cipher = cbc::Decryptor::<C>::new_from_slices(key, &PLACEHOLDER_IV)
        .map_err(|_| MirrorError::Decrypt("key or iv length rejected"))?;
    cipher
        .decrypt_padded_mut::<NoPadding>(buf)
        .map(|plain| plain.len())
        .map_err(|_| MirrorError::Decrypt("block cipher rejected payload"))
}

// ── Tests ────────────────────────────────────────────────────────
