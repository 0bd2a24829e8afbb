//! Canonical account address type.
//!
//! An address is exactly 20 bytes, derived from an Ed25519 public key as
//! `Blake2b-256(pubkey)[0..20]`. Internally and in the state trie only the
//! raw bytes exist.
//!
//! The human-facing form is a 36-character string: `NQ`, two IBAN-style
//! check digits, and 32 Base32 characters over the alphabet
//! `0123456789ABCDEFGHJKLMNPQRSTUVXY`, grouped in blocks of four for
//! display. Spaces are ignored on input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hash::blake2b;

pub const ADDRESS_SIZE: usize = 20;

const BASE32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKLMNPQRSTUVXY";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub [u8; ADDRESS_SIZE]);

impl Address {
    #[inline]
    pub fn from_bytes(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Address(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// Derive the address of an Ed25519 public key.
    pub fn from_public_key(pubkey: &[u8; 32]) -> Self {
        let digest = blake2b(pubkey);
        let mut addr = [0u8; ADDRESS_SIZE];
        addr.copy_from_slice(&digest[..ADDRESS_SIZE]);
        Address(addr)
    }

    /// Encode to the user-friendly form, with a space every four characters.
    pub fn to_user_friendly(&self) -> String {
        // Compute the check over the string with "00" as a placeholder.
        let mut compact = [0u8; 36];
        compact[..4].copy_from_slice(b"NQ00");
        compact[4..].copy_from_slice(&base32_encode(&self.0));
        let check = 98 - iban_check(&compact).expect("alphabet characters are always valid");

        let mut out = String::with_capacity(44);
        out.push_str("NQ");
        out.push((b'0' + check / 10) as char);
        out.push((b'0' + check % 10) as char);
        for block in compact[4..].chunks(4) {
            out.push(' ');
            out.push_str(std::str::from_utf8(block).expect("alphabet is ascii"));
        }
        out
    }

    /// Decode the user-friendly form. Spaces are ignored; the remaining
    /// input must be exactly 36 characters with a valid check.
    pub fn from_user_friendly(encoded: &str) -> Result<Self, AddressError> {
        let mut compact = [0u8; 36];
        let mut n = 0;
        for c in encoded.bytes() {
            if c == b' ' {
                continue;
            }
            if n == 36 {
                return Err(AddressError::InvalidLength);
            }
            compact[n] = c;
            n += 1;
        }
        if n != 36 {
            return Err(AddressError::InvalidLength);
        }
        if &compact[..2] != b"NQ" {
            return Err(AddressError::InvalidCountryCode);
        }
        if iban_check(&compact)? != 1 {
            return Err(AddressError::InvalidChecksum);
        }
        Ok(Address(base32_decode(&compact[4..])?))
    }
}

impl AsRef<[u8]> for Address {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl nimiq_codec::Encode for Address {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }

    fn encoded_size(&self) -> usize {
        ADDRESS_SIZE
    }
}

impl nimiq_codec::Decode for Address {
    fn decode_from(r: &mut nimiq_codec::Reader<'_>) -> nimiq_codec::Result<Self> {
        Ok(Address(<[u8; ADDRESS_SIZE]>::decode_from(r)?))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_user_friendly())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_user_friendly(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid address: length without spaces not 36")]
    InvalidLength,
    #[error("invalid address: should start with \"NQ\"")]
    InvalidCountryCode,
    #[error("invalid address: invalid checksum")]
    InvalidChecksum,
    #[error("invalid address: unexpected character {character:?}")]
    InvalidCharacter { character: char },
}

/// Base32-encode 20 bytes to exactly 32 alphabet characters.
fn base32_encode(data: &[u8; ADDRESS_SIZE]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, chunk) in data.chunks(5).enumerate() {
        let mut acc = 0u64;
        for &b in chunk {
            acc = acc << 8 | u64::from(b);
        }
        for j in 0..8 {
            let bits = (acc >> (5 * (7 - j))) & 0x1f;
            out[i * 8 + j] = BASE32_ALPHABET[bits as usize];
        }
    }
    out
}

/// Decode 32 alphabet characters back to 20 bytes. Case-sensitive.
fn base32_decode(chars: &[u8]) -> Result<[u8; ADDRESS_SIZE], AddressError> {
    debug_assert_eq!(chars.len(), 32);
    let mut out = [0u8; ADDRESS_SIZE];
    for i in 0..4 {
        let mut acc = 0u64;
        for &c in &chars[i * 8..(i + 1) * 8] {
            let bits = BASE32_ALPHABET
                .iter()
                .position(|&a| a == c)
                .ok_or(AddressError::InvalidCharacter {
                    character: c as char,
                })?;
            acc = acc << 5 | bits as u64;
        }
        out[i * 5..(i + 1) * 5].copy_from_slice(&acc.to_be_bytes()[3..]);
    }
    Ok(out)
}

/// IBAN mod-97 check over the 36-character compact form: the data region
/// and then the first four characters are mapped to decimal digits
/// (letters become their two-digit value, A=10..Z=35) and the resulting
/// number is reduced mod 97.
fn iban_check(compact: &[u8; 36]) -> Result<u8, AddressError> {
    let mut rem: u32 = 0;
    let mut push = |digit: u8| rem = (rem * 10 + u32::from(digit)) % 97;
    for &c in compact[4..].iter().chain(&compact[..4]) {
        match c {
            b'0'..=b'9' => push(c - b'0'),
            b'A'..=b'Z' | b'a'..=b'z' => {
                let value = (c.to_ascii_uppercase()) - b'A' + 10;
                push(value / 10);
                push(value % 10);
            }
            _ => {
                return Err(AddressError::InvalidCharacter {
                    character: c as char,
                })
            }
        }
    }
    Ok(rem as u8)
}
