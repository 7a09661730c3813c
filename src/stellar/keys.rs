// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! StrKey encoding for Stellar account ids (`G...`) and secret seeds (`S...`).
//!
//! A StrKey is base32 (RFC 4648, no padding) over
//! `version_byte || payload(32) || crc16_xmodem(version_byte || payload)`,
//! with the checksum stored little-endian. Encoded keys are 56 characters.

use data_encoding::BASE32_NOPAD;
use ed25519_dalek::SigningKey;

const VERSION_ACCOUNT_ID: u8 = 6 << 3;
const VERSION_SEED: u8 = 18 << 3;

const ENCODED_LEN: usize = 56;
const PAYLOAD_LEN: usize = 32;

/// CRC16-XModem (poly 0x1021, init 0).
fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn decode(version: u8, encoded: &str) -> Option<[u8; PAYLOAD_LEN]> {
    if encoded.len() != ENCODED_LEN {
        return None;
    }
    let raw = BASE32_NOPAD.decode(encoded.as_bytes()).ok()?;
    if raw.len() != 1 + PAYLOAD_LEN + 2 || raw[0] != version {
        return None;
    }
    let (body, checksum) = raw.split_at(1 + PAYLOAD_LEN);
    let expected = crc16_xmodem(body).to_le_bytes();
    if checksum != expected {
        return None;
    }
    let mut payload = [0u8; PAYLOAD_LEN];
    payload.copy_from_slice(&body[1..]);
    Some(payload)
}

fn encode(version: u8, payload: &[u8; PAYLOAD_LEN]) -> String {
    let mut raw = Vec::with_capacity(1 + PAYLOAD_LEN + 2);
    raw.push(version);
    raw.extend_from_slice(payload);
    let checksum = crc16_xmodem(&raw);
    raw.extend_from_slice(&checksum.to_le_bytes());
    BASE32_NOPAD.encode(&raw)
}

/// Cheap shape check: `G` followed by 55 upper-case base32 characters.
pub fn looks_like_public_key(s: &str) -> bool {
    s.len() == ENCODED_LEN
        && s.starts_with('G')
        && s.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Full check including version byte and checksum.
pub fn is_valid_public_key(s: &str) -> bool {
    looks_like_public_key(s) && decode(VERSION_ACCOUNT_ID, s).is_some()
}

pub fn is_valid_secret_key(s: &str) -> bool {
    decode(VERSION_SEED, s).is_some()
}

/// Derive the `G...` account id for an `S...` seed.
pub fn public_key_from_secret(secret: &str) -> Option<String> {
    let seed = decode(VERSION_SEED, secret)?;
    let signing_key = SigningKey::from_bytes(&seed);
    Some(encode(
        VERSION_ACCOUNT_ID,
        &signing_key.verifying_key().to_bytes(),
    ))
}

/// Transaction hashes are 64 lower-case hex characters.
pub fn is_valid_tx_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
