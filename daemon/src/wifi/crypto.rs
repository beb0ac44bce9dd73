// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cipher primitives for the receive path: RC4 with CRC-32 ICV for
//! WEP and TKIP, the TKIP key mixing function, the Michael MIC, and
//! AES-CCM for CCMP.

use aes::Aes128;
use ccm::aead::generic_array::GenericArray;
use ccm::aead::{Aead, KeyInit, Payload};
use ccm::consts::{U13, U8};
use ccm::Ccm;
use thiserror::Error;

use crate::wifi::key::CipherSuite;

/// CCMP as 802.11 uses it: AES-128, 8-byte MIC, 13-byte nonce.
type Aes128Ccm = Ccm<Aes128, U8, U13>;

pub const WEP_IV_LEN: usize = 4;
pub const EXT_IV_LEN: usize = 8;
pub const ICV_LEN: usize = 4;
pub const CCMP_MIC_LEN: usize = 8;
pub const MICHAEL_MIC_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("bad key length {have} for {suite:?}")]
    BadKeyLength { suite: CipherSuite, have: usize },
    #[error("payload too short for {0:?}")]
    Truncated(CipherSuite),
    #[error("{0:?} integrity check failed")]
    Integrity(CipherSuite),
}

/// RC4 stream cipher state.
pub struct Rc4 {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    pub fn new(key: &[u8]) -> Rc4 {
        let mut s = [0u8; 256];
        for (i, v) in s.iter_mut().enumerate() {
            *v = i as u8;
        }
        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }
        Rc4 { s, i: 0, j: 0 }
    }

    /// XORs the keystream into `data` in place.
    pub fn xor(&mut self, data: &mut [u8]) {
        for byte in data {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.s[self.i as usize]);
            self.s.swap(self.i as usize, self.j as usize);
            let k = self.s
                [(self.s[self.i as usize].wrapping_add(self.s[self.j as usize])) as usize];
            *byte ^= k;
        }
    }
}

/// RC4 key for WEP: the 3-byte IV prepended to the key material.
pub fn wep_rc4_key(iv: &[u8], material: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(3 + material.len());
    key.extend_from_slice(&iv[..3]);
    key.extend_from_slice(material);
    key
}

/// Decrypts `region` (ciphertext followed by a 4-byte ICV) in place
/// with RC4 and verifies the ICV. Shared by WEP and TKIP; `suite`
/// labels the error.
pub fn rc4_crc_decrypt(
    rc4_key: &[u8],
    region: &mut [u8],
    suite: CipherSuite,
) -> Result<(), CryptoError> {
    if region.len() < ICV_LEN {
        return Err(CryptoError::Truncated(suite));
    }
    Rc4::new(rc4_key).xor(region);
    let (payload, icv) = region.split_at(region.len() - ICV_LEN);
    if icv != crc32fast::hash(payload).to_le_bytes() {
        return Err(CryptoError::Integrity(suite));
    }
    Ok(())
}

/// Encrypts `payload` with RC4, appending the encrypted ICV. Used by
/// the transmit path and tests.
pub fn rc4_crc_encrypt(rc4_key: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + ICV_LEN);
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    Rc4::new(rc4_key).xor(&mut out);
    out
}

// AES S-box, generated by walking the GF(2^8) multiplicative group
// and applying the affine transform.
const AES_SBOX: [u8; 256] = generate_aes_sbox();

// TKIP S-box: xtime(s) in the high byte, s ^ xtime(s) in the low.
const TKIP_SBOX: [u16; 256] = generate_tkip_sbox();

const fn xtime(x: u8) -> u8 {
    (x << 1) ^ (if x & 0x80 != 0 { 0x1b } else { 0 })
}

const fn generate_aes_sbox() -> [u8; 256] {
    let mut sbox = [0u8; 256];
    sbox[0] = 0x63;
    let mut p: u8 = 1;
    let mut q: u8 = 1;
    loop {
        // p advances by multiplying with 3, q by dividing by 3.
        p = p ^ (p << 1) ^ (if p & 0x80 != 0 { 0x1b } else { 0 });
        q ^= q << 1;
        q ^= q << 2;
        q ^= q << 4;
        if q & 0x80 != 0 {
            q ^= 0x09;
        }
        let affine =
            q ^ q.rotate_left(1) ^ q.rotate_left(2) ^ q.rotate_left(3) ^ q.rotate_left(4);
        sbox[p as usize] = affine ^ 0x63;
        if p == 1 {
            break;
        }
    }
    sbox
}

const fn generate_tkip_sbox() -> [u16; 256] {
    let mut sbox = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let s = AES_SBOX[i];
        sbox[i] = ((xtime(s) as u16) << 8) | ((s ^ xtime(s)) as u16);
        i += 1;
    }
    sbox
}

fn tkip_s(val: u16) -> u16 {
    TKIP_SBOX[(val & 0xff) as usize] ^ TKIP_SBOX[(val >> 8) as usize].swap_bytes()
}

fn tk16(tk: &[u8], i: usize) -> u16 {
    u16::from_le_bytes([tk[2 * i], tk[2 * i + 1]])
}

/// TKIP phase 1: mixes the temporal key, transmitter address and the
/// upper counter bits into an intermediate key.
fn tkip_phase1(tk: &[u8], ta: &[u8; 6], iv32: u32) -> [u16; 5] {
    let mut p1k = [
        (iv32 & 0xffff) as u16,
        (iv32 >> 16) as u16,
        u16::from_le_bytes([ta[0], ta[1]]),
        u16::from_le_bytes([ta[2], ta[3]]),
        u16::from_le_bytes([ta[4], ta[5]]),
    ];
    for i in 0..8u16 {
        let j = (i & 1) as usize;
        p1k[0] = p1k[0].wrapping_add(tkip_s(p1k[4] ^ tk16(tk, j)));
        p1k[1] = p1k[1].wrapping_add(tkip_s(p1k[0] ^ tk16(tk, 2 + j)));
        p1k[2] = p1k[2].wrapping_add(tkip_s(p1k[1] ^ tk16(tk, 4 + j)));
        p1k[3] = p1k[3].wrapping_add(tkip_s(p1k[2] ^ tk16(tk, 6 + j)));
        p1k[4] = p1k[4].wrapping_add(tkip_s(p1k[3] ^ tk16(tk, j)).wrapping_add(i));
    }
    p1k
}

/// TKIP phase 2: derives the per-frame RC4 key from the phase 1 key
/// and the lower counter bits.
fn tkip_phase2(tk: &[u8], p1k: &[u16; 5], iv16: u16) -> [u8; 16] {
    let mut ppk = [p1k[0], p1k[1], p1k[2], p1k[3], p1k[4], p1k[4].wrapping_add(iv16)];
    ppk[0] = ppk[0].wrapping_add(tkip_s(ppk[5] ^ tk16(tk, 0)));
    ppk[1] = ppk[1].wrapping_add(tkip_s(ppk[0] ^ tk16(tk, 1)));
    ppk[2] = ppk[2].wrapping_add(tkip_s(ppk[1] ^ tk16(tk, 2)));
    ppk[3] = ppk[3].wrapping_add(tkip_s(ppk[2] ^ tk16(tk, 3)));
    ppk[4] = ppk[4].wrapping_add(tkip_s(ppk[3] ^ tk16(tk, 4)));
    ppk[5] = ppk[5].wrapping_add(tkip_s(ppk[4] ^ tk16(tk, 5)));
    ppk[0] = ppk[0].wrapping_add((ppk[5] ^ tk16(tk, 6)).rotate_right(1));
    ppk[1] = ppk[1].wrapping_add((ppk[0] ^ tk16(tk, 7)).rotate_right(1));
    ppk[2] = ppk[2].wrapping_add(ppk[1].rotate_right(1));
    ppk[3] = ppk[3].wrapping_add(ppk[2].rotate_right(1));
    ppk[4] = ppk[4].wrapping_add(ppk[3].rotate_right(1));
    ppk[5] = ppk[5].wrapping_add(ppk[4].rotate_right(1));

    let mut rc4key = [0u8; 16];
    rc4key[0] = (iv16 >> 8) as u8;
    // The middle byte is clamped to dodge weak RC4 key classes.
    rc4key[1] = (((iv16 >> 8) as u8) | 0x20) & 0x7f;
    rc4key[2] = (iv16 & 0xff) as u8;
    rc4key[3] = ((ppk[5] ^ tk16(tk, 0)) >> 1) as u8;
    for i in 0..6 {
        rc4key[4 + 2 * i..6 + 2 * i].copy_from_slice(&ppk[i].to_le_bytes());
    }
    rc4key
}

/// Per-frame RC4 key for a TKIP frame from transmitter `ta` at
/// sequence counter `tsc`.
pub fn tkip_mixed_key(tk: &[u8], ta: &[u8; 6], tsc: u64) -> [u8; 16] {
    let iv16 = (tsc & 0xffff) as u16;
    let iv32 = (tsc >> 16) as u32;
    let p1k = tkip_phase1(tk, ta, iv32);
    tkip_phase2(tk, &p1k, iv16)
}

fn michael_block(l: &mut u32, r: &mut u32, val: u32) {
    *l ^= val;
    *r ^= l.rotate_left(17);
    *l = l.wrapping_add(*r);
    *r ^= ((*l & 0xff00_ff00) >> 8) | ((*l & 0x00ff_00ff) << 8);
    *l = l.wrapping_add(*r);
    *r ^= l.rotate_left(3);
    *l = l.wrapping_add(*r);
    *r ^= l.rotate_right(2);
    *l = l.wrapping_add(*r);
}

/// Michael MIC over the MSDU. The input stream is DA, SA, the QoS
/// priority with three zero bytes, then the MSDU padded with 0x5a and
/// zeros to a block boundary.
pub fn michael_mic(mic_key: &[u8], da: &[u8; 6], sa: &[u8; 6], priority: u8, msdu: &[u8]) -> [u8; 8] {
    let mut l = u32::from_le_bytes([mic_key[0], mic_key[1], mic_key[2], mic_key[3]]);
    let mut r = u32::from_le_bytes([mic_key[4], mic_key[5], mic_key[6], mic_key[7]]);

    michael_block(&mut l, &mut r, u32::from_le_bytes([da[0], da[1], da[2], da[3]]));
    michael_block(
        &mut l,
        &mut r,
        u16::from_le_bytes([da[4], da[5]]) as u32 | ((u16::from_le_bytes([sa[0], sa[1]]) as u32) << 16),
    );
    michael_block(&mut l, &mut r, u32::from_le_bytes([sa[2], sa[3], sa[4], sa[5]]));
    michael_block(&mut l, &mut r, priority as u32);

    let blocks = msdu.len() / 4;
    for chunk in msdu[..blocks * 4].chunks_exact(4) {
        michael_block(&mut l, &mut r, u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    // Trailing 0..3 bytes, a 0x5a pad byte, then a zero block.
    let mut left = msdu.len() % 4;
    let mut val: u32 = 0x5a;
    while left > 0 {
        val <<= 8;
        left -= 1;
        val |= msdu[blocks * 4 + left] as u32;
    }
    michael_block(&mut l, &mut r, val);
    michael_block(&mut l, &mut r, 0);

    let mut mic = [0u8; 8];
    mic[..4].copy_from_slice(&l.to_le_bytes());
    mic[4..].copy_from_slice(&r.to_le_bytes());
    mic
}

/// Decrypts a CCMP payload (ciphertext plus trailing 8-byte MIC) and
/// verifies it against the header-derived AAD.
pub fn ccmp_decrypt(
    tk: &[u8],
    nonce: &[u8; 13],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes128Ccm::new_from_slice(tk)
        .map_err(|_| CryptoError::BadKeyLength { suite: CipherSuite::Ccmp, have: tk.len() })?;
    if ciphertext.len() < CCMP_MIC_LEN {
        return Err(CryptoError::Truncated(CipherSuite::Ccmp));
    }
    cipher
        .decrypt(GenericArray::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::Integrity(CipherSuite::Ccmp))
}

/// CCMP encryption counterpart, for the transmit path and tests.
pub fn ccmp_encrypt(
    tk: &[u8],
    nonce: &[u8; 13],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes128Ccm::new_from_slice(tk)
        .map_err(|_| CryptoError::BadKeyLength { suite: CipherSuite::Ccmp, have: tk.len() })?;
    cipher
        .encrypt(GenericArray::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::Integrity(CipherSuite::Ccmp))
}
