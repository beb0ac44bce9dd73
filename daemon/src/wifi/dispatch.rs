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

//! Per-suite decryption of protected frames.

use softmac_packets::ieee80211::Ieee80211Hdr;

use crate::wifi::config::DeviceConfig;
use crate::wifi::crypto::{self, CryptoError, CCMP_MIC_LEN, EXT_IV_LEN, ICV_LEN, WEP_IV_LEN};
use crate::wifi::error::DropReason;
use crate::wifi::frame::Frame;
use crate::wifi::key::{CipherSuite, KeyId, KeyScope, KeyStore};

/// Extended IV present bit in the fourth IV byte.
pub const EXT_IV_BIT: u8 = 0x20;

/// What decryption established about the frame. The ICV or MIC
/// trailer is already stripped; the security header bytes remain in
/// place for the translation stage to consume.
#[derive(Debug)]
pub struct DecryptOutcome {
    pub suite: CipherSuite,
    pub key_id: KeyId,
    /// Sequence counter from the extended IV, for the replay check.
    pub tsc: Option<u64>,
    /// Security header bytes between MAC header and payload.
    pub iv_overhead: usize,
}

fn integrity(err: CryptoError) -> DropReason {
    match err {
        CryptoError::Integrity(suite) => DropReason::IntegrityFailure(suite),
        _ => DropReason::Malformed,
    }
}

/// Resolves a key for the frame and decrypts it in place.
pub fn decrypt(
    config: &DeviceConfig,
    keys: &KeyStore,
    hdr: &Ieee80211Hdr,
    unicast: bool,
    frame: &mut Frame,
) -> Result<DecryptOutcome, DropReason> {
    let hdr_len = hdr.hdr_length();
    if frame.len() < hdr_len + WEP_IV_LEN {
        return Err(DropReason::Malformed);
    }
    let iv: [u8; 4] = frame.bytes()[hdr_len..hdr_len + WEP_IV_LEN]
        .try_into()
        .map_err(|_| DropReason::Malformed)?;
    let key_index = iv[3] >> 6;
    let ext_iv = iv[3] & EXT_IV_BIT != 0;

    let ta = hdr.transmitter();
    let bssid = hdr.bssid().unwrap_or(config.bssid);
    let (key_id, key) =
        keys.select(config.akm, unicast, bssid, ta, key_index).ok_or(DropReason::Undecryptable)?;

    let expected = match key_id.scope {
        KeyScope::Pairwise => config.pairwise_suite,
        KeyScope::Group => config.group_suite,
    };
    if let Some(suite) = expected {
        if suite != key.suite {
            return Err(DropReason::CipherMismatch);
        }
    }
    if key.suite.uses_tsc() && !ext_iv {
        return Err(DropReason::CipherMismatch);
    }

    // Suite tables give the security header and trailer sizes.
    let iv_overhead = key.suite.iv_length();
    if frame.len() < hdr_len + iv_overhead + key.suite.trailer_length() {
        return Err(DropReason::Malformed);
    }

    match key.suite {
        CipherSuite::None => Err(DropReason::CipherMismatch),
        CipherSuite::Wep40 | CipherSuite::Wep104 => {
            let rc4_key = crypto::wep_rc4_key(&iv, &key.material);
            let region = &mut frame.bytes_mut()[hdr_len + iv_overhead..];
            crypto::rc4_crc_decrypt(&rc4_key, region, key.suite).map_err(integrity)?;
            frame.truncate_tail(ICV_LEN);
            Ok(DecryptOutcome { suite: key.suite, key_id, tsc: None, iv_overhead })
        }
        CipherSuite::Tkip => {
            let ext: [u8; 8] = frame.bytes()[hdr_len..hdr_len + EXT_IV_LEN]
                .try_into()
                .map_err(|_| DropReason::Malformed)?;
            // Byte 0 carries TSC1, byte 2 TSC0; bytes 4..8 the upper 32.
            let iv16 = ((ext[0] as u16) << 8) | ext[2] as u16;
            let iv32 = u32::from_le_bytes([ext[4], ext[5], ext[6], ext[7]]);
            let tsc = ((iv32 as u64) << 16) | iv16 as u64;

            let mixed = crypto::tkip_mixed_key(key.tkip_tk(), &ta.to_vec(), tsc);
            let region = &mut frame.bytes_mut()[hdr_len + iv_overhead..];
            crypto::rc4_crc_decrypt(&mixed, region, CipherSuite::Tkip).map_err(integrity)?;
            frame.truncate_tail(ICV_LEN);
            Ok(DecryptOutcome { suite: CipherSuite::Tkip, key_id, tsc: Some(tsc), iv_overhead })
        }
        CipherSuite::Ccmp => {
            let ext: [u8; 8] = frame.bytes()[hdr_len..hdr_len + EXT_IV_LEN]
                .try_into()
                .map_err(|_| DropReason::Malformed)?;
            let pn = ext[0] as u64
                | (ext[1] as u64) << 8
                | (ext[4] as u64) << 16
                | (ext[5] as u64) << 24
                | (ext[6] as u64) << 32
                | (ext[7] as u64) << 40;
            let nonce = hdr.ccmp_nonce(pn);
            let aad = hdr.ccmp_aad();
            let start = hdr_len + iv_overhead;
            let plaintext = crypto::ccmp_decrypt(&key.material, &nonce, &aad, &frame.bytes()[start..])
                .map_err(integrity)?;
            frame.bytes_mut()[start..start + plaintext.len()].copy_from_slice(&plaintext);
            frame.truncate_tail(CCMP_MIC_LEN);
            Ok(DecryptOutcome { suite: CipherSuite::Ccmp, key_id, tsc: Some(pn), iv_overhead })
        }
    }
}
