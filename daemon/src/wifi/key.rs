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

//! Key table: pairwise and group keys with per-key replay state.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use softmac_packets::ieee80211::MacAddress;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum CipherSuite {
    None,
    Wep40,
    Wep104,
    Tkip,
    Ccmp,
}

impl CipherSuite {
    /// Key material length installed for this suite. TKIP keys carry
    /// the temporal key plus both Michael MIC keys.
    pub fn key_length(&self) -> usize {
        match self {
            CipherSuite::None => 0,
            CipherSuite::Wep40 => 5,
            CipherSuite::Wep104 => 13,
            CipherSuite::Tkip => 32,
            CipherSuite::Ccmp => 16,
        }
    }

    /// Bytes between the MAC header and the encrypted payload.
    pub fn iv_length(&self) -> usize {
        match self {
            CipherSuite::None => 0,
            CipherSuite::Wep40 | CipherSuite::Wep104 => 4,
            CipherSuite::Tkip | CipherSuite::Ccmp => 8,
        }
    }

    /// Integrity bytes trailing the payload.
    pub fn trailer_length(&self) -> usize {
        match self {
            CipherSuite::None => 0,
            CipherSuite::Wep40 | CipherSuite::Wep104 => 4,
            // Michael MIC plus ICV.
            CipherSuite::Tkip => 12,
            CipherSuite::Ccmp => 8,
        }
    }

    /// Suites that carry a 48-bit sequence counter in an extended IV.
    pub fn uses_tsc(&self) -> bool {
        matches!(self, CipherSuite::Tkip | CipherSuite::Ccmp)
    }
}

/// Authentication and key management negotiated for the BSS.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AkmSuite {
    Open,
    WepShared,
    WpaPsk,
    WpaEnterprise,
    Wpa2Psk,
    Wpa2Enterprise,
}

impl AkmSuite {
    pub fn is_wpa(&self) -> bool {
        matches!(
            self,
            AkmSuite::WpaPsk | AkmSuite::WpaEnterprise | AkmSuite::Wpa2Psk | AkmSuite::Wpa2Enterprise
        )
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum KeyScope {
    Pairwise,
    Group,
}

/// Stable handle to an installed key, valid until the key is replaced.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct KeyId {
    pub scope: KeyScope,
    pub addr: MacAddress,
    pub index: u8,
}

/// An installed key and its receive sequence counter. The counter is
/// split the way the extended IV carries it on the air.
#[derive(Debug, Clone)]
pub struct Key {
    pub suite: CipherSuite,
    pub material: Vec<u8>,
    pub index: u8,
    pub tsc15_0: u16,
    pub tsc47_16: u32,
}

impl Key {
    pub fn new(suite: CipherSuite, material: Vec<u8>, index: u8) -> Key {
        Key { suite, material, index, tsc15_0: 0, tsc47_16: 0 }
    }

    pub fn tsc(&self) -> u64 {
        ((self.tsc47_16 as u64) << 16) | self.tsc15_0 as u64
    }

    pub fn set_tsc(&mut self, tsc: u64) {
        self.tsc15_0 = (tsc & 0xffff) as u16;
        self.tsc47_16 = (tsc >> 16) as u32;
    }

    /// TKIP temporal key half of the installed material.
    pub fn tkip_tk(&self) -> &[u8] {
        &self.material[..16]
    }

    /// Michael key for frames received from the peer.
    pub fn tkip_mic_rx(&self) -> &[u8] {
        &self.material[24..32]
    }
}

/// Pairwise keys by peer address and group keys by (BSSID, index).
#[derive(Debug, Default)]
pub struct KeyStore {
    pairwise: HashMap<MacAddress, Key>,
    group: HashMap<(MacAddress, u8), Key>,
}

impl KeyStore {
    pub fn install_pairwise(&mut self, peer: MacAddress, key: Key) -> Result<()> {
        validate(&key)?;
        self.pairwise.insert(peer, key);
        Ok(())
    }

    pub fn install_group(&mut self, bssid: MacAddress, key: Key) -> Result<()> {
        validate(&key)?;
        self.group.insert((bssid, key.index), key);
        Ok(())
    }

    pub fn lookup(&self, id: &KeyId) -> Option<&Key> {
        match id.scope {
            KeyScope::Pairwise => self.pairwise.get(&id.addr),
            KeyScope::Group => self.group.get(&(id.addr, id.index)),
        }
    }

    /// Records an accepted sequence counter against the key.
    pub fn update_replay(&mut self, id: &KeyId, tsc: u64) {
        let key = match id.scope {
            KeyScope::Pairwise => self.pairwise.get_mut(&id.addr),
            KeyScope::Group => self.group.get_mut(&(id.addr, id.index)),
        };
        if let Some(key) = key {
            key.set_tsc(tsc);
        }
    }

    /// Picks the key for a received protected frame.
    ///
    /// Unicast frames under WPA/WPA2 use the pairwise key for the
    /// transmitter when one is installed. Otherwise the group key for
    /// the BSSID at the IV's key index applies, falling back to a
    /// group key filed under the broadcast address.
    pub fn select(
        &self,
        akm: AkmSuite,
        unicast: bool,
        bssid: MacAddress,
        peer: MacAddress,
        index: u8,
    ) -> Option<(KeyId, &Key)> {
        if akm.is_wpa() && unicast {
            if let Some(key) = self.pairwise.get(&peer) {
                let id = KeyId { scope: KeyScope::Pairwise, addr: peer, index: key.index };
                return Some((id, key));
            }
        }
        if let Some(key) = self.group.get(&(bssid, index)) {
            let id = KeyId { scope: KeyScope::Group, addr: bssid, index };
            return Some((id, key));
        }
        self.group.get(&(MacAddress::BROADCAST, index)).map(|key| {
            let id = KeyId { scope: KeyScope::Group, addr: MacAddress::BROADCAST, index };
            (id, key)
        })
    }
}

fn validate(key: &Key) -> Result<()> {
    let want = key.suite.key_length();
    if key.material.len() != want {
        return Err(anyhow!(
            "{:?} key needs {} bytes of material, got {}",
            key.suite,
            want,
            key.material.len()
        ));
    }
    if key.index > 3 {
        return Err(anyhow!("key index {} out of range", key.index));
    }
    Ok(())
}
