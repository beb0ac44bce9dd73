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

//! ieee80211 frames

use anyhow::{anyhow, bail};
use std::fmt;

// Constants for Ieee80211 definitions.
// Reference: external/wpa_supplicant_8/src/common/ieee802_11_defs.h
pub const WLAN_FC_TODS: u16 = 0x0100;
pub const WLAN_FC_FROMDS: u16 = 0x0200;
pub const WLAN_FC_MOREFRAG: u16 = 0x0400;
pub const WLAN_FC_RETRY: u16 = 0x0800;
pub const WLAN_FC_PWRMGT: u16 = 0x1000;
pub const WLAN_FC_MOREDATA: u16 = 0x2000;
pub const WLAN_FC_ISWEP: u16 = 0x4000;
pub const WLAN_FC_ORDER: u16 = 0x8000;

/// Fixed MAC header length for data and management frames (3 addresses).
pub const HDR_LEN_3ADDR: usize = 24;
/// Extra header bytes when Addr4 is present (WDS).
pub const ADDR4_LEN: usize = 6;
/// On-air length of a PS-Poll control frame: fc, aid, bssid, ta.
pub const PS_POLL_LEN: usize = 16;

/// Management frame subtypes.
pub mod mgmt_subtype {
    pub const BEACON: u8 = 8;
    pub const DISASSOC: u8 = 10;
    pub const AUTH: u8 = 11;
    pub const DEAUTH: u8 = 12;
}

/// Control frame subtypes.
pub mod ctl_subtype {
    pub const PS_POLL: u8 = 10;
    pub const RTS: u8 = 11;
    pub const ACK: u8 = 13;
}

/// Data frame subtypes.
pub mod data_subtype {
    pub const DATA: u8 = 0;
    pub const NULL: u8 = 4;
    pub const QOS_DATA: u8 = 8;
}

/// A Ieee80211 MAC address, stored in the low 48 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress(pub u64);

impl MacAddress {
    pub const LEN: usize = 6;
    pub const BROADCAST: MacAddress = MacAddress(0xffff_ffff_ffff);

    pub fn to_vec(&self) -> [u8; 6] {
        u64::to_le_bytes(self.0)[0..6].try_into().expect("slice with incorrect length")
    }

    pub fn is_multicast(&self) -> bool {
        let addr = u64::to_le_bytes(self.0);
        (addr[0] & 0x1) == 1
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = u64::to_le_bytes(self.0);
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
        )
    }
}

impl From<&[u8; 6]> for MacAddress {
    fn from(bytes: &[u8; 6]) -> Self {
        Self(u64::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], 0, 0]))
    }
}

impl From<MacAddress> for [u8; 6] {
    fn from(MacAddress(addr): MacAddress) -> Self {
        let bytes = u64::to_le_bytes(addr);
        bytes[0..6].try_into().unwrap()
    }
}

/// Frame type from the frame-control field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    Mgmt,
    Ctl,
    Data,
    Ext,
}

impl FrameType {
    pub fn from_bits(bits: u8) -> FrameType {
        match bits & 0x3 {
            0 => FrameType::Mgmt,
            1 => FrameType::Ctl,
            2 => FrameType::Data,
            _ => FrameType::Ext,
        }
    }
}

/// ToDS/FromDS bit combination; selects the address-field layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ds {
    Ibss,
    ToAp,
    FromAp,
    Wds,
}

impl fmt::Display for Ds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Ds::Ibss => "Ibss",
            Ds::ToAp => "ToAp",
            Ds::FromAp => "FromAp",
            Ds::Wds => "Wds",
        };
        write!(f, "{}", name)
    }
}

/// The 16-bit frame-control field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameControl(pub u16);

impl FrameControl {
    pub fn decode(bytes: &[u8]) -> anyhow::Result<FrameControl> {
        if bytes.len() < 2 {
            bail!("frame too short for frame control");
        }
        Ok(FrameControl(u16::from_le_bytes([bytes[0], bytes[1]])))
    }

    pub fn version(&self) -> u8 {
        (self.0 & 0x3) as u8
    }

    pub fn ftype(&self) -> FrameType {
        FrameType::from_bits((self.0 >> 2) as u8)
    }

    pub fn stype(&self) -> u8 {
        ((self.0 >> 4) & 0xf) as u8
    }

    pub fn to_ds(&self) -> bool {
        self.0 & WLAN_FC_TODS != 0
    }

    pub fn from_ds(&self) -> bool {
        self.0 & WLAN_FC_FROMDS != 0
    }

    pub fn more_frags(&self) -> bool {
        self.0 & WLAN_FC_MOREFRAG != 0
    }

    pub fn retry(&self) -> bool {
        self.0 & WLAN_FC_RETRY != 0
    }

    pub fn pwr_mgmt(&self) -> bool {
        self.0 & WLAN_FC_PWRMGT != 0
    }

    pub fn more_data(&self) -> bool {
        self.0 & WLAN_FC_MOREDATA != 0
    }

    pub fn protected(&self) -> bool {
        self.0 & WLAN_FC_ISWEP != 0
    }

    pub fn order(&self) -> bool {
        self.0 & WLAN_FC_ORDER != 0
    }

    pub fn ds(&self) -> Ds {
        match (self.to_ds(), self.from_ds()) {
            (false, false) => Ds::Ibss,
            (true, false) => Ds::ToAp,
            (false, true) => Ds::FromAp,
            (true, true) => Ds::Wds,
        }
    }

    pub fn is_mgmt(&self) -> bool {
        self.ftype() == FrameType::Mgmt
    }

    pub fn is_data(&self) -> bool {
        self.ftype() == FrameType::Data
    }

    pub fn is_ps_poll(&self) -> bool {
        self.ftype() == FrameType::Ctl && self.stype() == ctl_subtype::PS_POLL
    }

    pub fn is_qos_data(&self) -> bool {
        self.is_data() && self.stype() & data_subtype::QOS_DATA != 0
    }
}

/// Decoded MAC header of a data or management frame.
///
/// Ieee80211 frames have 3-4 addresses in different positions based on the
/// FromDS and ToDS flags; accessors below map them onto source, destination
/// and BSSID per combination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ieee80211Hdr {
    pub fc: FrameControl,
    pub duration_id: u16,
    pub addr1: MacAddress,
    pub addr2: MacAddress,
    pub addr3: MacAddress,
    pub seq_ctrl: u16,
    pub addr4: Option<MacAddress>,
    pub qos_ctrl: Option<u16>,
}

fn read_addr(bytes: &[u8], at: usize) -> MacAddress {
    let six: &[u8; 6] = bytes[at..at + 6].try_into().unwrap();
    MacAddress::from(six)
}

impl Ieee80211Hdr {
    /// Decodes a data or management MAC header from the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> anyhow::Result<Ieee80211Hdr> {
        let fc = FrameControl::decode(bytes)?;
        match fc.ftype() {
            FrameType::Data | FrameType::Mgmt => {}
            other => return Err(anyhow!("not a data/mgmt frame: {:?}", other)),
        }
        if bytes.len() < HDR_LEN_3ADDR {
            bail!("frame too short for MAC header: {}", bytes.len());
        }
        let has_a4 = fc.ftype() == FrameType::Data && fc.to_ds() && fc.from_ds();
        let has_qos = fc.is_qos_data();
        let mut need = HDR_LEN_3ADDR;
        if has_a4 {
            need += ADDR4_LEN;
        }
        if has_qos {
            need += 2;
        }
        if bytes.len() < need {
            bail!("frame too short for MAC header: {} < {}", bytes.len(), need);
        }
        let mut at = HDR_LEN_3ADDR;
        let addr4 = has_a4.then(|| {
            let a = read_addr(bytes, at);
            at += ADDR4_LEN;
            a
        });
        let qos_ctrl = has_qos.then(|| u16::from_le_bytes([bytes[at], bytes[at + 1]]));
        Ok(Ieee80211Hdr {
            fc,
            duration_id: u16::from_le_bytes([bytes[2], bytes[3]]),
            addr1: read_addr(bytes, 4),
            addr2: read_addr(bytes, 10),
            addr3: read_addr(bytes, 16),
            seq_ctrl: u16::from_le_bytes([bytes[22], bytes[23]]),
            addr4,
            qos_ctrl,
        })
    }

    /// Encodes the header back to its on-air layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.hdr_length());
        out.extend_from_slice(&self.fc.0.to_le_bytes());
        out.extend_from_slice(&self.duration_id.to_le_bytes());
        out.extend_from_slice(&self.addr1.to_vec());
        out.extend_from_slice(&self.addr2.to_vec());
        out.extend_from_slice(&self.addr3.to_vec());
        out.extend_from_slice(&self.seq_ctrl.to_le_bytes());
        if let Some(a4) = self.addr4 {
            out.extend_from_slice(&a4.to_vec());
        }
        if let Some(qos) = self.qos_ctrl {
            out.extend_from_slice(&qos.to_le_bytes());
        }
        out
    }

    pub fn has_a4(&self) -> bool {
        self.addr4.is_some()
    }

    /// Length of the MAC header: 24, +6 for Addr4, +2 for QoS control.
    pub fn hdr_length(&self) -> usize {
        HDR_LEN_3ADDR
            + if self.has_a4() { ADDR4_LEN } else { 0 }
            + if self.qos_ctrl.is_some() { 2 } else { 0 }
    }

    pub fn source(&self) -> MacAddress {
        match self.fc.ds() {
            Ds::Ibss => self.addr2,
            Ds::ToAp => self.addr2,
            Ds::FromAp => self.addr3,
            Ds::Wds => self.addr4.unwrap_or(self.addr3),
        }
    }

    pub fn destination(&self) -> MacAddress {
        match self.fc.ds() {
            Ds::Ibss => self.addr1,
            Ds::ToAp => self.addr3,
            Ds::FromAp => self.addr1,
            Ds::Wds => self.addr3,
        }
    }

    pub fn bssid(&self) -> Option<MacAddress> {
        match self.fc.ds() {
            Ds::Ibss => Some(self.addr3),
            Ds::ToAp => Some(self.addr1),
            Ds::FromAp => Some(self.addr2),
            Ds::Wds => None,
        }
    }

    /// Transmitter address, Addr2 in every layout.
    pub fn transmitter(&self) -> MacAddress {
        self.addr2
    }

    pub fn fragment_number(&self) -> u8 {
        (self.seq_ctrl & 0x000f) as u8
    }

    /// More-fragments set or a nonzero fragment number.
    pub fn is_fragment(&self) -> bool {
        self.fc.more_frags() || self.fragment_number() != 0
    }

    pub fn qos_tid(&self) -> u8 {
        self.qos_ctrl.map_or(0, |qc| (qc & 0x000f) as u8)
    }

    /// Generates the Additional Authentication Data (AAD) for CCMP.
    ///
    /// Reference Linux kernel net/mac80211/wpa.c
    pub fn ccmp_aad(&self) -> Vec<u8> {
        let mut aad = vec![0u8; self.hdr_length() - 2];

        aad[0] = (self.fc.0 & 0x00ff) as u8;
        if self.fc.is_data() {
            // Clear the first three bits of stype (bits 4, 5, and 6)
            aad[0] &= !(0x07 << 4);
        }
        // Clear Retry, Power Management and More Data; set Protected Frame.
        let cleared = (WLAN_FC_RETRY | WLAN_FC_PWRMGT | WLAN_FC_MOREDATA) >> 8;
        aad[1] = ((self.fc.0 >> 8) as u8 & !(cleared as u8)) | (WLAN_FC_ISWEP >> 8) as u8;

        aad[2..8].copy_from_slice(&self.addr1.to_vec());
        aad[8..14].copy_from_slice(&self.addr2.to_vec());
        aad[14..20].copy_from_slice(&self.addr3.to_vec());
        // Masked sequence control: fragment number only.
        aad[20] = (self.seq_ctrl & 0x000f) as u8;
        // aad[21] is zero

        match (self.addr4, self.qos_ctrl.is_some()) {
            (Some(a4), qos) => {
                aad[22..28].copy_from_slice(&a4.to_vec());
                if qos {
                    aad[28] = self.qos_tid();
                }
            }
            (None, true) => aad[22] = self.qos_tid(),
            (None, false) => {}
        }
        aad
    }

    /// Generates the CCMP nonce for a 48-bit packet number.
    ///
    /// Reference Linux kernel net/mac80211/wpa.c
    pub fn ccmp_nonce(&self, pn: u64) -> [u8; 13] {
        let mut nonce = [0u8; 13];
        nonce[0] = self.qos_tid() | ((self.fc.is_mgmt() as u8) << 4);
        nonce[1..7].copy_from_slice(&self.addr2.to_vec());
        nonce[7] = (pn >> 40) as u8;
        nonce[8] = (pn >> 32) as u8;
        nonce[9] = (pn >> 24) as u8;
        nonce[10] = (pn >> 16) as u8;
        nonce[11] = (pn >> 8) as u8;
        nonce[12] = pn as u8;
        nonce
    }
}

impl fmt::Display for Ieee80211Hdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ds: {}, src: {}, dst: {}}}",
            self.fc.ds(),
            self.source(),
            self.destination()
        )
    }
}

/// Decoded PS-Poll control frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PsPoll {
    pub aid: u16,
    pub bssid: MacAddress,
    pub ta: MacAddress,
}

impl PsPoll {
    pub fn decode(bytes: &[u8]) -> anyhow::Result<PsPoll> {
        let fc = FrameControl::decode(bytes)?;
        if !fc.is_ps_poll() {
            bail!("not a PS-Poll frame");
        }
        if bytes.len() < PS_POLL_LEN {
            bail!("frame too short for PS-Poll: {}", bytes.len());
        }
        Ok(PsPoll {
            aid: u16::from_le_bytes([bytes[2], bytes[3]]),
            bssid: read_addr(bytes, 4),
            ta: read_addr(bytes, 10),
        })
    }
}

pub fn parse_mac_address(s: &str) -> Option<MacAddress> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        return None;
    }
    let mut bytes = [0u8; 6];
    for (i, part) in parts.iter().enumerate() {
        match u8::from_str_radix(part, 16) {
            Ok(n) => bytes[i] = n,
            Err(_) => return None,
        }
    }
    Some(MacAddress::from(&bytes))
}
