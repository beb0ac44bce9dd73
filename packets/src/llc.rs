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

//! LLC

use anyhow::bail;

/// SNAP extension SAP value for both DSAP and SSAP.
pub const LLC_SAP_SNAP: u8 = 0xaa;
/// Unnumbered Information control value.
pub const LLC_CTRL_UI: u8 = 0x03;

/// RFC 1042 encapsulation OUI.
pub const SNAP_OUI_RFC1042: [u8; 3] = [0x00, 0x00, 0x00];
/// 802.1H bridge-tunnel encapsulation OUI.
pub const SNAP_OUI_BRIDGE_TUNNEL: [u8; 3] = [0x00, 0x00, 0xf8];

/// EtherType values the receive path cares about.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const APPLETALK_AARP: u16 = 0x80f3;
    pub const IPX: u16 = 0x8137;
    pub const EAPOL: u16 = 0x888e;
}

/// 802.2 LLC/SNAP header carried at the front of 802.11 data payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LlcSnapHeader {
    pub dsap: u8,
    pub ssap: u8,
    pub ctrl: u8,
    pub oui: [u8; 3],
    pub ethertype: u16,
}

impl LlcSnapHeader {
    // Length of LLC/SNAP headers on data frames
    pub const LEN: usize = 8;

    /// Decodes an LLC/SNAP header; fails on anything that is not
    /// SNAP/UI encapsulation.
    pub fn decode(bytes: &[u8]) -> anyhow::Result<LlcSnapHeader> {
        if bytes.len() < Self::LEN {
            bail!("payload too short for LLC/SNAP header: {}", bytes.len());
        }
        if bytes[0] != LLC_SAP_SNAP || bytes[1] != LLC_SAP_SNAP || bytes[2] != LLC_CTRL_UI {
            bail!("not an LLC SNAP/UI header");
        }
        Ok(LlcSnapHeader {
            dsap: bytes[0],
            ssap: bytes[1],
            ctrl: bytes[2],
            oui: [bytes[3], bytes[4], bytes[5]],
            ethertype: u16::from_be_bytes([bytes[6], bytes[7]]),
        })
    }

    pub fn encode(&self) -> [u8; 8] {
        let ethertype = self.ethertype.to_be_bytes();
        [
            self.dsap,
            self.ssap,
            self.ctrl,
            self.oui[0],
            self.oui[1],
            self.oui[2],
            ethertype[0],
            ethertype[1],
        ]
    }

    /// RFC 1042 SNAP header for an EtherType; the shape used on every
    /// Ethernet payload bridged into 802.11.
    pub fn rfc1042(ethertype: u16) -> LlcSnapHeader {
        LlcSnapHeader {
            dsap: LLC_SAP_SNAP,
            ssap: LLC_SAP_SNAP,
            ctrl: LLC_CTRL_UI,
            oui: SNAP_OUI_RFC1042,
            ethertype,
        }
    }

    /// 802.1H bridge-tunnel SNAP header for an EtherType; used for the
    /// types RFC 1042 reserves (IPX, AppleTalk AARP).
    pub fn bridge_tunnel(ethertype: u16) -> LlcSnapHeader {
        LlcSnapHeader {
            dsap: LLC_SAP_SNAP,
            ssap: LLC_SAP_SNAP,
            ctrl: LLC_CTRL_UI,
            oui: SNAP_OUI_BRIDGE_TUNNEL,
            ethertype,
        }
    }

    pub fn is_rfc1042(&self) -> bool {
        self.oui == SNAP_OUI_RFC1042
    }

    pub fn is_bridge_tunnel(&self) -> bool {
        self.oui == SNAP_OUI_BRIDGE_TUNNEL
    }
}
