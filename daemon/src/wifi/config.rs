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

//! Device-level receive configuration.

use softmac_packets::ieee80211::MacAddress;

use crate::wifi::key::{AkmSuite, CipherSuite};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DeviceMode {
    Station,
    AccessPoint,
}

/// Receive-side policy for one device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub mode: DeviceMode,
    /// Our own MAC address.
    pub addr: MacAddress,
    /// BSSID of the BSS we run or joined.
    pub bssid: MacAddress,
    pub akm: AkmSuite,
    /// Expected cipher for pairwise-protected frames, if negotiated.
    pub pairwise_suite: Option<CipherSuite>,
    /// Expected cipher for group-protected frames, if negotiated.
    pub group_suite: Option<CipherSuite>,
    /// Privacy policy: discard cleartext data frames (EAPOL excepted).
    pub drop_unencrypted: bool,
    /// Frames parked per station while it dozes.
    pub ps_queue_capacity: usize,
}

impl DeviceConfig {
    pub fn station(addr: MacAddress, bssid: MacAddress) -> DeviceConfig {
        DeviceConfig {
            mode: DeviceMode::Station,
            addr,
            bssid,
            akm: AkmSuite::Open,
            pairwise_suite: None,
            group_suite: None,
            drop_unencrypted: false,
            ps_queue_capacity: 32,
        }
    }

    pub fn access_point(addr: MacAddress) -> DeviceConfig {
        DeviceConfig { mode: DeviceMode::AccessPoint, bssid: addr, ..DeviceConfig::station(addr, addr) }
    }
}
