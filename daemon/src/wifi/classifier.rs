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

//! First pipeline stage: length bounds and frame classification.

use softmac_packets::ieee80211::{
    FrameControl, FrameType, Ieee80211Hdr, MacAddress, PsPoll,
};

use crate::wifi::error::DropReason;
use crate::wifi::frame::{Frame, HW_FLAG_CRC_OK};

/// Bounds on the frame as wrapped by the link layer.
pub const MIN_WRAPPED_LEN: usize = 32;
pub const MAX_WRAPPED_LEN: usize = 2364;
/// Bounds on the bare 802.11 frame body.
pub const MIN_FRAME_LEN: usize = 14;
pub const MAX_FRAME_LEN: usize = 2346;

/// Classification of a length-validated frame.
#[derive(Debug)]
pub struct Classified {
    pub fc: FrameControl,
    /// Decoded MAC header for data and management frames.
    pub hdr: Option<Ieee80211Hdr>,
    pub ps_poll: Option<PsPoll>,
    /// Addr2 when the frame carries one; control frames other than
    /// PS-Poll and RTS do not.
    pub transmitter: Option<MacAddress>,
    pub is_protected: bool,
    pub is_fragment: bool,
    pub is_broadcast_or_multicast: bool,
}

impl Classified {
    pub fn ftype(&self) -> FrameType {
        self.fc.ftype()
    }
}

/// Validates length bounds and decodes enough of the frame to route
/// it. Any violation drops the frame as malformed.
pub fn classify(frame: &Frame) -> Result<Classified, DropReason> {
    if frame.meta.hw_flags & HW_FLAG_CRC_OK == 0 {
        return Err(DropReason::Malformed);
    }
    let wrapped = frame.meta.wrapped_len;
    if !(MIN_WRAPPED_LEN..=MAX_WRAPPED_LEN).contains(&wrapped) {
        return Err(DropReason::Malformed);
    }
    if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&frame.len()) {
        return Err(DropReason::Malformed);
    }

    let bytes = frame.bytes();
    let fc = FrameControl::decode(bytes).map_err(|_| DropReason::Malformed)?;
    if fc.version() != 0 {
        return Err(DropReason::Malformed);
    }

    match fc.ftype() {
        FrameType::Data | FrameType::Mgmt => {
            let hdr = Ieee80211Hdr::decode(bytes).map_err(|_| DropReason::Malformed)?;
            Ok(Classified {
                fc,
                transmitter: Some(hdr.transmitter()),
                ps_poll: None,
                is_protected: fc.protected(),
                is_fragment: hdr.is_fragment(),
                is_broadcast_or_multicast: hdr.addr1.is_multicast(),
                hdr: Some(hdr),
            })
        }
        FrameType::Ctl => {
            let ps_poll = if fc.is_ps_poll() {
                Some(PsPoll::decode(bytes).map_err(|_| DropReason::Malformed)?)
            } else {
                None
            };
            // RA sits right after frame control and duration in every
            // control frame.
            if bytes.len() < 10 {
                return Err(DropReason::Malformed);
            }
            let ra: &[u8; 6] = bytes[4..10].try_into().map_err(|_| DropReason::Malformed)?;
            let ra = MacAddress::from(ra);
            Ok(Classified {
                fc,
                hdr: None,
                transmitter: ps_poll.map(|p| p.ta),
                ps_poll,
                is_protected: false,
                is_fragment: false,
                is_broadcast_or_multicast: ra.is_multicast(),
            })
        }
        FrameType::Ext => Err(DropReason::Malformed),
    }
}
