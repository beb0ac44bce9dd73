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

//! AP-mode station filtering: class rules, power-save transitions and
//! intra-BSS routing.

use softmac_packets::ieee80211::MacAddress;

use crate::wifi::classifier::Classified;
use crate::wifi::error::ClassViolation;
use crate::wifi::frame::Frame;
use crate::wifi::station::{AssocState, StationTable};

/// Management response owed after a class violation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MgmtAction {
    Deauth { sta: MacAddress, reason: u16 },
    Disassoc { sta: MacAddress, reason: u16 },
}

/// What the AP filter decided about an incoming control or data frame.
#[derive(Debug)]
pub enum Filtered {
    /// Frame continues down the pipeline. Frames released from
    /// power-save queues ride along for retransmission.
    Pass { released: Vec<Frame> },
    /// Frame was consumed by the filter (PS-Poll).
    Consumed { released: Vec<Frame> },
    /// Class rule violated; the frame is dropped and a management
    /// response goes out.
    Violation { violation: ClassViolation, action: MgmtAction },
}

/// Applies the class rules and power-save transitions for a control
/// or data frame from a station.
pub fn filter(stations: &mut StationTable, cls: &Classified) -> Filtered {
    let Some(ta) = cls.transmitter else {
        // ACK and CTS carry no transmitter address; nothing to check.
        return Filtered::Pass { released: Vec::new() };
    };

    let state = stations.get(&ta).map(|sta| sta.state);
    match state {
        None | Some(AssocState::Unauthenticated) => {
            let violation = ClassViolation::Class2FromUnauthenticated;
            return Filtered::Violation {
                violation,
                action: MgmtAction::Deauth { sta: ta, reason: violation.reason_code() },
            };
        }
        Some(AssocState::Authenticated) => {
            let violation = ClassViolation::Class3FromUnassociated;
            return Filtered::Violation {
                violation,
                action: MgmtAction::Disassoc { sta: ta, reason: violation.reason_code() },
            };
        }
        Some(AssocState::Associated) => {}
    }

    if cls.ps_poll.is_some() {
        // PS-Poll releases exactly one parked frame.
        let released = stations.dequeue_one(&ta).into_iter().collect();
        return Filtered::Consumed { released };
    }

    let dozing = cls.fc.pwr_mgmt();
    let currently = stations.get(&ta).map(|sta| sta.power_save).unwrap_or(false);
    let released =
        if dozing != currently { stations.set_power_save(&ta, dozing) } else { Vec::new() };
    Filtered::Pass { released }
}

/// Where a translated data frame goes inside the BSS.
#[derive(Debug)]
pub enum Routed {
    /// Parked on a power-save queue.
    Queued,
    /// A power-save queue was full; the frame is handed back.
    Overflow(Frame),
    /// Retransmit into the BSS.
    Relay(Frame),
    /// Not addressed to any station here; deliver toward the DS.
    Upstream(Frame),
}

/// Routes a frame received from a station to its destination. Called
/// after header translation, with `dst` from the MAC header.
pub fn route(stations: &mut StationTable, dst: MacAddress, frame: Frame) -> Routed {
    if dst.is_multicast() {
        // Without associated peers there is nobody to relay to.
        if stations.associated_count() == 0 {
            return Routed::Upstream(frame);
        }
        if stations.mcast_dozing() {
            return match stations.enqueue_multicast(frame) {
                Ok(()) => Routed::Queued,
                Err(frame) => Routed::Overflow(frame),
            };
        }
        return Routed::Relay(frame);
    }

    match stations.get(&dst) {
        Some(sta) if sta.state == AssocState::Associated => {
            if sta.power_save {
                match stations.enqueue(&dst, frame) {
                    Ok(()) => Routed::Queued,
                    Err(frame) => Routed::Overflow(frame),
                }
            } else {
                Routed::Relay(frame)
            }
        }
        _ => Routed::Upstream(frame),
    }
}
