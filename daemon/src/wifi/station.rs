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

//! AP-mode station table with per-station power-save queues.

use std::collections::{HashMap, VecDeque};

use softmac_packets::ieee80211::MacAddress;

use crate::wifi::frame::Frame;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum AssocState {
    Unauthenticated,
    Authenticated,
    Associated,
}

/// One station known to the BSS.
#[derive(Debug)]
pub struct StationEntry {
    pub state: AssocState,
    pub aid: u16,
    pub power_save: bool,
    queue: VecDeque<Frame>,
}

impl StationEntry {
    fn new(state: AssocState, aid: u16) -> StationEntry {
        StationEntry { state, aid, power_save: false, queue: VecDeque::new() }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

/// Stations by MAC address, plus the shared multicast queue. The
/// multicast queue behaves as one more dozing receiver whenever any
/// station is in power-save.
#[derive(Debug)]
pub struct StationTable {
    stations: HashMap<MacAddress, StationEntry>,
    capacity: usize,
    mcast_queue: VecDeque<Frame>,
    mcast_dozing: bool,
}

impl StationTable {
    pub fn new(capacity: usize) -> StationTable {
        StationTable {
            stations: HashMap::new(),
            capacity,
            mcast_queue: VecDeque::new(),
            mcast_dozing: false,
        }
    }

    pub fn insert(&mut self, addr: MacAddress, state: AssocState, aid: u16) {
        self.stations.insert(addr, StationEntry::new(state, aid));
    }

    /// Removes a station, dropping anything parked for it.
    pub fn remove(&mut self, addr: &MacAddress) {
        self.stations.remove(addr);
        self.refresh_mcast_dozing();
    }

    pub fn get(&self, addr: &MacAddress) -> Option<&StationEntry> {
        self.stations.get(addr)
    }

    pub fn set_state(&mut self, addr: &MacAddress, state: AssocState) {
        if let Some(sta) = self.stations.get_mut(addr) {
            sta.state = state;
        }
    }

    pub fn associated_count(&self) -> usize {
        self.stations.values().filter(|s| s.state == AssocState::Associated).count()
    }

    pub fn mcast_dozing(&self) -> bool {
        self.mcast_dozing
    }

    /// Marks a station dozing or awake. Waking a station releases its
    /// whole queue to the caller.
    pub fn set_power_save(&mut self, addr: &MacAddress, dozing: bool) -> Vec<Frame> {
        let released = match self.stations.get_mut(addr) {
            Some(sta) => {
                sta.power_save = dozing;
                if dozing {
                    Vec::new()
                } else {
                    sta.queue.drain(..).collect()
                }
            }
            None => Vec::new(),
        };
        self.refresh_mcast_dozing();
        released
    }

    /// Parks a frame for a dozing station. Full queues reject the
    /// newest frame, handing it back.
    pub fn enqueue(&mut self, addr: &MacAddress, frame: Frame) -> Result<(), Frame> {
        match self.stations.get_mut(addr) {
            Some(sta) if sta.queue.len() < self.capacity => {
                sta.queue.push_back(frame);
                Ok(())
            }
            _ => Err(frame),
        }
    }

    /// Parks a multicast frame until the next delivery window.
    pub fn enqueue_multicast(&mut self, frame: Frame) -> Result<(), Frame> {
        if self.mcast_queue.len() < self.capacity {
            self.mcast_queue.push_back(frame);
            Ok(())
        } else {
            Err(frame)
        }
    }

    /// Releases one frame in response to a PS-Poll.
    pub fn dequeue_one(&mut self, addr: &MacAddress) -> Option<Frame> {
        self.stations.get_mut(addr)?.queue.pop_front()
    }

    /// Drains the multicast queue for the delivery window after a
    /// DTIM beacon.
    pub fn drain_multicast(&mut self) -> Vec<Frame> {
        self.mcast_queue.drain(..).collect()
    }

    fn refresh_mcast_dozing(&mut self) {
        self.mcast_dozing = self.stations.values().any(|s| s.power_save);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::frame::RxMeta;
    use softmac_packets::ieee80211::parse_mac_address;

    fn addr(s: &str) -> MacAddress {
        parse_mac_address(s).unwrap()
    }

    fn frame(tag: u8) -> Frame {
        Frame::new(vec![tag; 16], RxMeta::default())
    }

    #[test]
    fn test_power_save_queue_and_wake() {
        let mut table = StationTable::new(4);
        let sta = addr("02:00:00:00:00:01");
        table.insert(sta, AssocState::Associated, 1);

        assert!(table.set_power_save(&sta, true).is_empty());
        assert!(table.mcast_dozing());
        table.enqueue(&sta, frame(1)).unwrap();
        table.enqueue(&sta, frame(2)).unwrap();

        let released = table.set_power_save(&sta, false);
        assert_eq!(released.len(), 2);
        assert_eq!(released[0].bytes()[0], 1);
        assert!(!table.mcast_dozing());
    }

    #[test]
    fn test_queue_overflow_rejects_newest() {
        let mut table = StationTable::new(2);
        let sta = addr("02:00:00:00:00:01");
        table.insert(sta, AssocState::Associated, 1);
        table.set_power_save(&sta, true);

        table.enqueue(&sta, frame(1)).unwrap();
        table.enqueue(&sta, frame(2)).unwrap();
        let rejected = table.enqueue(&sta, frame(3)).unwrap_err();
        assert_eq!(rejected.bytes()[0], 3);
        // The queued frames survive in order.
        assert_eq!(table.dequeue_one(&sta).unwrap().bytes()[0], 1);
        assert_eq!(table.dequeue_one(&sta).unwrap().bytes()[0], 2);
    }

    #[test]
    fn test_multicast_queue_follows_dozing_stations() {
        let mut table = StationTable::new(4);
        let a = addr("02:00:00:00:00:01");
        let b = addr("02:00:00:00:00:02");
        table.insert(a, AssocState::Associated, 1);
        table.insert(b, AssocState::Associated, 2);

        table.set_power_save(&a, true);
        table.enqueue_multicast(frame(9)).unwrap();
        // One station still dozes after the other wakes.
        table.set_power_save(&b, false);
        assert!(table.mcast_dozing());
        table.set_power_save(&a, false);
        assert!(!table.mcast_dozing());
        assert_eq!(table.drain_multicast().len(), 1);
    }

    #[test]
    fn test_remove_refreshes_dozing() {
        let mut table = StationTable::new(4);
        let a = addr("02:00:00:00:00:01");
        table.insert(a, AssocState::Associated, 1);
        table.set_power_save(&a, true);
        table.remove(&a);
        assert!(!table.mcast_dozing());
        assert_eq!(table.associated_count(), 0);
    }
}
