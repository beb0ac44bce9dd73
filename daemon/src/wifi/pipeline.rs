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

//! The receive pipeline: classification, AP filtering, decryption,
//! reassembly hand-off, integrity and replay gates, header
//! translation and delivery.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::Result;
use bytes::Bytes;
use log::debug;
use softmac_packets::ieee80211::{FrameType, Ieee80211Hdr, MacAddress};
use softmac_packets::llc::ethertype;

use crate::wifi::ap::{self, Filtered, MgmtAction, Routed};
use crate::wifi::classifier;
use crate::wifi::config::{DeviceConfig, DeviceMode};
use crate::wifi::crypto::{self, MICHAEL_MIC_LEN};
use crate::wifi::defrag::{FragmentReassembler, ReassemblyResult};
use crate::wifi::dispatch::{self, DecryptOutcome};
use crate::wifi::error::DropReason;
use crate::wifi::frame::{Frame, RxMeta};
use crate::wifi::key::{CipherSuite, Key, KeyStore};
use crate::wifi::replay;
use crate::wifi::station::{AssocState, StationTable};
use crate::wifi::stats::{Counter, Statistics};
use crate::wifi::translate;

/// Final state of one received frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Handed to the sink: up the stack, relayed, or management.
    Delivered,
    /// Parked on a power-save queue.
    Queued,
    /// Fragment retained by the reassembler.
    Pending,
    /// Consumed inside the pipeline (control frames, null data).
    Consumed,
    Dropped(DropReason),
}

/// Where completed frames leave the pipeline. Frames handed to
/// `relay` are already translated; the transmit path re-encapsulates.
pub trait EventSink: Send + Sync {
    /// An Ethernet frame for the network stack.
    fn deliver(&self, frame: Bytes, meta: &RxMeta);
    /// A frame turned around into the BSS.
    fn relay(&self, frame: Frame);
    /// A management frame for the MLME.
    fn forward_mgmt(&self, frame: Frame);
    /// A deauth or disassoc owed after a class violation.
    fn send_mgmt_action(&self, action: MgmtAction);
}

/// Transmitters remembered for retransmission filtering.
const DUP_CACHE_CAPACITY: usize = 64;

/// Last accepted sequence control per transmitter. Bounded; once full,
/// recording a new transmitter evicts the oldest one.
struct SeqCache {
    entries: HashMap<MacAddress, u16>,
    order: VecDeque<MacAddress>,
    capacity: usize,
}

impl SeqCache {
    fn new(capacity: usize) -> SeqCache {
        SeqCache { entries: HashMap::new(), order: VecDeque::new(), capacity }
    }

    fn get(&self, ta: &MacAddress) -> Option<u16> {
        self.entries.get(ta).copied()
    }

    fn record(&mut self, ta: MacAddress, seq_ctrl: u16) {
        if self.entries.insert(ta, seq_ctrl).is_none() {
            self.order.push_back(ta);
            if self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    fn forget(&mut self, ta: &MacAddress) {
        if self.entries.remove(ta).is_some() {
            self.order.retain(|a| a != ta);
        }
    }
}

struct DeviceState {
    keys: KeyStore,
    stations: StationTable,
    stats: Statistics,
    last_seq: SeqCache,
}

/// One receive-side device instance. Frame processing runs to
/// completion under the state lock.
pub struct Device {
    config: DeviceConfig,
    state: Mutex<DeviceState>,
    sink: Box<dyn EventSink>,
}

impl Device {
    pub fn new(config: DeviceConfig, sink: Box<dyn EventSink>) -> Device {
        let state = DeviceState {
            keys: KeyStore::default(),
            stations: StationTable::new(config.ps_queue_capacity),
            stats: Statistics::default(),
            last_seq: SeqCache::new(DUP_CACHE_CAPACITY),
        };
        Device { config, state: Mutex::new(state), sink }
    }

    pub fn install_pairwise_key(&self, peer: MacAddress, key: Key) -> Result<()> {
        self.state.lock().unwrap().keys.install_pairwise(peer, key)
    }

    pub fn install_group_key(&self, addr: MacAddress, key: Key) -> Result<()> {
        self.state.lock().unwrap().keys.install_group(addr, key)
    }

    pub fn add_station(&self, addr: MacAddress, state: AssocState, aid: u16) {
        self.state.lock().unwrap().stations.insert(addr, state, aid);
    }

    pub fn set_station_state(&self, addr: &MacAddress, state: AssocState) {
        self.state.lock().unwrap().stations.set_state(addr, state);
    }

    pub fn remove_station(&self, addr: &MacAddress) {
        let mut state = self.state.lock().unwrap();
        state.stations.remove(addr);
        state.last_seq.forget(addr);
    }

    pub fn counter(&self, counter: Counter) -> u64 {
        self.state.lock().unwrap().stats.get(counter)
    }

    /// Releases parked multicast frames at the delivery window after
    /// a DTIM beacon.
    pub fn release_multicast(&self) {
        let frames = self.state.lock().unwrap().stations.drain_multicast();
        for frame in frames {
            self.sink.relay(frame);
        }
    }

    fn deliver_up(&self, frame: Frame) {
        let meta = frame.meta;
        debug!(
            "rx deliver: {} bytes, rssi {}, sq {}, rate {}",
            frame.len(),
            meta.rssi,
            meta.signal_quality,
            meta.rate_idx
        );
        self.sink.deliver(Bytes::from(frame.into_vec()), &meta);
    }

    /// Runs one frame through the pipeline.
    pub fn process(&self, frame: Frame, reassembler: &mut dyn FragmentReassembler) -> Verdict {
        let mut state = self.state.lock().unwrap();
        match self.run(&mut state, frame, reassembler) {
            Ok(verdict) => {
                match verdict {
                    Verdict::Delivered => state.stats.increment(Counter::RxOk),
                    Verdict::Queued => state.stats.increment(Counter::PsQueued),
                    _ => {}
                }
                verdict
            }
            Err(reason) => {
                debug!("rx drop: {}", reason);
                state.stats.increment(Counter::RxDropped);
                state.stats.increment(counter_for(reason));
                Verdict::Dropped(reason)
            }
        }
    }

    fn run(
        &self,
        st: &mut DeviceState,
        mut frame: Frame,
        reassembler: &mut dyn FragmentReassembler,
    ) -> Result<Verdict, DropReason> {
        let cls = classifier::classify(&frame)?;

        if cls.ftype() == FrameType::Mgmt {
            self.sink.forward_mgmt(frame);
            return Ok(Verdict::Delivered);
        }

        if self.config.mode == DeviceMode::AccessPoint {
            match ap::filter(&mut st.stations, &cls) {
                Filtered::Pass { released } => {
                    for f in released {
                        self.sink.relay(f);
                    }
                }
                Filtered::Consumed { released } => {
                    for f in released {
                        self.sink.relay(f);
                    }
                    return Ok(Verdict::Consumed);
                }
                Filtered::Violation { violation, action } => {
                    self.sink.send_mgmt_action(action);
                    return Err(DropReason::ClassViolation(violation));
                }
            }
        }

        if cls.ftype() == FrameType::Ctl {
            // No payload to carry further.
            return Ok(Verdict::Consumed);
        }

        let mut hdr = match cls.hdr {
            Some(ref h) => h.clone(),
            None => return Err(DropReason::Malformed),
        };

        let ta = hdr.transmitter();
        if hdr.fc.retry() && st.last_seq.get(&ta) == Some(hdr.seq_ctrl) {
            return Err(DropReason::Duplicate);
        }
        st.last_seq.record(ta, hdr.seq_ctrl);

        // Bit 2 of the subtype marks the no-body data frames; they
        // only mattered for the power-save bookkeeping above.
        if hdr.fc.stype() & 0x04 != 0 {
            return Ok(Verdict::Consumed);
        }

        let unicast = !cls.is_broadcast_or_multicast;
        let mut crypt: Option<DecryptOutcome> = None;
        if cls.is_protected {
            crypt = Some(dispatch::decrypt(&self.config, &st.keys, &hdr, unicast, &mut frame)?);
        }

        if cls.is_fragment && unicast {
            match reassembler.submit(frame) {
                ReassemblyResult::Incomplete => {
                    reassembler.replenish();
                    return Ok(Verdict::Pending);
                }
                ReassemblyResult::Complete(whole) => {
                    frame = whole;
                    hdr = Ieee80211Hdr::decode(frame.bytes()).map_err(|_| DropReason::Malformed)?;
                }
            }
        }

        if let Some(out) = &crypt {
            // Michael covers the complete MSDU, so it runs after
            // reassembly.
            if out.suite == CipherSuite::Tkip {
                let key = st.keys.lookup(&out.key_id).ok_or(DropReason::Undecryptable)?;
                let start = hdr.hdr_length() + out.iv_overhead;
                if frame.len() < start + MICHAEL_MIC_LEN {
                    return Err(DropReason::Malformed);
                }
                let body = &frame.bytes()[start..];
                let (msdu, mic) = body.split_at(body.len() - MICHAEL_MIC_LEN);
                let want = crypto::michael_mic(
                    key.tkip_mic_rx(),
                    &hdr.destination().to_vec(),
                    &hdr.source().to_vec(),
                    hdr.qos_tid(),
                    msdu,
                );
                if mic != want {
                    return Err(DropReason::MichaelFailure);
                }
                frame.truncate_tail(MICHAEL_MIC_LEN);
            }

            if let Some(tsc) = out.tsc {
                let key = st.keys.lookup(&out.key_id).ok_or(DropReason::Undecryptable)?;
                if !replay::is_fresh(key, tsc) {
                    return Err(DropReason::ReplayDetected(out.suite));
                }
                st.keys.update_replay(&out.key_id, tsc);
            }
        }

        let iv_overhead = crypt.as_ref().map_or(0, |c| c.iv_overhead);
        let field = translate::translate(&mut frame, &hdr, iv_overhead)?;

        // EAPOL rides through the privacy policy so the handshake
        // that installs keys can complete.
        if self.config.drop_unencrypted && crypt.is_none() && field != ethertype::EAPOL {
            return Err(DropReason::UnencryptedDiscard);
        }

        match self.config.mode {
            DeviceMode::Station => {
                self.deliver_up(frame);
                Ok(Verdict::Delivered)
            }
            DeviceMode::AccessPoint => {
                let dst = hdr.destination();
                if dst == self.config.addr {
                    self.deliver_up(frame);
                    return Ok(Verdict::Delivered);
                }
                if dst.is_multicast() {
                    // A copy turns around into the BSS; the original
                    // continues toward the DS either way.
                    match ap::route(&mut st.stations, dst, frame.clone()) {
                        Routed::Queued => st.stats.increment(Counter::PsQueued),
                        Routed::Overflow(_) => st.stats.increment(Counter::Overrun),
                        Routed::Relay(f) => self.sink.relay(f),
                        Routed::Upstream(_) => {}
                    }
                    self.deliver_up(frame);
                    return Ok(Verdict::Delivered);
                }
                match ap::route(&mut st.stations, dst, frame) {
                    Routed::Queued => Ok(Verdict::Queued),
                    Routed::Overflow(_) => Err(DropReason::QueueOverrun),
                    Routed::Relay(f) => {
                        self.sink.relay(f);
                        Ok(Verdict::Delivered)
                    }
                    Routed::Upstream(f) => {
                        self.deliver_up(f);
                        Ok(Verdict::Delivered)
                    }
                }
            }
        }
    }
}

fn counter_for(reason: DropReason) -> Counter {
    match reason {
        DropReason::Malformed => Counter::Malformed,
        DropReason::Undecryptable => Counter::WepUndecryptable,
        DropReason::CipherMismatch => Counter::CipherMismatch,
        DropReason::IntegrityFailure(suite) => match suite {
            CipherSuite::Tkip => Counter::TkipIcvError,
            CipherSuite::Ccmp => Counter::CcmpDecryptError,
            _ => Counter::WepIcvError,
        },
        DropReason::MichaelFailure => Counter::TkipMicError,
        DropReason::ReplayDetected(suite) => match suite {
            CipherSuite::Ccmp => Counter::CcmpReplay,
            _ => Counter::TkipReplay,
        },
        DropReason::ClassViolation(_) => Counter::ClassViolation,
        DropReason::Duplicate => Counter::Duplicate,
        DropReason::UnencryptedDiscard => Counter::UnencryptedDiscard,
        DropReason::QueueOverrun => Counter::Overrun,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::defrag::DiscardingReassembler;
    use crate::wifi::key::AkmSuite;
    use softmac_packets::ieee80211::{
        parse_mac_address, FrameControl, WLAN_FC_ISWEP, WLAN_FC_RETRY, WLAN_FC_TODS,
    };
    use softmac_packets::llc::LlcSnapHeader;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingSink {
        delivered: StdMutex<Vec<Vec<u8>>>,
        relayed: StdMutex<Vec<Vec<u8>>>,
        mgmt: StdMutex<Vec<Vec<u8>>>,
        actions: StdMutex<Vec<MgmtAction>>,
    }

    impl EventSink for RecordingSink {
        fn deliver(&self, frame: Bytes, _meta: &RxMeta) {
            self.delivered.lock().unwrap().push(frame.to_vec());
        }
        fn relay(&self, frame: Frame) {
            self.relayed.lock().unwrap().push(frame.into_vec());
        }
        fn forward_mgmt(&self, frame: Frame) {
            self.mgmt.lock().unwrap().push(frame.into_vec());
        }
        fn send_mgmt_action(&self, action: MgmtAction) {
            self.actions.lock().unwrap().push(action);
        }
    }

    fn addr(s: &str) -> MacAddress {
        parse_mac_address(s).unwrap()
    }

    fn data_header(src: MacAddress, bssid: MacAddress, dst: MacAddress, protected: bool) -> Ieee80211Hdr {
        let mut fc = 0x0008 | WLAN_FC_TODS;
        if protected {
            fc |= WLAN_FC_ISWEP;
        }
        Ieee80211Hdr {
            fc: FrameControl(fc),
            duration_id: 0,
            addr1: bssid,
            addr2: src,
            addr3: dst,
            seq_ctrl: 0x0100,
            addr4: None,
            qos_ctrl: None,
        }
    }

    fn plain_data_frame(hdr: &Ieee80211Hdr, ethertype: u16, payload: &[u8]) -> Frame {
        let mut bytes = hdr.encode();
        bytes.extend_from_slice(&LlcSnapHeader::rfc1042(ethertype).encode());
        bytes.extend_from_slice(payload);
        Frame::new(bytes, RxMeta::default())
    }

    fn station_device(sink: Box<dyn EventSink>) -> Device {
        let addr_self = addr("02:00:00:00:00:01");
        let bssid = addr("02:00:00:00:00:aa");
        Device::new(DeviceConfig::station(addr_self, bssid), sink)
    }

    #[test]
    fn test_station_delivers_plain_data() {
        let sink: &'static RecordingSink = Box::leak(Box::new(RecordingSink::default()));
        let device = station_device(Box::new(SinkRef(sink)));
        let hdr = data_header(
            addr("02:00:00:00:00:02"),
            addr("02:00:00:00:00:aa"),
            addr("02:00:00:00:00:01"),
            false,
        );
        let frame = plain_data_frame(&hdr, ethertype::IPV4, &[0x45, 0, 0, 20]);
        let verdict = device.process(frame, &mut DiscardingReassembler);
        assert_eq!(verdict, Verdict::Delivered);
        assert_eq!(device.counter(Counter::RxOk), 1);
        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(&delivered[0][12..14], &ethertype::IPV4.to_be_bytes());
    }

    #[test]
    fn test_duplicate_retry_dropped() {
        let sink: &'static RecordingSink = Box::leak(Box::new(RecordingSink::default()));
        let device = station_device(Box::new(SinkRef(sink)));
        let mut hdr = data_header(
            addr("02:00:00:00:00:02"),
            addr("02:00:00:00:00:aa"),
            addr("02:00:00:00:00:01"),
            false,
        );
        let frame = plain_data_frame(&hdr, ethertype::IPV4, &[1, 2, 3, 4]);
        assert_eq!(device.process(frame, &mut DiscardingReassembler), Verdict::Delivered);

        hdr.fc = FrameControl(hdr.fc.0 | WLAN_FC_RETRY);
        let retry = plain_data_frame(&hdr, ethertype::IPV4, &[1, 2, 3, 4]);
        assert_eq!(
            device.process(retry, &mut DiscardingReassembler),
            Verdict::Dropped(DropReason::Duplicate)
        );
        assert_eq!(device.counter(Counter::Duplicate), 1);
    }

    #[test]
    fn test_seq_cache_evicts_oldest_at_capacity() {
        let a = addr("02:00:00:00:00:01");
        let b = addr("02:00:00:00:00:02");
        let c = addr("02:00:00:00:00:03");
        let mut cache = SeqCache::new(2);
        cache.record(a, 0x0010);
        cache.record(b, 0x0020);
        // Re-recording an existing transmitter must not consume a slot.
        cache.record(a, 0x0030);
        assert_eq!(cache.get(&a), Some(0x0030));
        cache.record(c, 0x0040);
        assert_eq!(cache.get(&a), None);
        assert_eq!(cache.get(&b), Some(0x0020));
        assert_eq!(cache.get(&c), Some(0x0040));
        cache.forget(&b);
        assert_eq!(cache.get(&b), None);
    }

    #[test]
    fn test_remove_station_forgets_sequence_state() {
        let sink: &'static RecordingSink = Box::leak(Box::new(RecordingSink::default()));
        let device = station_device(Box::new(SinkRef(sink)));
        let peer = addr("02:00:00:00:00:02");
        let mut hdr = data_header(peer, addr("02:00:00:00:00:aa"), addr("02:00:00:00:00:01"), false);
        let frame = plain_data_frame(&hdr, ethertype::IPV4, &[1, 2]);
        assert_eq!(device.process(frame, &mut DiscardingReassembler), Verdict::Delivered);

        device.remove_station(&peer);

        // With the cached sequence control gone, the retry is no
        // longer recognizable as a duplicate.
        hdr.fc = FrameControl(hdr.fc.0 | WLAN_FC_RETRY);
        let retry = plain_data_frame(&hdr, ethertype::IPV4, &[1, 2]);
        assert_eq!(device.process(retry, &mut DiscardingReassembler), Verdict::Delivered);
        assert_eq!(device.counter(Counter::Duplicate), 0);
    }

    #[test]
    fn test_unencrypted_policy_allows_eapol() {
        let sink: &'static RecordingSink = Box::leak(Box::new(RecordingSink::default()));
        let addr_self = addr("02:00:00:00:00:01");
        let bssid = addr("02:00:00:00:00:aa");
        let mut config = DeviceConfig::station(addr_self, bssid);
        config.akm = AkmSuite::Wpa2Psk;
        config.drop_unencrypted = true;
        let device = Device::new(config, Box::new(SinkRef(sink)));

        let hdr = data_header(addr("02:00:00:00:00:02"), bssid, addr_self, false);
        let eapol = plain_data_frame(&hdr, ethertype::EAPOL, &[2, 0, 0, 0]);
        assert_eq!(device.process(eapol, &mut DiscardingReassembler), Verdict::Delivered);

        let plain = plain_data_frame(&hdr, ethertype::IPV4, &[0x45, 0, 0, 20]);
        assert_eq!(
            device.process(plain, &mut DiscardingReassembler),
            Verdict::Dropped(DropReason::UnencryptedDiscard)
        );
        assert_eq!(device.counter(Counter::UnencryptedDiscard), 1);
    }

    #[test]
    fn test_mgmt_frames_forwarded() {
        let sink: &'static RecordingSink = Box::leak(Box::new(RecordingSink::default()));
        let device = station_device(Box::new(SinkRef(sink)));
        let mut bytes = vec![0u8; 24];
        // Beacon: mgmt type, subtype 8.
        bytes[0] = 0x80;
        let frame = Frame::new(bytes, RxMeta::default());
        assert_eq!(device.process(frame, &mut DiscardingReassembler), Verdict::Delivered);
        assert_eq!(sink.mgmt.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_ap_class2_sends_deauth() {
        let sink: &'static RecordingSink = Box::leak(Box::new(RecordingSink::default()));
        let ap_addr = addr("02:00:00:00:00:aa");
        let device = Device::new(DeviceConfig::access_point(ap_addr), Box::new(SinkRef(sink)));

        let stranger = addr("02:00:00:00:00:33");
        let hdr = data_header(stranger, ap_addr, addr("02:00:00:00:00:44"), false);
        let frame = plain_data_frame(&hdr, ethertype::IPV4, &[0; 4]);
        let verdict = device.process(frame, &mut DiscardingReassembler);
        assert!(matches!(verdict, Verdict::Dropped(DropReason::ClassViolation(_))));
        let actions = sink.actions.lock().unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0], MgmtAction::Deauth { sta: stranger, reason: 6 });
        assert_eq!(device.counter(Counter::ClassViolation), 1);
    }

    #[test]
    fn test_ap_relays_between_stations() {
        let sink: &'static RecordingSink = Box::leak(Box::new(RecordingSink::default()));
        let ap_addr = addr("02:00:00:00:00:aa");
        let device = Device::new(DeviceConfig::access_point(ap_addr), Box::new(SinkRef(sink)));
        let a = addr("02:00:00:00:00:01");
        let b = addr("02:00:00:00:00:02");
        device.add_station(a, AssocState::Associated, 1);
        device.add_station(b, AssocState::Associated, 2);

        let hdr = data_header(a, ap_addr, b, false);
        let frame = plain_data_frame(&hdr, ethertype::IPV4, &[9, 9]);
        assert_eq!(device.process(frame, &mut DiscardingReassembler), Verdict::Delivered);
        let relayed = sink.relayed.lock().unwrap();
        assert_eq!(relayed.len(), 1);
        assert_eq!(&relayed[0][0..6], &b.to_vec());
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ap_queues_for_dozing_station_and_poll_drains() {
        let sink: &'static RecordingSink = Box::leak(Box::new(RecordingSink::default()));
        let ap_addr = addr("02:00:00:00:00:aa");
        let device = Device::new(DeviceConfig::access_point(ap_addr), Box::new(SinkRef(sink)));
        let a = addr("02:00:00:00:00:01");
        let b = addr("02:00:00:00:00:02");
        device.add_station(a, AssocState::Associated, 1);
        device.add_station(b, AssocState::Associated, 2);

        // b announces power-save with a null data frame, PM set.
        let mut bytes = Ieee80211Hdr {
            fc: FrameControl(0x0048 | WLAN_FC_TODS | softmac_packets::ieee80211::WLAN_FC_PWRMGT),
            duration_id: 0,
            addr1: ap_addr,
            addr2: b,
            addr3: ap_addr,
            seq_ctrl: 0,
            addr4: None,
            qos_ctrl: None,
        }
        .encode();
        bytes.resize(24, 0);
        assert_eq!(
            device.process(Frame::new(bytes, RxMeta::default()), &mut DiscardingReassembler),
            Verdict::Consumed
        );

        // a sends to b; the frame parks on b's queue.
        let hdr = data_header(a, ap_addr, b, false);
        let frame = plain_data_frame(&hdr, ethertype::IPV4, &[7]);
        assert_eq!(device.process(frame, &mut DiscardingReassembler), Verdict::Queued);
        assert_eq!(device.counter(Counter::PsQueued), 1);
        assert!(sink.relayed.lock().unwrap().is_empty());

        // b polls; one frame comes off the queue.
        let mut poll = vec![0u8; 16];
        poll[0] = 0x04 | (10 << 4);
        poll[4..10].copy_from_slice(&ap_addr.to_vec());
        poll[10..16].copy_from_slice(&b.to_vec());
        assert_eq!(
            device.process(Frame::new(poll, RxMeta::default()), &mut DiscardingReassembler),
            Verdict::Consumed
        );
        let relayed = sink.relayed.lock().unwrap();
        assert_eq!(relayed.len(), 1);
        assert_eq!(&relayed[0][0..6], &b.to_vec());
    }

    #[test]
    fn test_fragment_goes_pending() {
        let sink: &'static RecordingSink = Box::leak(Box::new(RecordingSink::default()));
        let device = station_device(Box::new(SinkRef(sink)));
        let mut hdr = data_header(
            addr("02:00:00:00:00:02"),
            addr("02:00:00:00:00:aa"),
            addr("02:00:00:00:00:01"),
            false,
        );
        hdr.fc = FrameControl(hdr.fc.0 | softmac_packets::ieee80211::WLAN_FC_MOREFRAG);
        let frame = plain_data_frame(&hdr, ethertype::IPV4, &[1, 2]);
        assert_eq!(device.process(frame, &mut DiscardingReassembler), Verdict::Pending);
    }

    /// Forwards to a leaked sink so tests can inspect it afterwards.
    struct SinkRef(&'static RecordingSink);

    impl EventSink for SinkRef {
        fn deliver(&self, frame: Bytes, meta: &RxMeta) {
            self.0.deliver(frame, meta)
        }
        fn relay(&self, frame: Frame) {
            self.0.relay(frame)
        }
        fn forward_mgmt(&self, frame: Frame) {
            self.0.forward_mgmt(frame)
        }
        fn send_mgmt_action(&self, action: MgmtAction) {
            self.0.send_mgmt_action(action)
        }
    }
}
