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

//! In-place 802.11 to 802.3 header translation.

use softmac_packets::ieee80211::Ieee80211Hdr;
use softmac_packets::llc::{ethertype, LlcSnapHeader};

use crate::wifi::error::DropReason;
use crate::wifi::frame::Frame;

pub const ETH_HDR_LEN: usize = 14;

/// Rewrites the frame into an Ethernet frame, consuming the 802.11
/// MAC header and `iv_overhead` bytes of security header behind it.
///
/// RFC 1042 and bridge-tunnel SNAP payloads lose their 8-byte LLC
/// header and keep the encapsulated EtherType; IPX and AppleTalk AARP
/// under RFC 1042 are the exception, since those types belong under
/// the bridge-tunnel OUI. Everything else keeps its LLC bytes under an
/// 802.3 length field.
///
/// Returns the EtherType or length written into the Ethernet header.
pub fn translate(
    frame: &mut Frame,
    hdr: &Ieee80211Hdr,
    iv_overhead: usize,
) -> Result<u16, DropReason> {
    let mac_hdr = hdr.hdr_length() + iv_overhead;
    if frame.len() < mac_hdr + LlcSnapHeader::LEN {
        return Err(DropReason::Malformed);
    }

    let payload = &frame.bytes()[mac_hdr..];
    let passthrough = match LlcSnapHeader::decode(payload) {
        Ok(llc) if llc.is_bridge_tunnel() => Some(llc.ethertype),
        Ok(llc)
            if llc.is_rfc1042()
                && llc.ethertype != ethertype::IPX
                && llc.ethertype != ethertype::APPLETALK_AARP =>
        {
            Some(llc.ethertype)
        }
        _ => None,
    };

    let (strip, field) = match passthrough {
        Some(ethertype) => (mac_hdr + LlcSnapHeader::LEN, ethertype),
        None => (mac_hdr, (frame.len() - mac_hdr) as u16),
    };

    let dst = hdr.destination().to_vec();
    let src = hdr.source().to_vec();

    // strip >= 24 > ETH_HDR_LEN, so the Ethernet header fits in place.
    frame.advance_head(strip - ETH_HDR_LEN);
    let bytes = frame.bytes_mut();
    bytes[0..6].copy_from_slice(&dst);
    bytes[6..12].copy_from_slice(&src);
    bytes[12..14].copy_from_slice(&field.to_be_bytes());
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::frame::RxMeta;
    use softmac_packets::ieee80211::{FrameControl, MacAddress, WLAN_FC_TODS};

    fn hdr(dst: MacAddress, src: MacAddress) -> Ieee80211Hdr {
        Ieee80211Hdr {
            fc: FrameControl(0x0008 | WLAN_FC_TODS),
            duration_id: 0,
            addr1: MacAddress(0xaa),
            addr2: src,
            addr3: dst,
            seq_ctrl: 0,
            addr4: None,
            qos_ctrl: None,
        }
    }

    fn build_frame(hdr: &Ieee80211Hdr, payload: &[u8]) -> Frame {
        let mut bytes = hdr.encode();
        bytes.extend_from_slice(payload);
        Frame::new(bytes, RxMeta::default())
    }

    #[test]
    fn test_rfc1042_ethertype_passthrough() {
        let dst = MacAddress(0x0200_0000_0001);
        let src = MacAddress(0x0200_0000_0002);
        let hdr = hdr(dst, src);
        let mut payload = LlcSnapHeader::rfc1042(ethertype::IPV4).encode().to_vec();
        payload.extend_from_slice(&[0x45, 0x00, 0x00, 0x14]);
        let mut frame = build_frame(&hdr, &payload);

        let field = translate(&mut frame, &hdr, 0).unwrap();
        assert_eq!(field, ethertype::IPV4);
        let bytes = frame.bytes();
        assert_eq!(&bytes[0..6], &dst.to_vec());
        assert_eq!(&bytes[6..12], &src.to_vec());
        assert_eq!(&bytes[12..14], &ethertype::IPV4.to_be_bytes());
        assert_eq!(&bytes[14..], &[0x45, 0x00, 0x00, 0x14]);
    }

    #[test]
    fn test_ipx_keeps_llc_with_length_field() {
        let dst = MacAddress(0x0200_0000_0001);
        let src = MacAddress(0x0200_0000_0002);
        let hdr = hdr(dst, src);
        let mut payload = LlcSnapHeader::rfc1042(ethertype::IPX).encode().to_vec();
        payload.extend_from_slice(&[0xff, 0xff]);
        let mut frame = build_frame(&hdr, &payload);

        let field = translate(&mut frame, &hdr, 0).unwrap();
        assert_eq!(field as usize, LlcSnapHeader::LEN + 2);
        let bytes = frame.bytes();
        // LLC header retained behind the length field.
        assert_eq!(bytes[14], 0xaa);
        assert_eq!(bytes[15], 0xaa);
    }

    #[test]
    fn test_bridge_tunnel_ethertype_passthrough() {
        let dst = MacAddress(0x0200_0000_0001);
        let src = MacAddress(0x0200_0000_0002);
        let hdr = hdr(dst, src);
        let mut payload = LlcSnapHeader::bridge_tunnel(ethertype::IPX).encode().to_vec();
        payload.extend_from_slice(&[0xff, 0xff, 0x00, 0x30]);
        let mut frame = build_frame(&hdr, &payload);

        let field = translate(&mut frame, &hdr, 0).unwrap();
        assert_eq!(field, ethertype::IPX);
        let bytes = frame.bytes();
        assert_eq!(&bytes[12..14], &ethertype::IPX.to_be_bytes());
        assert_eq!(&bytes[14..], &[0xff, 0xff, 0x00, 0x30]);
    }

    #[test]
    fn test_non_snap_payload_gets_length_field() {
        let dst = MacAddress(0x0200_0000_0001);
        let src = MacAddress(0x0200_0000_0002);
        let hdr = hdr(dst, src);
        let payload = [0x06u8, 0x06, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02];
        let mut frame = build_frame(&hdr, &payload);

        let field = translate(&mut frame, &hdr, 0).unwrap();
        assert_eq!(field as usize, payload.len());
        assert_eq!(&frame.bytes()[14..], &payload);
    }

    #[test]
    fn test_iv_overhead_is_stripped() {
        let dst = MacAddress(0x0200_0000_0001);
        let src = MacAddress(0x0200_0000_0002);
        let hdr = hdr(dst, src);
        let mut payload = vec![0u8; 8]; // residual CCMP header
        payload.extend_from_slice(&LlcSnapHeader::rfc1042(ethertype::ARP).encode());
        payload.extend_from_slice(&[1, 2, 3]);
        let mut frame = build_frame(&hdr, &payload);

        let field = translate(&mut frame, &hdr, 8).unwrap();
        assert_eq!(field, ethertype::ARP);
        assert_eq!(&frame.bytes()[14..], &[1, 2, 3]);
    }

    #[test]
    fn test_too_short_for_snap() {
        let dst = MacAddress(0x0200_0000_0001);
        let src = MacAddress(0x0200_0000_0002);
        let hdr = hdr(dst, src);
        let mut frame = build_frame(&hdr, &[0xaa; 4]);
        assert!(matches!(translate(&mut frame, &hdr, 0), Err(DropReason::Malformed)));
    }
}
