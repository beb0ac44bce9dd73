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

//! Received frame buffer with out-of-band reception metadata.

/// Link-layer wrapping around the 802.11 frame: receive descriptor,
/// trailing FCS and status words.
pub const WRAP_OVERHEAD: usize = 18;

/// Hardware validated the FCS. Frames arriving without this flag are
/// rejected by the classifier.
pub const HW_FLAG_CRC_OK: u8 = 1 << 0;

/// Reception metadata recorded by the link layer alongside the frame
/// body. Carried through the pipeline and reported with delivery.
#[derive(Debug, Clone, Copy)]
pub struct RxMeta {
    pub rssi: i8,
    pub signal_quality: u8,
    pub rate_idx: u8,
    pub hw_flags: u8,
    /// Microseconds since device start, from the receive descriptor.
    pub timestamp: u64,
    /// Frame length as seen on the bus, including [`WRAP_OVERHEAD`].
    pub wrapped_len: usize,
}

impl Default for RxMeta {
    fn default() -> RxMeta {
        RxMeta {
            rssi: 0,
            signal_quality: 0,
            rate_idx: 0,
            hw_flags: HW_FLAG_CRC_OK,
            timestamp: 0,
            wrapped_len: 0,
        }
    }
}

/// A frame moving through the receive pipeline.
///
/// The buffer is owned and mutated in place. `head` tracks how much of
/// the front has been consumed by header stripping; truncation drops
/// integrity trailers off the back.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Vec<u8>,
    head: usize,
    pub meta: RxMeta,
}

impl Frame {
    /// Wraps a frame body received from the link layer. A zero
    /// `wrapped_len` in `meta` is filled in from the body length.
    pub fn new(data: Vec<u8>, mut meta: RxMeta) -> Frame {
        if meta.wrapped_len == 0 {
            meta.wrapped_len = data.len() + WRAP_OVERHEAD;
        }
        Frame { data, head: 0, meta }
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining frame bytes, from the current head to the tail.
    pub fn bytes(&self) -> &[u8] {
        &self.data[self.head..]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.head..]
    }

    /// Consumes `n` bytes off the front. Returns false if fewer than
    /// `n` bytes remain, leaving the frame untouched.
    pub fn advance_head(&mut self, n: usize) -> bool {
        if n > self.len() {
            return false;
        }
        self.head += n;
        true
    }

    /// Drops `n` bytes off the tail. Returns false if fewer than `n`
    /// bytes remain, leaving the frame untouched.
    pub fn truncate_tail(&mut self, n: usize) -> bool {
        if n > self.len() {
            return false;
        }
        self.data.truncate(self.data.len() - n);
        true
    }

    /// The remaining bytes as an owned vector, for delivery.
    pub fn into_vec(mut self) -> Vec<u8> {
        if self.head == 0 {
            self.data
        } else {
            self.data.split_off(self.head)
        }
    }
}
