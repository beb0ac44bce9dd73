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

//! Anti-replay check on the 48-bit TKIP/CCMP sequence counter.

use crate::wifi::key::Key;

/// True if `candidate` is acceptable against the counter stored in
/// `key`: strictly greater, with one allowance for wrap when the
/// stored upper 32 bits are all ones and the candidate's are zero.
pub fn is_fresh(key: &Key, candidate: u64) -> bool {
    let cand_lo = (candidate & 0xffff) as u16;
    let cand_hi = (candidate >> 16) as u32;
    if cand_hi == key.tsc47_16 {
        cand_lo > key.tsc15_0
    } else if cand_hi > key.tsc47_16 {
        true
    } else {
        key.tsc47_16 == u32::MAX && cand_hi == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::key::{CipherSuite, Key};

    fn key_at(tsc: u64) -> Key {
        let mut key = Key::new(CipherSuite::Ccmp, vec![0; 16], 0);
        key.set_tsc(tsc);
        key
    }

    #[test]
    fn test_strictly_greater() {
        let key = key_at(0x0000_0001_0000);
        assert!(is_fresh(&key, 0x0000_0001_0001));
        assert!(is_fresh(&key, 0x0000_0002_0000));
        assert!(!is_fresh(&key, 0x0000_0001_0000));
        assert!(!is_fresh(&key, 0x0000_0000_ffff));
    }

    #[test]
    fn test_equal_high_compares_low() {
        let key = key_at(0x0000_0001_00ff);
        assert!(is_fresh(&key, 0x0000_0001_0100));
        assert!(!is_fresh(&key, 0x0000_0001_00fe));
    }

    #[test]
    fn test_wrap_at_all_ones() {
        let key = key_at(0xffff_ffff_fff0);
        // High half wraps from all ones back to zero.
        assert!(is_fresh(&key, 0x0000_0000_0000));
        assert!(is_fresh(&key, 0x0000_0000_0005));
        // A mere decrease without the stored high at all ones is a replay.
        let key = key_at(0xfffe_ffff_fff0);
        assert!(!is_fresh(&key, 0x0000_0000_0005));
    }
}
