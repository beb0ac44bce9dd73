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

//! Receive path counters.

use std::collections::HashMap;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Counter {
    RxOk,
    RxDropped,
    Malformed,
    Duplicate,
    Overrun,
    PsQueued,
    ClassViolation,
    CipherMismatch,
    UnencryptedDiscard,
    WepUndecryptable,
    WepIcvError,
    TkipIcvError,
    TkipMicError,
    TkipReplay,
    CcmpDecryptError,
    CcmpReplay,
}

/// Per-device counters, updated as frames complete or drop out of the
/// pipeline.
#[derive(Debug, Default)]
pub struct Statistics {
    counts: HashMap<Counter, u64>,
}

impl Statistics {
    pub fn increment(&mut self, counter: Counter) {
        *self.counts.entry(counter).or_insert(0) += 1;
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counts.get(&counter).copied().unwrap_or(0)
    }
}
