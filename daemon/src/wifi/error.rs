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

use crate::wifi::key::CipherSuite;

/// Class rules an AP enforces on frames from its stations.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ClassViolation {
    /// Class 2 frame from a station that has not authenticated.
    Class2FromUnauthenticated,
    /// Class 3 frame from a station that has not associated.
    Class3FromUnassociated,
}

impl ClassViolation {
    /// 802.11 reason code carried in the management response.
    pub fn reason_code(&self) -> u16 {
        match self {
            ClassViolation::Class2FromUnauthenticated => 6,
            ClassViolation::Class3FromUnassociated => 7,
        }
    }
}

/// Terminal outcome of a frame that did not make it through the
/// receive pipeline.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum DropReason {
    /// Frame failed length bounds or header parsing.
    Malformed,
    /// Protected frame with no installed key able to decrypt it.
    Undecryptable,
    /// The resolved key's cipher does not match the configured policy.
    CipherMismatch,
    /// ICV or CCMP MIC verification failed.
    IntegrityFailure(CipherSuite),
    /// Michael MIC on the reassembled MSDU did not verify.
    MichaelFailure,
    /// Sequence counter not strictly greater than the last accepted one.
    ReplayDetected(CipherSuite),
    /// Frame from a station in the wrong association state.
    ClassViolation(ClassViolation),
    /// Retransmission of an already accepted frame.
    Duplicate,
    /// Cleartext data while the privacy policy requires encryption.
    UnencryptedDiscard,
    /// Power-save queue full; the newest frame is dropped.
    QueueOverrun,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::Malformed => write!(f, "malformed frame"),
            DropReason::Undecryptable => write!(f, "no usable key"),
            DropReason::CipherMismatch => write!(f, "cipher policy mismatch"),
            DropReason::IntegrityFailure(suite) => {
                write!(f, "{:?} integrity check failed", suite)
            }
            DropReason::MichaelFailure => write!(f, "Michael MIC failure"),
            DropReason::ReplayDetected(suite) => write!(f, "{:?} replay detected", suite),
            DropReason::ClassViolation(v) => {
                write!(f, "class violation (reason {})", v.reason_code())
            }
            DropReason::Duplicate => write!(f, "duplicate frame"),
            DropReason::UnencryptedDiscard => write!(f, "unencrypted frame discarded"),
            DropReason::QueueOverrun => write!(f, "power-save queue overrun"),
        }
    }
}

impl std::error::Error for DropReason {}
