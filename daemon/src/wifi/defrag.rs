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

//! Hand-off point for MSDU reassembly.

use crate::wifi::frame::Frame;

/// Result of submitting one decrypted fragment.
#[derive(Debug)]
pub enum ReassemblyResult {
    /// All fragments arrived. The returned frame keeps the layout of
    /// the first fragment (MAC header, IV bytes if any) with the
    /// payloads concatenated behind it.
    Complete(Frame),
    /// More fragments outstanding; the reassembler keeps the frame.
    Incomplete,
}

/// MSDU reassembly owned by the caller. The pipeline hands decrypted
/// unicast fragments over and continues with whatever comes back.
pub trait FragmentReassembler {
    fn submit(&mut self, frame: Frame) -> ReassemblyResult;

    /// Called after each incomplete submission so the implementation
    /// can restock the receive buffer the fragment came from.
    fn replenish(&mut self);
}

/// Reassembler that never holds fragments. Useful where fragmentation
/// is disabled; partial MSDUs are simply discarded.
#[derive(Debug, Default)]
pub struct DiscardingReassembler;

impl FragmentReassembler for DiscardingReassembler {
    fn submit(&mut self, _frame: Frame) -> ReassemblyResult {
        ReassemblyResult::Incomplete
    }

    fn replenish(&mut self) {}
}
