// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Poll every minute by default.
pub const fn poll_interval() -> u64 {
    60_000
}
/// Chain RPC requests time out after 15 seconds by default.
pub const fn request_timeout() -> u64 {
    15_000
}
/// Signer requests time out after 5 seconds by default.
pub const fn signer_request_timeout() -> u64 {
    5_000
}
/// 7 operator signatures are required by default.
pub const fn threshold() -> usize {
    7
}
/// At most 16 signature requests in flight by default.
pub const fn max_concurrency() -> usize {
    16
}
/// 2 monitor signatures on the recovery branch by default.
pub const fn monitor_threshold() -> usize {
    2
}
/// Roughly two weeks of blocks.
pub const fn monitor_delay_blocks() -> u16 {
    2016
}
/// The miner fee is set to `2_000` satoshis by default.
pub const fn miner_fee() -> u64 {
    2_000
}
