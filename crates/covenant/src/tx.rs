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

//! Legacy transaction serialization and the replay-protected (fork id)
//! signature hash of the target chain.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use cc_collector_types::{SignHash, Txid};

/// `SIGHASH_ALL | SIGHASH_FORKID`.
pub const SIGHASH_ALL_FORKID: u32 = 0x41;
/// Sequence number of a final input.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;
/// Version of the transactions the collector builds.
pub const TX_VERSION: i32 = 2;

/// SHA256(SHA256(data)).
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// RIPEMD160(SHA256(data)).
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Appends a Bitcoin compact-size integer.
pub fn write_compact_size(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_compact_size(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// A reference to a transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutPoint {
    /// Id of the transaction holding the output, in display order.
    pub txid: Txid,
    /// Index of the output.
    pub vout: u32,
}

impl OutPoint {
    fn write(&self, buf: &mut Vec<u8>) {
        // txids are displayed byte-reversed
        buf.extend(self.txid.as_bytes().iter().rev());
        buf.extend_from_slice(&self.vout.to_le_bytes());
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// Value in satoshis.
    pub value: u64,
    /// Locking script.
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_var_bytes(buf, &self.script_pubkey);
    }
}

/// A transaction spending a single custody output, without its unlocking
/// script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    /// Transaction version.
    pub version: i32,
    /// The custody output being spent.
    pub prevout: OutPoint,
    /// Sequence number of the input.
    pub sequence: u32,
    /// Outputs created by the transaction.
    pub outputs: Vec<TxOut>,
    /// Lock time.
    pub lock_time: u32,
}

impl UnsignedTransaction {
    /// Serializes the transaction with `script_sig` as the unlocking script of
    /// its only input.
    pub fn serialize_with_script_sig(&self, script_sig: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64 + script_sig.len());
        buf.extend_from_slice(&self.version.to_le_bytes());
        write_compact_size(&mut buf, 1);
        self.prevout.write(&mut buf);
        write_var_bytes(&mut buf, script_sig);
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        write_compact_size(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write(&mut buf);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// The fork id signature hash of the only input, spending an output of
    /// `amount` satoshis locked by `script_code`.
    pub fn signature_hash(
        &self,
        script_code: &[u8],
        amount: u64,
        sighash_type: u32,
    ) -> SignHash {
        let mut prevouts = Vec::with_capacity(36);
        self.prevout.write(&mut prevouts);
        let hash_prevouts = sha256d(&prevouts);
        let hash_sequence = sha256d(&self.sequence.to_le_bytes());
        let mut outputs = Vec::new();
        for output in &self.outputs {
            output.write(&mut outputs);
        }
        let hash_outputs = sha256d(&outputs);

        let mut preimage = Vec::with_capacity(160 + script_code.len());
        preimage.extend_from_slice(&self.version.to_le_bytes());
        preimage.extend_from_slice(&hash_prevouts);
        preimage.extend_from_slice(&hash_sequence);
        self.prevout.write(&mut preimage);
        write_var_bytes(&mut preimage, script_code);
        preimage.extend_from_slice(&amount.to_le_bytes());
        preimage.extend_from_slice(&self.sequence.to_le_bytes());
        preimage.extend_from_slice(&hash_outputs);
        preimage.extend_from_slice(&self.lock_time.to_le_bytes());
        preimage.extend_from_slice(&sighash_type.to_le_bytes());
        SignHash(sha256d(&preimage))
    }
}

/// The id of a serialized transaction.
pub fn txid_of(raw: &[u8]) -> Txid {
    let mut digest = sha256d(raw);
    digest.reverse();
    Txid(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UnsignedTransaction {
        UnsignedTransaction {
            version: TX_VERSION,
            prevout: OutPoint { txid: Txid([0x11; 32]), vout: 3 },
            sequence: SEQUENCE_FINAL,
            outputs: vec![TxOut { value: 5_000, script_pubkey: vec![0x51] }],
            lock_time: 0,
        }
    }

    #[test]
    fn hash_vectors() {
        assert_eq!(
            hex::encode(sha256d(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
        assert_eq!(
            hex::encode(hash160(b"")),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }

    #[test]
    fn compact_size_boundaries() {
        let mut buf = Vec::new();
        write_compact_size(&mut buf, 0xfc);
        write_compact_size(&mut buf, 0xfd);
        write_compact_size(&mut buf, 0x1_0000);
        assert_eq!(buf, vec![0xfc, 0xfd, 0xfd, 0x00, 0xfe, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn serialization_layout() {
        let raw = sample().serialize_with_script_sig(&[0xaa, 0xbb]);
        // version + input count + outpoint + script + sequence
        // + output count + output + lock time
        assert_eq!(raw.len(), 4 + 1 + 36 + 3 + 4 + 1 + (8 + 2) + 4);
        assert_eq!(&raw[..4], &[2, 0, 0, 0]);
        assert_eq!(raw[4], 1);
        assert_eq!(&raw[37..41], &[3, 0, 0, 0]);
        assert_eq!(&raw[41..44], &[2, 0xaa, 0xbb]);
    }

    #[test]
    fn signature_hash_commits_to_amount_and_script() {
        let tx = sample();
        let base = tx.signature_hash(&[0x51], 7_000, SIGHASH_ALL_FORKID);
        assert_eq!(base, tx.signature_hash(&[0x51], 7_000, SIGHASH_ALL_FORKID));
        assert_ne!(base, tx.signature_hash(&[0x51], 7_001, SIGHASH_ALL_FORKID));
        assert_ne!(base, tx.signature_hash(&[0x52], 7_000, SIGHASH_ALL_FORKID));
    }

    #[test]
    fn txid_is_reversed_double_sha() {
        let raw = sample().serialize_with_script_sig(&[]);
        let mut expected = sha256d(&raw);
        expected.reverse();
        assert_eq!(txid_of(&raw).0, expected);
    }
}
