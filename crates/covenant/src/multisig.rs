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

use typed_builder::TypedBuilder;

use cc_collector_types::{
    CustodyAddress, CustodyEpoch, FinalizedTransaction, Hash160,
    PendingTransfer, PublicKey, Signature,
};
use cc_collector_utils::{Error, Result};

use crate::script::*;
use crate::tx::{
    hash160, txid_of, OutPoint, TxOut, UnsignedTransaction, SEQUENCE_FINAL,
    SIGHASH_ALL_FORKID, TX_VERSION,
};
use crate::{Covenant, TxTemplate};

/// Most keys a single `OP_CHECKMULTISIG` branch may hold.
pub const MAX_KEYS_PER_SET: usize = 16;

/// Parameters of the custody script, shared by every epoch.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct CovenantParams {
    /// Operator signatures needed to spend a custody output.
    #[builder(default = 7)]
    pub operator_threshold: usize,
    /// Monitor signatures needed on the time-locked recovery branch.
    #[builder(default = 2)]
    pub monitor_threshold: usize,
    /// Relative lock time, in blocks, of the recovery branch.
    #[builder(default = 2016)]
    pub monitor_delay_blocks: u16,
    /// Fee deducted from every spent custody output, in satoshis.
    #[builder(default = 2000)]
    pub miner_fee: u64,
}

impl Default for CovenantParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A P2SH custody script with two branches:
///
/// ```text
/// OP_IF
///     <T> <operator keys..> <N> OP_CHECKMULTISIG
/// OP_ELSE
///     <delay> OP_CHECKSEQUENCEVERIFY OP_DROP
///     <Tm> <monitor keys..> <M> OP_CHECKMULTISIG
/// OP_ENDIF
/// ```
///
/// The collector only ever spends the operator branch.
#[derive(Debug, Clone, Default)]
pub struct MultisigCovenant {
    params: CovenantParams,
}

impl MultisigCovenant {
    /// Creates a covenant with the given parameters.
    pub fn new(params: CovenantParams) -> Self {
        Self { params }
    }

    /// The parameters of this covenant.
    pub fn params(&self) -> &CovenantParams {
        &self.params
    }

    /// Builds the redeem script of an epoch.
    pub fn redeem_script(&self, epoch: &CustodyEpoch) -> Result<Vec<u8>> {
        let operators = epoch.operator_keys();
        check_key_set("operator", &operators, self.params.operator_threshold)?;
        check_key_set("monitor", &epoch.monitors, self.params.monitor_threshold)?;

        let mut builder = ScriptBuilder::new()
            .push_opcode(OP_IF)
            .push_int(self.params.operator_threshold as i64);
        for key in &operators {
            builder = builder.push_data(key.as_bytes());
        }
        builder = builder
            .push_int(operators.len() as i64)
            .push_opcode(OP_CHECKMULTISIG)
            .push_opcode(OP_ELSE)
            .push_int(i64::from(self.params.monitor_delay_blocks))
            .push_opcode(OP_CHECKSEQUENCEVERIFY)
            .push_opcode(OP_DROP)
            .push_int(self.params.monitor_threshold as i64);
        for key in &epoch.monitors {
            builder = builder.push_data(key.as_bytes());
        }
        let script = builder
            .push_int(epoch.monitors.len() as i64)
            .push_opcode(OP_CHECKMULTISIG)
            .push_opcode(OP_ENDIF)
            .into_bytes();

        if script.len() > MAX_REDEEM_SCRIPT_SIZE {
            return Err(Error::ScriptTooLarge {
                size: script.len(),
                max: MAX_REDEEM_SCRIPT_SIZE,
            });
        }
        Ok(script)
    }

    fn template(
        &self,
        redeem_script: Vec<u8>,
        transfer: &PendingTransfer,
        script_pubkey: Vec<u8>,
    ) -> Result<TxTemplate> {
        if transfer.amount <= self.params.miner_fee {
            return Err(Error::AmountTooLow {
                amount: transfer.amount,
                fee: self.params.miner_fee,
            });
        }
        let tx = UnsignedTransaction {
            version: TX_VERSION,
            prevout: OutPoint {
                txid: transfer.txid,
                vout: transfer.vout,
            },
            sequence: SEQUENCE_FINAL,
            outputs: vec![TxOut {
                value: transfer.amount - self.params.miner_fee,
                script_pubkey,
            }],
            lock_time: 0,
        };
        let sign_hash =
            tx.signature_hash(&redeem_script, transfer.amount, SIGHASH_ALL_FORKID);
        Ok(TxTemplate {
            tx,
            redeem_script,
            sign_hash,
            threshold: self.params.operator_threshold,
        })
    }
}

fn check_key_set(
    role: &str,
    keys: &[PublicKey],
    threshold: usize,
) -> Result<()> {
    if keys.is_empty() || keys.len() > MAX_KEYS_PER_SET {
        return Err(Error::InvalidKeySet(format!(
            "{role} set must hold 1 to {MAX_KEYS_PER_SET} keys, got {}",
            keys.len()
        )));
    }
    if threshold == 0 || threshold > keys.len() {
        return Err(Error::InvalidKeySet(format!(
            "{role} threshold {threshold} does not fit a set of {} keys",
            keys.len()
        )));
    }
    if let Some(key) = keys.iter().find(|k| !k.is_compressed()) {
        return Err(Error::InvalidKeySet(format!(
            "{role} key {key} is not a compressed public key"
        )));
    }
    Ok(())
}

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(hash: &Hash160) -> Vec<u8> {
    ScriptBuilder::new()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_data(hash.as_bytes())
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_bytes()
}

/// `OP_HASH160 <hash> OP_EQUAL`
pub fn p2sh_script(hash: &Hash160) -> Vec<u8> {
    ScriptBuilder::new()
        .push_opcode(OP_HASH160)
        .push_data(hash.as_bytes())
        .push_opcode(OP_EQUAL)
        .into_bytes()
}

/// DER signature plus hash-type byte, between 9 and 73 bytes.
fn check_signature(index: usize, signature: &Signature) -> Result<()> {
    let bytes = signature.as_bytes();
    if !(9..=73).contains(&bytes.len()) {
        return Err(Error::MalformedSignature {
            index,
            reason: "unexpected length",
        });
    }
    if bytes[bytes.len() - 1] as u32 != SIGHASH_ALL_FORKID {
        return Err(Error::MalformedSignature {
            index,
            reason: "wrong sighash type",
        });
    }
    Ok(())
}

impl Covenant for MultisigCovenant {
    fn threshold(&self) -> usize {
        self.params.operator_threshold
    }

    fn check_signature(&self, index: usize, signature: &Signature) -> Result<()> {
        check_signature(index, signature)
    }

    fn custody_address(&self, epoch: &CustodyEpoch) -> Result<CustodyAddress> {
        let script = self.redeem_script(epoch)?;
        Ok(Hash160(hash160(&script)))
    }

    fn redeem_template(
        &self,
        epoch: &CustodyEpoch,
        transfer: &PendingTransfer,
        destination: &Hash160,
    ) -> Result<TxTemplate> {
        let redeem_script = self.redeem_script(epoch)?;
        self.template(redeem_script, transfer, p2pkh_script(destination))
    }

    fn conversion_template(
        &self,
        legacy: &CustodyEpoch,
        current: &CustodyEpoch,
        transfer: &PendingTransfer,
    ) -> Result<TxTemplate> {
        let redeem_script = self.redeem_script(legacy)?;
        let new_custody = self.custody_address(current)?;
        self.template(redeem_script, transfer, p2sh_script(&new_custody))
    }

    fn finalize(
        &self,
        template: &TxTemplate,
        signatures: &[Signature],
    ) -> Result<FinalizedTransaction> {
        if signatures.len() != template.threshold {
            return Err(Error::SignatureCount {
                expected: template.threshold,
                actual: signatures.len(),
            });
        }
        for (index, signature) in signatures.iter().enumerate() {
            check_signature(index, signature)?;
        }

        // OP_CHECKMULTISIG pops one extra element
        let mut builder = ScriptBuilder::new().push_opcode(OP_0);
        for signature in signatures {
            builder = builder.push_data(signature.as_bytes());
        }
        let script_sig = builder
            .push_opcode(OP_1)
            .push_data(&template.redeem_script)
            .into_bytes();

        let raw = template.tx.serialize_with_script_sig(&script_sig);
        let txid = txid_of(&raw);
        tracing::trace!(%txid, size = raw.len(), "Assembled custody spend");
        Ok(FinalizedTransaction { raw, txid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_collector_types::{EpochKind, Operator, TransferKind, Txid};

    fn key(n: u8) -> PublicKey {
        let mut bytes = [n; 33];
        bytes[0] = 0x02;
        PublicKey(bytes)
    }

    fn epoch(kind: EpochKind, operators: u8, monitors: u8, offset: u8) -> CustodyEpoch {
        CustodyEpoch {
            kind,
            operators: (0..operators)
                .map(|i| Operator {
                    pubkey: key(offset + i),
                    endpoint: format!("https://signer-{i}.example"),
                })
                .collect(),
            monitors: (0..monitors).map(|i| key(0x80 + offset + i)).collect(),
        }
    }

    fn transfer(amount: u64) -> PendingTransfer {
        PendingTransfer {
            kind: TransferKind::Redeem {
                destination: Hash160([0x44; 20]),
            },
            txid: Txid([0x99; 32]),
            vout: 1,
            amount,
            custody_address: None,
            sign_hash: None,
        }
    }

    fn signature(tag: u8) -> Signature {
        let mut bytes = vec![0x30; 71];
        bytes[1] = tag;
        bytes.push(0x41);
        Signature(bytes)
    }

    fn covenant() -> MultisigCovenant {
        MultisigCovenant::new(CovenantParams::builder().operator_threshold(2).build())
    }

    #[test]
    fn redeem_script_layout() {
        let script = covenant()
            .redeem_script(&epoch(EpochKind::Current, 3, 2, 1))
            .unwrap();
        assert_eq!(script[0], OP_IF);
        assert_eq!(script[1], 0x52);
        assert_eq!(script[2], 33);
        assert_eq!(&script[3..36], key(1).as_bytes());
        // 3 keys of 34 bytes each
        let after_ops = 2 + 3 * 34;
        assert_eq!(&script[after_ops..after_ops + 3], &[0x53, OP_CHECKMULTISIG, OP_ELSE]);
        // 2016 = 0x07e0
        assert_eq!(
            &script[after_ops + 3..after_ops + 8],
            &[0x02, 0xe0, 0x07, OP_CHECKSEQUENCEVERIFY, OP_DROP]
        );
        assert_eq!(*script.last().unwrap(), OP_ENDIF);
    }

    #[test]
    fn address_depends_on_key_order() {
        let covenant = covenant();
        let mut e = epoch(EpochKind::Current, 3, 2, 1);
        let a = covenant.custody_address(&e).unwrap();
        assert_eq!(a, covenant.custody_address(&e.clone()).unwrap());
        e.operators.swap(0, 1);
        assert_ne!(a, covenant.custody_address(&e).unwrap());
    }

    #[test]
    fn invalid_key_sets_are_rejected() {
        let covenant = covenant();
        assert!(matches!(
            covenant.custody_address(&epoch(EpochKind::Current, 1, 2, 1)),
            Err(Error::InvalidKeySet(_))
        ));
        assert!(matches!(
            covenant.custody_address(&epoch(EpochKind::Current, 17, 2, 1)),
            Err(Error::InvalidKeySet(_))
        ));
        assert!(matches!(
            covenant.custody_address(&epoch(EpochKind::Current, 3, 0, 1)),
            Err(Error::InvalidKeySet(_))
        ));
        assert!(matches!(
            covenant.custody_address(&epoch(EpochKind::Current, 12, 3, 1)),
            Err(Error::ScriptTooLarge { .. })
        ));
    }

    #[test]
    fn redeem_pays_destination_minus_fee() {
        let template = covenant()
            .redeem_template(
                &epoch(EpochKind::Current, 3, 2, 1),
                &transfer(10_000),
                &Hash160([0x44; 20]),
            )
            .unwrap();
        assert_eq!(template.threshold, 2);
        assert_eq!(template.tx.outputs.len(), 1);
        assert_eq!(template.tx.outputs[0].value, 8_000);
        assert_eq!(template.tx.outputs[0].script_pubkey, p2pkh_script(&Hash160([0x44; 20])));
        assert_eq!(template.tx.prevout.vout, 1);
    }

    #[test]
    fn amount_must_cover_fee() {
        let err = covenant()
            .redeem_template(
                &epoch(EpochKind::Current, 3, 2, 1),
                &transfer(2_000),
                &Hash160([0x44; 20]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::AmountTooLow { amount: 2_000, fee: 2_000 }));
    }

    #[test]
    fn conversion_pays_current_custody() {
        let covenant = covenant();
        let legacy = epoch(EpochKind::Legacy, 3, 2, 1);
        let current = epoch(EpochKind::Current, 3, 2, 10);
        let template = covenant
            .conversion_template(&legacy, &current, &transfer(10_000))
            .unwrap();
        let current_address = covenant.custody_address(&current).unwrap();
        assert_eq!(template.tx.outputs[0].script_pubkey, p2sh_script(&current_address));
        assert_eq!(template.redeem_script, covenant.redeem_script(&legacy).unwrap());
    }

    #[test]
    fn finalize_requires_exact_signature_count() {
        let covenant = covenant();
        let template = covenant
            .redeem_template(
                &epoch(EpochKind::Current, 3, 2, 1),
                &transfer(10_000),
                &Hash160([0x44; 20]),
            )
            .unwrap();
        let err = covenant.finalize(&template, &[signature(1)]).unwrap_err();
        assert!(matches!(err, Error::SignatureCount { expected: 2, actual: 1 }));

        let mut bad = signature(2);
        bad.0.pop();
        bad.0.push(0x01);
        let err = covenant.finalize(&template, &[signature(1), bad]).unwrap_err();
        assert!(matches!(err, Error::MalformedSignature { index: 1, .. }));
    }

    #[test]
    fn signature_shape_is_checked() {
        let covenant = covenant();
        covenant.check_signature(0, &signature(1)).unwrap();

        let err = covenant
            .check_signature(3, &Signature(vec![0x01]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedSignature { index: 3, reason: "unexpected length" }
        ));

        let mut wrong_type = signature(1);
        *wrong_type.0.last_mut().unwrap() = 0x01;
        let err = covenant.check_signature(0, &wrong_type).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedSignature { reason: "wrong sighash type", .. }
        ));
    }

    #[test]
    fn finalized_script_sig_keeps_signature_order() {
        let covenant = covenant();
        let template = covenant
            .redeem_template(
                &epoch(EpochKind::Current, 3, 2, 1),
                &transfer(10_000),
                &Hash160([0x44; 20]),
            )
            .unwrap();
        let first = covenant
            .finalize(&template, &[signature(1), signature(2)])
            .unwrap();
        let swapped = covenant
            .finalize(&template, &[signature(2), signature(1)])
            .unwrap();
        assert_ne!(first.txid, swapped.txid);
        assert_eq!(first.txid, txid_of(&first.raw));

        // version, input count, outpoint, script length prefix, then OP_0
        let script_start = 4 + 1 + 36;
        let script_sig = &first.raw[script_start + 3..];
        assert_eq!(script_sig[0], OP_0);
        assert_eq!(script_sig[1], 72);
        assert_eq!(script_sig[3], 1);
    }
}
