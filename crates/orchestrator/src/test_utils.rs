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

//! In-memory doubles of the collector's collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cc_collector_covenant::{
    Covenant, CovenantParams, MultisigCovenant, TxTemplate,
};
use cc_collector_signing_backend::SignerClient;
use cc_collector_source_chain::ChainStateReader;
use cc_collector_tx_broadcaster::{BroadcastOutcome, Broadcaster};
use cc_collector_types::{
    CustodyAddress, CustodyEpoch, CustodyEpochDescriptor, FinalizedTransaction,
    Hash160, Operator, PendingTransfer, PublicKey, SignHash, Signature,
    TransferKind, Txid,
};
use cc_collector_utils::{Error, Result};

pub fn key(n: u8) -> PublicKey {
    let mut bytes = [n; 33];
    bytes[0] = 0x02;
    PublicKey(bytes)
}

pub fn endpoint(n: u8) -> String {
    format!("https://op-{n}")
}

/// `count` operators numbered from `first`.
pub fn operators(first: u8, count: u8) -> Vec<Operator> {
    (first..first + count)
        .map(|n| Operator {
            pubkey: key(n),
            endpoint: endpoint(n),
        })
        .collect()
}

pub fn descriptor(
    current: Vec<Operator>,
    legacy: Vec<Operator>,
) -> CustodyEpochDescriptor {
    CustodyEpochDescriptor {
        current_operators: current,
        current_monitors: vec![key(0xa0), key(0xa1)],
        legacy_operators: legacy,
        legacy_monitors: Vec::new(),
    }
}

pub fn covenant(threshold: usize) -> MultisigCovenant {
    MultisigCovenant::new(
        CovenantParams::builder()
            .operator_threshold(threshold)
            .build(),
    )
}

pub fn redeem(custody: CustodyAddress, n: u8) -> PendingTransfer {
    PendingTransfer {
        kind: TransferKind::Redeem {
            destination: Hash160([n; 20]),
        },
        txid: Txid([n; 32]),
        vout: 0,
        amount: 100_000,
        custody_address: Some(custody),
        sign_hash: None,
    }
}

pub fn conversion(n: u8) -> PendingTransfer {
    PendingTransfer {
        kind: TransferKind::ConvertEpoch,
        txid: Txid([n; 32]),
        vout: 1,
        amount: 100_000,
        custody_address: None,
        sign_hash: None,
    }
}

/// The signature [`MockSigner`] returns for an endpoint.
pub fn signature_of(endpoint: &str) -> Signature {
    let mut bytes = vec![0x30];
    bytes.extend_from_slice(endpoint.as_bytes());
    bytes.push(0x41);
    Signature(bytes)
}

pub fn signatures_of(numbers: &[u8]) -> Vec<Signature> {
    numbers.iter().map(|n| signature_of(&endpoint(*n))).collect()
}

#[derive(Clone, Default)]
pub struct MockReader {
    pub descriptor: Arc<Mutex<CustodyEpochDescriptor>>,
    pub redeems: Arc<Mutex<Vec<PendingTransfer>>>,
    pub conversions: Arc<Mutex<Vec<PendingTransfer>>>,
    pub unavailable: Arc<Mutex<bool>>,
    pub descriptor_calls: Arc<AtomicUsize>,
}

impl MockReader {
    pub fn new(
        descriptor: CustodyEpochDescriptor,
        redeems: Vec<PendingTransfer>,
        conversions: Vec<PendingTransfer>,
    ) -> Self {
        Self {
            descriptor: Arc::new(Mutex::new(descriptor)),
            redeems: Arc::new(Mutex::new(redeems)),
            conversions: Arc::new(Mutex::new(conversions)),
            ..Default::default()
        }
    }

    fn check(&self) -> Result<()> {
        if *self.unavailable.lock().unwrap() {
            return Err(Error::Timeout {
                operation: "sbch_getCcInfo",
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChainStateReader for MockReader {
    async fn custody_epoch_descriptor(&self) -> Result<CustodyEpochDescriptor> {
        self.descriptor_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.descriptor.lock().unwrap().clone())
    }

    async fn pending_redeems(&self) -> Result<Vec<PendingTransfer>> {
        self.check()?;
        Ok(self.redeems.lock().unwrap().clone())
    }

    async fn pending_conversions(&self) -> Result<Vec<PendingTransfer>> {
        self.check()?;
        Ok(self.conversions.lock().unwrap().clone())
    }
}

#[derive(Clone, Default)]
pub struct MockSigner {
    pub failing: Arc<Mutex<HashSet<String>>>,
    /// Endpoints that answer with a signature no script accepts.
    pub malformed: Arc<Mutex<HashSet<String>>>,
    pub delays: Arc<Mutex<HashMap<String, Duration>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockSigner {
    pub fn failing(numbers: &[u8]) -> Self {
        let signer = Self::default();
        signer
            .failing
            .lock()
            .unwrap()
            .extend(numbers.iter().map(|n| endpoint(*n)));
        signer
    }

    pub fn malformed(numbers: &[u8]) -> Self {
        let signer = Self::default();
        signer
            .malformed
            .lock()
            .unwrap()
            .extend(numbers.iter().map(|n| endpoint(*n)));
        signer
    }

    pub fn delay(&self, n: u8, delay: Duration) {
        self.delays.lock().unwrap().insert(endpoint(n), delay);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl SignerClient for MockSigner {
    async fn request_signature(
        &self,
        operator: &Operator,
        _sign_hash: &SignHash,
    ) -> Result<Signature> {
        self.calls.lock().unwrap().push(operator.endpoint.clone());
        let delay = self.delays.lock().unwrap().get(&operator.endpoint).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(&operator.endpoint) {
            return Err(Error::SignerRejected {
                endpoint: operator.endpoint.clone(),
                reason: "offline".into(),
            });
        }
        if self.malformed.lock().unwrap().contains(&operator.endpoint) {
            return Ok(Signature(vec![0x01]));
        }
        Ok(signature_of(&operator.endpoint))
    }
}

/// What the broadcaster does with its n-th call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Reject,
    AlreadyKnown,
}

#[derive(Clone, Default)]
pub struct MockBroadcaster {
    pub sent: Arc<Mutex<Vec<FinalizedTransaction>>>,
    pub replies: Arc<Mutex<HashMap<usize, Reply>>>,
    calls: Arc<AtomicUsize>,
}

impl MockBroadcaster {
    pub fn replying(call: usize, reply: Reply) -> Self {
        let broadcaster = Self::default();
        broadcaster.replies.lock().unwrap().insert(call, reply);
        broadcaster
    }

    pub fn sent_txids(&self) -> Vec<Txid> {
        self.sent.lock().unwrap().iter().map(|tx| tx.txid).collect()
    }
}

#[async_trait::async_trait]
impl Broadcaster for MockBroadcaster {
    async fn broadcast(&self, tx: &FinalizedTransaction) -> Result<BroadcastOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.lock().unwrap().get(&call) {
            Some(Reply::Reject) => Err(Error::BroadcastRejected {
                code: -26,
                message: "min relay fee not met".into(),
            }),
            Some(Reply::AlreadyKnown) => Ok(BroadcastOutcome::AlreadyKnown),
            None => {
                self.sent.lock().unwrap().push(tx.clone());
                Ok(BroadcastOutcome::Accepted(tx.txid))
            }
        }
    }
}

/// A [`MultisigCovenant`] that records what it is asked to finalize.
#[derive(Clone)]
pub struct RecordingCovenant {
    inner: MultisigCovenant,
    pub finalized: Arc<Mutex<Vec<Vec<Signature>>>>,
    pub templates: Arc<Mutex<Vec<(CustodyEpoch, TxTemplate)>>>,
    pub failing_finalize: Arc<Mutex<HashSet<usize>>>,
}

impl RecordingCovenant {
    pub fn new(threshold: usize) -> Self {
        Self {
            inner: covenant(threshold),
            finalized: Default::default(),
            templates: Default::default(),
            failing_finalize: Default::default(),
        }
    }

    pub fn finalized(&self) -> Vec<Vec<Signature>> {
        self.finalized.lock().unwrap().clone()
    }
}

impl Covenant for RecordingCovenant {
    fn threshold(&self) -> usize {
        self.inner.threshold()
    }

    fn check_signature(&self, index: usize, signature: &Signature) -> Result<()> {
        self.inner.check_signature(index, signature)
    }

    fn custody_address(&self, epoch: &CustodyEpoch) -> Result<CustodyAddress> {
        self.inner.custody_address(epoch)
    }

    fn redeem_template(
        &self,
        epoch: &CustodyEpoch,
        transfer: &PendingTransfer,
        destination: &Hash160,
    ) -> Result<TxTemplate> {
        let template = self.inner.redeem_template(epoch, transfer, destination)?;
        self.templates
            .lock()
            .unwrap()
            .push((epoch.clone(), template.clone()));
        Ok(template)
    }

    fn conversion_template(
        &self,
        legacy: &CustodyEpoch,
        current: &CustodyEpoch,
        transfer: &PendingTransfer,
    ) -> Result<TxTemplate> {
        let template = self.inner.conversion_template(legacy, current, transfer)?;
        self.templates
            .lock()
            .unwrap()
            .push((legacy.clone(), template.clone()));
        Ok(template)
    }

    fn finalize(
        &self,
        template: &TxTemplate,
        signatures: &[Signature],
    ) -> Result<FinalizedTransaction> {
        let call = {
            let mut finalized = self.finalized.lock().unwrap();
            finalized.push(signatures.to_vec());
            finalized.len() - 1
        };
        if self.failing_finalize.lock().unwrap().contains(&call) {
            return Err(Error::MalformedSignature {
                index: 0,
                reason: "injected failure",
            });
        }
        self.inner.finalize(template, signatures)
    }
}
