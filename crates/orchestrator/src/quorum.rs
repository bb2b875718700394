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

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use typed_builder::TypedBuilder;

use cc_collector_covenant::Covenant;
use cc_collector_signing_backend::SignerClient;
use cc_collector_types::{Operator, SignHash, Signature};
use cc_collector_utils::metric::Metrics;
use cc_collector_utils::{probe, Error, Result};

/// Collects `threshold` signatures over a sign hash from the operators of
/// one epoch.
///
/// Every operator is asked, at most `max_concurrency` at a time, each request
/// with its own timeout. Shares are kept in operator order whatever order
/// they arrive in, and only the first `threshold` of them are returned, so
/// the same set of responders always yields the same signatures.
#[derive(TypedBuilder)]
pub struct QuorumCollector<S> {
    signer: S,
    /// Signatures required.
    threshold: usize,
    /// Deadline of a single signer request.
    #[builder(default = Duration::from_secs(5))]
    request_timeout: Duration,
    /// Most signer requests in flight at once.
    #[builder(default = 16)]
    max_concurrency: usize,
    metrics: Arc<Metrics>,
}

impl<S> QuorumCollector<S>
where
    S: SignerClient,
{
    /// Signatures required for a quorum.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Queries every operator for a signature over `sign_hash`.
    ///
    /// A share only counts once `covenant` accepts its shape; a signer that
    /// answers with garbage is treated like one that did not answer. Fails
    /// with [`Error::InsufficientQuorum`] when fewer than `threshold`
    /// operators answered with a usable signature.
    #[tracing::instrument(skip_all, fields(hash = %sign_hash, operators = operators.len()))]
    pub async fn collect<C>(
        &self,
        covenant: &C,
        sign_hash: &SignHash,
        operators: &[Operator],
    ) -> Result<Vec<Signature>>
    where
        C: Covenant + ?Sized,
    {
        let requests: Vec<_> = operators
            .iter()
            .map(|operator| self.query(operator, sign_hash))
            .collect();
        // `buffered` yields in input order, which is operator order
        let responses: Vec<Result<Signature>> = futures::stream::iter(requests)
            .buffered(self.max_concurrency.max(1))
            .collect()
            .await;

        let mut shares = Vec::with_capacity(operators.len());
        for (index, (operator, res)) in
            operators.iter().zip(responses).enumerate()
        {
            let res = res.and_then(|signature| {
                covenant.check_signature(index, &signature)?;
                Ok(signature)
            });
            match res {
                Ok(signature) => {
                    tracing::event!(
                        target: probe::TARGET,
                        tracing::Level::TRACE,
                        kind = %probe::Kind::SignerQuery,
                        index,
                        endpoint = %operator.endpoint,
                        ok = true,
                    );
                    shares.push(signature);
                }
                Err(e) => {
                    self.metrics.signer_failures_total.inc();
                    tracing::warn!(
                        index,
                        endpoint = %operator.endpoint,
                        error = %e,
                        "Signer did not provide a usable signature",
                    );
                }
            }
        }

        let received = shares.len();
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Quorum,
            required = self.threshold,
            received,
            reached = received >= self.threshold,
        );
        if received < self.threshold {
            return Err(Error::InsufficientQuorum {
                required: self.threshold,
                received,
            });
        }
        shares.truncate(self.threshold);
        Ok(shares)
    }

    async fn query(
        &self,
        operator: &Operator,
        sign_hash: &SignHash,
    ) -> Result<Signature> {
        let request = self.signer.request_signature(operator, sign_hash);
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout {
                operation: "signer request",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn collector(signer: MockSigner, threshold: usize) -> QuorumCollector<MockSigner> {
        QuorumCollector::builder()
            .signer(signer)
            .threshold(threshold)
            .request_timeout(Duration::from_millis(200))
            .metrics(Arc::new(Metrics::new().unwrap()))
            .build()
    }

    #[tokio::test]
    async fn tolerates_failures_up_to_the_slack() {
        let collector = collector(MockSigner::failing(&[3, 6]), 7);
        let shares = collector
            .collect(&covenant(7), &SignHash([1; 32]), &operators(1, 9))
            .await
            .unwrap();
        assert_eq!(shares, signatures_of(&[1, 2, 4, 5, 7, 8, 9]));
        assert_eq!(collector.metrics.signer_failures_total.get(), 2);
    }

    #[tokio::test]
    async fn keeps_the_first_threshold_in_operator_order() {
        let signer = MockSigner::default();
        // the first operators answer last
        signer.delay(0, Duration::from_millis(60));
        signer.delay(1, Duration::from_millis(40));
        let collector = collector(signer.clone(), 7);
        let first = collector
            .collect(&covenant(7), &SignHash([1; 32]), &operators(0, 9))
            .await
            .unwrap();
        assert_eq!(first, signatures_of(&[0, 1, 2, 3, 4, 5, 6]));
        // every operator is asked even when the quorum is reachable early
        assert_eq!(signer.call_count(), 9);

        let again = collector
            .collect(&covenant(7), &SignHash([1; 32]), &operators(0, 9))
            .await
            .unwrap();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn below_threshold_is_insufficient_quorum() {
        let collector = collector(MockSigner::failing(&[0, 1, 2]), 7);
        let err = collector
            .collect(&covenant(7), &SignHash([1; 32]), &operators(0, 9))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientQuorum { required: 7, received: 6 }
        ));
    }

    #[tokio::test]
    async fn malformed_shares_do_not_take_a_slot() {
        let collector = collector(MockSigner::malformed(&[0]), 7);
        let shares = collector
            .collect(&covenant(7), &SignHash([1; 32]), &operators(0, 9))
            .await
            .unwrap();
        assert_eq!(shares, signatures_of(&[1, 2, 3, 4, 5, 6, 7]));
        assert_eq!(collector.metrics.signer_failures_total.get(), 1);
    }

    #[tokio::test]
    async fn malformed_shares_can_break_the_quorum() {
        let collector = collector(MockSigner::malformed(&[0, 4, 8]), 7);
        let err = collector
            .collect(&covenant(7), &SignHash([1; 32]), &operators(0, 9))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientQuorum { required: 7, received: 6 }
        ));
    }

    #[tokio::test]
    async fn slow_signers_time_out() {
        let signer = MockSigner::default();
        signer.delay(2, Duration::from_secs(10));
        let collector = collector(signer, 3);
        let shares = collector
            .collect(&covenant(7), &SignHash([1; 32]), &operators(0, 4))
            .await
            .unwrap();
        assert_eq!(shares, signatures_of(&[0, 1, 3]));
    }

    #[tokio::test]
    async fn concurrency_of_one_is_sequential() {
        let signer = MockSigner::default();
        let collector = QuorumCollector::builder()
            .signer(signer.clone())
            .threshold(2)
            .max_concurrency(1)
            .metrics(Arc::new(Metrics::new().unwrap()))
            .build();
        let shares = collector
            .collect(&covenant(7), &SignHash([1; 32]), &operators(0, 3))
            .await
            .unwrap();
        assert_eq!(shares, signatures_of(&[0, 1]));
        assert_eq!(
            *signer.calls.lock().unwrap(),
            vec![endpoint(0), endpoint(1), endpoint(2)]
        );
    }
}
