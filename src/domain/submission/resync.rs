//! Startup recovery of executor nonces left pending by a previous run.
use super::SubmissionPipeline;
use crate::metrics::STUCK_TRANSACTIONS;
use crate::models::SubmitterError;
use crate::repositories::BoopReceiptRepository;
use crate::services::{LedgerProvider, Signer};

impl<P, S, R> SubmissionPipeline<P, S, R>
where
    P: LedgerProvider + 'static,
    S: Signer + 'static,
    R: BoopReceiptRepository + 'static,
{
    /// Cancels every pending nonce of every executor, so that fresh submissions start from an
    /// empty mempool.
    ///
    /// Failures are alerted and do not stop the other executors. The first error is returned.
    pub async fn resync_executors(&self) -> Result<(), SubmitterError> {
        let mut first_error = None;

        for executor in self.signer.executors() {
            let result = async {
                let included = self.provider.get_transaction_count(executor, false).await?;
                let pending = self.provider.get_transaction_count(executor, true).await?;
                if pending <= included {
                    return Ok(());
                }

                log::warn!(
                    "Executor {} has {} pending transactions, cancelling nonces {}..{}",
                    executor,
                    pending - included,
                    included,
                    pending
                );
                let fees = self.quote(None).await?.quote;
                for nonce in included..pending {
                    STUCK_TRANSACTIONS.with_label_values(&["resync"]).inc();
                    self.cancel_nonce(executor, nonce, fees).await?;
                }
                Ok::<(), SubmitterError>(())
            }
            .await;

            // reseed from the ledger on next use either way
            self.executor_nonces.reset(executor);

            if let Err(e) = result {
                log::error!("Failed to resync executor {}: {}", executor, e);
                self.alerts
                    .notify(format!("Failed to resync executor {}: {}", executor, e))
                    .await;
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
