//! Escrow ledger: one balance per job, paid out in full exactly once.

use serde::{Deserialize, Serialize};

use super::job::AccountId;

/// Funds locked against a single job.
///
/// The balance is either the full locked amount or zero; there is no partial
/// withdrawal and no re-deposit. "Has this job's money moved" is therefore a
/// single boolean fact: `balance() == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    balance: u64,
}

/// The irreversible transfer produced by draining an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: AccountId,
    pub amount: u64,
}

impl Escrow {
    /// Lock `amount` into a fresh escrow. Called exactly once, at job
    /// creation. The caller has already validated `amount > 0`.
    pub(super) fn lock(amount: u64) -> Self {
        Self { balance: amount }
    }

    /// Drain the full balance to `recipient`, returning the transfer record.
    ///
    /// Draining an already-empty escrow is a no-op that reports a zero
    /// amount. The lifecycle guards make that path unreachable, but it stays
    /// safe if it ever is.
    pub(super) fn pay_all(&mut self, recipient: &AccountId) -> Payout {
        let amount = self.balance;
        self.balance = 0;
        Payout {
            recipient: recipient.clone(),
            amount,
        }
    }

    /// Remaining balance. Equals the job budget until the single payout.
    pub fn balance(&self) -> u64 {
        self.balance
    }
}
