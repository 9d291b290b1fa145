//! Ledger consistency audit
//!
//! Every balance must equal the starting balance plus the sum of the user's
//! ledger amounts.

use super::store::LedgerStore;
use crate::common::types::{Tokens, UserId, STARTING_BALANCE};
use crate::errors::CasinoResult;
use serde::Serialize;
use tracing::{info, warn};

/// A user whose stored balance disagrees with their ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub user_id: UserId,
    pub stored_balance: Tokens,
    pub ledger_balance: Tokens,
}

impl Discrepancy {
    pub fn difference(&self) -> Tokens {
        self.stored_balance - self.ledger_balance
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub users_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

pub async fn audit(store: &LedgerStore) -> CasinoResult<AuditReport> {
    let rows = store.balance_report().await?;

    let discrepancies: Vec<Discrepancy> = rows
        .iter()
        .filter_map(|row| {
            let ledger_balance = STARTING_BALANCE + row.ledger_total;
            (ledger_balance != row.tokens).then(|| Discrepancy {
                user_id: row.user_id,
                stored_balance: row.tokens,
                ledger_balance,
            })
        })
        .collect();

    for d in &discrepancies {
        warn!(
            user_id = d.user_id,
            stored = d.stored_balance,
            ledger = d.ledger_balance,
            "Ledger discrepancy"
        );
    }

    let report = AuditReport {
        users_checked: rows.len(),
        discrepancies,
    };
    info!(
        users_checked = report.users_checked,
        discrepancies = report.discrepancies.len(),
        "Ledger audit finished"
    );
    Ok(report)
}
