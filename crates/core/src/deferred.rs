use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::account::AccountId;
use crate::decision::{InterestSplitRequest, SplitAmounts, TransactionRef};
use crate::detect::LoanPaymentDetection;
use crate::error::{LoanSplitError, SplitViolation, StateTransitionError};
use crate::money::Money;
use crate::preferences::{CompanyId, UserId};
use crate::transaction::TransactionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferredStatus {
    Pending,
    Completed,
}

impl fmt::Display for DeferredStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferredStatus::Pending => write!(f, "pending"),
            DeferredStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for DeferredStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeferredStatus::Pending),
            "completed" => Ok(DeferredStatus::Completed),
            other => Err(format!("Unknown deferred status: '{other}'")),
        }
    }
}

/// A loan payment whose split was postponed to the checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredSplitItem {
    pub transaction_id: TransactionId,
    pub liability_account: AccountId,
    pub liability_account_name: String,
    pub payment_account: Option<AccountId>,
    pub payment_amount: Money,
    pub payment_date: NaiveDate,
    pub suggested_principal: Option<Money>,
    pub suggested_interest: Option<Money>,
    pub status: DeferredStatus,
}

impl DeferredSplitItem {
    pub fn from_detection(detection: &LoanPaymentDetection, account: AccountId, account_name: &str) -> Self {
        DeferredSplitItem {
            transaction_id: detection.transaction_id,
            liability_account: account,
            liability_account_name: account_name.to_string(),
            payment_account: detection.payment_account,
            payment_amount: detection.payment_amount,
            payment_date: detection.payment_date,
            suggested_principal: detection.suggestion.map(|s| s.principal),
            suggested_interest: detection.suggestion.map(|s| s.interest),
            status: DeferredStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DeferredStatus::Pending
    }

    pub fn suggested_amounts(&self) -> Option<SplitAmounts> {
        Some(SplitAmounts {
            principal: self.suggested_principal?,
            interest: self.suggested_interest?,
        })
    }

    /// pending -> completed. Completed items stay completed.
    pub fn mark_completed(&mut self) -> Result<(), LoanSplitError> {
        match self.status {
            DeferredStatus::Pending => {
                self.status = DeferredStatus::Completed;
                Ok(())
            }
            DeferredStatus::Completed => {
                Err(StateTransitionError::AlreadyCompleted(self.transaction_id).into())
            }
        }
    }

    /// Turns the item back into a split request for the journal entry builder.
    /// User amounts win over the stored suggestion.
    pub fn to_request(
        &self,
        amounts: Option<SplitAmounts>,
        interest_expense_account: Option<AccountId>,
    ) -> Result<InterestSplitRequest, LoanSplitError> {
        let amounts = amounts
            .or_else(|| self.suggested_amounts())
            .ok_or_else(|| LoanSplitError::InputValidation(vec![SplitViolation::MissingAmounts]))?;

        Ok(InterestSplitRequest {
            transaction: TransactionRef {
                id: self.transaction_id,
                date: self.payment_date,
                amount: self.payment_amount,
            },
            liability_account: Some(self.liability_account),
            payment_account: self.payment_account,
            interest_expense_account,
            principal_amount: amounts.principal,
            interest_amount: amounts.interest,
            payment_date: self.payment_date,
            memo: Some("Deferred loan payment split".to_string()),
        })
    }
}

/// none -> pending, or pending -> pending with a refreshed suggestion.
/// Deferring a completed item is rejected.
pub fn apply_deferral(
    existing: Option<DeferredSplitItem>,
    mut item: DeferredSplitItem,
) -> Result<DeferredSplitItem, LoanSplitError> {
    if let Some(existing) = existing {
        if existing.status == DeferredStatus::Completed {
            return Err(StateTransitionError::AlreadyCompleted(existing.transaction_id).into());
        }
    }
    item.status = DeferredStatus::Pending;
    Ok(item)
}

/// pending -> completed for an item that may not exist.
pub fn apply_completion(
    transaction: TransactionId,
    existing: Option<DeferredSplitItem>,
) -> Result<DeferredSplitItem, LoanSplitError> {
    let mut item = existing.ok_or(StateTransitionError::NotDeferred(transaction))?;
    item.mark_completed()?;
    Ok(item)
}

/// In-memory checklist of deferred splits, scoped per company and user.
#[derive(Debug, Clone, Default)]
pub struct DeferredSplitTracker {
    items: HashMap<(CompanyId, UserId), BTreeMap<TransactionId, DeferredSplitItem>>,
}

impl DeferredSplitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_deferred_split_to_checklist(
        &mut self,
        item: DeferredSplitItem,
        company: CompanyId,
        user: UserId,
    ) -> Result<(), LoanSplitError> {
        let scope = self.items.entry((company, user)).or_default();
        let transaction = item.transaction_id;
        let updated = apply_deferral(scope.get(&transaction).cloned(), item)?;
        scope.insert(transaction, updated);
        tracing::debug!(%transaction, %company, %user, "split deferred to checklist");
        Ok(())
    }

    pub fn mark_split_completed(
        &mut self,
        transaction: TransactionId,
        company: CompanyId,
        user: UserId,
    ) -> Result<(), LoanSplitError> {
        let scope = self.items.entry((company, user)).or_default();
        let updated = apply_completion(transaction, scope.get(&transaction).cloned())?;
        scope.insert(transaction, updated);
        Ok(())
    }

    /// Pending items ordered by payment date, then transaction id.
    pub fn get_pending_interest_splits(&self, company: CompanyId, user: UserId) -> Vec<DeferredSplitItem> {
        let mut pending: Vec<_> = self
            .items
            .get(&(company, user))
            .map(|scope| scope.values().filter(|i| i.is_pending()).cloned().collect())
            .unwrap_or_default();
        pending.sort_by_key(|i| (i.payment_date, i.transaction_id));
        pending
    }

    pub fn get(&self, transaction: TransactionId, company: CompanyId, user: UserId) -> Option<&DeferredSplitItem> {
        self.items.get(&(company, user))?.get(&transaction)
    }
}
