use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::decision::{validate_split, InterestSplitRequest};
use crate::error::{LoanSplitError, SplitViolation};
use crate::money::Money;
use crate::transaction::{TransactionId, TransactionLine, UnvalidatedTransaction, ValidatedTransaction};

/// Balanced entry that reclassifies a loan payment into principal and interest.
///
/// `reversal` backs out the original loan debit and cash credit so that,
/// once both are posted, the split replaces the payment instead of
/// doubling it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub source_transaction: TransactionId,
    pub principal: Money,
    pub interest: Money,
    pub reversal: ValidatedTransaction,
    pub entry: ValidatedTransaction,
}

impl JournalEntry {
    pub fn total(&self) -> Money {
        self.entry.balanced_total
    }
}

pub fn create_interest_split_entry(request: &InterestSplitRequest) -> Result<JournalEntry, LoanSplitError> {
    let violations = validate_split(request, request.transaction.amount);
    if !violations.is_empty() {
        return Err(LoanSplitError::InputValidation(violations));
    }

    let (Some(liability), Some(interest_account), Some(payment_account)) = (
        request.liability_account,
        request.interest_expense_account,
        request.payment_account,
    ) else {
        return Err(LoanSplitError::InputValidation(vec![
            SplitViolation::MissingLiabilityAccount,
        ]));
    };

    let principal = request.principal_amount;
    let interest = request.interest_amount;
    let source = request.transaction.id;

    let reversal = ValidatedTransaction::validate(UnvalidatedTransaction {
        date: request.payment_date,
        description: format!("Reverse loan payment {source} for principal/interest split"),
        lines: vec![
            TransactionLine::debit(payment_account, request.transaction.amount, None),
            TransactionLine::credit(liability, request.transaction.amount, None),
        ],
        memo: None,
    })?;

    let mut lines = Vec::with_capacity(3);
    if !principal.is_zero() {
        lines.push(TransactionLine::debit(liability, principal, Some("Principal".to_string())));
    }
    if !interest.is_zero() {
        lines.push(TransactionLine::debit(interest_account, interest, Some("Interest".to_string())));
    }
    lines.push(TransactionLine::credit(payment_account, principal + interest, None));

    let entry = ValidatedTransaction::validate(UnvalidatedTransaction {
        date: request.payment_date,
        description: format!("Loan payment split: principal {principal}, interest {interest}"),
        lines,
        memo: request.memo.clone(),
    })?;

    Ok(JournalEntry {
        source_transaction: source,
        principal,
        interest,
        reversal,
        entry,
    })
}

/// Keeps at most one split entry per source transaction.
#[derive(Debug, Clone, Default)]
pub struct SplitRegistry {
    entries: HashMap<TransactionId, JournalEntry>,
}

impl SplitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: JournalEntry) -> Result<&JournalEntry, LoanSplitError> {
        use std::collections::hash_map::Entry;

        match self.entries.entry(entry.source_transaction) {
            Entry::Occupied(_) => Err(LoanSplitError::DuplicateSplit(entry.source_transaction)),
            Entry::Vacant(slot) => Ok(slot.insert(entry)),
        }
    }

    pub fn get(&self, transaction: TransactionId) -> Option<&JournalEntry> {
        self.entries.get(&transaction)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::decision::TransactionRef;
    use chrono::NaiveDate;

    const CHECKING: AccountId = AccountId(1);
    const LOAN: AccountId = AccountId(2);
    const INTEREST: AccountId = AccountId(3);

    fn cents(n: i64) -> Money {
        Money::from_cents(n)
    }

    fn request(principal: i64, interest: i64) -> InterestSplitRequest {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        InterestSplitRequest {
            transaction: TransactionRef {
                id: TransactionId(42),
                date,
                amount: cents(principal + interest),
            },
            liability_account: Some(LOAN),
            payment_account: Some(CHECKING),
            interest_expense_account: Some(INTEREST),
            principal_amount: cents(principal),
            interest_amount: cents(interest),
            payment_date: date,
            memo: None,
        }
    }

    #[test]
    fn builds_balanced_three_line_entry() {
        let entry = create_interest_split_entry(&request(81066, 5000)).unwrap();
        assert_eq!(entry.source_transaction, TransactionId(42));
        assert_eq!(entry.total(), cents(86066));

        let lines = &entry.entry.lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], TransactionLine::debit(LOAN, cents(81066), Some("Principal".into())));
        assert_eq!(lines[1], TransactionLine::debit(INTEREST, cents(5000), Some("Interest".into())));
        assert_eq!(lines[2], TransactionLine::credit(CHECKING, cents(86066), None));

        let debits: Money = lines.iter().map(|l| l.debit).sum();
        let credits: Money = lines.iter().map(|l| l.credit).sum();
        assert_eq!(debits, credits);
        assert_eq!(
            entry.entry.description,
            "Loan payment split: principal $810.66, interest $50.00"
        );
    }

    fn net(lines: &[TransactionLine], account: AccountId) -> Money {
        lines
            .iter()
            .filter(|l| l.account_id == account)
            .map(|l| l.debit - l.credit)
            .sum()
    }

    #[test]
    fn reversal_and_split_replace_the_original_payment() {
        let entry = create_interest_split_entry(&request(81066, 5000)).unwrap();
        let original = [
            TransactionLine::debit(LOAN, cents(86066), None),
            TransactionLine::credit(CHECKING, cents(86066), None),
        ];
        let posted: Vec<TransactionLine> = original
            .iter()
            .chain(&entry.reversal.lines)
            .chain(&entry.entry.lines)
            .cloned()
            .collect();

        assert_eq!(net(&posted, CHECKING), cents(-86066));
        assert_eq!(net(&posted, LOAN), cents(81066));
        assert_eq!(net(&posted, INTEREST), cents(5000));
        assert_eq!(entry.reversal.balanced_total, cents(86066));
    }

    #[test]
    fn zero_interest_omits_interest_line() {
        let entry = create_interest_split_entry(&request(20833, 0)).unwrap();
        assert_eq!(entry.entry.lines.len(), 2);
        assert!(entry.entry.lines.iter().all(|l| l.account_id != INTEREST));
    }

    #[test]
    fn mismatched_amounts_create_nothing() {
        let mut req = request(81066, 5000);
        req.transaction.amount = cents(86000);
        let err = create_interest_split_entry(&req).unwrap_err();
        assert_eq!(
            err,
            LoanSplitError::InputValidation(vec![SplitViolation::SumMismatch {
                expected: cents(86000),
                actual: cents(86066),
            }])
        );
    }

    #[test]
    fn missing_accounts_are_all_reported() {
        let mut req = request(81066, 5000);
        req.liability_account = None;
        req.interest_expense_account = None;
        let Err(LoanSplitError::InputValidation(violations)) = create_interest_split_entry(&req) else {
            panic!("expected validation failure");
        };
        assert_eq!(
            violations,
            vec![
                SplitViolation::MissingLiabilityAccount,
                SplitViolation::MissingInterestExpenseAccount
            ]
        );
    }

    #[test]
    fn registry_rejects_second_entry_for_same_transaction() {
        let mut registry = SplitRegistry::new();
        registry.record(create_interest_split_entry(&request(81066, 5000)).unwrap()).unwrap();
        let err = registry
            .record(create_interest_split_entry(&request(80066, 6000)).unwrap())
            .unwrap_err();
        assert_eq!(err, LoanSplitError::DuplicateSplit(TransactionId(42)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(TransactionId(42)).unwrap().interest, cents(5000));
    }
}
