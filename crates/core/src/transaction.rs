use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::{AccountId, LedgerError};
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub account_id: AccountId,
    pub debit: Money,
    pub credit: Money,
    pub memo: Option<String>,
}

impl TransactionLine {
    pub fn debit(account_id: AccountId, amount: Money, memo: Option<String>) -> Self {
        TransactionLine {
            account_id,
            debit: amount,
            credit: Money::zero(),
            memo,
        }
    }

    pub fn credit(account_id: AccountId, amount: Money, memo: Option<String>) -> Self {
        TransactionLine {
            account_id,
            debit: Money::zero(),
            credit: amount,
            memo,
        }
    }

    pub fn is_debit(&self) -> bool {
        self.debit.is_positive()
    }

    pub fn is_credit(&self) -> bool {
        self.credit.is_positive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnvalidatedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub lines: Vec<TransactionLine>,
    pub memo: Option<String>,
}

impl UnvalidatedTransaction {
    pub fn total_debits(&self) -> Money {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credits(&self) -> Money {
        self.lines.iter().map(|l| l.credit).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedTransaction {
    pub id: Option<TransactionId>,
    pub date: NaiveDate,
    pub description: String,
    pub lines: Vec<TransactionLine>,
    pub memo: Option<String>,
    pub balanced_total: Money,
}

impl ValidatedTransaction {
    pub fn validate(tx: UnvalidatedTransaction) -> Result<ValidatedTransaction, LedgerError> {
        if tx.lines.len() < 2 {
            return Err(LedgerError::EmptyTransaction);
        }

        let total_debits = tx.total_debits();
        let total_credits = tx.total_credits();

        if total_debits != total_credits {
            return Err(LedgerError::Unbalanced(total_debits, total_credits));
        }

        Ok(ValidatedTransaction {
            id: None,
            date: tx.date,
            description: tx.description,
            lines: tx.lines,
            memo: tx.memo,
            balanced_total: total_debits,
        })
    }
}

/// Header of a recorded ledger transaction; its lines are loaded and passed
/// alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTransaction {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub description: String,
}

impl SourceTransaction {
    pub fn from_validated(id: TransactionId, tx: ValidatedTransaction) -> (Self, Vec<TransactionLine>) {
        let header = SourceTransaction {
            id,
            date: tx.date,
            description: tx.description,
        };
        (header, tx.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn id(n: i64) -> AccountId {
        AccountId(n)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn simple_tx(debit_id: AccountId, credit_id: AccountId, cents: i64) -> UnvalidatedTransaction {
        UnvalidatedTransaction {
            date: date(2024, 1, 15),
            description: "Loan payment".to_string(),
            lines: vec![
                TransactionLine::debit(debit_id, Money::from_cents(cents), None),
                TransactionLine::credit(credit_id, Money::from_cents(cents), None),
            ],
            memo: None,
        }
    }

    #[test]
    fn validate_balanced_transaction() {
        let tx = simple_tx(id(1), id(2), 86066);
        let validated = ValidatedTransaction::validate(tx).unwrap();
        assert_eq!(validated.balanced_total.to_cents(), 86066);
    }

    #[test]
    fn validate_rejects_unbalanced() {
        let tx = UnvalidatedTransaction {
            date: date(2024, 1, 15),
            description: "Bad".to_string(),
            lines: vec![
                TransactionLine::debit(id(1), Money::from_cents(500), None),
                TransactionLine::credit(id(2), Money::from_cents(400), None),
            ],
            memo: None,
        };
        assert!(matches!(
            ValidatedTransaction::validate(tx),
            Err(LedgerError::Unbalanced(_, _))
        ));
    }

    #[test]
    fn validate_rejects_single_line() {
        let tx = UnvalidatedTransaction {
            date: date(2024, 1, 15),
            description: "Single".to_string(),
            lines: vec![TransactionLine::debit(id(1), Money::from_cents(500), None)],
            memo: None,
        };
        assert_eq!(
            ValidatedTransaction::validate(tx),
            Err(LedgerError::EmptyTransaction)
        );
    }

    #[test]
    fn validate_multi_line_balanced() {
        // Principal and interest debits against one bank credit
        let tx = UnvalidatedTransaction {
            date: date(2024, 1, 15),
            description: "Split".to_string(),
            lines: vec![
                TransactionLine::debit(id(1), Money::from_cents(81066), None),
                TransactionLine::debit(id(2), Money::from_cents(5000), None),
                TransactionLine::credit(id(3), Money::from_cents(86066), None),
            ],
            memo: None,
        };
        let validated = ValidatedTransaction::validate(tx).unwrap();
        assert_eq!(validated.balanced_total.to_cents(), 86066);
    }

    #[test]
    fn source_transaction_keeps_header_and_lines() {
        let validated = ValidatedTransaction::validate(simple_tx(id(1), id(2), 1234)).unwrap();
        let (source, lines) = SourceTransaction::from_validated(TransactionId(7), validated);
        assert_eq!(source.id, TransactionId(7));
        assert_eq!(source.description, "Loan payment");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn line_direction_helpers() {
        let d = TransactionLine::debit(id(5), Money::from_cents(100), Some("note".to_string()));
        assert!(d.is_debit());
        assert!(!d.is_credit());
        assert_eq!(d.memo.as_deref(), Some("note"));

        let c = TransactionLine::credit(id(5), Money::from_cents(100), None);
        assert!(c.is_credit());
        assert!(!c.is_debit());
    }
}
