use std::fmt;
use thiserror::Error;

use crate::account::LedgerError;
use crate::amortization::{CompoundingFrequency, LoanTermsViolation, MAX_TERM_MONTHS};
use crate::money::Money;
use crate::transaction::TransactionId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoanSplitError {
    #[error("Invalid loan terms: {}", join(.0))]
    InvalidLoanTerms(Vec<LoanTermsViolation>),
    #[error("Invalid split: {}", join(.0))]
    InputValidation(Vec<SplitViolation>),
    #[error("Transaction {0} already has an interest split entry")]
    DuplicateSplit(TransactionId),
    #[error(transparent)]
    StateTransition(#[from] StateTransitionError),
    #[error("Unknown split decision: '{0}'")]
    InvalidDecision(String),
    #[error("Arithmetic overflow while computing amortization")]
    ArithmeticOverflow,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateTransitionError {
    #[error("Transaction {0} has no deferred split")]
    NotDeferred(TransactionId),
    #[error("Deferred split for transaction {0} is already completed")]
    AlreadyCompleted(TransactionId),
    #[error("No split prompt is open for transaction {0}")]
    PromptNotOpen(TransactionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitViolation {
    NegativePrincipal(Money),
    NegativeInterest(Money),
    SumMismatch { expected: Money, actual: Money },
    MissingLiabilityAccount,
    MissingInterestExpenseAccount,
    MissingPaymentAccount,
    MissingAmounts,
    AmountOverflow,
    PaymentDateOutOfRange { days_from_transaction: i64 },
    LiabilityAccountNotLiability,
    InterestAccountNotExpense,
    PaymentAccountNotCash,
    UnusableAccount(LedgerError),
}

impl fmt::Display for SplitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitViolation::NegativePrincipal(m) => write!(f, "principal {m} is negative"),
            SplitViolation::NegativeInterest(m) => write!(f, "interest {m} is negative"),
            SplitViolation::SumMismatch { expected, actual } => {
                write!(f, "principal + interest = {actual}, expected {expected}")
            }
            SplitViolation::MissingLiabilityAccount => write!(f, "liability account is missing"),
            SplitViolation::MissingInterestExpenseAccount => {
                write!(f, "interest expense account is missing")
            }
            SplitViolation::MissingPaymentAccount => write!(f, "payment account is missing"),
            SplitViolation::MissingAmounts => {
                write!(f, "no principal/interest amounts were entered or suggested")
            }
            SplitViolation::AmountOverflow => write!(f, "principal + interest is out of range"),
            SplitViolation::PaymentDateOutOfRange { days_from_transaction } => write!(
                f,
                "payment date is {days_from_transaction} days from the transaction date"
            ),
            SplitViolation::LiabilityAccountNotLiability => {
                write!(f, "liability account is not a liability")
            }
            SplitViolation::InterestAccountNotExpense => {
                write!(f, "interest account is not an expense")
            }
            SplitViolation::PaymentAccountNotCash => {
                write!(f, "payment account is not a cash account")
            }
            SplitViolation::UnusableAccount(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for LoanTermsViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanTermsViolation::NonPositivePrincipal(m) => write!(f, "principal {m} must be positive"),
            LoanTermsViolation::NonPositiveTerm => write!(f, "term must be at least one month"),
            LoanTermsViolation::TermTooLong(months) => {
                write!(f, "term of {months} months exceeds {MAX_TERM_MONTHS} months")
            }
            LoanTermsViolation::NegativeRate(r) => write!(f, "annual rate {r}% is negative"),
            LoanTermsViolation::RateTooHigh(r) => write!(f, "annual rate {r}% is not plausible"),
            LoanTermsViolation::UnsupportedFrequency(freq) => {
                write!(f, "{freq} compounding is not supported for schedules")
            }
            LoanTermsViolation::TermNotWholePeriods { term_months, frequency } => write!(
                f,
                "{term_months} months does not divide into whole {} periods",
                frequency_label(*frequency)
            ),
        }
    }
}

fn frequency_label(frequency: CompoundingFrequency) -> String {
    frequency.to_string().to_lowercase()
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_validation_lists_every_violation() {
        let err = LoanSplitError::InputValidation(vec![
            SplitViolation::MissingLiabilityAccount,
            SplitViolation::NegativeInterest(Money::from_cents(-100)),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid split: liability account is missing; interest -$1.00 is negative"
        );
    }

    #[test]
    fn state_transition_is_transparent() {
        let err: LoanSplitError = StateTransitionError::AlreadyCompleted(TransactionId(4)).into();
        assert_eq!(
            err.to_string(),
            "Deferred split for transaction 4 is already completed"
        );
    }
}
