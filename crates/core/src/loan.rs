use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::AccountId;
use crate::amortization::{calculate_amortization_schedule, AmortizationSchedule, LoanTerms};
use crate::error::LoanSplitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanId(pub i64);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A loan attached to a liability account. The schedule is always derived
/// from the current terms; changing terms regenerates it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    pub id: Option<LoanId>,
    pub liability_account: AccountId,
    terms: LoanTerms,
    schedule: AmortizationSchedule,
}

impl Loan {
    pub fn new(liability_account: AccountId, terms: LoanTerms) -> Result<Self, LoanSplitError> {
        let schedule = calculate_amortization_schedule(&terms)?;
        Ok(Loan {
            id: None,
            liability_account,
            terms,
            schedule,
        })
    }

    pub fn with_id(mut self, id: LoanId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    pub fn schedule(&self) -> &AmortizationSchedule {
        &self.schedule
    }

    /// Leaves the loan untouched if the new terms are invalid.
    pub fn update_terms(&mut self, terms: LoanTerms) -> Result<(), LoanSplitError> {
        let schedule = calculate_amortization_schedule(&terms)?;
        self.terms = terms;
        self.schedule = schedule;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::CompoundingFrequency;
    use crate::money::Money;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn terms(rate: rust_decimal::Decimal) -> LoanTerms {
        LoanTerms {
            principal: Money::from_cents(1_000_000),
            annual_rate: rate,
            term_months: 12,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            compounding_frequency: CompoundingFrequency::Monthly,
        }
    }

    #[test]
    fn new_loan_carries_schedule() {
        let loan = Loan::new(AccountId(7), terms(dec!(6))).unwrap();
        assert_eq!(loan.schedule().payment, Money::from_cents(86066));
        assert_eq!(loan.schedule().terms, *loan.terms());
    }

    #[test]
    fn updating_terms_recomputes_schedule() {
        let mut loan = Loan::new(AccountId(7), terms(dec!(6))).unwrap();
        loan.update_terms(terms(Default::default())).unwrap();
        assert_eq!(loan.schedule().payment, Money::from_cents(83333));
        assert_eq!(loan.schedule().total_interest(), Money::zero());
    }

    #[test]
    fn invalid_update_keeps_previous_terms() {
        let mut loan = Loan::new(AccountId(7), terms(dec!(6))).unwrap();
        let mut bad = terms(dec!(6));
        bad.term_months = 0;
        assert!(loan.update_terms(bad).is_err());
        assert_eq!(loan.terms().term_months, 12);
    }
}
