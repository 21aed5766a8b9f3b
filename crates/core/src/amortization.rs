use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LoanSplitError;
use crate::money::Money;

/// Annual rates above this percentage are rejected as input errors.
pub const MAX_ANNUAL_RATE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Longest accepted term, 100 years.
pub const MAX_TERM_MONTHS: u32 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundingFrequency {
    Daily,
    Weekly,
    BiWeekly,
    SemiMonthly,
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
}

impl CompoundingFrequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            CompoundingFrequency::Daily => 365,
            CompoundingFrequency::Weekly => 52,
            CompoundingFrequency::BiWeekly => 26,
            CompoundingFrequency::SemiMonthly => 24,
            CompoundingFrequency::Monthly => 12,
            CompoundingFrequency::Quarterly => 4,
            CompoundingFrequency::SemiAnnually => 2,
            CompoundingFrequency::Annually => 1,
        }
    }

    /// Daily accrual has no fixed installment cadence and cannot drive a schedule.
    pub fn is_schedulable(self) -> bool {
        !matches!(self, CompoundingFrequency::Daily)
    }

    /// Due date of installment `number` (1-based), counted from the loan start.
    /// Month arithmetic is always taken from `start` so end-of-month dates clamp
    /// per period instead of drifting.
    fn due_date(self, start: NaiveDate, number: u32) -> Option<NaiveDate> {
        match self {
            CompoundingFrequency::Daily => start.checked_add_days(Days::new(u64::from(number))),
            CompoundingFrequency::Weekly => start.checked_add_days(Days::new(7 * u64::from(number))),
            CompoundingFrequency::BiWeekly => {
                start.checked_add_days(Days::new(14 * u64::from(number)))
            }
            CompoundingFrequency::SemiMonthly => {
                let whole_months = start.checked_add_months(Months::new(number / 2))?;
                if number % 2 == 0 {
                    Some(whole_months)
                } else {
                    whole_months.checked_add_days(Days::new(15))
                }
            }
            CompoundingFrequency::Monthly => start.checked_add_months(Months::new(number)),
            CompoundingFrequency::Quarterly => start.checked_add_months(Months::new(3 * number)),
            CompoundingFrequency::SemiAnnually => {
                start.checked_add_months(Months::new(6 * number))
            }
            CompoundingFrequency::Annually => start.checked_add_months(Months::new(12 * number)),
        }
    }
}

impl fmt::Display for CompoundingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompoundingFrequency::Daily => write!(f, "Daily"),
            CompoundingFrequency::Weekly => write!(f, "Weekly"),
            CompoundingFrequency::BiWeekly => write!(f, "Bi-weekly"),
            CompoundingFrequency::SemiMonthly => write!(f, "Semi-monthly"),
            CompoundingFrequency::Monthly => write!(f, "Monthly"),
            CompoundingFrequency::Quarterly => write!(f, "Quarterly"),
            CompoundingFrequency::SemiAnnually => write!(f, "Semi-annually"),
            CompoundingFrequency::Annually => write!(f, "Annually"),
        }
    }
}

impl FromStr for CompoundingFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match normalized.as_str() {
            "daily" => Ok(CompoundingFrequency::Daily),
            "weekly" => Ok(CompoundingFrequency::Weekly),
            "biweekly" => Ok(CompoundingFrequency::BiWeekly),
            "semimonthly" => Ok(CompoundingFrequency::SemiMonthly),
            "monthly" => Ok(CompoundingFrequency::Monthly),
            "quarterly" => Ok(CompoundingFrequency::Quarterly),
            "semiannually" | "semiannual" => Ok(CompoundingFrequency::SemiAnnually),
            "annually" | "annual" | "yearly" => Ok(CompoundingFrequency::Annually),
            _ => Err(format!("Unknown compounding frequency: '{s}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    /// Nominal annual rate as a percentage (6.5 means 6.5%).
    pub annual_rate: Decimal,
    pub term_months: u32,
    pub start_date: NaiveDate,
    pub compounding_frequency: CompoundingFrequency,
}

impl LoanTerms {
    pub fn periodic_rate(&self) -> Decimal {
        periodic_rate(self.annual_rate, self.compounding_frequency)
    }

    /// `None` when the term does not divide into whole installments.
    pub fn total_periods(&self) -> Option<u32> {
        let scaled = self
            .term_months
            .checked_mul(self.compounding_frequency.periods_per_year())?;
        (scaled % 12 == 0).then_some(scaled / 12)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanTermsViolation {
    NonPositivePrincipal(Money),
    NonPositiveTerm,
    TermTooLong(u32),
    NegativeRate(Decimal),
    RateTooHigh(Decimal),
    UnsupportedFrequency(CompoundingFrequency),
    TermNotWholePeriods {
        term_months: u32,
        frequency: CompoundingFrequency,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPeriod {
    pub number: u32,
    pub due_date: NaiveDate,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub remaining_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub terms: LoanTerms,
    pub periodic_rate: Decimal,
    /// Fixed installment; the final period may differ by the rounding drift it absorbs.
    pub payment: Money,
    pub periods: Vec<PaymentPeriod>,
}

impl AmortizationSchedule {
    pub fn total_interest(&self) -> Money {
        self.periods.iter().map(|p| p.interest).sum()
    }

    pub fn total_principal(&self) -> Money {
        self.periods.iter().map(|p| p.principal).sum()
    }

    pub fn total_paid(&self) -> Money {
        self.periods.iter().map(|p| p.payment).sum()
    }

    pub fn final_balance(&self) -> Money {
        self.periods
            .last()
            .map(|p| p.remaining_balance)
            .unwrap_or(self.terms.principal)
    }

    pub fn period(&self, number: u32) -> Option<&PaymentPeriod> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.periods.get(index)
    }

    /// Outstanding balance at the start of period `number`.
    pub fn balance_before(&self, number: u32) -> Option<Money> {
        match number {
            0 => None,
            1 => self.periods.first().map(|_| self.terms.principal),
            n => self.period(n - 1).map(|p| p.remaining_balance),
        }
    }

    /// Period whose due date is closest to `date`, if any lies within `window_days`.
    pub fn period_near(&self, date: NaiveDate, window_days: i64) -> Option<&PaymentPeriod> {
        self.periods
            .iter()
            .map(|p| (p, (p.due_date - date).num_days().abs()))
            .filter(|(_, diff)| *diff <= window_days)
            .min_by_key(|(p, diff)| (*diff, p.number))
            .map(|(p, _)| p)
    }
}

/// Interest/principal breakdown of one installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub payment_number: u32,
    pub interest: Money,
    pub principal: Money,
    pub remaining_balance: Money,
    /// Portion of an overpayment left after the balance is retired.
    pub excess: Money,
}

pub fn periodic_rate(annual_rate: Decimal, frequency: CompoundingFrequency) -> Decimal {
    annual_rate / Decimal::ONE_HUNDRED / Decimal::from(frequency.periods_per_year())
}

pub fn validate_input(terms: &LoanTerms) -> Vec<LoanTermsViolation> {
    let mut violations = Vec::new();

    if !terms.principal.is_positive() {
        violations.push(LoanTermsViolation::NonPositivePrincipal(terms.principal));
    }
    if terms.term_months == 0 {
        violations.push(LoanTermsViolation::NonPositiveTerm);
    } else if terms.term_months > MAX_TERM_MONTHS {
        violations.push(LoanTermsViolation::TermTooLong(terms.term_months));
    }
    if terms.annual_rate.is_sign_negative() && !terms.annual_rate.is_zero() {
        violations.push(LoanTermsViolation::NegativeRate(terms.annual_rate));
    } else if terms.annual_rate > MAX_ANNUAL_RATE {
        violations.push(LoanTermsViolation::RateTooHigh(terms.annual_rate));
    }

    let frequency = terms.compounding_frequency;
    if !frequency.is_schedulable() {
        violations.push(LoanTermsViolation::UnsupportedFrequency(frequency));
    } else if (1..=MAX_TERM_MONTHS).contains(&terms.term_months) && terms.total_periods().is_none() {
        violations.push(LoanTermsViolation::TermNotWholePeriods {
            term_months: terms.term_months,
            frequency,
        });
    }

    violations
}

pub fn calculate_amortization_schedule(
    terms: &LoanTerms,
) -> Result<AmortizationSchedule, LoanSplitError> {
    let violations = validate_input(terms);
    if !violations.is_empty() {
        return Err(LoanSplitError::InvalidLoanTerms(violations));
    }

    let total_periods = terms.total_periods().ok_or(LoanSplitError::ArithmeticOverflow)?;
    let rate = terms.periodic_rate();
    let payment = level_payment(terms.principal, rate, total_periods)?;

    let mut periods = Vec::with_capacity(total_periods as usize);
    let mut balance = terms.principal;

    for number in 1..=total_periods {
        let due_date = terms
            .compounding_frequency
            .due_date(terms.start_date, number)
            .ok_or(LoanSplitError::ArithmeticOverflow)?;

        let split = if number == total_periods {
            // Final installment retires whatever balance the rounding left.
            let interest = balance.apply_rate(rate).ok_or(LoanSplitError::ArithmeticOverflow)?;
            split_payment(number, balance, interest + balance, rate)?
        } else {
            split_payment(number, balance, payment, rate)?
        };

        balance = split.remaining_balance;
        periods.push(PaymentPeriod {
            number,
            due_date,
            payment: split.interest + split.principal,
            interest: split.interest,
            principal: split.principal,
            remaining_balance: split.remaining_balance,
        });
    }

    Ok(AmortizationSchedule {
        terms: terms.clone(),
        periodic_rate: rate,
        payment,
        periods,
    })
}

/// Splits one installment against an outstanding balance.
///
/// Feeding a schedule period's own payment and opening balance back in
/// reproduces that period's interest and principal exactly.
pub fn calculate_single_payment(
    payment_number: u32,
    remaining_balance: Money,
    scheduled_payment: Money,
    annual_rate: Decimal,
    frequency: CompoundingFrequency,
) -> Result<PaymentSplit, LoanSplitError> {
    if !frequency.is_schedulable() {
        return Err(LoanSplitError::InvalidLoanTerms(vec![
            LoanTermsViolation::UnsupportedFrequency(frequency),
        ]));
    }
    split_payment(
        payment_number,
        remaining_balance,
        scheduled_payment,
        periodic_rate(annual_rate, frequency),
    )
}

fn split_payment(
    payment_number: u32,
    balance: Money,
    payment: Money,
    rate: Decimal,
) -> Result<PaymentSplit, LoanSplitError> {
    let accrued = balance.apply_rate(rate).ok_or(LoanSplitError::ArithmeticOverflow)?;
    let interest = accrued.min(payment);
    let principal = (payment - interest).min(balance);
    let excess = payment - interest - principal;

    Ok(PaymentSplit {
        payment_number,
        interest,
        principal,
        remaining_balance: balance - principal,
        excess,
    })
}

/// Level installment from the annuity formula, `P·r·f / (f − 1)` with
/// `f = (1 + r)^n`. A zero rate spreads the principal evenly instead.
fn level_payment(principal: Money, rate: Decimal, periods: u32) -> Result<Money, LoanSplitError> {
    if rate.is_zero() {
        return principal
            .split_evenly(periods)
            .ok_or(LoanSplitError::ArithmeticOverflow);
    }

    let factor = compound_factor(rate, periods).ok_or(LoanSplitError::ArithmeticOverflow)?;
    let numerator = principal
        .as_decimal()
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(factor))
        .ok_or(LoanSplitError::ArithmeticOverflow)?;
    let payment = numerator
        .checked_div(factor - Decimal::ONE)
        .ok_or(LoanSplitError::ArithmeticOverflow)?;

    Ok(Money::from_decimal(payment))
}

/// `(1 + rate)^periods` by repeated squaring.
fn compound_factor(rate: Decimal, periods: u32) -> Option<Decimal> {
    let mut base = Decimal::ONE.checked_add(rate)?;
    let mut exponent = periods;
    let mut result = Decimal::ONE;

    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result.checked_mul(base)?;
        }
        exponent >>= 1;
        if exponent > 0 {
            base = base.checked_mul(base)?;
        }
    }

    Some(result)
}
