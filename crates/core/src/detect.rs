use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use crate::account::{AccountClass, AccountId, ChartOfAccounts};
use crate::amortization::{calculate_single_payment, AmortizationSchedule};
use crate::money::Money;
use crate::preferences::Preferences;
use crate::transaction::{SourceTransaction, TransactionId, TransactionLine};

const BASE_CONFIDENCE: f32 = 0.5;
const KEYWORD_BONUS: f32 = 0.1;
const SCHEDULED_CONFIDENCE: f32 = 0.7;

fn loan_keywords() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"(?i)\b(loan|mortgage|notes? payable|financing|installment|instalment)\b")
            .expect("invalid regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    /// Amount and date line up with a scheduled installment.
    ScheduledPeriod,
    /// Interest computed from the schedule's outstanding balance; the rest is principal.
    ComputedFromBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSuggestion {
    pub principal: Money,
    pub interest: Money,
    pub period_number: Option<u32>,
    pub source: SuggestionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPaymentDetection {
    pub transaction_id: TransactionId,
    pub is_loan_payment: bool,
    pub liability_account: Option<AccountId>,
    /// Cash or bank account the payment was drawn from.
    pub payment_account: Option<AccountId>,
    pub payment_amount: Money,
    pub payment_date: NaiveDate,
    pub confidence: f32,
    pub suggestion: Option<SplitSuggestion>,
}

impl LoanPaymentDetection {
    fn not_a_payment(tx: &SourceTransaction) -> Self {
        LoanPaymentDetection {
            transaction_id: tx.id,
            is_loan_payment: false,
            liability_account: None,
            payment_account: None,
            payment_amount: Money::zero(),
            payment_date: tx.date,
            confidence: 0.0,
            suggestion: None,
        }
    }
}

pub struct LoanPaymentDetector<'a> {
    chart: &'a ChartOfAccounts,
    schedules: HashMap<AccountId, &'a AmortizationSchedule>,
    pub date_window_days: i64,
    pub amount_tolerance: Money,
}

impl<'a> LoanPaymentDetector<'a> {
    pub fn new(chart: &'a ChartOfAccounts) -> Self {
        Self {
            chart,
            schedules: HashMap::new(),
            date_window_days: 7,
            amount_tolerance: Money::from_cents(1),
        }
    }

    pub fn with_schedule(mut self, account: AccountId, schedule: &'a AmortizationSchedule) -> Self {
        self.schedules.insert(account, schedule);
        self
    }

    pub fn with_tolerances(mut self, date_window_days: i64, amount_tolerance: Money) -> Self {
        self.date_window_days = date_window_days;
        self.amount_tolerance = amount_tolerance;
        self
    }

    pub fn detect_loan_payment(
        &self,
        transaction: &SourceTransaction,
        line_items: &[TransactionLine],
    ) -> LoanPaymentDetection {
        let classify = |line: &TransactionLine| self.chart.classify(line.account_id);

        if line_items
            .iter()
            .any(|l| classify(l) == Some(AccountClass::InterestExpense))
        {
            tracing::debug!(transaction = %transaction.id, "already posts interest expense");
            return LoanPaymentDetection::not_a_payment(transaction);
        }

        let Some((liability_account, payment_amount)) = self.largest_loan_debit(line_items) else {
            return LoanPaymentDetection::not_a_payment(transaction);
        };

        let payment_account = line_items
            .iter()
            .find(|l| l.is_credit() && classify(l) == Some(AccountClass::Cash))
            .map(|l| l.account_id);

        let keyword_bonus = if loan_keywords().is_match(&transaction.description) {
            KEYWORD_BONUS
        } else {
            0.0
        };

        let (confidence, suggestion) = match self.schedules.get(&liability_account) {
            Some(schedule) => self
                .suggest_from_schedule(schedule, transaction.date, payment_amount)
                .map(|(c, s)| (c + keyword_bonus, Some(s)))
                .unwrap_or((BASE_CONFIDENCE + keyword_bonus, None)),
            None => (BASE_CONFIDENCE + keyword_bonus, None),
        };

        tracing::debug!(
            transaction = %transaction.id,
            account = %liability_account,
            amount = %payment_amount,
            confidence,
            suggested = suggestion.is_some(),
            "loan payment detected"
        );

        LoanPaymentDetection {
            transaction_id: transaction.id,
            is_loan_payment: true,
            liability_account: Some(liability_account),
            payment_account,
            payment_amount,
            payment_date: transaction.date,
            confidence: confidence.clamp(0.0, 1.0),
            suggestion,
        }
    }

    /// Debit total per loan account; the largest wins, lowest id on ties.
    fn largest_loan_debit(&self, line_items: &[TransactionLine]) -> Option<(AccountId, Money)> {
        let mut totals: BTreeMap<AccountId, Money> = BTreeMap::new();
        for line in line_items.iter().filter(|l| l.is_debit()) {
            if self.chart.classify(line.account_id).is_some_and(AccountClass::is_loan) {
                *totals.entry(line.account_id).or_default() += line.debit;
            }
        }
        totals
            .into_iter()
            .fold(None, |best: Option<(AccountId, Money)>, (id, amount)| match best {
                Some((_, best_amount)) if best_amount >= amount => best,
                _ => Some((id, amount)),
            })
    }

    fn suggest_from_schedule(
        &self,
        schedule: &AmortizationSchedule,
        date: NaiveDate,
        amount: Money,
    ) -> Option<(f32, SplitSuggestion)> {
        if let Some(period) = schedule.period_near(date, self.date_window_days) {
            if (period.payment - amount).abs() <= self.amount_tolerance {
                let date_diff = (period.due_date - date).num_days().abs();
                let date_score = 1.0 - (date_diff as f32 / (self.date_window_days + 1) as f32);
                // Interest follows the schedule; principal absorbs any tolerance gap.
                let suggestion = SplitSuggestion {
                    principal: amount - period.interest,
                    interest: period.interest,
                    period_number: Some(period.number),
                    source: SuggestionSource::ScheduledPeriod,
                };
                return Some((SCHEDULED_CONFIDENCE + 0.3 * date_score, suggestion));
            }
        }

        let nearest = schedule.period_near(date, i64::MAX)?;
        let opening = schedule.balance_before(nearest.number)?;
        let split = calculate_single_payment(
            nearest.number,
            opening,
            amount,
            schedule.terms.annual_rate,
            schedule.terms.compounding_frequency,
        )
        .ok()?;

        if !amount.is_positive() || split.interest > amount || opening.is_zero() {
            return None;
        }

        Some((
            BASE_CONFIDENCE,
            SplitSuggestion {
                principal: amount - split.interest,
                interest: split.interest,
                period_number: Some(nearest.number),
                source: SuggestionSource::ComputedFromBalance,
            },
        ))
    }
}

/// Whether the user should be asked how to split this payment.
pub fn should_show_prompt(
    result: &LoanPaymentDetection,
    preferences: &Preferences,
    transaction_id: TransactionId,
) -> bool {
    if !result.is_loan_payment || !preferences.prompts_enabled {
        return false;
    }
    if result.payment_amount < preferences.minimum_amount {
        return false;
    }
    if preferences.is_dismissed(transaction_id) {
        return false;
    }
    if preferences.auto_split && result.confidence < preferences.confidence_threshold {
        return false;
    }
    true
}

/// Whether the suggestion is trustworthy enough to post without asking.
pub fn should_auto_split(result: &LoanPaymentDetection, preferences: &Preferences) -> bool {
    preferences.auto_split
        && result.is_loan_payment
        && result.suggestion.is_some()
        && result.confidence >= preferences.confidence_threshold
        && !preferences.is_dismissed(result.transaction_id)
}
