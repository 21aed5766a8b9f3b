use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::account::{AccountClass, AccountId, AccountType, ChartOfAccounts};
use crate::deferred::DeferredSplitItem;
use crate::detect::{should_show_prompt, LoanPaymentDetection};
use crate::error::{LoanSplitError, SplitViolation, StateTransitionError};
use crate::money::Money;
use crate::preferences::{PreferenceChange, Preferences};
use crate::transaction::TransactionId;

/// Largest allowed distance between the split's payment date and the
/// original transaction date.
pub const MAX_PAYMENT_DATE_DRIFT_DAYS: i64 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestSplitDecision {
    SplitNow,
    DeferToChecklist,
    Dismiss,
    DisablePrompts,
}

impl fmt::Display for InterestSplitDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterestSplitDecision::SplitNow => write!(f, "split_now"),
            InterestSplitDecision::DeferToChecklist => write!(f, "defer_to_checklist"),
            InterestSplitDecision::Dismiss => write!(f, "dismiss"),
            InterestSplitDecision::DisablePrompts => write!(f, "disable_prompts"),
        }
    }
}

impl FromStr for InterestSplitDecision {
    type Err = LoanSplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "split_now" | "split" => Ok(InterestSplitDecision::SplitNow),
            "defer_to_checklist" | "defer" => Ok(InterestSplitDecision::DeferToChecklist),
            "dismiss" => Ok(InterestSplitDecision::Dismiss),
            "disable_prompts" | "disable" => Ok(InterestSplitDecision::DisablePrompts),
            _ => Err(LoanSplitError::InvalidDecision(s.to_string())),
        }
    }
}

/// Where the split prompt for a transaction stands. Owned by the caller and
/// threaded through [`SplitDecisionResolver::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptState {
    Idle,
    Open {
        transaction: TransactionId,
    },
    Resolved {
        transaction: TransactionId,
        decision: InterestSplitDecision,
    },
}

impl PromptState {
    /// Opens a prompt when the preferences allow one for this detection.
    pub fn for_detection(detection: &LoanPaymentDetection, preferences: &Preferences) -> Self {
        if should_show_prompt(detection, preferences, detection.transaction_id) {
            PromptState::Open {
                transaction: detection.transaction_id,
            }
        } else {
            PromptState::Idle
        }
    }

    /// Opens a prompt the user asked for explicitly. Prompting preferences
    /// only gate unsolicited prompts, so any detected loan payment qualifies.
    pub fn requested(detection: &LoanPaymentDetection) -> Self {
        if detection.is_loan_payment {
            PromptState::Open {
                transaction: detection.transaction_id,
            }
        } else {
            PromptState::Idle
        }
    }
}

/// Snapshot of the original transaction the split refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRef {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestSplitRequest {
    pub transaction: TransactionRef,
    pub liability_account: Option<AccountId>,
    pub payment_account: Option<AccountId>,
    pub interest_expense_account: Option<AccountId>,
    pub principal_amount: Money,
    pub interest_amount: Money,
    pub payment_date: NaiveDate,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitAmounts {
    pub principal: Money,
    pub interest: Money,
}

/// Checks a split against the amount it must add up to. Returns every
/// violation found; an empty list means the request may be posted.
pub fn validate_split(request: &InterestSplitRequest, original_amount: Money) -> Vec<SplitViolation> {
    let mut violations = Vec::new();

    if request.principal_amount.is_negative() {
        violations.push(SplitViolation::NegativePrincipal(request.principal_amount));
    }
    if request.interest_amount.is_negative() {
        violations.push(SplitViolation::NegativeInterest(request.interest_amount));
    }

    match request.principal_amount.checked_add(request.interest_amount) {
        Some(actual) if actual != original_amount => {
            violations.push(SplitViolation::SumMismatch {
                expected: original_amount,
                actual,
            });
        }
        Some(_) => {}
        None => violations.push(SplitViolation::AmountOverflow),
    }

    if request.liability_account.is_none() {
        violations.push(SplitViolation::MissingLiabilityAccount);
    }
    if request.interest_expense_account.is_none() {
        violations.push(SplitViolation::MissingInterestExpenseAccount);
    }
    if request.payment_account.is_none() {
        violations.push(SplitViolation::MissingPaymentAccount);
    }

    let drift = (request.payment_date - request.transaction.date).num_days();
    if drift.abs() > MAX_PAYMENT_DATE_DRIFT_DAYS {
        violations.push(SplitViolation::PaymentDateOutOfRange {
            days_from_transaction: drift,
        });
    }

    violations
}

/// Checks the referenced accounts have the right classification. Missing
/// references are left to [`validate_split`].
pub fn validate_accounts(request: &InterestSplitRequest, chart: &ChartOfAccounts) -> Vec<SplitViolation> {
    let mut violations = Vec::new();

    let mut check = |id: Option<AccountId>, accepts: fn(AccountClass) -> bool, wrong: SplitViolation| {
        let Some(id) = id else { return };
        match chart.active(id) {
            Ok(account) if accepts(account.class) => {}
            Ok(_) => violations.push(wrong),
            Err(e) => violations.push(SplitViolation::UnusableAccount(e)),
        }
    };

    check(
        request.liability_account,
        |c| c.account_type() == AccountType::Liability,
        SplitViolation::LiabilityAccountNotLiability,
    );
    check(
        request.interest_expense_account,
        |c| c.account_type() == AccountType::Expense,
        SplitViolation::InterestAccountNotExpense,
    );
    check(
        request.payment_account,
        |c| c == AccountClass::Cash,
        SplitViolation::PaymentAccountNotCash,
    );

    violations
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    Split(InterestSplitRequest),
    Defer(DeferredSplitItem),
    UpdatePreferences(PreferenceChange),
}

pub struct SplitDecisionResolver<'a> {
    chart: &'a ChartOfAccounts,
    preferences: &'a Preferences,
}

impl<'a> SplitDecisionResolver<'a> {
    pub fn new(chart: &'a ChartOfAccounts, preferences: &'a Preferences) -> Self {
        Self { chart, preferences }
    }

    /// Interest expense account from the preferences' default account code.
    pub fn default_interest_account(&self) -> Option<AccountId> {
        let code = self.preferences.default_interest_expense_account.as_deref()?;
        self.chart.by_code(code).and_then(|a| a.id)
    }

    /// Builds a validated split request from user amounts, falling back to
    /// the detector's suggestion.
    pub fn build_request(
        &self,
        detection: &LoanPaymentDetection,
        amounts: Option<SplitAmounts>,
        interest_account: Option<AccountId>,
    ) -> Result<InterestSplitRequest, LoanSplitError> {
        let amounts = amounts.or_else(|| {
            detection.suggestion.map(|s| SplitAmounts {
                principal: s.principal,
                interest: s.interest,
            })
        });
        let Some(amounts) = amounts else {
            return Err(LoanSplitError::InputValidation(vec![SplitViolation::MissingAmounts]));
        };

        let request = InterestSplitRequest {
            transaction: TransactionRef {
                id: detection.transaction_id,
                date: detection.payment_date,
                amount: detection.payment_amount,
            },
            liability_account: detection.liability_account,
            payment_account: detection.payment_account,
            interest_expense_account: interest_account.or_else(|| self.default_interest_account()),
            principal_amount: amounts.principal,
            interest_amount: amounts.interest,
            payment_date: detection.payment_date,
            memo: None,
        };

        let mut violations = validate_split(&request, detection.payment_amount);
        violations.extend(validate_accounts(&request, self.chart));
        if !violations.is_empty() {
            return Err(LoanSplitError::InputValidation(violations));
        }
        Ok(request)
    }

    pub fn resolve(
        &self,
        state: PromptState,
        decision: InterestSplitDecision,
        detection: &LoanPaymentDetection,
        amounts: Option<SplitAmounts>,
        interest_account: Option<AccountId>,
    ) -> Result<(PromptState, DecisionOutcome), LoanSplitError> {
        let transaction = detection.transaction_id;
        match state {
            PromptState::Open { transaction: open } if open == transaction => {}
            _ => return Err(StateTransitionError::PromptNotOpen(transaction).into()),
        }

        let outcome = match decision {
            InterestSplitDecision::SplitNow => {
                DecisionOutcome::Split(self.build_request(detection, amounts, interest_account)?)
            }
            InterestSplitDecision::DeferToChecklist => {
                let account = detection.liability_account.ok_or_else(|| {
                    LoanSplitError::InputValidation(vec![SplitViolation::MissingLiabilityAccount])
                })?;
                let name = self.chart.name_of(account).unwrap_or_default();
                DecisionOutcome::Defer(DeferredSplitItem::from_detection(detection, account, name))
            }
            InterestSplitDecision::Dismiss => {
                DecisionOutcome::UpdatePreferences(PreferenceChange::Dismiss(transaction))
            }
            InterestSplitDecision::DisablePrompts => {
                DecisionOutcome::UpdatePreferences(PreferenceChange::DisablePrompts)
            }
        };

        tracing::debug!(%transaction, %decision, "split decision resolved");
        Ok((PromptState::Resolved { transaction, decision }, outcome))
    }
}
