pub mod account;
pub mod amortization;
pub mod decision;
pub mod deferred;
pub mod detect;
pub mod error;
pub mod journal;
pub mod loan;
pub mod money;
pub mod preferences;
pub mod transaction;

pub use account::{
    Account, AccountClass, AccountId, AccountType, ChartOfAccounts, LedgerError, DEFAULT_ACCOUNTS,
};
pub use amortization::{
    calculate_amortization_schedule, calculate_single_payment, validate_input,
    AmortizationSchedule, CompoundingFrequency, LoanTerms, LoanTermsViolation, PaymentPeriod,
    PaymentSplit,
};
pub use decision::{
    validate_accounts, validate_split, DecisionOutcome, InterestSplitDecision,
    InterestSplitRequest, PromptState, SplitAmounts, SplitDecisionResolver, TransactionRef,
};
pub use deferred::{
    apply_completion, apply_deferral, DeferredSplitItem, DeferredSplitTracker, DeferredStatus,
};
pub use detect::{
    should_auto_split, should_show_prompt, LoanPaymentDetection, LoanPaymentDetector,
    SplitSuggestion, SuggestionSource,
};
pub use error::{LoanSplitError, SplitViolation, StateTransitionError};
pub use journal::{create_interest_split_entry, JournalEntry, SplitRegistry};
pub use loan::{Loan, LoanId};
pub use money::Money;
pub use preferences::{CompanyId, PreferenceChange, Preferences, UserId};
pub use transaction::{
    SourceTransaction, TransactionId, TransactionLine, UnvalidatedTransaction,
    ValidatedTransaction,
};
