use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use loansplit_core::{CompoundingFrequency, InterestSplitDecision, LoanTerms, Money, SplitAmounts};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "loansplit", version, about = "Split loan payments into principal and interest")]
pub struct Cli {
    /// Config file (defaults to loansplit.toml in the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print an amortization schedule without touching the ledger
    Schedule(TermsArgs),
    /// List the chart of accounts
    Accounts,
    #[command(subcommand)]
    Loan(LoanCommand),
    /// Record a payment from a cash account to a loan account
    Payment(PaymentArgs),
    /// Run loan payment detection on a recorded transaction
    Detect { transaction: i64 },
    /// Answer the split prompt for a transaction
    Decide {
        transaction: i64,
        /// split, defer, dismiss or disable-prompts
        decision: InterestSplitDecision,
        #[command(flatten)]
        amounts: AmountArgs,
    },
    /// List deferred splits waiting on the checklist
    Pending,
    /// Post the split for a deferred checklist item
    Complete {
        transaction: i64,
        #[command(flatten)]
        amounts: AmountArgs,
    },
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Subcommand, Debug)]
pub enum LoanCommand {
    /// Attach loan terms to a liability account, replacing any existing terms
    Add {
        /// Liability account code
        #[arg(long)]
        account: String,
        #[command(flatten)]
        terms: TermsArgs,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum PrefsCommand {
    Show,
    Set(PrefsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TermsArgs {
    #[arg(long)]
    pub principal: Money,
    /// Annual rate in percent, e.g. 6.5
    #[arg(long)]
    pub rate: Decimal,
    #[arg(long)]
    pub months: u32,
    /// First day of the loan (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,
    #[arg(long, default_value = "monthly")]
    pub frequency: CompoundingFrequency,
}

impl TermsArgs {
    pub fn to_terms(&self) -> LoanTerms {
        LoanTerms {
            principal: self.principal,
            annual_rate: self.rate,
            term_months: self.months,
            start_date: self.start,
            compounding_frequency: self.frequency,
        }
    }
}

#[derive(Args, Debug)]
pub struct PaymentArgs {
    /// Loan account code the payment is debited to
    #[arg(long)]
    pub account: String,
    /// Cash account code the payment is drawn from
    #[arg(long, default_value = "1000")]
    pub from: String,
    #[arg(long)]
    pub amount: Money,
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long, default_value = "Loan payment")]
    pub description: String,
}

#[derive(Args, Debug, Default)]
pub struct AmountArgs {
    /// Principal portion; overrides the suggested split
    #[arg(long, requires = "interest")]
    pub principal: Option<Money>,
    /// Interest portion; overrides the suggested split
    #[arg(long, requires = "principal")]
    pub interest: Option<Money>,
    /// Interest expense account code
    #[arg(long)]
    pub interest_account: Option<String>,
}

impl AmountArgs {
    pub fn amounts(&self) -> Result<Option<SplitAmounts>> {
        match (self.principal, self.interest) {
            (Some(principal), Some(interest)) => Ok(Some(SplitAmounts { principal, interest })),
            (None, None) => Ok(None),
            _ => bail!("--principal and --interest must be given together"),
        }
    }
}

#[derive(Args, Debug)]
pub struct PrefsArgs {
    #[arg(long)]
    pub prompts_enabled: Option<bool>,
    #[arg(long)]
    pub auto_split: Option<bool>,
    #[arg(long)]
    pub minimum_amount: Option<Money>,
    #[arg(long)]
    pub confidence_threshold: Option<f32>,
    /// Default interest expense account code
    #[arg(long)]
    pub interest_account: Option<String>,
}
