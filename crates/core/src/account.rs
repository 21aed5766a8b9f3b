use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Asset => write!(f, "Asset"),
            AccountType::Liability => write!(f, "Liability"),
            AccountType::Equity => write!(f, "Equity"),
            AccountType::Income => write!(f, "Income"),
            AccountType::Expense => write!(f, "Expense"),
        }
    }
}

/// Finer-grained classification of an account, resolved once when the chart
/// is loaded. Detection and validation match on this rather than inspecting
/// account names or codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountClass {
    Cash,
    Receivable,
    OtherAsset,
    Loan,
    CreditCard,
    OtherLiability,
    Equity,
    Income,
    InterestExpense,
    OtherExpense,
}

impl AccountClass {
    pub fn account_type(self) -> AccountType {
        match self {
            AccountClass::Cash | AccountClass::Receivable | AccountClass::OtherAsset => {
                AccountType::Asset
            }
            AccountClass::Loan | AccountClass::CreditCard | AccountClass::OtherLiability => {
                AccountType::Liability
            }
            AccountClass::Equity => AccountType::Equity,
            AccountClass::Income => AccountType::Income,
            AccountClass::InterestExpense | AccountClass::OtherExpense => AccountType::Expense,
        }
    }

    pub fn is_loan(self) -> bool {
        matches!(self, AccountClass::Loan)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountClass::Cash => "cash",
            AccountClass::Receivable => "receivable",
            AccountClass::OtherAsset => "other_asset",
            AccountClass::Loan => "loan",
            AccountClass::CreditCard => "credit_card",
            AccountClass::OtherLiability => "other_liability",
            AccountClass::Equity => "equity",
            AccountClass::Income => "income",
            AccountClass::InterestExpense => "interest_expense",
            AccountClass::OtherExpense => "other_expense",
        }
    }
}

impl fmt::Display for AccountClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(AccountClass::Cash),
            "receivable" => Ok(AccountClass::Receivable),
            "other_asset" => Ok(AccountClass::OtherAsset),
            "loan" => Ok(AccountClass::Loan),
            "credit_card" => Ok(AccountClass::CreditCard),
            "other_liability" => Ok(AccountClass::OtherLiability),
            "equity" => Ok(AccountClass::Equity),
            "income" => Ok(AccountClass::Income),
            "interest_expense" => Ok(AccountClass::InterestExpense),
            "other_expense" => Ok(AccountClass::OtherExpense),
            other => Err(format!("Unknown account class: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<AccountId>,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub class: AccountClass,
    pub is_archived: bool,
}

impl Account {
    pub fn new(code: &str, name: &str, class: AccountClass) -> Self {
        Account {
            id: None,
            code: code.to_string(),
            name: name.to_string(),
            account_type: class.account_type(),
            class,
            is_archived: false,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(AccountId(id));
        self
    }
}

/// Read-only view of the chart of accounts keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ChartOfAccounts {
    accounts: HashMap<AccountId, Account>,
}

impl ChartOfAccounts {
    /// Accounts without an id have not been persisted and are skipped.
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        let accounts = accounts
            .into_iter()
            .filter_map(|a| a.id.map(|id| (id, a)))
            .collect();
        Self { accounts }
    }

    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// The account, provided it exists and is not archived.
    pub fn active(&self, id: AccountId) -> Result<&Account, LedgerError> {
        match self.accounts.get(&id) {
            None => Err(LedgerError::AccountNotFound(id)),
            Some(a) if a.is_archived => Err(LedgerError::ArchivedAccount(id)),
            Some(a) => Ok(a),
        }
    }

    pub fn classify(&self, id: AccountId) -> Option<AccountClass> {
        self.accounts.get(&id).map(|a| a.class)
    }

    pub fn by_code(&self, code: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.code == code)
    }

    pub fn name_of(&self, id: AccountId) -> Option<&str> {
        self.accounts.get(&id).map(|a| a.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Unbalanced transaction: debits={0}, credits={1}")]
    Unbalanced(super::money::Money, super::money::Money),
    #[error("Transaction must have at least two lines")]
    EmptyTransaction,
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),
    #[error("Account {0} is archived")]
    ArchivedAccount(AccountId),
}

pub const DEFAULT_ACCOUNTS: &[(&str, &str, AccountClass)] = &[
    ("1000", "Checking", AccountClass::Cash),
    ("1010", "Savings", AccountClass::Cash),
    ("1020", "Accounts Receivable", AccountClass::Receivable),
    ("1500", "Vehicles", AccountClass::OtherAsset),
    ("2000", "Credit Card", AccountClass::CreditCard),
    ("2010", "Taxes Payable", AccountClass::OtherLiability),
    ("2100", "Notes Payable", AccountClass::Loan),
    ("2110", "Vehicle Loan", AccountClass::Loan),
    ("2120", "Equipment Financing", AccountClass::Loan),
    ("3000", "Owner's Equity", AccountClass::Equity),
    ("4000", "Services Revenue", AccountClass::Income),
    ("5010", "Bank Fees", AccountClass::OtherExpense),
    ("5900", "Miscellaneous", AccountClass::OtherExpense),
    ("6000", "Interest Expense", AccountClass::InterestExpense),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> ChartOfAccounts {
        ChartOfAccounts::new(
            DEFAULT_ACCOUNTS
                .iter()
                .enumerate()
                .map(|(i, (code, name, class))| Account::new(code, name, *class).with_id(i as i64 + 1)),
        )
    }

    #[test]
    fn class_maps_to_account_type() {
        assert_eq!(AccountClass::Loan.account_type(), AccountType::Liability);
        assert_eq!(AccountClass::Cash.account_type(), AccountType::Asset);
        assert_eq!(AccountClass::InterestExpense.account_type(), AccountType::Expense);
    }

    #[test]
    fn only_loans_are_loans() {
        assert!(AccountClass::Loan.is_loan());
        assert!(!AccountClass::CreditCard.is_loan());
        assert!(!AccountClass::OtherLiability.is_loan());
    }

    #[test]
    fn class_string_round_trip() {
        for (_, _, class) in DEFAULT_ACCOUNTS {
            assert_eq!(class.as_str().parse::<AccountClass>().unwrap(), *class);
        }
        assert!("mortgage".parse::<AccountClass>().is_err());
    }

    #[test]
    fn chart_classifies_by_id() {
        let chart = chart();
        let loan = chart.by_code("2100").unwrap();
        assert_eq!(chart.classify(loan.id.unwrap()), Some(AccountClass::Loan));
        assert_eq!(chart.classify(AccountId(999)), None);
    }

    #[test]
    fn chart_skips_unsaved_accounts() {
        let chart = ChartOfAccounts::new(vec![Account::new("1000", "Checking", AccountClass::Cash)]);
        assert!(chart.is_empty());
    }
}
