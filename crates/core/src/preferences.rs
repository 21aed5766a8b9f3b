use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::money::Money;
use crate::transaction::TransactionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompanyId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-user prompting preferences for loan payment splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub prompts_enabled: bool,
    pub auto_split: bool,
    pub minimum_amount: Money,
    /// 0.0 to 1.0, compared against detection confidence.
    pub confidence_threshold: f32,
    pub dismissed: BTreeSet<TransactionId>,
    /// Account code used when the user does not pick an interest expense account.
    pub default_interest_expense_account: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            prompts_enabled: true,
            auto_split: false,
            minimum_amount: Money::zero(),
            confidence_threshold: 0.7,
            dismissed: BTreeSet::new(),
            default_interest_expense_account: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceChange {
    Dismiss(TransactionId),
    DisablePrompts,
}

impl Preferences {
    pub fn from_toml(toml_content: &str) -> Result<Self, String> {
        toml::from_str(toml_content).map_err(|e| format!("Failed to parse preferences: {e}"))
    }

    pub fn is_dismissed(&self, transaction: TransactionId) -> bool {
        self.dismissed.contains(&transaction)
    }

    pub fn apply(&mut self, change: &PreferenceChange) {
        match change {
            PreferenceChange::Dismiss(id) => {
                self.dismissed.insert(*id);
            }
            PreferenceChange::DisablePrompts => self.prompts_enabled = false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_prompt_for_everything() {
        let prefs = Preferences::default();
        assert!(prefs.prompts_enabled);
        assert!(!prefs.auto_split);
        assert_eq!(prefs.minimum_amount, Money::zero());
        assert!(prefs.dismissed.is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let prefs = Preferences::from_toml(
            r#"
            auto_split = true
            minimum_amount = "25.00"
            dismissed = [3, 9]
            default_interest_expense_account = "6000"
            "#,
        )
        .unwrap();
        assert!(prefs.prompts_enabled);
        assert!(prefs.auto_split);
        assert_eq!(prefs.minimum_amount, Money::from_cents(2500));
        assert!(prefs.is_dismissed(TransactionId(9)));
        assert_eq!(prefs.confidence_threshold, 0.7);
        assert_eq!(prefs.default_interest_expense_account.as_deref(), Some("6000"));
    }

    #[test]
    fn malformed_toml_is_reported() {
        assert!(Preferences::from_toml("auto_split = \"maybe\"").is_err());
    }

    #[test]
    fn apply_changes() {
        let mut prefs = Preferences::default();
        prefs.apply(&PreferenceChange::Dismiss(TransactionId(12)));
        prefs.apply(&PreferenceChange::Dismiss(TransactionId(12)));
        assert_eq!(prefs.dismissed.len(), 1);

        prefs.apply(&PreferenceChange::DisablePrompts);
        assert!(!prefs.prompts_enabled);
    }

    #[test]
    fn json_round_trip_preserves_dismissed_set() {
        let mut prefs = Preferences::default();
        prefs.apply(&PreferenceChange::Dismiss(TransactionId(5)));
        let json = serde_json::to_string(&prefs).unwrap();
        let back: Preferences = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prefs);
    }
}
