pub mod db;
pub mod error;

pub use db::{
    account_balance, add_deferred_split, complete_deferred_split, create_db, get_account_by_code,
    get_all_accounts, get_deferred_split, get_interest_split_entry_id, get_loan_for_account,
    get_loans, get_pending_interest_splits, get_source_transaction, insert_account,
    insert_interest_split_entry, insert_transaction, load_chart_of_accounts, load_preferences,
    mark_split_completed, require_account_by_code, save_loan, save_preferences,
    seed_default_accounts, DbPool,
};
pub use error::StorageError;
