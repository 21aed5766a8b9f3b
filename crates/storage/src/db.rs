use chrono::NaiveDate;
use loansplit_core::{
    apply_completion, apply_deferral, Account, AccountClass, AccountId, ChartOfAccounts,
    CompanyId, CompoundingFrequency, DeferredSplitItem, DeferredStatus, JournalEntry, Loan,
    LoanId, LoanTerms, Money, Preferences, SourceTransaction, TransactionId, TransactionLine,
    UserId, ValidatedTransaction, DEFAULT_ACCOUNTS,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

use crate::error::StorageError;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;
    tracing::debug!(path = %path.display(), "database ready");

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            account_type TEXT NOT NULL,
            class TEXT NOT NULL,
            is_archived INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            memo TEXT,
            balanced_total_cents INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transaction_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id INTEGER NOT NULL,
            account_id INTEGER NOT NULL,
            debit_cents INTEGER NOT NULL DEFAULT 0,
            credit_cents INTEGER NOT NULL DEFAULT 0,
            memo TEXT,
            FOREIGN KEY (transaction_id) REFERENCES transactions(id) ON DELETE CASCADE,
            FOREIGN KEY (account_id) REFERENCES accounts(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            liability_account_id INTEGER NOT NULL UNIQUE,
            principal_cents INTEGER NOT NULL,
            annual_rate TEXT NOT NULL,
            term_months INTEGER NOT NULL,
            start_date TEXT NOT NULL,
            compounding_frequency TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (liability_account_id) REFERENCES accounts(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interest_split_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_transaction_id INTEGER NOT NULL UNIQUE,
            journal_transaction_id INTEGER NOT NULL,
            reversal_transaction_id INTEGER NOT NULL,
            principal_cents INTEGER NOT NULL,
            interest_cents INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (source_transaction_id) REFERENCES transactions(id),
            FOREIGN KEY (journal_transaction_id) REFERENCES transactions(id) ON DELETE CASCADE,
            FOREIGN KEY (reversal_transaction_id) REFERENCES transactions(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS deferred_splits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            source_transaction_id INTEGER NOT NULL,
            liability_account_id INTEGER NOT NULL,
            liability_account_name TEXT NOT NULL,
            payment_account_id INTEGER,
            payment_amount_cents INTEGER NOT NULL,
            payment_date TEXT NOT NULL,
            suggested_principal_cents INTEGER,
            suggested_interest_cents INTEGER,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            completed_at TEXT,
            UNIQUE (company_id, user_id, source_transaction_id),
            FOREIGN KEY (source_transaction_id) REFERENCES transactions(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

type AccountRow = (i64, String, String, String, i64);

fn account_from_row(r: AccountRow) -> Result<Account, sqlx::Error> {
    let class = AccountClass::from_str(&r.3).map_err(decode_error)?;
    let mut account = Account::new(&r.1, &r.2, class).with_id(r.0);
    account.is_archived = r.4 != 0;
    Ok(account)
}

pub async fn seed_default_accounts(pool: &DbPool) -> Result<(), sqlx::Error> {
    for (code, name, class) in DEFAULT_ACCOUNTS {
        insert_account_or_ignore(pool, &Account::new(code, name, *class)).await?;
    }

    Ok(())
}

async fn insert_account_or_ignore(pool: &DbPool, account: &Account) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO accounts (code, name, account_type, class, is_archived) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&account.code)
    .bind(&account.name)
    .bind(account.account_type.to_string())
    .bind(account.class.as_str())
    .bind(account.is_archived as i64)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_account(pool: &DbPool, account: &Account) -> Result<AccountId, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO accounts (code, name, account_type, class, is_archived) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&account.code)
    .bind(&account.name)
    .bind(account.account_type.to_string())
    .bind(account.class.as_str())
    .bind(account.is_archived as i64)
    .execute(pool)
    .await?;
    Ok(AccountId(result.last_insert_rowid()))
}

pub async fn get_all_accounts(pool: &DbPool) -> Result<Vec<Account>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccountRow>(
        "SELECT id, code, name, class, is_archived FROM accounts WHERE is_archived = 0 ORDER BY code",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(account_from_row).collect()
}

pub async fn get_account_by_code(pool: &DbPool, code: &str) -> Result<Option<Account>, sqlx::Error> {
    let row = sqlx::query_as::<_, AccountRow>(
        "SELECT id, code, name, class, is_archived FROM accounts WHERE code = ?",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    row.map(account_from_row).transpose()
}

/// Like [`get_account_by_code`], but a missing code is an error.
pub async fn require_account_by_code(pool: &DbPool, code: &str) -> Result<Account, StorageError> {
    get_account_by_code(pool, code)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("account {code}")))
}

/// Net debit balance (debits minus credits) of every line posted to the account.
pub async fn account_balance(pool: &DbPool, account: AccountId) -> Result<Money, sqlx::Error> {
    let (cents,) = sqlx::query_as::<_, (i64,)>(
        "SELECT COALESCE(SUM(debit_cents - credit_cents), 0) FROM transaction_lines WHERE account_id = ?",
    )
    .bind(account.0)
    .fetch_one(pool)
    .await?;
    Ok(Money::from_cents(cents))
}

/// The full chart, archived accounts included, so historical lines still classify.
pub async fn load_chart_of_accounts(pool: &DbPool) -> Result<ChartOfAccounts, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccountRow>(
        "SELECT id, code, name, class, is_archived FROM accounts ORDER BY code",
    )
    .fetch_all(pool)
    .await?;

    let accounts = rows
        .into_iter()
        .map(account_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ChartOfAccounts::new(accounts))
}

async fn write_transaction(
    conn: &mut SqliteConnection,
    tx: &ValidatedTransaction,
) -> Result<TransactionId, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO transactions (date, description, memo, balanced_total_cents) VALUES (?, ?, ?, ?)",
    )
    .bind(tx.date)
    .bind(&tx.description)
    .bind(&tx.memo)
    .bind(tx.balanced_total.to_cents())
    .execute(&mut *conn)
    .await?;
    let id = result.last_insert_rowid();

    for line in &tx.lines {
        sqlx::query(
            "INSERT INTO transaction_lines (transaction_id, account_id, debit_cents, credit_cents, memo) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(line.account_id.0)
        .bind(line.debit.to_cents())
        .bind(line.credit.to_cents())
        .bind(&line.memo)
        .execute(&mut *conn)
        .await?;
    }

    Ok(TransactionId(id))
}

pub async fn insert_transaction(pool: &DbPool, tx: &ValidatedTransaction) -> Result<TransactionId, sqlx::Error> {
    let mut db_tx = pool.begin().await?;
    let id = write_transaction(&mut db_tx, tx).await?;
    db_tx.commit().await?;
    Ok(id)
}

pub async fn get_source_transaction(
    pool: &DbPool,
    id: TransactionId,
) -> Result<Option<(SourceTransaction, Vec<TransactionLine>)>, sqlx::Error> {
    let header = sqlx::query_as::<_, (i64, NaiveDate, String)>(
        "SELECT id, date, description FROM transactions WHERE id = ?",
    )
    .bind(id.0)
    .fetch_optional(pool)
    .await?;

    let Some((id, date, description)) = header else {
        return Ok(None);
    };

    let lines = sqlx::query_as::<_, (i64, i64, i64, Option<String>)>(
        "SELECT account_id, debit_cents, credit_cents, memo FROM transaction_lines WHERE transaction_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|r| TransactionLine {
        account_id: AccountId(r.0),
        debit: Money::from_cents(r.1),
        credit: Money::from_cents(r.2),
        memo: r.3,
    })
    .collect();

    Ok(Some((
        SourceTransaction {
            id: TransactionId(id),
            date,
            description,
        },
        lines,
    )))
}

/// Inserts the loan, or replaces the terms of the loan already attached to
/// the same liability account.
pub async fn save_loan(pool: &DbPool, loan: &Loan) -> Result<LoanId, StorageError> {
    let terms = loan.terms();
    let (id,) = sqlx::query_as::<_, (i64,)>(
        r#"
        INSERT INTO loans (liability_account_id, principal_cents, annual_rate, term_months, start_date, compounding_frequency)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (liability_account_id) DO UPDATE SET
            principal_cents = excluded.principal_cents,
            annual_rate = excluded.annual_rate,
            term_months = excluded.term_months,
            start_date = excluded.start_date,
            compounding_frequency = excluded.compounding_frequency,
            updated_at = datetime('now')
        RETURNING id
        "#,
    )
    .bind(loan.liability_account.0)
    .bind(terms.principal.to_cents())
    .bind(terms.annual_rate.to_string())
    .bind(terms.term_months as i64)
    .bind(terms.start_date)
    .bind(terms.compounding_frequency.to_string())
    .fetch_one(pool)
    .await?;

    tracing::info!(loan = id, account = %loan.liability_account, "loan saved");
    Ok(LoanId(id))
}

type LoanRow = (i64, i64, i64, String, i64, NaiveDate, String);

const LOAN_COLUMNS: &str =
    "id, liability_account_id, principal_cents, annual_rate, term_months, start_date, compounding_frequency";

fn loan_from_row(r: LoanRow) -> Result<Loan, StorageError> {
    let annual_rate = Decimal::from_str(&r.3).map_err(|e| decode_error(e.to_string()))?;
    let term_months = u32::try_from(r.4).map_err(|e| decode_error(e.to_string()))?;
    let compounding_frequency = CompoundingFrequency::from_str(&r.6).map_err(decode_error)?;
    let terms = LoanTerms {
        principal: Money::from_cents(r.2),
        annual_rate,
        term_months,
        start_date: r.5,
        compounding_frequency,
    };
    Ok(Loan::new(AccountId(r.1), terms)?.with_id(LoanId(r.0)))
}

pub async fn get_loan_for_account(pool: &DbPool, account: AccountId) -> Result<Option<Loan>, StorageError> {
    let row = sqlx::query_as::<_, LoanRow>(&format!(
        "SELECT {LOAN_COLUMNS} FROM loans WHERE liability_account_id = ?"
    ))
    .bind(account.0)
    .fetch_optional(pool)
    .await?;

    row.map(loan_from_row).transpose()
}

pub async fn get_loans(pool: &DbPool) -> Result<Vec<Loan>, StorageError> {
    let rows = sqlx::query_as::<_, LoanRow>(&format!("SELECT {LOAN_COLUMNS} FROM loans ORDER BY id"))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(loan_from_row).collect()
}

/// Writes the reversal, the split entry and the source link. A second split
/// for the same source fails with [`StorageError::DuplicateSplit`].
async fn post_split(conn: &mut SqliteConnection, entry: &JournalEntry) -> Result<TransactionId, StorageError> {
    let reversal_id = write_transaction(conn, &entry.reversal).await?;
    let journal_id = write_transaction(conn, &entry.entry).await?;

    sqlx::query(
        "INSERT INTO interest_split_entries (source_transaction_id, journal_transaction_id, reversal_transaction_id, principal_cents, interest_cents) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(entry.source_transaction.0)
    .bind(journal_id.0)
    .bind(reversal_id.0)
    .bind(entry.principal.to_cents())
    .bind(entry.interest.to_cents())
    .execute(&mut *conn)
    .await
    .map_err(|e| StorageError::from_split_insert(e, entry.source_transaction))?;

    Ok(journal_id)
}

async fn store_completion(
    conn: &mut SqliteConnection,
    item: &DeferredSplitItem,
    company: CompanyId,
    user: UserId,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE deferred_splits SET status = ?, completed_at = datetime('now') WHERE company_id = ? AND user_id = ? AND source_transaction_id = ?",
    )
    .bind(item.status.to_string())
    .bind(company.0)
    .bind(user.0)
    .bind(item.transaction_id.0)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Posts the split in place of the original payment and, when the payment
/// sits on the user's checklist, completes that item. Everything lands in
/// one database transaction; on any error nothing is written.
pub async fn insert_interest_split_entry(
    pool: &DbPool,
    entry: &JournalEntry,
    company: CompanyId,
    user: UserId,
) -> Result<TransactionId, StorageError> {
    let source = entry.source_transaction;
    let mut db_tx = pool.begin().await?;
    let journal_id = post_split(&mut db_tx, entry).await?;

    let pending = fetch_deferred(&mut db_tx, source, company, user)
        .await?
        .filter(|item| item.status == DeferredStatus::Pending);
    let completed = pending.is_some();
    if let Some(item) = pending {
        let item = apply_completion(source, Some(item))?;
        store_completion(&mut db_tx, &item, company, user).await?;
    }

    db_tx.commit().await?;
    tracing::info!(
        %source,
        journal = %journal_id,
        principal = %entry.principal,
        interest = %entry.interest,
        completed,
        "interest split recorded"
    );
    Ok(journal_id)
}

/// Posts the split for a checklist item. The item must exist and still be
/// pending; the entry and the status change commit together or not at all.
pub async fn complete_deferred_split(
    pool: &DbPool,
    entry: &JournalEntry,
    company: CompanyId,
    user: UserId,
) -> Result<TransactionId, StorageError> {
    let source = entry.source_transaction;
    let mut db_tx = pool.begin().await?;
    let existing = fetch_deferred(&mut db_tx, source, company, user).await?;
    let item = apply_completion(source, existing)?;

    let journal_id = post_split(&mut db_tx, entry).await?;
    store_completion(&mut db_tx, &item, company, user).await?;

    db_tx.commit().await?;
    tracing::info!(%source, journal = %journal_id, %company, %user, "deferred split completed");
    Ok(journal_id)
}

pub async fn get_interest_split_entry_id(
    pool: &DbPool,
    source: TransactionId,
) -> Result<Option<TransactionId>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64,)>(
        "SELECT journal_transaction_id FROM interest_split_entries WHERE source_transaction_id = ?",
    )
    .bind(source.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id,)| TransactionId(id)))
}

type DeferredRow = (i64, i64, String, Option<i64>, i64, NaiveDate, Option<i64>, Option<i64>, String);

const DEFERRED_COLUMNS: &str = "source_transaction_id, liability_account_id, liability_account_name, payment_account_id, payment_amount_cents, payment_date, suggested_principal_cents, suggested_interest_cents, status";

fn deferred_from_row(r: DeferredRow) -> Result<DeferredSplitItem, sqlx::Error> {
    Ok(DeferredSplitItem {
        transaction_id: TransactionId(r.0),
        liability_account: AccountId(r.1),
        liability_account_name: r.2,
        payment_account: r.3.map(AccountId),
        payment_amount: Money::from_cents(r.4),
        payment_date: r.5,
        suggested_principal: r.6.map(Money::from_cents),
        suggested_interest: r.7.map(Money::from_cents),
        status: DeferredStatus::from_str(&r.8).map_err(decode_error)?,
    })
}

async fn fetch_deferred(
    conn: &mut SqliteConnection,
    transaction: TransactionId,
    company: CompanyId,
    user: UserId,
) -> Result<Option<DeferredSplitItem>, sqlx::Error> {
    let row = sqlx::query_as::<_, DeferredRow>(&format!(
        "SELECT {DEFERRED_COLUMNS} FROM deferred_splits WHERE company_id = ? AND user_id = ? AND source_transaction_id = ?"
    ))
    .bind(company.0)
    .bind(user.0)
    .bind(transaction.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(deferred_from_row).transpose()
}

/// Adds the item to the checklist, or refreshes it while still pending.
pub async fn add_deferred_split(
    pool: &DbPool,
    item: DeferredSplitItem,
    company: CompanyId,
    user: UserId,
) -> Result<(), StorageError> {
    let mut db_tx = pool.begin().await?;
    let existing = fetch_deferred(&mut db_tx, item.transaction_id, company, user).await?;
    let item = apply_deferral(existing, item)?;

    sqlx::query(
        r#"
        INSERT INTO deferred_splits (
            company_id, user_id, source_transaction_id, liability_account_id, liability_account_name,
            payment_account_id, payment_amount_cents, payment_date,
            suggested_principal_cents, suggested_interest_cents, status
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (company_id, user_id, source_transaction_id) DO UPDATE SET
            liability_account_id = excluded.liability_account_id,
            liability_account_name = excluded.liability_account_name,
            payment_account_id = excluded.payment_account_id,
            payment_amount_cents = excluded.payment_amount_cents,
            payment_date = excluded.payment_date,
            suggested_principal_cents = excluded.suggested_principal_cents,
            suggested_interest_cents = excluded.suggested_interest_cents,
            status = excluded.status
        "#,
    )
    .bind(company.0)
    .bind(user.0)
    .bind(item.transaction_id.0)
    .bind(item.liability_account.0)
    .bind(&item.liability_account_name)
    .bind(item.payment_account.map(|a| a.0))
    .bind(item.payment_amount.to_cents())
    .bind(item.payment_date)
    .bind(item.suggested_principal.map(Money::to_cents))
    .bind(item.suggested_interest.map(Money::to_cents))
    .bind(item.status.to_string())
    .execute(&mut *db_tx)
    .await?;

    db_tx.commit().await?;
    tracing::info!(transaction = %item.transaction_id, %company, %user, "split deferred");
    Ok(())
}

/// Status-only completion, for splits posted outside this ledger.
pub async fn mark_split_completed(
    pool: &DbPool,
    transaction: TransactionId,
    company: CompanyId,
    user: UserId,
) -> Result<(), StorageError> {
    let mut db_tx = pool.begin().await?;
    let existing = fetch_deferred(&mut db_tx, transaction, company, user).await?;
    let item = apply_completion(transaction, existing)?;
    store_completion(&mut db_tx, &item, company, user).await?;

    db_tx.commit().await?;
    tracing::info!(%transaction, %company, %user, "deferred split completed");
    Ok(())
}

/// Pending checklist items ordered by payment date, then transaction id.
pub async fn get_pending_interest_splits(
    pool: &DbPool,
    company: CompanyId,
    user: UserId,
) -> Result<Vec<DeferredSplitItem>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DeferredRow>(&format!(
        "SELECT {DEFERRED_COLUMNS} FROM deferred_splits WHERE company_id = ? AND user_id = ? AND status = 'pending' ORDER BY payment_date, source_transaction_id"
    ))
    .bind(company.0)
    .bind(user.0)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(deferred_from_row).collect()
}

pub async fn get_deferred_split(
    pool: &DbPool,
    transaction: TransactionId,
    company: CompanyId,
    user: UserId,
) -> Result<Option<DeferredSplitItem>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    fetch_deferred(&mut conn, transaction, company, user).await
}

fn preferences_key(company: CompanyId, user: UserId) -> String {
    format!("prefs:{company}:{user}")
}

/// Stored preferences for the user, or `fallback` when none were saved yet.
pub async fn load_preferences(
    pool: &DbPool,
    company: CompanyId,
    user: UserId,
    fallback: Preferences,
) -> Result<Preferences, StorageError> {
    let row = sqlx::query_as::<_, (String,)>("SELECT value FROM settings WHERE key = ?")
        .bind(preferences_key(company, user))
        .fetch_optional(pool)
        .await?;

    match row {
        Some((json,)) => Ok(serde_json::from_str(&json)?),
        None => Ok(fallback),
    }
}

pub async fn save_preferences(
    pool: &DbPool,
    company: CompanyId,
    user: UserId,
    preferences: &Preferences,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(preferences)?;
    sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT (key) DO UPDATE SET value = excluded.value")
        .bind(preferences_key(company, user))
        .bind(json)
        .execute(pool)
        .await?;
    Ok(())
}
