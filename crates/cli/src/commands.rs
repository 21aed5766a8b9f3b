use anyhow::{bail, Context, Result};
use loansplit_core::{
    calculate_amortization_schedule, create_interest_split_entry, should_auto_split,
    should_show_prompt, validate_accounts, AccountClass, AccountId, ChartOfAccounts, CompanyId,
    DecisionOutcome, InterestSplitDecision, LoanPaymentDetection, LoanPaymentDetector,
    LoanSplitError, Loan, Money, Preferences, PromptState, SplitAmounts, SplitDecisionResolver,
    SplitSuggestion, StateTransitionError, TransactionId, TransactionLine, UnvalidatedTransaction,
    UserId, ValidatedTransaction,
};
use loansplit_storage::{self as storage, DbPool};

use crate::cli::{AmountArgs, Command, LoanCommand, PaymentArgs, PrefsArgs, PrefsCommand, TermsArgs};
use crate::config::Config;

/// Database handle plus the identity and preferences commands run under.
pub struct Session {
    pub pool: DbPool,
    pub company: CompanyId,
    pub user: UserId,
    pub preferences: Preferences,
}

impl Session {
    pub async fn open(pool: DbPool, config: &Config) -> Result<Self> {
        let company = config.company();
        let user = config.user();
        let preferences =
            storage::load_preferences(&pool, company, user, config.preferences.clone()).await?;
        Ok(Self {
            pool,
            company,
            user,
            preferences,
        })
    }
}

pub async fn run(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::Schedule(terms) => schedule(&terms),
        Command::Accounts => accounts(session).await,
        Command::Loan(LoanCommand::Add { account, terms }) => add_loan(session, &account, &terms).await,
        Command::Loan(LoanCommand::List) => list_loans(session).await,
        Command::Payment(args) => payment(session, &args).await.map(|_| ()),
        Command::Detect { transaction } => detect(session, TransactionId(transaction)).await,
        Command::Decide {
            transaction,
            decision,
            amounts,
        } => decide(session, TransactionId(transaction), decision, &amounts).await,
        Command::Pending => pending(session).await,
        Command::Complete { transaction, amounts } => {
            complete(session, TransactionId(transaction), &amounts).await
        }
        Command::Prefs(PrefsCommand::Show) => show_preferences(&session.preferences),
        Command::Prefs(PrefsCommand::Set(args)) => set_preferences(session, &args).await,
    }
}

pub fn schedule(args: &TermsArgs) -> Result<()> {
    let schedule = calculate_amortization_schedule(&args.to_terms())?;

    println!("{:>4}  {:<10}  {:>12}  {:>12}  {:>12}  {:>14}", "#", "Due", "Payment", "Interest", "Principal", "Balance");
    for p in &schedule.periods {
        println!(
            "{:>4}  {:<10}  {:>12}  {:>12}  {:>12}  {:>14}",
            p.number,
            p.due_date.to_string(),
            p.payment.to_string(),
            p.interest.to_string(),
            p.principal.to_string(),
            p.remaining_balance.to_string()
        );
    }
    println!();
    println!("Total interest: {}", schedule.total_interest());
    println!("Total paid:     {}", schedule.total_paid());
    Ok(())
}

async fn accounts(session: &Session) -> Result<()> {
    for account in storage::get_all_accounts(&session.pool).await? {
        let balance = match account.id {
            Some(id) => storage::account_balance(&session.pool, id).await?,
            None => Money::zero(),
        };
        println!(
            "{:<6} {:<24} {:<18} {:>14}",
            account.code,
            account.name,
            account.class.to_string(),
            balance.to_string()
        );
    }
    Ok(())
}

async fn account_id(session: &Session, code: &str) -> Result<AccountId> {
    storage::require_account_by_code(&session.pool, code)
        .await?
        .id
        .with_context(|| format!("Account {code} has no id"))
}

async fn add_loan(session: &Session, code: &str, args: &TermsArgs) -> Result<()> {
    let account = storage::require_account_by_code(&session.pool, code).await?;
    if !account.class.is_loan() {
        bail!("Account {code} is classified as {}, not a loan", account.class);
    }
    let id = account.id.context("Account has no id")?;

    let loan = Loan::new(id, args.to_terms())?;
    let loan_id = storage::save_loan(&session.pool, &loan).await?;
    println!(
        "Loan {loan_id} on {} {}: {} payments of {}",
        account.code,
        account.name,
        loan.schedule().periods.len(),
        loan.schedule().payment
    );
    Ok(())
}

async fn list_loans(session: &Session) -> Result<()> {
    let chart = storage::load_chart_of_accounts(&session.pool).await?;
    for loan in storage::get_loans(&session.pool).await? {
        let terms = loan.terms();
        println!(
            "{:<24} {} at {}% over {} months ({}), payment {}, total interest {}",
            chart.name_of(loan.liability_account).unwrap_or("?"),
            terms.principal,
            terms.annual_rate,
            terms.term_months,
            terms.compounding_frequency,
            loan.schedule().payment,
            loan.schedule().total_interest()
        );
    }
    Ok(())
}

/// Records the payment, then prompts or auto-splits it.
async fn payment(session: &Session, args: &PaymentArgs) -> Result<TransactionId> {
    let loan_account = account_id(session, &args.account).await?;
    let cash_account = account_id(session, &args.from).await?;

    let tx = ValidatedTransaction::validate(UnvalidatedTransaction {
        date: args.date,
        description: args.description.clone(),
        lines: vec![
            TransactionLine::debit(loan_account, args.amount, None),
            TransactionLine::credit(cash_account, args.amount, None),
        ],
        memo: None,
    })
    .map_err(LoanSplitError::from)?;
    let id = storage::insert_transaction(&session.pool, &tx).await?;
    println!("Recorded transaction {id}");

    let (chart, detection) = detect_stored(session, id).await?;
    if should_auto_split(&detection, &session.preferences) {
        let resolver = SplitDecisionResolver::new(&chart, &session.preferences);
        let request = resolver.build_request(&detection, None, None)?;
        let entry = create_interest_split_entry(&request)?;
        let journal =
            storage::insert_interest_split_entry(&session.pool, &entry, session.company, session.user).await?;
        println!(
            "Auto-split into principal {} and interest {} (entry {journal})",
            request.principal_amount, request.interest_amount
        );
    } else if should_show_prompt(&detection, &session.preferences, id) {
        print_prompt(&detection);
    }
    Ok(id)
}

/// Runs detection on a stored transaction against every loan schedule.
async fn detect_stored(session: &Session, id: TransactionId) -> Result<(ChartOfAccounts, LoanPaymentDetection)> {
    let chart = storage::load_chart_of_accounts(&session.pool).await?;
    let loans = storage::get_loans(&session.pool).await?;
    let (source, lines) = storage::get_source_transaction(&session.pool, id)
        .await?
        .with_context(|| format!("Transaction {id} not found"))?;

    let detection = loans
        .iter()
        .fold(LoanPaymentDetector::new(&chart), |detector, loan| {
            detector.with_schedule(loan.liability_account, loan.schedule())
        })
        .detect_loan_payment(&source, &lines);
    Ok((chart, detection))
}

fn print_suggestion(suggestion: &SplitSuggestion) {
    let period = suggestion
        .period_number
        .map(|n| format!(" (payment #{n})"))
        .unwrap_or_default();
    println!(
        "  Suggested: principal {}, interest {}{period}",
        suggestion.principal, suggestion.interest
    );
}

fn print_prompt(detection: &LoanPaymentDetection) {
    let id = detection.transaction_id;
    println!(
        "Transaction {id} looks like a loan payment of {} (confidence {:.2}).",
        detection.payment_amount, detection.confidence
    );
    if let Some(suggestion) = &detection.suggestion {
        print_suggestion(suggestion);
    }
    println!("  loansplit decide {id} split|defer|dismiss|disable-prompts");
}

async fn detect(session: &Session, id: TransactionId) -> Result<()> {
    let (_, detection) = detect_stored(session, id).await?;
    if !detection.is_loan_payment {
        println!("Transaction {id} is not a loan payment");
        return Ok(());
    }
    if should_show_prompt(&detection, &session.preferences, id) {
        print_prompt(&detection);
    } else {
        println!(
            "Transaction {id} is a loan payment of {} (confidence {:.2}); prompt suppressed by preferences.",
            detection.payment_amount, detection.confidence
        );
        if let Some(suggestion) = &detection.suggestion {
            print_suggestion(suggestion);
        }
    }
    Ok(())
}

async fn interest_account(session: &Session, args: &AmountArgs) -> Result<Option<AccountId>> {
    match &args.interest_account {
        Some(code) => Ok(Some(account_id(session, code).await?)),
        None => Ok(None),
    }
}

async fn decide(
    session: &Session,
    id: TransactionId,
    decision: InterestSplitDecision,
    args: &AmountArgs,
) -> Result<()> {
    if storage::get_interest_split_entry_id(&session.pool, id).await?.is_some() {
        return Err(LoanSplitError::DuplicateSplit(id).into());
    }

    let (chart, detection) = detect_stored(session, id).await?;
    let resolver = SplitDecisionResolver::new(&chart, &session.preferences);
    // Answering by hand opens the prompt regardless of prompting preferences.
    let state = PromptState::requested(&detection);
    let (_, outcome) = resolver.resolve(
        state,
        decision,
        &detection,
        args.amounts()?,
        interest_account(session, args).await?,
    )?;

    match outcome {
        DecisionOutcome::Split(request) => {
            let entry = create_interest_split_entry(&request)?;
            let journal =
                storage::insert_interest_split_entry(&session.pool, &entry, session.company, session.user).await?;
            println!(
                "Posted split entry {journal}: principal {}, interest {}",
                entry.principal, entry.interest
            );
        }
        DecisionOutcome::Defer(item) => {
            storage::add_deferred_split(&session.pool, item, session.company, session.user).await?;
            println!("Transaction {id} added to the checklist");
        }
        DecisionOutcome::UpdatePreferences(change) => {
            let mut preferences = session.preferences.clone();
            preferences.apply(&change);
            storage::save_preferences(&session.pool, session.company, session.user, &preferences).await?;
            println!("Preferences updated");
        }
    }
    Ok(())
}

async fn pending(session: &Session) -> Result<()> {
    let items = storage::get_pending_interest_splits(&session.pool, session.company, session.user).await?;
    if items.is_empty() {
        println!("No pending interest splits");
        return Ok(());
    }
    for item in items {
        let suggestion = item
            .suggested_amounts()
            .map(|SplitAmounts { principal, interest }| format!("principal {principal}, interest {interest}"))
            .unwrap_or_else(|| "no suggestion".to_string());
        println!(
            "{:>6}  {}  {:<24} {:>12}  {suggestion}",
            item.transaction_id,
            item.payment_date,
            item.liability_account_name,
            item.payment_amount.to_string()
        );
    }
    Ok(())
}

async fn complete(session: &Session, id: TransactionId, args: &AmountArgs) -> Result<()> {
    let item = storage::get_deferred_split(&session.pool, id, session.company, session.user)
        .await?
        .ok_or(LoanSplitError::from(StateTransitionError::NotDeferred(id)))?;

    let chart = storage::load_chart_of_accounts(&session.pool).await?;
    let resolver = SplitDecisionResolver::new(&chart, &session.preferences);
    let interest_account = interest_account(session, args)
        .await?
        .or_else(|| resolver.default_interest_account());

    let request = item.to_request(args.amounts()?, interest_account)?;
    let violations = validate_accounts(&request, &chart);
    if !violations.is_empty() {
        return Err(LoanSplitError::InputValidation(violations).into());
    }

    let entry = create_interest_split_entry(&request)?;
    let journal = storage::complete_deferred_split(&session.pool, &entry, session.company, session.user).await?;
    println!(
        "Posted split entry {journal} for transaction {id}: principal {}, interest {}",
        entry.principal, entry.interest
    );
    Ok(())
}

fn show_preferences(preferences: &Preferences) -> Result<()> {
    println!("prompts_enabled      = {}", preferences.prompts_enabled);
    println!("auto_split           = {}", preferences.auto_split);
    println!("minimum_amount       = {}", preferences.minimum_amount);
    println!("confidence_threshold = {}", preferences.confidence_threshold);
    println!(
        "interest_account     = {}",
        preferences.default_interest_expense_account.as_deref().unwrap_or("(none)")
    );
    println!("dismissed            = {}", preferences.dismissed.len());
    Ok(())
}

async fn set_preferences(session: &Session, args: &PrefsArgs) -> Result<()> {
    let mut preferences = session.preferences.clone();
    if let Some(enabled) = args.prompts_enabled {
        preferences.prompts_enabled = enabled;
    }
    if let Some(auto) = args.auto_split {
        preferences.auto_split = auto;
    }
    if let Some(amount) = args.minimum_amount {
        if amount.is_negative() {
            bail!("minimum amount cannot be negative");
        }
        preferences.minimum_amount = amount;
    }
    if let Some(threshold) = args.confidence_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            bail!("confidence threshold must be between 0 and 1");
        }
        preferences.confidence_threshold = threshold;
    }
    if let Some(code) = &args.interest_account {
        let account = storage::require_account_by_code(&session.pool, code).await?;
        if account.class != AccountClass::InterestExpense {
            bail!("Account {code} is not an interest expense account");
        }
        preferences.default_interest_expense_account = Some(account.code);
    }

    storage::save_preferences(&session.pool, session.company, session.user, &preferences).await?;
    show_preferences(&preferences)
}
