use chrono::NaiveDate;
use loansplit_core::*;
use rust_decimal_macros::dec;

const COMPANY: CompanyId = CompanyId(1);
const USER: UserId = UserId(1);

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn chart() -> ChartOfAccounts {
    ChartOfAccounts::new(
        DEFAULT_ACCOUNTS
            .iter()
            .enumerate()
            .map(|(i, (code, name, class))| Account::new(code, name, *class).with_id(i as i64 + 1)),
    )
}

fn id_of(chart: &ChartOfAccounts, code: &str) -> AccountId {
    chart.by_code(code).and_then(|a| a.id).unwrap()
}

fn car_loan(chart: &ChartOfAccounts) -> Loan {
    Loan::new(
        id_of(chart, "2110"),
        LoanTerms {
            principal: Money::from_decimal(dec!(10000)),
            annual_rate: dec!(6),
            term_months: 12,
            start_date: date(2024, 1, 1),
            compounding_frequency: CompoundingFrequency::Monthly,
        },
    )
    .unwrap()
}

fn payment(chart: &ChartOfAccounts, id: i64, on: NaiveDate, amount: Money) -> (SourceTransaction, Vec<TransactionLine>) {
    let source = SourceTransaction {
        id: TransactionId(id),
        date: on,
        description: "Vehicle loan payment".to_string(),
    };
    let lines = vec![
        TransactionLine::debit(id_of(chart, "2110"), amount, None),
        TransactionLine::credit(id_of(chart, "1000"), amount, None),
    ];
    (source, lines)
}

fn preferences() -> Preferences {
    Preferences {
        default_interest_expense_account: Some("6000".to_string()),
        ..Preferences::default()
    }
}

#[test]
fn scheduled_payment_is_detected_split_and_recorded_once() {
    let chart = chart();
    let loan = car_loan(&chart);
    let prefs = preferences();
    let first = &loan.schedule().periods[0];

    let (source, lines) = payment(&chart, 10, first.due_date, first.payment);
    let detection = LoanPaymentDetector::new(&chart)
        .with_schedule(loan.liability_account, loan.schedule())
        .detect_loan_payment(&source, &lines);

    assert!(detection.is_loan_payment);
    assert!(detection.confidence >= prefs.confidence_threshold);
    let suggestion = detection.suggestion.unwrap();
    assert_eq!(suggestion.source, SuggestionSource::ScheduledPeriod);
    assert_eq!(suggestion.interest, Money::from_decimal(dec!(50.00)));
    assert_eq!(suggestion.principal, Money::from_decimal(dec!(810.66)));

    let state = PromptState::for_detection(&detection, &prefs);
    assert_eq!(state, PromptState::Open { transaction: source.id });

    let resolver = SplitDecisionResolver::new(&chart, &prefs);
    let (state, outcome) = resolver
        .resolve(state, InterestSplitDecision::SplitNow, &detection, None, None)
        .unwrap();
    assert!(matches!(state, PromptState::Resolved { .. }));
    let DecisionOutcome::Split(request) = outcome else {
        panic!("expected a split request");
    };
    assert_eq!(request.interest_expense_account, Some(id_of(&chart, "6000")));

    let entry = create_interest_split_entry(&request).unwrap();
    let debits: Money = entry.entry.lines.iter().map(|l| l.debit).sum();
    let credits: Money = entry.entry.lines.iter().map(|l| l.credit).sum();
    assert_eq!(debits, credits);
    assert_eq!(credits, first.payment);

    let mut registry = SplitRegistry::new();
    registry.record(entry.clone()).unwrap();
    assert_eq!(
        registry.record(entry).unwrap_err(),
        LoanSplitError::DuplicateSplit(source.id)
    );

    // the resolved prompt cannot be answered again
    let err = resolver
        .resolve(state, InterestSplitDecision::SplitNow, &detection, None, None)
        .unwrap_err();
    assert_eq!(
        err,
        LoanSplitError::StateTransition(StateTransitionError::PromptNotOpen(source.id))
    );
}

#[test]
fn deferred_payment_completes_from_the_checklist() {
    let chart = chart();
    let loan = car_loan(&chart);
    let prefs = preferences();
    let second = &loan.schedule().periods[1];

    let (source, lines) = payment(&chart, 11, second.due_date, second.payment);
    let detection = LoanPaymentDetector::new(&chart)
        .with_schedule(loan.liability_account, loan.schedule())
        .detect_loan_payment(&source, &lines);

    let resolver = SplitDecisionResolver::new(&chart, &prefs);
    let state = PromptState::for_detection(&detection, &prefs);
    let (_, outcome) = resolver
        .resolve(state, InterestSplitDecision::DeferToChecklist, &detection, None, None)
        .unwrap();
    let DecisionOutcome::Defer(item) = outcome else {
        panic!("expected a deferred item");
    };
    assert_eq!(item.liability_account_name, "Vehicle Loan");

    let mut tracker = DeferredSplitTracker::new();
    tracker.add_deferred_split_to_checklist(item, COMPANY, USER).unwrap();
    let pending = tracker.get_pending_interest_splits(COMPANY, USER);
    assert_eq!(pending.len(), 1);

    let request = pending[0]
        .to_request(None, resolver.default_interest_account())
        .unwrap();
    let entry = create_interest_split_entry(&request).unwrap();
    assert_eq!(entry.interest, second.interest);
    assert_eq!(entry.principal + entry.interest, second.payment);

    tracker.mark_split_completed(source.id, COMPANY, USER).unwrap();
    assert!(tracker.get_pending_interest_splits(COMPANY, USER).is_empty());
    assert!(tracker.mark_split_completed(source.id, COMPANY, USER).is_err());
}

#[test]
fn dismissing_and_disabling_silence_future_prompts() {
    let chart = chart();
    let loan = car_loan(&chart);
    let mut prefs = preferences();
    let first = &loan.schedule().periods[0];

    let (source, lines) = payment(&chart, 12, first.due_date, first.payment);
    let detection = LoanPaymentDetector::new(&chart)
        .with_schedule(loan.liability_account, loan.schedule())
        .detect_loan_payment(&source, &lines);

    let state = PromptState::for_detection(&detection, &prefs);
    let (_, outcome) = SplitDecisionResolver::new(&chart, &prefs)
        .resolve(state, InterestSplitDecision::Dismiss, &detection, None, None)
        .unwrap();
    let DecisionOutcome::UpdatePreferences(change) = outcome else {
        panic!("expected a preference change");
    };
    prefs.apply(&change);
    assert!(!should_show_prompt(&detection, &prefs, source.id));

    let (other, other_lines) = payment(&chart, 13, first.due_date, first.payment);
    let other_detection = LoanPaymentDetector::new(&chart).detect_loan_payment(&other, &other_lines);
    assert!(should_show_prompt(&other_detection, &prefs, other.id));

    prefs.apply(&PreferenceChange::DisablePrompts);
    assert!(!should_show_prompt(&other_detection, &prefs, other.id));
    assert_eq!(PromptState::for_detection(&other_detection, &prefs), PromptState::Idle);
}

#[test]
fn user_amounts_must_add_up_to_the_payment() {
    let chart = chart();
    let prefs = preferences();
    let (source, lines) = payment(&chart, 14, date(2024, 3, 5), Money::from_decimal(dec!(500)));
    let detection = LoanPaymentDetector::new(&chart).detect_loan_payment(&source, &lines);
    assert!(detection.suggestion.is_none());

    let resolver = SplitDecisionResolver::new(&chart, &prefs);
    let err = resolver
        .build_request(
            &detection,
            Some(SplitAmounts {
                principal: Money::from_decimal(dec!(450)),
                interest: Money::from_decimal(dec!(60)),
            }),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, LoanSplitError::InputValidation(ref v)
        if v.contains(&SplitViolation::SumMismatch {
            expected: Money::from_decimal(dec!(500)),
            actual: Money::from_decimal(dec!(510)),
        })));

    let request = resolver
        .build_request(
            &detection,
            Some(SplitAmounts {
                principal: Money::from_decimal(dec!(440)),
                interest: Money::from_decimal(dec!(60)),
            }),
            None,
        )
        .unwrap();
    assert_eq!(create_interest_split_entry(&request).unwrap().entry.lines.len(), 3);
}
