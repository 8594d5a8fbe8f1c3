use super::*;

const DELAY: Duration = Duration::from_millis(500);

fn logic() -> TodoLogic {
    TodoLogic::new(DELAY, RoutineCosts::default())
}

fn add(name: &str) -> RoutineCall {
    RoutineCall::Add { name: name.into() }
}

#[test]
fn routine_applies_only_after_confirm_delay() {
    let mut logic = logic();
    let t0 = Instant::now();
    let ix_hash = logic
        .submit(add("Buy milk"), FuelParams::default(), t0)
        .expect("submit");

    assert!(logic.todos(t0).is_empty());
    assert_eq!(
        logic.receipt(&ix_hash, t0).expect("receipt").status,
        ReceiptStatus::Pending
    );

    let later = t0 + DELAY;
    let receipt = logic.receipt(&ix_hash, later).expect("receipt");
    assert_eq!(receipt.status, ReceiptStatus::Confirmed);
    assert_eq!(receipt.fuel_used, RoutineCosts::default().add);
    assert!(receipt.confirmed_at.is_some());
    assert_eq!(logic.todos(later), vec![TodoRecord::new("Buy milk")]);
}

#[test]
fn routines_apply_in_submission_order() {
    let mut logic = logic();
    let t0 = Instant::now();
    logic
        .submit(add("first"), FuelParams::default(), t0)
        .expect("submit");
    logic
        .submit(
            RoutineCall::MarkTodoCompleted { index: 0 },
            FuelParams::default(),
            t0 + Duration::from_millis(10),
        )
        .expect("submit");

    let todos = logic.todos(t0 + DELAY + Duration::from_millis(10));
    assert_eq!(
        todos,
        vec![TodoRecord {
            name: "first".into(),
            completed: true
        }]
    );
}

#[test]
fn insufficient_fuel_limit_fails_receipt() {
    let mut logic = logic();
    let t0 = Instant::now();
    let ix_hash = logic
        .submit(
            add("expensive"),
            FuelParams {
                fuel_price: 1,
                fuel_limit: 10,
            },
            t0,
        )
        .expect("submit");

    let receipt = logic.receipt(&ix_hash, t0 + DELAY).expect("receipt");
    assert_eq!(receipt.status, ReceiptStatus::Failed);
    assert_eq!(
        receipt.error.map(|e| e.code),
        Some(ErrorCode::FuelExhausted)
    );
    assert!(logic.todos(t0 + DELAY).is_empty());
}

#[test]
fn completing_missing_index_fails_with_not_found() {
    let mut logic = logic().with_todos(vec![TodoRecord::new("only")]);
    let t0 = Instant::now();
    let ix_hash = logic
        .submit(
            RoutineCall::MarkTodoCompleted { index: 4 },
            FuelParams::default(),
            t0,
        )
        .expect("submit");

    let receipt = logic.receipt(&ix_hash, t0 + DELAY).expect("receipt");
    assert_eq!(receipt.status, ReceiptStatus::Failed);
    assert_eq!(receipt.error.map(|e| e.code), Some(ErrorCode::NotFound));
}

#[test]
fn malformed_submissions_are_rejected_up_front() {
    let mut logic = logic();
    let t0 = Instant::now();

    let err = logic
        .submit(add("  "), FuelParams::default(), t0)
        .expect_err("empty name");
    assert_eq!(err.code, ErrorCode::Validation);

    let err = logic
        .submit(
            add("x"),
            FuelParams {
                fuel_price: 0,
                fuel_limit: 1000,
            },
            t0,
        )
        .expect_err("zero price");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[test]
fn unknown_interaction_is_not_found() {
    let mut logic = logic();
    let err = logic
        .receipt("0xnope", Instant::now())
        .expect_err("unknown");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[test]
fn only_recent_receipts_are_retained() {
    let mut logic = logic().with_receipt_retention(2);
    let t0 = Instant::now();
    let hashes: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|name| {
            logic
                .submit(add(name), FuelParams::default(), t0)
                .expect("submit")
        })
        .collect();

    // still pending, so every hash resolves
    for ix_hash in &hashes {
        assert_eq!(
            logic.receipt(ix_hash, t0).expect("receipt").status,
            ReceiptStatus::Pending
        );
    }

    let later = t0 + DELAY;
    assert_eq!(logic.todos(later).len(), 3);
    let err = logic.receipt(&hashes[0], later).expect_err("evicted");
    assert_eq!(err.code, ErrorCode::NotFound);
    for ix_hash in &hashes[1..] {
        assert_eq!(
            logic.receipt(ix_hash, later).expect("receipt").status,
            ReceiptStatus::Confirmed
        );
    }
}
