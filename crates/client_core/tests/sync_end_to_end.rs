use std::{sync::Arc, time::Duration};

use client_core::{
    ClientSettings, ItemId, ListSyncController, LogicGateway, Operation, SyncError, SyncPhase,
    TodoRecord,
};
use logic_server::{
    build_router,
    logic::{RoutineCosts, TodoLogic},
    AppState,
};
use tokio::net::TcpListener;

async fn spawn_backend(seed: Vec<TodoRecord>, costs: RoutineCosts) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let logic = TodoLogic::new(Duration::from_millis(20), costs).with_todos(seed);
    let app = build_router(AppState::new("todo-buddy", logic));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn settings(base_url: String) -> ClientSettings {
    ClientSettings {
        base_url,
        poll_interval_ms: 5,
        ack_timeout_ms: 5_000,
        ..ClientSettings::default()
    }
}

async fn started(base_url: String) -> Arc<ListSyncController> {
    let gateway = LogicGateway::from_settings(&settings(base_url)).expect("gateway");
    let controller = ListSyncController::start(Arc::new(gateway));
    let mut rx = controller.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| !s.loading))
        .await
        .expect("initial load settles")
        .expect("controller alive");
    controller
}

#[tokio::test]
async fn add_complete_and_local_remove_against_live_backend() {
    let base_url = spawn_backend(vec![TodoRecord::new("Buy milk")], RoutineCosts::default()).await;
    let controller = started(base_url).await;
    assert_eq!(controller.phase(), SyncPhase::Ready);
    assert_eq!(controller.snapshot().len(), 1);

    controller.add_item("Attend Moi Event").await.expect("add");
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1].name, "Attend Moi Event");
    assert_eq!(snapshot[1].id, ItemId(1));

    controller.complete_item(ItemId(0)).await.expect("complete");
    let snapshot = controller.snapshot();
    assert!(snapshot[0].completed);
    assert!(!snapshot[1].completed);

    controller.remove_local(ItemId(0)).expect("remove");
    assert_eq!(controller.snapshot().len(), 1);

    // local removal never reached the backend
    controller.load().await.expect("reload");
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot[0].completed);
    assert!(!controller.state().is_busy());
}

#[tokio::test]
async fn fuel_budget_below_routine_cost_fails_without_touching_snapshot() {
    let costs = RoutineCosts {
        add: 5_000,
        complete: 50,
    };
    let base_url = spawn_backend(vec![TodoRecord::new("Buy milk")], costs).await;
    let controller = started(base_url).await;
    let before = controller.snapshot();

    let err = controller.add_item("too expensive").await.expect_err("fuel");

    assert!(matches!(err, SyncError::Remote { .. }));
    assert!(err.to_string().contains("needs 5000 fuel"));
    assert_eq!(controller.snapshot(), before);
    assert_eq!(controller.phase(), SyncPhase::Errored);

    controller.complete_item(ItemId(0)).await.expect("complete still works");
    assert!(controller.snapshot()[0].completed);
    assert_eq!(controller.state().last_error_op(), Some(Operation::Add));

    controller.clear_error();
    assert_eq!(controller.phase(), SyncPhase::Ready);
}

#[tokio::test]
async fn wrong_logic_id_leaves_session_errored_but_usable() {
    let base_url = spawn_backend(Vec::new(), RoutineCosts::default()).await;
    let gateway = LogicGateway::from_settings(&ClientSettings {
        logic_id: "0xsomething-else".into(),
        ..settings(base_url)
    })
    .expect("gateway");
    let controller = ListSyncController::new(Arc::new(gateway));

    let err = controller.load().await.expect_err("unknown logic");

    assert!(err.to_string().contains("unknown logic"));
    let state = controller.state();
    assert!(!state.loading);
    assert!(state.snapshot.is_empty());
    assert_eq!(state.phase(), SyncPhase::Errored);
}
