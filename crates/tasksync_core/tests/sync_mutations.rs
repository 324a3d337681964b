mod support;

use std::sync::Arc;
use support::{item, meeting, offline, settle, Op, ScriptedStore};
use tasksync_core::{
    AuthState, FailureKind, Identity, ItemId, MutationOutcome, StoreError, SyncConfig,
    SyncOperation, TaskSynchronizer, ToggleFailurePolicy,
};
use tokio::sync::broadcast::error::TryRecvError;

async fn ready_with(
    items: Vec<tasksync_core::Item>,
    config: SyncConfig,
) -> (Arc<ScriptedStore>, TaskSynchronizer<Arc<ScriptedStore>>) {
    let store = ScriptedStore::new();
    store.seed("u1", items);
    let sync = TaskSynchronizer::with_config(Arc::clone(&store), config);
    sync.on_auth_state(AuthState::SignedIn(Identity::new("u1"))).await;
    (store, sync)
}

fn t1() -> ItemId {
    ItemId::new("t1")
}

#[tokio::test]
async fn meeting_scenario_toggle_then_add() {
    let (store, sync) = ready_with(vec![meeting()], SyncConfig::default()).await;
    let items = sync.items();
    assert_eq!(items.len(), 1);
    assert!(!items[0].done);

    assert_eq!(sync.toggle_status(&t1()).await, MutationOutcome::Applied);
    assert!(sync.items()[0].done);
    assert!(store.remote("u1")[0].done);

    assert_eq!(
        sync.add("Call mom", "2024-05-02", "09:00").await,
        MutationOutcome::Applied
    );
    let items = sync.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1], item("t2", "Call mom", "2024-05-02", "09:00"));
    assert!(!items[1].done);
}

#[tokio::test]
async fn add_waits_for_store_before_inserting() {
    let (store, sync) = ready_with(vec![meeting()], SyncConfig::default()).await;
    let gate = store.hold(Op::Create);

    let (outcome, ()) = tokio::join!(sync.add("Call mom", "2024-05-02", "09:00"), async {
        settle().await;
        assert_eq!(sync.items().len(), 1);
        gate.notify_one();
    });

    assert_eq!(outcome, MutationOutcome::Applied);
    let items = sync.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].id, ItemId::new("t2"));
}

#[tokio::test]
async fn add_failure_leaves_list_unchanged_and_signals_once() {
    let (store, sync) = ready_with(vec![meeting()], SyncConfig::default()).await;
    let mut failures = sync.subscribe_failures();
    store.fail_next(Op::Create, offline());

    let outcome = sync.add("Call mom", "2024-05-02", "09:00").await;

    assert_eq!(outcome, MutationOutcome::Failed(FailureKind::StoreUnavailable));
    assert_eq!(sync.items(), vec![meeting()]);
    let notice = failures.try_recv().expect("add failure notice");
    assert_eq!(notice.operation, SyncOperation::Add);
    assert_eq!(notice.title(), "Ooops");
    assert_eq!(notice.message(), "Failed to add Event. Please try again.");
    assert!(matches!(failures.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn toggle_flips_before_update_resolves_and_keeps_flip_on_failure() {
    let (store, sync) = ready_with(vec![meeting()], SyncConfig::default()).await;
    let mut failures = sync.subscribe_failures();
    let gate = store.hold(Op::Update);
    store.fail_next(Op::Update, offline());
    let id = t1();

    let (outcome, ()) = tokio::join!(sync.toggle_status(&id), async {
        settle().await;
        assert!(sync.items()[0].done);
        gate.notify_one();
    });

    assert_eq!(outcome, MutationOutcome::Failed(FailureKind::StoreUnavailable));
    assert!(sync.items()[0].done, "local flip is not rolled back");
    assert!(!store.remote("u1")[0].done);
    let notice = failures.try_recv().expect("toggle failure notice");
    assert_eq!(notice.operation, SyncOperation::ToggleStatus);
    assert_eq!(notice.item_id, Some(t1()));
    assert!(matches!(failures.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn toggle_of_item_missing_remotely_reports_not_found() {
    let (store, sync) = ready_with(vec![meeting()], SyncConfig::default()).await;
    store.seed("u1", Vec::new());

    let outcome = sync.toggle_status(&t1()).await;

    assert_eq!(outcome, MutationOutcome::Failed(FailureKind::NotFound));
    assert!(sync.items()[0].done);
}

#[tokio::test]
async fn rollback_policy_restores_flag_on_failure() {
    let config = SyncConfig {
        toggle_failure_policy: ToggleFailurePolicy::Rollback,
        ..SyncConfig::default()
    };
    let (store, sync) = ready_with(vec![meeting()], config).await;
    let mut failures = sync.subscribe_failures();
    store.fail_next(Op::Update, StoreError::unavailable("timeout"));

    let outcome = sync.toggle_status(&t1()).await;

    assert_eq!(outcome, MutationOutcome::Failed(FailureKind::StoreUnavailable));
    assert!(!sync.items()[0].done);
    assert!(failures.try_recv().is_ok());
}

#[tokio::test]
async fn rollback_policy_ignores_failure_superseded_by_newer_toggle() {
    let config = SyncConfig {
        toggle_failure_policy: ToggleFailurePolicy::Rollback,
        ..SyncConfig::default()
    };
    let (store, sync) = ready_with(vec![meeting()], config).await;
    let first_gate = store.hold(Op::Update);
    let second_gate = store.hold(Op::Update);
    store.fail_next(Op::Update, offline());
    let id = t1();

    let (first, second, ()) = tokio::join!(
        sync.toggle_status(&id),
        async {
            settle().await;
            sync.toggle_status(&id).await
        },
        async {
            settle().await;
            settle().await;
            assert!(!sync.items()[0].done);
            first_gate.notify_one();
            settle().await;
            assert!(!sync.items()[0].done, "stale failure must not roll back");
            second_gate.notify_one();
        }
    );

    assert_eq!(first, MutationOutcome::Failed(FailureKind::StoreUnavailable));
    assert_eq!(second, MutationOutcome::Applied);
    assert!(!sync.items()[0].done);
    assert!(!store.remote("u1")[0].done);
}

#[tokio::test]
async fn remove_keeps_item_until_delete_confirms() {
    let (store, sync) = ready_with(vec![meeting()], SyncConfig::default()).await;
    let gate = store.hold(Op::Delete);
    let id = t1();

    let (outcome, ()) = tokio::join!(sync.remove(&id), async {
        settle().await;
        assert!(sync.items().iter().any(|item| item.id == id));
        gate.notify_one();
    });

    assert_eq!(outcome, MutationOutcome::Applied);
    assert!(sync.items().is_empty());
    assert!(store.remote("u1").is_empty());
}

#[tokio::test]
async fn remove_failure_keeps_item_and_signals() {
    let (store, sync) = ready_with(vec![meeting()], SyncConfig::default()).await;
    let mut failures = sync.subscribe_failures();
    store.fail_next(Op::Delete, offline());

    let outcome = sync.remove(&t1()).await;

    assert_eq!(outcome, MutationOutcome::Failed(FailureKind::StoreUnavailable));
    assert_eq!(sync.items(), vec![meeting()]);
    let notice = failures.try_recv().expect("remove failure notice");
    assert_eq!(notice.message(), "Failed to remove Event. Please try again.");
}

#[tokio::test]
async fn removing_already_removed_id_is_harmless() {
    let lunch = item("t5", "Lunch", "2024-05-01", "12:00");
    let (_store, sync) = ready_with(vec![meeting(), lunch.clone()], SyncConfig::default()).await;
    let mut failures = sync.subscribe_failures();

    assert_eq!(sync.remove(&t1()).await, MutationOutcome::Applied);
    assert_eq!(sync.remove(&t1()).await, MutationOutcome::Applied);

    assert_eq!(sync.items(), vec![lunch]);
    assert!(matches!(failures.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn completions_after_sign_out_are_discarded() {
    let (store, sync) = ready_with(vec![meeting()], SyncConfig::default()).await;
    let mut failures = sync.subscribe_failures();
    let create_gate = store.hold(Op::Create);
    let delete_gate = store.hold(Op::Delete);
    store.fail_next(Op::Delete, offline());
    let id = t1();

    let (added, removed, ()) = tokio::join!(
        sync.add("Call mom", "2024-05-02", "09:00"),
        sync.remove(&id),
        async {
            settle().await;
            sync.on_auth_state(AuthState::SignedOut).await;
            create_gate.notify_one();
            delete_gate.notify_one();
        }
    );

    assert_eq!(added, MutationOutcome::Discarded);
    assert_eq!(removed, MutationOutcome::Discarded);
    assert!(sync.items().is_empty());
    assert!(matches!(failures.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn concurrent_add_and_remove_both_land_on_latest_list() {
    let (store, sync) = ready_with(vec![meeting()], SyncConfig::default()).await;
    let create_gate = store.hold(Op::Create);
    let delete_gate = store.hold(Op::Delete);
    let id = t1();

    let (added, removed, ()) = tokio::join!(
        sync.add("Call mom", "2024-05-02", "09:00"),
        sync.remove(&id),
        async {
            settle().await;
            create_gate.notify_one();
            settle().await;
            delete_gate.notify_one();
        }
    );

    assert_eq!(added, MutationOutcome::Applied);
    assert_eq!(removed, MutationOutcome::Applied);
    let ids: Vec<_> = sync.items().into_iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![ItemId::new("t2")]);
}
