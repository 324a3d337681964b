//! Scripted task store for driving in-flight and failure scenarios.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tasksync_core::{
    Identity, InMemoryTaskStore, Item, ItemId, NewItem, StoreError, StoreResult, TaskStore,
};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Create,
    Update,
    Delete,
}

#[derive(Default)]
struct Script {
    gates: HashMap<Op, VecDeque<Arc<Notify>>>,
    failures: HashMap<Op, VecDeque<StoreError>>,
    calls: Vec<Op>,
}

/// Wraps `InMemoryTaskStore` (ids `t1`, `t2`, ...) with per-call gates and
/// queued failures. Gates and failures are handed out in call order.
pub struct ScriptedStore {
    backing: InMemoryTaskStore,
    script: Mutex<Script>,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            backing: InMemoryTaskStore::with_sequential_ids("t"),
            script: Mutex::new(Script::default()),
        })
    }

    pub fn seed(&self, user: &str, items: Vec<Item>) {
        self.backing.seed(&Identity::new(user), items);
    }

    pub fn remote(&self, user: &str) -> Vec<Item> {
        self.backing.snapshot(&Identity::new(user))
    }

    /// The next `op` call waits until the returned gate is notified.
    pub fn hold(&self, op: Op) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script
            .lock()
            .gates
            .entry(op)
            .or_default()
            .push_back(Arc::clone(&gate));
        gate
    }

    /// The next `op` call fails with `err` once released.
    pub fn fail_next(&self, op: Op, err: StoreError) {
        self.script
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<Op> {
        self.script.lock().calls.clone()
    }

    async fn enter(&self, op: Op) -> StoreResult<()> {
        let (gate, failure) = {
            let mut script = self.script.lock();
            script.calls.push(op);
            let gate = script.gates.get_mut(&op).and_then(VecDeque::pop_front);
            let failure = script.failures.get_mut(&op).and_then(VecDeque::pop_front);
            (gate, failure)
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        failure.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl TaskStore for ScriptedStore {
    async fn list(&self, identity: &Identity) -> StoreResult<Vec<Item>> {
        self.enter(Op::List).await?;
        self.backing.list(identity).await
    }

    async fn create(&self, identity: &Identity, item: &NewItem) -> StoreResult<ItemId> {
        self.enter(Op::Create).await?;
        self.backing.create(identity, item).await
    }

    async fn update(&self, identity: &Identity, item: &Item) -> StoreResult<()> {
        self.enter(Op::Update).await?;
        self.backing.update(identity, item).await
    }

    async fn delete(&self, identity: &Identity, id: &ItemId) -> StoreResult<()> {
        self.enter(Op::Delete).await?;
        self.backing.delete(identity, id).await
    }
}

pub fn item(id: &str, description: &str, date: &str, time: &str) -> Item {
    NewItem::new(description, date, time).into_item(ItemId::new(id))
}

pub fn meeting() -> Item {
    item("t1", "Meeting", "2024-05-01", "10:00")
}

pub fn offline() -> StoreError {
    StoreError::unavailable("network unreachable")
}

/// Lets other branches of a `join!` run a few polls.
pub async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

pub const WAIT: Duration = Duration::from_secs(5);
