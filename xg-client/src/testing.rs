//! In-memory gateway session for tests.
//!
//! Answers node queries from a queue of canned responses (consumed in
//! order, one per query) and, once the queue is empty, from a static node
//! tree. Actions succeed unless a failure has been registered for their
//! name. Every query and action is recorded for later assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::action::{Action, ActionResponse};
use crate::error::{Result, XgError};
use crate::node::{NodeValue, NodeValues};
use crate::session::XgSession;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A query or action, as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Query(Vec<String>),
    Action(&'static str),
}

#[derive(Debug, Default)]
pub struct ScriptedSession {
    queued: Mutex<VecDeque<NodeValues>>,
    tree: Mutex<NodeValues>,
    action_failures: Mutex<HashMap<&'static str, ActionResponse>>,
    actions: Mutex<Vec<Action>>,
    queries: Mutex<Vec<Vec<String>>>,
    calls: Mutex<Vec<Call>>,
    login_error: Mutex<Option<String>>,
    query_error: Mutex<Option<String>>,
    logins: AtomicUsize,
    closes: AtomicUsize,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next unanswered query.
    pub fn respond(self, values: NodeValues) -> Self {
        lock(&self.queued).push_back(values);
        self
    }

    /// Add a node to the static tree.
    pub fn with_node(self, path: impl Into<String>, value: impl Into<NodeValue>) -> Self {
        self.set_node(path, value);
        self
    }

    /// Make every action named `name` return `code`/`message`.
    pub fn fail_action(self, name: &'static str, code: i64, message: &str) -> Self {
        lock(&self.action_failures).insert(name, ActionResponse::failure(code, message));
        self
    }

    pub fn set_node(&self, path: impl Into<String>, value: impl Into<NodeValue>) {
        lock(&self.tree).insert(path, value);
    }

    pub fn remove_node(&self, path: &str) {
        lock(&self.tree).remove(path);
    }

    pub fn set_login_error(&self, reason: Option<&str>) {
        *lock(&self.login_error) = reason.map(str::to_string);
    }

    /// Make every node query fail at the transport level.
    pub fn set_query_error(&self, reason: Option<&str>) {
        *lock(&self.query_error) = reason.map(str::to_string);
    }

    /// Actions performed so far, oldest first.
    pub fn actions(&self) -> Vec<Action> {
        lock(&self.actions).clone()
    }

    pub fn action_names(&self) -> Vec<&'static str> {
        lock(&self.actions).iter().map(Action::name).collect()
    }

    /// Path lists of the queries made so far, oldest first.
    pub fn queries(&self) -> Vec<Vec<String>> {
        lock(&self.queries).clone()
    }

    /// Queries and actions interleaved in the order they were made.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl XgSession for ScriptedSession {
    async fn login(&self) -> Result<()> {
        if let Some(reason) = lock(&self.login_error).clone() {
            return Err(XgError::LoginFailed {
                gateway: "scripted".to_string(),
                reason,
            });
        }
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_node_values(&self, paths: &[String]) -> Result<NodeValues> {
        lock(&self.queries).push(paths.to_vec());
        lock(&self.calls).push(Call::Query(paths.to_vec()));

        if let Some(reason) = lock(&self.query_error).clone() {
            return Err(XgError::Request(reason));
        }
        if let Some(values) = lock(&self.queued).pop_front() {
            return Ok(values);
        }
        Ok(lock(&self.tree).select(paths))
    }

    async fn perform_action(&self, action: &Action) -> Result<ActionResponse> {
        lock(&self.actions).push(action.clone());
        lock(&self.calls).push(Call::Action(action.name()));

        let failure = lock(&self.action_failures).get(action.name()).cloned();
        Ok(failure.unwrap_or_else(ActionResponse::success))
    }
}
