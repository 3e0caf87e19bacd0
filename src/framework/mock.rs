//! # Mock Framework
//!
//! Utilities for testing consumers and supervisors without real services.
//!
//! [`MockExecutor`] plays a [`CommandExecutor`] from a queue of expectations:
//!
//! ```ignore
//! let mut users = MockExecutor::<User>::new();
//! users.expect_create().return_ok(alice.clone());
//! users.expect_delete("u-123").return_ok("u-123".to_string());
//!
//! let executors = Executors::new(users.executor(), computers.executor());
//! // ... run a consumer ...
//! users.verify(); // every expectation consumed, no unexpected call
//! ```
//!
//! Calls that do not match the next expectation are answered with
//! [`ExecutorError::Storage`] and reported by [`MockExecutor::verify`] instead of
//! panicking inside a consumer task.

use crate::framework::error::ExecutorError;
use crate::framework::executor::CommandExecutor;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

enum Expectation<T> {
    Create(Reply<T>),
    Read { id: String, reply: Reply<T> },
    Update(Reply<String>),
    Delete { id: String, reply: Reply<String> },
    List(Reply<Vec<T>>),
}

struct Reply<R> {
    delay: Option<Duration>,
    response: Result<R, ExecutorError>,
}

/// A call the mock has received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call<T> {
    Create(T),
    Read(String),
    Update(T),
    Delete(String),
    List,
}

struct MockState<T> {
    expectations: VecDeque<Expectation<T>>,
    calls: Vec<Call<T>>,
    unexpected: Vec<String>,
}

type Shared<T> = Arc<Mutex<MockState<T>>>;

fn lock<T>(state: &Shared<T>) -> MutexGuard<'_, MockState<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An expectation-driven command executor.
pub struct MockExecutor<T> {
    state: Shared<T>,
}

impl<T> Default for MockExecutor<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MockExecutor<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    /// Creates a mock with no expectations.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                expectations: VecDeque::new(),
                calls: Vec::new(),
                unexpected: Vec::new(),
            })),
        }
    }

    /// Returns the executor handle to wire into [`Executors`](crate::framework::Executors).
    pub fn executor(&self) -> Arc<dyn CommandExecutor<Entity = T>> {
        Arc::new(MockHandle {
            state: self.state.clone(),
        })
    }

    /// Expects a `create` call.
    pub fn expect_create(&mut self) -> ExpectationBuilder<T, T> {
        ExpectationBuilder::new(self.state.clone(), |reply| Expectation::Create(reply))
    }

    /// Expects a `read(id)` call.
    pub fn expect_read(&mut self, id: impl Into<String>) -> ExpectationBuilder<T, T> {
        let id = id.into();
        ExpectationBuilder::new(self.state.clone(), move |reply| Expectation::Read { id, reply })
    }

    /// Expects an `update` call.
    pub fn expect_update(&mut self) -> ExpectationBuilder<T, String> {
        ExpectationBuilder::new(self.state.clone(), |reply| Expectation::Update(reply))
    }

    /// Expects a `delete(id)` call.
    pub fn expect_delete(&mut self, id: impl Into<String>) -> ExpectationBuilder<T, String> {
        let id = id.into();
        ExpectationBuilder::new(self.state.clone(), move |reply| Expectation::Delete { id, reply })
    }

    /// Expects a `list` call.
    pub fn expect_list(&mut self) -> ExpectationBuilder<T, Vec<T>> {
        ExpectationBuilder::new(self.state.clone(), |reply| Expectation::List(reply))
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<Call<T>> {
        lock(&self.state).calls.clone()
    }

    /// Verifies that all expectations were met and nothing unexpected arrived.
    pub fn verify(&self) {
        let state = lock(&self.state);
        if !state.unexpected.is_empty() {
            panic!("Unexpected calls: {:?}", state.unexpected);
        }
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
    }
}

/// Builder for one expectation. Nothing is recorded until a `return_*` call.
pub struct ExpectationBuilder<T, R> {
    state: Shared<T>,
    delay: Option<Duration>,
    make: Box<dyn FnOnce(Reply<R>) -> Expectation<T> + Send>,
}

impl<T, R> ExpectationBuilder<T, R> {
    fn new(
        state: Shared<T>,
        make: impl FnOnce(Reply<R>) -> Expectation<T> + Send + 'static,
    ) -> Self {
        Self {
            state,
            delay: None,
            make: Box::new(make),
        }
    }

    /// Holds the call for `delay` before answering.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: R) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: ExecutorError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<R, ExecutorError>) {
        let expectation = (self.make)(Reply {
            delay: self.delay,
            response,
        });
        lock(&self.state).expectations.push_back(expectation);
    }
}

// =============================================================================
// EXECUTOR HANDLE
// =============================================================================

struct MockHandle<T> {
    state: Shared<T>,
}

impl<T> MockHandle<T> {
    /// Records `call` and pops the next expectation if `accept` takes it.
    fn next<R>(
        &self,
        call: Call<T>,
        accept: impl FnOnce(Expectation<T>) -> Result<Reply<R>, Expectation<T>>,
    ) -> Reply<R>
    where
        T: Debug,
    {
        let mut state = lock(&self.state);
        let description = format!("{call:?}");
        state.calls.push(call);

        let mismatch = match state.expectations.pop_front() {
            Some(expectation) => match accept(expectation) {
                Ok(reply) => return reply,
                Err(expectation) => {
                    state.expectations.push_front(expectation);
                    description
                }
            },
            None => description,
        };

        state.unexpected.push(mismatch.clone());
        Reply {
            delay: None,
            response: Err(ExecutorError::Storage(format!("unexpected call {mismatch}"))),
        }
    }
}

async fn answer<R>(reply: Reply<R>) -> Result<R, ExecutorError> {
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    reply.response
}

#[async_trait]
impl<T> CommandExecutor for MockHandle<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    type Entity = T;

    async fn create(&self, entity: T) -> Result<T, ExecutorError> {
        let reply = self.next(Call::Create(entity), |e| match e {
            Expectation::Create(reply) => Ok(reply),
            other => Err(other),
        });
        answer(reply).await
    }

    async fn read(&self, id: &str) -> Result<T, ExecutorError> {
        let reply = self.next(Call::Read(id.to_string()), |e| match e {
            Expectation::Read { id: expected, reply } if expected == id => Ok(reply),
            other => Err(other),
        });
        answer(reply).await
    }

    async fn update(&self, entity: T) -> Result<String, ExecutorError> {
        let reply = self.next(Call::Update(entity), |e| match e {
            Expectation::Update(reply) => Ok(reply),
            other => Err(other),
        });
        answer(reply).await
    }

    async fn delete(&self, id: &str) -> Result<String, ExecutorError> {
        let reply = self.next(Call::Delete(id.to_string()), |e| match e {
            Expectation::Delete { id: expected, reply } if expected == id => Ok(reply),
            other => Err(other),
        });
        answer(reply).await
    }

    async fn list(&self) -> Result<Vec<T>, ExecutorError> {
        let reply = self.next(Call::List, |e| match e {
            Expectation::List(reply) => Ok(reply),
            other => Err(other),
        });
        answer(reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;

    #[tokio::test]
    async fn test_mock_executor_with_expectations() {
        let alice = User::new("u-1", "Alice", 28, "a@x.com");

        let mut mock = MockExecutor::<User>::new();
        mock.expect_create().return_ok(alice.clone());
        mock.expect_read("u-1").return_ok(alice.clone());
        mock.expect_delete("u-1")
            .return_err(ExecutorError::NotFound("u-1".to_string()));

        let executor = mock.executor();
        assert_eq!(executor.create(alice.clone()).await.unwrap(), alice);
        assert_eq!(executor.read("u-1").await.unwrap().name, "Alice");
        assert_eq!(
            executor.delete("u-1").await,
            Err(ExecutorError::NotFound("u-1".to_string()))
        );

        assert_eq!(
            mock.calls(),
            vec![
                Call::Create(alice),
                Call::Read("u-1".to_string()),
                Call::Delete("u-1".to_string()),
            ]
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_mismatched_call_keeps_expectation() {
        let mut mock = MockExecutor::<User>::new();
        mock.expect_delete("u-1").return_ok("u-1".to_string());

        let executor = mock.executor();
        assert!(executor.delete("u-2").await.is_err());
        assert_eq!(executor.delete("u-1").await.unwrap(), "u-1");

        let state = lock(&mock.state);
        assert!(state.expectations.is_empty());
        assert_eq!(state.unexpected.len(), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "Not all expectations were met")]
    async fn test_verify_reports_missing_calls() {
        let mut mock = MockExecutor::<User>::new();
        mock.expect_list().return_ok(Vec::new());
        mock.verify();
    }
}
