//! Call results and execution strategy

use crate::dispatch::error::DispatchError;
use crate::error::Result;
use crate::http::Response;
use crate::value::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Where the send and decode steps of a call run
#[derive(Debug, Clone, Default)]
pub enum Executor {
    /// On the caller's task
    #[default]
    Inline,
    /// On a worker spawned onto the given runtime
    Spawn(Handle),
}

impl Executor {
    /// Spawn onto the runtime the caller is running in
    pub fn current() -> Self {
        Executor::Spawn(Handle::current())
    }
}

/// The result of a call
#[derive(Debug)]
pub enum Reply {
    /// A decoded value
    Value(Value),
    /// The raw response, for methods returning `Response`
    Response(Response),
    /// A call still running on a worker
    Pending(PendingReply),
}

impl Reply {
    pub fn is_pending(&self) -> bool {
        matches!(self, Reply::Pending(_))
    }

    /// Wait for a pending reply; completed replies are returned as-is
    pub async fn resolve(self) -> Result<Reply> {
        match self {
            Reply::Pending(pending) => pending.await,
            other => Ok(other),
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Reply::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Reply::Response(response) => Some(response),
            _ => None,
        }
    }
}

/// A call running on a worker. Resolves to a `Value` or `Response` reply.
#[derive(Debug)]
pub struct PendingReply {
    task: JoinHandle<Result<Reply>>,
}

impl PendingReply {
    pub(crate) fn new(task: JoinHandle<Result<Reply>>) -> Self {
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for PendingReply {
    type Output = Result<Reply>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) => {
                Poll::Ready(Err(DispatchError::Worker(join_error.to_string()).into()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_pending_reply_resolves() {
        let task = tokio::spawn(async { Ok(Reply::Value(Value::from("done"))) });
        let reply = Reply::Pending(PendingReply::new(task));
        assert!(reply.is_pending());

        let resolved = reply.resolve().await.expect("resolves");
        assert_eq!(resolved.into_value(), Some(Value::from("done")));
    }

    #[tokio::test]
    async fn test_panicking_worker_is_a_dispatch_error() {
        let task = tokio::spawn(async {
            if true {
                panic!("worker exploded");
            }
            Ok(Reply::Value(Value::Null))
        });
        let result = PendingReply::new(task).await;
        assert!(matches!(
            result,
            Err(Error::Dispatch(DispatchError::Worker(_)))
        ));
    }

    #[test]
    fn test_completed_reply_accessors() {
        let reply = Reply::Response(Response::new(204));
        assert!(!reply.is_pending());
        assert_eq!(reply.into_response().map(|r| r.status()), Some(204));
        assert_eq!(Reply::Value(Value::Null).into_response(), None);
    }
}
