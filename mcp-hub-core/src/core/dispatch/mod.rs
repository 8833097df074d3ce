//! Bounded asynchronous executor for dependency calls.
//!
//! At most `pool_size` calls run at once and at most `queue_capacity` more wait for a worker.
//! Submissions beyond that fail fast with [`DispatchError::Saturated`].
//! Every admitted call reports its outcome exactly once, even when the caller drops the handle.

use crate::base::CallError;
use crate::config::DispatcherConfig;
use crate::{logging, Error, Result};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{oneshot, Semaphore};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// the call ran and failed, or timed out
    Call(CallError),
    /// pool and queue are full, the call was never started
    Saturated,
    /// the worker went away before producing a result
    Canceled,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Call(err) => write!(f, "call failed: {}", err),
            DispatchError::Saturated => write!(f, "dispatcher saturated"),
            DispatchError::Canceled => write!(f, "dispatch canceled"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<CallError> for DispatchError {
    fn from(err: CallError) -> Self {
        DispatchError::Call(err)
    }
}

/// Resolves to the result of a dispatched call. Dropping it does not cancel the call.
#[derive(Debug)]
pub struct DispatchHandle<T> {
    rx: oneshot::Receiver<std::result::Result<T, CallError>>,
}

impl<T> Future for DispatchHandle<T> {
    type Output = std::result::Result<T, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| match res {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(DispatchError::Call(err)),
            Err(_) => Err(DispatchError::Canceled),
        })
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    pool_size: usize,
    capacity: usize,
    call_timeout: Duration,
    admission: Arc<Semaphore>,
    workers: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(config: &DispatcherConfig) -> Result<Self> {
        if config.pool_size == 0 {
            return Err(Error::msg("invalid dispatcher pool_size"));
        }
        if config.call_timeout_ms == 0 {
            return Err(Error::msg("invalid dispatcher call_timeout_ms"));
        }
        let capacity = config.pool_size + config.queue_capacity;
        Ok(Dispatcher {
            pool_size: config.pool_size,
            capacity,
            call_timeout: Duration::from_millis(config.call_timeout_ms),
            admission: Arc::new(Semaphore::new(capacity)),
            workers: Arc::new(Semaphore::new(config.pool_size)),
        })
    }

    #[inline]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    #[inline]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// calls running or waiting for a worker
    pub fn in_flight(&self) -> usize {
        self.capacity - self.admission.available_permits()
    }

    /// `submit` runs `task` on the pool. `on_complete` observes the result and the
    /// latency in milliseconds once the task finishes or its timeout fires,
    /// before the result is handed to the caller.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<T, F, C>(
        &self,
        task: F,
        on_complete: C,
    ) -> std::result::Result<DispatchHandle<T>, DispatchError>
    where
        T: Send + 'static,
        F: Future<Output = std::result::Result<T, CallError>> + Send + 'static,
        C: FnOnce(&std::result::Result<T, CallError>, u64) + Send + 'static,
    {
        let admitted = match Arc::clone(&self.admission).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                logging::warn!(
                    "[Dispatcher] Submission rejected, {} calls in flight",
                    self.capacity
                );
                #[cfg(feature = "exporter")]
                crate::exporter::add_dispatch_rejection();
                return Err(DispatchError::Saturated);
            }
        };
        let workers = Arc::clone(&self.workers);
        let call_timeout = self.call_timeout;
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let worker = match workers.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let started = Instant::now();
            let result = match tokio::time::timeout(call_timeout, task).await {
                Ok(result) => result,
                // the pending call is dropped here and its eventual answer discarded
                Err(_) => Err(CallError::timeout(call_timeout.as_millis() as u64)),
            };
            let latency_ms = started.elapsed().as_millis() as u64;
            on_complete(&result, latency_ms);
            drop(worker);
            drop(admitted);
            // the caller may have gone away already
            let _ = tx.send(result);
        });
        Ok(DispatchHandle { rx })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn dispatcher(pool_size: usize, queue_capacity: usize, call_timeout_ms: u64) -> Dispatcher {
        Dispatcher::new(&DispatcherConfig {
            pool_size,
            queue_capacity,
            call_timeout_ms,
        })
        .unwrap()
    }

    #[test]
    fn invalid_config() {
        assert!(Dispatcher::new(&DispatcherConfig {
            pool_size: 0,
            ..Default::default()
        })
        .is_err());
    }

    #[tokio::test]
    async fn returns_result_after_on_complete() {
        let d = dispatcher(2, 2, 1000);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        let handle = d
            .submit(async { Ok::<_, CallError>(42u32) }, move |res, _| {
                assert!(res.is_ok());
                seen2.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(handle.await, Ok(42));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn call_errors_pass_through() {
        let d = dispatcher(1, 0, 1000);
        let handle = d
            .submit(
                async { Err::<u32, _>(CallError::new(ErrorKind::BadRequest, "bad")) },
                |_, _| {},
            )
            .unwrap();
        assert_eq!(
            handle.await,
            Err(DispatchError::Call(CallError::new(ErrorKind::BadRequest, "bad")))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_recorded_when_it_fires() {
        let d = dispatcher(1, 0, 50);
        let recorded = Arc::new(Mutex::new(None));
        let recorded2 = Arc::clone(&recorded);
        let handle = d
            .submit(
                async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok::<_, CallError>(())
                },
                move |res, latency| {
                    *recorded2.lock().unwrap() = Some((res.clone(), latency));
                },
            )
            .unwrap();
        match handle.await {
            Err(DispatchError::Call(err)) => assert_eq!(err.kind, ErrorKind::ConnectionTimeout),
            other => panic!("unexpected {:?}", other),
        }
        let (res, latency) = recorded.lock().unwrap().clone().unwrap();
        assert_eq!(res.unwrap_err().kind, ErrorKind::ConnectionTimeout);
        assert!(latency >= 50 && latency < 10_000);
    }

    #[tokio::test]
    async fn saturation_fails_fast() {
        let d = dispatcher(1, 1, 5000);
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let release_rx = Arc::clone(&release_rx);
            handles.push(
                d.submit(
                    async move {
                        let rx = release_rx.lock().await.take();
                        if let Some(rx) = rx {
                            let _ = rx.await;
                        }
                        Ok::<_, CallError>(())
                    },
                    |_, _| {},
                )
                .unwrap(),
            );
        }
        assert_eq!(d.in_flight(), 2);
        let rejected = d.submit(async { Ok::<_, CallError>(()) }, |_, _| {});
        assert_eq!(rejected.err(), Some(DispatchError::Saturated));

        release_tx.send(()).unwrap();
        for h in handles {
            assert!(h.await.is_ok());
        }
        assert_eq!(d.in_flight(), 0);
    }

    #[tokio::test]
    async fn dropped_handle_still_records() {
        let d = dispatcher(1, 0, 1000);
        let (done_tx, done_rx) = oneshot::channel();
        let handle = d
            .submit(
                async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<_, CallError>(7u8)
                },
                move |res, _| {
                    let _ = done_tx.send(res.clone());
                },
            )
            .unwrap();
        drop(handle);
        assert_eq!(done_rx.await.unwrap(), Ok(7));
    }
}
