// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request coalescing across one unit of work.
//!
//! Callers submit keyed reads and writes and receive a [`PendingResult`]
//! immediately. Nothing is sent until the owner of the unit of work calls
//! [`RequestCoalescer::dispatch`], which drains the pending set, groups it by
//! server and issues one bulk read and one bulk write per server through a
//! [`BulkAccess`] backend.
//!
//! # Dispatch
//!
//! ```text
//!   read(k1) read(k2) write(k3) read(k4)        (any task, any order)
//!       │        │        │        │
//!       ▼        ▼        ▼        ▼
//!   ┌──────────────────────────────────────┐
//!   │     pending set (parking_lot Mutex)  │
//!   └──────────────────┬───────────────────┘
//!                      │ dispatch()
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//!   writes by server          reads by server
//!   (join_all, one call       (join_all, one call
//!    per server)               per server)
//!          │                       │
//!          └──────► scatter ◄──────┘
//!             positional, latency of the
//!             whole call on every result
//! ```
//!
//! Writes of a dispatch complete before its reads start, so a read of an
//! attribute written in the same unit of work observes the new value.
//! Within a server group the backend's result list is aligned with the
//! order in which requests were submitted. A failure of one server's call
//! resolves every request of that group with the same error and leaves
//! other servers untouched.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{AccessError, AccessResult};
use crate::key::{ReadKey, WriteKey};

// =============================================================================
// BulkAccess
// =============================================================================

/// Backend that performs one bulk call for a server's group of requests.
///
/// An `Err` return fails the whole group. An `Ok` list must be positionally
/// aligned with `keys`; individual entries may carry per-item failures.
#[async_trait]
pub trait BulkAccess: Send + Sync + 'static {
    /// Successful read payload.
    type Reading: Send + 'static;

    /// Successful write payload.
    type Written: Send + 'static;

    /// Reads every key of one server in a single call.
    async fn read_batch(
        &self,
        server: &str,
        keys: &[ReadKey],
    ) -> AccessResult<Vec<AccessResult<Self::Reading>>>;

    /// Writes every key of one server in a single call.
    async fn write_batch(
        &self,
        server: &str,
        keys: &[WriteKey],
    ) -> AccessResult<Vec<AccessResult<Self::Written>>>;
}

// =============================================================================
// AttributeResult
// =============================================================================

/// Final result of one request: the outcome plus the round-trip time of the
/// bulk call it travelled in.
#[derive(Debug, Clone)]
pub struct AttributeResult<T> {
    outcome: AccessResult<T>,
    latency: Option<Duration>,
}

impl<T> AttributeResult<T> {
    /// Creates a result.
    pub fn new(outcome: AccessResult<T>, latency: Option<Duration>) -> Self {
        Self { outcome, latency }
    }

    /// Creates a failure that never reached a bulk call.
    pub fn failed(error: AccessError) -> Self {
        Self::new(Err(error), None)
    }

    /// Returns the outcome.
    pub fn outcome(&self) -> &AccessResult<T> {
        &self.outcome
    }

    /// Returns the success value, if any.
    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// Returns the failure, if any.
    pub fn error(&self) -> Option<&AccessError> {
        self.outcome.as_ref().err()
    }

    /// Returns `true` on success.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Wall-clock time of the bulk call, shared by every result of its group.
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    /// Consumes the result, discarding the latency.
    pub fn into_result(self) -> AccessResult<T> {
        self.outcome
    }
}

// =============================================================================
// PendingResult
// =============================================================================

/// Single-assignment result slot returned by `read`/`write`.
///
/// Resolves once the dispatch that carries the request finishes. If the
/// coalescer is dropped with the request still pending, resolves to
/// [`AccessError::Cancelled`].
#[derive(Debug)]
pub struct PendingResult<T> {
    rx: oneshot::Receiver<AttributeResult<T>>,
}

impl<T> PendingResult<T> {
    fn ready(result: AttributeResult<T>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }
}

impl<T> Future for PendingResult<T> {
    type Output = AttributeResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(AttributeResult::failed(AccessError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

// =============================================================================
// Configuration & Statistics
// =============================================================================

/// Coalescer settings.
#[derive(Debug, Clone, Default)]
pub struct CoalescerConfig {
    /// Deadline for each bulk call. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

impl CoalescerConfig {
    /// Sets the per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

/// Counters over the coalescer's lifetime.
#[derive(Debug, Default)]
pub struct CoalescerStats {
    dispatches: AtomicU64,
    requests: AtomicU64,
    bulk_calls: AtomicU64,
    failed_calls: AtomicU64,
}

impl CoalescerStats {
    /// Returns a point-in-time copy of the counters.
    pub fn snapshot(&self) -> CoalescerStatsSnapshot {
        CoalescerStatsSnapshot {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            bulk_calls: self.bulk_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`CoalescerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoalescerStatsSnapshot {
    /// Non-empty dispatches.
    pub dispatches: u64,
    /// Requests resolved by dispatches.
    pub requests: u64,
    /// Bulk calls issued to the backend.
    pub bulk_calls: u64,
    /// Bulk calls that failed as a whole.
    pub failed_calls: u64,
}

/// What a single dispatch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Requests drained from the pending set.
    pub requests: usize,
    /// Bulk read calls issued.
    pub read_calls: usize,
    /// Bulk write calls issued.
    pub write_calls: usize,
    /// Calls that failed as a whole.
    pub failed_calls: usize,
}

// =============================================================================
// RequestCoalescer
// =============================================================================

struct Pending<K, T> {
    key: K,
    slot: oneshot::Sender<AttributeResult<T>>,
}

struct PendingSet<B: BulkAccess> {
    reads: Vec<Pending<ReadKey, B::Reading>>,
    writes: Vec<Pending<WriteKey, B::Written>>,
}

impl<B: BulkAccess> Default for PendingSet<B> {
    fn default() -> Self {
        Self {
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }
}

impl<B: BulkAccess> PendingSet<B> {
    fn len(&self) -> usize {
        self.reads.len() + self.writes.len()
    }
}

/// Collects keyed requests and dispatches them as per-server bulk calls.
pub struct RequestCoalescer<B: BulkAccess> {
    backend: Arc<B>,
    config: CoalescerConfig,
    pending: Mutex<PendingSet<B>>,
    stats: CoalescerStats,
}

impl<B: BulkAccess> RequestCoalescer<B> {
    /// Creates a coalescer over a backend.
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_config(backend, CoalescerConfig::default())
    }

    /// Creates a coalescer with explicit settings.
    pub fn with_config(backend: Arc<B>, config: CoalescerConfig) -> Self {
        Self {
            backend,
            config,
            pending: Mutex::new(PendingSet::default()),
            stats: CoalescerStats::default(),
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Returns lifetime counters.
    pub fn stats(&self) -> CoalescerStatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of requests waiting for the next dispatch.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Queues a read for the next dispatch.
    pub fn read(&self, key: ReadKey) -> PendingResult<B::Reading> {
        let (slot, rx) = oneshot::channel();
        self.pending.lock().reads.push(Pending { key, slot });
        PendingResult { rx }
    }

    /// Queues a write for the next dispatch.
    pub fn write(&self, key: WriteKey) -> PendingResult<B::Written> {
        let (slot, rx) = oneshot::channel();
        self.pending.lock().writes.push(Pending { key, slot });
        PendingResult { rx }
    }

    /// Parses a wire-format read key and queues it.
    ///
    /// A malformed key resolves immediately with `InvalidKey` and is never
    /// sent to a server.
    pub fn read_str(&self, key: &str) -> PendingResult<B::Reading> {
        match key.parse() {
            Ok(key) => self.read(key),
            Err(e) => PendingResult::ready(AttributeResult::failed(e)),
        }
    }

    /// Parses a wire-format write key and queues it.
    pub fn write_str(&self, key: &str) -> PendingResult<B::Written> {
        match key.parse() {
            Ok(key) => self.write(key),
            Err(e) => PendingResult::ready(AttributeResult::failed(e)),
        }
    }

    /// Submits every key, dispatches, and waits for all results in order.
    pub async fn read_all<I>(&self, keys: I) -> Vec<AttributeResult<B::Reading>>
    where
        I: IntoIterator<Item = ReadKey>,
    {
        let pending: Vec<_> = keys.into_iter().map(|k| self.read(k)).collect();
        self.dispatch().await;
        join_all(pending).await
    }

    /// Submits every key, dispatches, and waits for all results in order.
    pub async fn write_all<I>(&self, keys: I) -> Vec<AttributeResult<B::Written>>
    where
        I: IntoIterator<Item = WriteKey>,
    {
        let pending: Vec<_> = keys.into_iter().map(|k| self.write(k)).collect();
        self.dispatch().await;
        join_all(pending).await
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Drains the pending set and resolves every request in it.
    ///
    /// Requests submitted while this dispatch runs wait for the next one.
    pub async fn dispatch(&self) -> DispatchSummary {
        let batch = std::mem::take(&mut *self.pending.lock());
        let requests = batch.len();
        if requests == 0 {
            return DispatchSummary::default();
        }

        let writes = group_by_server(batch.writes, |k| k.server());
        let reads = group_by_server(batch.reads, |k| k.server());

        tracing::debug!(
            requests,
            write_servers = writes.len(),
            read_servers = reads.len(),
            "Dispatching coalesced batch"
        );

        let write_failures = join_all(
            writes
                .into_iter()
                .map(|(server, group)| self.dispatch_writes(server, group)),
        )
        .await;
        let read_failures = join_all(
            reads
                .into_iter()
                .map(|(server, group)| self.dispatch_reads(server, group)),
        )
        .await;

        let summary = DispatchSummary {
            requests,
            write_calls: write_failures.len(),
            read_calls: read_failures.len(),
            failed_calls: write_failures
                .iter()
                .chain(read_failures.iter())
                .filter(|failed| **failed)
                .count(),
        };

        self.stats.dispatches.fetch_add(1, Ordering::Relaxed);
        self.stats.requests.fetch_add(requests as u64, Ordering::Relaxed);
        self.stats.bulk_calls.fetch_add(
            (summary.read_calls + summary.write_calls) as u64,
            Ordering::Relaxed,
        );
        self.stats
            .failed_calls
            .fetch_add(summary.failed_calls as u64, Ordering::Relaxed);

        summary
    }

    async fn dispatch_reads(&self, server: String, group: Vec<Pending<ReadKey, B::Reading>>) -> bool {
        let (keys, slots): (Vec<_>, Vec<_>) = group.into_iter().map(|p| (p.key, p.slot)).unzip();

        let started = Instant::now();
        let reply = self
            .guarded(&server, self.backend.read_batch(&server, &keys))
            .await;
        let latency = started.elapsed();

        scatter(&server, &keys, slots, reply, latency, |k| k.node())
    }

    async fn dispatch_writes(
        &self,
        server: String,
        group: Vec<Pending<WriteKey, B::Written>>,
    ) -> bool {
        let (keys, slots): (Vec<_>, Vec<_>) = group.into_iter().map(|p| (p.key, p.slot)).unzip();

        let started = Instant::now();
        let reply = self
            .guarded(&server, self.backend.write_batch(&server, &keys))
            .await;
        let latency = started.elapsed();

        scatter(&server, &keys, slots, reply, latency, |k| k.node())
    }

    async fn guarded<F, T>(&self, server: &str, call: F) -> AccessResult<T>
    where
        F: Future<Output = AccessResult<T>>,
    {
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(AccessError::timeout(server, limit))),
            None => call.await,
        }
    }
}

impl<B: BulkAccess> std::fmt::Debug for RequestCoalescer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("config", &self.config)
            .field("pending", &self.pending_len())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

/// Groups requests by server, keeping first-seen server order and
/// submission order inside each group.
fn group_by_server<K, T>(
    pending: Vec<Pending<K, T>>,
    server_of: impl Fn(&K) -> &str,
) -> Vec<(String, Vec<Pending<K, T>>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Pending<K, T>>)> = Vec::new();

    for request in pending {
        let server = server_of(&request.key);
        match index.get(server) {
            Some(&i) => groups[i].1.push(request),
            None => {
                index.insert(server.to_string(), groups.len());
                groups.push((server.to_string(), vec![request]));
            }
        }
    }

    groups
}

/// Delivers a group's outcome to its slots. Returns `true` if the call
/// failed as a whole.
fn scatter<K, T>(
    server: &str,
    keys: &[K],
    slots: Vec<oneshot::Sender<AttributeResult<T>>>,
    reply: AccessResult<Vec<AccessResult<T>>>,
    latency: Duration,
    node_of: impl Fn(&K) -> &str,
) -> bool {
    match reply {
        Ok(items) => {
            if items.len() != slots.len() {
                tracing::warn!(
                    server = %server,
                    expected = slots.len(),
                    received = items.len(),
                    "Bulk call returned a misaligned result list"
                );
            }

            let mut items = items.into_iter();
            for (key, slot) in keys.iter().zip(slots) {
                let outcome = items.next().unwrap_or_else(|| {
                    Err(AccessError::remote_failure(
                        node_of(key),
                        "BadUnexpectedError",
                        0x8001_0000,
                    ))
                });
                // A dropped receiver only means the caller lost interest.
                let _ = slot.send(AttributeResult::new(outcome, Some(latency)));
            }

            tracing::trace!(
                server = %server,
                items = keys.len(),
                latency_ms = latency.as_secs_f64() * 1000.0,
                "Bulk call completed"
            );
            false
        }
        Err(error) => {
            error.log("bulk call");
            for slot in slots {
                let _ = slot.send(AttributeResult::new(Err(error.clone()), Some(latency)));
            }
            true
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    /// Echoes `server:node:attribute` for reads and the literal for writes.
    /// Servers named `down*` fail as a whole.
    #[derive(Default)]
    struct EchoBackend {
        read_calls: Mutex<Vec<(String, Vec<String>)>>,
        write_calls: Mutex<Vec<(String, Vec<String>)>>,
        values: Mutex<Map<String, String>>,
        short_by: usize,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl BulkAccess for EchoBackend {
        type Reading = String;
        type Written = ();

        async fn read_batch(
            &self,
            server: &str,
            keys: &[ReadKey],
        ) -> AccessResult<Vec<AccessResult<String>>> {
            self.read_calls
                .lock()
                .push((server.to_string(), keys.iter().map(|k| k.to_string()).collect()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if server.starts_with("down") {
                return Err(AccessError::connection_failure(server, "refused"));
            }
            let values = self.values.lock();
            let mut out: Vec<_> = keys
                .iter()
                .map(|k| {
                    if k.attribute() == "Bad" {
                        Err(AccessError::remote_failure(k.node(), "BadNotReadable", 0x803A_0000))
                    } else {
                        Ok(values
                            .get(&k.to_string())
                            .cloned()
                            .unwrap_or_else(|| format!("{}:{}:{}", server, k.node(), k.attribute())))
                    }
                })
                .collect();
            out.truncate(out.len().saturating_sub(self.short_by));
            Ok(out)
        }

        async fn write_batch(
            &self,
            server: &str,
            keys: &[WriteKey],
        ) -> AccessResult<Vec<AccessResult<()>>> {
            self.write_calls
                .lock()
                .push((server.to_string(), keys.iter().map(|k| k.to_string()).collect()));
            let mut values = self.values.lock();
            for key in keys {
                values.insert(key.target().to_string(), key.literal().to_string());
            }
            Ok(keys.iter().map(|_| Ok(())).collect())
        }
    }

    fn coalescer(backend: EchoBackend) -> RequestCoalescer<EchoBackend> {
        RequestCoalescer::new(Arc::new(backend))
    }

    #[tokio::test]
    async fn test_same_server_single_bulk_call() {
        let c = coalescer(EchoBackend::default());
        let a = c.read(ReadKey::new("S", "ns=2;i=1", "Value"));
        let b = c.read(ReadKey::new("S", "ns=2;i=2", "Value"));
        let d = c.read(ReadKey::new("S", "ns=2;i=3", "DisplayName"));

        let summary = c.dispatch().await;
        assert_eq!(summary.read_calls, 1);
        assert_eq!(summary.requests, 3);

        assert_eq!(a.await.into_result().unwrap(), "S:ns=2;i=1:Value");
        assert_eq!(b.await.into_result().unwrap(), "S:ns=2;i=2:Value");
        assert_eq!(d.await.into_result().unwrap(), "S:ns=2;i=3:DisplayName");

        let calls = c.backend().read_calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec!["S/ns=2;i=1/Value", "S/ns=2;i=2/Value", "S/ns=2;i=3/DisplayName"]);
    }

    #[tokio::test]
    async fn test_one_call_per_server() {
        let c = coalescer(EchoBackend::default());
        let keys = vec![
            ReadKey::new("A", "1", "Value"),
            ReadKey::new("B", "1", "Value"),
            ReadKey::new("A", "2", "Value"),
            ReadKey::new("C", "1", "Value"),
            ReadKey::new("B", "2", "Value"),
        ];
        let results = c.read_all(keys).await;

        let values: Vec<_> = results.into_iter().map(|r| r.into_result().unwrap()).collect();
        assert_eq!(values, vec!["A:1:Value", "B:1:Value", "A:2:Value", "C:1:Value", "B:2:Value"]);

        let calls = c.backend().read_calls.lock();
        assert_eq!(calls.len(), 3);
        let by_server: Map<_, _> = calls.iter().map(|(s, k)| (s.clone(), k.len())).collect();
        assert_eq!(by_server["A"], 2);
        assert_eq!(by_server["B"], 2);
        assert_eq!(by_server["C"], 1);
    }

    #[tokio::test]
    async fn test_group_failure_isolated_to_server() {
        let c = coalescer(EchoBackend::default());
        let results = c
            .read_all(vec![
                ReadKey::new("down1", "1", "Value"),
                ReadKey::new("up", "1", "Value"),
                ReadKey::new("down1", "2", "Value"),
            ])
            .await;

        assert!(matches!(results[0].error(), Some(AccessError::ConnectionFailure { .. })));
        assert_eq!(results[0].error(), results[2].error());
        assert_eq!(results[1].value().map(String::as_str), Some("up:1:Value"));
        assert_eq!(c.stats().failed_calls, 1);
    }

    #[tokio::test]
    async fn test_per_item_failure_does_not_affect_siblings() {
        let c = coalescer(EchoBackend::default());
        let results = c
            .read_all(vec![
                ReadKey::new("S", "1", "Bad"),
                ReadKey::new("S", "2", "Value"),
            ])
            .await;
        assert!(matches!(
            results[0].error(),
            Some(AccessError::RemoteOperationFailure { .. })
        ));
        assert!(results[1].is_ok());
    }

    #[tokio::test]
    async fn test_latency_shared_within_group() {
        let c = coalescer(EchoBackend::default());
        let results = c
            .read_all(vec![ReadKey::new("S", "1", "Value"), ReadKey::new("S", "2", "Value")])
            .await;
        let first = results[0].latency().unwrap();
        assert_eq!(results[1].latency(), Some(first));
    }

    #[tokio::test]
    async fn test_short_reply_still_resolves_every_slot() {
        let c = coalescer(EchoBackend {
            short_by: 1,
            ..Default::default()
        });
        let results = c
            .read_all(vec![ReadKey::new("S", "1", "Value"), ReadKey::new("S", "2", "Value")])
            .await;
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1].error(),
            Some(AccessError::RemoteOperationFailure { node, .. }) if node == "2"
        ));
    }

    #[tokio::test]
    async fn test_abandoned_request_does_not_block_others() {
        let c = coalescer(EchoBackend::default());
        let dropped = c.read(ReadKey::new("S", "1", "Value"));
        let kept = c.read(ReadKey::new("S", "2", "Value"));
        drop(dropped);

        c.dispatch().await;
        assert!(kept.await.is_ok());
    }

    #[tokio::test]
    async fn test_writes_complete_before_reads() {
        let c = coalescer(EchoBackend::default());
        let read = c.read(ReadKey::new("S", "ns=2;i=5", "Value"));
        let write = c.write("S/ns=2;i=5/Value/42/Int32".parse().unwrap());

        let summary = c.dispatch().await;
        assert_eq!(summary.write_calls, 1);
        assert_eq!(summary.read_calls, 1);
        assert!(write.await.is_ok());
        assert_eq!(read.await.into_result().unwrap(), "42");
    }

    #[tokio::test]
    async fn test_malformed_key_resolves_without_dispatch() {
        let c = coalescer(EchoBackend::default());
        let result = c.read_str("no-separators").await;
        assert!(matches!(result.error(), Some(AccessError::InvalidKey { .. })));
        assert_eq!(result.latency(), None);
        assert_eq!(c.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_empty_dispatch_is_noop() {
        let c = coalescer(EchoBackend::default());
        assert_eq!(c.dispatch().await, DispatchSummary::default());
        assert_eq!(c.stats().dispatches, 0);
    }

    #[tokio::test]
    async fn test_requests_after_dispatch_wait_for_next_tick() {
        let c = coalescer(EchoBackend::default());
        let first = c.read(ReadKey::new("S", "1", "Value"));
        c.dispatch().await;
        let second = c.read(ReadKey::new("S", "2", "Value"));
        assert!(first.await.is_ok());
        assert_eq!(c.pending_len(), 1);

        c.dispatch().await;
        assert!(second.await.is_ok());
        assert_eq!(c.backend().read_calls.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_fails_group() {
        let backend = EchoBackend {
            delay: Some(Duration::from_secs(3600)),
            ..Default::default()
        };
        let c = RequestCoalescer::with_config(
            Arc::new(backend),
            CoalescerConfig::default().with_call_timeout(Duration::from_millis(50)),
        );
        let results = c.read_all(vec![ReadKey::new("S", "1", "Value")]).await;
        assert!(matches!(results[0].error(), Some(AccessError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_dropped_coalescer_cancels_pending() {
        let c = coalescer(EchoBackend::default());
        let pending = c.read(ReadKey::new("S", "1", "Value"));
        drop(c);
        assert_eq!(pending.await.error(), Some(&AccessError::Cancelled));
    }
}
