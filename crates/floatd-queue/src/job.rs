// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request job aggregation.
//!
//! One [`Job`] exists per inbound HTTP request and holds the ordered set
//! of links it asked for. As entries resolve or fail, responses are
//! recorded; the moment no entry is Pending the outcome is flushed
//! through a oneshot exactly once, and the HTTP handler renders it as a
//! single object (`bulk == false`) or an array (`bulk == true`).

use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use floatd_core::error::{ErrorEnvelope, FloatdError};
use floatd_core::link::InspectLink;
use floatd_core::types::DecoratedItem;

/// A caller-visible failure frozen for a job entry: the stable envelope
/// plus the HTTP status it is served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobError {
    pub envelope: ErrorEnvelope,
    pub status: u16,
}

impl From<&FloatdError> for JobError {
    fn from(err: &FloatdError) -> Self {
        Self {
            envelope: err.envelope(),
            status: err.http_status(),
        }
    }
}

enum EntryState {
    Pending,
    Done(Result<DecoratedItem, JobError>),
}

struct JobEntry {
    link: InspectLink,
    price: Option<u64>,
    state: EntryState,
}

/// The flushed outcome of a completed job, in submission order.
#[derive(Debug)]
pub struct JobOutcome {
    pub bulk: bool,
    pub results: Vec<(String, Result<DecoratedItem, JobError>)>,
}

struct JobInner {
    entries: Vec<JobEntry>,
    tx: Option<oneshot::Sender<JobOutcome>>,
}

/// Aggregates the entries of one HTTP request.
pub struct Job {
    id: Uuid,
    ip: String,
    bulk: bool,
    inner: Mutex<JobInner>,
}

impl Job {
    /// Creates a job and the receiver its outcome is flushed to.
    pub fn new(ip: String, bulk: bool) -> (std::sync::Arc<Self>, oneshot::Receiver<JobOutcome>) {
        let (tx, rx) = oneshot::channel();
        let job = std::sync::Arc::new(Self {
            id: Uuid::new_v4(),
            ip,
            bulk,
            inner: Mutex::new(JobInner {
                entries: Vec::new(),
                tx: Some(tx),
            }),
        });
        (job, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn is_bulk(&self) -> bool {
        self.bulk
    }

    /// Adds a link before the job is enqueued. A repeated asset id
    /// replaces the earlier entry's price rather than duplicating it.
    pub fn add(&self, link: InspectLink, price: Option<u64>) {
        let mut inner = self.inner.lock().expect("job mutex poisoned");
        if let Some(existing) = inner.entries.iter_mut().find(|e| e.link.a == link.a) {
            existing.price = price;
            return;
        }
        inner.entries.push(JobEntry {
            link,
            price,
            state: EntryState::Pending,
        });
    }

    /// Links still awaiting a response, with their submitted prices.
    pub fn remaining_links(&self) -> Vec<(InspectLink, Option<u64>)> {
        let inner = self.inner.lock().expect("job mutex poisoned");
        inner
            .entries
            .iter()
            .filter(|e| matches!(e.state, EntryState::Pending))
            .map(|e| (e.link.clone(), e.price))
            .collect()
    }

    pub fn remaining_size(&self) -> usize {
        let inner = self.inner.lock().expect("job mutex poisoned");
        inner
            .entries
            .iter()
            .filter(|e| matches!(e.state, EntryState::Pending))
            .count()
    }

    /// The link for an asset id, if this job asked for it.
    pub fn link_for(&self, asset_id: &str) -> Option<InspectLink> {
        let inner = self.inner.lock().expect("job mutex poisoned");
        inner
            .entries
            .iter()
            .find(|e| e.link.a == asset_id)
            .map(|e| e.link.clone())
    }

    /// Records the response for one asset. A second response for the
    /// same asset is redundant and ignored. Flushes when nothing is
    /// Pending.
    pub fn set_response(&self, asset_id: &str, result: Result<DecoratedItem, JobError>) {
        let mut inner = self.inner.lock().expect("job mutex poisoned");
        let Some(entry) = inner.entries.iter_mut().find(|e| e.link.a == asset_id) else {
            debug!(job = %self.id, asset_id, "response for unknown asset ignored");
            return;
        };
        if matches!(entry.state, EntryState::Done(_)) {
            debug!(job = %self.id, asset_id, "duplicate response ignored");
            return;
        }
        entry.state = EntryState::Done(result);
        Self::flush_if_complete(self.bulk, &mut inner);
    }

    /// Fails every still-Pending entry with the same error and flushes.
    pub fn set_response_remaining(&self, err: &FloatdError) {
        let mut inner = self.inner.lock().expect("job mutex poisoned");
        let job_err = JobError::from(err);
        for entry in inner
            .entries
            .iter_mut()
            .filter(|e| matches!(e.state, EntryState::Pending))
        {
            entry.state = EntryState::Done(Err(job_err.clone()));
        }
        Self::flush_if_complete(self.bulk, &mut inner);
    }

    fn flush_if_complete(bulk: bool, inner: &mut JobInner) {
        let complete = !inner.entries.is_empty()
            && inner
                .entries
                .iter()
                .all(|e| matches!(e.state, EntryState::Done(_)));
        if !complete {
            return;
        }
        let Some(tx) = inner.tx.take() else {
            return;
        };
        let results = inner
            .entries
            .iter()
            .map(|e| {
                let result = match &e.state {
                    EntryState::Done(r) => r.clone(),
                    EntryState::Pending => unreachable!("checked complete above"),
                };
                (e.link.a.clone(), result)
            })
            .collect();
        let _ = tx.send(JobOutcome { bulk, results });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(a: &str) -> InspectLink {
        InspectLink::from_fields(a, "1", Some("2"), None).unwrap()
    }

    fn item(a: &str) -> DecoratedItem {
        DecoratedItem::from_raw(
            &link(a),
            floatd_core::types::RawItemInfo {
                itemid: a.to_string(),
                defindex: 7,
                paintindex: 282,
                rarity: 6,
                quality: 4,
                paintwear: 0.1,
                paintseed: Some(1),
                origin: None,
                customname: None,
                killeatervalue: None,
                stickers: vec![],
                keychains: vec![],
            },
        )
    }

    #[tokio::test]
    async fn flushes_once_when_all_entries_resolve() {
        let (job, rx) = Job::new("1.2.3.4".to_string(), true);
        job.add(link("1"), None);
        job.add(link("2"), Some(50));
        assert_eq!(job.remaining_size(), 2);

        job.set_response("1", Ok(item("1")));
        assert_eq!(job.remaining_size(), 1);
        job.set_response("2", Err(JobError::from(&FloatdError::TtlExceeded)));

        let outcome = rx.await.unwrap();
        assert!(outcome.bulk);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].0, "1");
        assert!(outcome.results[0].1.is_ok());
        assert_eq!(outcome.results[1].0, "2");
        assert_eq!(
            outcome.results[1].1.as_ref().unwrap_err().envelope.code,
            4
        );
    }

    #[tokio::test]
    async fn duplicate_and_unknown_responses_are_ignored() {
        let (job, rx) = Job::new("1.2.3.4".to_string(), false);
        job.add(link("1"), None);
        job.set_response("999", Ok(item("999")));
        assert_eq!(job.remaining_size(), 1);

        let mut first = item("1");
        first.floatvalue = 0.5;
        job.set_response("1", Ok(first));
        // Redundant second response must not change the recorded one.
        job.set_response("1", Ok(item("1")));

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].1.as_ref().unwrap().floatvalue, 0.5);
    }

    #[tokio::test]
    async fn set_response_remaining_fills_all_pending() {
        let (job, rx) = Job::new("1.2.3.4".to_string(), true);
        job.add(link("1"), None);
        job.add(link("2"), None);
        job.add(link("3"), None);
        job.set_response("2", Ok(item("2")));

        job.set_response_remaining(&FloatdError::SteamOffline);
        let outcome = rx.await.unwrap();
        assert!(outcome.results[0].1.is_err());
        assert!(outcome.results[1].1.is_ok());
        assert_eq!(
            outcome.results[2].1.as_ref().unwrap_err().envelope.code,
            5
        );
    }

    #[tokio::test]
    async fn repeated_asset_replaces_price_without_duplicating() {
        let (job, _rx) = Job::new("1.2.3.4".to_string(), false);
        job.add(link("1"), Some(10));
        job.add(link("1"), Some(20));
        let remaining = job.remaining_links();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].1, Some(20));
    }

    #[test]
    fn link_for_finds_entries() {
        let (job, _rx) = Job::new("1.2.3.4".to_string(), false);
        job.add(link("42"), None);
        assert!(job.link_for("42").is_some());
        assert!(job.link_for("43").is_none());
    }

    #[test]
    fn shutdown_error_folds_to_generic_envelope() {
        let err = JobError::from(&FloatdError::Shutdown);
        assert_eq!(err.envelope.code, 6);
        assert_eq!(err.status, 500);
    }
}
