//! Crawl queue seam.
//!
//! Follow-up requests accumulate on the request being processed; the
//! orchestrator drains them into a queue set with three priority lanes.
//! Backends (in-memory, message bus) implement `QueueSet`; the one here
//! backs tests and single-process deployments.

use crate::request::{Priority, Queued, Request};
use anyhow::Error;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

#[async_trait]
pub trait QueueSet: Send + Sync {
    /// Appends requests to the lane for `priority`.
    async fn push(&self, priority: Priority, requests: Vec<Request>) -> Result<(), Error>;
}

#[derive(Debug, Default)]
struct Lanes {
    immediate: VecDeque<Request>,
    soon: VecDeque<Request>,
    normal: VecDeque<Request>,
}

/// In-memory queue set. Pops drain `immediate` before `soon` before
/// the default lane.
#[derive(Debug, Default)]
pub struct MemoryQueueSet {
    lanes: Mutex<Lanes>,
}

impl MemoryQueueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains a processed request's outbox into the lanes.
    pub async fn push_outbox(&self, request: &mut Request) -> Result<(), Error> {
        for Queued { priority, request } in request.take_queued() {
            self.push(priority, vec![request]).await?;
        }
        Ok(())
    }

    pub async fn pop(&self) -> Option<Request> {
        let mut lanes = self.lanes.lock().await;
        lanes
            .immediate
            .pop_front()
            .or_else(|| lanes.soon.pop_front())
            .or_else(|| lanes.normal.pop_front())
    }

    pub async fn len(&self) -> usize {
        let lanes = self.lanes.lock().await;
        lanes.immediate.len() + lanes.soon.len() + lanes.normal.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl QueueSet for MemoryQueueSet {
    async fn push(&self, priority: Priority, requests: Vec<Request>) -> Result<(), Error> {
        let mut lanes = self.lanes.lock().await;
        let lane = match priority {
            Priority::Immediate => &mut lanes.immediate,
            Priority::Soon => &mut lanes.soon,
            Priority::Normal => &mut lanes.normal,
        };
        lane.extend(requests);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Kind;

    #[tokio::test]
    async fn test_push_outbox_drains_into_lanes() {
        let queues = MemoryQueueSet::new();
        let mut request = Request::new(Kind::Org, "https://api.github.com/orgs/acme");
        request.queue_root(Kind::User, "https://api.github.com/users/acme");
        request.queue_requests(
            vec![Request::new(Kind::UpdateEvents, "https://api.github.com/orgs/acme/events")],
            Priority::Immediate,
        );

        queues.push_outbox(&mut request).await.unwrap();
        assert!(request.queued().is_empty());
        assert_eq!(2, queues.len().await);
        // the immediate lane drains first
        assert_eq!(Kind::UpdateEvents, queues.pop().await.unwrap().kind());
        assert_eq!(Kind::User, queues.pop().await.unwrap().kind());
    }

    #[tokio::test]
    async fn test_priority_ordering() {
        let queues = MemoryQueueSet::new();
        queues
            .push(Priority::Normal, vec![Request::new(Kind::User, "https://x.test/u")])
            .await
            .unwrap();
        queues
            .push(Priority::Immediate, vec![Request::new(Kind::UpdateEvents, "https://x.test/e")])
            .await
            .unwrap();
        queues
            .push(Priority::Soon, vec![Request::new(Kind::Repos, "https://x.test/r")])
            .await
            .unwrap();

        assert_eq!(Kind::UpdateEvents, queues.pop().await.unwrap().kind());
        assert_eq!(Kind::Repos, queues.pop().await.unwrap().kind());
        assert_eq!(Kind::User, queues.pop().await.unwrap().kind());
        assert!(queues.is_empty().await);
    }
}
