//! Scripted connector shared by the lifecycle tests

#![allow(dead_code)]

use cache_lifeline::{ConnectionConfig, Connector, Error, LifecycleEvent, Link, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Connection produced by [`ScriptedConnector`]
#[derive(Default)]
pub struct MockLink {
    pub id: u32,
    lost: AtomicBool,
    notify: Notify,
    healthy: AtomicBool,
    hang: AtomicBool,
    closed: AtomicBool,
}

impl MockLink {
    fn new(id: u32) -> Self {
        Self {
            id,
            healthy: AtomicBool::new(true),
            ..Default::default()
        }
    }

    /// Simulate the remote end going away
    pub fn drop_connection(&self) {
        self.lost.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Make the next health checks fail without flagging loss
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Make the next health checks never answer
    pub fn hang_health_checks(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Newtype so the test can keep its own reference to each link
pub struct MockHandle(pub Arc<MockLink>);

impl std::ops::Deref for MockHandle {
    type Target = MockLink;

    fn deref(&self) -> &MockLink {
        &self.0
    }
}

impl Link for MockHandle {
    fn is_lost(&self) -> bool {
        self.0.lost.load(Ordering::SeqCst)
    }

    fn lost(&self) -> impl Future<Output = ()> + Send + '_ {
        async move {
            loop {
                let notified = self.0.notify.notified();
                if self.is_lost() {
                    return;
                }
                notified.await;
            }
        }
    }

    fn health_check(&self) -> impl Future<Output = Result<()>> + Send + '_ {
        let healthy = self.0.healthy.load(Ordering::SeqCst);
        let hang = self.0.hang.load(Ordering::SeqCst);
        async move {
            if hang {
                std::future::pending::<()>().await;
            }
            if healthy {
                Ok(())
            } else {
                Err(Error::UnexpectedReply("no PONG".into()))
            }
        }
    }

    fn close(&self) -> impl Future<Output = ()> + Send + '_ {
        self.0.closed.store(true, Ordering::SeqCst);
        self.0.drop_connection();
        std::future::ready(())
    }
}

/// Shared script: `true` connects, `false` fails; an exhausted script fails
#[derive(Default)]
pub struct Script {
    outcomes: Mutex<VecDeque<bool>>,
    attempts: AtomicU32,
    links: Mutex<Vec<Arc<MockLink>>>,
}

impl Script {
    pub fn new(outcomes: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            ..Default::default()
        })
    }

    pub fn push(&self, outcomes: &[bool]) {
        self.outcomes.lock().unwrap().extend(outcomes.iter().copied());
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn last_link(&self) -> Arc<MockLink> {
        self.links
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no link opened yet")
    }

    pub fn links_opened(&self) -> usize {
        self.links.lock().unwrap().len()
    }
}

pub struct ScriptedConnector(pub Arc<Script>);

impl Connector for ScriptedConnector {
    type Link = MockHandle;

    fn connect<'a>(
        &'a self,
        _config: &'a ConnectionConfig,
    ) -> impl Future<Output = Result<MockHandle>> + Send + 'a {
        async move {
            let attempt = self.0.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let succeed = self.0.outcomes.lock().unwrap().pop_front().unwrap_or(false);
            if !succeed {
                return Err(Error::Connect(format!(
                    "scripted failure on attempt {}",
                    attempt
                )));
            }
            let link = Arc::new(MockLink::new(attempt));
            self.0.links.lock().unwrap().push(Arc::clone(&link));
            Ok(MockHandle(link))
        }
    }
}

/// Collects lifecycle events
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<LifecycleEvent>>>);

impl Recorder {
    pub fn observer(&self) -> impl Fn(&LifecycleEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.0);
        move |event: &LifecycleEvent| events.lock().unwrap().push(event.clone())
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.0.lock().unwrap().clone()
    }

    /// Retry counter carried by each reconnecting/ready/failed event, in order
    pub fn retry_counts(&self) -> Vec<u32> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                LifecycleEvent::Reconnecting { retry_count, .. }
                | LifecycleEvent::Ready { retry_count }
                | LifecycleEvent::Failed { retry_count } => Some(*retry_count),
                _ => None,
            })
            .collect()
    }
}

pub fn config() -> ConnectionConfig {
    ConnectionConfig::builder("cache.test", 6379)
        .health_check_interval(None)
        .build()
        .unwrap()
}
