//! ManualSource: events pushed in by the embedding host.
//!
//! Used to bridge motion feeds the library cannot read itself (a browser's
//! `devicemotion` stream relayed over a socket, a mobile shell, a replay) and
//! to drive sessions deterministically in tests.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::motion::{MotionEvent, Vector3};
use crate::source::{
    Capability, GrantDecision, MotionSource, SUBSCRIPTION_QUEUE, SourceInfo, SourceKind,
    Subscription, offer,
};

static MANUAL_INFO: SourceInfo = SourceInfo {
    name: "manual",
    description: "Host-fed motion events",
    kind: SourceKind::Manual,
    nominal_rate_hz: 60.0,
};

/// How a manual source answers a grant request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualGrant {
    Grant,
    Deny,
    /// The request itself fails with this message.
    Fail(String),
}

#[derive(Debug)]
struct Inner {
    capability: Capability,
    grant: Mutex<ManualGrant>,
    sender: Mutex<Option<mpsc::Sender<MotionEvent>>>,
}

/// Host-fed motion source. Clones share the same feed.
#[derive(Debug, Clone)]
pub struct ManualSource {
    inner: Arc<Inner>,
}

impl Default for ManualSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualSource {
    /// A source that needs no grant.
    pub fn new() -> Self {
        Self::build(Capability::Immediate, ManualGrant::Grant)
    }

    /// A source that must be granted first, answering with `grant`.
    pub fn requiring_grant(grant: ManualGrant) -> Self {
        Self::build(Capability::RequiresGrant, grant)
    }

    /// A source reporting no motion capability.
    pub fn unsupported() -> Self {
        Self::build(Capability::Unsupported, ManualGrant::Deny)
    }

    fn build(capability: Capability, grant: ManualGrant) -> Self {
        Self {
            inner: Arc::new(Inner {
                capability,
                grant: Mutex::new(grant),
                sender: Mutex::new(None),
            }),
        }
    }

    /// Change the answer given to subsequent grant requests.
    pub fn set_grant(&self, grant: ManualGrant) {
        *self.inner.grant.lock().unwrap_or_else(PoisonError::into_inner) = grant;
    }

    /// Push one event to the current subscriber.
    ///
    /// Returns `false` when nobody is subscribed. A full queue drops the
    /// event but still counts as delivered.
    pub fn emit(&self, event: MotionEvent) -> bool {
        let mut sender = self.inner.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            return false;
        };
        if offer(tx, event) {
            true
        } else {
            *sender = None;
            false
        }
    }

    /// Push a gravity-compensated reading on the vertical axis, stamped now.
    pub fn emit_vertical(&self, value: f64) -> bool {
        self.emit(MotionEvent::linear(
            crate::now_ms(),
            Vector3::new(0.0, 0.0, value),
        ))
    }

    /// End the feed from the source side, as a disconnected host would.
    pub fn disconnect(&self) {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Whether a live subscription is attached.
    pub fn is_subscribed(&self) -> bool {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

impl MotionSource for ManualSource {
    fn info(&self) -> &SourceInfo {
        &MANUAL_INFO
    }

    fn capability(&self) -> Capability {
        self.inner.capability
    }

    fn request_grant(&self) -> std::io::Result<GrantDecision> {
        let grant = self.inner.grant.lock().unwrap_or_else(PoisonError::into_inner);
        match &*grant {
            ManualGrant::Grant => Ok(GrantDecision::Granted),
            ManualGrant::Deny => Ok(GrantDecision::Denied),
            ManualGrant::Fail(msg) => Err(std::io::Error::other(msg.clone())),
        }
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_QUEUE);
        *self.inner.sender.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        Subscription::new(rx, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscriber_fails() {
        let source = ManualSource::new();
        assert!(!source.is_subscribed());
        assert!(!source.emit_vertical(1.0));
    }

    #[tokio::test]
    async fn emitted_events_reach_subscriber() {
        let source = ManualSource::new();
        let mut sub = source.subscribe();
        assert!(source.is_subscribed());
        assert!(source.emit_vertical(0.5));
        let event = sub.recv().await.unwrap();
        assert_eq!(event.acceleration.unwrap().z, Some(0.5));
    }

    #[tokio::test]
    async fn dropping_subscription_releases_feed() {
        let source = ManualSource::new();
        let sub = source.subscribe();
        drop(sub);
        assert!(!source.is_subscribed());
        assert!(!source.emit_vertical(1.0));
    }

    #[tokio::test]
    async fn disconnect_ends_subscription() {
        let source = ManualSource::new();
        let mut sub = source.subscribe();
        source.emit_vertical(2.0);
        source.disconnect();
        assert!(sub.recv().await.is_some());
        assert!(sub.recv().await.is_none());
        assert!(!source.is_subscribed());
    }

    #[test]
    fn grant_script() {
        let source = ManualSource::requiring_grant(ManualGrant::Deny);
        assert_eq!(source.capability(), Capability::RequiresGrant);
        assert_eq!(source.request_grant().unwrap(), GrantDecision::Denied);

        source.set_grant(ManualGrant::Fail("insecure context".into()));
        let err = source.request_grant().unwrap_err();
        assert_eq!(err.to_string(), "insecure context");

        source.set_grant(ManualGrant::Grant);
        assert_eq!(source.request_grant().unwrap(), GrantDecision::Granted);
    }

    #[test]
    fn clones_share_feed() {
        let a = ManualSource::unsupported();
        let b = a.clone();
        assert_eq!(b.capability(), Capability::Unsupported);
        assert!(!a.is_subscribed());
    }
}
