//! Permission and capability gate.
//!
//! Decides whether continuous motion sampling may start, and keeps the
//! observable `is_monitoring` flag and the last human-readable error.

use crate::error::AccessError;
use crate::source::{Capability, GrantDecision, MotionSource};

/// Proof that access was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Granted {
    /// Whether an explicit grant prompt was issued for this call.
    pub prompted: bool,
}

/// Tracks grant state across start/stop cycles of one session.
#[derive(Debug, Default)]
pub struct PermissionGate {
    granted: bool,
    monitoring: bool,
    error: Option<String>,
}

impl PermissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain access to `source`, prompting only when the source needs it and
    /// no grant was obtained before.
    pub fn request_access(&mut self, source: &dyn MotionSource) -> Result<Granted, AccessError> {
        match self.negotiate(source) {
            Ok(granted) => {
                self.granted = true;
                self.monitoring = true;
                self.error = None;
                log::info!("motion access granted for {}", source.name());
                Ok(granted)
            }
            Err(e) => {
                self.monitoring = false;
                self.error = Some(e.to_string());
                log::warn!("motion access for {} failed: {e}", source.name());
                Err(e)
            }
        }
    }

    fn negotiate(&self, source: &dyn MotionSource) -> Result<Granted, AccessError> {
        match source.capability() {
            Capability::Unsupported => Err(AccessError::Unsupported),
            Capability::Immediate => Ok(Granted { prompted: false }),
            Capability::RequiresGrant if self.granted => Ok(Granted { prompted: false }),
            Capability::RequiresGrant => match source.request_grant() {
                Ok(GrantDecision::Granted) => Ok(Granted { prompted: true }),
                Ok(GrantDecision::Denied) => Err(AccessError::PermissionDenied),
                Err(e) => Err(AccessError::Transport(e.to_string())),
            },
        }
    }

    /// Stop monitoring. The grant itself is kept for the next start.
    pub fn stop(&mut self) {
        self.monitoring = false;
    }

    /// Record a failure that ended monitoring from the source side.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.monitoring = false;
        self.error = Some(message.into());
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }

    /// Last failure message, cleared by the next successful request.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{ManualGrant, ManualSource};

    #[test]
    fn unsupported_fails() {
        let mut gate = PermissionGate::new();
        let err = gate.request_access(&ManualSource::unsupported()).unwrap_err();
        assert_eq!(err, AccessError::Unsupported);
        assert!(!gate.is_monitoring());
        assert!(gate.error().is_some());
    }

    #[test]
    fn immediate_succeeds_without_prompt() {
        let mut gate = PermissionGate::new();
        let granted = gate.request_access(&ManualSource::new()).unwrap();
        assert!(!granted.prompted);
        assert!(gate.is_monitoring());
        assert!(gate.error().is_none());
    }

    #[test]
    fn explicit_grant_prompts_once() {
        let source = ManualSource::requiring_grant(ManualGrant::Grant);
        let mut gate = PermissionGate::new();
        assert!(gate.request_access(&source).unwrap().prompted);

        // A later denial script must not matter: the grant is remembered.
        source.set_grant(ManualGrant::Deny);
        gate.stop();
        assert!(!gate.is_monitoring());
        assert!(!gate.request_access(&source).unwrap().prompted);
        assert!(gate.is_monitoring());
    }

    #[test]
    fn denial_sets_message() {
        let mut gate = PermissionGate::new();
        let source = ManualSource::requiring_grant(ManualGrant::Deny);
        assert_eq!(
            gate.request_access(&source).unwrap_err(),
            AccessError::PermissionDenied
        );
        assert!(!gate.is_monitoring());
        assert_eq!(
            gate.error(),
            Some("permission to read motion data was denied")
        );
    }

    #[test]
    fn failing_request_is_transport_error() {
        let mut gate = PermissionGate::new();
        let source = ManualSource::requiring_grant(ManualGrant::Fail("not a secure context".into()));
        let err = gate.request_access(&source).unwrap_err();
        assert_eq!(err, AccessError::Transport("not a secure context".into()));
    }

    #[test]
    fn success_clears_previous_error() {
        let mut gate = PermissionGate::new();
        let source = ManualSource::requiring_grant(ManualGrant::Deny);
        let _ = gate.request_access(&source);
        assert!(gate.error().is_some());

        source.set_grant(ManualGrant::Grant);
        gate.request_access(&source).unwrap();
        assert!(gate.error().is_none());
        assert!(gate.is_monitoring());
    }

    #[test]
    fn source_failure_stops_monitoring() {
        let mut gate = PermissionGate::new();
        gate.request_access(&ManualSource::new()).unwrap();
        gate.fail("motion source ended");
        assert!(!gate.is_monitoring());
        assert!(gate.is_granted());
        assert_eq!(gate.error(), Some("motion source ended"));
    }
}
