use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use super::{AuthError, AuthProvider, Identity, IdentityWatch, Subscription};
use crate::validation::{validate_email, validate_password};

/// The process-wide authentication session.
///
/// Created once at startup with the provider handle and torn down with
/// [`AuthService::shutdown`]; nothing here lives in module-level state.
pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    current: Mutex<Option<Identity>>,
    watch: IdentityWatch,
    /// Held while subscribers are told about a value; orders transitions
    /// against new registrations.
    delivery: Mutex<()>,
}

impl AuthService {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            current: Mutex::new(None),
            watch: IdentityWatch::new(),
            delivery: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Identity>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn delivering(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transition(&self, identity: Option<Identity>) {
        let _delivery = self.delivering();
        *self.lock() = identity.clone();
        self.watch.notify(identity.as_ref());
    }

    /// Validate credentials locally, then sign in with the provider.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = validate_email(email)?;
        validate_password(password)?;

        let identity = self.provider.sign_in(&email, password).await.map_err(|e| {
            warn!(email = %email, error = %e, "Sign-in failed");
            e
        })?;
        info!(uid = %identity.uid, "Signed in");
        self.transition(Some(identity.clone()));
        Ok(identity)
    }

    /// Adopt an identity restored from a persisted session without a
    /// provider round-trip.
    pub fn restore(&self, identity: Identity) {
        info!(uid = %identity.uid, "Restored session");
        self.transition(Some(identity));
    }

    /// Sign out. Local state is cleared even when the provider call fails.
    pub async fn logout(&self) {
        if let Err(e) = self.provider.sign_out().await {
            warn!(error = %e, "Provider sign-out failed; clearing local session anyway");
        }
        if self.lock().is_some() {
            info!("Signed out");
            self.transition(None);
        }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.lock().clone()
    }

    /// Register for identity changes. The callback is invoked once right
    /// away with the current identity, then on every sign-in and sign-out.
    ///
    /// Callbacks must not sign in or out themselves.
    pub fn on_identity_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static,
    {
        let _delivery = self.delivering();
        let current = self.current_identity();
        callback(current.as_ref());
        self.watch.subscribe(callback)
    }

    pub fn shutdown(&self) {
        self.watch.close();
        *self.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn service() -> (Arc<MemoryBackend>, AuthService) {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_account("owner@maquis.ci", "motdepasse", "owner-1");
        let service = AuthService::new(backend.clone());
        (backend, service)
    }

    #[tokio::test]
    async fn test_login_notifies_subscribers() {
        let (_backend, service) = service();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = service.on_identity_changed(move |id| {
            sink.lock().unwrap().push(id.map(|i| i.uid.clone()));
        });

        service.login("Owner@Maquis.ci", "motdepasse").await.unwrap();
        service.logout().await;

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![None, Some("owner-1".to_string()), None]);
        assert!(service.current_identity().is_none());
    }

    #[test]
    fn test_subscribers_added_during_transitions_end_on_latest() {
        let (_backend, service) = service();
        let service = Arc::new(service);
        let writer = {
            let service = service.clone();
            std::thread::spawn(move || {
                for i in 0..400 {
                    let identity = (i % 2 == 0).then(|| Identity {
                        uid: format!("uid-{}", i),
                        email: "owner@maquis.ci".to_string(),
                        display_name: None,
                        token: "t".to_string(),
                    });
                    service.transition(identity);
                }
            })
        };

        let mut subscriptions = Vec::new();
        let mut last_seen = Vec::new();
        for _ in 0..100 {
            let last = Arc::new(Mutex::new(None));
            let sink = last.clone();
            subscriptions.push(service.on_identity_changed(move |id| {
                *sink.lock().unwrap() = Some(id.map(|i| i.uid.clone()));
            }));
            last_seen.push(last);
        }
        writer.join().unwrap();

        // The final transition is a sign-out
        assert!(service.current_identity().is_none());
        for last in last_seen {
            assert_eq!(*last.lock().unwrap(), Some(None));
        }
    }

    #[tokio::test]
    async fn test_login_validates_before_network() {
        let (backend, service) = service();
        let err = service.login("not-an-email", "motdepasse").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        let err = service.login("owner@maquis.ci", "123").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(backend.call_count(crate::memory::Operation::SignIn), 0);
    }

    #[tokio::test]
    async fn test_failed_login_keeps_signed_out() {
        let (_backend, service) = service();
        let err = service.login("owner@maquis.ci", "wrong-password").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(service.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_clears_state() {
        let (_backend, service) = service();
        service.login("owner@maquis.ci", "motdepasse").await.unwrap();
        let _sub = service.on_identity_changed(|_| {});
        service.shutdown();
        assert!(service.current_identity().is_none());
    }
}
