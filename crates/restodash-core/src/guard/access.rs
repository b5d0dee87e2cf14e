use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::{AuthService, Identity, Subscription};
use crate::models::{RouteId, StaffMember};
use crate::store::StaffDirectory;

/// How much of the dashboard an identity is restricted to.
#[derive(Debug, Clone, PartialEq)]
pub enum StaffAccess {
    /// No staff record: the restaurant owner (or no one signed in).
    Unrestricted,
    /// A staff record was found for the identity's email.
    Staff(StaffMember),
    /// The staff lookup failed; treated as restricted with no grants.
    Unresolved,
}

impl StaffAccess {
    pub fn is_restricted(&self) -> bool {
        !matches!(self, StaffAccess::Unrestricted)
    }

    /// Active admin records only.
    pub fn is_admin(&self) -> bool {
        matches!(self, StaffAccess::Staff(member) if member.active && member.is_admin())
    }

    /// Explicit grants; empty for inactive or unresolved records.
    pub fn permissions(&self) -> BTreeSet<RouteId> {
        match self {
            StaffAccess::Staff(member) if member.active => member.permissions.clone(),
            _ => BTreeSet::new(),
        }
    }

    pub fn staff(&self) -> Option<&StaffMember> {
        match self {
            StaffAccess::Staff(member) => Some(member),
            _ => None,
        }
    }
}

/// Derived per-identity view; never stored, recomputed on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub identity: Option<Identity>,
    pub access: StaffAccess,
}

impl Session {
    pub fn signed_out() -> Self {
        Self {
            identity: None,
            access: StaffAccess::Unrestricted,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// Turns identity changes into `Session`s by looking up staff records.
pub struct SessionResolver {
    directory: Arc<dyn StaffDirectory>,
    sessions: watch::Sender<Session>,
}

impl SessionResolver {
    pub fn new(directory: Arc<dyn StaffDirectory>) -> Self {
        let (sessions, _) = watch::channel(Session::signed_out());
        Self { directory, sessions }
    }

    /// Resolve and publish the session for `identity`.
    pub async fn resolve(&self, identity: Option<Identity>) -> Session {
        let access = match identity {
            None => StaffAccess::Unrestricted,
            Some(ref identity) => self.lookup(identity).await,
        };
        let session = Session { identity, access };
        self.sessions.send_replace(session.clone());
        session
    }

    async fn lookup(&self, identity: &Identity) -> StaffAccess {
        match self.directory.get_by_email(&identity.email).await {
            Ok(Some(member)) => {
                debug!(email = %identity.email, role = %member.role, active = member.active, "Resolved staff record");
                StaffAccess::Staff(member)
            }
            Ok(None) => {
                debug!(email = %identity.email, "No staff record; unrestricted account");
                StaffAccess::Unrestricted
            }
            Err(e) => {
                warn!(email = %identity.email, error = %e, "Staff lookup failed; restricting to public routes");
                StaffAccess::Unresolved
            }
        }
    }

    pub fn current(&self) -> Session {
        self.sessions.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sessions.subscribe()
    }

    /// Follow `auth`: every identity change is queued and resolved in
    /// order on a background task.
    pub fn attach(self: &Arc<Self>, auth: &AuthService) -> (Subscription, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Option<Identity>>();
        let subscription = auth.on_identity_changed(move |identity| {
            // Receiver is gone once the resolver task has stopped
            let _ = tx.send(identity.cloned());
        });

        let resolver = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(identity) = rx.recv().await {
                let session = resolver.resolve(identity).await;
                info!(
                    authenticated = session.is_authenticated(),
                    restricted = session.access.is_restricted(),
                    "Session resolved"
                );
            }
        });
        (subscription, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FailureConfig, MemoryBackend, Operation};
    use crate::models::{NewStaffMember, Role};

    fn identity(email: &str) -> Identity {
        Identity {
            uid: format!("uid-{}", email),
            email: email.to_string(),
            display_name: None,
            token: "t".to_string(),
        }
    }

    async fn backend_with_staff() -> Arc<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::new());
        let new = NewStaffMember::new("serveur@maquis.ci", "Serveur", Role::Staff).unwrap();
        StaffDirectory::create(backend.as_ref(), new).await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_resolve_staff_record() {
        let backend = backend_with_staff().await;
        let resolver = SessionResolver::new(backend);
        let session = resolver.resolve(Some(identity("serveur@maquis.ci"))).await;
        assert!(session.access.is_restricted());
        assert!(!session.access.is_admin());
        assert_eq!(session.access.staff().unwrap().email, "serveur@maquis.ci");
        assert_eq!(resolver.current(), session);
    }

    #[tokio::test]
    async fn test_owner_without_record_is_unrestricted() {
        let backend = backend_with_staff().await;
        let resolver = SessionResolver::new(backend);
        let session = resolver.resolve(Some(identity("owner@maquis.ci"))).await;
        assert_eq!(session.access, StaffAccess::Unrestricted);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let backend = backend_with_staff().await;
        backend.inject_failure(Operation::GetStaffByEmail, FailureConfig::unavailable("offline"));
        let resolver = SessionResolver::new(backend);
        let session = resolver.resolve(Some(identity("serveur@maquis.ci"))).await;
        assert_eq!(session.access, StaffAccess::Unresolved);
        assert!(session.access.is_restricted());
        assert!(session.access.permissions().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_member_has_no_grants() {
        let mut member = StaffMember::from_new(
            "s1".to_string(),
            NewStaffMember::new("x@maquis.ci", "X", Role::Admin).unwrap(),
            chrono::Utc::now(),
        );
        member.permissions.insert(RouteId::Menu);
        member.active = false;
        let access = StaffAccess::Staff(member);
        assert!(!access.is_admin());
        assert!(access.permissions().is_empty());
    }

    #[tokio::test]
    async fn test_attach_follows_auth_changes() {
        let backend = backend_with_staff().await;
        backend.add_account("serveur@maquis.ci", "motdepasse", "uid-serveur");
        let auth = AuthService::new(backend.clone());
        let resolver = Arc::new(SessionResolver::new(backend.clone()));
        let mut sessions = resolver.subscribe();

        let (_sub, _task) = resolver.attach(&auth);
        // Initial callback resolves the signed-out state
        sessions.changed().await.unwrap();
        assert!(!sessions.borrow_and_update().is_authenticated());

        auth.login("serveur@maquis.ci", "motdepasse").await.unwrap();
        sessions.changed().await.unwrap();
        let session = sessions.borrow_and_update().clone();
        assert!(session.is_authenticated());
        assert!(session.access.staff().is_some());

        auth.logout().await;
        sessions.changed().await.unwrap();
        assert!(!sessions.borrow_and_update().is_authenticated());
    }
}
