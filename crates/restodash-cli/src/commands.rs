//! Command implementations.
//!
//! `App` wires the core services together for one invocation: the auth
//! service (restored from the stored session when there is one), the
//! session resolver, the navigation guard and the entity cache.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use restodash_core::api::ApiClient;
use restodash_core::auth::{AuthError, AuthService, CredentialStore, SessionData, StoredSession};
use restodash_core::cache::{CacheSources, EntityCache, PaginationPatch, RefreshOutcome, SectionKey};
use restodash_core::config::Config;
use restodash_core::guard::{visible_menu, Decision, FormFactor, NavigationGuard, Session, SessionResolver, StaffAccess};
use restodash_core::models::{Category, MenuItem, NewStaffMember, Order, Role, RouteId, StaffMember, StaffUpdate};
use restodash_core::payment::{CinetPayClient, PaymentGateway, PaymentRequest};
use restodash_core::qr::QrTarget;
use restodash_core::store::StaffDirectory;
use restodash_core::utils::{format_amount, format_optional, format_timestamp, truncate_string};
use restodash_core::validation::ValidationError;
use tracing::{debug, warn};

use crate::demo;

pub struct App {
    config: Config,
    auth: AuthService,
    resolver: SessionResolver,
    guard: NavigationGuard,
    cache: EntityCache,
    directory: Arc<dyn StaffDirectory>,
    api: Option<ApiClient>,
    stored: Option<StoredSession>,
}

/// Route that gates each cache section.
fn section_route(key: SectionKey) -> RouteId {
    match key {
        SectionKey::Menu => RouteId::Menu,
        SectionKey::Categories => RouteId::Categories,
        SectionKey::Orders => RouteId::Orders,
        SectionKey::Staff => RouteId::Staff,
    }
}

fn session_line(data: &SessionData) -> String {
    let minutes = data.minutes_until_expiry();
    if data.needs_refresh() {
        format!("expires in {} min; run `restodash login` to renew", minutes)
    } else {
        format!("expires in {} min", minutes)
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

impl App {
    /// Connect to the configured backend, adopting the stored session.
    pub fn connect(config: Config) -> Result<Self> {
        let base_url = config
            .api_base_url
            .clone()
            .context("No API URL configured; set RESTODASH_API_URL or api_base_url in config.json")?;
        let api_key = config
            .api_key
            .clone()
            .context("No API key configured; set RESTODASH_API_KEY or api_key in config.json")?;
        let restaurant_id = config
            .restaurant_id
            .clone()
            .context("No restaurant configured; set RESTODASH_RESTAURANT_ID or restaurant_id in config.json")?;

        let api = ApiClient::new(&base_url, &api_key, &restaurant_id)?;
        let sources = CacheSources {
            menu: Arc::new(api.clone()),
            categories: Arc::new(api.clone()),
            orders: Arc::new(api.clone()),
            staff: Arc::new(api.clone()),
        };
        let auth = AuthService::new(Arc::new(api.clone()));

        let mut stored = StoredSession::new(config.cache_dir()?);
        match stored.load() {
            Ok(true) => {
                if let Some(identity) = stored.identity() {
                    debug!(email = %identity.email, "Restoring stored session");
                    api.set_token(Some(identity.token.clone()));
                    auth.restore(identity.clone());
                }
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Ignoring unreadable session file"),
        }

        Ok(Self::assemble(config, auth, sources, Some(api), Some(stored)))
    }

    /// Run against the seeded in-memory restaurant, signed in as `user`.
    pub async fn demo(mut config: Config, user: Option<&str>) -> Result<Self> {
        config.restaurant_id = Some(demo::RESTAURANT_ID.to_string());
        if config.public_menu_base_url.is_none() {
            config.public_menu_base_url = Some(demo::MENU_BASE_URL.to_string());
        }

        let backend = demo::backend().await?;
        let auth = AuthService::new(backend.clone());
        if let Some(email) = user {
            auth.login(email, demo::PASSWORD).await?;
        }
        Ok(Self::assemble(config, auth, backend.cache_sources(), None, None))
    }

    fn assemble(
        config: Config,
        auth: AuthService,
        sources: CacheSources,
        api: Option<ApiClient>,
        stored: Option<StoredSession>,
    ) -> Self {
        let directory = sources.staff.clone();
        Self {
            guard: config.navigation_guard(),
            cache: EntityCache::new(sources, config.page_size()),
            resolver: SessionResolver::new(directory.clone()),
            directory,
            auth,
            api,
            stored,
            config,
        }
    }

    pub fn shutdown(self) {
        self.auth.shutdown();
    }

    async fn session(&self) -> Session {
        self.resolver.resolve(self.auth.current_identity()).await
    }

    /// Resolve the session and make sure it may open `route`.
    async fn require(&self, route: RouteId) -> Result<Session> {
        let session = self.session().await;
        match self.guard.check(route, &session) {
            Decision::Allow => Ok(session),
            Decision::Redirect(to) => bail!(
                "{} is not available to this account; try {}",
                route.path(),
                to.path()
            ),
            Decision::RequireLogin => bail!("Not signed in. Run `restodash login` first."),
        }
    }

    pub async fn login(&mut self, email: Option<String>, remember: bool) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt("Email: ")?,
        };

        let keychain = self.stored.is_some() && CredentialStore::has_credentials(&email);
        let password = if keychain {
            CredentialStore::get_password(&email)?
        } else {
            rpassword::prompt_password("Password: ").context("Failed to read password")?
        };

        let identity = match self.auth.login(&email, &password).await {
            Ok(identity) => identity,
            Err(AuthError::InvalidCredentials) if keychain => {
                let _ = CredentialStore::delete(&email);
                bail!("Saved password was rejected and has been forgotten; run login again");
            }
            Err(e) => return Err(e.into()),
        };

        if let (Some(api), Some(stored)) = (&self.api, &mut self.stored) {
            api.set_token(Some(identity.token.clone()));
            stored.update(identity.clone());
            stored.save()?;
            self.config.last_email = Some(identity.email.clone());
            self.config.save()?;
            if remember {
                CredentialStore::store(&identity.email, &password)?;
            }
        }

        println!("Signed in as {}", identity.email);
        self.whoami().await
    }

    pub async fn logout(&mut self) -> Result<()> {
        let email = self.auth.current_identity().map(|i| i.email);
        self.auth.logout().await;
        if let Some(api) = &self.api {
            api.set_token(None);
        }
        if let Some(stored) = &mut self.stored {
            stored.clear()?;
            if let Some(email) = email.as_deref() {
                // Nothing saved is fine
                let _ = CredentialStore::delete(email);
            }
        }
        println!("Signed out");
        Ok(())
    }

    pub async fn whoami(&self) -> Result<()> {
        let session = self.session().await;
        let Some(identity) = &session.identity else {
            println!("Not signed in");
            return Ok(());
        };

        println!("Email:  {}", identity.email);
        if let Some(data) = self.stored.as_ref().and_then(|s| s.data.as_ref()) {
            println!("Token:  {}", session_line(data));
        }
        let routes = match &session.access {
            StaffAccess::Unrestricted => {
                println!("Access: owner (unrestricted)");
                None
            }
            StaffAccess::Staff(member) => {
                println!(
                    "Access: {} ({}{})",
                    member.name,
                    member.role,
                    if member.active { "" } else { ", disabled" }
                );
                (!session.access.is_admin()).then(|| self.guard.allowed_routes(&session.access))
            }
            StaffAccess::Unresolved => {
                println!("Access: staff record unavailable, public routes only");
                Some(BTreeSet::new())
            }
        };

        match routes {
            None => println!("Routes: all"),
            Some(granted) => {
                let names: Vec<&str> = RouteId::ALL
                    .iter()
                    .filter(|r| r.is_public() || granted.contains(*r))
                    .map(|r| r.as_str())
                    .collect();
                println!("Routes: {}", names.join(", "));
            }
        }
        Ok(())
    }

    pub async fn menu(&self, mobile: bool) -> Result<()> {
        let session = self.session().await;
        if !session.is_authenticated() {
            bail!("Not signed in. Run `restodash login` first.");
        }
        let form_factor = if mobile { FormFactor::Mobile } else { FormFactor::Desktop };

        let mut area = None;
        for entry in visible_menu(&session.access, form_factor) {
            if area != Some(entry.area) {
                println!("{}", entry.area.title());
                area = Some(entry.area);
            }
            println!("  {:<16} {}", entry.label, entry.route.path());
        }
        Ok(())
    }

    pub async fn check(&self, route: &str) -> Result<()> {
        let route: RouteId = route.parse()?;
        let session = self.session().await;
        match self.guard.check(route, &session) {
            Decision::Allow => println!("allow {}", route.path()),
            Decision::Redirect(to) => println!("redirect {} -> {}", route.path(), to.path()),
            Decision::RequireLogin => println!("login required"),
        }
        Ok(())
    }

    pub async fn refresh(&self, section: Option<&str>) -> Result<()> {
        let keys: Vec<SectionKey> = match section {
            Some(name) => {
                let key: SectionKey = name.parse()?;
                self.require(section_route(key)).await?;
                vec![key]
            }
            None => {
                let session = self.session().await;
                SectionKey::ALL
                    .into_iter()
                    .filter(|key| self.guard.check(section_route(*key), &session).is_allowed())
                    .collect()
            }
        };
        if keys.is_empty() {
            bail!("Not signed in. Run `restodash login` first.");
        }

        let results = if keys.len() == SectionKey::ALL.len() {
            self.cache.refresh_all().await
        } else {
            let mut results = Vec::with_capacity(keys.len());
            for key in keys {
                results.push((key, self.cache.refresh(key).await));
            }
            results
        };

        let mut failed = 0;
        for (key, result) in results {
            match result {
                Ok(RefreshOutcome::Refreshed { count }) => println!("{:<11} {} records", key.as_str(), count),
                Ok(RefreshOutcome::Fresh) => {
                    println!("{:<11} fresh ({})", key.as_str(), self.cache.snapshot().age_display(key))
                }
                Ok(RefreshOutcome::InFlight) => println!("{:<11} already refreshing", key.as_str()),
                Err(e) => {
                    failed += 1;
                    eprintln!("{}", e.user_message());
                }
            }
        }
        if failed > 0 {
            bail!("{} section(s) failed to refresh", failed);
        }
        Ok(())
    }

    pub async fn list(&self, section: &str, page: Option<&str>) -> Result<()> {
        let key: SectionKey = section.parse()?;
        self.require(section_route(key)).await?;
        self.cache
            .refresh(key)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;
        if let Some(page) = page {
            let page: u32 = page.parse().with_context(|| format!("Invalid page number: {}", page))?;
            self.cache.set_pagination(key, PaginationPatch::page(page));
        }

        let currency = self.currency();
        let pagination = match key {
            SectionKey::Menu => {
                let section = self.cache.section::<MenuItem>();
                for item in section.current_page_items() {
                    println!(
                        "{:<28} {:>12}{}",
                        truncate_string(&item.name, 28),
                        format_amount(item.price, &currency),
                        if item.available { "" } else { "  (unavailable)" }
                    );
                }
                section.pagination
            }
            SectionKey::Categories => {
                let section = self.cache.section::<Category>();
                for category in section.current_page_items() {
                    println!("{:>3}  {}", category.position, category.name);
                }
                section.pagination
            }
            SectionKey::Orders => {
                let section = self.cache.section::<Order>();
                for order in section.current_page_items() {
                    println!(
                        "{:<14} table {:<4} {:<10} {:>12}  {}",
                        truncate_string(&order.id, 14),
                        format_optional(&order.table, "-"),
                        format!("{:?}", order.status).to_lowercase(),
                        format_amount(order.total, &currency),
                        format_timestamp(&order.created_at)
                    );
                }
                section.pagination
            }
            SectionKey::Staff => {
                let section = self.cache.section::<StaffMember>();
                for member in section.current_page_items() {
                    let permissions: Vec<&str> = member.permissions.iter().map(|r| r.as_str()).collect();
                    println!(
                        "{:<30} {:<20} {:<6} {:<9} {}",
                        truncate_string(&member.email, 30),
                        truncate_string(&member.name, 20),
                        member.role.to_string(),
                        if member.active { "active" } else { "disabled" },
                        permissions.join(",")
                    );
                }
                section.pagination
            }
        };

        let snapshot = self.cache.snapshot();
        println!(
            "Page {}/{}, {} items, updated {}",
            pagination.current_page,
            pagination.total_pages.max(1),
            snapshot.status(key).len,
            snapshot.age_display(key)
        );
        Ok(())
    }

    pub async fn staff_add(&self, email: &str, name: &str, admin: bool) -> Result<()> {
        self.require(RouteId::Staff).await?;
        let role = if admin { Role::Admin } else { Role::Staff };
        let new = NewStaffMember::new(email, name, role)?;
        let member = self
            .directory
            .create(new)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;
        self.cache.invalidate(SectionKey::Staff);
        println!("Added {} <{}> as {}", member.name, member.email, member.role);
        Ok(())
    }

    async fn staff_member(&self, email: &str) -> Result<StaffMember> {
        self.directory
            .get_by_email(email)
            .await
            .map_err(|e| anyhow!(e.user_message()))?
            .with_context(|| format!("No staff member with email {}", email))
    }

    async fn update_staff(&self, member: &StaffMember, update: StaffUpdate) -> Result<StaffMember> {
        let updated = self
            .directory
            .update(&member.id, update)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;
        self.cache.invalidate(SectionKey::Staff);
        Ok(updated)
    }

    pub async fn staff_grant(&self, email: &str, routes: &[String]) -> Result<()> {
        self.require(RouteId::Staff).await?;
        if routes.is_empty() {
            bail!("Name at least one route to grant");
        }
        let mut granted = BTreeSet::new();
        for name in routes {
            let route: RouteId = name.parse()?;
            if route.is_public() {
                println!("{} is public; no grant needed", route);
                continue;
            }
            if !self.guard.grantable().contains(&route) {
                bail!("{} cannot be granted to staff in this restaurant", route);
            }
            granted.insert(route);
        }

        let member = self.staff_member(email).await?;
        let mut permissions = member.permissions.clone();
        permissions.extend(granted);
        let update = StaffUpdate {
            permissions: Some(permissions),
            ..Default::default()
        };
        let updated = self.update_staff(&member, update).await?;
        let names: Vec<&str> = updated.permissions.iter().map(|r| r.as_str()).collect();
        println!("{} may now open: {}", updated.email, names.join(", "));
        Ok(())
    }

    pub async fn staff_disable(&self, email: &str) -> Result<()> {
        self.require(RouteId::Staff).await?;
        let member = self.staff_member(email).await?;
        let update = StaffUpdate {
            active: Some(false),
            ..Default::default()
        };
        let updated = self.update_staff(&member, update).await?;
        println!("Disabled {}", updated.email);
        Ok(())
    }

    fn currency(&self) -> String {
        self.config
            .cinetpay
            .as_ref()
            .map(|c| c.currency.clone())
            .unwrap_or_else(|| restodash_core::payment::DEFAULT_CURRENCY.to_string())
    }

    fn gateway(&self) -> Result<CinetPayClient> {
        let config = self
            .config
            .cinetpay
            .clone()
            .context("CinetPay is not configured; set CINETPAY_API_KEY and CINETPAY_SITE_ID")?;
        Ok(CinetPayClient::new(config)?)
    }

    pub async fn pay(&self, amount: &str, description: Option<&str>) -> Result<()> {
        self.require(RouteId::Pos).await?;
        let amount: i64 = amount
            .parse()
            .map_err(|_| ValidationError::InvalidAmount(amount.to_string()))?;
        let gateway = self.gateway()?;
        let request = PaymentRequest::new(amount, gateway.currency(), description.unwrap_or_default())?;

        let session = gateway
            .initiate(request)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;
        println!("Amount:      {}", format_amount(session.amount, &session.currency));
        println!("Transaction: {}", session.transaction_id);
        println!("Checkout:    {}", session.payment_url);
        Ok(())
    }

    pub async fn pay_status(&self, transaction_id: &str) -> Result<()> {
        self.require(RouteId::Pos).await?;
        let status = self
            .gateway()?
            .check(transaction_id)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;
        println!("{}: {:?}", transaction_id, status);
        Ok(())
    }

    pub async fn qr(&self, table: &str) -> Result<()> {
        self.require(RouteId::QrCode).await?;
        let base = self
            .config
            .public_menu_base_url
            .as_deref()
            .context("No public menu URL configured; set public_menu_base_url in config.json")?;
        let restaurant_id = self.config.restaurant_id.as_deref().unwrap_or_default();
        let target = QrTarget::table_menu(base, restaurant_id, table)?;
        println!("{}", target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use restodash_core::auth::Identity;

    fn data_aged(minutes: i64) -> SessionData {
        let mut data = SessionData::new(Identity {
            uid: "u1".to_string(),
            email: "owner@maquis.ci".to_string(),
            display_name: None,
            token: "tok".to_string(),
        });
        data.created_at = Utc::now() - Duration::minutes(minutes);
        data
    }

    #[test]
    fn test_session_line_counts_down() {
        let line = session_line(&data_aged(10));
        assert!(line.starts_with("expires in 4"));
        assert!(!line.contains("renew"));
    }

    #[test]
    fn test_session_line_suggests_renewal_near_expiry() {
        let line = session_line(&data_aged(57));
        assert!(line.contains("renew"));
        assert!(line.starts_with("expires in 2 min"));
    }
}
