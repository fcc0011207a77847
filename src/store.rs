use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::client::{ApiClient, FilePart};
use crate::endpoints;
use crate::error::{HelpdeskError, Result};
use crate::normalize;
use crate::types::{LevelType, SupportUser, Team, Ticket, TicketCreate, TicketStatus};

const POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Team labels gating which ticket endpoints are callable. Advisors see
/// the tickets they filed; support staff see the tickets assigned to
/// their team. Any other team gets neither (fail closed).
const ADVISOR_TEAM: &str = "Asesoría";
const SUPPORT_TEAM: &str = "Soporte";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeamRole {
    Requester,
    Manager,
}

fn role_for(team: Option<&str>) -> Option<TeamRole> {
    match team {
        Some(ADVISOR_TEAM) => Some(TeamRole::Requester),
        Some(SUPPORT_TEAM) => Some(TeamRole::Manager),
        _ => None,
    }
}

/// Owns the in-memory ticket collection and the reference catalogs.
/// Collections are replaced whole-value under their locks, so any read
/// observes a consistent snapshot. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TicketStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    client: ApiClient,
    tickets: RwLock<Vec<Ticket>>,
    request_types: RwLock<Vec<LevelType>>,
    priority_types: RwLock<Vec<LevelType>>,
    status_types: RwLock<Vec<LevelType>>,
    support_users: RwLock<Vec<SupportUser>>,
    loading: AtomicBool,
    has_error: AtomicBool,
    realtime: Mutex<RealtimeState>,
}

#[derive(Default)]
struct RealtimeState {
    consumers: usize,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TicketStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                client,
                tickets: RwLock::new(Vec::new()),
                request_types: RwLock::new(Vec::new()),
                priority_types: RwLock::new(Vec::new()),
                status_types: RwLock::new(Vec::new()),
                support_users: RwLock::new(Vec::new()),
                loading: AtomicBool::new(false),
                has_error: AtomicBool::new(false),
                realtime: Mutex::new(RealtimeState::default()),
            }),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.inner.tickets.read().expect("tickets lock").clone()
    }

    pub fn request_types(&self) -> Vec<LevelType> {
        self.inner.request_types.read().expect("catalog lock").clone()
    }

    pub fn priority_types(&self) -> Vec<LevelType> {
        self.inner.priority_types.read().expect("catalog lock").clone()
    }

    pub fn status_types(&self) -> Vec<LevelType> {
        self.inner.status_types.read().expect("catalog lock").clone()
    }

    pub fn support_users(&self) -> Vec<SupportUser> {
        self.inner.support_users.read().expect("catalog lock").clone()
    }

    pub fn loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    pub fn has_error(&self) -> bool {
        self.inner.has_error.load(Ordering::SeqCst)
    }

    /// Replace the whole ticket collection from the team-appropriate list
    /// endpoint. `silent` skips the loading flag (background polling) but
    /// still drives the error flag.
    pub async fn get_all_tickets(&self, silent: bool) {
        let session = self.inner.client.session();

        let Some(user_id) = session.current_user_id() else {
            warn!("no user id resolvable from the current session");
            self.inner.has_error.store(true, Ordering::SeqCst);
            return;
        };

        let team = session.current_user_team();
        let path = match role_for(team.as_deref()) {
            Some(TeamRole::Requester) => endpoints::tickets_by_requester(&user_id),
            Some(TeamRole::Manager) => endpoints::tickets_by_manager(&user_id),
            None => {
                warn!(?team, "no ticket list endpoint for this team");
                self.inner.has_error.store(true, Ordering::SeqCst);
                return;
            }
        };

        if !silent {
            self.inner.loading.store(true, Ordering::SeqCst);
        }

        match self.inner.client.get_json(path).await {
            Ok(payload) => {
                let tickets = normalize::normalize_tickets(&payload);
                *self.inner.tickets.write().expect("tickets lock") = tickets;
                self.inner.has_error.store(false, Ordering::SeqCst);
            }
            Err(err) => {
                error!(%err, "failed to load tickets");
                self.inner.has_error.store(true, Ordering::SeqCst);
            }
        }

        if !silent {
            self.inner.loading.store(false, Ordering::SeqCst);
        }
    }

    /// Reference-counted polling. The first consumer starts an immediate
    /// silent fetch plus a fixed-interval poll; the last one out stops
    /// scheduling. A fetch already in transit is never aborted: the stop
    /// signal is only observed between ticks.
    pub async fn enable_realtime_updates(&self) {
        let mut state = self.inner.realtime.lock().await;
        state.consumers += 1;
        if state.consumers > 1 {
            return;
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let store = self.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        store.get_all_tickets(true).await;
                    }
                }
            }
        });

        state.stop_tx = Some(stop_tx);
        state.task = Some(task);
    }

    pub async fn disable_realtime_updates(&self) {
        let (stop_tx, task) = {
            let mut state = self.inner.realtime.lock().await;
            if state.consumers == 0 {
                return;
            }
            state.consumers -= 1;
            if state.consumers > 0 {
                return;
            }
            (state.stop_tx.take(), state.task.take())
        };

        if let Some(stop_tx) = stop_tx {
            let _ = stop_tx.send(());
        }
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    #[cfg(test)]
    async fn is_polling(&self) -> bool {
        self.inner.realtime.lock().await.task.is_some()
    }

    /// Scalar ticket count for one status label via the role-appropriate
    /// count endpoint. Anomalies are logged and reported as 0, never as
    /// an error.
    pub async fn count_tickets_by_user_id(&self, user_id: &str, status_label: &str) -> u64 {
        if user_id.trim().is_empty() {
            warn!("cannot count tickets without a user id");
            return 0;
        }

        let team = self.inner.client.session().current_user_team();
        let path = match role_for(team.as_deref()) {
            Some(TeamRole::Requester) => endpoints::count_tickets_by_requester(user_id),
            Some(TeamRole::Manager) => endpoints::count_tickets_by_manager(user_id),
            None => {
                warn!(?team, "no ticket count endpoint for this team");
                return 0;
            }
        };

        let query = vec![("status".to_string(), status_label.to_string())];
        match self.inner.client.get_json_with_query(path, query).await {
            Ok(payload) => normalize::normalize_count(&payload),
            Err(err) => {
                error!(%err, status_label, "failed to load ticket count");
                0
            }
        }
    }

    /// Fire-and-confirm status update. On a confirmed write the affected
    /// ticket is patched in place; there is no server push to do it for
    /// us.
    pub async fn set_ticket_status_by_ticket_id(
        &self,
        ticket_id: &str,
        status_type_id: &str,
    ) -> bool {
        let path = endpoints::ticket_status_update(ticket_id, status_type_id);
        match self.inner.client.put_confirm(path).await {
            Ok(true) => {
                self.patch_ticket_status(ticket_id, status_type_id);
                true
            }
            Ok(false) => false,
            Err(err) => {
                error!(%err, ticket_id, "failed to update ticket status");
                self.inner.has_error.store(true, Ordering::SeqCst);
                false
            }
        }
    }

    pub async fn set_ticket_manager_by_ticket_id(
        &self,
        ticket_id: &str,
        manager_id: &str,
    ) -> bool {
        let path = endpoints::ticket_manager_update(ticket_id, manager_id);
        match self.inner.client.put_confirm(path).await {
            Ok(true) => {
                self.patch_ticket_manager(ticket_id, manager_id);
                true
            }
            Ok(false) => false,
            Err(err) => {
                error!(%err, ticket_id, "failed to update ticket manager");
                self.inner.has_error.store(true, Ordering::SeqCst);
                false
            }
        }
    }

    /// Submit a new ticket as a multipart form and prepend the echoed
    /// ticket to the collection (optimistic insert, no reload).
    pub async fn post_ticket(&self, payload: TicketCreate) -> Result<Ticket> {
        self.inner.has_error.store(false, Ordering::SeqCst);

        let mut fields = vec![
            ("code".to_string(), payload.code),
            ("note".to_string(), payload.note),
            ("request_type_id".to_string(), payload.request_type_id),
            ("priority_type_id".to_string(), payload.priority_type_id),
            ("status_type_id".to_string(), payload.status_type_id),
            ("requester_id".to_string(), payload.requester_id),
        ];
        if let Some(team_id) = payload.team_id {
            fields.push(("team_id".to_string(), team_id));
        }
        if let Some(assignee_id) = payload.assignee_id {
            fields.push(("assignee_id".to_string(), assignee_id));
        }
        if let Some(due_at) = payload.due_at {
            fields.push(("due_at".to_string(), due_at));
        }

        let mut files = Vec::new();
        for path in &payload.attachments {
            let bytes = std::fs::read(path).map_err(|e| HelpdeskError::FileRead {
                path: path.display().to_string(),
                source: e,
            })?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "adjunto".to_string());
            files.push(FilePart {
                field: "attachments".to_string(),
                file_name,
                mime_type: None,
                bytes,
            });
        }

        let response = self
            .inner
            .client
            .post_multipart(endpoints::CREATE_TICKET, fields, files)
            .await
            .inspect_err(|err| {
                error!(%err, "failed to create ticket");
                self.inner.has_error.store(true, Ordering::SeqCst);
            })?;

        let ticket = normalize::normalize_ticket(&response, self.tickets().len());
        self.inner
            .tickets
            .write()
            .expect("tickets lock")
            .insert(0, ticket.clone());
        Ok(ticket)
    }

    /// Batched catalog load. Individual failures collapse to an empty
    /// category so the rest still populates; the combined error flag
    /// tells the caller something was dropped.
    pub async fn load_level_types(&self) {
        if self.catalogs_loaded() && !self.has_error() {
            return;
        }
        if self.inner.loading.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.has_error.store(false, Ordering::SeqCst);

        let (request_types, priority_types, status_types, support_users) = tokio::join!(
            self.fetch_catalog(endpoints::REQUEST_TYPES),
            self.fetch_catalog(endpoints::PRIORITY_TYPES),
            self.fetch_catalog(endpoints::STATUS_TYPES),
            self.fetch_catalog(endpoints::SUPPORT_USERS),
        );
        let encountered_error =
            request_types.1 || priority_types.1 || status_types.1 || support_users.1;

        *self.inner.request_types.write().expect("catalog lock") =
            normalize::normalize_level_types(&request_types.0);
        *self.inner.priority_types.write().expect("catalog lock") =
            normalize::normalize_level_types(&priority_types.0);
        *self.inner.status_types.write().expect("catalog lock") =
            normalize::normalize_level_types(&status_types.0);
        *self.inner.support_users.write().expect("catalog lock") =
            normalize::normalize_support_users(&support_users.0);

        self.inner.has_error.store(encountered_error, Ordering::SeqCst);
        self.inner.loading.store(false, Ordering::SeqCst);
    }

    /// One catalog fetch; a failure degrades to an empty result and a
    /// flag for the caller to combine.
    async fn fetch_catalog(&self, path: &'static str) -> (serde_json::Value, bool) {
        match self.inner.client.get_json(path).await {
            Ok(payload) => (payload, false),
            Err(err) => {
                error!(%err, path, "failed to load catalog");
                (serde_json::Value::Null, true)
            }
        }
    }

    pub async fn load_teams(&self) -> Result<Vec<Team>> {
        let payload = self.inner.client.get_json(endpoints::TEAMS).await?;
        Ok(normalize::normalize_teams(&payload))
    }

    fn catalogs_loaded(&self) -> bool {
        !self.request_types().is_empty()
            && !self.priority_types().is_empty()
            && !self.status_types().is_empty()
            && !self.support_users().is_empty()
    }

    /// Resolve a catalog entry by its human label (case-insensitive).
    pub fn status_type_by_label(&self, label: &str) -> Option<LevelType> {
        find_by_label(&self.status_types(), label)
    }

    pub fn request_type_by_label(&self, label: &str) -> Option<LevelType> {
        find_by_label(&self.request_types(), label)
    }

    pub fn priority_type_by_label(&self, label: &str) -> Option<LevelType> {
        find_by_label(&self.priority_types(), label)
    }

    pub fn support_user_by_name(&self, name: &str) -> Option<SupportUser> {
        let needle = name.trim().to_lowercase();
        self.support_users().into_iter().find(|user| {
            user.username.to_lowercase() == needle
                || user
                    .full_name
                    .as_deref()
                    .is_some_and(|full| full.to_lowercase() == needle)
                || user.id == name
        })
    }

    /// Per-status counts derived from the in-memory collection.
    pub fn status_breakdown(&self) -> Vec<(TicketStatus, usize)> {
        let tickets = self.tickets();
        TicketStatus::ALL
            .into_iter()
            .map(|status| {
                let count = tickets
                    .iter()
                    .filter(|ticket| {
                        ticket
                            .status
                            .as_deref()
                            .and_then(TicketStatus::parse)
                            .is_some_and(|s| s == status)
                    })
                    .count();
                (status, count)
            })
            .collect()
    }

    fn patch_ticket_status(&self, ticket_id: &str, status_type_id: &str) {
        let label = self
            .status_type_by_id(status_type_id)
            .and_then(|level| level.description);
        let resolved = label
            .as_deref()
            .and_then(TicketStatus::parse)
            .map(TicketStatus::is_resolved);
        let now = Utc::now().to_rfc3339();

        let mut tickets = self.inner.tickets.write().expect("tickets lock");
        if let Some(ticket) = tickets.iter_mut().find(|t| t.id == ticket_id) {
            ticket.status_type_id = Some(status_type_id.to_string());
            if label.is_some() {
                ticket.status = label;
            }
            if let Some(resolved) = resolved {
                ticket.is_resolved = Some(resolved);
                ticket.resolved_at = resolved.then(|| now.clone());
            }
            ticket.updated_at = Some(now);
        }
    }

    fn patch_ticket_manager(&self, ticket_id: &str, manager_id: &str) {
        let manager = self
            .support_users()
            .into_iter()
            .find(|user| user.id == manager_id)
            .map(|user| user.display_name().to_string());
        let now = Utc::now().to_rfc3339();

        let mut tickets = self.inner.tickets.write().expect("tickets lock");
        if let Some(ticket) = tickets.iter_mut().find(|t| t.id == ticket_id) {
            ticket.manager_id = Some(manager_id.to_string());
            if manager.is_some() {
                ticket.manager = manager;
            }
            ticket.updated_at = Some(now);
        }
    }

    fn status_type_by_id(&self, id: &str) -> Option<LevelType> {
        self.status_types().into_iter().find(|level| level.id == id)
    }
}

fn find_by_label(catalog: &[LevelType], label: &str) -> Option<LevelType> {
    let needle = label.trim().to_lowercase();
    catalog
        .iter()
        .find(|entry| entry.label().to_lowercase() == needle || entry.id == label)
        .cloned()
}
