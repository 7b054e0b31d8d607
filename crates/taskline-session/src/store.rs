//! Authentication state store.
//!
//! Holds the app-wide auth snapshot (`user` + `is_loading`) and keeps it
//! consistent across concurrent operations. Every state mutation is an
//! [`Event`] pushed onto one `mpsc` queue and applied by a single driver
//! task, so arrival order is the total order; there is no last-write-wins
//! race between, say, a sign-out and an in-flight token refresh. Observers
//! read snapshots through a `watch` channel and never see a torn state.
//!
//! The store is an explicit object: construct one with
//! [`SessionStore::new`] and hand it to whatever needs it.

use std::path::PathBuf;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, instrument, warn};

use taskline_backend::{AuthChange, Backend, Session};
use taskline_core::{Credentials, Registration, User};
use taskline_data::{AuthApi, DataError};

use crate::errors::StoreError;
use crate::notice::Notice;
use crate::persist;

/// Broadcast capacity for notices.
const NOTICE_CAPACITY: usize = 16;

/// Observable auth state.
///
/// Starts as `{ user: None, is_loading: true }` until [`check_auth`]
/// (or a first operation) settles it.
///
/// [`check_auth`]: SessionStore::check_auth
#[derive(Clone, Debug, PartialEq)]
pub struct AuthSnapshot {
    /// The authenticated profile, if any.
    pub user: Option<User>,
    /// An auth operation is in flight.
    pub is_loading: bool,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }
}

/// A state mutation, applied by the driver task in arrival order.
#[derive(Debug)]
enum Event {
    /// Toggle the loading flag.
    Loading(bool),
    /// A session and its profile are established.
    SignedIn { user: User, session: Session },
    /// The session ended.
    SignedOut,
    /// The token pair rotated; identity unchanged.
    Refreshed(Session),
}

/// Driver-owned state behind the snapshot.
struct DriverState {
    snapshot: AuthSnapshot,
    session: Option<Session>,
    snapshot_path: Option<PathBuf>,
}

impl DriverState {
    fn apply(&mut self, event: Event) {
        match event {
            Event::Loading(flag) => self.snapshot.is_loading = flag,
            Event::SignedIn { user, session } => {
                self.persist(&user, &session);
                self.snapshot.user = Some(user);
                self.snapshot.is_loading = false;
                self.session = Some(session);
            }
            Event::SignedOut => {
                if let Some(path) = &self.snapshot_path {
                    persist::clear_session(path);
                }
                self.snapshot.user = None;
                self.snapshot.is_loading = false;
                self.session = None;
            }
            Event::Refreshed(session) => {
                // A refresh that lands after sign-out must not resurrect
                // the session.
                if let Some(user) = &self.snapshot.user {
                    self.persist(user, &session);
                    self.session = Some(session);
                }
                self.snapshot.is_loading = false;
            }
        }
    }

    fn persist(&self, user: &User, session: &Session) {
        if let Some(path) = &self.snapshot_path {
            if let Err(err) = persist::save_session(path, user, session) {
                warn!(error = %err, "failed to persist session snapshot");
            }
        }
    }
}

/// The authentication state store.
///
/// Cheap to clone; clones share the queue, the snapshot, and the notice
/// channel.
#[derive(Clone)]
pub struct SessionStore {
    backend: Backend,
    auth_api: AuthApi,
    events: mpsc::UnboundedSender<Event>,
    state: watch::Receiver<AuthSnapshot>,
    notices: broadcast::Sender<Notice>,
    snapshot_path: Option<PathBuf>,
}

impl SessionStore {
    /// Build a store over a backend handle. When `snapshot_path` is given,
    /// sessions are saved there and restored by [`check_auth`].
    ///
    /// [`check_auth`]: Self::check_auth
    #[must_use]
    pub fn new(backend: Backend, snapshot_path: Option<PathBuf>) -> Self {
        let (events, mut event_rx) = mpsc::unbounded_channel::<Event>();
        let (state_tx, state) = watch::channel(AuthSnapshot::default());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        let mut driver_state = DriverState {
            snapshot: AuthSnapshot::default(),
            session: None,
            snapshot_path: snapshot_path.clone(),
        };
        drop(tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                driver_state.apply(event);
                if state_tx.send(driver_state.snapshot.clone()).is_err() {
                    break;
                }
            }
        }));

        let store = Self {
            auth_api: AuthApi::new(backend.clone()),
            backend,
            events,
            state,
            notices,
            snapshot_path,
        };
        store.spawn_change_forwarder();
        store
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Watch snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.clone()
    }

    /// Subscribe to user-visible notices.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Exchange credentials for a session and settle the snapshot.
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: &Credentials) -> Result<User, StoreError> {
        self.send(Event::Loading(true))?;
        match self.auth_api.login(credentials).await {
            Ok(user) => {
                self.settle_signed_in(user.clone()).await?;
                self.notify(Notice::success("Signed in"));
                Ok(user)
            }
            Err(err) => {
                self.send(Event::Loading(false))?;
                self.notify(Notice::error(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Create an account, establishing a session on success.
    #[instrument(skip_all)]
    pub async fn register(&self, registration: &Registration) -> Result<User, StoreError> {
        self.send(Event::Loading(true))?;
        match self.auth_api.register(registration).await {
            Ok(user) => {
                self.settle_signed_in(user.clone()).await?;
                self.notify(Notice::success("Account created"));
                Ok(user)
            }
            Err(err) => {
                self.send(Event::Loading(false))?;
                self.notify(Notice::error(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// End the session. The local state is cleared even when the remote
    /// termination fails.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), StoreError> {
        self.send(Event::Loading(true))?;
        let result = self.auth_api.logout().await;
        self.send(Event::SignedOut)?;
        match result {
            Ok(()) => {
                self.notify(Notice::success("Signed out"));
                Ok(())
            }
            Err(err) => {
                self.notify(Notice::error(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Startup path: restore a persisted session, verify it, and load the
    /// profile. Settles the snapshot to authenticated or unauthenticated;
    /// never leaves it loading.
    ///
    /// A restored session whose profile is gone is torn down completely,
    /// including the persisted snapshot.
    #[instrument(skip_all)]
    pub async fn check_auth(&self) -> Result<Option<User>, StoreError> {
        let saved = self
            .snapshot_path
            .as_deref()
            .and_then(persist::load_saved_session);
        let Some(saved) = saved else {
            self.send(Event::SignedOut)?;
            return Ok(None);
        };

        self.backend.auth().restore_session(saved.session).await;
        if self.backend.auth().current_user().await.is_err() {
            // Stale access token; the refresh token may still be good.
            if let Err(err) = self.backend.auth().refresh_session().await {
                debug!(error = %err, "saved session is no longer valid");
                self.force_sign_out().await?;
                return Ok(None);
            }
        }

        match self.auth_api.profile().await {
            Ok(user) => {
                self.settle_signed_in(user.clone()).await?;
                Ok(Some(user))
            }
            Err(err) => {
                warn!(error = %err, "restored session has no usable profile");
                self.force_sign_out().await?;
                Ok(None)
            }
        }
    }

    /// Enqueue a signed-in settlement for a freshly loaded profile.
    async fn settle_signed_in(&self, user: User) -> Result<(), StoreError> {
        match self.backend.auth().current_session().await {
            Some(session) => self.send(Event::SignedIn { user, session }),
            // The session vanished between the call and now; the change
            // forwarder has already queued the sign-out.
            None => self.send(Event::Loading(false)),
        }
    }

    /// Tear down session state everywhere: backend cache, remote session,
    /// queue, and persisted snapshot.
    async fn force_sign_out(&self) -> Result<(), StoreError> {
        if let Err(err) = self.backend.auth().sign_out().await {
            warn!(error = %err, "remote sign-out failed during teardown");
        }
        self.send(Event::SignedOut)
    }

    /// Forward backend auth changes into the mutation queue.
    fn spawn_change_forwarder(&self) {
        let mut changes = self.backend.auth().subscribe();
        let store = self.clone();
        drop(tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(AuthChange::SignedIn(_)) => {
                        // The exchange alone carries no profile fields.
                        match store.auth_api.profile().await {
                            Ok(user) => {
                                if store.settle_signed_in(user).await.is_err() {
                                    break;
                                }
                            }
                            Err(DataError::NotAuthenticated) => {}
                            Err(err) => {
                                warn!(error = %err, "profile fetch after sign-in failed");
                                if store.force_sign_out().await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Ok(AuthChange::SignedOut) => {
                        if store.send(Event::SignedOut).is_err() {
                            break;
                        }
                    }
                    Ok(AuthChange::TokenRefreshed(session)) => {
                        if store.send(Event::Refreshed(session)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth change stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    fn send(&self, event: Event) -> Result<(), StoreError> {
        self.events.send(event).map_err(|_| StoreError::Closed)
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
