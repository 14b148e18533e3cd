use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::BookingConfig;
use crate::dates::normalize_date;
use crate::db::models::{Booking, BookingInfo, ClassDay, NewStudent, Student, StudentUpdate};
use crate::db::{BookingRepository, ClassDayRepository, SheetHandle, SheetStore, StudentRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::session::{Session, SessionStore};
use crate::services::sync::SyncAggregator;

/// Everything a front end renders. Replaced wholesale on every sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataState {
    pub is_authenticated: bool,
    pub spreadsheet_id: Option<String>,
    pub students: Vec<Student>,
    pub bookings: Vec<BookingInfo>,
    pub class_days: Vec<ClassDay>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub auto_sync: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Booking rows as read, including those whose student left the roster.
    #[serde(skip)]
    pub booking_rows: Vec<Booking>,
}

pub type Listener = Arc<dyn Fn(&DataState) + Send + Sync>;

/// Returned by `subscribe`; pass it back to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Observable front door to the spreadsheet.
///
/// - Holds the session (token, spreadsheet id, auto-sync flag) and persists it.
/// - Every mutation performs one remote write and then re-reads all tables;
///   local state is never patched in place.
/// - Errors end up in `DataState::error`; an authentication failure logs out.
///
/// Calls are not serialized: overlapping syncs race and the last one to
/// finish wins.
pub struct DataService {
    store: SheetStore,
    sessions: Arc<dyn SessionStore>,
    booking: BookingConfig,
    state: RwLock<DataState>,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_listener: AtomicU64,
}

impl DataService {
    pub fn new(store: SheetStore, sessions: Arc<dyn SessionStore>, booking: BookingConfig) -> Self {
        Self {
            store,
            sessions,
            booking,
            state: RwLock::new(DataState::default()),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    // ------------------------------------------------------------------
    // Observable
    // ------------------------------------------------------------------

    pub fn state(&self) -> DataState {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&DataState) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(listener));
        Subscription(id)
    }

    /// Returns whether the listener was still registered. Safe to call twice.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&subscription.0)
            .is_some()
    }

    /// Apply `change` and notify every listener with the new state.
    fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut DataState),
    {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            change(&mut state);
            state.clone()
        };

        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    async fn persist<F>(&self, change: F)
    where
        F: FnOnce(&mut Session),
    {
        let result: AppResult<()> = async {
            let mut session = self.sessions.load().await?;
            change(&mut session);
            self.sessions.save(&session).await
        }
        .await;

        if let Err(e) = result {
            warn!("Failed to persist session: {}", e);
        }
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Resume a persisted session: re-use the saved token and, when a
    /// spreadsheet is also saved, sync right away.
    pub async fn restore(&self) {
        let session = match self.sessions.load().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to load saved session: {}", e);
                return;
            }
        };

        let Some(token) = session.access_token else {
            debug!("No saved session");
            self.update(|s| {
                s.spreadsheet_id = session.spreadsheet_id.clone();
                s.auto_sync = session.auto_sync;
            });
            return;
        };

        info!("Restoring saved session");
        self.store.set_access_token(Some(token)).await;
        self.update(|s| {
            s.is_authenticated = true;
            s.spreadsheet_id = session.spreadsheet_id.clone();
            s.auto_sync = session.auto_sync;
        });

        if session.spreadsheet_id.is_some() {
            if let Err(e) = self.sync_all().await {
                warn!("Failed to sync data on restore: {}", e);
            }
        }
    }

    pub async fn login(&self, token: &str) -> AppResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }

        info!("Signing in");
        self.store.set_access_token(Some(token.to_string())).await;
        self.update(|s| {
            s.is_authenticated = true;
            s.error = None;
        });
        let token = token.to_string();
        self.persist(|session| session.access_token = Some(token)).await;
        Ok(())
    }

    pub async fn logout(&self) {
        info!("Signing out");
        self.store.set_access_token(None).await;
        self.update(|s| {
            s.is_authenticated = false;
            s.spreadsheet_id = None;
        });
        self.persist(|session| {
            session.access_token = None;
            session.spreadsheet_id = None;
        })
        .await;
    }

    /// Select the target spreadsheet. Does not sync.
    pub async fn set_spreadsheet_id(&self, id: &str) -> AppResult<()> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AppError::BadRequest(i18n::t("spreadsheet.not_set")));
        }

        info!("Using spreadsheet {}", id);
        let id = id.to_string();
        self.update(|s| s.spreadsheet_id = Some(id.clone()));
        self.persist(|session| session.spreadsheet_id = Some(id)).await;
        Ok(())
    }

    pub async fn set_auto_sync(&self, enabled: bool) {
        info!("Auto-sync {}", if enabled { "enabled" } else { "disabled" });
        self.update(|s| s.auto_sync = enabled);
        self.persist(|session| session.auto_sync = enabled).await;
    }

    /// Whether the periodic worker should sync right now.
    pub fn auto_sync_active(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.auto_sync && state.is_authenticated
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Re-read all tables and replace students, class days and bookings.
    pub async fn sync_all(&self) -> AppResult<()> {
        let (spreadsheet_id, authenticated) = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            (state.spreadsheet_id.clone(), state.is_authenticated)
        };
        let Some(spreadsheet_id) = spreadsheet_id.filter(|_| authenticated) else {
            return Err(self
                .fail(AppError::BadRequest(i18n::t("sync.not_configured")))
                .await);
        };

        info!("Syncing spreadsheet {}", spreadsheet_id);
        self.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let result: AppResult<_> = async {
            let sheet = self.store.handle(&spreadsheet_id).await?;
            SyncAggregator::sync_all(&sheet).await
        }
        .await;

        match result {
            Ok(snapshot) => {
                let bookings = SyncAggregator::booking_infos(&snapshot);
                self.update(|s| {
                    s.students = snapshot.students;
                    s.class_days = snapshot.class_days;
                    s.bookings = bookings;
                    s.booking_rows = snapshot.bookings;
                    s.error = None;
                    s.is_loading = false;
                    s.last_synced_at = Some(Utc::now());
                });
                info!("Sync finished");
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Final sink for every error: record it, stop loading, and drop the
    /// session when the token is no longer accepted.
    async fn fail(&self, e: AppError) -> AppError {
        error!("Data service error: {}", e);
        let message = e.user_message();
        self.update(|s| {
            s.error = Some(message);
            s.is_loading = false;
        });
        if e.is_auth_failure() {
            warn!("Authentication failure; forcing logout");
            self.logout().await;
        }
        e
    }

    /// Common prologue of every mutation: resolve the target sheet and mark loading.
    async fn begin_mutation(&self) -> AppResult<SheetHandle> {
        let spreadsheet_id = self.state().spreadsheet_id;
        let Some(spreadsheet_id) = spreadsheet_id else {
            return Err(self
                .fail(AppError::BadRequest(i18n::t("spreadsheet.not_set")))
                .await);
        };

        self.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        match self.store.handle(&spreadsheet_id).await {
            Ok(sheet) => Ok(sheet),
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Common epilogue: refresh after a successful write, or record the failure.
    ///
    /// A refresh failure does not undo the write; it only shows up in the state.
    async fn finish_mutation<T>(&self, result: AppResult<T>) -> AppResult<T> {
        match result {
            Ok(value) => {
                if let Err(e) = self.sync_all().await {
                    warn!("Write succeeded but refresh failed: {}", e);
                }
                Ok(value)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    // ------------------------------------------------------------------
    // Students
    // ------------------------------------------------------------------

    pub async fn add_student(&self, new: NewStudent) -> AppResult<Student> {
        let sheet = self.begin_mutation().await?;
        let result = StudentRepository::add(&sheet, new).await;
        self.finish_mutation(result).await
    }

    /// Edit a student known from the last sync. Deactivation is `active: Some(false)`;
    /// students are never removed from the roster.
    pub async fn edit_student(&self, id: &str, update: StudentUpdate) -> AppResult<Student> {
        let current = self.state().students.into_iter().find(|s| s.id == id);
        let Some(current) = current else {
            return Err(self
                .fail(AppError::NotFound(i18n::t_with(
                    "student.not_found",
                    &[("id", id)],
                )))
                .await);
        };

        let updated = update.apply_to(&current);
        if updated.name.is_empty() {
            return Err(self
                .fail(AppError::BadRequest(i18n::t("student.name_required")))
                .await);
        }

        let sheet = self.begin_mutation().await?;
        let result: AppResult<Student> = async {
            StudentRepository::update(&sheet, &updated).await?;
            if updated.name != current.name {
                BookingRepository::rename_student(&sheet, &updated).await?;
            }
            Ok(updated.clone())
        }
        .await;
        self.finish_mutation(result).await
    }

    // ------------------------------------------------------------------
    // Class days
    // ------------------------------------------------------------------

    pub async fn start_class(&self, date: &str) -> AppResult<ClassDay> {
        let sheet = self.begin_mutation().await?;
        let result = ClassDayRepository::add(&sheet, date).await;
        self.finish_mutation(result).await
    }

    /// Close a class day. Existing bookings only block this when
    /// `close_class_requires_empty` is configured.
    pub async fn close_class(&self, date: &str) -> AppResult<()> {
        let date = match normalize_date(date) {
            Ok(date) => date,
            Err(e) => return Err(self.fail(e).await),
        };

        if self.booking.close_class_requires_empty {
            let booked = self.booking_rows_on(&date);
            if booked > 0 {
                let count = booked.to_string();
                return Err(self
                    .fail(AppError::Conflict(i18n::t_with(
                        "class_day.has_bookings",
                        &[("count", count.as_str())],
                    )))
                    .await);
            }
        }

        let sheet = self.begin_mutation().await?;
        let result = ClassDayRepository::delete(&sheet, &date).await;
        self.finish_mutation(result).await
    }

    // ------------------------------------------------------------------
    // Bookings
    // ------------------------------------------------------------------

    /// Distinct student ids booked on `date`, whether or not they are still on the roster.
    fn booked_ids(&self, date: &str) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = Vec::new();
        for row in state.booking_rows.iter().filter(|b| b.date == date) {
            if !ids.contains(&row.student_id) {
                ids.push(row.student_id.clone());
            }
        }
        ids
    }

    fn booking_rows_on(&self, date: &str) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.booking_rows.iter().filter(|b| b.date == date).count()
    }

    /// Book students on a date. Students already booked there (per the last
    /// sync) are skipped so the same pair is not written twice.
    pub async fn add_booking(&self, date: &str, student_ids: &[String]) -> AppResult<Vec<Booking>> {
        let date = match normalize_date(date) {
            Ok(date) => date,
            Err(e) => return Err(self.fail(e).await),
        };

        let requested: Vec<String> = student_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if requested.is_empty() {
            return Err(self
                .fail(AppError::BadRequest(i18n::t("booking.no_students")))
                .await);
        }

        let booked = self.booked_ids(&date);
        let mut to_book: Vec<String> = Vec::with_capacity(requested.len());
        for id in requested {
            if booked.contains(&id) || to_book.contains(&id) {
                continue;
            }
            to_book.push(id);
        }

        if to_book.is_empty() {
            info!("All requested students are already booked on {}", date);
            return Ok(Vec::new());
        }

        if let Some(max) = self.booking.max_students_per_class {
            if booked.len() + to_book.len() > max {
                return Err(self
                    .fail(AppError::Conflict(i18n::t_with(
                        "class_day.full",
                        &[("date", date.as_str())],
                    )))
                    .await);
            }
        }

        let sheet = self.begin_mutation().await?;
        let result = BookingRepository::add(&sheet, &date, &to_book).await;
        self.finish_mutation(result).await
    }

    pub async fn remove_booking(&self, student_id: &str, date: &str) -> AppResult<usize> {
        let sheet = self.begin_mutation().await?;
        let result = BookingRepository::remove(&sheet, student_id, date).await;
        self.finish_mutation(result).await
    }
}
