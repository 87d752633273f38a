//! The application root.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use incident_map_auth::{Authenticator, CredentialStore, Session};
use incident_map_geocoder::GeocodingResolver;
use incident_map_geocoder::service_registry::primary_service;
use incident_map_incident_models::{Incident, IncidentId, IncidentStatus, LatLng, MapBounds};
use incident_map_map::{MapInteractionController, MapWidget, ReportForm, ResolveRequest, VisibleSet};
use incident_map_panel::{DetailPanelController, PanelState, ReEntryTicket};
use incident_map_registry::IncidentRegistry;
use incident_map_store::{FileStore, PersistentStore};
use strum_macros::{AsRefStr, Display};

use crate::{AppConfig, AppError, IncidentDetails, IncidentRow};

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationLevel {
    /// Confirmation, e.g. "Logged in".
    Info,
    /// A refused or failed action.
    Error,
}

/// A message for the user, e.g. a refused mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// How the host should style the message.
    pub level: NotificationLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notification {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// All application state behind one owner.
///
/// Every method runs to completion on the caller's task; the only awaits
/// are address lookups and panel transitions, and neither holds a borrow
/// of the registry across the await.
pub struct IncidentApp<W: MapWidget> {
    registry: IncidentRegistry,
    map: MapInteractionController<W>,
    visible: VisibleSet,
    panel: DetailPanelController,
    resolver: GeocodingResolver,
    session: Session,
    authenticator: Box<dyn Authenticator + Send>,
    notifications: Vec<Notification>,
}

impl<W: MapWidget> IncidentApp<W> {
    /// Loads the incidents, then mounts the map with `initial_bounds`.
    ///
    /// Loading completes before the map is mounted, so the first render
    /// never shows an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the persisted state cannot be loaded.
    pub fn start(
        config: &AppConfig,
        store: PersistentStore,
        widget: W,
        resolver: GeocodingResolver,
        authenticator: Box<dyn Authenticator + Send>,
        initial_bounds: MapBounds,
    ) -> Result<Self, AppError> {
        let registry = IncidentRegistry::load(store)?;
        log::info!(
            "Loaded {} incidents, next id {}",
            registry.len(),
            registry.next_id()
        );

        let mut app = Self {
            registry,
            map: MapInteractionController::new(widget).with_focus_zoom(config.focus_zoom),
            visible: VisibleSet::new(),
            panel: DetailPanelController::new(config.panel_delay),
            resolver,
            session: Session::new(),
            authenticator,
            notifications: Vec::new(),
        };
        app.map.mount(initial_bounds);
        app.refresh_view();
        Ok(app)
    }

    /// Starts the app on the file store, credential file and primary
    /// geocoding service named by `config`.
    ///
    /// Without an enabled geocoding service every lookup falls back to
    /// coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if the credential file is unreadable, the
    /// geocoding client cannot be built, or the stored incidents cannot be
    /// loaded.
    pub fn open(config: &AppConfig, widget: W, initial_bounds: MapBounds) -> Result<Self, AppError> {
        let store = PersistentStore::new(Arc::new(FileStore::new(&config.data_dir)));
        let credentials = CredentialStore::load(&config.credentials_path)?;
        let resolver = match primary_service() {
            Some(service) => GeocodingResolver::from_service(&service, None)?,
            None => {
                log::warn!("No geocoding service enabled; using coordinates for addresses");
                GeocodingResolver::offline()
            }
        };

        Self::start(
            config,
            store,
            widget,
            resolver,
            Box::new(credentials),
            initial_bounds,
        )
    }

    // ── Read access ──────────────────────────────────────────────────

    /// All incidents, oldest report first.
    #[must_use]
    pub fn incidents(&self) -> &[Incident] {
        self.registry.incidents()
    }

    /// The incident registry.
    #[must_use]
    pub const fn registry(&self) -> &IncidentRegistry {
        &self.registry
    }

    /// The map interaction controller.
    #[must_use]
    pub const fn map(&self) -> &MapInteractionController<W> {
        &self.map
    }

    /// The detail panel.
    #[must_use]
    pub const fn panel(&self) -> &DetailPanelController {
        &self.panel
    }

    /// The login session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Incidents inside the current viewport.
    pub fn visible_incidents(&mut self) -> &[Incident] {
        self.visible.refresh(
            self.registry.revision(),
            self.registry.incidents(),
            self.map.bounds(),
        )
    }

    /// Table rows for the visible incidents.
    pub fn table_rows(&mut self) -> Vec<IncidentRow> {
        self.visible_incidents().iter().map(IncidentRow::from).collect()
    }

    /// The incident shown in the detail panel, read from the registry.
    #[must_use]
    pub fn displayed_incident(&self) -> Option<IncidentDetails> {
        self.panel
            .displayed(self.registry.incidents())
            .map(IncidentDetails::from)
    }

    /// Drains pending notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ── Map events ───────────────────────────────────────────────────

    /// Records the viewport after a pan or zoom.
    pub fn move_end(&mut self, bounds: MapBounds) {
        self.map.move_end(bounds);
        self.refresh_view();
    }

    /// Places the pending marker and returns its geocoding job.
    pub fn map_click(&mut self, latlng: LatLng) -> ResolveRequest {
        self.map.click(latlng)
    }

    /// Looks up the address for `request`. Never fails.
    pub async fn resolve(&self, request: ResolveRequest) -> String {
        self.resolver.resolve(request.latlng).await
    }

    /// Delivers a lookup result; stale results are discarded.
    pub fn apply_resolution(&mut self, request: ResolveRequest, address: String) -> bool {
        self.map.complete_resolution(request.generation, address)
    }

    /// Clicks the map and waits for the address of the new marker.
    pub async fn click_and_resolve(&mut self, latlng: LatLng) -> bool {
        let request = self.map_click(latlng);
        let address = self.resolve(request).await;
        self.apply_resolution(request, address)
    }

    /// Opens the report form for the resolved marker.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Form`] if no resolved marker is pending.
    pub fn report_emergency(&mut self) -> Result<ReportForm, AppError> {
        let form = self.map.report_emergency().cloned();
        self.notify_on_error(form)
    }

    /// Submits the report form, creating an `OPEN` incident reported at
    /// `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if the form is incomplete or the incident
    /// cannot be persisted.
    pub fn submit_report(
        &mut self,
        form: ReportForm,
        now: DateTime<Utc>,
    ) -> Result<Incident, AppError> {
        let draft = self.map.submit(form);
        let draft = self.notify_on_error(draft)?;
        let created = self.registry.add(draft, now);
        self.refresh_view();
        self.notify_on_error(created)
    }

    /// Dismisses the pending marker and form.
    pub fn cancel(&mut self) {
        self.map.cancel();
    }

    // ── Incident navigation ──────────────────────────────────────────

    /// Flies to incident `id`, opens its popup and selects it in the
    /// detail panel. Used by the table's "See More" action.
    ///
    /// Returns the panel's re-entry ticket if another incident was shown.
    pub fn focus_incident(&mut self, id: IncidentId) -> Option<ReEntryTicket> {
        let id = self.map.marker_clicked(id, self.registry.incidents())?;
        self.panel.select(id)
    }

    /// Handles a click on an incident marker.
    pub fn marker_clicked(&mut self, id: IncidentId) -> Option<ReEntryTicket> {
        self.focus_incident(id)
    }

    /// Waits for a panel transition and completes it.
    pub async fn finish_panel_transition(&mut self, ticket: ReEntryTicket) -> bool {
        self.panel.settle(ticket).await
    }

    /// Hides the detail panel.
    pub fn close_panel(&mut self) {
        self.panel.close();
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Attempts to log in with `secret`.
    pub fn log_in(&mut self, secret: &str) -> bool {
        let accepted = self.session.log_in(self.authenticator.as_ref(), secret);
        let message = self.session.message().to_string();
        self.notifications.push(if accepted {
            Notification::info(message)
        } else {
            Notification::error(message)
        });
        accepted
    }

    /// Logs out.
    pub fn log_out(&mut self) {
        self.session.log_out();
        self.notifications
            .push(Notification::info(self.session.message().to_string()));
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Opens the panel's "change status" prompt for the displayed
    /// incident and returns the proposed status.
    pub fn propose_status_change(&mut self) -> Option<IncidentStatus> {
        let incident = self.panel.displayed(self.registry.incidents())?;
        Some(self.panel.propose_status_change(incident).clone())
    }

    /// Answers the "change status" prompt. Declining changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Registry`] if the change is refused.
    pub fn answer_status_prompt(
        &mut self,
        accepted: bool,
    ) -> Result<Option<ReEntryTicket>, AppError> {
        let Some(id) = self.panel.selected() else {
            self.panel.answer_status_prompt(false);
            return Ok(None);
        };
        match self.panel.answer_status_prompt(accepted) {
            Some(status) => self.change_status(id, status).map(Some),
            None => Ok(None),
        }
    }

    /// Sets incident `id`'s status and hides the panel so the new status
    /// only appears once the returned ticket completes.
    ///
    /// If the change is applied in memory but cannot be persisted, the map
    /// is refreshed and a panel showing `id` is closed before the error is
    /// returned, so the new status never appears without a re-entry.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Registry`] if the session is not logged in, the
    /// incident does not exist or the change cannot be persisted. A
    /// notification is queued in each case.
    pub fn change_status(
        &mut self,
        id: IncidentId,
        status: IncidentStatus,
    ) -> Result<ReEntryTicket, AppError> {
        let revision = self.registry.revision();
        let changed = self.registry.change_status(&self.session, id, status);
        let applied = self.registry.revision() != revision;
        if applied {
            self.refresh_view();
        }

        match self.notify_on_error(changed) {
            Ok(_) => Ok(self.panel.refresh(id)),
            Err(e) => {
                if applied && self.panel_shows(id) {
                    self.panel.close();
                }
                Err(e)
            }
        }
    }

    /// Deletes incident `id`, hiding the panel if it shows that incident.
    ///
    /// The panel, marker and visible set follow the in-memory registry even
    /// when persisting the deletion fails.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Registry`] if the session is not logged in, the
    /// incident does not exist or the change cannot be persisted. A
    /// notification is queued in each case.
    pub fn delete(&mut self, id: IncidentId) -> Result<Incident, AppError> {
        let revision = self.registry.revision();
        let deleted = self.registry.delete(&self.session, id);
        if self.registry.revision() != revision {
            if self.panel_shows(id) {
                self.panel.close();
            }
            self.map.forget_incident(id);
            self.refresh_view();
        }
        self.notify_on_error(deleted)
    }

    fn panel_shows(&self, id: IncidentId) -> bool {
        match self.panel.state() {
            PanelState::Visible { incident } => incident == id,
            PanelState::ReEntry { ticket } => ticket.incident() == id,
            PanelState::Hidden => false,
        }
    }

    fn refresh_view(&mut self) {
        let visible = self.visible.refresh(
            self.registry.revision(),
            self.registry.incidents(),
            self.map.bounds(),
        );
        self.map.sync_markers(visible);
    }

    fn notify_on_error<T, E: Into<AppError>>(&mut self, result: Result<T, E>) -> Result<T, AppError> {
        result.map_err(|e| {
            let e = e.into();
            log::warn!("{e}");
            self.notifications.push(Notification::error(e.to_string()));
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use incident_map_auth::HashedCredential;
    use incident_map_map::{MarkerKey, Popup};
    use incident_map_store::MemoryStore;

    use super::*;

    #[derive(Debug, Default)]
    struct NullMap {
        next: u32,
        live: BTreeMap<u32, MarkerKey>,
    }

    impl NullMap {
        fn mounted(&self, key: MarkerKey) -> bool {
            self.live.values().any(|k| *k == key)
        }
    }

    impl MapWidget for NullMap {
        type Marker = u32;

        fn place_marker(&mut self, key: MarkerKey, _at: LatLng) -> u32 {
            self.next += 1;
            self.live.insert(self.next, key);
            self.next
        }

        fn remove_marker(&mut self, marker: &u32) {
            self.live.remove(marker);
        }

        fn set_popup(&mut self, _marker: &u32, _popup: Popup) {}

        fn open_popup(&mut self, _marker: &u32) {}

        fn fly_to(&mut self, _center: LatLng, _zoom: f64) {}
    }

    fn vancouver() -> MapBounds {
        MapBounds::new(LatLng::new(49.4, -122.8), LatLng::new(49.1, -123.3))
    }

    fn app() -> IncidentApp<NullMap> {
        let store = PersistentStore::new(Arc::new(MemoryStore::new()));
        let credentials = CredentialStore::from_credentials(vec![HashedCredential::new("hunter2")]);
        IncidentApp::start(
            &AppConfig::default(),
            store,
            NullMap::default(),
            GeocodingResolver::offline(),
            Box::new(credentials),
            vancouver(),
        )
        .unwrap()
    }

    #[test]
    fn start_mounts_markers_for_visible_seed() {
        let mut app = app();
        let visible = app.visible_incidents().len();
        assert!(visible > 0);
        assert_eq!(app.map().widget().live.len(), visible);
    }

    #[test]
    fn login_queues_messages() {
        let mut app = app();
        assert!(!app.log_in("nope"));
        assert!(app.log_in("hunter2"));
        app.log_out();

        let messages: Vec<_> = app
            .take_notifications()
            .into_iter()
            .map(|n| (n.level, n.message))
            .collect();
        assert_eq!(
            messages,
            vec![
                (NotificationLevel::Error, "Incorrect password".to_string()),
                (NotificationLevel::Info, "Logged in".to_string()),
                (NotificationLevel::Info, "Logged out".to_string()),
            ]
        );
        assert!(app.take_notifications().is_empty());
    }

    #[test]
    fn delete_hides_panel_showing_incident() {
        let mut app = app();
        let id = app.visible_incidents()[0].id;
        assert!(app.focus_incident(id).is_none());
        assert_eq!(app.panel().selected(), Some(id));

        app.log_in("hunter2");
        app.delete(id).unwrap();
        assert_eq!(app.panel().selected(), None);
        assert!(!app.map().widget().mounted(MarkerKey::Incident(id)));
        assert!(app.registry().get(id).is_none());
    }

    #[test]
    fn declined_status_prompt_changes_nothing() {
        let mut app = app();
        let id = app.incidents()[0].id;
        app.focus_incident(id);
        app.log_in("hunter2");

        let before = app.registry().get(id).cloned();
        assert!(app.propose_status_change().is_some());
        assert_eq!(app.answer_status_prompt(false).unwrap(), None);
        assert_eq!(app.registry().get(id).cloned(), before);
        assert_eq!(app.panel().selected(), Some(id));
    }
}
