#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Detail panel visibility state machine.
//!
//! The panel slides in to show one incident. Its content is never swapped
//! while it is on screen: selecting a different incident, or changing the
//! shown incident's status, first hides the panel, waits
//! [`DEFAULT_PANEL_DELAY`] for the slide-out, and only then shows the
//! new selection.
//!
//! ```text
//!   Hidden --select--> Visible --select other / refresh--> ReEntry
//!     ^                   ^                                  |
//!     |                   +-------- delay elapsed -----------+
//!     +--------------- close (from any state) ---------------+
//! ```
//!
//! Timing is expressed as [`ReEntryTicket`]s. The owner awaits
//! [`ReEntryTicket::elapsed`] and hands the ticket back to
//! [`DetailPanelController::finish`]; tickets invalidated by a later
//! transition are ignored.

use std::time::Duration;

use incident_map_incident_models::{Incident, IncidentId, IncidentStatus};
use strum_macros::{AsRefStr, Display};
use tokio::time::Instant;

/// Slide-out time before the panel reappears with new content.
pub const DEFAULT_PANEL_DELAY: Duration = Duration::from_millis(500);

/// Coarse panel phase, for logging and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PanelPhase {
    /// Off screen.
    Hidden,
    /// On screen, showing an incident.
    Visible,
    /// Off screen, waiting to show a new selection.
    ReEntry,
}

/// A pending re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReEntryTicket {
    generation: u64,
    incident: IncidentId,
    due: Instant,
}

impl ReEntryTicket {
    /// The incident that will be shown.
    #[must_use]
    pub const fn incident(&self) -> IncidentId {
        self.incident
    }

    /// When the panel may reappear.
    #[must_use]
    pub const fn due(&self) -> Instant {
        self.due
    }

    /// Waits until the slide-out has finished.
    pub async fn elapsed(&self) {
        tokio::time::sleep_until(self.due).await;
    }
}

/// Panel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    /// Off screen.
    Hidden,
    /// Showing `incident`.
    Visible {
        /// Selected incident.
        incident: IncidentId,
    },
    /// Off screen until `ticket` is finished.
    ReEntry {
        /// The pending transition.
        ticket: ReEntryTicket,
    },
}

/// Drives the detail panel.
#[derive(Debug)]
pub struct DetailPanelController {
    state: PanelState,
    generation: u64,
    delay: Duration,
    proposed_status: Option<IncidentStatus>,
}

impl Default for DetailPanelController {
    fn default() -> Self {
        Self::new(DEFAULT_PANEL_DELAY)
    }
}

impl DetailPanelController {
    /// Creates a hidden panel with the given slide-out delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            state: PanelState::Hidden,
            generation: 0,
            delay,
            proposed_status: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PanelState {
        self.state
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> PanelPhase {
        match self.state {
            PanelState::Hidden => PanelPhase::Hidden,
            PanelState::Visible { .. } => PanelPhase::Visible,
            PanelState::ReEntry { .. } => PanelPhase::ReEntry,
        }
    }

    /// Whether the panel is on screen.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        matches!(self.state, PanelState::Visible { .. })
    }

    /// The incident on screen, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<IncidentId> {
        match self.state {
            PanelState::Visible { incident } => Some(incident),
            PanelState::Hidden | PanelState::ReEntry { .. } => None,
        }
    }

    /// The on-screen incident, read fresh from `incidents`.
    #[must_use]
    pub fn displayed<'a>(&self, incidents: &'a [Incident]) -> Option<&'a Incident> {
        let id = self.selected()?;
        incidents.iter().find(|incident| incident.id == id)
    }

    /// Selects `incident`.
    ///
    /// A hidden panel shows it immediately. A panel showing something else
    /// (or already re-entering) hides and returns a ticket for the delayed
    /// reappearance. Selecting the incident already on screen does nothing.
    pub fn select(&mut self, incident: IncidentId) -> Option<ReEntryTicket> {
        match self.state {
            PanelState::Hidden => {
                self.show(incident);
                None
            }
            PanelState::Visible { incident: current } if current == incident => None,
            PanelState::Visible { .. } | PanelState::ReEntry { .. } => {
                Some(self.start_reentry(incident))
            }
        }
    }

    /// Hides the panel and schedules `incident` to reappear, so updated
    /// content is only shown after a full slide-out.
    pub fn refresh(&mut self, incident: IncidentId) -> ReEntryTicket {
        self.start_reentry(incident)
    }

    /// Hides the panel and cancels any pending re-entry.
    pub fn close(&mut self) {
        self.generation += 1;
        self.proposed_status = None;
        self.state = PanelState::Hidden;
        log::debug!("Detail panel closed");
    }

    /// Completes a re-entry. Returns `false` if the ticket was superseded
    /// or its delay has not elapsed yet.
    pub fn finish(&mut self, ticket: ReEntryTicket) -> bool {
        let PanelState::ReEntry { ticket: current } = self.state else {
            return false;
        };
        if current.generation != ticket.generation {
            log::debug!("Ignoring superseded panel transition");
            return false;
        }
        if Instant::now() < ticket.due {
            return false;
        }
        self.show(ticket.incident);
        true
    }

    /// Waits for `ticket` and completes it.
    pub async fn settle(&mut self, ticket: ReEntryTicket) -> bool {
        ticket.elapsed().await;
        self.finish(ticket)
    }

    /// Opens the "change status" prompt for `incident`, proposing the
    /// opposite of its current status. Returns the proposal.
    pub fn propose_status_change(&mut self, incident: &Incident) -> &IncidentStatus {
        self.proposed_status.insert(incident.status.toggled())
    }

    /// The status offered by the open prompt.
    #[must_use]
    pub const fn proposed_status(&self) -> Option<&IncidentStatus> {
        self.proposed_status.as_ref()
    }

    /// Closes the prompt. Returns the proposed status if the user accepted.
    pub fn answer_status_prompt(&mut self, accepted: bool) -> Option<IncidentStatus> {
        let proposal = self.proposed_status.take();
        if accepted { proposal } else { None }
    }

    fn show(&mut self, incident: IncidentId) {
        self.state = PanelState::Visible { incident };
        log::debug!("Detail panel showing incident {incident}");
    }

    fn start_reentry(&mut self, incident: IncidentId) -> ReEntryTicket {
        self.generation += 1;
        self.proposed_status = None;
        let ticket = ReEntryTicket {
            generation: self.generation,
            incident,
            due: Instant::now() + self.delay,
        };
        self.state = PanelState::ReEntry { ticket };
        log::debug!(
            "Detail panel re-entering with incident {incident} in {:?}",
            self.delay
        );
        ticket
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use incident_map_incident_models::LatLng;

    use super::*;

    fn incident(id: u64, status: IncidentStatus) -> Incident {
        Incident {
            id: IncidentId(id),
            location: "Here".to_string(),
            kind: "medical".to_string(),
            time_reported: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            status,
            latlng: LatLng::new(49.0, -123.0),
            reported_by: None,
            phone_number: None,
            comments: None,
            image: None,
        }
    }

    #[test]
    fn hidden_panel_shows_selection_immediately() {
        let mut panel = DetailPanelController::default();
        assert_eq!(panel.select(IncidentId(1)), None);
        assert_eq!(panel.selected(), Some(IncidentId(1)));
        assert_eq!(panel.phase(), PanelPhase::Visible);
        assert_eq!(panel.select(IncidentId(1)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn changing_selection_hides_then_reenters_after_delay() {
        let mut panel = DetailPanelController::default();
        panel.select(IncidentId(1));

        let ticket = panel.select(IncidentId(2)).unwrap();
        assert_eq!(panel.phase(), PanelPhase::ReEntry);
        assert_eq!(panel.selected(), None);
        assert!(!panel.finish(ticket), "finished before the delay");

        tokio::time::advance(DEFAULT_PANEL_DELAY).await;
        assert!(panel.finish(ticket));
        assert_eq!(panel.selected(), Some(IncidentId(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_selection_supersedes_older_ticket() {
        let mut panel = DetailPanelController::default();
        panel.select(IncidentId(1));
        let first = panel.select(IncidentId(2)).unwrap();
        let second = panel.select(IncidentId(3)).unwrap();

        assert!(!panel.settle(first).await);
        assert!(panel.settle(second).await);
        assert_eq!(panel.selected(), Some(IncidentId(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_reentry() {
        let mut panel = DetailPanelController::default();
        panel.select(IncidentId(1));
        let ticket = panel.refresh(IncidentId(1));
        panel.close();

        assert!(!panel.settle(ticket).await);
        assert_eq!(panel.phase(), PanelPhase::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_shows_updated_incident_only_after_delay() {
        let mut incidents = vec![incident(4, IncidentStatus::open())];
        let mut panel = DetailPanelController::new(Duration::from_millis(200));
        panel.select(IncidentId(4));

        incidents[0] = incidents[0].with_status(IncidentStatus::resolved());
        let ticket = panel.refresh(IncidentId(4));
        assert!(panel.displayed(&incidents).is_none());

        let start = Instant::now();
        assert!(panel.settle(ticket).await);
        assert_eq!(start.elapsed(), Duration::from_millis(200));
        assert!(panel.displayed(&incidents).unwrap().status.is_resolved());
    }

    #[test]
    fn status_prompt_proposes_toggle() {
        let mut panel = DetailPanelController::default();
        let open = incident(1, IncidentStatus::open());

        assert_eq!(panel.propose_status_change(&open), &IncidentStatus::resolved());
        assert_eq!(panel.answer_status_prompt(false), None);
        assert_eq!(panel.proposed_status(), None);

        panel.propose_status_change(&open);
        assert_eq!(
            panel.answer_status_prompt(true),
            Some(IncidentStatus::resolved())
        );
    }

    #[test]
    fn phase_names() {
        assert_eq!(PanelPhase::ReEntry.to_string(), "re_entry");
        assert_eq!(PanelPhase::Hidden.as_ref(), "hidden");
    }
}
