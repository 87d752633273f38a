//! Derivation of the incidents visible in the current viewport.

use incident_map_incident_models::{Incident, MapBounds};

/// Returns the incidents strictly inside `bounds`, in input order.
///
/// Returns nothing until bounds are known. Incidents at the
/// [`LatLng::UNSET`](incident_map_incident_models::LatLng::UNSET) sentinel
/// never match because the sentinel lies outside every real viewport.
#[must_use]
pub fn filter(incidents: &[Incident], bounds: Option<&MapBounds>) -> Vec<Incident> {
    let Some(bounds) = bounds else {
        return Vec::new();
    };

    incidents
        .iter()
        .filter(|incident| bounds.contains(incident.latlng))
        .cloned()
        .collect()
}

/// Memoised [`filter`] output, recomputed only when the registry revision
/// or the bounds change.
#[derive(Debug, Default)]
pub struct VisibleSet {
    key: Option<(u64, Option<MapBounds>)>,
    incidents: Vec<Incident>,
}

impl VisibleSet {
    /// Creates an empty, never-computed set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the visible incidents for `incidents` at `revision` under
    /// `bounds`, recomputing if either input changed since the last call.
    pub fn refresh(
        &mut self,
        revision: u64,
        incidents: &[Incident],
        bounds: Option<&MapBounds>,
    ) -> &[Incident] {
        let key = (revision, bounds.copied());
        if self.key != Some(key) {
            self.incidents = filter(incidents, bounds);
            self.key = Some(key);
            log::debug!(
                "Viewport shows {} of {} incidents",
                self.incidents.len(),
                incidents.len()
            );
        }
        &self.incidents
    }

    /// The last computed result.
    #[must_use]
    pub fn current(&self) -> &[Incident] {
        &self.incidents
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use incident_map_incident_models::{IncidentId, IncidentStatus, LatLng};

    use super::*;

    fn incident(id: u64, latlng: LatLng) -> Incident {
        Incident {
            id: IncidentId(id),
            location: format!("Spot {id}"),
            kind: "medical".to_string(),
            time_reported: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(i64::try_from(id).unwrap()),
            status: IncidentStatus::open(),
            latlng,
            reported_by: None,
            phone_number: None,
            comments: None,
            image: None,
        }
    }

    fn bounds() -> MapBounds {
        MapBounds::new(LatLng::new(50.0, -122.0), LatLng::new(49.0, -124.0))
    }

    fn sample() -> Vec<Incident> {
        vec![
            incident(0, LatLng::new(49.5, -123.0)),
            incident(1, LatLng::new(51.0, -123.0)),
            incident(2, LatLng::UNSET),
            incident(3, LatLng::new(49.1, -122.5)),
        ]
    }

    fn ids(incidents: &[Incident]) -> Vec<u64> {
        incidents.iter().map(|i| i.id.value()).collect()
    }

    #[test]
    fn no_bounds_shows_nothing() {
        assert!(filter(&sample(), None).is_empty());
    }

    #[test]
    fn keeps_only_incidents_inside_bounds_in_order() {
        assert_eq!(ids(&filter(&sample(), Some(&bounds()))), vec![0, 3]);
    }

    #[test]
    fn sentinel_never_passes_even_huge_bounds() {
        let world = MapBounds::new(LatLng::new(90.0, 180.0), LatLng::new(-90.0, -180.0));
        assert!(!ids(&filter(&sample(), Some(&world))).contains(&2));
    }

    #[test]
    fn filtering_is_idempotent() {
        let once = filter(&sample(), Some(&bounds()));
        let twice = filter(&once, Some(&bounds()));
        assert_eq!(once, twice);
    }

    #[test]
    fn visible_set_recomputes_on_revision_or_bounds_change() {
        let mut set = VisibleSet::new();
        let mut incidents = sample();
        assert!(set.refresh(0, &incidents, None).is_empty());
        assert_eq!(ids(set.refresh(0, &incidents, Some(&bounds()))), vec![0, 3]);

        incidents.push(incident(4, LatLng::new(49.9, -123.9)));
        // Same revision: stale input is not re-read.
        assert_eq!(ids(set.refresh(0, &incidents, Some(&bounds()))), vec![0, 3]);
        assert_eq!(ids(set.refresh(1, &incidents, Some(&bounds()))), vec![0, 3, 4]);
        assert_eq!(ids(set.current()), vec![0, 3, 4]);
    }
}
