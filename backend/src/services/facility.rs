//! Nearest agricultural store search
//!
//! Expanding-radius search in two phases: first restricted to agricultural
//! input suppliers, then any store. Both phases share one seen-id set, so a
//! store is reported at most once, tagged with the radius where it first
//! appeared. Queries are strictly sequential with a pause between radii.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use shared::{validate_coordinates, Facility, GpsCoordinates};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::PlacesConfig;
use crate::error::{AppError, AppResult};
use crate::external::places::{PlaceCandidate, PlaceDetails, PlacesApi};

/// Most stores a nearest search may report
pub const MAX_NEAREST_RESULTS: usize = 3;

/// Search parameters injected at construction
#[derive(Debug, Clone)]
pub struct SearchPlan {
    /// Ascending radii in meters, reused by both phases
    pub radii: Vec<u32>,
    pub agro_keywords: String,
    pub pause: Duration,
    pub max_results: usize,
    pub deadline: Duration,
    pub listing_limit: usize,
}

impl TryFrom<&PlacesConfig> for SearchPlan {
    type Error = AppError;

    fn try_from(config: &PlacesConfig) -> AppResult<Self> {
        let plan = Self {
            radii: config.radii_meters.clone(),
            agro_keywords: config.agro_keywords.clone(),
            pause: config.pause(),
            max_results: config.max_results,
            deadline: config.search_deadline(),
            listing_limit: config.store_listing_limit,
        };
        plan.validate()?;
        Ok(plan)
    }
}

impl SearchPlan {
    /// Radii must be non-empty and strictly ascending; the quota is 1..=3
    pub fn validate(&self) -> AppResult<()> {
        if self.radii.is_empty() {
            return Err(AppError::Configuration(
                "places.radii_meters must not be empty".to_string(),
            ));
        }
        if self.radii.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AppError::Configuration(format!(
                "places.radii_meters must be strictly ascending, got {:?}",
                self.radii
            )));
        }
        if self.max_results == 0 || self.max_results > MAX_NEAREST_RESULTS {
            return Err(AppError::Configuration(format!(
                "places.max_results must be between 1 and {}, got {}",
                MAX_NEAREST_RESULTS, self.max_results
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Keyword-filtered agricultural suppliers
    Specialized,
    /// Any store
    Fallback,
}

impl SearchPhase {
    fn keyword<'a>(&self, plan: &'a SearchPlan) -> Option<&'a str> {
        match self {
            SearchPhase::Specialized => Some(plan.agro_keywords.as_str()),
            SearchPhase::Fallback => None,
        }
    }
}

/// Per-invocation search state
#[derive(Debug, Default)]
struct SearchState {
    seen: HashSet<String>,
    collected: Vec<Facility>,
}

enum Flow {
    /// Phase exhausted its radii
    Exhausted,
    /// Quota reached
    Full,
    /// Token cancelled or deadline passed
    Interrupted,
}

#[derive(Clone)]
pub struct FacilityLocator {
    places: Arc<dyn PlacesApi>,
    plan: SearchPlan,
}

impl FacilityLocator {
    /// Fails with [`AppError::Configuration`] when the plan is invalid
    pub fn new(places: Arc<dyn PlacesApi>, plan: SearchPlan) -> AppResult<Self> {
        plan.validate()?;
        Ok(Self { places, plan })
    }

    pub fn plan(&self) -> &SearchPlan {
        &self.plan
    }

    /// Up to `max_results` nearest stores, nearest radius first
    pub async fn find_nearest(&self, coords: GpsCoordinates) -> AppResult<Vec<Facility>> {
        self.find_nearest_with(coords, &CancellationToken::new()).await
    }

    /// Like [`find_nearest`](Self::find_nearest), returning what was collected
    /// so far once `cancel` fires or the search deadline passes.
    pub async fn find_nearest_with(
        &self,
        coords: GpsCoordinates,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Facility>> {
        validate_coordinates(&coords).map_err(|m| AppError::InvalidCoordinates(m.to_string()))?;
        self.places.check_credentials()?;

        let deadline = Instant::now() + self.plan.deadline;
        let mut state = SearchState::default();

        for phase in [SearchPhase::Specialized, SearchPhase::Fallback] {
            if state.collected.len() >= self.plan.max_results {
                break;
            }
            match self
                .run_phase(phase, coords, &mut state, cancel, deadline)
                .await
            {
                Flow::Exhausted => {
                    tracing::debug!(
                        ?phase,
                        found = state.collected.len(),
                        "Search phase exhausted all radii"
                    );
                }
                Flow::Full => break,
                Flow::Interrupted => {
                    tracing::warn!(
                        ?phase,
                        found = state.collected.len(),
                        "Store search interrupted, returning partial result"
                    );
                    break;
                }
            }
        }

        tracing::info!(
            lat = coords.latitude,
            lon = coords.longitude,
            found = state.collected.len(),
            "Nearest store search finished"
        );
        Ok(state.collected)
    }

    /// One keyword-filtered query at a single radius, no detail lookups
    pub async fn list_stores(
        &self,
        coords: GpsCoordinates,
        radius_meters: u32,
    ) -> AppResult<Vec<PlaceCandidate>> {
        validate_coordinates(&coords).map_err(|m| AppError::InvalidCoordinates(m.to_string()))?;
        self.places.check_credentials()?;

        let mut stores = self
            .places
            .nearby_search(coords, radius_meters, Some(self.plan.agro_keywords.as_str()))
            .await?;
        stores.truncate(self.plan.listing_limit);
        Ok(stores)
    }

    async fn run_phase(
        &self,
        phase: SearchPhase,
        coords: GpsCoordinates,
        state: &mut SearchState,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Flow {
        for (step, &radius) in self.plan.radii.iter().enumerate() {
            if step > 0
                && !self.plan.pause.is_zero()
                && guarded(tokio::time::sleep(self.plan.pause), cancel, deadline)
                    .await
                    .is_none()
            {
                return Flow::Interrupted;
            }

            let search = self
                .places
                .nearby_search(coords, radius, phase.keyword(&self.plan));
            let candidates = match guarded(search, cancel, deadline).await {
                None => return Flow::Interrupted,
                Some(Ok(candidates)) => candidates,
                Some(Err(e)) => {
                    tracing::warn!(?phase, radius, "Nearby search failed: {}", e);
                    continue;
                }
            };
            tracing::debug!(?phase, radius, count = candidates.len(), "Nearby search");

            for candidate in candidates {
                let Some(place_id) = candidate.place_id else {
                    continue;
                };
                if !state.seen.insert(place_id.clone()) {
                    continue;
                }
                let Some(location) = candidate.location else {
                    tracing::debug!(%place_id, "Skipping place without coordinates");
                    continue;
                };

                let details =
                    match guarded(self.places.place_details(&place_id), cancel, deadline).await {
                        None => return Flow::Interrupted,
                        Some(Ok(details)) => details,
                        Some(Err(e)) => {
                            tracing::warn!(%place_id, "Place details unavailable: {}", e);
                            PlaceDetails::unavailable()
                        }
                    };

                let name = candidate.name.unwrap_or_else(|| "Unknown".to_string());
                state.collected.push(
                    Facility::new(place_id, name, location, radius)
                        .with_contact(Some(details.phone), Some(details.address)),
                );

                if state.collected.len() >= self.plan.max_results {
                    return Flow::Full;
                }
            }
        }
        Flow::Exhausted
    }
}

/// Run `fut` unless cancelled or past the deadline first
async fn guarded<F: Future>(
    fut: F,
    cancel: &CancellationToken,
    deadline: Instant,
) -> Option<F::Output> {
    if cancel.is_cancelled() || Instant::now() >= deadline {
        return None;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        _ = tokio::time::sleep_until(deadline) => None,
        out = fut => Some(out),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use shared::NOT_AVAILABLE;

    use super::*;

    #[derive(Default)]
    struct MockPlaces {
        agro: HashMap<u32, Vec<PlaceCandidate>>,
        generic: HashMap<u32, Vec<PlaceCandidate>>,
        failing: HashSet<(u32, bool)>,
        failing_details: HashSet<String>,
        missing_key: bool,
        cancel_on_call: Option<(usize, CancellationToken)>,
        calls: Mutex<Vec<(u32, bool)>>,
        call_times: Mutex<Vec<Instant>>,
    }

    impl MockPlaces {
        fn calls(&self) -> Vec<(u32, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlacesApi for MockPlaces {
        fn check_credentials(&self) -> AppResult<()> {
            if self.missing_key {
                Err(AppError::MissingCredentials("Places API key".to_string()))
            } else {
                Ok(())
            }
        }

        async fn nearby_search(
            &self,
            _location: GpsCoordinates,
            radius_meters: u32,
            keyword: Option<&str>,
        ) -> AppResult<Vec<PlaceCandidate>> {
            let agro = keyword.is_some();
            self.call_times.lock().unwrap().push(Instant::now());
            let count = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((radius_meters, agro));
                calls.len()
            };
            if let Some((n, token)) = &self.cancel_on_call {
                if *n == count {
                    token.cancel();
                }
            }
            if self.failing.contains(&(radius_meters, agro)) {
                return Err(AppError::Places("timed out".to_string()));
            }
            let table = if agro { &self.agro } else { &self.generic };
            Ok(table.get(&radius_meters).cloned().unwrap_or_default())
        }

        async fn place_details(&self, place_id: &str) -> AppResult<PlaceDetails> {
            if self.failing_details.contains(place_id) {
                return Err(AppError::Places("details failed".to_string()));
            }
            Ok(PlaceDetails {
                phone: format!("+91 {}", place_id),
                address: format!("{} road", place_id),
            })
        }
    }

    fn place(id: &str) -> PlaceCandidate {
        PlaceCandidate {
            place_id: Some(id.to_string()),
            name: Some(format!("Store {}", id)),
            location: Some(GpsCoordinates::new(18.52, 73.85)),
            vicinity: None,
            rating: None,
            open_now: None,
            types: vec!["store".to_string()],
        }
    }

    fn plan(radii: &[u32]) -> SearchPlan {
        SearchPlan {
            radii: radii.to_vec(),
            pause: Duration::ZERO,
            ..SearchPlan::try_from(&PlacesConfig::default()).unwrap()
        }
    }

    fn locator(mock: &Arc<MockPlaces>, radii: &[u32]) -> FacilityLocator {
        FacilityLocator::new(mock.clone(), plan(radii)).unwrap()
    }

    fn ids(facilities: &[Facility]) -> Vec<&str> {
        facilities.iter().map(|f| f.place_id.as_str()).collect()
    }

    const PUNE: GpsCoordinates = GpsCoordinates {
        latitude: 18.5204,
        longitude: 73.8567,
    };

    #[tokio::test]
    async fn test_stops_at_three_without_duplicates() {
        let mut mock = MockPlaces::default();
        mock.agro.insert(500, vec![place("a"), place("b")]);
        mock.agro.insert(1000, vec![place("b"), place("c"), place("d")]);
        let mock = Arc::new(mock);

        let found = locator(&mock, &[500, 1000, 2000])
            .find_nearest(PUNE)
            .await
            .unwrap();

        assert_eq!(ids(&found), vec!["a", "b", "c"]);
        assert_eq!(
            found.iter().map(|f| f.radius_found_at).collect::<Vec<_>>(),
            vec![500, 500, 1000]
        );
        assert_eq!(mock.calls(), vec![(500, true), (1000, true)]);
    }

    #[tokio::test]
    async fn test_nothing_anywhere_is_empty_not_error() {
        let mock = Arc::new(MockPlaces::default());
        let radii = [500, 1000, 2000, 5000, 10000, 20000, 30000];

        let found = locator(&mock, &radii).find_nearest(PUNE).await.unwrap();

        assert!(found.is_empty());
        assert_eq!(mock.calls().len(), radii.len() * 2);
    }

    #[tokio::test]
    async fn test_two_agro_hits_then_fallback() {
        let mut mock = MockPlaces::default();
        mock.agro.insert(500, vec![place("near")]);
        mock.agro.insert(2000, vec![place("far")]);
        let mock = Arc::new(mock);

        let found = locator(&mock, &[500, 1000, 2000])
            .find_nearest(PUNE)
            .await
            .unwrap();

        assert_eq!(ids(&found), vec!["near", "far"]);
        assert_eq!(found[0].radius_found_at, 500);
        assert_eq!(found[1].radius_found_at, 2000);
        assert_eq!(
            mock.calls(),
            vec![
                (500, true),
                (1000, true),
                (2000, true),
                (500, false),
                (1000, false),
                (2000, false)
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_never_readds_specialized_ids() {
        let mut mock = MockPlaces::default();
        mock.agro.insert(500, vec![place("a")]);
        mock.generic.insert(500, vec![place("a"), place("e")]);
        mock.generic.insert(1000, vec![place("e"), place("f"), place("g")]);
        let mock = Arc::new(mock);

        let found = locator(&mock, &[500, 1000]).find_nearest(PUNE).await.unwrap();

        assert_eq!(ids(&found), vec!["a", "e", "f"]);
        assert_eq!(found[2].radius_found_at, 1000);
    }

    #[tokio::test]
    async fn test_failed_query_counts_as_empty() {
        let mut mock = MockPlaces::default();
        mock.failing.insert((500, true));
        mock.agro.insert(500, vec![place("hidden")]);
        mock.agro.insert(1000, vec![place("a")]);
        let mock = Arc::new(mock);

        let found = locator(&mock, &[500, 1000]).find_nearest(PUNE).await.unwrap();

        assert_eq!(ids(&found), vec!["a"]);
        assert_eq!(found[0].radius_found_at, 1000);
    }

    #[tokio::test]
    async fn test_failed_details_degrade_to_not_available() {
        let mut mock = MockPlaces::default();
        mock.agro.insert(500, vec![place("a"), place("b")]);
        mock.failing_details.insert("b".to_string());
        let mock = Arc::new(mock);

        let found = locator(&mock, &[500]).find_nearest(PUNE).await.unwrap();

        assert_eq!(found[0].phone, "+91 a");
        assert_eq!(found[0].address, "a road");
        assert_eq!(found[1].phone, NOT_AVAILABLE);
        assert_eq!(found[1].address, NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_places_without_id_or_location_are_skipped() {
        let no_id = PlaceCandidate {
            place_id: None,
            ..place("ignored")
        };
        let no_location = PlaceCandidate {
            location: None,
            ..place("x")
        };
        let mut mock = MockPlaces::default();
        mock.agro.insert(500, vec![no_id, no_location]);
        mock.generic.insert(500, vec![place("x"), place("y")]);
        let mock = Arc::new(mock);

        let found = locator(&mock, &[500]).find_nearest(PUNE).await.unwrap();

        assert_eq!(ids(&found), vec!["y"]);
    }

    #[tokio::test]
    async fn test_missing_credentials_issue_no_queries() {
        let mock = Arc::new(MockPlaces {
            missing_key: true,
            ..MockPlaces::default()
        });

        let result = locator(&mock, &[500]).find_nearest(PUNE).await;

        assert!(matches!(result, Err(AppError::MissingCredentials(_))));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected() {
        let mock = Arc::new(MockPlaces::default());

        let result = locator(&mock, &[500])
            .find_nearest(GpsCoordinates::new(91.0, 73.0))
            .await;

        assert!(matches!(result, Err(AppError::InvalidCoordinates(_))));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_returns_partial_result() {
        let token = CancellationToken::new();
        let mut mock = MockPlaces {
            cancel_on_call: Some((2, token.clone())),
            ..MockPlaces::default()
        };
        mock.agro.insert(500, vec![place("a")]);
        mock.agro.insert(1000, vec![place("b")]);
        let mock = Arc::new(mock);

        let found = locator(&mock, &[500, 1000, 2000])
            .find_nearest_with(PUNE, &token)
            .await
            .unwrap();

        assert_eq!(ids(&found), vec!["a"]);
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_elapsed_deadline_stops_before_querying() {
        let mut mock = MockPlaces::default();
        mock.agro.insert(500, vec![place("a")]);
        let mock = Arc::new(mock);
        let locator = FacilityLocator::new(
            mock.clone(),
            SearchPlan {
                deadline: Duration::ZERO,
                ..plan(&[500])
            },
        )
        .unwrap();

        let found = locator.find_nearest(PUNE).await.unwrap();

        assert!(found.is_empty());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_stores_single_query_with_limit() {
        let mut mock = MockPlaces::default();
        mock.agro
            .insert(5000, (0..15).map(|i| place(&format!("s{}", i))).collect());
        let mock = Arc::new(mock);

        let stores = locator(&mock, &[500]).list_stores(PUNE, 5000).await.unwrap();

        assert_eq!(stores.len(), 10);
        assert_eq!(mock.calls(), vec![(5000, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_between_radii_not_before_phase() {
        let mock = Arc::new(MockPlaces::default());
        let locator = FacilityLocator::new(
            mock.clone(),
            SearchPlan {
                pause: Duration::from_millis(300),
                ..plan(&[500, 1000, 2000])
            },
        )
        .unwrap();

        let found = locator.find_nearest(PUNE).await.unwrap();

        assert!(found.is_empty());
        let times = mock.call_times.lock().unwrap().clone();
        let gaps: Vec<u128> = times
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis())
            .collect();
        assert_eq!(gaps, vec![300, 300, 0, 300, 300]);
    }

    fn assert_rejected(plan: SearchPlan) {
        let mock = Arc::new(MockPlaces::default());
        assert!(matches!(plan.validate(), Err(AppError::Configuration(_))));
        assert!(matches!(
            FacilityLocator::new(mock, plan),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_default_plan_is_valid() {
        let plan = SearchPlan::try_from(&PlacesConfig::default()).unwrap();
        assert_eq!(plan.max_results, MAX_NEAREST_RESULTS);
        assert_eq!(plan.radii.first(), Some(&500));
    }

    #[test]
    fn test_empty_radii_rejected() {
        assert_rejected(plan(&[]));
    }

    #[test]
    fn test_descending_radii_rejected() {
        assert_rejected(plan(&[2000, 500]));
    }

    #[test]
    fn test_duplicate_radii_rejected() {
        assert_rejected(plan(&[500, 1000, 1000]));
    }

    #[test]
    fn test_quota_outside_one_to_three_rejected() {
        assert_rejected(SearchPlan {
            max_results: 0,
            ..plan(&[500])
        });
        assert_rejected(SearchPlan {
            max_results: 5,
            ..plan(&[500])
        });
    }

    #[test]
    fn test_bad_config_fails_conversion() {
        let config = PlacesConfig {
            radii_meters: vec![1000, 500],
            ..PlacesConfig::default()
        };
        assert!(matches!(
            SearchPlan::try_from(&config),
            Err(AppError::Configuration(_))
        ));

        let config = PlacesConfig {
            max_results: 4,
            ..PlacesConfig::default()
        };
        assert!(matches!(
            SearchPlan::try_from(&config),
            Err(AppError::Configuration(_))
        ));
    }
}
