//! Context provider: current season and best-effort weather

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use shared::{current_season, GpsCoordinates, Season, WeatherSnapshot};

use crate::external::weather::{WeatherProvider, WeatherQuery};

/// Supplies the environmental context a diagnosis is adjusted against
#[derive(Clone)]
pub struct ContextService {
    weather: Arc<dyn WeatherProvider>,
}

impl ContextService {
    pub fn new(weather: Arc<dyn WeatherProvider>) -> Self {
        Self { weather }
    }

    /// Season for today in server local time
    pub fn season_today(&self) -> Season {
        self.season_on(Local::now().date_naive())
    }

    pub fn season_on(&self, date: NaiveDate) -> Season {
        current_season(date)
    }

    /// Current weather, or `None` when it cannot be obtained.
    ///
    /// Without coordinates or a place name no request is made.
    pub async fn fetch_weather(
        &self,
        coords: Option<GpsCoordinates>,
        place: Option<&str>,
    ) -> Option<WeatherSnapshot> {
        let query = WeatherQuery::resolve(coords, place)?;

        match self.weather.current(&query).await {
            Ok(snapshot) => {
                tracing::debug!(
                    location = %snapshot.location_name,
                    humidity = snapshot.humidity,
                    temperature = snapshot.temperature,
                    rain = snapshot.rain,
                    "Fetched current weather"
                );
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!("Weather unavailable for {:?}: {}", query, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AppError, AppResult};

    struct FailingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherProvider for FailingProvider {
        async fn current(&self, _query: &WeatherQuery) -> AppResult<WeatherSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Weather("connection timed out".to_string()))
        }
    }

    struct FixedProvider;

    #[async_trait]
    impl WeatherProvider for FixedProvider {
        async fn current(&self, query: &WeatherQuery) -> AppResult<WeatherSnapshot> {
            let location_name = match query {
                WeatherQuery::Coordinates(_) => "By coordinates",
                WeatherQuery::Place(name) => name.as_str(),
            };
            Ok(WeatherSnapshot {
                humidity: 82.0,
                temperature: 26.0,
                rain: true,
                pressure: 1006.0,
                wind_speed: 3.1,
                condition: "Rain".to_string(),
                description: "moderate rain".to_string(),
                location_name: location_name.to_string(),
            })
        }
    }

    #[test]
    fn test_failure_degrades_to_unavailable() {
        let provider = Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
        });
        let service = ContextService::new(provider.clone());

        let weather = tokio_test::block_on(
            service.fetch_weather(Some(GpsCoordinates::new(20.46, 85.88)), None),
        );
        assert!(weather.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_location_makes_no_request() {
        let provider = Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
        });
        let service = ContextService::new(provider.clone());

        let weather = tokio_test::block_on(service.fetch_weather(None, Some("   ")));
        assert!(weather.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_coordinates_take_precedence() {
        let service = ContextService::new(Arc::new(FixedProvider));

        let weather = tokio_test::block_on(
            service.fetch_weather(Some(GpsCoordinates::new(20.46, 85.88)), Some("Cuttack")),
        )
        .unwrap();
        assert_eq!(weather.location_name, "By coordinates");

        let weather =
            tokio_test::block_on(service.fetch_weather(None, Some("Cuttack"))).unwrap();
        assert_eq!(weather.location_name, "Cuttack");
    }

    #[test]
    fn test_season_on_date() {
        let service = ContextService::new(Arc::new(FixedProvider));
        let july = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        let january = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(service.season_on(july), Season::WetMonsoon);
        assert_eq!(service.season_on(january), Season::DryCool);
    }
}
