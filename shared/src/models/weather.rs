//! Weather data models

use serde::{Deserialize, Serialize};

/// Current weather at the diagnosis location.
///
/// Callers hold this as `Option<WeatherSnapshot>`; `None` means the weather
/// service could not be reached or answered with something unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Relative humidity, 0-100
    pub humidity: f64,
    /// Air temperature in °C
    pub temperature: f64,
    /// Whether the provider reported any rain
    pub rain: bool,
    /// Pressure in hPa
    pub pressure: f64,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Short condition, e.g. "Rain"
    pub condition: String,
    pub description: String,
    pub location_name: String,
}

/// Thresholds that make weather favourable to leaf disease
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRiskRule {
    /// Humidity strictly above this is risky
    pub humidity_above: f64,
    /// Inclusive temperature band that is risky
    pub temperature_min: f64,
    pub temperature_max: f64,
}

impl Default for WeatherRiskRule {
    fn default() -> Self {
        Self {
            humidity_above: 75.0,
            temperature_min: 22.0,
            temperature_max: 30.0,
        }
    }
}

impl WeatherRiskRule {
    pub fn is_risky(&self, weather: &WeatherSnapshot) -> bool {
        self.is_risky_reading(weather.humidity, weather.temperature, weather.rain)
    }

    pub fn is_risky_reading(&self, humidity: f64, temperature: f64, rain: bool) -> bool {
        humidity > self.humidity_above
            || rain
            || (self.temperature_min <= temperature && temperature <= self.temperature_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather(humidity: f64, temperature: f64, rain: bool) -> WeatherSnapshot {
        WeatherSnapshot {
            humidity,
            temperature,
            rain,
            pressure: 1010.0,
            wind_speed: 2.0,
            condition: "Clouds".to_string(),
            description: "scattered clouds".to_string(),
            location_name: "Cuttack".to_string(),
        }
    }

    #[test]
    fn test_risky_conditions() {
        let rule = WeatherRiskRule::default();
        assert!(rule.is_risky(&weather(80.0, 15.0, false)));
        assert!(rule.is_risky(&weather(40.0, 15.0, true)));
        assert!(rule.is_risky(&weather(40.0, 22.0, false)));
        assert!(rule.is_risky(&weather(40.0, 30.0, false)));
        assert!(!rule.is_risky(&weather(75.0, 31.0, false)));
        assert!(!rule.is_risky(&weather(50.0, 21.9, false)));
    }
}
