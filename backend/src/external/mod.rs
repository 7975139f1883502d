//! External API integrations

pub mod classifier;
pub mod places;
pub mod weather;

pub use classifier::ClassifierClient;
pub use places::PlacesClient;
pub use weather::WeatherClient;
