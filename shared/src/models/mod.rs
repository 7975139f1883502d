//! Domain models for rice leaf diagnosis

mod disease;
mod facility;
mod prediction;
mod season;
mod taxonomy;
mod weather;

pub use disease::*;
pub use facility::*;
pub use prediction::*;
pub use season::*;
pub use taxonomy::*;
pub use weather::*;
