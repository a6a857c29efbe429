pub mod google;
pub mod mock;
pub mod openai;

pub use google::{GeocoderConfig, GoogleGeocoder};
pub use mock::*;
pub use openai::{OpenAIClient, OpenAIConfig};
