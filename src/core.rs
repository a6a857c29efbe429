//! Upstream service seams: geocoding and streaming chat completions.
//!
//! The resolver and the permit streamer only ever talk to these traits, so the
//! HTTP clients in [`crate::clients`] can be swapped for the scripted doubles in
//! [`crate::clients::mock`].

use crate::clients::google::models::GeocodeResponse;
use crate::clients::openai::models::ChatMessage;
use crate::error::{ChatError, GeocodeError};
use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use std::fmt::Debug;
use std::pin::Pin;

/// Type alias for raw byte streams from the chat service
pub type RawByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

/// Looks up an address and returns the service's structured answer as-is.
///
/// Implementations report transport and decoding failures only; a response
/// whose `status` is not `"OK"` is still `Ok` here and judged by the caller.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn geocode(&self, address: &str) -> Result<GeocodeResponse, GeocodeError>;
}

/// Opens a streaming chat completion.
///
/// Resolves once the service has answered with a success status; the returned
/// stream then yields the response body in whatever chunks the transport
/// delivers, untouched.
#[async_trait]
pub trait ChatStreamClient: Send + Sync + Debug {
    async fn open_stream(&self, messages: Vec<ChatMessage>) -> Result<RawByteStream, ChatError>;
}
