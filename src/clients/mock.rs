//! Scripted in-process doubles for the upstream services.
//!
//! Each constructor returns the client plus a shared handle; push responses
//! onto the handle and inspect what the client was asked afterwards.

use crate::clients::google::models::GeocodeResponse;
use crate::clients::openai::models::ChatMessage;
use crate::core::{ChatStreamClient, Geocoder, RawByteStream};
use crate::error::{ChatError, GeocodeError};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
pub enum MockGeocode {
    Success(GeocodeResponse),
    Error(GeocodeError),
}

#[derive(Debug, Default)]
pub struct MockGeocoderHandle {
    responses: Mutex<VecDeque<MockGeocode>>,
    calls: Mutex<Vec<String>>,
}

impl MockGeocoderHandle {
    pub fn add_response(&self, response: MockGeocode) {
        lock(&self.responses).push_back(response);
    }

    /// Addresses the geocoder was called with, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[derive(Debug, Clone)]
pub struct MockGeocoder {
    handle: Arc<MockGeocoderHandle>,
}

impl MockGeocoder {
    pub fn new() -> (Self, Arc<MockGeocoderHandle>) {
        let handle = Arc::new(MockGeocoderHandle::default());
        (Self { handle: handle.clone() }, handle)
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodeResponse, GeocodeError> {
        lock(&self.handle.calls).push(address.to_string());
        let next = lock(&self.handle.responses).pop_front();
        match next {
            Some(MockGeocode::Success(response)) => Ok(response),
            Some(MockGeocode::Error(err)) => Err(err),
            None => Err(GeocodeError::Http("no scripted geocoding response".to_string())),
        }
    }
}

#[derive(Debug)]
pub enum MockChatResponse {
    /// Stream these chunks, then end.
    Chunks(Vec<Bytes>),
    /// Stream these chunks, then fail.
    FailAfter(Vec<Bytes>, ChatError),
    /// Stream these chunks, then stay open forever.
    Hang(Vec<Bytes>),
    /// Refuse to open the stream.
    Error(ChatError),
}

impl MockChatResponse {
    pub fn chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::Chunks(chunks.into_iter().map(Into::into).collect())
    }

    fn into_stream(self) -> Result<RawByteStream, ChatError> {
        match self {
            Self::Chunks(chunks) => Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok)))),
            Self::FailAfter(chunks, err) => Ok(Box::pin(stream::iter(
                chunks.into_iter().map(Ok).chain(std::iter::once(Err(err))),
            ))),
            Self::Hang(chunks) => Ok(Box::pin(
                stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending()),
            )),
            Self::Error(err) => Err(err),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockChatHandle {
    responses: Mutex<VecDeque<MockChatResponse>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatHandle {
    pub fn add_response(&self, response: MockChatResponse) {
        lock(&self.responses).push_back(response);
    }

    /// Message lists the client was asked to complete, in order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[derive(Debug, Clone)]
pub struct MockChatClient {
    handle: Arc<MockChatHandle>,
}

impl MockChatClient {
    pub fn new() -> (Self, Arc<MockChatHandle>) {
        let handle = Arc::new(MockChatHandle::default());
        (Self { handle: handle.clone() }, handle)
    }
}

#[async_trait]
impl ChatStreamClient for MockChatClient {
    async fn open_stream(&self, messages: Vec<ChatMessage>) -> Result<RawByteStream, ChatError> {
        lock(&self.handle.requests).push(messages);
        let next = lock(&self.handle.responses).pop_front();
        match next {
            Some(response) => response.into_stream(),
            None => Err(ChatError::Http("no scripted chat response".to_string())),
        }
    }
}
