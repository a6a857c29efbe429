//! Permit Query Streamer: asks the chat service about permit requirements for
//! a jurisdiction and relays its streamed answer.

use crate::clients::openai::models::ChatMessage;
use crate::config::DEFAULT_RELAY_CAPACITY;
use crate::core::ChatStreamClient;
use crate::error::PermitError;
use crate::models::PermitQuery;
use crate::relay::PermitRelay;
use std::sync::Arc;
use tracing::{info, instrument};

pub const SYSTEM_PROMPT: &str =
    "You are an AI that determines whether an electrical permit is needed for EV chargers.";

/// Charger described in every question.
pub const CHARGER_SPEC: &str = "60-amp Level 2";

pub fn user_prompt(city: &str, county: &str, township: &str) -> String {
    format!(
        "I am installing a {CHARGER_SPEC} EV charging station in {city}, {county}, {township}. \
         Do I need an electrical permit and how much is the fee to the AHJ?"
    )
}

pub fn build_messages(city: &str, county: &str, township: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_prompt(city, county, township)),
    ]
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|f| !f.is_empty())
}

#[derive(Debug, Clone)]
pub struct PermitQueryStreamer {
    client: Arc<dyn ChatStreamClient>,
    relay_capacity: usize,
}

impl PermitQueryStreamer {
    pub fn new(client: Arc<dyn ChatStreamClient>) -> Self {
        Self { client, relay_capacity: DEFAULT_RELAY_CAPACITY }
    }

    #[must_use]
    pub fn with_relay_capacity(mut self, capacity: usize) -> Self {
        self.relay_capacity = capacity.max(1);
        self
    }

    /// Validates the query, opens the upstream stream and starts relaying it.
    ///
    /// Returns only after the chat service has accepted the request, so every
    /// failure before the first byte comes back as an `Err` here.
    #[instrument(skip(self, query))]
    pub async fn stream(&self, query: PermitQuery) -> Result<PermitRelay, PermitError> {
        let (Some(city), Some(county)) = (non_empty(query.city), non_empty(query.county)) else {
            return Err(PermitError::MissingLocation);
        };
        let township = query.township.unwrap_or_default();

        info!(city = %city, county = %county, township = %township, "Opening permit query stream");
        let upstream = self
            .client
            .open_stream(build_messages(&city, &county, &township))
            .await?;

        Ok(PermitRelay::spawn(upstream, self.relay_capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mock::{MockChatClient, MockChatResponse};
    use crate::error::ChatError;

    fn query(city: Option<&str>, county: Option<&str>, township: Option<&str>) -> PermitQuery {
        PermitQuery {
            city: city.map(String::from),
            county: county.map(String::from),
            township: township.map(String::from),
        }
    }

    #[test]
    fn prompt_interpolates_all_three_fields() {
        assert_eq!(
            user_prompt("Ann Arbor", "Washtenaw", "Pittsfield Township"),
            "I am installing a 60-amp Level 2 EV charging station in Ann Arbor, Washtenaw, \
             Pittsfield Township. Do I need an electrical permit and how much is the fee to the AHJ?"
        );
        let messages = build_messages("a", "b", "c");
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, "user");
    }

    #[tokio::test]
    async fn missing_city_or_county_is_rejected_before_upstream() {
        let (client, handle) = MockChatClient::new();
        let streamer = PermitQueryStreamer::new(Arc::new(client));

        for q in [
            query(None, Some("Santa Clara"), None),
            query(Some("Mountain View"), None, None),
            query(Some(""), Some("Santa Clara"), Some("x")),
            query(Some("Mountain View"), Some(""), Some("x")),
        ] {
            let err = streamer.stream(q).await.unwrap_err();
            assert!(matches!(err, PermitError::MissingLocation));
        }
        assert_eq!(handle.request_count(), 0);
    }

    #[tokio::test]
    async fn township_is_optional() {
        let (client, handle) = MockChatClient::new();
        handle.add_response(MockChatResponse::chunks(["data: [DONE]\n\n"]));
        let streamer = PermitQueryStreamer::new(Arc::new(client));

        let relay = streamer
            .stream(query(Some("Mountain View"), Some("Santa Clara"), None))
            .await
            .unwrap();
        drop(relay);

        let requests = handle.requests();
        assert_eq!(
            requests[0][1].content,
            user_prompt("Mountain View", "Santa Clara", "")
        );
    }

    #[tokio::test]
    async fn upstream_rejection_and_transport_failure_are_distinguished() {
        let (client, handle) = MockChatClient::new();
        handle.add_response(MockChatResponse::Error(ChatError::Api { status: 500, body: "oops".into() }));
        handle.add_response(MockChatResponse::Error(ChatError::EmptyBody));
        handle.add_response(MockChatResponse::Error(ChatError::Http("dns".into())));
        let streamer = PermitQueryStreamer::new(Arc::new(client));
        let q = || query(Some("Austin"), Some("Travis"), None);

        assert!(matches!(streamer.stream(q()).await.unwrap_err(), PermitError::Upstream(_)));
        assert!(matches!(streamer.stream(q()).await.unwrap_err(), PermitError::Upstream(ChatError::EmptyBody)));
        assert!(matches!(streamer.stream(q()).await.unwrap_err(), PermitError::Transport(_)));
    }
}
