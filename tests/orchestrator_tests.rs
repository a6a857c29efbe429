
use ev_permit::clients::mock::{MockChatResponse, MockGeocode};
use ev_permit::error::ChatError;
use ev_permit::{PermitClient, PermitInfoState};
use test_utils::{mountain_view_response, split_at_offsets, sse_delta, test_app, TestApp, DONE_EVENT, PERMIT_SSE_BODY};
use axum::body::{Body, Bytes};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serves the test app on an ephemeral local port and returns its base URL.
async fn serve(app: &TestApp) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn submit_resolves_then_streams_answer() {
    let app = test_app();
    app.geocoder.add_response(MockGeocode::Success(mountain_view_response()));
    app.chat.add_response(MockChatResponse::chunks([PERMIT_SSE_BODY]));
    let client = PermitClient::new(serve(&app).await);

    let mut updates: Vec<PermitInfoState> = Vec::new();
    let outcome = client
        .submit("1600 Amphitheatre Parkway, Mountain View, CA", |state| updates.push(state.clone()))
        .await;

    assert_eq!(outcome.error, None);
    let state = outcome.state.unwrap();
    assert_eq!(state.city, "Mountain View");
    assert_eq!(state.county, "Santa Clara");
    assert_eq!(state.township, "");
    assert_eq!(state.permit_website, "");
    assert_eq!(state.permit_info, "Yes, a permit is required.");

    // location is shown before any answer text
    assert_eq!(updates.first().unwrap().permit_info, "");
    assert_eq!(updates.last().unwrap(), &state);
    assert_eq!(app.chat.request_count(), 1);
}

#[tokio::test]
async fn every_update_carries_the_full_accumulated_answer() {
    let app = test_app();
    app.geocoder.add_response(MockGeocode::Success(mountain_view_response()));

    let words = ["Yes", ", a permit", " is required", " in Mountain View."];
    let mut body = String::new();
    for word in words {
        body.push_str(&sse_delta(word));
    }
    body.push_str(DONE_EVENT);
    // cut mid-line so some chunks complete no line at all
    let offsets: Vec<usize> = (1..body.len()).step_by(23).collect();
    app.chat.add_response(MockChatResponse::Chunks(split_at_offsets(body.as_bytes(), &offsets)));

    let client = PermitClient::new(serve(&app).await);
    let mut shown: Vec<String> = Vec::new();
    let outcome = client
        .submit("1600 Amphitheatre Parkway", |state| shown.push(state.permit_info.clone()))
        .await;
    assert_eq!(outcome.error, None);

    let full: String = words.concat();
    // each display is a prefix of the next and of the final answer, never a doubled rendering
    for pair in shown.windows(2) {
        assert!(pair[1].starts_with(&pair[0]), "{:?} then {:?}", pair[0], pair[1]);
    }
    for text in &shown {
        assert!(full.starts_with(text.as_str()));
    }
    assert_eq!(shown.last().unwrap(), &full);
}

#[tokio::test]
async fn location_error_is_reported_without_state() {
    let app = test_app();
    app.geocoder.add_response(MockGeocode::Success(
        ev_permit::clients::google::models::GeocodeResponse::with_status("ZERO_RESULTS"),
    ));
    let client = PermitClient::new(serve(&app).await);

    let mut updates = 0;
    let outcome = client.submit("nowhere at all", |_| updates += 1).await;
    assert_eq!(outcome.error.as_deref(), Some("Invalid address or API error"));
    assert_eq!(outcome.state, None);
    assert_eq!(updates, 0);
    assert_eq!(app.chat.request_count(), 0);

    let outcome = client.submit("", |_| updates += 1).await;
    assert_eq!(outcome.error.as_deref(), Some("Address is required"));
}

#[tokio::test]
async fn permit_error_keeps_location_on_screen() {
    let app = test_app();
    app.geocoder.add_response(MockGeocode::Success(mountain_view_response()));
    app.chat.add_response(MockChatResponse::Error(ChatError::RateLimit));
    let client = PermitClient::new(serve(&app).await);

    let outcome = client.submit("1600 Amphitheatre Parkway", |_| {}).await;
    assert_eq!(outcome.error.as_deref(), Some("Failed to get permit info"));
    let state = outcome.state.unwrap();
    assert_eq!(state.city, "Mountain View");
    assert_eq!(state.permit_info, "");
}

/// Serves fixed location JSON and a permit stream that sends "Yes", then waits
/// for `gate` before sending a malformed event.
async fn serve_gated_permit_stream(gate: oneshot::Receiver<()>) -> String {
    let gate = Arc::new(Mutex::new(Some(gate)));
    let router = Router::new()
        .route(
            "/api/get-location",
            post(|| async { Json(json!({ "city": "Mountain View", "township": "", "county": "Santa Clara" })) }),
        )
        .route(
            "/api/get-permit-info",
            post(move || {
                let gate = gate.lock().unwrap().take();
                async move {
                    let body = async_stream::stream! {
                        yield Ok::<_, std::io::Error>(Bytes::from(sse_delta("Yes")));
                        if let Some(gate) = gate {
                            let _ = gate.await;
                        }
                        yield Ok(Bytes::from_static(b"data: {\"choices\": [}\n\n"));
                        yield Ok(Bytes::from(sse_delta(" and more")));
                    };
                    Body::from_stream(body)
                }
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn malformed_chunk_halts_and_keeps_published_text() {
    test_utils::init_tracing();
    let (gate_tx, gate_rx) = oneshot::channel();
    let client = PermitClient::new(serve_gated_permit_stream(gate_rx).await);

    let mut gate_tx = Some(gate_tx);
    let mut updates: Vec<PermitInfoState> = Vec::new();
    let outcome = client
        .submit("1600 Amphitheatre Parkway", |state| {
            updates.push(state.clone());
            // release the bad event only once "Yes" is on screen
            if state.permit_info == "Yes" {
                if let Some(tx) = gate_tx.take() {
                    let _ = tx.send(());
                }
            }
        })
        .await;

    let error = outcome.error.unwrap();
    assert!(error.starts_with("Malformed event payload"), "{error}");
    assert!(gate_tx.is_none(), "\"Yes\" was never published");

    let state = outcome.state.unwrap();
    assert_eq!(state.city, "Mountain View");
    assert_eq!(state.permit_info, "Yes");
    assert_eq!(updates.last().unwrap(), &state);
    assert!(updates.iter().all(|u| !u.permit_info.contains("and more")));
}
