use effizienz::OriginClient;
use effizienz_server::{
    ManualClock, OriginAuthenticator, OriginMode, OriginSecret, ORIGIN_HEADER,
};
use reqwest::{Method, StatusCode};
use serde_json::json;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const T0: i64 = 1_700_000_000_000;

fn enforced(clock: &ManualClock) -> OriginAuthenticator {
    OriginAuthenticator::with_clock(
        OriginMode::Enforced(OriginSecret::new("shared-secret")),
        clock.clone(),
    )
}

#[tokio::test]
async fn requests_carry_a_token_the_server_accepts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents"))
        .and(header_exists(ORIGIN_HEADER))
        .and(body_json(json!({"title": "Hygieneplan"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let clock = ManualClock::new(T0);
    let client = OriginClient::new(server.uri(), enforced(&clock)).unwrap();
    let (status, body) = client
        .send_json(
            Method::POST,
            "/api/documents",
            Some(&json!({"title": "Hygieneplan"})),
        )
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 7);

    // The receiving side, holding the same secret, must accept the header.
    let received = server.received_requests().await.unwrap();
    let header = received[0]
        .headers
        .get(ORIGIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let verifier = enforced(&clock);
    assert!(verifier.validate(header.as_deref()));
}

#[tokio::test]
async fn each_request_gets_a_fresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let clock = ManualClock::new(T0);
    let client = OriginClient::new(format!("{}/", server.uri()), enforced(&clock)).unwrap();

    client.send_json(Method::GET, "api/tickets", None).await.unwrap();
    clock.advance(std::time::Duration::from_secs(1));
    client.send_json(Method::GET, "/api/tickets", None).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    let tokens: Vec<_> = received
        .iter()
        .map(|r| r.headers.get(ORIGIN_HEADER).unwrap().to_str().unwrap().to_owned())
        .collect();
    assert_ne!(tokens[0], tokens[1]);
}

#[tokio::test]
async fn disabled_client_sends_no_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client =
        OriginClient::new(server.uri(), OriginAuthenticator::new(OriginMode::Disabled)).unwrap();
    let (status, body) = client.send_json(Method::GET, "/api/tickets", None).await.unwrap();

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get(ORIGIN_HEADER).is_none());
}
