use helios::config::ApiConfig;
use helios::enever::{EneverApi, EneverClient};
use helios::error::HeliosError;
use mockito::Matcher;

const TZ: chrono_tz::Tz = chrono_tz::Europe::Amsterdam;

fn client_for(server: &mockito::Server, token: &str) -> EneverClient {
    let config = ApiConfig {
        token: token.to_string(),
        base_url: server.url(),
        timeout_seconds: 5,
        validate_on_startup: false,
    };
    EneverClient::new(&config, TZ).unwrap()
}

#[tokio::test]
async fn fetches_and_parses_a_feed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/gasprijs_vandaag.php")
        .match_query(Matcher::UrlEncoded("token".into(), "tok".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "status": "true",
                "code": "5",
                "data": [
                    { "datum": "2024-01-01 06:00:00", "prijsEZ": "1.204560", "prijsZP": null }
                ]
            }"#,
        )
        .create_async()
        .await;

    let client = client_for(&server, "tok");
    let batch = client.gas_today().await.unwrap();

    mock.assert_async().await;
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].datum.to_rfc3339(), "2024-01-01T06:00:00+01:00");
    assert_eq!(batch[0].price("EZ").unwrap().to_string(), "1.204560");
    assert_eq!(batch[0].price("ZP"), None);
}

#[tokio::test]
async fn electricity_endpoints_are_distinct() {
    let mut server = mockito::Server::new_async().await;
    let today = server
        .mock("GET", "/stroomprijs_vandaag.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{ "code": "5", "data": [] }"#)
        .create_async()
        .await;
    let tomorrow = server
        .mock("GET", "/stroomprijs_morgen.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{ "code": "5", "data": [] }"#)
        .create_async()
        .await;

    let client = client_for(&server, "tok");
    client.electricity_today().await.unwrap();
    client.electricity_tomorrow().await.unwrap();

    today.assert_async().await;
    tomorrow.assert_async().await;
}

#[tokio::test]
async fn denied_token_classifies_as_auth_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gasprijs_vandaag.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{ "status": "false", "code": "2", "data": "Ongeldige token" }"#)
        .create_async()
        .await;

    let client = client_for(&server, "bad");
    let err = client.gas_today().await.unwrap_err();
    assert!(matches!(err, HeliosError::Auth { .. }));

    // Token validation reports the same classification
    let err = client.validate_token().await.unwrap_err();
    assert!(matches!(err, HeliosError::Auth { .. }));
}

#[tokio::test]
async fn other_error_payloads_classify_as_api_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gasprijs_vandaag.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{ "status": "false", "code": "9", "data": "Maandlimiet bereikt" }"#)
        .create_async()
        .await;

    let client = client_for(&server, "tok");
    let err = client.gas_today().await.unwrap_err();
    assert!(matches!(err, HeliosError::Api { .. }));
}

#[tokio::test]
async fn non_200_status_classifies_as_api_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gasprijs_vandaag.php")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let client = client_for(&server, "tok");
    let err = client.gas_today().await.unwrap_err();
    match err {
        HeliosError::Api { message } => assert!(message.contains("503")),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_body_classifies_as_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gasprijs_vandaag.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>definitely not json</html>")
        .create_async()
        .await;

    let client = client_for(&server, "tok");
    let err = client.gas_today().await.unwrap_err();
    assert!(matches!(err, HeliosError::Malformed { .. }));
}

#[tokio::test]
async fn unreachable_host_classifies_as_cannot_connect() {
    // Nothing listens on this port
    let config = ApiConfig {
        token: "tok".to_string(),
        base_url: "http://127.0.0.1:9/".to_string(),
        timeout_seconds: 2,
        validate_on_startup: false,
    };
    let client = EneverClient::new(&config, TZ).unwrap();

    let err = client.gas_today().await.unwrap_err();
    assert!(matches!(err, HeliosError::Network { .. }));
}

#[tokio::test]
async fn validate_token_accepts_a_valid_feed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gasprijs_vandaag.php")
        .match_query(Matcher::UrlEncoded("token".into(), "tok".into()))
        .with_status(200)
        .with_body(r#"{ "code": "5", "data": [] }"#)
        .create_async()
        .await;

    let client = client_for(&server, "tok");
    client.validate_token().await.unwrap();
}
