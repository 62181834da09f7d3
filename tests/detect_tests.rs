//! Detect endpoint tests
//!
//! Drives `/api/detect` end to end through the real route wiring with a stub
//! provider, covering the cookie fast path and every failure mapping.

use std::net::IpAddr;
use std::sync::Arc;

use actix_web::App;
use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use geodetect::config::StaticConfig;
use geodetect::errors::{GeoDetectError, Result};
use geodetect::runtime::configure_app;
use geodetect::runtime::server::AppState;
use geodetect::services::{GeoIpProvider, GeoLookup, ProviderResponse};

// =============================================================================
// Test Setup
// =============================================================================

/// Stub provider: records every lookup and replays a canned outcome
struct StubLookup {
    outcome: Result<ProviderResponse>,
    calls: Mutex<Vec<IpAddr>>,
}

impl StubLookup {
    fn ok(resp: ProviderResponse) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(resp),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: GeoDetectError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(err),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<IpAddr> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl GeoLookup for StubLookup {
    async fn lookup(&self, ip: IpAddr) -> Result<ProviderResponse> {
        self.calls.lock().push(ip);
        self.outcome.clone()
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

fn new_york() -> ProviderResponse {
    ProviderResponse {
        ip: Some("203.0.113.5".into()),
        continent_name: Some("North America".into()),
        country_code2: Some("US".into()),
        country_name: Some("United States".into()),
        is_eu: Some(false),
        state_code: Some("US-NY".into()),
        city: Some("New York".into()),
        zipcode: Some("10001".into()),
        ..Default::default()
    }
}

/// Create a test app with the production routes and the given stub
macro_rules! detect_app {
    ($stub:expr) => {{
        let provider = GeoIpProvider::from_lookup($stub.clone());
        let state = AppState::with_provider(provider, &StaticConfig::default());
        test::init_service(App::new().configure(|cfg| configure_app(cfg, &state))).await
    }};
}

fn location_cookies(country: &str, state: &str, city: &str, zip: &str) -> Vec<Cookie<'static>> {
    vec![
        Cookie::new("country_code", country.to_string()),
        Cookie::new("state", state.to_string()),
        Cookie::new("city", city.to_string()),
        Cookie::new("zipcode", zip.to_string()),
    ]
}

// =============================================================================
// Cache path
// =============================================================================

#[tokio::test]
async fn test_complete_cookies_short_circuit() {
    let stub = StubLookup::ok(new_york());
    let app = detect_app!(stub);

    let mut req = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("x-forwarded-for", "203.0.113.5"));
    for cookie in location_cookies("CA", "ON", "Toronto", "M5H") {
        req = req.cookie(cookie);
    }
    let resp = test::call_service(&app, req.to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.response().cookies().count(), 0);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["country_code"], "CA");
    assert_eq!(body["state_code"], "ON");
    assert_eq!(body["city"], "Toronto");
    assert_eq!(body["zipcode"], "M5H");
    assert_eq!(body["source"], "cookie");

    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_cookie_hit_needs_no_forwarding_header() {
    let stub = StubLookup::ok(new_york());
    let app = detect_app!(stub);

    let mut req = TestRequest::get().uri("/api/detect");
    for cookie in location_cookies("CA", "ON", "Toronto", "M5H") {
        req = req.cookie(cookie);
    }
    let resp = test::call_service(&app, req.to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_partial_cookies_trigger_single_lookup() {
    let stub = StubLookup::ok(new_york());
    let app = detect_app!(stub);

    let req = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("x-forwarded-for", "203.0.113.5, 10.0.0.1"))
        .cookie(Cookie::new("country_code", "CA"))
        .cookie(Cookie::new("state", ""))
        .cookie(Cookie::new("city", "Toronto"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        stub.calls(),
        vec!["203.0.113.5".parse::<IpAddr>().unwrap()]
    );

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["country_code"], "US");
    assert_eq!(body["source"], "provider");
}

// =============================================================================
// Provider path
// =============================================================================

#[tokio::test]
async fn test_provider_result_is_projected_and_cached() {
    let stub = StubLookup::ok(new_york());
    let app = detect_app!(stub);

    let req = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("x-forwarded-for", "203.0.113.5"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);

    let cookies: Vec<Cookie<'static>> = resp
        .response()
        .cookies()
        .map(|c| c.into_owned())
        .collect();
    assert_eq!(cookies.len(), 4);
    for cookie in &cookies {
        assert_eq!(cookie.path(), Some("/"));
        assert_ne!(cookie.http_only(), Some(true));
        assert_eq!(
            cookie.max_age(),
            Some(actix_web::cookie::time::Duration::days(30))
        );
    }
    let value_of = |name: &str| {
        cookies
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
    };
    assert_eq!(value_of("country_code").as_deref(), Some("US"));
    assert_eq!(value_of("state").as_deref(), Some("NY"));
    assert_eq!(value_of("city").as_deref(), Some("New York"));
    assert_eq!(value_of("zipcode").as_deref(), Some("10001"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["country_code"], "US");
    assert_eq!(body["state_code"], "NY");
    assert_eq!(body["city"], "New York");
    assert_eq!(body["zipcode"], "10001");
    // 其他 provider 字段不会透出
    assert!(body.get("continent_name").is_none());
    assert!(body.get("is_eu").is_none());
}

#[tokio::test]
async fn test_state_code_without_separator_is_kept() {
    let stub = StubLookup::ok(ProviderResponse {
        state_code: Some("NY".into()),
        ..new_york()
    });
    let app = detect_app!(stub);

    let req = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("x-forwarded-for", "203.0.113.5"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["state_code"], "NY");
}

#[tokio::test]
async fn test_absent_provider_fields_are_not_set_as_cookies() {
    let stub = StubLookup::ok(ProviderResponse {
        country_code2: Some("SG".into()),
        city: Some("Singapore".into()),
        ..Default::default()
    });
    let app = detect_app!(stub);

    let req = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("x-forwarded-for", "203.0.113.77"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let mut names: Vec<String> = resp
        .response()
        .cookies()
        .map(|c| c.name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["city".to_string(), "country_code".to_string()]);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["state_code"].is_null());
    assert!(body["zipcode"].is_null());
}

#[tokio::test]
async fn test_round_trip_cookies_produce_cache_hit() {
    let stub = StubLookup::ok(new_york());
    let app = detect_app!(stub);

    let first = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("x-forwarded-for", "203.0.113.5"))
        .to_request();
    let resp = test::call_service(&app, first).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookies: Vec<Cookie<'static>> = resp
        .response()
        .cookies()
        .map(|c| Cookie::new(c.name().to_string(), c.value().to_string()))
        .collect();
    let first_body: Value = test::read_body_json(resp).await;

    let mut second = TestRequest::get().uri("/api/detect");
    for cookie in cookies {
        second = second.cookie(cookie);
    }
    let resp = test::call_service(&app, second.to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.response().cookies().count(), 0);

    let second_body: Value = test::read_body_json(resp).await;
    for field in ["country_code", "state_code", "city", "zipcode"] {
        assert_eq!(first_body[field], second_body[field], "field {}", field);
    }
    assert_eq!(second_body["source"], "cookie");

    assert_eq!(stub.calls().len(), 1);
}

#[tokio::test]
async fn test_raw_set_cookie_values_round_trip() {
    let stub = StubLookup::ok(ProviderResponse {
        country_code2: Some("US".into()),
        state_code: Some("US-DC".into()),
        city: Some("Washington; D.C.".into()),
        zipcode: Some("São Paulo, \"20001\"".into()),
        ..Default::default()
    });
    let app = detect_app!(stub);

    let first = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("x-forwarded-for", "203.0.113.5"))
        .to_request();
    let resp = test::call_service(&app, first).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // 浏览器只回传 name=value，不做任何解码
    let pairs: Vec<String> = resp
        .headers()
        .get_all("set-cookie")
        .map(|v| {
            let raw = v.to_str().expect("Set-Cookie must be visible ASCII");
            raw.split(';').next().unwrap().trim().to_string()
        })
        .collect();
    assert_eq!(pairs.len(), 4);
    for pair in &pairs {
        let value = pair.split_once('=').unwrap().1;
        assert!(
            value
                .bytes()
                .all(|b| b.is_ascii_graphic() && !b"\";,\\".contains(&b)),
            "unencoded cookie value: {}",
            pair
        );
    }
    let first_body: Value = test::read_body_json(resp).await;
    assert_eq!(first_body["city"], "Washington; D.C.");

    let second = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("cookie", pairs.join("; ")))
        .to_request();
    let resp = test::call_service(&app, second).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let second_body: Value = test::read_body_json(resp).await;
    assert_eq!(second_body["source"], "cookie");
    assert_eq!(second_body["city"], "Washington; D.C.");
    assert_eq!(second_body["zipcode"], "São Paulo, \"20001\"");
    assert_eq!(second_body["state_code"], "DC");
    assert_eq!(stub.calls().len(), 1);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_missing_forwarding_header_is_bad_request() {
    let stub = StubLookup::ok(new_york());
    let app = detect_app!(stub);

    let req = TestRequest::get()
        .uri("/api/detect")
        .cookie(Cookie::new("country_code", "US"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unable to determine client IP address");
    assert_eq!(body["code"], "E001");

    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway_without_cookies() {
    let stub = StubLookup::failing(GeoDetectError::provider_unavailable(
        "upstream responded with 503 Service Unavailable",
    ));
    let app = detect_app!(stub);

    let req = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("x-forwarded-for", "203.0.113.5"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(resp.response().cookies().count(), 0);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Failed to fetch geolocation");
    // 内部细节只进日志
    assert!(!body.to_string().contains("503"));

    assert_eq!(stub.calls().len(), 1);
}

#[tokio::test]
async fn test_malformed_provider_response_is_bad_gateway() {
    let stub = StubLookup::failing(GeoDetectError::provider_malformed_response(
        "expected value at line 1 column 1",
    ));
    let app = detect_app!(stub);

    let req = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("x-forwarded-for", "203.0.113.5"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "E004");
}

#[tokio::test]
async fn test_missing_credential_is_server_error() {
    // 真实 provider，但没有 api_key：不会发起任何网络请求
    let provider = GeoIpProvider::new(&StaticConfig::default().provider).unwrap();
    assert!(!provider.is_configured());
    let state = AppState::with_provider(provider, &StaticConfig::default());
    let app = test::init_service(App::new().configure(|cfg| configure_app(cfg, &state))).await;

    let req = TestRequest::get()
        .uri("/api/detect")
        .insert_header(("x-forwarded-for", "203.0.113.5"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Geolocation provider is not configured");
    assert_eq!(body["code"], "E002");
}
