//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results or errors. Comparing parsed JSON (not raw
//! strings) avoids false negatives from field-ordering differences.

use jwtauth_core::{
    ApiError, AuthClient, ComparisonResponse, Credentials, HealthStatus, HttpMethod, HttpRequest,
    HttpResponse, LoginResponse, Mode, RefreshResponse,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:5000";

fn client() -> AuthClient {
    AuthClient::new(BASE_URL)
}

fn load(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn mode(case: &Value) -> Mode {
    case["mode"].as_str().unwrap().parse().unwrap()
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(
        sim["status"].as_u64().unwrap() as u16,
        sim["body"].as_str().unwrap(),
    )
}

fn check_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    match expected.get("body") {
        Some(body) => {
            let req_body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&req_body, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: body should be None"),
    }
}

fn check_error(name: &str, err: &ApiError, expected: &Value) {
    if let Some(prefix) = expected.get("message_prefix") {
        let prefix = prefix.as_str().unwrap();
        assert!(err.to_string().starts_with(prefix), "{name}: got {err}");
        assert!(matches!(err, ApiError::MalformedResponse { .. }), "{name}: expected MalformedResponse");
        return;
    }
    assert_eq!(err.to_string(), expected["message"].as_str().unwrap(), "{name}: message");
    assert_eq!(
        err.status(),
        Some(expected["status"].as_u64().unwrap() as u16),
        "{name}: status"
    );
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[test]
fn login_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/login.json")) {
        let name = case["name"].as_str().unwrap();
        let input: Credentials = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_login(&input, mode(&case)).unwrap();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_login(simulated(&case));
        if let Some(expected_error) = case.get("expected_error") {
            check_error(name, &result.unwrap_err(), expected_error);
        } else {
            let expected: LoginResponse = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(result.unwrap(), expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[test]
fn refresh_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/refresh.json")) {
        let name = case["name"].as_str().unwrap();

        let req = c.build_refresh(mode(&case), case["token"].as_str().unwrap());
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_refresh(simulated(&case));
        if let Some(expected_error) = case.get("expected_error") {
            check_error(name, &result.unwrap_err(), expected_error);
        } else {
            let expected: RefreshResponse = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(result.unwrap(), expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Logout / logout-all
// ---------------------------------------------------------------------------

#[test]
fn logout_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/logout.json")) {
        let name = case["name"].as_str().unwrap();
        let token = case["token"].as_str().unwrap();
        let all = case["all"].as_bool().unwrap();

        let req = if all {
            c.build_logout_all(mode(&case), token)
        } else {
            c.build_logout(mode(&case), token)
        };
        check_request(name, &req, &case["expected_request"]);

        let response = simulated(&case);
        let result = if all {
            c.parse_logout_all(response)
        } else {
            c.parse_logout(response)
        };
        if let Some(expected_error) = case.get("expected_error") {
            check_error(name, &result.unwrap_err(), expected_error);
        } else {
            assert_eq!(result.unwrap(), case["expected_result"].as_str().unwrap(), "{name}: message");
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[test]
fn health_test_vectors() {
    let c = client();
    let req = c.build_health();
    assert_eq!(req.method, HttpMethod::Get);
    assert_eq!(req.url, format!("{BASE_URL}/api/health"));
    assert!(req.headers.is_empty());

    for case in load(include_str!("../../test-vectors/health.json")) {
        let name = case["name"].as_str().unwrap();
        let result = c.parse_health(simulated(&case));
        if let Some(expected_error) = case.get("expected_error") {
            check_error(name, &result.unwrap_err(), expected_error);
        } else {
            let expected: HealthStatus = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(result.unwrap(), expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Performance comparison
// ---------------------------------------------------------------------------

#[test]
fn compare_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/compare.json")) {
        let name = case["name"].as_str().unwrap();
        let input: Credentials = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_compare(&input).unwrap();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_compare(simulated(&case));
        if let Some(expected_error) = case.get("expected_error") {
            check_error(name, &result.unwrap_err(), expected_error);
        } else {
            let expected: ComparisonResponse =
                serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(result.unwrap(), expected, "{name}: parsed result");
        }
    }
}
