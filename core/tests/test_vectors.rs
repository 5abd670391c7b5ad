//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results or errors. Bodies are compared as parsed JSON so
//! field ordering does not matter.

use memobase_core::{
    ApiError, Blob, BlobType, HttpMethod, HttpRequest, HttpResponse, MemoBaseClient, UserProfile,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8019";

fn client() -> MemoBaseClient {
    MemoBaseClient::new(BASE_URL, "test-key")
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn check_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");
    assert_eq!(req.header("authorization"), Some("Bearer test-key"), "{name}: auth");

    if let Some(headers) = expected.get("headers") {
        let expected_headers: Vec<(String, String)> = headers
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");
    }

    match expected.get("body") {
        Some(body) => {
            let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&sent, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: body should be None"),
    }
}

fn check_error(name: &str, err: ApiError, expected: &Value) {
    match expected["kind"].as_str().unwrap() {
        "Service" => {
            let want = expected["errno"].as_i64().unwrap();
            assert_eq!(err.errno(), Some(want), "{name}: expected Service {want}, got {err:?}");
        }
        "HttpError" => {
            let want = expected["status"].as_u64().unwrap() as u16;
            assert!(
                matches!(err, ApiError::HttpError { status, .. } if status == want),
                "{name}: expected HttpError {want}, got {err:?}"
            );
        }
        other => panic!("{name}: unknown expected_error kind: {other}"),
    }
}

fn parse_blob_type(case: &Value) -> BlobType {
    serde_json::from_value(case["blob_type"].clone()).unwrap()
}

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

#[test]
fn insert_test_vectors() {
    let raw = include_str!("../../test-vectors/insert.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let user_id = case["user_id"].as_str().unwrap();
        let blob: Blob = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_insert(user_id, &blob).unwrap();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_insert(simulated(case));
        match case.get("expected_error") {
            Some(expected) => check_error(name, result.unwrap_err(), expected),
            None => assert_eq!(
                result.unwrap(),
                case["expected_result"].as_str().unwrap(),
                "{name}: parsed result"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// GetAll
// ---------------------------------------------------------------------------

#[test]
fn get_all_test_vectors() {
    let raw = include_str!("../../test-vectors/get_all.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let req = c.build_get_all(
            case["user_id"].as_str().unwrap(),
            parse_blob_type(case),
            case["page"].as_u64().unwrap() as u32,
            case["page_size"].as_u64().unwrap() as u32,
        );
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_get_all(simulated(case));
        match case.get("expected_error") {
            Some(expected) => check_error(name, result.unwrap_err(), expected),
            None => {
                let expected: Vec<String> =
                    serde_json::from_value(case["expected_result"].clone()).unwrap();
                assert_eq!(result.unwrap(), expected, "{name}: parsed result");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[test]
fn profile_test_vectors() {
    let raw = include_str!("../../test-vectors/profile.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let req = c.build_profile(case["user_id"].as_str().unwrap());
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_profile(simulated(case));
        match case.get("expected_error") {
            Some(expected) => check_error(name, result.unwrap_err(), expected),
            None => {
                let expected: Vec<UserProfile> =
                    serde_json::from_value(case["expected_result"].clone()).unwrap();
                assert_eq!(result.unwrap(), expected, "{name}: parsed result");
            }
        }
    }
}
