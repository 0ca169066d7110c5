use axum::http::StatusCode;
use serde_json::Value;

use super::TestResponse;

/// Assert the status and return the parsed JSON body.
pub fn expect_json(response: &TestResponse, status: StatusCode) -> Value {
    assert_eq!(
        response.status,
        status,
        "unexpected status, body: {}",
        String::from_utf8_lossy(&response.body)
    );
    response.json().unwrap_or(Value::Null)
}

/// Assert an error response carrying an OperationOutcome body.
pub fn assert_outcome(response: &TestResponse, status: StatusCode, code: &str) {
    let body = expect_json(response, status);
    assert_eq!(body["resourceType"], "OperationOutcome");
    assert_eq!(body["issue"][0]["code"], code, "body: {body}");
}

/// Codes of a JSON array of code entries, in response order.
pub fn codes(body: &Value) -> Vec<String> {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|e| e["code"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
