//! Request descriptors and driver responses.
//!
//! Both are plain JSON-shaped values: the orchestrator never interprets a
//! [`Request`] beyond the read-only heuristic, and a [`Response`] is whatever
//! object the driver produced (conventionally carrying a `data` field).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Description of one call handed to a driver
///
/// The well-known fields are the ones the query/mutation heuristic looks at.
/// Anything else a driver needs (headers, params, timeouts) goes in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Target URL for REST-style drivers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// HTTP method, `None` means GET
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Query document for GraphQL-style drivers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Request body or GraphQL variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Driver-specific fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Request {
    /// GET request to `url`
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Request to `url` using an explicit HTTP method
    #[must_use]
    pub fn with_method(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            method: Some(method.into()),
            ..Self::default()
        }
    }

    /// POST request to `url`
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::with_method("post", url)
    }

    /// DELETE request to `url`
    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self::with_method("delete", url)
    }

    /// GraphQL-style request carrying a query document
    #[must_use]
    pub fn graphql(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Builder: set the body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Builder: set a driver-specific field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether this call only reads data
    ///
    /// A non-empty query document is read-only unless it starts with
    /// `mutation`. Without a query document, only GET (or no method) is
    /// read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        match self.query.as_deref() {
            Some(query) if !query.is_empty() => !query.trim_start().starts_with("mutation"),
            _ => self
                .method
                .as_deref()
                .is_none_or(|method| method.eq_ignore_ascii_case("get")),
        }
    }
}

/// The `request` slot of a request action: one call or a batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestPayload {
    /// A single driver call
    Single(Request),
    /// Several driver calls executed concurrently
    Batch(Vec<Request>),
}

impl RequestPayload {
    /// Whether this payload is a batch
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }

    /// All requests in submission order
    #[must_use]
    pub fn as_slice(&self) -> &[Request] {
        match self {
            Self::Single(request) => std::slice::from_ref(request),
            Self::Batch(requests) => requests,
        }
    }

    /// Number of driver calls this payload produces
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether the payload would produce no driver call at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl From<Request> for RequestPayload {
    fn from(request: Request) -> Self {
        Self::Single(request)
    }
}

impl From<Vec<Request>> for RequestPayload {
    fn from(requests: Vec<Request>) -> Self {
        Self::Batch(requests)
    }
}

/// A driver response: a JSON object, conventionally with a `data` field
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response(Map<String, Value>);

impl Response {
    /// Field holding the response payload
    pub const DATA: &'static str = "data";

    /// Empty response
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Response with only a `data` field
    #[must_use]
    pub fn with_data(data: impl Into<Value>) -> Self {
        let mut response = Self::new();
        response.set_data(data.into());
        response
    }

    /// Builder: add an arbitrary field
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// The `data` field, if any
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.0.get(Self::DATA)
    }

    /// Replace the `data` field
    pub fn set_data(&mut self, data: Value) {
        self.0.insert(Self::DATA.to_string(), data);
    }

    /// Any field by name
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field names and values
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Consume into the underlying JSON object
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Fold per-call batch responses into one response
    ///
    /// Every field seen in any response becomes an array holding that
    /// field's value from each response, in submission order. A response
    /// lacking a field contributes `null` at its position, so every array has
    /// exactly one entry per call.
    #[must_use]
    pub fn merge_batch(responses: &[Self]) -> Self {
        let mut field_names: Vec<&String> = Vec::new();
        for response in responses {
            for name in response.0.keys() {
                if !field_names.contains(&name) {
                    field_names.push(name);
                }
            }
        }

        let merged = field_names
            .into_iter()
            .map(|name| {
                let column = responses
                    .iter()
                    .map(|response| response.0.get(name).cloned().unwrap_or(Value::Null))
                    .collect();
                (name.clone(), Value::Array(column))
            })
            .collect();

        Self(merged)
    }
}

impl From<Map<String, Value>> for Response {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_get_without_method_is_read_only() {
        assert!(Request::get("/books").is_read_only());
        assert!(Request::with_method("GET", "/books").is_read_only());
        assert!(!Request::post("/books").is_read_only());
        assert!(!Request::delete("/books/1").is_read_only());
    }

    #[test]
    fn test_graphql_mutation_prefix() {
        assert!(Request::graphql("{ books { id } }").is_read_only());
        assert!(Request::graphql("query Books { books { id } }").is_read_only());
        assert!(!Request::graphql("  mutation Delete { deleteBook(id: 1) }").is_read_only());
    }

    #[test]
    fn test_empty_query_falls_back_to_method() {
        let request = Request {
            query: Some(String::new()),
            method: Some("post".into()),
            ..Request::default()
        };
        assert!(!request.is_read_only());
    }

    #[test]
    fn test_request_roundtrips_extra_fields() {
        let request: Request =
            serde_json::from_value(json!({ "url": "/books", "headers": { "x": "1" } })).unwrap();
        assert_eq!(request.url.as_deref(), Some("/books"));
        assert_eq!(request.extra.get("headers"), Some(&json!({ "x": "1" })));
    }

    #[test]
    fn test_payload_deserializes_batch_from_array() {
        let payload: RequestPayload =
            serde_json::from_value(json!([{ "url": "/a" }, { "url": "/b" }])).unwrap();
        assert!(payload.is_batch());
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_merge_batch_concatenates_fields() {
        let merged = Response::merge_batch(&[Response::with_data(1), Response::with_data(2)]);
        assert_eq!(merged.data(), Some(&json!([1, 2])));
    }

    #[test]
    fn test_merge_batch_fills_missing_fields_with_null() {
        let merged = Response::merge_batch(&[
            Response::with_data("a").with_field("status", 200),
            Response::with_data("b"),
        ]);
        assert_eq!(merged.data(), Some(&json!(["a", "b"])));
        assert_eq!(merged.get("status"), Some(&json!([200, null])));
    }

    proptest! {
        #[test]
        fn prop_merge_batch_keeps_submission_order(values in proptest::collection::vec(any::<i64>(), 1..16)) {
            let responses: Vec<Response> = values.iter().map(|v| Response::with_data(*v)).collect();
            let merged = Response::merge_batch(&responses);
            let expected: Vec<Value> = values.iter().map(|v| json!(v)).collect();
            prop_assert_eq!(merged.data(), Some(&Value::Array(expected)));
        }
    }
}
