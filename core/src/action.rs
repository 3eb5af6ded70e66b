//! The action stream shared by the orchestrator and the cache reducer
//!
//! A request action describes calls to make. The orchestrator answers it with
//! exactly one lifecycle action (success, error or abort) whose type is the
//! request type plus a suffix and which carries the request action itself as
//! provenance. Reducers never see drivers; they only see this stream.

use crate::error::RequestError;
use crate::meta::RequestMeta;
use crate::request::{RequestPayload, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type of the action cancelling pending requests
pub const ABORT_REQUESTS: &str = "ABORT_REQUESTS";

/// Type of the action resetting cached request state
pub const RESET_REQUESTS: &str = "RESET_REQUESTS";

/// Suffix of success lifecycle types
pub const SUCCESS_SUFFIX: &str = "_SUCCESS";

/// Suffix of error lifecycle types
pub const ERROR_SUFFIX: &str = "_ERROR";

/// Suffix of abort lifecycle types
pub const ABORT_SUFFIX: &str = "_ABORT";

/// Success lifecycle type for `request_type`
#[must_use]
pub fn success_type(request_type: &str) -> String {
    format!("{request_type}{SUCCESS_SUFFIX}")
}

/// Error lifecycle type for `request_type`
#[must_use]
pub fn error_type(request_type: &str) -> String {
    format!("{request_type}{ERROR_SUFFIX}")
}

/// Abort lifecycle type for `request_type`
#[must_use]
pub fn abort_type(request_type: &str) -> String {
    format!("{request_type}{ABORT_SUFFIX}")
}

/// Identifies requests of one type, optionally narrowed by a request key
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    /// Request action type
    pub request_type: String,
    /// Optional request key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_key: Option<String>,
}

impl RequestKey {
    /// Key matching requests of `request_type` without a request key
    #[must_use]
    pub fn new(request_type: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            request_key: None,
        }
    }

    /// Builder: narrow to one request key
    #[must_use]
    pub fn with_key(mut self, request_key: impl Into<String>) -> Self {
        self.request_key = Some(request_key.into());
        self
    }

    /// `type + request_key`, the identity used for cancellation
    #[must_use]
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.request_type, self.request_key.as_deref())
    }
}

impl From<&str> for RequestKey {
    fn from(request_type: &str) -> Self {
        Self::new(request_type)
    }
}

fn dedup_key(request_type: &str, request_key: Option<&str>) -> String {
    format!("{request_type}{}", request_key.unwrap_or_default())
}

/// Whether `dedup` is selected by an optional key list (`None` selects everything)
#[must_use]
pub fn keys_select(keys: Option<&[RequestKey]>, dedup: &str) -> bool {
    keys.is_none_or(|keys| keys.iter().any(|key| key.dedup_key() == dedup))
}

/// Whether the query slice `request_type` is selected by an optional key list
#[must_use]
pub fn keys_select_type(keys: Option<&[RequestKey]>, request_type: &str) -> bool {
    keys.is_none_or(|keys| keys.iter().any(|key| key.request_type == request_type))
}

/// An action asking for one or more driver calls
#[derive(Clone, Debug)]
pub struct RequestAction {
    /// Action type, the base of every derived key
    pub action_type: String,
    /// Call(s) to execute
    pub request: RequestPayload,
    /// Per-action options
    pub meta: RequestMeta,
}

impl RequestAction {
    /// Request action with default meta
    #[must_use]
    pub fn new(action_type: impl Into<String>, request: impl Into<RequestPayload>) -> Self {
        Self {
            action_type: action_type.into(),
            request: request.into(),
            meta: RequestMeta::default(),
        }
    }

    /// Builder: replace the meta
    #[must_use]
    pub fn with_meta(mut self, meta: RequestMeta) -> Self {
        self.meta = meta;
        self
    }

    /// `type + request_key`
    #[must_use]
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.action_type, self.meta.request_key.as_deref())
    }

    /// This action's [`RequestKey`]
    #[must_use]
    pub fn request_key(&self) -> RequestKey {
        RequestKey {
            request_type: self.action_type.clone(),
            request_key: self.meta.request_key.clone(),
        }
    }

    /// Whether the payload is a batch
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        self.request.is_batch()
    }

    /// Whether the outcome is pre-resolved in meta
    #[must_use]
    pub const fn is_rehydrated(&self) -> bool {
        self.meta.is_rehydrated()
    }
}

/// Terminal action of a request that produced a response
#[derive(Clone, Debug)]
pub struct SuccessAction {
    /// `{request type}_SUCCESS`
    pub action_type: String,
    /// Final response after all interceptors
    pub response: Response,
    /// Originating request action
    pub request: Box<RequestAction>,
}

impl SuccessAction {
    /// Success action for `request`
    #[must_use]
    pub fn new(request: RequestAction, response: Response) -> Self {
        Self {
            action_type: success_type(&request.action_type),
            response,
            request: Box::new(request),
        }
    }

    /// The response `data` field, `null` if absent
    #[must_use]
    pub fn data(&self) -> Value {
        self.response.data().cloned().unwrap_or(Value::Null)
    }
}

/// Terminal action of a request that failed
#[derive(Clone, Debug)]
pub struct ErrorAction {
    /// `{request type}_ERROR`
    pub action_type: String,
    /// Final error after all interceptors
    pub error: RequestError,
    /// Originating request action
    pub request: Box<RequestAction>,
}

impl ErrorAction {
    /// Error action for `request`
    #[must_use]
    pub fn new(request: RequestAction, error: RequestError) -> Self {
        Self {
            action_type: error_type(&request.action_type),
            error,
            request: Box::new(request),
        }
    }
}

/// Terminal action of a request that was cancelled
#[derive(Clone, Debug)]
pub struct AbortAction {
    /// `{request type}_ABORT`
    pub action_type: String,
    /// Originating request action
    pub request: Box<RequestAction>,
}

impl AbortAction {
    /// Abort action for `request`
    #[must_use]
    pub fn new(request: RequestAction) -> Self {
        Self {
            action_type: abort_type(&request.action_type),
            request: Box::new(request),
        }
    }
}

/// Cancel pending calls, all of them or only the listed keys
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AbortRequests {
    /// Keys to cancel, `None` for every pending call
    pub requests: Option<Vec<RequestKey>>,
}

/// Reset cached request state, optionally cancelling pending calls too
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetRequests {
    /// Keys to reset, `None` for everything
    pub requests: Option<Vec<RequestKey>>,
    /// Also cancel the matching pending calls
    pub abort_pending: bool,
}

/// Everything that flows through the store
#[derive(Clone, Debug)]
pub enum Action {
    /// Request to execute
    Request(RequestAction),
    /// Request succeeded
    Success(SuccessAction),
    /// Request failed
    Error(ErrorAction),
    /// Request was cancelled
    Abort(AbortAction),
    /// Cancel pending requests
    AbortRequests(AbortRequests),
    /// Reset request state
    ResetRequests(ResetRequests),
    /// Any other application action
    Custom {
        /// Action type
        action_type: String,
        /// Arbitrary payload
        payload: Value,
    },
}

impl Action {
    /// Application action with a payload
    #[must_use]
    pub fn custom(action_type: impl Into<String>, payload: Value) -> Self {
        Self::Custom {
            action_type: action_type.into(),
            payload,
        }
    }

    /// The action type string
    #[must_use]
    pub fn action_type(&self) -> &str {
        match self {
            Self::Request(action) => &action.action_type,
            Self::Success(action) => &action.action_type,
            Self::Error(action) => &action.action_type,
            Self::Abort(action) => &action.action_type,
            Self::AbortRequests(_) => ABORT_REQUESTS,
            Self::ResetRequests(_) => RESET_REQUESTS,
            Self::Custom { action_type, .. } => action_type,
        }
    }

    /// The request action, if this is one
    #[must_use]
    pub const fn as_request(&self) -> Option<&RequestAction> {
        match self {
            Self::Request(action) => Some(action),
            _ => None,
        }
    }

    /// For lifecycle actions, the request action they answer
    #[must_use]
    pub fn originating_request(&self) -> Option<&RequestAction> {
        match self {
            Self::Success(action) => Some(&action.request),
            Self::Error(action) => Some(&action.request),
            Self::Abort(action) => Some(&action.request),
            _ => None,
        }
    }

    /// Whether this is a success, error or abort action
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_) | Self::Abort(_))
    }
}

impl From<RequestAction> for Action {
    fn from(action: RequestAction) -> Self {
        Self::Request(action)
    }
}

impl From<SuccessAction> for Action {
    fn from(action: SuccessAction) -> Self {
        Self::Success(action)
    }
}

impl From<ErrorAction> for Action {
    fn from(action: ErrorAction) -> Self {
        Self::Error(action)
    }
}

impl From<AbortAction> for Action {
    fn from(action: AbortAction) -> Self {
        Self::Abort(action)
    }
}

impl From<AbortRequests> for Action {
    fn from(action: AbortRequests) -> Self {
        Self::AbortRequests(action)
    }
}

impl From<ResetRequests> for Action {
    fn from(action: ResetRequests) -> Self {
        Self::ResetRequests(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;

    #[test]
    fn test_dedup_key_appends_request_key() {
        let plain = RequestAction::new("FETCH_BOOK", Request::get("/books/1"));
        assert_eq!(plain.dedup_key(), "FETCH_BOOK");

        let keyed = plain.with_meta(RequestMeta::default().with_request_key("1"));
        assert_eq!(keyed.dedup_key(), "FETCH_BOOK1");
        assert_eq!(keyed.request_key().dedup_key(), "FETCH_BOOK1");
    }

    #[test]
    fn test_lifecycle_types_carry_provenance() {
        let request = RequestAction::new("FETCH_BOOKS", Request::get("/books"));
        let success = SuccessAction::new(request.clone(), Response::with_data(1));
        let error = ErrorAction::new(request.clone(), RequestError::Aborted);
        let abort = AbortAction::new(request);

        assert_eq!(success.action_type, "FETCH_BOOKS_SUCCESS");
        assert_eq!(error.action_type, "FETCH_BOOKS_ERROR");
        assert_eq!(abort.action_type, "FETCH_BOOKS_ABORT");

        let action: Action = success.into();
        assert!(action.is_response());
        assert_eq!(action.originating_request().map(|r| r.action_type.as_str()), Some("FETCH_BOOKS"));
    }

    #[test]
    fn test_key_selection() {
        let keys = vec![RequestKey::new("A"), RequestKey::new("B").with_key("2")];
        assert!(keys_select(None, "anything"));
        assert!(keys_select(Some(&keys), "A"));
        assert!(keys_select(Some(&keys), "B2"));
        assert!(!keys_select(Some(&keys), "B"));
        assert!(keys_select_type(Some(&keys), "B"));
        assert!(!keys_select_type(Some(&keys), "C"));
    }
}
