//! Query vs. mutation classification.

use crate::action::{Action, RequestAction};
use crate::hooks::{self, RequestPredicate};
use crate::request::Request;

/// Default read-only test for a request action
///
/// `meta.as_query` forces a query. Otherwise a request is a query when every
/// call in its payload is read-only (see [`Request::is_read_only`]).
#[must_use]
pub fn is_request_read_only_default(action: &RequestAction) -> bool {
    action.meta.as_query || action.request.as_slice().iter().all(Request::is_read_only)
}

/// The default classifier as a shareable predicate
#[must_use]
pub fn default_read_only() -> RequestPredicate {
    hooks::predicate(is_request_read_only_default)
}

/// Whether an action of the stream belongs to the mutation bucket
///
/// Request actions are classified directly. Lifecycle actions are classified
/// through the request action they carry, never through their response.
#[must_use]
pub fn is_mutation_action(action: &Action, is_read_only: &RequestPredicate) -> bool {
    match action {
        Action::Request(request) => !is_read_only(request),
        _ => action
            .originating_request()
            .is_some_and(|request| !is_read_only(request)),
    }
}
