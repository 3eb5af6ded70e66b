//! Read helpers over [`NetworkState`].

use crate::NetworkState;
use serde::Serialize;
use serde_json::Value;

/// What a consumer needs to render one query
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryView {
    /// Cached data
    pub data: Value,
    /// Last error
    pub error: Option<Value>,
    /// Whether a call is in flight
    pub loading: bool,
    /// Number of calls in flight
    pub pending: u32,
}

/// What a consumer needs to render one mutation
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MutationView {
    /// Last error
    pub error: Option<Value>,
    /// Whether a call is in flight
    pub loading: bool,
}

/// The query slice of `request_type`, or an empty view if none exists yet
#[must_use]
pub fn get_query(state: &NetworkState, request_type: &str) -> QueryView {
    state
        .queries
        .get(request_type)
        .map(|query| QueryView {
            data: query.data.clone(),
            error: query.error.clone(),
            loading: query.is_loading(),
            pending: query.pending,
        })
        .unwrap_or_default()
}

/// The mutation slice of `key`, or an idle view if none exists
#[must_use]
pub fn get_mutation(state: &NetworkState, key: &str) -> MutationView {
    state
        .mutations
        .get(key)
        .map(|mutation| MutationView {
            error: mutation.error.clone(),
            loading: mutation.is_loading(),
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MutationState, QueryState};
    use serde_json::json;

    #[test]
    fn test_missing_slices_are_idle() {
        let state = NetworkState::default();
        assert_eq!(get_query(&state, "FETCH_BOOKS"), QueryView::default());
        assert_eq!(get_mutation(&state, "DELETE_BOOK"), MutationView::default());
    }

    #[test]
    fn test_views_reflect_slices() {
        let mut state = NetworkState::default();
        state.queries.insert("FETCH_BOOKS".into(), QueryState { data: json!([1]), error: None, pending: 2 });
        state.mutations.insert("DELETE_BOOK".into(), MutationState { error: Some(json!("no")), pending: 0, data: None });

        let query = get_query(&state, "FETCH_BOOKS");
        assert!(query.loading);
        assert_eq!(query.pending, 2);
        assert_eq!(query.data, json!([1]));

        let mutation = get_mutation(&state, "DELETE_BOOK");
        assert!(!mutation.loading);
        assert_eq!(mutation.error, Some(json!("no")));
    }
}
