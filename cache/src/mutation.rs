//! Mutation (operations) reducer.
//!
//! Mutations are tracked by status only: how many calls are in flight and the
//! last error. Response data is kept only when `handle_operations_state` is
//! enabled.

use composable_requests_core::action::{Action, RequestAction, RequestKey, keys_select};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Status of one mutation key
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationState {
    /// Error of the last failed call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Calls for this key currently in flight
    #[serde(default)]
    pub pending: u32,
    /// Last response data, only with `handle_operations_state`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl MutationState {
    /// Whether at least one call is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.pending > 0
    }
}

/// Key of the mutation slice for `request`
///
/// `meta.operations.get_request_key` wins; otherwise `type + request_key`.
#[must_use]
pub fn mutation_key(request: &RequestAction) -> String {
    request
        .meta
        .operations
        .as_ref()
        .and_then(|operations| operations.get_request_key.as_ref())
        .map_or_else(|| request.dedup_key(), |get_key| get_key(request))
}

/// Fold a mutation request or lifecycle action into `mutations`
pub(crate) fn reduce_mutation(
    mutations: &mut BTreeMap<String, MutationState>,
    action: &Action,
    handle_operations_state: bool,
) {
    match action {
        Action::Request(request) => {
            let state = mutations.entry(mutation_key(request)).or_default();
            state.pending += 1;
            state.error = None;
        },
        Action::Success(success) => {
            let state = mutations.entry(mutation_key(&success.request)).or_default();
            state.pending = state.pending.saturating_sub(1);
            state.error = None;
            if handle_operations_state {
                state.data = Some(success.data());
            }
        },
        Action::Error(error) => {
            let state = mutations.entry(mutation_key(&error.request)).or_default();
            state.pending = state.pending.saturating_sub(1);
            state.error = Some(error.error.payload());
        },
        Action::Abort(abort) => {
            let state = mutations.entry(mutation_key(&abort.request)).or_default();
            state.pending = state.pending.saturating_sub(1);
        },
        _ => {},
    }
}

/// Apply a reset to the mutation bucket
///
/// Settled entries matching the reset are dropped; entries with calls still
/// in flight stay, with their error and data cleared.
pub(crate) fn reset_mutations(
    mutations: &mut BTreeMap<String, MutationState>,
    keys: Option<&[RequestKey]>,
) {
    mutations.retain(|key, state| {
        if !keys_select(keys, key) {
            return true;
        }
        state.error = None;
        state.data = None;
        state.pending > 0
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_requests_core::action::{ErrorAction, SuccessAction};
    use composable_requests_core::{Request, RequestError, RequestMeta, Response, hooks};
    use serde_json::json;

    fn delete(id: &str) -> RequestAction {
        RequestAction::new("DELETE_BOOK", Request::delete(format!("/books/{id}")))
            .with_meta(RequestMeta::default().with_request_key(id))
    }

    #[test]
    fn test_status_lifecycle() {
        let mut mutations = BTreeMap::new();

        reduce_mutation(&mut mutations, &delete("1").into(), false);
        assert_eq!(mutations["DELETE_BOOK1"].pending, 1);

        reduce_mutation(&mut mutations, &ErrorAction::new(delete("1"), RequestError::driver(404)).into(), false);
        assert_eq!(
            mutations["DELETE_BOOK1"],
            MutationState { error: Some(json!(404)), pending: 0, data: None }
        );
    }

    #[test]
    fn test_data_only_with_operations_state() {
        let success: Action = SuccessAction::new(delete("1"), Response::with_data("gone")).into();

        let mut plain = BTreeMap::new();
        reduce_mutation(&mut plain, &success, false);
        assert_eq!(plain["DELETE_BOOK1"].data, None);

        let mut tracked = BTreeMap::new();
        reduce_mutation(&mut tracked, &success, true);
        assert_eq!(tracked["DELETE_BOOK1"].data, Some(json!("gone")));
    }

    #[test]
    fn test_operations_key_override() {
        let action = RequestAction::new("DELETE_BOOK", Request::delete("/books/1")).with_meta(
            RequestMeta::default()
                .with_request_key("1")
                .with_operations_key(hooks::request_key(|action| format!("{}:custom", action.action_type))),
        );
        assert_eq!(mutation_key(&action), "DELETE_BOOK:custom");
    }

    #[test]
    fn test_reset_drops_settled_keeps_pending() {
        let mut mutations = BTreeMap::new();
        mutations.insert("DELETE_BOOK1".to_string(), MutationState { error: Some(json!("e")), pending: 0, data: None });
        mutations.insert("DELETE_BOOK2".to_string(), MutationState { error: Some(json!("e")), pending: 1, data: None });
        mutations.insert("ADD_BOOK".to_string(), MutationState { error: Some(json!("e")), pending: 0, data: None });

        let keys = [RequestKey::new("DELETE_BOOK").with_key("1"), RequestKey::new("DELETE_BOOK").with_key("2")];
        reset_mutations(&mut mutations, Some(&keys));

        assert!(!mutations.contains_key("DELETE_BOOK1"));
        assert_eq!(mutations["DELETE_BOOK2"], MutationState { error: None, pending: 1, data: None });
        assert_eq!(mutations["ADD_BOOK"].error, Some(json!("e")));
    }
}
