//! Policy prioritization against a live profile.

use crate::cancel::CancelToken;
use crate::client::Client;
use crate::error::{AllowNoContent, Result};
use crate::lock::LockKey;
use crate::models::{Policy, PolicyOrder, PolicyOrderEntry};
use drift::PolicyPriority;
use drift::priority::reconcile;

const POLICY_PAGE_SIZE: usize = 100;

impl Client {
    /// Ids of every policy on a profile in the server's evaluation order.
    pub fn policy_order(&self, cancel: &CancelToken, profile_id: &str) -> Result<Vec<String>> {
        let mut policies: Vec<Policy> = self
            .query(LockKey::Policy)
            .with_size(POLICY_PAGE_SIZE)
            .fetch(cancel, &format!("paps/{profile_id}/policies"))?;
        // Stable sort keeps listing order for policies without a priority.
        policies.sort_by_key(|p| p.priority.unwrap_or(usize::MAX));
        Ok(policies.into_iter().map(|p| p.id).collect())
    }

    /// Apply a prioritization to a profile and return the submitted order.
    ///
    /// When `enabled` is false only the flag is written and the result is
    /// empty. Otherwise the pins are merged into the server order and the
    /// complete order is submitted.
    pub fn set_policy_priorities(
        &self,
        cancel: &CancelToken,
        profile_id: &str,
        enabled: bool,
        pins: &[PolicyPriority],
    ) -> Result<Vec<PolicyPriority>> {
        let endpoint = format!("paps/{profile_id}/policies/order");
        if !enabled {
            let body = PolicyOrder {
                policy_priority_enabled: false,
                policies: None,
            };
            self.post(cancel, &endpoint, &body, LockKey::Policy)
                .allow_no_content()?;
            return Ok(Vec::new());
        }

        let server_order = self.policy_order(cancel, profile_id)?;
        let order = reconcile(&server_order, pins)?;
        log::debug!(
            "submitting order of {} policies for profile {profile_id}",
            order.len()
        );

        let body = PolicyOrder {
            policy_priority_enabled: true,
            policies: Some(
                order
                    .iter()
                    .map(|p| PolicyOrderEntry {
                        id: p.policy_id.clone(),
                        priority: p.priority,
                    })
                    .collect(),
            ),
        };
        self.post(cancel, &endpoint, &body, LockKey::Policy)
            .allow_no_content()?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::transport::{Method, MockExecutor};
    use serde_json::json;

    fn mock_with_policies() -> MockExecutor {
        let mock = MockExecutor::new();
        mock.respond_json(
            Method::Get,
            "/paps/p1/policies?page=0&size=100",
            200,
            &json!({
                "count": 3, "page": 0, "size": 100,
                "data": [
                    {"id": "c", "name": "C", "priority": 2},
                    {"id": "a", "name": "A", "priority": 0},
                    {"id": "b", "name": "B", "priority": 1}
                ]
            }),
        );
        mock.respond(Method::Post, "/paps/p1/policies/order", 204, "");
        mock
    }

    #[test]
    fn test_pin_moves_policy_to_front() {
        let mock = mock_with_policies();
        let client = Client::with_executor("https://t.example", "tok", mock.clone());

        let order = client
            .set_policy_priorities(
                &CancelToken::new(),
                "p1",
                true,
                &[PolicyPriority::new("paps/p1/policies/b", 0)],
            )
            .unwrap();
        let ids: Vec<&str> = order.iter().map(|p| p.policy_id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);

        let posted = mock.requests_to(Method::Post, "policies/order");
        assert_eq!(
            posted[0].json().unwrap(),
            json!({
                "policyPriorityEnabled": true,
                "policies": [
                    {"id": "b", "priority": 0},
                    {"id": "a", "priority": 1},
                    {"id": "c", "priority": 2}
                ]
            })
        );
    }

    #[test]
    fn test_disabled_writes_flag_only() {
        let mock = mock_with_policies();
        let client = Client::with_executor("https://t.example", "tok", mock.clone());

        let order = client
            .set_policy_priorities(
                &CancelToken::new(),
                "p1",
                false,
                &[PolicyPriority::new("b", 0)],
            )
            .unwrap();
        assert!(order.is_empty());
        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].json().unwrap(), json!({"policyPriorityEnabled": false}));
    }

    #[test]
    fn test_out_of_range_rejected_before_submit() {
        let mock = mock_with_policies();
        let client = Client::with_executor("https://t.example", "tok", mock.clone());

        let err = client
            .set_policy_priorities(&CancelToken::new(), "p1", true, &[PolicyPriority::new("a", 3)])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Drift(drift::Error::PriorityOutOfRange { total: 3, .. })
        ));
        assert!(mock.requests_to(Method::Post, "policies/order").is_empty());
    }
}
