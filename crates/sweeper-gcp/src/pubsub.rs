//! Pub/Sub pull subscriber used by the message trigger
//!
//! Message payloads are never inspected: any message means "sweep now".

use crate::client::GcpClient;
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub struct PubSubSubscriber {
    client: GcpClient,
    subscription: String,
}

/// A delivered message, reduced to what the trigger needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub ack_id: String,
    pub message_id: String,
    pub publish_time: Option<String>,
}

impl PubSubSubscriber {
    /// Accepts a bare subscription name or a full `projects/*/subscriptions/*` path
    pub fn new(client: GcpClient, subscription: &str) -> Self {
        let subscription = subscription_path(client.project_id(), subscription);
        Self {
            client,
            subscription,
        }
    }

    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// Long-poll for up to `max_messages` messages
    pub async fn pull(&self, max_messages: u32) -> Result<Vec<ReceivedMessage>> {
        let url = GcpClient::service_url("pubsub", &format!("v1/{}:pull", self.subscription));
        let request = PullRequest {
            max_messages: max_messages.max(1),
        };
        let response: PullResponse = self.client.post_json(&url, &request).await?;

        Ok(response
            .received_messages
            .into_iter()
            .map(|m| ReceivedMessage {
                ack_id: m.ack_id,
                message_id: m.message.message_id,
                publish_time: m.message.publish_time,
            })
            .collect())
    }

    pub async fn acknowledge(&self, ack_ids: &[String]) -> Result<()> {
        if ack_ids.is_empty() {
            return Ok(());
        }
        let url = GcpClient::service_url(
            "pubsub",
            &format!("v1/{}:acknowledge", self.subscription),
        );
        let _: serde_json::Value = self
            .client
            .post_json(&url, &AcknowledgeRequest { ack_ids })
            .await?;
        Ok(())
    }
}

fn subscription_path(project: &str, subscription: &str) -> String {
    if subscription.starts_with("projects/") {
        subscription.to_string()
    } else {
        format!("projects/{}/subscriptions/{}", project, subscription)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequest {
    max_messages: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgeRequest<'a> {
    ack_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullResponse {
    #[serde(default)]
    received_messages: Vec<ApiReceivedMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiReceivedMessage {
    ack_id: String,
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMessage {
    #[serde(default)]
    message_id: String,
    #[serde(default)]
    publish_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscription_path() {
        assert_eq!(
            subscription_path("p", "cleanup-trigger"),
            "projects/p/subscriptions/cleanup-trigger"
        );
        assert_eq!(
            subscription_path("p", "projects/other/subscriptions/s"),
            "projects/other/subscriptions/s"
        );
    }

    #[test]
    fn test_pull_response_decoding() {
        let response: PullResponse = serde_json::from_value(json!({
            "receivedMessages": [{
                "ackId": "ack-1",
                "message": {
                    "data": "eyJydW4iOiB0cnVlfQ==",
                    "messageId": "42",
                    "publishTime": "2024-06-01T03:00:00Z"
                }
            }]
        }))
        .unwrap();
        assert_eq!(response.received_messages.len(), 1);
        assert_eq!(response.received_messages[0].ack_id, "ack-1");

        let empty: PullResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.received_messages.is_empty());
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_value(PullRequest { max_messages: 5 }).unwrap();
        assert_eq!(body, json!({ "maxMessages": 5 }));

        let ids = vec!["a".to_string(), "b".to_string()];
        let body = serde_json::to_value(AcknowledgeRequest { ack_ids: &ids }).unwrap();
        assert_eq!(body, json!({ "ackIds": ["a", "b"] }));
    }
}
