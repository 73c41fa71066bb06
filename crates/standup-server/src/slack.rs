//! Slack delivery via `chat.postMessage`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use standup_core::config::Config;
use standup_core::error::{Result, StandupError};
use standup_core::notify::{LogNotifier, Notifier};
use standup_core::types::{Action, Member};

pub const TOKEN_ENV: &str = "STANDUP_SLACK_TOKEN";
const DEFAULT_BASE_URL: &str = "https://slack.com/api";

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackNotifier {
    client: Client,
    token: String,
    base_url: String,
    management_target: Option<String>,
}

impl SlackNotifier {
    pub fn new(token: impl Into<String>, management_target: Option<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            management_target,
        }
    }

    /// Point at a different API root (tests, Slack-compatible gateways).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn management_target(&self, member: &str) -> Result<&str> {
        self.management_target
            .as_deref()
            .ok_or_else(|| StandupError::NotifierFailure {
                member: member.to_string(),
                reason: "notifier.management_target is not configured".into(),
            })
    }

    async fn post_message(&self, member: &str, channel: &str, text: &str) -> Result<()> {
        let fail = |reason: String| StandupError::NotifierFailure {
            member: member.to_string(),
            reason,
        };
        let resp = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "channel": channel, "text": text }))
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(fail(format!("HTTP {}", resp.status())));
        }
        // Slack reports most failures as 200 with `ok: false`.
        let body: PostMessageResponse = resp.json().await.map_err(|e| fail(e.to_string()))?;
        if !body.ok {
            return Err(fail(body.error.unwrap_or_else(|| "unknown_error".into())));
        }
        tracing::debug!(member, channel, "slack message posted");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send_prompt(&self, member: &Member) -> Result<()> {
        let text = format!(
            "Hi {}, time for your daily standup. What did you get done, \
             anything blocking you, and what is next?",
            member.name
        );
        self.post_message(&member.id, &member.target, &text).await
    }

    async fn send_action(&self, member: &Member, action: &Action) -> Result<()> {
        match action {
            Action::SendReminder => {
                let text = format!(
                    "Reminder: {}, your standup for today has not been submitted yet.",
                    member.name
                );
                self.post_message(&member.id, &member.target, &text).await
            }
            Action::SendEscalation => {
                let text = format!(
                    "Second reminder: {}, please submit today's standup. \
                     Your lead will be notified if it is still missing.",
                    member.name
                );
                self.post_message(&member.id, &member.target, &text).await
            }
            Action::NotifyManagement { missed_streak } => {
                let channel = self.management_target(&member.id)?;
                let text = format!(
                    "{} has not submitted a standup for {} consecutive working day(s).",
                    member.name, missed_streak
                );
                self.post_message(&member.id, channel, &text).await
            }
        }
    }

    async fn send_summary(&self, text: &str) -> Result<()> {
        let channel = self.management_target("management")?;
        self.post_message("management", channel, text).await
    }
}

/// Slack when `STANDUP_SLACK_TOKEN` is set, otherwise log-only delivery.
pub fn notifier_from_env(config: &Config) -> Arc<dyn Notifier> {
    match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Arc::new(SlackNotifier::new(
            token.trim(),
            config.notifier.management_target.clone(),
        )),
        _ => {
            tracing::warn!("{TOKEN_ENV} not set, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn bob() -> Member {
        Member::new("bob", "Bob", "U2")
    }

    #[tokio::test]
    async fn reminder_posts_to_member_target() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(Matcher::PartialJson(json!({ "channel": "U2" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let slack = SlackNotifier::new("xoxb-test", None).with_base_url(server.url());
        slack.send_action(&bob(), &Action::SendReminder).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn management_notice_goes_to_management_target() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::PartialJson(json!({ "channel": "#leads" })))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let slack =
            SlackNotifier::new("xoxb-test", Some("#leads".into())).with_base_url(server.url());
        slack
            .send_action(&bob(), &Action::NotifyManagement { missed_streak: 3 })
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn ok_false_is_a_notifier_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_body(r#"{"ok":false,"error":"channel_not_found"}"#)
            .create_async()
            .await;

        let slack = SlackNotifier::new("xoxb-test", None).with_base_url(server.url());
        let err = slack.send_prompt(&bob()).await.unwrap_err();
        match err {
            StandupError::NotifierFailure { member, reason } => {
                assert_eq!(member, "bob");
                assert_eq!(reason, "channel_not_found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn http_error_is_a_notifier_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_status(429)
            .create_async()
            .await;

        let slack = SlackNotifier::new("xoxb-test", None).with_base_url(server.url());
        let err = slack.send_prompt(&bob()).await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn summary_without_management_target_fails_without_calling_slack() {
        let slack = SlackNotifier::new("xoxb-test", None).with_base_url("http://127.0.0.1:9");
        let err = slack.send_summary("weekly").await.unwrap_err();
        assert!(err.to_string().contains("management_target"));
    }
}
