use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serenity::http::Http;
use serenity::model::webhook::Webhook;
use tokio::sync::{Mutex, OnceCell};
use tracing::Instrument;

/// outbound moderation/ops chat. delivery is best effort.
#[async_trait]
pub trait ChatNotifier {
    async fn notify(&self, text: &str) -> Result<()>;
}

lazy_static! {
    static ref WEBHOOK_URL: Regex =
        Regex::new(r"^https://(?:\w+\.)?discord(?:app)?\.com/api/webhooks/(\d+)/([\w-]+)/?$")
            .unwrap();
}

pub struct DiscordWebhook {
    http: Http,
    id: u64,
    token: String,
    webhook: OnceCell<Webhook>,
}

impl DiscordWebhook {
    pub fn new(url: &str) -> Result<Self> {
        let caps = WEBHOOK_URL
            .captures(url.trim())
            .ok_or_else(|| anyhow!("not a discord webhook url"))?;
        let id = caps[1].parse()?;
        let token = caps[2].to_string();

        Ok(Self {
            http: Http::new(""),
            id,
            token,
            webhook: OnceCell::new(),
        })
    }

    async fn webhook(&self) -> Result<&Webhook> {
        let w = self
            .webhook
            .get_or_try_init(|| self.http.get_webhook_with_token(self.id, &self.token))
            .await?;

        Ok(w)
    }
}

#[async_trait]
impl ChatNotifier for DiscordWebhook {
    async fn notify(&self, text: &str) -> Result<()> {
        let webhook = self.webhook().await?;

        webhook
            .execute(&self.http, false, |w| w.content(text))
            .instrument(tracing::trace_span!("execute_webhook"))
            .await?;

        Ok(())
    }
}

/// drops everything; used when no webhook is configured.
pub struct NullNotifier;

#[async_trait]
impl ChatNotifier for NullNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        tracing::debug!("alert dropped: {}", text);
        Ok(())
    }
}

/// keeps every alert in memory.
#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<String>>);

impl RecordingNotifier {
    pub fn new() -> Self { Self::default() }

    pub async fn messages(&self) -> Vec<String> { self.0.lock().await.clone() }
}

#[async_trait]
impl ChatNotifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        self.0.lock().await.push(text.to_string());
        Ok(())
    }
}

/// sends and forgets: failures are logged, never returned.
#[derive(Clone)]
pub struct Alerts(Arc<dyn ChatNotifier + Sync + Send>);

impl Alerts {
    pub fn new(notifier: Arc<dyn ChatNotifier + Sync + Send>) -> Self { Self(notifier) }

    pub async fn send(&self, text: impl AsRef<str>) {
        if let Err(e) = self.0.notify(text.as_ref()).await {
            tracing::warn!("failed to deliver alert: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl ChatNotifier for Failing {
        async fn notify(&self, _: &str) -> Result<()> { Err(anyhow!("offline")) }
    }

    #[test]
    fn webhook_url_is_parsed() {
        let w = DiscordWebhook::new("https://discord.com/api/webhooks/123456/abc-DEF_9").unwrap();
        assert_eq!(w.id, 123456);
        assert_eq!(w.token, "abc-DEF_9");

        assert!(DiscordWebhook::new("https://example.com/hook").is_err());
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        Alerts::new(Arc::new(Failing)).send("hello").await;
    }

    #[tokio::test]
    async fn recording_keeps_order() {
        let rec = Arc::new(RecordingNotifier::new());
        let alerts = Alerts::new(rec.clone());

        alerts.send("one").await;
        alerts.send("two".to_string()).await;

        assert_eq!(rec.messages().await, ["one", "two"]);
    }
}
