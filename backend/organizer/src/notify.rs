//! Outbound notifications — tells every giver who they drew.
//!
//! ## Delivery
//!
//! * [`NotificationDispatcher`] is the only thing the run coordinator knows
//!   about; it gets one call per assignment and never retries.
//! * [`Mailer`] talks to a SendGrid-compatible `mail/send` endpoint. A
//!   rate-limit response is retried with exponential back-off, up to
//!   [`MAX_SEND_ATTEMPTS`] tries; every other failure is returned at once.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::{Result, SantaError};
use crate::models::{Assignment, GiftWish};

const MAX_SEND_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_SECS: u64 = 2;

/// Result of a single notification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    DeliveryFailed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Sends one giver their assignment together with the receiver's wish list.
pub trait NotificationDispatcher: Send + Sync {
    fn send(
        &self,
        assignment: &Assignment,
        wish_list: &[GiftWish],
    ) -> impl Future<Output = DeliveryOutcome> + Send;
}

// ─────────────────────────────────────────────────────────
// Message rendering
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn render_assignment_email(assignment: &Assignment, wish_list: &[GiftWish]) -> EmailMessage {
    let giver = &assignment.giver;
    let receiver = &assignment.receiver;

    let (text_list, html_list) = if wish_list.is_empty() {
        (
            "No wishes listed yet.".to_string(),
            "<p><em>No wishes listed yet.</em></p>".to_string(),
        )
    } else {
        let text = wish_list
            .iter()
            .map(|gift| {
                let mut line = format!("- {}", gift.name);
                if let Some(link) = &gift.link {
                    line.push_str(&format!(" ({link})"));
                }
                if gift.bought {
                    line.push_str(" (already bought)");
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n");

        let items: String = wish_list
            .iter()
            .map(|gift| {
                let mut item = format!("<li>{}", escape_html(&gift.name));
                if let Some(link) = &gift.link {
                    item.push_str(&format!(" (<a href=\"{}\">link</a>)", escape_html(link)));
                }
                if gift.bought {
                    item.push_str(" (already bought)");
                }
                item.push_str("</li>");
                item
            })
            .collect();
        (text, format!("<ul>{items}</ul>"))
    };

    let text = format!(
        "Hello {giver},\n\n\
         You've been assigned to be the Secret Santa for {receiver}.\n\n\
         Here is {receiver}'s gift list:\n\n\
         {text_list}\n\n\
         Happy gifting!",
        giver = giver.name,
        receiver = receiver.name,
    );

    let html = format!(
        "<p>Hello {giver},</p>\
         <p>You've been assigned to be the Secret Santa for <strong>{receiver}</strong>.</p>\
         <p>Here is {receiver}'s gift list:</p>\
         {html_list}\
         <p>Happy gifting!</p>",
        giver = escape_html(&giver.name),
        receiver = escape_html(&receiver.name),
    );

    EmailMessage {
        to_email: giver.email.clone(),
        to_name: Some(giver.name.clone()),
        subject: "Your Secret Santa Assignment".to_string(),
        text,
        html,
    }
}

/// Sent to a manager when they create a group: the code participants join
/// with, and the manager's own token for organizing the draw later.
pub fn render_invite_email(
    manager_email: &str,
    manager_token: &str,
    group_name: &str,
    invite_code: &str,
) -> EmailMessage {
    EmailMessage {
        to_email: manager_email.to_string(),
        to_name: None,
        subject: "Your Secret Santa group invite code".to_string(),
        text: format!(
            "The invite code for your Secret Santa group \"{group_name}\" is: {invite_code}\n\n\
             Share it with everyone who should take part.\n\n\
             Your admin token is: {manager_token}\n\
             Keep it to yourself; you need it to organize the draw."
        ),
        html: format!(
            "<p>The invite code for your Secret Santa group \"{}\" is: <strong>{}</strong></p>\
             <p>Share it with everyone who should take part.</p>\
             <p>Your admin token is: <code>{}</code><br>\
             Keep it to yourself; you need it to organize the draw.</p>",
            escape_html(group_name),
            escape_html(invite_code),
            escape_html(manager_token)
        ),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ─────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────

/// Minimal client for a SendGrid v3 style `mail/send` endpoint.
#[derive(Clone)]
pub struct Mailer {
    client: Client,
    api_url: String,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl Mailer {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<()> {
        let payload = build_payload(&self.from_email, &self.from_name, message);
        let mut backoff = INITIAL_BACKOFF_SECS;

        for attempt in 1..=MAX_SEND_ATTEMPTS {
            let resp = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await?;

            let status = resp.status();
            if status.is_success() {
                debug!("Email accepted for {} ({status})", message.to_email);
                return Ok(());
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < MAX_SEND_ATTEMPTS {
                warn!("Rate-limited by email provider (will retry in {backoff}s)");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff *= 2;
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(SantaError::Email(format!(
                "provider returned {status}: {}",
                body.trim()
            )));
        }

        Err(SantaError::Email(format!(
            "still rate-limited after {MAX_SEND_ATTEMPTS} attempts"
        )))
    }
}

fn build_payload(from_email: &str, from_name: &str, message: &EmailMessage) -> Value {
    let mut to = json!({ "email": message.to_email });
    if let Some(name) = &message.to_name {
        to["name"] = json!(name);
    }

    json!({
        "personalizations": [{ "to": [to] }],
        "from": { "email": from_email, "name": from_name },
        "subject": message.subject,
        "content": [
            { "type": "text/plain", "value": message.text },
            { "type": "text/html", "value": message.html },
        ],
    })
}

/// [`NotificationDispatcher`] that emails the giver through a [`Mailer`].
#[derive(Clone)]
pub struct EmailDispatcher {
    mailer: Mailer,
}

impl EmailDispatcher {
    pub fn new(mailer: Mailer) -> Self {
        Self { mailer }
    }
}

impl NotificationDispatcher for EmailDispatcher {
    async fn send(&self, assignment: &Assignment, wish_list: &[GiftWish]) -> DeliveryOutcome {
        let message = render_assignment_email(assignment, wish_list);
        match self.mailer.send(&message).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => DeliveryOutcome::DeliveryFailed(e.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
