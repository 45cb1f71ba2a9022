//! Email notification boundary.
//!
//! Messages are composed here from fixed templates and handed to a `Notifier`.
//! Delivery is best effort: callers log failures and carry on.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use budget_eagle_bills::Bill;

/// One outbound email. This is also the JSON body posted to the email endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub message: String,
    /// Recipient display name, used in the greeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),

    #[error("email endpoint returned status {0}")]
    Rejected(u16),

    #[error("email endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

impl Notification {
    fn new(to: &str, name: &str, subject: &str, message: String) -> Self {
        Self {
            to: to.to_string(),
            subject: subject.to_string(),
            message,
            name: Some(name.to_string()),
        }
    }

    /// To the submitter, right after submission.
    pub fn bill_submitted(to: &str, name: &str, bill: &Bill) -> Self {
        Self::new(
            to,
            name,
            "Bill Submitted Successfully",
            format!(
                "Your bill \"{}\" for {} has been submitted and is awaiting approval.",
                bill.title(),
                bill.amount()
            ),
        )
    }

    /// To each reviewer, right after submission.
    pub fn bill_awaiting_review(to: &str, name: &str, bill: &Bill) -> Self {
        Self::new(
            to,
            name,
            "New Bill Awaiting Your Approval",
            format!(
                "{} from {} has submitted a new bill \"{}\" for {} that requires your review.",
                bill.submitter_name(),
                bill.submitter_department(),
                bill.title(),
                bill.amount()
            ),
        )
    }

    pub fn bill_approved(to: &str, name: &str, bill: &Bill) -> Self {
        Self::new(
            to,
            name,
            "Bill Approved",
            format!(
                "Your bill \"{}\" for {} has been approved. The payment will be processed soon.",
                bill.title(),
                bill.amount()
            ),
        )
    }

    pub fn approval_confirmation(to: &str, name: &str, bill: &Bill) -> Self {
        Self::new(
            to,
            name,
            "Bill Approval Confirmation",
            format!(
                "You have approved the bill \"{}\" for {} submitted by {}.",
                bill.title(),
                bill.amount(),
                bill.submitter_name()
            ),
        )
    }

    pub fn bill_rejected(to: &str, name: &str, bill: &Bill, reason: &str) -> Self {
        Self::new(
            to,
            name,
            "Bill Rejected",
            format!(
                "Your bill \"{}\" for {} has been rejected. Reason: {reason}",
                bill.title(),
                bill.amount()
            ),
        )
    }

    pub fn rejection_confirmation(to: &str, name: &str, bill: &Bill, reason: &str) -> Self {
        Self::new(
            to,
            name,
            "Bill Rejection Confirmation",
            format!(
                "You have rejected the bill \"{}\" for {} submitted by {}. Reason: {reason}",
                bill.title(),
                bill.amount(),
                bill.submitter_name()
            ),
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// The branded HTML body the email endpoint sends.
pub fn render_html(notification: &Notification, year: i32) -> String {
    let name = escape_html(notification.name.as_deref().unwrap_or("there"));
    let message = escape_html(&notification.message);
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #e0e0e0; border-radius: 5px;">
  <h1 style="color: #333; border-bottom: 1px solid #eee; padding-bottom: 10px;">Budget Eagle Notification</h1>
  <p style="margin-top: 20px;">Hello {name},</p>
  <div style="margin: 20px 0; line-height: 1.5;">
    {message}
  </div>
  <p style="margin-top: 30px; color: #666; font-size: 14px;">This is an automated message from Budget Eagle system. Please do not reply to this email.</p>
  <div style="margin-top: 20px; padding-top: 20px; border-top: 1px solid #eee; color: #888; font-size: 12px;">
    &copy; {year} Budget Eagle. All rights reserved.
  </div>
</div>"#
    )
}

/// Writes notifications to the log and nowhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            "email notification"
        );
        tracing::debug!(html = %render_html(notification, Utc::now().year()), "email body");
        Ok(())
    }
}

/// Records every notification it is asked to send. Can be switched into a
/// failing mode to exercise delivery errors.
#[derive(Debug, Default)]
pub struct OutboxNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl OutboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything delivered so far, in delivery order.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, email: &str) -> Vec<Notification> {
        self.sent().into_iter().filter(|n| n.to.eq_ignore_ascii_case(email)).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Delivery("outbox is in failing mode".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| NotificationError::Delivery("outbox lock poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

/// POSTs each notification as JSON to the hosted email function.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    /// Sent as a bearer token on every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let mut request = self.client.post(&self.endpoint).json(notification);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status().as_u16()));
        }
        tracing::debug!(to = %notification.to, subject = %notification.subject, "email accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use budget_eagle_bills::{BillCommand, SubmitBill, Submitter};
    use budget_eagle_core::{Aggregate, BillId, UserId};

    use super::*;

    fn bill() -> Bill {
        let cmd = SubmitBill {
            bill_id: BillId::new(),
            submitter: Submitter {
                id: UserId::new(),
                name: "Rahul Kumar".into(),
                department: "Marketing".into(),
            },
            title: "Client Dinner".into(),
            description: "quarterly review".into(),
            amount: 12_500,
            attachment: None,
            occurred_at: Utc::now(),
        };
        let mut bill = Bill::empty(cmd.bill_id);
        for e in bill.handle(&BillCommand::Submit(cmd)).unwrap() {
            bill.apply(&e);
        }
        bill
    }

    #[test]
    fn submission_templates() {
        let bill = bill();
        let own = Notification::bill_submitted("e@example.com", "Rahul Kumar", &bill);
        assert_eq!(own.subject, "Bill Submitted Successfully");
        assert_eq!(
            own.message,
            "Your bill \"Client Dinner\" for ₹12,500 has been submitted and is awaiting approval."
        );

        let review = Notification::bill_awaiting_review("m@example.com", "Vikram Singh", &bill);
        assert_eq!(review.subject, "New Bill Awaiting Your Approval");
        assert!(review.message.starts_with("Rahul Kumar from Marketing has submitted"));
        assert_eq!(review.name.as_deref(), Some("Vikram Singh"));
    }

    #[test]
    fn rejection_templates_carry_the_reason() {
        let bill = bill();
        let to_submitter = Notification::bill_rejected("e@example.com", "Rahul", &bill, "No receipt");
        assert_eq!(to_submitter.subject, "Bill Rejected");
        assert!(to_submitter.message.ends_with("Reason: No receipt"));

        let to_reviewer =
            Notification::rejection_confirmation("m@example.com", "Vikram", &bill, "No receipt");
        assert_eq!(to_reviewer.subject, "Bill Rejection Confirmation");
        assert!(to_reviewer.message.contains("submitted by Rahul Kumar"));
    }

    #[test]
    fn html_body_is_escaped_and_greets_by_name() {
        let n = Notification {
            to: "x@example.com".into(),
            subject: "s".into(),
            message: "<b>5 & 6</b>".into(),
            name: None,
        };
        let html = render_html(&n, 2025);
        assert!(html.contains("Hello there,"));
        assert!(html.contains("&lt;b&gt;5 &amp; 6&lt;/b&gt;"));
        assert!(html.contains("&copy; 2025 Budget Eagle"));
    }

    #[test]
    fn wire_body_matches_endpoint_contract() {
        let n = Notification::bill_approved("e@example.com", "Rahul", &bill());
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["to"], "e@example.com");
        assert_eq!(json["subject"], "Bill Approved");
        assert_eq!(json["name"], "Rahul");
        assert!(json["message"].as_str().unwrap().contains("payment will be processed soon"));
    }

    #[tokio::test]
    async fn outbox_records_and_fails_on_demand() {
        let outbox = OutboxNotifier::new();
        let n = Notification::bill_approved("E@example.com", "Rahul", &bill());
        outbox.send(&n).await.unwrap();
        assert_eq!(outbox.sent_to("e@example.com").len(), 1);

        outbox.set_failing(true);
        assert!(outbox.send(&n).await.is_err());
        assert_eq!(outbox.sent().len(), 1);
    }

    #[tokio::test]
    async fn http_notifier_surfaces_connection_errors() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let notifier = HttpNotifier::new("http://127.0.0.1:9/send-email").with_api_key("anon");
        let n = Notification::bill_approved("e@example.com", "Rahul", &bill());
        assert!(notifier.send(&n).await.is_err());
    }
}
