//! Notification boundary: message formatting plus a delivery trait.
//!
//! Delivery is an external collaborator; the runner only cares that a
//! notification either succeeds as a unit or fails as a unit. The console
//! implementation covers local runs; anything heavier (SMTP, webhooks)
//! plugs in behind the same trait.

use crate::models::PersistedListing;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to deliver notification: {0}")]
    Delivery(String),
}

/// Delivers one run's worth of new listings, all-or-nothing.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, listings: &[PersistedListing]) -> Result<(), NotifyError>;
}

/// Subject line: "Fairfax FTHB: New listings (3)".
pub fn format_subject(prefix: &str, count: usize) -> String {
    format!("{prefix}: New listings ({count})")
}

/// Format listings as a plain-text numbered list, one block per listing.
pub fn format_body(listings: &[PersistedListing]) -> String {
    if listings.is_empty() {
        return "No new listings found.".to_string();
    }

    let mut lines = Vec::new();
    for (i, listing) in listings.iter().enumerate() {
        let mut title_line = format!("{}) {}", i + 1, listing.title);
        if let Some(status) = listing.status {
            title_line.push_str(&format!(" ({})", status.as_str()));
        }
        lines.push(title_line);

        if !listing.price.trim().is_empty() {
            lines.push(format!("   Price: {}", listing.price));
        }
        if !listing.location.trim().is_empty() {
            lines.push(format!("   Location: {}", listing.location));
        }
        for detail in &listing.details {
            if !detail.trim().is_empty() {
                lines.push(format!("   {detail}"));
            }
        }
        if !listing.url.trim().is_empty() {
            lines.push(format!("   Link: {}", listing.url));
        }

        if i + 1 < listings.len() {
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

/// Writes the formatted notification to stdout.
pub struct ConsoleNotifier {
    subject_prefix: String,
}

impl ConsoleNotifier {
    pub fn new(subject_prefix: impl Into<String>) -> Self {
        Self {
            subject_prefix: subject_prefix.into(),
        }
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, listings: &[PersistedListing]) -> Result<(), NotifyError> {
        let subject = format_subject(&self.subject_prefix, listings.len());
        let body = format_body(listings);
        println!("{subject}\n\n{body}");
        info!("Delivered notification with {} listings", listings.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingStatus;
    use chrono::Utc;

    fn listing(title: &str) -> PersistedListing {
        PersistedListing {
            id: format!("https://example.com/{title}"),
            title: title.to_string(),
            status: Some(ListingStatus::DrawingClosed),
            price: "$106,516".to_string(),
            location: "Alexandria, VA 22309".to_string(),
            details: vec![
                "Type: Condominium".to_string(),
                "Household: 1 to 4 people".to_string(),
            ],
            url: "https://example.com/listing/123".to_string(),
            first_seen_at: Utc::now(),
            last_seen_at: Utc::now(),
            notified_at: None,
        }
    }

    #[test]
    fn subject_carries_prefix_and_count() {
        assert_eq!(
            format_subject("Fairfax FTHB", 3),
            "Fairfax FTHB: New listings (3)"
        );
    }

    #[test]
    fn empty_body_says_so() {
        assert_eq!(format_body(&[]), "No new listings found.");
    }

    #[test]
    fn body_is_a_numbered_list_with_indented_fields() {
        let body = format_body(&[listing("4420 C Groombridge Way"), listing("1 Oak Way")]);
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines[0], "1) 4420 C Groombridge Way (DRAWING CLOSED)");
        assert_eq!(lines[1], "   Price: $106,516");
        assert_eq!(lines[2], "   Location: Alexandria, VA 22309");
        assert_eq!(lines[3], "   Type: Condominium");
        assert_eq!(lines[4], "   Household: 1 to 4 people");
        assert_eq!(lines[5], "   Link: https://example.com/listing/123");
        assert_eq!(lines[6], "");
        assert!(lines[7].starts_with("2) 1 Oak Way"));
        // No trailing blank after the last listing.
        assert!(!body.ends_with('\n'));
    }

    #[test]
    fn blank_fields_are_omitted() {
        let mut l = listing("Sparse");
        l.status = None;
        l.price = String::new();
        l.location = String::new();
        l.details = Vec::new();
        l.url = String::new();
        assert_eq!(format_body(&[l]), "1) Sparse");
    }
}
