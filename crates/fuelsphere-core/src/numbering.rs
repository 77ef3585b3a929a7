//! Human-readable document numbers.
//!
//! Orders, deliveries and fueling operations are numbered
//! `<PREFIX>-<YYYYMMDD>-<NNNN>` from a per-kind, per-day counter kept in the
//! store. Inventory transactions are numbered `IT-<epoch-millis>`, where the
//! millisecond value is forced to be strictly increasing across posts.
//!
//! Counters advance inside the caller's transaction, so a number is only
//! consumed when the owning record commits.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::storage::StoreTx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Order,
    Delivery,
    Operation,
    Inventory,
}

impl DocumentKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Order => "FO",
            Self::Delivery => "DL",
            Self::Operation => "OP",
            Self::Inventory => "IT",
        }
    }

    /// Counter scope and the lowest value the counter may return at `at`.
    pub fn sequence_scope(self, at: DateTime<Utc>) -> (String, i64) {
        match self {
            Self::Inventory => (self.prefix().to_string(), at.timestamp_millis()),
            _ => (format!("{}-{}", self.prefix(), at.format("%Y%m%d")), 1),
        }
    }
}

/// Renders a document number from an already drawn sequence value.
pub fn format_document_number(kind: DocumentKind, at: DateTime<Utc>, sequence: i64) -> String {
    match kind {
        DocumentKind::Inventory => format!("{}-{sequence}", kind.prefix()),
        _ => format!("{}-{}-{sequence:04}", kind.prefix(), at.format("%Y%m%d")),
    }
}

/// Draws the next number of `kind` within `tx`.
pub async fn next_document_number<T: StoreTx>(
    tx: &mut T,
    kind: DocumentKind,
    at: DateTime<Utc>,
) -> Result<String, StoreError> {
    let (scope, floor) = kind.sequence_scope(at);
    let sequence = tx.next_sequence(&scope, floor).await?;
    Ok(format_document_number(kind, at, sequence))
}
