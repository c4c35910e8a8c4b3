//! # Users and Transactions
//!
//! Platform users (keyed by email) and their purchase transactions, plus the
//! spending summary shown on the user overview.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::SurveyError;

/// A platform user. The email doubles as the document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub full_name: String,
    pub email: String,
    /// Subscription level, e.g. "Basic".
    pub level: String,
    #[serde(default)]
    pub agency: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notification_pref: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.full_name.trim().is_empty() {
            return Err(SurveyError::MissingField("fullName"));
        }
        if self.email.trim().is_empty() {
            return Err(SurveyError::MissingField("email"));
        }
        if self.level.trim().is_empty() {
            return Err(SurveyError::MissingField("level"));
        }
        Ok(())
    }
}

/// Settlement status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Succeeded,
    Pending,
    Failed,
}

/// A purchase made by a user. Written by the billing side, read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_name: String,
    pub amount: u64,
    pub status: TransactionStatus,
    pub date: DateTime<Utc>,
}

/// One row of the user overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub full_name: String,
    pub email: String,
    pub level: String,
    pub agency: String,
    pub industry: String,
    pub phone: String,
    pub notification_pref: bool,
    pub total_transactions: usize,
    pub total_spending: u64,
}

/// Summarize each user's succeeded transactions, biggest spenders first.
///
/// Users with equal spending keep their input order.
pub fn summarize(users: &[User], transactions: &[Transaction]) -> Vec<UserSummary> {
    let mut rows: Vec<UserSummary> = users
        .iter()
        .map(|user| {
            let settled = transactions.iter().filter(|t| {
                t.customer_email == user.email && t.status == TransactionStatus::Succeeded
            });
            let (count, spending) = settled.fold((0usize, 0u64), |(n, sum), t| {
                (n + 1, sum.saturating_add(t.amount))
            });
            UserSummary {
                full_name: user.full_name.clone(),
                email: user.email.clone(),
                level: user.level.clone(),
                agency: user.agency.clone(),
                industry: user.industry.clone(),
                phone: user.phone.clone(),
                notification_pref: user.notification_pref,
                total_transactions: count,
                total_spending: spending,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.total_spending.cmp(&a.total_spending));
    rows
}

/// A user's transactions, newest first.
pub fn transactions_for<'a>(email: &str, transactions: &'a [Transaction]) -> Vec<&'a Transaction> {
    let mut own: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.customer_email == email)
        .collect();
    own.sort_by(|a, b| b.date.cmp(&a.date));
    own
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(name: &str, email: &str) -> User {
        User {
            full_name: name.into(),
            email: email.into(),
            level: "Basic".into(),
            agency: String::new(),
            industry: String::new(),
            phone: String::new(),
            notification_pref: false,
            created_at: Utc::now(),
        }
    }

    fn tx(id: &str, email: &str, amount: u64, status: TransactionStatus, day: u32) -> Transaction {
        Transaction {
            id: id.into(),
            customer_email: email.into(),
            customer_name: String::new(),
            amount,
            status,
            date: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn summary_counts_only_succeeded_transactions() {
        let users = [user("Ana", "ana@x.io")];
        let txs = [
            tx("1", "ana@x.io", 100, TransactionStatus::Succeeded, 1),
            tx("2", "ana@x.io", 999, TransactionStatus::Failed, 2),
            tx("3", "ana@x.io", 50, TransactionStatus::Succeeded, 3),
            tx("4", "bob@x.io", 70, TransactionStatus::Succeeded, 4),
        ];
        let rows = summarize(&users, &txs);
        assert_eq!(rows[0].total_transactions, 2);
        assert_eq!(rows[0].total_spending, 150);
    }

    #[test]
    fn summary_sorted_by_spending_with_stable_ties() {
        let users = [
            user("Ana", "ana@x.io"),
            user("Bob", "bob@x.io"),
            user("Cy", "cy@x.io"),
        ];
        let txs = [
            tx("1", "bob@x.io", 10, TransactionStatus::Succeeded, 1),
            tx("2", "cy@x.io", 10, TransactionStatus::Succeeded, 1),
        ];
        let order: Vec<_> = summarize(&users, &txs)
            .into_iter()
            .map(|r| r.full_name)
            .collect();
        assert_eq!(order, ["Bob", "Cy", "Ana"]);
    }

    #[test]
    fn transactions_newest_first() {
        let txs = [
            tx("old", "ana@x.io", 1, TransactionStatus::Succeeded, 1),
            tx("new", "ana@x.io", 1, TransactionStatus::Pending, 9),
            tx("other", "bob@x.io", 1, TransactionStatus::Succeeded, 5),
        ];
        let ids: Vec<_> = transactions_for("ana@x.io", &txs)
            .into_iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["new", "old"]);
    }

    #[test]
    fn user_requires_name_email_and_level() {
        let mut u = user("Ana", "ana@x.io");
        assert!(u.validate().is_ok());
        u.level = " ".into();
        assert_eq!(u.validate(), Err(SurveyError::MissingField("level")));
    }
}
