use crate::error::ValidationError;
use crate::model::amount::serialize_as_number;
use crate::model::{Amount, Category};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The identifier the remote store assigns to a transaction. It is opaque to the client; the
/// server may send it as a number or a string.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u64> for TransactionId {
    fn from(value: u64) -> Self {
        Self::new(value.to_string())
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = TransactionId;

            fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str("a transaction id as a string or an integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<TransactionId, E> {
                Ok(TransactionId::new(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<TransactionId, E> {
                Ok(TransactionId::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<TransactionId, E> {
                Ok(TransactionId::new(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// The identifier of a signed-in user as supplied by the identity provider.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A transaction as confirmed by the remote store.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    pub(crate) id: TransactionId,
    pub(crate) user_id: UserId,
    pub(crate) title: String,
    pub(crate) amount: Amount,
    pub(crate) category: Category,
    #[serde(deserialize_with = "deserialize_created_at")]
    pub(crate) created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        id: impl Into<TransactionId>,
        user_id: UserId,
        title: impl Into<String>,
        amount: Amount,
        category: Category,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id,
            title: title.into(),
            amount,
            category,
            created_at,
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn kind(&self) -> TransactionType {
        if self.amount.is_expense() {
            TransactionType::Expense
        } else {
            TransactionType::Income
        }
    }

    /// The creation date as shown in listings, e.g. `Jul 4, 2025`.
    pub fn display_date(&self) -> String {
        self.created_at.format("%b %-d, %Y").to_string()
    }
}

/// Whether a new transaction is money going out or coming in. This only exists while a
/// transaction is being created; once stored, the sign of the amount carries this information.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    Expense,
    Income,
}

serde_plain::derive_display_from_serialize!(TransactionType);
serde_plain::derive_fromstr_from_deserialize!(TransactionType);

impl TransactionType {
    /// Applies this type's sign to an unsigned magnitude.
    pub fn apply_sign(&self, magnitude: Amount) -> Amount {
        match self {
            TransactionType::Expense => -magnitude.abs(),
            TransactionType::Income => magnitude.abs(),
        }
    }
}

/// The user's input for a transaction that has not been sent yet. The amount is kept as entered
/// (unsigned text) and only interpreted by [`TransactionDraft::validate`], so a failed attempt
/// leaves the input untouched for a retry.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct TransactionDraft {
    title: String,
    amount: String,
    kind: TransactionType,
    category: Option<Category>,
}

impl TransactionDraft {
    pub fn new(
        title: impl Into<String>,
        amount: impl Into<String>,
        kind: TransactionType,
        category: Option<Category>,
    ) -> Self {
        Self {
            title: title.into(),
            amount: amount.into(),
            kind,
            category,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    /// Checks the draft and turns it into a request for `user_id` with the sign applied.
    ///
    /// # Errors
    /// - `EmptyTitle` if the trimmed title is empty
    /// - `MissingCategory` if no category is selected
    /// - `InvalidAmount` if the amount is not a number
    /// - `TooManyDecimalPlaces` if the amount has more than two fractional digits
    /// - `NonPositiveAmount` unless the amount is strictly greater than zero
    pub fn validate(&self, user_id: &UserId) -> Result<NewTransaction, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let category = match &self.category {
            Some(c) if !c.label().trim().is_empty() => c.clone(),
            _ => return Err(ValidationError::MissingCategory),
        };
        let magnitude = Amount::from_str(&self.amount)
            .map_err(|_| ValidationError::InvalidAmount(self.amount.clone()))?;
        if magnitude.value().scale() > 2 {
            return Err(ValidationError::TooManyDecimalPlaces(self.amount.clone()));
        }
        if !magnitude.is_income() {
            return Err(ValidationError::NonPositiveAmount);
        }
        Ok(NewTransaction {
            user_id: user_id.clone(),
            title: title.to_string(),
            amount: self.kind.apply_sign(magnitude),
            category,
        })
    }
}

/// A validated request to create a transaction. The amount is already signed.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct NewTransaction {
    pub(crate) user_id: UserId,
    pub(crate) title: String,
    #[serde(serialize_with = "serialize_as_number")]
    pub(crate) amount: Amount,
    pub(crate) category: Category,
}

impl NewTransaction {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn category(&self) -> &Category {
        &self.category
    }
}

/// Accepts RFC 3339 timestamps, naive timestamps (taken as UTC) and bare dates (midnight UTC).
fn deserialize_created_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).ok_or_else(|| de::Error::custom(format!("invalid created_at '{s}'")))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
