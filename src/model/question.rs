use chrono::{DateTime, Duration, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Maximum length of question and choice text.
pub const MAX_TEXT_LENGTH: usize = 200;

/// How long after publication a question still counts as recent.
pub fn recency_window() -> Duration {
    Duration::days(1)
}

/// Was something published at `pub_date` within the day leading up to `now`?
///
/// The window is `(now - 1 day, now]`: a date exactly one day old is no
/// longer recent, and a future date is never recent.
pub fn was_published_recently(pub_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - recency_window() < pub_date && pub_date <= now
}

/// A question that has not yet been inserted into the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_text: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub pub_date: DateTime<Utc>,
}

/// A question from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: Id,
    pub question_text: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub pub_date: DateTime<Utc>,
}

impl Question {
    pub fn from_new(id: Id, question: NewQuestion) -> Self {
        Self {
            id,
            question_text: question.question_text,
            pub_date: question.pub_date,
        }
    }

    /// Is this question visible to the public at `now`?
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.pub_date <= now
    }

    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        was_published_recently(self.pub_date, now)
    }
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use super::*;

    impl NewQuestion {
        /// A question published `offset` away from now: negative is past, positive is future.
        pub fn offset_from_now(text: &str, offset: Duration) -> Self {
            Self {
                question_text: text.to_string(),
                pub_date: Utc::now() + offset,
            }
        }
    }
}
