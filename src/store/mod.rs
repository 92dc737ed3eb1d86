//! Persistence behind a single trait, so routes never care whether polls live
//! in MongoDB or in process memory.

use std::{ops::Deref, sync::Arc};

use chrono::{DateTime, Utc};
use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};

use crate::error::Result;
use crate::model::{
    admin::{Admin, NewAdmin},
    choice::{Choice, ChoiceChanges, ChoiceDraft},
    listing::{DateRange, QuestionQuery},
    mongodb::Id,
    question::{NewQuestion, Question},
};

mod memory;
mod mongo;
#[cfg(test)]
mod scenarios;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Everything the application needs from its storage backend.
#[rocket::async_trait]
pub trait PollStore: Send + Sync {
    /// Questions published at or before `now`, newest first, at most `limit` of them.
    async fn published_questions(
        &self,
        now: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<Vec<Question>>;

    /// A single question, but only if it is published at or before `now`.
    async fn published_question(&self, id: Id, now: DateTime<Utc>) -> Result<Option<Question>>;

    /// A single question regardless of publication date.
    async fn question(&self, id: Id) -> Result<Option<Question>>;

    /// A page of questions matching `query`, newest first, plus the total match count.
    async fn find_questions(
        &self,
        query: &QuestionQuery,
        skip: u64,
        limit: u64,
    ) -> Result<(Vec<Question>, u64)>;

    /// Publication dates of every question within `range` (or all of them).
    async fn pub_dates(&self, range: Option<DateRange>) -> Result<Vec<DateTime<Utc>>>;

    /// Insert a question together with its initial choices.
    async fn create_question(
        &self,
        question: NewQuestion,
        choices: Vec<ChoiceDraft>,
    ) -> Result<Question>;

    /// Replace a question's fields and apply inline choice edits.
    /// Returns `false` if the question does not exist.
    async fn update_question(
        &self,
        id: Id,
        question: NewQuestion,
        changes: ChoiceChanges,
    ) -> Result<bool>;

    /// Delete a question and every choice it owns.
    /// Returns `false` if the question does not exist.
    async fn delete_question(&self, id: Id) -> Result<bool>;

    /// The choices of a question, in creation order.
    async fn choices(&self, question_id: Id) -> Result<Vec<Choice>>;

    /// Atomically add one vote to a choice of the given question.
    /// Returns `false` if no such choice belongs to that question.
    async fn vote(&self, question_id: Id, choice_id: Id) -> Result<bool>;

    async fn admin(&self, id: Id) -> Result<Option<Admin>>;

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>>;

    async fn admin_count(&self) -> Result<u64>;

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin>;

    /// Short name of the storage engine, for logs.
    fn backend(&self) -> &'static str;
}

/// A shared handle on whichever [`PollStore`] the server was launched with.
/// Lives in managed state and doubles as a request guard.
#[derive(Clone)]
pub struct Store(Arc<dyn PollStore>);

impl Store {
    pub fn new(store: impl PollStore + 'static) -> Self {
        Self(Arc::new(store))
    }

    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl Deref for Store {
    type Target = dyn PollStore;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Store {
    type Error = ();

    /// Get the store from the managed state.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.rocket().state::<Store>() {
            Some(store) => request::Outcome::Success(store.clone()),
            None => {
                error!("No store in managed state");
                request::Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}
