use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use rocket::tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::{
    admin::{Admin, NewAdmin},
    choice::{Choice, ChoiceChanges, ChoiceDraft},
    listing::{DateRange, QuestionQuery},
    mongodb::Id,
    question::{NewQuestion, Question},
};

use super::PollStore;

#[derive(Default)]
struct Tables {
    questions: Vec<Question>,
    choices: Vec<Choice>,
    admins: Vec<Admin>,
}

impl Tables {
    /// Questions satisfying `keep`, newest first.
    fn questions_newest_first(&self, keep: impl Fn(&Question) -> bool) -> Vec<Question> {
        let mut questions: Vec<Question> = self
            .questions
            .iter()
            .filter(|question| keep(question))
            .cloned()
            .collect();
        questions.sort_by_key(|question| Reverse(question.pub_date));
        questions
    }
}

/// A [`PollStore`] kept entirely in process memory.
///
/// Used when no database is configured, and by the test suite. Every operation
/// takes the single lock once, so multi-step edits are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[rocket::async_trait]
impl PollStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "in-memory"
    }

    async fn published_questions(
        &self,
        now: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<Vec<Question>> {
        let tables = self.tables.read().await;
        let mut questions = tables.questions_newest_first(|q| q.is_published(now));
        if let Some(limit) = limit {
            questions.truncate(limit as usize);
        }
        Ok(questions)
    }

    async fn published_question(&self, id: Id, now: DateTime<Utc>) -> Result<Option<Question>> {
        let question = self.question(id).await?;
        Ok(question.filter(|q| q.is_published(now)))
    }

    async fn question(&self, id: Id) -> Result<Option<Question>> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn find_questions(
        &self,
        query: &QuestionQuery,
        skip: u64,
        limit: u64,
    ) -> Result<(Vec<Question>, u64)> {
        let tables = self.tables.read().await;
        let matching =
            tables.questions_newest_first(|q| query.matches(&q.question_text, q.pub_date));
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn pub_dates(&self, range: Option<DateRange>) -> Result<Vec<DateTime<Utc>>> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .iter()
            .map(|q| q.pub_date)
            .filter(|date| range.map_or(true, |range| range.contains(*date)))
            .collect())
    }

    async fn create_question(
        &self,
        question: NewQuestion,
        choices: Vec<ChoiceDraft>,
    ) -> Result<Question> {
        let mut tables = self.tables.write().await;
        let question = Question::from_new(Id::new(), question);
        tables.choices.extend(
            choices
                .into_iter()
                .map(|draft| Choice::from_new(Id::new(), draft.for_question(question.id))),
        );
        tables.questions.push(question.clone());
        Ok(question)
    }

    async fn update_question(
        &self,
        id: Id,
        question: NewQuestion,
        changes: ChoiceChanges,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(index) = tables.questions.iter().position(|q| q.id == id) else {
            return Ok(false);
        };

        // Validate every edit before applying any of them.
        for (choice_id, _) in &changes.update {
            if !tables
                .choices
                .iter()
                .any(|c| c.id == *choice_id && c.question_id == id)
            {
                return Err(Error::bad_request(format!(
                    "Choice {choice_id} does not belong to question {id}"
                )));
            }
        }

        tables.questions[index] = Question::from_new(id, question);
        tables
            .choices
            .retain(|c| !(c.question_id == id && changes.delete.contains(&c.id)));
        for (choice_id, draft) in changes.update {
            if let Some(choice) = tables.choices.iter_mut().find(|c| c.id == choice_id) {
                choice.choice_text = draft.choice_text;
                choice.votes = draft.votes;
            }
        }
        tables.choices.extend(
            changes
                .insert
                .into_iter()
                .map(|draft| Choice::from_new(Id::new(), draft.for_question(id))),
        );
        Ok(true)
    }

    async fn delete_question(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.questions.len();
        tables.questions.retain(|q| q.id != id);
        if tables.questions.len() == before {
            return Ok(false);
        }
        tables.choices.retain(|c| c.question_id != id);
        Ok(true)
    }

    async fn choices(&self, question_id: Id) -> Result<Vec<Choice>> {
        let tables = self.tables.read().await;
        Ok(tables
            .choices
            .iter()
            .filter(|c| c.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn vote(&self, question_id: Id, choice_id: Id) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .choices
            .iter_mut()
            .find(|c| c.id == choice_id && c.question_id == question_id)
        {
            Some(choice) => {
                choice.votes = choice.votes.saturating_add(1);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn admin(&self, id: Id) -> Result<Option<Admin>> {
        let tables = self.tables.read().await;
        Ok(tables.admins.iter().find(|a| a.id == id).cloned())
    }

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let tables = self.tables.read().await;
        Ok(tables
            .admins
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn admin_count(&self) -> Result<u64> {
        Ok(self.tables.read().await.admins.len() as u64)
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin> {
        let mut tables = self.tables.write().await;
        if tables.admins.iter().any(|a| a.username == admin.username) {
            return Err(Error::bad_request(format!(
                "Admin username already in use: {}",
                admin.username
            )));
        }
        let admin = Admin::from_new(Id::new(), admin);
        tables.admins.push(admin.clone());
        Ok(admin)
    }
}
