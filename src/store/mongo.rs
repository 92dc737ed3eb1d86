use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    options::FindOptions,
    Client, Database,
};
use rocket::{futures::TryStreamExt, http::Status};

use crate::error::{Error, Result};
use crate::model::{
    admin::{Admin, NewAdmin},
    choice::{Choice, ChoiceChanges, ChoiceDraft, NewChoice},
    listing::{DateRange, QuestionQuery},
    mongodb::{Coll, Id},
    question::{NewQuestion, Question},
};

use super::PollStore;

/// A [`PollStore`] backed by a MongoDB database.
///
/// Multi-document edits run inside a transaction, which requires the server
/// to be part of a replica set.
pub struct MongoStore {
    client: Client,
    questions: Coll<Question>,
    new_questions: Coll<NewQuestion>,
    choices: Coll<Choice>,
    new_choices: Coll<NewChoice>,
    admins: Coll<Admin>,
    new_admins: Coll<NewAdmin>,
}

impl MongoStore {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            questions: Coll::from_db(db),
            new_questions: Coll::from_db(db),
            choices: Coll::from_db(db),
            new_choices: Coll::from_db(db),
            admins: Coll::from_db(db),
            new_admins: Coll::from_db(db),
        }
    }
}

/// Newest-first ordering for every question listing.
fn newest_first() -> Document {
    doc! { "pub_date": -1 }
}

/// Filter for questions visible to the public at `now`.
fn published_filter(now: DateTime<Utc>) -> Document {
    doc! {
        "pub_date": { "$lte": BsonDateTime::from_chrono(now) },
    }
}

/// Filter for questions published within `range`.
fn range_filter(range: DateRange) -> Document {
    doc! {
        "pub_date": {
            "$gte": BsonDateTime::from_chrono(range.start),
            "$lt": BsonDateTime::from_chrono(range.end),
        },
    }
}

/// Filter selecting everything an admin listing query matches.
fn query_filter(query: &QuestionQuery) -> Document {
    let mut clauses: Vec<Document> = query
        .search_terms
        .iter()
        .map(|term| {
            doc! {
                "question_text": { "$regex": regex::escape(term), "$options": "i" },
            }
        })
        .collect();
    if let Some(range) = query.range {
        clauses.push(range_filter(range));
    }
    if clauses.is_empty() {
        doc! {}
    } else {
        doc! { "$and": clauses }
    }
}

fn inserted_id(id: Bson) -> Result<Id> {
    id.as_object_id().map(Id::from).ok_or_else(|| {
        Error::Status(
            Status::InternalServerError,
            format!("Database returned a non-ObjectId key: {id}"),
        )
    })
}

#[rocket::async_trait]
impl PollStore for MongoStore {
    fn backend(&self) -> &'static str {
        "MongoDB"
    }

    async fn published_questions(
        &self,
        now: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<Vec<Question>> {
        // MongoDB reads a zero limit as no limit at all.
        if limit == Some(0) {
            return Ok(Vec::new());
        }
        let options = FindOptions::builder()
            .sort(newest_first())
            .limit(limit.map(|limit| limit as i64))
            .build();
        let questions = self
            .questions
            .find(published_filter(now), options)
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn published_question(&self, id: Id, now: DateTime<Utc>) -> Result<Option<Question>> {
        let mut filter = published_filter(now);
        filter.insert("_id", id);
        Ok(self.questions.find_one(filter, None).await?)
    }

    async fn question(&self, id: Id) -> Result<Option<Question>> {
        Ok(self.questions.find_one(id.as_doc(), None).await?)
    }

    async fn find_questions(
        &self,
        query: &QuestionQuery,
        skip: u64,
        limit: u64,
    ) -> Result<(Vec<Question>, u64)> {
        let filter = query_filter(query);
        let total = self.questions.count_documents(filter.clone(), None).await?;
        if limit == 0 {
            return Ok((Vec::new(), total));
        }
        let options = FindOptions::builder()
            .sort(newest_first())
            .skip(skip)
            .limit(limit as i64)
            .build();
        let page = self
            .questions
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok((page, total))
    }

    async fn pub_dates(&self, range: Option<DateRange>) -> Result<Vec<DateTime<Utc>>> {
        let filter = range.map(range_filter).unwrap_or_default();
        let dates = self
            .questions
            .find(filter, None)
            .await?
            .map_ok(|question| question.pub_date)
            .try_collect()
            .await?;
        Ok(dates)
    }

    async fn create_question(
        &self,
        question: NewQuestion,
        choices: Vec<ChoiceDraft>,
    ) -> Result<Question> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let id = inserted_id(
            self.new_questions
                .insert_one_with_session(&question, None, &mut session)
                .await?
                .inserted_id,
        )?;

        let new_choices: Vec<NewChoice> = choices
            .into_iter()
            .map(|draft| draft.for_question(id))
            .collect();
        if !new_choices.is_empty() {
            self.new_choices
                .insert_many_with_session(&new_choices, None, &mut session)
                .await?;
        }

        session.commit_transaction().await?;
        Ok(Question::from_new(id, question))
    }

    async fn update_question(
        &self,
        id: Id,
        question: NewQuestion,
        changes: ChoiceChanges,
    ) -> Result<bool> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = self
            .new_questions
            .replace_one_with_session(id.as_doc(), &question, None, &mut session)
            .await?;
        if result.matched_count == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }

        if !changes.delete.is_empty() {
            let deleted: Vec<Bson> = changes.delete.iter().copied().map(Bson::from).collect();
            let filter = doc! {
                "_id": { "$in": deleted },
                "question_id": id,
            };
            self.choices
                .delete_many_with_session(filter, None, &mut session)
                .await?;
        }

        for (choice_id, draft) in changes.update {
            let filter = doc! {
                "_id": choice_id,
                "question_id": id,
            };
            let update = doc! {
                "$set": {
                    "choice_text": draft.choice_text,
                    "votes": i64::from(draft.votes),
                }
            };
            let result = self
                .choices
                .update_one_with_session(filter, update, None, &mut session)
                .await?;
            if result.matched_count == 0 {
                session.abort_transaction().await?;
                return Err(Error::bad_request(format!(
                    "Choice {choice_id} does not belong to question {id}"
                )));
            }
        }

        let new_choices: Vec<NewChoice> = changes
            .insert
            .into_iter()
            .map(|draft| draft.for_question(id))
            .collect();
        if !new_choices.is_empty() {
            self.new_choices
                .insert_many_with_session(&new_choices, None, &mut session)
                .await?;
        }

        session.commit_transaction().await?;
        Ok(true)
    }

    async fn delete_question(&self, id: Id) -> Result<bool> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = self
            .questions
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }

        let owned = doc! {
            "question_id": id,
        };
        self.choices
            .delete_many_with_session(owned, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(true)
    }

    async fn choices(&self, question_id: Id) -> Result<Vec<Choice>> {
        let filter = doc! {
            "question_id": question_id,
        };
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let choices = self
            .choices
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok(choices)
    }

    async fn vote(&self, question_id: Id, choice_id: Id) -> Result<bool> {
        let filter = doc! {
            "_id": choice_id,
            "question_id": question_id,
        };
        let update = doc! {
            "$inc": { "votes": 1 },
        };
        let result = self.choices.update_one(filter, update, None).await?;
        Ok(result.matched_count == 1)
    }

    async fn admin(&self, id: Id) -> Result<Option<Admin>> {
        Ok(self.admins.find_one(id.as_doc(), None).await?)
    }

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let with_username = doc! {
            "username": username,
        };
        Ok(self.admins.find_one(with_username, None).await?)
    }

    async fn admin_count(&self) -> Result<u64> {
        Ok(self.admins.count_documents(None, None).await?)
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin> {
        let id = inserted_id(self.new_admins.insert_one(&admin, None).await?.inserted_id)?;
        Ok(Admin::from_new(id, admin))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::model::mongodb::ensure_indexes_exist;
    use crate::store::scenarios::store_scenarios;

    use super::*;

    /// A store on a fresh database at the configured `db_uri`.
    async fn live_store() -> (MongoStore, Database) {
        let db_uri: String = rocket::Config::figment()
            .extract_inner("db_uri")
            .expect("`db_uri` not set");
        let client = Client::with_uri_str(&db_uri).await.unwrap();
        let db = client.database(&format!("polls_test_{}", Id::new()));
        ensure_indexes_exist(&db).await.unwrap();
        (MongoStore::new(client, &db), db)
    }

    store_scenarios!(
        #[ignore = "needs a MongoDB replica set at `db_uri`"]
        live_store(),
        |db: Database| async move { db.drop(None).await.unwrap() }
    );

    #[test]
    fn empty_query_matches_everything() {
        assert_eq!(query_filter(&QuestionQuery::default()), doc! {});
    }

    #[test]
    fn search_terms_are_escaped() {
        let query = QuestionQuery::default().with_search(Some("a+b"));
        let filter = query_filter(&query);
        let expected = doc! {
            "$and": [
                { "question_text": { "$regex": "a\\+b", "$options": "i" } },
            ]
        };
        assert_eq!(filter, expected);
    }

    #[test]
    fn published_filter_is_inclusive_of_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let filter = published_filter(now);
        let bound = filter.get_document("pub_date").unwrap();
        assert_eq!(
            bound.get_datetime("$lte").unwrap(),
            &BsonDateTime::from_chrono(now)
        );
    }
}
