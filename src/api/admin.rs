use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        admin::QuestionAdmin,
        pagination::{Paginated, PaginationRequest},
        question::{QuestionDescription, QuestionSpec, QuestionSummary},
    },
    auth::AuthToken,
    listing::{DateDrillDown, DateHierarchy, PubDateFilter, QuestionQuery},
    mongodb::Id,
};
use crate::store::Store;
use crate::Config;

use super::PathId;

pub fn routes() -> Vec<Route> {
    routes![
        question_admin,
        list_questions,
        question_dates,
        create_question,
        get_question,
        update_question,
        delete_question,
    ]
}

fn question_id(id: PathId) -> Result<Id> {
    id.map_err(|_| Error::not_found("Question"))
}

async fn describe(store: &Store, id: Id) -> Result<QuestionDescription> {
    let question = store
        .question(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Question {id}")))?;
    let choices = store.choices(id).await?;
    Ok(QuestionDescription::new(question, choices, Utc::now()))
}

#[get("/admin/questions/meta")]
async fn question_admin(_token: AuthToken, config: &State<Config>) -> Json<QuestionAdmin> {
    Json(QuestionAdmin::new(config.max_choices()))
}

#[allow(clippy::too_many_arguments)]
#[get("/admin/questions?<q>&<pub_date>&<year>&<month>&<day>&<pagination..>")]
async fn list_questions(
    _token: AuthToken,
    q: Option<&str>,
    pub_date: Option<PubDateFilter>,
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    pagination: PaginationRequest,
    store: Store,
) -> Result<Json<Paginated<QuestionSummary>>> {
    let now = Utc::now();
    let hierarchy = DateHierarchy { year, month, day };
    let query = QuestionQuery::default()
        .with_search(q)
        .with_range(pub_date.map(|filter| filter.range(now)))
        .with_range(hierarchy.range().map_err(Error::bad_request)?);

    let (questions, total) = store
        .find_questions(&query, pagination.skip(), pagination.page_size())
        .await?;
    let summaries = questions
        .into_iter()
        .map(|question| QuestionSummary::new(question, now))
        .collect();

    Ok(Json(pagination.to_paginated(total, summaries)))
}

#[get("/admin/questions/dates?<year>&<month>")]
async fn question_dates(
    _token: AuthToken,
    year: Option<i32>,
    month: Option<u32>,
    store: Store,
) -> Result<Json<DateDrillDown>> {
    let hierarchy = DateHierarchy {
        year,
        month,
        day: None,
    };
    let range = hierarchy.range().map_err(Error::bad_request)?;
    let dates = store.pub_dates(range).await?;
    Ok(Json(hierarchy.drill_down(dates)))
}

#[post("/admin/questions", data = "<spec>", format = "json")]
async fn create_question(
    _token: AuthToken,
    spec: Json<QuestionSpec>,
    store: Store,
    config: &State<Config>,
) -> Result<Json<QuestionDescription>> {
    let (question, choices) = spec.0.into_new(config.max_choices())?;
    let question = store.create_question(question, choices).await?;
    info!("Created question {}", question.id);
    Ok(Json(describe(&store, question.id).await?))
}

#[get("/admin/questions/<question_id>")]
async fn get_question(
    _token: AuthToken,
    question_id: PathId,
    store: Store,
) -> Result<Json<QuestionDescription>> {
    Ok(Json(describe(&store, self::question_id(question_id)?).await?))
}

#[put("/admin/questions/<question_id>", data = "<spec>", format = "json")]
async fn update_question(
    _token: AuthToken,
    question_id: PathId,
    spec: Json<QuestionSpec>,
    store: Store,
    config: &State<Config>,
) -> Result<Json<QuestionDescription>> {
    let id = self::question_id(question_id)?;
    let existing = store.choices(id).await?;
    let (question, changes) = spec.0.into_changes(&existing, config.max_choices())?;

    if !store.update_question(id, question, changes).await? {
        return Err(Error::not_found(format!("Question {id}")));
    }
    info!("Updated question {id}");
    Ok(Json(describe(&store, id).await?))
}

#[delete("/admin/questions/<question_id>")]
async fn delete_question(_token: AuthToken, question_id: PathId, store: Store) -> Result<()> {
    let id = self::question_id(question_id)?;
    if !store.delete_question(id).await? {
        return Err(Error::not_found(format!("Question {id}")));
    }
    info!("Deleted question {id} and its choices");
    Ok(())
}
