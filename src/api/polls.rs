use chrono::{DateTime, Utc};
use rocket::{
    form::Form, response::content::RawHtml, response::Redirect, serde::json::Json, Either,
    FromForm, Route, State,
};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::logging::RequestId;
use crate::model::{
    api::question::{ChoiceDescription, QuestionDescription, QuestionSummary},
    mongodb::Id,
    question::Question,
};
use crate::store::Store;
use crate::templates::{Templates, DETAIL, INDEX, RESULTS};
use crate::Config;

use super::PathId;

pub fn routes() -> Vec<Route> {
    routes![index, detail, results, vote, latest_json, detail_json]
}

/// Shown in place of the vote form when no valid choice was submitted.
pub const NO_CHOICE_MESSAGE: &str = "You didn't select a choice.";

#[derive(Serialize)]
struct IndexContext {
    latest_question_list: Vec<QuestionSummary>,
}

#[derive(Serialize)]
struct DetailContext<'a> {
    question: QuestionSummary,
    choices: Vec<ChoiceDescription>,
    error_message: Option<&'a str>,
}

#[derive(FromForm)]
struct VoteForm {
    choice: Option<Id>,
}

/// The most recently published questions, up to the configured count.
async fn latest_questions(store: &Store, config: &Config) -> Result<Vec<QuestionSummary>> {
    let now = Utc::now();
    let questions = store
        .published_questions(now, Some(config.latest_count()))
        .await?;
    Ok(questions
        .into_iter()
        .map(|question| QuestionSummary::new(question, now))
        .collect())
}

/// Look up a question that the public is allowed to see at `now`.
async fn published_question(store: &Store, id: PathId, now: DateTime<Utc>) -> Result<Question> {
    let id = id.map_err(|_| Error::not_found("Question"))?;
    store
        .published_question(id, now)
        .await?
        .ok_or_else(|| Error::not_found(format!("Question {id}")))
}

async fn describe_published(store: &Store, id: PathId) -> Result<QuestionDescription> {
    let now = Utc::now();
    let question = published_question(store, id, now).await?;
    let choices = store.choices(question.id).await?;
    Ok(QuestionDescription::new(question, choices, now))
}

fn render_detail(
    templates: &Templates,
    description: QuestionDescription,
    error_message: Option<&str>,
) -> Result<RawHtml<String>> {
    let context = DetailContext {
        question: description.question,
        choices: description.choices,
        error_message,
    };
    templates.render(DETAIL, &context)
}

#[get("/polls")]
async fn index(
    store: Store,
    config: &State<Config>,
    templates: &State<Templates>,
) -> Result<RawHtml<String>> {
    let context = IndexContext {
        latest_question_list: latest_questions(&store, config).await?,
    };
    templates.render(INDEX, &context)
}

#[get("/polls/<question_id>")]
async fn detail(
    question_id: PathId,
    store: Store,
    templates: &State<Templates>,
) -> Result<RawHtml<String>> {
    let description = describe_published(&store, question_id).await?;
    render_detail(templates, description, None)
}

#[get("/polls/<question_id>/results")]
async fn results(
    question_id: PathId,
    store: Store,
    templates: &State<Templates>,
) -> Result<RawHtml<String>> {
    let description = describe_published(&store, question_id).await?;
    templates.render(RESULTS, &description)
}

#[post("/polls/<question_id>/vote", data = "<form>")]
async fn vote(
    question_id: PathId,
    form: Form<VoteForm>,
    store: Store,
    templates: &State<Templates>,
    request_id: &RequestId,
) -> Result<Either<Redirect, RawHtml<String>>> {
    let now = Utc::now();
    let question = published_question(&store, question_id, now).await?;

    let counted = match form.choice {
        Some(choice_id) => store.vote(question.id, choice_id).await?,
        None => false,
    };
    if counted {
        debug!("req{request_id}: counted a vote on question {}", question.id);
        return Ok(Either::Left(Redirect::to(format!(
            "/polls/{}/results",
            question.id
        ))));
    }

    // Redisplay the voting form.
    let choices = store.choices(question.id).await?;
    let description = QuestionDescription::new(question, choices, now);
    render_detail(templates, description, Some(NO_CHOICE_MESSAGE)).map(Either::Right)
}

#[get("/api/polls")]
async fn latest_json(store: Store, config: &State<Config>) -> Result<Json<Vec<QuestionSummary>>> {
    Ok(Json(latest_questions(&store, config).await?))
}

#[get("/api/polls/<question_id>")]
async fn detail_json(question_id: PathId, store: Store) -> Result<Json<QuestionDescription>> {
    Ok(Json(describe_published(&store, question_id).await?))
}
