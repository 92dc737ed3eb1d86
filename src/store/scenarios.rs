//! Behaviour every [`PollStore`] backend must share, run against each of them.

use chrono::{Duration, TimeZone, Utc};
use rocket::http::Status;

use crate::model::{
    admin::NewAdmin,
    choice::{ChoiceChanges, ChoiceDraft},
    listing::{DateHierarchy, QuestionQuery},
    question::{NewQuestion, Question},
};

use super::PollStore;

async fn seed(
    store: &dyn PollStore,
    text: &str,
    offset: Duration,
    choices: &[&str],
) -> Question {
    store
        .create_question(
            NewQuestion::offset_from_now(text, offset),
            choices.iter().map(|text| ChoiceDraft::example(text)).collect(),
        )
        .await
        .unwrap()
}

fn texts(questions: &[Question]) -> Vec<&str> {
    questions.iter().map(|q| q.question_text.as_str()).collect()
}

pub async fn published_questions_are_newest_first_and_limited(store: &dyn PollStore) {
    seed(store, "old", -Duration::days(30), &[]).await;
    seed(store, "new", -Duration::hours(1), &[]).await;
    seed(store, "middle", -Duration::days(3), &[]).await;
    seed(store, "future", Duration::days(1), &[]).await;

    let now = Utc::now();
    let all = store.published_questions(now, None).await.unwrap();
    assert_eq!(texts(&all), vec!["new", "middle", "old"]);

    let limited = store.published_questions(now, Some(2)).await.unwrap();
    assert_eq!(texts(&limited), vec!["new", "middle"]);

    let none = store.published_questions(now, Some(0)).await.unwrap();
    assert!(none.is_empty());
}

pub async fn future_question_is_hidden_from_lookup(store: &dyn PollStore) {
    let future = seed(store, "future", Duration::days(5), &[]).await;
    let past = seed(store, "past", -Duration::seconds(5), &[]).await;

    let now = Utc::now();
    assert!(store.published_question(future.id, now).await.unwrap().is_none());
    assert!(store.question(future.id).await.unwrap().is_some());
    assert!(store.published_question(past.id, now).await.unwrap().is_some());
}

pub async fn delete_cascades_to_choices(store: &dyn PollStore) {
    let doomed = seed(store, "doomed", -Duration::days(1), &["a", "b"]).await;
    let kept = seed(store, "kept", -Duration::days(1), &["c"]).await;

    assert!(store.delete_question(doomed.id).await.unwrap());
    assert!(store.question(doomed.id).await.unwrap().is_none());
    assert!(store.choices(doomed.id).await.unwrap().is_empty());
    assert_eq!(store.choices(kept.id).await.unwrap().len(), 1);
    assert!(!store.delete_question(doomed.id).await.unwrap());
}

pub async fn vote_only_counts_for_own_choices(store: &dyn PollStore) {
    let first = seed(store, "first", -Duration::days(1), &["yes", "no"]).await;
    let second = seed(store, "second", -Duration::days(1), &["maybe"]).await;
    let yes = store.choices(first.id).await.unwrap()[0].id;
    let maybe = store.choices(second.id).await.unwrap()[0].id;

    assert!(store.vote(first.id, yes).await.unwrap());
    assert!(store.vote(first.id, yes).await.unwrap());
    assert!(!store.vote(first.id, maybe).await.unwrap());

    let choices = store.choices(first.id).await.unwrap();
    assert_eq!(choices[0].votes, 2);
    assert_eq!(choices[1].votes, 0);
    assert_eq!(store.choices(second.id).await.unwrap()[0].votes, 0);
}

pub async fn update_applies_inline_changes(store: &dyn PollStore) {
    let question = seed(store, "before", -Duration::days(1), &["keep", "drop"]).await;
    let choices = store.choices(question.id).await.unwrap();

    let changes = ChoiceChanges {
        insert: vec![ChoiceDraft::example("added")],
        update: vec![(
            choices[0].id,
            ChoiceDraft {
                choice_text: "kept".to_string(),
                votes: 7,
            },
        )],
        delete: vec![choices[1].id],
    };
    let updated = store
        .update_question(
            question.id,
            NewQuestion::offset_from_now("after", -Duration::days(2)),
            changes,
        )
        .await
        .unwrap();
    assert!(updated);

    let question = store.question(question.id).await.unwrap().unwrap();
    assert_eq!(question.question_text, "after");
    let rows: Vec<_> = store
        .choices(question.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.choice_text, c.votes))
        .collect();
    assert_eq!(rows, vec![("kept".to_string(), 7), ("added".to_string(), 0)]);

    let missing = store
        .update_question(
            crate::model::mongodb::Id::new(),
            NewQuestion::offset_from_now("ghost", Duration::zero()),
            ChoiceChanges::default(),
        )
        .await
        .unwrap();
    assert!(!missing);
}

pub async fn update_rejects_foreign_choice(store: &dyn PollStore) {
    let mine = seed(store, "mine", -Duration::days(1), &["own"]).await;
    let theirs = seed(store, "theirs", -Duration::days(1), &["other"]).await;
    let foreign = store.choices(theirs.id).await.unwrap()[0].id;

    let changes = ChoiceChanges {
        insert: vec![ChoiceDraft::example("sneaked in")],
        update: vec![(foreign, ChoiceDraft::example("hijacked"))],
        delete: Vec::new(),
    };
    let err = store
        .update_question(
            mine.id,
            NewQuestion::offset_from_now("renamed", -Duration::days(1)),
            changes,
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::BadRequest);

    // Nothing was applied.
    let unchanged = store.question(mine.id).await.unwrap().unwrap();
    assert_eq!(unchanged.question_text, "mine");
    let own: Vec<_> = store
        .choices(mine.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.choice_text)
        .collect();
    assert_eq!(own, vec!["own"]);
    assert_eq!(store.choices(theirs.id).await.unwrap()[0].choice_text, "other");
}

pub async fn find_questions_searches_and_paginates(store: &dyn PollStore) {
    seed(store, "What is up?", -Duration::hours(1), &[]).await;
    seed(store, "WHAT is new", -Duration::hours(2), &[]).await;
    seed(store, "Is a+b what you want", -Duration::hours(3), &[]).await;
    seed(store, "Who goes there", -Duration::hours(4), &[]).await;
    seed(store, "What comes next", Duration::days(3), &[]).await;

    let everything = QuestionQuery::default();
    let (page, total) = store.find_questions(&everything, 0, 10).await.unwrap();
    assert_eq!(total, 5);
    assert_eq!(page[0].question_text, "What comes next");

    let what = QuestionQuery::default().with_search(Some("what"));
    let (page, total) = store.find_questions(&what, 1, 2).await.unwrap();
    assert_eq!(total, 4);
    assert_eq!(texts(&page), vec!["What is up?", "WHAT is new"]);

    // Regex metacharacters match literally.
    let literal = QuestionQuery::default().with_search(Some("A+B what"));
    let (page, total) = store.find_questions(&literal, 0, 10).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(texts(&page), vec!["Is a+b what you want"]);

    let (page, total) = store.find_questions(&what, 0, 0).await.unwrap();
    assert_eq!(total, 4);
    assert!(page.is_empty());
}

pub async fn date_ranges_select_questions(store: &dyn PollStore) {
    for (y, m, d) in [(2021, 6, 1), (2022, 3, 14), (2022, 3, 2), (2022, 11, 5)] {
        let pub_date = Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap();
        store
            .create_question(
                NewQuestion {
                    question_text: format!("{y}-{m}-{d}"),
                    pub_date,
                },
                Vec::new(),
            )
            .await
            .unwrap();
    }

    let march = DateHierarchy {
        year: Some(2022),
        month: Some(3),
        day: None,
    }
    .range()
    .unwrap();

    let dates = store.pub_dates(march).await.unwrap();
    assert_eq!(dates.len(), 2);

    let query = QuestionQuery::default().with_range(march);
    let (page, total) = store.find_questions(&query, 0, 10).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(texts(&page), vec!["2022-3-14", "2022-3-2"]);

    assert_eq!(store.pub_dates(None).await.unwrap().len(), 4);
}

pub async fn duplicate_admin_usernames_are_rejected(store: &dyn PollStore) {
    let admin = || NewAdmin {
        username: "root".to_string(),
        password_hash: "hash".to_string(),
    };
    let inserted = store.insert_admin(admin()).await.unwrap();
    assert!(store.insert_admin(admin()).await.is_err());
    assert_eq!(store.admin_count().await.unwrap(), 1);

    let found = store.admin_by_username("root").await.unwrap().unwrap();
    assert_eq!(found.id, inserted.id);
    assert!(store.admin(inserted.id).await.unwrap().is_some());
    assert!(store.admin_by_username("nobody").await.unwrap().is_none());
}

/// Generate one test per scenario. `$fixture` must evaluate to a future of
/// `(store, resource)`; `$cleanup` receives the resource once a scenario passes.
macro_rules! store_scenarios {
    (@tests $attrs:tt $fixture:expr, $cleanup:expr; $($scenario:ident),* $(,)?) => {
        $(
            store_scenarios!(@test $attrs $fixture, $cleanup; $scenario);
        )*
    };
    (@test [$($attr:tt)*] $fixture:expr, $cleanup:expr; $scenario:ident) => {
        #[rocket::async_test]
        $($attr)*
        async fn $scenario() {
            let (store, resource) = $fixture.await;
            crate::store::scenarios::$scenario(&store).await;
            ($cleanup)(resource).await;
        }
    };
    (@attrs [$($attrs:tt)*] #[$attr:meta] $($rest:tt)*) => {
        store_scenarios!(@attrs [$($attrs)* #[$attr]] $($rest)*);
    };
    (@attrs [$($attrs:tt)*] $fixture:expr, $cleanup:expr) => {
        store_scenarios!(@tests [$($attrs)*] $fixture, $cleanup;
            published_questions_are_newest_first_and_limited,
            future_question_is_hidden_from_lookup,
            delete_cascades_to_choices,
            vote_only_counts_for_own_choices,
            update_applies_inline_changes,
            update_rejects_foreign_choice,
            find_questions_searches_and_paginates,
            date_ranges_select_questions,
            duplicate_admin_usernames_are_rejected,
        );
    };
    ($($input:tt)*) => {
        store_scenarios!(@attrs [] $($input)*);
    };
}

pub(crate) use store_scenarios;
