use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    choice::{Choice, ChoiceChanges, ChoiceDraft},
    mongodb::{hex, Id},
    question::{NewQuestion, Question, MAX_TEXT_LENGTH},
};

/// A question as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSummary {
    #[serde(with = "hex")]
    pub id: Id,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub was_published_recently: bool,
}

impl QuestionSummary {
    pub fn new(question: Question, now: DateTime<Utc>) -> Self {
        Self {
            was_published_recently: question.was_published_recently(now),
            id: question.id,
            question_text: question.question_text,
            pub_date: question.pub_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceDescription {
    #[serde(with = "hex")]
    pub id: Id,
    pub choice_text: String,
    pub votes: u32,
}

impl From<Choice> for ChoiceDescription {
    fn from(choice: Choice) -> Self {
        Self {
            id: choice.id,
            choice_text: choice.choice_text,
            votes: choice.votes,
        }
    }
}

/// A question together with all of its choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionDescription {
    pub question: QuestionSummary,
    pub choices: Vec<ChoiceDescription>,
}

impl QuestionDescription {
    pub fn new(question: Question, choices: Vec<Choice>, now: DateTime<Utc>) -> Self {
        Self {
            question: QuestionSummary::new(question, now),
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

/// One inline choice row submitted with a question.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChoiceSpec {
    /// Present when editing an existing choice.
    #[serde(default, with = "hex::option")]
    pub id: Option<Id>,
    #[serde(default)]
    pub choice_text: String,
    #[serde(default)]
    pub votes: u32,
    /// Remove the existing choice with this `id`.
    #[serde(default)]
    pub delete: bool,
}

impl ChoiceSpec {
    /// An untouched blank inline row.
    fn is_blank(&self) -> bool {
        self.id.is_none() && self.choice_text.trim().is_empty()
    }

    fn draft(&self) -> Result<ChoiceDraft> {
        Ok(ChoiceDraft {
            choice_text: validate_text("choice_text", &self.choice_text)?,
            votes: self.votes,
        })
    }
}

/// A question submitted through the admin, with its inline choices.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuestionSpec {
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    #[serde(default)]
    pub choices: Vec<ChoiceSpec>,
}

impl QuestionSpec {
    fn question(&self) -> Result<NewQuestion> {
        Ok(NewQuestion {
            question_text: validate_text("question_text", &self.question_text)?,
            pub_date: self.pub_date,
        })
    }

    /// Validate a brand new question. Blank inline rows are skipped.
    pub fn into_new(self, max_choices: usize) -> Result<(NewQuestion, Vec<ChoiceDraft>)> {
        let question = self.question()?;
        let mut drafts = Vec::new();
        for spec in self.choices.iter().filter(|spec| !spec.is_blank()) {
            if let Some(id) = spec.id {
                return Err(Error::bad_request(format!(
                    "Choice {id} cannot be edited on a question that does not exist yet"
                )));
            }
            if !spec.delete {
                drafts.push(spec.draft()?);
            }
        }
        check_choice_count(drafts.len(), max_choices)?;
        Ok((question, drafts))
    }

    /// Validate an edit of a question that currently owns `existing`.
    pub fn into_changes(
        self,
        existing: &[Choice],
        max_choices: usize,
    ) -> Result<(NewQuestion, ChoiceChanges)> {
        let question = self.question()?;
        let owned: HashSet<Id> = existing.iter().map(|choice| choice.id).collect();
        let mut seen = HashSet::new();
        let mut changes = ChoiceChanges::default();

        for spec in self.choices.iter().filter(|spec| !spec.is_blank()) {
            if let Some(id) = spec.id {
                if !owned.contains(&id) {
                    return Err(Error::bad_request(format!(
                        "Choice {id} does not belong to this question"
                    )));
                }
                if !seen.insert(id) {
                    return Err(Error::bad_request(format!("Choice {id} edited twice")));
                }
            }
            match spec.id {
                Some(id) if spec.delete => changes.delete.push(id),
                Some(id) => changes.update.push((id, spec.draft()?)),
                None if spec.delete => {}
                None => changes.insert.push(spec.draft()?),
            }
        }

        let remaining = existing.len() - changes.delete.len() + changes.insert.len();
        check_choice_count(remaining, max_choices)?;
        Ok((question, changes))
    }
}

fn validate_text(field: &str, text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::bad_request(format!("`{field}` must not be empty")));
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(Error::bad_request(format!(
            "`{field}` must be at most {MAX_TEXT_LENGTH} characters"
        )));
    }
    Ok(text.to_string())
}

fn check_choice_count(count: usize, max_choices: usize) -> Result<()> {
    if count > max_choices {
        return Err(Error::bad_request(format!(
            "A question may have at most {max_choices} choices, got {count}"
        )));
    }
    Ok(())
}
