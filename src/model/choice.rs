use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A choice that has not yet been inserted into the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChoice {
    pub question_id: Id,
    pub choice_text: String,
    pub votes: u32,
}

/// A choice from the database, with its unique ID.
///
/// Owned by exactly one question, and deleted along with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(rename = "_id")]
    pub id: Id,
    pub question_id: Id,
    pub choice_text: String,
    pub votes: u32,
}

impl Choice {
    pub fn from_new(id: Id, choice: NewChoice) -> Self {
        Self {
            id,
            question_id: choice.question_id,
            choice_text: choice.choice_text,
            votes: choice.votes,
        }
    }
}

/// The editable content of a choice, independent of its owning question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceDraft {
    pub choice_text: String,
    pub votes: u32,
}

impl ChoiceDraft {
    pub fn for_question(self, question_id: Id) -> NewChoice {
        NewChoice {
            question_id,
            choice_text: self.choice_text,
            votes: self.votes,
        }
    }
}

/// A batch of inline choice edits to apply alongside a question update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceChanges {
    pub insert: Vec<ChoiceDraft>,
    pub update: Vec<(Id, ChoiceDraft)>,
    pub delete: Vec<Id>,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl ChoiceDraft {
        pub fn example(text: &str) -> Self {
            Self {
                choice_text: text.to_string(),
                votes: 0,
            }
        }
    }
}
