use serde::Serialize;

/// Number of blank inline choice rows an editing form should offer.
pub const INLINE_CHOICE_EXTRA: usize = 3;

/// A titled group of fields on the question editing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fieldset {
    pub title: Option<&'static str>,
    pub fields: &'static [&'static str],
}

/// Inline editing of the choices owned by a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineChoices {
    pub model: &'static str,
    pub extra: usize,
    pub max_num: usize,
}

/// How the admin presents and edits questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionAdmin {
    pub list_display: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub search_fields: &'static [&'static str],
    pub date_hierarchy: &'static str,
    pub ordering: &'static [&'static str],
    pub fieldsets: Vec<Fieldset>,
    pub inlines: Vec<InlineChoices>,
}

impl QuestionAdmin {
    pub fn new(max_choices: usize) -> Self {
        Self {
            list_display: &["question_text", "pub_date", "was_published_recently"],
            list_filter: &["pub_date"],
            search_fields: &["question_text"],
            date_hierarchy: "pub_date",
            ordering: &["-pub_date"],
            fieldsets: vec![
                Fieldset {
                    title: None,
                    fields: &["question_text"],
                },
                Fieldset {
                    title: Some("Date information"),
                    fields: &["pub_date"],
                },
            ],
            inlines: vec![InlineChoices {
                model: "choice",
                extra: INLINE_CHOICE_EXTRA,
                max_num: max_choices,
            }],
        }
    }
}
