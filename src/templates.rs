use rocket::{
    fairing::{Fairing, Info, Kind},
    response::content::RawHtml,
    Build, Rocket,
};
use serde::Serialize;
use tera::{Context, Tera};

use crate::error::Result;

pub const INDEX: &str = "polls/index.html";
pub const DETAIL: &str = "polls/detail.html";
pub const RESULTS: &str = "polls/results.html";

/// The compiled HTML templates, held in managed state.
pub struct Templates(Tera);

impl Templates {
    /// Compile the templates bundled into the binary.
    pub fn bundled() -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                "polls/base.html",
                include_str!("../templates/polls/base.html.tera"),
            ),
            (INDEX, include_str!("../templates/polls/index.html.tera")),
            (DETAIL, include_str!("../templates/polls/detail.html.tera")),
            (RESULTS, include_str!("../templates/polls/results.html.tera")),
        ])?;
        Ok(Self(tera))
    }

    /// Render the named template with `context`.
    pub fn render<C: Serialize>(&self, name: &str, context: &C) -> Result<RawHtml<String>> {
        let context = Context::from_serialize(context)?;
        Ok(RawHtml(self.0.render(name, &context)?))
    }
}

/// A fairing that compiles the templates and places them into managed state.
pub struct TemplateFairing;

#[rocket::async_trait]
impl Fairing for TemplateFairing {
    fn info(&self) -> Info {
        Info {
            name: "Templates",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match Templates::bundled() {
            Ok(templates) => Ok(rocket.manage(templates)),
            Err(e) => {
                error!("Failed to compile templates: {e}");
                Err(rocket)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_templates_compile() {
        assert!(Templates::bundled().is_ok());
    }
}
