use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One company with provenance from up to two sources.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, ToSchema)]
pub struct Record {
    #[schema(example = "Acme")]
    pub name: String,
    #[schema(example = "https://acme.dev")]
    pub website: Option<String>,
    pub description: Option<String>,
    /// Directory detail page.
    #[schema(example = "https://www.ycombinator.com/companies/acme")]
    pub primary_source_url: Option<String>,
    /// Search-result profile page.
    #[schema(example = "https://www.linkedin.com/company/acme")]
    pub secondary_source_url: Option<String>,
    /// The secondary source independently ties this company to the cohort.
    pub corroborated: bool,
}

impl Record {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
