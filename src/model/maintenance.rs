use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Input of the maintenance page template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageModel {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl fmt::Display for PageModel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} {}", self.title, self.text)
    }
}
