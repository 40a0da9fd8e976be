use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Closed set of post categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Education,
    Politics,
    Business,
    Agriculture,
    Entertainment,
    Art,
    Investment,
    Weather,
    Uncategorized,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Category::Education,
        Category::Politics,
        Category::Business,
        Category::Agriculture,
        Category::Entertainment,
        Category::Art,
        Category::Investment,
        Category::Weather,
        Category::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Education => "Education",
            Category::Politics => "Politics",
            Category::Business => "Business",
            Category::Agriculture => "Agriculture",
            Category::Entertainment => "Entertainment",
            Category::Art => "Art",
            Category::Investment => "Investment",
            Category::Weather => "Weather",
            Category::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown category: {}", s)))
    }
}

/// Validated text fields shared by create and edit.
#[derive(Debug, Clone)]
pub struct PostFields {
    pub title: String,
    pub category: Category,
    pub description: String,
    pub story: String,
}

impl PostFields {
    /// Builds the field set, rejecting missing or blank values.
    pub fn new(
        title: Option<String>,
        category: Option<String>,
        description: Option<String>,
        story: Option<String>,
    ) -> Result<Self, AppError> {
        let title = require("title", title)?;
        let category = require("category", category)?.parse()?;
        let description = require("description", description)?;
        let story = require("story", story)?;

        Ok(Self {
            title,
            category,
            description,
            story,
        })
    }
}

fn require(name: &str, value: Option<String>) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("Fill all fields: missing {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for cat in Category::ALL {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), *cat);
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = "Gardening".parse::<Category>().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn fields_require_all_values() {
        let err = PostFields::new(
            Some("T".into()),
            Some("Art".into()),
            None,
            Some("story".into()),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn blank_field_counts_as_missing() {
        let err = PostFields::new(
            Some("   ".into()),
            Some("Art".into()),
            Some("d".into()),
            Some("s".into()),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn valid_fields_parse() {
        let fields = PostFields::new(
            Some("T".into()),
            Some("Weather".into()),
            Some("d".into()),
            Some("s".into()),
        )
        .unwrap();
        assert_eq!(fields.category, Category::Weather);
        assert_eq!(fields.title, "T");
    }
}
