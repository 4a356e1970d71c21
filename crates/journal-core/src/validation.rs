//! Draft validation for the post composition form.
//!
//! [`validate`] is pure: it only reads the draft. Each field group reports
//! at most its first failing rule, and groups are checked in form order:
//! title, thumbnail, category, sub-category, body.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Category, DraftPost};

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_OTHER_CATEGORY_CHARS: usize = 20;
pub const MAX_OTHER_CATEGORY_WORDS: usize = 2;

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    Title,
    Thumbnail,
    Category,
    OtherCategory,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum DraftError {
    #[error("Please enter the title of your post.")]
    TitleRequired,
    #[error("Title cannot exceed 100 characters.")]
    TitleTooLong,
    #[error("Please add an image for your post.")]
    ThumbnailRequired,
    #[error("Please select a category for your post.")]
    CategoryRequired,
    #[error("Please enter the category for your post.")]
    OtherCategoryRequired,
    #[error("Category cannot exceed 20 characters.")]
    OtherCategoryTooLong,
    #[error("Category cannot be more than 2 words.")]
    OtherCategoryTooManyWords,
    #[error("Please add the content for your post.")]
    BodyRequired,
}

impl DraftError {
    pub fn field(&self) -> DraftField {
        match self {
            DraftError::TitleRequired | DraftError::TitleTooLong => DraftField::Title,
            DraftError::ThumbnailRequired => DraftField::Thumbnail,
            DraftError::CategoryRequired => DraftField::Category,
            DraftError::OtherCategoryRequired
            | DraftError::OtherCategoryTooLong
            | DraftError::OtherCategoryTooManyWords => DraftField::OtherCategory,
            DraftError::BodyRequired => DraftField::Body,
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DraftField::Title => "title",
            DraftField::Thumbnail => "thumbnail",
            DraftField::Category => "category",
            DraftField::OtherCategory => "other_category",
            DraftField::Body => "body",
        };
        f.write_str(name)
    }
}

/// Validate a draft. An empty list means it can be submitted.
pub fn validate(draft: &DraftPost) -> Vec<DraftError> {
    [
        check_title(&draft.title),
        draft
            .thumbnail
            .is_none()
            .then_some(DraftError::ThumbnailRequired),
        draft
            .category
            .is_none()
            .then_some(DraftError::CategoryRequired),
        (draft.category == Some(Category::Other))
            .then(|| check_other_category(&draft.other_category))
            .flatten(),
        is_body_empty(&draft.body).then_some(DraftError::BodyRequired),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// The single error the form shows, if any.
pub fn first_error(draft: &DraftPost) -> Option<DraftError> {
    validate(draft).into_iter().next()
}

/// True when the editor output has no text once tags are stripped.
pub fn is_body_empty(body: &str) -> bool {
    MARKUP
        .replace_all(body, "")
        .replace("&nbsp;", " ")
        .trim()
        .is_empty()
}

fn check_title(title: &str) -> Option<DraftError> {
    if title.trim().is_empty() {
        Some(DraftError::TitleRequired)
    } else if title.chars().count() > MAX_TITLE_CHARS {
        Some(DraftError::TitleTooLong)
    } else {
        None
    }
}

fn check_other_category(other: &str) -> Option<DraftError> {
    if other.trim().is_empty() {
        Some(DraftError::OtherCategoryRequired)
    } else if other.chars().count() > MAX_OTHER_CATEGORY_CHARS {
        Some(DraftError::OtherCategoryTooLong)
    } else if other.split_whitespace().count() > MAX_OTHER_CATEGORY_WORDS {
        Some(DraftError::OtherCategoryTooManyWords)
    } else {
        None
    }
}
