use chrono::{DateTime, Utc};
use press_core::Post;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::error::{Result, SiteError};
use crate::generator::GeneratorPost;

/// Front matter written above every post body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrontMatter {
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

static SEPARATORS: OnceLock<Option<Regex>> = OnceLock::new();

fn separators() -> Option<&'static Regex> {
    SEPARATORS
        .get_or_init(|| Regex::new(r#"[\s~`!@#$%^&*()_+=\[\]{}|;:"'<>,.?/\\-]+"#).ok())
        .as_ref()
}

/// File name stem for a post title.
///
/// Punctuation and whitespace collapse into single dashes; letters from any
/// script are kept.
pub fn slugize(title: &str) -> String {
    let title = title.trim();
    match separators() {
        Some(re) => re.replace_all(title, "-").trim_matches('-').to_string(),
        None => title.replace(char::is_whitespace, "-"),
    }
}

/// Convert a task post into what the generator writes.
pub fn to_generator_post(post: &Post) -> Result<GeneratorPost> {
    generator_post_titled(post, &post.title)
}

/// Generator view of `post` stored under a different title, used to address
/// the file of a renamed post.
pub fn generator_post_titled(post: &Post, title: &str) -> Result<GeneratorPost> {
    let slug = slugize(title);
    if slug.is_empty() {
        return Err(SiteError::InvalidPost(format!(
            "title {:?} yields an empty file name",
            title
        )));
    }

    let front_matter = FrontMatter {
        title: title.to_string(),
        date: post.date.unwrap_or_else(Utc::now),
        updated: post.updated,
        tags: post.tags.clone(),
        categories: post.categories.clone(),
        excerpt: post.summary.clone(),
    };

    Ok(GeneratorPost {
        slug,
        front_matter,
        content: post.source.clone(),
    })
}

/// For each post of a batch, the error it fails with because an earlier
/// post already claimed its file name. Distinct titles can share a slug.
pub fn slug_conflicts(posts: &[Post]) -> Vec<Option<SiteError>> {
    let mut claimed: HashMap<String, &str> = HashMap::new();
    posts
        .iter()
        .map(|post| {
            let slug = slugize(&post.title);
            if slug.is_empty() {
                return None;
            }
            match claimed.get(&slug) {
                Some(first) => Some(SiteError::DuplicateSlug {
                    title: post.title.clone(),
                    slug,
                    claimed_by: first.to_string(),
                }),
                None => {
                    claimed.insert(slug, &post.title);
                    None
                }
            }
        })
        .collect()
}

/// Result of one post inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PostOutcome {
    pub title: String,
    pub result: std::result::Result<PathBuf, String>,
}

impl PostOutcome {
    pub fn succeeded(title: impl Into<String>, path: PathBuf) -> Self {
        Self {
            title: title.into(),
            result: Ok(path),
        }
    }

    pub fn failed(title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            result: Err(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn failure(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }
}
