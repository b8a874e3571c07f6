use std::fmt;
use std::fmt::{Display, Formatter};

use serde::Deserialize;

#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct PostId(pub i64);

impl Display for PostId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored blog post, one row of the `blog_post` table.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogPost {
    pub id: PostId,
    pub title: String,
    pub subtitle: String,
    /// Creation date, already formatted for display (e.g. "April 05, 2024")
    pub date: String,
    pub body: String,
    pub author: String,
    pub img_url: String,
}

/// The editable part of a post, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFields {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub img_url: String,
    pub body: String,
}

/// Raw values as submitted by the create/edit form.
///
/// Every field defaults to empty so a missing input reaches the validator
/// instead of failing the request extraction.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub csrf_token: String,
}

impl From<&BlogPost> for PostForm {
    fn from(post: &BlogPost) -> Self {
        PostForm {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            img_url: post.img_url.clone(),
            body: post.body.clone(),
            csrf_token: String::new(),
        }
    }
}

impl Display for BlogPost {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "id={}, date={}, author={}, title={}",
               self.id,
               self.date,
               self.author,
               self.title,
        )
    }
}
