use std::fmt;
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::CsrfError;
use crate::post::{PostFields, PostForm};
use crate::text_utils::is_blank;

pub const MAX_FIELD_LEN: usize = 250;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Field {
    Title,
    Subtitle,
    Author,
    ImgUrl,
    Body,
    CsrfToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Required,
    InvalidUrl,
    TooLong { max: usize },
    Csrf(CsrfError),
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Required => write!(f, "This field is required."),
            FieldError::InvalidUrl => write!(f, "Invalid URL."),
            FieldError::TooLong { max } => write!(f, "Field cannot be longer than {} characters.", max),
            FieldError::Csrf(e) => write!(f, "{}", e),
        }
    }
}

/// Per-field validation failures, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    errors: Vec<(Field, FieldError)>,
}

impl FormErrors {
    pub fn push(&mut self, field: Field, error: FieldError) {
        self.errors.push((field, error));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: Field) -> Vec<&FieldError> {
        self.errors.iter()
            .filter(|(f, _)| *f == field)
            .map(|(_, e)| e)
            .collect()
    }

    /// Display messages for one field
    pub fn messages(&self, field: Field) -> Vec<String> {
        self.get(field).into_iter().map(|e| e.to_string()).collect()
    }
}

/// Checks a submitted form and maps it onto [`PostFields`].
///
/// Values are copied as submitted, surrounding whitespace included. The
/// anti-forgery token is not looked at here, see [`crate::csrf`].
pub fn validate(form: &PostForm) -> Result<PostFields, FormErrors> {
    let mut errors = FormErrors::default();

    check_text(&mut errors, Field::Title, &form.title, Some(MAX_FIELD_LEN));
    check_text(&mut errors, Field::Subtitle, &form.subtitle, Some(MAX_FIELD_LEN));
    check_text(&mut errors, Field::Author, &form.author, Some(MAX_FIELD_LEN));
    if check_text(&mut errors, Field::ImgUrl, &form.img_url, Some(MAX_FIELD_LEN)) && !is_valid_url(&form.img_url) {
        errors.push(Field::ImgUrl, FieldError::InvalidUrl);
    }
    check_text(&mut errors, Field::Body, &form.body, None);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(PostFields {
        title: form.title.clone(),
        subtitle: form.subtitle.clone(),
        author: form.author.clone(),
        img_url: form.img_url.clone(),
        body: form.body.clone(),
    })
}

// Returns true when the value passed every check
fn check_text(errors: &mut FormErrors, field: Field, value: &str, max_len: Option<usize>) -> bool {
    if is_blank(value) {
        errors.push(field, FieldError::Required);
        return false;
    }

    if let Some(max) = max_len {
        if value.chars().count() > max {
            errors.push(field, FieldError::TooLong { max });
            return false;
        }
    }

    true
}

/// Absolute URL with a scheme and a host that is either an IPv4 address or
/// a hostname ending in a top level domain.
pub fn is_valid_url(value: &str) -> bool {
    lazy_static! {
        static ref URL_REGEX: Regex = Regex::new(
            r"(?i)^[a-z]+://(?P<host>[^/?:]+)(?P<port>:[0-9]+)?(?P<path>/.*?)?(?P<query>\?.*)?$"
        ).unwrap();
    }

    match URL_REGEX.captures(value) {
        Some(caps) => is_valid_host(&caps["host"]),
        None => false,
    }
}

fn is_valid_host(host: &str) -> bool {
    lazy_static! {
        static ref LABEL_REGEX: Regex = Regex::new(r"(?i)^(xn-|[a-z0-9_]+)(-[a-z0-9_-]+)*$").unwrap();
        static ref TLD_REGEX: Regex = Regex::new(r"(?i)^([a-z]{2,20}|xn--([a-z0-9]+-)*[a-z0-9]+)$").unwrap();
    }

    if host.parse::<Ipv4Addr>().is_ok() {
        return true;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty() && label.len() <= 63 && LABEL_REGEX.is_match(label)
    });

    match labels.last() {
        Some(tld) => labels_ok && TLD_REGEX.is_match(tld),
        None => false,
    }
}
