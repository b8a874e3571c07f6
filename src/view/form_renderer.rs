use std::io;
use std::io::ErrorKind;

use ramhorns::Template;

use crate::form::{Field, FormErrors};
use crate::post::PostForm;

#[derive(ramhorns::Content)]
struct FormPage<'a> {
    is_edit: bool,
    action: &'a str,
    csrf_token: &'a str,
    form_errors: Vec<ViewError>,
    title: &'a str,
    title_errors: Vec<ViewError>,
    subtitle: &'a str,
    subtitle_errors: Vec<ViewError>,
    author: &'a str,
    author_errors: Vec<ViewError>,
    img_url: &'a str,
    img_url_errors: Vec<ViewError>,
    body: &'a str,
    body_errors: Vec<ViewError>,
}

#[derive(ramhorns::Content)]
struct ViewError {
    message: String,
}

/// Where the form posts to and whether it edits an existing post.
pub struct FormTarget<'a> {
    pub action: &'a str,
    pub is_edit: bool,
}

pub struct FormRenderer {
    pub template: Template<'static>,
}

fn view_errors(errors: &FormErrors, field: Field) -> Vec<ViewError> {
    errors.messages(field).into_iter()
        .map(|message| ViewError { message })
        .collect()
}

impl FormRenderer {
    pub fn new(form_tpl_src: String) -> io::Result<FormRenderer> {
        let template = match Template::new(form_tpl_src) {
            Ok(x) => x,
            Err(e) => {
                return Err(io::Error::new(ErrorKind::InvalidInput, format!("Error parsing post form template: {}", e)));
            }
        };

        Ok(FormRenderer {
            template,
        })
    }

    /// Renders the form with `form`'s values echoed back, next to any errors.
    pub fn render(&self, target: &FormTarget, form: &PostForm, errors: &FormErrors, csrf_token: &str) -> String {
        self.template.render(&FormPage {
            is_edit: target.is_edit,
            action: target.action,
            csrf_token,
            form_errors: view_errors(errors, Field::CsrfToken),
            title: form.title.as_str(),
            title_errors: view_errors(errors, Field::Title),
            subtitle: form.subtitle.as_str(),
            subtitle_errors: view_errors(errors, Field::Subtitle),
            author: form.author.as_str(),
            author_errors: view_errors(errors, Field::Author),
            img_url: form.img_url.as_str(),
            img_url_errors: view_errors(errors, Field::ImgUrl),
            body: form.body.as_str(),
            body_errors: view_errors(errors, Field::Body),
        })
    }
}
