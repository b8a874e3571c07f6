use std::io;
use std::io::ErrorKind;

use ramhorns::Template;

#[derive(ramhorns::Content)]
struct StaticPage<'a> {
    page_title: &'a str,
}

/// Pages without any post data, such as About and Contact.
pub struct PageRenderer {
    pub title: String,
    pub template: Template<'static>,
}

impl PageRenderer {
    pub fn new(title: &str, page_tpl_src: String) -> io::Result<PageRenderer> {
        let template = Template::new(page_tpl_src).map_err(|e| {
            io::Error::new(ErrorKind::InvalidInput, format!("Error parsing {} page template: {}", title, e))
        })?;

        Ok(PageRenderer {
            title: title.to_string(),
            template,
        })
    }

    pub fn render(&self) -> String {
        self.template.render(&StaticPage {
            page_title: self.title.as_str(),
        })
    }
}
