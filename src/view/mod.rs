use std::path::Path;
use std::{fs, io};

use crate::view::form_renderer::FormRenderer;
use crate::view::list_renderer::ListRenderer;
use crate::view::page_renderer::PageRenderer;
use crate::view::post_renderer::PostRenderer;

pub mod form_renderer;
pub mod list_renderer;
pub mod page_renderer;
pub mod post_renderer;

pub const LIST_TEMPLATE: &str = "index.html";
pub const POST_TEMPLATE: &str = "post.html";
pub const FORM_TEMPLATE: &str = "make-post.html";
pub const ABOUT_TEMPLATE: &str = "about.html";
pub const CONTACT_TEMPLATE: &str = "contact.html";

/// Every page template, parsed once at startup.
pub struct Views {
    pub list: ListRenderer,
    pub post: PostRenderer,
    pub form: FormRenderer,
    pub about: PageRenderer,
    pub contact: PageRenderer,
}

pub fn read_template(tpl_dir: &Path, file_name: &str) -> io::Result<String> {
    let full_path = tpl_dir.join(file_name);
    match fs::read_to_string(&full_path) {
        Ok(src) => Ok(src),
        Err(e) => Err(io::Error::new(e.kind(), format!("Error reading template {}: {}", full_path.display(), e))),
    }
}

impl Views {
    pub fn load(tpl_dir: &Path) -> io::Result<Views> {
        Ok(Views {
            list: ListRenderer::new(read_template(tpl_dir, LIST_TEMPLATE)?)?,
            post: PostRenderer::new(read_template(tpl_dir, POST_TEMPLATE)?)?,
            form: FormRenderer::new(read_template(tpl_dir, FORM_TEMPLATE)?)?,
            about: PageRenderer::new("About Me", read_template(tpl_dir, ABOUT_TEMPLATE)?)?,
            contact: PageRenderer::new("Contact Me", read_template(tpl_dir, CONTACT_TEMPLATE)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_load_bundled_templates() {
        let tpl_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("res").join("template");
        let views = Views::load(&tpl_dir).unwrap();
        assert!(views.about.render().contains("About Me"));
        assert!(views.contact.render().contains("Contact Me"));
    }

    #[test]
    fn test_missing_dir() {
        let err = Views::load(Path::new("does/not/exist")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
