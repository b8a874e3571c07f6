use std::io;
use std::io::ErrorKind;

use ramhorns::Template;

use crate::post::BlogPost;

#[derive(ramhorns::Content)]
struct ViewItem<'a> {
    id: i64,
    edit_link: String,
    delete_link: String,
    post_title: &'a str,
    subtitle: &'a str,
    author: &'a str,
    date: &'a str,
    img_url: &'a str,
    post_content: &'a str,
}

pub struct PostRenderer {
    pub template: Template<'static>,
}

impl PostRenderer {
    pub fn new(view_tpl_src: String) -> io::Result<PostRenderer> {
        let template = match Template::new(view_tpl_src) {
            Ok(x) => x,
            Err(e) => {
                return Err(io::Error::new(ErrorKind::InvalidInput, format!("Error parsing post view template: {}", e)));
            }
        };

        Ok(PostRenderer {
            template,
        })
    }

    pub fn render(&self, post: &BlogPost) -> String {
        self.template.render(&ViewItem {
            id: post.id.0,
            edit_link: format!("/edit-post/{}", post.id),
            delete_link: format!("/delete/{}", post.id),
            post_title: post.title.as_str(),
            subtitle: post.subtitle.as_str(),
            author: post.author.as_str(),
            date: post.date.as_str(),
            img_url: post.img_url.as_str(),
            post_content: post.body.as_str(),
        })
    }
}
