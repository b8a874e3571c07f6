use std::io;
use std::io::ErrorKind;

use ramhorns::Template;

use crate::post::BlogPost;

#[derive(ramhorns::Content)]
struct ListPage<'a> {
    post_list: Vec<PostItem<'a>>,
    has_posts: bool,
}

#[derive(ramhorns::Content)]
struct PostItem<'a> {
    link: String,
    title: &'a str,
    subtitle: &'a str,
    author: &'a str,
    date: &'a str,
}

pub struct ListRenderer {
    pub template: Template<'static>,
}

impl ListRenderer {
    pub fn new(list_tpl_src: String) -> io::Result<ListRenderer> {
        let template = match Template::new(list_tpl_src) {
            Ok(x) => x,
            Err(e) => {
                return Err(io::Error::new(ErrorKind::InvalidInput, format!("Error parsing list template: {}", e)));
            }
        };

        Ok(ListRenderer {
            template,
        })
    }

    pub fn render(&self, posts: &[BlogPost]) -> String {
        let post_list: Vec<PostItem> = posts.iter()
            .map(|post| PostItem {
                link: format!("/post/{}", post.id),
                title: post.title.as_str(),
                subtitle: post.subtitle.as_str(),
                author: post.author.as_str(),
                date: post.date.as_str(),
            })
            .collect();

        self.template.render(&ListPage {
            has_posts: !post_list.is_empty(),
            post_list,
        })
    }
}
