use super::*;

pub mod thread;

/// A short card linking to a post, as used in post lists.
pub fn post_card(post: &Post) -> Markup {
    html! {
        article.post-card {
            @if let Some(cover) = &post.cover_image {
                a href={"/post/" (post.id)} {
                    img.cover src=(cover) alt="";
                }
            }
            h3 { a href={"/post/" (post.id)} { (post.title) } }
            p.byline {
                @if let Some(author) = post.author_name() {
                    (author)
                }
                @if let Some(published) = &post.published_at {
                    " · " (date(published))
                }
                @if let Some(category) = post.category_name() {
                    " · " span.category { (category) }
                }
            }
            @if let Some(excerpt) = &post.excerpt {
                p.excerpt { (excerpt) }
            }
        }
    }
}

/// An inline notice shown after a form was submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn html(&self) -> Markup {
        match self {
            Notice::Info(text) => html! { p.notice.info { (text) } },
            Notice::Error(text) => html! { p.notice.error role="alert" { (text) } },
        }
    }
}
