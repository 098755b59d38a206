use super::*;
use crate::thread::ThreadView;

pub fn post(layout: Layout, post: &Post, thread: &ThreadView, notice: Option<&Notice>) -> Markup {
    let body = html! {
        article.post {
            @if let Some(cover) = &post.cover_image {
                img.cover src=(cover) alt="";
            }
            h1 { (post.title) }
            p.byline {
                @if let Some(author) = post.author_name() {
                    "By " (author)
                }
                @if let Some(published) = &post.published_at {
                    " · " (date(published))
                }
                @if let Some(category) = post.category_name() {
                    " · " span.category { (category) }
                }
            }
            .content {
                (PreEscaped(&post.content))
            }
        }
        (components::thread::thread(thread, layout.viewer, notice))
    };
    wrappers::universal(body, layout, "post", &post.title)
}
