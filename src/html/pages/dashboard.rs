use super::*;

const STATUSES: [PostStatus; 3] = [PostStatus::Draft, PostStatus::Published, PostStatus::Archived];

/// The signed-in author's own posts.
pub fn dashboard(layout: Layout, viewer: &Viewer, posts: &[Post], notice: Option<&Notice>) -> Markup {
    let body = html! {
        h1 { "Your posts" }
        @if let Some(notice) = notice {
            (notice.html())
        }
        @if viewer.can_write() {
            a.button href="/dashboard/new" { "New post" }
        } @else {
            p.muted { "Your account can comment but not publish. Ask an administrator for editor access." }
        }
        @if posts.is_empty() {
            p.muted { "You have not written any posts." }
        } @else {
            table.posts {
                thead {
                    tr { th { "Title" } th { "Status" } th { "Updated" } th {} }
                }
                tbody {
                    @for post in posts {
                        tr {
                            td { a href={"/dashboard/edit/" (post.id)} { (post.title) } }
                            td.status { (post.status.as_str()) }
                            td { (date(&post.updated_at)) }
                            td {
                                form.inline method="post" action={"/dashboard/delete/" (post.id)} {
                                    button.danger type="submit" { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
        }
    };
    wrappers::universal(body, layout, "dashboard", "Dashboard")
}

/// The form for writing a new post or editing an existing one.
pub fn editor(
    layout: Layout,
    post: Option<&Post>,
    categories: &[Category],
    notice: Option<&Notice>,
) -> Markup {
    let field = |get: fn(&Post) -> Option<&str>| post.and_then(get).unwrap_or_default().to_owned();
    let status = post.map(|p| p.status).unwrap_or(PostStatus::Draft);
    let category = post.and_then(|p| p.category_id.as_deref());

    let body = html! {
        h1 { @if post.is_some() { "Edit post" } @else { "New post" } }
        @if let Some(notice) = notice {
            (notice.html())
        }
        form #editor method="post" action="/dashboard/save" {
            @if let Some(post) = post {
                input type="hidden" name="id" value=(post.id);
            }
            ul {
                li {
                    label for="title" { "TITLE" }
                    input #title name="title" type="text" required value=(field(|p| Some(p.title.as_str())));
                }
                li {
                    label for="slug" { "SLUG" }
                    input #slug name="slug" type="text" placeholder="Generated from the title" value=(field(|p| Some(p.slug.as_str())));
                }
                li {
                    label for="excerpt" { "EXCERPT" }
                    textarea #excerpt name="excerpt" rows="2" { (field(|p| p.excerpt.as_deref())) }
                }
                li {
                    label for="cover_image" { "COVER IMAGE URL" }
                    input #cover_image name="cover_image" type="url" value=(field(|p| p.cover_image.as_deref()));
                    input #cover-upload type="file" accept="image/png,image/jpeg,image/gif,image/webp,image/svg+xml";
                }
                li {
                    label for="category_id" { "CATEGORY" }
                    select #category_id name="category_id" {
                        option value="" { "None" }
                        @for c in categories {
                            option value=(c.id) selected[category == Some(c.id.as_str())] { (c.name) }
                        }
                    }
                }
                li {
                    label for="status" { "STATUS" }
                    select #status name="status" {
                        @for s in STATUSES {
                            option value=(s.as_str()) selected[s == status] { (s.as_str()) }
                        }
                    }
                }
                li {
                    label for="content" { "CONTENT (HTML)" }
                    textarea #content name="content" rows="20" { (field(|p| Some(p.content.as_str()))) }
                }
                li {
                    button type="submit" { "Save" }
                }
            }
        }
        script type="module" src="/script/editor.js" {}
    };
    wrappers::universal(body, layout, "dashboard", "Editor")
}
