use super::*;

const ROLES: [Role; 3] = [Role::Subscriber, Role::Editor, Role::Admin];

/// Everything the admin dashboard shows.
pub struct Overview {
    pub stats: Stats,
    pub profiles: Vec<Profile>,
    pub comments: Vec<Comment>,
    pub posts: Vec<Post>,
    pub policy: ModerationPolicy,
    pub settings: SiteSettings,
}

pub fn admin(layout: Layout, overview: &Overview, notice: Option<&Notice>) -> Markup {
    let body = html! {
        h1 { "Administration" }
        @if let Some(notice) = notice {
            (notice.html())
        }
        (stats(&overview.stats))
        (users(&overview.profiles))
        (comments(&overview.comments))
        (posts(&overview.posts))
        (policy_form(&overview.policy))
        (settings_form(&overview.settings))
    };
    wrappers::universal(body, layout, "admin", "Administration")
}

fn stats(stats: &Stats) -> Markup {
    html! {
        section #stats {
            .stat { b { (stats.users) } " users" }
            .stat { b { (stats.posts) } " posts" }
            .stat { b { (stats.published_posts) } " published" }
            .stat { b { (stats.comments) } " comments" }
        }
    }
}

fn users(profiles: &[Profile]) -> Markup {
    html! {
        section #users {
            h2 { "Users" }
            table {
                thead { tr { th { "Username" } th { "Joined" } th { "Role" } } }
                tbody {
                    @for profile in profiles {
                        tr {
                            td { (profile.username) }
                            td { (date(&profile.created_at)) }
                            td {
                                form.inline method="post" action={"/admin/role/" (profile.id)} {
                                    select name="role" {
                                        @for role in ROLES {
                                            option value=(role.as_str()) selected[role == profile.role] { (role.as_str()) }
                                        }
                                    }
                                    button type="submit" { "Change" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn comments(comments: &[Comment]) -> Markup {
    html! {
        section #moderation {
            h2 { "Comments" }
            @if comments.is_empty() {
                p.muted { "No comments yet." }
            }
            table {
                thead { tr { th { "Author" } th { "Comment" } th { "Status" } th {} } }
                tbody {
                    @for comment in comments {
                        tr class={"status-" (comment.status.as_str())} {
                            td { (comment.author_name()) }
                            td {
                                (comment.content)
                                br;
                                a.muted href={"/post/" (comment.post_id)} { (date_time(&comment.created_at)) }
                            }
                            td { (comment.status.as_str()) }
                            td {
                                @if comment.status != CommentStatus::Approved {
                                    form.inline method="post" action={"/admin/comment/" (comment.id) "/approved"} {
                                        button type="submit" { "Approve" }
                                    }
                                }
                                @if comment.status != CommentStatus::Rejected {
                                    form.inline method="post" action={"/admin/comment/" (comment.id) "/rejected"} {
                                        button type="submit" { "Reject" }
                                    }
                                }
                                form.inline method="post" action={"/admin/comment/" (comment.id) "/delete"} {
                                    button.danger type="submit" { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn posts(posts: &[Post]) -> Markup {
    html! {
        section #all-posts {
            h2 { "Posts" }
            table {
                thead { tr { th { "Title" } th { "Author" } th { "Status" } th {} } }
                tbody {
                    @for post in posts {
                        tr {
                            td { a href={"/dashboard/edit/" (post.id)} { (post.title) } }
                            td { (post.author_name().unwrap_or("Unknown")) }
                            td { (post.status.as_str()) }
                            td {
                                form.inline method="post" action={"/admin/post/" (post.id) "/delete"} {
                                    button.danger type="submit" { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn policy_form(policy: &ModerationPolicy) -> Markup {
    html! {
        section #comment-settings {
            h2 { "Comment settings" }
            form method="post" action="/admin/comments" {
                ul {
                    li { label { input type="checkbox" name="enabled" checked[policy.enabled]; " Enable comments" } }
                    li { label { input type="checkbox" name="require_approval" checked[policy.require_approval]; " Hold new comments for approval" } }
                    li { label { input type="checkbox" name="allow_anonymous" checked[policy.allow_anonymous]; " Allow anonymous comments" } }
                    li { label { input type="checkbox" name="allow_reply" checked[policy.allow_reply]; " Allow replies" } }
                    li {
                        label for="min_length" { "MINIMUM LENGTH" }
                        input #min_length name="min_length" type="number" min="0" value=(policy.min_length);
                    }
                    li {
                        label for="max_length" { "MAXIMUM LENGTH" }
                        input #max_length name="max_length" type="number" min="1" value=(policy.max_length);
                    }
                    li {
                        label for="blocked_keywords" { "BLOCKED WORDS (one per line)" }
                        textarea #blocked_keywords name="blocked_keywords" rows="4" {
                            (policy.blocked_keywords.join("\n"))
                        }
                    }
                    li { button type="submit" { "Save comment settings" } }
                }
            }
        }
    }
}

fn settings_form(settings: &SiteSettings) -> Markup {
    html! {
        section #site-settings {
            h2 { "Site settings" }
            form method="post" action="/admin/site" {
                ul {
                    li {
                        label for="site_name" { "SITE NAME" }
                        input #site_name name="site_name" type="text" required value=(settings.site_name);
                    }
                    li {
                        label for="site_description" { "DESCRIPTION" }
                        textarea #site_description name="site_description" rows="2" { (settings.site_description) }
                    }
                    li {
                        label for="site_url" { "SITE URL" }
                        input #site_url name="site_url" type="url" value=(settings.site_url.as_deref().unwrap_or_default());
                    }
                    li {
                        label for="logo_url" { "LOGO URL" }
                        input #logo_url name="logo_url" type="url" value=(settings.logo_url.as_deref().unwrap_or_default());
                    }
                    li {
                        label for="footer_text" { "FOOTER" }
                        input #footer_text name="footer_text" type="text" value=(settings.footer_text);
                    }
                    li { button type="submit" { "Save site settings" } }
                }
            }
        }
    }
}
