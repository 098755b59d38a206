use super::*;
use crate::thread::{LoadState, ThreadView};

/// Deepest indentation level drawn. Deeper replies line up with it.
const MAX_INDENT: usize = 6;

/// The comments in display order, each with its depth in the tree.
fn flatten(roots: &[CommentNode]) -> Vec<(usize, &Comment)> {
    let mut flat = Vec::new();
    let mut stack: Vec<(usize, &CommentNode)> = roots.iter().rev().map(|r| (0, r)).collect();
    while let Some((depth, node)) = stack.pop() {
        flat.push((depth, &node.comment));
        stack.extend(node.replies.iter().rev().map(|r| (depth + 1, r)));
    }
    flat
}

/// The comment section of a post.
pub fn thread(view: &ThreadView, viewer: Option<&Viewer>, notice: Option<&Notice>) -> Markup {
    let policy = &view.policy;

    html! {
        section #comments {
            h2 { "Comments (" (view.count) ")" }
            @if !policy.enabled {
                p.muted { "Comments are closed." }
            } @else {
                @if let Some(notice) = notice {
                    (notice.html())
                }
                @if let LoadState::Failed(reason) = &view.load {
                    p.notice.error {
                        "Comments could not be loaded: " (reason) ". "
                        a href={"/post/" (view.post_id)} { "Try again" }
                    }
                }
                @if viewer.is_some() {
                    form.comment-form method="post" action={"/post/" (view.post_id) "/comment"} {
                        textarea
                            name="body"
                            rows="4"
                            maxlength=(policy.max_length)
                            placeholder="Write a comment" {}
                        button type="submit" { "Post comment" }
                        @if policy.require_approval {
                            p.muted { "Comments are reviewed before they appear." }
                        }
                    }
                } @else {
                    p { a href="/login" { "Sign in" } " to join the conversation." }
                }
                @if view.roots.is_empty() && view.load == LoadState::Ready {
                    p.muted { "No comments yet." }
                }
                ol.thread {
                    @for (depth, comment) in flatten(&view.roots) {
                        (comment_html(view, comment, depth, viewer))
                    }
                }
            }
        }
    }
}

fn comment_html(view: &ThreadView, comment: &Comment, depth: usize, viewer: Option<&Viewer>) -> Markup {
    let likes = comment.likes.unwrap_or(0);
    let liked = comment.liked.unwrap_or(false);
    let avatar = comment.author.as_ref().and_then(|a| a.avatar_url.as_deref());

    html! {
        li.comment
            id={"comment-" (comment.id)}
            style={"margin-left: " (depth.min(MAX_INDENT) * 2) "rem"} {
            .meta {
                @if let Some(avatar) = avatar {
                    img.avatar src=(avatar) alt="";
                }
                b { (comment.author_name()) }
                " · "
                time datetime=(comment.created_at.to_rfc3339()) { (date_time(&comment.created_at)) }
            }
            p.body { (comment.content) }
            .actions {
                @if viewer.is_some() {
                    form.inline method="post" action={"/post/" (view.post_id) "/like/" (comment.id)} {
                        button.like.liked[liked] type="submit" {
                            (if liked { "♥ " } else { "♡ " }) (likes)
                        }
                    }
                    @if view.policy.allow_reply {
                        details.reply {
                            summary { "Reply" }
                            form method="post" action={"/post/" (view.post_id) "/comment"} {
                                input type="hidden" name="parent" value=(comment.id);
                                textarea name="body" rows="3" maxlength=(view.policy.max_length) {}
                                button type="submit" { "Reply" }
                            }
                        }
                    }
                } @else {
                    span.like { "♡ " (likes) }
                }
            }
        }
    }
}
