use super::components::Notice;
use super::*;

pub mod admin;
pub mod dashboard;
pub mod home;
pub mod post;

pub fn login(layout: Layout, notice: Option<&Notice>) -> Markup {
    let body = html! {
        h1 { "Sign in" }
        @if let Some(notice) = notice {
            (notice.html())
        }
        form.credentials method="post" action="/login" {
            ul {
                li {
                    label for="email" { "EMAIL" }
                    input #email name="email" type="email" required;
                }
                li {
                    label for="password" { "PASSWORD" }
                    input #password name="password" type="password" required;
                }
                li {
                    button type="submit" { "SIGN IN" }
                }
            }
        }
        p { "No account yet? " a href="/signup" { "Sign up" } }
    };
    wrappers::universal(body, layout, "auth", "Sign in")
}

pub fn signup(layout: Layout, notice: Option<&Notice>) -> Markup {
    let body = html! {
        h1 { "Create an account" }
        @if let Some(notice) = notice {
            (notice.html())
        }
        form.credentials method="post" action="/signup" {
            ul {
                li {
                    label for="username" { "USERNAME" }
                    input #username name="username" type="text" required;
                }
                li {
                    label for="email" { "EMAIL" }
                    input #email name="email" type="email" required;
                }
                li {
                    label for="password" { "PASSWORD" }
                    input #password name="password" type="password" minlength="6" required;
                }
                li {
                    button type="submit" { "SIGN UP" }
                }
            }
        }
        p { "Already registered? " a href="/login" { "Sign in" } }
    };
    wrappers::universal(body, layout, "auth", "Sign up")
}

pub fn not_found(layout: Layout, what: &str) -> Markup {
    let body = html! {
        h1 { "Not found" }
        p { "The " (what) " you were looking for does not exist or is not published." }
        a href="/" { "Return home" }
    };
    wrappers::universal(body, layout, "main", "Not found")
}

pub fn forbidden(layout: Layout) -> Markup {
    let body = html! {
        h1 { "Access denied" }
        p { "You do not have permission to view this page." }
        a href="/" { "Return home" }
    };
    wrappers::universal(body, layout, "main", "Access denied")
}

pub fn error(layout: Layout, message: &str) -> Markup {
    let body = html! {
        h1 { "Something went wrong" }
        p { (message) }
        a href="/" { "Return home" }
    };
    wrappers::universal(body, layout, "main", "Error")
}
