use maud::DOCTYPE;

use super::*;

pub(super) fn standard(body: Markup, layout: Layout) -> Markup {
    let site = layout.site;

    html! {
        header #masthead {
            a #site-name href="/" {
                @if let Some(logo) = &site.logo_url {
                    img.logo src=(logo) alt="";
                }
                (site.site_name)
            }
            nav #topnav {
                a href="/" { "HOME" }
                a href="/posts" { "POSTS" }
                @if let Some(viewer) = layout.viewer {
                    a href="/dashboard" { "DASHBOARD" }
                    @if viewer.is_admin() {
                        a href="/admin" { "ADMIN" }
                    }
                    form.inline method="post" action="/logout" {
                        button type="submit" { "SIGN OUT (" (viewer.username) ")" }
                    }
                } @else {
                    a href="/login" { "SIGN IN" }
                    a href="/signup" { "SIGN UP" }
                }
            }
        }
        main { (body) }
        footer {
            p { (site.footer_text) }
        }
    }
}

pub(super) fn universal(
    body: Markup,
    layout: Layout,
    resource: &'static str,
    title: &str,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) " | " (layout.site.site_name) }
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                @if !layout.site.site_description.is_empty() {
                    meta name="description" content=(layout.site.site_description);
                }
                link type="text/css" rel="stylesheet" href="/style/main.css";
                link type="text/css" rel="stylesheet" href={"/style/" (resource) ".css"};
            }
            body {
                (standard(body, layout))
            }
        }
    }
}
