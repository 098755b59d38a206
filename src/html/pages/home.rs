use super::*;
use crate::search::Page;

pub fn home(layout: Layout, posts: &[Post]) -> Markup {
    let site = layout.site;
    let body = html! {
        section #hero {
            h1 { (site.site_name) }
            @if !site.site_description.is_empty() {
                p.tagline { (site.site_description) }
            }
        }
        section #latest {
            h2 { "Latest posts" }
            @if posts.is_empty() {
                p.muted { "Nothing has been published yet." }
            }
            @for post in posts {
                (components::post_card(post))
            }
            a.more href="/posts" { "All posts" }
        }
    };
    wrappers::universal(body, layout, "home", "Home")
}

pub fn posts(layout: Layout, page: &Page<Post>, query: &str) -> Markup {
    let link = |number: usize| page_link(query, number);

    let body = html! {
        h1 { "Posts" }
        form #search method="get" action="/posts" {
            input type="search" name="q" value=(query) placeholder="Search posts";
            button type="submit" { "Search" }
        }
        @if !query.is_empty() {
            p.muted { (page.total) " result" @if page.total != 1 { "s" } " for \"" (query) "\"" }
        }
        @if page.items.is_empty() {
            p.muted { "No posts found." }
        }
        @for post in page.items {
            (components::post_card(post))
        }
        @if page.count > 1 {
            nav.pagination {
                @if page.has_previous() {
                    a href=(link(page.number - 1)) { "Newer" }
                }
                span { "Page " (page.number) " of " (page.count) }
                @if page.has_next() {
                    a href=(link(page.number + 1)) { "Older" }
                }
            }
        }
    };
    wrappers::universal(body, layout, "home", "Posts")
}

/// The post list URL for a search and page number.
fn page_link(query: &str, number: usize) -> String {
    let number = number.to_string();
    let mut params = vec![("page", number.as_str())];
    if !query.is_empty() {
        params.insert(0, ("q", query));
    }
    reqwest::Url::parse_with_params("http://localhost/posts", &params)
        .ok()
        .and_then(|url| url.query().map(|q| format!("/posts?{q}")))
        .unwrap_or_else(|| "/posts".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_links_keep_the_search() {
        assert_eq!(page_link("", 2), "/posts?page=2");
        assert_eq!(page_link("rust & tide", 3), "/posts?q=rust+%26+tide&page=3");
    }
}
