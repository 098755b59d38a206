use crate::data::Post;

/// Posts shown per page of the post list.
pub const POSTS_PER_PAGE: usize = 5;

/// One page of search results.
pub struct Page<'a, T> {
    pub items: &'a [T],

    /// The 1-based page number actually shown.
    pub number: usize,

    /// Total number of pages, at least 1.
    pub count: usize,

    /// Total number of matching items across all pages.
    pub total: usize,
}

impl<T> Page<'_, T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.count
    }
}

/// Keep the posts matching the query in any searchable field.
///
/// A blank query keeps every post.
pub fn filter_posts(posts: Vec<Post>, query: &str) -> Vec<Post> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return posts;
    }
    posts.into_iter().filter(|p| p.matches(&query)).collect()
}

/// Slice out a page, clamping the page number into range.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let count = items.len().div_ceil(per_page).max(1);
    let number = page.clamp(1, count);
    let start = (number - 1) * per_page;
    let end = (start + per_page).min(items.len());

    Page {
        items: &items[start..end],
        number,
        count,
        total: items.len(),
    }
}
