use maud::{html, Markup, PreEscaped};

use crate::data::*;

pub mod components;
pub mod pages;
mod wrappers;

/// What every page needs to draw the frame around its content.
#[derive(Clone, Copy)]
pub struct Layout<'a> {
    pub viewer: Option<&'a Viewer>,
    pub site: &'a SiteSettings,
}
