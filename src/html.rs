// File: html.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

//! Small helpers on top of the `scraper` DOM.

use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

pub static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
pub static DT: Lazy<Selector> = Lazy::new(|| Selector::parse("dt").unwrap());
pub static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
pub static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description" i]"#).unwrap());

pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element with whitespace collapsed. Entities are
/// already decoded by the HTML parser.
pub fn text_content(element: ElementRef<'_>) -> String {
    normalize_ws(&element.text().collect::<Vec<_>>().join(" "))
}

/// The `<dd>` directly following a `<dt>`, if any.
pub fn definition_value(term: ElementRef<'_>) -> Option<ElementRef<'_>> {
    term.next_siblings()
        .filter_map(ElementRef::wrap)
        .next()
        .filter(|sibling| sibling.value().name() == "dd")
}

/// Every `<a href>` of the document resolved against `base`, in document
/// order, with fragments dropped.
pub fn links(document: &Html, base: &Url) -> Vec<Url> {
    document
        .select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| expand_href(base, href))
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .collect()
}

/// Resolve `href` against the page it was found on.
pub fn expand_href(base: &Url, href: &str) -> Option<Url> {
    base.join(href.trim()).ok()
}
