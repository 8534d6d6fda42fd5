//! Boilerplate-removal strategy.
//!
//! Picks the main content region (`article`, `main`, `[role=main]`, common
//! content ids/classes, else `<body>`), then keeps only the block text that
//! does not sit inside navigation, headers, footers, asides, ads, share bars
//! or comment threads. Returns title, authors, date and body as a bundle.

use super::{Page, Strategy, compile, element_text, has_ancestor, join_body, meta_contents, split_byline, texts};
use crate::models::Contribution;
use crate::normalize::parse_date;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::node::Element;
use scraper::{ElementRef, Selector};

pub const STRATEGY: Strategy = Strategy {
    name: "boilerplate",
    extract,
};

static CONTENT_ROOTS: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        "article",
        "main",
        r#"[role="main"]"#,
        "#content",
        "#main",
        ".article-body",
        ".story-body",
        ".post-content",
        ".entry-content",
        ".content",
    ])
});
static BODY: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["body"]));
static BLOCKS: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["p, h2, h3, pre, blockquote"]));
static HEADLINE: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["h1", "title"]));
static BYLINE: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        r#"[rel="author"]"#,
        r#"[itemprop="author"]"#,
        ".byline",
        ".author",
    ])
});
static TIME_DATETIME: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["time[datetime]"]));
static DATE_META: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        r#"meta[property="article:published_time"]"#,
        r#"meta[itemprop="datePublished"]"#,
    ])
});

const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "iframe", "form", "button", "svg",
];
const BOILERPLATE_ROLES: &[&str] = &["navigation", "banner", "contentinfo", "complementary", "dialog"];
const BOILERPLATE_TOKENS: &[&str] = &[
    "nav", "navbar", "menu", "ad", "ads", "advert", "advertisement", "sponsor", "sponsored", "promo",
    "comment", "comments", "sidebar", "footer", "share", "sharing", "social", "related", "newsletter",
    "subscribe", "cookie", "breadcrumb", "breadcrumbs", "popup", "modal",
];

/// Class or id names like `ad`, `ad-slot`, `main-nav` or `comments_area`.
fn is_boilerplate_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    BOILERPLATE_TOKENS.iter().any(|token| {
        name == *token
            || name.starts_with(&format!("{token}-"))
            || name.starts_with(&format!("{token}_"))
            || name.ends_with(&format!("-{token}"))
            || name.ends_with(&format!("_{token}"))
    })
}

pub fn is_boilerplate(element: &Element) -> bool {
    if BOILERPLATE_TAGS.contains(&element.name()) {
        return true;
    }
    if element
        .attr("role")
        .is_some_and(|role| BOILERPLATE_ROLES.contains(&role))
    {
        return true;
    }
    element.classes().chain(element.id()).any(is_boilerplate_name)
}

fn content_root<'a>(page: &Page<'a>) -> ElementRef<'a> {
    let document = page.document;
    CONTENT_ROOTS
        .iter()
        .find_map(|s| document.select(s).find(|el| !is_boilerplate(el.value())))
        .or_else(|| BODY.iter().find_map(|s| document.select(s).next()))
        .unwrap_or_else(|| document.root_element())
}

fn body(page: &Page<'_>) -> Option<String> {
    let root = content_root(page);
    let paragraphs = BLOCKS
        .iter()
        .flat_map(|s| root.select(s))
        // a <p> inside a <blockquote> is already covered by the quote
        .filter(|el| !has_ancestor(*el, root, |a| a.value().name() == "blockquote"))
        .filter(|el| !has_ancestor(*el, root, |a| is_boilerplate(a.value())))
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    join_body(paragraphs, &page.selectors.bad_endings)
}

fn authors(page: &Page<'_>) -> Vec<String> {
    texts(page.document, &BYLINE)
        .iter()
        .flat_map(|b| split_byline(b))
        .unique()
        .collect()
}

fn published(page: &Page<'_>) -> Option<chrono::NaiveDate> {
    let document = page.document;
    TIME_DATETIME
        .iter()
        .flat_map(|s| document.select(s))
        .filter_map(|el| el.value().attr("datetime").map(str::to_string))
        .chain(meta_contents(document, &DATE_META))
        .find_map(|d| parse_date(&d))
}

fn extract(page: &Page<'_>) -> Contribution {
    Contribution {
        strategy: STRATEGY.name,
        title: texts(page.document, &HEADLINE).into_iter().next(),
        published: published(page),
        body: body(page),
        authors: authors(page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Selectors;
    use chrono::NaiveDate;
    use scraper::Html;

    fn run(html: &str) -> Contribution {
        let document = Html::parse_document(html);
        let selectors = Selectors::default();
        let page = Page {
            document: &document,
            raw: html,
            url: "https://x.com/a",
            site_name: "X",
            selectors: &selectors,
        };
        extract(&page)
    }

    const PAGE: &str = r#"<html><head><title>Doc title</title></head><body>
        <header class="site-header"><nav><a href="/">Home</a></nav></header>
        <article>
          <h1>Bridge reopens</h1>
          <p class="byline">By Jane Doe and John Roe</p>
          <time datetime="2025-05-06T09:00:00Z">May 6</time>
          <p>The bridge reopened on Tuesday.</p>
          <div class="ad-slot"><p>Buy now!</p></div>
          <p>Traffic resumed within the hour.</p>
          <blockquote><p>It is a relief.</p></blockquote>
          <section id="comments"><p>First!</p></section>
          <div class="share-bar"><p>Share on social</p></div>
        </article>
        <footer><p>Copyright</p></footer>
    </body></html>"#;

    #[test]
    fn test_strips_ads_comments_and_share_bars() {
        let c = run(PAGE);
        let body = c.body.unwrap();
        assert!(body.contains("The bridge reopened on Tuesday."));
        assert!(body.contains("Traffic resumed within the hour."));
        assert!(body.contains("It is a relief."));
        assert!(!body.contains("Buy now!"));
        assert!(!body.contains("First!"));
        assert!(!body.contains("Share on social"));
        assert!(!body.contains("Copyright"));
        assert_eq!(body.matches("It is a relief.").count(), 1);
    }

    #[test]
    fn test_bundle_fields() {
        let c = run(PAGE);
        assert_eq!(c.title.as_deref(), Some("Bridge reopens"));
        assert_eq!(c.authors, vec!["Jane Doe", "John Roe"]);
        assert_eq!(c.published, NaiveDate::from_ymd_opt(2025, 5, 6));
    }

    #[test]
    fn test_boilerplate_names() {
        assert!(is_boilerplate_name("ad"));
        assert!(is_boilerplate_name("main-nav"));
        assert!(is_boilerplate_name("comments_area"));
        assert!(!is_boilerplate_name("header-image-caption-lead"));
        assert!(!is_boilerplate_name("shadow"));
        assert!(!is_boilerplate_name("story-body"));
    }

    #[test]
    fn test_falls_back_to_body() {
        let c = run("<html><body><nav><p>Menu</p></nav><p>Only paragraph here.</p></body></html>");
        assert_eq!(c.body.as_deref(), Some("Only paragraph here."));
        assert_eq!(c.title, None);
    }
}
