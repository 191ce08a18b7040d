//! Paginated HTML gallery adapter.
//!
//! Fetches one listing page per `fetch_page` call, extracts item containers
//! with the configured clip selector, pulls a direct link out of each
//! container with the nested link selector, and keeps paging while a
//! "next page" control is present and the page budget allows.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use crate::config::{ConfigError, GallerySource};
use crate::limiter::RateLimiter;
use crate::source::{
    Candidate, FetchError, FetchedPage, MediaKind, PageTurn, SourceAdapter, fetch_text,
};

/// Adapter over one configured gallery source.
pub struct GalleryAdapter {
    name: String,
    config: GallerySource,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    clip_selector: Selector,
    link_selector: Selector,
    next_selector: Selector,
    /// Next page number to fetch, 1-based.
    page: u32,
    done: bool,
}

impl GalleryAdapter {
    /// Creates the adapter, parsing the configured selectors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSource`] if a selector does not parse.
    /// Config validation catches this earlier; the check here keeps the
    /// constructor self-contained.
    pub fn new(
        name: &str,
        config: GallerySource,
        client: reqwest::Client,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, ConfigError> {
        let parse = |field: &str, selector: &str| {
            Selector::parse(selector).map_err(|_| {
                ConfigError::invalid_source(name, format!("unparsable {field}: '{selector}'"))
            })
        };
        Ok(Self {
            name: name.to_string(),
            clip_selector: parse("clip_selector", &config.clip_selector)?,
            link_selector: parse("link_selector", &config.link_selector)?,
            next_selector: parse("next_page_selector", &config.next_page_selector)?,
            config,
            client,
            limiter,
            page: 1,
            done: false,
        })
    }

    /// URL for the current page: the base URL as-is for page 1, with the
    /// page-number template appended from page 2 on.
    fn page_url(&self) -> String {
        if self.page <= 1 {
            return self.config.base_url.clone();
        }
        let param = self
            .config
            .page_param
            .replace("{}", &self.page.to_string());
        let separator = if self.config.base_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!("{}{separator}{param}", self.config.base_url)
    }

    /// Extracts candidates and the next-page signal from one page of markup.
    ///
    /// Synchronous on purpose: the parsed DOM is not `Send` and must not live
    /// across an await point.
    fn parse_page(&self, body: &str) -> (Vec<Candidate>, bool) {
        let document = Html::parse_document(body);
        let mut candidates = Vec::new();

        for container in document.select(&self.clip_selector) {
            let Some(link_element) = container.select(&self.link_selector).next() else {
                continue;
            };
            // Direct links live in href for anchors, src/data-src for images.
            let Some(raw_link) = link_element
                .attr("href")
                .or_else(|| link_element.attr("src"))
                .or_else(|| link_element.attr("data-src"))
            else {
                continue;
            };
            let Some(link) = absolutize(&self.config.base_url, raw_link) else {
                continue;
            };
            // Galleries yield clips only: videos and GIFs, never stills.
            match MediaKind::from_url(&link) {
                Some(kind) if !matches!(kind, MediaKind::Image) => {}
                _ => continue,
            }

            let tags = container
                .value()
                .attr("data-tags")
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();

            let mut candidate = Candidate::direct(&self.name, link);
            candidate.tags = tags;
            candidates.push(candidate);
        }

        let has_next = document.select(&self.next_selector).next().is_some();
        (candidates, has_next)
    }
}

/// Resolves a possibly relative link against the gallery base URL.
fn absolutize(base_url: &str, link: &str) -> Option<String> {
    if Url::parse(link).is_ok() {
        return Some(link.to_string());
    }
    let base = Url::parse(base_url).ok()?;
    base.join(link).ok().map(Into::into)
}

#[async_trait]
impl SourceAdapter for GalleryAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(source = %self.name, page = self.page))]
    async fn fetch_page(&mut self) -> Result<FetchedPage, FetchError> {
        if self.done {
            return Ok(FetchedPage::last(Vec::new()));
        }

        let url = self.page_url();
        let body = match fetch_text(&self.client, &self.limiter, &url, None).await {
            Ok(body) => body,
            Err(error) => {
                self.done = true;
                return Err(error);
            }
        };

        let (candidates, has_next) = self.parse_page(&body);
        debug!(
            found = candidates.len(),
            has_next, "gallery page parsed"
        );

        self.page += 1;
        let turn = if has_next && self.page <= self.config.max_pages {
            PageTurn::Next
        } else {
            self.done = true;
            PageTurn::End
        };

        Ok(FetchedPage { candidates, turn })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config(base_url: &str, max_pages: u32) -> GallerySource {
        GallerySource {
            base_url: base_url.to_string(),
            page_param: "page={}".to_string(),
            clip_selector: "article.post".to_string(),
            link_selector: "a.directlink".to_string(),
            next_page_selector: "a.next".to_string(),
            max_pages,
        }
    }

    fn test_adapter(base_url: &str, max_pages: u32) -> GalleryAdapter {
        GalleryAdapter::new(
            "gallery",
            test_config(base_url, max_pages),
            reqwest::Client::new(),
            Arc::new(RateLimiter::disabled()),
        )
        .unwrap()
    }

    const PAGE_WITH_NEXT: &str = r#"
        <html><body>
          <article class="post" data-tags="animated fight">
            <a class="directlink" href="/data/a.mp4">a</a>
          </article>
          <article class="post">
            <a class="directlink" href="https://cdn.example/b.webm">b</a>
          </article>
          <article class="post">
            <a class="directlink" href="/page/about.html">not media</a>
          </article>
          <a class="next" href="?page=2">next</a>
        </body></html>"#;

    #[test]
    fn test_parse_page_extracts_media_links_only() {
        let adapter = test_adapter("https://gallery.example/posts?tags=mp4", 3);
        let (candidates, has_next) = adapter.parse_page(PAGE_WITH_NEXT);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, "https://gallery.example/data/a.mp4");
        assert_eq!(candidates[0].media, Some(MediaKind::Video));
        assert_eq!(candidates[0].tags, vec!["animated", "fight"]);
        assert_eq!(candidates[1].url, "https://cdn.example/b.webm");
        assert!(has_next);
    }

    #[test]
    fn test_parse_page_without_next_control() {
        let adapter = test_adapter("https://gallery.example/posts", 3);
        let html = r#"<article class="post"><a class="directlink" href="/c.gif">c</a></article>"#;
        let (candidates, has_next) = adapter.parse_page(html);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].media, Some(MediaKind::Gif));
        assert!(!has_next);
    }

    #[test]
    fn test_parse_page_reads_img_src_attribute() {
        let mut config = test_config("https://gifs.example/search", 2);
        config.clip_selector = "div.Gif".to_string();
        config.link_selector = "img.item".to_string();
        let adapter = GalleryAdapter::new(
            "gifs",
            config,
            reqwest::Client::new(),
            Arc::new(RateLimiter::disabled()),
        )
        .unwrap();

        let html = r#"<div class="Gif"><img class="item" src="https://media.example/x.gif"/></div>"#;
        let (candidates, _) = adapter.parse_page(html);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://media.example/x.gif");
    }

    #[test]
    fn test_page_url_first_page_is_base() {
        let adapter = test_adapter("https://gallery.example/posts?tags=mp4", 3);
        assert_eq!(adapter.page_url(), "https://gallery.example/posts?tags=mp4");
    }

    #[test]
    fn test_page_url_appends_template_with_ampersand() {
        let mut adapter = test_adapter("https://gallery.example/posts?tags=mp4", 3);
        adapter.page = 2;
        assert_eq!(
            adapter.page_url(),
            "https://gallery.example/posts?tags=mp4&page=2"
        );
    }

    #[test]
    fn test_page_url_appends_template_with_question_mark() {
        let mut adapter = test_adapter("https://gallery.example/posts", 3);
        adapter.page = 3;
        assert_eq!(adapter.page_url(), "https://gallery.example/posts?page=3");
    }

    #[test]
    fn test_absolutize_keeps_absolute_links() {
        assert_eq!(
            absolutize("https://g.example/posts", "https://cdn.example/a.mp4").unwrap(),
            "https://cdn.example/a.mp4"
        );
    }

    #[test]
    fn test_absolutize_joins_relative_links() {
        assert_eq!(
            absolutize("https://g.example/posts?tags=x", "/data/a.mp4").unwrap(),
            "https://g.example/data/a.mp4"
        );
    }
}
