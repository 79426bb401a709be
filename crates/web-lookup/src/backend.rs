//! Search backends: the trait boundary and the HTML-scraping implementation.

use std::time::Duration;

use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::{SearchError, WebConfig};

const DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";
const GOOGLE_URL: &str = "https://www.google.com/search";

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Anything that can turn a query into a list of hits.
///
/// Implementations may block. They must be `Send` so a bot owning one can be
/// moved to a worker thread.
pub trait SearchBackend: Send {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

impl<B: SearchBackend + ?Sized + Sync> SearchBackend for std::sync::Arc<B> {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        (**self).search(query, max_results)
    }
}

/// Scrapes public HTML result pages.
///
/// DuckDuckGo's HTML endpoint is tried first, then Google's results page.
/// If neither yields anything, two simulated placeholder hits are returned so
/// the caller still gets an answer. Transport and HTTP errors along the way
/// are logged and swallowed.
#[derive(Debug, Clone)]
pub struct ScrapingBackend {
    client: Client,
}

impl ScrapingBackend {
    pub fn new(config: &WebConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(ScrapingBackend { client })
    }

    fn fetch(&self, base: &str, query: &str) -> Result<String, SearchError> {
        let url = Url::parse_with_params(base, &[("q", query)])?;
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }
}

impl SearchBackend for ScrapingBackend {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let engines: [(&str, &str, fn(&str, usize) -> Vec<SearchHit>); 2] = [
            ("duckduckgo", DUCKDUCKGO_URL, parse_duckduckgo),
            ("google", GOOGLE_URL, parse_google),
        ];

        for (name, url, parse) in engines {
            match self.fetch(url, query) {
                Ok(html) => {
                    let hits = parse(&html, max_results);
                    if !hits.is_empty() {
                        info!(engine = name, hits = hits.len(), "web search succeeded");
                        return Ok(hits);
                    }
                    debug!(engine = name, "no results parsed");
                }
                Err(e) => warn!(engine = name, error = %e, "web search request failed"),
            }
        }

        debug!("falling back to simulated results");
        Ok(simulated_hits(query, max_results))
    }
}

/// Extract hits from a DuckDuckGo HTML results page.
pub fn parse_duckduckgo(html: &str, max_results: usize) -> Vec<SearchHit> {
    let Some(css) = ResultSelectors::new(".result", ".result__a", ".result__a", ".result__snippet")
    else {
        return Vec::new();
    };
    css.extract(&Html::parse_document(html), max_results, |_| true)
}

/// Extract hits from a Google results page. Only absolute links are kept.
pub fn parse_google(html: &str, max_results: usize) -> Vec<SearchHit> {
    let Some(css) = ResultSelectors::new("div.g, div.tF2Cxc", "h3", "a[href]", "div.VwiC3b, div.yXK7lf")
    else {
        return Vec::new();
    };
    css.extract(&Html::parse_document(html), max_results, |hit| {
        hit.url.starts_with("http")
    })
}

/// Placeholder hits used when every real engine came back empty.
pub fn simulated_hits(query: &str, max_results: usize) -> Vec<SearchHit> {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    vec![
        SearchHit {
            title: format!("Informações sobre {query}"),
            snippet: format!(
                "Informação relevante sobre {query}. Este é um resultado simulado para demonstração."
            ),
            url: format!("https://exemplo.com/info/{encoded}"),
        },
        SearchHit {
            title: format!("{query} - Wikipédia"),
            snippet: format!(
                "Segundo a Wikipédia, {query} é um tópico importante com várias características interessantes."
            ),
            url: format!("https://pt.wikipedia.org/wiki/{encoded}"),
        },
    ]
    .into_iter()
    .take(max_results)
    .collect()
}

struct ResultSelectors {
    result: Selector,
    title: Selector,
    link: Selector,
    snippet: Selector,
}

impl ResultSelectors {
    fn new(result: &str, title: &str, link: &str, snippet: &str) -> Option<Self> {
        Some(ResultSelectors {
            result: Selector::parse(result).ok()?,
            title: Selector::parse(title).ok()?,
            link: Selector::parse(link).ok()?,
            snippet: Selector::parse(snippet).ok()?,
        })
    }

    fn extract(
        &self,
        document: &Html,
        max_results: usize,
        keep: impl Fn(&SearchHit) -> bool,
    ) -> Vec<SearchHit> {
        document
            .select(&self.result)
            .filter_map(|block| {
                let title = block.select(&self.title).next().map(element_text)?;
                let url = block
                    .select(&self.link)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(absolute_url)
                    .unwrap_or_default();
                let snippet = block
                    .select(&self.snippet)
                    .next()
                    .map(element_text)
                    .unwrap_or_default();
                (!title.is_empty()).then_some(SearchHit { title, snippet, url })
            })
            .filter(|hit| keep(hit))
            .take(max_results)
            .collect()
    }
}

/// Visible text of an element with whitespace runs collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// DuckDuckGo emits protocol-relative redirect links.
fn absolute_url(href: &str) -> String {
    match href.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DDG_PAGE: &str = r#"
        <html><body>
          <div class="result">
            <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.org">Fotossíntese &amp; luz</a></h2>
            <a class="result__snippet">Processo   pelo qual
              plantas produzem energia.</a>
          </div>
          <div class="result">
            <h2><a class="result__a" href="https://second.example">Segundo</a></h2>
          </div>
          <div class="result">
            <h2><a class="result__a" href="https://third.example">Terceiro</a></h2>
            <a class="result__snippet">Mais um.</a>
          </div>
        </body></html>"#;

    const GOOGLE_PAGE: &str = r#"
        <html><body>
          <div class="g">
            <a href="/url?q=relative"><h3>Relative link</h3></a>
          </div>
          <div class="g">
            <a href="https://pt.wikipedia.org/wiki/Fotoss%C3%ADntese"><h3>Fotossíntese - Wikipédia</h3></a>
            <div class="VwiC3b">A fotossíntese é um processo físico-químico.</div>
          </div>
        </body></html>"#;

    #[test]
    fn parses_duckduckgo_results() {
        let hits = parse_duckduckgo(DDG_PAGE, 5);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Fotossíntese & luz");
        assert_eq!(hits[0].snippet, "Processo pelo qual plantas produzem energia.");
        assert_eq!(
            hits[0].url,
            "https://duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.org"
        );
        assert_eq!(hits[1].snippet, "");
        assert_eq!(hits[1].url, "https://second.example");
    }

    #[test]
    fn duckduckgo_respects_max_results() {
        assert_eq!(parse_duckduckgo(DDG_PAGE, 2).len(), 2);
        assert!(parse_duckduckgo(DDG_PAGE, 0).is_empty());
    }

    #[test]
    fn parses_google_results_keeping_absolute_links() {
        let hits = parse_google(GOOGLE_PAGE, 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Fotossíntese - Wikipédia");
        assert_eq!(hits[0].snippet, "A fotossíntese é um processo físico-químico.");
        assert!(hits[0].url.starts_with("https://pt.wikipedia.org"));
    }

    #[test]
    fn unrelated_page_has_no_hits() {
        assert!(parse_duckduckgo("<html><p>nothing</p></html>", 3).is_empty());
        assert!(parse_google("", 3).is_empty());
    }

    #[test]
    fn simulated_hits_encode_query() {
        let hits = simulated_hits("buraco negro", 3);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://exemplo.com/info/buraco+negro");
        assert_eq!(hits[1].title, "buraco negro - Wikipédia");
        assert_eq!(simulated_hits("x", 1).len(), 1);
    }
}
