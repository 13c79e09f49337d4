use scraper::{Html, Selector};
use tracing::{event, instrument, Level};
use url::{ParseError, Url};

#[instrument]
/// Get the full link to a page or image, given the url it was found relative to.
pub fn get_full_link(link: &str, base_url: &Url) -> Option<Url> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    let joined = match Url::parse(link) {
        Ok(url) => return Some(url),
        Err(e)
            if e == ParseError::EmptyHost
                || e == ParseError::RelativeUrlWithoutBase
                || e == ParseError::RelativeUrlWithCannotBeABaseBase =>
        {
            base_url.join(link)
        }
        Err(e) => Err(e),
    };
    match joined {
        Ok(url) => Some(url),
        Err(e) => {
            event!(Level::ERROR, "Failed to get full link for {}", link);
            event!(Level::ERROR, "{}", e);
            None
        }
    }
}

/// Values of `attribute` on every element matching `selector`, resolved
/// against `base_url`, in document order. Elements without the attribute
/// and values that can't be resolved are skipped.
pub fn select_links(
    html_string: &str,
    selector: &Selector,
    attribute: &str,
    base_url: &Url,
) -> Vec<Url> {
    let html_document = Html::parse_document(html_string);
    html_document
        .select(selector)
        .filter_map(|element| element.value().attr(attribute))
        .filter_map(|relative_link| {
            let full_link = get_full_link(relative_link, base_url)?;
            tracing::debug!("Full link for {} => {}", relative_link, &full_link);
            Some(full_link)
        })
        .collect()
}
