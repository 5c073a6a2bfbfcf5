//! The fixed fallback set.
//!
//! Three sample articles served whenever the live source cannot be
//! reached or returns something unusable, and by [`SampleSource`] when
//! the application runs with `--offline`.

use super::{Article, ArticleSource};

/// The three sample articles, in display order.
pub fn sample_articles() -> Vec<Article> {
    vec![
        Article::new(
            1,
            "Economics",
            "Economics is the social science that studies the production, distribution, and \
             consumption of goods and services. Economics focuses on the behavior and \
             interactions of economic agents and how economies work.",
            "https://en.wikipedia.org/wiki/Economics",
        )
        .with_description("Social science studying production, distribution, and consumption")
        .with_categories(["Economics", "Social sciences"]),
        Article::new(
            2,
            "Physics",
            "Physics is the natural science that studies matter, its motion and behavior \
             through space and time, and the related entities of energy and force. Physics is \
             one of the most fundamental scientific disciplines.",
            "https://en.wikipedia.org/wiki/Physics",
        )
        .with_description("Natural science studying matter and energy")
        .with_categories(["Physics", "Natural sciences"]),
        Article::new(
            3,
            "Mathematics",
            "Mathematics is the science that deals with the logic of shape, quantity and \
             arrangement. Math is all around us, in everything we do. It is the building block \
             for everything in our daily lives.",
            "https://en.wikipedia.org/wiki/Mathematics",
        )
        .with_description("Science of numbers, shapes, and patterns")
        .with_categories(["Mathematics", "Formal sciences"]),
    ]
}

/// Fallback for a category request: the sample set, truncated.
pub fn for_category(page_size: usize) -> Vec<Article> {
    let mut articles = sample_articles();
    articles.truncate(page_size);
    articles
}

/// Fallback for a text search: samples whose title or extract contain
/// `query`, truncated.
pub fn for_search(query: &str, page_size: usize) -> Vec<Article> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    sample_articles()
        .into_iter()
        .filter(|a| a.matches_text(query))
        .take(page_size)
        .collect()
}

/// An [`ArticleSource`] that only ever serves the sample set.
///
/// Page 1 gets the samples; later pages are empty so the feed ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct SampleSource;

impl ArticleSource for SampleSource {
    fn name(&self) -> &str {
        "samples"
    }

    async fn fetch_by_category(&self, _category: &str, page: u32, page_size: usize) -> Vec<Article> {
        if page > 1 {
            return Vec::new();
        }
        for_category(page_size)
    }

    async fn search_by_text(&self, query: &str, page: u32, page_size: usize) -> Vec<Article> {
        if page > 1 {
            return Vec::new();
        }
        for_search(query, page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn category_fallback_is_the_three_samples() {
        assert_eq!(titles(&for_category(10)), vec!["Economics", "Physics", "Mathematics"]);
    }

    #[test]
    fn category_fallback_respects_small_page_size() {
        assert_eq!(titles(&for_category(2)), vec!["Economics", "Physics"]);
        assert!(for_category(0).is_empty());
    }

    #[test]
    fn search_fallback_filters_by_title_and_extract() {
        assert_eq!(titles(&for_search("physics", 10)), vec!["Physics"]);
        // "science" appears in every extract.
        assert_eq!(for_search("SCIENCE", 10).len(), 3);
        assert!(for_search("volcano", 10).is_empty());
    }

    #[test]
    fn search_fallback_ignores_blank_query() {
        assert!(for_search("   ", 10).is_empty());
    }

    #[tokio::test]
    async fn sample_source_ends_after_first_page() {
        let source = SampleSource;
        assert_eq!(source.fetch_by_category("all", 1, 15).await.len(), 3);
        assert!(source.fetch_by_category("all", 2, 15).await.is_empty());
        assert_eq!(source.search_by_text("math", 1, 15).await.len(), 1);
    }
}
