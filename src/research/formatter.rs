//! Rendering of collected sources for the model and for the reader
//!
//! Sources carry their session-global citation number (`num_source`). The
//! model cites them as `[n]`; [`linkify_sources`] later keeps only the cited
//! ones and renumbers them densely.

use crate::types::SearchResult;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

const SECTION_RULE: usize = 80;

/// Approximate characters per token when capping source content
pub const CHARS_PER_TOKEN: usize = 4;

fn citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("citation regex must compile"))
}

fn citation_number(source: &SearchResult, fallback: usize) -> usize {
    source.num_source.unwrap_or(fallback)
}

/// Render sources as delimited blocks for the summarization prompt.
///
/// Full content, when included, is capped at `max_tokens_per_source × 4`
/// characters and marked when truncated.
pub fn format_for_model(
    sources: &[SearchResult],
    include_full_content: bool,
    max_tokens_per_source: usize,
) -> String {
    let major = "=".repeat(SECTION_RULE);
    let minor = "-".repeat(SECTION_RULE);
    let char_limit = max_tokens_per_source.saturating_mul(CHARS_PER_TOKEN);

    let mut text = String::from("Sources content:\n");
    for (i, source) in sources.iter().enumerate() {
        text.push_str(&format!("{}\n", major));
        text.push_str(&format!(
            "[{}] Source: {}\n",
            citation_number(source, i + 1),
            source.title
        ));
        text.push_str(&format!("{}\n", minor));
        text.push_str(&format!("URL: {}\n===\n", source.url));
        text.push_str(&format!(
            "Most relevant content from source: {}\n===\n",
            source.snippet
        ));

        if include_full_content {
            let content = source.content();
            if content.chars().count() > char_limit {
                let truncated: String = content.chars().take(char_limit).collect();
                text.push_str(&format!(
                    "Full source content limited to {} tokens: {}... [truncated]\n\n",
                    max_tokens_per_source, truncated
                ));
            } else {
                text.push_str(&format!("Full source content: {}\n\n", content));
            }
        }
        text.push_str(&format!("{}\n\n", major));
    }

    text.trim().to_string()
}

/// Numbered reference list, one `<a href="URL">[n]</a> Title` entry per
/// source separated by blank lines.
pub fn format_citation_list(sources: &[SearchResult]) -> String {
    render_citations(sources, false)
}

/// Reference list with each source's snippet after its title
pub fn format_citation_list_with_snippets(sources: &[SearchResult]) -> String {
    render_citations(sources, true)
}

fn render_citations(sources: &[SearchResult], include_snippet: bool) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let entry = format!(
                "<a href=\"{}\">[{}]</a> {}",
                source.url,
                citation_number(source, i + 1),
                source.title
            );
            if include_snippet {
                format!("{} - {}", entry, source.snippet)
            } else {
                entry
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Citation numbers in order of first appearance, without repeats
pub fn cited_numbers(text: &str) -> Vec<usize> {
    let mut numbers = Vec::new();
    for caps in citation_re().captures_iter(text) {
        if let Ok(n) = caps[1].parse::<usize>() {
            if !numbers.contains(&n) {
                numbers.push(n);
            }
        }
    }
    numbers
}

/// Rewrite `[n]` markers as links to the cited sources.
///
/// Only sources cited in `text` are kept; they are renumbered from 1 in order
/// of first citation and returned in that order. Markers that match no
/// source are left unchanged.
pub fn linkify_sources(text: &str, sources: &[SearchResult]) -> (String, Vec<SearchResult>) {
    let by_number: HashMap<usize, &SearchResult> = sources
        .iter()
        .filter_map(|s| s.num_source.map(|n| (n, s)))
        .collect();

    let mut renumbered: HashMap<usize, usize> = HashMap::new();
    let mut used: Vec<SearchResult> = Vec::new();
    for old in cited_numbers(text) {
        if let Some(source) = by_number.get(&old) {
            let new = used.len() + 1;
            renumbered.insert(old, new);
            let mut entry = (*source).clone();
            entry.num_source = Some(new);
            used.push(entry);
        }
    }

    let linked = citation_re().replace_all(text, |caps: &Captures| {
        let new = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|old| renumbered.get(&old).copied());
        match new {
            Some(n) => format!("<a href=\"{}\">[{}]</a>", used[n - 1].url, n),
            None => caps[0].to_string(),
        }
    });

    (linked.into_owned(), used)
}
