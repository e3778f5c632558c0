use forumsage_core::types::RelevanceHit;

/// Number of top hits rendered into the shared context.
pub const CONTEXT_HITS: usize = 5;
/// Body characters kept per hit.
pub const BODY_PREVIEW_CHARS: usize = 500;

/// Render the top hits into the single context string sent to every
/// responder. Hits are expected in relevance order.
pub fn build_context(hits: &[RelevanceHit]) -> String {
    hits.iter()
        .take(CONTEXT_HITS)
        .map(|hit| {
            let thread = &hit.thread;
            let preview: String = thread.body.chars().take(BODY_PREVIEW_CHARS).collect();
            format!(
                "\nThread: {}\nAuthor: {}\nCategory: {}\nContent: {}...\nRelevance Score: {}\nURL: {}\n",
                thread.title, thread.author, hit.category, preview, hit.score, thread.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
