//! Summary text composition.
//!
//! Builds the payload the bot publishes: total comment count, the most
//! active commenter, and a sampled quote when one fits the remaining
//! character budget.

use crate::aggregate::{AggregateError, CommentAggregator};
use rand::Rng;

/// Compose the summary post, bounded by `max_post_length` characters.
///
/// Requires a completed aggregate pass (otherwise [`AggregateError::NoData`]
/// propagates from the count query). A run that found no commenters still
/// produces a payload, just without a leaderboard line.
pub fn compose_summary<R: Rng>(
    aggregator: &CommentAggregator,
    days_back: i64,
    max_post_length: usize,
    rng: &mut R,
) -> Result<String, AggregateError> {
    let total = aggregator.total_comment_count()?;

    if aggregator.user_count() == 0 {
        return Ok(clip_chars(
            format!("No comments found in the last {} day(s).", days_back),
            max_post_length,
        ));
    }

    let top = aggregator.top_commenters(1)?[0];
    let mut summary = format!(
        "{} comments in the last {} day(s). Most active: {} with {}.",
        total,
        days_back,
        top.name,
        top.total()
    );

    // Spend whatever budget remains on a quote, minus the separating space.
    let used = summary.chars().count();
    if used + 1 < max_post_length {
        let budget = max_post_length - used - 1;
        if let Some(quote) = aggregator.sample_quotable_comment(top, budget, rng) {
            summary.push(' ');
            summary.push_str(&quote);
        }
    }

    Ok(clip_chars(summary, max_post_length))
}

/// Hard cap in characters, guarding against oversized display names.
fn clip_chars(text: String, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text
    } else {
        text.chars().take(max_length).collect()
    }
}
