//! Per-user comment aggregation and ranking.
//!
//! The aggregator consumes post records, walks each post's comment tree,
//! and maintains one [`User`] per distinct commenter. It performs no I/O
//! and is meant to live for exactly one scrape run.

use crate::config::ScrapeConfig;
use crate::models::{CommentKind, CommentRecord, PostRecord, User};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by the aggregator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// A required configuration field was absent at construction.
    #[error("missing required configuration field `{field}`")]
    Configuration { field: &'static str },

    /// A read operation was invoked before any aggregate pass.
    #[error("no comments have been aggregated yet; run an aggregate pass first")]
    NoData,

    /// `top_commenters` was asked for a slice outside `[1, population]`.
    #[error("requested top {requested} commenters, but the population is {population}")]
    Range { requested: usize, population: usize },
}

/// Aggregates comment threads into per-user counts.
///
/// The user map is freshly allocated per instance; nothing is shared
/// between independently constructed aggregators. A single instance is
/// not meant to be used from multiple threads; callers scraping
/// independent sources concurrently should build one aggregator each and
/// merge the results themselves.
#[derive(Debug)]
pub struct CommentAggregator {
    /// Commenter ids excluded from aggregation entirely.
    spam: HashSet<String>,
    /// Page identifiers, held for the scraping collaborator and not
    /// interpreted here.
    sources: Vec<String>,
    /// All users seen so far, keyed by commenter id.
    users: HashMap<String, User>,
    /// Commenter ids in first-seen order, for deterministic tie-breaking.
    order: Vec<String>,
    /// Ids sorted by descending total, `None` until a pass completes.
    ranked: Option<Vec<String>>,
}

impl CommentAggregator {
    /// Build an aggregator from the scrape configuration.
    ///
    /// Both `sources` and `spam` must be present in the configuration,
    /// otherwise this fails with [`AggregateError::Configuration`].
    pub fn new(config: &ScrapeConfig) -> Result<Self, AggregateError> {
        let sources = config
            .sources
            .clone()
            .ok_or(AggregateError::Configuration { field: "sources" })?;
        let spam = config
            .spam
            .clone()
            .ok_or(AggregateError::Configuration { field: "spam" })?;

        Ok(Self {
            spam: spam.into_iter().collect(),
            sources,
            users: HashMap::new(),
            order: Vec::new(),
            ranked: None,
        })
    }

    /// Page identifiers to hand to the scraping collaborator.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Number of distinct non-spam commenters seen so far.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Look up a user by commenter id.
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    /// Fold a batch of posts into the aggregate and recompute the ranking.
    ///
    /// Calls are cumulative: each batch adds to the state built by earlier
    /// calls, so one aggregator can absorb posts from several sources.
    /// The flip side is that resubmitting an already-processed post would
    /// double count it; callers must supply each post at most once over
    /// the aggregator's lifetime.
    pub fn aggregate(&mut self, posts: &[PostRecord]) {
        for post in posts {
            self.walk_comments(&post.comments);
        }

        self.rank();
        debug!(
            users = self.users.len(),
            "aggregated {} post(s)",
            posts.len()
        );
    }

    /// Depth-first walk over a post's comment tree.
    ///
    /// Uses an explicit stack so pathological thread depth cannot overflow
    /// the call stack. Top-level entries count as comments, everything
    /// nested below them as replies.
    fn walk_comments(&mut self, comments: &[CommentRecord]) {
        let mut stack: Vec<(&CommentRecord, CommentKind)> = comments
            .iter()
            .rev()
            .map(|c| (c, CommentKind::Comment))
            .collect();

        while let Some((record, kind)) = stack.pop() {
            if self.spam.contains(&record.commenter_id) {
                // Spam prunes the entire subtree: replies under a spam
                // comment are skipped no matter who wrote them.
                continue;
            }

            if !self.users.contains_key(&record.commenter_id) {
                // Name is captured here and never updated afterwards.
                self.order.push(record.commenter_id.clone());
                self.users.insert(
                    record.commenter_id.clone(),
                    User::new(&record.commenter_id, &record.commenter_name),
                );
            }
            if let Some(user) = self.users.get_mut(&record.commenter_id) {
                user.add_comment(&record.comment_id, &record.text, kind);
            }

            for reply in record.replies.iter().rev() {
                stack.push((reply, CommentKind::Reply));
            }
        }
    }

    /// Recompute the ranking: descending by total count, ties broken by
    /// first-seen order (the sort is stable over the insertion sequence).
    fn rank(&mut self) {
        let mut ids = self.order.clone();
        ids.sort_by_key(|id| Reverse(self.users.get(id).map(User::total).unwrap_or(0)));
        self.ranked = Some(ids);
    }

    /// Total number of distinct comments and replies across all users.
    ///
    /// Fails with [`AggregateError::NoData`] before the first aggregate
    /// pass; a completed pass that found nothing returns `Ok(0)`.
    pub fn total_comment_count(&self) -> Result<usize, AggregateError> {
        if self.ranked.is_none() {
            return Err(AggregateError::NoData);
        }

        Ok(self.users.values().map(User::total).sum())
    }

    /// The `n` most active commenters, most active first.
    ///
    /// `n` must lie in `[1, user_count()]`; anything outside is rejected
    /// with [`AggregateError::Range`] rather than clamped.
    pub fn top_commenters(&self, n: usize) -> Result<Vec<&User>, AggregateError> {
        let ranked = self.ranked.as_ref().ok_or(AggregateError::NoData)?;
        let population = ranked.len();

        if n < 1 || n > population {
            return Err(AggregateError::Range {
                requested: n,
                population,
            });
        }

        Ok(ranked[..n]
            .iter()
            .filter_map(|id| self.users.get(id))
            .collect())
    }

    /// Pick a quotable comment for a user, at random.
    ///
    /// Scans the user's comments in uniformly shuffled order and returns
    /// the first whose quoted form, surrounding quote marks included, fits
    /// within `max_length` characters. Returns `None` when nothing fits.
    /// Callers needing determinism should pass a seeded RNG.
    pub fn sample_quotable_comment<R: Rng>(
        &self,
        user: &User,
        max_length: usize,
        rng: &mut R,
    ) -> Option<String> {
        let mut candidates: Vec<_> = user.comments().collect();
        candidates.shuffle(rng);

        candidates
            .into_iter()
            .map(|c| format!("\"{}\"", c.text))
            .find(|quoted| quoted.chars().count() <= max_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scrape_config(sources: &[&str], spam: &[&str]) -> ScrapeConfig {
        ScrapeConfig {
            sources: Some(sources.iter().map(|s| s.to_string()).collect()),
            spam: Some(spam.iter().map(|s| s.to_string()).collect()),
            ..ScrapeConfig::default()
        }
    }

    fn comment(id: &str, name: &str, comment_id: &str, text: &str) -> CommentRecord {
        CommentRecord {
            commenter_id: id.to_string(),
            commenter_name: name.to_string(),
            comment_id: comment_id.to_string(),
            text: text.to_string(),
            replies: Vec::new(),
        }
    }

    fn reply_under(mut parent: CommentRecord, reply: CommentRecord) -> CommentRecord {
        parent.replies.push(reply);
        parent
    }

    fn post(comments: Vec<CommentRecord>) -> PostRecord {
        PostRecord {
            time: Utc::now(),
            comments,
        }
    }

    /// Two posts: alice comments on A, bob replies to her, alice comments
    /// again on B under a different comment id.
    fn two_post_fixture() -> Vec<PostRecord> {
        let thread = reply_under(
            comment("u1", "alice", "c1", "interesting take"),
            comment("u2", "bob", "r1", "disagree entirely"),
        );
        vec![
            post(vec![thread]),
            post(vec![comment("u1", "alice", "c2", "more thoughts")]),
        ]
    }

    #[test]
    fn test_new_requires_sources() {
        let mut config = scrape_config(&["mbl.is"], &[]);
        config.sources = None;

        let err = CommentAggregator::new(&config).unwrap_err();
        assert_eq!(err, AggregateError::Configuration { field: "sources" });
    }

    #[test]
    fn test_new_requires_spam() {
        let mut config = scrape_config(&["mbl.is"], &[]);
        config.spam = None;

        let err = CommentAggregator::new(&config).unwrap_err();
        assert_eq!(err, AggregateError::Configuration { field: "spam" });
    }

    #[test]
    fn test_no_data_before_first_aggregate() {
        let agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();

        assert_eq!(agg.total_comment_count(), Err(AggregateError::NoData));
        assert!(matches!(agg.top_commenters(1), Err(AggregateError::NoData)));
    }

    #[test]
    fn test_empty_pass_returns_zero_not_no_data() {
        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();
        agg.aggregate(&[]);

        assert_eq!(agg.total_comment_count(), Ok(0));
    }

    #[test]
    fn test_end_to_end_two_posts() {
        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();
        agg.aggregate(&two_post_fixture());

        assert_eq!(agg.total_comment_count(), Ok(3));

        let top = agg.top_commenters(1).unwrap();
        assert_eq!(top[0].id, "u1");
        assert_eq!(top[0].total(), 2);
        assert_eq!(top[0].comment_count, 2);
        assert_eq!(top[0].reply_count, 0);
    }

    #[test]
    fn test_total_counts_distinct_commenter_comment_pairs() {
        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();

        // Same comment id delivered twice for the same user.
        agg.aggregate(&[
            post(vec![comment("u1", "alice", "c1", "first")]),
            post(vec![comment("u1", "alice", "c1", "edited")]),
        ]);

        assert_eq!(agg.total_comment_count(), Ok(1));
        assert_eq!(agg.user("u1").unwrap().total(), 1);
    }

    #[test]
    fn test_spam_user_is_never_created() {
        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &["u2"])).unwrap();
        agg.aggregate(&two_post_fixture());

        assert_eq!(agg.total_comment_count(), Ok(2));
        assert!(agg.user("u2").is_none());
    }

    #[test]
    fn test_spam_subtree_is_pruned_entirely() {
        // A non-spam reply nested under a spam top-level comment must not
        // be counted either.
        let thread = reply_under(
            comment("spammer", "Spam Co", "c1", "buy now"),
            comment("u1", "alice", "r1", "please stop"),
        );

        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &["spammer"])).unwrap();
        agg.aggregate(&[post(vec![thread])]);

        assert_eq!(agg.total_comment_count(), Ok(0));
        assert!(agg.user("u1").is_none());
    }

    #[test]
    fn test_deeply_nested_replies_all_count_as_replies() {
        let thread = reply_under(
            comment("u1", "alice", "c1", "root"),
            reply_under(
                comment("u2", "bob", "r1", "depth one"),
                comment("u3", "carol", "r2", "depth two"),
            ),
        );

        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();
        agg.aggregate(&[post(vec![thread])]);

        assert_eq!(agg.user("u1").unwrap().comment_count, 1);
        assert_eq!(agg.user("u2").unwrap().reply_count, 1);
        assert_eq!(agg.user("u3").unwrap().reply_count, 1);
        assert_eq!(agg.total_comment_count(), Ok(3));
    }

    #[test]
    fn test_ranking_is_descending_with_stable_ties() {
        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();
        agg.aggregate(&[post(vec![
            comment("u1", "alice", "c1", "one"),
            comment("u2", "bob", "c2", "two"),
            comment("u2", "bob", "c3", "three"),
            comment("u3", "carol", "c4", "four"),
        ])]);

        let top = agg.top_commenters(3).unwrap();
        assert_eq!(top[0].id, "u2");
        // u1 and u3 both have one comment; u1 was seen first.
        assert_eq!(top[1].id, "u1");
        assert_eq!(top[2].id, "u3");

        for pair in top.windows(2) {
            assert!(pair[0].total() >= pair[1].total());
        }
    }

    #[test]
    fn test_top_commenters_rejects_out_of_range() {
        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();
        agg.aggregate(&two_post_fixture());

        assert_eq!(
            agg.top_commenters(0),
            Err(AggregateError::Range {
                requested: 0,
                population: 2
            })
        );
        assert_eq!(
            agg.top_commenters(3),
            Err(AggregateError::Range {
                requested: 3,
                population: 2
            })
        );
    }

    #[test]
    fn test_aggregate_is_cumulative_across_calls() {
        let posts = two_post_fixture();
        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();

        agg.aggregate(&posts[..1]);
        assert_eq!(agg.total_comment_count(), Ok(2));

        agg.aggregate(&posts[1..]);
        assert_eq!(agg.total_comment_count(), Ok(3));
    }

    #[test]
    fn test_display_name_is_set_once() {
        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();
        agg.aggregate(&[
            post(vec![comment("u1", "alice", "c1", "hi")]),
            post(vec![comment("u1", "Alice B.", "c2", "hello again")]),
        ]);

        assert_eq!(agg.user("u1").unwrap().name, "alice");
        assert_eq!(agg.user("u1").unwrap().total(), 2);
    }

    #[test]
    fn test_fresh_instances_share_no_state() {
        let config = scrape_config(&["mbl.is"], &[]);
        let mut first = CommentAggregator::new(&config).unwrap();
        first.aggregate(&two_post_fixture());

        let second = CommentAggregator::new(&config).unwrap();
        assert_eq!(second.user_count(), 0);
        assert_eq!(second.total_comment_count(), Err(AggregateError::NoData));
    }

    #[test]
    fn test_sample_quotable_comment_fits_budget() {
        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();
        agg.aggregate(&[post(vec![
            comment("u1", "alice", "c1", "short"),
            comment("u1", "alice", "c2", "a considerably longer remark"),
        ])]);

        let user = agg.user("u1").unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        // Only "short" fits once the quote marks are counted.
        let quote = agg.sample_quotable_comment(user, 7, &mut rng).unwrap();
        assert_eq!(quote, "\"short\"");
    }

    #[test]
    fn test_sample_quotable_comment_none_fit() {
        let mut agg = CommentAggregator::new(&scrape_config(&["mbl.is"], &[])).unwrap();
        agg.aggregate(&[post(vec![comment("u1", "alice", "c1", "too long")])]);

        let user = agg.user("u1").unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        // "too long" quoted is 10 chars; a budget of 9 excludes everything.
        assert!(agg.sample_quotable_comment(user, 9, &mut rng).is_none());
    }
}
