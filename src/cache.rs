//! Last-known-good copies of everything the dashboard polls or fetches.
//!
//! Entries are swapped as whole `Arc`s, so a reader holding a clone never
//! sees a half-applied update. Poll results carry a per-stream sequence number
//! and a result older than the one already applied is dropped.

use crate::models::{Bot, BotDetail, InvestigatorLog, Signal, StatusResponse};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Identifies one detail fetch. Handed out by [`BotDirectoryCache::request_detail`]
/// and presented again when the response arrives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailTicket {
    pub bot_id: String,
    pub seq: u64,
}

#[derive(Default)]
pub struct BotDirectoryCache {
    roster: Arc<Vec<Bot>>,
    investigator_logs: Arc<Vec<InvestigatorLog>>,
    recommendations: Arc<Vec<Signal>>,
    details: HashMap<String, Arc<BotDetail>>,
    in_flight: HashMap<String, u64>,
    next_detail_seq: u64,
    status_seq: Option<u64>,
    recommendations_seq: Option<u64>,
    last_refresh: Option<DateTime<Utc>>,
}

impl BotDirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known leaderboard, in backend rank order. Empty until the first
    /// successful poll.
    pub fn roster(&self) -> Arc<Vec<Bot>> {
        Arc::clone(&self.roster)
    }

    pub fn investigator_logs(&self) -> Arc<Vec<InvestigatorLog>> {
        Arc::clone(&self.investigator_logs)
    }

    /// Approved recommendations, newest first.
    pub fn recommendations(&self) -> Arc<Vec<Signal>> {
        Arc::clone(&self.recommendations)
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Applies a status poll. Returns `false` when `seq` is not newer than the
    /// last applied status poll.
    pub fn apply_status(&mut self, seq: u64, status: StatusResponse) -> bool {
        if self.status_seq.is_some_and(|applied| seq <= applied) {
            debug!("Dropping stale status poll #{}", seq);
            return false;
        }
        self.status_seq = Some(seq);
        self.roster = Arc::new(status.leaderboard);
        self.investigator_logs = Arc::new(status.investigator_logs);
        self.last_refresh = Some(Utc::now());
        true
    }

    /// Applies a recommendations poll; the feed is stored newest-first.
    pub fn apply_recommendations(&mut self, seq: u64, mut recs: Vec<Signal>) -> bool {
        if self.recommendations_seq.is_some_and(|applied| seq <= applied) {
            debug!("Dropping stale recommendations poll #{}", seq);
            return false;
        }
        self.recommendations_seq = Some(seq);
        recs.reverse();
        self.recommendations = Arc::new(recs);
        self.last_refresh = Some(Utc::now());
        true
    }

    pub fn detail(&self, bot_id: &str) -> Option<Arc<BotDetail>> {
        self.details.get(bot_id).cloned()
    }

    /// Starts a detail fetch for `bot_id`. Returns `None` while another fetch
    /// for the same id is still in flight; that fetch's result will be used.
    pub fn request_detail(&mut self, bot_id: &str) -> Option<DetailTicket> {
        if let Some(seq) = self.in_flight.get(bot_id) {
            debug!("Detail fetch for {} already in flight (#{})", bot_id, seq);
            return None;
        }
        self.next_detail_seq += 1;
        let seq = self.next_detail_seq;
        self.in_flight.insert(bot_id.to_string(), seq);
        Some(DetailTicket {
            bot_id: bot_id.to_string(),
            seq,
        })
    }

    /// Ticket of the fetch currently in flight for `bot_id`, if any.
    pub fn pending_detail(&self, bot_id: &str) -> Option<DetailTicket> {
        self.in_flight.get(bot_id).map(|&seq| DetailTicket {
            bot_id: bot_id.to_string(),
            seq,
        })
    }

    /// Stores a fetched detail. Returns the stored entry, or `None` if the
    /// ticket no longer matches the in-flight fetch for that bot.
    pub fn apply_detail(&mut self, ticket: &DetailTicket, detail: BotDetail) -> Option<Arc<BotDetail>> {
        if self.in_flight.get(&ticket.bot_id) != Some(&ticket.seq) {
            debug!("Dropping detail response #{} for {}", ticket.seq, ticket.bot_id);
            return None;
        }
        self.in_flight.remove(&ticket.bot_id);
        let detail = Arc::new(detail);
        self.details.insert(ticket.bot_id.clone(), Arc::clone(&detail));
        info!("Cached detail for {} ({} signals)", ticket.bot_id, detail.signals.len());
        Some(detail)
    }

    /// Clears the in-flight marker after a failed fetch; any cached entry stays.
    pub fn fail_detail(&mut self, ticket: &DetailTicket) {
        if self.in_flight.get(&ticket.bot_id) == Some(&ticket.seq) {
            self.in_flight.remove(&ticket.bot_id);
        }
    }

    pub fn invalidate_detail(&mut self, bot_id: &str) {
        self.details.remove(bot_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bot, BotStats};

    fn bots(ids: &[&str]) -> StatusResponse {
        StatusResponse {
            leaderboard: ids
                .iter()
                .map(|id| Bot { id: id.to_string(), ..Default::default() })
                .collect(),
            investigator_logs: Vec::new(),
        }
    }

    fn detail(id: &str) -> BotDetail {
        BotDetail {
            profile: Bot { id: id.to_string(), ..Default::default() },
            stats: BotStats::default(),
            signals: Vec::new(),
        }
    }

    #[test]
    fn test_roster_empty_until_first_poll() {
        let cache = BotDirectoryCache::new();
        assert!(cache.roster().is_empty());
        assert!(cache.last_refresh().is_none());
    }

    #[test]
    fn test_late_status_poll_is_dropped() {
        let mut cache = BotDirectoryCache::new();
        assert!(cache.apply_status(2, bots(&["new"])));
        assert!(!cache.apply_status(1, bots(&["old"])));
        assert_eq!(cache.roster()[0].id, "new");
    }

    #[test]
    fn test_reader_keeps_its_snapshot() {
        let mut cache = BotDirectoryCache::new();
        cache.apply_status(1, bots(&["a", "b"]));
        let before = cache.roster();
        cache.apply_status(2, bots(&["c"]));
        assert_eq!(before.len(), 2);
        assert_eq!(cache.roster().len(), 1);
    }

    #[test]
    fn test_recommendations_stored_newest_first() {
        let mut cache = BotDirectoryCache::new();
        let recs = ["old", "mid", "new"]
            .iter()
            .map(|s| Signal { symbol: s.to_string(), ..Default::default() })
            .collect();
        cache.apply_recommendations(1, recs);
        let symbols: Vec<String> = cache.recommendations().iter().map(|s| s.symbol.clone()).collect();
        assert_eq!(symbols, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_detail_not_requested_twice_in_flight() {
        let mut cache = BotDirectoryCache::new();
        let ticket = cache.request_detail("bot-3").unwrap();
        assert!(cache.request_detail("bot-3").is_none());
        assert_eq!(cache.pending_detail("bot-3"), Some(ticket.clone()));

        assert!(cache.apply_detail(&ticket, detail("bot-3")).is_some());
        assert!(cache.detail("bot-3").is_some());
        // a later view open fetches again
        assert!(cache.request_detail("bot-3").is_some());
    }

    #[test]
    fn test_mismatched_detail_ticket_is_dropped() {
        let mut cache = BotDirectoryCache::new();
        let ticket = cache.request_detail("bot-3").unwrap();
        cache.fail_detail(&ticket);
        let retry = cache.request_detail("bot-3").unwrap();
        assert!(cache.apply_detail(&ticket, detail("bot-3")).is_none());
        assert!(cache.apply_detail(&retry, detail("bot-3")).is_some());
    }

    #[test]
    fn test_failed_fetch_keeps_cached_entry() {
        let mut cache = BotDirectoryCache::new();
        let first = cache.request_detail("bot-1").unwrap();
        cache.apply_detail(&first, detail("bot-1"));
        let second = cache.request_detail("bot-1").unwrap();
        cache.fail_detail(&second);
        assert!(cache.detail("bot-1").is_some());
        cache.invalidate_detail("bot-1");
        assert!(cache.detail("bot-1").is_none());
    }
}
