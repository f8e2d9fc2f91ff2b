use crate::cache::DetailTicket;
use crate::chart::ChartTicket;
use crate::error::Result;
use crate::models::{BotDetail, Candle, NewsReport, Signal, StatusResponse};

/// Fetch completions delivered to the app loop. Every variant carries the
/// sequence number or ticket of the request that produced it.
#[derive(Debug)]
pub enum AppEvent {
    StatusPolled {
        seq: u64,
        result: Result<StatusResponse>,
    },
    RecommendationsPolled {
        seq: u64,
        result: Result<Vec<Signal>>,
    },
    NewsLoaded {
        seq: u64,
        result: Result<NewsReport>,
    },
    DetailLoaded {
        ticket: DetailTicket,
        result: Result<BotDetail>,
    },
    ChartLoaded {
        ticket: ChartTicket,
        result: Result<Vec<Candle>>,
    },
}
