use crate::error::Result;
use crate::models::{Bot, Candle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartStyle {
    Line,
    Area,
    Candlestick,
}

impl ChartStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartStyle::Line => "Line",
            ChartStyle::Area => "Area",
            ChartStyle::Candlestick => "Candlestick",
        }
    }
}

/// Chart style a bot prefers, from its name and strategy title.
pub fn resolve_style(bot: Option<&Bot>) -> ChartStyle {
    let Some(bot) = bot else {
        return ChartStyle::Candlestick;
    };
    let name = bot.name.to_lowercase();
    let strategy = bot
        .strategy_title
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    if name.contains("investor") || strategy.contains("trend") {
        ChartStyle::Line
    } else if name.contains("sniper") || strategy.contains("technical") {
        ChartStyle::Candlestick
    } else if name.contains("portfolio") {
        ChartStyle::Area
    } else {
        ChartStyle::Candlestick
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartPoint {
    pub time: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChartSeries {
    Points(Vec<ChartPoint>),
    Candles(Vec<Candle>),
}

impl ChartSeries {
    /// Line and area charts plot the close; candlesticks keep full OHLC.
    pub fn shape(style: ChartStyle, candles: Vec<Candle>) -> Self {
        match style {
            ChartStyle::Line | ChartStyle::Area => ChartSeries::Points(
                candles
                    .into_iter()
                    .map(|c| ChartPoint {
                        time: c.time,
                        value: c.close,
                    })
                    .collect(),
            ),
            ChartStyle::Candlestick => ChartSeries::Candles(candles),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChartSeries::Points(p) => p.len(),
            ChartSeries::Candles(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (min, max) over every plotted price.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        let (lo, hi) = match self {
            ChartSeries::Points(points) => points
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.value), hi.max(p.value))),
            ChartSeries::Candles(candles) => candles
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c.low), hi.max(c.high))),
        };
        (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
    }
}

/// The view a chart is drawn into: one signal of one bot's history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartContainer {
    pub bot_id: String,
    pub signal_index: usize,
}

/// A chart fetch handed out by [`ChartAdapter::open`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartTicket {
    pub seq: u64,
    pub container: ChartContainer,
    pub symbol: String,
    pub style: ChartStyle,
}

#[derive(Debug)]
pub struct ChartInstance {
    pub container: ChartContainer,
    pub symbol: String,
    pub style: ChartStyle,
    pub series: ChartSeries,
    seq: u64,
    live: Arc<AtomicUsize>,
}

impl Drop for ChartInstance {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
        debug!("Released chart #{} for {}", self.seq, self.symbol);
    }
}

/// Sole owner of the deal-report chart. At most one instance is alive.
#[derive(Debug, Default)]
pub struct ChartAdapter {
    instance: Option<ChartInstance>,
    pending: Option<ChartTicket>,
    next_seq: u64,
    live: Arc<AtomicUsize>,
}

impl ChartAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases the current chart and starts a new one for `symbol`. The
    /// caller fetches the series and hands it to [`ChartAdapter::complete`].
    pub fn open(&mut self, container: ChartContainer, symbol: &str, style: ChartStyle) -> ChartTicket {
        self.dispose();
        self.next_seq += 1;
        let ticket = ChartTicket {
            seq: self.next_seq,
            container,
            symbol: symbol.to_string(),
            style,
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    /// Builds the chart from a fetch result. Returns `false` if nothing was
    /// created: the ticket was superseded or disposed, the backend had no
    /// data, or the fetch failed.
    pub fn complete(&mut self, ticket: &ChartTicket, fetched: Result<Vec<Candle>>) -> bool {
        if self.pending.as_ref() != Some(ticket) {
            debug!("Dropping chart response #{} for {}", ticket.seq, ticket.symbol);
            return false;
        }
        self.pending = None;

        let candles = match fetched {
            Ok(candles) if !candles.is_empty() => candles,
            Ok(_) => {
                debug!("Chart for {} is empty; skipping", ticket.symbol);
                return false;
            }
            Err(e) => {
                debug!("Chart for {} unavailable: {}", ticket.symbol, e);
                return false;
            }
        };

        self.live.fetch_add(1, Ordering::Relaxed);
        let series = ChartSeries::shape(ticket.style, candles);
        info!(
            "Chart #{} ready: {} {} ({} points)",
            ticket.seq,
            ticket.symbol,
            ticket.style.as_str(),
            series.len()
        );
        self.instance = Some(ChartInstance {
            container: ticket.container.clone(),
            symbol: ticket.symbol.clone(),
            style: ticket.style,
            series,
            seq: ticket.seq,
            live: Arc::clone(&self.live),
        });
        true
    }

    /// Releases the chart and forgets any pending fetch. No-op when idle.
    pub fn dispose(&mut self) {
        self.pending = None;
        self.instance = None;
    }

    pub fn instance(&self) -> Option<&ChartInstance> {
        self.instance.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of chart instances currently alive.
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeskError;

    fn bot(name: &str, strategy: Option<&str>) -> Bot {
        Bot {
            id: "b".into(),
            name: name.into(),
            strategy_title: strategy.map(str::to_string),
            ..Default::default()
        }
    }

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                Candle {
                    time: format!("2025-01-{:02}", i + 1),
                    open: base,
                    high: base + 2.0,
                    low: base - 1.0,
                    close: base + 1.0,
                }
            })
            .collect()
    }

    fn container(idx: usize) -> ChartContainer {
        ChartContainer {
            bot_id: "bot-1".into(),
            signal_index: idx,
        }
    }

    #[test]
    fn test_resolve_style_rules() {
        assert_eq!(resolve_style(Some(&bot("Smart Investor", None))), ChartStyle::Line);
        assert_eq!(resolve_style(Some(&bot("Alpha", Some("Trend Following")))), ChartStyle::Line);
        assert_eq!(resolve_style(Some(&bot("The Sniper", None))), ChartStyle::Candlestick);
        assert_eq!(resolve_style(Some(&bot("Alpha", Some("Technical Analysis")))), ChartStyle::Candlestick);
        assert_eq!(resolve_style(Some(&bot("Portfolio Manager", None))), ChartStyle::Area);
        assert_eq!(resolve_style(Some(&bot("Gambler", Some("Random")))), ChartStyle::Candlestick);
        assert_eq!(resolve_style(None), ChartStyle::Candlestick);
    }

    #[test]
    fn test_resolve_style_is_pure() {
        let b = bot("Portfolio Investor", Some("Momentum"));
        let first = resolve_style(Some(&b));
        for _ in 0..10 {
            assert_eq!(resolve_style(Some(&b)), first);
        }
        // investor wins over portfolio
        assert_eq!(first, ChartStyle::Line);
    }

    #[test]
    fn test_line_and_area_use_close() {
        let series = ChartSeries::shape(ChartStyle::Area, candles(2));
        let ChartSeries::Points(points) = series else {
            panic!("expected points");
        };
        assert_eq!(points[0].value, 101.0);
        assert_eq!(points[1].time, "2025-01-02");
        assert!(matches!(ChartSeries::shape(ChartStyle::Candlestick, candles(2)), ChartSeries::Candles(c) if c.len() == 2));
    }

    #[test]
    fn test_open_twice_keeps_only_second() {
        let mut adapter = ChartAdapter::new();
        let first = adapter.open(container(0), "AAA", ChartStyle::Line);
        assert!(adapter.complete(&first, Ok(candles(3))));
        assert_eq!(adapter.live_instances(), 1);

        let second = adapter.open(container(1), "BBB", ChartStyle::Candlestick);
        assert!(adapter.instance().is_none());
        assert_eq!(adapter.live_instances(), 0);
        assert!(adapter.complete(&second, Ok(candles(3))));

        assert_eq!(adapter.live_instances(), 1);
        assert_eq!(adapter.instance().map(|c| c.symbol.as_str()), Some("BBB"));
    }

    #[test]
    fn test_superseded_response_is_dropped() {
        let mut adapter = ChartAdapter::new();
        let first = adapter.open(container(0), "AAA", ChartStyle::Line);
        let second = adapter.open(container(1), "BBB", ChartStyle::Line);
        assert!(!adapter.complete(&first, Ok(candles(3))));
        assert!(adapter.instance().is_none());
        assert!(adapter.complete(&second, Ok(candles(3))));
        assert_eq!(adapter.instance().map(|c| c.symbol.as_str()), Some("BBB"));
    }

    #[test]
    fn test_error_response_creates_nothing() {
        let mut adapter = ChartAdapter::new();
        let ticket = adapter.open(container(0), "XYZ", ChartStyle::Candlestick);
        let err = DeskError::ChartUnavailable {
            symbol: "XYZ".into(),
            reason: "not found".into(),
        };
        assert!(!adapter.complete(&ticket, Err(err)));
        assert!(adapter.instance().is_none());
        assert!(!adapter.is_pending());
        assert_eq!(adapter.live_instances(), 0);
    }

    #[test]
    fn test_dispose_is_safe_when_idle() {
        let mut adapter = ChartAdapter::new();
        adapter.dispose();
        adapter.dispose();
        assert!(adapter.instance().is_none());

        let ticket = adapter.open(container(0), "AAA", ChartStyle::Line);
        adapter.dispose();
        assert!(!adapter.complete(&ticket, Ok(candles(1))));
    }

    #[test]
    fn test_bounds_cover_wicks() {
        let series = ChartSeries::shape(ChartStyle::Candlestick, candles(3));
        assert_eq!(series.bounds(), Some((99.0, 104.0)));
        assert_eq!(ChartSeries::Points(Vec::new()).bounds(), None);
    }
}
