//! Navigation state machine for the dashboard.
//!
//! Top-level views (`Home`, `News`) are mutually exclusive; `Detail` and
//! `DealReport` are overlays stacked above whichever is active. Operations
//! never perform I/O: they return the [`Effect`]s the runtime has to carry out
//! and accept the results back through the `apply_*` methods, which drop any
//! response that no longer belongs to an open view.

use crate::cache::{BotDirectoryCache, DetailTicket};
use crate::chart::{ChartAdapter, ChartContainer, ChartTicket};
use crate::error::{DeskError, Result};
use crate::evidence::{self, EvidenceSection};
use crate::history::{self, HistoryTag};
use crate::models::{BotDetail, Candle, NewsReport, Signal};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TopView {
    #[default]
    Home,
    News,
}

/// The view currently receiving input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Home,
    News,
    Detail,
    DealReport,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    FetchNews { seq: u64 },
    FetchDetail(DetailTicket),
    FetchChart(ChartTicket),
}

/// The single "current bot / current signal" selection of the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewContext {
    bot: Option<String>,
    signal: Option<usize>,
}

impl ViewContext {
    pub fn bot(&self) -> Option<&str> {
        self.bot.as_deref()
    }

    pub fn signal(&self) -> Option<usize> {
        self.signal
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum NewsPanel {
    #[default]
    Idle,
    Loading { seq: u64 },
    Loaded(NewsReport),
    Unavailable,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DetailContent {
    Loading,
    Loaded(Arc<BotDetail>),
    Unavailable,
}

#[derive(Clone, Debug)]
pub struct DetailView {
    pub bot_id: String,
    pub content: DetailContent,
    pub filter: HistoryTag,
    /// Row in the filtered history list.
    pub selected: usize,
    awaiting: Option<DetailTicket>,
}

impl DetailView {
    pub fn detail(&self) -> Option<&BotDetail> {
        match &self.content {
            DetailContent::Loaded(detail) => Some(detail),
            _ => None,
        }
    }

    /// Visible history rows as (index into the newest-first history, signal).
    pub fn rows(&self) -> Vec<(usize, &Signal)> {
        self.detail()
            .map(|d| history::filter_indexed(&d.signals, self.filter))
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct DealReportView {
    pub signal_index: usize,
    pub section: EvidenceSection,
}

#[derive(Debug, Default)]
pub struct ViewStateController {
    top: TopView,
    news: NewsPanel,
    news_seq: u64,
    roster_selected: usize,
    detail: Option<DetailView>,
    deal_report: Option<DealReportView>,
    context: ViewContext,
    chart: ChartAdapter,
}

impl ViewStateController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top(&self) -> TopView {
        self.top
    }

    pub fn layer(&self) -> Layer {
        if self.deal_report.is_some() {
            Layer::DealReport
        } else if self.detail.is_some() {
            Layer::Detail
        } else {
            match self.top {
                TopView::Home => Layer::Home,
                TopView::News => Layer::News,
            }
        }
    }

    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    pub fn news(&self) -> &NewsPanel {
        &self.news
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    pub fn deal_report(&self) -> Option<&DealReportView> {
        self.deal_report.as_ref()
    }

    pub fn chart(&self) -> &ChartAdapter {
        &self.chart
    }

    pub fn roster_selected(&self) -> usize {
        self.roster_selected
    }

    /// Shows `target` and hides the other top-level view. Entering `News`
    /// fetches the latest report once.
    pub fn switch_view(&mut self, target: TopView) -> Vec<Effect> {
        self.top = target;
        match target {
            TopView::News => {
                self.news_seq += 1;
                self.news = NewsPanel::Loading { seq: self.news_seq };
                vec![Effect::FetchNews { seq: self.news_seq }]
            }
            TopView::Home => {
                // a report still in flight belongs to a closed view
                self.news = NewsPanel::Idle;
                Vec::new()
            }
        }
    }

    pub fn apply_news(&mut self, seq: u64, fetched: Result<NewsReport>) -> bool {
        if self.news != (NewsPanel::Loading { seq }) {
            debug!("Dropping news response #{}", seq);
            return false;
        }
        self.news = match fetched {
            Ok(report) => NewsPanel::Loaded(report),
            Err(e) => {
                warn!("Latest news unavailable: {}", e);
                NewsPanel::Unavailable
            }
        };
        true
    }

    /// Opens the detail overlay for `bot_id` with a loading placeholder and
    /// supersedes any detail or deal report already open.
    pub fn show_bot_detail(&mut self, bot_id: &str, cache: &mut BotDirectoryCache) -> Vec<Effect> {
        self.close_deal_report();

        let mut effects = Vec::new();
        let awaiting = match cache.request_detail(bot_id) {
            Some(ticket) => {
                effects.push(Effect::FetchDetail(ticket.clone()));
                Some(ticket)
            }
            None => cache.pending_detail(bot_id),
        };

        info!("Opening detail for {}", bot_id);
        self.context.bot = Some(bot_id.to_string());
        self.context.signal = None;
        self.detail = Some(DetailView {
            bot_id: bot_id.to_string(),
            content: DetailContent::Loading,
            filter: HistoryTag::All,
            selected: 0,
            awaiting,
        });
        effects
    }

    /// Routes a detail fetch result through the cache and, if the detail view
    /// is still waiting for exactly this fetch, replaces its content.
    pub fn apply_detail(
        &mut self,
        ticket: &DetailTicket,
        fetched: Result<BotDetail>,
        cache: &mut BotDirectoryCache,
    ) -> bool {
        let stored = match fetched {
            Ok(detail) => cache.apply_detail(ticket, detail),
            Err(e) => {
                warn!("Detail fetch for {} failed: {}", ticket.bot_id, e);
                cache.fail_detail(ticket);
                None
            }
        };

        let Some(view) = self.detail.as_mut() else {
            debug!("Detail for {} arrived after the view closed", ticket.bot_id);
            return false;
        };
        if view.awaiting.as_ref() != Some(ticket) {
            debug!("Detail #{} for {} was superseded", ticket.seq, ticket.bot_id);
            return false;
        }

        view.awaiting = None;
        view.selected = 0;
        view.content = match stored.or_else(|| cache.detail(&ticket.bot_id)) {
            Some(detail) => DetailContent::Loaded(detail),
            None => DetailContent::Unavailable,
        };
        true
    }

    /// Drops the cached detail of the open bot and fetches it again.
    pub fn refresh_detail(&mut self, cache: &mut BotDirectoryCache) -> Vec<Effect> {
        let Some(bot_id) = self.detail.as_ref().map(|view| view.bot_id.clone()) else {
            return Vec::new();
        };
        cache.invalidate_detail(&bot_id);
        self.show_bot_detail(&bot_id, cache)
    }

    /// Hides the detail overlay and the deal report stacked on it.
    pub fn close_detail(&mut self) {
        self.close_deal_report();
        if self.detail.take().is_some() {
            debug!("Closed detail");
        }
        self.context.bot = None;
        self.context.signal = None;
    }

    /// Opens the deal report for entry `signal_index` of the current bot's
    /// newest-first history.
    pub fn show_deal_report(&mut self, signal_index: usize) -> Result<Vec<Effect>> {
        let bot_id = self.context.bot.clone().ok_or(DeskError::NoBotSelected)?;
        let detail = self
            .detail
            .as_ref()
            .filter(|view| view.bot_id == bot_id)
            .and_then(DetailView::detail)
            .ok_or(DeskError::NoBotSelected)?;
        let signal = detail
            .signals
            .get(signal_index)
            .ok_or_else(|| DeskError::UnknownSignal {
                bot_id: bot_id.clone(),
                index: signal_index,
            })?;

        let section = evidence::render(signal, Some(&detail.profile));
        self.chart.dispose();

        let mut effects = Vec::new();
        if let Some(request) = &section.chart {
            let container = ChartContainer {
                bot_id: bot_id.clone(),
                signal_index,
            };
            let ticket = self.chart.open(container, &request.symbol, request.style);
            effects.push(Effect::FetchChart(ticket));
        }

        info!("Opening deal report {} for {}", section.headline, bot_id);
        self.context.signal = Some(signal_index);
        self.deal_report = Some(DealReportView {
            signal_index,
            section,
        });
        Ok(effects)
    }

    pub fn apply_chart(&mut self, ticket: &ChartTicket, fetched: Result<Vec<Candle>>) -> bool {
        let open_here = self.deal_report.as_ref().is_some_and(|report| {
            self.context.bot.as_deref() == Some(ticket.container.bot_id.as_str())
                && report.signal_index == ticket.container.signal_index
        });
        if !open_here {
            debug!("Dropping chart for {}; deal report closed", ticket.symbol);
            return false;
        }
        self.chart.complete(ticket, fetched)
    }

    /// Hides the deal report and releases its chart.
    pub fn close_deal_report(&mut self) {
        self.chart.dispose();
        self.deal_report = None;
        self.context.signal = None;
    }

    pub fn set_history_filter(&mut self, tag: HistoryTag) {
        if let Some(view) = self.detail.as_mut() {
            view.filter = tag;
            view.selected = 0;
        }
    }

    pub fn cycle_history_filter(&mut self) {
        if let Some(tag) = self.detail.as_ref().map(|v| v.filter.next()) {
            self.set_history_filter(tag);
        }
    }

    pub fn select_next(&mut self, cache: &BotDirectoryCache) {
        self.move_selection(1, cache);
    }

    pub fn select_prev(&mut self, cache: &BotDirectoryCache) {
        self.move_selection(-1, cache);
    }

    /// Keeps the roster cursor on an existing row after the leaderboard
    /// shrinks.
    pub fn clamp_roster_selection(&mut self, cache: &BotDirectoryCache) {
        self.roster_selected = step(self.roster_selected, 0, cache.roster().len());
    }

    fn move_selection(&mut self, delta: isize, cache: &BotDirectoryCache) {
        match self.layer() {
            Layer::Home => {
                self.clamp_roster_selection(cache);
                self.roster_selected = step(self.roster_selected, delta, cache.roster().len());
            }
            Layer::Detail => {
                if let Some(view) = self.detail.as_mut() {
                    let len = view.rows().len();
                    view.selected = step(view.selected, delta, len);
                }
            }
            Layer::News | Layer::DealReport => {}
        }
    }

    /// Enter: opens whatever is selected in the active layer.
    pub fn activate(&mut self, cache: &mut BotDirectoryCache) -> Vec<Effect> {
        match self.layer() {
            Layer::Home => {
                self.clamp_roster_selection(cache);
                let roster = cache.roster();
                match roster.get(self.roster_selected) {
                    Some(bot) => self.show_bot_detail(&bot.id, cache),
                    None => Vec::new(),
                }
            }
            Layer::Detail => {
                let index = self
                    .detail
                    .as_ref()
                    .and_then(|view| view.rows().get(view.selected).map(|(i, _)| *i));
                match index.map(|i| self.show_deal_report(i)) {
                    Some(Ok(effects)) => effects,
                    Some(Err(e)) => {
                        warn!("Cannot open deal report: {}", e);
                        Vec::new()
                    }
                    None => Vec::new(),
                }
            }
            Layer::News | Layer::DealReport => Vec::new(),
        }
    }

    /// Esc: closes the topmost overlay, or leaves `News` for `Home`.
    pub fn back(&mut self) -> Vec<Effect> {
        match self.layer() {
            Layer::DealReport => {
                self.close_deal_report();
                Vec::new()
            }
            Layer::Detail => {
                self.close_detail();
                Vec::new()
            }
            Layer::News => self.switch_view(TopView::Home),
            Layer::Home => Vec::new(),
        }
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current.saturating_add_signed(delta).min(len - 1)
}
