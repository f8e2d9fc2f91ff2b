use crate::api::ApiClient;
use crate::cache::BotDirectoryCache;
use crate::config::{DeskConfig, UI_TICK_MILLIS};
use crate::error::{DeskError, Result};
use crate::event::AppEvent;
use crate::history::HistoryTag;
use crate::poller::PollingScheduler;
use crate::view::{Effect, Layer, TopView, ViewStateController};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub struct App {
    pub should_quit: bool,
    pub config: DeskConfig,
    pub view: ViewStateController,
    pub cache: BotDirectoryCache,
    api: ApiClient,
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(config: DeskConfig) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            should_quit: false,
            config,
            view: ViewStateController::new(),
            cache: BotDirectoryCache::new(),
            api,
            tx,
            rx,
        })
    }

    pub async fn run(&mut self, terminal: &mut crate::tui::Tui) -> io::Result<()> {
        let poller = PollingScheduler::start(self.api.clone(), &self.config, self.tx.clone());

        while !self.should_quit {
            while let Ok(ev) = self.rx.try_recv() {
                self.handle_event(ev);
            }

            terminal.draw(|f| crate::ui::render(f, self))?;

            if event::poll(Duration::from_millis(UI_TICK_MILLIS))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        let effects = self.handle_key(key);
                        self.dispatch(effects);
                    }
                }
            }
        }

        poller.stop().await;
        info!("Dashboard closed");
        Ok(())
    }

    /// Applies one fetch completion. Failed polls leave the cached
    /// directory untouched so the last good data stays on screen.
    pub fn handle_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::StatusPolled { seq, result } => match result {
                Ok(status) => {
                    if self.cache.apply_status(seq, status) {
                        self.view.clamp_roster_selection(&self.cache);
                    } else {
                        debug!("Discarded stale status poll #{}", seq);
                    }
                }
                Err(e) => log_poll_failure("status", seq, &e),
            },
            AppEvent::RecommendationsPolled { seq, result } => match result {
                Ok(recs) => {
                    if !self.cache.apply_recommendations(seq, recs) {
                        debug!("Discarded stale recommendations poll #{}", seq);
                    }
                }
                Err(e) => log_poll_failure("recommendations", seq, &e),
            },
            AppEvent::NewsLoaded { seq, result } => {
                self.view.apply_news(seq, result);
            }
            AppEvent::DetailLoaded { ticket, result } => {
                self.view.apply_detail(&ticket, result, &mut self.cache);
            }
            AppEvent::ChartLoaded { ticket, result } => {
                self.view.apply_chart(&ticket, result);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('1') => {
                self.view.close_detail();
                self.view.switch_view(TopView::Home)
            }
            KeyCode::Char('2') => {
                self.view.close_detail();
                self.view.switch_view(TopView::News)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.view.select_next(&self.cache);
                Vec::new()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.view.select_prev(&self.cache);
                Vec::new()
            }
            KeyCode::Enter => self.view.activate(&mut self.cache),
            KeyCode::Esc | KeyCode::Backspace => self.view.back(),
            KeyCode::Tab if self.view.layer() == Layer::Detail => {
                self.view.cycle_history_filter();
                Vec::new()
            }
            KeyCode::Char(c) if self.view.layer() == Layer::Detail => {
                let tag = match c {
                    'a' => HistoryTag::All,
                    'w' => HistoryTag::Win,
                    'l' => HistoryTag::Loss,
                    'r' => return self.view.refresh_detail(&mut self.cache),
                    _ => return Vec::new(),
                };
                self.view.set_history_filter(tag);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Starts one background request per effect; each reports back on the
    /// event channel.
    fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            let api = self.api.clone();
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let ev = match effect {
                    Effect::FetchNews { seq } => AppEvent::NewsLoaded {
                        seq,
                        result: api.latest_news().await,
                    },
                    Effect::FetchDetail(ticket) => {
                        let result = api.bot_detail(&ticket.bot_id).await;
                        AppEvent::DetailLoaded { ticket, result }
                    }
                    Effect::FetchChart(ticket) => {
                        let result = api.chart(&ticket.symbol).await;
                        AppEvent::ChartLoaded { ticket, result }
                    }
                };
                let _ = tx.send(ev);
            });
        }
    }
}

fn log_poll_failure(stream: &str, seq: u64, e: &DeskError) {
    if e.is_transient() {
        warn!("{} poll #{} failed, keeping last data: {}", stream, seq, e);
    } else {
        error!("{} poll #{} failed: {}", stream, seq, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bot, Side, Signal, StatusResponse};
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> App {
        App::new(DeskConfig::default()).unwrap()
    }

    fn status(ids: &[&str]) -> StatusResponse {
        StatusResponse {
            leaderboard: ids
                .iter()
                .map(|id| Bot { id: id.to_string(), name: id.to_uppercase(), ..Default::default() })
                .collect(),
            investigator_logs: Vec::new(),
        }
    }

    #[test]
    fn test_failed_poll_keeps_previous_roster() {
        let mut app = app();
        app.handle_event(AppEvent::StatusPolled { seq: 1, result: Ok(status(&["a", "b"])) });
        let err = DeskError::Status { status: 502, message: "bad gateway".into() };
        app.handle_event(AppEvent::StatusPolled { seq: 2, result: Err(err) });
        assert_eq!(app.cache.roster().len(), 2);
    }

    #[test]
    fn test_out_of_order_polls_keep_newest() {
        let mut app = app();
        app.handle_event(AppEvent::StatusPolled { seq: 4, result: Ok(status(&["new"])) });
        app.handle_event(AppEvent::StatusPolled { seq: 3, result: Ok(status(&["old", "older"])) });
        assert_eq!(app.cache.roster()[0].id, "new");

        let rec = Signal { symbol: "ABC".into(), side: Side::Buy, ..Default::default() };
        app.handle_event(AppEvent::RecommendationsPolled { seq: 2, result: Ok(vec![rec.clone()]) });
        app.handle_event(AppEvent::RecommendationsPolled { seq: 1, result: Ok(Vec::new()) });
        assert_eq!(app.cache.recommendations().as_slice(), &[rec]);
    }

    #[test]
    fn test_keys_drive_navigation() {
        let mut app = app();
        app.handle_event(AppEvent::StatusPolled { seq: 1, result: Ok(status(&["a", "b"])) });

        assert!(app.handle_key(key(KeyCode::Down)).is_empty());
        let effects = app.handle_key(key(KeyCode::Enter));
        assert!(matches!(&effects[0], Effect::FetchDetail(t) if t.bot_id == "b"));
        assert_eq!(app.view.layer(), Layer::Detail);

        app.handle_key(key(KeyCode::Char('w')));
        assert_eq!(app.view.detail().unwrap().filter, HistoryTag::Win);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.view.detail().unwrap().filter, HistoryTag::Loss);

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.view.layer(), Layer::Home);

        let effects = app.handle_key(key(KeyCode::Char('2')));
        assert_eq!(effects, vec![Effect::FetchNews { seq: 1 }]);
        assert_eq!(app.view.layer(), Layer::News);
        assert!(app.handle_key(key(KeyCode::Char('1'))).is_empty());
        assert_eq!(app.view.top(), TopView::Home);

        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_poll_shrinking_roster_moves_cursor_onto_last_bot() {
        let mut app = app();
        app.handle_event(AppEvent::StatusPolled { seq: 1, result: Ok(status(&["a", "b", "c", "d", "e"])) });
        for _ in 0..4 {
            app.handle_key(key(KeyCode::Down));
        }
        app.handle_event(AppEvent::StatusPolled { seq: 2, result: Ok(status(&["a", "b"])) });
        assert_eq!(app.view.roster_selected(), 1);

        let effects = app.handle_key(key(KeyCode::Enter));
        assert!(matches!(&effects[0], Effect::FetchDetail(t) if t.bot_id == "b"));
    }

    #[test]
    fn test_switching_view_closes_detail() {
        let mut app = app();
        app.handle_event(AppEvent::StatusPolled { seq: 1, result: Ok(status(&["a"])) });
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('2')));
        assert!(app.view.detail().is_none());
        assert_eq!(app.view.context().bot(), None);
    }
}
