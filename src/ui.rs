use crate::app::App;
use crate::chart::{ChartAdapter, ChartInstance, ChartSeries, ChartStyle};
use crate::config::BIO_EXCERPT_CHARS;
use crate::evidence::{AuditSection, EvidenceBody, EvidenceSection, NO_FINDINGS};
use crate::history::{self, HistoryTag};
use crate::models::{AuditStatus, Bot, InvestigatorLog, Side, Signal};
use crate::view::{DetailContent, DetailView, Layer, NewsPanel, TopView};
use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Axis, Block, Borders, Chart, Clear, Dataset, GraphType, List, ListItem, ListState,
        Paragraph, Tabs, Wrap,
    },
    Frame,
};

const GOLD: Color = Color::Rgb(212, 175, 55);
const GAIN: Color = Color::Rgb(76, 217, 100);
const LOSS: Color = Color::Rgb(255, 59, 48);
const MUTED: Color = Color::Gray;

/// One leaderboard entry as shown on the home view.
#[derive(Clone, Debug, PartialEq)]
pub struct RosterCard {
    pub rank: usize,
    pub title: String,
    pub name: String,
    pub excerpt: String,
    pub risk: String,
    pub status: String,
    pub pnl: f64,
    pub win_rate: f64,
}

/// Cards for `bots`, ranked 1..=n in the order given.
pub fn roster_cards(bots: &[Bot]) -> Vec<RosterCard> {
    bots.iter()
        .enumerate()
        .map(|(i, bot)| RosterCard {
            rank: i + 1,
            title: bot.name.clone(),
            name: bot.display_name().to_string(),
            excerpt: bot.bio_excerpt(BIO_EXCERPT_CHARS),
            risk: bot.risk.clone(),
            status: bot.status.clone(),
            pnl: bot.pnl,
            win_rate: bot.win_rate,
        })
        .collect()
}

pub fn render(f: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, layout[0]);

    match app.view.top() {
        TopView::Home => render_home(f, app, layout[1]),
        TopView::News => render_news(f, app, layout[1]),
    }
    if let Some(detail) = app.view.detail() {
        render_detail(f, detail, layout[1]);
    }
    if let Some(report) = app.view.deal_report() {
        render_deal_report(f, &report.section, app.view.chart(), layout[1]);
    }

    render_footer(f, app, layout[2]);
}

fn pnl_color(pnl: f64) -> Color {
    if pnl >= 0.0 { GAIN } else { LOSS }
}

fn side_color(side: Side) -> Color {
    match side {
        Side::Buy => GAIN,
        Side::Sell => LOSS,
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let tab = |label: &'static str, active: bool| {
        if active {
            Span::styled(label, Style::default().fg(Color::Black).bg(GOLD).add_modifier(Modifier::BOLD))
        } else {
            Span::styled(label, Style::default().fg(MUTED))
        }
    };

    let mut spans = vec![
        Span::styled(" BotDesk ", Style::default().fg(GOLD).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        tab(" 1 Home ", app.view.top() == TopView::Home),
        Span::raw(" "),
        tab(" 2 News ", app.view.top() == TopView::News),
        Span::raw(" | "),
        Span::styled(app.config.api_url.as_str(), Style::default().fg(MUTED)),
    ];

    spans.push(Span::raw(" | "));
    match app.cache.last_refresh() {
        Some(ts) => spans.push(Span::styled(
            format!("updated {}", ts.with_timezone(&Local).format("%H:%M:%S")),
            Style::default().fg(Color::White),
        )),
        None => spans.push(Span::styled("waiting for data", Style::default().fg(Color::Yellow))),
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let hint = match app.view.layer() {
        Layer::Home => "j/k: move | Enter: open bot | 2: news | q: quit",
        Layer::News => "1/Esc: home | q: quit",
        Layer::Detail => "j/k: move | Enter: deal report | Tab/a/w/l: filter | r: refresh | Esc: close | q: quit",
        Layer::DealReport => "Esc: close report | q: quit",
    };

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" Controls: ", Style::default().fg(MUTED)),
        Span::styled(hint, Style::default().fg(Color::White)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

fn render_placeholder(f: &mut Frame, msg: &str, block: Block, area: Rect) {
    let text = Paragraph::new(msg)
        .alignment(Alignment::Center)
        .style(Style::default().fg(MUTED))
        .block(block);
    f.render_widget(text, area);
}

fn render_home(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[1]);

    render_roster(f, &app.cache.roster(), app.view.roster_selected(), columns[0]);
    render_recommendations(f, &app.cache.recommendations(), side[0]);
    render_investigator_logs(f, &app.cache.investigator_logs(), side[1]);
}

fn render_roster(f: &mut Frame, bots: &[Bot], selected: usize, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Leaderboard ");
    let cards = roster_cards(bots);
    if cards.is_empty() {
        render_placeholder(f, "Waiting for the first leaderboard poll...", block, area);
        return;
    }

    let items: Vec<ListItem> = cards
        .iter()
        .map(|card| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!("#{} ", card.rank), Style::default().fg(GOLD).add_modifier(Modifier::BOLD)),
                    Span::styled(card.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", card.title), Style::default().fg(GOLD)),
                ]),
                Line::from(Span::styled(format!("   \"{}\"", card.excerpt), Style::default().fg(MUTED))),
                Line::from(vec![
                    Span::raw(format!("   Risk: {}  ", card.risk)),
                    Span::styled(format!("{:.0} SAR", card.pnl), Style::default().fg(pnl_color(card.pnl))),
                    Span::styled(format!("  win {:.1}%", card.win_rate), Style::default().fg(MUTED)),
                    Span::styled(format!("  {}", card.status), Style::default().fg(Color::Cyan)),
                ]),
                Line::from(""),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Rgb(40, 40, 44)))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(selected.min(cards.len() - 1)));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_recommendations(f: &mut Frame, recs: &[Signal], area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Approved recommendations ");
    if recs.is_empty() {
        render_placeholder(
            f,
            "No approved recommendations yet. The investigator is auditing the market...",
            block,
            area,
        );
        return;
    }

    let items: Vec<ListItem> = recs
        .iter()
        .map(|rec| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!("{:<8}", rec.symbol), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(format!("{:>10.2}  ", rec.price)),
                    Span::styled(rec.side.as_str(), Style::default().fg(side_color(rec.side))),
                ]),
                Line::from(Span::styled(format!("  verified: {}", rec.reason), Style::default().fg(GAIN))),
            ])
        })
        .collect();
    f.render_widget(List::new(items).block(block), area);
}

fn render_investigator_logs(f: &mut Frame, logs: &[InvestigatorLog], area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Investigator ");
    if logs.is_empty() {
        render_placeholder(f, "No verdicts yet.", block, area);
        return;
    }

    let items: Vec<ListItem> = logs
        .iter()
        .map(|log| {
            let color = if log.verdict.starts_with("APPROVED") { GAIN } else { LOSS };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", log.timestamp), Style::default().fg(MUTED)),
                Span::styled(format!("{} ", log.bot_id), Style::default().fg(GOLD)),
                Span::styled(log.verdict.clone(), Style::default().fg(color)),
                Span::styled(format!("  {}", log.message), Style::default().fg(MUTED)),
            ]))
        })
        .collect();
    f.render_widget(List::new(items).block(block), area);
}

fn render_news(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Newsroom ");
    let report = match app.view.news() {
        NewsPanel::Idle | NewsPanel::Loading { .. } => {
            render_placeholder(f, "Connecting to the newsroom...", block, area);
            return;
        }
        NewsPanel::Unavailable => {
            render_placeholder(f, "No report right now.", block, area);
            return;
        }
        NewsPanel::Loaded(report) => report,
    };

    let kind = if report.is_urgent() {
        Span::styled("URGENT", Style::default().fg(LOSS).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("Report", Style::default().fg(MUTED))
    };
    let text = vec![
        Line::from(Span::styled(report.author.clone(), Style::default().fg(GOLD).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled(format!("{} | ", report.timestamp), Style::default().fg(MUTED)),
            kind,
        ]),
        Line::from(""),
        Line::from(Span::styled(report.title.clone(), Style::default().add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(report.body.clone()),
    ];
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }).block(block), area);
}

fn render_detail(f: &mut Frame, view: &DetailView, area: Rect) {
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GOLD))
        .title(format!(" Bot detail: {} ", view.bot_id));

    let detail = match &view.content {
        DetailContent::Loading => {
            render_placeholder(f, "Fetching portfolio data...", block, area);
            return;
        }
        DetailContent::Unavailable => {
            render_placeholder(f, "Portfolio data unavailable.", block, area);
            return;
        }
        DetailContent::Loaded(detail) => detail,
    };

    let inner = block.inner(area);
    f.render_widget(block, area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let p = &detail.profile;
    let s = &detail.stats;
    let mut header = vec![
        Line::from(Span::styled(p.name.clone(), Style::default().fg(GOLD).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(p.display_name().to_string(), Style::default().fg(MUTED))),
        Line::from(vec![
            Span::raw("Balance: "),
            Span::styled(format!("{:.2} SAR", s.balance), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::raw("PnL: "),
            Span::styled(format!("{:+.2}", s.pnl), Style::default().fg(pnl_color(s.pnl))),
            Span::raw(format!("   Capital: {:.2}", s.initial_balance)),
            Span::styled(format!("   Trades: {} / Wins: {}", s.trades, s.wins), Style::default().fg(MUTED)),
        ]),
    ];
    if let Some(title) = &p.strategy_title {
        header.push(Line::from(Span::styled(format!("Strategy: {}", title), Style::default().fg(MUTED))));
    }
    f.render_widget(Paragraph::new(header), chunks[0]);

    let mut bio = vec![Line::from(format!("\"{}\"", p.bio))];
    if let Some(extra) = &p.scientific_explanation {
        bio.push(Line::from(Span::styled(extra.clone(), Style::default().fg(MUTED))));
    }
    f.render_widget(Paragraph::new(bio).wrap(Wrap { trim: true }), chunks[1]);

    let titles: Vec<String> = HistoryTag::TABS
        .iter()
        .map(|tag| format!("{} ({})", tag.label(), history::filter(&detail.signals, *tag).len()))
        .collect();
    let selected_tab = HistoryTag::TABS.iter().position(|t| *t == view.filter).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected_tab)
        .style(Style::default().fg(MUTED))
        .highlight_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD | Modifier::UNDERLINED));
    f.render_widget(tabs, chunks[2]);

    let rows = view.rows();
    if rows.is_empty() {
        render_placeholder(f, "No trades.", Block::default(), chunks[3]);
        return;
    }
    let items: Vec<ListItem> = rows
        .iter()
        .map(|(_, sig)| {
            let mut spans = vec![
                Span::styled("| ", Style::default().fg(side_color(sig.side))),
                Span::styled(format!("{:<8}", sig.symbol), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(format!("{:<5}", sig.side.as_str()), Style::default().fg(MUTED)),
                Span::styled(format!("{:<12}", sig.display_date()), Style::default().fg(MUTED)),
                Span::raw(format!("{:>10.2}", sig.price)),
            ];
            if let Some(pnl) = sig.realized_pnl {
                spans.push(Span::styled(
                    format!("  {:+.0} SAR", pnl),
                    Style::default().fg(pnl_color(pnl)).add_modifier(Modifier::BOLD),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let list = List::new(items)
        .highlight_style(Style::default().bg(Color::Rgb(40, 40, 44)))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(view.selected.min(rows.len() - 1)));
    f.render_stateful_widget(list, chunks[3], &mut state);
}

fn render_deal_report(f: &mut Frame, section: &EvidenceSection, adapter: &ChartAdapter, area: Rect) {
    let chart = adapter.instance();
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GOLD))
        .title(" Deal report ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let body = evidence_lines(&section.body);
    let mut constraints = vec![
        Constraint::Length(3),
        Constraint::Length(section_height(body.len())),
    ];
    if chart.is_some() {
        constraints.push(Constraint::Length(12));
    }
    constraints.push(Constraint::Min(0));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    let mut headline = vec![Span::styled(
        section.headline.clone(),
        Style::default().fg(side_color(section.side)).add_modifier(Modifier::BOLD),
    )];
    if adapter.is_pending() {
        headline.push(Span::styled("  loading chart...", Style::default().fg(MUTED)));
    }
    let header = vec![
        Line::from(headline),
        Line::from(Span::styled(section.report_text.clone(), Style::default().fg(MUTED))),
    ];
    f.render_widget(Paragraph::new(header).wrap(Wrap { trim: true }), chunks[0]);

    let mut evidence = vec![Line::from(Span::styled(
        format!("Evidence ({})", section.body.title()),
        Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
    ))];
    evidence.extend(body);
    f.render_widget(Paragraph::new(evidence), chunks[1]);

    let audit_area = match chart {
        Some(instance) => {
            render_chart(f, instance, chunks[2]);
            chunks[3]
        }
        None => chunks[2],
    };
    f.render_widget(Paragraph::new(audit_lines(&section.audit)).wrap(Wrap { trim: true }), audit_area);
}

fn evidence_lines(body: &EvidenceBody) -> Vec<Line<'static>> {
    match body {
        EvidenceBody::Technical { indicators, note, preferred_style } => {
            let mut lines: Vec<Line> = indicators
                .iter()
                .map(|ind| {
                    Line::from(vec![
                        Span::styled(format!("  {:<16}", ind.name), Style::default().fg(MUTED)),
                        Span::styled(ind.value.clone(), Style::default().fg(GOLD).add_modifier(Modifier::BOLD)),
                    ])
                })
                .collect();
            if let Some(note) = note {
                lines.push(Line::from(format!("  {}", note)));
            }
            lines.push(Line::from(Span::styled(
                format!("  Preferred chart: {}", preferred_style.as_str()),
                Style::default().fg(MUTED),
            )));
            lines
        }
        EvidenceBody::Volume { bids, asks, flow_net, volume_surge } => {
            let mut lines = vec![Line::from(vec![
                Span::raw("  Net flow: "),
                Span::styled(flow_net.clone(), Style::default().fg(GAIN)),
                Span::raw("   Surge: "),
                Span::styled(volume_surge.clone(), Style::default().fg(GOLD)),
            ])];
            lines.push(Line::from(Span::styled("  Asks", Style::default().fg(LOSS))));
            lines.extend(depth_lines(asks, LOSS));
            lines.push(Line::from(Span::styled("  Bids", Style::default().fg(GAIN))));
            lines.extend(depth_lines(bids, GAIN));
            lines
        }
        EvidenceBody::Sentiment { social_volume, sentiment_percent, headline_count } => vec![Line::from(vec![
            Span::raw("  Posts: "),
            Span::styled(social_volume.to_string(), Style::default().fg(GOLD)),
            Span::raw("   Sentiment: "),
            Span::styled(format!("{}%", sentiment_percent), Style::default().fg(GOLD)),
            Span::raw("   Headlines: "),
            Span::styled(headline_count.to_string(), Style::default().fg(GOLD)),
        ])],
    }
}

/// Rows for a titled section of `lines` lines, saturating at `u16::MAX`.
fn section_height(lines: usize) -> u16 {
    u16::try_from(lines).unwrap_or(u16::MAX).saturating_add(1)
}

const DEPTH_BAR_WIDTH: f64 = 30.0;

/// One bar per depth level, scaled to the largest level.
fn depth_lines(levels: &[f64], color: Color) -> Vec<Line<'static>> {
    let max = levels.iter().cloned().fold(0.0_f64, f64::max);
    if levels.is_empty() || max <= 0.0 {
        return vec![Line::from(Span::styled("    (no depth)", Style::default().fg(MUTED)))];
    }
    levels
        .iter()
        .map(|level| {
            let width = ((level / max) * DEPTH_BAR_WIDTH).round().max(1.0) as usize;
            Line::from(vec![
                Span::raw("    "),
                Span::styled("█".repeat(width), Style::default().fg(color)),
                Span::styled(format!(" {:.0}", level), Style::default().fg(MUTED)),
            ])
        })
        .collect()
}

fn audit_lines(audit: &AuditSection) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        "Investigator audit",
        Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
    ))];
    match audit {
        AuditSection::NoFindings => lines.push(Line::from(format!("  {}", NO_FINDINGS))),
        AuditSection::Findings(entries) => {
            for entry in entries {
                let color = match entry.status {
                    AuditStatus::Pass => GAIN,
                    AuditStatus::Warn => Color::Yellow,
                    AuditStatus::Fail | AuditStatus::Other(_) => LOSS,
                };
                lines.push(Line::from(vec![
                    Span::raw(format!("  {:<24}", entry.check)),
                    Span::styled(
                        format!("{:<5}", entry.status.label()),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!(" {}", entry.note), Style::default().fg(MUTED)),
                ]));
            }
        }
    }
    lines.push(Line::from(Span::styled(
        "  Reviewed automatically by the investigator.",
        Style::default().fg(LOSS),
    )));
    lines
}

fn render_chart(f: &mut Frame, instance: &ChartInstance, area: Rect) {
    let Some((lo, hi)) = instance.series.bounds() else {
        return;
    };
    let pad = ((hi - lo) * 0.05).max(0.01);
    let (y_min, y_max) = (lo - pad, hi + pad);
    let x_max = instance.series.len() as f64;
    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        format!(" {} ({}) ", instance.symbol, instance.style.as_str()),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));

    match &instance.series {
        ChartSeries::Points(points) => {
            let data: Vec<(f64, f64)> = points.iter().enumerate().map(|(i, p)| (i as f64, p.value)).collect();
            let graph = if instance.style == ChartStyle::Area { GraphType::Bar } else { GraphType::Line };
            let dataset = Dataset::default()
                .name(instance.symbol.as_str())
                .marker(symbols::Marker::Braille)
                .graph_type(graph)
                .style(Style::default().fg(Color::Rgb(33, 150, 243)))
                .data(&data);
            let chart = Chart::new(vec![dataset])
                .block(block)
                .x_axis(Axis::default().style(Style::default().fg(MUTED)).bounds([0.0, x_max]))
                .y_axis(
                    Axis::default()
                        .style(Style::default().fg(MUTED))
                        .bounds([y_min, y_max])
                        .labels(vec![
                            Span::styled(format!("{:.2}", lo), Style::default().fg(MUTED)),
                            Span::styled(format!("{:.2}", hi), Style::default().fg(MUTED)),
                        ]),
                );
            f.render_widget(chart, area);
        }
        ChartSeries::Candles(candles) => {
            let canvas = Canvas::default()
                .block(block)
                .marker(symbols::Marker::Braille)
                .x_bounds([-1.0, x_max])
                .y_bounds([y_min, y_max])
                .paint(|ctx| {
                    for (i, c) in candles.iter().enumerate() {
                        let x = i as f64;
                        let color = if c.close >= c.open { Color::Rgb(38, 166, 154) } else { Color::Rgb(239, 83, 80) };
                        ctx.draw(&CanvasLine { x1: x, y1: c.low, x2: x, y2: c.high, color });
                        for dx in [-0.25, 0.0, 0.25] {
                            ctx.draw(&CanvasLine { x1: x + dx, y1: c.open, x2: x + dx, y2: c.close, color });
                        }
                    }
                });
            f.render_widget(canvas, area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeskConfig;
    use crate::models::StatusResponse;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn bots(n: usize) -> Vec<Bot> {
        (1..=n)
            .map(|i| Bot {
                id: format!("bot-{}", i),
                name: format!("Strategy {}", i),
                bio: "Buys the dip and sells the rip with strict discipline every day".into(),
                risk: "Medium".into(),
                pnl: 100.0 * i as f64,
                ..Default::default()
            })
            .collect()
    }

    fn app_with(bots: Vec<Bot>) -> App {
        let mut app = App::new(DeskConfig::default()).unwrap();
        app.cache.apply_status(1, StatusResponse { leaderboard: bots, investigator_logs: Vec::new() });
        app
    }

    fn draw(app: &App) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(120, 60)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        terminal.backend().buffer().clone()
    }

    fn screen(buffer: &Buffer) -> String {
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_five_bots_make_five_ranked_cards() {
        let cards = roster_cards(&bots(5));
        assert_eq!(cards.len(), 5);
        let ranks: Vec<usize> = cards.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        assert_eq!(cards[0].name, "bot-1");
        assert_eq!(cards[4].name, "bot-5");
        assert!(cards[0].excerpt.ends_with("..."));
    }

    #[test]
    fn test_roster_render_is_idempotent() {
        let mut app = app_with(bots(5));
        let first = draw(&app);
        app.cache.apply_status(2, StatusResponse { leaderboard: bots(5), investigator_logs: Vec::new() });
        let second = draw(&app);
        // only the refresh clock in the header may differ
        assert_eq!(first.content()[120 * 3..], second.content()[120 * 3..]);

        let text = screen(&second);
        for rank in 1..=5 {
            assert_eq!(text.matches(&format!("#{} ", rank)).count(), 1, "rank {} card", rank);
        }
        assert!(!text.contains("#6 "));
    }

    #[test]
    fn test_empty_roster_shows_waiting_placeholder() {
        let app = App::new(DeskConfig::default()).unwrap();
        assert!(screen(&draw(&app)).contains("Waiting for the first leaderboard poll"));
    }

    fn app_with_deal_report() -> (App, crate::chart::ChartTicket) {
        use crate::models::BotDetailResponse;
        use crate::view::Effect;

        let mut app = app_with(bots(1));
        let effects = app.view.show_bot_detail("bot-1", &mut app.cache);
        let Some(Effect::FetchDetail(ticket)) = effects.first().cloned() else {
            panic!("expected a detail fetch");
        };
        let resp: BotDetailResponse = serde_json::from_value(serde_json::json!({
            "profile": { "id": "bot-1", "name": "The Sniper" },
            "stats": { "balance": 100000.0 },
            "history": { "signals": [
                { "symbol": "XYZ", "type": "BUY", "price": 12.34,
                  "evidence": { "type": "technical", "data": { "indicators": { "RSI (14)": 28 } } } }
            ] }
        }))
        .unwrap();
        app.view.apply_detail(&ticket, Ok(resp.into()), &mut app.cache);

        let effects = app.view.show_deal_report(0).unwrap();
        let Some(Effect::FetchChart(ticket)) = effects.first().cloned() else {
            panic!("expected a chart fetch");
        };
        (app, ticket)
    }

    #[test]
    fn test_chart_error_renders_report_without_chart_panel() {
        let (mut app, ticket) = app_with_deal_report();
        let err = crate::error::DeskError::ChartUnavailable { symbol: "XYZ".into(), reason: "not found".into() };
        app.view.apply_chart(&ticket, Err(err));

        let text = screen(&draw(&app));
        assert!(text.contains("BUY XYZ @ 12.34"));
        assert!(text.contains("RSI (14)"));
        assert!(!text.contains("XYZ (Candlestick)"));
    }

    #[test]
    fn test_loaded_chart_renders_panel() {
        let (mut app, ticket) = app_with_deal_report();
        let candles = vec![
            crate::models::Candle { time: "1".into(), open: 10.0, high: 13.0, low: 9.0, close: 12.0 },
            crate::models::Candle { time: "2".into(), open: 12.0, high: 12.5, low: 11.0, close: 11.5 },
        ];
        assert!(app.view.apply_chart(&ticket, Ok(candles)));
        assert!(screen(&draw(&app)).contains("XYZ (Candlestick)"));
    }

    #[test]
    fn test_cards_and_logs_show_status_and_time() {
        let mut roster = bots(1);
        roster[0].status = "Scanning".into();
        let mut app = App::new(DeskConfig::default()).unwrap();
        app.cache.apply_status(
            1,
            StatusResponse {
                leaderboard: roster,
                investigator_logs: vec![InvestigatorLog {
                    timestamp: "14:02:11".into(),
                    verdict: "APPROVED".into(),
                    message: "volume confirmed".into(),
                    bot_id: "bot-1".into(),
                    ..Default::default()
                }],
            },
        );
        assert_eq!(roster_cards(&app.cache.roster())[0].status, "Scanning");
        let text = screen(&draw(&app));
        assert!(text.contains("Scanning"));
        assert!(text.contains("14:02:11 bot-1 APPROVED"));
    }

    #[test]
    fn test_section_height_saturates() {
        assert_eq!(section_height(2), 3);
        assert_eq!(section_height(70_000), 65_535);
        assert_eq!(section_height(usize::from(u16::MAX)), u16::MAX);
    }

    #[test]
    fn test_depth_lines_tolerate_empty_levels() {
        assert_eq!(depth_lines(&[], GAIN).len(), 1);
        let bars = depth_lines(&[100.0, 50.0], GAIN);
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn test_audit_placeholder_when_no_findings() {
        let lines = audit_lines(&AuditSection::NoFindings);
        let text: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.contains(NO_FINDINGS));
    }
}
