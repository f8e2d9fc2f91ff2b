use crate::models::Signal;

/// Trade-history tab.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryTag {
    #[default]
    All,
    Win,
    Loss,
}

impl HistoryTag {
    pub const TABS: [HistoryTag; 3] = [HistoryTag::All, HistoryTag::Win, HistoryTag::Loss];

    pub fn label(self) -> &'static str {
        match self {
            HistoryTag::All => "All",
            HistoryTag::Win => "Wins",
            HistoryTag::Loss => "Losses",
        }
    }

    pub fn next(self) -> Self {
        match self {
            HistoryTag::All => HistoryTag::Win,
            HistoryTag::Win => HistoryTag::Loss,
            HistoryTag::Loss => HistoryTag::All,
        }
    }

    /// Whether `signal` belongs under this tab. Only closed positions with a
    /// realized PnL reported by the backend can be a win or a loss.
    pub fn admits(self, signal: &Signal) -> bool {
        match (self, signal.realized_pnl) {
            (HistoryTag::All, _) => true,
            (HistoryTag::Win, Some(pnl)) => pnl > 0.0,
            (HistoryTag::Loss, Some(pnl)) => pnl < 0.0,
            (_, None) => false,
        }
    }
}

/// Signals admitted by `tag`, in input order.
pub fn filter(signals: &[Signal], tag: HistoryTag) -> Vec<&Signal> {
    signals.iter().filter(|s| tag.admits(s)).collect()
}

/// Like [`filter`], but keeps each signal's position in the input so a row
/// can be mapped back to the full history.
pub fn filter_indexed(signals: &[Signal], tag: HistoryTag) -> Vec<(usize, &Signal)> {
    signals
        .iter()
        .enumerate()
        .filter(|(_, s)| tag.admits(s))
        .collect()
}
