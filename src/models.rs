//! Wire types for the dashboard backend.
//!
//! Decoding is lenient: missing or `null` fields fall back to defaults so that
//! a partially populated payload still renders instead of failing the whole
//! response.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts a string or a number and keeps its display form.
fn display_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_text).unwrap_or_default())
}

fn opt_display_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_text).filter(|s| !s.is_empty()))
}

/// Keeps the entries of an array that decode; anything that is not an array
/// is an empty list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Renders a JSON scalar the way a person would write it (no quotes on strings).
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "opt_display_string")]
    pub human_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bio: String,
    #[serde(default, deserialize_with = "display_string")]
    pub risk: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pnl: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub profit_pct: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub balance: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trades: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub wins: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub losses: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub win_rate: f64,
    #[serde(default, deserialize_with = "display_string")]
    pub status: String,
    #[serde(default, deserialize_with = "opt_display_string")]
    pub strategy_title: Option<String>,
    #[serde(default, deserialize_with = "opt_display_string")]
    pub scientific_explanation: Option<String>,
}

impl Bot {
    /// `human_name` when the backend provides one, otherwise the bot id.
    pub fn display_name(&self) -> &str {
        self.human_name.as_deref().unwrap_or(&self.id)
    }

    /// First `max_chars` characters of the bio, with an ellipsis when cut.
    pub fn bio_excerpt(&self, max_chars: usize) -> String {
        let mut chars = self.bio.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestigatorLog {
    #[serde(default, deserialize_with = "display_string")]
    pub timestamp: String,
    #[serde(default)]
    pub signal_id: Option<u64>,
    #[serde(default, deserialize_with = "display_string")]
    pub verdict: String,
    #[serde(default, deserialize_with = "display_string")]
    pub message: String,
    #[serde(default, deserialize_with = "display_string")]
    pub bot_id: String,
}

/// Body of `GET /api/status`; unrelated keys are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub leaderboard: Vec<Bot>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub investigator_logs: Vec<InvestigatorLog>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuditStatus {
    Pass,
    Warn,
    Fail,
    Other(String),
}

impl<'de> Deserialize<'de> for AuditStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = display_string(deserializer)?;
        Ok(match raw.to_ascii_uppercase().as_str() {
            "PASS" => AuditStatus::Pass,
            "WARN" => AuditStatus::Warn,
            "FAIL" => AuditStatus::Fail,
            _ => AuditStatus::Other(raw),
        })
    }
}

impl Default for AuditStatus {
    fn default() -> Self {
        AuditStatus::Other(String::new())
    }
}

impl AuditStatus {
    pub fn label(&self) -> &str {
        match self {
            AuditStatus::Pass => "PASS",
            AuditStatus::Warn => "WARN",
            AuditStatus::Fail => "FAIL",
            AuditStatus::Other(raw) => raw,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AuditEntry {
    #[serde(default, deserialize_with = "display_string")]
    pub check: String,
    #[serde(default)]
    pub status: AuditStatus,
    #[serde(default, deserialize_with = "display_string")]
    pub note: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Indicator {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TechnicalEvidence {
    /// Indicator rows in the order the backend sent them.
    pub indicators: Vec<Indicator>,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolumeEvidence {
    pub bids: Vec<f64>,
    pub asks: Vec<f64>,
    pub flow_net: String,
    pub volume_surge: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SentimentEvidence {
    pub social_volume: u64,
    /// Fraction in `0.0..=1.0`.
    pub sentiment_score: f64,
    pub headlines: Vec<String>,
}

impl SentimentEvidence {
    pub fn sentiment_percent(&self) -> u32 {
        (self.sentiment_score.clamp(0.0, 1.0) * 100.0).floor() as u32
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EvidencePayload {
    Technical(TechnicalEvidence),
    Volume(VolumeEvidence),
    Sentiment(SentimentEvidence),
}

impl Default for EvidencePayload {
    fn default() -> Self {
        EvidencePayload::Sentiment(SentimentEvidence::default())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct Evidence {
    pub report_text: Option<String>,
    pub payload: EvidencePayload,
}

impl Evidence {
    pub fn kind(&self) -> &'static str {
        match self.payload {
            EvidencePayload::Technical(_) => "technical",
            EvidencePayload::Volume(_) => "volume",
            EvidencePayload::Sentiment(_) => "sentiment",
        }
    }
}

/// Any JSON value decodes: an unknown or non-string `type`, a missing or
/// non-object `data`, or a non-object evidence value all fall back to
/// defaults, with sentiment as the layout.
impl From<Value> for Evidence {
    fn from(raw: Value) -> Self {
        let kind = raw.get("type").map(value_text).unwrap_or_default();
        let empty = Value::Null;
        let data = raw.get("data").filter(|d| d.is_object()).unwrap_or(&empty);
        let payload = match kind.as_str() {
            "technical" => EvidencePayload::Technical(TechnicalEvidence {
                indicators: data
                    .get("indicators")
                    .and_then(Value::as_object)
                    .map(|map| {
                        map.iter()
                            .map(|(name, value)| Indicator {
                                name: name.clone(),
                                value: value_text(value),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                note: data
                    .get("technical_note")
                    .map(value_text)
                    .filter(|s| !s.is_empty()),
            }),
            "volume" => {
                let book = data.get("order_book");
                EvidencePayload::Volume(VolumeEvidence {
                    bids: number_list(book.and_then(|b| b.get("bids"))),
                    asks: number_list(book.and_then(|b| b.get("asks"))),
                    flow_net: data.get("flow_net").map(value_text).unwrap_or_default(),
                    volume_surge: data.get("volume_surge").map(value_text).unwrap_or_default(),
                })
            }
            _ => EvidencePayload::Sentiment(SentimentEvidence {
                social_volume: data
                    .get("social_volume")
                    .and_then(Value::as_f64)
                    .map(|v| v.max(0.0) as u64)
                    .unwrap_or(0),
                sentiment_score: data
                    .get("sentiment_score")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0),
                headlines: data
                    .get("news_headlines")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().map(value_text).collect())
                    .unwrap_or_default(),
            }),
        };
        Evidence {
            report_text: raw
                .get("report_text")
                .map(value_text)
                .filter(|s| !s.is_empty()),
            payload,
        }
    }
}

fn number_list(value: Option<&Value>) -> Vec<f64> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Signal {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bot_id: String,
    pub symbol: String,
    #[serde(rename = "type", alias = "side", default)]
    pub side: Side,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    #[serde(default, deserialize_with = "display_string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "display_string")]
    pub reason: String,
    #[serde(default, deserialize_with = "display_string")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evidence: Evidence,
    #[serde(default, deserialize_with = "lenient_list")]
    pub audit_trail: Vec<AuditEntry>,
    /// Profit booked when the position closed. `None` for open or
    /// unreported positions.
    #[serde(default, alias = "pnl")]
    pub realized_pnl: Option<f64>,
}

impl Signal {
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.trim();
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_rfc2822(raw))
            .map(|ts| ts.with_timezone(&Utc))
            .ok()
    }

    /// Calendar date for list rows; falls back to the raw text.
    pub fn display_date(&self) -> String {
        match self.parsed_timestamp() {
            Some(ts) => ts.format("%Y-%m-%d").to_string(),
            None => self.timestamp.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BotStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub balance: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pnl: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub initial_balance: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trades: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub wins: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BotHistory {
    #[serde(default, deserialize_with = "null_as_default")]
    pub signals: Vec<Signal>,
}

/// Body of `GET /api/bot/{id}`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BotDetailResponse {
    pub profile: Bot,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: BotStats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: BotHistory,
}

/// A bot's detail with its history already in newest-first order.
#[derive(Clone, Debug, PartialEq)]
pub struct BotDetail {
    pub profile: Bot,
    pub stats: BotStats,
    pub signals: Vec<Signal>,
}

impl From<BotDetailResponse> for BotDetail {
    fn from(resp: BotDetailResponse) -> Self {
        let mut signals = resp.history.signals;
        signals.reverse();
        BotDetail {
            profile: resp.profile,
            stats: resp.stats,
            signals,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NewsReport {
    #[serde(default, deserialize_with = "display_string")]
    pub author: String,
    #[serde(default, deserialize_with = "display_string")]
    pub timestamp: String,
    #[serde(rename = "type", default, deserialize_with = "display_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "display_string")]
    pub title: String,
    #[serde(default, deserialize_with = "display_string")]
    pub body: String,
    #[serde(default, deserialize_with = "display_string")]
    pub image: String,
}

impl NewsReport {
    pub fn is_urgent(&self) -> bool {
        self.kind.eq_ignore_ascii_case("URGENT")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Body of `GET /api/chart/{symbol}`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ChartResponse {
    Series(Vec<Candle>),
    Error { error: String },
}
