//! Turns one signal into the evidence and audit sections of a deal report.

use crate::chart::{resolve_style, ChartStyle};
use crate::models::{AuditEntry, Bot, EvidencePayload, Indicator, Side, Signal};

pub const NO_REPORT_TEXT: &str = "No report text available.";
pub const NO_FINDINGS: &str = "No audit findings.";

#[derive(Clone, Debug, PartialEq)]
pub enum EvidenceBody {
    Technical {
        indicators: Vec<Indicator>,
        note: Option<String>,
        preferred_style: ChartStyle,
    },
    Volume {
        bids: Vec<f64>,
        asks: Vec<f64>,
        flow_net: String,
        volume_surge: String,
    },
    Sentiment {
        social_volume: u64,
        sentiment_percent: u32,
        headline_count: usize,
    },
}

impl EvidenceBody {
    pub fn title(&self) -> &'static str {
        match self {
            EvidenceBody::Technical { .. } => "Technical",
            EvidenceBody::Volume { .. } => "Liquidity",
            EvidenceBody::Sentiment { .. } => "Sentiment",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AuditSection {
    Findings(Vec<AuditEntry>),
    NoFindings,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartRequest {
    pub symbol: String,
    pub style: ChartStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvidenceSection {
    pub side: Side,
    pub headline: String,
    pub report_text: String,
    pub body: EvidenceBody,
    pub audit: AuditSection,
    /// Set only for technical evidence.
    pub chart: Option<ChartRequest>,
}

/// Builds the deal-report sections for `signal`. `profile` is the bot that
/// issued it and decides the chart style.
pub fn render(signal: &Signal, profile: Option<&Bot>) -> EvidenceSection {
    let evidence = &signal.evidence;
    let mut chart = None;

    let body = match &evidence.payload {
        EvidencePayload::Technical(tech) => {
            let style = resolve_style(profile);
            chart = Some(ChartRequest {
                symbol: signal.symbol.clone(),
                style,
            });
            EvidenceBody::Technical {
                indicators: tech.indicators.clone(),
                note: tech.note.clone(),
                preferred_style: style,
            }
        }
        EvidencePayload::Volume(vol) => EvidenceBody::Volume {
            bids: vol.bids.clone(),
            asks: vol.asks.clone(),
            flow_net: vol.flow_net.clone(),
            volume_surge: vol.volume_surge.clone(),
        },
        EvidencePayload::Sentiment(sent) => EvidenceBody::Sentiment {
            social_volume: sent.social_volume,
            sentiment_percent: sent.sentiment_percent(),
            headline_count: sent.headlines.len(),
        },
    };

    let audit = if signal.audit_trail.is_empty() {
        AuditSection::NoFindings
    } else {
        AuditSection::Findings(signal.audit_trail.clone())
    };

    EvidenceSection {
        side: signal.side,
        headline: format!("{} {} @ {:.2}", signal.side.as_str(), signal.symbol, signal.price),
        report_text: evidence
            .report_text
            .clone()
            .unwrap_or_else(|| NO_REPORT_TEXT.to_string()),
        body,
        audit,
        chart,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditStatus, Signal};
    use serde_json::json;

    fn signal(value: serde_json::Value) -> Signal {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_technical_requests_chart_in_bot_style() {
        let sig = signal(json!({
            "symbol": "1120", "type": "BUY", "price": 88.1234,
            "evidence": { "type": "technical", "data": { "indicators": { "EMA 50": "Above", "Trend": "Bullish" } }, "report_text": "Strong" }
        }));
        let investor = Bot { id: "b".into(), name: "Investor".into(), ..Default::default() };
        let section = render(&sig, Some(&investor));

        assert_eq!(section.headline, "BUY 1120 @ 88.12");
        assert_eq!(section.report_text, "Strong");
        assert_eq!(
            section.chart,
            Some(ChartRequest { symbol: "1120".into(), style: ChartStyle::Line })
        );
        let EvidenceBody::Technical { indicators, preferred_style, .. } = section.body else {
            panic!("expected technical body");
        };
        assert_eq!(preferred_style, ChartStyle::Line);
        assert_eq!(indicators[0].name, "EMA 50");
        assert_eq!(indicators[1].value, "Bullish");
    }

    #[test]
    fn test_volume_without_order_book_renders_empty_depth() {
        let sig = signal(json!({
            "symbol": "2222", "type": "BUY", "price": 27.0,
            "evidence": { "type": "volume", "data": { "flow_net": "Inflow", "volume_surge": "+250%" } }
        }));
        let section = render(&sig, None);
        assert!(section.chart.is_none());
        match section.body {
            EvidenceBody::Volume { bids, asks, flow_net, volume_surge } => {
                assert!(bids.is_empty() && asks.is_empty());
                assert_eq!(flow_net, "Inflow");
                assert_eq!(volume_surge, "+250%");
            }
            other => panic!("expected volume body, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_evidence_uses_sentiment_layout() {
        let sig = signal(json!({ "symbol": "7010", "type": "SELL", "price": 40.0 }));
        let section = render(&sig, None);
        assert_eq!(section.report_text, NO_REPORT_TEXT);
        assert_eq!(
            section.body,
            EvidenceBody::Sentiment { social_volume: 0, sentiment_percent: 0, headline_count: 0 }
        );
        assert_eq!(section.audit, AuditSection::NoFindings);
    }

    #[test]
    fn test_sentiment_counts() {
        let sig = signal(json!({
            "symbol": "4030", "type": "BUY", "price": 55.0,
            "evidence": { "type": "sentiment", "data": {
                "social_volume": 31, "sentiment_score": 0.876, "news_headlines": ["a", "b"]
            } }
        }));
        assert_eq!(
            render(&sig, None).body,
            EvidenceBody::Sentiment { social_volume: 31, sentiment_percent: 87, headline_count: 2 }
        );
    }

    #[test]
    fn test_audit_entries_keep_order() {
        let sig = signal(json!({
            "symbol": "1180", "type": "BUY", "price": 10.0,
            "audit_trail": [
                { "check": "RSI value", "status": "WARN", "note": "a bit high" },
                { "check": "Fair price", "status": "PASS", "note": "0.4%" }
            ]
        }));
        let AuditSection::Findings(entries) = render(&sig, None).audit else {
            panic!("expected findings");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, AuditStatus::Warn);
        assert_eq!(entries[1].check, "Fair price");
    }
}
