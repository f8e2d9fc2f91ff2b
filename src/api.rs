use crate::config::DeskConfig;
use crate::error::{DeskError, Result};
use crate::models::{
    BotDetail, BotDetailResponse, Candle, ChartResponse, NewsReport, Signal, StatusResponse,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Read-only client for the dashboard backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ApiClient {
    pub fn new(config: &DeskConfig) -> Result<Self> {
        let base = Url::parse(&config.api_url).map_err(|e| DeskError::InvalidUrl {
            url: config.api_url.clone(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("botdesk-tui/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base, http })
    }

    /// `GET /api/status`
    pub async fn status(&self) -> Result<StatusResponse> {
        self.get_json(&["api", "status"]).await
    }

    /// `GET /api/user/recommendations`
    pub async fn recommendations(&self) -> Result<Vec<Signal>> {
        self.get_json(&["api", "user", "recommendations"]).await
    }

    /// `GET /api/news/latest`
    pub async fn latest_news(&self) -> Result<NewsReport> {
        self.get_json(&["api", "news", "latest"]).await
    }

    /// `GET /api/bot/{id}`; the history comes back newest-first.
    pub async fn bot_detail(&self, bot_id: &str) -> Result<BotDetail> {
        let resp: BotDetailResponse = self.get_json(&["api", "bot", bot_id]).await?;
        Ok(resp.into())
    }

    /// `GET /api/chart/{symbol}`. An `{ error }` body or an empty series
    /// both mean there is nothing to plot.
    pub async fn chart(&self, symbol: &str) -> Result<Vec<Candle>> {
        let resp: ChartResponse = self.get_json(&["api", "chart", symbol]).await.map_err(|e| match e {
            DeskError::Status { message, .. } => DeskError::ChartUnavailable {
                symbol: symbol.to_string(),
                reason: message,
            },
            other => other,
        })?;
        match resp {
            ChartResponse::Error { error } => Err(DeskError::ChartUnavailable {
                symbol: symbol.to_string(),
                reason: error,
            }),
            ChartResponse::Series(candles) if candles.is_empty() => Err(DeskError::ChartUnavailable {
                symbol: symbol.to_string(),
                reason: "empty series".to_string(),
            }),
            ChartResponse::Series(candles) => Ok(candles),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments);
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());
            return Err(DeskError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
