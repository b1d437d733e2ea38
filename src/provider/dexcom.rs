use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::error::CycleError;
use crate::models::{Reading, Trend};

use super::{ProviderFuture, ReadingProvider};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const APPLICATION_ID: &str = "d89443d2-327c-4a6f-89e5-496bbb0317db";
const APPLICATION_ID_JP: &str = "d8665ade-9673-4e27-9ff6-92db4ce13d13";
const INVALID_ACCOUNT_ID: &str = "00000000-0000-0000-0000-000000000000";

const AUTHENTICATE_ENDPOINT: &str = "General/AuthenticatePublisherAccount";
const LOGIN_ENDPOINT: &str = "General/LoginPublisherAccountById";
const LATEST_VALUES_ENDPOINT: &str = "Publisher/ReadPublisherLatestGlucoseValues";

/// Share only keeps the newest value for a few minutes.
const LOOKBACK_MINUTES: u32 = 10;

const SESSION_FAULT_CODES: [&str; 2] = ["SessionIdNotFound", "SessionNotValid"];

/// Share server the account is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Region {
    /// United States
    Us,
    /// Outside the United States
    Ous,
    /// Japan
    Jp,
}

impl Region {
    fn base_url(&self) -> &'static str {
        match self {
            Region::Us => "https://share2.dexcom.com/ShareWebServices/Services",
            Region::Ous => "https://shareous1.dexcom.com/ShareWebServices/Services",
            Region::Jp => "https://share.dexcom.jp/ShareWebServices/Services",
        }
    }

    fn application_id(&self) -> &'static str {
        match self {
            Region::Us | Region::Ous => APPLICATION_ID,
            Region::Jp => APPLICATION_ID_JP,
        }
    }
}

#[derive(Debug, Error)]
enum ShareFault {
    #[error("Dexcom Share returned {code}: {message}")]
    Api { code: String, message: String },

    #[error("Dexcom Share request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ShareFault {
    fn is_session_fault(&self) -> bool {
        matches!(self, ShareFault::Api { code, .. } if SESSION_FAULT_CODES.contains(&code.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct FaultBody {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message", default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticateRequest<'a> {
    account_name: &'a str,
    password: &'a str,
    application_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    account_id: &'a str,
    password: &'a str,
    application_id: &'a str,
}

/// Trend as Share sends it: a name on current servers, a number on old ones.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum WireTrend {
    Name(String),
    Code(u8),
}

#[derive(Debug, Clone, Deserialize)]
struct WireGlucose {
    #[serde(rename = "WT")]
    wt: String,
    #[serde(rename = "Value")]
    value: f64,
    #[serde(rename = "Trend")]
    trend: WireTrend,
}

/// Dexcom Share client. Logs in lazily and re-logs once when the server
/// reports the session as expired.
pub struct DexcomShareClient {
    http: reqwest::Client,
    region: Region,
    username: String,
    password: String,
    session_id: Mutex<Option<String>>,
}

impl DexcomShareClient {
    pub fn new(username: String, password: String, region: Region) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("glucosedidgeridoo/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            region,
            username,
            password,
            session_id: Mutex::new(None),
        })
    }

    /// Builds the client and logs in, so bad credentials fail at startup.
    pub async fn connect(username: String, password: String, region: Region) -> Result<Self> {
        let client = Self::new(username, password, region)?;
        client.session().await?;
        Ok(client)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        body: &impl Serialize,
    ) -> Result<T, ShareFault> {
        let url = format!("{}/{}", self.region.base_url(), endpoint);
        let response = self
            .http
            .post(url)
            .header("Accept-Encoding", "application/json")
            .query(query)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await?;
        Err(match serde_json::from_str::<FaultBody>(&text) {
            Ok(fault) => ShareFault::Api {
                code: fault.code,
                message: fault.message.unwrap_or_default(),
            },
            Err(_) => ShareFault::Api {
                code: status.to_string(),
                message: text,
            },
        })
    }

    async fn login(&self) -> Result<String> {
        let application_id = self.region.application_id();

        let account_id: String = self
            .post(
                AUTHENTICATE_ENDPOINT,
                &[],
                &AuthenticateRequest {
                    account_name: &self.username,
                    password: &self.password,
                    application_id,
                },
            )
            .await
            .context("Dexcom account authentication failed")?;
        if account_id == INVALID_ACCOUNT_ID {
            return Err(anyhow!("Dexcom rejected the account credentials"));
        }

        let session_id: String = self
            .post(
                LOGIN_ENDPOINT,
                &[],
                &LoginRequest {
                    account_id: &account_id,
                    password: &self.password,
                    application_id,
                },
            )
            .await
            .context("Dexcom session login failed")?;
        if session_id == INVALID_ACCOUNT_ID {
            return Err(anyhow!("Dexcom refused to open a session"));
        }

        log_info!("Logged in to Dexcom Share ({:?})", self.region);
        Ok(session_id)
    }

    async fn session(&self) -> Result<String> {
        let mut guard = self.session_id.lock().await;
        if let Some(session_id) = guard.as_ref() {
            return Ok(session_id.clone());
        }
        let session_id = self.login().await?;
        *guard = Some(session_id.clone());
        Ok(session_id)
    }

    async fn invalidate(&self, stale: &str) {
        let mut guard = self.session_id.lock().await;
        // Another cycle may already have replaced it.
        if guard.as_deref() == Some(stale) {
            *guard = None;
        }
    }

    async fn latest_values(&self, session_id: &str) -> Result<Vec<WireGlucose>, ShareFault> {
        let query = [
            ("sessionId", session_id.to_string()),
            ("minutes", LOOKBACK_MINUTES.to_string()),
            ("maxCount", "1".to_string()),
        ];
        self.post(LATEST_VALUES_ENDPOINT, &query, &serde_json::json!({}))
            .await
    }

    async fn fetch_current(&self) -> Result<Option<Reading>> {
        let session_id = self.session().await?;
        let values = match self.latest_values(&session_id).await {
            Ok(values) => values,
            Err(fault) if fault.is_session_fault() => {
                log_warn!("Dexcom session expired, logging in again");
                self.invalidate(&session_id).await;
                let session_id = self.session().await?;
                self.latest_values(&session_id)
                    .await
                    .context("failed to read latest glucose value")?
            }
            Err(fault) => return Err(fault).context("failed to read latest glucose value"),
        };

        values.into_iter().next().map(parse_reading).transpose()
    }
}

impl ReadingProvider for DexcomShareClient {
    fn current_reading(&self) -> ProviderFuture<'_> {
        Box::pin(self.fetch_current())
    }

    fn describe(&self) -> String {
        format!("Dexcom Share ({:?})", self.region)
    }
}

fn parse_reading(wire: WireGlucose) -> Result<Reading> {
    let timestamp = parse_share_date(&wire.wt)?;
    let trend = parse_trend(&wire.trend)?;
    Ok(Reading::new(wire.value, timestamp, trend))
}

/// Parses `Date(1691455258000)` or `Date(1691455258000+0200)`; the offset
/// is informational only, the millisecond count is already UTC.
fn parse_share_date(raw: &str) -> Result<DateTime<Utc>> {
    let inner = raw
        .strip_prefix("Date(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| anyhow!("unexpected Share timestamp '{raw}'"))?;
    let digits_end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(index, _)| index)
        .unwrap_or(inner.len());
    let millis: i64 = inner[..digits_end]
        .parse()
        .with_context(|| format!("unexpected Share timestamp '{raw}'"))?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| anyhow!("Share timestamp '{raw}' out of range"))
}

fn parse_trend(wire: &WireTrend) -> Result<Trend> {
    let trend = match wire {
        WireTrend::Name(name) => match name.as_str() {
            "DoubleUp" => Trend::RisingQuickly,
            "SingleUp" => Trend::Rising,
            "FortyFiveUp" => Trend::RisingSlightly,
            "Flat" => Trend::Steady,
            "FortyFiveDown" => Trend::FallingSlightly,
            "SingleDown" => Trend::Falling,
            "DoubleDown" => Trend::FallingQuickly,
            "None" | "NotComputable" | "RateOutOfRange" => Trend::Unavailable,
            other => return Err(CycleError::UnrecognizedTrend(other.to_string()).into()),
        },
        WireTrend::Code(code) => match code {
            1 => Trend::RisingQuickly,
            2 => Trend::Rising,
            3 => Trend::RisingSlightly,
            4 => Trend::Steady,
            5 => Trend::FallingSlightly,
            6 => Trend::Falling,
            7 => Trend::FallingQuickly,
            0 | 8 | 9 => Trend::Unavailable,
            other => return Err(CycleError::UnrecognizedTrend(other.to_string()).into()),
        },
    };
    Ok(trend)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(json: &str) -> WireGlucose {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_current_share_payload() {
        let payload = r#"[{"WT":"Date(1691455258000)","ST":"Date(1691455258000)","DT":"Date(1691455258000+0200)","Value":123,"Trend":"Flat"}]"#;
        let values: Vec<WireGlucose> = serde_json::from_str(payload).unwrap();
        let reading = parse_reading(values.into_iter().next().unwrap()).unwrap();

        assert_eq!(reading.value, 123.0);
        assert_eq!(reading.trend, Trend::Steady);
        assert_eq!(reading.timestamp.timestamp_millis(), 1_691_455_258_000);
    }

    #[test]
    fn numeric_trends_from_older_servers() {
        let reading = parse_reading(wire(r#"{"WT":"Date(0)","Value":80,"Trend":7}"#)).unwrap();
        assert_eq!(reading.trend, Trend::FallingQuickly);
    }

    #[test]
    fn no_trend_variants_map_to_unavailable() {
        for name in ["None", "NotComputable", "RateOutOfRange"] {
            assert_eq!(
                parse_trend(&WireTrend::Name(name.to_string())).unwrap(),
                Trend::Unavailable
            );
        }
    }

    #[test]
    fn unknown_trend_surfaces_as_cycle_error() {
        let err = parse_trend(&WireTrend::Name("Sideways".into())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CycleError>(),
            Some(CycleError::UnrecognizedTrend(label)) if label == "Sideways"
        ));
    }

    #[test]
    fn share_dates() {
        assert_eq!(
            parse_share_date("Date(1691455258000-0400)").unwrap().timestamp(),
            1_691_455_258
        );
        assert!(parse_share_date("1691455258000").is_err());
        assert!(parse_share_date("Date(soon)").is_err());
    }

    #[test]
    fn session_faults_are_recognised() {
        let fault = ShareFault::Api {
            code: "SessionIdNotFound".into(),
            message: String::new(),
        };
        assert!(fault.is_session_fault());

        let fault = ShareFault::Api {
            code: "AccountPasswordInvalid".into(),
            message: String::new(),
        };
        assert!(!fault.is_session_fault());
    }
}
