//! UAE central bank provider.
//!
//! The bank publishes one FX table per day as rendered HTML inside a JSON
//! envelope, quoting AED per unit of each listed currency (reverse quotes).
//! There is no per-pair endpoint and no real-time feed: every fetch pulls the
//! whole day's table, and "latest" is served from the most recent finalized
//! table instead.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, error};

use rates_types::domain::calendar;
use rates_types::domain::rounding::{RATE_SCALE, to_fixed};
use rates_types::domain::{CurrencyRateFact, Endpoint, ProviderCode, RateRequest, RateResponse};
use rates_types::error::ProviderError;
use rates_types::ports::{ProviderDescriptor, RateStore, RateTable, RatesProvider};

/// The currency every table row is quoted against.
pub const ANCHOR_CURRENCY: &str = "AED";

/// Default production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.centralbank.ae/en/fx-rates-ajax";

/// Display timestamp formats the bank has been seen using.
const LAST_UPDATED_FORMATS: [&str; 4] = [
    "%d %b %Y %I:%M %p",
    "%d %b %Y %I:%M%p",
    "%d %b %Y %H:%M:%S %p",
    "%d %b %Y %H:%M:%S%p",
];

static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody tr").unwrap());
static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Display names used in the bank's table, mapped to ISO 4217 codes.
static CURRENCY_NAMES: &[(&str, &str)] = &[
    ("US Dollar", "USD"),
    ("Argentine Peso", "ARS"),
    ("Australian Dollar", "AUD"),
    ("Bangladesh Taka", "BDT"),
    ("Bahrani Dinar", "BHD"),
    ("Brunei Dollar", "BND"),
    ("Brazilian Real", "BRL"),
    ("Botswana Pula", "BWP"),
    ("Belarus Rouble", "BYN"),
    ("Canadian Dollar", "CAD"),
    ("Swiss Franc", "CHF"),
    ("Chilean Peso", "CLP"),
    ("Chinese Yuan - Offshore", "CNH"),
    ("Chinese Yuan", "CNY"),
    ("Colombian Peso", "COP"),
    ("Czech Koruna", "CZK"),
    ("Danish Krone", "DKK"),
    ("Algerian Dinar", "DZD"),
    ("Egypt Pound", "EGP"),
    ("Euro", "EUR"),
    ("GB Pound", "GBP"),
    ("Hongkong Dollar", "HKD"),
    ("Hungarian Forint", "HUF"),
    ("Indonesia Rupiah", "IDR"),
    ("Indian Rupee", "INR"),
    ("Iceland Krona", "ISK"),
    ("Jordan Dinar", "JOD"),
    ("Japanese Yen", "JPY"),
    ("Kenya Shilling", "KES"),
    ("Korean Won", "KPW"),
    ("Kuwaiti Dinar", "KWD"),
    ("Kazakhstan Tenge", "KZT"),
    ("Lebanon Pound", "LBP"),
    ("Sri Lanka Rupee", "LKR"),
    ("Moroccan Dirham", "MAD"),
    ("Macedonia Denar", "MKD"),
    ("Mexican Peso", "MXN"),
    ("Malaysia Ringgit", "MYR"),
    ("Nigerian Naira", "NGN"),
    ("Norwegian Krone", "NOK"),
    ("NewZealand Dollar", "NZD"),
    ("Omani Rial", "OMR"),
    ("Peru Sol", "PEN"),
    ("Philippine Piso", "PHP"),
    ("Pakistan Rupee", "PKR"),
    ("Polish Zloty", "PLN"),
    ("Qatari Riyal", "QAR"),
    ("Serbian Dinar", "RSD"),
    ("Russia Rouble", "RUB"),
    ("Saudi Riyal", "SAR"),
    ("Sudanese Pound", "SDG"),
    ("Swedish Krona", "SEK"),
    ("Singapore Dollar", "SGD"),
    ("Thai Baht", "THB"),
    ("Tunisian Dinar", "TND"),
    ("Turkish Lira", "TRY"),
    ("Trin Tob Dollar", "TTD"),
    ("Taiwan Dollar", "TWD"),
    ("Tanzania Shilling", "TZS"),
    ("Uganda Shilling", "UGX"),
    ("Vietnam Dong", "VND"),
    ("Yemen Rial", "YER"),
    ("South Africa Rand", "ZAR"),
    ("Zambian Kwacha", "ZMW"),
    ("Azerbaijan manat", "AZN"),
    ("Bulgarian lev", "BGN"),
    ("Croatian kuna", "HRK"),
    ("Ethiopian birr", "ETB"),
    ("Iraqi dinar", "IQD"),
    ("Israeli new shekel", "ILS"),
    ("Libyan dinar", "LYD"),
    ("Mauritian rupee", "MUR"),
    ("Romanian leu", "RON"),
    ("Syrian pound", "SYP"),
    ("Turkmen manat", "TMT"),
    ("Uzbekistani som", "UZS"),
];

fn currency_code_for_name(name: &str) -> Option<&'static str> {
    CURRENCY_NAMES
        .iter()
        .find(|(display, _)| *display == name)
        .map(|(_, code)| *code)
}

/// Every currency the table can carry plus the dirham itself. Serves as the
/// configuration default for the provider's supported set.
pub fn default_supported_currencies() -> Vec<String> {
    let mut codes: Vec<String> = CURRENCY_NAMES
        .iter()
        .map(|(_, code)| (*code).to_string())
        .collect();
    codes.push(ANCHOR_CURRENCY.to_string());
    codes.sort();
    codes
}

/// Wire shape of the bank's ajax endpoint.
#[derive(Debug, Deserialize)]
struct TableEnvelope {
    /// Rendered HTML table.
    table: String,
    /// Display timestamp of the table, provider-local.
    last_updated: String,
}

/// Extracts raw reverse quotes from the rendered table: td[0] is the display
/// name, td[1] the AED-per-unit rate. Rows with an unknown name or an
/// unparsable rate are skipped.
fn parse_rate_table(html: &str) -> BTreeMap<String, f64> {
    let document = Html::parse_fragment(html);
    let mut rates = BTreeMap::new();
    for row in document.select(&ROW_SELECTOR) {
        let mut cells = row.select(&CELL_SELECTOR);
        let (Some(name_cell), Some(rate_cell)) = (cells.next(), cells.next()) else {
            continue;
        };
        let name = name_cell.text().collect::<String>();
        let raw_rate = rate_cell.text().collect::<String>();
        let Ok(rate) = raw_rate.trim().parse::<f64>() else {
            continue;
        };
        let Some(code) = currency_code_for_name(name.trim()) else {
            continue;
        };
        rates.insert(code.to_string(), rate);
    }
    rates
}

/// Interprets the bank's display timestamp in the provider timezone, trying
/// each known format in turn.
fn parse_last_updated(raw: &str, tz: Tz) -> Result<DateTime<Utc>, ProviderError> {
    let raw = raw.trim();
    for format in LAST_UPDATED_FORMATS {
        if let Ok(local) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(calendar::instant_in(local.date(), local.time(), tz));
        }
    }
    Err(ProviderError::Upstream(format!(
        "unrecognized last_updated value: {:?}",
        raw
    )))
}

/// Applies the rounding contract to a raw reverse table: round the reverse
/// quote to six places, invert, round the direct quote again.
fn normalize_table(raw: BTreeMap<String, f64>, generated_at: DateTime<Utc>) -> RateTable {
    let mut table = RateTable {
        generated_at,
        ..RateTable::default()
    };
    for (code, value) in raw {
        let reverse = to_fixed(value, RATE_SCALE);
        table
            .direct
            .insert(code.clone(), to_fixed(1.0 / reverse, RATE_SCALE));
        table.reverse.insert(code, reverse);
    }
    table
}

/// Central bank FX table scraper.
///
/// Holds the store directly: a single upstream call yields the whole day's
/// table, so write-eligible fetches persist every pair in both directions at
/// once instead of only the pairs the caller asked for.
pub struct EmiratesProvider<S: RateStore> {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
    store: Arc<S>,
}

impl<S: RateStore> EmiratesProvider<S> {
    pub fn new(
        descriptor: ProviderDescriptor,
        base_url: impl Into<String>,
        client: reqwest::Client,
        store: Arc<S>,
    ) -> Self {
        Self {
            descriptor,
            base_url: base_url.into(),
            client,
            store,
        }
    }

    async fn fetch_table(&self, date: NaiveDate) -> Result<RateTable, ProviderError> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("date", date_str.as_str()), ("v", "2")])
            .send()
            .await
            .map_err(|e| ProviderError::Upstream(format!("central bank request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| {
                ProviderError::Upstream(format!("central bank rejected the request: {}", e))
            })?;
        let envelope: TableEnvelope = response.json().await.map_err(|e| {
            ProviderError::Upstream(format!("central bank payload is not valid JSON: {}", e))
        })?;

        let generated_at = parse_last_updated(&envelope.last_updated, self.descriptor.location)?;
        Ok(normalize_table(
            parse_rate_table(&envelope.table),
            generated_at,
        ))
    }

    /// Upserts the full table in both directions. Failures are logged and
    /// skipped; first-write-wins makes the next fetch retry them.
    async fn persist_table(&self, date: NaiveDate, table: &RateTable) {
        for (quoted, value) in &table.direct {
            let fact = CurrencyRateFact::new(
                ProviderCode::Emirates,
                Endpoint::Historical,
                ANCHOR_CURRENCY,
                quoted,
                *value,
                date,
                table.generated_at,
            );
            self.upsert(fact).await;
        }
        for (base, value) in &table.reverse {
            let fact = CurrencyRateFact::new(
                ProviderCode::Emirates,
                Endpoint::Historical,
                base,
                ANCHOR_CURRENCY,
                *value,
                date,
                table.generated_at,
            );
            self.upsert(fact).await;
        }
        debug!(%date, pairs = table.direct.len(), "persisted central bank table");
    }

    async fn upsert(&self, fact: CurrencyRateFact) {
        if let Err(e) = self.store.upsert_fact(&fact).await {
            error!(
                error = %e,
                base = %fact.base_currency,
                quoted = %fact.quoted_currency,
                date = %fact.rate_date,
                "failed to persist central bank rate"
            );
        }
    }
}

#[async_trait::async_trait]
impl<S: RateStore> RatesProvider for EmiratesProvider<S> {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn validate(&self, request: &RateRequest) -> Result<(), ProviderError> {
        self.descriptor.validate_request(request)?;
        let anchored = request.base_currency == ANCHOR_CURRENCY
            || (request.symbols.len() == 1 && request.symbols[0] == ANCHOR_CURRENCY);
        if !anchored {
            return Err(ProviderError::InvalidRequest(
                "base currency should be AED, or symbols should be [AED]".into(),
            ));
        }
        Ok(())
    }

    async fn fetch_historical(
        &self,
        request: &RateRequest,
    ) -> Result<RateResponse, ProviderError> {
        self.validate(request)?;

        // A forwarded fetch reuses a table that regular traffic already
        // persists, so only direct eligible requests write here.
        let persist =
            request.write_eligible(self.descriptor.today_local()) && !request.is_forwarded;
        let table = self.preload(request.date, persist).await?;
        let timestamp = table.generated_at.timestamp();

        if request.base_currency == ANCHOR_CURRENCY {
            let mut rates = BTreeMap::new();
            for symbol in &request.symbols {
                if symbol.as_str() == ANCHOR_CURRENCY {
                    rates.insert(symbol.clone(), 1.0);
                    continue;
                }
                let value = table.direct.get(symbol).copied().ok_or_else(|| {
                    ProviderError::Upstream(format!(
                        "no {} rate in the central bank table for {}",
                        symbol, request.date
                    ))
                })?;
                rates.insert(symbol.clone(), value);
            }
            Ok(RateResponse::new(rates, timestamp))
        } else if request.symbols.len() == 1 && request.symbols[0] == ANCHOR_CURRENCY {
            let value = table.reverse.get(&request.base_currency).copied().ok_or_else(|| {
                ProviderError::Upstream(format!(
                    "no {} rate in the central bank table for {}",
                    request.base_currency, request.date
                ))
            })?;
            Ok(RateResponse::single(ANCHOR_CURRENCY, value, timestamp))
        } else {
            // validate() already rejected anything else.
            Err(ProviderError::InvalidRequest(
                "base currency should be AED, or symbols should be [AED]".into(),
            ))
        }
    }

    async fn fetch_latest(&self, request: &RateRequest) -> Result<RateResponse, ProviderError> {
        // No real-time feed: serve the most recent finalized table.
        let (_, date) = self.latest_target(Utc::now());
        self.fetch_historical(&request.forwarded_to_historical(date))
            .await
    }

    fn latest_target(&self, now: DateTime<Utc>) -> (Endpoint, NaiveDate) {
        if self.descriptor.past_generation_time(now) {
            (Endpoint::Latest, now.date_naive())
        } else {
            (Endpoint::Historical, now.date_naive() - Duration::days(1))
        }
    }

    async fn preload(&self, date: NaiveDate, persist: bool) -> Result<RateTable, ProviderError> {
        let table = self.fetch_table(date).await?;
        if table.is_empty() {
            return Err(ProviderError::Upstream(format!(
                "central bank table for {} contained no usable rows",
                date
            )));
        }
        if persist {
            self.persist_table(date, &table).await;
        }
        Ok(table)
    }
}
