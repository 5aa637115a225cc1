use crate::core::reference_cache::ReferenceCache;
use crate::domain::model::{PriceDraft, PriceSpec, Reference};
use crate::utils::error::{ImportError, Result};
use regex::Regex;
use std::sync::LazyLock;

// [COUNTRY "-"] CURRENCY " " CENTAMOUNT [" " CUSTOMERGROUP] ["#" CHANNELKEY]
static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<country>\w{2})-)?(?P<currency>\w{3}) (?P<cent_amount>\d+)(?: (?P<customer_group>\w+))?(?:#(?P<channel>\S+))?$",
    )
    .expect("price pattern is a valid regex")
});

/// 單一價格字串的語法解析，不涉及遠端查詢
pub fn parse_price(token: &str) -> Result<PriceSpec> {
    let token = token.trim();
    let invalid = || ImportError::InvalidPrice {
        token: token.to_string(),
    };

    let captures = PRICE_PATTERN.captures(token).ok_or_else(invalid)?;
    let cent_amount = captures["cent_amount"]
        .parse::<u64>()
        .map_err(|_| invalid())?;

    Ok(PriceSpec {
        currency_code: captures["currency"].to_string(),
        cent_amount,
        country_code: captures.name("country").map(|m| m.as_str().to_string()),
        customer_group: captures
            .name("customer_group")
            .map(|m| m.as_str().to_string()),
        channel_key: captures.name("channel").map(|m| m.as_str().to_string()),
    })
}

/// 一個 variant 的多個價格以 `;` 分隔
pub fn split_prices(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(';').map(str::trim).filter(|token| !token.is_empty())
}

/// 解析價格並透過快取解析客群與通路參照
pub struct PriceParser<'a> {
    cache: &'a ReferenceCache,
}

impl<'a> PriceParser<'a> {
    pub fn new(cache: &'a ReferenceCache) -> Self {
        Self { cache }
    }

    pub async fn parse_prices(&self, raw: Option<&str>) -> Result<Vec<PriceDraft>> {
        let mut prices = Vec::new();
        for token in raw.into_iter().flat_map(split_prices) {
            let spec = parse_price(token)?;
            prices.push(self.resolve(spec).await?);
        }
        Ok(prices)
    }

    /// 客群走 get-or-create；通路不存在時退化為不限通路
    pub async fn resolve(&self, spec: PriceSpec) -> Result<PriceDraft> {
        let customer_group = match &spec.customer_group {
            Some(name) => Some(Reference::customer_group(
                self.cache.customer_group_id(name).await?,
            )),
            None => None,
        };

        let channel = match &spec.channel_key {
            Some(key) => self.cache.channel_reference(key).await?,
            None => None,
        };

        Ok(PriceDraft {
            currency_code: spec.currency_code,
            cent_amount: spec.cent_amount,
            country_code: spec.country_code,
            customer_group,
            channel,
        })
    }
}
