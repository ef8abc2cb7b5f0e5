//! TRON adapter over the provider REST API.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use super::rest::RestClient;
use crate::domain::BlockchainError;
use crate::domain::amount::parse_decimal;

#[derive(Debug, Default, Deserialize)]
struct TronAccount {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    balance: Option<Value>,
}

impl TronAccount {
    /// `data.balance` when `data` is an object, else the top-level
    /// `balance`, else zero.
    fn balance(&self) -> Decimal {
        self.data
            .as_ref()
            .filter(|data| data.is_object())
            .and_then(|data| data.get("balance"))
            .and_then(parse_decimal)
            .or_else(|| self.balance.as_ref().and_then(parse_decimal))
            .unwrap_or(Decimal::ZERO)
    }
}

/// One page of account transactions plus the provider's opaque cursor.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct TronPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<Value>,
    #[serde(default)]
    pub next: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

pub struct TronClient {
    rest: RestClient,
}

impl TronClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    #[instrument(skip(self))]
    pub async fn get_balance(&self, address: &str) -> Result<Decimal, BlockchainError> {
        let account: Option<TronAccount> = self
            .rest
            .get(&format!("/tron/account/{address}"), &[])
            .await?;
        Ok(account.unwrap_or_default().balance())
    }

    #[instrument(skip(self))]
    pub async fn get_transactions(
        &self,
        address: &str,
        page_size: u32,
        next: Option<&str>,
    ) -> Result<TronPage, BlockchainError> {
        self.page(&format!("/tron/transaction/account/{address}"), page_size, next)
            .await
    }

    /// TRC-20 transfers of `contract` only.
    #[instrument(skip(self))]
    pub async fn get_trc20_transactions(
        &self,
        address: &str,
        contract: &str,
        page_size: u32,
        next: Option<&str>,
    ) -> Result<TronPage, BlockchainError> {
        let mut page = self
            .page(
                &format!("/tron/transaction/account/{address}/trc20"),
                page_size,
                next,
            )
            .await?;
        page.data
            .retain(|item| item.get("token").and_then(Value::as_str) == Some(contract));
        Ok(page)
    }

    async fn page(
        &self,
        path: &str,
        page_size: u32,
        next: Option<&str>,
    ) -> Result<TronPage, BlockchainError> {
        let mut query = vec![("pageSize", page_size.to_string())];
        if let Some(cursor) = next.filter(|c| !c.is_empty()) {
            query.push(("next", cursor.to_string()));
        }
        let page: Option<TronPage> = self.rest.get(path, &query).await?;
        Ok(page.unwrap_or_default())
    }
}
