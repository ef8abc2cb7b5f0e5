//! Bitcoin adapter over the provider REST API.

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::instrument;

use super::rest::RestClient;
use crate::domain::BlockchainError;
use crate::domain::amount::parse_decimal;

/// Net balance together with the payload it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct BtcBalance {
    pub net: Decimal,
    pub raw: Value,
}

/// Reads an `incoming`/`outgoing` total. Absent or `null` counts as zero;
/// anything else must parse as a decimal.
fn read_total(payload: &Value, field: &str) -> Result<Decimal, BlockchainError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(Decimal::ZERO),
        Some(value) => parse_decimal(value).ok_or_else(|| {
            BlockchainError::InvalidResponse(format!("{field} is not a decimal: {value}"))
        }),
    }
}

pub struct BitcoinClient {
    rest: RestClient,
}

impl BitcoinClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// `incoming - outgoing`; the result may be negative.
    #[instrument(skip(self))]
    pub async fn get_balance(&self, address: &str) -> Result<BtcBalance, BlockchainError> {
        let payload: Value = self
            .rest
            .get(&format!("/bitcoin/address/balance/{address}"), &[])
            .await?;
        let raw = if payload.is_null() {
            Value::Object(Default::default())
        } else {
            payload
        };
        let net = read_total(&raw, "incoming")? - read_total(&raw, "outgoing")?;
        Ok(BtcBalance { net, raw })
    }

    /// Raw transaction list, forwarded as received.
    #[instrument(skip(self))]
    pub async fn get_transactions(
        &self,
        address: &str,
        page_size: u32,
        offset: u64,
    ) -> Result<Vec<Value>, BlockchainError> {
        let transactions: Option<Vec<Value>> = self
            .rest
            .get(
                &format!("/bitcoin/transaction/address/{address}"),
                &[
                    ("pageSize", page_size.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        Ok(transactions.unwrap_or_default())
    }
}
