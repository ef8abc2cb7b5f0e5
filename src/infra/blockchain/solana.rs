//! Solana adapter.
//!
//! History goes through the node's JSON-RPC interface; the native balance is
//! read from the provider's REST API.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::rest::RestClient;
use super::rpc::JsonRpcClient;
use crate::domain::BlockchainError;
use crate::domain::amount::parse_decimal;

/// SPL Token program id.
pub const SPL_TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Entry returned by `getSignaturesForAddress`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignatureInfo {
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(rename = "blockTime", default)]
    pub block_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenAccounts {
    #[serde(default)]
    value: Vec<Value>,
}

pub struct SolanaClient {
    rpc: JsonRpcClient,
    rest: RestClient,
}

impl SolanaClient {
    pub fn new(rpc: JsonRpcClient, rest: RestClient) -> Self {
        Self { rpc, rest }
    }

    /// Native balance as reported by the provider; zero when absent.
    #[instrument(skip(self))]
    pub async fn get_balance(&self, address: &str) -> Result<Decimal, BlockchainError> {
        let payload: Value = self
            .rest
            .get(&format!("/solana/account/balance/{address}"), &[])
            .await?;
        Ok(payload
            .get("balance")
            .and_then(parse_decimal)
            .unwrap_or(Decimal::ZERO))
    }

    #[instrument(skip(self))]
    pub async fn get_signatures_for_address(
        &self,
        address: &str,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<SignatureInfo>, BlockchainError> {
        let mut options = json!({ "limit": limit });
        if let Some(before) = before.filter(|b| !b.is_empty()) {
            options["before"] = json!(before);
        }
        let signatures: Option<Vec<SignatureInfo>> = self
            .rpc
            .call("getSignaturesForAddress", json!([address, options]))
            .await?;
        Ok(signatures.unwrap_or_default())
    }

    /// Parsed transaction; an unknown signature yields an empty object.
    #[instrument(skip(self))]
    pub async fn get_transaction(&self, signature: &str) -> Result<Value, BlockchainError> {
        let tx: Option<Value> = self
            .rpc
            .call(
                "getTransaction",
                json!([
                    signature,
                    {"encoding": "jsonParsed", "maxSupportedTransactionVersion": 0}
                ]),
            )
            .await?;
        Ok(tx.unwrap_or_else(|| json!({})))
    }

    /// Token account pubkeys owned by `owner` for `mint`.
    #[instrument(skip(self))]
    pub async fn get_token_accounts_by_owner(
        &self,
        owner: &str,
        mint: &str,
    ) -> Result<Vec<String>, BlockchainError> {
        let accounts: Option<TokenAccounts> = self
            .rpc
            .call(
                "getTokenAccountsByOwner",
                json!([owner, {"mint": mint}, {"encoding": "jsonParsed"}]),
            )
            .await?;
        Ok(accounts
            .map(|a| a.value)
            .unwrap_or_default()
            .iter()
            .filter_map(|account| account.get("pubkey").and_then(Value::as_str))
            .filter(|pubkey| !pubkey.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// First token account of `owner` for `mint`. This is a lookup, not a
    /// program-derived-address computation.
    pub async fn find_associated_token_account(
        &self,
        owner: &str,
        mint: &str,
    ) -> Result<Option<String>, BlockchainError> {
        let account = self
            .get_token_accounts_by_owner(owner, mint)
            .await?
            .into_iter()
            .next();
        debug!(owner, found = account.is_some(), "Resolved token account");
        Ok(account)
    }
}

/// Whether any top-level instruction of a `jsonParsed` transaction targets
/// the SPL Token program.
#[must_use]
pub fn has_spl_token_instruction(tx: &Value) -> bool {
    tx.pointer("/transaction/message/instructions")
        .and_then(Value::as_array)
        .is_some_and(|instructions| {
            instructions.iter().any(|ix| {
                ix.get("program").and_then(Value::as_str) == Some("spl-token")
                    || ix.get("programId").and_then(Value::as_str) == Some(SPL_TOKEN_PROGRAM)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::http::{ResilientClient, RetryPolicy};
    use crate::test_utils::MockTransport;
    use secrecy::SecretString;
    use std::sync::Arc;
    use std::time::Duration;

    const OWNER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn client(mock: &Arc<MockTransport>) -> SolanaClient {
        let http = Arc::new(ResilientClient::new(mock.clone(), RetryPolicy::immediate(0)));
        let rpc = JsonRpcClient::new(
            Arc::clone(&http),
            "http://sol.mock",
            SecretString::from("key"),
            Duration::from_secs(25),
        );
        let rest = RestClient::new(
            http,
            "http://provider.mock/v3",
            SecretString::from("key"),
            Duration::from_secs(20),
        );
        SolanaClient::new(rpc, rest)
    }

    #[test]
    fn test_spl_instruction_detection() {
        let by_name = json!({"transaction": {"message": {"instructions": [
            {"program": "system"},
            {"program": "spl-token", "parsed": {}}
        ]}}});
        let by_id = json!({"transaction": {"message": {"instructions": [
            {"programId": SPL_TOKEN_PROGRAM}
        ]}}});
        let other = json!({"transaction": {"message": {"instructions": [
            {"program": "system", "programId": "11111111111111111111111111111111"},
            {"programIdIndex": 3}
        ]}}});

        assert!(has_spl_token_instruction(&by_name));
        assert!(has_spl_token_instruction(&by_id));
        assert!(!has_spl_token_instruction(&other));
        assert!(!has_spl_token_instruction(&json!({})));
    }

    #[tokio::test]
    async fn test_balance_from_rest() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json("/solana/account/balance/", json!({"balance": "2.5"}));

        let balance = client(&mock).get_balance(OWNER).await.unwrap();

        assert_eq!(balance.to_string(), "2.5");
        assert!(mock.requests()[0].url.ends_with(&format!("/solana/account/balance/{OWNER}")));
    }

    #[tokio::test]
    async fn test_balance_missing_is_zero() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json("/solana/account/balance/", json!([]));

        let balance = client(&mock).get_balance(OWNER).await.unwrap();

        assert_eq!(balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_signatures_options() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_rpc(
            "getSignaturesForAddress",
            json!([{"signature": "s1", "slot": 10, "blockTime": 1700000000}, {"slot": 11}]),
        );
        let solana = client(&mock);

        let sigs = solana
            .get_signatures_for_address(OWNER, 5, Some("s0"))
            .await
            .unwrap();
        solana
            .get_signatures_for_address(OWNER, 5, None)
            .await
            .unwrap();

        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0].signature.as_deref(), Some("s1"));
        assert_eq!(sigs[0].block_time, Some(1_700_000_000));
        assert!(sigs[1].signature.is_none());

        let calls = mock.rpc_requests("getSignaturesForAddress");
        let first = &calls[0].body.as_ref().unwrap()["params"][1];
        let second = &calls[1].body.as_ref().unwrap()["params"][1];
        assert_eq!(first, &json!({"limit": 5, "before": "s0"}));
        assert_eq!(second, &json!({"limit": 5}));
    }

    #[tokio::test]
    async fn test_null_transaction_becomes_empty_object() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_rpc("getTransaction", Value::Null);

        let tx = client(&mock).get_transaction("s1").await.unwrap();

        assert_eq!(tx, json!({}));
        let requests = mock.requests();
        let params = &requests[0].body.as_ref().unwrap()["params"];
        assert_eq!(params[1]["encoding"], "jsonParsed");
        assert_eq!(params[1]["maxSupportedTransactionVersion"], 0);
    }

    #[tokio::test]
    async fn test_token_account_lookup() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_rpc(
            "getTokenAccountsByOwner",
            json!({"context": {"slot": 1}, "value": [
                {"pubkey": "Ata1111111111111111111111111111111"},
                {"account": {}},
                {"pubkey": "Ata2222222222222222222222222222222"}
            ]}),
        );
        let solana = client(&mock);

        let accounts = solana
            .get_token_accounts_by_owner(OWNER, "mint")
            .await
            .unwrap();
        let ata = solana
            .find_associated_token_account(OWNER, "mint")
            .await
            .unwrap();

        assert_eq!(accounts.len(), 2);
        assert_eq!(ata.as_deref(), Some("Ata1111111111111111111111111111111"));
        let requests = mock.requests();
        let params = &requests[0].body.as_ref().unwrap()["params"];
        assert_eq!(params[1], json!({"mint": "mint"}));
    }

    #[tokio::test]
    async fn test_no_token_account() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_rpc("getTokenAccountsByOwner", json!({"value": []}));

        let ata = client(&mock)
            .find_associated_token_account(OWNER, "mint")
            .await
            .unwrap();

        assert!(ata.is_none());
    }
}
