//! Chain adapters: JSON-RPC for EVM and Solana nodes, REST for the
//! provider API.

pub mod bitcoin;
pub mod evm;
pub mod rest;
pub mod rpc;
pub mod solana;
pub mod tron;

pub use bitcoin::{BitcoinClient, BtcBalance};
pub use evm::EvmClient;
pub use rest::RestClient;
pub use rpc::JsonRpcClient;
pub use solana::{SPL_TOKEN_PROGRAM, SignatureInfo, SolanaClient, has_spl_token_instruction};
pub use tron::{TronClient, TronPage};
