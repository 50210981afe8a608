//! Client of the NEAR light client contract deployed on Ethereum.
//!
//! The contract interface is loaded at runtime from its JSON ABI, so the
//! relay works with any deployment exposing the functions in
//! [`REQUIRED_FUNCTIONS`].

use std::path::Path;

use alloy::contract::{ContractInstance, Interface};
use alloy::dyn_abi::{DynSolValue, Specifier};
use alloy::eips::BlockNumberOrTag;
use alloy::json_abi::JsonAbi;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use near2eth_relay::near_types::{hash::CryptoHash, BlockHeight};
use near2eth_relay::types::{ClientHead, TxOutcome};
use near2eth_relay::{RelayError, TargetChainClient};
use url::Url;

use crate::config::EthRpcSection;

/// Contract functions the relay calls.
pub const REQUIRED_FUNCTIONS: [&str; 8] = [
    "initialized",
    "initWithBlock",
    "last",
    "blockHashes",
    "LOCK_ETH_AMOUNT",
    "balanceOf",
    "deposit",
    "addLightClientBlock",
];

/// Validated Ethereum settings, built before any network access.
#[derive(Debug, Clone)]
pub struct EthBridgeSettings {
    /// Ethereum JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Signer of all transactions.
    pub signer: PrivateKeySigner,
    /// Interface of the verifier contract.
    pub abi: JsonAbi,
    /// Address of the verifier contract.
    pub address: Address,
    /// Gas limit of every transaction.
    pub gas_limit: u64,
}

impl EthBridgeSettings {
    /// Check every Ethereum setting and load the contract ABI.
    pub fn from_config(section: &EthRpcSection) -> Result<Self, RelayError> {
        let rpc_url = section.rpc_endpoint.parse::<Url>().map_err(|err| {
            RelayError::Configuration(format!(
                "invalid eth_rpc.rpc_endpoint `{}`: {}",
                section.rpc_endpoint, err
            ))
        })?;
        let signer = parse_signer(&section.master_sk)?;
        let address = section.client_address.parse::<Address>().map_err(|err| {
            RelayError::Configuration(format!(
                "invalid eth_rpc.client_address `{}`: {}",
                section.client_address, err
            ))
        })?;
        let abi = load_abi(Path::new(&section.client_abi_path))?;
        Ok(Self {
            rpc_url,
            signer,
            abi,
            address,
            gas_limit: section.gas_limit,
        })
    }
}

/// Parse a hex private key, with or without `0x`.
pub fn parse_signer(master_sk: &str) -> Result<PrivateKeySigner, RelayError> {
    if master_sk.is_empty() {
        return Err(RelayError::Configuration(
            "eth_rpc.master_sk is not set".to_owned(),
        ));
    }
    let key_hex = master_sk.strip_prefix("0x").unwrap_or(master_sk);
    key_hex
        .parse::<PrivateKeySigner>()
        .map_err(|err| RelayError::Configuration(format!("invalid eth_rpc.master_sk: {}", err)))
}

/// Read the contract ABI, either a plain ABI array or a build artifact
/// with an `abi` field, and check it declares every required function.
pub fn load_abi(path: &Path) -> Result<JsonAbi, RelayError> {
    let json = std::fs::read_to_string(path).map_err(|err| {
        RelayError::Configuration(format!("cannot read ABI file {}: {}", path.display(), err))
    })?;
    let abi = parse_abi(&json).map_err(|err| {
        RelayError::Configuration(format!("invalid ABI file {}: {}", path.display(), err))
    })?;
    check_abi(&abi)?;
    Ok(abi)
}

fn parse_abi(json: &str) -> Result<JsonAbi, serde_json::Error> {
    serde_json::from_str::<JsonAbi>(json).or_else(|err| {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value.get("abi") {
            Some(abi) => serde_json::from_value(abi.clone()),
            None => Err(err),
        }
    })
}

/// Fails with the list of required functions the ABI does not declare.
pub fn check_abi(abi: &JsonAbi) -> Result<(), RelayError> {
    let missing: Vec<&str> = REQUIRED_FUNCTIONS
        .iter()
        .copied()
        .filter(|name| abi.function(name).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RelayError::Configuration(format!(
            "contract ABI lacks functions: {}",
            missing.join(", ")
        )))
    }
}

/// [`TargetChainClient`] over an alloy provider with a local signer.
pub struct EthBridgeClient {
    provider: DynProvider,
    contract: ContractInstance<DynProvider>,
    signer_address: Address,
    gas_limit: u64,
}

impl EthBridgeClient {
    /// Build the client. No request is sent until the first call.
    pub fn new(settings: EthBridgeSettings) -> Self {
        let signer_address = settings.signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(settings.signer))
            .connect_http(settings.rpc_url)
            .erased();
        let contract = ContractInstance::new(
            settings.address,
            provider.clone(),
            Interface::new(settings.abi),
        );
        Self {
            provider,
            contract,
            signer_address,
            gas_limit: settings.gas_limit,
        }
    }

    /// Address of the verifier contract.
    pub fn contract_address(&self) -> Address {
        *self.contract.address()
    }

    async fn call(&self, name: &str, args: &[DynSolValue]) -> Result<Vec<DynSolValue>, RelayError> {
        self.contract
            .function(name, args)
            .map_err(|err| contract_error(name, err))?
            .call()
            .await
            .map_err(|err| RelayError::transport(format!("call to `{}` failed: {}", name, err)))
    }

    /// Send a transaction and wait for its receipt.
    async fn send(
        &self,
        name: &str,
        args: &[DynSolValue],
        value: U256,
    ) -> Result<TxOutcome, RelayError> {
        let pending = self
            .contract
            .function(name, args)
            .map_err(|err| contract_error(name, err))?
            .gas(self.gas_limit)
            .value(value)
            .send()
            .await
            .map_err(|err| contract_error(name, err))?;
        let tx_hash = *pending.tx_hash();
        tracing::debug!(method = name, tx = %tx_hash, "transaction sent");

        let receipt = pending.get_receipt().await.map_err(|err| {
            RelayError::transport(format!("receipt of {} unavailable: {}", tx_hash, err))
        })?;
        if !receipt.status() {
            return Err(RelayError::rejected(
                name,
                format!("transaction {} reverted", tx_hash),
            ));
        }
        Ok(TxOutcome {
            tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }

    /// Coerce `text` to the type of input `index` of `function`.
    fn input(&self, function: &str, index: usize, text: &str) -> Result<DynSolValue, RelayError> {
        let param = self
            .contract
            .abi()
            .function(function)
            .and_then(|overloads| overloads.first())
            .and_then(|f| f.inputs.get(index))
            .ok_or_else(|| {
                RelayError::Configuration(format!("`{}` has no input {}", function, index))
            })?;
        param
            .resolve()
            .and_then(|ty| ty.coerce_str(text))
            .map_err(|err| RelayError::Configuration(format!("input of `{}`: {}", function, err)))
    }

    /// Position of the named output of `function`, or `fallback` when the
    /// ABI leaves outputs unnamed.
    fn output_index(&self, function: &str, output: &str, fallback: usize) -> usize {
        self.contract
            .abi()
            .function(function)
            .and_then(|overloads| overloads.first())
            .and_then(|f| f.outputs.iter().position(|p| p.name == output))
            .unwrap_or(fallback)
    }
}

fn contract_error(method: &str, err: alloy::contract::Error) -> RelayError {
    match &err {
        alloy::contract::Error::UnknownFunction(_) => {
            RelayError::Configuration(format!("`{}`: {}", method, err))
        }
        // The node refused the transaction, e.g. a revert during gas estimation.
        alloy::contract::Error::TransportError(rpc) if rpc.as_error_resp().is_some() => {
            RelayError::rejected(method, err)
        }
        _ => RelayError::transport(format!("`{}`: {}", method, err)),
    }
}

fn output<'a>(
    values: &'a [DynSolValue],
    index: usize,
    method: &str,
) -> Result<&'a DynSolValue, RelayError> {
    values.get(index).ok_or_else(|| {
        RelayError::InvalidResponse(format!("`{}` returned no output {}", method, index))
    })
}

fn uint_output(values: &[DynSolValue], index: usize, method: &str) -> Result<U256, RelayError> {
    output(values, index, method)?
        .as_uint()
        .map(|(value, _)| value)
        .ok_or_else(|| RelayError::InvalidResponse(format!("`{}` output is not a uint", method)))
}

fn u64_output(values: &[DynSolValue], index: usize, method: &str) -> Result<u64, RelayError> {
    let value = uint_output(values, index, method)?;
    u64::try_from(value)
        .map_err(|_| RelayError::InvalidResponse(format!("`{}` output {} overflows u64", method, value)))
}

#[async_trait]
impl TargetChainClient for EthBridgeClient {
    fn signer_address(&self) -> Address {
        self.signer_address
    }

    async fn is_initialized(&self) -> Result<bool, RelayError> {
        let values = self.call("initialized", &[]).await?;
        output(&values, 0, "initialized")?
            .as_bool()
            .ok_or_else(|| RelayError::InvalidResponse("`initialized` is not a bool".to_owned()))
    }

    async fn init_with_block(&self, data: Vec<u8>) -> Result<TxOutcome, RelayError> {
        self.send("initWithBlock", &[DynSolValue::Bytes(data)], U256::ZERO)
            .await
    }

    async fn head(&self) -> Result<ClientHead, RelayError> {
        let values = self.call("last", &[]).await?;
        let height = u64_output(&values, self.output_index("last", "height", 0), "last")?;
        let valid_after = u64_output(
            &values,
            self.output_index("last", "validAfter", values.len().saturating_sub(1)),
            "last",
        )?;
        Ok(ClientHead {
            height,
            valid_after,
        })
    }

    async fn block_hash(&self, height: BlockHeight) -> Result<CryptoHash, RelayError> {
        let arg = self.input("blockHashes", 0, &height.to_string())?;
        let values = self.call("blockHashes", &[arg]).await?;
        let (bytes, _) = output(&values, 0, "blockHashes")?
            .as_fixed_bytes()
            .ok_or_else(|| RelayError::InvalidResponse("`blockHashes` is not bytes32".to_owned()))?;
        CryptoHash::try_from(bytes)
            .map_err(|_| RelayError::InvalidResponse("`blockHashes` is not 32 bytes".to_owned()))
    }

    async fn required_stake_amount(&self) -> Result<U256, RelayError> {
        let values = self.call("LOCK_ETH_AMOUNT", &[]).await?;
        uint_output(&values, 0, "LOCK_ETH_AMOUNT")
    }

    async fn stake_balance_of(&self, address: Address) -> Result<U256, RelayError> {
        let values = self
            .call("balanceOf", &[DynSolValue::Address(address)])
            .await?;
        uint_output(&values, 0, "balanceOf")
    }

    async fn deposit(&self, amount: U256) -> Result<TxOutcome, RelayError> {
        self.send("deposit", &[], amount).await
    }

    async fn add_light_client_block(&self, data: Vec<u8>) -> Result<TxOutcome, RelayError> {
        self.send("addLightClientBlock", &[DynSolValue::Bytes(data)], U256::ZERO)
            .await
    }

    async fn current_chain_time(&self) -> Result<u64, RelayError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(RelayError::transport)?
            .ok_or_else(|| RelayError::InvalidResponse("latest block not found".to_owned()))?;
        Ok(block.header.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function_json(name: &str) -> String {
        format!(
            r#"{{"type":"function","name":"{}","inputs":[],"outputs":[],"stateMutability":"nonpayable"}}"#,
            name
        )
    }

    fn abi_json(names: &[&str]) -> String {
        let functions: Vec<String> = names.iter().map(|n| function_json(n)).collect();
        format!("[{}]", functions.join(","))
    }

    #[test]
    fn complete_abi_passes() {
        let abi = parse_abi(&abi_json(&REQUIRED_FUNCTIONS)).unwrap();
        assert!(check_abi(&abi).is_ok());
    }

    #[test]
    fn missing_functions_are_listed() {
        let abi = parse_abi(&abi_json(&["initialized", "last", "deposit"])).unwrap();
        match check_abi(&abi) {
            Err(RelayError::Configuration(message)) => {
                assert!(message.contains("addLightClientBlock"));
                assert!(message.contains("LOCK_ETH_AMOUNT"));
                assert!(!message.contains("deposit"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn build_artifacts_are_accepted() {
        let artifact = format!(
            r#"{{"contractName":"NearBridge","abi":{}}}"#,
            abi_json(&REQUIRED_FUNCTIONS)
        );
        let abi = parse_abi(&artifact).unwrap();
        assert!(abi.function("addLightClientBlock").is_some());
        assert!(parse_abi(r#"{"contractName":"NearBridge"}"#).is_err());
    }

    #[test]
    fn signer_key_is_validated() {
        assert!(matches!(
            parse_signer(""),
            Err(RelayError::Configuration(_))
        ));
        assert!(matches!(
            parse_signer("0xnothex"),
            Err(RelayError::Configuration(_))
        ));
        let key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let signer = parse_signer(key).unwrap();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
        assert_eq!(parse_signer(&key[2..]).unwrap().address(), signer.address());
    }

    #[test]
    fn settings_reject_bad_values_before_network_access() {
        let section = EthRpcSection {
            rpc_endpoint: "not a url".to_owned(),
            ..EthRpcSection::default()
        };
        assert!(matches!(
            EthBridgeSettings::from_config(&section),
            Err(RelayError::Configuration(_))
        ));

        let section = EthRpcSection {
            master_sk: "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                .to_owned(),
            client_address: "0x0000000000000000000000000000000000000001".to_owned(),
            client_abi_path: "/nonexistent/NearBridge.abi".to_owned(),
            ..EthRpcSection::default()
        };
        match EthBridgeSettings::from_config(&section) {
            Err(RelayError::Configuration(message)) => assert!(message.contains("ABI")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn uint_outputs_are_range_checked() {
        let values = vec![
            DynSolValue::Uint(U256::from(42u64), 64),
            DynSolValue::Uint(U256::MAX, 256),
            DynSolValue::Bool(true),
        ];
        assert_eq!(u64_output(&values, 0, "last").unwrap(), 42);
        assert!(matches!(
            u64_output(&values, 1, "last"),
            Err(RelayError::InvalidResponse(_))
        ));
        assert!(uint_output(&values, 2, "last").is_err());
        assert!(uint_output(&values, 3, "last").is_err());
    }
}
