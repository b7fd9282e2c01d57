use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use harvestflow_core::{AppError, AppResult};

use crate::wallet::{PaymentOutput, Wallet};

/// A signing wallet talking to an EVM JSON-RPC endpoint.
///
/// Nonce, gas and chain id are filled by the provider's recommended fillers.
pub struct EvmWallet {
    provider: DynProvider,
    address: Address,
}

/// Create a signing wallet from an RPC URL and a hex private key.
pub fn create_wallet(rpc_url: &str, private_key: &str) -> eyre::Result<EvmWallet> {
    let signer: PrivateKeySigner = private_key.trim().parse()?;
    let address = signer.address();
    let url = rpc_url.parse()?;

    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(url)
        .erased();

    tracing::info!(address = %address, rpc = %rpc_url, "Wallet ready");
    Ok(EvmWallet { provider, address })
}

/// Parse a payment output into a recipient and a value.
fn parse_output(output: &PaymentOutput) -> AppResult<(Address, U256)> {
    let to: Address = output
        .address
        .parse()
        .map_err(|e| AppError::validation(format!("invalid address `{}`: {e}", output.address)))?;
    let value = U256::from_str_radix(&output.amount, 10)
        .map_err(|e| AppError::validation(format!("invalid amount `{}`: {e}", output.amount)))?;
    Ok((to, value))
}

#[async_trait]
impl Wallet for EvmWallet {
    async fn build_and_sign_and_submit(&self, outputs: &[PaymentOutput]) -> AppResult<String> {
        // An EVM transaction has exactly one recipient.
        let [output] = outputs else {
            return Err(AppError::validation(format!(
                "expected exactly one payment output, got {}",
                outputs.len()
            )));
        };
        let (to, value) = parse_output(output)?;

        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(to)
            .with_value(value);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(AppError::wallet)?;
        let hash = format!("{:#x}", pending.tx_hash());

        tracing::info!(to = %to, value = %value, tx = %hash, "Payment submitted");
        Ok(hash)
    }

    async fn get_balance(&self) -> AppResult<String> {
        let balance = self
            .provider
            .get_balance(self.address)
            .await
            .map_err(AppError::wallet)?;
        Ok(balance.to_string())
    }

    async fn get_change_address(&self) -> AppResult<String> {
        Ok(format!("{:#x}", self.address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (anvil account #0).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn change_address_is_the_signer() {
        let wallet = create_wallet("http://127.0.0.1:8545", DEV_KEY).unwrap();
        assert_eq!(
            wallet.get_change_address().await.unwrap(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn rejects_bad_key() {
        assert!(create_wallet("http://127.0.0.1:8545", "not-a-key").is_err());
    }

    #[test]
    fn parses_outputs() {
        let output = PaymentOutput {
            address: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".into(),
            amount: "1000".into(),
        };
        let (_, value) = parse_output(&output).unwrap();
        assert_eq!(value, U256::from(1000u64));

        let bad = PaymentOutput {
            address: "nowhere".into(),
            amount: "1".into(),
        };
        assert!(matches!(parse_output(&bad), Err(AppError::Validation(_))));

        let bad = PaymentOutput {
            address: output.address.clone(),
            amount: "1.5".into(),
        };
        assert!(matches!(parse_output(&bad), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn multi_output_batches_are_rejected() {
        let wallet = create_wallet("http://127.0.0.1:8545", DEV_KEY).unwrap();
        let output = PaymentOutput {
            address: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".into(),
            amount: "1".into(),
        };
        let err = wallet
            .build_and_sign_and_submit(&[output.clone(), output])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = wallet.build_and_sign_and_submit(&[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
