pub mod provider;
pub mod wallet;

pub use provider::{EvmWallet, create_wallet};
pub use wallet::{PaymentOutput, Wallet};
