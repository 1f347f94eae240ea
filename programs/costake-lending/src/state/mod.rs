pub mod derivative;
pub mod nft_position;
pub mod pool_config;
pub mod reserve;
pub mod scaled_balance;
pub mod wallets;

pub use derivative::*;
pub use nft_position::*;
pub use pool_config::*;
pub use reserve::*;
pub use scaled_balance::*;
pub use wallets::*;
