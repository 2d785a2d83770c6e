use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use storefetch_domain::{
    Identity, Wallet, WalletAccount, WalletConfig, WalletError, WalletOpener,
};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("open wallet: {source}")]
    OpenWallet {
        path: PathBuf,
        #[source]
        source: WalletError,
    },
    #[error("failed to decrypt any of {accounts} account(s) in wallet {}", .path.display())]
    Decrypt { path: PathBuf, accounts: usize },
}

/// Resolves the signing identity of a service.
///
/// With a wallet configured, accounts are tried in stored order and the first
/// one the password unlocks wins. Without one, or with an empty wallet path, a
/// fresh throwaway key is generated; every such call yields a different key.
pub fn resolve_identity<O>(
    wallet: Option<&WalletConfig>,
    opener: &O,
) -> Result<Identity, IdentityError>
where
    O: WalletOpener,
{
    let Some(wallet) = wallet.filter(|wallet| !wallet.path.as_os_str().is_empty()) else {
        let identity = Identity::generate();
        info!(account = %identity.account(), "using ephemeral signing identity");
        return Ok(identity);
    };

    let opened = opener
        .open(&wallet.path)
        .map_err(|source| IdentityError::OpenWallet {
            path: wallet.path.clone(),
            source,
        })?;

    let accounts = opened.accounts();
    for account in accounts {
        match account.decrypt(&wallet.password) {
            Ok(key) => {
                let identity = Identity::from_signing_key(key);
                info!(
                    wallet = %wallet.path.display(),
                    label = account.label(),
                    account = %identity.account(),
                    "unlocked wallet account"
                );
                return Ok(identity);
            }
            Err(err) => {
                debug!(label = account.label(), %err, "wallet account did not decrypt");
            }
        }
    }

    Err(IdentityError::Decrypt {
        path: wallet.path.clone(),
        accounts: accounts.len(),
    })
}
