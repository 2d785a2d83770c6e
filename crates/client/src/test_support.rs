//! Fakes for the wallet and pool collaborators.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use storefetch_domain::{
    BoxError, PoolConnector, PoolParams, Wallet, WalletAccount, WalletError, WalletOpener,
};

pub fn key(seed: u8) -> SigningKey {
    SigningKey::from_bytes((&[seed; 32]).into()).expect("valid scalar")
}

#[derive(Clone)]
pub struct FakeAccount {
    pub label: String,
    pub password: String,
    pub key: SigningKey,
    pub attempts: Arc<AtomicUsize>,
}

impl FakeAccount {
    pub fn new(label: &str, password: &str, seed: u8) -> Self {
        Self {
            label: label.to_string(),
            password: password.to_string(),
            key: key(seed),
            attempts: Arc::default(),
        }
    }
}

impl WalletAccount for FakeAccount {
    fn label(&self) -> &str {
        &self.label
    }

    fn decrypt(&self, password: &str) -> Result<SigningKey, WalletError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if password == self.password {
            Ok(self.key.clone())
        } else {
            Err(WalletError::Decrypt("wrong password".to_string()))
        }
    }
}

pub struct FakeWallet {
    accounts: Vec<FakeAccount>,
}

impl Wallet for FakeWallet {
    type Account = FakeAccount;

    fn accounts(&self) -> &[FakeAccount] {
        &self.accounts
    }
}

/// Serves in-memory wallets keyed by path; unknown paths fail to open.
#[derive(Default)]
pub struct FakeWalletOpener {
    wallets: HashMap<PathBuf, Vec<FakeAccount>>,
    pub opened: AtomicUsize,
}

impl FakeWalletOpener {
    pub fn with_wallet(mut self, path: impl Into<PathBuf>, accounts: Vec<FakeAccount>) -> Self {
        self.wallets.insert(path.into(), accounts);
        self
    }
}

impl WalletOpener for FakeWalletOpener {
    type Wallet = FakeWallet;

    fn open(&self, path: &Path) -> Result<FakeWallet, WalletError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let accounts = self.wallets.get(path).cloned().ok_or_else(|| {
            WalletError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file or directory",
            ))
        })?;
        Ok(FakeWallet { accounts })
    }
}

#[derive(Debug)]
pub struct FakePool {
    pub params: PoolParams,
}

/// Records every connect call; fails with `failure` when set.
#[derive(Default)]
pub struct FakeConnector {
    pub failure: Option<String>,
    pub calls: Mutex<Vec<PoolParams>>,
}

impl FakeConnector {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            calls: Mutex::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PoolConnector for FakeConnector {
    type Pool = FakePool;

    async fn connect(&self, params: PoolParams) -> Result<FakePool, BoxError> {
        self.calls.lock().unwrap().push(params.clone());
        match &self.failure {
            Some(message) => Err(message.clone().into()),
            None => Ok(FakePool { params }),
        }
    }
}
