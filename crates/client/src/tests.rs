use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use storefetch_domain::{
    BlockFetcherConfig, ConfigError, ContainerIdError, Identity, ServiceConfig,
    StateFetcherConfig, WalletConfig,
};
use tokio::time::sleep;

use crate::{
    handle::{BootstrapError, ServiceHandle},
    identity::IdentityError,
    pool::{PoolError, POOL_TIMEOUTS},
    retry::{is_cancellation, ExecuteError, RetryPolicy, MIN_BACKOFF},
    test_support::{key, FakeAccount, FakeConnector, FakePool, FakeWalletOpener},
};

const CONTAINER: &str = "11111111111111111111111111111111";

fn service() -> ServiceConfig {
    ServiceConfig {
        enabled: true,
        container_id: CONTAINER.to_string(),
        addresses: vec!["grpc://st1.storage:8080".to_string()],
        ..ServiceConfig::default()
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        backoff_factor: 2,
        max_backoff: Duration::from_millis(4),
    }
}

async fn ephemeral_handle() -> ServiceHandle<FakePool> {
    ServiceHandle::new(&service(), &FakeWalletOpener::default(), &FakeConnector::default())
        .await
        .expect("handle builds")
}

#[test]
fn handle_is_shareable_across_tasks() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ServiceHandle<FakePool>>();
}

#[tokio::test]
async fn builds_with_ephemeral_identity() {
    let connector = FakeConnector::default();
    let handle = ServiceHandle::new(&service(), &FakeWalletOpener::default(), &connector)
        .await
        .expect("handle builds");

    assert_eq!(handle.container_id().to_string(), CONTAINER);
    assert_eq!(handle.policy(), &RetryPolicy::default());
    assert!(!handle.scope().is_cancelled());

    let params = &handle.pool().params;
    assert_eq!(params.addresses, service().addresses);
    assert_eq!(params.timeouts, POOL_TIMEOUTS);
    assert_eq!(
        params.signer.verifying_key(),
        handle.identity().verifying_key()
    );
    assert_eq!(connector.call_count(), 1);
}

#[tokio::test]
async fn builds_with_wallet_identity() {
    let config = BlockFetcherConfig {
        service: ServiceConfig {
            unlock_wallet: Some(WalletConfig::new("/etc/fetcher/wallet.json", "pass")),
            ..service()
        },
        ..BlockFetcherConfig::default()
    };
    let wallets = FakeWalletOpener::default().with_wallet(
        "/etc/fetcher/wallet.json",
        vec![FakeAccount::new("NAccount", "pass", 9)],
    );

    let handle = ServiceHandle::new(&config, &wallets, &FakeConnector::default())
        .await
        .expect("handle builds");

    assert_eq!(
        handle.identity().account(),
        Identity::from_signing_key(key(9)).account()
    );
}

#[tokio::test]
async fn invalid_config_fails_before_any_io() {
    let config = BlockFetcherConfig {
        service: service(),
        oid_batch_size: 128_000,
        bqueue_size: 1000,
        ..BlockFetcherConfig::default()
    };
    let wallets = FakeWalletOpener::default();
    let connector = FakeConnector::default();

    let err = ServiceHandle::new(&config, &wallets, &connector)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Config(ConfigError::QueueSmallerThanBatch { .. })
    ));
    assert_eq!(wallets.opened.load(Ordering::SeqCst), 0);
    assert_eq!(connector.call_count(), 0);
}

#[tokio::test]
async fn wallet_failure_aborts_construction() {
    let config = StateFetcherConfig {
        service: ServiceConfig {
            unlock_wallet: Some(WalletConfig::new("bad/path.json", "wrong-pwd")),
            ..service()
        },
        ..StateFetcherConfig::default()
    };
    let connector = FakeConnector::default();

    let err = ServiceHandle::new(&config, &FakeWalletOpener::default(), &connector)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Identity(IdentityError::OpenWallet { .. })
    ));
    assert!(err.to_string().contains("open wallet:"));
    assert_eq!(connector.call_count(), 0);
}

#[tokio::test]
async fn undecryptable_wallet_aborts_construction() {
    let config = ServiceConfig {
        unlock_wallet: Some(WalletConfig::new("/w.json", "wrong")),
        ..service()
    };
    let wallets =
        FakeWalletOpener::default().with_wallet("/w.json", vec![FakeAccount::new("N", "pass", 1)]);
    let connector = FakeConnector::default();

    let err = ServiceHandle::new(&config, &wallets, &connector)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Identity(IdentityError::Decrypt { accounts: 1, .. })
    ));
    assert_eq!(connector.call_count(), 0);
}

#[tokio::test]
async fn undecodable_container_aborts_construction() {
    // Disabled configs pass validation but still cannot yield a usable handle.
    let config = ServiceConfig {
        enabled: false,
        container_id: String::new(),
        ..service()
    };
    let connector = FakeConnector::default();

    let err = ServiceHandle::new(&config, &FakeWalletOpener::default(), &connector)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::ContainerId(ContainerIdError::Empty)
    ));
    assert_eq!(connector.call_count(), 0);
}

#[tokio::test]
async fn pool_failure_aborts_construction() {
    let connector = FakeConnector::failing("no healthy client");
    let err = ServiceHandle::new(&service(), &FakeWalletOpener::default(), &connector)
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Pool(PoolError::Init(_))));
    assert_eq!(err.to_string(), "failed to create service: no healthy client");
}

#[tokio::test]
async fn disabled_service_stays_inactive() {
    let config = StateFetcherConfig::default();
    let wallets = FakeWalletOpener::default();
    let connector = FakeConnector::default();

    let handle = ServiceHandle::bootstrap_if_enabled(&config, &wallets, &connector)
        .await
        .expect("disabled config is fine");

    assert!(handle.is_none());
    assert_eq!(wallets.opened.load(Ordering::SeqCst), 0);
    assert_eq!(connector.call_count(), 0);

    let enabled = ServiceHandle::bootstrap_if_enabled(&service(), &wallets, &connector)
        .await
        .expect("enabled config builds");
    assert!(enabled.is_some());
}

#[tokio::test]
async fn concurrent_callers_share_one_handle() {
    let handle = Arc::new(ephemeral_handle().await.with_policy(fast_policy()));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for worker in 0..8usize {
        let handle = Arc::clone(&handle);
        let calls = Arc::clone(&calls);
        tasks.push(tokio::spawn(async move {
            let mut attempts = 0;
            handle
                .execute(|| {
                    attempts += 1;
                    calls.fetch_add(1, Ordering::SeqCst);
                    let attempt = attempts;
                    async move {
                        if attempt < 2 {
                            Err(format!("worker {worker}: node unavailable"))
                        } else {
                            Ok(worker)
                        }
                    }
                })
                .await
        }));
    }

    for (worker, task) in tasks.into_iter().enumerate() {
        let result = task.await.expect("task completes");
        assert_eq!(result.ok(), Some(worker));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 16);
}

#[tokio::test]
async fn cancelling_the_handle_stops_pending_retries() {
    let handle = Arc::new(
        ephemeral_handle()
            .await
            .with_policy(RetryPolicy {
                initial_backoff: Duration::from_secs(60),
                max_backoff: Duration::from_secs(60),
                ..RetryPolicy::default()
            }),
    );
    let calls = Arc::new(AtomicUsize::new(0));

    let pending = {
        let handle = Arc::clone(&handle);
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
            handle
                .execute(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async {
                        Err::<(), _>(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "search objects: timeout",
                        ))
                    }
                })
                .await
        })
    };

    sleep(Duration::from_millis(20)).await;
    handle.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("cancellation interrupts the backoff")
        .expect("task completes");

    let err = result.unwrap_err();
    assert!(matches!(err, ExecuteError::Cancelled(_)));
    assert!(is_cancellation(&err));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(handle.scope().is_cancelled());
}

#[tokio::test]
async fn with_policy_keeps_the_scope() {
    let handle = ephemeral_handle().await;
    let scope = handle.scope().clone();
    let handle = handle.with_policy(fast_policy());

    scope.cancel();
    assert!(handle.scope().is_cancelled());
    assert_eq!(handle.policy(), &fast_policy());
}

#[tokio::test]
async fn with_policy_normalizes_degenerate_backoff() {
    let handle = ephemeral_handle().await.with_policy(RetryPolicy {
        initial_backoff: Duration::ZERO,
        backoff_factor: 0,
        ..fast_policy()
    });

    assert_eq!(handle.policy().initial_backoff, MIN_BACKOFF);
    assert_eq!(handle.policy().backoff_factor, 2);
    assert_eq!(
        handle.policy().backoff_schedule().collect::<Vec<_>>(),
        vec![Duration::from_millis(1), Duration::from_millis(2)]
    );
}
