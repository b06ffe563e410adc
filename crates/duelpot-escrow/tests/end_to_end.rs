//! End-to-end tests through `MatchServer`.
//!
//! Every test drives the public API against an in-memory chain and checks
//! both the returned results and what actually hit the chain.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use duelpot_chain::{ChainAdapter, FailureMode, MockChain};
use duelpot_custody::KeyCustodyVault;
use duelpot_escrow::{MatchPhase, MatchServer, SettlementStatus};
use duelpot_types::{
    DuelpotError, ErrorKind, GameConfig, KdfParams, MachineSecret, MatchId, Network, ServerConfig,
};
use rust_decimal::Decimal;

fn reserve_tez() -> Decimal {
    Decimal::new(5, 1)
}

fn vault() -> Arc<KeyCustodyVault> {
    Arc::new(KeyCustodyVault::with_kdf(
        MachineSecret::new(b"end-to-end machine secret".to_vec()).unwrap(),
        KdfParams::fast_for_tests(),
    )
    .unwrap())
}

fn server_with(chain: &Arc<MockChain>, network: Network) -> MatchServer {
    let adapter: Arc<dyn ChainAdapter> = chain.clone();
    MatchServer::new(GameConfig::head_to_head(Decimal::TEN, network), adapter, vault()).unwrap()
}

fn tezos() -> (Arc<MockChain>, MatchServer) {
    let chain = Arc::new(MockChain::new(Network::TezosGhostnet, reserve_tez()));
    let server = server_with(&chain, Network::TezosGhostnet);
    (chain, server)
}

/// Create a match and seat alice and bob.
async fn full_match(server: &MatchServer) -> (MatchId, String) {
    let m = server.create_match(None).await.unwrap();
    let id = m.match_id().clone();
    server.join_match(&id, "alice").await.unwrap();
    server.join_match(&id, "bob").await.unwrap();
    (id, m.escrow_address().to_string())
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn e2e_head_to_head_payout() {
    let (chain, server) = tezos();
    let (id, escrow) = full_match(&server).await;
    assert_eq!(
        server.get_match(&id).await.unwrap().phase(2),
        MatchPhase::Funding
    );

    chain.deposit(&escrow, Decimal::TEN);
    assert!(!server.check_match_ready(&id).await.unwrap());
    chain.deposit(&escrow, Decimal::TEN);
    assert!(server.check_match_ready(&id).await.unwrap());
    assert_eq!(server.escrow_balance(&id).await.unwrap(), Decimal::new(20, 0));

    let m = server.get_match(&id).await.unwrap();
    assert_eq!(m.phase(2), MatchPhase::Ready);
    assert!(
        m.players()
            .iter()
            .all(|p| p.deposited && p.deposit_amount == Decimal::TEN)
    );

    let res = server.settle_match(&id, "alice").await;
    assert!(res.success, "settlement failed: {res:?}");
    let tx = res.transaction_id.clone().unwrap();

    let payout = Decimal::new(20, 0) - reserve_tez();
    assert_eq!(chain.balance_of("alice"), payout);
    let transfers = chain.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].tx_id, tx);
    assert_eq!(transfers[0].from, escrow);
    assert_eq!(transfers[0].to, "alice");
    assert_eq!(transfers[0].amount, payout);

    let m = server.get_match(&id).await.unwrap();
    assert!(m.settled());
    assert_eq!(m.settlement_tx(), Some(&tx));
    assert_eq!(m.winner(), Some("alice"));
    assert!(m.settled_at().is_some());

    let again = server.settle_match(&id, "alice").await;
    assert!(!again.success);
    assert_eq!(again.error_kind(), Some(ErrorKind::AlreadySettled));
    assert_eq!(chain.transfers().len(), 1);
}

#[tokio::test]
async fn e2e_settled_match_reports_ready_without_polling() {
    let (chain, server) = tezos();
    let (id, escrow) = full_match(&server).await;
    chain.deposit(&escrow, Decimal::new(20, 0));
    assert!(server.check_match_ready(&id).await.unwrap());
    assert!(server.settle_match(&id, "bob").await.success);

    chain.fail_next_balance(FailureMode::Communication);
    assert!(server.check_match_ready(&id).await.unwrap());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn e2e_racing_settlements_pay_once() {
    let chain = Arc::new(
        MockChain::new(Network::TezosGhostnet, reserve_tez())
            .with_transfer_delay(Duration::from_millis(50)),
    );
    let server = Arc::new(server_with(&chain, Network::TezosGhostnet));
    let (id, escrow) = full_match(&server).await;
    chain.deposit(&escrow, Decimal::new(20, 0));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let server = Arc::clone(&server);
        let id = id.clone();
        let winner = if i % 2 == 0 { "alice" } else { "bob" };
        tasks.push(tokio::spawn(async move { server.settle_match(&id, winner).await }));
    }

    let mut successes = 0;
    for task in tasks {
        let res = task.await.unwrap();
        if res.success {
            successes += 1;
        } else {
            assert!(
                matches!(
                    res.error_kind(),
                    Some(ErrorKind::AlreadySettled | ErrorKind::InProgress)
                ),
                "unexpected loser outcome: {res:?}"
            );
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(chain.transfers().len(), 1);
    assert!(server.get_match(&id).await.unwrap().settled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn e2e_concurrent_joins_never_overfill() {
    let (_, server) = tezos();
    let server = Arc::new(server);
    let id = server.create_match(None).await.unwrap().match_id().clone();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let server = Arc::clone(&server);
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            server.join_match(&id, &format!("player{i}")).await
        }));
    }
    let mut joined = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => joined += 1,
            Err(err) => assert!(matches!(err, DuelpotError::MatchFull { .. })),
        }
    }
    assert_eq!(joined, 2);
    assert_eq!(server.get_match(&id).await.unwrap().players().len(), 2);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn e2e_join_rules() {
    let (_, server) = tezos();
    let (id, _) = full_match(&server).await;

    let err = server.join_match(&id, "carol").await.unwrap_err();
    assert!(matches!(err, DuelpotError::MatchFull { max_players: 2, .. }));

    let m = server.create_match(None).await.unwrap();
    server.join_match(m.match_id(), "alice").await.unwrap();
    let err = server.join_match(m.match_id(), "alice").await.unwrap_err();
    assert!(matches!(err, DuelpotError::DuplicatePlayer { .. }));
    assert_eq!(server.get_match(m.match_id()).await.unwrap().players().len(), 1);
}

#[tokio::test]
async fn e2e_deposits_below_threshold() {
    let (chain, server) = tezos();
    let (id, escrow) = full_match(&server).await;
    chain.deposit(&escrow, Decimal::new(1999, 2));

    assert!(!server.check_match_ready(&id).await.unwrap());
    let m = server.get_match(&id).await.unwrap();
    assert!(m.players().iter().all(|p| !p.deposited));
    assert!(m.players().iter().all(|p| p.deposit_amount.is_zero()));
}

#[tokio::test]
async fn e2e_winner_must_be_a_player() {
    let (chain, server) = tezos();
    let (id, escrow) = full_match(&server).await;
    chain.deposit(&escrow, Decimal::new(20, 0));

    let res = server.settle_match(&id, "mallory").await;
    assert!(!res.success);
    assert_eq!(res.error_kind(), Some(ErrorKind::Validation));
    assert_eq!(res.error.unwrap().code, "DP_ERR_104");

    let m = server.get_match(&id).await.unwrap();
    assert!(!m.settled());
    assert_eq!(m.settlement(), SettlementStatus::Open);
    assert!(chain.transfers().is_empty());
}

#[tokio::test]
async fn e2e_settle_requires_full_match() {
    let (chain, server) = tezos();
    let m = server.create_match(None).await.unwrap();
    server.join_match(m.match_id(), "alice").await.unwrap();
    chain.deposit(m.escrow_address(), Decimal::new(20, 0));

    let res = server.settle_match(m.match_id(), "alice").await;
    assert_eq!(res.error.unwrap().code, "DP_ERR_105");
    assert!(chain.transfers().is_empty());
}

#[tokio::test]
async fn e2e_unknown_match() {
    let (_, server) = tezos();
    let ghost = MatchId::parse("m_ghost").unwrap();

    assert!(matches!(
        server.join_match(&ghost, "alice").await,
        Err(DuelpotError::MatchNotFound(_))
    ));
    assert!(matches!(
        server.check_match_ready(&ghost).await,
        Err(DuelpotError::MatchNotFound(_))
    ));
    assert!(server.get_match(&ghost).await.is_err());
    assert!(server.escrow_balance(&ghost).await.is_err());

    let res = server.settle_match(&ghost, "alice").await;
    assert_eq!(res.error_kind(), Some(ErrorKind::NotFound));
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn e2e_insufficient_funds_is_retryable() {
    let (chain, server) = tezos();
    let (id, escrow) = full_match(&server).await;
    chain.deposit(&escrow, reserve_tez());

    let res = server.settle_match(&id, "alice").await;
    assert_eq!(res.error_kind(), Some(ErrorKind::InsufficientFunds));
    assert!(res.is_retryable());

    chain.deposit(&escrow, Decimal::new(20, 0));
    let res = server.settle_match(&id, "alice").await;
    assert!(res.success);
    assert_eq!(chain.balance_of("alice"), Decimal::new(20, 0));
}

#[tokio::test]
async fn e2e_chain_errors_roll_back_for_retry() {
    let (chain, server) = tezos();
    let (id, escrow) = full_match(&server).await;
    chain.deposit(&escrow, Decimal::new(20, 0));

    chain.fail_next_transfer(FailureMode::Communication);
    let res = server.settle_match(&id, "bob").await;
    assert_eq!(res.error_kind(), Some(ErrorKind::ChainCommunication));
    assert!(res.is_retryable());
    assert_eq!(server.get_match(&id).await.unwrap().settlement(), SettlementStatus::Open);

    chain.fail_next_transfer(FailureMode::Rejection);
    let res = server.settle_match(&id, "bob").await;
    assert_eq!(res.error_kind(), Some(ErrorKind::ChainRejection));
    assert!(!res.is_retryable());
    assert!(!server.get_match(&id).await.unwrap().settled());

    chain.fail_next_balance(FailureMode::Communication);
    let res = server.settle_match(&id, "bob").await;
    assert_eq!(res.error_kind(), Some(ErrorKind::ChainCommunication));

    let res = server.settle_match(&id, "bob").await;
    assert!(res.success, "retry should pay: {res:?}");
    assert_eq!(chain.transfers().len(), 1);
}

#[tokio::test]
async fn e2e_escrow_key_bound_to_machine_secret() {
    let chain = Arc::new(MockChain::new(Network::TronNile, Decimal::new(11, 1)));
    let creator = server_with(&chain, Network::TronNile);
    let (id, escrow) = full_match(&creator).await;
    let sealed = creator.get_match(&id).await.unwrap().encrypted_key().clone();

    // A vault under a different secret cannot open the key.
    let other = KeyCustodyVault::with_kdf(
        MachineSecret::new(b"some other machine secret".to_vec()).unwrap(),
        KdfParams::fast_for_tests(),
    )
    .unwrap();
    assert!(matches!(other.decrypt(&sealed), Err(DuelpotError::Decryption)));

    chain.deposit(&escrow, Decimal::new(20, 0));
    let res = creator.settle_match(&id, "alice").await;
    assert!(res.success);
    assert_eq!(chain.balance_of("alice"), Decimal::new(189, 1));
}

#[tokio::test]
async fn e2e_server_from_config() {
    let json = r#"{
        "game": { "buy_in_amount": "2.5", "network": "tron-nile" },
        "custody": { "secret_env": "DUELPOT_E2E_SECRET" },
        "settlement_cache_size": 8
    }"#;
    let config = ServerConfig::from_json_str(json).unwrap();
    let chain = Arc::new(MockChain::new(Network::TronNile, Decimal::new(11, 1)));
    let server = MatchServer::from_config(&config, chain.clone(), vault()).unwrap();
    assert_eq!(server.config().buy_in_amount, Decimal::new(25, 1));

    let (id, escrow) = full_match(&server).await;
    chain.deposit(&escrow, Decimal::new(5, 0));
    assert!(server.check_match_ready(&id).await.unwrap());
    assert_eq!(server.list_matches().await.len(), 1);
}

#[tokio::test]
async fn e2e_caller_ids_are_validated() {
    let (_, server) = tezos();
    for raw in ["", "a b"] {
        assert!(matches!(
            MatchId::try_from(raw),
            Err(DuelpotError::InvalidMatchId { .. })
        ));
        assert!(serde_json::from_value::<MatchId>(serde_json::json!(raw)).is_err());
    }

    let id = MatchId::try_from("lobby-7").unwrap();
    let m = server.create_match(Some(id.clone())).await.unwrap();
    assert_eq!(m.match_id(), &id);
}

// =============================================================================
// Runtime
// =============================================================================

/// Server whose vault runs a KDF slow enough to notice a stalled runtime.
fn costly_kdf_server(chain: &Arc<MockChain>) -> MatchServer {
    let vault = KeyCustodyVault::with_kdf(
        MachineSecret::new(b"end-to-end machine secret".to_vec()).unwrap(),
        KdfParams {
            m_cost_kib: 4096,
            t_cost: 2,
            p_cost: 1,
        },
    )
    .unwrap();
    let adapter: Arc<dyn ChainAdapter> = chain.clone();
    MatchServer::new(
        GameConfig::head_to_head(Decimal::TEN, Network::TezosGhostnet),
        adapter,
        Arc::new(vault),
    )
    .unwrap()
}

/// Spawn a task that flags when it first runs.
fn spawn_canary() -> (Arc<AtomicBool>, tokio::task::JoinHandle<()>) {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let handle = tokio::spawn(async move {
        flag.store(true, Ordering::SeqCst);
    });
    (ran, handle)
}

#[tokio::test(flavor = "current_thread")]
async fn e2e_key_sealing_leaves_runtime_free() {
    let chain = Arc::new(MockChain::new(Network::TezosGhostnet, reserve_tez()));
    let server = costly_kdf_server(&chain);

    // On a single-threaded runtime the canary only runs if create_match yields.
    let (ran, canary) = spawn_canary();
    let m = server.create_match(None).await.unwrap();
    assert!(ran.load(Ordering::SeqCst), "runtime blocked while sealing");
    canary.await.unwrap();

    let id = m.match_id().clone();
    server.join_match(&id, "alice").await.unwrap();
    server.join_match(&id, "bob").await.unwrap();
    chain.deposit(m.escrow_address(), Decimal::new(20, 0));

    let (ran, canary) = spawn_canary();
    let res = server.settle_match(&id, "alice").await;
    assert!(ran.load(Ordering::SeqCst), "runtime blocked while unsealing");
    canary.await.unwrap();
    assert!(res.success);
}
