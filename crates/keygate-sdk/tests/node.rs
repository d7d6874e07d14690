use keygate_sdk::node::{ActionEvent, KeygateNode};
use keygate_sdk::testing::SimulatedLedger;
use keygate_sdk::{
    ActionKind, ActionReceipt, DRep, Error, KeyAction, NoKeyReason, NodeError, PoolId,
    SubmissionStage,
};
use tokio::sync::broadcast;

fn setup() -> (SimulatedLedger, KeygateNode, broadcast::Receiver<ActionEvent>) {
    let ledger = SimulatedLedger::new();
    ledger.fund(100_000_000);
    let (node, rx) = KeygateNode::new(ledger.sdk());
    (ledger, node, rx)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn node_publishes_action_outcomes() {
    let (_ledger, node, mut rx) = setup();

    let receipt = node.mint_key("ALPHA").await.unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(event.kind, ActionKind::Mint);
    assert_eq!(event.outcome, Ok(receipt));

    node.deposit(0).await.unwrap_err();
    let event = rx.recv().await.unwrap();
    assert_eq!(event.kind, ActionKind::Deposit);
    assert!(event.outcome.unwrap_err().contains("invalid amount"));
}

#[tokio::test]
async fn node_reports_missing_key() {
    let (ledger, node, _rx) = setup();

    match node.withdraw().await.unwrap_err() {
        NodeError::Sdk(Error::NoKeySession(NoKeyReason::NeverMinted)) => {}
        other => panic!("expected NoKeySession, got {other}"),
    }
    assert!(node.key_location().await.is_err());
    assert_eq!(ledger.build_calls(), 0);
}

#[tokio::test]
async fn node_runs_the_staking_lifecycle() {
    let (ledger, node, _rx) = setup();
    node.mint_key("ALPHA").await.unwrap();
    let addresses = node.script_addresses().await.unwrap();

    let pool = PoolId::from_bytes([1; 28]);
    let receipt = node.delegate_stake(pool, DRep::AlwaysNoConfidence).await.unwrap();
    assert!(matches!(receipt, ActionReceipt::Delegated { .. }));

    ledger.accrue_rewards(&addresses.reward_address, 700_000).unwrap();
    node.redelegate_stake(PoolId::from_bytes([2; 28])).await.unwrap();
    node.withdraw_stake().await.unwrap();
    node.unregister_stake().await.unwrap();
    assert_eq!(ledger.stake_account(&addresses.reward_address), None);
}

#[tokio::test]
async fn concurrent_submissions_of_one_key_output_settle_once() {
    let (ledger, node, mut rx) = setup();
    node.mint_key("ALPHA").await.unwrap();
    node.deposit(5_000_000).await.unwrap();
    // Drain the two setup events.
    rx.recv().await.unwrap();
    rx.recv().await.unwrap();

    let withdraw = node.prepare(KeyAction::Withdraw).await.unwrap();
    let delegate = node
        .prepare(KeyAction::DelegateStake {
            pool: PoolId::from_bytes([1; 28]),
            drep: DRep::AlwaysAbstain,
        })
        .await
        .unwrap();

    let (a, b) = tokio::join!(node.submit(withdraw), node.submit(delegate));
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    let loser = outcomes.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(
        loser,
        NodeError::Sdk(Error::Submission(SubmissionStage::Broadcast, _))
    ));

    let events = [rx.recv().await.unwrap(), rx.recv().await.unwrap()];
    assert_eq!(events.iter().filter(|e| e.outcome.is_ok()).count(), 1);

    // The key is back in the wallet either way.
    let key = node.sdk().key_token().unwrap();
    assert!(ledger.wallet_holds(&key.unit()));
}
