use anvil::*;
use ed25519_dalek::SigningKey;
use ownable::{Authorizer, OwnershipError, OwnershipPhase, Principal, SignatureAuthorizer, SignedRequest};
use rand_core::OsRng;
use vstate::crypto::{hash_record, EMPTY_LEAF};
use vstate::{
    AuthenticationPath, Event, InMemoryCommitmentStore, InMemoryStorage, LedgerConfig, MerkleTree, StateError,
    Transition, TransitionEngine,
};

type Anvil = ZkAnvil<InMemoryStorage, InMemoryCommitmentStore>;

fn principal() -> (SigningKey, Principal) {
    let key = SigningKey::generate(&mut OsRng);
    let who = Principal::from(key.verifying_key());
    (key, who)
}

fn anvil(owner: Principal) -> Anvil {
    let ledger = CommittedLedger::in_memory(owner, InMemoryStorage::new(), LedgerConfig::default()).unwrap();
    ZkAnvil::new(ledger)
}

/// `(topic, principal, amount)` of every notice in the log, in order.
fn notices(anvil: &Anvil) -> Vec<(String, Principal, Option<u64>)> {
    anvil
        .ledger()
        .state()
        .events()
        .iter()
        .filter_map(|entry| match &entry.event {
            Event::Notice(n) => Some((n.topic.clone(), Principal(n.principal), n.amount)),
            Event::Transition(_) => None,
        })
        .collect()
}

/// Registers a fresh user at `index` and returns it with its principal.
fn register(anvil: &mut Anvil, owner: Principal, index: u64) -> (User, Principal) {
    let (_, who) = principal();
    let user = User::new(who);
    let path = anvil.witness(index).unwrap();
    anvil.add_user(owner, &user, &path).unwrap();
    (user, who)
}

#[test]
fn buy_and_upgrade_flow() {
    let (_, owner) = principal();
    let mut anvil = anvil(owner);
    let (user, who) = register(&mut anvil, owner, 3);

    let path = anvil.witness(3).unwrap();
    anvil.buy_item(who, &user, 0, RAPTOR, &path).unwrap();
    assert_eq!(anvil.balance(), PRICE);

    let user = anvil.user(3).unwrap().unwrap();
    assert_eq!(user.item(0).unwrap(), Item::new(RAPTOR, 1));

    // residue 7 succeeds
    let path = anvil.witness(3).unwrap();
    let receipt = anvil.upgrade_item(who, &user, 0, &path, 1_700_000_007).unwrap();
    assert!(receipt.outcome.success);
    assert_eq!(receipt.transition.new_root, anvil.root());

    let user = anvil.user(3).unwrap().unwrap();
    assert_eq!(user.item(0).unwrap(), Item::new(RAPTOR, 2));

    // residue 1 fails and destroys the item
    let path = anvil.witness(3).unwrap();
    let receipt = anvil.upgrade_item(who, &user, 0, &path, 1_700_000_001).unwrap();
    assert!(!receipt.outcome.success);

    let user = anvil.user(3).unwrap().unwrap();
    assert!(user.slot_check(0).unwrap());
    assert_eq!(anvil.balance(), 3 * PRICE);

    // the committed root is exactly the off-chain tree root
    assert_eq!(anvil.root(), anvil.ledger().state().root());
}

#[test]
fn buy_rejections_leave_state_untouched() {
    let (_, owner) = principal();
    let mut anvil = anvil(owner);
    let (user, who) = register(&mut anvil, owner, 0);

    let path = anvil.witness(0).unwrap();
    anvil.buy_item(who, &user, 1, SHARD, &path).unwrap();
    let user = anvil.user(0).unwrap().unwrap();
    let root = anvil.root();
    let balance = anvil.balance();

    let path = anvil.witness(0).unwrap();
    let err = anvil.buy_item(who, &user, 1, RAPTOR, &path).unwrap_err();
    assert!(matches!(err, AnvilError::SlotOccupied { slot: 1 }));

    let err = anvil.buy_item(who, &user, 2, 999, &path).unwrap_err();
    assert!(matches!(err, AnvilError::UnknownItem(999)));

    let err = anvil.buy_item(who, &user, SLOT_COUNT, RAPTOR, &path).unwrap_err();
    assert!(matches!(err, AnvilError::InvalidSlot { .. }));

    let (_, stranger) = principal();
    let err = anvil.buy_item(stranger, &user, 2, RAPTOR, &path).unwrap_err();
    assert!(err.is_unauthorized());

    let err = anvil.upgrade_item(who, &user, 4, &path, 0).unwrap_err();
    assert!(matches!(err, AnvilError::SlotEmpty { slot: 4 }));

    assert_eq!(anvil.root(), root);
    assert_eq!(anvil.balance(), balance);
}

#[test]
fn add_user_is_owner_only_and_needs_empty_leaf() {
    let (_, owner) = principal();
    let mut anvil = anvil(owner);
    let (_, stranger) = principal();

    let path = anvil.witness(5).unwrap();
    let err = anvil.add_user(stranger, &User::new(stranger), &path).unwrap_err();
    assert!(err.is_unauthorized());

    register(&mut anvil, owner, 5);

    // leaf 5 is no longer empty
    let path = anvil.witness(5).unwrap();
    let err = anvil.add_user(owner, &User::new(stranger), &path).unwrap_err();
    assert!(err.is_stale_witness());
}

#[test]
fn stale_witness_is_rejected_then_refreshed() {
    let (_, owner) = principal();
    let mut anvil = anvil(owner);
    let (alice, alice_id) = register(&mut anvil, owner, 1);

    // taken before an unrelated write at a disjoint index
    let stale = anvil.witness(1).unwrap();
    register(&mut anvil, owner, 200);

    let root = anvil.root();
    let err = anvil.buy_item(alice_id, &alice, 0, SHARD, &stale).unwrap_err();
    assert!(err.is_stale_witness());
    assert_eq!(anvil.root(), root);
    assert_eq!(anvil.balance(), 0);

    let mut paths = vec![stale];
    let receipt = submit_with_refresh(DEFAULT_MAX_ATTEMPTS, |attempt| {
        if attempt > 1 {
            paths.push(anvil.witness(1)?);
        }
        let user = anvil.user(1)?.unwrap();
        let path = paths.last().cloned().unwrap();
        anvil.buy_item(alice_id, &user, 0, SHARD, &path)
    })
    .unwrap();

    assert_eq!(paths.len(), 2);
    assert_eq!(receipt.new_root, anvil.root());
    assert_eq!(anvil.user(1).unwrap().unwrap().item(0).unwrap(), Item::new(SHARD, 1));
}

#[test]
fn add_at_index_two_matches_direct_tree() {
    let (_, owner) = principal();
    let mut anvil = anvil(owner);
    let (_, who) = principal();
    let user = User::new(who);

    let path = anvil.witness(2).unwrap();
    assert_eq!(path.siblings.len(), 8);
    let receipt = anvil.add_user(owner, &user, &path).unwrap();

    let mut tree = MerkleTree::new(8).unwrap();
    tree.set_leaf(2, hash_record(User::TAG, &user.encode().unwrap())).unwrap();

    assert_eq!(receipt.old_leaf, EMPTY_LEAF);
    assert_eq!(receipt.new_root, tree.root());
    assert_eq!(anvil.root(), tree.root());
}

#[test]
fn treasury_deposit_and_withdraw() {
    let (_, owner) = principal();
    let mut anvil = anvil(owner);
    let (_, donor) = principal();

    assert_eq!(anvil.deposit(donor, 40).unwrap(), 40);
    assert!(anvil.deposit(Principal::EMPTY, 1).unwrap_err().is_unauthorized());

    assert!(anvil.withdraw(donor, 10).unwrap_err().is_unauthorized());
    let err = anvil.withdraw(owner, 41).unwrap_err();
    assert!(matches!(err, AnvilError::InsufficientFunds { requested: 41, available: 40 }));

    assert_eq!(anvil.withdraw(owner, 15).unwrap(), 25);
    assert_eq!(anvil.balance(), 25);
    assert!(anvil.ledger().state().verify_event_log(&anvil.ledger().state().verifying_key()));
}

#[test]
fn ownership_handover_and_renounce() {
    let (_, owner) = principal();
    let (_, heir) = principal();
    let mut anvil = anvil(owner);

    anvil.ledger_mut().transfer_ownership(owner, heir).unwrap();
    let err = anvil.ledger_mut().transfer_ownership(owner, heir).unwrap_err();
    assert!(matches!(err, AnvilError::Ownership(OwnershipError::TransferAlreadyPending)));

    // still the old owner until accepted
    register(&mut anvil, owner, 0);
    anvil.ledger_mut().accept_ownership(heir).unwrap();
    assert_eq!(anvil.ledger().ownership().owner(), heir);

    let path = anvil.witness(1).unwrap();
    assert!(anvil.add_user(owner, &User::new(owner), &path).unwrap_err().is_unauthorized());
    register(&mut anvil, heir, 1);

    anvil.ledger_mut().renounce_ownership(heir).unwrap();
    assert_eq!(anvil.ledger().ownership().phase(), OwnershipPhase::Renounced);

    let path = anvil.witness(2).unwrap();
    assert!(anvil.add_user(heir, &User::new(heir), &path).unwrap_err().is_unauthorized());
    assert!(anvil.withdraw(heir, 0).unwrap_err().is_unauthorized());
    assert!(anvil.ledger_mut().transfer_ownership(heir, owner).unwrap_err().is_unauthorized());
}

#[test]
fn signed_requests_resolve_the_caller() {
    let (owner_key, owner) = principal();
    let mut anvil = anvil(owner);
    let authorizer = SignatureAuthorizer::new(b"anvil".to_vec());

    let request = SignedRequest::sign(&owner_key, b"anvil", b"add-user:0".to_vec());
    let caller = authorizer.authorize(&request).unwrap();
    assert_eq!(caller, owner);
    register(&mut anvil, caller, 0);

    let mut forged = SignedRequest::sign(&owner_key, b"anvil", b"add-user:1".to_vec());
    forged.payload = b"add-user:2".to_vec();
    assert_eq!(authorizer.authorize(&forged).unwrap_err(), OwnershipError::InvalidSignature);
}

#[test]
fn points_ledger() {
    let (_, owner) = principal();
    let (_, who) = principal();
    let ledger = CommittedLedger::in_memory(owner, InMemoryStorage::new(), LedgerConfig::default()).unwrap();
    let mut points = PointsLedger::new(ledger);

    let account = Account::new(who);
    let path = points.witness(4).unwrap();
    assert!(points.add_account(who, &account, &path).unwrap_err().is_unauthorized());
    points.add_account(owner, &account, &path).unwrap();

    for expected in 1..=3u32 {
        let current = points.account(4).unwrap().unwrap();
        let path = points.witness(4).unwrap();
        points.increase_points(owner, &current, &path).unwrap();
        assert_eq!(points.account(4).unwrap().unwrap().points, expected);
    }

    // a stale record hashes to the wrong old leaf
    let path = points.witness(4).unwrap();
    assert!(points.increase_points(owner, &account, &path).unwrap_err().is_stale_witness());
    assert_eq!(points.root(), points.ledger().state().root());
}

#[test]
fn whitelist_membership() {
    let (_, owner) = principal();
    let (_, member) = principal();
    let (_, outsider) = principal();
    let ledger = CommittedLedger::in_memory(owner, InMemoryStorage::new(), LedgerConfig::default()).unwrap();
    let mut whitelist = Whitelist::new(ledger);

    let path = whitelist.witness(7).unwrap();
    assert!(whitelist.add_address(member, member, &path).unwrap_err().is_unauthorized());
    let receipt = whitelist.add_address(owner, member, &path).unwrap();
    match &whitelist.ledger().state().events().last().unwrap().event {
        Event::Notice(n) => {
            assert_eq!((n.topic.as_str(), Principal(n.principal)), ("add-address", member));
            assert_eq!(n.prev_event_hash, receipt.event_hash);
        }
        other => panic!("expected notice, got {other:?}"),
    }

    let path = whitelist.witness(7).unwrap();
    assert!(whitelist.is_whitelisted(member, &path).unwrap());
    assert!(!whitelist.is_whitelisted(outsider, &path).unwrap());

    // occupied leaf
    let err = whitelist.add_address(owner, outsider, &path).unwrap_err();
    assert!(err.is_stale_witness());
}

#[test]
fn stale_error_is_surfaced_unchanged() {
    let (_, owner) = principal();
    let mut anvil = anvil(owner);
    let path = anvil.witness(0).unwrap();
    register(&mut anvil, owner, 9);

    let err = anvil.add_user(owner, &User::new(owner), &path).unwrap_err();
    assert!(matches!(err, AnvilError::State(StateError::StaleOrInvalidWitness)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_transitions_on_one_root_have_one_winner() {
    let tree = MerkleTree::new(8).unwrap();
    let store = InMemoryCommitmentStore::new(tree.root());
    let engine = TransitionEngine::new(8).unwrap();

    let mut handles = Vec::new();
    for index in [10u64, 20, 30, 40] {
        let store = store.clone();
        let transition = Transition {
            path: tree.witness(index).unwrap(),
            old_leaf: EMPTY_LEAF,
            new_leaf: hash_record(b"race", &index.to_le_bytes()),
        };
        handles.push(tokio::task::spawn_blocking(move || engine.apply(&store, &transition)));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(root) => winners.push(root),
            Err(e) => assert!(matches!(e, StateError::StaleOrInvalidWitness)),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(vstate::CommitmentStore::read(&store), winners[0]);
}

#[test]
fn garbled_path_is_rejected_as_stale() {
    let (_, owner) = principal();
    let mut anvil = anvil(owner);
    let (_, who) = principal();
    let garbled = AuthenticationPath {
        siblings: vec![[0u8; 32]; 8],
        is_left: vec![false; 70],
    };
    let root = anvil.root();

    let err = anvil.add_user(owner, &User::new(who), &garbled).unwrap_err();
    assert!(matches!(err, AnvilError::State(StateError::StaleOrInvalidWitness)));
    assert_eq!(anvil.root(), root);
    assert!(anvil.ledger().state().events().is_empty());
}

#[test]
fn ownership_transitions_are_notified() {
    let (_, owner) = principal();
    let (_, heir) = principal();
    let (_, stranger) = principal();
    let mut anvil = anvil(owner);

    anvil.ledger_mut().transfer_ownership(owner, heir).unwrap();
    anvil.ledger_mut().cancel_ownership_transfer(heir).unwrap();
    assert_eq!(anvil.ledger().ownership().phase(), OwnershipPhase::Owned(owner));

    anvil.ledger_mut().transfer_ownership(owner, heir).unwrap();

    // rejected transitions log nothing and change nothing
    let before = anvil.ledger().state().events().len();
    let ownership = anvil.ledger().ownership().clone();
    assert!(anvil.ledger_mut().cancel_ownership_transfer(stranger).unwrap_err().is_unauthorized());
    assert!(anvil.ledger_mut().accept_ownership(stranger).unwrap_err().is_unauthorized());
    assert_eq!(anvil.ledger().state().events().len(), before);
    assert_eq!(anvil.ledger().ownership(), &ownership);

    anvil.ledger_mut().accept_ownership(heir).unwrap();
    anvil.ledger_mut().renounce_ownership(heir).unwrap();

    let expected = vec![
        ("transfer-ownership".to_string(), heir, None),
        ("cancel-ownership-transfer".to_string(), heir, None),
        ("transfer-ownership".to_string(), heir, None),
        ("accept-ownership".to_string(), heir, None),
        ("renounce-ownership".to_string(), heir, None),
    ];
    assert_eq!(notices(&anvil), expected);
    assert!(anvil.ledger().state().verify_event_log(&anvil.ledger().state().verifying_key()));
}

#[test]
fn shop_and_treasury_are_notified() {
    let (_, owner) = principal();
    let mut anvil = anvil(owner);
    let (user, who) = register(&mut anvil, owner, 0);

    let path = anvil.witness(0).unwrap();
    let bought = anvil.buy_item(who, &user, 0, RAPTOR, &path).unwrap();

    let user = anvil.user(0).unwrap().unwrap();
    let path = anvil.witness(0).unwrap();
    anvil.upgrade_item(who, &user, 0, &path, 3).unwrap();

    // rejected purchase: no notice, no payment
    let err = anvil.buy_item(who, &user, 1, RAPTOR, &path).unwrap_err();
    assert!(err.is_stale_witness());

    anvil.deposit(who, 7).unwrap();
    anvil.withdraw(owner, 4).unwrap();

    let expected = vec![
        ("add-user".to_string(), who, None),
        ("buy-item".to_string(), who, Some(PRICE)),
        ("upgrade-item".to_string(), who, Some(PRICE)),
        ("deposit".to_string(), who, Some(7)),
        ("withdraw".to_string(), owner, Some(4)),
    ];
    assert_eq!(notices(&anvil), expected);
    assert_eq!(anvil.balance(), 2 * PRICE + 7 - 4);

    // the purchase notice directly follows its transition
    let events = anvil.ledger().state().events();
    let at = events.iter().position(|e| e.event_hash == bought.event_hash).unwrap();
    match &events[at + 1].event {
        Event::Notice(n) => {
            assert_eq!(n.prev_event_hash, bought.event_hash);
            assert_eq!(n.state_root, bought.new_root);
        }
        other => panic!("expected notice, got {other:?}"),
    }
}
