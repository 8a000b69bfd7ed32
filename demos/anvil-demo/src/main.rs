//! zkAnvil walkthrough
//!
//! Shows:
//! 1. Owner registers a user at an empty leaf
//! 2. User buys an item, proving the old record
//! 3. Upgrade attempts decided by the residue oracle
//! 4. A stale witness is rejected, then resubmitted fresh
//! 5. Ownership handover and the signed event log

mod config;

use anvil::{submit_with_refresh, CommittedLedger, User, ZkAnvil, DEFAULT_MAX_ATTEMPTS, PRICE, RAPTOR};
use anyhow::{Context, Result};
use ed25519_dalek::SigningKey;
use ownable::Principal;
use rand_core::OsRng;
use tracing::info;
use vstate::{crypto::EMPTY_LEAF, FileBackedStorage, InMemoryCommitmentStore, InMemoryStorage, StateLedger, Storage};

use crate::config::AppConfig;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;
    info!(depth = cfg.ledger.depth, persist = cfg.persist, "starting anvil demo");

    let signing_key = SigningKey::generate(&mut OsRng);
    if cfg.persist {
        let storage = FileBackedStorage::new(cfg.state_path.clone())
            .with_context(|| format!("Failed to open {}", cfg.state_path.display()))?;
        run(&cfg, storage, signing_key)
    } else {
        run(&cfg, InMemoryStorage::new(), signing_key)
    }
}

fn run<S: Storage>(cfg: &AppConfig, storage: S, signing_key: SigningKey) -> Result<()> {
    println!("╔════════════════════════════════════════════════╗");
    println!("║  zkAnvil - Committed State Demo               ║");
    println!("╚════════════════════════════════════════════════╝\n");

    let state = StateLedger::restore(storage, signing_key, cfg.ledger.clone())?;
    let commitment = InMemoryCommitmentStore::new(state.root());

    let owner_key = SigningKey::generate(&mut OsRng);
    let owner = Principal::from(owner_key.verifying_key());
    let mut anvil = ZkAnvil::new(CommittedLedger::new(owner, state, commitment));

    println!("   Tree depth:     {}", cfg.ledger.depth);
    println!("   Committed root: {}", hex::encode(anvil.root()));
    println!("   {}\n", restore_note(cfg, occupied_leaves(&anvil)?));

    // 1. Register
    println!("📝 Step 1: Owner registers a user");
    let index = first_empty_leaf(&anvil)?;
    let alice = Principal::from(SigningKey::generate(&mut OsRng).verifying_key());
    let path = anvil.witness(index)?;
    let receipt = anvil.add_user(owner, &User::new(alice), &path)?;
    println!("   User {alice} at leaf {index}");
    println!("   New root: {}\n", hex::encode(receipt.new_root));

    // 2. Buy
    println!("🛒 Step 2: User buys a Raptor into slot 0");
    let user = anvil.user(index)?.context("user record missing")?;
    let path = anvil.witness(index)?;
    anvil.buy_item(alice, &user, 0, RAPTOR, &path)?;
    println!("   Paid {PRICE}, treasury now {}\n", anvil.balance());

    // 3. Upgrade
    println!("🔨 Step 3: Upgrade attempts");
    for counter in [1_700_000_003u64, 1_700_000_004] {
        let user = anvil.user(index)?.context("user record missing")?;
        if user.item(0)?.is_empty() {
            break;
        }
        let path = anvil.witness(index)?;
        let upgrade = anvil.upgrade_item(alice, &user, 0, &path, counter)?;
        let verdict = if upgrade.outcome.success { "success" } else { "failed, item destroyed" };
        println!("   counter {counter}: {verdict} -> {:?}", upgrade.outcome.item);
    }
    println!();

    // 4. Stale witness
    println!("⏳ Step 4: Stale witness");
    let stale = anvil.witness(index)?;
    let bob = Principal::from(SigningKey::generate(&mut OsRng).verifying_key());
    let other = first_empty_leaf(&anvil)?;
    let path = anvil.witness(other)?;
    anvil.add_user(owner, &User::new(bob), &path)?;

    let user = anvil.user(index)?.context("user record missing")?;
    let slot = free_slot(&user).context("no free slot")?;
    match anvil.buy_item(alice, &user, slot, RAPTOR, &stale) {
        Err(e) if e.is_stale_witness() => println!("   ✗ rejected: {e}"),
        result => println!("   unexpected: {result:?}"),
    }

    let receipt = submit_with_refresh(DEFAULT_MAX_ATTEMPTS, |_| {
        let path = anvil.witness(index)?;
        anvil.buy_item(alice, &user, slot, RAPTOR, &path)
    })?;
    println!("   ✓ resubmitted with a fresh witness, root {}\n", hex::encode(receipt.new_root));

    // 5. Ownership and audit
    println!("🔐 Step 5: Ownership handover");
    anvil.ledger_mut().transfer_ownership(owner, bob)?;
    anvil.ledger_mut().accept_ownership(bob)?;
    println!("   Owner is now {}", anvil.ledger().ownership().owner());

    let state = anvil.ledger().state();
    let log_ok = state.verify_event_log(&state.verifying_key());
    println!("   Events: {}, chain and signatures valid: {log_ok}", state.events().len());
    println!("   Final root: {}", hex::encode(anvil.root()));

    Ok(())
}

fn first_empty_leaf<S: Storage>(anvil: &ZkAnvil<S, InMemoryCommitmentStore>) -> Result<u64> {
    let state = anvil.ledger().state();
    for index in 0..state.capacity() {
        if state.leaf(index)? == EMPTY_LEAF {
            return Ok(index);
        }
    }
    anyhow::bail!("ledger is full")
}

fn occupied_leaves<S: Storage>(anvil: &ZkAnvil<S, InMemoryCommitmentStore>) -> Result<u64> {
    let state = anvil.ledger().state();
    let mut count = 0;
    for index in 0..state.capacity() {
        if state.leaf(index)? != EMPTY_LEAF {
            count += 1;
        }
    }
    Ok(count)
}

/// Only leaves and records survive a restart. The owner, signing key,
/// treasury and event log are created fresh each run.
fn restore_note(cfg: &AppConfig, restored: u64) -> String {
    if cfg.persist {
        format!(
            "Restored {restored} leaves from {}; owner, signing key, treasury and event log are new this run",
            cfg.state_path.display()
        )
    } else {
        "In-memory run, nothing is persisted".to_string()
    }
}

fn free_slot(user: &User) -> Option<usize> {
    user.items.iter().position(|item| item.is_empty())
}
