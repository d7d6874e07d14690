//! In-memory ledger for driving the orchestrator without a network.
//!
//! [`SimulatedLedger`] plays every external collaborator at once: ledger
//! queries, wallet, transaction builder and reward oracle. Its builder
//! emulates the key policy and treasury validators closely enough to reject
//! transactions that lack the key or the right script, and its broadcast
//! rejects transactions whose inputs were already spent.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::RngCore;
use rand::thread_rng;

use crate::address::{Address, Credential, PoolId, RewardAddress};
use crate::chain::ChainBackend;
use crate::error::{Error, Result, SubmissionStage};
use crate::governance::DRep;
use crate::key::KeyRegistry;
use crate::ledger::{AssetUnit, Hash28, OutputRef, PolicyId, TxHash, Utxo, Value};
use crate::network::Network;
use crate::oracle::RewardOracle;
use crate::plutus::PlutusData;
use crate::script::{PlutusScript, PlutusVersion, ScriptTemplate, applied_params};
use crate::sdk::{Collaborators, KeygateSdk, ScriptTemplates};
use crate::tx::{Certificate, ScriptPurpose, SignedTx, TxBuilder, TxDescription, UnsignedTx};
use crate::wallet::WalletProvider;

/// Flat fee charged by the simulated builder.
pub const SIM_FEE: u64 = 200_000;
/// Stake registration deposit, refunded on deregistration.
pub const STAKE_DEPOSIT: u64 = 2_000_000;

/// Ledger-side state of one stake credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeAccount {
    pub pool: Option<PoolId>,
    pub drep: Option<DRep>,
    pub rewards: u64,
}

#[derive(Debug)]
struct LedgerState {
    network: Network,
    wallet_address: Address,
    utxos: BTreeMap<OutputRef, Utxo>,
    stake: HashMap<Credential, StakeAccount>,
    build_calls: usize,
    refuse_signing: bool,
}

/// Shared handle to an in-memory ledger; clones see the same state.
#[derive(Debug, Clone)]
pub struct SimulatedLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedLedger {
    /// Empty preprod ledger with an unfunded wallet.
    pub fn new() -> Self {
        let network = Network::Preprod;
        let wallet_address = wallet_address(network, 0x77);
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                network,
                wallet_address,
                utxos: BTreeMap::new(),
                stake: HashMap::new(),
                build_calls: 0,
                refuse_signing: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn network(&self) -> Network {
        self.state().network
    }

    pub fn wallet_address(&self) -> Address {
        self.state().wallet_address.clone()
    }

    /// The validator templates the simulated builder understands.
    pub fn templates() -> ScriptTemplates {
        ScriptTemplates {
            key_policy: ScriptTemplate::new(
                "key.key.mint",
                PlutusVersion::V3,
                b"simulated one-shot key policy".to_vec(),
            ),
            treasury: ScriptTemplate::new(
                "dry.dry.spend",
                PlutusVersion::V3,
                b"simulated treasury validator".to_vec(),
            ),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            chain: Arc::new(self.clone()),
            wallet: Arc::new(self.clone()),
            builder: Arc::new(self.clone()),
            oracle: Arc::new(self.clone()),
        }
    }

    /// An SDK over this ledger with a session-scoped key registry.
    pub fn sdk(&self) -> KeygateSdk {
        self.sdk_with_keys(KeyRegistry::session())
    }

    pub fn sdk_with_keys(&self, keys: KeyRegistry) -> KeygateSdk {
        KeygateSdk::new(self.network(), Self::templates(), self.collaborators(), keys)
    }

    // ── Scenario setup ──────────────────────────────────────────────────

    /// Add a fresh wallet output holding `lovelace`.
    pub fn fund(&self, lovelace: u64) -> OutputRef {
        let mut hash = [0u8; 32];
        thread_rng().fill_bytes(&mut hash);
        let output_ref = OutputRef::new(TxHash(hash), 0);
        let mut state = self.state();
        let address = state.wallet_address.clone();
        state.utxos.insert(
            output_ref,
            Utxo {
                output_ref,
                address,
                value: Value::lovelace(lovelace),
            },
        );
        output_ref
    }

    /// Credit staking rewards to the account behind `reward_address`.
    pub fn accrue_rewards(&self, reward_address: &RewardAddress, lovelace: u64) -> Result<()> {
        let credential = reward_address.credential()?;
        let mut state = self.state();
        let account = state.stake.get_mut(&credential).ok_or_else(|| {
            Error::Query(format!("{reward_address} is not registered"))
        })?;
        account.rewards = account
            .rewards
            .checked_add(lovelace)
            .ok_or(Error::ValueOverflow)?;
        Ok(())
    }

    /// Move the wallet output holding `unit` to an address the wallet does not control.
    pub fn send_away(&self, unit: &AssetUnit) -> Option<OutputRef> {
        let mut state = self.state();
        let elsewhere = wallet_address(state.network, 0x99);
        let wallet = state.wallet_address.clone();
        let utxo = state
            .utxos
            .values_mut()
            .find(|u| u.address == wallet && u.holds(unit))?;
        utxo.address = elsewhere;
        Some(utxo.output_ref)
    }

    /// Make the wallet refuse (or accept again) every signing request.
    pub fn refuse_signing(&self, refuse: bool) {
        self.state().refuse_signing = refuse;
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub fn build_calls(&self) -> usize {
        self.state().build_calls
    }

    pub fn utxos_at_address(&self, address: &Address) -> Vec<Utxo> {
        self.state()
            .utxos
            .values()
            .filter(|u| &u.address == address)
            .cloned()
            .collect()
    }

    pub fn balance_at(&self, address: &Address) -> Value {
        let utxos = self.utxos_at_address(address);
        Value::sum(utxos.iter().map(|u| &u.value)).unwrap_or_default()
    }

    pub fn wallet_holds(&self, unit: &AssetUnit) -> bool {
        self.balance_at(&self.wallet_address()).quantity_of(unit) > 0
    }

    pub fn is_unspent(&self, output_ref: &OutputRef) -> bool {
        self.state().utxos.contains_key(output_ref)
    }

    /// `None` when the credential is not registered.
    pub fn stake_account(&self, reward_address: &RewardAddress) -> Option<StakeAccount> {
        let credential = reward_address.credential().ok()?;
        self.state().stake.get(&credential).cloned()
    }
}

fn wallet_address(network: Network, byte: u8) -> Address {
    let payment = Credential::Key(Hash28([byte; 28]));
    let stake = Credential::Key(Hash28([byte.wrapping_add(1); 28]));
    match Address::base(network, payment, stake) {
        Ok(address) => address,
        Err(_) => Address::from_raw(format!("addr_test_sim_{byte:02x}")),
    }
}

// ── Validator emulation ─────────────────────────────────────────────────────

fn build_err(msg: impl Into<String>) -> Error {
    Error::Build(msg.into())
}

/// The nonce bound into a key policy script.
fn key_policy_nonce(script: &PlutusScript) -> Result<OutputRef> {
    match applied_params(script)?.as_slice() {
        [PlutusData::Constr(0, fields)] => match fields.as_slice() {
            [PlutusData::Bytes(hash), PlutusData::Integer(index)] => Ok(OutputRef::new(
                TxHash::from_slice(hash)?,
                u32::try_from(*index).map_err(|_| build_err("nonce index out of range"))?,
            )),
            _ => Err(build_err("key policy: malformed nonce parameter")),
        },
        _ => Err(build_err("key policy: expected one output reference parameter")),
    }
}

/// The key policy id bound into a treasury script.
fn treasury_key_policy(script: &PlutusScript) -> Result<PolicyId> {
    match applied_params(script)?.as_slice() {
        [PlutusData::Bytes(policy)] => PolicyId::from_slice(policy),
        _ => Err(build_err("treasury: expected one policy id parameter")),
    }
}

/// Run the treasury validator for `hash` under `purpose`: the matching
/// script must be attached and an input must carry its key.
fn check_treasury(desc: &TxDescription, hash: Hash28, purpose: ScriptPurpose) -> Result<()> {
    let script = desc
        .scripts_for(purpose)
        .find(|s| s.hash() == hash)
        .ok_or_else(|| build_err(format!("no {purpose:?} script attached for {hash}")))?;
    let key_policy = treasury_key_policy(script)?;
    if !desc
        .inputs
        .iter()
        .any(|i| i.utxo.value.holds_policy(&key_policy))
    {
        return Err(build_err(format!(
            "treasury validator: no input carries key policy {key_policy}"
        )));
    }
    Ok(())
}

fn check_scripts(desc: &TxDescription) -> Result<()> {
    if let Some(mint) = &desc.mint {
        let script = desc
            .scripts_for(ScriptPurpose::Mint)
            .find(|s| s.policy_id() == mint.policy_id)
            .ok_or_else(|| build_err(format!("no minting script for {}", mint.policy_id)))?;
        let nonce = key_policy_nonce(script)?;
        if !desc.consumed().contains(&nonce) {
            return Err(build_err(format!("key policy: nonce {nonce} is not consumed")));
        }
        if !matches!(mint.assets.as_slice(), [(_, 1)]) {
            return Err(build_err("key policy: must mint exactly one token"));
        }
    }

    for input in &desc.inputs {
        let credential = input.utxo.address.payment_credential()?;
        match (credential, &input.redeemer) {
            (Credential::Script(hash), Some(_)) => {
                check_treasury(desc, hash, ScriptPurpose::Spend)?;
            }
            (Credential::Script(_), None) => {
                return Err(build_err(format!(
                    "script input {} has no redeemer",
                    input.utxo.output_ref
                )));
            }
            (Credential::Key(_), _) => {}
        }
    }

    for action in &desc.certificates {
        if let Credential::Script(hash) = action.certificate.stake_credential() {
            check_treasury(desc, *hash, ScriptPurpose::Publish)?;
        }
    }

    for withdrawal in &desc.withdrawals {
        if let Credential::Script(hash) = withdrawal.reward_address.credential()? {
            check_treasury(desc, hash, ScriptPurpose::Withdraw)?;
        }
    }
    Ok(())
}

impl LedgerState {
    /// Ledger rules for certificates and withdrawals against current state.
    fn check_stake_rules(&self, desc: &TxDescription) -> std::result::Result<(), String> {
        for action in &desc.certificates {
            let credential = action.certificate.stake_credential();
            let account = self.stake.get(credential);
            match (&action.certificate, account) {
                (Certificate::RegisterAndDelegate { .. }, Some(_)) => {
                    return Err(format!("stake credential {} already registered", credential.hash()));
                }
                (Certificate::DelegateToPool { .. } | Certificate::Unregister { .. }, None) => {
                    return Err(format!("stake credential {} is not registered", credential.hash()));
                }
                (Certificate::Unregister { .. }, Some(acc)) if acc.rewards > 0 => {
                    return Err(format!("{} lovelace of rewards must be withdrawn first", acc.rewards));
                }
                _ => {}
            }
        }
        for withdrawal in &desc.withdrawals {
            let credential = withdrawal
                .reward_address
                .credential()
                .map_err(|e| e.to_string())?;
            let rewards = self.stake.get(&credential).map(|a| a.rewards);
            if rewards != Some(withdrawal.amount) {
                return Err(format!(
                    "withdrawal of {} from {} does not match balance {rewards:?}",
                    withdrawal.amount, withdrawal.reward_address
                ));
            }
        }
        Ok(())
    }

    /// Add wallet inputs to cover outputs, fee and deposits; send the rest to change.
    fn balance(&self, desc: &TxDescription) -> Result<TxDescription> {
        let mut balanced = desc.clone();

        let mut available = Value::sum(desc.inputs.iter().map(|i| &i.utxo.value))?;
        if let Some(mint) = &desc.mint {
            for (name, qty) in &mint.assets {
                let qty = u64::try_from(*qty).map_err(|_| build_err("burning is not simulated"))?;
                available =
                    available.with_asset(AssetUnit::new(mint.policy_id, name.clone()), qty)?;
            }
        }
        let mut credit = desc
            .withdrawals
            .iter()
            .try_fold(0u64, |acc, w| acc.checked_add(w.amount))
            .ok_or(Error::ValueOverflow)?;
        let mut debit = SIM_FEE;
        for action in &desc.certificates {
            match action.certificate {
                Certificate::RegisterAndDelegate { .. } => {
                    debit = debit.checked_add(STAKE_DEPOSIT).ok_or(Error::ValueOverflow)?;
                }
                Certificate::Unregister { .. } => {
                    credit = credit.checked_add(STAKE_DEPOSIT).ok_or(Error::ValueOverflow)?;
                }
                Certificate::DelegateToPool { .. } => {}
            }
        }
        available.lovelace = available
            .lovelace
            .checked_add(credit)
            .ok_or(Error::ValueOverflow)?;
        let mut required = Value::sum(desc.outputs.iter().map(|o| &o.value))?;
        required.lovelace = required
            .lovelace
            .checked_add(debit)
            .ok_or(Error::ValueOverflow)?;

        let used: HashSet<OutputRef> = desc.consumed().into_iter().collect();
        for utxo in self
            .utxos
            .values()
            .filter(|u| u.address == self.wallet_address && !used.contains(&u.output_ref))
        {
            if available.checked_sub(&required).is_some() {
                break;
            }
            balanced.spend(utxo);
            available = available.checked_add(&utxo.value).ok_or(Error::ValueOverflow)?;
        }

        let change = available.checked_sub(&required).ok_or_else(|| {
            build_err(format!(
                "insufficient funds: need {} lovelace, have {}",
                required.lovelace, available.lovelace
            ))
        })?;
        if !change.is_zero() {
            balanced.pay(&desc.change_address, change);
        }
        Ok(balanced)
    }
}

// ── Collaborator impls ──────────────────────────────────────────────────────

impl ChainBackend for SimulatedLedger {
    fn utxos_at(&self, address: &Address) -> Result<Vec<Utxo>> {
        Ok(self.utxos_at_address(address))
    }

    fn utxos_at_with_unit(&self, address: &Address, unit: &AssetUnit) -> Result<Vec<Utxo>> {
        Ok(self
            .utxos_at_address(address)
            .into_iter()
            .filter(|u| u.holds(unit))
            .collect())
    }
}

impl RewardOracle for SimulatedLedger {
    fn withdrawable_rewards(&self, reward_address: &RewardAddress) -> Result<u64> {
        Ok(self
            .stake_account(reward_address)
            .map(|a| a.rewards)
            .unwrap_or(0))
    }
}

impl TxBuilder for SimulatedLedger {
    fn build(&self, description: &TxDescription) -> Result<UnsignedTx> {
        let mut state = self.state();
        state.build_calls += 1;

        for output_ref in description.consumed() {
            if !state.utxos.contains_key(&output_ref) {
                return Err(build_err(format!("input {output_ref} is unknown or spent")));
            }
        }
        check_scripts(description)?;
        state.check_stake_rules(description).map_err(Error::Build)?;
        let balanced = state.balance(description)?;

        let cbor = balanced.to_cbor()?;
        let digest = blake2b_simd::Params::new().hash_length(32).hash(&cbor);
        let tx_hash = TxHash::from_slice(digest.as_bytes())?;
        Ok(UnsignedTx {
            tx_hash,
            cbor,
            description: balanced,
        })
    }
}

impl WalletProvider for SimulatedLedger {
    fn address(&self) -> Result<Address> {
        Ok(self.wallet_address())
    }

    fn utxos(&self) -> Result<Vec<Utxo>> {
        Ok(self.utxos_at_address(&self.wallet_address()))
    }

    fn sign(&self, tx: &UnsignedTx) -> Result<SignedTx> {
        if self.state().refuse_signing {
            return Err(Error::Submission(
                SubmissionStage::Sign,
                "user declined to sign".into(),
            ));
        }
        Ok(SignedTx {
            tx_hash: tx.tx_hash,
            cbor: tx.cbor.clone(),
            description: tx.description.clone(),
        })
    }

    /// Applies `tx` atomically, or rejects it if any input is gone.
    fn submit(&self, tx: &SignedTx) -> Result<TxHash> {
        let broadcast_err = |msg: String| Error::Submission(SubmissionStage::Broadcast, msg);
        let mut state = self.state();
        let desc = &tx.description;

        for output_ref in desc.consumed() {
            if !state.utxos.contains_key(&output_ref) {
                return Err(broadcast_err(format!(
                    "conflict: input {output_ref} already spent"
                )));
            }
        }
        state.check_stake_rules(desc).map_err(broadcast_err)?;

        for output_ref in desc.consumed() {
            state.utxos.remove(&output_ref);
        }
        for (index, output) in desc.outputs.iter().enumerate() {
            let index = u32::try_from(index).map_err(|_| broadcast_err("too many outputs".into()))?;
            let output_ref = OutputRef::new(tx.tx_hash, index);
            state.utxos.insert(
                output_ref,
                Utxo {
                    output_ref,
                    address: output.address.clone(),
                    value: output.value.clone(),
                },
            );
        }
        for action in &desc.certificates {
            match &action.certificate {
                Certificate::RegisterAndDelegate { stake, pool, drep } => {
                    state.stake.insert(
                        *stake,
                        StakeAccount {
                            pool: Some(*pool),
                            drep: Some(*drep),
                            rewards: 0,
                        },
                    );
                }
                Certificate::DelegateToPool { stake, pool } => {
                    if let Some(account) = state.stake.get_mut(stake) {
                        account.pool = Some(*pool);
                    }
                }
                Certificate::Unregister { stake } => {
                    state.stake.remove(stake);
                }
            }
        }
        for withdrawal in &desc.withdrawals {
            let credential = withdrawal.reward_address.credential()?;
            if let Some(account) = state.stake.get_mut(&credential) {
                account.rewards -= withdrawal.amount;
            }
        }
        Ok(tx.tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn funded_outputs_are_spendable_by_the_wallet() {
        let ledger = SimulatedLedger::new();
        let a = ledger.fund(3_000_000);
        let b = ledger.fund(4_000_000);
        assert_ne!(a, b);
        assert_eq!(ledger.utxos().unwrap().len(), 2);
        assert_eq!(ledger.balance_at(&ledger.wallet_address()).lovelace, 7_000_000);
    }

    #[test]
    fn builder_balances_with_change() {
        let ledger = SimulatedLedger::new();
        ledger.fund(10_000_000);
        let target = wallet_address(Network::Preprod, 0x42);
        let mut desc = TxDescription::new(ledger.wallet_address());
        desc.pay(&target, Value::lovelace(1_000_000));

        let unsigned = ledger.build(&desc).unwrap();
        assert_eq!(unsigned.description.inputs.len(), 1);
        let change = unsigned.description.outputs.last().unwrap();
        assert_eq!(change.value.lovelace, 10_000_000 - 1_000_000 - SIM_FEE);

        let signed = ledger.sign(&unsigned).unwrap();
        ledger.submit(&signed).unwrap();
        assert_eq!(ledger.balance_at(&target).lovelace, 1_000_000);
        // Same inputs again: conflict.
        assert!(matches!(
            ledger.submit(&signed),
            Err(Error::Submission(SubmissionStage::Broadcast, _))
        ));
    }

    #[test]
    fn insufficient_funds_is_a_build_error() {
        let ledger = SimulatedLedger::new();
        ledger.fund(500_000);
        let mut desc = TxDescription::new(ledger.wallet_address());
        desc.pay(&ledger.wallet_address(), Value::lovelace(1_000_000));
        assert!(matches!(ledger.build(&desc), Err(Error::Build(_))));
        assert_eq!(ledger.build_calls(), 1);
    }
}
