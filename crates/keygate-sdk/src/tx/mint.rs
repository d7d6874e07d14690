use crate::address::Address;
use crate::contract::CompiledKeyPolicy;
use crate::error::{Error, Result};
use crate::ledger::{AssetName, Utxo};
use crate::plutus::PlutusData;

use super::{MintInstruction, ScriptPurpose, TxDescription};

/// Parameters for minting the key token.
pub struct MintParams {
    /// Wallet output the policy was applied to. Consuming it is what makes the
    /// policy one-shot.
    pub nonce: Utxo,
    pub asset_name: AssetName,
    pub change_address: Address,
}

/// Build the key mint.
///
/// Input 0: nonce (wallet)
///
/// Mint: exactly one `asset_name` under the nonce-bound key policy, void redeemer
///
/// Outputs: none; the new key and the nonce's value return to the wallet as change
pub fn build_mint_tx(policy: &CompiledKeyPolicy, params: &MintParams) -> Result<TxDescription> {
    if policy.params().nonce != params.nonce.output_ref {
        return Err(Error::Build(format!(
            "key policy is bound to {}, not {}",
            policy.params().nonce,
            params.nonce.output_ref
        )));
    }

    let mut desc = TxDescription::new(params.change_address.clone());
    desc.spend(&params.nonce);
    desc.mint = Some(MintInstruction {
        policy_id: policy.policy_id(),
        assets: vec![(params.asset_name.clone(), 1)],
        redeemer: PlutusData::void(),
    });
    desc.attach(ScriptPurpose::Mint, policy.script());
    Ok(desc)
}
