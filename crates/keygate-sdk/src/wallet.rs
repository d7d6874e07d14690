use crate::address::Address;
use crate::error::Result;
use crate::ledger::{TxHash, Utxo};
use crate::tx::{SignedTx, UnsignedTx};

/// The connected wallet. Key custody and connection live outside this crate.
pub trait WalletProvider: Send + Sync {
    /// Address that receives change and holds the key token.
    fn address(&self) -> Result<Address>;

    fn utxos(&self) -> Result<Vec<Utxo>>;

    fn sign(&self, tx: &UnsignedTx) -> Result<SignedTx>;

    /// Broadcast `tx` and return its id.
    fn submit(&self, tx: &SignedTx) -> Result<TxHash>;
}
