use ciborium::value::Value as Cbor;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ledger::{Hash28, PolicyId};
use crate::plutus::PlutusData;

/// Plutus ledger language; its tag prefixes the bytes hashed into a script hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlutusVersion {
    V1,
    V2,
    V3,
}

impl PlutusVersion {
    pub fn tag(self) -> u8 {
        match self {
            PlutusVersion::V1 => 1,
            PlutusVersion::V2 => 2,
            PlutusVersion::V3 => 3,
        }
    }
}

/// A ready-to-attach Plutus script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlutusScript {
    pub version: PlutusVersion,
    pub bytes: Vec<u8>,
}

impl PlutusScript {
    pub fn new(version: PlutusVersion, bytes: Vec<u8>) -> Self {
        Self { version, bytes }
    }

    /// blake2b-224 over `language_tag || script_bytes`.
    pub fn hash(&self) -> Hash28 {
        let digest = blake2b_simd::Params::new()
            .hash_length(Hash28::LEN)
            .to_state()
            .update(&[self.version.tag()])
            .update(&self.bytes)
            .finalize();
        let mut out = [0u8; 28];
        out.copy_from_slice(digest.as_bytes());
        Hash28(out)
    }

    /// A minting policy's id is its script hash.
    pub fn policy_id(&self) -> PolicyId {
        PolicyId(self.hash().0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// A compiled validator that still expects its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    title: String,
    version: PlutusVersion,
    compiled_code: Vec<u8>,
}

impl ScriptTemplate {
    pub fn new(title: impl Into<String>, version: PlutusVersion, compiled_code: Vec<u8>) -> Self {
        Self {
            title: title.into(),
            version,
            compiled_code,
        }
    }

    pub fn from_hex(title: impl Into<String>, version: PlutusVersion, code_hex: &str) -> Result<Self> {
        let title = title.into();
        let compiled_code = hex::decode(code_hex.trim())
            .map_err(|e| Error::Blueprint(format!("{title}: bad compiledCode hex: {e}")))?;
        if compiled_code.is_empty() {
            return Err(Error::Blueprint(format!("{title}: empty compiledCode")));
        }
        Ok(Self::new(title, version, compiled_code))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> PlutusVersion {
        self.version
    }

    /// Bind `params` to the template.
    ///
    /// The applied script is the CBOR array `[compiled_code, [params…]]`. It is a
    /// pure function of the template and the parameters, so the resulting hash
    /// (and every address derived from it) is stable.
    pub fn apply(&self, params: &[PlutusData]) -> Result<PlutusScript> {
        let args = params
            .iter()
            .map(PlutusData::to_cbor_value)
            .collect::<Result<Vec<_>>>()?;
        let applied = Cbor::Array(vec![
            Cbor::Bytes(self.compiled_code.clone()),
            Cbor::Array(args),
        ]);
        let mut bytes = Vec::new();
        ciborium::into_writer(&applied, &mut bytes)
            .map_err(|e| Error::Script(format!("{}: apply params: {e}", self.title)))?;
        Ok(PlutusScript::new(self.version, bytes))
    }
}

/// Recover the parameters bound into a script produced by [`ScriptTemplate::apply`].
pub fn applied_params(script: &PlutusScript) -> Result<Vec<PlutusData>> {
    let value: Cbor = ciborium::from_reader(script.bytes.as_slice())
        .map_err(|e| Error::Script(format!("applied script decode: {e}")))?;
    match value {
        Cbor::Array(parts) if parts.len() == 2 => match &parts[1] {
            Cbor::Array(args) => args.iter().map(PlutusData::from_cbor_value).collect(),
            _ => Err(Error::Script("applied script params must be an array".into())),
        },
        _ => Err(Error::Script("not an applied script".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> ScriptTemplate {
        ScriptTemplate::new("test.spend", PlutusVersion::V3, vec![0x01, 0x02, 0x03])
    }

    #[test]
    fn apply_is_deterministic() {
        let params = [PlutusData::bytes([0xaa; 28])];
        let a = template().apply(&params).unwrap();
        let b = template().apply(&params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn different_params_different_hash() {
        let a = template().apply(&[PlutusData::bytes([0xaa; 28])]).unwrap();
        let b = template().apply(&[PlutusData::bytes([0xab; 28])]).unwrap();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn language_tag_changes_hash() {
        let v3 = PlutusScript::new(PlutusVersion::V3, vec![1, 2, 3]);
        let v2 = PlutusScript::new(PlutusVersion::V2, vec![1, 2, 3]);
        assert_ne!(v3.hash(), v2.hash());
    }

    #[test]
    fn applied_params_recovers_arguments() {
        let params = vec![PlutusData::void(), PlutusData::Integer(9)];
        let script = template().apply(&params).unwrap();
        assert_eq!(applied_params(&script).unwrap(), params);
        let raw = PlutusScript::new(PlutusVersion::V3, vec![0x01]);
        assert!(applied_params(&raw).is_err());
    }

    #[test]
    fn from_hex_rejects_empty_code() {
        assert!(ScriptTemplate::from_hex("x", PlutusVersion::V3, "").is_err());
        assert!(ScriptTemplate::from_hex("x", PlutusVersion::V3, "zz").is_err());
    }
}
