//! Plutus data (script parameters and redeemers) and its CBOR encoding.

use ciborium::value::{Integer, Value as Cbor};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ledger::OutputRef;

/// Constructor alternatives 0..=6 use tags 121..=127.
const CONSTR_TAG_BASE: u64 = 121;
/// Constructor alternatives 7..=127 use tags 1280..=1400.
const CONSTR_TAG_EXTENDED: u64 = 1280;
/// Any other alternative is encoded as tag 102 over `[alt, fields]`.
const CONSTR_TAG_GENERAL: u64 = 102;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlutusData {
    Constr(u64, Vec<PlutusData>),
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Integer(i128),
    Bytes(Vec<u8>),
}

impl PlutusData {
    /// The unit value `Constr 0 []`, used as the redeemer for every key-gated action.
    pub fn void() -> Self {
        PlutusData::Constr(0, Vec::new())
    }

    pub fn bytes(b: impl AsRef<[u8]>) -> Self {
        PlutusData::Bytes(b.as_ref().to_vec())
    }

    pub fn to_cbor_value(&self) -> Result<Cbor> {
        Ok(match self {
            PlutusData::Constr(alt, fields) => {
                let fields = Cbor::Array(
                    fields
                        .iter()
                        .map(PlutusData::to_cbor_value)
                        .collect::<Result<_>>()?,
                );
                match *alt {
                    0..=6 => Cbor::Tag(CONSTR_TAG_BASE + alt, Box::new(fields)),
                    7..=127 => Cbor::Tag(CONSTR_TAG_EXTENDED + alt - 7, Box::new(fields)),
                    _ => Cbor::Tag(
                        CONSTR_TAG_GENERAL,
                        Box::new(Cbor::Array(vec![Cbor::Integer((*alt).into()), fields])),
                    ),
                }
            }
            PlutusData::Map(entries) => Cbor::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.to_cbor_value()?, v.to_cbor_value()?)))
                    .collect::<Result<_>>()?,
            ),
            PlutusData::List(items) => Cbor::Array(
                items
                    .iter()
                    .map(PlutusData::to_cbor_value)
                    .collect::<Result<_>>()?,
            ),
            PlutusData::Integer(i) => Cbor::Integer(
                Integer::try_from(*i)
                    .map_err(|_| Error::Script(format!("integer {i} out of CBOR range")))?,
            ),
            PlutusData::Bytes(b) => Cbor::Bytes(b.clone()),
        })
    }

    pub fn from_cbor_value(value: &Cbor) -> Result<Self> {
        match value {
            Cbor::Tag(tag, inner) => {
                let (alt, fields) = match *tag {
                    t @ 121..=127 => (t - CONSTR_TAG_BASE, inner.as_ref()),
                    t @ 1280..=1400 => (t - CONSTR_TAG_EXTENDED + 7, inner.as_ref()),
                    CONSTR_TAG_GENERAL => match inner.as_ref() {
                        Cbor::Array(pair) if pair.len() == 2 => {
                            let alt = match &pair[0] {
                                Cbor::Integer(i) => u64::try_from(*i).map_err(|_| {
                                    Error::Script("negative constructor index".into())
                                })?,
                                _ => return Err(Error::Script("bad constructor index".into())),
                            };
                            (alt, &pair[1])
                        }
                        _ => return Err(Error::Script("bad general constructor".into())),
                    },
                    other => return Err(Error::Script(format!("unexpected CBOR tag {other}"))),
                };
                match fields {
                    Cbor::Array(items) => Ok(PlutusData::Constr(
                        alt,
                        items
                            .iter()
                            .map(PlutusData::from_cbor_value)
                            .collect::<Result<_>>()?,
                    )),
                    _ => Err(Error::Script("constructor fields must be an array".into())),
                }
            }
            Cbor::Map(entries) => Ok(PlutusData::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((Self::from_cbor_value(k)?, Self::from_cbor_value(v)?)))
                    .collect::<Result<_>>()?,
            )),
            Cbor::Array(items) => Ok(PlutusData::List(
                items
                    .iter()
                    .map(PlutusData::from_cbor_value)
                    .collect::<Result<_>>()?,
            )),
            Cbor::Integer(i) => Ok(PlutusData::Integer(i128::from(*i))),
            Cbor::Bytes(b) => Ok(PlutusData::Bytes(b.clone())),
            other => Err(Error::Script(format!("not plutus data: {other:?}"))),
        }
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(&self.to_cbor_value()?, &mut buf)
            .map_err(|e| Error::Script(format!("CBOR encode: {e}")))?;
        Ok(buf)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let value: Cbor = ciborium::from_reader(bytes)
            .map_err(|e| Error::Script(format!("CBOR decode: {e}")))?;
        Self::from_cbor_value(&value)
    }
}

impl From<OutputRef> for PlutusData {
    /// `OutputReference { transaction_id, output_index }`.
    fn from(r: OutputRef) -> Self {
        PlutusData::Constr(
            0,
            vec![
                PlutusData::bytes(r.tx_hash.as_bytes()),
                PlutusData::Integer(i128::from(r.index)),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TxHash;

    #[test]
    fn void_is_tag_121_empty_array() {
        let cbor = PlutusData::void().to_cbor().unwrap();
        // tag(121) = d8 79, empty array = 80
        assert_eq!(cbor, vec![0xd8, 0x79, 0x80]);
    }

    #[test]
    fn constructor_tags_by_alternative() {
        let c7 = PlutusData::Constr(7, vec![]).to_cbor_value().unwrap();
        assert!(matches!(c7, Cbor::Tag(1280, _)));
        let c200 = PlutusData::Constr(200, vec![]).to_cbor_value().unwrap();
        assert!(matches!(c200, Cbor::Tag(102, _)));
    }

    #[test]
    fn output_ref_shape_survives_decode() {
        let r = OutputRef::new(TxHash([0xee; 32]), 3);
        let data = PlutusData::from(r);
        let decoded = PlutusData::from_cbor(&data.to_cbor().unwrap()).unwrap();
        assert_eq!(decoded, data);
        match decoded {
            PlutusData::Constr(0, fields) => {
                assert_eq!(fields[0], PlutusData::Bytes(vec![0xee; 32]));
                assert_eq!(fields[1], PlutusData::Integer(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_foreign_tags() {
        let value = Cbor::Tag(24, Box::new(Cbor::Bytes(vec![])));
        assert!(PlutusData::from_cbor_value(&value).is_err());
    }
}
