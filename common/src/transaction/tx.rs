use serde_json::Value;
use std::fmt;

use super::{Field, FieldValue, ParseError, SignerEntry, TxError, TxObject, TxType};
use crate::{
    amount::{Amount, Drops},
    crypto::{AccountId, CryptoError, Hash256, KeyPair, PublicKey},
    serializer::Serializer,
};

/// A validated transaction. The underlying object is immutable once built so
/// the cached id always matches the serialized form.
#[derive(Clone, PartialEq, Eq)]
pub struct Transaction {
    tx_type: TxType,
    object: TxObject,
    id: Hash256,
}

impl Transaction {
    pub fn from_object(object: TxObject) -> Result<Self, TxError> {
        let tx_type = object
            .tx_type()
            .ok_or(TxError::MissingField(Field::TransactionType.json_name()))?;
        for field in TxType::common_required().iter().chain(tx_type.required()) {
            if !object.contains(*field) {
                return Err(TxError::MissingField(field.json_name()));
            }
        }
        for (field, _) in object.fields() {
            let allowed = TxType::common_required().contains(field)
                || TxType::common_optional().contains(field)
                || tx_type.required().contains(field)
                || tx_type.optional().contains(field);
            if !allowed {
                return Err(TxError::UnexpectedField(field.json_name()));
            }
        }
        match object.get(Field::Fee) {
            Some(FieldValue::Amount(Amount::Native(_))) => {}
            _ => return Err(TxError::NonNativeFee),
        }
        let id = object.id();
        Ok(Self {
            tx_type,
            object,
            id,
        })
    }

    pub fn from_json(json: &Value) -> Result<Self, TxError> {
        Self::from_object(TxObject::from_json(json)?)
    }

    pub fn from_blob(bytes: &[u8]) -> Result<Self, TxError> {
        let object = TxObject::from_bytes(bytes).map_err(ParseError::from)?;
        Self::from_object(object)
    }

    pub fn tx_type(&self) -> TxType {
        self.tx_type
    }

    pub fn object(&self) -> &TxObject {
        &self.object
    }

    pub fn id(&self) -> Hash256 {
        self.id
    }

    pub fn get_u32(&self, field: Field) -> Option<u32> {
        match self.object.get(field) {
            Some(FieldValue::U32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_amount(&self, field: Field) -> Option<Amount> {
        match self.object.get(field) {
            Some(FieldValue::Amount(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_blob(&self, field: Field) -> Option<&[u8]> {
        match self.object.get(field) {
            Some(FieldValue::Blob(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_account(&self, field: Field) -> Option<AccountId> {
        match self.object.get(field) {
            Some(FieldValue::Account(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_h128(&self, field: Field) -> Option<[u8; 16]> {
        match self.object.get(field) {
            Some(FieldValue::H128(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_h256(&self, field: Field) -> Option<Hash256> {
        match self.object.get(field) {
            Some(FieldValue::H256(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn is_field_present(&self, field: Field) -> bool {
        self.object.contains(field)
    }

    pub fn account(&self) -> AccountId {
        self.get_account(Field::Account).unwrap_or_default()
    }

    pub fn fee(&self) -> Drops {
        self.get_amount(Field::Fee)
            .and_then(|a| a.drops())
            .unwrap_or_default()
    }

    pub fn sequence(&self) -> u32 {
        self.get_u32(Field::Sequence).unwrap_or_default()
    }

    pub fn flags(&self) -> u32 {
        self.get_u32(Field::Flags).unwrap_or_default()
    }

    pub fn signing_pub_key(&self) -> &[u8] {
        self.get_blob(Field::SigningPubKey).unwrap_or_default()
    }

    pub fn signer_entries(&self) -> &[SignerEntry] {
        match self.object.get(Field::SignerEntries) {
            Some(FieldValue::SignerEntries(entries)) => entries,
            _ => &[],
        }
    }

    pub fn signing_data(&self) -> Vec<u8> {
        self.object.signing_data()
    }

    /// Verify the single signature against the signing public key.
    pub fn check_sign(&self) -> Result<(), CryptoError> {
        let key = PublicKey::from_slice(self.signing_pub_key())?;
        let signature = self
            .get_blob(Field::TxnSignature)
            .ok_or(CryptoError::InvalidSignature)?;
        key.verify(&self.signing_data(), signature)
    }

    pub fn to_blob(&self) -> Vec<u8> {
        self.object.to_bytes()
    }

    pub fn to_json(&self) -> Value {
        let mut json = self.object.to_json();
        if let Some(obj) = json.as_object_mut() {
            obj.insert("hash".to_string(), Value::String(self.id.to_hex()));
        }
        json
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction({} {})", self.tx_type, self.id)
    }
}

/// Attach `SigningPubKey` and `TxnSignature` to a JSON transaction.
pub fn sign_json(json: &mut Value, keys: &KeyPair) -> Result<(), ParseError> {
    let obj = json.as_object_mut().ok_or(ParseError::NotAnObject)?;
    obj.insert(
        Field::SigningPubKey.json_name().to_string(),
        Value::String(keys.public_key().to_hex()),
    );
    obj.remove(Field::TxnSignature.json_name());
    let object = TxObject::from_json(json)?;
    let signature = keys.sign(&object.signing_data());
    if let Some(obj) = json.as_object_mut() {
        obj.insert(
            Field::TxnSignature.json_name().to_string(),
            Value::String(hex::encode_upper(signature)),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop_json(keys: &KeyPair) -> Value {
        json!({
            "TransactionType": "AccountSet",
            "Account": keys.public_key().account_id().to_base58(),
            "Fee": "10",
            "Sequence": 1,
            "Flags": 0x8000_0000u32,
        })
    }

    #[test]
    fn test_sign_verify_and_blob() {
        let keys = KeyPair::from_passphrase("alice");
        let mut jv = noop_json(&keys);
        sign_json(&mut jv, &keys).unwrap();
        let tx = Transaction::from_json(&jv).unwrap();
        assert_eq!(tx.tx_type(), TxType::AccountSet);
        assert!(tx.check_sign().is_ok());
        let decoded = Transaction::from_blob(&tx.to_blob()).unwrap();
        assert_eq!(decoded.id(), tx.id());
        assert_eq!(decoded.to_json(), tx.to_json());
    }

    #[test]
    fn test_tampered_transaction_fails_verification() {
        let keys = KeyPair::from_passphrase("alice");
        let mut jv = noop_json(&keys);
        sign_json(&mut jv, &keys).unwrap();
        jv["Sequence"] = json!(2);
        let tx = Transaction::from_json(&jv).unwrap();
        assert_eq!(tx.check_sign(), Err(CryptoError::VerificationFailed));
    }

    #[test]
    fn test_missing_and_unexpected_fields() {
        let keys = KeyPair::from_passphrase("alice");
        let mut jv = noop_json(&keys);
        sign_json(&mut jv, &keys).unwrap();
        jv["TransactionType"] = json!("Payment");
        assert_eq!(
            Transaction::from_json(&jv),
            Err(TxError::MissingField("Destination"))
        );
        jv["TransactionType"] = json!("AccountSet");
        jv["LimitAmount"] = json!("10");
        assert_eq!(
            Transaction::from_json(&jv),
            Err(TxError::UnexpectedField("LimitAmount"))
        );
    }

    #[test]
    fn test_unknown_json_field_is_a_parse_error() {
        let result = TxObject::from_json(&json!({"Bogus": 1}));
        assert_eq!(result, Err(ParseError::UnknownField("Bogus".into())));
    }
}
