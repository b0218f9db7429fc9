use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{Field, FieldType, ParseError, TxType};
use crate::{
    amount::Amount,
    crypto::{prefix, AccountId, Hash256},
    serializer::{Reader, ReaderError, Serializer, Writer},
};

const OBJECT_END: u8 = 0xE1;
const ARRAY_END: u8 = 0xF1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SignerEntry {
    pub account: AccountId,
    pub weight: u16,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FieldValue {
    U16(u16),
    U32(u32),
    H128([u8; 16]),
    H256(Hash256),
    Amount(Amount),
    Blob(Vec<u8>),
    Account(AccountId),
    SignerEntries(Vec<SignerEntry>),
}

/// Field map with canonical ordering, the untyped form of a transaction.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TxObject {
    fields: BTreeMap<Field, FieldValue>,
}

impl TxObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn remove(&mut self, field: Field) -> Option<FieldValue> {
        self.fields.remove(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&Field, &FieldValue)> {
        self.fields.iter()
    }

    pub fn tx_type(&self) -> Option<TxType> {
        match self.get(Field::TransactionType) {
            Some(FieldValue::U16(code)) => TxType::from_code(*code),
            _ => None,
        }
    }

    pub fn from_json(json: &Value) -> Result<Self, ParseError> {
        let obj = json.as_object().ok_or(ParseError::NotAnObject)?;
        let mut out = TxObject::new();
        for (key, value) in obj {
            let field =
                Field::from_json_name(key).ok_or_else(|| ParseError::UnknownField(key.clone()))?;
            out.set(field, parse_value(field, value)?);
        }
        Ok(out)
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        for (field, value) in &self.fields {
            obj.insert(field.json_name().to_string(), render_value(*field, value));
        }
        Value::Object(obj)
    }

    fn write_fields(&self, writer: &mut Writer, signing: bool) {
        for (field, value) in &self.fields {
            if signing && !field.is_signing_field() {
                continue;
            }
            write_field(writer, *field, value);
        }
    }

    /// Bytes covered by the signature.
    pub fn signing_data(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.write_bytes(&prefix::TX_SIGN);
        self.write_fields(&mut writer, true);
        writer.bytes()
    }

    pub fn id(&self) -> Hash256 {
        let mut writer = Writer::new();
        writer.write_bytes(&prefix::TRANSACTION_ID);
        self.write_fields(&mut writer, false);
        crate::crypto::hash(writer.as_bytes())
    }
}

impl Serializer for TxObject {
    fn write(&self, writer: &mut Writer) {
        self.write_fields(writer, false);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let mut out = TxObject::new();
        let mut last: Option<Field> = None;
        while reader.size() > 0 {
            let field = read_header(reader)?;
            if last.is_some_and(|l| l >= field) {
                return Err(ReaderError::InvalidValue);
            }
            last = Some(field);
            let value = read_value(reader, field)?;
            out.set(field, value);
        }
        Ok(out)
    }
}

fn write_header(writer: &mut Writer, field: Field) {
    let type_code = field.field_type() as u8;
    let code = field.code();
    match (type_code < 16, code < 16) {
        (true, true) => writer.write_u8(type_code << 4 | code),
        (true, false) => {
            writer.write_u8(type_code << 4);
            writer.write_u8(code);
        }
        (false, true) => {
            writer.write_u8(code);
            writer.write_u8(type_code);
        }
        (false, false) => {
            writer.write_u8(0);
            writer.write_u8(type_code);
            writer.write_u8(code);
        }
    }
}

fn read_header(reader: &mut Reader) -> Result<Field, ReaderError> {
    let first = reader.read_u8()?;
    let mut type_code = first >> 4;
    let mut code = first & 0x0f;
    if type_code == 0 {
        type_code = reader.read_u8()?;
    }
    if code == 0 {
        code = reader.read_u8()?;
    }
    Field::from_codes(type_code, code).ok_or(ReaderError::InvalidValue)
}

fn write_field(writer: &mut Writer, field: Field, value: &FieldValue) {
    write_header(writer, field);
    match value {
        FieldValue::U16(v) => writer.write_u16(*v),
        FieldValue::U32(v) => writer.write_u32(*v),
        FieldValue::H128(v) => writer.write_bytes(v),
        FieldValue::H256(v) => writer.write_hash(v),
        FieldValue::Amount(v) => v.write(writer),
        FieldValue::Blob(v) => writer.write_vl(v),
        FieldValue::Account(v) => writer.write_vl(v.as_bytes()),
        FieldValue::SignerEntries(entries) => {
            for entry in entries {
                write_header(writer, Field::SignerEntry);
                write_field(writer, Field::SignerWeight, &FieldValue::U16(entry.weight));
                write_field(writer, Field::Account, &FieldValue::Account(entry.account));
                writer.write_u8(OBJECT_END);
            }
            writer.write_u8(ARRAY_END);
        }
    }
}

fn read_value(reader: &mut Reader, field: Field) -> Result<FieldValue, ReaderError> {
    Ok(match field.field_type() {
        FieldType::UInt16 => FieldValue::U16(reader.read_u16()?),
        FieldType::UInt32 => FieldValue::U32(reader.read_u32()?),
        FieldType::Hash128 => FieldValue::H128(reader.read_bytes(16)?),
        FieldType::Hash256 => FieldValue::H256(reader.read_hash()?),
        FieldType::Amount => FieldValue::Amount(Amount::read(reader)?),
        FieldType::Blob => FieldValue::Blob(reader.read_vl()?),
        FieldType::AccountId => {
            let len = reader.read_vl_length()?;
            if len != 20 {
                return Err(ReaderError::InvalidSize);
            }
            FieldValue::Account(reader.read_account()?)
        }
        FieldType::Array => {
            let mut entries = Vec::new();
            loop {
                if peek(reader)? == ARRAY_END {
                    reader.read_u8()?;
                    break;
                }
                if read_header(reader)? != Field::SignerEntry {
                    return Err(ReaderError::InvalidValue);
                }
                let mut weight = None;
                let mut account = None;
                while peek(reader)? != OBJECT_END {
                    match read_header(reader)? {
                        Field::SignerWeight => weight = Some(reader.read_u16()?),
                        Field::Account => {
                            if reader.read_vl_length()? != 20 {
                                return Err(ReaderError::InvalidSize);
                            }
                            account = Some(reader.read_account()?)
                        }
                        _ => return Err(ReaderError::InvalidValue),
                    }
                }
                reader.read_u8()?;
                match (account, weight) {
                    (Some(account), Some(weight)) => entries.push(SignerEntry { account, weight }),
                    _ => return Err(ReaderError::InvalidValue),
                }
            }
            FieldValue::SignerEntries(entries)
        }
        FieldType::Object => return Err(ReaderError::InvalidValue),
    })
}

fn peek(reader: &Reader) -> Result<u8, ReaderError> {
    let mut copy = Reader::new(reader.remaining());
    copy.read_u8()
}

fn parse_u32(field: Field, value: &Value) -> Result<u32, ParseError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ParseError::invalid(field.json_name(), "expected unsigned 32 bit integer")),
        Value::String(s) => s
            .parse::<u32>()
            .map_err(|e| ParseError::invalid(field.json_name(), e)),
        _ => Err(ParseError::invalid(field.json_name(), "expected unsigned 32 bit integer")),
    }
}

fn parse_hex(field: Field, value: &Value) -> Result<Vec<u8>, ParseError> {
    let s = value
        .as_str()
        .ok_or_else(|| ParseError::invalid(field.json_name(), "expected hex string"))?;
    hex::decode(s).map_err(|e| ParseError::invalid(field.json_name(), e))
}

fn parse_account(field: Field, value: &Value) -> Result<AccountId, ParseError> {
    let s = value
        .as_str()
        .ok_or_else(|| ParseError::invalid(field.json_name(), "expected account string"))?;
    AccountId::from_base58(s).map_err(|e| ParseError::invalid(field.json_name(), e))
}

fn parse_value(field: Field, value: &Value) -> Result<FieldValue, ParseError> {
    Ok(match field.field_type() {
        FieldType::UInt16 if field == Field::TransactionType => match value {
            Value::String(name) => FieldValue::U16(
                TxType::from_name(name).ok_or_else(|| ParseError::UnknownTxType(name.clone()))? as u16,
            ),
            _ => {
                let code = parse_u32(field, value)?;
                let tx_type = u16::try_from(code)
                    .ok()
                    .and_then(TxType::from_code)
                    .ok_or_else(|| ParseError::UnknownTxType(code.to_string()))?;
                FieldValue::U16(tx_type as u16)
            }
        },
        FieldType::UInt16 => {
            let v = parse_u32(field, value)?;
            FieldValue::U16(
                u16::try_from(v).map_err(|e| ParseError::invalid(field.json_name(), e))?,
            )
        }
        FieldType::UInt32 => FieldValue::U32(parse_u32(field, value)?),
        // An empty string stands for the zero hash, which clears the field.
        FieldType::Hash128 => {
            let bytes = parse_hex(field, value)?;
            if bytes.is_empty() {
                return Ok(FieldValue::H128([0u8; 16]));
            }
            FieldValue::H128(
                bytes
                    .try_into()
                    .map_err(|_| ParseError::invalid(field.json_name(), "expected 16 bytes"))?,
            )
        }
        FieldType::Hash256 => {
            let bytes = parse_hex(field, value)?;
            if bytes.is_empty() {
                return Ok(FieldValue::H256(Hash256::zero()));
            }
            FieldValue::H256(
                Hash256::from_slice(&bytes).map_err(|e| ParseError::invalid(field.json_name(), e))?,
            )
        }
        FieldType::Amount => FieldValue::Amount(
            Amount::from_json(value).map_err(|e| ParseError::invalid(field.json_name(), e))?,
        ),
        FieldType::Blob => FieldValue::Blob(parse_hex(field, value)?),
        FieldType::AccountId => FieldValue::Account(parse_account(field, value)?),
        FieldType::Array => {
            let items = value
                .as_array()
                .ok_or_else(|| ParseError::invalid(field.json_name(), "expected array"))?;
            let mut entries = Vec::with_capacity(items.len());
            for item in items {
                let inner = item
                    .get(Field::SignerEntry.json_name())
                    .ok_or_else(|| ParseError::invalid(field.json_name(), "expected SignerEntry"))?;
                let account = inner
                    .get(Field::Account.json_name())
                    .ok_or_else(|| ParseError::invalid(field.json_name(), "missing Account"))?;
                let weight = inner
                    .get(Field::SignerWeight.json_name())
                    .ok_or_else(|| ParseError::invalid(field.json_name(), "missing SignerWeight"))?;
                entries.push(SignerEntry {
                    account: parse_account(Field::Account, account)?,
                    weight: u16::try_from(parse_u32(Field::SignerWeight, weight)?)
                        .map_err(|e| ParseError::invalid(field.json_name(), e))?,
                });
            }
            FieldValue::SignerEntries(entries)
        }
        FieldType::Object => return Err(ParseError::UnknownField(field.json_name().to_string())),
    })
}

fn render_value(field: Field, value: &FieldValue) -> Value {
    match value {
        FieldValue::U16(code) if field == Field::TransactionType => match TxType::from_code(*code) {
            Some(tx_type) => Value::String(tx_type.name().to_string()),
            None => Value::from(*code),
        },
        FieldValue::U16(v) => Value::from(*v),
        FieldValue::U32(v) => Value::from(*v),
        FieldValue::H128(v) => Value::String(hex::encode_upper(v)),
        FieldValue::H256(v) => Value::String(v.to_hex()),
        FieldValue::Amount(v) => v.to_json(),
        FieldValue::Blob(v) => Value::String(hex::encode_upper(v)),
        FieldValue::Account(v) => Value::String(v.to_base58()),
        FieldValue::SignerEntries(entries) => Value::Array(
            entries
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "SignerEntry": {
                            "Account": e.account.to_base58(),
                            "SignerWeight": e.weight,
                        }
                    })
                })
                .collect(),
        ),
    }
}
