// Canonical binary reader/writer used by transaction objects, manifests and
// node store blobs. Multi-byte integers are big endian.

use crate::crypto::{AccountId, Hash256, ACCOUNT_ID_SIZE, HASH_SIZE};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderError {
    #[error("Invalid size")]
    InvalidSize,
    #[error("Invalid value")]
    InvalidValue,
    #[error("Unexpected end of data")]
    UnexpectedEnd,
    #[error("Trailing bytes left after read")]
    TrailingBytes,
}

pub trait Serializer: Sized {
    fn write(&self, writer: &mut Writer);

    fn read(reader: &mut Reader) -> Result<Self, ReaderError>;

    fn size(&self) -> usize {
        let mut writer = Writer::new();
        self.write(&mut writer);
        writer.total_write()
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.write(&mut writer);
        writer.bytes()
    }

    fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ReaderError> {
        let mut reader = Reader::new(bytes);
        let value = Self::read(&mut reader)?;
        if reader.size() != 0 {
            return Err(ReaderError::TrailingBytes);
        }
        Ok(value)
    }

    fn from_hex(hex: &str) -> Result<Self, ReaderError> {
        let bytes = hex::decode(hex).map_err(|_| ReaderError::InvalidValue)?;
        Self::from_bytes(&bytes)
    }
}

pub struct Reader<'a> {
    bytes: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, total: 0 }
    }

    pub fn read_bytes_ref(&mut self, n: usize) -> Result<&'a [u8], ReaderError> {
        if n > self.size() {
            return Err(ReaderError::UnexpectedEnd);
        }
        let all: &'a [u8] = self.bytes;
        let bytes = &all[self.total..self.total + n];
        self.total += n;
        Ok(bytes)
    }

    pub fn read_bytes<const N: usize>(&mut self, n: usize) -> Result<[u8; N], ReaderError> {
        if n != N {
            return Err(ReaderError::InvalidSize);
        }
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes_ref(n)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        Ok(self.read_bytes_ref(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, ReaderError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16, ReaderError> {
        Ok(u16::from_be_bytes(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        Ok(u32::from_be_bytes(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ReaderError> {
        Ok(u64::from_be_bytes(self.read_bytes(8)?))
    }

    pub fn read_hash(&mut self) -> Result<Hash256, ReaderError> {
        Ok(Hash256::new(self.read_bytes(HASH_SIZE)?))
    }

    pub fn read_account(&mut self) -> Result<AccountId, ReaderError> {
        Ok(AccountId::new(self.read_bytes(ACCOUNT_ID_SIZE)?))
    }

    // Variable length prefix: 1 byte up to 192, 2 bytes up to 12480,
    // 3 bytes up to 918744.
    pub fn read_vl_length(&mut self) -> Result<usize, ReaderError> {
        let b1 = self.read_u8()? as usize;
        if b1 <= 192 {
            return Ok(b1);
        }
        let b2 = self.read_u8()? as usize;
        if b1 <= 240 {
            return Ok(193 + (b1 - 193) * 256 + b2);
        }
        if b1 <= 254 {
            let b3 = self.read_u8()? as usize;
            return Ok(12481 + (b1 - 241) * 65536 + b2 * 256 + b3);
        }
        Err(ReaderError::InvalidSize)
    }

    pub fn read_vl(&mut self) -> Result<Vec<u8>, ReaderError> {
        let len = self.read_vl_length()?;
        Ok(self.read_bytes_ref(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> Result<String, ReaderError> {
        String::from_utf8(self.read_vl()?).map_err(|_| ReaderError::InvalidValue)
    }

    pub fn size(&self) -> usize {
        self.bytes.len() - self.total
    }

    pub fn remaining(&self) -> &'a [u8] {
        let all: &'a [u8] = self.bytes;
        &all[self.total..]
    }

    pub fn total_read(&self) -> usize {
        self.total
    }
}

#[derive(Default)]
pub struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_hash(&mut self, hash: &Hash256) {
        self.write_bytes(hash.as_bytes());
    }

    pub fn write_account(&mut self, account: &AccountId) {
        self.write_bytes(account.as_bytes());
    }

    pub fn write_vl_length(&mut self, len: usize) {
        if len <= 192 {
            self.write_u8(len as u8);
        } else if len <= 12480 {
            let len = len - 193;
            self.write_u8((193 + (len >> 8)) as u8);
            self.write_u8((len & 0xff) as u8);
        } else {
            let len = len - 12481;
            self.write_u8((241 + (len >> 16)) as u8);
            self.write_u8(((len >> 8) & 0xff) as u8);
            self.write_u8((len & 0xff) as u8);
        }
    }

    pub fn write_vl(&mut self, bytes: &[u8]) {
        self.write_vl_length(bytes.len());
        self.write_bytes(bytes);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_vl(value.as_bytes());
    }

    pub fn total_write(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vl_length_boundaries() {
        for len in [0usize, 1, 192, 193, 12480, 12481, 100_000] {
            let mut writer = Writer::new();
            writer.write_vl_length(len);
            let bytes = writer.bytes();
            let mut reader = Reader::new(&bytes);
            assert_eq!(reader.read_vl_length().unwrap(), len);
            assert_eq!(reader.size(), 0);
        }
    }

    #[test]
    fn test_read_past_end() {
        let mut reader = Reader::new(&[1, 2]);
        assert_eq!(reader.read_u32(), Err(ReaderError::UnexpectedEnd));
        assert_eq!(reader.read_u16().unwrap(), 0x0102);
    }
}
