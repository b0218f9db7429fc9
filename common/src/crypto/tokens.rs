// Base58 tokens in the ripple alphabet with a version byte and a 4 byte
// double-SHA256 checksum.

use super::CryptoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    AccountId = 0,
    NodePublic = 28,
    NodePrivate = 32,
    FamilySeed = 33,
    AccountPublic = 35,
}

pub fn encode_token(kind: TokenType, payload: &[u8]) -> String {
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check_version(kind as u8)
        .into_string()
}

// Returns the token type byte and its payload
pub fn decode_any_token(s: &str) -> Result<(u8, Vec<u8>), CryptoError> {
    let decoded = bs58::decode(s)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(None)
        .into_vec()
        .map_err(|e| match e {
            bs58::decode::Error::InvalidChecksum { .. } => CryptoError::InvalidChecksum,
            other => CryptoError::InvalidAddress(other.to_string()),
        })?;
    match decoded.split_first() {
        Some((version, payload)) => Ok((*version, payload.to_vec())),
        None => Err(CryptoError::InvalidAddress(s.to_owned())),
    }
}

pub fn decode_token(kind: TokenType, s: &str) -> Result<Vec<u8>, CryptoError> {
    let (version, payload) = decode_any_token(s)?;
    if version != kind as u8 {
        return Err(CryptoError::WrongTokenType(version));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_type_is_checked() {
        let encoded = encode_token(TokenType::NodePrivate, &[7u8; 32]);
        assert_eq!(decode_token(TokenType::NodePrivate, &encoded).unwrap(), vec![7u8; 32]);
        assert_eq!(
            decode_token(TokenType::AccountId, &encoded),
            Err(CryptoError::WrongTokenType(TokenType::NodePrivate as u8))
        );
    }

    #[test]
    fn test_account_tokens_start_with_r() {
        let encoded = encode_token(TokenType::AccountId, &[0u8; 20]);
        assert!(encoded.starts_with('r'));
    }
}
