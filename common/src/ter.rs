//! Transaction engine result codes.
//!
//! Codes are grouped by numeric range:
//! - `tel` (-399..-300): local failures, never forwarded
//! - `tem` (-299..-200): malformed, can never succeed
//! - `tef` (-199..-100): failures against the current ledger
//! - `ter` (-99..-1): retriable
//! - `tes` (0): success
//! - `tec` (100..): failed but the fee was claimed and the sequence consumed

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! result_codes {
    ($($name:ident = $code:literal, $token:literal, $human:literal;)*) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        #[allow(non_camel_case_types)]
        pub enum Ter {
            $($name,)*
        }

        impl Ter {
            pub const ALL: &'static [Ter] = &[$(Ter::$name,)*];

            pub fn code(&self) -> i32 {
                match self {
                    $(Ter::$name => $code,)*
                }
            }

            pub fn token(&self) -> &'static str {
                match self {
                    $(Ter::$name => $token,)*
                }
            }

            pub fn human(&self) -> &'static str {
                match self {
                    $(Ter::$name => $human,)*
                }
            }

            pub fn from_code(code: i32) -> Option<Ter> {
                match code {
                    $($code => Some(Ter::$name),)*
                    _ => None,
                }
            }

            pub fn from_token(token: &str) -> Option<Ter> {
                match token {
                    $($token => Some(Ter::$name),)*
                    _ => None,
                }
            }
        }
    };
}

result_codes! {
    telLOCAL_ERROR = -399, "telLOCAL_ERROR", "Local failure.";
    telBAD_DOMAIN = -398, "telBAD_DOMAIN", "Domain too long.";
    telBAD_PATH_COUNT = -397, "telBAD_PATH_COUNT", "Malformed: Too many paths.";
    telBAD_PUBLIC_KEY = -396, "telBAD_PUBLIC_KEY", "Public key too long.";
    telFAILED_PROCESSING = -395, "telFAILED_PROCESSING", "Failed to correctly process transaction.";
    telINSUF_FEE_P = -394, "telINSUF_FEE_P", "Fee insufficient.";
    telNO_DST_PARTIAL = -393, "telNO_DST_PARTIAL", "Partial payment to create account not allowed.";
    telCAN_NOT_QUEUE = -392, "telCAN_NOT_QUEUE", "Can not queue at this time.";

    temMALFORMED = -299, "temMALFORMED", "Malformed transaction.";
    temBAD_AMOUNT = -298, "temBAD_AMOUNT", "Can only send positive amounts.";
    temBAD_CURRENCY = -297, "temBAD_CURRENCY", "Malformed: Bad currency.";
    temBAD_EXPIRATION = -296, "temBAD_EXPIRATION", "Malformed: Bad expiration.";
    temBAD_FEE = -295, "temBAD_FEE", "Invalid fee, negative or not XRP.";
    temBAD_ISSUER = -294, "temBAD_ISSUER", "Malformed: Bad issuer.";
    temBAD_LIMIT = -293, "temBAD_LIMIT", "Limits must be non-negative.";
    temBAD_OFFER = -292, "temBAD_OFFER", "Malformed: Bad offer.";
    temBAD_PATH = -291, "temBAD_PATH", "Malformed: Bad path.";
    temBAD_PATH_LOOP = -290, "temBAD_PATH_LOOP", "Malformed: Loop in path.";
    temBAD_SEND_XRP_LIMIT = -289, "temBAD_SEND_XRP_LIMIT", "Malformed: Limit quality is not allowed for XRP to XRP.";
    temBAD_SEND_XRP_MAX = -288, "temBAD_SEND_XRP_MAX", "Malformed: Send max is not allowed for XRP to XRP.";
    temBAD_SEND_XRP_NO_DIRECT = -287, "temBAD_SEND_XRP_NO_DIRECT", "Malformed: No Trackable direct is not allowed for XRP to XRP.";
    temBAD_SEND_XRP_PARTIAL = -286, "temBAD_SEND_XRP_PARTIAL", "Malformed: Partial payment is not allowed for XRP to XRP.";
    temBAD_SEND_XRP_PATHS = -285, "temBAD_SEND_XRP_PATHS", "Malformed: Paths are not allowed for XRP to XRP.";
    temBAD_SEQUENCE = -284, "temBAD_SEQUENCE", "Malformed: Sequence is not in the past.";
    temBAD_SIGNATURE = -283, "temBAD_SIGNATURE", "Malformed: Bad signature.";
    temBAD_SRC_ACCOUNT = -282, "temBAD_SRC_ACCOUNT", "Malformed: Bad source account.";
    temBAD_TRANSFER_RATE = -281, "temBAD_TRANSFER_RATE", "Malformed: Transfer rate must be >= 1.0 and <= 2.0";
    temDST_IS_SRC = -280, "temDST_IS_SRC", "Destination may not be source.";
    temDST_NEEDED = -279, "temDST_NEEDED", "Destination not specified.";
    temINVALID = -278, "temINVALID", "The transaction is ill-formed.";
    temINVALID_FLAG = -277, "temINVALID_FLAG", "The transaction has an invalid flag.";
    temREDUNDANT = -276, "temREDUNDANT", "Sends same currency to self.";
    temTRACKABLE_EMPTY = -275, "temTRACKABLE_EMPTY", "PathSet with no paths.";
    temDISABLED = -274, "temDISABLED", "The transaction requires logic that is currently disabled.";
    temBAD_SIGNER = -273, "temBAD_SIGNER", "Malformed: No signer may duplicate account or other signers.";
    temBAD_QUORUM = -272, "temBAD_QUORUM", "Malformed: Quorum is unreachable.";
    temBAD_WEIGHT = -271, "temBAD_WEIGHT", "Malformed: Weight must be a positive value.";
    temUNKNOWN = -264, "temUNKNOWN", "The transaction requires logic that is not implemented yet.";

    tefFAILURE = -199, "tefFAILURE", "Failed to apply.";
    tefALREADY = -198, "tefALREADY", "The exact transaction was already in this ledger.";
    tefBAD_AUTH = -196, "tefBAD_AUTH", "Transaction's public key is not authorized.";
    tefBAD_LEDGER = -195, "tefBAD_LEDGER", "Ledger in unexpected state.";
    tefINTERNAL = -192, "tefINTERNAL", "Internal error.";
    tefPAST_SEQ = -190, "tefPAST_SEQ", "This sequence number has already past.";
    tefMASTER_DISABLED = -188, "tefMASTER_DISABLED", "Master key is disabled.";
    tefMAX_LEDGER = -187, "tefMAX_LEDGER", "Ledger sequence too high.";
    tefBAD_QUORUM = -185, "tefBAD_QUORUM", "Signatures provided do not meet the quorum.";
    tefNOT_MULTI_SIGNING = -184, "tefNOT_MULTI_SIGNING", "Account has no appropriate list of multi-signers.";

    terRETRY = -99, "terRETRY", "Retry transaction.";
    terFUNDS_SPENT = -98, "terFUNDS_SPENT", "Can't set password, password set funds already spent.";
    terINSUF_FEE_B = -97, "terINSUF_FEE_B", "Account balance can't pay fee.";
    terNO_ACCOUNT = -96, "terNO_ACCOUNT", "The source account does not exist.";
    terNO_AUTH = -95, "terNO_AUTH", "Not authorized to hold IOUs.";
    terNO_LINE = -94, "terNO_LINE", "No such line.";
    terOWNERS = -93, "terOWNERS", "Non-zero owner count.";
    terPRE_SEQ = -92, "terPRE_SEQ", "Missing/inapplicable prior transaction.";
    terLAST = -91, "terLAST", "Process last.";
    terNO_TRACKABLE = -90, "terNO_TRACKABLE", "Path does not permit rippling.";
    terQUEUED = -89, "terQUEUED", "Held until escalated fee drops.";

    tesSUCCESS = 0, "tesSUCCESS", "The transaction was applied. Only final in a validated ledger.";

    tecCLAIM = 100, "tecCLAIM", "Fee claimed. Sequence used. No action.";
    tecPATH_PARTIAL = 101, "tecPATH_PARTIAL", "Path could not send full amount.";
    tecUNFUNDED_ADD = 102, "tecUNFUNDED_ADD", "Insufficient XRP balance for WalletAdd.";
    tecUNFUNDED_OFFER = 103, "tecUNFUNDED_OFFER", "Insufficient balance to fund created offer.";
    tecUNFUNDED_PAYMENT = 104, "tecUNFUNDED_PAYMENT", "Insufficient XRP balance to send.";
    tecFAILED_PROCESSING = 105, "tecFAILED_PROCESSING", "Failed to correctly process transaction.";
    tecDIR_FULL = 121, "tecDIR_FULL", "Can not add entry to full directory.";
    tecINSUF_RESERVE_LINE = 122, "tecINSUF_RESERVE_LINE", "Insufficient reserve to add trust line.";
    tecINSUF_RESERVE_OFFER = 123, "tecINSUF_RESERVE_OFFER", "Insufficient reserve to create offer.";
    tecNO_DST = 124, "tecNO_DST", "Destination does not exist. Send XRP to create it.";
    tecNO_DST_INSUF_XRP = 125, "tecNO_DST_INSUF_XRP", "Destination does not exist. Too little XRP sent to create it.";
    tecNO_LINE_INSUF_RESERVE = 126, "tecNO_LINE_INSUF_RESERVE", "No such line. Too little reserve to create it.";
    tecNO_LINE_REDUNDANT = 127, "tecNO_LINE_REDUNDANT", "Can't set non-existent line to default.";
    tecPATH_DRY = 128, "tecPATH_DRY", "Path could not send partial amount.";
    tecUNFUNDED = 129, "tecUNFUNDED", "One of _ADD, _OFFER, or _SEND. Deprecated.";
    tecNO_ALTERNATIVE_KEY = 130, "tecNO_ALTERNATIVE_KEY", "The operation would remove the ability to sign transactions with the account.";
    tecNO_REGULAR_KEY = 131, "tecNO_REGULAR_KEY", "Regular key is not set.";
    tecOWNERS = 132, "tecOWNERS", "Non-zero owner count.";
    tecNO_ISSUER = 133, "tecNO_ISSUER", "Issuer account does not exist.";
    tecNO_AUTH = 134, "tecNO_AUTH", "Not authorized to hold asset.";
    tecNO_LINE = 135, "tecNO_LINE", "No such line.";
    tecINSUFF_FEE = 136, "tecINSUFF_FEE", "Insufficient balance to pay fee.";
    tecFROZEN = 137, "tecFROZEN", "Asset is frozen.";
    tecNO_TARGET = 138, "tecNO_TARGET", "Target account does not exist.";
    tecNO_PERMISSION = 139, "tecNO_PERMISSION", "No permission to perform requested operation.";
    tecNO_ENTRY = 140, "tecNO_ENTRY", "No matching entry found.";
    tecINSUFFICIENT_RESERVE = 141, "tecINSUFFICIENT_RESERVE", "Insufficient reserve to complete requested operation.";
    tecNEED_MASTER_KEY = 142, "tecNEED_MASTER_KEY", "The operation requires the use of the Master Key.";
    tecDST_TAG_NEEDED = 143, "tecDST_TAG_NEEDED", "A destination tag is required.";
    tecINTERNAL = 144, "tecINTERNAL", "An internal error has occurred during processing.";
    tecOVERSIZE = 145, "tecOVERSIZE", "Object exceeded serialization limits.";
    tecEXPIRED = 148, "tecEXPIRED", "Expiration time is passed.";
    tecKILLED = 150, "tecKILLED", "FillOrKill offer killed.";
}

impl Ter {
    pub fn is_tel_local(&self) -> bool {
        (-399..=-300).contains(&self.code())
    }

    pub fn is_tem_malformed(&self) -> bool {
        (-299..=-200).contains(&self.code())
    }

    pub fn is_tef_failure(&self) -> bool {
        (-199..=-100).contains(&self.code())
    }

    pub fn is_ter_retry(&self) -> bool {
        (-99..=-1).contains(&self.code())
    }

    pub fn is_tes_success(&self) -> bool {
        self.code() == 0
    }

    pub fn is_tec_claim(&self) -> bool {
        self.code() >= 100
    }
}

impl fmt::Display for Ter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
