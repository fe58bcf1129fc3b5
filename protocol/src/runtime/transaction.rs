//! Transaction envelope: instructions, the message that gets signed, and
//! the record kept once a transaction has been applied.
//!
//! ## Signing
//!
//! Every key in [`Message::signers`] signs the bincode encoding of the
//! whole [`Message`]. Signatures travel next to the message in the same
//! order as `signers`. The transaction id is a domain-separated BLAKE3 of
//! the same bytes, so it is fixed before anyone signs and identical for
//! every signer.

use serde::{Deserialize, Serialize};

use crate::config::{LOCKUP_PROGRAM_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::crypto::hash::domain_separated_hash;
use crate::crypto::keys::{Keypair, Pubkey, Signature};
use crate::system::SystemInstruction;
use crate::token::TokenInstruction;
use crate::vault::LockupInstruction;

const TRANSACTION_ID_CONTEXT: &str = "lockup 2026 transaction id v1";

/// One call into one program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    System(SystemInstruction),
    Token(TokenInstruction),
    Lockup(LockupInstruction),
}

impl Instruction {
    /// The program that executes this instruction.
    pub fn program_id(&self) -> Pubkey {
        match self {
            Instruction::System(_) => SYSTEM_PROGRAM_ID,
            Instruction::Token(_) => TOKEN_PROGRAM_ID,
            Instruction::Lockup(_) => LOCKUP_PROGRAM_ID,
        }
    }
}

impl From<SystemInstruction> for Instruction {
    fn from(ix: SystemInstruction) -> Self {
        Instruction::System(ix)
    }
}

impl From<TokenInstruction> for Instruction {
    fn from(ix: TokenInstruction) -> Self {
        Instruction::Token(ix)
    }
}

impl From<LockupInstruction> for Instruction {
    fn from(ix: LockupInstruction) -> Self {
        Instruction::Lockup(ix)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// The signed part of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Keys whose signatures the transaction carries, in signature order.
    pub signers: Vec<Pubkey>,
    /// Executed in order against a single working set.
    pub instructions: Vec<Instruction>,
    /// Makes otherwise identical messages distinct. Two transactions with
    /// the same message have the same id, and only the first one runs.
    pub nonce: u64,
}

impl Message {
    /// A message with a random nonce.
    pub fn new(signers: Vec<Pubkey>, instructions: Vec<Instruction>) -> Self {
        Self {
            signers,
            instructions,
            nonce: rand::random(),
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// The bytes every signer signs.
    ///
    /// Encoding a message only fails for types serde cannot represent,
    /// which a `Message` never contains; an empty buffer would fail every
    /// signature check anyway.
    pub fn signable_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    /// `hex(blake3_derive_key(context, signable_bytes))`.
    pub fn id(&self) -> String {
        hex::encode(domain_separated_hash(
            TRANSACTION_ID_CONTEXT,
            &self.signable_bytes(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A message plus one signature per signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub message: Message,
    pub signatures: Vec<Signature>,
}

impl Transaction {
    /// Sign `message` with whichever of `keypairs` it lists as signers.
    ///
    /// Keypairs not named in the message are ignored. A signer with no
    /// matching keypair simply gets no signature, and the runtime rejects
    /// the transaction.
    pub fn new(message: Message, keypairs: &[&Keypair]) -> Self {
        let bytes = message.signable_bytes();
        let signatures = message
            .signers
            .iter()
            .filter_map(|signer| {
                keypairs
                    .iter()
                    .find(|kp| kp.pubkey() == *signer)
                    .map(|kp| kp.sign(&bytes))
            })
            .collect();
        Self {
            message,
            signatures,
        }
    }

    pub fn id(&self) -> String {
        self.message.id()
    }
}

/// What the ledger remembers about an applied transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub signers: Vec<Pubkey>,
    pub instruction_count: usize,
    /// Unix seconds, from the runtime's clock.
    pub processed_at: u64,
    pub logs: Vec<String>,
}
