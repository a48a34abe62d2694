//! Transaction data and its canonical encoding.
//!
//! The payload is what authorizers and the proposer sign; the envelope (payload
//! plus payload signatures) is what the payer signs. Both messages are
//! prefixed with a fixed 32-byte domain tag.

use rlp::{Rlp, RlpStream};
use sha3::{Digest, Sha3_256};

use crate::address::Address;
use crate::crypto::Signer;
use crate::error::{Error, Result};
use crate::models::Identifier;
use crate::value::Value;

/// Default compute limit for transactions built by the workspace.
pub const DEFAULT_GAS_LIMIT: u64 = 9999;

const TRANSACTION_DOMAIN_TAG: &str = "FLOW-V0.0-transaction";

/// The domain tag right-padded with zeros to 32 bytes.
pub fn transaction_domain_tag() -> [u8; 32] {
    let mut tag = [0u8; 32];
    let bytes = TRANSACTION_DOMAIN_TAG.as_bytes();
    tag[..bytes.len()].copy_from_slice(bytes);
    tag
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProposalKey {
    pub address: Address,
    pub key_index: u32,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSignature {
    pub address: Address,
    pub key_index: u32,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    pub script: Vec<u8>,
    /// JSON-encoded arguments.
    pub arguments: Vec<Vec<u8>>,
    pub reference_block_id: Identifier,
    pub gas_limit: u64,
    pub proposal_key: ProposalKey,
    pub payer: Address,
    pub authorizers: Vec<Address>,
    pub payload_signatures: Vec<TransactionSignature>,
    pub envelope_signatures: Vec<TransactionSignature>,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            ..Default::default()
        }
    }

    pub fn add_argument(&mut self, value: &Value) {
        self.arguments.push(value.encode());
    }

    pub fn decoded_arguments(&self) -> Result<Vec<Value>> {
        self.arguments.iter().map(|a| Value::decode(a)).collect()
    }

    /// Signing accounts in canonical order: proposer, payer, then authorizers,
    /// each listed once.
    pub fn signers(&self) -> Vec<Address> {
        let mut out: Vec<Address> = Vec::new();
        let mut push = |addr: Address| {
            if !out.contains(&addr) {
                out.push(addr);
            }
        };
        push(self.proposal_key.address);
        push(self.payer);
        for a in &self.authorizers {
            push(*a);
        }
        out
    }

    fn signer_index(&self, address: Address) -> Option<usize> {
        self.signers().iter().position(|a| *a == address)
    }

    // ===== Canonical encoding =====

    fn append_payload(&self, stream: &mut RlpStream) {
        stream.begin_list(9);
        stream.append(&self.script);
        stream.begin_list(self.arguments.len());
        for arg in &self.arguments {
            stream.append(arg);
        }
        stream.append(&self.reference_block_id.0.to_vec());
        stream.append(&self.gas_limit);
        stream.append(&self.proposal_key.address.as_bytes().to_vec());
        stream.append(&self.proposal_key.key_index);
        stream.append(&self.proposal_key.sequence_number);
        stream.append(&self.payer.as_bytes().to_vec());
        stream.begin_list(self.authorizers.len());
        for a in &self.authorizers {
            stream.append(&a.as_bytes().to_vec());
        }
    }

    fn append_signatures(&self, stream: &mut RlpStream, signatures: &[TransactionSignature]) {
        let mut indexed: Vec<(usize, &TransactionSignature)> = signatures
            .iter()
            .map(|s| (self.signer_index(s.address).unwrap_or(usize::MAX), s))
            .collect();
        indexed.sort_by_key(|(idx, s)| (*idx, s.key_index));

        stream.begin_list(indexed.len());
        for (idx, sig) in indexed {
            stream.begin_list(3);
            stream.append(&(idx as u64));
            stream.append(&sig.key_index);
            stream.append(&sig.signature);
        }
    }

    pub fn payload_rlp(&self) -> Vec<u8> {
        let mut stream = RlpStream::new();
        self.append_payload(&mut stream);
        stream.out().to_vec()
    }

    pub fn envelope_rlp(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(2);
        self.append_payload(&mut stream);
        self.append_signatures(&mut stream, &self.payload_signatures);
        stream.out().to_vec()
    }

    /// Message signed by authorizers and the proposer.
    pub fn payload_message(&self) -> Vec<u8> {
        let mut msg = transaction_domain_tag().to_vec();
        msg.extend(self.payload_rlp());
        msg
    }

    /// Message signed by the payer.
    pub fn envelope_message(&self) -> Vec<u8> {
        let mut msg = transaction_domain_tag().to_vec();
        msg.extend(self.envelope_rlp());
        msg
    }

    /// Full canonical form, used for offline transfer and the transaction id.
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(3);
        self.append_payload(&mut stream);
        self.append_signatures(&mut stream, &self.payload_signatures);
        self.append_signatures(&mut stream, &self.envelope_signatures);
        stream.out().to_vec()
    }

    pub fn id(&self) -> Identifier {
        Identifier(Sha3_256::digest(self.encode()).into())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let bad = |e: rlp::DecoderError| Error::parse("transaction", e);
        let rlp = Rlp::new(bytes);
        let (payload, payload_sigs, envelope_sigs) = match rlp.item_count().map_err(bad)? {
            3 => (rlp.at(0).map_err(bad)?, Some(rlp.at(1).map_err(bad)?), Some(rlp.at(2).map_err(bad)?)),
            // A bare payload is accepted for unsigned transactions.
            9 => (rlp, None, None),
            n => {
                return Err(Error::parse(
                    "transaction",
                    format!("unexpected list of {} items", n),
                ))
            }
        };

        if payload.item_count().map_err(bad)? != 9 {
            return Err(Error::parse("transaction", "payload must have 9 fields"));
        }
        let address_at = |idx: usize| -> Result<Address> {
            let raw: Vec<u8> = payload.val_at(idx).map_err(bad)?;
            Address::from_bytes(&raw)
        };

        let mut tx = Transaction {
            script: payload.val_at(0).map_err(bad)?,
            arguments: payload.list_at(1).map_err(bad)?,
            reference_block_id: {
                let raw: Vec<u8> = payload.val_at(2).map_err(bad)?;
                Identifier::from_slice(&raw)?
            },
            gas_limit: payload.val_at(3).map_err(bad)?,
            proposal_key: ProposalKey {
                address: address_at(4)?,
                key_index: payload.val_at(5).map_err(bad)?,
                sequence_number: payload.val_at(6).map_err(bad)?,
            },
            payer: address_at(7)?,
            authorizers: {
                let raw: Vec<Vec<u8>> = payload.list_at(8).map_err(bad)?;
                raw.iter()
                    .map(|a| Address::from_bytes(a))
                    .collect::<Result<Vec<_>>>()?
            },
            payload_signatures: Vec::new(),
            envelope_signatures: Vec::new(),
        };

        let signers = tx.signers();
        tx.payload_signatures = decode_signatures(payload_sigs, &signers)?;
        tx.envelope_signatures = decode_signatures(envelope_sigs, &signers)?;
        Ok(tx)
    }

    // ===== Signing =====

    pub fn add_payload_signature(&mut self, address: Address, key_index: u32, signature: Vec<u8>) {
        self.payload_signatures.retain(|s| !(s.address == address && s.key_index == key_index));
        self.payload_signatures.push(TransactionSignature {
            address,
            key_index,
            signature,
        });
    }

    pub fn add_envelope_signature(&mut self, address: Address, key_index: u32, signature: Vec<u8>) {
        self.envelope_signatures.retain(|s| !(s.address == address && s.key_index == key_index));
        self.envelope_signatures.push(TransactionSignature {
            address,
            key_index,
            signature,
        });
    }

    pub fn sign_payload(&mut self, address: Address, key_index: u32, signer: &dyn Signer) -> Result<()> {
        if self.signer_index(address).is_none() {
            return Err(Error::RoleMismatch(format!(
                "{} is not the proposer, payer or an authorizer of the transaction",
                address
            )));
        }
        let signature = signer.sign(&self.payload_message())?;
        self.add_payload_signature(address, key_index, signature);
        Ok(())
    }

    pub fn sign_envelope(&mut self, address: Address, key_index: u32, signer: &dyn Signer) -> Result<()> {
        if address != self.payer {
            return Err(Error::RoleMismatch(format!(
                "envelope must be signed by the payer {}, not {}",
                self.payer, address
            )));
        }
        let signature = signer.sign(&self.envelope_message())?;
        self.add_envelope_signature(address, key_index, signature);
        Ok(())
    }

    pub fn script_str(&self) -> String {
        String::from_utf8_lossy(&self.script).into_owned()
    }
}

fn decode_signatures(list: Option<Rlp<'_>>, signers: &[Address]) -> Result<Vec<TransactionSignature>> {
    let bad = |e: rlp::DecoderError| Error::parse("transaction signature", e);
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    list.iter()
        .map(|item| {
            let idx: u64 = item.val_at(0).map_err(bad)?;
            let address = signers.get(idx as usize).copied().ok_or_else(|| {
                Error::parse("transaction", format!("signer index {} out of range", idx))
            })?;
            Ok(TransactionSignature {
                address,
                key_index: item.val_at(1).map_err(bad)?,
                signature: item.val_at(2).map_err(bad)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{HashAlgorithm, InMemorySigner, PrivateKey, SignatureAlgorithm};

    fn addr(hex: &str) -> Address {
        Address::from_hex(hex).unwrap()
    }

    fn sample() -> Transaction {
        let mut tx = Transaction::new();
        tx.script = b"transaction { execute {} }".to_vec();
        tx.add_argument(&Value::String("hello".into()));
        tx.reference_block_id = Identifier([9u8; 32]);
        tx.proposal_key = ProposalKey {
            address: addr("f8d6e0586b0a20c7"),
            key_index: 0,
            sequence_number: 4,
        };
        tx.payer = addr("ee82856bf20e2aa6");
        tx.authorizers = vec![addr("f8d6e0586b0a20c7"), addr("0ae53cb6e3f42a79")];
        tx
    }

    #[test]
    fn test_domain_tag() {
        let tag = transaction_domain_tag();
        assert!(tag.starts_with(b"FLOW-V0.0-transaction"));
        assert!(tag[21..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_signer_order_is_deduplicated() {
        let tx = sample();
        assert_eq!(
            tx.signers(),
            vec![addr("f8d6e0586b0a20c7"), addr("ee82856bf20e2aa6"), addr("0ae53cb6e3f42a79")]
        );
    }

    #[test]
    fn test_encode_decode_preserves_signatures() {
        let mut tx = sample();
        let signer = InMemorySigner::new(
            PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[1u8; 32]).unwrap(),
            HashAlgorithm::Sha3_256,
        );
        tx.sign_payload(addr("0ae53cb6e3f42a79"), 0, &signer).unwrap();
        tx.sign_payload(addr("f8d6e0586b0a20c7"), 0, &signer).unwrap();
        tx.sign_envelope(addr("ee82856bf20e2aa6"), 0, &signer).unwrap();

        let decoded = Transaction::decode(&tx.encode()).unwrap();
        assert_eq!(decoded.id(), tx.id());
        assert_eq!(decoded.payload_signatures.len(), 2);
        // canonical order puts the proposer first
        assert_eq!(decoded.payload_signatures[0].address, addr("f8d6e0586b0a20c7"));
        assert_eq!(decoded.envelope_signatures[0].address, addr("ee82856bf20e2aa6"));
    }

    #[test]
    fn test_decode_bare_payload() {
        let tx = sample();
        let decoded = Transaction::decode(&tx.payload_rlp()).unwrap();
        assert_eq!(decoded, tx);
        assert!(Transaction::decode(&[0xc0]).is_err());
    }

    #[test]
    fn test_envelope_requires_payer() {
        let mut tx = sample();
        let signer = InMemorySigner::new(
            PrivateKey::generate(SignatureAlgorithm::EcdsaP256).unwrap(),
            HashAlgorithm::Sha3_256,
        );
        let err = tx.sign_envelope(addr("f8d6e0586b0a20c7"), 0, &signer).unwrap_err();
        assert!(matches!(err, Error::RoleMismatch(_)));
        let err = tx.sign_payload(addr("e5a8b7f23e8b548f"), 0, &signer).unwrap_err();
        assert!(matches!(err, Error::RoleMismatch(_)));
    }

    #[test]
    fn test_id_changes_with_payload() {
        let tx = sample();
        let mut other = sample();
        other.gas_limit += 1;
        assert_ne!(tx.id(), other.id());
    }
}
