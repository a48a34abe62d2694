//! Keys command - generate and decode keys

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Value as Json};

use flow_types::{PrivateKey, SignatureAlgorithm};
use flowkit::services::Keys;

use super::output::{PublicKeyOutput, Render, Rows};
use super::Context;

#[derive(Parser, Debug)]
pub struct KeysCmd {
    #[command(subcommand)]
    pub command: KeysSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum KeysSubcommand {
    /// Generate a new key pair
    Generate {
        /// Deterministic seed phrase, at least 32 bytes
        #[arg(short, long)]
        seed: Option<String>,

        /// Signature algorithm (ECDSA_P256 or ECDSA_secp256k1)
        #[arg(short = 'a', long, default_value = "ECDSA_P256")]
        sig_algo: SignatureAlgorithm,
    },
    /// Decode an RLP encoded account public key
    Decode {
        /// Hex encoded account key
        encoded: String,
    },
}

impl KeysCmd {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        match &self.command {
            KeysSubcommand::Generate { seed, sig_algo } => {
                let key = Keys.generate(seed.as_deref(), *sig_algo)?;
                ctx.emit(&KeyPairOutput(key))
            }
            KeysSubcommand::Decode { encoded } => {
                let key = Keys.decode(encoded)?;
                ctx.emit(&PublicKeyOutput(key))
            }
        }
    }
}

struct KeyPairOutput(PrivateKey);

impl Render for KeyPairOutput {
    fn text(&self) -> String {
        Rows::new()
            .line("Store private key safely and don't share with anyone!")
            .row("Private Key", self.0.to_hex())
            .row("Public Key", self.0.public_key().to_hex())
            .finish()
    }

    fn inline(&self) -> String {
        format!("{} {}", self.0.to_hex(), self.0.public_key().to_hex())
    }

    fn json(&self) -> Json {
        json!({
            "private": self.0.to_hex(),
            "public": self.0.public_key().to_hex(),
            "sigAlgo": self.0.algorithm().name(),
        })
    }
}
