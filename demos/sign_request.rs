//! Sign a request and either print the headers or send it.
//!
//! # Running
//!
//! ```bash
//! # Print a fresh keypair seed and its client id
//! cargo run --example sign_request
//!
//! # Sign and send to a running signed_server
//! export SIGNING_SEED_BASE64="<seed from above>"
//! cargo run --example sign_request -- http://127.0.0.1:8080
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use sealgate::config::DEFAULT_DOMAIN_TAG;
use sealgate::{RequestSigner, SealgateError, SignedClient};
use serde_json::json;

fn main() {
    let seed_b64 = match std::env::var("SIGNING_SEED_BASE64") {
        Ok(seed) => seed,
        Err(_) => {
            let key = SigningKey::generate(&mut OsRng);
            let seed = STANDARD.encode(key.to_bytes());
            println!("SIGNING_SEED_BASE64={}", seed);
            println!("ED25519_PUBKEY_BASE64={}", STANDARD.encode(key.verifying_key().to_bytes()));
            seed
        }
    };

    let signer = match RequestSigner::ed25519_from_seed_b64(&seed_b64, DEFAULT_DOMAIN_TAG) {
        Ok(signer) => signer,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let order = json!({ "side": "buy", "asset": "ETH", "qty": 2 });

    let Some(base_url) = std::env::args().nth(1) else {
        match signer.sign("POST", "/api/orders", Some(&order)) {
            Ok(headers) => {
                for (name, value) in headers.pairs() {
                    println!("{}: {}", name, value);
                }
                println!();
                println!("{}", headers.body);
            }
            Err(e) => eprintln!("Signing failed: {}", e),
        }
        return;
    };

    let client = match SignedClient::new(base_url, signer) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Client error: {}", e);
            std::process::exit(1);
        }
    };

    match client.post("/api/orders", &order) {
        Ok(response) => {
            let body = response.body_str().unwrap_or("<binary>");
            println!("{} {}", response.status, body);
        }
        Err(SealgateError::Rejected { status, message }) => {
            eprintln!("Rejected ({}): {}", status, message);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    }
}
