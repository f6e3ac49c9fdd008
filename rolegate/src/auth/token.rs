//! Session token generation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::{Engine as _, engine::general_purpose};
use rand::prelude::RngExt;
use rand::rng;

/// Produces the opaque identifiers handed to clients as session tokens.
pub trait TokenGenerator: Send + Sync + fmt::Debug {
    fn generate(&self) -> String;
}

/// 256 bits from the thread-local CSPRNG, base64url without padding (43 chars).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        let mut token_bytes = [0u8; 32];
        rng().fill(&mut token_bytes);

        general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
    }
}

/// Deterministic `<prefix>-1`, `<prefix>-2`, ... tokens. Only for tests.
#[derive(Debug)]
pub struct SequentialTokenGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialTokenGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl TokenGenerator for SequentialTokenGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}
