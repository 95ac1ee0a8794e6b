//! Encrypted credential storage for the parley gateway.
//!
//! Secrets are encrypted with AES-256-GCM under a key derived from a passphrase
//! with PBKDF2-HMAC-SHA256 and a per-store salt. Only ciphertext and metadata
//! reach the disk; [`SecretStore::list`] never exposes either payload.
//!
//! ```rust,no_run
//! use psecrets::SecretStore;
//!
//! # async fn demo() -> Result<(), psecrets::SecretError> {
//! let store = SecretStore::open("secrets.json", "correct horse battery staple").await?;
//! let stored = store.add("work", "openai", "sk-live-123").await?;
//!
//! let key = store.get(stored.id).await?;
//! assert_eq!(key.expose(), "sk-live-123");
//! assert_eq!(store.list().await[0].name, "work");
//! # Ok(())
//! # }
//! ```

mod crypto;
mod error;
mod file;
mod store;

pub use crypto::{DEFAULT_ITERATIONS, KDF_ALGORITHM, SALT_LEN};
pub use error::{SecretError, SecretErrorKind};
pub use file::{FORMAT_VERSION, KdfParams, SecretMetadata, StoredSecret};
pub use store::SecretStore;
