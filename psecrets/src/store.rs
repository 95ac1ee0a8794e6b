//! Encrypted secret store backed by a single JSON file.
//!
//! Every mutation builds the next index, writes it atomically and only then
//! swaps it in, so a failed write leaves the store as it was.

use std::path::{Path, PathBuf};

use chrono::Utc;
use pprovider::SecretString;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::crypto::{DEFAULT_ITERATIONS, SecretCipher, decode_hex, encode_hex, random_salt};
use crate::file::{
    FORMAT_VERSION, KdfParams, LoadedFile, SecretFile, SecretMetadata, StoredSecret, read_file,
    write_atomic,
};
use crate::SecretError;

const VERIFIER_PLAINTEXT: &str = "parley-secret-store";

pub struct SecretStore {
    path: PathBuf,
    cipher: SecretCipher,
    kdf: KdfParams,
    verifier: String,
    secrets: Mutex<Vec<StoredSecret>>,
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("path", &self.path)
            .field("kdf", &self.kdf)
            .finish_non_exhaustive()
    }
}

impl SecretStore {
    /// Opens the store at `path`, deriving the key from `passphrase`.
    ///
    /// A missing or unreadable-as-JSON file yields an empty store with a fresh salt.
    pub async fn open(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, SecretError> {
        Self::open_with_iterations(path, passphrase, DEFAULT_ITERATIONS).await
    }

    /// Like [`SecretStore::open`]; `iterations` applies only when a new store is created.
    pub async fn open_with_iterations(
        path: impl Into<PathBuf>,
        passphrase: &str,
        iterations: u32,
    ) -> Result<Self, SecretError> {
        let path = path.into();
        if passphrase.is_empty() {
            return Err(SecretError::invalid_request("passphrase must not be empty"));
        }

        match read_file(&path).await? {
            LoadedFile::Parsed(file) => Self::unlock(path, passphrase, file),
            LoadedFile::Missing => {
                tracing::debug!(path = %path.display(), "secret file not found; starting empty");
                Self::fresh(path, passphrase, iterations)
            }
            LoadedFile::Corrupt(reason) => {
                tracing::warn!(path = %path.display(), reason = %reason, "secret file is corrupt; starting empty");
                Self::fresh(path, passphrase, iterations)
            }
        }
    }

    fn fresh(path: PathBuf, passphrase: &str, iterations: u32) -> Result<Self, SecretError> {
        let salt = random_salt()?;
        let cipher = SecretCipher::derive(passphrase, &salt, iterations)?;
        let verifier = cipher.encrypt(VERIFIER_PLAINTEXT)?;

        Ok(Self {
            path,
            cipher,
            kdf: KdfParams::pbkdf2(iterations, encode_hex(&salt)),
            verifier,
            secrets: Mutex::new(Vec::new()),
        })
    }

    fn unlock(path: PathBuf, passphrase: &str, file: SecretFile) -> Result<Self, SecretError> {
        let salt = decode_hex(&file.kdf.salt)?;
        let cipher = SecretCipher::derive(passphrase, &salt, file.kdf.iterations)?;

        let verifier = match file.verifier {
            Some(verifier) => {
                let marker = cipher
                    .decrypt(&verifier)
                    .map_err(|_| SecretError::crypto("passphrase does not unlock this store"))?;
                if marker.expose() != VERIFIER_PLAINTEXT {
                    return Err(SecretError::crypto("passphrase does not unlock this store"));
                }
                verifier
            }
            None => {
                if let Some(first) = file.secrets.first() {
                    cipher
                        .decrypt(&first.encrypted_payload)
                        .map_err(|_| SecretError::crypto("passphrase does not unlock this store"))?;
                }
                cipher.encrypt(VERIFIER_PLAINTEXT)?
            }
        };

        tracing::debug!(path = %path.display(), secrets = file.secrets.len(), "secret store opened");
        Ok(Self {
            path,
            cipher,
            kdf: file.kdf,
            verifier,
            secrets: Mutex::new(file.secrets),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub async fn add(
        &self,
        name: &str,
        provider: &str,
        plaintext: &str,
    ) -> Result<StoredSecret, SecretError> {
        if name.trim().is_empty() {
            return Err(SecretError::invalid_request("secret name must not be empty"));
        }
        if provider.trim().is_empty() {
            return Err(SecretError::invalid_request("provider must not be empty"));
        }
        if plaintext.is_empty() {
            return Err(SecretError::invalid_request("secret value must not be empty"));
        }

        let secret = StoredSecret {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            provider: provider.trim().to_string(),
            encrypted_payload: self.cipher.encrypt(plaintext)?,
            created_at: Utc::now(),
            last_used: None,
        };

        let mut secrets = self.secrets.lock().await;
        let mut next = secrets.clone();
        next.push(secret.clone());
        self.persist(&next).await?;
        *secrets = next;

        tracing::debug!(id = %secret.id, provider = %secret.provider, "secret added");
        Ok(secret)
    }

    /// Decrypts a secret and records the access time.
    ///
    /// Failing to persist `last_used` is logged; the secret is still returned.
    pub async fn get(&self, id: Uuid) -> Result<SecretString, SecretError> {
        let mut secrets = self.secrets.lock().await;
        let index = position(&secrets, id)?;
        let plaintext = self.cipher.decrypt(&secrets[index].encrypted_payload)?;

        let mut next = secrets.clone();
        next[index].last_used = Some(Utc::now());
        match self.persist(&next).await {
            Ok(()) => *secrets = next,
            Err(error) => {
                tracing::warn!(id = %id, error = %error, "failed to record secret access time");
            }
        }

        Ok(plaintext)
    }

    pub async fn update(&self, id: Uuid, plaintext: &str) -> Result<(), SecretError> {
        if plaintext.is_empty() {
            return Err(SecretError::invalid_request("secret value must not be empty"));
        }

        let mut secrets = self.secrets.lock().await;
        let index = position(&secrets, id)?;

        let mut next = secrets.clone();
        next[index].encrypted_payload = self.cipher.encrypt(plaintext)?;
        self.persist(&next).await?;
        *secrets = next;

        tracing::debug!(id = %id, "secret updated");
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), SecretError> {
        let mut secrets = self.secrets.lock().await;
        let index = position(&secrets, id)?;

        let mut next = secrets.clone();
        next.remove(index);
        self.persist(&next).await?;
        *secrets = next;

        tracing::debug!(id = %id, "secret deleted");
        Ok(())
    }

    pub async fn list(&self) -> Vec<SecretMetadata> {
        self.secrets
            .lock()
            .await
            .iter()
            .map(SecretMetadata::from)
            .collect()
    }

    /// Most recently used (or, if never used, most recently created) secret for `provider`.
    /// Most recently used secret for a provider tag. Tags match case-insensitively.
    pub async fn find_by_provider(&self, provider: &str) -> Option<SecretMetadata> {
        let provider = provider.trim();
        self.secrets
            .lock()
            .await
            .iter()
            .filter(|secret| secret.provider.eq_ignore_ascii_case(provider))
            .max_by_key(|secret| secret.last_used.unwrap_or(secret.created_at))
            .map(SecretMetadata::from)
    }

    pub async fn len(&self) -> usize {
        self.secrets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.secrets.lock().await.is_empty()
    }

    async fn persist(&self, secrets: &[StoredSecret]) -> Result<(), SecretError> {
        let file = SecretFile {
            version: FORMAT_VERSION,
            kdf: self.kdf.clone(),
            verifier: Some(self.verifier.clone()),
            secrets: secrets.to_vec(),
        };

        write_atomic(&self.path, &file).await.inspect_err(|error| {
            tracing::error!(path = %self.path.display(), error = %error, "failed to persist secret store");
        })
    }
}

fn position(secrets: &[StoredSecret], id: Uuid) -> Result<usize, SecretError> {
    secrets
        .iter()
        .position(|secret| secret.id == id)
        .ok_or_else(|| SecretError::not_found(format!("secret '{id}' does not exist")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecretErrorKind;

    const TEST_ITERATIONS: u32 = 1_000;

    async fn open_temp(dir: &tempfile::TempDir) -> SecretStore {
        SecretStore::open_with_iterations(dir.path().join("secrets.json"), "passphrase", TEST_ITERATIONS)
            .await
            .expect("store should open")
    }

    #[tokio::test]
    async fn add_then_get_round_trips_plaintext() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_temp(&dir).await;

        let stored = store.add("work", "openai", "sk-123").await.expect("add");
        let secret = store.get(stored.id).await.expect("get");
        assert_eq!(secret.expose(), "sk-123");

        let listed = store.list().await;
        assert_eq!(listed.len(), 1);
        assert!(listed[0].last_used.is_some());
    }

    #[tokio::test]
    async fn add_validates_inputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_temp(&dir).await;

        for (name, provider, value) in [("", "openai", "k"), ("n", " ", "k"), ("n", "openai", "")] {
            let error = store
                .add(name, provider, value)
                .await
                .expect_err("invalid input must fail");
            assert_eq!(error.kind, SecretErrorKind::InvalidRequest);
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_temp(&dir).await;
        let id = Uuid::new_v4();

        assert_eq!(
            store.get(id).await.expect_err("missing").kind,
            SecretErrorKind::NotFound
        );
        assert_eq!(
            store.update(id, "x").await.expect_err("missing").kind,
            SecretErrorKind::NotFound
        );
        assert_eq!(
            store.delete(id).await.expect_err("missing").kind,
            SecretErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn update_and_delete_mutate_the_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_temp(&dir).await;
        let stored = store.add("work", "openai", "old").await.expect("add");

        store.update(stored.id, "new").await.expect("update");
        assert_eq!(store.get(stored.id).await.expect("get").expose(), "new");

        store.delete(stored.id).await.expect("delete");
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn find_by_provider_prefers_most_recent_use() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_temp(&dir).await;
        let older = store.add("old", "anthropic", "a1").await.expect("add");
        let _newer = store.add("new", "anthropic", "a2").await.expect("add");
        store.add("other", "openai", "o1").await.expect("add");

        store.get(older.id).await.expect("touch older");
        let found = store
            .find_by_provider("anthropic")
            .await
            .expect("a secret exists");
        assert_eq!(found.id, older.id);
        assert!(store.find_by_provider("ollama").await.is_none());
    }

    #[tokio::test]
    async fn find_by_provider_ignores_tag_case() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_temp(&dir).await;
        let stored = store.add("work", "OpenAI", "sk-1").await.expect("add");

        let found = store
            .find_by_provider("openai")
            .await
            .expect("tag should match regardless of case");
        assert_eq!(found.id, stored.id);
        assert_eq!(found.provider, "OpenAI");
    }

    #[tokio::test]
    async fn empty_passphrase_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = SecretStore::open(dir.path().join("secrets.json"), "")
            .await
            .expect_err("empty passphrase");
        assert_eq!(error.kind, SecretErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn failed_write_leaves_index_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_temp(&dir).await;
        std::fs::create_dir(dir.path().join("secrets.json.tmp")).expect("block temp path");

        let error = store
            .add("work", "openai", "sk")
            .await
            .expect_err("write must fail");
        assert_eq!(error.kind, SecretErrorKind::Persistence);
        assert!(store.is_empty().await);
    }
}
