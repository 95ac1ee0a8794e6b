//! On-disk secret file format and atomic persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SecretError;
use crate::crypto::KDF_ALGORITHM;

pub const FORMAT_VERSION: u32 = 1;

/// One encrypted credential as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSecret {
    pub id: Uuid,
    pub name: String,
    pub provider: String,
    pub encrypted_payload: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

/// Listing view of a secret; carries no ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadata {
    pub id: Uuid,
    pub name: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

impl From<&StoredSecret> for SecretMetadata {
    fn from(secret: &StoredSecret) -> Self {
        Self {
            id: secret.id,
            name: secret.name.clone(),
            provider: secret.provider.clone(),
            created_at: secret.created_at,
            last_used: secret.last_used,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub algorithm: String,
    pub iterations: u32,
    pub salt: String,
}

impl KdfParams {
    pub fn pbkdf2(iterations: u32, salt: String) -> Self {
        Self {
            algorithm: KDF_ALGORITHM.to_string(),
            iterations,
            salt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SecretFile {
    pub version: u32,
    pub kdf: KdfParams,
    /// Encrypted marker used to detect a wrong passphrase on open.
    #[serde(default)]
    pub verifier: Option<String>,
    #[serde(default)]
    pub secrets: Vec<StoredSecret>,
}

pub(crate) enum LoadedFile {
    Missing,
    Corrupt(String),
    Parsed(SecretFile),
}

pub(crate) async fn read_file(path: &Path) -> Result<LoadedFile, SecretError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LoadedFile::Missing);
        }
        Err(error) if error.kind() == std::io::ErrorKind::InvalidData => {
            return Ok(LoadedFile::Corrupt(error.to_string()));
        }
        Err(error) => {
            return Err(SecretError::persistence(format!(
                "failed to read secret file '{}': {error}",
                path.display()
            )));
        }
    };

    let file: SecretFile = match serde_json::from_str(&raw) {
        Ok(file) => file,
        Err(error) => return Ok(LoadedFile::Corrupt(error.to_string())),
    };

    if file.version != FORMAT_VERSION {
        return Ok(LoadedFile::Corrupt(format!(
            "unsupported format version {}",
            file.version
        )));
    }
    if file.kdf.algorithm != KDF_ALGORITHM {
        return Ok(LoadedFile::Corrupt(format!(
            "unsupported kdf '{}'",
            file.kdf.algorithm
        )));
    }

    Ok(LoadedFile::Parsed(file))
}

/// Writes the whole file to a sibling temp file, then renames it into place.
pub(crate) async fn write_atomic(path: &Path, file: &SecretFile) -> Result<(), SecretError> {
    let body = serde_json::to_vec_pretty(file)?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|error| {
            SecretError::persistence(format!(
                "failed to create directory '{}': {error}",
                parent.display()
            ))
        })?;
    }

    let temp = temp_path(path);
    tokio::fs::write(&temp, &body).await.map_err(|error| {
        SecretError::persistence(format!(
            "failed to write '{}': {error}",
            temp.display()
        ))
    })?;
    restrict_permissions(&temp).await?;

    if let Err(error) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(SecretError::persistence(format!(
            "failed to replace '{}': {error}",
            path.display()
        )));
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "secrets.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), SecretError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(SecretError::from)
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), SecretError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn sample_file() -> SecretFile {
        SecretFile {
            version: FORMAT_VERSION,
            kdf: KdfParams::pbkdf2(1_000, "00ff".to_string()),
            verifier: None,
            secrets: vec![StoredSecret {
                id: Uuid::new_v4(),
                name: "work".to_string(),
                provider: "openai".to_string(),
                encrypted_payload: "00:11".to_string(),
                created_at: Utc::now(),
                last_used: None,
            }],
        }
    }

    #[tokio::test]
    async fn write_then_read_preserves_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("secrets.json");
        let file = sample_file();

        write_atomic(&path, &file).await.expect("write");
        assert!(!dir.path().join("nested").join("secrets.json.tmp").exists());

        match read_file(&path).await.expect("read") {
            LoadedFile::Parsed(loaded) => assert_eq!(loaded, file),
            _ => panic!("expected a parsed file"),
        }
    }

    #[tokio::test]
    async fn persisted_layout_has_versioned_kdf_section() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secrets.json");
        write_atomic(&path, &sample_file()).await.expect("write");

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read raw")).expect("json");
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["kdf"]["algorithm"], "pbkdf2-hmac-sha256");
        assert_eq!(raw["kdf"]["iterations"], 1_000);
        assert_eq!(raw["secrets"][0]["encryptedPayload"], "00:11");
    }

    #[tokio::test]
    async fn persisted_record_uses_camel_case_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secrets.json");
        write_atomic(&path, &sample_file()).await.expect("write");

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read raw")).expect("json");
        let mut keys = raw["secrets"][0]
            .as_object()
            .expect("record object")
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "createdAt",
                "encryptedPayload",
                "id",
                "lastUsed",
                "name",
                "provider"
            ]
        );
    }

    #[tokio::test]
    async fn missing_and_corrupt_files_are_distinguished() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secrets.json");
        assert!(matches!(
            read_file(&path).await.expect("read"),
            LoadedFile::Missing
        ));

        std::fs::write(&path, "{ not json").expect("write garbage");
        assert!(matches!(
            read_file(&path).await.expect("read"),
            LoadedFile::Corrupt(_)
        ));
    }

    #[test]
    fn metadata_omits_payload() {
        let file = sample_file();
        let metadata = SecretMetadata::from(&file.secrets[0]);
        let rendered = serde_json::to_value(&metadata).expect("serialize");
        assert!(rendered.get("encryptedPayload").is_none());
        assert!(rendered.get("createdAt").is_some());
        assert_eq!(rendered["name"], "work");
    }
}
