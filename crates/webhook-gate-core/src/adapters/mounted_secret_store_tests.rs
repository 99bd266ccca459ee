//! Tests for the mounted secret store

use super::*;
use tempfile::TempDir;

/// Write `<root>/<namespace>/<name>/<key>` with `contents`
async fn write_secret(root: &Path, namespace: &str, name: &str, key: &str, contents: &[u8]) {
    let dir = root.join(namespace).join(name);
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join(key), contents).await.unwrap();
}

// ============================================================================
// Lookup Tests
// ============================================================================

#[tokio::test]
async fn test_reads_secret_bytes_exactly() {
    let temp_dir = TempDir::new().unwrap();
    write_secret(temp_dir.path(), "tekton", "pagerduty", "token", b"abc\n").await;
    let store = MountedSecretStore::new(temp_dir.path().to_path_buf());
    let reference = SecretReference::new("pagerduty", "token");

    let value = store.get_secret(&reference, Some("tekton")).await.unwrap();

    assert_eq!(value.expose_bytes(), b"abc\n");
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = MountedSecretStore::new(temp_dir.path().to_path_buf());

    let result = store
        .get_secret(&SecretReference::new("pagerduty", "token"), Some("tekton"))
        .await;

    assert!(matches!(result, Err(SecretError::NotFound { .. })));
}

#[tokio::test]
async fn test_default_namespace_is_used_without_hint() {
    let temp_dir = TempDir::new().unwrap();
    write_secret(temp_dir.path(), "gateway", "github", "secret", b"gh").await;
    let store =
        MountedSecretStore::new(temp_dir.path().to_path_buf()).with_default_namespace("gateway");

    let value = store
        .get_secret(&SecretReference::new("github", "secret"), None)
        .await
        .unwrap();

    assert_eq!(value.expose_bytes(), b"gh");
}

/// A directory where the key file should be is a store failure, not a miss.
#[tokio::test]
async fn test_unreadable_entry_is_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    tokio::fs::create_dir_all(temp_dir.path().join("default/github/secret"))
        .await
        .unwrap();
    let store = MountedSecretStore::new(temp_dir.path().to_path_buf());

    let result = store
        .get_secret(&SecretReference::new("github", "secret"), None)
        .await;

    assert!(matches!(result, Err(SecretError::Unavailable { .. })));
}

// ============================================================================
// Path Tests
// ============================================================================

#[test]
fn test_path_traversal_is_rejected() {
    let store = MountedSecretStore::new(PathBuf::from("/secrets"));

    let parent = store.secret_path(&SecretReference::new("..", "token"), None);
    let nested = store.secret_path(&SecretReference::new("a/b", "token"), None);
    let namespace = store.secret_path(&SecretReference::new("a", "token"), Some("../etc"));

    assert!(matches!(parent, Err(SecretError::InvalidReference { .. })));
    assert!(matches!(nested, Err(SecretError::InvalidReference { .. })));
    assert!(matches!(namespace, Err(SecretError::InvalidReference { .. })));
}

#[test]
fn test_secret_path_layout() {
    let store = MountedSecretStore::new(PathBuf::from("/secrets"));

    let path = store
        .secret_path(&SecretReference::new("pagerduty", "token"), Some("tekton"))
        .unwrap();

    assert_eq!(path, PathBuf::from("/secrets/tekton/pagerduty/token"));
}

// ============================================================================
// Error Message Tests
// ============================================================================

/// Errors name the reference, never the location on disk.
#[tokio::test]
async fn test_errors_do_not_expose_root() {
    let temp_dir = TempDir::new().unwrap();
    tokio::fs::create_dir_all(temp_dir.path().join("ci/github/secret"))
        .await
        .unwrap();
    let store = MountedSecretStore::new(temp_dir.path().to_path_buf());
    let root = temp_dir.path().display().to_string();

    let missing = store
        .get_secret(&SecretReference::new("pagerduty", "token"), Some("ci"))
        .await
        .unwrap_err();
    let unreadable = store
        .get_secret(&SecretReference::new("github", "secret"), Some("ci"))
        .await
        .unwrap_err();

    assert_eq!(
        missing,
        SecretError::NotFound {
            reference: "ci/pagerduty/token".to_string()
        }
    );
    assert_eq!(
        unreadable,
        SecretError::Unavailable {
            reference: "ci/github/secret".to_string()
        }
    );
    assert!(!missing.to_string().contains(&root));
    assert!(!unreadable.to_string().contains(&root));
}
