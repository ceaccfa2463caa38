use std::collections::HashMap;

use thiserror::Error;

pub(crate) const SERVICE_NAME: &str = "vortex-remote";

#[derive(Debug, Error)]
#[error("keyring: {0}")]
pub struct KeyringError(String);

async fn connect() -> Result<oo7::Keyring, KeyringError> {
    oo7::Keyring::new()
        .await
        .map_err(|e| KeyringError(format!("Failed to connect to keyring: {}", e)))
}

fn attributes(server: &str) -> HashMap<&str, &str> {
    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", server);
    attrs
}

/// Store the remote API key for `server` in the system keyring via Secret Service.
pub async fn store_api_key(server: &str, api_key: &str) -> Result<(), KeyringError> {
    let keyring = connect().await?;
    keyring
        .create_item(
            &format!("Vortex remote ({})", server),
            &attributes(server),
            api_key.as_bytes(),
            true, // replace existing
        )
        .await
        .map_err(|e| KeyringError(format!("Failed to store API key: {}", e)))?;
    Ok(())
}

/// Load the remote API key for `server`, if one was stored.
pub async fn load_api_key(server: &str) -> Result<Option<String>, KeyringError> {
    let keyring = connect().await?;
    let items = keyring
        .search_items(&attributes(server))
        .await
        .map_err(|e| KeyringError(format!("Failed to search keyring: {}", e)))?;

    match items.first() {
        Some(item) => {
            let secret = item
                .secret()
                .await
                .map_err(|e| KeyringError(format!("Failed to read secret: {}", e)))?;
            let key = String::from_utf8(secret.to_vec())
                .map_err(|e| KeyringError(format!("Invalid UTF-8 in secret: {}", e)))?;
            Ok(Some(key))
        }
        None => Ok(None),
    }
}

pub async fn delete_api_key(server: &str) -> Result<(), KeyringError> {
    let keyring = connect().await?;
    let items = keyring
        .search_items(&attributes(server))
        .await
        .map_err(|e| KeyringError(format!("Failed to search keyring: {}", e)))?;

    for item in items {
        item.delete()
            .await
            .map_err(|e| KeyringError(format!("Failed to delete API key: {}", e)))?;
    }

    Ok(())
}
