//! Subscribe URL and connection id generation.

use spacewire_core::{config::ConnectionConfig, transport::ConnectRequest};
use spacewire_sats::ConnectionId;

/// Draws a fresh random non-zero connection id.
pub fn generate_connection_id() -> ConnectionId {
    loop {
        let bytes: [u8; 16] = rand::random();
        if let Some(id) = ConnectionId::from_be_bytes(bytes) {
            return id;
        }
    }
}

/// Builds the request handed to the transport:
/// `{host}/v1/database/{module}/subscribe?connection_id={hex}&compression={mode}[&light=true]`
/// plus an `Authorization: Bearer` header when a token is configured.
pub fn connect_request(config: &ConnectionConfig, connection_id: ConnectionId) -> ConnectRequest {
    let mut url = format!(
        "{}/v1/database/{}/subscribe?connection_id={}&compression={}",
        config.host.trim_end_matches('/'),
        config.module_name,
        connection_id.to_hex(),
        config.compression.as_query_value()
    );
    if config.light {
        url.push_str("&light=true");
    }

    let headers = config
        .bearer_token()
        .map(|token| vec![("Authorization".to_string(), format!("Bearer {}", token))])
        .unwrap_or_default();

    ConnectRequest { url, protocol: config.protocol.clone(), headers }
}

#[cfg(test)]
mod tests {
    use spacewire_core::config::Compression;

    use super::*;

    #[test]
    fn test_url_layout() {
        let id = ConnectionId::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        let config = ConnectionConfig::new("ws://localhost:3000/", "blackholio")
            .with_compression(Compression::Gzip)
            .with_light(true);

        let request = connect_request(&config, id);
        assert_eq!(
            request.url,
            "ws://localhost:3000/v1/database/blackholio/subscribe\
             ?connection_id=000102030405060708090a0b0c0d0e0f&compression=Gzip&light=true"
        );
        assert_eq!(request.protocol, "v1.bsatn.spacetimedb");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_bearer_header() {
        let config = ConnectionConfig::new("ws://h", "m").with_token("abc");
        let request = connect_request(&config, generate_connection_id());
        assert_eq!(request.header("Authorization"), Some("Bearer abc"));
        assert!(request.url.ends_with("&compression=None"));
    }

    #[test]
    fn test_generated_ids_are_32_lowercase_hex() {
        let id = generate_connection_id();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert!(!id.is_zero());
        assert_ne!(generate_connection_id(), id);
    }
}
