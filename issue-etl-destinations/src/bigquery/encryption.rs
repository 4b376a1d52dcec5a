use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Installs the aws-lc-rs provider as the process-wide rustls default.
///
/// Must run before the first BigQuery client is built. Later calls do nothing, and a provider
/// installed by someone else is left in place.
pub fn install_crypto_provider_for_bigquery() {
    INIT_CRYPTO.call_once(|| {
        if rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .is_err()
        {
            tracing::debug!("a rustls crypto provider was already installed");
        }
    });
}
