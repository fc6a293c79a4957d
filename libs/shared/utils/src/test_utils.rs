//! Helpers shared by the cells' test suites.

use shared_config::AppConfig;

/// Config pointing at a local (usually wiremock) Supabase stand-in.
pub fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        supabase_url: base_url.to_string(),
        supabase_anon_key: "test-anon-key".to_string(),
        clinic_id: "11111111-1111-1111-1111-111111111111".to_string(),
        poll_interval_seconds: 1,
        storage_timeout_seconds: 2,
    }
}
