use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    pub storage_bucket: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub currency: String,
    pub site_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_anon_key = env::var("SUPABASE_ANON_KEY").unwrap_or_default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "teenop.db".to_string()),
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            // Storage signing needs elevated rights; the anon key works for public buckets
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| supabase_anon_key.clone()),
            supabase_anon_key,
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "service-images".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            site_url: env::var("SITE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }
}
