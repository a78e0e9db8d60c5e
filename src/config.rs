use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_header: String,
    pub moderation: ModerationConfig,
}

/// Knobs for the comment moderation pipeline. Passed into the content
/// filter and the visibility projection at construction time so tests can
/// vary them without process-wide state.
#[derive(Clone)]
pub struct ModerationConfig {
    /// Case-insensitive substring matches that reject a submission outright.
    pub banned_terms: Vec<String>,
    /// Hours after which an unreviewed, non-flagged comment becomes visible.
    pub auto_approve_hours: i64,
    /// Most-recent cap on the public comment feed.
    pub public_page_limit: usize,
    /// Remote moderation classifier endpoint. None disables the remote step.
    pub classifier_url: Option<String>,
    pub classifier_api_key: Option<String>,
    pub classifier_timeout_secs: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            banned_terms: Vec::new(),
            auto_approve_hours: 24,
            public_page_limit: 50,
            classifier_url: None,
            classifier_api_key: None,
            classifier_timeout_secs: 5,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(38322);

        let sqlite_path =
            env::var("SQLITE_PATH").unwrap_or_else(|_| "/opt/comments/data.sqlite".to_string());
        let database_url = env::var("DATABASE_URL").ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "dev-only-secret".to_string());
        let token_header = env::var("TOKEN_HEADER").unwrap_or_else(|_| "token".to_string());

        Self {
            server_port,
            sqlite_path,
            database_url,
            jwt_secret,
            token_header,
            moderation: ModerationConfig::from_env(),
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}", path)
    }
}

impl ModerationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let banned_terms = env::var("BANNED_TERMS")
            .map(|v| {
                v.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.banned_terms);

        let auto_approve_hours = env::var("AUTO_APPROVE_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults.auto_approve_hours);

        let public_page_limit = env::var("PUBLIC_PAGE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.public_page_limit);

        let classifier_url = env::var("CLASSIFIER_URL").ok().filter(|v| !v.is_empty());
        let classifier_api_key = env::var("CLASSIFIER_API_KEY").ok().filter(|v| !v.is_empty());
        let classifier_timeout_secs = env::var("CLASSIFIER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.classifier_timeout_secs);

        Self {
            banned_terms,
            auto_approve_hours,
            public_page_limit,
            classifier_url,
            classifier_api_key,
            classifier_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_defaults() {
        let cfg = ModerationConfig::default();
        assert_eq!(cfg.auto_approve_hours, 24);
        assert_eq!(cfg.public_page_limit, 50);
        assert!(cfg.classifier_url.is_none());
    }
}
