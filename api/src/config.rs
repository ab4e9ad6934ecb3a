use std::net::SocketAddr;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_COMMENT_LENGTH: usize = 5000;
const DEFAULT_COMMENT_FEED_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

impl Env {
    pub fn from_env() -> Self {
        match var("ENVIRONMENT") {
            Ok(Some(env)) => Env::parse(&env),
            _ => Env::Dev,
        }
    }

    fn parse(env: &str) -> Self {
        match env {
            "dev" => Env::Dev,
            "staging" => Env::Staging,
            "production" => Env::Production,
            _ => Env::Dev,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    /// Origin allowed by CORS, e.g. the blog front-end
    pub site_url: Option<String>,
    /// Identities allowed to pin and to delete any comment
    pub admin_identity_ids: Vec<i32>,
    pub max_comment_length: usize,
    pub comment_feed_capacity: usize,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => {
            tracing::warn!("Missing environment variable `{key}`");
            match e {
                std::env::VarError::NotPresent => Ok(None),
                std::env::VarError::NotUnicode(_) => Err(format!(
                    "Could not get the environment variable `{key}` due to unicode error"
                )),
            }
        }
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

/// Parses an optional variable, falling back to `default` if it's absent or malformed
fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Ok(Some(val)) => val.trim().parse().unwrap_or_else(|_| {
            tracing::error!("Environment variable `{key}` has an invalid value `{val}`, using default");
            default
        }),
        _ => default,
    }
}

/// Parses a comma separated list of identity IDs, skipping the invalid ones
fn parse_id_list(raw: &str) -> Vec<i32> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter_map(|id| match id.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!("Ignoring invalid identity ID `{id}`");
                None
            }
        })
        .collect()
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let default_listen_addr = DEFAULT_LISTEN_ADDR
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000)));

        ServerConfig {
            database_url: required_var("DATABASE_URL"),
            listen_addr: parsed_var("LISTEN_ADDR", default_listen_addr),
            site_url: var("SITE_URL").ok().flatten(),
            admin_identity_ids: match var("ADMIN_IDENTITY_IDS") {
                Ok(Some(ids)) => parse_id_list(&ids),
                _ => vec![],
            },
            max_comment_length: parsed_var("MAX_COMMENT_LENGTH", DEFAULT_MAX_COMMENT_LENGTH),
            comment_feed_capacity: parsed_var(
                "COMMENT_FEED_CAPACITY",
                DEFAULT_COMMENT_FEED_CAPACITY,
            )
            .max(1),
        }
    }

    pub fn is_admin(&self, identity_id: i32) -> bool {
        self.admin_identity_ids.contains(&identity_id)
    }
}
