use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2 work factor.
#[derive(Debug, Clone, Deserialize)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub hashing: HashingConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => database_url_from_parts(
                &env_or("DB_USER", "postgres"),
                &env_or("DB_PASSWORD", ""),
                &env_or("DB_HOST", "localhost"),
                &env_or("DB_PORT", "5432"),
                &env_or("DB_NAME", "user_service"),
            ),
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "user-service"),
            audience: env_or("JWT_AUDIENCE", "user-service-clients"),
            ttl_minutes: env_parsed("JWT_TTL_MINUTES", 60),
        };
        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: env_parsed("PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib),
            iterations: env_parsed("PASSWORD_HASH_ITERATIONS", defaults.iterations),
            parallelism: env_parsed("PASSWORD_HASH_PARALLELISM", defaults.parallelism),
        };
        Ok(Self {
            app_name: env_or("APP_NAME", "user-service"),
            app_env: env_or("APP_ENV", "development"),
            host: env_or("APP_HOST", "0.0.0.0"),
            port: env_parsed("APP_PORT", 8080),
            database_url,
            db_max_connections: env_parsed("DB_MAX_CONNECTIONS", 10),
            jwt,
            hashing,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn database_url_from_parts(user: &str, password: &str, host: &str, port: &str, name: &str) -> String {
    if password.is_empty() {
        format!("postgres://{}@{}:{}/{}", user, host, port, name)
    } else {
        format!("postgres://{}:{}@{}:{}/{}", user, password, host, port, name)
    }
}
