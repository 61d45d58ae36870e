use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "ACADEMIC";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Base URL of the student portal.
    pub portal_url: String,
    /// `Cookie` header value of a logged-in portal session.
    pub session_cookie: Option<String>,
    /// Directory holding the rendered transcript documents.
    pub transcript_dir: String,
    pub db_path: String,
}

impl Settings {
    /// Defaults, then `academic.toml` if present, then `ACADEMIC_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("portal_url", "https://alumnos.example.edu.ar")?
            .set_default("transcript_dir", "data/transcript")?
            .set_default("db_path", "data/academic.sqlite")?
            .add_source(File::with_name("academic").required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }
}
