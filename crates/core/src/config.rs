use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub server: ServerConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub path: String,
    pub delimiter: String,
}

impl DatasetConfig {
    /// First byte of the configured delimiter, `;` when unset.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.bytes().next().unwrap_or(b';')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default)]
    pub cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub enabled: bool,
    pub poll_interval_secs: u64,
    /// Pause between the two reads of a changed file.
    pub settle_millis: u64,
}

/// Loads settings from an optional TOML file, then `CADOP__*` env vars.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder()
        .set_default("dataset.path", "Relatorio_cadop.csv")?
        .set_default("dataset.delimiter", ";")?
        .set_default("server.bind", "127.0.0.1:5000")?
        .set_default("server.cors", true)?
        .set_default("watch.enabled", false)?
        .set_default("watch.poll_interval_secs", 2_i64)?
        .set_default("watch.settle_millis", 250_i64)?;
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(config::Environment::with_prefix("CADOP").separator("__"));
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
