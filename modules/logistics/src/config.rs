use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusType {
    Nats,
    InMemory,
}

impl BusType {
    fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("inmemory").to_lowercase().as_str() {
            "nats" => BusType::Nats,
            "inmemory" => BusType::InMemory,
            other => {
                tracing::warn!(bus_type = %other, "Unknown BUS_TYPE, defaulting to inmemory");
                BusType::InMemory
            }
        }
    }
}

/// Service configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub app_version: String,
    pub bus_type: BusType,
    pub nats_url: Option<String>,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the config from any variable source
    pub fn from_vars<F>(var: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_version = var("APP_VERSION").unwrap_or_else(|| "1".to_string());
        let bus_type = BusType::parse(var("BUS_TYPE").as_deref());

        let nats_url = match bus_type {
            BusType::Nats => {
                Some(var("NATS_URL").unwrap_or_else(|| "nats://localhost:4222".to_string()))
            }
            BusType::InMemory => None,
        };

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port: u16 = var("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        Ok(Self {
            app_version,
            bus_type,
            nats_url,
            host,
            port,
        })
    }
}
