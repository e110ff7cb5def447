//! Configuration module - environment variable parsing

use std::env;
use std::f32::consts::TAU;
use std::net::SocketAddr;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated, `*` for any)
    pub client_origin: String,
    /// Simulation and radar parameters
    pub sim: SimConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // PORT takes precedence, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let sim = SimConfig::from_env()?;
        sim.validate()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            sim,
        })
    }
}

/// Geometry, kinematics and pacing of one defense session.
///
/// Angles are held in radians; the environment supplies them in degrees.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    /// Missile speed (units per second)
    pub missile_speed: f32,
    /// Half side of the launcher square; launchers sit at (±d, ±d)
    pub launch_distance: f32,
    /// Innermost radius; a missile inside it ends the session
    pub dead_zone_radius: f32,
    /// Tracked missiles inside this radius and inside the beam are destroyed
    pub engagement_radius: f32,
    /// Outer bound of detection
    pub radar_range: f32,
    /// Scan angle rate (radians per second)
    pub sweep_speed: f32,
    /// Full angular width of the beam (radians)
    pub beam_width: f32,
    /// Launch budget for the session
    pub max_missiles: u32,
    /// RNG seed for launch scheduling; random when absent
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let launch_distance = 400.0;
        Self {
            missile_speed: 75.0,
            launch_distance,
            dead_zone_radius: 20.0,
            engagement_radius: 150.0,
            radar_range: 350.0,
            sweep_speed: 30.0_f32.to_radians(),
            beam_width: 10.0_f32.to_radians(),
            max_missiles: Self::default_missile_budget(launch_distance),
            seed: None,
        }
    }
}

impl SimConfig {
    /// Read simulation parameters, falling back to defaults for unset keys
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let launch_distance = env_or("LAUNCH_DISTANCE", defaults.launch_distance)?;

        Ok(Self {
            missile_speed: env_or("MISSILE_SPEED", defaults.missile_speed)?,
            launch_distance,
            dead_zone_radius: env_or("DEAD_ZONE_RADIUS", defaults.dead_zone_radius)?,
            engagement_radius: env_or("ENGAGEMENT_RADIUS", defaults.engagement_radius)?,
            radar_range: env_or("RADAR_RANGE", defaults.radar_range)?,
            sweep_speed: env_or("RADAR_SWEEP_SPEED_DEG", 30.0_f32)?.to_radians(),
            beam_width: env_or("RADAR_BEAM_WIDTH_DEG", 10.0_f32)?.to_radians(),
            max_missiles: env_or("MAX_MISSILES", Self::default_missile_budget(launch_distance))?,
            seed: env_opt("SIM_SEED")?,
        })
    }

    /// One missile per ten units of launch distance, kept within 5..=50
    pub fn default_missile_budget(launch_distance: f32) -> u32 {
        ((launch_distance / 10.0) as i64).clamp(5, 50) as u32
    }

    /// Check every parameter rule and report all violations at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut violations = Vec::new();

        if !(self.missile_speed > 0.0) {
            violations.push("missile speed must be > 0");
        }
        if !(self.launch_distance > 0.0) {
            violations.push("launch distance must be > 0");
        }
        if !(self.sweep_speed > 0.0) {
            violations.push("sweep speed must be > 0");
        }
        if !(self.beam_width > 0.0) {
            violations.push("beam width must be > 0");
        }
        if self.beam_width > TAU + 1e-4 {
            violations.push("beam width must not exceed 360 degrees");
        }
        if !(self.dead_zone_radius >= 0.0) {
            violations.push("dead zone radius must not be negative");
        }
        if !(self.engagement_radius > self.dead_zone_radius) {
            violations.push("engagement radius must be greater than dead zone radius");
        }
        if !(self.radar_range > self.engagement_radius) {
            violations.push("radar range must be greater than engagement radius");
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::InvalidSimulation(violations))
        }
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    Ok(env_opt(key)?.unwrap_or(default))
}

fn env_opt<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid simulation parameters: {}", .0.join("; "))]
    InvalidSimulation(Vec<&'static str>),
}
