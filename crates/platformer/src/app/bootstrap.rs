use std::env::{self, VarError};
use std::path::PathBuf;
use std::time::Duration;

use engine::{LoopConfig, DEFAULT_TARGET_FPS};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::SessionConfig;
use super::level::{LevelConfig, LevelError};

const TARGET_FPS_ENV_VAR: &str = "PLATFORMER_TARGET_FPS";
const LEVEL_ENV_VAR: &str = "PLATFORMER_LEVEL";
const RUN_SECONDS_ENV_VAR: &str = "PLATFORMER_RUN_SECONDS";

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error("load level '{}': {source}", .path.display())]
    Level {
        path: PathBuf,
        #[source]
        source: LevelError,
    },
}

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) session_config: SessionConfig,
    pub(crate) level: LevelConfig,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Platformer Startup ===");

    let loop_config = LoopConfig {
        target_fps: resolve_target_fps(env::var(TARGET_FPS_ENV_VAR)),
        ..LoopConfig::default()
    };
    let session_config = SessionConfig {
        run_limit: resolve_run_limit(env::var(RUN_SECONDS_ENV_VAR)),
        ..SessionConfig::default()
    };
    let level = match resolve_level_path(env::var(LEVEL_ENV_VAR)) {
        Some(path) => {
            let level = LevelConfig::load(&path)
                .map_err(|source| BootstrapError::Level { path: path.clone(), source })?;
            info!(
                path = %path.display(),
                surfaces = level.surfaces.len(),
                "level_loaded"
            );
            level
        }
        None => LevelConfig::default(),
    };

    Ok(AppWiring {
        loop_config,
        session_config,
        level,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn resolve_target_fps(value: Result<String, VarError>) -> f64 {
    match value {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(fps) if fps.is_finite() && fps > 0.0 => fps,
            _ => {
                warn!(
                    env_var = TARGET_FPS_ENV_VAR,
                    value = raw.as_str(),
                    "invalid target fps env var value; falling back to default"
                );
                DEFAULT_TARGET_FPS
            }
        },
        Err(VarError::NotPresent) => DEFAULT_TARGET_FPS,
        Err(err) => {
            warn!(
                env_var = TARGET_FPS_ENV_VAR,
                error = %err,
                "unable to read target fps env var; falling back to default"
            );
            DEFAULT_TARGET_FPS
        }
    }
}

/// Zero or an unset variable means no limit.
fn resolve_run_limit(value: Result<String, VarError>) -> Option<Duration> {
    match value {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(0) => None,
            Ok(seconds) => Some(Duration::from_secs(seconds)),
            Err(_) => {
                warn!(
                    env_var = RUN_SECONDS_ENV_VAR,
                    value = raw.as_str(),
                    "invalid run seconds env var value; running until quit"
                );
                None
            }
        },
        Err(VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                env_var = RUN_SECONDS_ENV_VAR,
                error = %err,
                "unable to read run seconds env var; running until quit"
            );
            None
        }
    }
}

fn resolve_level_path(value: Result<String, VarError>) -> Option<PathBuf> {
    match value {
        Ok(raw) if raw.trim().is_empty() => None,
        Ok(raw) => Some(PathBuf::from(raw.trim())),
        Err(VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                env_var = LEVEL_ENV_VAR,
                error = %err,
                "unable to read level env var; using built-in level"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn target_fps_parses_positive_rates() {
        assert_eq!(resolve_target_fps(Ok("30".to_string())), 30.0);
        assert_eq!(resolve_target_fps(Ok(" 144.5 ".to_string())), 144.5);
    }

    #[test]
    fn target_fps_falls_back_on_invalid_values() {
        for raw in ["0", "-5", "fast", "NaN", "inf", ""] {
            assert_eq!(
                resolve_target_fps(Ok(raw.to_string())),
                DEFAULT_TARGET_FPS,
                "value {raw:?}"
            );
        }
        assert_eq!(resolve_target_fps(Err(VarError::NotPresent)), DEFAULT_TARGET_FPS);
        assert_eq!(
            resolve_target_fps(Err(VarError::NotUnicode(OsString::from("x")))),
            DEFAULT_TARGET_FPS
        );
    }

    #[test]
    fn run_limit_zero_or_garbage_means_unbounded() {
        assert_eq!(resolve_run_limit(Ok("0".to_string())), None);
        assert_eq!(resolve_run_limit(Ok("soon".to_string())), None);
        assert_eq!(resolve_run_limit(Err(VarError::NotPresent)), None);
        assert_eq!(
            resolve_run_limit(Ok("15".to_string())),
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn level_path_ignores_blank_values() {
        assert_eq!(resolve_level_path(Ok("   ".to_string())), None);
        assert_eq!(resolve_level_path(Err(VarError::NotPresent)), None);
        assert_eq!(
            resolve_level_path(Ok("levels/tower.json".to_string())),
            Some(PathBuf::from("levels/tower.json"))
        );
    }

    #[test]
    fn level_error_names_the_file() {
        let error = BootstrapError::Level {
            path: PathBuf::from("missing.json"),
            source: LevelError::Invalid {
                path: "board_width".to_string(),
                message: "expected a positive finite width".to_string(),
            },
        };
        assert_eq!(
            error.to_string(),
            "load level 'missing.json': validation failed at board_width: expected a positive \
finite width"
        );
    }
}
