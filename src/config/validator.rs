//! Configuration validation

use super::{Config, RuntimeConfig, WorkloadConfig};
use crate::Result;

/// Validate complete configuration
///
/// Runs before topology discovery and worker spawn. The pool-geometry
/// precondition (operations per thread >= 1) is not checked here because it
/// depends on the accelerator count; it runs once at pool-sizing time.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_workload(&config.workload)?;
    validate_runtime(&config.runtime)?;
    Ok(())
}

/// Validate workload configuration
pub fn validate_workload(workload: &WorkloadConfig) -> Result<()> {
    if workload.payload_size == 0 {
        anyhow::bail!("payload_size must be greater than 0");
    }

    if workload.queue_depth == 0 || workload.queue_depth > 1024 {
        anyhow::bail!(
            "queue_depth must be between 1 and 1024, got {}",
            workload.queue_depth
        );
    }

    Ok(())
}

/// Validate runtime configuration
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<()> {
    if runtime.threads == 0 {
        anyhow::bail!("thread count must be at least 1");
    }

    if let Some(iterations) = runtime.iterations {
        if iterations == 0 {
            anyhow::bail!("iteration count must be at least 1");
        }
        if runtime.min_time_secs.is_some() {
            anyhow::bail!("--iterations and --min-time are mutually exclusive");
        }
    }

    if let Some(min_time) = runtime.min_time_secs {
        if min_time <= 0.0 {
            anyhow::bail!("min-time must be positive, got {}", min_time);
        }
    }

    if let Some(devices) = runtime.devices {
        if devices == 0 {
            anyhow::bail!("device override must be at least 1 (omit it for CPU-only runs)");
        }
    }

    if runtime.threads > num_cpus::get() {
        eprintln!(
            "Warning: Thread count ({}) exceeds CPU count ({}). \
             This may cause context switching overhead.",
            runtime.threads,
            num_cpus::get()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_payload_rejected() {
        let mut config = Config::default();
        config.workload.payload_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_queue_depth_bounds() {
        let mut config = Config::default();
        config.workload.queue_depth = 0;
        assert!(validate_config(&config).is_err());

        config.workload.queue_depth = 2048;
        assert!(validate_config(&config).is_err());

        config.workload.queue_depth = 1024;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut config = Config::default();
        config.runtime.threads = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut config = Config::default();
        config.runtime.iterations = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_iterations_and_min_time_exclusive() {
        let mut config = Config::default();
        config.runtime.iterations = Some(10);
        config.runtime.min_time_secs = Some(1.0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_negative_min_time_rejected() {
        let mut config = Config::default();
        config.runtime.min_time_secs = Some(-1.0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_device_override_rejected() {
        let mut config = Config::default();
        config.runtime.devices = Some(0);
        assert!(validate_config(&config).is_err());
    }
}
