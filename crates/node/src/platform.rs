// Path: crates/node/src/platform.rs
//! Process hardening for production environments.

use aegis_types::error::ConfigError;
use aegis_types::Environment;
use tracing::info;

/// Applies MainNet hardening: refuse to run as root and lock memory so key
/// material never reaches swap. A no-op in dev and testnet environments.
pub fn harden(env: Environment) -> Result<(), ConfigError> {
    if !env.hardened() {
        return Ok(());
    }

    // SAFETY: geteuid has no preconditions.
    if unsafe { libc::geteuid() } == 0 {
        return Err(ConfigError::Environment(
            "refusing to run as root on mainnet".into(),
        ));
    }

    // SAFETY: mlockall only takes flags; failure is reported via errno.
    let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
    if rc != 0 {
        return Err(ConfigError::Environment(format!(
            "mlockall failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    info!(target: "node", "memory locked, root check passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harden_is_noop_outside_mainnet() {
        harden(Environment::UnsafeDevNet).unwrap();
        harden(Environment::TestNet).unwrap();
    }
}
