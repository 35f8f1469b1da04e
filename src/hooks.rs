use tokio::process::Command;

/// Host power control, invoked once a shutdown is confirmed
pub trait PowerManager {
    fn power_off(&self);
}

/// Runs the configured power-off command, if any.
///
/// Without a command the confirmation is only logged.
pub struct CommandPowerManager {
    command: Option<String>,
}

impl CommandPowerManager {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }
}

impl PowerManager for CommandPowerManager {
    fn power_off(&self) {
        match &self.command {
            Some(command) => run_hook("power-off", command),
            None => tracing::warn!("Shutdown confirmed, but no power_off_command is configured"),
        }
    }
}

pub fn run_hook(label: &str, command: &str) {
    let label = label.to_owned();
    let command = command.to_owned();

    tokio::task::spawn(async move {
        tracing::info!("[{}] Running hook: {}", label, command);

        match Command::new("sh")
            .arg("-c")
            .arg(&command)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
        {
            Ok(child) => match child.wait_with_output().await {
                Ok(output) => {
                    if !output.status.success() {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        tracing::warn!(
                            "[{}] Hook exited with {}: {}",
                            label,
                            output.status,
                            stderr.trim()
                        );
                    }
                }
                Err(e) => tracing::warn!("[{}] Failed to wait on hook: {}", label, e),
            },
            Err(e) => tracing::warn!("[{}] Failed to spawn hook: {}", label, e),
        }
    });
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    pub struct CountingPower {
        pub calls: Arc<AtomicUsize>,
    }

    impl CountingPower {
        pub fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PowerManager for CountingPower {
        fn power_off(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_hook_runs_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("powered-off");
        let power = CommandPowerManager::new(Some(format!("touch {}", marker.display())));

        power.power_off();

        for _ in 0..100 {
            if marker.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_missing_command_is_a_no_op() {
        CommandPowerManager::new(None).power_off();
    }
}
