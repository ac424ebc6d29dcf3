use super::{WatchError, Watcher};

pub fn create(log_name: &str) -> Result<Box<dyn Watcher>, WatchError> {
    log::debug!("No event log backend for {}, cannot watch '{}'", std::env::consts::OS, log_name);
    Err(WatchError::Unsupported(std::env::consts::OS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_reports_platform() {
        let err = create("Application").err().unwrap();
        assert!(matches!(err, WatchError::Unsupported(_)));
        assert!(err.to_string().starts_with("Couldn't create watcher: "));
        assert!(err.to_string().contains(std::env::consts::OS));
    }
}
