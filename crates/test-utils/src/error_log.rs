use std::sync::{Arc, Mutex};

use assetpipe::watch::ErrorHook;

/// Records every error a watch session reports.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    messages: Arc<Mutex<Vec<String>>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and keep watching.
    pub fn lenient_hook(&self) -> ErrorHook {
        let messages = Arc::clone(&self.messages);
        ErrorHook::new(move |err| {
            messages.lock().unwrap().push(err.to_string());
            Ok(())
        })
    }

    /// Record and end the session.
    pub fn strict_hook(&self) -> ErrorHook {
        let messages = Arc::clone(&self.messages);
        ErrorHook::new(move |err| {
            messages.lock().unwrap().push(err.to_string());
            Err(err)
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
