//! Alert flags shared by all workers

use std::sync::Mutex;

#[derive(Debug)]
struct Flags {
    reachable: bool,
    out_of_space: bool,
}

/// Throttling state for notifications that would otherwise repeat on every
/// worker and every cycle
#[derive(Debug)]
pub struct Alerts {
    flags: Mutex<Flags>,
}

impl Default for Alerts {
    fn default() -> Self {
        Self {
            flags: Mutex::new(Flags {
                reachable: true,
                out_of_space: false,
            }),
        }
    }
}

impl Alerts {
    /// Records a successful contact with the CI server
    pub fn mark_reachable(&self) {
        self.flags.lock().unwrap().reachable = true;
    }

    /// Records a connectivity failure
    ///
    /// # Returns
    /// `true` only on the transition from reachable to unreachable
    pub fn mark_unreachable(&self) -> bool {
        let mut flags = self.flags.lock().unwrap();
        let was_reachable = flags.reachable;
        flags.reachable = false;
        was_reachable
    }

    /// Raises the sticky out-of-space flag
    ///
    /// The flag is never cleared while the process runs.
    ///
    /// # Returns
    /// `true` the first time only
    pub fn mark_out_of_space(&self) -> bool {
        let mut flags = self.flags.lock().unwrap();
        let first = !flags.out_of_space;
        flags.out_of_space = true;
        first
    }

    #[cfg(test)]
    pub fn is_out_of_space(&self) -> bool {
        self.flags.lock().unwrap().out_of_space
    }
}
