/// A simple countdown timer driven by an externally-supplied elapsed
/// millisecond tick, mirroring the grant-timeout timers each destination id
/// gets when it's granted a channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct GrantTimer {
    duration_ms: u64,
    elapsed_ms: u64,
    running: bool,
}

impl GrantTimer {
    pub fn new(timeout_secs: u32) -> Self {
        Self {
            duration_ms: u64::from(timeout_secs) * 1000,
            elapsed_ms: 0,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.elapsed_ms = 0;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.elapsed_ms = 0;
    }

    pub fn clock(&mut self, ms: u64) {
        if self.running {
            self.elapsed_ms += ms;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_expired(&self) -> bool {
        self.running && self.elapsed_ms >= self.duration_ms
    }
}
