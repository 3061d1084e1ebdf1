//! Wall-clock timing for benchmark phases

use std::time::{Duration, Instant};

/// Macro for timing code blocks
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profiler = $crate::profiling::ScopeProfiler::new($name);
    };
}

/// Automatic scope profiler, logs its elapsed time on drop
pub struct ScopeProfiler {
    name: &'static str,
    start: Instant,
}

impl ScopeProfiler {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopeProfiler {
    fn drop(&mut self) {
        log::debug!("[profile] {}: {:?}", self.name, self.start.elapsed());
    }
}

/// Ordered per-phase durations of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseTimings {
    phases: Vec<(&'static str, Duration)>,
}

impl PhaseTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, recording its duration under `name`
    pub fn time<R>(&mut self, name: &'static str, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        log::debug!("[profile] {}: {:?}", name, elapsed);
        self.phases.push((name, elapsed));
        result
    }

    pub fn get(&self, name: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|(phase, _)| *phase == name)
            .map(|(_, duration)| *duration)
    }

    pub fn phases(&self) -> &[(&'static str, Duration)] {
        &self.phases
    }

    pub fn total(&self) -> Duration {
        self.phases.iter().map(|(_, duration)| *duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_recorded_in_order() {
        let mut timings = PhaseTimings::new();
        let value = timings.time("allocate", || 3);
        timings.time("kernel", || ());

        assert_eq!(value, 3);
        let names: Vec<_> = timings.phases().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["allocate", "kernel"]);
        assert!(timings.get("populate").is_none());
        assert_eq!(
            timings.total(),
            timings.get("allocate").unwrap() + timings.get("kernel").unwrap()
        );
    }

    #[test]
    fn test_scope_profiler_measures() {
        let profiler = ScopeProfiler::new("sleep");
        std::thread::sleep(Duration::from_millis(2));
        assert!(profiler.elapsed() >= Duration::from_millis(2));
    }
}
