use std::fmt::{Debug, Formatter};
use std::time::{Duration, Instant};

// Accumulating stopwatch, used to time pipeline stages
#[derive(Default, Copy, Clone, PartialEq)]
pub struct Stopwatch
{
    started_at: Option<Instant>, // none while stopped
    elapsed: Duration,
}
impl Stopwatch
{
    #[inline] #[must_use]
    pub fn start_new() -> Self
    {
        let mut stopwatch = Self::default();
        stopwatch.start_at(Instant::now());
        stopwatch
    }

    #[inline] #[must_use]
    pub fn is_running(&self) -> bool { self.started_at.is_some() }

    #[inline]
    pub fn start_at(&mut self, now: Instant)
    {
        if self.started_at.is_none()
        {
            self.started_at = Some(now);
        }
    }
    #[inline]
    pub fn stop_at(&mut self, now: Instant)
    {
        if let Some(started_at) = self.started_at.take()
        {
            self.elapsed += now.saturating_duration_since(started_at);
        }
    }
    #[inline]
    pub fn restart_at(&mut self, now: Instant)
    {
        self.elapsed = Duration::ZERO;
        self.started_at = Some(now);
    }

    #[inline] #[must_use]
    pub fn elapsed_at(&self, now: Instant) -> Duration
    {
        match self.started_at
        {
            Some(started_at) => self.elapsed + now.saturating_duration_since(started_at),
            None => self.elapsed,
        }
    }
    #[inline] #[must_use]
    pub fn elapsed(&self) -> Duration { self.elapsed_at(Instant::now()) }

    // Restart the stopwatch, returning the time elapsed before the restart
    #[inline]
    pub fn lap(&mut self) -> Duration
    {
        let now = Instant::now();
        let elapsed = self.elapsed_at(now);
        self.restart_at(now);
        elapsed
    }
}
impl Debug for Stopwatch
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Stopwatch")
            .field("Is running", &self.is_running())
            .field("Elapsed time", &self.elapsed().as_secs_f64())
            .finish()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn initial_state()
    {
        let stopwatch = Stopwatch::default();
        assert!(!stopwatch.is_running());
        assert_eq!(stopwatch.elapsed(), Duration::ZERO);
    }

    #[test]
    fn start_stop_accumulates()
    {
        let t0 = Instant::now();
        let mut stopwatch = Stopwatch::default();
        stopwatch.start_at(t0);
        assert!(stopwatch.is_running());
        assert_eq!(stopwatch.elapsed_at(t0 + Duration::from_secs(2)), Duration::from_secs(2));

        stopwatch.stop_at(t0 + Duration::from_secs(3));
        assert!(!stopwatch.is_running());
        assert_eq!(stopwatch.elapsed_at(t0 + Duration::from_secs(100)), Duration::from_secs(3));

        stopwatch.start_at(t0 + Duration::from_secs(10));
        stopwatch.stop_at(t0 + Duration::from_secs(11));
        assert_eq!(stopwatch.elapsed(), Duration::from_secs(4));
    }

    #[test]
    fn restart_clears()
    {
        let t0 = Instant::now();
        let mut stopwatch = Stopwatch::default();
        stopwatch.start_at(t0);
        stopwatch.stop_at(t0 + Duration::from_secs(5));
        stopwatch.restart_at(t0 + Duration::from_secs(6));
        assert!(stopwatch.is_running());
        assert_eq!(stopwatch.elapsed_at(t0 + Duration::from_secs(7)), Duration::from_secs(1));
    }
}
