use std::time::{Duration, Instant};

/// Garde de cadence « conservatrice » pour les passes d'analyse.
///
/// Une passe n'est admise que si plus d'un intervalle s'est écoulé depuis la
/// précédente ; sinon l'appelant relit les dernières valeurs calculées. Deux
/// lectures dans le même intervalle sont donc identiques.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ss_core::clock::TickGate;
///
/// let tick = Duration::from_millis(33);
/// let mut gate = TickGate::new();
/// assert!(gate.admit(Duration::from_millis(0), tick));
/// assert!(!gate.admit(Duration::from_millis(20), tick));
/// assert!(gate.admit(Duration::from_millis(40), tick));
/// ```
#[derive(Clone, Debug, Default)]
pub struct TickGate {
    /// Horodatage de la dernière passe admise.
    last_pass: Option<Duration>,
    /// Nombre de passes admises.
    passes: u64,
}

impl TickGate {
    /// Gate with no pass yet: the first call to [`admit`](Self::admit) succeeds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_pass: None,
            passes: 0,
        }
    }

    /// `true` si une nouvelle passe doit être lancée à `now`.
    ///
    /// Strictement plus d'un `interval` doit séparer deux passes.
    pub fn admit(&mut self, now: Duration, interval: Duration) -> bool {
        if let Some(last) = self.last_pass {
            if now.saturating_sub(last) <= interval {
                return false;
            }
        }
        self.last_pass = Some(now);
        self.passes += 1;
        true
    }

    /// Nombre de passes admises depuis la création.
    #[inline]
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Horodatage de la dernière passe admise.
    #[inline]
    #[must_use]
    pub fn last_pass(&self) -> Option<Duration> {
        self.last_pass
    }
}

/// Horloge monotone pour les hôtes temps réel.
///
/// # Example
/// ```
/// use ss_core::clock::MonotonicClock;
/// let clock = MonotonicClock::start();
/// assert!(clock.elapsed() < std::time::Duration::from_secs(5));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Démarre l'horloge maintenant.
    #[must_use]
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Temps écoulé depuis [`start`](Self::start).
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_counts_admitted_passes() {
        let tick = Duration::from_millis(33);
        let mut gate = TickGate::new();
        assert_eq!(gate.passes(), 0);
        assert!(gate.last_pass().is_none());

        assert!(gate.admit(Duration::from_millis(100), tick));
        assert!(!gate.admit(Duration::from_millis(133), tick), "exactly one interval is not enough");
        assert!(gate.admit(Duration::from_millis(134), tick));
        assert_eq!(gate.passes(), 2);
        assert_eq!(gate.last_pass(), Some(Duration::from_millis(134)));
    }

    #[test]
    fn gate_tolerates_clock_going_backwards() {
        let tick = Duration::from_millis(10);
        let mut gate = TickGate::new();
        assert!(gate.admit(Duration::from_millis(50), tick));
        assert!(!gate.admit(Duration::from_millis(5), tick));
    }
}
