use super::Phase;

const PHASES: [Phase; 3] = [Phase::LastKnown, Phase::Common, Phase::Sweep];
const SCALE: u64 = 10_000;

/// Weighted completion across phases.
///
/// Empty phases drop out and the remaining weights are renormalised, so a
/// scan without a stored endpoint still spans 0..=100. Values stay below 100
/// until [`ProgressTracker::finish`].
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    planned: [usize; 3],
    done: [usize; 3],
    reported: u8,
}

impl ProgressTracker {
    pub fn new(planned: [usize; 3]) -> Self {
        Self {
            planned,
            done: [0; 3],
            reported: 0,
        }
    }

    /// Counts one probed address; yields the percentage when it grew.
    pub fn advance(&mut self, phase: Phase) -> Option<u8> {
        let idx = phase.index();
        self.done[idx] = (self.done[idx] + 1).min(self.planned[idx]);

        let percent = self.percent().min(99);
        if percent > self.reported {
            self.reported = percent;
            Some(percent)
        } else {
            None
        }
    }

    pub fn finish(&mut self) -> u8 {
        self.reported = 100;
        100
    }

    fn percent(&self) -> u8 {
        let active = || PHASES.iter().filter(move |phase| self.planned[phase.index()] > 0);

        let total_weight: u64 = active().map(|phase| u64::from(phase.weight())).sum();
        if total_weight == 0 {
            return 0;
        }

        // Fixed point: weight units scaled by SCALE.
        let earned: u64 = active()
            .map(|phase| {
                let idx = phase.index();
                u64::from(phase.weight()) * self.done[idx] as u64 * SCALE / self.planned[idx] as u64
            })
            .sum();

        (earned * 100 / (total_weight * SCALE)).min(100) as u8
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_follow_phase_sizes() {
        let mut progress = ProgressTracker::new([1, 10, 100]);

        // LastKnown carries 5 of 100.
        assert_eq!(progress.advance(Phase::LastKnown), Some(5));
        for _ in 0..10 {
            progress.advance(Phase::Common);
        }
        assert_eq!(progress.reported, 20);
    }

    #[test]
    fn empty_phases_are_renormalised_away() {
        let mut progress = ProgressTracker::new([0, 2, 0]);
        assert_eq!(progress.advance(Phase::Common), Some(50));
        // Capped until the run is finished.
        assert_eq!(progress.advance(Phase::Common), Some(99));
        assert_eq!(progress.finish(), 100);
    }

    #[test]
    fn only_increases_are_reported() {
        let mut progress = ProgressTracker::new([0, 0, 1000]);
        assert_eq!(progress.advance(Phase::Sweep), None);
        assert_eq!(progress.advance(Phase::Sweep), None);
        for _ in 0..8 {
            progress.advance(Phase::Sweep);
        }
        assert_eq!(progress.reported, 1);
    }

    #[test]
    fn overcounting_never_exceeds_plan() {
        let mut progress = ProgressTracker::new([1, 0, 0]);
        progress.advance(Phase::LastKnown);
        assert_eq!(progress.advance(Phase::LastKnown), None);
        assert_eq!(progress.reported, 99);
    }
}
