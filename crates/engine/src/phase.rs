//! Protocol phases.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug)]
pub enum Phase {
    SignUp,
    Voting,
    Processing,
    Tallying,
    Finalized,
}

impl Phase {
    /// The single phase that may follow this one.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::SignUp => Some(Phase::Voting),
            Phase::Voting => Some(Phase::Processing),
            Phase::Processing => Some(Phase::Tallying),
            Phase::Tallying => Some(Phase::Finalized),
            Phase::Finalized => None,
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Phase::SignUp => "sign-up",
            Phase::Voting => "voting",
            Phase::Processing => "processing",
            Phase::Tallying => "tallying",
            Phase::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

/// Deadlines of the two time-gated phases, in caller-defined clock units.
/// Later phases open on data, not time.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct Timeline {
    pub sign_up_deadline: u64,
    pub voting_deadline: u64,
}

impl Timeline {
    /// Phase the clock alone would have reached from `SignUp`.
    pub fn phase_at(&self, now: u64) -> Phase {
        if now < self.sign_up_deadline {
            Phase::SignUp
        } else if now < self.voting_deadline {
            Phase::Voting
        } else {
            Phase::Processing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_strictly_ordered() {
        let mut p = Phase::SignUp;
        let mut seen = vec![p];
        while let Some(n) = p.next() {
            assert!(n > p);
            seen.push(n);
            p = n;
        }
        assert_eq!(seen.len(), 5);
        assert_eq!(p, Phase::Finalized);
    }

    #[test]
    fn timeline_gates() {
        let t = Timeline { sign_up_deadline: 10, voting_deadline: 20 };
        assert_eq!(t.phase_at(0), Phase::SignUp);
        assert_eq!(t.phase_at(10), Phase::Voting);
        assert_eq!(t.phase_at(19), Phase::Voting);
        assert_eq!(t.phase_at(20), Phase::Processing);
    }
}
