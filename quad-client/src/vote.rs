use chrono::Utc;

use crate::{
    api::{self, SubjectId, UserId, Vote, VoteDirection},
    tally, Error,
};

/// Identifies one tap on one subject; later taps get larger ids
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AttemptId(pub u64);

/// What must be sent to the backend after a tap
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoteAttempt {
    pub subject: SubjectId,
    pub user: UserId,
    pub attempt: AttemptId,

    /// None retracts the user's vote
    pub direction: Option<VoteDirection>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoteState {
    Confirmed {
        server: Option<VoteDirection>,
    },
    Pending {
        server: Option<VoteDirection>,
        local: Option<VoteDirection>,
        attempt: AttemptId,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AckOutcome {
    /// The acknowledged tap is now the confirmed state
    Confirmed,

    /// A later tap superseded this one, the response was ignored
    Stale,
}

/// Reconciles one user's unconfirmed vote on one subject with the last
/// server-confirmed votes.
///
/// The displayed tally is always the tally of the server votes, plus the
/// delta of at most one pending tap. A new tap while another is in flight
/// replaces it, and the response to the older one is ignored when it comes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OptimisticVoteController {
    subject: SubjectId,
    user: UserId,
    server_votes: Vec<Vote>,
    state: VoteState,
    last_attempt: u64,
}

impl OptimisticVoteController {
    pub fn new(subject: SubjectId, user: UserId, server_votes: Vec<Vote>) -> Self {
        let server = Vote::direction_of(&server_votes, &user);
        OptimisticVoteController {
            subject,
            user,
            server_votes,
            state: VoteState::Confirmed { server },
            last_attempt: 0,
        }
    }

    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    /// Whether a tap is still waiting for its response
    pub fn is_pending(&self) -> bool {
        matches!(self.state, VoteState::Pending { .. })
    }

    pub fn server_votes(&self) -> &[Vote] {
        &self.server_votes
    }

    pub fn server_direction(&self) -> Option<VoteDirection> {
        match self.state {
            VoteState::Confirmed { server } | VoteState::Pending { server, .. } => server,
        }
    }

    /// The vote the user currently sees as theirs
    pub fn displayed_direction(&self) -> Option<VoteDirection> {
        match self.state {
            VoteState::Confirmed { server } => server,
            VoteState::Pending { local, .. } => local,
        }
    }

    pub fn displayed_tally(&self) -> i64 {
        let delta = match self.state {
            VoteState::Confirmed { .. } => 0,
            VoteState::Pending { server, local, .. } => {
                VoteDirection::value_of(local) - VoteDirection::value_of(server)
            }
        };
        tally(&self.server_votes) + delta
    }

    /// Tapping the currently displayed direction retracts it, tapping the
    /// other one switches to it.
    pub fn tap(&mut self, direction: VoteDirection) -> VoteAttempt {
        let local = match self.displayed_direction() {
            Some(d) if d == direction => None,
            _ => Some(direction),
        };
        self.last_attempt += 1;
        let attempt = AttemptId(self.last_attempt);
        self.state = VoteState::Pending {
            server: self.server_direction(),
            local,
            attempt,
        };
        tracing::debug!(subject = ?self.subject, ?attempt, ?local, "vote pending");
        VoteAttempt {
            subject: self.subject,
            user: self.user,
            attempt,
            direction: local,
        }
    }

    /// Feeds the backend's answer to `attempt` back.
    ///
    /// On failure of the current attempt, the pending delta is dropped and the
    /// error is returned for the caller to notify the user.
    pub fn acknowledge(
        &mut self,
        attempt: AttemptId,
        result: Result<(), api::Error>,
    ) -> Result<AckOutcome, Error> {
        let local = match self.state {
            VoteState::Pending {
                local, attempt: a, ..
            } if a == attempt => local,
            _ => {
                tracing::debug!(subject = ?self.subject, ?attempt, ?result, "ignoring stale vote response");
                return Ok(AckOutcome::Stale);
            }
        };
        match result {
            Ok(()) => {
                self.server_votes.retain(|v| v.user_id != self.user);
                if let Some(direction) = local {
                    self.server_votes.push(Vote {
                        subject: self.subject,
                        user_id: self.user,
                        direction,
                        created_at: Utc::now(),
                    });
                }
                self.state = VoteState::Confirmed { server: local };
                tracing::debug!(subject = ?self.subject, ?attempt, "vote confirmed");
                Ok(AckOutcome::Confirmed)
            }
            Err(source) => {
                tracing::debug!(subject = ?self.subject, ?attempt, %source, "vote failed, reverting");
                self.state = VoteState::Confirmed {
                    server: self.server_direction(),
                };
                Err(Error::VoteReverted {
                    subject: self.subject,
                    source,
                })
            }
        }
    }

    /// Replaces the server baseline with freshly fetched votes, keeping any
    /// pending tap applied on top of it.
    pub fn rebase(&mut self, server_votes: Vec<Vote>) {
        let fresh = Vote::direction_of(&server_votes, &self.user);
        self.state = match self.state {
            VoteState::Confirmed { .. } => VoteState::Confirmed { server: fresh },
            VoteState::Pending { local, attempt, .. } => VoteState::Pending {
                server: fresh,
                local,
                attempt,
            },
        };
        self.server_votes = server_votes;
    }
}
