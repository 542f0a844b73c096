use thiserror::Error;

use crate::{dao::storage::StorageError, dto::ws::RejectReason, rules::PlacementError};

/// Rejections raised while routing a request into a live game session.
///
/// None of these end the session; they are reported to the acting client only.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No game record exists, or the participant is not one of its players.
    #[error("game not found")]
    GameNotFound,
    #[error("it is not this participant's turn")]
    /// The other participant holds the turn.
    NotYourTurn,
    #[error("game already ended")]
    /// The session is terminal.
    GameAlreadyEnded,
    /// The rule engine refused the placement.
    #[error(transparent)]
    Placement(#[from] PlacementError),
    /// A collaborator failed while loading the game.
    #[error("storage unavailable")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        SessionError::Storage(err)
    }
}

impl SessionError {
    /// Reason code reported to the client.
    pub fn reason(&self) -> RejectReason {
        match self {
            SessionError::GameNotFound => RejectReason::GameNotFound,
            SessionError::NotYourTurn => RejectReason::NotYourTurn,
            SessionError::GameAlreadyEnded => RejectReason::GameAlreadyEnded,
            SessionError::Placement(err) => match err {
                PlacementError::OutOfBounds { .. } => RejectReason::OutOfBounds,
                PlacementError::Occupied => RejectReason::Occupied,
                PlacementError::GameOver => RejectReason::GameAlreadyEnded,
                PlacementError::Overline => RejectReason::ForbiddenOverline,
                PlacementError::DoubleThree => RejectReason::Forbidden33,
                PlacementError::DoubleFour => RejectReason::Forbidden44,
            },
            SessionError::Storage(_) => RejectReason::Unavailable,
        }
    }
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl ServiceError {
    /// Code carried by the `OnError` event sent for this failure.
    pub fn code(&self) -> RejectReason {
        match self {
            ServiceError::Unavailable(_) => RejectReason::Unavailable,
            ServiceError::Unauthorized(_) => RejectReason::AuthFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_rejections_map_to_reason_codes() {
        let cases = [
            (
                PlacementError::OutOfBounds { row: 15, col: 0 },
                "out_of_bounds",
            ),
            (PlacementError::Occupied, "occupied"),
            (PlacementError::Overline, "forbidden_overline"),
            (PlacementError::DoubleThree, "forbidden_33"),
            (PlacementError::DoubleFour, "forbidden_44"),
            (PlacementError::GameOver, "game_already_ended"),
        ];
        for (err, code) in cases {
            assert_eq!(SessionError::from(err).reason().as_str(), code);
        }
    }

    #[test]
    fn storage_failures_surface_as_unavailable() {
        let err = SessionError::from(StorageError::missing("game", "g-1"));
        assert_eq!(err.reason(), RejectReason::Unavailable);
        assert_eq!(
            ServiceError::from(StorageError::missing("player", "p")).code(),
            RejectReason::Unavailable
        );
        assert_eq!(
            ServiceError::Unauthorized("unknown player `p`".into()).code(),
            RejectReason::AuthFailed
        );
    }
}
