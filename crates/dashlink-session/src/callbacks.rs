//! Consumer callbacks fired from the receiver task.
//!
//! Callbacks run directly on the background receiver, not on the
//! consumer's thread. Anything that touches engine state must be posted
//! back to the consumer's own loop first.

use std::sync::{Arc, PoisonError, RwLock};

use dashlink_protocol::ObstacleState;

use crate::Applied;

type ObstacleCallback = Arc<dyn Fn(ObstacleState) + Send + Sync>;
type StartCallback = Arc<dyn Fn() + Send + Sync>;

/// The obstacle and game-start callbacks. Either may be set, replaced, or
/// cleared at any time, including while the receiver is running.
#[derive(Default)]
pub struct Callbacks {
    obstacle: RwLock<Option<ObstacleCallback>>,
    game_start: RwLock<Option<StartCallback>>,
}

impl Callbacks {
    pub fn set_obstacle(&self, callback: impl Fn(ObstacleState) + Send + Sync + 'static) {
        *self.obstacle.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn set_game_start(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.game_start.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::new(callback));
    }

    pub fn clear(&self) {
        *self.obstacle.write().unwrap_or_else(PoisonError::into_inner) = None;
        *self.game_start.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Fires the callback matching what a message changed, if any.
    ///
    /// The callback is cloned out of the lock before it runs, so a
    /// callback may itself register a new one.
    pub fn dispatch(&self, applied: &Applied) {
        match applied {
            Applied::Obstacle(obstacle) => {
                let callback = self
                    .obstacle
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                if let Some(callback) = callback {
                    callback(*obstacle);
                }
            }
            Applied::GameStarted => {
                let callback = self
                    .game_start
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                if let Some(callback) = callback {
                    callback();
                }
            }
            _ => {}
        }
    }
}
