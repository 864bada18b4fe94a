use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    data::{CommandError, Coordinator},
    entity::{Entity, EntityBase},
    hardware::blowcontrol::{
        Direction,
        defs::{MAX_LEVEL, level_name, level_to_percentage, percentage_to_level},
    },
};

/* === Definitions === */

/// The fan itself. State changes are applied locally as soon as a command is
/// issued, whether or not the device accepted it, and are overwritten by the
/// next poll.
#[derive(Debug)]
pub struct Fan {
    base: EntityBase,
    state: Mutex<FanState>,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FanState {
    pub on: bool,
    /// Canonical level, 0–4.
    pub level: u8,
    pub percentage: u8,
    pub oscillating: bool,
    pub direction: Direction,
}

/* === Implementations === */

impl Fan {
    pub fn new(coordinator: Arc<Coordinator>, name: &str, entry_id: &str) -> Self {
        Fan {
            base: EntityBase::new(coordinator, name.to_owned(), entry_id, "fan"),
            state: Mutex::default(),
        }
    }

    pub fn state(&self) -> FanState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_on(&self) -> bool {
        self.state().on
    }

    pub fn percentage(&self) -> u8 {
        self.state().percentage
    }

    pub fn oscillating(&self) -> bool {
        self.state().oscillating
    }

    pub fn direction(&self) -> Direction {
        self.state().direction
    }

    pub fn speed_count(&self) -> u8 {
        MAX_LEVEL
    }

    /// Turns the fan on, at `percentage` if given, otherwise at the last known
    /// level (or the lowest one).
    pub async fn turn_on(&self, percentage: Option<u8>) {
        match percentage {
            Some(0) => return self.turn_off().await,
            Some(percentage) => self.set_percentage(percentage).await,
            None => {
                let level = match self.state().level {
                    0 => 1,
                    level => level,
                };

                self.set_level(level).await;
            }
        }

        self.settle(self.base.coordinator().set_power(true).await);
        self.update(|state| state.on = true);
    }

    pub async fn turn_off(&self) {
        self.settle(self.base.coordinator().set_power(false).await);
        self.set_level(0).await;

        self.update(|state| {
            state.on = false;
            state.percentage = 0;
        });
    }

    /// A percentage of 0 turns the fan off.
    pub async fn set_percentage(&self, percentage: u8) {
        if percentage == 0 {
            return self.turn_off().await;
        }

        let percentage = percentage.min(100);
        self.set_level(percentage_to_level(percentage)).await;

        self.update(|state| {
            state.on = true;
            state.percentage = percentage;
        });
    }

    pub async fn set_oscillating(&self, oscillating: bool) {
        self.settle(self.base.coordinator().set_oscillation(oscillating).await);
        self.update(|state| state.oscillating = oscillating);
    }

    pub async fn set_direction(&self, direction: Direction) {
        self.settle(self.base.coordinator().set_direction(direction).await);
        self.update(|state| state.direction = direction);
    }

    async fn set_level(&self, level: u8) {
        self.settle(self.base.coordinator().set_speed(level).await);

        self.update(|state| {
            state.level = level;
            state.percentage = level_to_percentage(level);
        });

        tracing::info!("Setting fan speed to {level} ({})", level_name(level));
    }

    fn update(&self, f: impl FnOnce(&mut FanState)) {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn settle(&self, result: Result<(), CommandError>) {
        if let Err(err) = result {
            tracing::debug!("{}: ignoring failed command: {err}", self.base.name());
        }
    }
}

impl Entity for Fan {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn handle_update(&self) {
        let Some(snapshot) = self.base.coordinator().data() else {
            return;
        };

        let fan = &snapshot.fan;

        self.update(|state| {
            *state = FanState {
                on: fan.power.is_on(),
                level: fan.speed,
                percentage: level_to_percentage(fan.speed),
                oscillating: fan.oscillating,
                direction: fan.direction,
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::tests::{STATE, coordinator},
        hardware::blowcontrol::{
            Command,
            mock::{MockRunner, Reply},
        },
    };

    fn fan(runner: MockRunner) -> (Fan, Arc<MockRunner>) {
        let (coordinator, runner) = coordinator(runner);
        (Fan::new(coordinator, "Bedroom", "abc123"), runner)
    }

    fn sent(runner: &MockRunner) -> Vec<String> {
        runner.calls().iter().map(Command::to_string).collect()
    }

    #[tokio::test]
    async fn test_identity() {
        let (fan, _) = fan(MockRunner::new());

        assert_eq!(fan.name(), "Bedroom");
        assert_eq!(fan.unique_id(), "abc123_fan");
        assert_eq!(fan.speed_count(), 4);
        assert_eq!(fan.state(), FanState::default());
    }

    #[tokio::test]
    async fn test_turn_on_defaults_to_low() {
        let (fan, runner) = fan(MockRunner::new());

        fan.turn_on(None).await;

        assert_eq!(sent(&runner), ["speed 2", "power on"]);
        assert!(fan.is_on());
        assert_eq!(fan.state().level, 1);
        assert_eq!(fan.percentage(), 25);
    }

    #[tokio::test]
    async fn test_turn_on_restores_last_level() {
        let (fan, runner) = fan(MockRunner::new());

        fan.set_percentage(75).await;
        fan.turn_off().await;
        assert_eq!(fan.state().level, 0);

        fan.update(|state| state.level = 3);
        fan.turn_on(None).await;

        assert_eq!(sent(&runner), ["speed 8", "power off", "speed 0", "speed 8", "power on"]);
        assert_eq!(fan.percentage(), 75);
    }

    #[tokio::test]
    async fn test_turn_on_with_percentage() {
        let (fan, runner) = fan(MockRunner::new());

        fan.turn_on(Some(60)).await;

        assert_eq!(sent(&runner), ["speed 8", "power on"]);
        assert_eq!(fan.state().level, 3);
        assert_eq!(fan.percentage(), 60);
        assert!(fan.is_on());
    }

    #[tokio::test]
    async fn test_zero_percentage_turns_off() {
        let (fan, runner) = fan(MockRunner::new());

        fan.turn_on(Some(100)).await;
        fan.set_percentage(0).await;

        assert_eq!(sent(&runner), ["speed 10", "power on", "power off", "speed 0"]);
        assert!(!fan.is_on());
        assert_eq!(fan.percentage(), 0);
    }

    #[tokio::test]
    async fn test_percentage_rounds_up() {
        let (fan, runner) = fan(MockRunner::new());

        fan.set_percentage(1).await;
        fan.set_percentage(26).await;

        assert_eq!(sent(&runner), ["speed 2", "speed 5"]);
        assert_eq!(fan.percentage(), 26);
        assert_eq!(fan.state().level, 2);
    }

    #[tokio::test]
    async fn test_failed_command_keeps_optimistic_state() {
        let runner = MockRunner::new().with_fallback(Reply::exit(1, "device offline"));
        let (fan, _) = fan(runner);

        fan.turn_on(Some(50)).await;
        fan.set_oscillating(true).await;
        fan.set_direction(Direction::Reverse).await;

        let state = fan.state();
        assert!(state.on);
        assert_eq!(state.level, 2);
        assert!(state.oscillating);
        assert_eq!(state.direction, Direction::Reverse);
    }

    #[tokio::test]
    async fn test_unavailable_bridge_still_updates_state() {
        let (fan, runner) = fan(MockRunner::unavailable());

        fan.turn_on(None).await;

        assert!(runner.calls().is_empty());
        assert!(fan.is_on());
    }

    #[tokio::test]
    async fn test_poll_overwrites_local_state() {
        let (fan, runner) = fan(MockRunner::new().with_fallback(Reply::ok(STATE)));

        fan.set_direction(Direction::Reverse).await;
        fan.handle_update();
        assert_eq!(fan.direction(), Direction::Reverse);

        fan.base.coordinator().refresh().await.unwrap();
        fan.handle_update();

        let state = fan.state();
        assert!(state.on);
        assert_eq!(state.level, 4);
        assert_eq!(state.percentage, 100);
        assert!(state.oscillating);
        assert_eq!(state.direction, Direction::Forward);
        assert_eq!(sent(&runner), ["direction 0", "state --json"]);
    }
}
