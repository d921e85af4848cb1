// Single-slot command scheduler
//
// Only one command drives at a time. Scheduling a new command ends the
// current one before anything else happens, so a superseded command never
// gets another tick. When nothing is scheduled the default command (if any)
// takes the slot.

use std::time::Duration;

use tracing::debug;

use super::Command;
use crate::drive::HolonomicDrive;

pub struct CommandScheduler<D: HolonomicDrive> {
    drive: D,
    active: Option<Box<dyn Command<D>>>,
    initialized: bool,
    default_command: Option<Box<dyn Command<D>>>,
    running_default: bool,
}

impl<D: HolonomicDrive> CommandScheduler<D> {
    pub fn new(drive: D) -> Self {
        Self {
            drive,
            active: None,
            initialized: false,
            default_command: None,
            running_default: false,
        }
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn drive_mut(&mut self) -> &mut D {
        &mut self.drive
    }

    /// Command that runs whenever nothing else is scheduled
    pub fn set_default_command(&mut self, command: impl Command<D> + 'static) {
        if self.running_default {
            self.end_active(true);
        }
        self.default_command = Some(Box::new(command));
    }

    /// Binds `command` to the drive, ending whatever was active first.
    /// It initializes on the next `run`.
    pub fn schedule(&mut self, command: impl Command<D> + 'static) {
        self.end_active(true);
        debug!("Scheduled {}", command.name());
        self.active = Some(Box::new(command));
        self.initialized = false;
        self.running_default = false;
    }

    /// Ends the active command as interrupted. A default command comes back
    /// on the next tick.
    pub fn cancel(&mut self) {
        self.end_active(true);
    }

    pub fn active_name(&self) -> Option<&'static str> {
        self.active.as_ref().map(|c| c.name())
    }

    pub fn is_running_default(&self) -> bool {
        self.running_default
    }

    /// True when a command other than the default holds the drive
    pub fn is_busy(&self) -> bool {
        self.active.is_some() && !self.running_default
    }

    /// One control-loop tick. `now` is the time since the loop started.
    pub fn run(&mut self, now: Duration) {
        if self.active.is_none() {
            let Some(default) = self.default_command.take() else {
                return;
            };
            self.active = Some(default);
            self.initialized = false;
            self.running_default = true;
        }

        let Some(command) = self.active.as_mut() else {
            return;
        };

        if !self.initialized {
            debug!("Starting {}", command.name());
            command.initialize(&mut self.drive, now);
            self.initialized = true;
        }

        command.execute(&mut self.drive, now);
        let finished = command.is_finished(&self.drive, now);

        if finished {
            self.end_active(false);
        }
    }

    fn end_active(&mut self, interrupted: bool) {
        let Some(mut command) = self.active.take() else {
            return;
        };

        debug!(
            "Ending {} ({})",
            command.name(),
            if interrupted { "interrupted" } else { "finished" }
        );
        command.end(&mut self.drive, interrupted);
        self.initialized = false;

        if self.running_default {
            self.running_default = false;
            if self.default_command.is_none() {
                self.default_command = Some(command);
            }
        }
    }
}

impl<D: HolonomicDrive> Drop for CommandScheduler<D> {
    // Also runs while unwinding, so a supervised command still stops the drive
    fn drop(&mut self) {
        self.end_active(true);
    }
}
