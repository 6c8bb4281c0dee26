use super::{MachineState, Stopped};

impl MachineState for Stopped {}
