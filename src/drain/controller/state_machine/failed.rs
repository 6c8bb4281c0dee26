use super::{Failed, MachineState};

impl MachineState for Failed {}
