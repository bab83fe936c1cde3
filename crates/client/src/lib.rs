pub mod clock;
pub mod reception;
pub mod timeline;

pub use clock::{ClockSync, FIXED_SIMULATION_DELAY_SEC};
pub use reception::{parse_control, ClientUnit, ClientWorld};
pub use timeline::{angle_lerp, Interpolation, InterpolatedTimeline, SteppedTimeline};
