//! Request admission gates: the sliding-minute rate gate and the durable
//! daily/hourly cost gate.

pub mod cost_gate;
pub mod rate_gate;
