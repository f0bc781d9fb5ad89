//! D8 routing used to derive flow accumulation for the wetness index
//! when no external accumulation layer is supplied.

mod flow_accumulation;
mod flow_direction;

pub use flow_accumulation::{flow_accumulation, FlowAccumulation};
pub use flow_direction::{flow_direction, FlowDirection};
