//! Capability planning: map an instruction (plus prior QA issues and any
//! forced capability) to an executable edit plan.

mod capabilities;
mod planner;

pub use capabilities::Capability;
pub use planner::{build_fix_map, detect_capability, generate_plan, EditPlan, FixMapEntry, PlanConstraints};
