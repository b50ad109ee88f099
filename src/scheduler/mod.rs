// src/scheduler/mod.rs

//! The three-level scheduler: branches, plans per branch, tasks per commit.

pub mod branch_manager;
pub mod branch_scheduler;
pub mod ident;
pub mod plan_manager;
pub mod plan_scheduler;
pub mod script;
pub mod submission;

pub use branch_manager::BranchManager;
pub use branch_scheduler::BranchScheduler;
pub use ident::PlanKey;
pub use plan_manager::{Interconnect, ParameterStore, PlanManager, TaskCreator, WatcherFactory};
pub use plan_scheduler::PlanScheduler;
pub use submission::TaskStamp;
