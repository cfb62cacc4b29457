//! HTTP Route Handlers

pub mod activities;
pub mod features;
pub mod predict;
