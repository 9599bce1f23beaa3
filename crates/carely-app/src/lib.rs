// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod booking;
pub mod chat;
pub mod model;
pub mod notify;
pub mod settings;
pub mod state;
pub mod steps;

pub use booking::*;
pub use chat::*;
pub use model::*;
pub use notify::*;
pub use settings::*;
pub use state::*;
pub use steps::*;
