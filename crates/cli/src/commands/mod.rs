mod build;
mod container;
mod eject;
mod run;

pub use build::build;
pub use container::{logs, ps, rm, stop};
pub use eject::eject;
pub use run::{run, up};
