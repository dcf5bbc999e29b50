pub mod build;
pub mod check;
pub mod derive;
pub mod show;

pub use build::*;
pub use check::*;
pub use derive::*;
pub use show::*;
