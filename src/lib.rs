pub mod prelude {
    pub use super::common::prelude::*;
    pub use super::model::prelude::*;
    pub use super::analysis::prelude::*;
}

pub mod common;
pub mod model;
pub mod analysis;
