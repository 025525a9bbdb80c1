// Output generation module

pub mod diagrams;
pub mod documents;
pub mod templates;
pub mod writer;

pub use diagrams::*;
pub use documents::*;
pub use templates::*;
pub use writer::*;
