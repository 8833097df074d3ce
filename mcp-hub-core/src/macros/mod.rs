#[macro_use]
pub(crate) mod cfg;
