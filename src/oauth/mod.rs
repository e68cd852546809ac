pub(crate) mod authid;
pub mod refresh;
pub(crate) mod token_exchange;
