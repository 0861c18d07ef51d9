pub mod engine;
pub mod flatten;
pub mod paths;
pub mod remote;
#[cfg(test)]
mod testing;
pub mod transfer;
