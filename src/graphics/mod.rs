pub mod animation;
pub mod asset;
pub mod gpu;
pub mod model;
pub mod scene;

#[cfg(test)]
pub(crate) mod test_util;
