pub(crate) mod collection;
pub(crate) mod conversion;
pub(crate) mod dedup;
pub(crate) mod extraction;
pub(crate) mod harvest_service;
pub(crate) mod merging;
pub(crate) mod normalize;
pub(crate) mod pagination;

#[cfg(test)]
pub(crate) mod testing;
