pub(crate) mod ai;
pub(crate) mod http;
pub(crate) mod translate;
