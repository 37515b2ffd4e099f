pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod predictions;
pub(crate) mod router;
pub(crate) mod subjects;
