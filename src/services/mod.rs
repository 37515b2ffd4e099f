pub(crate) mod error;
pub(crate) mod freshness;
pub(crate) mod generation;
pub(crate) mod history;
pub(crate) mod prediction;
pub(crate) mod prompt;
pub(crate) mod response;
pub(crate) mod scope;
pub(crate) mod syllabus;
