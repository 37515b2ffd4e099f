pub(crate) mod predictions;
pub(crate) mod questions;
pub(crate) mod subjects;
pub(crate) mod syllabus;
