pub(crate) mod channel;
pub(crate) mod data;
pub(crate) mod groups;
pub(crate) mod image;
